//! Convergence request passed down unchanged through containers.

/// How hard an object should iterate its own states toward consistency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ConvergeMode {
    /// One pass, no tolerance check.
    #[default]
    SingleIteration,
    VoltageOnly,
    /// Only states whose error exceeds the tolerance.
    HighErrorOnly,
    LocalIteration,
    BlockIteration,
    StrongIteration,
}

impl ConvergeMode {
    /// Modes that loop until the tolerance is met.
    pub fn iterates_to_tolerance(self) -> bool {
        matches!(
            self,
            ConvergeMode::LocalIteration
                | ConvergeMode::BlockIteration
                | ConvergeMode::StrongIteration
        )
    }
}
