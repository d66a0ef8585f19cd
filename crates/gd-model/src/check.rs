//! Consistency checks and resets run between solver steps.

/// Severity of what a check pass changed, ordered so the worst wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ChangeCode {
    #[default]
    NoChange,
    /// Internal values moved; the layout and equations are untouched.
    NonStateChange,
    ParameterChange,
    JacobianChange,
    /// Topology changed, e.g. a relay opened a connection.
    ObjectChange,
    StateCountChange,
}

impl ChangeCode {
    pub fn is_change(self) -> bool {
        self != ChangeCode::NoChange
    }
}

/// How far a check pass may go in correcting what it finds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CheckLevel {
    /// Only changes that can be undone later; no topology changes.
    ReversibleOnly,
    #[default]
    FullCheck,
    LowVoltageCheck,
    CompleteStateCheck,
}

impl CheckLevel {
    pub fn allows_topology_change(self) -> bool {
        self != CheckLevel::ReversibleOnly
    }
}

/// Which cached values a reset returns to their nominal setpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ResetLevel {
    #[default]
    Minimal,
    Voltage,
    Angle,
    VoltageAngle,
    /// Every cached state, and the armed status of monitors.
    Full,
    /// Lift collapsed voltages before a power flow.
    LowVoltagePowerFlow,
    /// Lift collapsed voltages during a dynamic simulation.
    LowVoltageDynamic,
}

impl ResetLevel {
    /// Below this per-unit voltage a low-voltage reset restores nominal.
    pub const LOW_VOLTAGE_LIMIT: f64 = 0.7;

    pub fn resets_voltage(self) -> bool {
        matches!(
            self,
            ResetLevel::Voltage | ResetLevel::VoltageAngle | ResetLevel::Full
        )
    }

    pub fn resets_angle(self) -> bool {
        matches!(
            self,
            ResetLevel::Angle | ResetLevel::VoltageAngle | ResetLevel::Full
        )
    }

    pub fn is_low_voltage(self) -> bool {
        matches!(
            self,
            ResetLevel::LowVoltagePowerFlow | ResetLevel::LowVoltageDynamic
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worst_change_wins() {
        let codes = [
            ChangeCode::ParameterChange,
            ChangeCode::NoChange,
            ChangeCode::ObjectChange,
            ChangeCode::NonStateChange,
        ];
        assert_eq!(codes.into_iter().max(), Some(ChangeCode::ObjectChange));
        assert!(!ChangeCode::default().is_change());
    }

    #[test]
    fn reset_levels_select_categories() {
        assert!(ResetLevel::VoltageAngle.resets_voltage());
        assert!(ResetLevel::VoltageAngle.resets_angle());
        assert!(!ResetLevel::Angle.resets_voltage());
        assert!(!ResetLevel::Minimal.resets_angle());
        assert!(ResetLevel::LowVoltageDynamic.is_low_voltage());
        assert!(!ResetLevel::Full.is_low_voltage());
    }
}
