//! Container behaviour switches.

/// Options of an [`Area`](crate::Area), also reachable through `set`/`set_flag`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AreaOptions {
    /// Visit children last-to-first during convergence passes.
    pub reverse_converge: bool,
    /// Flip the convergence direction on every pass.
    pub direction_oscillate: bool,
    pub zone: u32,
    /// Target frequency in per-unit; reference for the area's own states.
    pub f_target: f64,
}

impl Default for AreaOptions {
    fn default() -> Self {
        Self {
            reverse_converge: false,
            direction_oscillate: false,
            zone: 1,
            f_target: 1.0,
        }
    }
}
