//! The contract every node of a grid tree implements.

use std::fmt;

use gd_core::ObjectId;
use gd_index::{SolverMode, SolverOffsets, StateData, StateSizes};

use crate::array_data::ArrayData;
use crate::check::{ChangeCode, CheckLevel, ResetLevel};
use crate::converge::ConvergeMode;
use crate::error::ModelResult;
use crate::object::ObjectCore;

/// Broad category of a component, used for lookup and export filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ComponentKind {
    Bus,
    Link,
    Relay,
    Area,
    Submodel,
}

impl ComponentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ComponentKind::Bus => "bus",
            ComponentKind::Link => "link",
            ComponentKind::Relay => "relay",
            ComponentKind::Area => "area",
            ComponentKind::Submodel => "submodel",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "bus" => Some(ComponentKind::Bus),
            "link" | "line" => Some(ComponentKind::Link),
            "relay" => Some(ComponentKind::Relay),
            "area" => Some(ComponentKind::Area),
            "submodel" | "model" => Some(ComponentKind::Submodel),
            _ => None,
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Component contract shared by leaves and containers.
///
/// Solver callbacks receive the caller's flat arrays and write only at the
/// indices recorded in the object's [`OffsetTable`](gd_index::OffsetTable)
/// for the given mode. They fail with an index error rather than write
/// through offsets that were never assigned.
pub trait GridComponent: fmt::Debug {
    fn core(&self) -> &ObjectCore;

    fn core_mut(&mut self) -> &mut ObjectCore;

    fn kind(&self) -> ComponentKind;

    /// Sizes the object contributes by itself for `mode`.
    fn local_sizes(&self, mode: &SolverMode) -> StateSizes;

    fn id(&self) -> ObjectId {
        self.core().id
    }

    fn name(&self) -> &str {
        &self.core().name
    }

    fn is_enabled(&self) -> bool {
        self.core().enabled
    }

    fn is_loaded(&self, mode: &SolverMode) -> bool {
        self.core().offsets.is_loaded(mode)
    }

    /// Fill the record for `mode` from [`local_sizes`](Self::local_sizes).
    ///
    /// With `dynamic_only`, state sizes that are already loaded are kept and
    /// only root and Jacobian counts are refreshed.
    fn load_sizes(&mut self, mode: &SolverMode, dynamic_only: bool) {
        let offsets = &self.core().offsets;
        if offsets.is_state_loaded(mode) && offsets.is_root_and_jacobian_loaded(mode) {
            return;
        }
        let sizes = if self.is_enabled() {
            self.local_sizes(mode)
        } else {
            StateSizes::default()
        };
        let so = self.core_mut().offsets.offsets_mut(mode);
        if dynamic_only && so.state_loaded {
            so.root_and_jacobian_count_reset();
            so.local.add_root_and_jacobian_sizes(&sizes);
            so.total.add_root_and_jacobian_sizes(&sizes);
            so.rj_loaded = true;
        } else {
            so.local = sizes;
            so.local_load(false);
        }
    }

    fn set_offsets(&mut self, new_offsets: &SolverOffsets, mode: &SolverMode) {
        self.core_mut().offsets.set_offsets(new_offsets, mode);
    }

    fn set_offset(&mut self, offset: usize, mode: &SolverMode) {
        self.core_mut().offsets.set_offset(offset, mode);
    }

    fn set_root_offset(&mut self, offset: usize, mode: &SolverMode) {
        self.core_mut().offsets.set_root_offset(offset, mode);
    }

    fn residual(&self, _sd: &StateData<'_>, _resid: &mut [f64], _mode: &SolverMode) -> ModelResult<()> {
        Ok(())
    }

    fn derivative(&self, _sd: &StateData<'_>, _deriv: &mut [f64], _mode: &SolverMode) -> ModelResult<()> {
        Ok(())
    }

    /// Write improved algebraic values into `update`, blended by `alpha`.
    fn algebraic_update(
        &self,
        _sd: &StateData<'_>,
        _update: &mut [f64],
        _mode: &SolverMode,
        _alpha: f64,
    ) -> ModelResult<()> {
        Ok(())
    }

    fn jacobian_elements(
        &self,
        _sd: &StateData<'_>,
        _ad: &mut ArrayData,
        _mode: &SolverMode,
    ) -> ModelResult<()> {
        Ok(())
    }

    fn root_test(&self, _sd: &StateData<'_>, _roots: &mut [f64], _mode: &SolverMode) -> ModelResult<()> {
        Ok(())
    }

    /// React to the roots flagged in `root_mask`, indexed like the root array.
    fn root_trigger(&mut self, _time: f64, _root_mask: &[bool], _mode: &SolverMode) -> ModelResult<()> {
        Ok(())
    }

    /// Catch root crossings the solver stepped over and apply them now.
    ///
    /// Returns the most severe change made; at [`CheckLevel::ReversibleOnly`]
    /// nothing that alters topology is applied.
    fn root_check(
        &mut self,
        _sd: &StateData<'_>,
        _mode: &SolverMode,
        _level: CheckLevel,
    ) -> ModelResult<ChangeCode> {
        Ok(ChangeCode::NoChange)
    }

    /// Return cached values selected by `level` to their setpoints.
    fn reset(&mut self, _level: ResetLevel) {}

    /// Copy the local cache into the solver arrays as an initial guess.
    fn guess(
        &self,
        _time: f64,
        state: &mut [f64],
        dstate_dt: &mut [f64],
        mode: &SolverMode,
    ) -> ModelResult<()> {
        self.core().copy_to_solver(state, dstate_dt, mode);
        Ok(())
    }

    fn converge(
        &mut self,
        _time: f64,
        _state: &mut [f64],
        _dstate_dt: &mut [f64],
        _mode: &SolverMode,
        _converge_mode: ConvergeMode,
        _tol: f64,
    ) -> ModelResult<()> {
        Ok(())
    }

    /// Copy solver values for `mode` back into the local cache.
    fn set_state(
        &mut self,
        _time: f64,
        state: &[f64],
        dstate_dt: &[f64],
        mode: &SolverMode,
    ) -> ModelResult<()> {
        self.core_mut().copy_from_solver(state, dstate_dt, mode);
        Ok(())
    }

    fn update_local_cache(&mut self, _sd: &StateData<'_>, _mode: &SolverMode) -> ModelResult<()> {
        Ok(())
    }

    /// Mark algebraic entries `0.0` and differential entries `1.0`.
    fn get_variable_type(&self, sdata: &mut [f64], mode: &SolverMode) -> ModelResult<()> {
        self.core().write_variable_types(sdata, mode)
    }

    fn get_tols(&self, tols: &mut [f64], mode: &SolverMode) -> ModelResult<()> {
        self.core().write_tolerances(tols, mode)
    }

    /// Write a name for every own state at its flat index, growing `names`.
    fn get_state_name(&self, names: &mut Vec<String>, mode: &SolverMode, prefix: &str) {
        self.core().write_state_names(names, mode, prefix);
    }

    /// Recompute capability flags; leaves keep theirs up to date on change.
    fn update_flags(&mut self, _dynamic_only: bool) {}

    fn set(&mut self, param: &str, value: f64) -> ModelResult<()> {
        self.core_mut().set(param, value)
    }

    fn set_flag(&mut self, param: &str, value: bool) -> ModelResult<()> {
        self.core_mut().set_flag(param, value)
    }

    fn get(&self, param: &str) -> ModelResult<f64> {
        self.core().get(param)
    }

    fn voltage(&self) -> f64 {
        0.0
    }

    fn angle(&self) -> f64 {
        0.0
    }

    /// Voltage read from a solver array, falling back to the cached value.
    fn voltage_from_state(&self, state: &[f64], mode: &SolverMode) -> f64 {
        self.core()
            .offsets
            .v_offset(mode)
            .filter(|_| self.core().offsets.total(mode).v_size > 0)
            .and_then(|i| state.get(i).copied())
            .unwrap_or_else(|| self.voltage())
    }

    fn angle_from_state(&self, state: &[f64], mode: &SolverMode) -> f64 {
        self.core()
            .offsets
            .a_offset(mode)
            .filter(|_| self.core().offsets.total(mode).a_size > 0)
            .and_then(|i| state.get(i).copied())
            .unwrap_or_else(|| self.angle())
    }

    fn generation_real(&self) -> f64 {
        0.0
    }

    fn generation_reactive(&self) -> f64 {
        0.0
    }

    fn load_real(&self) -> f64 {
        0.0
    }

    fn load_reactive(&self) -> f64 {
        0.0
    }

    /// Real power flow at terminal `end` (1 or 2).
    fn link_real_power(&self, _end: usize) -> f64 {
        0.0
    }

    fn link_reactive_power(&self, _end: usize) -> f64 {
        0.0
    }

    fn link_loss(&self) -> f64 {
        0.0
    }

    /// Name of the bus at link terminal `end` (1 or 2), if connected.
    fn link_bus_name(&self, _end: usize) -> Option<&str> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_round_trip() {
        for kind in [
            ComponentKind::Bus,
            ComponentKind::Link,
            ComponentKind::Relay,
            ComponentKind::Area,
            ComponentKind::Submodel,
        ] {
            assert_eq!(ComponentKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ComponentKind::parse("LINE"), Some(ComponentKind::Link));
        assert_eq!(ComponentKind::parse("generator"), None);
    }
}
