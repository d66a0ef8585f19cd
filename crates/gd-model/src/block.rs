//! Configurable leaf component used to populate grid trees.
//!
//! A `StateBlock` declares any number of algebraic and differential states,
//! optional bus voltage/angle states and root functions. Its equations are
//! deliberately simple: algebraic states relax to a setpoint, differential
//! states decay with a time constant, and roots cross at a threshold.

use std::ops::Range;

use gd_core::ensure_finite;
use gd_index::{SolverMode, StateData, StateSizes};

use crate::alert::AlertKind;
use crate::array_data::ArrayData;
use crate::check::{ChangeCode, CheckLevel, ResetLevel};
use crate::converge::ConvergeMode;
use crate::error::{ModelError, ModelResult};
use crate::flags::OpFlag;
use crate::object::{LocalRanges, ObjectCore, read_at, write_at};
use crate::traits::{ComponentKind, GridComponent};

#[derive(Debug, Clone)]
pub struct StateBlock {
    core: ObjectCore,
    kind: ComponentKind,
    nalg: usize,
    ndiff: usize,
    nroots: usize,
    voltage_states: bool,
    setpoint: f64,
    time_constant: f64,
    threshold: f64,
    voltage: f64,
    angle: f64,
    pgen: f64,
    qgen: f64,
    pload: f64,
    qload: f64,
    p1: f64,
    q1: f64,
    p2: f64,
    q2: f64,
    terminals: [Option<String>; 2],
}

impl StateBlock {
    pub fn new(name: impl Into<String>, kind: ComponentKind) -> Self {
        let mut block = Self {
            core: ObjectCore::new(name),
            kind,
            nalg: 0,
            ndiff: 0,
            nroots: 0,
            voltage_states: false,
            setpoint: 0.0,
            time_constant: 1.0,
            threshold: 0.0,
            voltage: 1.0,
            angle: 0.0,
            pgen: 0.0,
            qgen: 0.0,
            pload: 0.0,
            qload: 0.0,
            p1: 0.0,
            q1: 0.0,
            p2: 0.0,
            q2: 0.0,
            terminals: [None, None],
        };
        block.refresh_shape();
        block.core.take_alerts();
        block
    }

    /// A bus carrying one voltage and one angle state.
    pub fn bus(name: impl Into<String>) -> Self {
        Self::new(name, ComponentKind::Bus).with_voltage_states()
    }

    pub fn link(name: impl Into<String>) -> Self {
        Self::new(name, ComponentKind::Link)
    }

    /// A monitor with one root function.
    pub fn relay(name: impl Into<String>) -> Self {
        Self::new(name, ComponentKind::Relay).with_roots(1)
    }

    pub fn with_states(mut self, nalg: usize, ndiff: usize) -> Self {
        self.nalg = nalg;
        self.ndiff = ndiff;
        self.rebuilt()
    }

    pub fn with_roots(mut self, nroots: usize) -> Self {
        self.nroots = nroots;
        self.rebuilt()
    }

    pub fn with_voltage_states(mut self) -> Self {
        self.voltage_states = true;
        self.rebuilt()
    }

    pub fn with_setpoint(mut self, setpoint: f64) -> Self {
        self.setpoint = setpoint;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Connect a link between two buses, by name.
    pub fn with_terminals(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.terminals = [Some(from.into()), Some(to.into())];
        self
    }

    fn rebuilt(mut self) -> Self {
        self.refresh_shape();
        self.core.take_alerts();
        self
    }

    pub fn algebraic_states(&self) -> usize {
        self.nalg
    }

    pub fn differential_states(&self) -> usize {
        self.ndiff
    }

    pub fn is_armed(&self) -> bool {
        self.core.flags.contains(OpFlag::ObjectArmed)
    }

    fn refresh_shape(&mut self) {
        let sizes = self.local_sizes(&SolverMode::LOCAL);
        self.core.reload_local(sizes);
        self.seed_cache();
        let algebraic = self.nalg > 0 || self.voltage_states;
        self.core
            .set_capability(OpFlag::HasDifferentialStates, self.ndiff > 0);
        self.core
            .set_capability(OpFlag::HasDynStates, algebraic || self.ndiff > 0);
        self.core.set_capability(OpFlag::HasPflowStates, algebraic);
        self.core.set_capability(OpFlag::HasRoots, self.nroots > 0);
        self.core
            .set_capability(OpFlag::HasAlgRoots, self.nroots > 0 && self.ndiff == 0);
    }

    /// Voltage and angle cache entries start at their setpoints.
    fn seed_cache(&mut self) {
        let Some(r) = self.core.local_ranges(&SolverMode::LOCAL) else {
            return;
        };
        for (range, value) in [(r.v, self.voltage), (r.a, self.angle)] {
            for i in range {
                if let Some(slot) = self.core.state.get_mut(i) {
                    *slot = value;
                }
            }
        }
    }

    fn resize_states(&mut self, nalg: usize, ndiff: usize, voltage_states: bool) {
        let before = self.local_sizes(&SolverMode::LOCAL).state_count();
        self.nalg = nalg;
        self.ndiff = ndiff;
        self.voltage_states = voltage_states;
        let after = self.local_sizes(&SolverMode::LOCAL).state_count();
        self.core.offsets.unload(false);
        self.refresh_shape();
        let kind = match after.cmp(&before) {
            std::cmp::Ordering::Greater => AlertKind::StateCountIncrease,
            std::cmp::Ordering::Less => AlertKind::StateCountDecrease,
            std::cmp::Ordering::Equal => AlertKind::StateIdentityChange,
        };
        self.core.raise(kind);
    }

    fn set_roots(&mut self, nroots: usize) {
        let before = self.nroots;
        self.nroots = nroots;
        self.core.offsets.rj_unload(false);
        self.refresh_shape();
        self.core.raise(if nroots > before {
            AlertKind::RootCountIncrease
        } else {
            AlertKind::RootCountDecrease
        });
    }

    fn cached(&self, pick: impl Fn(&LocalRanges) -> Range<usize>) -> Option<f64> {
        let r = self.core.local_ranges(&SolverMode::LOCAL)?;
        pick(&r).next().and_then(|i| self.core.state.get(i).copied())
    }

    fn relax(&self, x: f64, target: f64, alpha: f64) -> f64 {
        x + alpha * (target - x)
    }

    /// Root function values in local order; watched states minus the threshold.
    fn root_values(&self, sd: &StateData<'_>, mode: &SolverMode) -> ModelResult<Vec<f64>> {
        let Some(r) = self.core.local_ranges(mode) else {
            return Ok(Vec::new());
        };
        if r.roots.is_empty() {
            return Ok(Vec::new());
        }
        let loc = self
            .core
            .offsets
            .get_read_locations(sd, mode, &self.core)?;
        let watched: Vec<f64> = loc
            .diff_state
            .iter()
            .chain(loc.alg_state)
            .copied()
            .collect();
        Ok((0..r.roots.len())
            .map(|k| {
                let x = if watched.is_empty() {
                    self.voltage
                } else {
                    watched[k % watched.len()]
                };
                x - self.threshold
            })
            .collect())
    }

    fn set_armed(&mut self, armed: bool, time: f64) {
        self.core.flags.assign(OpFlag::ObjectArmed, armed);
        tracing::debug!(object = %self.core.name, time, armed, "root triggered");
        if self.kind == ComponentKind::Relay {
            self.core.raise(AlertKind::ConnectivityChange);
        }
    }

    fn reset_cache(&mut self, pick: impl Fn(&LocalRanges) -> Range<usize>, value: f64) {
        let Some(r) = self.core.local_ranges(&SolverMode::LOCAL) else {
            return;
        };
        for i in pick(&r) {
            if let Some(slot) = self.core.state.get_mut(i) {
                *slot = value;
            }
        }
    }
}

impl GridComponent for StateBlock {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn kind(&self) -> ComponentKind {
        self.kind
    }

    fn local_sizes(&self, mode: &SolverMode) -> StateSizes {
        let dynamic = mode.is_dynamic() || mode.is_local();
        let mut sizes = StateSizes::default();
        if mode.has_algebraic() {
            if self.voltage_states {
                sizes.v_size = 1;
                sizes.a_size = 1;
            }
            sizes.alg_size = self.nalg;
        }
        if mode.has_differential() && dynamic {
            sizes.diff_size = self.ndiff;
        }
        if dynamic {
            if self.ndiff > 0 {
                sizes.diff_roots = self.nroots;
            } else {
                sizes.alg_roots = self.nroots;
            }
        }
        sizes.jac_size = sizes.state_count();
        sizes
    }

    fn residual(&self, sd: &StateData<'_>, resid: &mut [f64], mode: &SolverMode) -> ModelResult<()> {
        if mode.is_local() {
            return Ok(());
        }
        let r = self.core.require_ranges(mode)?;
        for i in r.v.clone() {
            write_at(resid, i, read_at(sd.state, i, "voltage state")? - self.voltage, "residual")?;
        }
        for i in r.a.clone() {
            write_at(resid, i, read_at(sd.state, i, "angle state")? - self.angle, "residual")?;
        }
        let loc = self
            .core
            .offsets
            .get_locations(sd, Some(resid), mode, &self.core)?;
        for (dest, x) in loc.dest_alg.iter_mut().zip(loc.alg_state) {
            *dest = x - self.setpoint;
        }
        for (k, (dest, x)) in loc.dest_diff.iter_mut().zip(loc.diff_state).enumerate() {
            let dx = loc.dstate_dt.get(k).copied().unwrap_or(0.0);
            *dest = -x / self.time_constant - dx;
        }
        Ok(())
    }

    fn derivative(&self, sd: &StateData<'_>, deriv: &mut [f64], mode: &SolverMode) -> ModelResult<()> {
        if !mode.has_differential() || self.ndiff == 0 {
            return Ok(());
        }
        let loc = self
            .core
            .offsets
            .get_locations(sd, Some(deriv), mode, &self.core)?;
        for (dest, x) in loc.dest_diff.iter_mut().zip(loc.diff_state) {
            *dest = -x / self.time_constant;
        }
        Ok(())
    }

    fn algebraic_update(
        &self,
        sd: &StateData<'_>,
        update: &mut [f64],
        mode: &SolverMode,
        alpha: f64,
    ) -> ModelResult<()> {
        if !mode.has_algebraic() || mode.is_local() {
            return Ok(());
        }
        let r = self.core.require_ranges(mode)?;
        for i in r.v.clone() {
            let x = read_at(sd.state, i, "voltage state")?;
            write_at(update, i, self.relax(x, self.voltage, alpha), "update")?;
        }
        for i in r.a.clone() {
            let x = read_at(sd.state, i, "angle state")?;
            write_at(update, i, self.relax(x, self.angle, alpha), "update")?;
        }
        let loc = self
            .core
            .offsets
            .get_locations(sd, Some(update), mode, &self.core)?;
        for (dest, x) in loc.dest_alg.iter_mut().zip(loc.alg_state) {
            *dest = self.relax(*x, self.setpoint, alpha);
        }
        Ok(())
    }

    fn jacobian_elements(
        &self,
        sd: &StateData<'_>,
        ad: &mut ArrayData,
        mode: &SolverMode,
    ) -> ModelResult<()> {
        if mode.is_local() {
            return Ok(());
        }
        let r = self.core.require_ranges(mode)?;
        for i in r.algebraic() {
            ad.assign(i, i, 1.0);
        }
        let decay = -1.0 / self.time_constant;
        for i in r.diff.clone() {
            let cj = if mode.is_dae() { sd.cj } else { 0.0 };
            ad.assign(i, i, decay - cj);
        }
        Ok(())
    }

    fn root_test(&self, sd: &StateData<'_>, roots: &mut [f64], mode: &SolverMode) -> ModelResult<()> {
        let values = self.root_values(sd, mode)?;
        let Some(r) = self.core.local_ranges(mode) else {
            return Ok(());
        };
        for (i, value) in r.roots.zip(values) {
            write_at(roots, i, value, "root")?;
        }
        Ok(())
    }

    fn root_trigger(&mut self, time: f64, root_mask: &[bool], mode: &SolverMode) -> ModelResult<()> {
        let Some(r) = self.core.local_ranges(mode) else {
            return Ok(());
        };
        if !r.roots.clone().any(|i| root_mask.get(i).copied().unwrap_or(false)) {
            return Ok(());
        }
        self.set_armed(!self.is_armed(), time);
        Ok(())
    }

    /// The block is armed exactly while some root value is above zero; a
    /// mismatch means the solver stepped over a crossing.
    fn root_check(
        &mut self,
        sd: &StateData<'_>,
        mode: &SolverMode,
        level: CheckLevel,
    ) -> ModelResult<ChangeCode> {
        let values = self.root_values(sd, mode)?;
        if values.is_empty() {
            return Ok(ChangeCode::NoChange);
        }
        let above = values.iter().any(|v| *v > 0.0);
        if above == self.is_armed() {
            return Ok(ChangeCode::NoChange);
        }
        let relay = self.kind == ComponentKind::Relay;
        if relay && !level.allows_topology_change() {
            return Ok(ChangeCode::NoChange);
        }
        self.set_armed(above, sd.time);
        Ok(if relay {
            ChangeCode::ObjectChange
        } else {
            ChangeCode::ParameterChange
        })
    }

    fn reset(&mut self, level: ResetLevel) {
        if level.is_low_voltage() {
            if self.voltage() < ResetLevel::LOW_VOLTAGE_LIMIT {
                self.reset_cache(|r| r.v.clone(), self.voltage);
            }
            return;
        }
        if level.resets_voltage() {
            self.reset_cache(|r| r.v.clone(), self.voltage);
        }
        if level.resets_angle() {
            self.reset_cache(|r| r.a.clone(), self.angle);
        }
        if level == ResetLevel::Full {
            self.reset_cache(|r| r.alg.clone(), self.setpoint);
            self.reset_cache(|r| r.diff.clone(), 0.0);
            self.core.dstate_dt.iter_mut().for_each(|d| *d = 0.0);
            self.core.flags.assign(OpFlag::ObjectArmed, false);
        }
    }

    fn converge(
        &mut self,
        _time: f64,
        state: &mut [f64],
        _dstate_dt: &mut [f64],
        mode: &SolverMode,
        converge_mode: ConvergeMode,
        tol: f64,
    ) -> ModelResult<()> {
        if !mode.has_algebraic() || mode.is_local() {
            return Ok(());
        }
        let r = self.core.require_ranges(mode)?;
        for i in r.v.clone() {
            write_at(state, i, self.voltage, "state")?;
        }
        if converge_mode == ConvergeMode::VoltageOnly {
            return Ok(());
        }
        for i in r.a.clone() {
            write_at(state, i, self.angle, "state")?;
        }
        for i in r.alg.clone() {
            let x = read_at(state, i, "state")?;
            if converge_mode == ConvergeMode::HighErrorOnly && (x - self.setpoint).abs() <= tol {
                continue;
            }
            write_at(state, i, self.setpoint, "state")?;
        }
        Ok(())
    }

    fn update_local_cache(&mut self, sd: &StateData<'_>, mode: &SolverMode) -> ModelResult<()> {
        self.set_state(sd.time, sd.state, sd.dstate_dt, mode)
    }

    fn set(&mut self, param: &str, value: f64) -> ModelResult<()> {
        let count = |v: f64| gd_core::as_count(v, "count").map_err(|_| ModelError::invalid(param, v));
        match param {
            "nalg" | "algsize" => {
                let n = count(value)?;
                if n != self.nalg {
                    self.resize_states(n, self.ndiff, self.voltage_states);
                }
            }
            "ndiff" | "diffsize" => {
                let n = count(value)?;
                if n != self.ndiff {
                    self.resize_states(self.nalg, n, self.voltage_states);
                }
            }
            "nroots" | "rootsize" => {
                let n = count(value)?;
                if n != self.nroots {
                    self.set_roots(n);
                }
            }
            "tau" | "timeconstant" => {
                if !(value.is_finite() && value > 0.0) {
                    return Err(ModelError::invalid(param, value));
                }
                self.time_constant = value;
            }
            _ => {
                let slot = match param {
                    "setpoint" => &mut self.setpoint,
                    "threshold" => &mut self.threshold,
                    "voltage" | "v" => &mut self.voltage,
                    "angle" | "a" => &mut self.angle,
                    "pgen" | "p" => &mut self.pgen,
                    "qgen" | "q" => &mut self.qgen,
                    "pload" => &mut self.pload,
                    "qload" => &mut self.qload,
                    "p1" => &mut self.p1,
                    "q1" => &mut self.q1,
                    "p2" => &mut self.p2,
                    "q2" => &mut self.q2,
                    _ => return self.core.set(param, value),
                };
                *slot = ensure_finite(value, "parameter").map_err(|_| ModelError::invalid(param, value))?;
                if matches!(param, "voltage" | "v" | "angle" | "a") {
                    self.seed_cache();
                }
            }
        }
        Ok(())
    }

    fn set_flag(&mut self, param: &str, value: bool) -> ModelResult<()> {
        match param {
            "voltage_states" => {
                if value != self.voltage_states {
                    self.resize_states(self.nalg, self.ndiff, value);
                }
                Ok(())
            }
            _ => self.core.set_flag(param, value),
        }
    }

    fn get(&self, param: &str) -> ModelResult<f64> {
        let value = match param {
            "nalg" | "algsize" => self.nalg as f64,
            "ndiff" | "diffsize" => self.ndiff as f64,
            "nroots" | "rootsize" => self.nroots as f64,
            "tau" | "timeconstant" => self.time_constant,
            "setpoint" => self.setpoint,
            "threshold" => self.threshold,
            "voltage" | "v" => self.voltage(),
            "angle" | "a" => self.angle(),
            "pgen" | "p" => self.pgen,
            "qgen" | "q" => self.qgen,
            "pload" => self.pload,
            "qload" => self.qload,
            "p1" => self.p1,
            "q1" => self.q1,
            "p2" => self.p2,
            "q2" => self.q2,
            _ => return self.core.get(param),
        };
        Ok(value)
    }

    fn voltage(&self) -> f64 {
        self.cached(|r| r.v.clone()).unwrap_or(self.voltage)
    }

    fn angle(&self) -> f64 {
        self.cached(|r| r.a.clone()).unwrap_or(self.angle)
    }

    fn generation_real(&self) -> f64 {
        self.pgen
    }

    fn generation_reactive(&self) -> f64 {
        self.qgen
    }

    fn load_real(&self) -> f64 {
        self.pload
    }

    fn load_reactive(&self) -> f64 {
        self.qload
    }

    fn link_real_power(&self, end: usize) -> f64 {
        if end == 2 { self.p2 } else { self.p1 }
    }

    fn link_reactive_power(&self, end: usize) -> f64 {
        if end == 2 { self.q2 } else { self.q1 }
    }

    fn link_loss(&self) -> f64 {
        self.p1 + self.p2
    }

    fn link_bus_name(&self, end: usize) -> Option<&str> {
        let slot = if end == 2 { 1 } else { 0 };
        self.terminals[slot].as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gd_index::IndexError;

    fn placed(block: &mut StateBlock, mode: &SolverMode, base: usize) {
        block.load_sizes(mode, false);
        block.set_offset(base, mode);
        block.set_root_offset(0, mode);
    }

    #[test]
    fn sizes_follow_mode() {
        let block = StateBlock::bus("b").with_states(2, 3).with_roots(1);
        let pf = block.local_sizes(&SolverMode::POWER_FLOW);
        assert_eq!((pf.v_size, pf.a_size, pf.alg_size, pf.diff_size), (1, 1, 2, 0));
        assert_eq!(pf.root_count(), 0);
        let dae = block.local_sizes(&SolverMode::DAE);
        assert_eq!(dae.state_count(), 7);
        assert_eq!(dae.diff_roots, 1);
        let dd = block.local_sizes(&SolverMode::DYN_DIFFERENTIAL);
        assert_eq!((dd.alg_size, dd.diff_size, dd.v_size), (0, 3, 0));
    }

    #[test]
    fn dae_residual_and_jacobian() {
        let mode = SolverMode::DAE;
        let mut block = StateBlock::new("blk", ComponentKind::Submodel)
            .with_states(1, 1)
            .with_setpoint(2.0);
        block.set("tau", 0.5).unwrap();
        placed(&mut block, &mode, 1);

        let state = [0.0, 5.0, 4.0];
        let dstate = [0.0, 0.0, 1.0];
        let sd = StateData::new(0.0, &state, &dstate).with_cj(10.0);
        let mut resid = [0.0; 3];
        block.residual(&sd, &mut resid, &mode).unwrap();
        assert_eq!(resid, [0.0, 3.0, -8.0 - 1.0]);

        let mut ad = ArrayData::new();
        block.jacobian_elements(&sd, &mut ad, &mode).unwrap();
        assert_eq!(ad.get(1, 1), 1.0);
        assert_eq!(ad.get(2, 2), -2.0 - 10.0);
    }

    #[test]
    fn unplaced_block_reports_index_error() {
        let block = StateBlock::new("blk", ComponentKind::Submodel).with_states(1, 0);
        let sd = StateData::new(0.0, &[0.0], &[]);
        let mut resid = [0.0];
        let err = block
            .residual(&sd, &mut resid, &SolverMode::POWER_FLOW)
            .unwrap_err();
        assert!(matches!(err, ModelError::Index(IndexError::NotLoaded { .. })));
    }

    #[test]
    fn bus_voltage_states_residual() {
        let mode = SolverMode::POWER_FLOW;
        let mut bus = StateBlock::bus("b1");
        bus.set("voltage", 1.05).unwrap();
        placed(&mut bus, &mode, 0);
        let state = [1.0, 0.1];
        let sd = StateData::new(0.0, &state, &[]);
        let mut resid = [0.0; 2];
        bus.residual(&sd, &mut resid, &mode).unwrap();
        assert!((resid[0] - (1.0 - 1.05)).abs() < 1e-12);
        assert!((resid[1] - 0.1).abs() < 1e-12);
    }

    #[test]
    fn state_count_change_alerts_and_unloads() {
        let mode = SolverMode::POWER_FLOW;
        let mut block = StateBlock::new("blk", ComponentKind::Submodel).with_states(1, 0);
        placed(&mut block, &mode, 0);
        assert!(block.is_loaded(&mode));
        block.set("nalg", 3.0).unwrap();
        assert!(!block.is_loaded(&mode));
        let kinds: Vec<_> = block.core_mut().take_alerts().into_iter().map(|a| a.kind).collect();
        assert!(kinds.contains(&AlertKind::StateCountIncrease));
        assert_eq!(block.core().state.len(), 3);
        assert!(block.set("nalg", -1.0).is_err());
        assert!(block.set("nalg", 1.5).is_err());
    }

    #[test]
    fn first_differential_state_raises_flag_change() {
        let mut block = StateBlock::new("blk", ComponentKind::Submodel).with_states(1, 0);
        block.set("ndiff", 1.0).unwrap();
        let kinds: Vec<_> = block.core_mut().take_alerts().into_iter().map(|a| a.kind).collect();
        assert!(kinds.contains(&AlertKind::FlagChange));
        assert!(block.core().flags.contains(OpFlag::HasDifferentialStates));
    }

    #[test]
    fn relay_trigger_reports_connectivity() {
        let mode = SolverMode::DAE;
        let mut relay = StateBlock::relay("r1").with_states(0, 1).with_threshold(0.5);
        placed(&mut relay, &mode, 0);

        let state = [0.2];
        let sd = StateData::new(0.0, &state, &[]);
        let mut roots = [0.0];
        relay.root_test(&sd, &mut roots, &mode).unwrap();
        assert!((roots[0] + 0.3).abs() < 1e-12);

        relay.root_trigger(1.0, &[false], &mode).unwrap();
        assert!(!relay.is_armed());
        relay.root_trigger(1.0, &[true], &mode).unwrap();
        assert!(relay.is_armed());
        let alerts = relay.core_mut().take_alerts();
        assert_eq!(alerts.last().map(|a| a.kind), Some(AlertKind::ConnectivityChange));
    }

    #[test]
    fn guess_and_set_state_round_trip_through_cache() {
        let mode = SolverMode::DAE;
        let mut block = StateBlock::new("blk", ComponentKind::Submodel).with_states(1, 1);
        placed(&mut block, &mode, 2);
        let state = [0.0, 0.0, 3.0, 4.0];
        let dstate = [0.0, 0.0, 0.0, 0.5];
        block.set_state(0.0, &state, &dstate, &mode).unwrap();
        assert_eq!(block.core().state, vec![3.0, 4.0]);

        let mut out = [0.0; 4];
        let mut dout = [0.0; 4];
        block.guess(0.0, &mut out, &mut dout, &mode).unwrap();
        assert_eq!(out, state);
        assert_eq!(dout, dstate);
    }

    #[test]
    fn converge_voltage_only_leaves_angles() {
        let mode = SolverMode::POWER_FLOW;
        let mut bus = StateBlock::bus("b").with_states(1, 0).with_setpoint(7.0);
        placed(&mut bus, &mode, 0);
        let mut state = [0.9, 0.3, 0.0];
        bus.converge(0.0, &mut state, &mut [], &mode, ConvergeMode::VoltageOnly, 1e-6)
            .unwrap();
        assert_eq!(state, [1.0, 0.3, 0.0]);
        bus.converge(0.0, &mut state, &mut [], &mode, ConvergeMode::LocalIteration, 1e-6)
            .unwrap();
        assert_eq!(state, [1.0, 0.0, 7.0]);
    }

    #[test]
    fn variable_types_and_names() {
        let mode = SolverMode::DAE;
        let mut block = StateBlock::bus("b").with_states(1, 1);
        placed(&mut block, &mode, 0);
        let mut types = [9.0; 4];
        block.get_variable_type(&mut types, &mode).unwrap();
        assert_eq!(types, [0.0, 0.0, 0.0, 1.0]);
        let mut names = Vec::new();
        block.get_state_name(&mut names, &mode, "area::");
        assert_eq!(names[0], "area::b:voltage");
        assert_eq!(names[3], "area::b:diff0");
    }

    #[test]
    fn link_exports() {
        let mut link = StateBlock::link("l1");
        link.set("p1", 1.0).unwrap();
        link.set("p2", -0.98).unwrap();
        assert_eq!(link.link_real_power(1), 1.0);
        assert_eq!(link.link_real_power(2), -0.98);
        assert!((link.link_loss() - 0.02).abs() < 1e-12);
        assert!(link.set("p1", f64::NAN).is_err());
    }

    #[test]
    fn root_check_applies_missed_crossings() {
        let mode = SolverMode::DAE;
        let mut relay = StateBlock::relay("r1").with_states(0, 1).with_threshold(0.5);
        placed(&mut relay, &mode, 0);
        let state = [0.8];
        let sd = StateData::new(2.0, &state, &[0.0]);

        let code = relay.root_check(&sd, &mode, CheckLevel::ReversibleOnly).unwrap();
        assert_eq!(code, ChangeCode::NoChange);
        assert!(!relay.is_armed());

        let code = relay.root_check(&sd, &mode, CheckLevel::FullCheck).unwrap();
        assert_eq!(code, ChangeCode::ObjectChange);
        assert!(relay.is_armed());
        let alerts = relay.core_mut().take_alerts();
        assert_eq!(alerts.last().map(|a| a.kind), Some(AlertKind::ConnectivityChange));
        assert_eq!(
            relay.root_check(&sd, &mode, CheckLevel::FullCheck).unwrap(),
            ChangeCode::NoChange
        );

        let mut model = StateBlock::new("m", ComponentKind::Submodel)
            .with_states(1, 0)
            .with_roots(1);
        placed(&mut model, &mode, 0);
        let state = [1.0];
        let sd = StateData::new(0.0, &state, &[0.0]);
        let code = model.root_check(&sd, &mode, CheckLevel::ReversibleOnly).unwrap();
        assert_eq!(code, ChangeCode::ParameterChange);
        assert!(model.core_mut().take_alerts().is_empty());
    }

    #[test]
    fn reset_levels_restore_selected_cache_entries() {
        let mode = SolverMode::POWER_FLOW;
        let mut bus = StateBlock::bus("b1");
        placed(&mut bus, &mode, 0);
        bus.set_state(0.0, &[0.5, 0.2], &[0.0; 2], &mode).unwrap();
        assert_eq!((bus.voltage(), bus.angle()), (0.5, 0.2));

        bus.reset(ResetLevel::Minimal);
        assert_eq!((bus.voltage(), bus.angle()), (0.5, 0.2));
        bus.reset(ResetLevel::Angle);
        assert_eq!((bus.voltage(), bus.angle()), (0.5, 0.0));
        bus.reset(ResetLevel::LowVoltagePowerFlow);
        assert_eq!(bus.voltage(), 1.0);

        let dae = SolverMode::DAE;
        let mut block = StateBlock::new("blk", ComponentKind::Submodel)
            .with_states(1, 1)
            .with_setpoint(2.0);
        placed(&mut block, &dae, 0);
        block.set_state(0.0, &[7.0, 3.0], &[0.0, 0.4], &dae).unwrap();
        block.core_mut().flags.assign(OpFlag::ObjectArmed, true);
        block.reset(ResetLevel::Full);
        let r = block.core().local_ranges(&SolverMode::LOCAL).unwrap();
        assert_eq!(block.core().state[r.alg.start], 2.0);
        assert_eq!(block.core().state[r.diff.start], 0.0);
        assert!(block.core().dstate_dt.iter().all(|d| *d == 0.0));
        assert!(!block.is_armed());
    }

    #[test]
    fn links_name_their_terminal_buses() {
        let link = StateBlock::link("l1").with_terminals("b1", "b2");
        assert_eq!(link.link_bus_name(1), Some("b1"));
        assert_eq!(link.link_bus_name(2), Some("b2"));
        assert_eq!(StateBlock::link("l2").link_bus_name(1), None);
    }
}
