//! Root-level driver handed to the external solver.

use gd_core::ObjectId;
use gd_index::{SolverMode, SolverModeRegistry, SolverOffsets, StateData, StateSizes};
use gd_model::{
    AlertEvent, ArrayData, ChangeCode, CheckLevel, ComponentKind, ConvergeMode, GridComponent,
    ModelResult, ResetLevel,
};

use crate::area::Area;
use crate::error::{AddError, AreaResult};
use crate::object::GridObject;

/// Placement of one object in the flat arrays of one configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayoutEntry {
    /// `::`-separated names from the root down to the object.
    pub path: String,
    pub kind: ComponentKind,
    pub v_offset: Option<usize>,
    pub a_offset: Option<usize>,
    pub alg_offset: Option<usize>,
    pub diff_offset: Option<usize>,
    pub root_offset: Option<usize>,
    /// Sizes owned by the object itself.
    pub local: StateSizes,
    pub total: StateSizes,
}

fn walk_layout(area: &Area, prefix: &str, mode: &SolverMode, out: &mut Vec<LayoutEntry>) {
    let entry = |path: String, c: &dyn GridComponent| {
        let table = &c.core().offsets;
        LayoutEntry {
            path,
            kind: c.kind(),
            v_offset: table.v_offset(mode),
            a_offset: table.a_offset(mode),
            alg_offset: table.alg_offset(mode),
            diff_offset: table.diff_offset(mode),
            root_offset: table.root_offset(mode),
            local: table.offsets(mode).map(|so| so.local).unwrap_or_default(),
            total: table.total(mode),
        }
    };
    let path = format!("{prefix}{}", area.name());
    out.push(entry(path.clone(), area));
    let nested = format!("{path}::");
    for t in &area.terminals {
        out.push(entry(format!("{nested}{}", t.name()), t.as_ref()));
    }
    for sub in &area.areas {
        walk_layout(sub, &nested, mode, out);
    }
    for m in &area.monitors {
        out.push(entry(format!("{nested}{}", m.name()), m.as_ref()));
    }
}

/// Owns the tree root and re-runs the sizing and offset passes on demand.
///
/// Every solver entry point first makes sure the configuration is fully
/// placed, so callers never observe offsets that predate a structural change.
#[derive(Debug)]
pub struct GridSystem {
    root: Area,
    modes: SolverModeRegistry,
    alerts: Vec<AlertEvent>,
}

impl GridSystem {
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_area(Area::new(name))
    }

    pub fn from_area(root: Area) -> Self {
        Self {
            root,
            modes: SolverModeRegistry::new(),
            alerts: Vec::new(),
        }
    }

    pub fn root(&self) -> &Area {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Area {
        &mut self.root
    }

    pub fn into_root(self) -> Area {
        self.root
    }

    pub fn add(&mut self, object: impl Into<GridObject>) -> Result<(), AddError> {
        self.root.add(object)
    }

    pub fn remove(&mut self, id: ObjectId) -> AreaResult<GridObject> {
        self.root.remove(id)
    }

    pub fn modes(&self) -> &SolverModeRegistry {
        &self.modes
    }

    /// Register a configuration under a fresh slot.
    pub fn register_mode(&mut self, template: SolverMode) -> SolverMode {
        self.modes.register(template)
    }

    /// Register an algebraic-only / differential-only pair that reference each other.
    pub fn register_pair(
        &mut self,
        algebraic: SolverMode,
        differential: SolverMode,
    ) -> (SolverMode, SolverMode) {
        self.modes.register_pair(algebraic, differential)
    }

    /// Pull every pending alert up to the root and keep those that reach it.
    pub fn drain_alerts(&mut self) {
        self.root.process_alerts();
        self.alerts.extend(self.root.core_mut().take_alerts());
    }

    /// Alerts that cascaded all the way up since the last call.
    pub fn take_alerts(&mut self) -> Vec<AlertEvent> {
        self.drain_alerts();
        std::mem::take(&mut self.alerts)
    }

    pub fn is_prepared(&self, mode: &SolverMode) -> bool {
        self.root.is_loaded(mode)
    }

    /// Run the sizing and offset passes for `mode` if anything is stale.
    pub fn prepare(&mut self, mode: &SolverMode) {
        self.prepare_with(mode, false);
    }

    /// Like [`prepare`](Self::prepare), keeping loaded state sizes and
    /// refreshing only root and Jacobian counts.
    pub fn prepare_dynamic(&mut self, mode: &SolverMode) {
        self.prepare_with(mode, true);
    }

    fn prepare_with(&mut self, mode: &SolverMode, dynamic_only: bool) {
        self.drain_alerts();
        if self.root.is_loaded(mode) {
            return;
        }
        tracing::debug!(mode = mode.offset_index, dynamic_only, "preparing configuration");
        self.root.load_sizes(mode, dynamic_only);
        let layout = SolverOffsets::root_layout(*mode, self.root.total(mode));
        self.root.set_offsets(&layout, mode);
        self.root.clear_change_flags();
    }

    pub fn sizes(&mut self, mode: &SolverMode) -> StateSizes {
        self.prepare(mode);
        self.root.total(mode)
    }

    pub fn state_size(&mut self, mode: &SolverMode) -> usize {
        self.sizes(mode).state_count()
    }

    pub fn root_count(&mut self, mode: &SolverMode) -> usize {
        self.sizes(mode).root_count()
    }

    pub fn jacobian_size(&mut self, mode: &SolverMode) -> usize {
        self.sizes(mode).jac_size
    }

    /// Highest occupied flat index, inclusive.
    pub fn max_index(&mut self, mode: &SolverMode) -> Option<usize> {
        self.prepare(mode);
        self.root.max_index(mode)
    }

    pub fn residual(&mut self, sd: &StateData<'_>, resid: &mut [f64], mode: &SolverMode) -> ModelResult<()> {
        self.prepare(mode);
        self.root.residual(sd, resid, mode)
    }

    pub fn derivative(&mut self, sd: &StateData<'_>, deriv: &mut [f64], mode: &SolverMode) -> ModelResult<()> {
        self.prepare(mode);
        self.root.derivative(sd, deriv, mode)
    }

    pub fn algebraic_update(
        &mut self,
        sd: &StateData<'_>,
        update: &mut [f64],
        mode: &SolverMode,
        alpha: f64,
    ) -> ModelResult<()> {
        self.prepare(mode);
        self.root.algebraic_update(sd, update, mode, alpha)
    }

    pub fn jacobian(&mut self, sd: &StateData<'_>, ad: &mut ArrayData, mode: &SolverMode) -> ModelResult<()> {
        self.prepare(mode);
        self.root.jacobian_elements(sd, ad, mode)
    }

    pub fn root_test(&mut self, sd: &StateData<'_>, roots: &mut [f64], mode: &SolverMode) -> ModelResult<()> {
        self.prepare(mode);
        self.root.root_test(sd, roots, mode)
    }

    /// Dispatch triggered roots; resulting alerts are collected at the root.
    pub fn root_trigger(&mut self, time: f64, root_mask: &[bool], mode: &SolverMode) -> ModelResult<()> {
        self.prepare(mode);
        self.root.root_trigger(time, root_mask, mode)?;
        self.drain_alerts();
        Ok(())
    }

    /// Apply root crossings the solver missed; resulting alerts are collected
    /// at the root.
    pub fn root_check(
        &mut self,
        sd: &StateData<'_>,
        mode: &SolverMode,
        level: CheckLevel,
    ) -> ModelResult<ChangeCode> {
        self.prepare(mode);
        let code = self.root.root_check(sd, mode, level)?;
        self.drain_alerts();
        Ok(code)
    }

    pub fn reset(&mut self, level: ResetLevel) {
        self.root.reset(level);
    }

    pub fn guess(
        &mut self,
        time: f64,
        state: &mut [f64],
        dstate_dt: &mut [f64],
        mode: &SolverMode,
    ) -> ModelResult<()> {
        self.prepare(mode);
        self.root.guess(time, state, dstate_dt, mode)
    }

    pub fn converge(
        &mut self,
        time: f64,
        state: &mut [f64],
        dstate_dt: &mut [f64],
        mode: &SolverMode,
        converge_mode: ConvergeMode,
        tol: f64,
    ) -> ModelResult<()> {
        self.prepare(mode);
        self.root
            .converge(time, state, dstate_dt, mode, converge_mode, tol)
    }

    pub fn set_state(
        &mut self,
        time: f64,
        state: &[f64],
        dstate_dt: &[f64],
        mode: &SolverMode,
    ) -> ModelResult<()> {
        self.prepare(mode);
        self.root.set_state(time, state, dstate_dt, mode)
    }

    pub fn update_local_cache(&mut self, sd: &StateData<'_>, mode: &SolverMode) -> ModelResult<()> {
        self.prepare(mode);
        self.root.update_local_cache(sd, mode)
    }

    /// `0.0` for algebraic and `1.0` for differential entries.
    pub fn variable_types(&mut self, mode: &SolverMode) -> ModelResult<Vec<f64>> {
        let mut sdata = vec![0.0; self.state_size(mode)];
        self.root.get_variable_type(&mut sdata, mode)?;
        Ok(sdata)
    }

    pub fn tolerances(&mut self, mode: &SolverMode) -> ModelResult<Vec<f64>> {
        let mut tols = vec![0.0; self.state_size(mode)];
        self.root.get_tols(&mut tols, mode)?;
        Ok(tols)
    }

    pub fn state_names(&mut self, mode: &SolverMode) -> Vec<String> {
        let mut names = vec![String::new(); self.state_size(mode)];
        self.root.get_state_name(&mut names, mode, "");
        names
    }

    /// Every object's placement, parents before children.
    pub fn layout(&mut self, mode: &SolverMode) -> Vec<LayoutEntry> {
        self.prepare(mode);
        let mut out = Vec::new();
        walk_layout(&self.root, "", mode, &mut out);
        out
    }
}
