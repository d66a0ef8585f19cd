//! The component contract for areas: two-pass indexing and recursive assembly.
//!
//! Every pass visits the area's own states first and then its children in the
//! fixed order of [`Area::children`]. Disabled children are sized and placed
//! (with zero sizes) but skipped by every solver callback.

use gd_index::{SolverMode, SolverOffsets, StateData, StateSizes};
use gd_model::{
    AlertKind, ArrayData, ChangeCode, CheckLevel, ComponentKind, ConvergeMode, GridComponent,
    ModelError, ModelResult, ObjectCore, OpFlag, ResetLevel, read_at, write_at,
};

use crate::area::{Area, ComponentMut};

impl Area {
    fn relax(&self, x: f64, alpha: f64) -> f64 {
        x + alpha * (self.options.f_target - x)
    }

    /// Converge order for this pass; oscillating areas flip on every call.
    fn converge_reversed(&mut self) -> bool {
        if self.options.direction_oscillate {
            self.converge_flip = !self.converge_flip;
        }
        self.options.reverse_converge ^ self.converge_flip
    }

    fn set_local_states(&mut self, nalg: usize) {
        if nalg == self.nalg {
            return;
        }
        let before = self.nalg;
        self.nalg = nalg;
        self.core.offsets.unload(false);
        self.reshape();
        self.core.raise(if nalg > before {
            AlertKind::StateCountIncrease
        } else {
            AlertKind::StateCountDecrease
        });
    }

    fn active_children_mut(&mut self) -> impl Iterator<Item = ComponentMut<'_>> + '_ {
        self.children_mut().filter(|c| c.is_enabled())
    }
}

impl GridComponent for Area {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Area
    }

    fn local_sizes(&self, mode: &SolverMode) -> StateSizes {
        let mut sizes = StateSizes::default();
        if mode.has_algebraic() {
            sizes.alg_size = self.nalg;
            sizes.jac_size = self.nalg;
        }
        sizes
    }

    fn is_loaded(&self, mode: &SolverMode) -> bool {
        self.core.offsets.is_loaded(mode)
            && (!self.core.enabled || self.children().all(|c| c.is_loaded(mode)))
    }

    /// Post-order sizing: children first, then own sizes plus every child total.
    fn load_sizes(&mut self, mode: &SolverMode, dynamic_only: bool) {
        if mode.is_local() {
            return;
        }
        self.process_alerts();
        if self.sizes_loaded(mode) {
            return;
        }
        let enabled = self.core.enabled;
        let own = if enabled {
            self.local_sizes(mode)
        } else {
            StateSizes::default()
        };
        let mut total = own;
        if enabled {
            for child in self.children_mut() {
                child.load_sizes(mode, dynamic_only);
                total.add(&child.core().offsets.total(mode));
            }
        }
        let so = self.core.offsets.offsets_mut(mode);
        if dynamic_only && so.state_loaded {
            so.root_and_jacobian_count_reset();
            so.local.add_root_and_jacobian_sizes(&own);
            so.total.add_root_and_jacobian_sizes(&total);
        } else {
            so.local = own;
            so.total = total;
            so.state_loaded = true;
        }
        so.rj_loaded = true;
        so.offset_loaded = false;
        tracing::debug!(
            area = %self.core.name,
            mode = mode.offset_index,
            states = total.state_count(),
            roots = total.root_count(),
            "sizes loaded"
        );
    }

    /// Category-major placement: each category of the subtree is contiguous.
    fn set_offsets(&mut self, new_offsets: &SolverOffsets, mode: &SolverMode) {
        if mode.is_local() {
            return;
        }
        self.core.offsets.set_offsets(new_offsets, mode);
        if !self.core.enabled {
            return;
        }
        let mut cursor = new_offsets.clone();
        if let Some(own) = self.core.offsets.offsets(mode) {
            cursor.local_increment(own);
        }
        for child in self.children_mut() {
            child.set_offsets(&cursor, mode);
            if let Some(placed) = child.core().offsets.offsets(mode) {
                cursor.increment_by(placed);
            }
        }
        tracing::debug!(area = %self.core.name, mode = mode.offset_index, "offsets assigned");
    }

    /// Object-major placement: each child's states form one contiguous block.
    ///
    /// Root offsets are left as they are; see [`set_root_offset`](Self::set_root_offset).
    fn set_offset(&mut self, offset: usize, mode: &SolverMode) {
        if mode.is_local() {
            return;
        }
        let so = self.core.offsets.offsets_mut(mode);
        let own = so.local;
        if mode.has_algebraic() {
            so.v_offset = Some(offset);
            so.a_offset = Some(offset + own.v_size);
            so.alg_offset = Some(offset + own.v_size + own.a_size);
        } else {
            so.v_offset = None;
            so.a_offset = None;
            so.alg_offset = None;
        }
        so.diff_offset = mode
            .has_differential()
            .then_some(offset + own.algebraic_count());
        so.offset_loaded = true;
        if !self.core.enabled {
            return;
        }
        let mut next = offset + own.state_count();
        for child in self.children_mut() {
            child.set_offset(next, mode);
            next += child.core().offsets.total(mode).state_count();
        }
    }

    fn set_root_offset(&mut self, offset: usize, mode: &SolverMode) {
        if mode.is_local() {
            return;
        }
        self.core.offsets.set_root_offset(offset, mode);
        let own = self
            .core
            .offsets
            .offsets(mode)
            .map_or(0, |so| so.local.root_count());
        let mut next = offset + own;
        for child in self.children_mut() {
            child.set_root_offset(next, mode);
            next += child.core().offsets.total(mode).root_count();
        }
    }

    fn residual(&self, sd: &StateData<'_>, resid: &mut [f64], mode: &SolverMode) -> ModelResult<()> {
        if mode.is_local() {
            return Ok(());
        }
        let r = self.core.require_ranges(mode)?;
        for i in r.alg {
            let x = read_at(sd.state, i, "area state")?;
            write_at(resid, i, x - self.options.f_target, "residual")?;
        }
        for child in self.active_children() {
            child.residual(sd, resid, mode)?;
        }
        Ok(())
    }

    fn derivative(&self, sd: &StateData<'_>, deriv: &mut [f64], mode: &SolverMode) -> ModelResult<()> {
        for child in self.active_children() {
            child.derivative(sd, deriv, mode)?;
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
        for i in r.alg {
            let x = read_at(sd.state, i, "area state")?;
            write_at(update, i, self.relax(x, alpha), "update")?;
        }
        for child in self.active_children() {
            child.algebraic_update(sd, update, mode, alpha)?;
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
        for i in r.alg {
            ad.assign(i, i, 1.0);
        }
        for child in self.active_children() {
            child.jacobian_elements(sd, ad, mode)?;
        }
        Ok(())
    }

    fn root_test(&self, sd: &StateData<'_>, roots: &mut [f64], mode: &SolverMode) -> ModelResult<()> {
        for child in self.active_children() {
            if child.core().flags.contains(OpFlag::HasRoots) {
                child.root_test(sd, roots, mode)?;
            }
        }
        Ok(())
    }

    fn root_trigger(&mut self, time: f64, root_mask: &[bool], mode: &SolverMode) -> ModelResult<()> {
        for child in self.active_children_mut() {
            if child.core().flags.contains(OpFlag::HasRoots) {
                child.root_trigger(time, root_mask, mode)?;
            }
        }
        self.process_alerts();
        Ok(())
    }

    /// Runs over the same children as [`root_test`](Self::root_test) and
    /// reports the most severe change any of them made.
    fn root_check(
        &mut self,
        sd: &StateData<'_>,
        mode: &SolverMode,
        level: CheckLevel,
    ) -> ModelResult<ChangeCode> {
        let mut worst = ChangeCode::NoChange;
        for child in self.active_children_mut() {
            if child.core().flags.contains(OpFlag::HasRoots) {
                worst = worst.max(child.root_check(sd, mode, level)?);
            }
        }
        self.process_alerts();
        if worst.is_change() {
            tracing::debug!(area = %self.core.name, ?worst, "root check applied changes");
        }
        Ok(worst)
    }

    fn reset(&mut self, level: ResetLevel) {
        if level == ResetLevel::Full {
            self.seed_own_states();
            self.converge_flip = false;
        }
        for child in self.active_children_mut() {
            child.reset(level);
        }
    }

    fn guess(
        &self,
        time: f64,
        state: &mut [f64],
        dstate_dt: &mut [f64],
        mode: &SolverMode,
    ) -> ModelResult<()> {
        self.core.copy_to_solver(state, dstate_dt, mode);
        for child in self.active_children() {
            child.guess(time, state, dstate_dt, mode)?;
        }
        Ok(())
    }

    /// Children are visited in reverse when configured, or alternately
    /// forward and backward when oscillating.
    fn converge(
        &mut self,
        time: f64,
        state: &mut [f64],
        dstate_dt: &mut [f64],
        mode: &SolverMode,
        converge_mode: ConvergeMode,
        tol: f64,
    ) -> ModelResult<()> {
        if mode.has_algebraic() && !mode.is_local() && converge_mode != ConvergeMode::VoltageOnly {
            let r = self.core.require_ranges(mode)?;
            for i in r.alg {
                let x = read_at(state, i, "area state")?;
                if converge_mode == ConvergeMode::HighErrorOnly
                    && (x - self.options.f_target).abs() <= tol
                {
                    continue;
                }
                write_at(state, i, self.options.f_target, "state")?;
            }
        }
        let reversed = self.converge_reversed();
        let mut children: Vec<ComponentMut<'_>> = self.active_children_mut().collect();
        if reversed {
            children.reverse();
        }
        for child in children {
            child.converge(time, state, dstate_dt, mode, converge_mode, tol)?;
        }
        Ok(())
    }

    fn set_state(
        &mut self,
        time: f64,
        state: &[f64],
        dstate_dt: &[f64],
        mode: &SolverMode,
    ) -> ModelResult<()> {
        self.core.copy_from_solver(state, dstate_dt, mode);
        for child in self.active_children_mut() {
            child.set_state(time, state, dstate_dt, mode)?;
        }
        Ok(())
    }

    fn update_local_cache(&mut self, sd: &StateData<'_>, mode: &SolverMode) -> ModelResult<()> {
        for child in self.active_children_mut() {
            child.update_local_cache(sd, mode)?;
        }
        Ok(())
    }

    fn get_variable_type(&self, sdata: &mut [f64], mode: &SolverMode) -> ModelResult<()> {
        self.core.write_variable_types(sdata, mode)?;
        for child in self.active_children() {
            child.get_variable_type(sdata, mode)?;
        }
        Ok(())
    }

    fn get_tols(&self, tols: &mut [f64], mode: &SolverMode) -> ModelResult<()> {
        self.core.write_tolerances(tols, mode)?;
        for child in self.active_children() {
            child.get_tols(tols, mode)?;
        }
        Ok(())
    }

    /// Children are labelled `<prefix><area>::<child>`.
    fn get_state_name(&self, names: &mut Vec<String>, mode: &SolverMode, prefix: &str) {
        self.core.write_state_names(names, mode, prefix);
        let nested = format!("{prefix}{}::", self.core.name);
        for child in self.active_children() {
            child.get_state_name(names, mode, &nested);
        }
    }

    fn update_flags(&mut self, dynamic_only: bool) {
        for child in self.children_mut() {
            child.update_flags(dynamic_only);
        }
        self.refresh_flags();
    }

    fn set(&mut self, param: &str, value: f64) -> ModelResult<()> {
        match param {
            "zone" => {
                self.options.zone = gd_core::as_count(value, "zone")
                    .ok()
                    .and_then(|z| u32::try_from(z).ok())
                    .ok_or_else(|| ModelError::invalid(param, value))?;
            }
            "ftarget" | "f_target" => {
                if !value.is_finite() {
                    return Err(ModelError::invalid(param, value));
                }
                self.options.f_target = value;
                self.reshape();
            }
            "nalg" | "algsize" => {
                let n = gd_core::as_count(value, "nalg")
                    .map_err(|_| ModelError::invalid(param, value))?;
                self.set_local_states(n);
            }
            _ => return self.core.set(param, value),
        }
        Ok(())
    }

    fn set_flag(&mut self, param: &str, value: bool) -> ModelResult<()> {
        match param {
            "reverse_converge" | "reverse" => self.options.reverse_converge = value,
            "direction_oscillate" | "oscillate" => {
                self.options.direction_oscillate = value;
                self.converge_flip = false;
            }
            _ => return self.core.set_flag(param, value),
        }
        Ok(())
    }

    fn get(&self, param: &str) -> ModelResult<f64> {
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        match param {
            "zone" => Ok(f64::from(self.options.zone)),
            "ftarget" | "f_target" => Ok(self.options.f_target),
            "nalg" | "algsize" => Ok(self.nalg as f64),
            "reverse_converge" | "reverse" => Ok(flag(self.options.reverse_converge)),
            "direction_oscillate" | "oscillate" => Ok(flag(self.options.direction_oscillate)),
            "buscount" => Ok(self.get_count(ComponentKind::Bus) as f64),
            "linkcount" => Ok(self.get_count(ComponentKind::Link) as f64),
            "relaycount" => Ok(self.get_count(ComponentKind::Relay) as f64),
            "areacount" => Ok(self.areas.len() as f64),
            _ => self.core.get(param),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::object::GridObject;
    use gd_model::StateBlock;

    type Log = Rc<RefCell<Vec<String>>>;

    /// One algebraic state; records which passes reached it.
    #[derive(Debug)]
    struct Recorder {
        core: ObjectCore,
        log: Log,
    }

    impl Recorder {
        fn new(name: &str, log: &Log) -> Self {
            Self {
                core: ObjectCore::new(name),
                log: Rc::clone(log),
            }
        }
    }

    impl GridComponent for Recorder {
        fn core(&self) -> &ObjectCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut ObjectCore {
            &mut self.core
        }

        fn kind(&self) -> ComponentKind {
            ComponentKind::Submodel
        }

        fn local_sizes(&self, mode: &SolverMode) -> StateSizes {
            let n = usize::from(mode.has_algebraic());
            StateSizes {
                alg_size: n,
                jac_size: n,
                ..StateSizes::default()
            }
        }

        fn residual(&self, _sd: &StateData<'_>, _resid: &mut [f64], _mode: &SolverMode) -> ModelResult<()> {
            self.log.borrow_mut().push(format!("residual:{}", self.core.name));
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
            self.log.borrow_mut().push(format!("converge:{}", self.core.name));
            Ok(())
        }
    }

    fn leaf(name: &str, nalg: usize, ndiff: usize) -> GridObject {
        GridObject::terminal(StateBlock::new(name, ComponentKind::Submodel).with_states(nalg, ndiff))
    }

    fn three_leaves() -> Area {
        let mut top = Area::new("top").with_local_states(1);
        top.add(leaf("c1", 2, 0)).unwrap();
        top.add(leaf("c2", 1, 1)).unwrap();
        top.add(leaf("c3", 0, 2)).unwrap();
        top
    }

    fn child_offsets(area: &Area, pick: impl Fn(&ObjectCore) -> Option<usize>) -> Vec<Option<usize>> {
        area.children().map(|c| pick(c.core())).collect()
    }

    fn recorders(names: &[&str], log: &Log) -> Area {
        let mut area = Area::new("a");
        for n in names {
            area.add(GridObject::terminal(Recorder::new(n, log))).unwrap();
        }
        area.load_sizes(&SolverMode::POWER_FLOW, false);
        area.set_offset(0, &SolverMode::POWER_FLOW);
        area
    }

    fn run_converge(area: &mut Area) {
        let mut state = vec![0.0; 8];
        let mut dstate = vec![0.0; 8];
        area.converge(
            0.0,
            &mut state,
            &mut dstate,
            &SolverMode::POWER_FLOW,
            ConvergeMode::SingleIteration,
            1e-6,
        )
        .unwrap();
    }

    #[test]
    fn sizes_fold_children_and_own_states() {
        let mode = SolverMode::DAE;
        let mut top = three_leaves();
        top.load_sizes(&mode, false);
        let total = top.total(&mode);
        assert_eq!(total.algebraic_count(), 4);
        assert_eq!(total.diff_size, 3);
        assert_eq!(total.jac_size, 7);
        assert!(!top.is_loaded(&mode));
    }

    #[test]
    fn category_major_offsets_follow_child_order() {
        let mode = SolverMode::DAE;
        let mut top = three_leaves();
        top.load_sizes(&mode, false);
        let mut base = SolverOffsets::new(mode);
        base.v_offset = Some(10);
        base.a_offset = Some(10);
        base.alg_offset = Some(10);
        base.diff_offset = Some(0);
        base.root_offset = Some(0);
        top.set_offsets(&base, &mode);

        assert_eq!(top.core.offsets.alg_offset(&mode), Some(10));
        assert_eq!(
            child_offsets(&top, |c| c.offsets.alg_offset(&mode)),
            [Some(11), Some(13), Some(14)]
        );
        assert_eq!(
            child_offsets(&top, |c| c.offsets.diff_offset(&mode)),
            [Some(0), Some(0), Some(1)]
        );
        assert_eq!(top.max_index(&mode), Some(13));
        assert!(top.is_loaded(&mode));
    }

    #[test]
    fn object_major_offsets_give_contiguous_blocks() {
        let mode = SolverMode::DAE;
        let mut top = three_leaves();
        top.load_sizes(&mode, false);
        top.set_offset(0, &mode);

        assert_eq!(top.core.offsets.alg_offset(&mode), Some(0));
        assert_eq!(
            child_offsets(&top, |c| c.offsets.alg_offset(&mode)),
            [Some(1), Some(3), Some(5)]
        );
        assert_eq!(
            child_offsets(&top, |c| c.offsets.diff_offset(&mode)),
            [Some(3), Some(4), Some(5)]
        );
        assert_eq!(top.max_index(&mode), Some(6));
    }

    #[test]
    fn offsets_stay_unassigned_for_absent_categories() {
        let mode = SolverMode::POWER_FLOW;
        let mut top = three_leaves();
        top.load_sizes(&mode, false);
        top.set_offsets(&SolverOffsets::root_layout(mode, top.total(&mode)), &mode);
        assert_eq!(top.total(&mode).state_count(), 4);
        assert!(top.children().all(|c| c.core().offsets.diff_offset(&mode).is_none()));
        assert_eq!(top.max_index(&mode), Some(3));
    }

    #[test]
    fn residual_and_jacobian_cover_the_whole_tree() {
        let mode = SolverMode::DAE;
        let mut top = three_leaves();
        top.load_sizes(&mode, false);
        top.set_offsets(&SolverOffsets::root_layout(mode, top.total(&mode)), &mode);

        let mut state = vec![1.0; 7];
        state[0] = 3.0;
        let dstate = vec![0.0; 7];
        let sd = StateData::new(0.0, &state, &dstate).with_cj(2.0);
        let mut resid = vec![f64::NAN; 7];
        top.residual(&sd, &mut resid, &mode).unwrap();
        assert_eq!(resid[0], 2.0);
        assert!(resid.iter().all(|r| r.is_finite()));

        let mut ad = ArrayData::new();
        top.jacobian_elements(&sd, &mut ad, &mode).unwrap();
        ad.compact();
        assert_eq!(ad.len(), 7);
        assert_eq!(ad.get(0, 0), 1.0);
        assert_eq!(ad.get(6, 6), -1.0 - 2.0);
    }

    #[test]
    fn unplaced_tree_reports_an_index_error() {
        let mode = SolverMode::POWER_FLOW;
        let mut top = three_leaves();
        top.load_sizes(&mode, false);
        let state = vec![0.0; 4];
        let mut resid = vec![0.0; 4];
        let err = top
            .residual(&StateData::new(0.0, &state, &[]), &mut resid, &mode)
            .unwrap_err();
        assert!(matches!(err, ModelError::Index(_)));
    }

    #[test]
    fn disabled_children_take_no_space_and_are_skipped() {
        let mode = SolverMode::POWER_FLOW;
        let log = Log::default();
        let mut area = recorders(&["x", "y", "z"], &log);
        area.find_mut("y").unwrap().set_flag("enabled", false).unwrap();
        area.process_alerts();
        area.load_sizes(&mode, false);
        area.set_offset(0, &mode);
        assert_eq!(area.total(&mode).state_count(), 2);
        assert_eq!(
            child_offsets(&area, |c| c.offsets.alg_offset(&mode)),
            [Some(0), Some(1), Some(1)]
        );

        let state = vec![0.0; 2];
        let mut resid = vec![0.0; 2];
        area.residual(&StateData::new(0.0, &state, &[]), &mut resid, &mode)
            .unwrap();
        assert_eq!(*log.borrow(), ["residual:x", "residual:z"]);
    }

    #[test]
    fn converge_order_can_reverse_and_oscillate() {
        let log = Log::default();
        let mut area = recorders(&["x", "y", "z"], &log);
        let drain = |log: &Log| std::mem::take(&mut *log.borrow_mut());

        run_converge(&mut area);
        assert_eq!(drain(&log), ["converge:x", "converge:y", "converge:z"]);

        area.set_flag("reverse_converge", true).unwrap();
        run_converge(&mut area);
        assert_eq!(drain(&log), ["converge:z", "converge:y", "converge:x"]);

        area.set_flag("reverse_converge", false).unwrap();
        area.set_flag("direction_oscillate", true).unwrap();
        run_converge(&mut area);
        run_converge(&mut area);
        assert_eq!(
            drain(&log),
            [
                "converge:z",
                "converge:y",
                "converge:x",
                "converge:x",
                "converge:y",
                "converge:z"
            ]
        );

        let state = vec![0.0; 3];
        let mut resid = vec![0.0; 3];
        area.residual(&StateData::new(0.0, &state, &[]), &mut resid, &SolverMode::POWER_FLOW)
            .unwrap();
        assert_eq!(drain(&log), ["residual:x", "residual:y", "residual:z"]);
    }

    #[test]
    fn root_trigger_reaches_monitors_and_collects_alerts() {
        let mode = SolverMode::DAE;
        let mut area = Area::new("a");
        area.add(leaf("c1", 1, 0)).unwrap();
        area.add(GridObject::monitor(StateBlock::relay("r1"))).unwrap();
        area.process_alerts();
        area.core.take_alerts();
        area.load_sizes(&mode, false);
        area.set_offsets(&SolverOffsets::root_layout(mode, area.total(&mode)), &mode);
        assert_eq!(area.total(&mode).root_count(), 1);

        let state = vec![0.5];
        let sd = StateData::new(0.0, &state, &[0.0]);
        let mut roots = vec![f64::NAN];
        area.root_test(&sd, &mut roots, &mode).unwrap();
        assert!(roots[0].is_finite());

        area.root_trigger(0.1, &[true], &mode).unwrap();
        assert!(area.find("r1").unwrap().core().flags.contains(OpFlag::ObjectArmed));
        assert!(
            area.core
                .take_alerts()
                .iter()
                .any(|e| e.kind == AlertKind::ConnectivityChange)
        );
        assert!(area.core.flags.contains(OpFlag::ConnectivityChange));
    }

    #[test]
    fn root_offsets_can_be_reassigned_separately() {
        let mode = SolverMode::DAE;
        let mut area = Area::new("a");
        area.add(GridObject::monitor(StateBlock::relay("r1"))).unwrap();
        area.add(GridObject::monitor(StateBlock::relay("r2"))).unwrap();
        area.load_sizes(&mode, false);
        area.set_offset(0, &mode);
        area.set_root_offset(5, &mode);
        assert_eq!(
            child_offsets(&area, |c| c.offsets.root_offset(&mode)),
            [Some(5), Some(6)]
        );
    }

    #[test]
    fn state_names_are_prefixed_by_area_path() {
        let mode = SolverMode::POWER_FLOW;
        let mut top = Area::new("top").with_local_states(1);
        let mut sub = Area::new("sub");
        sub.add(leaf("c1", 1, 0)).unwrap();
        top.add(sub).unwrap();
        top.load_sizes(&mode, false);
        top.set_offset(0, &mode);

        let mut names = Vec::new();
        top.get_state_name(&mut names, &mode, "");
        assert_eq!(names, ["top:alg0", "top::sub::c1:alg0"]);
    }

    #[test]
    fn guess_and_set_state_move_own_values() {
        let mode = SolverMode::POWER_FLOW;
        let mut top = Area::new("top").with_local_states(2);
        top.set("ftarget", 0.98).unwrap();
        top.load_sizes(&mode, false);
        top.set_offset(0, &mode);

        let mut state = vec![0.0; 2];
        top.guess(0.0, &mut state, &mut [], &mode).unwrap();
        assert_eq!(state, [0.98, 0.98]);

        top.set_state(0.0, &[1.01, 1.02], &[], &mode).unwrap();
        assert_eq!(top.core.state, [1.01, 1.02]);
    }

    #[test]
    fn parameters_round_trip_and_validate() {
        let mut area = Area::new("a");
        area.set("zone", 4.0).unwrap();
        assert_eq!(area.get("zone").unwrap(), 4.0);
        assert_eq!(area.options().zone, 4);
        assert!(area.set("zone", -1.0).is_err());
        assert!(area.set("ftarget", f64::NAN).is_err());

        area.set("nalg", 2.0).unwrap();
        assert_eq!(area.local_states(), 2);
        assert!(
            area.core
                .take_alerts()
                .iter()
                .any(|e| e.kind == AlertKind::StateCountIncrease)
        );
        area.set_flag("oscillate", true).unwrap();
        assert_eq!(area.get("direction_oscillate").unwrap(), 1.0);
        area.add(GridObject::terminal(StateBlock::bus("b1"))).unwrap();
        assert_eq!(area.get("buscount").unwrap(), 1.0);
        assert_eq!(area.get("userid").unwrap(), 0.0);
        assert!(matches!(
            area.get("nonsense"),
            Err(ModelError::UnknownParameter { .. })
        ));
    }

    #[test]
    fn root_check_reports_the_most_severe_change() {
        let mode = SolverMode::DAE;
        let mut sub = Area::new("sub");
        sub.add(GridObject::terminal(
            StateBlock::new("m", ComponentKind::Submodel)
                .with_states(1, 0)
                .with_roots(1),
        ))
        .unwrap();
        let mut area = Area::new("a");
        area.add(leaf("c1", 1, 0)).unwrap();
        area.add(sub).unwrap();
        area.add(GridObject::monitor(StateBlock::relay("r1").with_threshold(0.5)))
            .unwrap();
        area.process_alerts();
        area.core.take_alerts();
        area.load_sizes(&mode, false);
        area.set_offsets(&SolverOffsets::root_layout(mode, area.total(&mode)), &mode);
        assert_eq!(area.total(&mode).root_count(), 2);

        let state = vec![0.0, 1.0];
        let sd = StateData::new(0.0, &state, &[0.0, 0.0]);
        let armed = |area: &Area, name: &str| {
            area.find(name)
                .unwrap()
                .core()
                .flags
                .contains(OpFlag::ObjectArmed)
        };

        let code = area.root_check(&sd, &mode, CheckLevel::ReversibleOnly).unwrap();
        assert_eq!(code, ChangeCode::ParameterChange);
        assert!(armed(&area, "m"));
        assert!(!armed(&area, "r1"));

        let code = area.root_check(&sd, &mode, CheckLevel::FullCheck).unwrap();
        assert_eq!(code, ChangeCode::ObjectChange);
        assert!(armed(&area, "r1"));
        assert!(
            area.core
                .take_alerts()
                .iter()
                .any(|e| e.kind == AlertKind::ConnectivityChange)
        );
        assert_eq!(
            area.root_check(&sd, &mode, CheckLevel::FullCheck).unwrap(),
            ChangeCode::NoChange
        );
    }

    #[test]
    fn reset_reaches_nested_children_and_own_states() {
        let mode = SolverMode::POWER_FLOW;
        let mut sub = Area::new("sub");
        sub.add(GridObject::terminal(StateBlock::bus("b1"))).unwrap();
        let mut area = Area::new("a").with_local_states(1);
        area.add(sub).unwrap();
        area.load_sizes(&mode, false);
        area.set_offsets(&SolverOffsets::root_layout(mode, area.total(&mode)), &mode);

        area.set_state(0.0, &[0.4, 0.3, 5.0], &[0.0; 3], &mode).unwrap();
        assert_eq!(area.core.state, [5.0]);
        let bus = |area: &Area| {
            let b = area.find("b1").unwrap();
            (b.voltage(), b.angle())
        };
        assert_eq!(bus(&area), (0.4, 0.3));

        area.reset(ResetLevel::LowVoltagePowerFlow);
        assert_eq!(bus(&area), (1.0, 0.3));
        assert_eq!(area.core.state, [5.0]);

        area.reset(ResetLevel::Full);
        assert_eq!(bus(&area), (1.0, 0.0));
        assert_eq!(area.core.state, [1.0]);
    }
}
