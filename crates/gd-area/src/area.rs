//! Composite container owning terminals, nested areas and monitors.

use std::collections::HashMap;

use gd_core::ObjectId;
use gd_index::{SolverMode, StateSizes};
use gd_model::{
    AlertEvent, AlertKind, ComponentKind, GridComponent, Invalidation, ModelResult, ObjectCore,
    OpFlag, OpFlags,
};

use crate::error::{AddError, AreaError, AreaResult};
use crate::object::{Category, GridObject};
use crate::options::AreaOptions;

/// Shared reference to any child, whatever its category.
pub type ComponentRef<'a> = &'a (dyn GridComponent + 'static);

/// Mutable reference to any child, whatever its category.
pub type ComponentMut<'a> = &'a mut (dyn GridComponent + 'static);

/// A container of grid objects that behaves like one component.
///
/// Children are visited in a fixed order everywhere: terminals, then nested
/// areas, then monitors, each in insertion order. Offset assignment, every
/// assembly pass and every export accessor rely on that order agreeing.
#[derive(Debug)]
pub struct Area {
    pub(crate) core: ObjectCore,
    pub(crate) terminals: Vec<Box<dyn GridComponent>>,
    pub(crate) areas: Vec<Area>,
    pub(crate) monitors: Vec<Box<dyn GridComponent>>,
    positions: HashMap<ObjectId, (Category, usize)>,
    names: HashMap<String, ObjectId>,
    pub(crate) options: AreaOptions,
    /// Algebraic states owned by the area itself.
    pub(crate) nalg: usize,
    /// Capabilities of the area itself, before aggregation.
    pub(crate) own_flags: OpFlags,
    pub(crate) converge_flip: bool,
}

impl Area {
    pub fn new(name: impl Into<String>) -> Self {
        let mut area = Self {
            core: ObjectCore::new(name),
            terminals: Vec::new(),
            areas: Vec::new(),
            monitors: Vec::new(),
            positions: HashMap::new(),
            names: HashMap::new(),
            options: AreaOptions::default(),
            nalg: 0,
            own_flags: OpFlags::empty(),
            converge_flip: false,
        };
        area.reshape();
        area.core.take_alerts();
        area
    }

    pub fn with_options(mut self, options: AreaOptions) -> Self {
        self.options = options;
        self.reshape();
        self.core.take_alerts();
        self
    }

    pub fn with_local_states(mut self, nalg: usize) -> Self {
        self.nalg = nalg;
        self.reshape();
        self.core.take_alerts();
        self
    }

    pub fn options(&self) -> &AreaOptions {
        &self.options
    }

    pub fn local_states(&self) -> usize {
        self.nalg
    }

    /// Rebuild the local cache after the own state count changed.
    pub(crate) fn reshape(&mut self) {
        let sizes = self.local_sizes(&SolverMode::LOCAL);
        self.core.reload_local(sizes);
        self.seed_own_states();
        self.own_flags.assign(OpFlag::HasPflowStates, self.nalg > 0);
        self.own_flags.assign(OpFlag::HasDynStates, self.nalg > 0);
        self.refresh_flags();
    }

    /// Own algebraic cache entries start at the frequency target.
    pub(crate) fn seed_own_states(&mut self) {
        if let Some(r) = self.core.local_ranges(&SolverMode::LOCAL) {
            for i in r.alg {
                if let Some(slot) = self.core.state.get_mut(i) {
                    *slot = self.options.f_target;
                }
            }
        }
    }

    pub fn terminal_count(&self) -> usize {
        self.terminals.len()
    }

    pub fn area_count(&self) -> usize {
        self.areas.len()
    }

    pub fn monitor_count(&self) -> usize {
        self.monitors.len()
    }

    /// Direct children in traversal order.
    pub fn children(&self) -> impl Iterator<Item = ComponentRef<'_>> + '_ {
        self.terminals
            .iter()
            .map(|c| c.as_ref())
            .chain(self.areas.iter().map(|a| a as ComponentRef<'_>))
            .chain(self.monitors.iter().map(|c| c.as_ref()))
    }

    pub fn children_mut(&mut self) -> impl Iterator<Item = ComponentMut<'_>> + '_ {
        self.terminals
            .iter_mut()
            .map(|c| c.as_mut())
            .chain(self.areas.iter_mut().map(|a| a as ComponentMut<'_>))
            .chain(self.monitors.iter_mut().map(|c| c.as_mut()))
    }

    /// Enabled direct children in traversal order.
    pub(crate) fn active_children(&self) -> impl Iterator<Item = ComponentRef<'_>> + '_ {
        self.children().filter(|c| c.is_enabled())
    }

    pub fn areas(&self) -> &[Area] {
        &self.areas
    }

    /// Add an object to the collection matching its category.
    ///
    /// On failure the object is handed back inside the error.
    pub fn add(&mut self, object: impl Into<GridObject>) -> Result<(), AddError> {
        let mut object = object.into();
        if let Err(reason) = self.check_add(&object) {
            tracing::warn!(area = %self.core.name, child = %object.name(), %reason, "add rejected");
            return Err(AddError { reason, object });
        }
        let category = object.category();
        let id = object.id();
        let name = object.name().to_string();
        let seq = match category {
            Category::Terminal => self.terminals.len(),
            Category::Area => self.areas.len(),
            Category::Monitor => self.monitors.len(),
        };
        let core = object.component_mut().core_mut();
        core.parent = Some(self.core.id);
        core.seq_index = seq;
        match object {
            GridObject::Terminal(c) => self.terminals.push(c),
            GridObject::Area(a) => self.areas.push(*a),
            GridObject::Monitor(c) => self.monitors.push(c),
        }
        self.positions.insert(id, (category, seq));
        self.names.insert(name.clone(), id);
        tracing::debug!(area = %self.core.name, child = %name, %category, seq, "added");
        self.structure_changed(AlertKind::ObjectCountIncrease);
        Ok(())
    }

    fn check_add(&self, object: &GridObject) -> AreaResult<()> {
        let comp = object.component();
        let name = comp.name().to_string();
        if let Some(parent) = comp.core().parent {
            return Err(if parent == self.core.id {
                AreaError::AlreadyMember { name }
            } else {
                AreaError::AlreadyOwned { name, parent }
            });
        }
        if comp.id() == self.core.id || self.is_member(comp.id()) {
            return Err(AreaError::AlreadyMember { name });
        }
        if self.names.contains_key(&name) {
            return Err(AreaError::DuplicateName { name });
        }
        let category = object.category();
        if !GridObject::accepts(category, comp.kind()) {
            return Err(AreaError::CategoryNotAccepted {
                name,
                kind: comp.kind(),
                category,
            });
        }
        Ok(())
    }

    /// Remove a member, searching nested areas when it is not a direct child.
    pub fn remove(&mut self, id: ObjectId) -> AreaResult<GridObject> {
        let Some(&(category, pos)) = self.positions.get(&id) else {
            for area in &mut self.areas {
                if area.is_member(id) {
                    return area.remove(id);
                }
            }
            return Err(AreaError::NotMember { id });
        };
        let mut object = match category {
            Category::Terminal => GridObject::Terminal(self.terminals.remove(pos)),
            Category::Area => GridObject::Area(Box::new(self.areas.remove(pos))),
            Category::Monitor => GridObject::Monitor(self.monitors.remove(pos)),
        };
        self.positions.remove(&id);
        self.names.remove(object.name());
        self.recompact(category);
        let core = object.component_mut().core_mut();
        core.parent = None;
        core.seq_index = 0;
        core.offsets.unload(false);
        tracing::debug!(area = %self.core.name, child = %object.name(), %category, "removed");
        self.structure_changed(AlertKind::ObjectCountDecrease);
        Ok(object)
    }

    /// Keep sequence indices dense after a removal.
    fn recompact(&mut self, category: Category) {
        let positions = &mut self.positions;
        let mut renumber = |i: usize, core: &mut ObjectCore| {
            core.seq_index = i;
            positions.insert(core.id, (category, i));
        };
        match category {
            Category::Terminal => {
                for (i, c) in self.terminals.iter_mut().enumerate() {
                    renumber(i, c.core_mut());
                }
            }
            Category::Area => {
                for (i, a) in self.areas.iter_mut().enumerate() {
                    renumber(i, &mut a.core);
                }
            }
            Category::Monitor => {
                for (i, c) in self.monitors.iter_mut().enumerate() {
                    renumber(i, c.core_mut());
                }
            }
        }
    }

    fn structure_changed(&mut self, kind: AlertKind) {
        self.core.offsets.unload(false);
        self.refresh_flags();
        self.core.raise(kind);
    }

    /// True if `id` is this area's child or any descendant.
    pub fn is_member(&self, id: ObjectId) -> bool {
        self.positions.contains_key(&id) || self.areas.iter().any(|a| a.is_member(id))
    }

    pub fn child(&self, id: ObjectId) -> Option<ComponentRef<'_>> {
        let &(category, pos) = self.positions.get(&id)?;
        match category {
            Category::Terminal => self.terminals.get(pos).map(|c| c.as_ref()),
            Category::Area => self.areas.get(pos).map(|a| a as ComponentRef<'_>),
            Category::Monitor => self.monitors.get(pos).map(|c| c.as_ref()),
        }
    }

    pub fn child_mut(&mut self, id: ObjectId) -> Option<ComponentMut<'_>> {
        let &(category, pos) = self.positions.get(&id)?;
        match category {
            Category::Terminal => self.terminals.get_mut(pos).map(|c| c.as_mut()),
            Category::Area => self.areas.get_mut(pos).map(|a| a as ComponentMut<'_>),
            Category::Monitor => self.monitors.get_mut(pos).map(|c| c.as_mut()),
        }
    }

    /// Look an object up by name in the whole subtree, this area included.
    pub fn find(&self, name: &str) -> Option<ComponentRef<'_>> {
        if self.core.name == name {
            return Some(self);
        }
        if let Some(&id) = self.names.get(name) {
            return self.child(id);
        }
        self.areas.iter().find_map(|a| a.find(name))
    }

    pub fn find_mut(&mut self, name: &str) -> Option<ComponentMut<'_>> {
        if self.core.name == name {
            return Some(self);
        }
        if let Some(&id) = self.names.get(name) {
            return self.child_mut(id);
        }
        for area in &mut self.areas {
            if let Some(found) = area.find_mut(name) {
                return Some(found);
            }
        }
        None
    }

    /// Nested area by name, anywhere in the subtree.
    pub fn find_area_mut(&mut self, name: &str) -> Option<&mut Area> {
        if self.core.name == name {
            return Some(self);
        }
        for area in &mut self.areas {
            if let Some(found) = area.find_area_mut(name) {
                return Some(found);
            }
        }
        None
    }

    pub fn find_by_user_id(&self, kind: ComponentKind, user_id: u32) -> Option<ComponentRef<'_>> {
        self.children()
            .find(|c| c.kind() == kind && c.core().user_id == user_id)
            .or_else(|| {
                self.areas
                    .iter()
                    .find_map(|a| a.find_by_user_id(kind, user_id))
            })
    }

    /// The `index`-th direct child of `kind`, in traversal order.
    pub fn get_sub_object(&self, kind: ComponentKind, index: usize) -> Option<ComponentRef<'_>> {
        self.children().filter(|c| c.kind() == kind).nth(index)
    }

    pub fn get_bus(&self, index: usize) -> Option<ComponentRef<'_>> {
        self.get_sub_object(ComponentKind::Bus, index)
    }

    pub fn get_link(&self, index: usize) -> Option<ComponentRef<'_>> {
        self.get_sub_object(ComponentKind::Link, index)
    }

    pub fn get_relay(&self, index: usize) -> Option<ComponentRef<'_>> {
        self.get_sub_object(ComponentKind::Relay, index)
    }

    pub fn get_area(&self, index: usize) -> Option<&Area> {
        self.areas.get(index)
    }

    pub fn get_area_mut(&mut self, index: usize) -> Option<&mut Area> {
        self.areas.get_mut(index)
    }

    /// Apply a parameter to every descendant of `kind`; returns how many were set.
    pub fn set_all(&mut self, kind: ComponentKind, param: &str, value: f64) -> ModelResult<usize> {
        let mut count = 0;
        for c in self.terminals.iter_mut().chain(self.monitors.iter_mut()) {
            if c.kind() == kind {
                c.set(param, value)?;
                count += 1;
            }
        }
        for area in &mut self.areas {
            if kind == ComponentKind::Area {
                area.set(param, value)?;
                count += 1;
            }
            count += area.set_all(kind, param, value)?;
        }
        Ok(count)
    }

    /// Drain queued alerts from the whole subtree, bottom-up.
    ///
    /// Alerts that cascade end up in this area's own queue for its parent.
    pub fn process_alerts(&mut self) {
        let mut events = Vec::new();
        for area in &mut self.areas {
            area.process_alerts();
            events.extend(area.core.take_alerts());
        }
        for c in self.terminals.iter_mut().chain(self.monitors.iter_mut()) {
            events.extend(c.core_mut().take_alerts());
        }
        for event in events {
            self.alert(event);
        }
    }

    /// Receive one alert from a descendant.
    pub fn alert(&mut self, event: AlertEvent) {
        let policy = event.kind.policy();
        tracing::trace!(area = %self.core.name, source = %event.source, kind = ?event.kind, "alert");
        let offsets = &mut self.core.offsets;
        match policy.invalidates {
            Invalidation::None => {}
            Invalidation::RootsAndJacobian => offsets.rj_unload(false),
            Invalidation::States => offsets.state_unload(false),
            Invalidation::All => offsets.unload(false),
        }
        if let Some(flag) = policy.marks {
            self.core.flags.set(flag);
        }
        if policy.refresh_flags {
            self.refresh_flags();
        }
        if policy.cascade {
            self.core.forward(event);
        }
    }

    /// Recompute the aggregated capability bits from the current children.
    ///
    /// Raises a flag-change alert when the aggregate differs.
    pub(crate) fn refresh_flags(&mut self) -> bool {
        let aggregate = self
            .active_children()
            .fold(self.own_flags.cascading(), |acc, c| {
                acc.union(c.core().flags.cascading())
            });
        let before = self.core.flags.cascading();
        self.core.flags = self.core.flags.with_cascading(aggregate);
        if before != aggregate {
            self.core.raise(AlertKind::FlagChange);
            return true;
        }
        false
    }

    /// Clear the change bits recorded by alert intake, recursively.
    pub fn clear_change_flags(&mut self) {
        self.core.flags.clear_changes();
        for area in &mut self.areas {
            area.clear_change_flags();
        }
    }

    pub fn total(&self, mode: &SolverMode) -> StateSizes {
        self.core.offsets.total(mode)
    }

    /// State and root/Jacobian sizes loaded here and in every descendant.
    pub(crate) fn sizes_loaded(&self, mode: &SolverMode) -> bool {
        let own = &self.core.offsets;
        if !(own.is_state_loaded(mode) && own.is_root_and_jacobian_loaded(mode)) {
            return false;
        }
        if !self.core.enabled {
            return true;
        }
        self.terminals.iter().chain(self.monitors.iter()).all(|c| {
            let t = &c.core().offsets;
            t.is_state_loaded(mode) && t.is_root_and_jacobian_loaded(mode)
        }) && self.areas.iter().all(|a| a.sizes_loaded(mode))
    }

    /// Highest flat index occupied by the subtree, inclusive.
    ///
    /// Holds for both category-major and object-major placement.
    pub fn max_index(&self, mode: &SolverMode) -> Option<usize> {
        let own = self
            .core
            .local_ranges(mode)
            .and_then(|r| r.states().max());
        let leaves = self
            .terminals
            .iter()
            .chain(self.monitors.iter())
            .filter_map(|c| c.core().offsets.max_index(mode));
        let nested = self.areas.iter().filter_map(|a| a.max_index(mode));
        own.into_iter().chain(leaves).chain(nested).max()
    }
}
