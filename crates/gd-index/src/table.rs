//! Per-object table of offset records, one per solver configuration.

use crate::error::{IndexError, IndexResult};
use crate::offsets::SolverOffsets;
use crate::sizes::StateSizes;
use crate::solver_mode::SolverMode;
use crate::state_data::{LocalStateSource, Locations, StateData, optional_region, region, split_regions_mut};

/// Offset records of one object, indexed by `SolverMode::offset_index`.
///
/// Slot 0 always holds the local record describing the object's own cache.
/// Other slots are created the first time a mutator sees their mode and are
/// invalidated, never removed, on structural change.
#[derive(Debug, Clone)]
pub struct OffsetTable {
    local: SolverOffsets,
    // Slot 0 of `records` is never populated; it mirrors `local`.
    records: Vec<Option<SolverOffsets>>,
    param_offset: Option<usize>,
}

impl OffsetTable {
    /// Empty table holding only the local record.
    pub fn new() -> Self {
        Self {
            local: SolverOffsets::new(SolverMode::LOCAL),
            records: vec![None],
            param_offset: None,
        }
    }

    fn slot(&self, index: usize) -> Option<&SolverOffsets> {
        if index == 0 {
            return Some(&self.local);
        }
        self.records.get(index).and_then(Option::as_ref)
    }

    /// Number of slots currently backed by storage.
    pub fn slot_count(&self) -> usize {
        self.records.len()
    }

    /// Record describing the object's own cache layout.
    pub fn local(&self) -> &SolverOffsets {
        &self.local
    }

    /// Mutable local record; only the owning object rebuilds it.
    pub fn local_mut(&mut self) -> &mut SolverOffsets {
        &mut self.local
    }

    /// Record for `mode`, or `None` if no mutator has touched its slot.
    pub fn offsets(&self, mode: &SolverMode) -> Option<&SolverOffsets> {
        self.slot(mode.offset_index)
    }

    /// Record for `mode`, growing the table if the slot is new.
    pub fn offsets_mut(&mut self, mode: &SolverMode) -> &mut SolverOffsets {
        let idx = mode.offset_index;
        if idx == 0 {
            return &mut self.local;
        }
        if idx >= self.records.len() {
            self.records.resize(idx + 1, None);
        }
        self.records[idx].get_or_insert_with(|| SolverOffsets::new(*mode))
    }

    /// Local record first, then every populated slot in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &SolverOffsets> {
        std::iter::once(&self.local).chain(self.records.iter().flatten())
    }

    /// Sizes, root/Jacobian counts and offsets are all current for `mode`.
    ///
    /// False for a mode the table has never seen.
    pub fn is_loaded(&self, mode: &SolverMode) -> bool {
        self.offsets(mode)
            .is_some_and(|so| so.state_loaded && so.rj_loaded && so.offset_loaded)
    }

    /// State sizes are current; offsets may still be stale.
    pub fn is_state_loaded(&self, mode: &SolverMode) -> bool {
        self.offsets(mode).is_some_and(|so| so.state_loaded)
    }

    pub fn is_root_and_jacobian_loaded(&self, mode: &SolverMode) -> bool {
        self.offsets(mode).is_some_and(|so| so.rj_loaded)
    }

    /// Copy every category offset from `new_offsets`, marking the record placed.
    pub fn set_offsets(&mut self, new_offsets: &SolverOffsets, mode: &SolverMode) {
        self.offsets_mut(mode).set_offsets(new_offsets);
    }

    /// Place the object's states contiguously from a single base index.
    pub fn set_offset(&mut self, new_offset: usize, mode: &SolverMode) {
        self.offsets_mut(mode).set_offset(new_offset);
    }

    // The single-category setters leave the loaded marks alone; callers
    // placing a record piecemeal set `offset_loaded` themselves.

    pub fn set_alg_offset(&mut self, new_offset: usize, mode: &SolverMode) {
        self.offsets_mut(mode).alg_offset = Some(new_offset);
    }

    /// Root functions are placed independently of the state categories.
    pub fn set_root_offset(&mut self, new_offset: usize, mode: &SolverMode) {
        self.offsets_mut(mode).root_offset = Some(new_offset);
    }

    pub fn set_diff_offset(&mut self, new_offset: usize, mode: &SolverMode) {
        self.offsets_mut(mode).diff_offset = Some(new_offset);
    }

    pub fn set_v_offset(&mut self, new_offset: usize, mode: &SolverMode) {
        self.offsets_mut(mode).v_offset = Some(new_offset);
    }

    pub fn set_a_offset(&mut self, new_offset: usize, mode: &SolverMode) {
        self.offsets_mut(mode).a_offset = Some(new_offset);
    }

    /// First algebraic index for `mode`; constant time, no allocation.
    pub fn alg_offset(&self, mode: &SolverMode) -> Option<usize> {
        self.offsets(mode).and_then(|so| so.alg_offset)
    }

    pub fn diff_offset(&self, mode: &SolverMode) -> Option<usize> {
        self.offsets(mode).and_then(|so| so.diff_offset)
    }

    pub fn root_offset(&self, mode: &SolverMode) -> Option<usize> {
        self.offsets(mode).and_then(|so| so.root_offset)
    }

    pub fn v_offset(&self, mode: &SolverMode) -> Option<usize> {
        self.offsets(mode).and_then(|so| so.v_offset)
    }

    pub fn a_offset(&self, mode: &SolverMode) -> Option<usize> {
        self.offsets(mode).and_then(|so| so.a_offset)
    }

    /// Sizes of the subtree for `mode`; zero when the mode was never seen.
    pub fn total(&self, mode: &SolverMode) -> StateSizes {
        self.offsets(mode).map(|so| so.total).unwrap_or_default()
    }

    /// Highest flat index the subtree occupies for `mode`, inclusive.
    pub fn max_index(&self, mode: &SolverMode) -> Option<usize> {
        self.offsets(mode).and_then(SolverOffsets::max_index)
    }

    /// Build a read/write view of `owner`'s region in the solver arrays.
    ///
    /// Categories absent from `mode` are read from the paired configuration's
    /// arrays when `sd` carries them, otherwise from the owner's local cache.
    pub fn get_locations<'a>(
        &self,
        sd: &StateData<'a>,
        dest: Option<&'a mut [f64]>,
        mode: &SolverMode,
        owner: &'a dyn LocalStateSource,
    ) -> IndexResult<Locations<'a>> {
        let slot = mode.offset_index;
        let so = self
            .offsets(mode)
            .filter(|so| so.offset_loaded)
            .ok_or(IndexError::NotLoaded {
                what: "offsets",
                mode: slot,
            })?;

        let mut alg_offset = so.alg_offset;
        let mut diff_offset = so.diff_offset;
        let mut alg_size = so.total.alg_size;
        let mut diff_size = so.total.diff_size;

        let local = self.local();
        let local_alg = || {
            region(
                owner.local_state(),
                local.alg_offset,
                local.local.alg_size,
                "local algebraic state",
                0,
            )
        };
        let local_diff = || -> IndexResult<(&'a [f64], &'a [f64])> {
            let state = region(
                owner.local_state(),
                local.diff_offset,
                local.local.diff_size,
                "local differential state",
                0,
            )?;
            let dstate = optional_region(
                owner.local_dstate_dt(),
                local.diff_offset,
                local.local.diff_size,
                "local differential derivative",
                0,
            )?;
            Ok((state, dstate))
        };

        let (alg_state, diff_state, dstate_dt);
        if mode.is_local() {
            alg_offset = local.alg_offset;
            diff_offset = local.diff_offset;
            alg_state = local_alg()?;
            (diff_state, dstate_dt) = local_diff()?;
        } else if mode.is_dae() {
            alg_state = region(sd.state, alg_offset, alg_size, "algebraic state", slot)?;
            diff_state = region(sd.state, diff_offset, diff_size, "differential state", slot)?;
            dstate_dt = optional_region(
                sd.dstate_dt,
                diff_offset,
                diff_size,
                "differential derivative",
                slot,
            )?;
        } else if mode.has_algebraic() {
            alg_state = region(sd.state, alg_offset, alg_size, "algebraic state", slot)?;
            let paired = sd
                .pair_index
                .zip(sd.diff_state)
                .and_then(|(pair, arr)| self.slot(pair).map(|p| (p, arr)));
            match paired {
                Some((pair, arr)) => {
                    diff_offset = pair.diff_offset;
                    diff_state = region(
                        arr,
                        diff_offset,
                        pair.total.diff_size,
                        "paired differential state",
                        pair.mode.offset_index,
                    )?;
                    dstate_dt = optional_region(
                        sd.diff_dstate_dt.unwrap_or(&[]),
                        diff_offset,
                        pair.total.diff_size,
                        "paired differential derivative",
                        pair.mode.offset_index,
                    )?;
                }
                None => {
                    diff_offset = local.diff_offset;
                    (diff_state, dstate_dt) = local_diff()?;
                }
            }
            diff_size = 0;
        } else {
            diff_state = region(sd.state, diff_offset, diff_size, "differential state", slot)?;
            dstate_dt = optional_region(
                sd.dstate_dt,
                diff_offset,
                diff_size,
                "differential derivative",
                slot,
            )?;
            let paired = sd
                .pair_index
                .zip(sd.alg_state)
                .and_then(|(pair, arr)| self.slot(pair).map(|p| (p, arr)));
            match paired {
                Some((pair, arr)) => {
                    alg_offset = pair.alg_offset;
                    alg_state = region(
                        arr,
                        alg_offset,
                        pair.total.alg_size,
                        "paired algebraic state",
                        pair.mode.offset_index,
                    )?;
                }
                None => {
                    alg_offset = local.alg_offset;
                    alg_state = local_alg()?;
                }
            }
            alg_size = 0;
        }

        let (dest_alg, dest_diff) = match dest {
            Some(d) if !mode.is_local() => split_regions_mut(
                d,
                (so.alg_offset, alg_size),
                (so.diff_offset, diff_size),
                slot,
            )?,
            Some(d) => split_regions_mut(
                d,
                (local.alg_offset, local.local.alg_size),
                (local.diff_offset, local.local.diff_size),
                0,
            )?,
            None => (Default::default(), Default::default()),
        };

        Ok(Locations {
            time: sd.time,
            alg_offset,
            diff_offset,
            alg_size: alg_state.len(),
            diff_size: diff_state.len(),
            alg_state,
            diff_state,
            dstate_dt,
            dest_alg,
            dest_diff,
        })
    }

    /// Read-only view; destinations are empty.
    pub fn get_read_locations<'a>(
        &self,
        sd: &StateData<'a>,
        mode: &SolverMode,
        owner: &'a dyn LocalStateSource,
    ) -> IndexResult<Locations<'a>> {
        self.get_locations(sd, None, mode, owner)
    }

    /// Solver records subject to invalidation.
    ///
    /// The local record describes the object's own cache and is only rebuilt
    /// by its owner, so it never goes stale here.
    fn records_matching(&mut self, dynamic_only: bool) -> impl Iterator<Item = &mut SolverOffsets> {
        self.records
            .iter_mut()
            .flatten()
            .filter(move |so| !dynamic_only || so.mode.is_dynamic())
    }

    /// Mark every record (or only dynamic ones) as fully stale.
    pub fn unload(&mut self, dynamic_only: bool) {
        for so in self.records_matching(dynamic_only) {
            so.state_loaded = false;
            so.rj_loaded = false;
            so.offset_loaded = false;
        }
    }

    /// State sizes changed; offsets derived from them are stale too.
    pub fn state_unload(&mut self, dynamic_only: bool) {
        for so in self.records_matching(dynamic_only) {
            so.state_loaded = false;
            so.offset_loaded = false;
        }
    }

    /// Root or Jacobian counts changed; root offsets are stale too.
    pub fn rj_unload(&mut self, dynamic_only: bool) {
        for so in self.records_matching(dynamic_only) {
            so.rj_loaded = false;
            so.offset_loaded = false;
        }
    }

    /// Only the placement is stale; sizes remain valid.
    pub fn offset_unload(&mut self, dynamic_only: bool) {
        for so in self.records_matching(dynamic_only) {
            so.offset_loaded = false;
        }
    }

    /// Refresh the `local` sizes of every loaded record from `local_sizes`.
    ///
    /// Totals are adjusted by the difference, so no tree walk is needed. A
    /// record whose local sizes changed loses its offsets. Returns whether any
    /// record changed.
    pub fn local_update_all<F>(&mut self, dynamic_only: bool, local_sizes: F) -> bool
    where
        F: Fn(&SolverMode) -> StateSizes,
    {
        let mut changed = false;
        for so in self.records_matching(dynamic_only) {
            if !so.state_loaded {
                continue;
            }
            let fresh = local_sizes(&so.mode);
            if fresh == so.local {
                continue;
            }
            let (old, total) = (so.local, so.total);
            let swap = |t: usize, o: usize, f: usize| (t + f).saturating_sub(o);
            so.total = StateSizes {
                diff_size: swap(total.diff_size, old.diff_size, fresh.diff_size),
                alg_size: swap(total.alg_size, old.alg_size, fresh.alg_size),
                v_size: swap(total.v_size, old.v_size, fresh.v_size),
                a_size: swap(total.a_size, old.a_size, fresh.a_size),
                diff_roots: swap(total.diff_roots, old.diff_roots, fresh.diff_roots),
                alg_roots: swap(total.alg_roots, old.alg_roots, fresh.alg_roots),
                jac_size: swap(total.jac_size, old.jac_size, fresh.jac_size),
            };
            so.local = fresh;
            so.offset_loaded = false;
            changed = true;
        }
        changed
    }

    /// Mode stored at `index`, if that slot has been used.
    pub fn solver_mode(&self, index: usize) -> Option<&SolverMode> {
        self.slot(index).map(|so| &so.mode)
    }

    /// Stored mode matching `target` in everything but the slot.
    pub fn find(&self, target: &SolverMode) -> Option<&SolverMode> {
        self.iter()
            .map(|so| &so.mode)
            .find(|m| m.matches_except_index(target))
    }

    /// Offset in the named-parameter space used by sensitivity passes.
    ///
    /// Independent of every state category offset.
    pub fn param_offset(&self) -> Option<usize> {
        self.param_offset
    }

    pub fn set_param_offset(&mut self, offset: usize) {
        self.param_offset = Some(offset);
    }
}

impl Default for OffsetTable {
    fn default() -> Self {
        Self::new()
    }
}
