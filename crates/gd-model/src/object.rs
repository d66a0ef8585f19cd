//! State shared by every component: identity, offsets, flags, local cache.

use std::ops::Range;

use gd_core::{DEFAULT_ABS_TOLERANCE, ObjectId, Real};
use gd_index::{IndexError, LocalStateSource, OffsetTable, SolverMode, StateSizes};

use crate::alert::{AlertEvent, AlertKind};
use crate::error::{ModelError, ModelResult};
use crate::flags::{OpFlag, OpFlags};

/// Flat index ranges of one object's own entries for one configuration.
///
/// Descendants are excluded. Categories the configuration does not carry are
/// empty ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalRanges {
    pub v: Range<usize>,
    pub a: Range<usize>,
    pub alg: Range<usize>,
    pub diff: Range<usize>,
    pub roots: Range<usize>,
}

fn range(offset: Option<usize>, size: usize) -> Range<usize> {
    match offset {
        Some(start) if size > 0 => start..start + size,
        _ => 0..0,
    }
}

impl LocalRanges {
    /// Every algebraic index in voltage, angle, other order.
    pub fn algebraic(&self) -> impl Iterator<Item = usize> + '_ {
        self.v.clone().chain(self.a.clone()).chain(self.alg.clone())
    }

    pub fn states(&self) -> impl Iterator<Item = usize> + '_ {
        self.algebraic().chain(self.diff.clone())
    }
}

/// Write `value` at every index of `indices`, failing if one is out of range.
pub fn fill(
    dest: &mut [f64],
    indices: impl IntoIterator<Item = usize>,
    value: f64,
    what: &'static str,
) -> ModelResult<()> {
    let len = dest.len();
    for i in indices {
        let slot = dest.get_mut(i).ok_or(IndexError::OutOfRange {
            what,
            start: i,
            end: i + 1,
            len,
        })?;
        *slot = value;
    }
    Ok(())
}

/// Bounds-checked read of one flat-array entry.
pub fn read_at(arr: &[f64], i: usize, what: &'static str) -> ModelResult<f64> {
    arr.get(i).copied().ok_or_else(|| {
        IndexError::OutOfRange {
            what,
            start: i,
            end: i + 1,
            len: arr.len(),
        }
        .into()
    })
}

/// Bounds-checked write of one flat-array entry.
pub fn write_at(arr: &mut [f64], i: usize, value: f64, what: &'static str) -> ModelResult<()> {
    let len = arr.len();
    let slot = arr.get_mut(i).ok_or(IndexError::OutOfRange {
        what,
        start: i,
        end: i + 1,
        len,
    })?;
    *slot = value;
    Ok(())
}

/// Copy `src[from]` to `dest[to]` for every pair where both indices exist.
fn copy_pairs(src: &[f64], dest: &mut [f64], pairs: impl Iterator<Item = (usize, usize)>) {
    for (from, to) in pairs {
        if let (Some(v), Some(slot)) = (src.get(from), dest.get_mut(to)) {
            *slot = *v;
        }
    }
}

/// Identity, bookkeeping and local state cache of one component.
#[derive(Debug, Clone)]
pub struct ObjectCore {
    pub id: ObjectId,
    pub name: String,
    pub user_id: u32,
    /// Container currently owning the object.
    pub parent: Option<ObjectId>,
    /// Position among siblings of the same category.
    pub seq_index: usize,
    pub enabled: bool,
    pub offsets: OffsetTable,
    pub flags: OpFlags,
    pub tolerance: Real,
    /// Local cache laid out by the `LOCAL` record.
    pub state: Vec<f64>,
    pub dstate_dt: Vec<f64>,
    outbox: Vec<AlertEvent>,
}

impl ObjectCore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ObjectId::next(),
            name: name.into(),
            user_id: 0,
            parent: None,
            seq_index: 0,
            enabled: true,
            offsets: OffsetTable::new(),
            flags: OpFlags::empty(),
            tolerance: DEFAULT_ABS_TOLERANCE,
            state: Vec::new(),
            dstate_dt: Vec::new(),
            outbox: Vec::new(),
        }
    }

    /// Queue an alert for the owning container.
    pub fn raise(&mut self, kind: AlertKind) {
        tracing::trace!(object = %self.name, ?kind, "alert raised");
        self.outbox.push(AlertEvent {
            source: self.id,
            kind,
        });
    }

    /// Queue an alert raised by someone else, keeping its source.
    pub fn forward(&mut self, event: AlertEvent) {
        self.outbox.push(event);
    }

    pub fn take_alerts(&mut self) -> Vec<AlertEvent> {
        std::mem::take(&mut self.outbox)
    }

    pub fn has_pending_alerts(&self) -> bool {
        !self.outbox.is_empty()
    }

    /// Set a flag; a changed cascading bit raises a flag-change alert.
    pub fn set_capability(&mut self, flag: OpFlag, value: bool) {
        let before = self.flags.contains(flag);
        self.flags.assign(flag, value);
        if flag.is_cascading() && before != value {
            self.raise(AlertKind::FlagChange);
        }
    }

    /// Lay the local cache out for `sizes` and resize it.
    pub fn reload_local(&mut self, sizes: StateSizes) {
        let so = self.offsets.local_mut();
        so.local = sizes;
        so.local_load(false);
        so.set_offset(0);
        so.root_offset = Some(0);
        self.state.resize(sizes.state_count(), 0.0);
        self.dstate_dt.resize(sizes.state_count(), 0.0);
    }

    /// Own entries for `mode`, or `None` before offsets are assigned.
    pub fn local_ranges(&self, mode: &SolverMode) -> Option<LocalRanges> {
        let so = self.offsets.offsets(mode).filter(|so| so.offset_loaded)?;
        let l = &so.local;
        Some(LocalRanges {
            v: range(so.v_offset, l.v_size),
            a: range(so.a_offset, l.a_size),
            alg: range(so.alg_offset, l.alg_size),
            diff: range(so.diff_offset, l.diff_size),
            roots: range(so.root_offset, l.root_count()),
        })
    }

    /// Like [`local_ranges`](Self::local_ranges) but an error when unplaced.
    pub fn require_ranges(&self, mode: &SolverMode) -> ModelResult<LocalRanges> {
        self.local_ranges(mode).ok_or(ModelError::Index(IndexError::NotLoaded {
            what: "offsets",
            mode: mode.offset_index,
        }))
    }

    /// Copy the own entries of the local cache into solver arrays for `mode`.
    pub fn copy_to_solver(&self, state: &mut [f64], dstate_dt: &mut [f64], mode: &SolverMode) {
        if mode.is_local() {
            return;
        }
        let (Some(dst), Some(src)) = (self.local_ranges(mode), self.local_ranges(&SolverMode::LOCAL))
        else {
            return;
        };
        for (d, s) in [(dst.v, src.v), (dst.a, src.a), (dst.alg, src.alg)] {
            copy_pairs(&self.state, state, s.zip(d));
        }
        copy_pairs(&self.state, state, src.diff.clone().zip(dst.diff.clone()));
        copy_pairs(&self.dstate_dt, dstate_dt, src.diff.zip(dst.diff));
    }

    /// Copy solver values for `mode` into the own entries of the local cache.
    pub fn copy_from_solver(&mut self, state: &[f64], dstate_dt: &[f64], mode: &SolverMode) {
        if mode.is_local() {
            return;
        }
        let (Some(src), Some(dst)) = (self.local_ranges(mode), self.local_ranges(&SolverMode::LOCAL))
        else {
            return;
        };
        for (s, d) in [(src.v, dst.v), (src.a, dst.a), (src.alg, dst.alg)] {
            copy_pairs(state, &mut self.state, s.zip(d));
        }
        copy_pairs(state, &mut self.state, src.diff.clone().zip(dst.diff.clone()));
        copy_pairs(dstate_dt, &mut self.dstate_dt, src.diff.zip(dst.diff));
    }

    pub fn write_variable_types(&self, sdata: &mut [f64], mode: &SolverMode) -> ModelResult<()> {
        let Some(r) = self.local_ranges(mode) else {
            return Ok(());
        };
        fill(sdata, r.algebraic(), gd_index::ALGEBRAIC_VARIABLE, "variable type")?;
        fill(sdata, r.diff.clone(), gd_index::DIFFERENTIAL_VARIABLE, "variable type")
    }

    pub fn write_tolerances(&self, tols: &mut [f64], mode: &SolverMode) -> ModelResult<()> {
        let Some(r) = self.local_ranges(mode) else {
            return Ok(());
        };
        fill(tols, r.states(), self.tolerance, "tolerance")
    }

    pub fn write_state_names(&self, names: &mut Vec<String>, mode: &SolverMode, prefix: &str) {
        let Some(r) = self.local_ranges(mode) else {
            return;
        };
        let base = format!("{prefix}{}", self.name);
        let labelled = r
            .v
            .clone()
            .map(|i| (i, format!("{base}:voltage")))
            .chain(r.a.clone().map(|i| (i, format!("{base}:angle"))))
            .chain(r.alg.clone().enumerate().map(|(k, i)| (i, format!("{base}:alg{k}"))))
            .chain(r.diff.clone().enumerate().map(|(k, i)| (i, format!("{base}:diff{k}"))));
        for (i, label) in labelled {
            if names.len() <= i {
                names.resize(i + 1, String::new());
            }
            names[i] = label;
        }
    }

    pub fn set(&mut self, param: &str, value: f64) -> ModelResult<()> {
        match param {
            "userid" | "id" => {
                self.user_id = gd_core::as_count(value, "userid")
                    .ok()
                    .and_then(|v| u32::try_from(v).ok())
                    .ok_or_else(|| ModelError::invalid(param, value))?;
            }
            "tolerance" | "tol" => {
                if !(value.is_finite() && value > 0.0) {
                    return Err(ModelError::invalid(param, value));
                }
                self.tolerance = value;
            }
            _ => return Err(ModelError::unknown(param)),
        }
        Ok(())
    }

    pub fn set_flag(&mut self, param: &str, value: bool) -> ModelResult<()> {
        match param {
            "enabled" => self.set_enabled(value),
            "disabled" => self.set_enabled(!value),
            _ => return Err(ModelError::unknown(param)),
        }
        Ok(())
    }

    pub fn get(&self, param: &str) -> ModelResult<f64> {
        match param {
            "userid" | "id" => Ok(f64::from(self.user_id)),
            "tolerance" | "tol" => Ok(self.tolerance),
            "enabled" => Ok(if self.enabled { 1.0 } else { 0.0 }),
            _ => Err(ModelError::unknown(param)),
        }
    }

    /// Toggling activity changes the number of contributing objects.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        self.offsets.unload(false);
        self.raise(if enabled {
            AlertKind::ObjectCountIncrease
        } else {
            AlertKind::ObjectCountDecrease
        });
    }
}

impl LocalStateSource for ObjectCore {
    fn local_state(&self) -> &[f64] {
        &self.state
    }

    fn local_dstate_dt(&self) -> &[f64] {
        &self.dstate_dt
    }
}
