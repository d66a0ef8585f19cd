//! Offset records: where one object's states live for one configuration.

use crate::sizes::StateSizes;
use crate::solver_mode::SolverMode;

/// Base offsets and sizes of one object (and its descendants) for one mode.
///
/// Offsets are `None` until placed. Arithmetic on an unplaced offset keeps it
/// unplaced, so a missing offset pass can never turn into a valid index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverOffsets {
    pub mode: SolverMode,
    pub a_offset: Option<usize>,
    pub v_offset: Option<usize>,
    pub alg_offset: Option<usize>,
    pub diff_offset: Option<usize>,
    pub root_offset: Option<usize>,
    /// Sizes contributed by the object itself.
    pub local: StateSizes,
    /// Sizes including every descendant.
    pub total: StateSizes,
    pub state_loaded: bool,
    pub rj_loaded: bool,
    pub offset_loaded: bool,
}

fn shift(offset: Option<usize>, by: usize) -> Option<usize> {
    offset.map(|o| o + by)
}

fn region_end(offset: Option<usize>, size: usize) -> Option<usize> {
    if size == 0 {
        return None;
    }
    offset.map(|o| o + size - 1)
}

impl SolverOffsets {
    pub fn new(mode: SolverMode) -> Self {
        Self {
            mode,
            a_offset: None,
            v_offset: None,
            alg_offset: None,
            diff_offset: None,
            root_offset: None,
            local: StateSizes::default(),
            total: StateSizes::default(),
            state_loaded: false,
            rj_loaded: false,
            offset_loaded: false,
        }
    }

    /// Offsets for the root of a tree whose sizes are `total`.
    ///
    /// Voltages start at zero, followed by angles, other algebraic states and,
    /// in a combined DAE array, differential states. Differential-only modes
    /// start their array at zero.
    pub fn root_layout(mode: SolverMode, total: StateSizes) -> Self {
        let mut so = Self::new(mode);
        so.total = total;
        so.set_offset(0);
        so.root_offset = Some(0);
        so
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.mode);
    }

    pub fn root_and_jacobian_count_reset(&mut self) {
        self.local.root_and_jacobian_reset();
        self.total.root_and_jacobian_reset();
        self.rj_loaded = false;
    }

    pub fn state_reset(&mut self) {
        self.local.state_reset();
        self.total.state_reset();
        self.state_loaded = false;
        self.offset_loaded = false;
    }

    fn advance(&mut self, sizes: &StateSizes) {
        self.v_offset = shift(self.v_offset, sizes.v_size);
        self.a_offset = shift(self.a_offset, sizes.a_size);
        self.alg_offset = shift(self.alg_offset, sizes.alg_size);
        self.diff_offset = shift(self.diff_offset, sizes.diff_size);
        self.root_offset = shift(self.root_offset, sizes.root_count());
    }

    /// Step past this record's own local entries.
    pub fn increment(&mut self) {
        let local = self.local;
        self.advance(&local);
    }

    /// Step past everything `other` occupies, descendants included.
    pub fn increment_by(&mut self, other: &SolverOffsets) {
        self.advance(&other.total);
    }

    /// Step past only `other`'s own local entries.
    pub fn local_increment(&mut self, other: &SolverOffsets) {
        self.advance(&other.local);
    }

    pub fn add_sizes(&mut self, other: &SolverOffsets) {
        self.total.add(&other.total);
    }

    pub fn add_state_sizes(&mut self, other: &SolverOffsets) {
        self.total.add_state_sizes(&other.total);
    }

    pub fn add_root_and_jacobian_sizes(&mut self, other: &SolverOffsets) {
        self.total.add_root_and_jacobian_sizes(&other.total);
    }

    /// Base case of the sizing pass: the object has no descendants.
    pub fn local_load(&mut self, finished: bool) {
        self.total = self.local;
        self.state_loaded = true;
        self.rj_loaded = true;
        if finished {
            self.offset_loaded = true;
        }
    }

    /// Copy the base offsets of `other`; sizes are left alone.
    pub fn set_offsets(&mut self, other: &SolverOffsets) {
        self.a_offset = other.a_offset;
        self.v_offset = other.v_offset;
        self.alg_offset = other.alg_offset;
        self.diff_offset = other.diff_offset;
        self.root_offset = other.root_offset;
        self.offset_loaded = true;
    }

    /// Place the whole object as one contiguous block starting at `base`.
    ///
    /// Categories the mode does not carry stay unplaced. The root offset is
    /// assigned separately.
    pub fn set_offset(&mut self, base: usize) {
        let mut next = base;
        if self.mode.has_algebraic() {
            self.v_offset = Some(next);
            next += self.total.v_size;
            self.a_offset = Some(next);
            next += self.total.a_size;
            self.alg_offset = Some(next);
            next += self.total.alg_size;
        } else {
            self.v_offset = None;
            self.a_offset = None;
            self.alg_offset = None;
        }
        self.diff_offset = if self.mode.has_differential() {
            Some(next)
        } else {
            None
        };
        self.offset_loaded = true;
    }

    /// Highest flat index occupied by any state category, inclusive.
    pub fn max_index(&self) -> Option<usize> {
        [
            region_end(self.v_offset, self.total.v_size),
            region_end(self.a_offset, self.total.a_size),
            region_end(self.alg_offset, self.total.alg_size),
            region_end(self.diff_offset, self.total.diff_size),
        ]
        .into_iter()
        .flatten()
        .max()
    }

    /// One past the last root index of the subtree.
    pub fn root_end(&self) -> Option<usize> {
        shift(self.root_offset, self.total.root_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sized(mode: SolverMode, alg: usize, diff: usize) -> SolverOffsets {
        let mut so = SolverOffsets::new(mode);
        so.local.alg_size = alg;
        so.local.diff_size = diff;
        so.local_load(false);
        so
    }

    #[test]
    fn unplaced_offsets_stay_unplaced() {
        let mut so = SolverOffsets::new(SolverMode::DAE);
        so.local.alg_size = 4;
        so.increment();
        assert_eq!(so.alg_offset, None);
        assert_eq!(so.max_index(), None);
    }

    #[test]
    fn increment_variants_use_the_right_sizes() {
        let mut child = sized(SolverMode::DAE, 2, 1);
        child.total.alg_size = 5;

        let mut cursor = SolverOffsets::new(SolverMode::DAE);
        cursor.alg_offset = Some(10);
        cursor.diff_offset = Some(0);

        let mut by_total = cursor.clone();
        by_total.increment_by(&child);
        assert_eq!(by_total.alg_offset, Some(15));
        assert_eq!(by_total.diff_offset, Some(1));

        let mut by_local = cursor.clone();
        by_local.local_increment(&child);
        assert_eq!(by_local.alg_offset, Some(12));

        cursor.local.alg_size = 1;
        cursor.increment();
        assert_eq!(cursor.alg_offset, Some(11));
    }

    #[test]
    fn local_load_marks_states() {
        let mut so = sized(SolverMode::DAE, 3, 2);
        assert!(so.state_loaded && so.rj_loaded);
        assert!(!so.offset_loaded);
        assert_eq!(so.total, so.local);
        so.local_load(true);
        assert!(so.offset_loaded);
    }

    #[test]
    fn set_offset_lays_out_contiguously() {
        let mut so = sized(SolverMode::DAE, 3, 2);
        so.local.v_size = 1;
        so.local.a_size = 1;
        so.local_load(false);
        so.set_offset(7);
        assert_eq!(so.v_offset, Some(7));
        assert_eq!(so.a_offset, Some(8));
        assert_eq!(so.alg_offset, Some(9));
        assert_eq!(so.diff_offset, Some(12));
        assert_eq!(so.max_index(), Some(13));
    }

    #[test]
    fn differential_only_root_layout_starts_at_zero() {
        let mut total = StateSizes::default();
        total.diff_size = 4;
        let so = SolverOffsets::root_layout(SolverMode::DYN_DIFFERENTIAL, total);
        assert_eq!(so.diff_offset, Some(0));
        assert_eq!(so.alg_offset, None);
        assert_eq!(so.root_offset, Some(0));
        assert_eq!(so.max_index(), Some(3));
    }

    #[test]
    fn resets_preserve_mode() {
        let mut so = sized(SolverMode::DYN_ALGEBRAIC, 3, 0);
        so.set_offset(2);
        so.reset();
        assert_eq!(so, SolverOffsets::new(SolverMode::DYN_ALGEBRAIC));

        let mut so = sized(SolverMode::DAE, 3, 0);
        so.local.jac_size = 3;
        so.local_load(true);
        so.state_reset();
        assert!(!so.state_loaded && !so.offset_loaded && so.rj_loaded);
        assert_eq!(so.total.jac_size, 3);
        so.root_and_jacobian_count_reset();
        assert!(!so.rj_loaded);
        assert_eq!(so.total.jac_size, 0);
    }
}
