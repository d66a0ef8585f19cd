//! Transient views into solver-owned arrays.

use crate::error::{IndexError, IndexResult};

/// Solver arrays for one callback at one point in simulated time.
#[derive(Debug, Clone, Copy)]
pub struct StateData<'a> {
    pub time: f64,
    /// State vector for the configuration being evaluated.
    pub state: &'a [f64],
    /// Time derivative of `state`; empty when the caller has none.
    pub dstate_dt: &'a [f64],
    /// Algebraic array of the paired configuration.
    pub alg_state: Option<&'a [f64]>,
    /// Differential array of the paired configuration.
    pub diff_state: Option<&'a [f64]>,
    /// Derivative of the paired differential array.
    pub diff_dstate_dt: Option<&'a [f64]>,
    /// Scaling of derivative terms in Jacobian assembly.
    pub cj: f64,
    /// Distinguishes successive evaluations for caching.
    pub seq_id: u64,
    /// Slot of the configuration the paired arrays belong to.
    pub pair_index: Option<usize>,
}

impl<'a> StateData<'a> {
    pub fn new(time: f64, state: &'a [f64], dstate_dt: &'a [f64]) -> Self {
        Self {
            time,
            state,
            dstate_dt,
            alg_state: None,
            diff_state: None,
            diff_dstate_dt: None,
            cj: 1.0,
            seq_id: 0,
            pair_index: None,
        }
    }

    pub fn with_cj(mut self, cj: f64) -> Self {
        self.cj = cj;
        self
    }

    pub fn with_seq_id(mut self, seq_id: u64) -> Self {
        self.seq_id = seq_id;
        self
    }

    /// Attach the algebraic array of a paired configuration.
    pub fn with_paired_algebraic(mut self, pair_index: usize, alg_state: &'a [f64]) -> Self {
        self.pair_index = Some(pair_index);
        self.alg_state = Some(alg_state);
        self
    }

    /// Attach the differential arrays of a paired configuration.
    pub fn with_paired_differential(
        mut self,
        pair_index: usize,
        diff_state: &'a [f64],
        diff_dstate_dt: &'a [f64],
    ) -> Self {
        self.pair_index = Some(pair_index);
        self.diff_state = Some(diff_state);
        self.diff_dstate_dt = Some(diff_dstate_dt);
        self
    }
}

/// An object's own cached state, laid out by its local offset record.
pub trait LocalStateSource {
    fn local_state(&self) -> &[f64];
    fn local_dstate_dt(&self) -> &[f64];
}

/// Read/write window for one object inside the solver arrays.
///
/// Built by [`OffsetTable::get_locations`](crate::OffsetTable::get_locations);
/// lives no longer than the callback that built it.
#[derive(Debug)]
pub struct Locations<'a> {
    pub time: f64,
    pub alg_offset: Option<usize>,
    pub diff_offset: Option<usize>,
    pub alg_size: usize,
    pub diff_size: usize,
    pub alg_state: &'a [f64],
    pub diff_state: &'a [f64],
    pub dstate_dt: &'a [f64],
    /// Destination for algebraic results; empty for read-only views.
    pub dest_alg: &'a mut [f64],
    /// Destination for differential results; empty for read-only views.
    pub dest_diff: &'a mut [f64],
}

pub(crate) fn region<'a>(
    array: &'a [f64],
    offset: Option<usize>,
    size: usize,
    what: &'static str,
    mode: usize,
) -> IndexResult<&'a [f64]> {
    if size == 0 {
        return Ok(&[]);
    }
    let start = offset.ok_or(IndexError::NotLoaded { what, mode })?;
    let end = start + size;
    array.get(start..end).ok_or(IndexError::OutOfRange {
        what,
        start,
        end,
        len: array.len(),
    })
}

/// Like [`region`] but an absent array yields an empty slice.
pub(crate) fn optional_region<'a>(
    array: &'a [f64],
    offset: Option<usize>,
    size: usize,
    what: &'static str,
    mode: usize,
) -> IndexResult<&'a [f64]> {
    if array.is_empty() {
        return Ok(&[]);
    }
    region(array, offset, size, what, mode)
}

/// Split two disjoint regions out of one destination array.
pub(crate) fn split_regions_mut<'a>(
    dest: &'a mut [f64],
    first: (Option<usize>, usize),
    second: (Option<usize>, usize),
    mode: usize,
) -> IndexResult<(&'a mut [f64], &'a mut [f64])> {
    let len = dest.len();
    let bounds = |(offset, size): (Option<usize>, usize),
                  what: &'static str|
     -> IndexResult<Option<(usize, usize)>> {
        if size == 0 {
            return Ok(None);
        }
        let start = offset.ok_or(IndexError::NotLoaded { what, mode })?;
        let end = start + size;
        if end > len {
            return Err(IndexError::OutOfRange {
                what,
                start,
                end,
                len,
            });
        }
        Ok(Some((start, end)))
    };
    let a = bounds(first, "algebraic destination")?;
    let b = bounds(second, "differential destination")?;

    match (a, b) {
        (None, None) => Ok((Default::default(), Default::default())),
        (Some((s, e)), None) => Ok((&mut dest[s..e], Default::default())),
        (None, Some((s, e))) => Ok((Default::default(), &mut dest[s..e])),
        (Some((s1, e1)), Some((s2, e2))) => {
            if e1 <= s2 {
                let (lo, hi) = dest.split_at_mut(s2);
                Ok((&mut lo[s1..e1], &mut hi[..e2 - s2]))
            } else if e2 <= s1 {
                let (lo, hi) = dest.split_at_mut(s1);
                Ok((&mut hi[..e1 - s1], &mut lo[s2..e2]))
            } else {
                Err(IndexError::OverlappingRegions {
                    first_start: s1,
                    first_end: e1,
                    second_start: s2,
                    second_end: e2,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_region_needs_no_offset() {
        let arr = [1.0, 2.0];
        assert!(region(&arr, None, 0, "x", 1).unwrap().is_empty());
        assert!(matches!(
            region(&arr, None, 1, "x", 1),
            Err(IndexError::NotLoaded { .. })
        ));
        assert!(matches!(
            region(&arr, Some(1), 2, "x", 1),
            Err(IndexError::OutOfRange { end: 3, .. })
        ));
    }

    #[test]
    fn split_handles_either_order() {
        let mut dest = [0.0; 6];
        {
            let (a, d) = split_regions_mut(&mut dest, (Some(4), 2), (Some(0), 3), 2).unwrap();
            a.fill(1.0);
            d.fill(2.0);
        }
        assert_eq!(dest, [2.0, 2.0, 2.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn split_rejects_overlap() {
        let mut dest = [0.0; 6];
        let err = split_regions_mut(&mut dest, (Some(0), 3), (Some(2), 2), 2).unwrap_err();
        assert!(matches!(err, IndexError::OverlappingRegions { .. }));
    }
}
