//! Indexing-consistency errors.

use gd_core::GdError;
use thiserror::Error;

/// Errors raised when a flat-array view cannot be built safely.
///
/// These reflect a missing sizing or offset pass, not bad solver data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("{what} not loaded for solver mode slot {mode}")]
    NotLoaded { what: &'static str, mode: usize },

    #[error("{what} region [{start}, {end}) exceeds array of length {len}")]
    OutOfRange {
        what: &'static str,
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("destination regions overlap: [{first_start}, {first_end}) and [{second_start}, {second_end})")]
    OverlappingRegions {
        first_start: usize,
        first_end: usize,
        second_start: usize,
        second_end: usize,
    },
}

pub type IndexResult<T> = Result<T, IndexError>;

impl From<IndexError> for GdError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::OutOfRange { what, end, len, .. } => GdError::OutOfRange { what, end, len },
            other => GdError::Unplaced {
                what: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = IndexError::NotLoaded {
            what: "offsets",
            mode: 2,
        };
        assert!(err.to_string().contains("slot 2"));
    }

    #[test]
    fn out_of_range_keeps_its_bounds() {
        let err = IndexError::OutOfRange {
            what: "algebraic state",
            start: 4,
            end: 9,
            len: 6,
        };
        let gd: GdError = err.into();
        assert_eq!(
            gd,
            GdError::OutOfRange {
                what: "algebraic state",
                end: 9,
                len: 6
            }
        );
    }
}
