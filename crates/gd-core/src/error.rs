//! Error shared by every layer of the grid tree.
//!
//! Each crate keeps its own precise error type; this one is what they
//! flatten into at the workspace boundary (CLI, solver adapters).

use thiserror::Error;

pub type GdResult<T> = Result<T, GdError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GdError {
    #[error("{what} must be finite, got {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("{what} must be a non-negative whole number, got {value}")]
    InvalidCount { what: &'static str, value: f64 },

    #[error("parameter rejected: {what}")]
    Parameter { what: String },

    /// A view reached past the end of a solver array.
    #[error("{what} region ends at {end} but the array holds {len} entries")]
    OutOfRange {
        what: &'static str,
        end: usize,
        len: usize,
    },

    /// Offsets were read before the sizing and placement passes ran.
    #[error("offsets unusable: {what}")]
    Unplaced { what: String },

    #[error("tree change rejected: {what}")]
    Structure { what: String },

    #[error("layout check failed: {what}")]
    Layout { what: String },
}
