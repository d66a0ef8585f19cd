//! gd-core: shared foundation for the grid indexing workspace.
//!
//! Contains:
//! - ids (compact object identifiers and a process-wide allocator)
//! - numeric (Real, default tolerance, parameter checks)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;

pub use error::{GdError, GdResult};
pub use ids::*;
pub use numeric::*;
