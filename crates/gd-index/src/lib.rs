//! gd-index: offset bookkeeping between an object tree and flat solver arrays.
//!
//! Provides:
//! - Solver configurations (`SolverMode`) and a registry handing out slot indices
//! - Per-object state size counters (`StateSizes`)
//! - Offset records per configuration (`SolverOffsets`)
//! - The per-object table aggregating them (`OffsetTable`)
//! - Short-lived views into solver arrays (`StateData`, `Locations`)
//!
//! # Example
//!
//! ```
//! use gd_index::{OffsetTable, SolverMode, StateSizes};
//!
//! let mode = SolverMode::POWER_FLOW;
//! let mut table = OffsetTable::new();
//! let so = table.offsets_mut(&mode);
//! so.local = StateSizes { alg_size: 3, ..StateSizes::default() };
//! so.local_load(false);
//! table.set_offset(10, &mode);
//!
//! assert!(table.is_loaded(&mode));
//! assert_eq!(table.alg_offset(&mode), Some(10));
//! assert_eq!(table.max_index(&mode), Some(12));
//! ```

pub mod error;
pub mod offsets;
pub mod sizes;
pub mod solver_mode;
pub mod state_data;
pub mod table;

pub use error::{IndexError, IndexResult};
pub use offsets::SolverOffsets;
pub use sizes::StateSizes;
pub use solver_mode::{SolverMode, SolverModeRegistry};
pub use state_data::{LocalStateSource, Locations, StateData};
pub use table::OffsetTable;

/// Marker written by `get_variable_type` for algebraic entries.
pub const ALGEBRAIC_VARIABLE: f64 = 0.0;

/// Marker written by `get_variable_type` for differential entries.
pub const DIFFERENTIAL_VARIABLE: f64 = 1.0;
