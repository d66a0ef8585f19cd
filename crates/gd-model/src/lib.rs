//! gd-model: the component contract shared by every node of a grid tree.
//!
//! Provides:
//! - The `GridComponent` trait and the `ObjectCore` every component embeds
//! - Operation flags and the alert catalogue with its dispatch table
//! - A sparse Jacobian accumulator (`ArrayData`)
//! - Check and reset levels for work between solver steps
//! - `StateBlock`, a configurable leaf used to populate trees
//!
//! # Example
//!
//! ```
//! use gd_index::{SolverMode, StateData};
//! use gd_model::{GridComponent, StateBlock};
//!
//! let mode = SolverMode::POWER_FLOW;
//! let mut block = StateBlock::link("l1").with_states(2, 0).with_setpoint(1.0);
//! block.load_sizes(&mode, false);
//! block.set_offset(0, &mode);
//!
//! let state = [1.5, 0.5];
//! let mut resid = [0.0; 2];
//! block.residual(&StateData::new(0.0, &state, &[]), &mut resid, &mode).unwrap();
//! assert_eq!(resid, [0.5, -0.5]);
//! ```

pub mod alert;
pub mod array_data;
pub mod block;
pub mod check;
pub mod converge;
pub mod error;
pub mod flags;
pub mod object;
pub mod traits;

pub use alert::{AlertEvent, AlertKind, AlertPolicy, Invalidation};
pub use array_data::ArrayData;
pub use block::StateBlock;
pub use check::{ChangeCode, CheckLevel, ResetLevel};
pub use converge::ConvergeMode;
pub use error::{ModelError, ModelResult};
pub use flags::{OpFlag, OpFlags};
pub use object::{LocalRanges, ObjectCore, fill, read_at, write_at};
pub use traits::{ComponentKind, GridComponent};
