//! gd-area: composite containers and the root driver of a grid tree.
//!
//! An [`Area`] owns terminals (buses, links), nested areas and monitors
//! (relays). It sizes and places its subtree in two passes, fans every solver
//! callback out to its children in one fixed order, and forwards cascading
//! alerts to its parent. [`GridSystem`] wraps the root area and re-runs the
//! passes whenever a structural change left a configuration stale.
//!
//! # Example
//!
//! ```
//! use gd_area::{Area, GridObject, GridSystem};
//! use gd_index::SolverMode;
//! use gd_model::StateBlock;
//!
//! let mut system = GridSystem::new("grid");
//! system.add(GridObject::terminal(StateBlock::bus("b1"))).unwrap();
//! let mut east = Area::new("east");
//! east.add(GridObject::terminal(StateBlock::bus("b2"))).unwrap();
//! system.add(east).unwrap();
//!
//! // Each bus carries one voltage and one angle state.
//! assert_eq!(system.state_size(&SolverMode::POWER_FLOW), 4);
//! let names = system.state_names(&SolverMode::POWER_FLOW);
//! assert_eq!(names[0], "grid::b1:voltage");
//! assert_eq!(names[3], "grid::east::b2:angle");
//! ```

pub mod area;
pub mod assembly;
pub mod error;
pub mod export;
pub mod object;
pub mod options;
pub mod system;

pub use area::{Area, ComponentMut, ComponentRef};
pub use error::{AddError, AreaError, AreaResult};
pub use object::{Category, GridObject};
pub use options::AreaOptions;
pub use system::{GridSystem, LayoutEntry};
