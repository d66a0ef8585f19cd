//! Error types for container operations.

use gd_core::{GdError, ObjectId};
use gd_index::IndexError;
use gd_model::{ComponentKind, ModelError};
use thiserror::Error;

use crate::object::{Category, GridObject};

/// Errors raised by structural operations on an area.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AreaError {
    #[error("{name} is already owned by {parent}")]
    AlreadyOwned { name: String, parent: ObjectId },

    #[error("{name} is already a member")]
    AlreadyMember { name: String },

    #[error("An object named {name} already exists in this area")]
    DuplicateName { name: String },

    #[error("{kind} {name} cannot be added as a {category}")]
    CategoryNotAccepted {
        name: String,
        kind: ComponentKind,
        category: Category,
    },

    #[error("Object {id} is not a member")]
    NotMember { id: ObjectId },

    #[error(transparent)]
    Model(#[from] ModelError),
}

pub type AreaResult<T> = Result<T, AreaError>;

impl From<IndexError> for AreaError {
    fn from(e: IndexError) -> Self {
        AreaError::Model(e.into())
    }
}

/// A rejected `add`, handing the object back to the caller.
#[derive(Error, Debug)]
#[error("{reason}")]
pub struct AddError {
    pub reason: AreaError,
    pub object: GridObject,
}

impl AddError {
    pub fn into_object(self) -> GridObject {
        self.object
    }
}

impl From<AddError> for AreaError {
    fn from(e: AddError) -> Self {
        e.reason
    }
}

impl From<AreaError> for GdError {
    fn from(e: AreaError) -> Self {
        match e {
            AreaError::Model(inner) => inner.into(),
            other => GdError::Structure {
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
        let err = AreaError::DuplicateName { name: "bus1".into() };
        assert!(err.to_string().contains("bus1"));
    }

    #[test]
    fn index_errors_convert() {
        let err: AreaError = IndexError::NotLoaded {
            what: "offsets",
            mode: 1,
        }
        .into();
        assert!(matches!(err, AreaError::Model(ModelError::Index(_))));
        let gd: GdError = err.into();
        assert!(matches!(gd, GdError::Unplaced { .. }));
    }
}
