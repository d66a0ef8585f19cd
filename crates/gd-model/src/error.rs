//! Error types for component operations.

use gd_core::GdError;
use gd_index::IndexError;
use thiserror::Error;

/// Errors raised by components while sizing, assembling or configuring.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("Unknown parameter: {name}")]
    UnknownParameter { name: String },

    #[error("Invalid value {value} for parameter {name}")]
    InvalidParameter { name: String, value: f64 },

    #[error("Not supported: {what}")]
    NotSupported { what: &'static str },
}

pub type ModelResult<T> = Result<T, ModelError>;

impl ModelError {
    pub fn unknown(name: &str) -> Self {
        ModelError::UnknownParameter {
            name: name.to_string(),
        }
    }

    pub fn invalid(name: &str, value: f64) -> Self {
        ModelError::InvalidParameter {
            name: name.to_string(),
            value,
        }
    }
}

impl From<ModelError> for GdError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::Index(inner) => inner.into(),
            ModelError::UnknownParameter { name } => GdError::Parameter {
                what: format!("unknown parameter {name}"),
            },
            ModelError::InvalidParameter { name, value } => GdError::Parameter {
                what: format!("invalid value {value} for {name}"),
            },
            ModelError::NotSupported { what } => GdError::Parameter {
                what: what.to_string(),
            },
        }
    }
}
