//! Core model for the query viewer
//!
//! This crate provides the parameter/query model that every other crate
//! builds on: dataset parameters, the query set that groups them, and the
//! synchronous change notification they use.

pub mod events;
pub mod image;
pub mod parameter;
pub mod query;

use thiserror::Error;

// Re-export commonly used types
pub use events::{Signal, SubscriptionId};
pub use image::{DecodedImage, ImageSlot};
pub use parameter::{ParamValue, Parameter, ParameterKind, Query};
pub use query::{QueryEvent, QueryMode, QuerySet, QuerySnapshot, QuerySubscriber};

/// Errors raised by the parameter/query model
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),

    #[error("value {value} is not one of the values of parameter '{label}'")]
    ValueNotAllowed { label: String, value: String },

    #[error("parameter '{label}' is {expected} but a {found} query was given")]
    ModeMismatch {
        label: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("parameter '{0}' was written while notifying its own listeners")]
    ReentrantWrite(String),

    #[error("default value {value} of parameter '{label}' is not one of its values")]
    DefaultNotInValues { label: String, value: String },

    #[error("parameter '{0}' has no values")]
    NoValues(String),

    #[error("index {index} is out of range for parameter '{label}'")]
    IndexOutOfRange { label: String, index: usize },

    #[error("matrix axes must differ, got '{0}' twice")]
    SameAxis(String),

    #[error("matrix mode needs at least 2 parameters, the query set has {0}")]
    NotEnoughParameters(usize),
}
