//! Dataset specifications and query resolution for the query viewer

pub mod database;
pub mod result;
pub mod spec;

use thiserror::Error;

use qv_core::QueryError;

// Re-exports
pub use database::{AnyDatabase, Database, SpecADatabase};
pub use result::{MatrixCell, MatrixRow, ResourceDescriptor, ResourceKind, ResultData, ResultMatrix, ResultSet};
pub use spec::{ArgumentSpec, DatasetSpec, Diagnostic, DiagnosticKind, NamePattern, ValidationReport};

/// Errors that can occur while loading specifications or resolving queries
#[derive(Error, Debug)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid dataset specification ({} problem(s))", .0.len())]
    InvalidSpec(Vec<Diagnostic>),

    #[error("unsupported query mode: {0}")]
    UnsupportedMode(String),

    #[error("no dataset specification is loaded")]
    NotLoaded,

    #[error("query error: {0}")]
    Query(#[from] QueryError),
}
