//! Dataset specification documents
//!
//! A specification describes the arguments a dataset was sampled over and
//! the `name_pattern` that maps one combination of argument values to a
//! resource address.

mod pattern;
mod validate;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use qv_core::{ParamValue, Parameter, ParameterKind, QuerySet};

use crate::DataError;

pub use pattern::{NamePattern, Segment};
pub use validate::{validate_document, Diagnostic, DiagnosticKind, ValidationReport};

/// Normalized definition of one argument
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArgumentSpec {
    pub label: String,
    #[serde(rename = "type")]
    pub kind: ParameterKind,
    pub values: Vec<ParamValue>,
    pub default: ParamValue,
}

/// A validated specification plus the directory its resources live in
#[derive(Debug, Clone)]
pub struct DatasetSpec {
    /// Arguments in document order
    pub arguments: IndexMap<String, ArgumentSpec>,
    pub metadata: Value,
    pub name_pattern: NamePattern,
    /// Prefix of every produced address, ends with `/` unless empty
    pub base_directory: String,
}

impl DatasetSpec {
    /// Build a fresh single-mode query set, every parameter at its default
    pub fn to_query_set(&self) -> Result<QuerySet, DataError> {
        let mut parameters = IndexMap::with_capacity(self.arguments.len());
        for (id, argument) in &self.arguments {
            let parameter = Parameter::new(
                argument.label.clone(),
                argument.kind,
                argument.values.clone(),
                argument.default.clone(),
            )?;
            parameters.insert(id.clone(), parameter);
        }
        Ok(QuerySet::new(parameters))
    }

    /// Prefix a substituted pattern with the base directory
    pub fn address(&self, relative: &str) -> String {
        format!("{}{}", self.base_directory, relative)
    }
}

/// Directory part of a document location, including the final `/`.
///
/// A location without any `/` has no directory part.
pub fn base_directory(location: &str) -> String {
    match location.rfind('/') {
        Some(index) => location[..=index].to_string(),
        None => String::new(),
    }
}
