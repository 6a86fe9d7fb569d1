//! Validation and normalization of dataset specification documents

use std::cmp::Ordering;
use std::fmt;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

use qv_core::{ParamValue, ParameterKind};

use super::{ArgumentSpec, DatasetSpec, NamePattern};

/// Category of a specification problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// `arguments`, `metadata` or `name_pattern` is absent
    MissingField,
    /// `arguments` is not an object
    ArgumentsNotObject,
    PatternNotText,
    /// A `{name}` placeholder without a matching argument
    UnknownPlaceholder,
    /// An argument lacks `label`, `default` or `values`
    MissingAttribute,
    ValuesNotList,
    /// A value that is neither a number, a string nor a boolean
    InvalidValue,
    NotNumeric,
    DefaultNotContained,
    UnknownType,
}

/// One problem found in a specification document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Argument id the problem belongs to, if any
    pub argument: Option<String>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.argument {
            Some(argument) => write!(f, "argument '{}': {}", argument, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Outcome of validating one document
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub diagnostics: Vec<Diagnostic>,
    /// Normalized specification, present only when there are no diagnostics
    pub spec: Option<DatasetSpec>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.diagnostics.is_empty() && self.spec.is_some()
    }
}

/// Collects diagnostics while walking a document
#[derive(Default)]
struct Collector {
    diagnostics: Vec<Diagnostic>,
}

impl Collector {
    fn report(&mut self, kind: DiagnosticKind, argument: Option<&str>, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            kind,
            argument: argument.map(str::to_string),
            message: message.into(),
        };
        tracing::error!("specification does not meet the dataset format: {}", diagnostic);
        self.diagnostics.push(diagnostic);
    }
}

/// Validate `document` and build the normalized specification.
///
/// Every violation is reported (and logged) before returning; the document
/// itself is never modified.
pub fn validate_document(document: &Value, base_directory: &str) -> ValidationReport {
    let mut collector = Collector::default();

    let Some(root) = document.as_object() else {
        collector.report(DiagnosticKind::MissingField, None, "document is not an object");
        return ValidationReport { diagnostics: collector.diagnostics, spec: None };
    };

    for field in ["arguments", "metadata", "name_pattern"] {
        if !root.contains_key(field) {
            collector.report(
                DiagnosticKind::MissingField,
                None,
                format!("document has no attribute '{}'", field),
            );
        }
    }

    let empty = Map::new();
    let arguments = match root.get("arguments") {
        Some(Value::Object(arguments)) => arguments,
        Some(_) => {
            collector.report(DiagnosticKind::ArgumentsNotObject, None, "'arguments' is not an object");
            &empty
        }
        None => &empty,
    };

    let pattern = match root.get("name_pattern") {
        Some(Value::String(source)) => match NamePattern::parse(source) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                collector.report(DiagnosticKind::PatternNotText, None, e.to_string());
                None
            }
        },
        Some(_) => {
            collector.report(DiagnosticKind::PatternNotText, None, "'name_pattern' is not a string");
            None
        }
        None => None,
    };

    if let Some(pattern) = &pattern {
        for name in pattern.placeholders() {
            if !arguments.contains_key(name) {
                collector.report(
                    DiagnosticKind::UnknownPlaceholder,
                    None,
                    format!("placeholder '{{{}}}' in name_pattern is not specified in arguments", name),
                );
            }
        }
    }

    let mut normalized = IndexMap::new();
    for (id, definition) in arguments {
        if let Some(argument) = normalize_argument(&mut collector, id, definition) {
            normalized.insert(id.clone(), argument);
        }
    }

    let spec = match pattern {
        Some(name_pattern) if collector.diagnostics.is_empty() => Some(DatasetSpec {
            arguments: normalized,
            metadata: root.get("metadata").cloned().unwrap_or(Value::Null),
            name_pattern,
            base_directory: base_directory.to_string(),
        }),
        _ => None,
    };

    if spec.is_some() {
        tracing::info!(arguments = arguments.len(), "valid dataset specification");
    }

    ValidationReport {
        diagnostics: collector.diagnostics,
        spec,
    }
}

/// Check one argument definition and return its normalized form
fn normalize_argument(collector: &mut Collector, id: &str, definition: &Value) -> Option<ArgumentSpec> {
    let arg = Some(id);
    let Some(definition) = definition.as_object() else {
        collector.report(DiagnosticKind::MissingAttribute, arg, "definition is not an object");
        return None;
    };

    for attribute in ["label", "default", "values"] {
        if !definition.contains_key(attribute) {
            collector.report(
                DiagnosticKind::MissingAttribute,
                arg,
                format!("parameter has no '{}'", attribute),
            );
        }
    }

    let label = match definition.get("label") {
        Some(Value::String(label)) => label.clone(),
        Some(other) => other.to_string(),
        None => id.to_string(),
    };

    let raw_values: &[Value] = match definition.get("values") {
        Some(Value::Array(values)) => values,
        Some(_) => {
            collector.report(DiagnosticKind::ValuesNotList, arg, "'values' is not a list");
            &[]
        }
        None => &[],
    };
    let raw_default = definition.get("default");

    let kind = match definition.get("type").and_then(Value::as_str).and_then(ParameterKind::parse) {
        Some(kind) => kind,
        None => {
            let found = definition.get("type").map(Value::to_string).unwrap_or_else(|| "none".into());
            collector.report(DiagnosticKind::UnknownType, arg, format!("unknown parameter type {}", found));
            return None;
        }
    };

    match kind {
        ParameterKind::Boolean => {
            let default = if raw_default.map(is_truthy).unwrap_or(false) { 1 } else { 0 };
            Some(ArgumentSpec {
                label,
                kind,
                values: vec![ParamValue::from(0), ParamValue::from(1)],
                default: ParamValue::from(default),
            })
        }
        ParameterKind::Range => {
            let mut values = Vec::with_capacity(raw_values.len());
            let mut all_numeric = true;
            for raw in raw_values {
                match ParamValue::from_json(raw).filter(ParamValue::is_numeric) {
                    Some(value) => values.push(value),
                    None => all_numeric = false,
                }
            }
            if !all_numeric {
                collector.report(
                    DiagnosticKind::NotNumeric,
                    arg,
                    "parameter is of type 'range' but members of its values are not numeric",
                );
            }

            let default = raw_default.and_then(ParamValue::from_json).filter(ParamValue::is_numeric);
            let Some(default) = default else {
                if raw_default.is_some() {
                    collector.report(DiagnosticKind::NotNumeric, arg, "default value of range parameter is not numeric");
                }
                return None;
            };
            if !values.iter().any(|v| v.numerically_eq(&default)) {
                collector.report(
                    DiagnosticKind::DefaultNotContained,
                    arg,
                    format!("default value {} is not contained in values", default),
                );
            }

            values.sort_by(|a, b| match (a.as_f64(), b.as_f64()) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                _ => Ordering::Equal,
            });

            Some(ArgumentSpec { label, kind, values, default })
        }
        ParameterKind::Set => {
            let mut values = Vec::with_capacity(raw_values.len());
            for raw in raw_values {
                match ParamValue::from_json(raw) {
                    Some(value) => values.push(value),
                    None => collector.report(
                        DiagnosticKind::InvalidValue,
                        arg,
                        format!("value {} is not a scalar", raw),
                    ),
                }
            }

            let default = raw_default.and_then(ParamValue::from_json);
            let Some(default) = default else {
                if let Some(raw) = raw_default {
                    collector.report(DiagnosticKind::InvalidValue, arg, format!("default value {} is not a scalar", raw));
                }
                return None;
            };
            if !values.contains(&default) {
                collector.report(
                    DiagnosticKind::DefaultNotContained,
                    arg,
                    format!("default value {} is not contained in values", default),
                );
            }

            Some(ArgumentSpec { label, kind, values, default })
        }
    }
}

/// JSON truthiness: `false`, `0`, `""` and `null` are false
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|n| n != 0.0 && !n.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kinds(report: &ValidationReport) -> Vec<DiagnosticKind> {
        report.diagnostics.iter().map(|d| d.kind).collect()
    }

    #[test]
    fn test_range_values_are_sorted() {
        let doc = json!({
            "arguments": {
                "theta": { "label": "Theta", "type": "range", "values": [30, "0", 15], "default": 15 }
            },
            "metadata": {},
            "name_pattern": "{theta}.png"
        });
        let report = validate_document(&doc, "data/");
        assert!(report.is_valid());

        let spec = report.spec.unwrap();
        let theta = &spec.arguments["theta"];
        assert_eq!(theta.values, vec![ParamValue::from("0"), ParamValue::from(15), ParamValue::from(30)]);
        assert_eq!(theta.default, ParamValue::from(15));
        assert_eq!(spec.base_directory, "data/");
    }

    #[test]
    fn test_boolean_is_normalized() {
        for (raw, expected) in [(json!(true), 1), (json!(0), 0), (json!(""), 0), (json!(null), 0), (json!("yes"), 1)] {
            let doc = json!({
                "arguments": {
                    "lit": { "label": "Lit", "type": "boolean", "values": ["whatever"], "default": raw }
                },
                "metadata": null,
                "name_pattern": "{lit}"
            });
            let spec = validate_document(&doc, "").spec.unwrap();
            let lit = &spec.arguments["lit"];
            assert_eq!(lit.values, vec![ParamValue::from(0), ParamValue::from(1)]);
            assert_eq!(lit.default, ParamValue::from(expected));
        }
    }

    #[test]
    fn test_collects_every_problem() {
        let doc = json!({
            "arguments": {
                "theta": { "type": "range", "values": [0, "a"], "default": 5 },
                "material": { "label": "Material", "type": "set", "values": ["gold"], "default": "tin" },
                "odd": { "label": "Odd", "type": "spline", "values": [], "default": 0 }
            },
            "name_pattern": "{theta}_{phi}.png"
        });
        let report = validate_document(&doc, "");

        assert!(!report.is_valid());
        assert!(report.spec.is_none());
        let kinds = kinds(&report);
        assert!(kinds.contains(&DiagnosticKind::MissingField));
        assert!(kinds.contains(&DiagnosticKind::UnknownPlaceholder));
        assert!(kinds.contains(&DiagnosticKind::MissingAttribute));
        assert!(kinds.contains(&DiagnosticKind::NotNumeric));
        assert!(kinds.contains(&DiagnosticKind::DefaultNotContained));
        assert!(kinds.contains(&DiagnosticKind::UnknownType));

        let material = report
            .diagnostics
            .iter()
            .find(|d| d.argument.as_deref() == Some("material"))
            .unwrap();
        assert_eq!(material.kind, DiagnosticKind::DefaultNotContained);
    }

    #[test]
    fn test_missing_type_is_an_error() {
        let doc = json!({
            "arguments": { "a": { "label": "A", "values": [1], "default": 1 } },
            "metadata": {},
            "name_pattern": "{a}"
        });
        assert_eq!(kinds(&validate_document(&doc, "")), vec![DiagnosticKind::UnknownType]);
    }

    #[test]
    fn test_non_object_document() {
        let report = validate_document(&json!([1, 2]), "");
        assert!(!report.is_valid());
        assert_eq!(kinds(&report), vec![DiagnosticKind::MissingField]);
    }
}
