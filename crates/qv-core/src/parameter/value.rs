use std::fmt;
use serde::{Serialize, Deserialize};
use serde_json::Value;

/// A single sample value along a dataset axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Numeric value
    Number(f64),
    /// Textual value (may still be numeric, e.g. `"0.50"`)
    Text(String),
}

impl ParamValue {
    /// Convert a JSON scalar. Arrays, objects and null have no value form.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().map(ParamValue::Number),
            Value::String(s) => Some(ParamValue::Text(s.clone())),
            Value::Bool(b) => Some(ParamValue::Text(b.to_string())),
            _ => None,
        }
    }

    /// Numeric interpretation, if any. Text counts when it parses as a finite number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Number(n) if n.is_finite() => Some(*n),
            ParamValue::Number(_) => None,
            ParamValue::Text(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite()),
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.as_f64().is_some()
    }

    /// Equality by numeric value, falling back to exact equality for text
    pub fn numerically_eq(&self, other: &ParamValue) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Number(n) => write!(f, "{}", n),
            ParamValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Number(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Number(value as f64)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}
