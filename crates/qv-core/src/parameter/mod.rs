//! Dataset parameters
//!
//! A [`Parameter`] is one named axis of the dataset: the discrete values that
//! were sampled along it and the value(s) currently selected by the user.

use std::sync::atomic::{AtomicBool, Ordering};
use parking_lot::RwLock;
use serde::{Serialize, Deserialize};

use crate::events::{Signal, SubscriptionId};
use crate::QueryError;

mod value;

pub use value::ParamValue;

/// How the values of a parameter are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    /// Numeric axis, values sorted ascending
    Range,
    /// Unordered set of labels, specification order
    Set,
    /// Two-valued switch, values are always `[0, 1]`
    Boolean,
}

impl ParameterKind {
    /// Parse the `type` field of a dataset specification
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "range" => Some(ParameterKind::Range),
            "set" => Some(ParameterKind::Set),
            "boolean" => Some(ParameterKind::Boolean),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterKind::Range => "range",
            ParameterKind::Set => "set",
            ParameterKind::Boolean => "boolean",
        }
    }
}

/// Current selection of a parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Query {
    /// A single value; the parameter is fixed
    Fixed(ParamValue),
    /// An ordered selection; the parameter is a matrix axis
    Variable(Vec<ParamValue>),
}

impl Query {
    pub fn is_variable(&self) -> bool {
        matches!(self, Query::Variable(_))
    }

    /// All selected values, in order
    pub fn values(&self) -> &[ParamValue] {
        match self {
            Query::Fixed(value) => std::slice::from_ref(value),
            Query::Variable(values) => values,
        }
    }

    /// First selected value
    pub fn first(&self) -> Option<&ParamValue> {
        self.values().first()
    }

    fn mode_name(&self) -> &'static str {
        if self.is_variable() { "variable" } else { "fixed" }
    }
}

impl From<ParamValue> for Query {
    fn from(value: ParamValue) -> Self {
        Query::Fixed(value)
    }
}

impl From<Vec<ParamValue>> for Query {
    fn from(values: Vec<ParamValue>) -> Self {
        Query::Variable(values)
    }
}

/// One named axis of the dataset
#[derive(Debug)]
pub struct Parameter {
    label: String,
    kind: ParameterKind,
    values: Vec<ParamValue>,
    default: ParamValue,
    query: RwLock<Query>,
    /// Set while change listeners run
    notifying: AtomicBool,
    changed: Signal<Query>,
}

impl Parameter {
    /// Create a fixed parameter whose query starts at `default`
    pub fn new(
        label: impl Into<String>,
        kind: ParameterKind,
        values: Vec<ParamValue>,
        default: ParamValue,
    ) -> Result<Self, QueryError> {
        let label = label.into();
        if values.is_empty() {
            return Err(QueryError::NoValues(label));
        }

        let parameter = Self {
            label,
            kind,
            values,
            default: default.clone(),
            query: RwLock::new(Query::Fixed(default.clone())),
            notifying: AtomicBool::new(false),
            changed: Signal::new(),
        };

        if parameter.index_of(&default).is_none() {
            return Err(QueryError::DefaultNotInValues {
                label: parameter.label,
                value: default.to_string(),
            });
        }

        Ok(parameter)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> ParameterKind {
        self.kind
    }

    pub fn values(&self) -> &[ParamValue] {
        &self.values
    }

    pub fn default_value(&self) -> &ParamValue {
        &self.default
    }

    /// Current query (cloned)
    pub fn query(&self) -> Query {
        self.query.read().clone()
    }

    /// Whether the parameter currently acts as a matrix axis
    pub fn is_variable(&self) -> bool {
        self.query.read().is_variable()
    }

    /// Position of `value` in `values`. Range values compare numerically.
    pub fn index_of(&self, value: &ParamValue) -> Option<usize> {
        match self.kind {
            ParameterKind::Range => self.values.iter().position(|v| v.numerically_eq(value)),
            _ => self.values.iter().position(|v| v == value),
        }
    }

    pub fn contains(&self, value: &ParamValue) -> bool {
        self.index_of(value).is_some()
    }

    /// Numeric bounds of the value set, if any value is numeric
    pub fn numeric_bounds(&self) -> Option<(f64, f64)> {
        self.values
            .iter()
            .filter_map(ParamValue::as_f64)
            .fold(None, |bounds, v| match bounds {
                None => Some((v, v)),
                Some((min, max)) => Some((min.min(v), max.max(v))),
            })
    }

    /// Replace the query and notify listeners.
    ///
    /// Only the class invariant is checked: every value must belong to
    /// `values`, and the query must stay fixed or variable as it currently is.
    /// Writing from inside one of this parameter's own listeners is rejected.
    pub fn set_value(&self, query: impl Into<Query>) -> Result<(), QueryError> {
        let query = query.into();

        if self.notifying.load(Ordering::SeqCst) {
            tracing::error!(parameter = %self.label, "re-entrant write from a change listener");
            return Err(QueryError::ReentrantWrite(self.label.clone()));
        }

        {
            let current = self.query.read();
            if current.is_variable() != query.is_variable() {
                return Err(QueryError::ModeMismatch {
                    label: self.label.clone(),
                    expected: current.mode_name(),
                    found: query.mode_name(),
                });
            }
        }

        if let Some(value) = query.values().iter().find(|v| !self.contains(v)) {
            return Err(QueryError::ValueNotAllowed {
                label: self.label.clone(),
                value: value.to_string(),
            });
        }

        *self.query.write() = query.clone();
        tracing::trace!(parameter = %self.label, ?query, "query changed");

        self.notifying.store(true, Ordering::SeqCst);
        self.changed.emit(&query);
        self.notifying.store(false, Ordering::SeqCst);

        Ok(())
    }

    /// Replace the query without notification, switching fixed/variable.
    /// Used when a query set moves its matrix axes.
    pub(crate) fn rehome(&self, query: Query) {
        *self.query.write() = query;
    }

    /// Select `values[index]` (slider input)
    pub fn set_index(&self, index: usize) -> Result<(), QueryError> {
        let value = self.value_at(index)?;
        self.set_value(value)
    }

    /// Select the contiguous run `values[lo..=hi]` (min/max input).
    /// When `lo > hi` the upper end is raised to `lo`.
    pub fn select_index_range(&self, lo: usize, hi: usize) -> Result<(), QueryError> {
        let hi = hi.max(lo);
        self.value_at(hi)?;
        self.set_value(self.values[lo..=hi].to_vec())
    }

    /// Append `value` to a variable selection unless it is already selected
    pub fn push_variable(&self, value: ParamValue) -> Result<bool, QueryError> {
        let mut selection = self.variable_selection()?;
        if selection.iter().any(|v| v == &value) {
            return Ok(false);
        }
        selection.push(value);
        self.set_value(selection)?;
        Ok(true)
    }

    /// Remove `value` from a variable selection. The last element is kept.
    pub fn remove_variable(&self, value: &ParamValue) -> Result<bool, QueryError> {
        let mut selection = self.variable_selection()?;
        if selection.len() < 2 {
            return Ok(false);
        }
        let Some(index) = selection.iter().position(|v| v == value) else {
            return Ok(false);
        };
        selection.remove(index);
        self.set_value(selection)?;
        Ok(true)
    }

    /// Move the selected value at `from` so it ends up at position `to` (drag and drop)
    pub fn move_variable(&self, from: usize, to: usize) -> Result<(), QueryError> {
        let mut selection = self.variable_selection()?;
        if from >= selection.len() || to >= selection.len() {
            return Err(QueryError::IndexOutOfRange {
                label: self.label.clone(),
                index: from.max(to),
            });
        }
        let value = selection.remove(from);
        selection.insert(to, value);
        self.set_value(selection)
    }

    /// Return a fixed parameter to its default value
    pub fn reset(&self) -> Result<(), QueryError> {
        match self.query() {
            Query::Fixed(_) => self.set_value(self.default.clone()),
            Query::Variable(_) => self.set_value(vec![self.default.clone()]),
        }
    }

    /// Register a change listener
    pub fn on_change<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&Query) + Send + Sync + 'static,
    {
        self.changed.subscribe(listener)
    }

    /// Deregister a change listener
    pub fn remove_listener(&self, id: SubscriptionId) -> bool {
        self.changed.unsubscribe(id)
    }

    fn value_at(&self, index: usize) -> Result<ParamValue, QueryError> {
        self.values
            .get(index)
            .cloned()
            .ok_or_else(|| QueryError::IndexOutOfRange {
                label: self.label.clone(),
                index,
            })
    }

    fn variable_selection(&self) -> Result<Vec<ParamValue>, QueryError> {
        match self.query() {
            Query::Variable(values) => Ok(values),
            Query::Fixed(_) => Err(QueryError::ModeMismatch {
                label: self.label.clone(),
                expected: "fixed",
                found: "variable",
            }),
        }
    }
}
