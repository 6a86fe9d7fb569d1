//! Databases resolve a query set into addresses

mod spec_a;

use serde_json::Value;

use qv_core::QuerySet;

use crate::{DataError, ResultSet};

pub use spec_a::SpecADatabase;

/// A source of resources addressed by parameter combinations
pub trait Database: Send + Sync {
    /// Check a specification document. Logs every problem, never panics.
    fn validate(&self, document: &Value) -> bool;

    /// Build a query set over the loaded specification, every parameter at its default
    fn query_set(&self) -> Result<QuerySet, DataError>;

    /// Resolve the current state of `query_set`.
    ///
    /// Emits `Processed` on the query set on success.
    fn resolve(&self, query_set: &QuerySet) -> Result<ResultSet, DataError>;

    /// Resolve and hand the result to `callback`. The callback is not
    /// invoked when resolution fails.
    fn process_query<F>(&self, query_set: &QuerySet, callback: F)
    where
        F: FnOnce(ResultSet),
        Self: Sized,
    {
        match self.resolve(query_set) {
            Ok(result) => callback(result),
            Err(e) => tracing::error!("query not processed: {}", e),
        }
    }
}

/// Databases known to this workspace
#[derive(Debug, Clone)]
pub enum AnyDatabase {
    SpecA(SpecADatabase),
}

impl AnyDatabase {
    pub fn format_name(&self) -> &'static str {
        match self {
            AnyDatabase::SpecA(_) => "spec-a",
        }
    }
}

impl From<SpecADatabase> for AnyDatabase {
    fn from(database: SpecADatabase) -> Self {
        AnyDatabase::SpecA(database)
    }
}

impl Database for AnyDatabase {
    fn validate(&self, document: &Value) -> bool {
        match self {
            AnyDatabase::SpecA(db) => db.validate(document),
        }
    }

    fn query_set(&self) -> Result<QuerySet, DataError> {
        match self {
            AnyDatabase::SpecA(db) => db.query_set(),
        }
    }

    fn resolve(&self, query_set: &QuerySet) -> Result<ResultSet, DataError> {
        match self {
            AnyDatabase::SpecA(db) => db.resolve(query_set),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn database() -> AnyDatabase {
        let document = json!({
            "arguments": {
                "a": { "label": "A", "type": "range", "values": [1, 2], "default": 2 },
                "b": { "label": "B", "type": "set", "values": ["x", "y"], "default": "y" }
            },
            "metadata": {},
            "name_pattern": "{b}/{a}.png"
        });
        SpecADatabase::from_document(&document, "data/info.json").unwrap().into()
    }

    #[test]
    fn test_resolve_through_any_database() {
        let db = database();
        assert_eq!(db.format_name(), "spec-a");

        let qs = db.query_set().unwrap();
        let result = db.resolve(&qs).unwrap();
        assert_eq!(result.single().unwrap().address, "data/y/2.png");

        qs.enter_matrix_mode().unwrap();
        let result = db.resolve(&qs).unwrap();
        let matrix = result.matrix().unwrap();
        assert_eq!(matrix.cell_count(), 1);
        assert_eq!(matrix.iter().next().unwrap().2.address, "data/x/1.png");
    }

    #[test]
    fn test_validate_and_process_through_any_database() {
        let db = database();
        assert!(!db.validate(&json!({ "arguments": {} })));

        let qs = db.query_set().unwrap();
        let mut seen = None;
        db.process_query(&qs, |result| seen = result.single().map(|d| d.address.clone()));
        assert_eq!(seen.as_deref(), Some("data/y/2.png"));
    }
}
