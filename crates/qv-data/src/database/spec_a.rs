use std::path::Path;
use serde_json::Value;

use qv_core::{Query, QueryMode, QuerySet, QuerySnapshot};

use super::Database;
use crate::result::{MatrixCell, MatrixRow, ResourceDescriptor, ResultData, ResultMatrix, ResultSet};
use crate::spec::{base_directory, validate_document, DatasetSpec, ValidationReport};
use crate::DataError;

/// Image repository described by a single JSON document: `arguments`,
/// `metadata` and a `name_pattern` relative to the document's directory.
#[derive(Debug, Clone, Default)]
pub struct SpecADatabase {
    spec: Option<DatasetSpec>,
}

impl SpecADatabase {
    /// An empty database; [`resolve`](Database::resolve) fails until a document is loaded
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and load the document at `path`
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        tracing::info!("Loading dataset specification {}", path.display());

        let text = tokio::fs::read_to_string(path).await?;
        let document: Value = serde_json::from_str(&text)?;
        Self::from_document(&document, &path.to_string_lossy())
    }

    /// Build a database from an already parsed document found at `location`
    pub fn from_document(document: &Value, location: &str) -> Result<Self, DataError> {
        let mut database = Self::new();
        let report = database.load(document, location);
        if report.is_valid() {
            Ok(database)
        } else {
            Err(DataError::InvalidSpec(report.diagnostics))
        }
    }

    /// Validate `document` and keep it on success. On failure the previously
    /// loaded specification is dropped and the database is unusable.
    pub fn load(&mut self, document: &Value, location: &str) -> ValidationReport {
        let mut report = validate_document(document, &base_directory(location));
        self.spec = report.spec.take();
        report.spec = self.spec.clone();
        report
    }

    pub fn spec(&self) -> Option<&DatasetSpec> {
        self.spec.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.spec.is_some()
    }
}

impl Database for SpecADatabase {
    fn validate(&self, document: &Value) -> bool {
        validate_document(document, "").is_valid()
    }

    fn query_set(&self) -> Result<QuerySet, DataError> {
        self.spec.as_ref().ok_or(DataError::NotLoaded)?.to_query_set()
    }

    fn resolve(&self, query_set: &QuerySet) -> Result<ResultSet, DataError> {
        let snapshot = query_set.snapshot();
        let data = self.resolve_snapshot(&snapshot)?;

        tracing::debug!(mode = ?snapshot.mode, "query resolved");
        query_set.mark_processed(snapshot.clone());

        Ok(ResultSet { snapshot, data })
    }
}

impl SpecADatabase {
    /// Compute the resources of a snapshot without touching any query set
    pub fn resolve_snapshot(&self, snapshot: &QuerySnapshot) -> Result<ResultData, DataError> {
        let spec = self.spec.as_ref().ok_or(DataError::NotLoaded)?;

        // Fixed parameters are the same for every resource
        let base = spec.name_pattern.substitute(|id| match snapshot.query(id) {
            Some(Query::Fixed(value)) => Some(value.to_string()),
            _ => None,
        });

        match &snapshot.mode {
            QueryMode::Single => {
                if let Some((id, _)) = snapshot.parameters.iter().find(|(_, q)| q.is_variable()) {
                    return Err(unsupported(format!("parameter '{}' is variable in single mode", id)));
                }
                Ok(ResultData::Single(ResourceDescriptor::image(spec.address(&base.to_string()))))
            }
            QueryMode::Matrix { axis1, axis2 } => {
                let (Some(Query::Variable(rows)), Some(Query::Variable(columns))) =
                    (snapshot.query(axis1), snapshot.query(axis2))
                else {
                    return Err(unsupported(format!(
                        "matrix axes '{}' and '{}' are not both variable",
                        axis1, axis2
                    )));
                };
                if let Some((id, _)) = snapshot
                    .parameters
                    .iter()
                    .find(|(id, q)| q.is_variable() && *id != axis1 && *id != axis2)
                {
                    return Err(unsupported(format!("parameter '{}' is variable but not a matrix axis", id)));
                }

                let rows = rows
                    .iter()
                    .map(|a| {
                        let row_pattern = base.substitute(|id| (id == axis1).then(|| a.to_string()));
                        let cells = columns
                            .iter()
                            .map(|b| {
                                let relative = row_pattern.render(|id| (id == axis2).then(|| b.to_string()));
                                MatrixCell {
                                    key: b.clone(),
                                    resource: ResourceDescriptor::image(spec.address(&relative)),
                                }
                            })
                            .collect();
                        MatrixRow { key: a.clone(), cells }
                    })
                    .collect();

                Ok(ResultData::Matrix(ResultMatrix {
                    axis1: axis1.clone(),
                    axis2: axis2.clone(),
                    rows,
                }))
            }
        }
    }
}

fn unsupported(reason: String) -> DataError {
    tracing::error!("Unsupported mode: {}", reason);
    DataError::UnsupportedMode(reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use qv_core::{ParamValue, QueryEvent};
    use serde_json::json;

    fn document() -> Value {
        json!({
            "arguments": {
                "a": { "label": "A", "type": "range", "values": [1, 2, 3], "default": 1 },
                "b": { "label": "B", "type": "set", "values": ["x", "y"], "default": "x" }
            },
            "metadata": { "renderer": "spheres" },
            "name_pattern": "img_{a}_{b}.png"
        })
    }

    #[test]
    fn test_single_resolution() {
        let db = SpecADatabase::from_document(&document(), "sets/one/info.json").unwrap();
        let qs = db.query_set().unwrap();

        let result = db.resolve(&qs).unwrap();
        assert_eq!(result.single().unwrap().address, "sets/one/img_1_x.png");
        assert_eq!(result.snapshot, qs.snapshot());
    }

    #[test]
    fn test_processed_only_on_success() {
        let db = SpecADatabase::from_document(&document(), "info.json").unwrap();
        let qs = db.query_set().unwrap();
        let processed = Arc::new(Mutex::new(0));
        let counter = processed.clone();
        qs.subscribe(move |event| {
            if matches!(event, QueryEvent::Processed(_)) {
                *counter.lock().unwrap() += 1;
            }
        });

        let mut called = false;
        db.process_query(&qs, |_| called = true);
        assert!(called);
        assert_eq!(*processed.lock().unwrap(), 1);

        let mut called = false;
        SpecADatabase::new().process_query(&qs, |_| called = true);
        assert!(!called);
        assert_eq!(*processed.lock().unwrap(), 1);
    }

    #[test]
    fn test_mismatched_shape_is_unsupported() {
        let db = SpecADatabase::from_document(&document(), "info.json").unwrap();
        let mut snapshot = db.query_set().unwrap().snapshot();

        snapshot.parameters.insert("b".into(), Query::Variable(vec![ParamValue::from("x")]));
        assert!(matches!(db.resolve_snapshot(&snapshot), Err(DataError::UnsupportedMode(_))));

        snapshot.mode = QueryMode::Matrix { axis1: "a".into(), axis2: "b".into() };
        assert!(matches!(db.resolve_snapshot(&snapshot), Err(DataError::UnsupportedMode(_))));

        snapshot.parameters.insert("a".into(), Query::Variable(vec![ParamValue::from(3)]));
        let data = db.resolve_snapshot(&snapshot).unwrap();
        assert!(matches!(data, ResultData::Matrix(ref m) if m.cell_count() == 1));
    }

    #[test]
    fn test_unloaded_database() {
        let db = SpecADatabase::new();
        assert!(matches!(db.query_set(), Err(DataError::NotLoaded)));
        assert!(!db.is_loaded());
    }

    #[test]
    fn test_failed_load_drops_previous_spec() {
        let mut db = SpecADatabase::from_document(&document(), "info.json").unwrap();
        let report = db.load(&json!({ "arguments": {} }), "info.json");
        assert!(!report.is_valid());
        assert!(!db.is_loaded());
        assert!(!db.validate(&json!({})));
        assert!(db.validate(&document()));
    }
}
