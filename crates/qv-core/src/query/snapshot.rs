use indexmap::IndexMap;
use serde::{Serialize, Deserialize};

use super::QueryMode;
use crate::parameter::Query;

/// Immutable copy of a query set taken at one point in time.
///
/// Snapshots identify a request: two resolutions of equal snapshots produce
/// the same addresses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySnapshot {
    pub mode: QueryMode,
    pub parameters: IndexMap<String, Query>,
}

impl QuerySnapshot {
    /// Serialize to a compact JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Query of one parameter
    pub fn query(&self, id: &str) -> Option<&Query> {
        self.parameters.get(id)
    }
}
