//! Query set: the live selection across every parameter of a dataset

use std::sync::Arc;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Serialize, Deserialize};

use crate::events::{Signal, SubscriptionId};
use crate::parameter::{Parameter, Query};
use crate::QueryError;

mod snapshot;
mod subscriber;

pub use snapshot::QuerySnapshot;
pub use subscriber::QuerySubscriber;

/// How a query set is resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum QueryMode {
    /// Every parameter fixed, one resource
    Single,
    /// Two variable parameters spanning a grid of resources
    Matrix {
        axis1: String,
        axis2: String,
    },
}

impl QueryMode {
    /// The two axis ids in matrix mode
    pub fn axes(&self) -> Option<(&str, &str)> {
        match self {
            QueryMode::Single => None,
            QueryMode::Matrix { axis1, axis2 } => Some((axis1, axis2)),
        }
    }
}

/// Aggregated notification of a query set
#[derive(Debug, Clone)]
pub enum QueryEvent {
    /// A parameter's query was replaced
    ParameterChanged { id: String, query: Query },
    /// The query mode (or the matrix axes) changed
    ModeChanged(QueryMode),
    /// A database finished resolving this query set
    Processed(QuerySnapshot),
}

/// Ordered mapping from parameter id to [`Parameter`] plus the query mode
pub struct QuerySet {
    parameters: IndexMap<String, Arc<Parameter>>,
    mode: RwLock<QueryMode>,
    events: Arc<Signal<QueryEvent>>,
    /// Forwarding subscriptions on each parameter, removed on drop
    forwarders: Vec<(Arc<Parameter>, SubscriptionId)>,
}

impl QuerySet {
    /// Create a single-mode query set. Insertion order is kept.
    pub fn new(parameters: IndexMap<String, Parameter>) -> Self {
        let parameters: IndexMap<String, Arc<Parameter>> = parameters
            .into_iter()
            .map(|(id, parameter)| (id, Arc::new(parameter)))
            .collect();
        let events = Arc::new(Signal::new());

        let forwarders = parameters
            .iter()
            .map(|(id, parameter)| {
                let id = id.clone();
                let events = events.clone();
                let subscription = parameter.on_change(move |query| {
                    events.emit(&QueryEvent::ParameterChanged {
                        id: id.clone(),
                        query: query.clone(),
                    });
                });
                (parameter.clone(), subscription)
            })
            .collect();

        Self {
            parameters,
            mode: RwLock::new(QueryMode::Single),
            events,
            forwarders,
        }
    }

    pub fn parameter(&self, id: &str) -> Option<&Arc<Parameter>> {
        self.parameters.get(id)
    }

    /// Parameters in specification order
    pub fn parameters(&self) -> impl Iterator<Item = (&str, &Arc<Parameter>)> {
        self.parameters.iter().map(|(id, p)| (id.as_str(), p))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.parameters.keys().map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.parameters.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn mode(&self) -> QueryMode {
        self.mode.read().clone()
    }

    /// Set the query of one parameter
    pub fn set_value(&self, id: &str, query: impl Into<Query>) -> Result<(), QueryError> {
        self.parameter(id)
            .ok_or_else(|| QueryError::UnknownParameter(id.to_string()))?
            .set_value(query)
    }

    /// Serialize the current state
    pub fn snapshot(&self) -> QuerySnapshot {
        QuerySnapshot {
            mode: self.mode(),
            parameters: self.parameters
                .iter()
                .map(|(id, p)| (id.clone(), p.query()))
                .collect(),
        }
    }

    /// Switch to matrix mode using the first two parameters as axes.
    /// Does nothing when already in matrix mode.
    pub fn enter_matrix_mode(&self) -> Result<(), QueryError> {
        if self.mode().axes().is_some() {
            return Ok(());
        }
        let ids: Vec<String> = self.parameters.keys().take(2).cloned().collect();
        match ids.as_slice() {
            [axis1, axis2] => self.set_matrix_axes(axis1, axis2),
            _ => {
                tracing::error!(
                    parameters = self.len(),
                    "cannot build a versus query for fewer than 2 parameters"
                );
                Err(QueryError::NotEnoughParameters(self.len()))
            }
        }
    }

    /// Choose the two matrix axes.
    ///
    /// A parameter that stops being an axis becomes fixed at `values[0]`; a
    /// parameter that becomes an axis starts as `[values[0]]`. Axes kept from
    /// the previous choice keep their selection.
    pub fn set_matrix_axes(&self, axis1: &str, axis2: &str) -> Result<(), QueryError> {
        if self.len() < 2 {
            tracing::error!(parameters = self.len(), "matrix mode needs at least 2 parameters");
            return Err(QueryError::NotEnoughParameters(self.len()));
        }
        if axis1 == axis2 {
            return Err(QueryError::SameAxis(axis1.to_string()));
        }
        for id in [axis1, axis2] {
            if !self.contains(id) {
                return Err(QueryError::UnknownParameter(id.to_string()));
            }
        }

        let new_axes = [axis1, axis2];
        let mode = {
            let mut mode = self.mode.write();
            let old_axes: Vec<String> = mode
                .axes()
                .map(|(a, b)| vec![a.to_string(), b.to_string()])
                .unwrap_or_default();

            for id in old_axes.iter().filter(|id| !new_axes.contains(&id.as_str())) {
                if let Some(p) = self.parameters.get(id) {
                    p.rehome(Query::Fixed(p.values()[0].clone()));
                }
            }
            for id in new_axes.iter().filter(|id| !old_axes.iter().any(|old| old == *id)) {
                if let Some(p) = self.parameters.get(*id) {
                    p.rehome(Query::Variable(vec![p.values()[0].clone()]));
                }
            }

            *mode = QueryMode::Matrix {
                axis1: axis1.to_string(),
                axis2: axis2.to_string(),
            };
            mode.clone()
        };

        tracing::debug!(axis1, axis2, "matrix axes changed");
        self.events.emit(&QueryEvent::ModeChanged(mode));
        Ok(())
    }

    /// Leave matrix mode; former axes become fixed at `values[0]`
    pub fn enter_single_mode(&self) {
        {
            let mut mode = self.mode.write();
            if let Some((axis1, axis2)) = mode.axes() {
                for id in [axis1, axis2] {
                    if let Some(p) = self.parameters.get(id) {
                        p.rehome(Query::Fixed(p.values()[0].clone()));
                    }
                }
            } else {
                return;
            }
            *mode = QueryMode::Single;
        }
        self.events.emit(&QueryEvent::ModeChanged(QueryMode::Single));
    }

    /// Announce that `snapshot` has been resolved
    pub fn mark_processed(&self, snapshot: QuerySnapshot) {
        self.events.emit(&QueryEvent::Processed(snapshot));
    }

    /// Register an event listener
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&QueryEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Add a subscriber held weakly; it is skipped once dropped
    pub fn add_subscriber(&self, subscriber: Arc<dyn QuerySubscriber>) -> SubscriptionId {
        let weak = Arc::downgrade(&subscriber);
        self.events.subscribe(move |event| {
            if let Some(subscriber) = weak.upgrade() {
                subscriber.on_query_event(event);
            }
        })
    }
}

impl Drop for QuerySet {
    fn drop(&mut self) {
        for (parameter, subscription) in self.forwarders.drain(..) {
            parameter.remove_listener(subscription);
        }
    }
}

impl std::fmt::Debug for QuerySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuerySet")
            .field("parameters", &self.parameters.keys().collect::<Vec<_>>())
            .field("mode", &*self.mode.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::{ParamValue, ParameterKind};
    use parking_lot::Mutex;

    fn range(label: &str, values: &[i32], default: i32) -> Parameter {
        Parameter::new(
            label,
            ParameterKind::Range,
            values.iter().map(|v| ParamValue::from(*v)).collect(),
            ParamValue::from(default),
        )
        .unwrap()
    }

    fn query_set() -> QuerySet {
        let mut parameters = IndexMap::new();
        parameters.insert("theta".to_string(), range("Theta", &[0, 15, 30], 15));
        parameters.insert("phi".to_string(), range("Phi", &[0, 90, 180], 90));
        parameters.insert("exposure".to_string(), range("Exposure", &[1, 2], 2));
        QuerySet::new(parameters)
    }

    #[test]
    fn test_listener_may_write_other_parameters() {
        let qs = query_set();
        let theta = qs.parameter("theta").unwrap().clone();
        let phi = qs.parameter("phi").unwrap().clone();
        let writes = Arc::new(Mutex::new(Vec::new()));
        let sink = writes.clone();
        qs.subscribe(move |event| {
            if let QueryEvent::ParameterChanged { id, .. } = event {
                if id == "theta" {
                    sink.lock().push(("phi", phi.set_value(ParamValue::from(0))));
                    sink.lock().push(("theta", theta.set_value(ParamValue::from(30))));
                }
            }
        });

        qs.set_value("theta", ParamValue::from(0)).unwrap();

        let writes = writes.lock();
        assert!(matches!(writes[0], ("phi", Ok(()))));
        assert!(matches!(writes[1], ("theta", Err(QueryError::ReentrantWrite(_)))));
        assert_eq!(qs.parameter("phi").unwrap().query(), Query::Fixed(ParamValue::from(0)));
        assert_eq!(qs.parameter("theta").unwrap().query(), Query::Fixed(ParamValue::from(0)));
    }

    #[test]
    fn test_aggregates_parameter_changes() {
        let qs = query_set();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        qs.subscribe(move |event| {
            if let QueryEvent::ParameterChanged { id, query } = event {
                sink.lock().push((id.clone(), query.clone()));
            }
        });

        qs.set_value("phi", ParamValue::from(180)).unwrap();
        qs.parameter("theta").unwrap().set_value(ParamValue::from(0)).unwrap();

        assert_eq!(
            *seen.lock(),
            vec![
                ("phi".to_string(), Query::Fixed(ParamValue::from(180))),
                ("theta".to_string(), Query::Fixed(ParamValue::from(0))),
            ]
        );
        assert!(matches!(
            qs.set_value("nope", ParamValue::from(1)),
            Err(QueryError::UnknownParameter(_))
        ));
    }

    #[test]
    fn test_snapshot_keeps_specification_order() {
        let qs = query_set();
        let snapshot = qs.snapshot();
        let ids: Vec<&str> = snapshot.parameters.keys().map(String::as_str).collect();
        assert_eq!(ids, ["theta", "phi", "exposure"]);
        assert_eq!(snapshot.mode, QueryMode::Single);
    }

    #[test]
    fn test_matrix_axes_rehome_queries() {
        let qs = query_set();
        qs.enter_matrix_mode().unwrap();

        assert_eq!(
            qs.mode(),
            QueryMode::Matrix { axis1: "theta".into(), axis2: "phi".into() }
        );
        assert_eq!(qs.parameter("theta").unwrap().query(), Query::Variable(vec![ParamValue::from(0)]));
        assert_eq!(qs.parameter("phi").unwrap().query(), Query::Variable(vec![ParamValue::from(0)]));
        assert!(!qs.parameter("exposure").unwrap().is_variable());

        qs.parameter("phi").unwrap().select_index_range(0, 2).unwrap();

        // phi stays an axis and keeps its selection, theta is fixed again
        qs.set_matrix_axes("exposure", "phi").unwrap();
        assert_eq!(qs.parameter("theta").unwrap().query(), Query::Fixed(ParamValue::from(0)));
        assert_eq!(qs.parameter("exposure").unwrap().query(), Query::Variable(vec![ParamValue::from(1)]));
        assert_eq!(qs.parameter("phi").unwrap().query().values().len(), 3);

        let variable: Vec<&str> = qs
            .parameters()
            .filter(|(_, p)| p.is_variable())
            .map(|(id, _)| id)
            .collect();
        assert_eq!(variable, ["phi", "exposure"]);
    }

    #[test]
    fn test_matrix_axes_must_differ() {
        let qs = query_set();
        assert_eq!(qs.set_matrix_axes("phi", "phi"), Err(QueryError::SameAxis("phi".into())));
        assert_eq!(qs.mode(), QueryMode::Single);
    }

    #[test]
    fn test_matrix_needs_two_parameters() {
        let mut parameters = IndexMap::new();
        parameters.insert("theta".to_string(), range("Theta", &[0, 15], 0));
        let qs = QuerySet::new(parameters);
        assert_eq!(qs.enter_matrix_mode(), Err(QueryError::NotEnoughParameters(1)));
    }

    #[test]
    fn test_enter_single_mode_fixes_axes() {
        let qs = query_set();
        let modes = Arc::new(Mutex::new(Vec::new()));
        let sink = modes.clone();
        qs.subscribe(move |event| {
            if let QueryEvent::ModeChanged(mode) = event {
                sink.lock().push(mode.clone());
            }
        });

        qs.enter_matrix_mode().unwrap();
        qs.enter_single_mode();

        assert!(qs.parameters().all(|(_, p)| !p.is_variable()));
        assert_eq!(modes.lock().len(), 2);
        assert_eq!(modes.lock()[1], QueryMode::Single);
    }

    #[test]
    fn test_drop_detaches_forwarders() {
        let qs = query_set();
        let theta = qs.parameter("theta").unwrap().clone();
        drop(qs);
        // Still writable, no dangling forwarders
        theta.set_value(ParamValue::from(30)).unwrap();
    }
}
