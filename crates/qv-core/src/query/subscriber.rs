//! Query subscriber trait

use super::QueryEvent;

/// Trait for components that need to respond to query changes
pub trait QuerySubscriber: Send + Sync {
    /// Called for every parameter change, mode change and processed query
    fn on_query_event(&self, event: &QueryEvent);
}
