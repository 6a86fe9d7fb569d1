//! Rendering of resolved resources
//!
//! This crate draws the descriptors of a result set onto surfaces. Images
//! that are not decoded yet are loaded asynchronously on a tokio runtime;
//! a newer load for a surface supersedes older ones.

pub mod image_renderer;
pub mod loader;
pub mod progress;
pub mod target;

use std::sync::Arc;
use thiserror::Error;

use qv_data::{ResourceDescriptor, ResourceKind};

// Re-exports
pub use image_renderer::{ImageRenderer, LoadOutcome, LoadTicket, RenderOutcome};
pub use loader::{ImageLoader, MemoryImageLoader};
pub use progress::{LoadProgress, ProgressEvent};
pub use target::{CanvasSurface, RenderTarget, Surface};

/// Errors that can occur while rendering
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("failed to load '{address}': {message}")]
    Load { address: String, message: String },

    #[error("renderer does not support resources of kind {0:?}")]
    Unsupported(ResourceKind),

    #[error("no tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}

/// Trait for renderers
pub trait Renderer: Send + Sync {
    /// Draw `element` onto `target`.
    ///
    /// With `abort_previous` every load still pending for `target` is
    /// abandoned; otherwise this load runs alongside them.
    fn render(&self, element: &ResourceDescriptor, target: &Arc<RenderTarget>, abort_previous: bool) -> RenderOutcome;

    /// Get renderer capabilities
    fn capabilities(&self) -> RendererCapabilities;
}

/// Renderer capabilities
#[derive(Debug, Clone)]
pub struct RendererCapabilities {
    pub resource_kinds: Vec<ResourceKind>,
    pub asynchronous_loads: bool,
}

impl RendererCapabilities {
    pub fn supports(&self, kind: ResourceKind) -> bool {
        self.resource_kinds.contains(&kind)
    }
}
