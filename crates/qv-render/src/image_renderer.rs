use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use qv_data::{ResourceDescriptor, ResourceKind};

use crate::{ImageLoader, RenderError, RenderTarget, Renderer, RendererCapabilities};

/// What became of an asynchronous load
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The image was attached to its descriptor and drawn
    Applied,
    /// A newer load for the same target superseded this one
    Abandoned,
    /// The loader failed; nothing was attached or drawn
    Failed(String),
}

/// Handle on a load started by [`Renderer::render`]
#[derive(Debug)]
pub struct LoadTicket {
    pub generation: u64,
    handle: JoinHandle<LoadOutcome>,
}

impl LoadTicket {
    /// Wait for the load to finish
    pub async fn wait(self) -> LoadOutcome {
        self.handle
            .await
            .unwrap_or_else(|e| LoadOutcome::Failed(e.to_string()))
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Result of a render call
#[derive(Debug)]
pub enum RenderOutcome {
    /// The descriptor already held an image; it was drawn synchronously
    Drawn,
    /// A load was started
    Loading(LoadTicket),
    /// The resource kind is not supported; nothing happened
    Ignored,
}

impl RenderOutcome {
    pub fn into_ticket(self) -> Option<LoadTicket> {
        match self {
            RenderOutcome::Loading(ticket) => Some(ticket),
            _ => None,
        }
    }
}

/// Renders image descriptors, loading them through `L` on a tokio runtime
pub struct ImageRenderer<L> {
    loader: Arc<L>,
    runtime: Handle,
}

impl<L: ImageLoader + 'static> ImageRenderer<L> {
    pub fn new(loader: L, runtime: Handle) -> Self {
        Self {
            loader: Arc::new(loader),
            runtime,
        }
    }

    /// Use the runtime of the calling context
    pub fn on_current_runtime(loader: L) -> Result<Self, RenderError> {
        Ok(Self::new(loader, Handle::try_current()?))
    }

    pub fn loader(&self) -> &Arc<L> {
        &self.loader
    }

    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }

    fn spawn_load(&self, element: &ResourceDescriptor, target: &Arc<RenderTarget>, generation: u64) -> JoinHandle<LoadOutcome> {
        let loader = self.loader.clone();
        let target = target.clone();
        let slot = element.image.clone();
        let address = element.address.clone();

        self.runtime.spawn(async move {
            match loader.load(&address).await {
                Ok(image) => {
                    let image = Arc::new(image);
                    if !target.draw_if_current(generation, &image) {
                        tracing::trace!(%address, generation, "load abandoned");
                        return LoadOutcome::Abandoned;
                    }
                    slot.attach(image);
                    tracing::debug!(%address, "image drawn");
                    LoadOutcome::Applied
                }
                Err(e) => {
                    let error = RenderError::Load {
                        address,
                        message: format!("{:#}", e),
                    };
                    tracing::warn!("{}", error);
                    LoadOutcome::Failed(error.to_string())
                }
            }
        })
    }
}

impl<L: ImageLoader + 'static> Renderer for ImageRenderer<L> {
    fn render(&self, element: &ResourceDescriptor, target: &Arc<RenderTarget>, abort_previous: bool) -> RenderOutcome {
        if !self.capabilities().supports(element.kind) {
            tracing::error!("{}", RenderError::Unsupported(element.kind));
            return RenderOutcome::Ignored;
        }

        if let Some(image) = element.image.get() {
            target.draw(&image, abort_previous);
            return RenderOutcome::Drawn;
        }

        let generation = target.begin_generation(abort_previous);
        let handle = self.spawn_load(element, target, generation);
        RenderOutcome::Loading(LoadTicket { generation, handle })
    }

    fn capabilities(&self) -> RendererCapabilities {
        RendererCapabilities {
            resource_kinds: vec![ResourceKind::Image],
            asynchronous_loads: true,
        }
    }
}
