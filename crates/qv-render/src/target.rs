//! Drawing surfaces and the per-surface load generation

use std::sync::Arc;
use parking_lot::Mutex;

use qv_core::{DecodedImage, Signal, SubscriptionId};

/// Something an image can be drawn on
pub trait Surface: Send + Sync {
    /// Current size in pixels
    fn size(&self) -> (u32, u32);

    /// Change the size in pixels
    fn resize(&self, width: u32, height: u32);

    /// Draw `image` at the origin
    fn draw(&self, image: &Arc<DecodedImage>);
}

#[derive(Debug, Default)]
struct CanvasState {
    width: u32,
    height: u32,
    draws: usize,
    last: Option<Arc<DecodedImage>>,
}

/// In-memory surface that remembers what was drawn on it
#[derive(Debug, Default)]
pub struct CanvasSurface {
    state: Mutex<CanvasState>,
}

impl CanvasSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            state: Mutex::new(CanvasState {
                width,
                height,
                ..Default::default()
            }),
        }
    }

    /// Number of draws since creation
    pub fn draw_count(&self) -> usize {
        self.state.lock().draws
    }

    /// The most recently drawn image
    pub fn last_drawn(&self) -> Option<Arc<DecodedImage>> {
        self.state.lock().last.clone()
    }
}

impl Surface for CanvasSurface {
    fn size(&self) -> (u32, u32) {
        let state = self.state.lock();
        (state.width, state.height)
    }

    fn resize(&self, width: u32, height: u32) {
        let mut state = self.state.lock();
        state.width = width;
        state.height = height;
    }

    fn draw(&self, image: &Arc<DecodedImage>) {
        let mut state = self.state.lock();
        state.draws += 1;
        state.last = Some(image.clone());
    }
}

/// A surface plus the bookkeeping the renderer needs for it.
///
/// Every target has its own generation counter: a load only takes effect
/// when its generation is still the target's current one. The counter lock is
/// held across check, resize and draw so a newer render cannot interleave.
pub struct RenderTarget {
    surface: Arc<dyn Surface>,
    generation: Mutex<u64>,
    resized: Signal<(u32, u32)>,
}

impl RenderTarget {
    pub fn new(surface: Arc<dyn Surface>) -> Self {
        Self {
            surface,
            generation: Mutex::new(0),
            resized: Signal::new(),
        }
    }

    /// Target backed by a fresh [`CanvasSurface`]
    pub fn canvas(width: u32, height: u32) -> Self {
        Self::new(Arc::new(CanvasSurface::new(width, height)))
    }

    pub fn surface(&self) -> &Arc<dyn Surface> {
        &self.surface
    }

    pub fn size(&self) -> (u32, u32) {
        self.surface.size()
    }

    pub fn generation(&self) -> u64 {
        *self.generation.lock()
    }

    /// Generation for a new load. Aborting advances the counter so every
    /// older load is abandoned; otherwise the load joins the current one.
    pub fn begin_generation(&self, abort_previous: bool) -> u64 {
        let mut generation = self.generation.lock();
        if abort_previous {
            *generation += 1;
        }
        *generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation() == generation
    }

    /// Resize the surface when the size differs. Returns whether it changed.
    pub fn resize_to(&self, width: u32, height: u32) -> bool {
        let changed = self.fit(width, height);
        if changed {
            self.resized.emit(&(width, height));
        }
        changed
    }

    fn fit(&self, width: u32, height: u32) -> bool {
        if self.surface.size() == (width, height) {
            return false;
        }
        self.surface.resize(width, height);
        tracing::trace!(width, height, "render target resized");
        true
    }

    /// Draw `image` now, starting a new generation when `abort_previous` is set
    /// so pending loads cannot draw over it. Returns the generation drawn in.
    pub fn draw(&self, image: &Arc<DecodedImage>, abort_previous: bool) -> u64 {
        let (current, resized) = {
            let mut generation = self.generation.lock();
            if abort_previous {
                *generation += 1;
            }
            let resized = self.fit(image.width, image.height);
            self.surface.draw(image);
            (*generation, resized)
        };
        if resized {
            self.resized.emit(&(image.width, image.height));
        }
        current
    }

    /// Resize and draw `image` only if `generation` is still current.
    /// Returns whether it was drawn.
    pub fn draw_if_current(&self, generation: u64, image: &Arc<DecodedImage>) -> bool {
        let resized = {
            let current = self.generation.lock();
            if *current != generation {
                return false;
            }
            let resized = self.fit(image.width, image.height);
            self.surface.draw(image);
            resized
        };
        if resized {
            self.resized.emit(&(image.width, image.height));
        }
        true
    }

    /// Listen for size changes caused by loaded images
    pub fn on_resized<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&(u32, u32)) + Send + Sync + 'static,
    {
        self.resized.subscribe(listener)
    }

    pub fn remove_resized_listener(&self, id: SubscriptionId) -> bool {
        self.resized.unsubscribe(id)
    }
}

impl std::fmt::Debug for RenderTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderTarget")
            .field("size", &self.surface.size())
            .field("generation", &self.generation())
            .finish()
    }
}
