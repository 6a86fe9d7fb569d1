//! Viewport - a render target plus its pan/zoom presentation transform

use std::sync::Arc;
use parking_lot::RwLock;
use serde::{Serialize, Deserialize};
use uuid::Uuid;

use qv_core::{Signal, SubscriptionId};
use qv_render::RenderTarget;

/// Unique identifier for a viewport
pub type ViewportId = Uuid;

/// Placement of the surface inside its viewport
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    /// Offset of the surface's left edge
    pub left: f32,
    /// Offset of the surface's top edge
    pub top: f32,
    /// Displayed size divided by the surface's natural size
    pub scale: f32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            scale: 1.0,
        }
    }
}

impl ViewTransform {
    /// Displayed width and height of a surface of `natural` size
    pub fn display_size(&self, natural: (u32, u32)) -> (f32, f32) {
        (natural.0 as f32 * self.scale, natural.1 as f32 * self.scale)
    }

    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.left += dx;
        self.top += dy;
    }

    /// Scale by `factor` keeping the surface point under `(x, y)` in place.
    /// `x` and `y` are viewport coordinates.
    pub fn zoom_at(&mut self, factor: f32, x: f32, y: f32) {
        // Cursor relative to the surface's top-left corner
        let x_pos = x - self.left;
        let y_pos = y - self.top;

        self.left -= x_pos * factor - x_pos;
        self.top -= y_pos * factor - y_pos;
        self.scale *= factor;
    }
}

/// Notification raised by a viewport for layout collaborators
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewportEvent {
    /// The surface was panned or zoomed
    Transformed(ViewTransform),
    /// The surface's natural size changed
    Resized(u32, u32),
}

/// A render target shown inside a viewport with its own transform
pub struct Viewport {
    id: ViewportId,
    caption: Option<String>,
    target: Arc<RenderTarget>,
    transform: RwLock<ViewTransform>,
    events: Arc<Signal<ViewportEvent>>,
    resize_forward: SubscriptionId,
}

impl Viewport {
    pub fn new(target: Arc<RenderTarget>) -> Self {
        let events: Arc<Signal<ViewportEvent>> = Arc::new(Signal::new());
        let forward = events.clone();
        let resize_forward = target.on_resized(move |&(width, height)| {
            forward.emit(&ViewportEvent::Resized(width, height));
        });

        Self {
            id: Uuid::new_v4(),
            caption: None,
            target,
            transform: RwLock::new(ViewTransform::default()),
            events,
            resize_forward,
        }
    }

    /// Viewport over a fresh in-memory canvas
    pub fn canvas(width: u32, height: u32) -> Self {
        Self::new(Arc::new(RenderTarget::canvas(width, height)))
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub fn id(&self) -> ViewportId {
        self.id
    }

    pub fn caption(&self) -> Option<&str> {
        self.caption.as_deref()
    }

    pub fn target(&self) -> &Arc<RenderTarget> {
        &self.target
    }

    pub fn transform(&self) -> ViewTransform {
        *self.transform.read()
    }

    /// Displayed size of the surface
    pub fn display_size(&self) -> (f32, f32) {
        self.transform().display_size(self.target.size())
    }

    /// Replace the transform and raise `Transformed`
    pub fn set_transform(&self, transform: ViewTransform) {
        *self.transform.write() = transform;
        self.events.emit(&ViewportEvent::Transformed(transform));
    }

    /// Move the surface by `(dx, dy)` and raise `Transformed`
    pub fn pan(&self, dx: f32, dy: f32) {
        let transform = {
            let mut transform = self.transform.write();
            transform.pan(dx, dy);
            *transform
        };
        self.events.emit(&ViewportEvent::Transformed(transform));
    }

    /// Zoom around `(x, y)` and raise `Transformed`
    pub fn zoom_at(&self, factor: f32, x: f32, y: f32) {
        let transform = {
            let mut transform = self.transform.write();
            transform.zoom_at(factor, x, y);
            *transform
        };
        self.events.emit(&ViewportEvent::Transformed(transform));
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&ViewportEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }
}

impl Drop for Viewport {
    fn drop(&mut self) {
        self.target.remove_resized_listener(self.resize_forward);
    }
}

impl std::fmt::Debug for Viewport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Viewport")
            .field("id", &self.id)
            .field("caption", &self.caption)
            .field("transform", &self.transform())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_zoom_keeps_cursor_point() {
        let mut transform = ViewTransform { left: 10.0, top: 20.0, scale: 1.0 };
        let natural = (200, 100);

        // Surface point under the cursor, as a fraction of the displayed size
        let (x, y) = (60.0, 45.0);
        let (w, h) = transform.display_size(natural);
        let before = ((x - transform.left) / w, (y - transform.top) / h);

        transform.zoom_at(1.1, x, y);

        let (w, h) = transform.display_size(natural);
        let after = ((x - transform.left) / w, (y - transform.top) / h);
        assert!((before.0 - after.0).abs() < 1e-5);
        assert!((before.1 - after.1).abs() < 1e-5);
        assert!((transform.scale - 1.1).abs() < 1e-6);
    }

    #[test]
    fn test_viewport_forwards_resize() {
        let viewport = Viewport::canvas(1, 1).with_caption("(1, 2)");
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        viewport.subscribe(move |event| sink.lock().push(*event));

        viewport.target().resize_to(3, 4);
        viewport.pan(5.0, -2.0);

        assert_eq!(viewport.caption(), Some("(1, 2)"));
        assert_eq!(
            *events.lock(),
            vec![
                ViewportEvent::Resized(3, 4),
                ViewportEvent::Transformed(ViewTransform { left: 5.0, top: -2.0, scale: 1.0 }),
            ]
        );
        assert_eq!(viewport.display_size(), (3.0, 4.0));
    }
}
