//! Decoded image payloads shared between the data and render layers

use std::sync::Arc;
use parking_lot::RwLock;

/// A decoded, drawable image: row-major RGBA8 pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Arc<[u8]>,
}

impl DecodedImage {
    pub fn new(width: u32, height: u32, pixels: impl Into<Arc<[u8]>>) -> Self {
        Self {
            width,
            height,
            pixels: pixels.into(),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Shared slot a resource descriptor carries once its image has been loaded.
///
/// Clones share the slot, so every copy of a descriptor sees the image.
#[derive(Debug, Clone, Default)]
pub struct ImageSlot {
    image: Arc<RwLock<Option<Arc<DecodedImage>>>>,
}

impl ImageSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<Arc<DecodedImage>> {
        self.image.read().clone()
    }

    pub fn attach(&self, image: Arc<DecodedImage>) {
        *self.image.write() = Some(image);
    }

    pub fn is_loaded(&self) -> bool {
        self.image.read().is_some()
    }

    pub fn clear(&self) {
        *self.image.write() = None;
    }
}
