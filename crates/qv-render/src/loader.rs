//! Image loading seam

use std::sync::atomic::{AtomicUsize, Ordering};
use ahash::AHashMap;
use parking_lot::RwLock;

use qv_core::DecodedImage;

/// Turns a resource address into a decoded image.
///
/// Fetching bytes and decoding them is left to implementations; the
/// renderer only awaits the result.
#[async_trait::async_trait]
pub trait ImageLoader: Send + Sync {
    /// Load the image stored at `address`
    async fn load(&self, address: &str) -> anyhow::Result<DecodedImage>;
}

/// Loader serving pre-decoded images from memory
#[derive(Default)]
pub struct MemoryImageLoader {
    images: RwLock<AHashMap<String, DecodedImage>>,
    requests: AtomicUsize,
}

impl MemoryImageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `image` available at `address`
    pub fn insert(&self, address: impl Into<String>, image: DecodedImage) {
        self.images.write().insert(address.into(), image);
    }

    pub fn contains(&self, address: &str) -> bool {
        self.images.read().contains_key(address)
    }

    /// Number of `load` calls served so far, failed ones included
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl ImageLoader for MemoryImageLoader {
    async fn load(&self, address: &str) -> anyhow::Result<DecodedImage> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.images
            .read()
            .get(address)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no image at '{}'", address))
    }
}
