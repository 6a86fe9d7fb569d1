//! Loader reading images from the local file system

use anyhow::{Context, Result};
use async_trait::async_trait;

use qv_core::DecodedImage;
use qv_render::ImageLoader;

/// Reads and decodes image files from disk into RGBA8 pixels.
/// Any format the `image` crate recognizes from the content is accepted.
#[derive(Debug, Default)]
pub struct FileImageLoader;

/// Decode an encoded image held in memory
pub fn decode(bytes: &[u8]) -> Result<DecodedImage> {
    let rgba = image::load_from_memory(bytes)?.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(DecodedImage::new(width, height, rgba.into_raw()))
}

#[async_trait]
impl ImageLoader for FileImageLoader {
    async fn load(&self, address: &str) -> Result<DecodedImage> {
        let bytes = tokio::fs::read(address)
            .await
            .with_context(|| format!("Failed to read {}", address))?;
        tokio::task::spawn_blocking(move || decode(&bytes))
            .await?
            .with_context(|| format!("Failed to decode image {}", address))
    }
}
