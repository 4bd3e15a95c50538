//! Image download and decoding

use image::RgbImage;
use std::time::Duration;
use tracing::{debug, info};

use super::VisionError;
use crate::config::FetchConfig;
use crate::http::BlockingClient;

/// Downloads images over HTTP(S) and decodes them into RGB bitmaps
pub struct ImageFetcher {
    client: BlockingClient,
}

impl ImageFetcher {
    /// Create a fetcher with the configured timeout and User-Agent
    pub fn new(config: &FetchConfig) -> Result<Self, VisionError> {
        let client = BlockingClient::new(
            Duration::from_secs(config.timeout_secs),
            &config.user_agent,
        )?;
        Ok(Self { client })
    }

    /// Download `url` and decode it. No retry, no caching.
    pub fn fetch(&self, url: &str) -> Result<RgbImage, VisionError> {
        let bytes = self.fetch_bytes(url)?;
        decode(&bytes)
    }

    /// Download `url`, failing on any non-success status
    pub fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, VisionError> {
        info!("Fetching image from {}", url);

        let response = self.client.get(url, &[("Accept", "image/*,*/*;q=0.8")])?;
        if !response.status.is_success() {
            return Err(VisionError::Fetch {
                url: url.to_string(),
                status: response.status.as_u16(),
            });
        }

        debug!("Downloaded {} bytes", response.body.len());
        Ok(response.body)
    }
}

/// Decode raw bytes into an RGB bitmap, dropping alpha and converting other
/// color modes
pub fn decode(bytes: &[u8]) -> Result<RgbImage, VisionError> {
    let image = image::load_from_memory(bytes)?;
    debug!(
        "Decoded {}x{} image ({:?})",
        image.width(),
        image.height(),
        image.color()
    );
    Ok(image.to_rgb8())
}
