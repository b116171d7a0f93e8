use anyhow::{Result, anyhow};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use image::ImageFormat;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::models::{FileHandle, StagedId};
use crate::utils::validation::normalize_media_type;

/// Produces the displayable preview string for an image file
#[async_trait::async_trait]
pub trait PreviewGenerator: Send + Sync {
    async fn generate(&self, file: &FileHandle) -> Result<String>;
}

/// Encodes the file as a `data:` URI, optionally shrinking raster images first
pub struct DataUriPreview {
    max_dimension: Option<u32>,
}

impl DataUriPreview {
    pub fn new(max_dimension: Option<u32>) -> Self {
        Self { max_dimension }
    }

    pub fn encode_data_uri(media_type: &str, data: &[u8]) -> String {
        format!(
            "data:{};base64,{}",
            normalize_media_type(media_type),
            BASE64.encode(data)
        )
    }

    /// Resize to at most `max_dimension` on either edge, preserving aspect ratio
    fn thumbnail_png(data: &[u8], max_dimension: u32) -> Result<Vec<u8>> {
        let img =
            image::load_from_memory(data).map_err(|e| anyhow!("Failed to load image: {}", e))?;
        let thumbnail = img.thumbnail(max_dimension, max_dimension);

        let mut out_data = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut out_data);
        thumbnail
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|e| anyhow!("Failed to encode PNG thumbnail: {}", e))?;
        Ok(out_data)
    }
}

impl Default for DataUriPreview {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait::async_trait]
impl PreviewGenerator for DataUriPreview {
    async fn generate(&self, file: &FileHandle) -> Result<String> {
        let data = file.read_all().await?;

        let Some(max_dimension) = self.max_dimension else {
            return Ok(Self::encode_data_uri(file.media_type(), &data));
        };

        let raw = data.clone();
        let thumb = tokio::task::spawn_blocking(move || Self::thumbnail_png(&raw, max_dimension))
            .await
            .map_err(|e| anyhow!("Thumbnail task failed: {}", e))?;

        match thumb {
            Ok(png) => Ok(Self::encode_data_uri("image/png", &png)),
            Err(e) => {
                // SVG and other formats the decoder does not know
                tracing::debug!(
                    "Falling back to raw preview for {}: {}",
                    file.name(),
                    e
                );
                Ok(Self::encode_data_uri(file.media_type(), &data))
            }
        }
    }
}

/// Generates a preview in the background and hands it to `on_ready`.
///
/// Read failures are logged and produce no callback.
pub fn spawn_preview<F>(
    generator: Arc<dyn PreviewGenerator>,
    id: StagedId,
    file: Arc<FileHandle>,
    on_ready: F,
) -> JoinHandle<()>
where
    F: FnOnce(StagedId, String) + Send + 'static,
{
    tokio::spawn(async move {
        match generator.generate(&file).await {
            Ok(preview) => {
                tracing::debug!("Preview ready for {} ({})", file.name(), id);
                on_ready(id, preview);
            }
            Err(e) => {
                tracing::warn!("Failed to generate preview for {}: {}", file.name(), e);
            }
        }
    })
}
