pub mod crop;
mod error;
pub mod inpaint;
pub mod probe;

pub use crop::{apply_crop, crop_rect, CropRect};
pub use error::Error;
pub use inpaint::InpaintClient;
pub use probe::{probe, MediaInfo};

use bytes::Bytes;
use models::{CropPosition, EffectiveBackend, ProcessingMode};
use std::path::Path;

pub struct TransformOutcome {
    pub backend: EffectiveBackend,
}

/// Dispatches by effective mode (§4.2 step 4): attempts inpaint when
/// requested/allowed and reachable, falling back to crop on any error when
/// `mode` is `auto`. Writes the result to `output_path`.
pub async fn run(
    mode: ProcessingMode,
    inpaint_client: Option<&InpaintClient>,
    ffmpeg_binary: &str,
    input_path: &Path,
    output_path: &Path,
    input_bytes: Bytes,
    media: MediaInfo,
    crop_pixels: u32,
    crop_position: CropPosition,
) -> Result<TransformOutcome, Error> {
    let want_inpaint = matches!(mode, ProcessingMode::Inpaint | ProcessingMode::Auto);

    if want_inpaint {
        if let Some(client) = inpaint_client {
            let position_str = match crop_position {
                CropPosition::Top => "top",
                CropPosition::Bottom => "bottom",
                CropPosition::Left => "left",
                CropPosition::Right => "right",
            };
            match client.inpaint(input_bytes, crop_pixels, position_str).await {
                Ok(output_bytes) => {
                    tokio::fs::write(output_path, &output_bytes)
                        .await
                        .map_err(|e| Error::Other(anyhow::anyhow!(e)))?;
                    return Ok(TransformOutcome {
                        backend: EffectiveBackend::Inpaint,
                    });
                }
                Err(err) if mode == ProcessingMode::Auto => {
                    tracing::warn!(error = %err, "inpaint failed, falling back to crop");
                }
                Err(err) => return Err(err),
            }
        } else {
            // §6: absence (or `localhost`) of an inpaint-backend URL forces
            // crop fallback, even for an explicit `inpaint` request.
            tracing::warn!(?mode, "no inpaint backend configured, falling back to crop");
        }
    }

    let rect = crop_rect(media.width, media.height, crop_pixels, crop_position);
    apply_crop(ffmpeg_binary, input_path, output_path, rect).await?;
    Ok(TransformOutcome {
        backend: EffectiveBackend::Crop,
    })
}
