//! Rectangular crop by platform watermark position (§4.2 step 4). The
//! crop rectangle is computed here and handed to an external media
//! toolchain (ffmpeg-class) as a filter expression; audio is copied
//! unchanged via stream copy.

use crate::Error;
use models::CropPosition;
use std::path::Path;
use std::process::Stdio;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Computes the crop rectangle for the source (width, height) with
/// `crop_pixels` removed from the given edge. `crop_pixels = 0` is the
/// identity crop (output equals input dimensions).
pub fn crop_rect(width: u32, height: u32, crop_pixels: u32, position: CropPosition) -> CropRect {
    let crop_pixels = crop_pixels.min(match position {
        CropPosition::Top | CropPosition::Bottom => height.saturating_sub(1),
        CropPosition::Left | CropPosition::Right => width.saturating_sub(1),
    });

    match position {
        CropPosition::Bottom => CropRect {
            x: 0,
            y: 0,
            width,
            height: height - crop_pixels,
        },
        CropPosition::Top => CropRect {
            x: 0,
            y: crop_pixels,
            width,
            height: height - crop_pixels,
        },
        CropPosition::Left => CropRect {
            x: crop_pixels,
            y: 0,
            width: width - crop_pixels,
            height,
        },
        CropPosition::Right => CropRect {
            x: 0,
            y: 0,
            width: width - crop_pixels,
            height,
        },
    }
}

/// Invokes the external toolchain to apply `rect` to `input`, writing the
/// cropped output (video re-encoded, audio stream-copied) to `output`.
pub async fn apply_crop(
    binary: &str,
    input: &Path,
    output: &Path,
    rect: CropRect,
) -> Result<(), Error> {
    let filter = format!(
        "crop={}:{}:{}:{}",
        rect.width, rect.height, rect.x, rect.y
    );

    let status = tokio::process::Command::new(binary)
        .arg("-y")
        .arg("-i")
        .arg(input)
        .arg("-vf")
        .arg(filter)
        .arg("-c:a")
        .arg("copy")
        .arg(output)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(Error::Spawn)?;

    if !status.status.success() {
        return Err(Error::ToolchainFailed(
            String::from_utf8_lossy(&status.stderr).to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn identity_crop_when_zero_pixels() {
        let rect = crop_rect(1920, 1080, 0, CropPosition::Bottom);
        assert_eq!(rect, CropRect { x: 0, y: 0, width: 1920, height: 1080 });
    }

    #[test]
    fn bottom_crop_keeps_leading_rows() {
        let rect = crop_rect(1920, 1080, 120, CropPosition::Bottom);
        assert_eq!(rect, CropRect { x: 0, y: 0, width: 1920, height: 960 });
    }

    #[test]
    fn top_crop_keeps_trailing_rows() {
        let rect = crop_rect(1920, 1080, 140, CropPosition::Top);
        assert_eq!(rect, CropRect { x: 0, y: 140, width: 1920, height: 940 });
    }

    #[test]
    fn left_and_right_are_symmetric() {
        let left = crop_rect(1000, 500, 50, CropPosition::Left);
        let right = crop_rect(1000, 500, 50, CropPosition::Right);
        assert_eq!(left.width, right.width);
        assert_eq!(left.height, right.height);
    }

    #[test]
    fn crop_pixels_is_clamped_below_full_dimension() {
        let rect = crop_rect(1920, 1080, 5000, CropPosition::Bottom);
        assert_eq!(rect.height, 1);
    }
}
