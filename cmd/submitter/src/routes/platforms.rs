//! `GET /api/v1/platforms` — the closed preset table (§3, §6), public.

use axum::response::Json;
use models::{Platform, PlatformDescriptor};

pub async fn list_platforms() -> Json<Vec<PlatformDescriptor>> {
    let descriptors = Platform::ALL
        .iter()
        .map(|platform| {
            let preset = platform.preset();
            PlatformDescriptor {
                platform: preset.platform,
                crop_pixels: preset.crop_pixels,
                crop_position: preset.crop_position,
            }
        })
        .collect();
    Json(descriptors)
}
