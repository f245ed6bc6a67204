//! Dispatches to a remote inpaint backend. Configured absence (or a
//! `localhost` URL in production) forces the caller to fall back to crop
//! (§6 "Environment toggles").

use crate::Error;
use bytes::Bytes;

#[derive(Debug, Clone)]
pub struct InpaintClient {
    http: reqwest::Client,
    backend_url: String,
}

#[derive(serde::Serialize)]
struct InpaintParams<'a> {
    crop_pixels: u32,
    crop_position: &'a str,
}

impl InpaintClient {
    pub fn new(http: reqwest::Client, backend_url: String) -> Self {
        Self { http, backend_url }
    }

    /// `None` when no backend is configured; the caller should treat this
    /// the same as a reachability failure for `auto` mode fall-through.
    pub fn configured(backend_url: &Option<String>) -> bool {
        match backend_url {
            None => false,
            Some(url) => !url.is_empty() && !url.contains("localhost"),
        }
    }

    pub async fn inpaint(
        &self,
        video_bytes: Bytes,
        crop_pixels: u32,
        crop_position: &str,
    ) -> Result<Bytes, Error> {
        let params = InpaintParams {
            crop_pixels,
            crop_position,
        };
        let params_json = serde_json::to_string(&params)?;

        let form = reqwest::multipart::Form::new()
            .text("params", params_json)
            .part(
                "video",
                reqwest::multipart::Part::bytes(video_bytes.to_vec()).file_name("input.mp4"),
            );

        let resp = self
            .http
            .post(format!("{}/v1/inpaint", self.backend_url))
            .multipart(form)
            .timeout(std::time::Duration::from_secs(300))
            .send()
            .await
            .map_err(Error::InpaintRequest)?;

        if !resp.status().is_success() {
            return Err(Error::InpaintStatus(resp.status()));
        }
        resp.bytes().await.map_err(Error::InpaintRequest)
    }
}
