//! Reads container metadata via an external media-toolchain probe
//! (ffprobe-class), writing the input to a scratch file first since probes
//! of this kind need a seekable path rather than a byte stream.

use crate::Error;
use std::process::Stdio;

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MediaInfo {
    pub width: u32,
    pub height: u32,
    pub duration_sec: f64,
}

#[derive(serde::Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(serde::Deserialize)]
struct ProbeStream {
    codec_type: String,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(serde::Deserialize)]
struct ProbeOutput {
    format: Option<ProbeFormat>,
    streams: Vec<ProbeStream>,
}

pub async fn probe(binary: &str, path: &std::path::Path) -> Result<MediaInfo, Error> {
    let output = tokio::process::Command::new(binary)
        .arg("-v")
        .arg("error")
        .arg("-print_format")
        .arg("json")
        .arg("-show_format")
        .arg("-show_streams")
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(Error::Spawn)?;

    if !output.status.success() {
        return Err(Error::ToolchainFailed(
            String::from_utf8_lossy(&output.stderr).to_string(),
        ));
    }

    let parsed: ProbeOutput =
        serde_json::from_slice(&output.stdout).map_err(|_| Error::UnrecognizedMedia)?;

    let video_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or(Error::UnrecognizedMedia)?;
    let (width, height) = match (video_stream.width, video_stream.height) {
        (Some(w), Some(h)) => (w, h),
        _ => return Err(Error::UnrecognizedMedia),
    };

    let duration_sec = parsed
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    Ok(MediaInfo {
        width,
        height,
        duration_sec,
    })
}
