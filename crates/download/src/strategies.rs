//! Each strategy returns the downloaded bytes plus a filename hint. None of
//! them retry internally — fall-through across strategies is the caller's
//! job (§4.4); a strategy either produces a valid payload or bails.

use crate::validity::is_valid_video;
use crate::Error;
use regex::Regex;
use std::process::Stdio;
use std::time::Duration;

pub struct Candidate {
    pub bytes: bytes::Bytes,
    pub filename: String,
}

const BROWSER_HEADERS: &[(&str, &str)] = &[
    (
        "User-Agent",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
         Chrome/124.0.0.0 Safari/537.36",
    ),
    (
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,video/*;q=0.8,*/*;q=0.7",
    ),
    ("Accept-Language", "en-US,en;q=0.9"),
];

fn filename_from_url(url: &url::Url) -> String {
    url.path_segments()
        .and_then(|mut segs| segs.next_back())
        .filter(|s| !s.is_empty())
        .unwrap_or("video.mp4")
        .to_string()
}

/// Strategy 1: direct HTTP GET with browser-realistic headers.
pub async fn direct_http(client: &reqwest::Client, url: &url::Url) -> Result<Candidate, Error> {
    let mut req = client.get(url.clone());
    for (k, v) in BROWSER_HEADERS {
        req = req.header(*k, *v);
    }
    let resp = req.send().await.map_err(|e| anyhow::anyhow!(e))?;
    let content_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    if crate::validity::looks_like_html(content_type.as_deref()) {
        return Err(Error::ContentNotVideo);
    }
    let bytes = resp.bytes().await.map_err(|e| anyhow::anyhow!(e))?;
    if !is_valid_video(&bytes) {
        if crate::validity::looks_like_html_bytes(&bytes) {
            return Err(Error::ContentNotVideo);
        }
        return Err(Error::Other(anyhow::anyhow!(
            "direct_http: payload failed validity test"
        )));
    }
    Ok(Candidate {
        bytes,
        filename: filename_from_url(url),
    })
}

/// Strategy 2: shell out to an external cURL-class fetcher binary.
pub async fn cli_fetcher(binary: &str, url: &url::Url) -> Result<Candidate, Error> {
    let output = tokio::process::Command::new(binary)
        .arg("-sSL")
        .arg("--max-time")
        .arg("90")
        .arg("-H")
        .arg(format!("User-Agent: {}", BROWSER_HEADERS[0].1))
        .arg(url.as_str())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| anyhow::anyhow!("cli_fetcher spawn failed: {e}"))?;

    if !output.status.success() {
        return Err(Error::Other(anyhow::anyhow!(
            "cli_fetcher exited with {:?}",
            output.status.code()
        )));
    }
    let bytes = bytes::Bytes::from(output.stdout);
    if !is_valid_video(&bytes) {
        if crate::validity::looks_like_html_bytes(&bytes) {
            return Err(Error::ContentNotVideo);
        }
        return Err(Error::Other(anyhow::anyhow!(
            "cli_fetcher: payload failed validity test"
        )));
    }
    Ok(Candidate {
        bytes,
        filename: filename_from_url(url),
    })
}

/// Strategy 3: external video-extractor (yt-dlp-class), first without then
/// with site impersonation.
pub async fn extractor(
    binary: &str,
    url: &url::Url,
    impersonate: bool,
) -> Result<Candidate, Error> {
    let mut cmd = tokio::process::Command::new(binary);
    cmd.arg("-o").arg("-").arg("--no-playlist");
    if impersonate {
        cmd.arg("--impersonate").arg("chrome");
    }
    cmd.arg(url.as_str())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let output = cmd
        .output()
        .await
        .map_err(|e| anyhow::anyhow!("extractor spawn failed: {e}"))?;
    if !output.status.success() {
        return Err(Error::Other(anyhow::anyhow!(
            "extractor exited with {:?}",
            output.status.code()
        )));
    }
    let bytes = bytes::Bytes::from(output.stdout);
    if !is_valid_video(&bytes) {
        if crate::validity::looks_like_html_bytes(&bytes) {
            return Err(Error::ContentNotVideo);
        }
        return Err(Error::Other(anyhow::anyhow!(
            "extractor: payload failed validity test"
        )));
    }
    Ok(Candidate {
        bytes,
        filename: filename_from_url(url),
    })
}

/// Strategy 4: an external headless-browser driver, invoked the same way
/// as the CLI fetcher/extractor. The driver loads the page, intercepts
/// network responses, reads `video.src`/`currentSrc`, and prints a
/// newline-separated list of candidate URLs (sorted by content-length
/// descending) to stdout; this function fetches each with page
/// Referer/Origin headers until one validates.
pub async fn headless_browser(
    client: &reqwest::Client,
    driver_binary: &str,
    page_url: &url::Url,
) -> Result<Candidate, Error> {
    let output = tokio::process::Command::new(driver_binary)
        .arg("--url")
        .arg(page_url.as_str())
        .arg("--timeout-ms")
        .arg("45000")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| anyhow::anyhow!("headless_browser spawn failed: {e}"))?;

    if !output.status.success() {
        return Err(Error::Other(anyhow::anyhow!(
            "headless_browser exited with {:?}",
            output.status.code()
        )));
    }

    let listing = String::from_utf8_lossy(&output.stdout);
    let mut saw_html = false;
    for candidate_url in listing.lines().filter(|l| !l.trim().is_empty()) {
        let Ok(parsed) = url::Url::parse(candidate_url.trim()) else {
            continue;
        };
        let mut req = client.get(parsed.clone());
        req = req
            .header("Referer", page_url.as_str())
            .header("Origin", page_url.origin().ascii_serialization());
        let Ok(resp) = req.send().await else {
            continue;
        };
        let Ok(bytes) = resp.bytes().await else {
            continue;
        };
        if is_valid_video(&bytes) {
            return Ok(Candidate {
                bytes,
                filename: filename_from_url(&parsed),
            });
        }
        saw_html |= crate::validity::looks_like_html_bytes(&bytes);
    }
    if saw_html {
        Err(Error::ContentNotVideo)
    } else {
        Err(Error::Other(anyhow::anyhow!(
            "headless_browser: no candidate validated"
        )))
    }
}

fn page_scrape_patterns() -> Vec<Regex> {
    vec![
        Regex::new(r#""(?:video_url|videoUrl|contentUrl|src)"\s*:\s*"([^"]+\.mp4[^"]*)""#).unwrap(),
        Regex::new(r#"<video[^>]*\ssrc="([^"]+)""#).unwrap(),
        Regex::new(r#"<source[^>]*\ssrc="([^"]+)""#).unwrap(),
        Regex::new(r#"data-(?:video-url|src)="([^"]+\.mp4[^"]*)""#).unwrap(),
        Regex::new(r#"(https?://[^"'\s]+\.mp4[^"'\s]*)"#).unwrap(),
    ]
}

/// Strategy 5: fetch the HTML and regex-extract candidate video URLs.
pub async fn page_scrape(client: &reqwest::Client, page_url: &url::Url) -> Result<Candidate, Error> {
    let html = client
        .get(page_url.clone())
        .header("User-Agent", BROWSER_HEADERS[0].1)
        .send()
        .await
        .map_err(|e| anyhow::anyhow!(e))?
        .text()
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    let mut saw_html = false;
    for pattern in page_scrape_patterns() {
        for capture in pattern.captures_iter(&html) {
            let Some(candidate) = capture.get(1) else {
                continue;
            };
            let Ok(parsed) = page_url.join(candidate.as_str()) else {
                continue;
            };
            let Ok(resp) = client.get(parsed.clone()).send().await else {
                continue;
            };
            let Ok(bytes) = resp.bytes().await else {
                continue;
            };
            if is_valid_video(&bytes) {
                return Ok(Candidate {
                    bytes,
                    filename: filename_from_url(&parsed),
                });
            }
            saw_html |= crate::validity::looks_like_html_bytes(&bytes);
        }
    }
    if saw_html {
        Err(Error::ContentNotVideo)
    } else {
        Err(Error::Other(anyhow::anyhow!(
            "page_scrape: no candidate validated"
        )))
    }
}

pub const STRATEGY_TIMEOUT_DEFAULT: Duration = Duration::from_secs(90);
pub const HEADLESS_BROWSER_TIMEOUT: Duration = Duration::from_secs(45);
