//! The fall-through download chain (§4.4). First strategy to produce a
//! valid payload wins; failures are logged at `debug` and the chain moves
//! on, except for the SSRF check up front, which is unconditional.

mod error;
mod strategies;
mod validity;

pub use error::Error;
pub use validity::is_valid_video;

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub cli_fetcher_binary: Option<String>,
    pub extractor_binary: Option<String>,
    pub headless_browser_binary: Option<String>,
    pub ssrf_policy: netguard::Policy,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            cli_fetcher_binary: Some("curl".to_string()),
            extractor_binary: Some("yt-dlp".to_string()),
            headless_browser_binary: None,
            ssrf_policy: netguard::Policy::open(),
        }
    }
}

pub struct DownloadedVideo {
    pub bytes: bytes::Bytes,
    pub filename: String,
    pub strategy: &'static str,
}

pub async fn download(
    client: &reqwest::Client,
    raw_url: &str,
    config: &DownloadConfig,
) -> Result<DownloadedVideo, Error> {
    let url = netguard::validate_url(raw_url, &config.ssrf_policy).await?;
    // Remembers whether any strategy's failure looked like an HTML page
    // rather than a generic fetch failure, so the final error can carry
    // that distinction once every strategy has been exhausted.
    let mut saw_html = false;

    match try_strategy("direct_http", strategies::STRATEGY_TIMEOUT_DEFAULT, {
        let client = client.clone();
        let url = url.clone();
        async move { strategies::direct_http(&client, &url).await }
    })
    .await
    {
        Ok(candidate) => return Ok(into_downloaded(candidate, "direct_http")),
        Err(err) => saw_html |= matches!(err, Error::ContentNotVideo),
    }

    if let Some(binary) = &config.cli_fetcher_binary {
        match try_strategy("cli_fetcher", strategies::STRATEGY_TIMEOUT_DEFAULT, {
            let binary = binary.clone();
            let url = url.clone();
            async move { strategies::cli_fetcher(&binary, &url).await }
        })
        .await
        {
            Ok(candidate) => return Ok(into_downloaded(candidate, "cli_fetcher")),
            Err(err) => saw_html |= matches!(err, Error::ContentNotVideo),
        }
    }

    if let Some(binary) = &config.extractor_binary {
        for impersonate in [false, true] {
            let label = if impersonate {
                "extractor_impersonate"
            } else {
                "extractor"
            };
            match try_strategy(label, strategies::STRATEGY_TIMEOUT_DEFAULT, {
                let binary = binary.clone();
                let url = url.clone();
                async move { strategies::extractor(&binary, &url, impersonate).await }
            })
            .await
            {
                Ok(candidate) => return Ok(into_downloaded(candidate, label)),
                Err(err) => saw_html |= matches!(err, Error::ContentNotVideo),
            }
        }
    }

    if let Some(binary) = &config.headless_browser_binary {
        match try_strategy("headless_browser", strategies::HEADLESS_BROWSER_TIMEOUT, {
            let client = client.clone();
            let binary = binary.clone();
            let url = url.clone();
            async move { strategies::headless_browser(&client, &binary, &url).await }
        })
        .await
        {
            Ok(candidate) => return Ok(into_downloaded(candidate, "headless_browser")),
            Err(err) => saw_html |= matches!(err, Error::ContentNotVideo),
        }
    }

    match try_strategy("page_scrape", strategies::STRATEGY_TIMEOUT_DEFAULT, {
        let client = client.clone();
        let url = url.clone();
        async move { strategies::page_scrape(&client, &url).await }
    })
    .await
    {
        Ok(candidate) => return Ok(into_downloaded(candidate, "page_scrape")),
        Err(err) => saw_html |= matches!(err, Error::ContentNotVideo),
    }

    if saw_html {
        Err(Error::ContentNotVideo)
    } else {
        Err(Error::AllStrategiesFailed)
    }
}

fn into_downloaded(candidate: strategies::Candidate, strategy: &'static str) -> DownloadedVideo {
    DownloadedVideo {
        bytes: candidate.bytes,
        filename: candidate.filename,
        strategy,
    }
}

async fn try_strategy<F>(
    name: &'static str,
    timeout: Duration,
    fut: F,
) -> Result<strategies::Candidate, Error>
where
    F: std::future::Future<Output = Result<strategies::Candidate, Error>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(candidate)) => Ok(candidate),
        Ok(Err(err)) => {
            tracing::debug!(strategy = name, error = %err, "download strategy failed, trying next");
            Err(err)
        }
        Err(_) => {
            tracing::debug!(strategy = name, ?timeout, "download strategy timed out, trying next");
            Err(Error::Timeout { strategy: name, elapsed: timeout })
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_config_enables_cli_and_extractor_but_not_browser() {
        let config = DownloadConfig::default();
        assert!(config.cli_fetcher_binary.is_some());
        assert!(config.extractor_binary.is_some());
        assert!(config.headless_browser_binary.is_none());
    }

    #[tokio::test]
    async fn try_strategy_passes_through_the_strategy_error_kind() {
        let result = try_strategy("fake", Duration::from_secs(1), async {
            Err(Error::ContentNotVideo)
        })
        .await;
        assert!(matches!(result, Err(Error::ContentNotVideo)));
    }

    #[tokio::test]
    async fn try_strategy_reports_its_own_timeout() {
        let result = try_strategy("fake", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(strategies::Candidate {
                bytes: bytes::Bytes::new(),
                filename: "x".to_string(),
            })
        })
        .await;
        assert!(matches!(result, Err(Error::Timeout { .. })));
    }
}
