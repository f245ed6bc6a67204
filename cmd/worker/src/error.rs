//! Classifies a pipeline-stage failure into the two outcomes §4.2/§7
//! recognizes: one that should be surfaced as a terminal job failure
//! (deterministic/content/infra-permanent), and one the queue's own retry
//! with backoff should absorb (transient/timeout).

#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("{message}")]
    Terminal { code: &'static str, message: String },

    #[error(transparent)]
    Transient(#[from] anyhow::Error),
}

impl StageError {
    pub fn terminal(code: &'static str, message: impl Into<String>) -> Self {
        StageError::Terminal {
            code,
            message: message.into(),
        }
    }
}

impl From<download::Error> for StageError {
    fn from(err: download::Error) -> Self {
        match err {
            download::Error::Ssrf(e) => {
                StageError::terminal("INVALID_VIDEO_URL", format!("Invalid video URL: {e}"))
            }
            download::Error::AllStrategiesFailed => StageError::terminal(
                "DOWNLOAD_FAILED",
                "Unable to download the source video from the provided URL.",
            ),
            download::Error::ContentNotVideo => StageError::terminal(
                "CONTENT_NOT_VIDEO",
                "Downloaded file is a webpage, not a video. Please check the URL and try again.",
            ),
            download::Error::Timeout { .. } | download::Error::Other(_) => {
                StageError::Transient(anyhow::anyhow!(err))
            }
        }
    }
}

impl From<transform::Error> for StageError {
    fn from(err: transform::Error) -> Self {
        match err {
            transform::Error::UnrecognizedMedia => StageError::terminal(
                "CONTENT_NOT_VIDEO",
                "Downloaded file is a webpage, not a video. Please check the URL and try again.",
            ),
            transform::Error::ToolchainFailed(_) | transform::Error::Spawn(_) => {
                StageError::terminal("TOOLCHAIN_FAILED", "The video could not be processed due to an internal tooling error.")
            }
            transform::Error::InpaintRequest(_)
            | transform::Error::InpaintStatus(_)
            | transform::Error::Encode(_)
            | transform::Error::Other(_) => StageError::Transient(anyhow::anyhow!(err)),
        }
    }
}

impl From<store::Error> for StageError {
    fn from(err: store::Error) -> Self {
        StageError::Transient(anyhow::anyhow!(err))
    }
}

impl From<std::io::Error> for StageError {
    fn from(err: std::io::Error) -> Self {
        StageError::Transient(anyhow::anyhow!(err))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn is_terminal(err: StageError) -> bool {
        matches!(err, StageError::Terminal { .. })
    }

    #[test]
    fn ssrf_rejection_is_terminal() {
        let err = download::Error::Ssrf(netguard::SsrfError::BlockedHost("169.254.169.254".into()));
        assert!(is_terminal(StageError::from(err)));
    }

    #[test]
    fn exhausted_download_strategies_is_terminal() {
        assert!(is_terminal(StageError::from(download::Error::AllStrategiesFailed)));
    }

    #[test]
    fn html_download_content_is_terminal_with_the_scripted_message() {
        let err = StageError::from(download::Error::ContentNotVideo);
        match err {
            StageError::Terminal { code, message } => {
                assert_eq!(code, "CONTENT_NOT_VIDEO");
                assert!(message.contains("webpage"));
            }
            StageError::Transient(_) => panic!("expected terminal"),
        }
    }

    #[test]
    fn download_timeout_is_transient() {
        let err = download::Error::Timeout {
            strategy: "direct_http",
            elapsed: std::time::Duration::from_secs(30),
        };
        assert!(!is_terminal(StageError::from(err)));
    }

    #[test]
    fn unrecognized_media_is_terminal_with_the_scripted_message() {
        let err = StageError::from(transform::Error::UnrecognizedMedia);
        match err {
            StageError::Terminal { code, message } => {
                assert_eq!(code, "CONTENT_NOT_VIDEO");
                assert!(message.contains("webpage"));
            }
            StageError::Transient(_) => panic!("expected terminal"),
        }
    }

    #[test]
    fn inpaint_backend_failure_is_transient() {
        let err = transform::Error::InpaintStatus(reqwest::StatusCode::BAD_GATEWAY);
        assert!(!is_terminal(StageError::from(err)));
    }
}
