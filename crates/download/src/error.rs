#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("URL rejected by SSRF policy")]
    Ssrf(#[from] netguard::SsrfError),

    #[error("every download strategy failed")]
    AllStrategiesFailed,

    #[error("downloaded content is an HTML page, not a video")]
    ContentNotVideo,

    #[error("strategy {strategy} timed out after {elapsed:?}")]
    Timeout {
        strategy: &'static str,
        elapsed: std::time::Duration,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
