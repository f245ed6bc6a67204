#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("media toolchain process failed: {0}")]
    ToolchainFailed(String),

    #[error("failed to spawn media toolchain process")]
    Spawn(#[source] std::io::Error),

    #[error("probe output was not recognizable media metadata")]
    UnrecognizedMedia,

    #[error("inpaint backend request failed")]
    InpaintRequest(#[source] reqwest::Error),

    #[error("inpaint backend returned status {0}")]
    InpaintStatus(reqwest::StatusCode),

    #[error("failed to encode inpaint request parameters")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
