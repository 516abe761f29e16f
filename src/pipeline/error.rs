#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("provenance unavailable: {0}")]
    ProvenanceUnavailable(String),

    #[error("config unreadable: {0}")]
    ConfigUnreadable(String),

    #[error("config incomplete, missing: {}", .0.join(", "))]
    ConfigIncomplete(Vec<&'static str>),

    #[error("config invalid: {0}")]
    ConfigInvalid(String),

    #[error("bundle failed: {0}")]
    BundleFailed(String),

    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("upload rejected with status {status}: {body}")]
    UploadRejected { status: u16, body: String },

    #[error("malformed response (status {status}): {reason}")]
    MalformedResponse {
        status: u16,
        reason: String,
        body: String,
    },
}

impl PipelineError {
    /// Process exit code for the CLI. Each failure kind gets its own code.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::ProvenanceUnavailable(_) => 2,
            Self::ConfigUnreadable(_) | Self::ConfigIncomplete(_) | Self::ConfigInvalid(_) => 3,
            Self::BundleFailed(_) => 4,
            Self::Transport(_) => 5,
            Self::UploadRejected { .. } => 6,
            Self::MalformedResponse { .. } => 7,
        }
    }

    pub(crate) fn bundle(err: impl std::fmt::Display) -> Self {
        Self::BundleFailed(err.to_string())
    }
}
