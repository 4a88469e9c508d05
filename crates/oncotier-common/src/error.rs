use thiserror::Error;

#[derive(Debug, Error)]
pub enum OncotierError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unsupported variant class: {0}")]
    UnsupportedVariantKind(String),

    #[error("Unrecognized variant notation: {0}")]
    UnrecognizedNotation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Security policy violation: {0}")]
    Security(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl OncotierError {
    /// Admission errors stop the pipeline before any source is queried.
    pub fn is_admission(&self) -> bool {
        matches!(
            self,
            OncotierError::UnsupportedVariantKind(_) | OncotierError::UnrecognizedNotation(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, OncotierError>;
