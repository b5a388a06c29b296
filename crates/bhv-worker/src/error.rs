//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Classifier setup failed: {0}")]
    ClassifierSetup(String),

    #[error("Narrative request failed: {0}")]
    NarrativeFailed(String),

    #[error("Metrics export failed: {0}")]
    MetricsFailed(String),

    #[error("Media error: {0}")]
    Media(#[from] bhv_media::MediaError),

    #[error("ML client error: {0}")]
    Ml(#[from] bhv_ml_client::MlError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn classifier_setup(msg: impl Into<String>) -> Self {
        Self::ClassifierSetup(msg.into())
    }

    pub fn narrative_failed(msg: impl Into<String>) -> Self {
        Self::NarrativeFailed(msg.into())
    }

    pub fn metrics_failed(msg: impl Into<String>) -> Self {
        Self::MetricsFailed(msg.into())
    }
}
