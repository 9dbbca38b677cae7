use thiserror::Error;

/// Failures while talking to the site: loading its JSON documents or
/// posting the contact form.
#[derive(Debug, Error)]
pub enum SiteError {
    #[error("invalid url {0}")]
    Url(String),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server answered {0}")]
    Status(reqwest::StatusCode),
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed document: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("could not build audio pipeline: {0}")]
    Pipeline(String),
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("track {index} out of range ({len} tracks)")]
    InvalidIndex { index: usize, len: usize },
    #[error(transparent)]
    Engine(#[from] EngineError),
}
