use thiserror::Error;

/// A page could not be retrieved. Always transient from the crawl's point of view.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("page {page} returned HTTP {status}")]
    Status {
        page: u32,
        status: reqwest::StatusCode,
    },
}

impl FetchError {
    /// Rate limiting and server-side errors are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Request(e) => e.is_timeout() || e.is_connect(),
            FetchError::Status { status, .. } => {
                *status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
        }
    }
}

/// Connection-level storage failure; the whole batch is lost.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// A single extraction strategy gave up on a page.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid selector {selector:?}: {reason}")]
    Selector { selector: String, reason: String },
    #[error("panicked: {0}")]
    Panicked(String),
}

impl ExtractError {
    /// Wraps the payload of a caught panic.
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        ExtractError::Panicked(message)
    }
}
