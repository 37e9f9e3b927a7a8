use thiserror::Error;

/// Failure of a listing or job call against the upstream API.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Upstream answered with a non-2xx status. The body is kept verbatim so
    /// it can be relayed to the caller unchanged.
    #[error("upstream responded with status {status}")]
    Status { status: u16, body: String },

    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected upstream payload: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type UpstreamResult<T> = Result<T, UpstreamError>;
