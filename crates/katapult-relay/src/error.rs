//! Relay error types and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use katapult_client::UpstreamError;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum RelayError {
    /// A required query parameter is absent or empty. The message is sent
    /// to the caller as is.
    #[error("{0}")]
    MissingParameters(&'static str),

    /// A query parameter that must hold JSON does not decode.
    #[error("Malformed {param} parameter: {source}")]
    MalformedInput {
        param: &'static str,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("response serialization failed: {0}")]
    Serialize(serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type RelayResult<T> = Result<T, RelayError>;

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MissingParameters(_) | RelayError::MalformedInput { .. } => {
                StatusCode::BAD_REQUEST
            }
            RelayError::Upstream(UpstreamError::Status { status, .. }) => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            // Upstream rejections are relayed verbatim.
            RelayError::Upstream(UpstreamError::Status { body, .. }) => body,
            rejected @ (RelayError::MissingParameters(_) | RelayError::MalformedInput { .. }) => {
                rejected.to_string()
            }
            other => format!("Error processing request: {other}"),
        };
        if status.is_server_error() {
            warn!(%status, "request failed: {body}");
        } else {
            warn!(%status, "request rejected");
        }
        (status, body).into_response()
    }
}
