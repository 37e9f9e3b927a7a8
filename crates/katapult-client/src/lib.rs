mod error;
mod wire;

use std::time::Duration;

use katapult_core::{Node, PatchBody, Photo};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

pub use error::{UpstreamError, UpstreamResult};
pub use wire::NewJob;

pub const DEFAULT_BASE_URL: &str = "https://dcs.katapultpro.com/api/v3";

/// Calls the upstream job API with the caller's api key.
///
/// Listing and job creation fail on any non-2xx status. Per-node calls
/// (`update_node`, `delete_node`) never fail: whatever came back, success or
/// not, is returned as JSON so one bad node does not stop a batch.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: String,
}

impl UpstreamClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Like `new`, with a per-request timeout. `None` keeps the HTTP
    /// client's default.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Option<Duration>) -> UpstreamResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn list_nodes(&self, api_key: &str, job_id: &str) -> UpstreamResult<Vec<Node>> {
        let path = format!("jobs/{job_id}/nodes");
        let listing: wire::NodeListing = self.get_json(&path, api_key).await?;
        let nodes = listing.data.unwrap_or_default().into_nodes();
        debug!(job_id, count = nodes.len(), "fetched nodes");
        Ok(nodes)
    }

    pub async fn list_photos(&self, api_key: &str, job_id: &str) -> UpstreamResult<Vec<Photo>> {
        let path = format!("jobs/{job_id}/photos");
        let listing: wire::PhotoListing = self.get_json(&path, api_key).await?;
        let photos = listing.data.unwrap_or_default();
        debug!(job_id, count = photos.len(), "fetched photos");
        Ok(photos)
    }

    pub async fn create_job(&self, api_key: &str, job: &NewJob) -> UpstreamResult<Value> {
        debug!(name = %job.name, model = %job.model, "creating job");
        let request = self.http.post(self.url("jobs")).json(job);
        let body = send_expecting_success(with_key(request, api_key)).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Sends `patch` for one node and returns the upstream reply.
    pub async fn update_node(&self, api_key: &str, job_id: &str, node_id: &str, patch: &PatchBody) -> Value {
        let url = self.url(&format!("jobs/{job_id}/nodes/{node_id}"));
        let request = self.http.post(url).json(patch);
        match with_key(request, api_key).send().await {
            Ok(response) => {
                if !response.status().is_success() {
                    warn!(node_id, status = %response.status(), "node update rejected");
                }
                body_as_json(response).await
            }
            Err(e) => {
                warn!(node_id, error = %e, "node update failed");
                Value::String(e.to_string())
            }
        }
    }

    /// Deletes one node. A rejected delete is reported as the raw body text.
    pub async fn delete_node(&self, api_key: &str, job_id: &str, node_id: &str) -> Value {
        let url = self.url(&format!("jobs/{job_id}/nodes/{node_id}"));
        match with_key(self.http.delete(url), api_key).send().await {
            Ok(response) if response.status().is_success() => body_as_json(response).await,
            Ok(response) => {
                warn!(node_id, status = %response.status(), "node delete rejected");
                Value::String(response.text().await.unwrap_or_else(|e| e.to_string()))
            }
            Err(e) => {
                warn!(node_id, error = %e, "node delete failed");
                Value::String(e.to_string())
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, api_key: &str) -> UpstreamResult<T> {
        let request = self.http.get(self.url(path));
        let body = send_expecting_success(with_key(request, api_key)).await?;
        Ok(serde_json::from_str(&body)?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

fn with_key(request: RequestBuilder, api_key: &str) -> RequestBuilder {
    request.query(&[("api_key", api_key)])
}

async fn send_expecting_success(request: RequestBuilder) -> UpstreamResult<String> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;
    if status.is_success() {
        Ok(body)
    } else {
        warn!(status = status.as_u16(), "upstream rejected request");
        Err(UpstreamError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

/// The body parsed as JSON, or the text itself when it is not JSON.
async fn body_as_json(response: Response) -> Value {
    match response.text().await {
        Ok(text) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
        Err(e) => Value::String(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Nothing listens on the discard port locally, so connects are refused.
    const UNREACHABLE: &str = "http://127.0.0.1:9/api/v3";

    #[test]
    fn url_joins_without_double_slash() {
        let client = UpstreamClient::new("https://example.test/api/v3/");
        assert_eq!(client.url("jobs"), "https://example.test/api/v3/jobs");
    }

    #[tokio::test]
    async fn listing_transport_failure_is_an_error() {
        let client = UpstreamClient::new(UNREACHABLE);
        let err = client.list_nodes("key", "job").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Transport(_)));
    }

    #[tokio::test]
    async fn per_node_transport_failure_is_reported_not_raised() {
        let client = UpstreamClient::new(UNREACHABLE);
        let result = client.delete_node("key", "job", "n1").await;
        assert!(result.is_string());

        let patch = PatchBody::RemoveAttributes(vec!["note".into()]);
        let result = client.update_node("key", "job", "n1", &patch).await;
        assert!(result.is_string());
    }
}
