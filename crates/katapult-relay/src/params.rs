use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{RelayError, RelayResult};

// --- Query parameters, one struct per endpoint ---

#[derive(Debug, Default, Deserialize)]
pub struct FilterNodesQuery {
    pub api_key: Option<String>,
    pub job_id: Option<String>,
    /// Accepted for compatibility; filtering does not use it.
    pub node_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateJobQuery {
    pub api_key: Option<String>,
    pub job_name: Option<String>,
    pub model_type: Option<String>,
    /// JSON, passed upstream as the job metadata.
    pub metadata: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct JobQuery {
    pub api_key: Option<String>,
    pub job_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateAttributesQuery {
    pub api_key: Option<String>,
    pub job_id: Option<String>,
    pub attribute_filters: Option<String>,
    pub new_attributes: Option<String>,
    pub operation: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteByAttributeQuery {
    pub api_key: Option<String>,
    pub job_id: Option<String>,
    pub attribute_filters: Option<String>,
}

/// An empty parameter counts as not given.
pub fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Decode a query parameter that carries JSON.
pub fn decode_json<T: DeserializeOwned>(param: &'static str, raw: &str) -> RelayResult<T> {
    serde_json::from_str(raw).map_err(|source| RelayError::MalformedInput { param, source })
}
