use katapult_core::{NodeCollection, Photo};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub(crate) struct NodeListing {
    #[serde(default)]
    pub data: Option<NodeCollection>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PhotoListing {
    #[serde(default)]
    pub data: Option<Vec<Photo>>,
}

/// Body of the job creation call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewJob {
    pub name: String,
    /// Upstream job model to instantiate.
    pub model: String,
    /// Sent as `null` when the caller gave none.
    pub metadata: Option<Value>,
}
