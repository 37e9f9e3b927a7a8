use axum::extract::{Query, State};
use katapult_client::NewJob;
use katapult_core::{
    filter, mutate, photos, AttributeFilter, NewAttributes, Node, NodeWithPhotos, Operation,
    PatchOutcome,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{RelayError, RelayResult};
use crate::params::{
    decode_json, present, CreateJobQuery, DeleteByAttributeQuery, FilterNodesQuery, JobQuery,
    UpdateAttributesQuery,
};
use crate::{PrettyJson, SharedState};

pub const ENDPOINTS: &[&str] = &[
    "/filter_nodes",
    "/get_nodes_with_attribute_filter",
    "/create_job",
    "/get_nodes_with_photos",
    "/update_node_attributes",
    "/delete_nodes_by_attribute",
];

// --- Response bodies ---

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub message: &'static str,
    pub endpoints: &'static [&'static str],
}

#[derive(Debug, Serialize)]
pub struct FilteredNodes {
    pub data: Vec<Node>,
    pub total: usize,
    pub filters_applied: AttributeFilter,
    pub job_id: String,
}

#[derive(Debug, Serialize)]
pub struct NodesWithPhotos {
    pub data: Vec<NodeWithPhotos>,
    pub total: usize,
    pub job_id: String,
}

/// One entry of an update batch: the upstream reply for a patched node, or
/// the node itself when there was nothing to send.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum UpdatedNode {
    Upstream(Value),
    Unchanged(Node),
}

#[derive(Debug, Serialize)]
pub struct UpdatedNodes {
    pub updated_nodes: Vec<UpdatedNode>,
    pub total_updated: usize,
    pub operation: String,
    pub job_id: String,
}

#[derive(Debug, Serialize)]
pub struct DeletedNode {
    pub deleted_node: Node,
    pub response: Value,
}

#[derive(Debug, Serialize)]
pub struct DeletedNodes {
    pub deleted_nodes: Vec<DeletedNode>,
    pub total_deleted: usize,
    pub job_id: String,
}

// --- Handlers ---

pub async fn health() -> PrettyJson<Health> {
    PrettyJson(Health {
        status: "ok",
        message: "Katapult relay is running",
        endpoints: ENDPOINTS,
    })
}

/// Poles of a job: the fixed filter `node_type = "pole"`.
pub async fn filter_nodes(
    State(state): State<SharedState>,
    Query(query): Query<FilterNodesQuery>,
) -> RelayResult<PrettyJson<FilteredNodes>> {
    let Some(api_key) = present(query.api_key) else {
        return Err(RelayError::MissingParameters("Missing api_key parameter"));
    };
    let job_id = present(query.job_id).unwrap_or_else(|| state.default_job_id.clone());
    if let Some(node_id) = present(query.node_id) {
        debug!(%node_id, "node_id given but not used for filtering");
    }

    let filters = AttributeFilter::new().with("node_type", "pole");
    filtered_nodes(&state, &api_key, job_id, filters).await
}

/// Every query parameter other than `api_key` and `job_id` is a filter on
/// a string-valued attribute. A repeated parameter keeps its last value.
pub async fn nodes_with_attribute_filter(
    State(state): State<SharedState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> RelayResult<PrettyJson<FilteredNodes>> {
    let mut api_key = None;
    let mut job_id = None;
    let mut filters = AttributeFilter::new();
    for (key, value) in pairs {
        match key.as_str() {
            "api_key" => api_key = Some(value),
            "job_id" => job_id = Some(value),
            _ => filters.insert(key, value),
        }
    }

    let Some(api_key) = present(api_key) else {
        return Err(RelayError::MissingParameters("Missing api_key parameter"));
    };
    let job_id = present(job_id).unwrap_or_else(|| state.default_job_id.clone());
    filtered_nodes(&state, &api_key, job_id, filters).await
}

async fn filtered_nodes(
    state: &SharedState,
    api_key: &str,
    job_id: String,
    filters: AttributeFilter,
) -> RelayResult<PrettyJson<FilteredNodes>> {
    let nodes = state.upstream.list_nodes(api_key, &job_id).await?;
    let matching = filter::filter_nodes(nodes, &filters);
    info!(
        %job_id,
        matched = matching.len(),
        filters = %serde_json::to_string(&filters).unwrap_or_default(),
        "filtered nodes"
    );

    Ok(PrettyJson(FilteredNodes {
        total: matching.len(),
        data: matching,
        filters_applied: filters,
        job_id,
    }))
}

pub async fn create_job(
    State(state): State<SharedState>,
    Query(query): Query<CreateJobQuery>,
) -> RelayResult<PrettyJson<Value>> {
    let (Some(api_key), Some(job_name)) = (present(query.api_key), present(query.job_name)) else {
        return Err(RelayError::MissingParameters(
            "Missing required parameters: api_key and job_name",
        ));
    };
    let metadata = present(query.metadata)
        .map(|raw| decode_json::<Value>("metadata", &raw))
        .transpose()?;

    let job = NewJob {
        name: job_name,
        model: present(query.model_type).unwrap_or_else(|| "default".to_string()),
        metadata,
    };
    let created = state.upstream.create_job(&api_key, &job).await?;
    info!(name = %job.name, "created job");
    Ok(PrettyJson(created))
}

/// Nodes and photos are fetched side by side; the request fails if either
/// fetch does, with a node failure reported first.
pub async fn nodes_with_photos(
    State(state): State<SharedState>,
    Query(query): Query<JobQuery>,
) -> RelayResult<PrettyJson<NodesWithPhotos>> {
    let (Some(api_key), Some(job_id)) = (present(query.api_key), present(query.job_id)) else {
        return Err(RelayError::MissingParameters(
            "Missing required parameters: api_key and job_id",
        ));
    };

    let (nodes, job_photos) = tokio::join!(
        state.upstream.list_nodes(&api_key, &job_id),
        state.upstream.list_photos(&api_key, &job_id)
    );
    let nodes = nodes?;
    let job_photos = job_photos?;

    let data = photos::join(nodes, &job_photos);
    info!(%job_id, nodes = data.len(), photos = job_photos.len(), "joined photos");
    Ok(PrettyJson(NodesWithPhotos {
        total: data.len(),
        data,
        job_id,
    }))
}

pub async fn update_node_attributes(
    State(state): State<SharedState>,
    Query(query): Query<UpdateAttributesQuery>,
) -> RelayResult<PrettyJson<UpdatedNodes>> {
    let (Some(api_key), Some(job_id), Some(raw_filters), Some(raw_attributes)) = (
        present(query.api_key),
        present(query.job_id),
        present(query.attribute_filters),
        present(query.new_attributes),
    ) else {
        return Err(RelayError::MissingParameters(
            "Missing required parameters: api_key, job_id, attribute_filters, new_attributes",
        ));
    };
    let filters: AttributeFilter = decode_json("attribute_filters", &raw_filters)?;
    let new_attributes: NewAttributes = decode_json("new_attributes", &raw_attributes)?;
    let operation = present(query.operation)
        .map(|tag| Operation::from(tag.as_str()))
        .unwrap_or_default();

    let nodes = state.upstream.list_nodes(&api_key, &job_id).await?;
    let matching = filter::filter_nodes(nodes, &filters);

    // Sequential on purpose: one node request in flight at a time, in
    // filtered order.
    let mut updated_nodes = Vec::with_capacity(matching.len());
    for node in matching {
        match mutate::build_patch(&node, &new_attributes, &operation) {
            PatchOutcome::Patch(patch) => {
                let reply = state
                    .upstream
                    .update_node(&api_key, &job_id, &node.id, &patch)
                    .await;
                updated_nodes.push(UpdatedNode::Upstream(reply));
            }
            PatchOutcome::Unchanged => updated_nodes.push(UpdatedNode::Unchanged(node)),
            PatchOutcome::Skipped => continue,
        }
    }

    info!(%job_id, operation = operation.as_str(), updated = updated_nodes.len(), "updated node attributes");
    Ok(PrettyJson(UpdatedNodes {
        total_updated: updated_nodes.len(),
        updated_nodes,
        operation: operation.as_str().to_string(),
        job_id,
    }))
}

pub async fn delete_nodes_by_attribute(
    State(state): State<SharedState>,
    Query(query): Query<DeleteByAttributeQuery>,
) -> RelayResult<PrettyJson<DeletedNodes>> {
    let (Some(api_key), Some(job_id), Some(raw_filters)) = (
        present(query.api_key),
        present(query.job_id),
        present(query.attribute_filters),
    ) else {
        return Err(RelayError::MissingParameters(
            "Missing required parameters: api_key, job_id, attribute_filters",
        ));
    };
    let filters: AttributeFilter = decode_json("attribute_filters", &raw_filters)?;

    let nodes = state.upstream.list_nodes(&api_key, &job_id).await?;
    let matching = filter::filter_nodes(nodes, &filters);

    // Same one-at-a-time dispatch as updates.
    let mut deleted_nodes = Vec::with_capacity(matching.len());
    for node in matching {
        let response = state.upstream.delete_node(&api_key, &job_id, &node.id).await;
        deleted_nodes.push(DeletedNode {
            deleted_node: node,
            response,
        });
    }

    info!(%job_id, deleted = deleted_nodes.len(), "deleted nodes by attribute");
    Ok(PrettyJson(DeletedNodes {
        total_deleted: deleted_nodes.len(),
        deleted_nodes,
        job_id,
    }))
}
