#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use katapult_relay::RelaySettings;
use serde_json::{json, Value};

pub const API_KEY: &str = "test-key";

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: &'static str,
    pub path: String,
    pub api_key: Option<String>,
    pub body: Option<Value>,
}

/// Stand-in for the upstream job API. Serves canned listings and records
/// every call it receives.
pub struct FakeUpstream {
    nodes: Value,
    photos: Value,
    nodes_status: StatusCode,
    photos_status: StatusCode,
    failing_nodes: Vec<String>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeUpstream {
    /// `nodes` becomes the `data` field of the node listing.
    pub fn with_nodes(nodes: Value) -> Self {
        Self {
            nodes,
            photos: json!([]),
            nodes_status: StatusCode::OK,
            photos_status: StatusCode::OK,
            failing_nodes: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn photos(mut self, photos: Value) -> Self {
        self.photos = photos;
        self
    }

    pub fn reject_nodes(mut self, status: StatusCode) -> Self {
        self.nodes_status = status;
        self
    }

    pub fn reject_photos(mut self, status: StatusCode) -> Self {
        self.photos_status = status;
        self
    }

    /// Per-node update and delete calls for `node_id` are rejected.
    pub fn fail_node(mut self, node_id: &str) -> Self {
        self.failing_nodes.push(node_id.to_string());
        self
    }

    fn record(&self, method: &'static str, path: String, query: &HashMap<String, String>, body: Option<Value>) {
        self.calls.lock().unwrap().push(RecordedCall {
            method,
            path,
            api_key: query.get("api_key").cloned(),
            body,
        });
    }
}

pub struct Harness {
    pub relay: String,
    pub client: reqwest::Client,
    upstream: Arc<FakeUpstream>,
}

impl Harness {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.relay, path)
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.upstream.calls.lock().unwrap().clone()
    }

    pub fn calls_with_method(&self, method: &str) -> Vec<RecordedCall> {
        self.calls().into_iter().filter(|c| c.method == method).collect()
    }
}

pub async fn start(fake: FakeUpstream) -> Harness {
    let upstream = Arc::new(fake);
    let upstream_url = serve(fake_router(upstream.clone())).await;

    let settings = RelaySettings {
        upstream_base_url: format!("{upstream_url}/api/v3"),
        ..RelaySettings::default()
    };
    let relay = serve(katapult_relay::app(&settings).unwrap()).await;

    Harness {
        relay,
        client: reqwest::Client::new(),
        upstream,
    }
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

type Fake = State<Arc<FakeUpstream>>;
type Params = Query<HashMap<String, String>>;

fn fake_router(upstream: Arc<FakeUpstream>) -> Router {
    Router::new()
        .route("/api/v3/jobs", post(create_job))
        .route("/api/v3/jobs/:job_id/nodes", get(list_nodes))
        .route("/api/v3/jobs/:job_id/photos", get(list_photos))
        .route(
            "/api/v3/jobs/:job_id/nodes/:node_id",
            post(update_node).delete(delete_node),
        )
        .with_state(upstream)
}

async fn list_nodes(State(fake): Fake, Path(job_id): Path<String>, Query(query): Params) -> Response {
    fake.record("GET", format!("/jobs/{job_id}/nodes"), &query, None);
    if fake.nodes_status != StatusCode::OK {
        return (fake.nodes_status, "Invalid api key").into_response();
    }
    Json(json!({ "data": fake.nodes })).into_response()
}

async fn list_photos(State(fake): Fake, Path(job_id): Path<String>, Query(query): Params) -> Response {
    fake.record("GET", format!("/jobs/{job_id}/photos"), &query, None);
    if fake.photos_status != StatusCode::OK {
        return (fake.photos_status, "Photo service unavailable").into_response();
    }
    Json(json!({ "data": fake.photos })).into_response()
}

async fn create_job(State(fake): Fake, Query(query): Params, Json(body): Json<Value>) -> Response {
    fake.record("POST", "/jobs".to_string(), &query, Some(body.clone()));
    Json(json!({ "id": "-NewJob", "name": body["name"], "metadata": body["metadata"] })).into_response()
}

async fn update_node(
    State(fake): Fake,
    Path((job_id, node_id)): Path<(String, String)>,
    Query(query): Params,
    Json(body): Json<Value>,
) -> Response {
    fake.record("POST", format!("/jobs/{job_id}/nodes/{node_id}"), &query, Some(body.clone()));
    if fake.failing_nodes.contains(&node_id) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response();
    }
    Json(json!({ "id": node_id, "applied": body })).into_response()
}

async fn delete_node(
    State(fake): Fake,
    Path((job_id, node_id)): Path<(String, String)>,
    Query(query): Params,
) -> Response {
    fake.record("DELETE", format!("/jobs/{job_id}/nodes/{node_id}"), &query, None);
    if fake.failing_nodes.contains(&node_id) {
        return (StatusCode::NOT_FOUND, "Node not found").into_response();
    }
    Json(json!({ "deleted": node_id })).into_response()
}
