pub mod config;
pub mod error;
pub mod handlers;
pub mod params;

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    CONTENT_TYPE,
};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get, post};
use axum::Router;
use katapult_client::UpstreamClient;
use serde::Serialize;

pub use config::{Cli, RelaySettings};
pub use error::{RelayError, RelayResult};

pub struct AppState {
    pub upstream: UpstreamClient,
    pub default_job_id: String,
    pub allowed_origin: HeaderValue,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn from_settings(settings: &RelaySettings) -> RelayResult<Self> {
        let upstream =
            UpstreamClient::with_timeout(settings.upstream_base_url.clone(), settings.request_timeout())?;
        let allowed_origin = HeaderValue::from_str(&settings.allowed_origin)
            .map_err(|e| RelayError::Config(format!("allowed origin '{}': {e}", settings.allowed_origin)))?;
        Ok(Self {
            upstream,
            default_job_id: settings.default_job_id.clone(),
            allowed_origin,
        })
    }
}

/// Build the full relay application from settings.
pub fn app(settings: &RelaySettings) -> RelayResult<Router> {
    Ok(router(Arc::new(AppState::from_settings(settings)?)))
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", any(handlers::health))
        .route("/filter_nodes", any(handlers::filter_nodes))
        .route(
            "/get_nodes_with_attribute_filter",
            get(handlers::nodes_with_attribute_filter).fallback(method_not_allowed),
        )
        .route(
            "/create_job",
            post(handlers::create_job).fallback(method_not_allowed),
        )
        .route(
            "/get_nodes_with_photos",
            post(handlers::nodes_with_photos).fallback(method_not_allowed),
        )
        .route(
            "/update_node_attributes",
            post(handlers::update_node_attributes).fallback(method_not_allowed),
        )
        .route(
            "/delete_nodes_by_attribute",
            post(handlers::delete_nodes_by_attribute).fallback(method_not_allowed),
        )
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), cors))
        .with_state(state)
}

async fn method_not_allowed() -> Response {
    (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed").into_response()
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}

/// Adds the CORS headers to every response and answers preflights directly.
async fn cors(State(state): State<SharedState>, request: Request, next: Next) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, state.allowed_origin.clone());
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response
}

/// JSON body indented with two spaces.
pub struct PrettyJson<T>(pub T);

impl<T: Serialize> IntoResponse for PrettyJson<T> {
    fn into_response(self) -> Response {
        match serde_json::to_string_pretty(&self.0) {
            Ok(body) => (
                [(CONTENT_TYPE, HeaderValue::from_static("application/json"))],
                body,
            )
                .into_response(),
            Err(e) => RelayError::Serialize(e).into_response(),
        }
    }
}
