#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use gstate_contracts::wire::{
    BatchGetRequest, BatchGetResponse, DeleteRequest, DeleteResponse, ErrorResponse, GetRequest,
    GetResponse, PutRequest, PutResponse, SeekRequest, SeekResponse, ROUTE_BATCH_GET,
    ROUTE_DELETE, ROUTE_GET, ROUTE_PUT, ROUTE_SEEK, SHARED_SECRET_PARAM,
};
use gstate_dispatch::{GlobalState, GlobalStateError, GlobalStateOp, GlobalStateRepo};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{error, warn};

pub const HTTP_BIND_DEFAULT: &str = "127.0.0.1:17001";
pub const MAX_REQUEST_BODY_BYTES_DEFAULT: usize = 20 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterConfig {
    pub bind: String,
    /// Inbound calls must carry this in `?shared_secret=`. `None` disables the check.
    pub shared_secret: Option<String>,
    pub max_request_body_bytes: usize,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            bind: HTTP_BIND_DEFAULT.to_string(),
            shared_secret: None,
            max_request_body_bytes: MAX_REQUEST_BODY_BYTES_DEFAULT,
        }
    }
}

impl AdapterConfig {
    pub fn from_env() -> Self {
        Self {
            bind: env::var("GSTATE_HTTP_BIND").unwrap_or_else(|_| HTTP_BIND_DEFAULT.to_string()),
            shared_secret: env::var("GSTATE_SHARED_SECRET")
                .ok()
                .filter(|v| !v.is_empty()),
            max_request_body_bytes: parse_max_request_body_bytes_from_env(),
        }
    }
}

fn parse_max_request_body_bytes_from_env() -> usize {
    env::var("GSTATE_MAX_REQUEST_BODY_BYTES")
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|v| (1024..=256 * 1024 * 1024).contains(v))
        .unwrap_or(MAX_REQUEST_BODY_BYTES_DEFAULT)
}

#[derive(Clone)]
struct AppState {
    global_state: Arc<GlobalState>,
    secret_digest: Option<[u8; 32]>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub mode: String,
}

/// Routes for the five global-state endpoints plus `/healthz`. The global-state routes sit
/// behind the shared-secret check and the body limit; the handlers assume both ran.
pub fn router(global_state: Arc<GlobalState>, config: &AdapterConfig) -> Router {
    let state = AppState {
        global_state,
        secret_digest: config.shared_secret.as_deref().map(secret_digest),
    };
    let global_state_routes = Router::new()
        .route(ROUTE_PUT, post(put_remote))
        .route(ROUTE_GET, post(get_remote))
        .route(ROUTE_BATCH_GET, post(batch_get_remote))
        .route(ROUTE_DELETE, post(delete_remote))
        .route(ROUTE_SEEK, post(seek_remote))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_shared_secret,
        ))
        .layer(DefaultBodyLimit::max(config.max_request_body_bytes));
    Router::new()
        .route("/healthz", get(healthz))
        .merge(global_state_routes)
        .with_state(state)
}

fn secret_digest(secret: &str) -> [u8; 32] {
    Sha256::digest(secret.as_bytes()).into()
}

async fn require_shared_secret(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.secret_digest else {
        return next.run(request).await;
    };
    // Compare digests so the comparison time does not depend on the secret's contents.
    let supplied = params.get(SHARED_SECRET_PARAM).map(|s| secret_digest(s));
    if supplied != Some(expected) {
        warn!(path = %request.uri().path(), "rejected global state call with bad shared secret");
        return error_response(StatusCode::FORBIDDEN, "invalid shared_secret".to_string());
    }
    next.run(request).await
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(ErrorResponse { error: message })).into_response()
}

fn bad_request(message: String) -> Response {
    error_response(StatusCode::BAD_REQUEST, message)
}

/// Decode, run the primitive on a blocking worker, encode. Every failure is a client error
/// naming the endpoint, matching what forwarding instances expect back.
async fn handle<Req, Resp, F>(
    state: AppState,
    endpoint: &'static str,
    op: GlobalStateOp,
    body: Bytes,
    run: F,
) -> Response
where
    Req: DeserializeOwned + Send + 'static,
    Resp: Serialize + Send + 'static,
    F: FnOnce(&GlobalState, Req) -> Result<Resp, GlobalStateError> + Send + 'static,
{
    let request: Req = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => return bad_request(format!("{endpoint}: Problem parsing request body: {err}")),
    };
    let global_state = state.global_state.clone();
    let result = tokio::task::spawn_blocking(move || run(&*global_state, request)).await;
    let response = match result {
        Ok(Ok(response)) => response,
        Ok(Err(err)) => {
            warn!(endpoint, error = %err, "global state call failed");
            return bad_request(format!("{endpoint}: Error processing {op}: {err}"));
        }
        Err(join_err) => {
            error!(endpoint, error = %join_err, "global state worker did not complete");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("{endpoint}: worker failed"),
            );
        }
    };
    match serde_json::to_vec(&response) {
        Ok(bytes) => (
            StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            bytes,
        )
            .into_response(),
        Err(err) => bad_request(format!("{endpoint}: Problem encoding response as JSON: {err}")),
    }
}

async fn put_remote(State(state): State<AppState>, body: Bytes) -> Response {
    handle(
        state,
        "GlobalStatePutRemote",
        GlobalStateOp::Put,
        body,
        |gs, req: PutRequest| gs.put(&req.key, &req.value).map(|()| PutResponse {}),
    )
    .await
}

async fn get_remote(State(state): State<AppState>, body: Bytes) -> Response {
    handle(
        state,
        "GlobalStateGetRemote",
        GlobalStateOp::Get,
        body,
        |gs, req: GetRequest| gs.get(&req.key).map(|value| GetResponse { value }),
    )
    .await
}

async fn batch_get_remote(State(state): State<AppState>, body: Bytes) -> Response {
    handle(
        state,
        "GlobalStateBatchGetRemote",
        GlobalStateOp::BatchGet,
        body,
        |gs, req: BatchGetRequest| {
            gs.batch_get(&req.key_list)
                .map(|value_list| BatchGetResponse { value_list })
        },
    )
    .await
}

async fn delete_remote(State(state): State<AppState>, body: Bytes) -> Response {
    handle(
        state,
        "GlobalStateDeleteRemote",
        GlobalStateOp::Delete,
        body,
        |gs, req: DeleteRequest| gs.delete(&req.key).map(|()| DeleteResponse {}),
    )
    .await
}

async fn seek_remote(State(state): State<AppState>, body: Bytes) -> Response {
    handle(
        state,
        "GlobalStateSeekRemote",
        GlobalStateOp::Seek,
        body,
        |gs, req: SeekRequest| {
            gs.seek(&req).map(|found| SeekResponse {
                keys_found: found.keys,
                vals_found: found.values,
            })
        },
    )
    .await
}

async fn healthz(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            mode: state.global_state.mode().to_string(),
        }),
    )
}
