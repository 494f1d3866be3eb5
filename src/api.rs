//! Read-only HTTP view of the latest index pass, for debugging a running
//! host from a browser or `curl`.

use std::net::SocketAddr;

use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::error::AgentError;
use crate::inspect;

// ── Response types ───────────────────────────────────────────────

#[derive(Serialize)]
struct ApiOk<T: Serialize> {
    ok: bool,
    data: T,
}

#[derive(Serialize)]
struct ApiErr {
    ok: bool,
    error: String,
}

fn ok_json<T: Serialize>(data: T) -> impl IntoResponse {
    Json(ApiOk { ok: true, data })
}

fn err_json(status: StatusCode, msg: String) -> impl IntoResponse {
    (status, Json(ApiErr { ok: false, error: msg }))
}

// ── Handlers ─────────────────────────────────────────────────────

async fn get_semantic() -> impl IntoResponse {
    let snapshot = inspect::latest();
    match &snapshot.semantic_structure {
        Some(root) => ok_json(root).into_response(),
        None => err_json(StatusCode::NOT_FOUND, "No UI root indexed".to_string()).into_response(),
    }
}

async fn get_registry() -> impl IntoResponse {
    ok_json(&inspect::latest().registry).into_response()
}

async fn get_action_map() -> impl IntoResponse {
    ok_json(&inspect::latest().action_map).into_response()
}

async fn get_action(Path(id): Path<String>) -> impl IntoResponse {
    let snapshot = inspect::latest();
    match snapshot.action_map.get(&id) {
        Some(entry) => ok_json(entry).into_response(),
        None => err_json(
            StatusCode::NOT_FOUND,
            AgentError::NotFound {
                what: format!("Action {id}"),
            }
            .to_string(),
        )
        .into_response(),
    }
}

pub fn router() -> Router {
    Router::new()
        .route("/semantic", get(get_semantic))
        .route("/registry", get(get_registry))
        .route("/action-map", get(get_action_map))
        .route("/action-map/{id}", get(get_action))
        .layer(CorsLayer::permissive())
}

// ── Server startup ───────────────────────────────────────────────

/// Start the inspection server on `addr` (port 0 picks a free one). Returns
/// the bound address.
pub async fn start_inspect_server(addr: SocketAddr) -> Result<SocketAddr, AgentError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router()).await {
            tracing::error!(error = %e, "inspection server stopped");
        }
    });

    tracing::info!(%bound, "inspection server listening");
    Ok(bound)
}
