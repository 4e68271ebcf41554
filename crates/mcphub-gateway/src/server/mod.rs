//! HTTP surface
//!
//! Only two routes live here: the OAuth callback the provider redirects
//! the browser to, and a health probe. Everything else the orchestrator
//! does is a library call from the embedding request layer.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::{Json, Redirect};
use axum::routing::get;
use axum::Router;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::oauth::{CallbackParams, OAuthFlowService};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub flow: Arc<OAuthFlowService>,
}

/// Build the router. `callback_path` comes from configuration so the
/// registered redirect URI and the served route can never drift apart.
pub fn build_router(state: AppState, callback_path: &str) -> Router {
    Router::new()
        .route(callback_path, get(oauth_callback))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Provider redirect landing. Always answers with a redirect to the UI;
/// every failure mode is encoded in the target's query string.
async fn oauth_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    Redirect::to(&state.flow.handle_callback(params))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "mcp-hub",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
