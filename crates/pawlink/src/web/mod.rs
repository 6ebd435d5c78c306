//! Web server module: axum HTTP interface for browser peers.
//!
//! Signaling routes are served at the root and again under
//! `/api/signaling`:
//! - `GET|POST|DELETE /offer`
//! - `GET|POST /answer`
//! - `GET|POST /ice-candidate`
//!
//! Plus:
//! - `GET /api/status`: relay counters and live session count
//! - `GET /api/session?id=`: phase and queue depth for one code
//! - Optional static UI files as the fallback service

pub mod error;
pub mod signaling;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::info;

use crate::relay::{AnswerPolicy, SignalingRelay};
use error::ApiError;
use signaling::SignalQuery;

/// Shared state for the web server
pub struct WebState {
    relay: SignalingRelay,
    start_time: Instant,
}

/// Offer, answer and candidate routes, before state is attached
fn signaling_routes() -> Router<Arc<WebState>> {
    Router::new()
        .route(
            "/offer",
            get(signaling::get_offer)
                .post(signaling::post_offer)
                .delete(signaling::delete_offer),
        )
        .route(
            "/answer",
            get(signaling::get_answer).post(signaling::post_answer),
        )
        .route(
            "/ice-candidate",
            get(signaling::get_candidates).post(signaling::post_candidate),
        )
}

/// Build the full application router around a relay.
pub fn router(relay: SignalingRelay) -> Router {
    let state = Arc::new(WebState {
        relay,
        start_time: Instant::now(),
    });

    Router::new()
        .merge(signaling_routes())
        .nest("/api/signaling", signaling_routes())
        .route("/api/status", get(api_status))
        .route("/api/session", get(api_session))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the web server.
///
/// `ui_path`: directory with a built browser UI. If None, only the API
/// endpoints are served.
pub async fn start(relay: SignalingRelay, bind: SocketAddr, ui_path: Option<PathBuf>) -> Result<()> {
    let mut app = router(relay);

    if let Some(ref path) = ui_path {
        if path.exists() {
            info!("Serving UI from {:?}", path);
            app = app.fallback_service(
                ServeDir::new(path).append_index_html_on_directories(true),
            );
        } else {
            tracing::warn!("UI path {:?} does not exist, skipping static file serving", path);
        }
    }

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .context(format!("Failed to bind to {}", bind))?;

    info!("Signaling server listening on http://{}", bind);

    axum::serve(listener, app)
        .await
        .context("Web server error")?;

    Ok(())
}

/// GET /api/status: relay counters
async fn api_status(State(state): State<Arc<WebState>>) -> Result<Json<Value>, ApiError> {
    let stats = state.relay.stats();
    let sessions = state.relay.sessions().await?;
    let policy = match state.relay.config().answer_policy {
        AnswerPolicy::Overwrite => "overwrite",
        AnswerPolicy::Reject => "reject",
    };

    Ok(Json(json!({
        "sessions": sessions,
        "uptime_secs": state.start_time.elapsed().as_secs(),
        "answer_policy": policy,
        "offers_published": stats.offers_published,
        "answers_published": stats.answers_published,
        "answers_rejected": stats.answers_rejected,
        "candidates_published": stats.candidates_published,
        "candidates_delivered": stats.candidates_delivered,
        "sessions_cleared": stats.sessions_cleared,
        "sessions_reaped": stats.sessions_reaped,
    })))
}

/// GET /api/session: inspect one code without creating it
async fn api_session(
    State(state): State<Arc<WebState>>,
    query: SignalQuery,
) -> Result<Json<Value>, ApiError> {
    let code = query.code_param()?;
    let resp = match state.relay.snapshot(code).await? {
        Some(snap) => json!({
            "id": code,
            "exists": true,
            "phase": snap.phase,
            "epoch": snap.epoch,
            "has_answer": snap.has_answer,
            "pending_for_base_station": snap.pending_for_base_station,
            "pending_for_remote_viewer": snap.pending_for_remote_viewer,
            "idle_secs": snap.idle.as_secs(),
        }),
        None => json!({
            "id": code,
            "exists": false,
            "phase": crate::SessionPhase::Empty,
        }),
    };
    Ok(Json(resp))
}
