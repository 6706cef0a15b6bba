//! JSON web API module.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::Stream;
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use tower_http::cors::CorsLayer;
use tracing::debug;

use crate::state::AppState;

/// Creates the web router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/snapshot", get(snapshot))
        .route("/api/sensors", get(sensors))
        .route("/api/sensors/:key", get(sensor))
        .route("/api/status", get(status))
        .route("/api/refresh", post(refresh))
        .route("/api/events", get(events))
        .layer(CorsLayer::permissive())
        // State
        .with_state(state)
}

/// GET /api/snapshot - Last good snapshot
async fn snapshot(State(state): State<Arc<AppState>>) -> Response {
    match state.snapshot() {
        Some(snapshot) => Json(snapshot.as_ref().clone()).into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "No snapshot yet").into_response(),
    }
}

/// GET /api/sensors - All published sensors
async fn sensors(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.entities())
}

/// GET /api/sensors/:key - One published sensor
async fn sensor(State(state): State<Arc<AppState>>, Path(key): Path<String>) -> Response {
    match state.entity(&key) {
        Some(entity) => Json(entity).into_response(),
        None => (StatusCode::NOT_FOUND, format!("Unknown sensor: {}", key)).into_response(),
    }
}

/// GET /api/status - Poll status
async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.status())
}

/// POST /api/refresh - Poll now
async fn refresh(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    debug!("HTTP: refresh requested");
    state.request_refresh();
    StatusCode::ACCEPTED
}

/// GET /api/events - One `snapshot` event per successful poll
async fn events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Lagged receivers just skip to the newest snapshot.
    let stream = BroadcastStream::new(state.subscribe()).filter_map(|update| {
        let snapshot = update.ok()?;
        Event::default().event("snapshot").json_data(&*snapshot).ok().map(Ok)
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
