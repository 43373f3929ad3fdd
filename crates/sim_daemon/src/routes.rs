use crate::state::AppState;
use crate::tick_loop::log_transitions;
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        Json,
    },
    routing::{get, post},
    Router,
};
use serde::Serialize;
use sim_core::{Command, CommandOutcome, EventEnvelope, MetricsSnapshot};
use std::collections::VecDeque;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

type JsonBody = (StatusCode, [(header::HeaderName, &'static str); 1], String);

#[cfg(test)]
pub fn make_router(state: AppState) -> Router {
    make_router_with_cors(state, "http://localhost:5173").unwrap()
}

pub fn make_router_with_cors(state: AppState, cors_origin: &str) -> Result<Router> {
    let origin = cors_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("invalid CORS origin {cors_origin:?}"))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Ok(Router::new()
        .route("/api/v1/meta", get(meta_handler))
        .route("/api/v1/snapshot", get(snapshot_handler))
        .route("/api/v1/content", get(content_handler))
        .route("/api/v1/metrics", get(metrics_handler))
        .route("/api/v1/stream", get(stream_handler))
        .route("/api/v1/command", post(command_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

fn json_body(what: &str, result: serde_json::Result<String>) -> JsonBody {
    match result {
        Ok(json) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            json,
        ),
        Err(err) => {
            tracing::error!("{what} serialization failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "application/json")],
                r#"{"error":"serialization failed"}"#.to_string(),
            )
        }
    }
}

pub async fn meta_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    let sim = app_state.sim.lock();
    let state = sim.session.state();
    Json(serde_json::json!({
        "cycle": state.meta.cycle,
        "seed": state.meta.seed,
        "session_id": state.meta.session_id,
        "content_version": state.meta.content_version,
        "phase": state.phase,
        "destination": state.destination,
        "ticking": sim.session.is_ticking(),
        "cycle_interval_ms": app_state.cycle_interval_ms,
    }))
}

pub async fn snapshot_handler(State(app_state): State<AppState>) -> JsonBody {
    let snapshot = app_state.sim.lock().session.snapshot();
    json_body("snapshot", serde_json::to_string(&snapshot))
}

pub async fn content_handler(State(app_state): State<AppState>) -> JsonBody {
    let content = app_state.sim.lock().session.content().clone();
    json_body("content", serde_json::to_string(content.as_ref()))
}

pub async fn metrics_handler(State(app_state): State<AppState>) -> Json<VecDeque<MetricsSnapshot>> {
    let sim = app_state.sim.lock();
    Json(sim.metrics_history.clone())
}

#[derive(Serialize)]
struct CommandResponse {
    outcome: CommandOutcome,
    events: Vec<EventEnvelope>,
}

/// Runs one player action as its own turn. Malformed bodies never reach the
/// session; axum's `Json` extractor rejects them first.
pub async fn command_handler(
    State(app_state): State<AppState>,
    Json(command): Json<Command>,
) -> JsonBody {
    let (outcome, events) = app_state.sim.lock().session.execute(&command);
    log_transitions(&events);
    if !events.is_empty() {
        let _ = app_state.event_tx.send(events.clone());
    }
    json_body(
        "command response",
        serde_json::to_string(&CommandResponse { outcome, events }),
    )
}

pub async fn stream_handler(
    State(app_state): State<AppState>,
) -> Sse<impl futures_core::Stream<Item = Result<Event, Infallible>>> {
    let mut rx = app_state.event_tx.subscribe();
    let sim = app_state.sim.clone();

    let stream = async_stream::stream! {
        let mut heartbeat = tokio::time::interval(Duration::from_secs(5));
        heartbeat.tick().await; // discard the immediate first tick
        loop {
            tokio::select! {
                result = rx.recv() => {
                    match result {
                        Ok(events) => {
                            let data = serde_json::to_string(&events).unwrap_or_default();
                            yield Ok(Event::default().data(data));
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "event stream subscriber lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
                _ = heartbeat.tick() => {
                    let cycle = sim.lock().session.state().meta.cycle;
                    let hb = serde_json::json!({"heartbeat": true, "cycle": cycle});
                    yield Ok(Event::default().data(hb.to_string()));
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("ping"),
    )
}
