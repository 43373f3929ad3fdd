mod routes;
mod state;
mod tick_loop;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use parking_lot::Mutex;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sim_control::Session;
use sim_core::{Command, DestinationId};
use sim_world::{build_initial_state, load_content};
use state::{AppState, SimState, WatchScheduler};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sim_daemon", about = "Serves one live habitat session over HTTP")]
struct Cli {
    #[arg(long, default_value = "./content")]
    content_dir: String,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value = "127.0.0.1:3001")]
    bind: SocketAddr,
    /// Milliseconds between cycles. Defaults to `cycle_interval_ms` from constants.json.
    #[arg(long)]
    cycle_interval_ms: Option<u64>,
    #[arg(long, default_value = "http://localhost:5173")]
    cors_origin: String,
    /// Destination to pre-select before serving.
    #[arg(long)]
    destination: Option<String>,
}

fn build_app_state(
    cli: &Cli,
) -> Result<(AppState, tokio::sync::watch::Receiver<bool>)> {
    let content = Arc::new(load_content(&cli.content_dir)?);
    let seed = cli.seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let game_state = build_initial_state(&content, seed, &mut rng);
    let (scheduler, gate) = WatchScheduler::new();
    let mut session = Session::new(game_state, Arc::clone(&content), rng, scheduler);

    if let Some(destination) = &cli.destination {
        let (outcome, _) = session.execute(&Command::SelectDestination {
            destination_id: DestinationId::from(destination.as_str()),
        });
        if !outcome.accepted {
            bail!("destination {destination} is unknown or locked");
        }
    }

    let cycle_interval_ms = cli
        .cycle_interval_ms
        .unwrap_or(content.constants.cycle_interval_ms);
    tracing::info!(
        seed,
        session_id = %session.state().meta.session_id,
        content_version = %content.content_version,
        cycle_interval_ms,
        "session created"
    );

    let (event_tx, _) = tokio::sync::broadcast::channel(256);
    let app_state = AppState {
        sim: Arc::new(Mutex::new(SimState::new(session))),
        event_tx,
        cycle_interval_ms,
    };
    Ok((app_state, gate))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let (app_state, gate) = build_app_state(&cli)?;

    tokio::spawn(tick_loop::run_tick_loop(
        Arc::clone(&app_state.sim),
        app_state.event_tx.clone(),
        gate,
        Duration::from_millis(app_state.cycle_interval_ms.max(1)),
    ));

    let app = routes::make_router_with_cors(app_state, &cli.cors_origin)?;
    let listener = tokio::net::TcpListener::bind(cli.bind)
        .await
        .with_context(|| format!("binding {}", cli.bind))?;
    tracing::info!("listening on http://{}", cli.bind);
    axum::serve(listener, app).await.context("serving HTTP")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::make_router;
    use axum::{body::Body, http::Request, http::StatusCode, Router};
    use http_body_util::BodyExt;
    use sim_core::test_fixtures::{base_content, base_state};
    use tower::ServiceExt;

    fn make_test_state() -> AppState {
        let content = Arc::new(base_content());
        let (scheduler, _gate) = WatchScheduler::new();
        let session = Session::new(
            base_state(&content),
            content,
            ChaCha8Rng::seed_from_u64(0),
            scheduler,
        );
        let (event_tx, _) = tokio::sync::broadcast::channel(64);
        AppState {
            sim: Arc::new(Mutex::new(SimState::new(session))),
            event_tx,
            cycle_interval_ms: 5000,
        }
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap_or_default())
    }

    async fn post_command(app: Router, body: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/command")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap_or_default())
    }

    #[tokio::test]
    async fn test_meta_reports_construction_phase() {
        let (status, json) = get_json(make_router(make_test_state()), "/api/v1/meta").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["cycle"], 0);
        assert_eq!(json["seed"], 42);
        assert_eq!(json["phase"], "construction");
        assert_eq!(json["ticking"], false);
        assert_eq!(json["cycle_interval_ms"], 5000);
    }

    #[tokio::test]
    async fn test_snapshot_returns_full_resources() {
        let (status, json) = get_json(make_router(make_test_state()), "/api/v1/snapshot").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["resources"]["energy"], 100);
        assert_eq!(json["modules"].as_array().map(Vec::len), Some(0));
    }

    #[tokio::test]
    async fn test_content_lists_destinations() {
        let (status, json) = get_json(make_router(make_test_state()), "/api/v1/content").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["destinations"][0]["id"], "dest_leo");
    }

    #[tokio::test]
    async fn test_metrics_starts_empty() {
        let (status, json) = get_json(make_router(make_test_state()), "/api/v1/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().map(Vec::len), Some(0));
    }

    #[tokio::test]
    async fn test_command_add_module_is_applied() {
        let app_state = make_test_state();
        let app = make_router(app_state.clone());
        let (status, json) = post_command(
            app,
            r#"{"type":"add_module","module_def_id":"module_energy"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["outcome"]["accepted"], true);
        assert_eq!(json["outcome"]["created_module"], "module_inst_0000");
        assert_eq!(app_state.sim.lock().session.state().modules.len(), 1);
    }

    #[tokio::test]
    async fn test_command_rejection_is_reported_not_an_error() {
        let app_state = make_test_state();
        let mut rx = app_state.event_tx.subscribe();
        let (status, json) =
            post_command(make_router(app_state), r#"{"type":"start_simulation"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["outcome"]["accepted"], false);
        let batch = rx.recv().await.unwrap();
        assert_eq!(batch.len(), json["events"].as_array().map_or(0, Vec::len));
    }

    #[tokio::test]
    async fn test_command_launch_opens_tick_gate() {
        let app_state = make_test_state();
        for def in ["module_energy", "module_life_support", "module_crew_quarters"] {
            let body = format!(r#"{{"type":"add_module","module_def_id":"{def}"}}"#);
            post_command(make_router(app_state.clone()), &body).await;
        }
        let (_, json) = post_command(
            make_router(app_state.clone()),
            r#"{"type":"start_simulation"}"#,
        )
        .await;
        assert_eq!(json["outcome"]["accepted"], true);
        assert!(app_state.sim.lock().session.is_ticking());
    }

    #[tokio::test]
    async fn test_malformed_command_is_unprocessable() {
        let (status, _) =
            post_command(make_router(make_test_state()), r#"{"type":"launch_rockets"}"#).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_bad_cors_origin_is_an_error() {
        assert!(routes::make_router_with_cors(make_test_state(), "bad\norigin").is_err());
    }
}
