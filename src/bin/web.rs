//! Persona Factory HTTP API
//!
//! 启动: cargo run --bin persona-factory-web --features web
//! - POST /generate-personas  {"goal": "..."} → 运行流水线，成功后落库
//! - GET  /latest-personas    → 最近一次运行的人设
//! - GET  /api/health

#![cfg(feature = "web")]

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use persona_factory::config::{load_config_or_default, reload_config, AppConfig};
use persona_factory::core::{PipelineOutcome, PipelineRunner};
use persona_factory::observability;
use persona_factory::schema::Persona;
use persona_factory::store::RunStore;

struct AppState {
    store: RunStore,
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    goal: String,
}

#[derive(Debug, Serialize)]
struct GenerateResponse {
    message: String,
    run_id: Option<String>,
    personas: Vec<Persona>,
}

type ApiError = (StatusCode, String);

/// 每次请求重新加载配置，改动 config/default.toml 或环境变量后无需重启
fn current_config() -> AppConfig {
    reload_config().unwrap_or_else(|e| {
        tracing::warn!("Config reload failed ({}), using defaults", e);
        AppConfig::default()
    })
}

async fn generate_personas(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let goal = req.goal.trim().to_string();
    if goal.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "goal must not be empty".to_string()));
    }

    let cfg = current_config();
    let outcome = PipelineRunner::from_config(&cfg).run(&goal).await;
    let personas = match outcome {
        PipelineOutcome::Success { personas } => personas,
        PipelineOutcome::Failed { reason } => {
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Persona generation failed: {}", reason),
            ))
        }
    };

    let run_id = if cfg.pipeline.persist_results {
        let id = state
            .store
            .save(&goal, &personas)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
        Some(id)
    } else {
        None
    };

    Ok(Json(GenerateResponse {
        message: format!("Successfully generated {} personas.", personas.len()),
        run_id,
        personas,
    }))
}

async fn latest_personas(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Persona>>, ApiError> {
    state
        .store
        .latest()
        .map(Json)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let cfg = load_config_or_default(None);
    let store = RunStore::open_at(cfg.db_path()).context("Failed to open run store")?;
    let state = Arc::new(AppState { store });

    let app = Router::new()
        .route("/generate-personas", post(generate_personas))
        .route("/latest-personas", get(latest_personas))
        .route("/api/health", get(|| async { "OK" }))
        .with_state(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("{} API listening on http://{}", cfg.app.name, addr);
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
