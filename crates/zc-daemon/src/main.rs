//! zc-daemon entry point.
//!
//! Sets up tracing, resolves settings, connects one store client per zone,
//! wires middleware and starts the HTTP server. Route handlers live in
//! `routes.rs`; shared state lives in `state.rs`.

use std::sync::Arc;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};
use zc_config::{AuthSettings, Settings};
use zc_daemon::{routes, state::AppState};
use zc_store::S3Store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env.local if present (dev convenience).
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let paths = config_paths_from_env();
    let path_refs: Vec<&str> = paths.iter().map(String::as_str).collect();
    let settings = Settings::load(&path_refs).context("settings")?;

    info!(
        zones = ?settings.registry.names(),
        bucket = settings.default_bucket.as_deref().unwrap_or("-"),
        config_hash = %settings.config_hash,
        "configuration loaded"
    );
    if settings.auth == AuthSettings::Disabled {
        warn!("authentication DISABLED; every request is accepted");
    }

    let stores = S3Store::connect_all(&settings.registry, &settings.credentials, &settings.region);
    let shared = Arc::new(AppState::from_settings(&settings, stores));

    let app = routes::build_router(shared)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors(&settings.cors_origins));

    let addr = settings.bind_addr;
    info!("zc-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// `ZC_CONFIG=base.yaml,prod.yaml`: layers merged in order. Unset means
/// environment-only configuration.
fn config_paths_from_env() -> Vec<String> {
    std::env::var("ZC_CONFIG")
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Configured origins only; any origin when none are configured.
fn cors(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    if origins.is_empty() {
        return base.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    base.allow_origin(allowed)
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; run until killed.
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
