// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};
use anyhow::Context;
use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::application::ride_map_service::RideMapService;
use crate::application::street_network_store::StreetNetworkStore;
use crate::infrastructure::config::{load_band_tables, load_ride_map_config};
use crate::infrastructure::page_transport::HttpPageTransport;
use crate::infrastructure::sensorthings_repository::SensorThingsRepository;
use crate::infrastructure::street_loader::spawn_street_loading;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{get_legend, health_check, render, stream_render};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (RUST_LOG controls the filter)
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = load_ride_map_config().context("Failed to load config/ride_map")?;
    let bands = load_band_tables().context("Failed to load config/bands")?;

    // Street geometry loads in the background; renders fail with
    // EmptyNetwork until it is ready
    let streets = StreetNetworkStore::new();
    spawn_street_loading(PathBuf::from(&config.streets.geojson_path), streets.clone());

    // Create repository (infrastructure layer)
    let transport = HttpPageTransport::new(Duration::from_secs(config.sensorthings.page_timeout_secs))?;
    let repository = Arc::new(SensorThingsRepository::new(
        config.sensorthings.base_url.clone(),
        Arc::new(transport),
    ));

    // Create service (application layer)
    let ride_map_service = RideMapService::new(
        repository,
        streets,
        config.datastreams.clone(),
        bands,
        config.matching.max_delta_seconds,
    );

    let state = Arc::new(AppState { ride_map_service });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/legend/:metric", get(get_legend))
        .route("/render", get(render))
        .route("/render/stream", get(stream_render))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.server.bind))?;
    tracing::info!("Starting ride-comfort-map service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
