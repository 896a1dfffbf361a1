//! Fleet Simulator - rack fleet simulation service
//!
//! Runs the fleet simulation on a fixed interval and serves health,
//! metrics and fleet state over HTTP until interrupted.

use anyhow::Result;
use chrono::Utc;
use fleet_lib::{
    health::HealthRegistry,
    observability::{FleetMetrics, StructuredLogger},
    Simulation, SimulationDriver,
};
use fleet_simulator::{api, config::SimulatorConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SIMULATOR_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting fleet-sim");

    // Load configuration
    let config = SimulatorConfig::load()?;
    let seed = config.seed.unwrap_or_else(rand::random);
    info!(
        node_name = %config.node_name,
        servers = config.simulation.fleet.server_count,
        tick_interval_secs = config.tick_interval_secs,
        seed = seed,
        "Simulator configured"
    );

    // Initialize health registry
    let health_registry = HealthRegistry::new();
    health_registry.register_all().await;

    let metrics = FleetMetrics::new();
    let logger = StructuredLogger::new(&config.node_name);

    // Build the seeded simulation
    let simulation = Simulation::new(
        &config.simulation,
        StdRng::seed_from_u64(seed),
        config.auto_maintenance,
        Utc::now(),
    )?;
    metrics.set_fleet_summary(&simulation.summary());
    logger.log_startup(SIMULATOR_VERSION, config.simulation.fleet.server_count, seed);
    let simulation = Arc::new(Mutex::new(simulation));

    // Create shared application state
    let app_state = Arc::new(api::AppState::new(
        health_registry.clone(),
        metrics.clone(),
        simulation.clone(),
    ));

    // Mark simulator as ready after initialization
    health_registry.set_ready(true).await;

    // Start health and metrics server
    let api_port = config.api_port;
    let api_handle = tokio::spawn(async move {
        if let Err(e) = api::serve(api_port, app_state).await {
            error!(error = %e, "API server failed");
        }
    });

    // Start simulation loop
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let driver = SimulationDriver::new(
        simulation,
        config.tick_interval(),
        metrics,
        health_registry.clone(),
        logger.clone(),
    );
    let driver_handle = tokio::spawn(driver.run(shutdown_rx));

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");
    health_registry.set_ready(false).await;

    let _ = shutdown_tx.send(());
    driver_handle.await?;
    api_handle.abort();
    info!("Shutting down");

    Ok(())
}
