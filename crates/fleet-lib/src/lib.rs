//! Fleet library for rack-fleet simulation
//!
//! This crate provides the core functionality for:
//! - Simulating a fleet of racks hosting VMs (faults, maintenance, migration, load balancing)
//! - Monitoring rack sensor readings and predicting failures
//! - Driving the simulation periodically
//! - Health checks and observability

pub mod config;
pub mod driver;
pub mod error;
pub mod fleet;
pub mod health;
pub mod models;
pub mod monitor;
pub mod observability;
pub mod telemetry;

pub use config::{FleetConfig, MonitorConfig, SimulationConfig};
pub use driver::{SharedSimulation, Simulation, SimulationDriver, StepReport};
pub use error::{FleetError, Result};
pub use fleet::{FleetController, MigrationOutcome, RebalanceReport, TickReport};
pub use health::{
    fault_injector_health, ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse,
    ReadinessResponse,
};
pub use models::*;
pub use monitor::{AlertRecord, PredictionState, RackAnalysis, RackMonitor, RackStatus};
pub use observability::{FleetMetrics, StructuredLogger};
