//! Fleet simulation: racks, VMs, faults, maintenance and balancing
//!
//! `FleetController` owns the fleet state together with the random source
//! and exposes the plain synchronous operations an external driver calls:
//! - `tick(now)`: fault injection, maintenance completion, load evolution
//! - `start_maintenance(id, kind, now)`: service a rack and evacuate it
//! - `optimize_workload()`: rebalance load and manage idle racks
//! - `snapshot(now)` / `summary()`: read-only views

mod balancer;
mod faults;
mod load;
mod maintenance;
mod migration;
mod sampling;
mod state;

pub use balancer::{RebalanceReport, Transfer, WorkloadBalancer};
pub use faults::{FaultInjector, InjectedFault};
pub use migration::{migrate_from, MigrationOutcome, VmPlacement};
pub use sampling::LoadSamplers;
pub use state::FleetState;

use crate::config::FleetConfig;
use crate::error::Result;
use crate::models::{FleetSnapshot, FleetSummary, MaintenanceKind, Server};
use crate::telemetry::{SensorReading, SensorSynthesizer};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use tracing::info;

/// What a single tick changed
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TickReport {
    pub fault: Option<InjectedFault>,
    /// The injector was due but no rack was eligible
    pub injection_skipped: bool,
    pub completed_maintenance: Vec<String>,
}

/// Owner of the fleet state and every operation that mutates it
pub struct FleetController<R: Rng> {
    config: FleetConfig,
    fleet: FleetState,
    samplers: LoadSamplers,
    injector: FaultInjector,
    balancer: WorkloadBalancer,
    rng: R,
}

impl<R: Rng> FleetController<R> {
    /// Build and seed a fresh fleet of `config.server_count` racks
    pub fn new(config: FleetConfig, mut rng: R, now: DateTime<Utc>) -> Result<Self> {
        config.validate()?;
        let samplers = LoadSamplers::new(&config)?;
        let mut fleet = FleetState::initialize(&config, &samplers, &mut rng);
        fleet.seed_initial_vms(&config, &mut rng);

        let summary = fleet.summary();
        info!(
            servers = summary.total_servers,
            idle = summary.idle_servers,
            vms = summary.total_vms,
            "Fleet initialized"
        );

        Self::assemble(config, fleet, samplers, rng, now)
    }

    /// Drive an explicitly constructed fleet
    pub fn with_fleet(
        config: FleetConfig,
        fleet: FleetState,
        rng: R,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        config.validate()?;
        let samplers = LoadSamplers::new(&config)?;
        Self::assemble(config, fleet, samplers, rng, now)
    }

    fn assemble(
        config: FleetConfig,
        fleet: FleetState,
        samplers: LoadSamplers,
        rng: R,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        Ok(Self {
            injector: FaultInjector::new(config.fault_interval(), now),
            balancer: WorkloadBalancer::new(&config),
            config,
            fleet,
            samplers,
            rng,
        })
    }

    /// Advance the simulation by one step
    ///
    /// Order is fixed: fault injection, maintenance completion, then load
    /// and temperature evolution.
    pub fn tick(&mut self, now: DateTime<Utc>) -> TickReport {
        let due = self.injector.is_due(now);
        let fault = self.injector.maybe_inject(&mut self.fleet, &mut self.rng, now);
        let completed_maintenance = maintenance::complete_due(
            &mut self.fleet,
            &self.samplers,
            self.config.maintenance_duration(),
            &mut self.rng,
            now,
        );
        load::evolve(&mut self.fleet, &self.samplers, &mut self.rng);

        TickReport {
            injection_skipped: due && fault.is_none(),
            fault,
            completed_maintenance,
        }
    }

    /// Start maintenance on a rack and migrate its VMs away
    pub fn start_maintenance(
        &mut self,
        server_id: &str,
        kind: MaintenanceKind,
        now: DateTime<Utc>,
    ) -> Result<MigrationOutcome> {
        maintenance::start_maintenance(&mut self.fleet, server_id, kind, &mut self.rng, now)
    }

    /// Rebalance load and manage idle racks
    pub fn optimize_workload(&mut self) -> RebalanceReport {
        self.balancer
            .optimize(&mut self.fleet, &self.samplers, &mut self.rng)
    }

    /// Every rack with its VMs, in creation order
    pub fn server_status(&self) -> &[Server] {
        self.fleet.servers()
    }

    pub fn server(&self, id: &str) -> Option<&Server> {
        self.fleet.get(id)
    }

    /// One sensor reading per rack, in creation order
    pub fn read_sensors(&mut self, sensors: &SensorSynthesizer) -> Vec<(String, SensorReading)> {
        let rng = &mut self.rng;
        self.fleet
            .servers()
            .iter()
            .map(|server| (server.id.clone(), sensors.read(server, &mut *rng)))
            .collect()
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> FleetSnapshot {
        FleetSnapshot {
            taken_at: now,
            servers: self.fleet.servers().to_vec(),
            summary: self.fleet.summary(),
        }
    }

    pub fn summary(&self) -> FleetSummary {
        self.fleet.summary()
    }

    pub fn fleet(&self) -> &FleetState {
        &self.fleet
    }

    pub fn config(&self) -> &FleetConfig {
        &self.config
    }
}
