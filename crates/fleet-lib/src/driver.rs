//! Periodic simulation driver
//!
//! `Simulation` bundles the fleet controller with the rack monitor and runs
//! one full cycle per `step`. `SimulationDriver` calls it from a tokio
//! interval, serializing every access behind a single mutex, and publishes
//! metrics, health and structured logs after each step.

use crate::config::SimulationConfig;
use crate::error::Result;
use crate::fleet::{FleetController, MigrationOutcome, RebalanceReport, TickReport};
use crate::health::{
    components, fault_injector_health, fleet_health, monitor_health, HealthRegistry,
};
use crate::models::{FleetSnapshot, FleetSummary, MaintenanceKind};
use crate::monitor::{AlertRecord, PredictionState, RackAnalysis, RackMonitor, RackStatus};
use crate::observability::{FleetMetrics, StructuredLogger};
use crate::telemetry::SensorSynthesizer;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, Mutex};
use tokio::time::interval;
use tracing::{info, warn};

/// Maintenance started automatically during a step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutoMaintenance {
    pub kind: MaintenanceKind,
    pub outcome: MigrationOutcome,
}

/// Everything one step changed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    pub step: u64,
    pub tick: TickReport,
    pub rebalance: RebalanceReport,
    pub analyses: Vec<RackAnalysis>,
    pub maintenance: Vec<AutoMaintenance>,
}

/// Fleet simulation plus rack monitoring
pub struct Simulation<R: Rng> {
    fleet: FleetController<R>,
    monitor: RackMonitor,
    sensors: SensorSynthesizer,
    auto_maintenance: bool,
    steps: u64,
}

impl<R: Rng> Simulation<R> {
    pub fn new(
        config: &SimulationConfig,
        rng: R,
        auto_maintenance: bool,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            fleet: FleetController::new(config.fleet.clone(), rng, now)?,
            monitor: RackMonitor::new(&config.monitor)?,
            sensors: SensorSynthesizer::new()?,
            auto_maintenance,
            steps: 0,
        })
    }

    /// Run one cycle: tick, rebalance, analyze every rack, auto-maintenance
    pub fn step(&mut self, now: DateTime<Utc>) -> StepReport {
        self.steps += 1;
        let tick = self.fleet.tick(now);
        let rebalance = self.fleet.optimize_workload();

        let analyses: Vec<RackAnalysis> = self
            .fleet
            .read_sensors(&self.sensors)
            .into_iter()
            .map(|(rack_id, reading)| {
                self.monitor.analyze_rack(
                    &rack_id,
                    reading.temperature,
                    reading.vibration,
                    reading.power,
                    now,
                )
            })
            .collect();

        let maintenance = if self.auto_maintenance {
            self.schedule_maintenance(&analyses, now)
        } else {
            Vec::new()
        };

        StepReport {
            step: self.steps,
            tick,
            rebalance,
            analyses,
            maintenance,
        }
    }

    /// Repair faulted racks and replace racks predicted to fail
    fn schedule_maintenance(
        &mut self,
        analyses: &[RackAnalysis],
        now: DateTime<Utc>,
    ) -> Vec<AutoMaintenance> {
        let mut plan = Vec::new();
        for server in self.fleet.server_status() {
            if !server.is_schedulable() {
                continue;
            }
            let predicted_critical = analyses
                .iter()
                .any(|a| a.rack_id == server.id && a.prediction.status == RackStatus::Critical);
            if server.has_fault() {
                plan.push((server.id.clone(), MaintenanceKind::Repair));
            } else if predicted_critical {
                plan.push((server.id.clone(), MaintenanceKind::Replace));
            }
        }

        let mut started = Vec::with_capacity(plan.len());
        for (server_id, kind) in plan {
            match self.fleet.start_maintenance(&server_id, kind, now) {
                Ok(outcome) => started.push(AutoMaintenance { kind, outcome }),
                Err(e) => warn!(server_id = %server_id, error = %e, "Auto-maintenance failed"),
            }
        }
        started
    }

    pub fn start_maintenance(
        &mut self,
        server_id: &str,
        kind: MaintenanceKind,
        now: DateTime<Utc>,
    ) -> Result<MigrationOutcome> {
        self.fleet.start_maintenance(server_id, kind, now)
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> FleetSnapshot {
        self.fleet.snapshot(now)
    }

    pub fn summary(&self) -> FleetSummary {
        self.fleet.summary()
    }

    /// Feed an externally sourced reading into the rack monitor
    pub fn analyze_rack(
        &mut self,
        rack_id: &str,
        temperature: f64,
        vibration: f64,
        power: f64,
        now: DateTime<Utc>,
    ) -> RackAnalysis {
        self.monitor
            .analyze_rack(rack_id, temperature, vibration, power, now)
    }

    pub fn alert_history(&self, rack_id: &str) -> &[AlertRecord] {
        self.monitor.alert_history(rack_id)
    }

    pub fn prediction(&self, rack_id: &str) -> PredictionState {
        self.monitor.prediction(rack_id)
    }

    pub fn fleet(&self) -> &FleetController<R> {
        &self.fleet
    }

    pub fn monitor(&self) -> &RackMonitor {
        &self.monitor
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }
}

/// Simulation shared between the driver loop and API handlers
pub type SharedSimulation<R> = Arc<Mutex<Simulation<R>>>;

/// Runs simulation steps on a fixed interval until shutdown
pub struct SimulationDriver<R: Rng + Send + 'static> {
    simulation: SharedSimulation<R>,
    interval: Duration,
    metrics: FleetMetrics,
    health: HealthRegistry,
    logger: StructuredLogger,
}

impl<R: Rng + Send + 'static> SimulationDriver<R> {
    pub fn new(
        simulation: SharedSimulation<R>,
        interval: Duration,
        metrics: FleetMetrics,
        health: HealthRegistry,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            simulation,
            interval,
            metrics,
            health,
            logger,
        }
    }

    /// Run the step loop
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            "Starting simulation driver"
        );

        let mut ticker = interval(self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_step(Utc::now()).await;
                }
                _ = shutdown.recv() => {
                    info!("Shutting down simulation driver");
                    break;
                }
            }
        }
    }

    /// Run one step and publish its effects
    pub async fn run_step(&self, now: DateTime<Utc>) -> StepReport {
        let (report, summary, elapsed) = {
            let mut simulation = self.simulation.lock().await;
            let start = Instant::now();
            let report = simulation.step(now);
            let elapsed = start.elapsed().as_secs_f64();
            (report, simulation.summary(), elapsed)
        };

        self.metrics.observe_step_latency(elapsed);
        self.metrics.record_tick(&report.tick);
        self.metrics.record_rebalance(&report.rebalance);
        self.metrics.record_analyses(&report.analyses);
        for auto in &report.maintenance {
            self.metrics.record_maintenance(auto.kind, &auto.outcome);
            self.logger.log_maintenance(auto.kind, &auto.outcome);
        }
        self.metrics.set_fleet_summary(&summary);

        for analysis in &report.analyses {
            self.logger.log_prediction(analysis);
        }
        self.logger.log_step(report.step, &summary, elapsed);

        self.health
            .update(components::FLEET, fleet_health(&summary))
            .await;
        if let Some(injector) = fault_injector_health(&report.tick) {
            self.health.update(components::FAULT_INJECTOR, injector).await;
        }
        let stranded: usize = report.maintenance.iter().map(|m| m.outcome.stranded).sum();
        if stranded > 0 {
            self.health
                .set_degraded(
                    components::BALANCER,
                    format!("{} VMs stranded on racks in maintenance", stranded),
                )
                .await;
        } else {
            self.health.set_healthy(components::BALANCER).await;
        }
        self.health
            .update(components::RACK_MONITOR, monitor_health(&report.analyses))
            .await;

        report
    }
}
