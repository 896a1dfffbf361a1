//! Observability infrastructure for the fleet simulator
//!
//! Provides:
//! - Prometheus metrics (step latency, fleet composition, faults, migrations, rack alerts)
//! - Structured JSON logging with tracing

use crate::fleet::{MigrationOutcome, RebalanceReport, TickReport};
use crate::models::{FleetSummary, MaintenanceKind, PowerState, ServerStatus};
use crate::monitor::{RackAnalysis, RackStatus};
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    register_int_gauge_vec, Histogram, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for simulation step latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.5,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<FleetMetricsInner> = OnceLock::new();

struct FleetMetricsInner {
    step_latency_seconds: Histogram,
    servers_by_power_state: IntGaugeVec,
    servers_by_status: IntGaugeVec,
    faulted_servers: IntGauge,
    hosted_vms: IntGauge,
    faults_injected: IntCounterVec,
    maintenance_started: IntCounterVec,
    maintenance_completed: IntCounter,
    vms_migrated: IntCounter,
    vms_stranded: IntCounter,
    rebalance_transfers: IntCounter,
    racks_idled: IntCounter,
    racks_woken: IntCounter,
    rack_alerts: IntCounterVec,
    racks_by_prediction: IntGaugeVec,
}

impl FleetMetricsInner {
    fn new() -> Self {
        Self {
            step_latency_seconds: register_histogram!(
                "fleet_sim_step_latency_seconds",
                "Time spent running one simulation step",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register step_latency_seconds"),

            servers_by_power_state: register_int_gauge_vec!(
                "fleet_sim_servers_by_power_state",
                "Number of racks in each power state",
                &["power_state"]
            )
            .expect("Failed to register servers_by_power_state"),

            servers_by_status: register_int_gauge_vec!(
                "fleet_sim_servers_by_status",
                "Number of racks in each operational status",
                &["status"]
            )
            .expect("Failed to register servers_by_status"),

            faulted_servers: register_int_gauge!(
                "fleet_sim_faulted_servers",
                "Number of racks with an outstanding fault"
            )
            .expect("Failed to register faulted_servers"),

            hosted_vms: register_int_gauge!(
                "fleet_sim_hosted_vms",
                "Number of VMs hosted across the fleet"
            )
            .expect("Failed to register hosted_vms"),

            faults_injected: register_int_counter_vec!(
                "fleet_sim_faults_injected_total",
                "Total number of injected faults",
                &["fault_type"]
            )
            .expect("Failed to register faults_injected"),

            maintenance_started: register_int_counter_vec!(
                "fleet_sim_maintenance_started_total",
                "Total number of maintenance windows started",
                &["kind"]
            )
            .expect("Failed to register maintenance_started"),

            maintenance_completed: register_int_counter!(
                "fleet_sim_maintenance_completed_total",
                "Total number of maintenance windows completed"
            )
            .expect("Failed to register maintenance_completed"),

            vms_migrated: register_int_counter!(
                "fleet_sim_vms_migrated_total",
                "Total number of VMs migrated off racks entering maintenance"
            )
            .expect("Failed to register vms_migrated"),

            vms_stranded: register_int_counter!(
                "fleet_sim_vms_stranded_total",
                "Total number of VMs left in place for lack of a migration target"
            )
            .expect("Failed to register vms_stranded"),

            rebalance_transfers: register_int_counter!(
                "fleet_sim_rebalance_transfers_total",
                "Total number of load transfers made by the balancer"
            )
            .expect("Failed to register rebalance_transfers"),

            racks_idled: register_int_counter!(
                "fleet_sim_racks_idled_total",
                "Total number of racks put to idle"
            )
            .expect("Failed to register racks_idled"),

            racks_woken: register_int_counter!(
                "fleet_sim_racks_woken_total",
                "Total number of idle racks woken up"
            )
            .expect("Failed to register racks_woken"),

            rack_alerts: register_int_counter_vec!(
                "fleet_sim_rack_alerts_total",
                "Total number of rack alerts raised",
                &["severity"]
            )
            .expect("Failed to register rack_alerts"),

            racks_by_prediction: register_int_gauge_vec!(
                "fleet_sim_racks_by_prediction",
                "Number of racks in each failure prediction status",
                &["status"]
            )
            .expect("Failed to register racks_by_prediction"),
        }
    }
}

/// Fleet metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct FleetMetrics {
    _private: (),
}

impl Default for FleetMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl FleetMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(FleetMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &FleetMetricsInner {
        GLOBAL_METRICS.get_or_init(FleetMetricsInner::new)
    }

    pub fn observe_step_latency(&self, duration_secs: f64) {
        self.inner().step_latency_seconds.observe(duration_secs);
    }

    /// Refresh the fleet composition gauges
    pub fn set_fleet_summary(&self, summary: &FleetSummary) {
        let inner = self.inner();
        let normal = summary
            .total_servers
            .saturating_sub(summary.idle_servers + summary.warning_servers);
        for (state, count) in [
            (PowerState::Normal, normal),
            (PowerState::Idle, summary.idle_servers),
            (PowerState::Warning, summary.warning_servers),
        ] {
            inner
                .servers_by_power_state
                .with_label_values(&[state.to_string().as_str()])
                .set(count as i64);
        }
        for (status, count) in [
            (ServerStatus::Active, summary.active_servers),
            (
                ServerStatus::Maintenance,
                summary.total_servers.saturating_sub(summary.active_servers),
            ),
        ] {
            inner
                .servers_by_status
                .with_label_values(&[status.to_string().as_str()])
                .set(count as i64);
        }
        inner.faulted_servers.set(summary.faulted_servers as i64);
        inner.hosted_vms.set(summary.total_vms as i64);
    }

    pub fn record_tick(&self, report: &TickReport) {
        if let Some(fault) = &report.fault {
            self.inner()
                .faults_injected
                .with_label_values(&[fault.fault_type.to_string().as_str()])
                .inc();
        }
        self.inner()
            .maintenance_completed
            .inc_by(report.completed_maintenance.len() as u64);
    }

    pub fn record_maintenance(&self, kind: MaintenanceKind, outcome: &MigrationOutcome) {
        let inner = self.inner();
        inner
            .maintenance_started
            .with_label_values(&[kind.to_string().as_str()])
            .inc();
        inner.vms_migrated.inc_by(outcome.migrated() as u64);
        inner.vms_stranded.inc_by(outcome.stranded as u64);
    }

    pub fn record_rebalance(&self, report: &RebalanceReport) {
        let inner = self.inner();
        inner.rebalance_transfers.inc_by(report.transfers.len() as u64);
        inner.racks_idled.inc_by(report.idled.len() as u64);
        inner.racks_woken.inc_by(report.woken.len() as u64);
    }

    /// Count alerts and refresh the prediction gauges from one analysis pass
    pub fn record_analyses(&self, analyses: &[RackAnalysis]) {
        let inner = self.inner();
        for analysis in analyses {
            if let Some(severity) = analysis.status.severity() {
                inner
                    .rack_alerts
                    .with_label_values(&[severity.to_string().as_str()])
                    .inc();
            }
        }
        for status in RackStatus::ALL {
            let count = analyses
                .iter()
                .filter(|a| a.prediction.status == status)
                .count();
            inner
                .racks_by_prediction
                .with_label_values(&[status.to_string().as_str()])
                .set(count as i64);
        }
    }
}

/// Structured logger for simulator events
///
/// Provides consistent JSON-formatted logging for faults, maintenance,
/// rebalancing and failure predictions.
#[derive(Clone)]
pub struct StructuredLogger {
    node_name: String,
}

impl StructuredLogger {
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
        }
    }

    /// Log simulator startup
    pub fn log_startup(&self, version: &str, servers: usize, seed: u64) {
        info!(
            event = "simulator_started",
            node = %self.node_name,
            simulator_version = %version,
            servers = servers,
            seed = seed,
            "Fleet simulator started"
        );
    }

    /// Log simulator shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "simulator_shutdown",
            node = %self.node_name,
            reason = %reason,
            "Fleet simulator shutting down"
        );
    }

    /// Log one completed simulation step
    pub fn log_step(&self, step: u64, summary: &FleetSummary, elapsed_secs: f64) {
        info!(
            event = "step_completed",
            node = %self.node_name,
            step = step,
            active = summary.active_servers,
            idle = summary.idle_servers,
            maintenance = summary.maintenance_servers,
            faulted = summary.faulted_servers,
            vms = summary.total_vms,
            mean_cpu_usage = summary.mean_cpu_usage,
            mean_temperature = summary.mean_temperature,
            elapsed_secs = elapsed_secs,
            "Simulation step completed"
        );
    }

    /// Log a maintenance start with its migration outcome
    pub fn log_maintenance(&self, kind: MaintenanceKind, outcome: &MigrationOutcome) {
        if outcome.stranded > 0 {
            warn!(
                event = "maintenance_started",
                node = %self.node_name,
                server_id = %outcome.source_id,
                kind = %kind,
                migrated = outcome.migrated(),
                stranded = outcome.stranded,
                "Maintenance started with stranded VMs"
            );
        } else {
            info!(
                event = "maintenance_started",
                node = %self.node_name,
                server_id = %outcome.source_id,
                kind = %kind,
                migrated = outcome.migrated(),
                "Maintenance started"
            );
        }
    }

    /// Log a rack whose failure prediction is not normal
    pub fn log_prediction(&self, analysis: &RackAnalysis) {
        let prediction = &analysis.prediction;
        let failure_at = prediction.predicted_failure_time.map(|t| t.to_rfc3339());
        match prediction.status {
            RackStatus::Critical => {
                warn!(
                    event = "failure_predicted",
                    node = %self.node_name,
                    rack_id = %analysis.rack_id,
                    severity = %prediction.status,
                    confidence = prediction.confidence,
                    predicted_failure_time = ?failure_at,
                    reasons = ?prediction.reasons,
                    "Critical rack failure predicted"
                );
            }
            RackStatus::Warning => {
                info!(
                    event = "failure_predicted",
                    node = %self.node_name,
                    rack_id = %analysis.rack_id,
                    severity = %prediction.status,
                    confidence = prediction.confidence,
                    predicted_failure_time = ?failure_at,
                    reasons = ?prediction.reasons,
                    "Rack failure risk elevated"
                );
            }
            RackStatus::Normal => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::InjectedFault;
    use crate::models::FaultType;
    use chrono::Utc;

    #[test]
    fn test_fleet_metrics_recording() {
        // Metrics live in the process-wide registry; handles share them
        let metrics = FleetMetrics::new();
        let other = metrics.clone();

        metrics.observe_step_latency(0.0002);
        metrics.set_fleet_summary(&FleetSummary {
            total_servers: 20,
            active_servers: 19,
            idle_servers: 4,
            total_vms: 31,
            ..Default::default()
        });
        other.record_tick(&TickReport {
            fault: Some(InjectedFault {
                server_id: "Rack-3".to_string(),
                fault_type: FaultType::Load,
                injected_at: Utc::now(),
            }),
            completed_maintenance: vec!["Rack-7".to_string()],
            ..Default::default()
        });
        other.record_maintenance(
            MaintenanceKind::Repair,
            &MigrationOutcome {
                source_id: "Rack-3".to_string(),
                placements: Vec::new(),
                stranded: 2,
            },
        );
        metrics.record_rebalance(&RebalanceReport::default());
        metrics.record_analyses(&[]);

        // Gauges may be overwritten by other tests; counters only grow
        let inner = metrics.inner();
        assert!(inner.vms_stranded.get() >= 2);
        assert!(inner.maintenance_completed.get() >= 1);
        assert!(inner.faults_injected.with_label_values(&["load"]).get() >= 1);
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("test-node");
        assert_eq!(logger.node_name, "test-node");
    }
}
