//! Health check infrastructure for the fleet simulator
//!
//! Tracks per-component health for liveness and readiness probes and
//! derives component health from fleet and rack-monitor state.

use crate::fleet::TickReport;
use crate::models::FleetSummary;
use crate::monitor::{RackAnalysis, RackStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// Component is functioning normally
    Healthy,
    /// Component is experiencing issues but still operational
    Degraded,
    /// Component has failed
    Unhealthy,
}

impl ComponentStatus {
    /// Returns true if the component is at least partially operational
    pub fn is_operational(&self) -> bool {
        matches!(self, ComponentStatus::Healthy | ComponentStatus::Degraded)
    }
}

/// Information about a component's health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    pub fn healthy() -> Self {
        Self {
            status: ComponentStatus::Healthy,
            message: None,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self {
            status: ComponentStatus::Degraded,
            message: Some(message.into()),
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            status: ComponentStatus::Unhealthy,
            message: Some(message.into()),
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Overall health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// Compute overall status from component statuses
    pub fn compute_status(components: &HashMap<String, ComponentHealth>) -> ComponentStatus {
        let mut has_degraded = false;

        for health in components.values() {
            match health.status {
                ComponentStatus::Unhealthy => return ComponentStatus::Unhealthy,
                ComponentStatus::Degraded => has_degraded = true,
                ComponentStatus::Healthy => {}
            }
        }

        if has_degraded {
            ComponentStatus::Degraded
        } else {
            ComponentStatus::Healthy
        }
    }
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    pub const FLEET: &str = "fleet";
    pub const FAULT_INJECTOR: &str = "fault_injector";
    pub const BALANCER: &str = "balancer";
    pub const RACK_MONITOR: &str = "rack_monitor";

    pub const ALL: [&str; 4] = [FLEET, FAULT_INJECTOR, BALANCER, RACK_MONITOR];
}

/// Fleet health from its summary
///
/// Unhealthy when no rack can take migrated VMs, degraded while faults are
/// outstanding.
pub fn fleet_health(summary: &FleetSummary) -> ComponentHealth {
    if summary.total_servers > 0 && summary.migration_targets == 0 {
        ComponentHealth::unhealthy("No rack can accept migrated VMs")
    } else if summary.faulted_servers > 0 {
        ComponentHealth::degraded(format!(
            "{} of {} racks faulted",
            summary.faulted_servers, summary.total_servers
        ))
    } else {
        ComponentHealth::healthy()
    }
}

/// Fault injector health from a tick, or `None` when it was not due
///
/// Degraded while every due injection finds no eligible rack.
pub fn fault_injector_health(tick: &TickReport) -> Option<ComponentHealth> {
    if tick.injection_skipped {
        Some(ComponentHealth::degraded("No rack eligible for fault injection"))
    } else if tick.fault.is_some() {
        Some(ComponentHealth::healthy())
    } else {
        None
    }
}

/// Rack monitor health from the latest analyses
pub fn monitor_health(analyses: &[RackAnalysis]) -> ComponentHealth {
    let critical = analyses
        .iter()
        .filter(|a| a.prediction.status == RackStatus::Critical)
        .count();
    if critical > 0 {
        ComponentHealth::degraded(format!("{} racks predicted to fail", critical))
    } else {
        ComponentHealth::healthy()
    }
}

/// Health registry for tracking component health
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    ready: Arc<RwLock<bool>>,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self {
            components: Arc::new(RwLock::new(HashMap::new())),
            ready: Arc::new(RwLock::new(false)),
        }
    }

    /// Register a component with initial healthy status
    pub async fn register(&self, name: &str) {
        let mut components = self.components.write().await;
        components.insert(name.to_string(), ComponentHealth::healthy());
    }

    /// Register every simulator component
    pub async fn register_all(&self) {
        for name in components::ALL {
            self.register(name).await;
        }
    }

    /// Update component health status
    pub async fn update(&self, name: &str, health: ComponentHealth) {
        let mut components = self.components.write().await;
        components.insert(name.to_string(), health);
    }

    /// Mark component as healthy
    pub async fn set_healthy(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    /// Mark component as degraded
    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::degraded(message)).await;
    }

    /// Mark component as unhealthy
    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::unhealthy(message)).await;
    }

    /// Set readiness status
    pub async fn set_ready(&self, ready: bool) {
        let mut r = self.ready.write().await;
        *r = ready;
    }

    /// Get health response
    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = HealthResponse::compute_status(&components);
        HealthResponse { status, components }
    }

    /// Get readiness response
    pub async fn readiness(&self) -> ReadinessResponse {
        let ready = *self.ready.read().await;
        let health = self.health().await;

        if !ready {
            ReadinessResponse {
                ready: false,
                reason: Some("Simulation not yet initialized".to_string()),
            }
        } else if health.status == ComponentStatus::Unhealthy {
            ReadinessResponse {
                ready: false,
                reason: Some("Critical component unhealthy".to_string()),
            }
        } else {
            ReadinessResponse {
                ready: true,
                reason: None,
            }
        }
    }
}
