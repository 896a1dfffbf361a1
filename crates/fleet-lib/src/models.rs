//! Core data models for the rack fleet

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Inclusive range a load metric is clipped to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

pub const CPU_BOUNDS: Bounds = Bounds::new(10.0, 95.0);
pub const MEMORY_BOUNDS: Bounds = Bounds::new(20.0, 90.0);
pub const NETWORK_BOUNDS: Bounds = Bounds::new(5.0, 100.0);
pub const TEMPERATURE_BOUNDS: Bounds = Bounds::new(30.0, 50.0);

/// Loads an idle rack is pinned to
pub const IDLE_CPU: f64 = 5.0;
pub const IDLE_MEMORY: f64 = 10.0;
pub const IDLE_NETWORK: f64 = 3.0;

const VM_MEMORY_RATIO: f64 = 1.2;
const VM_NETWORK_RATIO: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    Normal,
    Idle,
    Warning,
}

impl std::fmt::Display for PowerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PowerState::Normal => write!(f, "normal"),
            PowerState::Idle => write!(f, "idle"),
            PowerState::Warning => write!(f, "warning"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Active,
    Maintenance,
}

impl std::fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerStatus::Active => write!(f, "active"),
            ServerStatus::Maintenance => write!(f, "maintenance"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaultType {
    Temperature,
    Load,
    Power,
}

impl FaultType {
    pub const ALL: [FaultType; 3] = [FaultType::Temperature, FaultType::Load, FaultType::Power];
}

impl std::fmt::Display for FaultType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FaultType::Temperature => write!(f, "temperature"),
            FaultType::Load => write!(f, "load"),
            FaultType::Power => write!(f, "power"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaintenanceKind {
    Repair,
    Replace,
}

impl std::fmt::Display for MaintenanceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MaintenanceKind::Repair => write!(f, "repair"),
            MaintenanceKind::Replace => write!(f, "replace"),
        }
    }
}

/// Maintenance window in progress on a server
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Maintenance {
    pub kind: MaintenanceKind,
    pub started_at: DateTime<Utc>,
}

/// Virtual machine hosted on a rack
///
/// Memory and network loads are derived from the cpu load once, at
/// creation, and never re-derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vm {
    pub id: String,
    /// Rack the workload originated from; informational only
    pub source_server: String,
    pub cpu_load: f64,
    pub memory_load: f64,
    pub network_load: f64,
}

impl Vm {
    pub fn new(id: impl Into<String>, source_server: impl Into<String>, cpu_load: f64) -> Self {
        Self {
            id: id.into(),
            source_server: source_server.into(),
            cpu_load,
            memory_load: cpu_load * VM_MEMORY_RATIO,
            network_load: cpu_load * VM_NETWORK_RATIO,
        }
    }
}

/// Simulated rack hosting VMs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub id: String,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub network_load: f64,
    pub temperature: f64,
    pub power_state: PowerState,
    pub status: ServerStatus,
    pub maintenance: Option<Maintenance>,
    pub fault: Option<FaultType>,
    pub can_host_vms: bool,
    pub vms: Vec<Vm>,
}

impl Server {
    /// A freshly booted, active rack with the given loads and no VMs
    pub fn new(id: impl Into<String>, cpu: f64, memory: f64, network: f64, temperature: f64) -> Self {
        Self {
            id: id.into(),
            cpu_usage: cpu,
            memory_usage: memory,
            network_load: network,
            temperature,
            power_state: PowerState::Normal,
            status: ServerStatus::Active,
            maintenance: None,
            fault: None,
            can_host_vms: true,
            vms: Vec::new(),
        }
    }

    /// An idle rack pinned at the idle loads
    pub fn idle(id: impl Into<String>, temperature: f64) -> Self {
        Self {
            power_state: PowerState::Idle,
            ..Self::new(id, IDLE_CPU, IDLE_MEMORY, IDLE_NETWORK, temperature)
        }
    }

    pub fn is_idle(&self) -> bool {
        self.power_state == PowerState::Idle
    }

    pub fn is_active(&self) -> bool {
        self.status == ServerStatus::Active
    }

    pub fn in_maintenance(&self) -> bool {
        self.maintenance.is_some()
    }

    pub fn has_fault(&self) -> bool {
        self.fault.is_some()
    }

    /// Active and not waiting on a maintenance window
    pub fn is_schedulable(&self) -> bool {
        self.is_active() && !self.in_maintenance()
    }

    /// Eligible to receive migrated VMs
    pub fn accepts_migrations(&self) -> bool {
        self.is_schedulable() && !self.is_idle()
    }

    /// Eligible to be hit by the fault injector
    pub fn accepts_faults(&self) -> bool {
        self.accepts_migrations() && !self.has_fault()
    }

    pub fn hosted_cpu(&self) -> f64 {
        self.vms.iter().map(|vm| vm.cpu_load).sum()
    }

    /// Add a VM's loads without clipping
    pub(crate) fn absorb_load(&mut self, vm: &Vm) {
        self.cpu_usage += vm.cpu_load;
        self.memory_usage += vm.memory_load;
        self.network_load += vm.network_load;
    }

    /// Add a VM's loads, clipping each metric to its bounds
    pub(crate) fn absorb_load_clipped(&mut self, vm: &Vm) {
        self.cpu_usage = CPU_BOUNDS.clamp(self.cpu_usage + vm.cpu_load);
        self.memory_usage = MEMORY_BOUNDS.clamp(self.memory_usage + vm.memory_load);
        self.network_load = NETWORK_BOUNDS.clamp(self.network_load + vm.network_load);
    }

    pub(crate) fn pin_idle_loads(&mut self) {
        self.cpu_usage = IDLE_CPU;
        self.memory_usage = IDLE_MEMORY;
        self.network_load = IDLE_NETWORK;
    }
}

/// Aggregate view of the fleet for dashboards, health and metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FleetSummary {
    pub total_servers: usize,
    pub active_servers: usize,
    pub idle_servers: usize,
    pub warning_servers: usize,
    pub maintenance_servers: usize,
    pub faulted_servers: usize,
    /// Servers currently able to receive migrated VMs
    pub migration_targets: usize,
    pub total_vms: usize,
    pub mean_cpu_usage: f64,
    pub mean_temperature: f64,
}

impl FleetSummary {
    pub fn from_servers(servers: &[Server]) -> Self {
        let total = servers.len();
        let mut summary = FleetSummary {
            total_servers: total,
            ..Default::default()
        };
        if total == 0 {
            return summary;
        }

        let mut cpu_sum = 0.0;
        let mut temp_sum = 0.0;
        for server in servers {
            if server.is_active() {
                summary.active_servers += 1;
            }
            match server.power_state {
                PowerState::Idle => summary.idle_servers += 1,
                PowerState::Warning => summary.warning_servers += 1,
                PowerState::Normal => {}
            }
            if server.in_maintenance() {
                summary.maintenance_servers += 1;
            }
            if server.has_fault() {
                summary.faulted_servers += 1;
            }
            if server.accepts_migrations() {
                summary.migration_targets += 1;
            }
            summary.total_vms += server.vms.len();
            cpu_sum += server.cpu_usage;
            temp_sum += server.temperature;
        }
        summary.mean_cpu_usage = cpu_sum / total as f64;
        summary.mean_temperature = temp_sum / total as f64;
        summary
    }
}

/// Ordered snapshot of every server and its VMs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetSnapshot {
    pub taken_at: DateTime<Utc>,
    pub servers: Vec<Server>,
    pub summary: FleetSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vm_load_ratios() {
        let vm = Vm::new("VM-1", "Rack-1", 20.0);
        assert_eq!(vm.memory_load, 24.0);
        assert_eq!(vm.network_load, 16.0);
    }

    #[test]
    fn test_clipped_absorption_respects_bounds() {
        let mut server = Server::new("Rack-1", 90.0, 85.0, 98.0, 35.0);
        server.absorb_load_clipped(&Vm::new("VM-1", "Rack-2", 20.0));
        assert_eq!(server.cpu_usage, 95.0);
        assert_eq!(server.memory_usage, 90.0);
        assert_eq!(server.network_load, 100.0);
    }

    #[test]
    fn test_unclipped_absorption() {
        let mut server = Server::new("Rack-1", 90.0, 85.0, 98.0, 35.0);
        server.absorb_load(&Vm::new("VM-1", "Rack-2", 20.0));
        assert_eq!(server.cpu_usage, 110.0);
        assert_eq!(server.memory_usage, 109.0);
        assert_eq!(server.network_load, 114.0);
    }

    #[test]
    fn test_eligibility_predicates() {
        let mut server = Server::new("Rack-1", 40.0, 48.0, 32.0, 35.0);
        assert!(server.accepts_migrations());
        assert!(server.accepts_faults());

        server.fault = Some(FaultType::Load);
        assert!(server.accepts_migrations());
        assert!(!server.accepts_faults());

        let idle = Server::idle("Rack-2", 35.0);
        assert!(idle.is_schedulable());
        assert!(!idle.accepts_migrations());
    }

    #[test]
    fn test_summary_counts() {
        let mut faulted = Server::new("Rack-1", 40.0, 48.0, 32.0, 40.0);
        faulted.fault = Some(FaultType::Power);
        faulted.power_state = PowerState::Warning;
        faulted.vms.push(Vm::new("VM-1", "Rack-1", 10.0));
        let idle = Server::idle("Rack-2", 30.0);

        let summary = FleetSummary::from_servers(&[faulted, idle]);
        assert_eq!(summary.total_servers, 2);
        assert_eq!(summary.active_servers, 2);
        assert_eq!(summary.idle_servers, 1);
        assert_eq!(summary.warning_servers, 1);
        assert_eq!(summary.faulted_servers, 1);
        assert_eq!(summary.migration_targets, 1);
        assert_eq!(summary.total_vms, 1);
        assert!((summary.mean_temperature - 35.0).abs() < 1e-9);
    }

    #[test]
    fn test_enums_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&PowerState::Idle).unwrap(), "\"idle\"");
        assert_eq!(
            serde_json::to_string(&MaintenanceKind::Replace).unwrap(),
            "\"replace\""
        );
        assert_eq!(FaultType::Temperature.to_string(), "temperature");
    }
}
