//! Workload rebalancing and power management
//!
//! Overloaded racks shed half of their load above the rebalance target to
//! underutilized racks as synthetic VMs. Afterwards, nearly empty racks are
//! put to sleep and sleeping racks may wake up.

use super::sampling::LoadSamplers;
use super::state::FleetState;
use crate::config::FleetConfig;
use crate::models::{PowerState, Vm};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

/// Load shifted from one rack to another
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transfer {
    pub vm_id: String,
    pub from: String,
    pub to: String,
    pub cpu_load: f64,
}

/// Everything one optimization pass changed
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RebalanceReport {
    pub transfers: Vec<Transfer>,
    pub idled: Vec<String>,
    pub woken: Vec<String>,
}

impl RebalanceReport {
    pub fn is_empty(&self) -> bool {
        self.transfers.is_empty() && self.idled.is_empty() && self.woken.is_empty()
    }
}

/// Threshold-driven load balancer
#[derive(Debug, Clone)]
pub struct WorkloadBalancer {
    overload_threshold: f64,
    underutilized_threshold: f64,
    rebalance_target: f64,
    idle_threshold: f64,
    wake_probability: f64,
}

impl WorkloadBalancer {
    pub fn new(config: &FleetConfig) -> Self {
        Self {
            overload_threshold: config.overload_threshold,
            underutilized_threshold: config.underutilized_threshold,
            rebalance_target: config.rebalance_target,
            idle_threshold: config.idle_threshold,
            wake_probability: config.wake_probability,
        }
    }

    /// Run one rebalancing pass over the active racks not in maintenance
    ///
    /// Targets are credited with all three VM loads unclipped while the
    /// source is only debited on cpu; memory and network on the source are
    /// left as they were.
    pub fn optimize<R: Rng + ?Sized>(
        &self,
        fleet: &mut FleetState,
        samplers: &LoadSamplers,
        rng: &mut R,
    ) -> RebalanceReport {
        let mut report = RebalanceReport::default();
        let eligible = fleet.indices_where(|s| s.is_schedulable());

        let mut by_load = eligible.clone();
        {
            let servers = fleet.servers();
            by_load.sort_by(|&a, &b| servers[a].cpu_usage.total_cmp(&servers[b].cpu_usage));
        }
        let overloaded: Vec<usize> = by_load
            .iter()
            .copied()
            .filter(|&i| fleet.servers()[i].cpu_usage > self.overload_threshold)
            .collect();
        let mut underutilized: Vec<usize> = by_load
            .iter()
            .copied()
            .filter(|&i| fleet.servers()[i].cpu_usage < self.underutilized_threshold)
            .collect();

        for &high in &overloaded {
            if underutilized.is_empty() {
                break;
            }
            for low in underutilized.clone() {
                if !fleet.servers()[low].can_host_vms {
                    continue;
                }
                report.transfers.push(self.transfer(fleet, high, low));

                if fleet.servers()[low].cpu_usage > self.underutilized_threshold {
                    underutilized.retain(|&i| i != low);
                }
            }
        }

        for index in eligible {
            let server = &mut fleet.servers_mut()[index];
            if server.cpu_usage < self.idle_threshold && server.vms.is_empty() {
                if !server.is_idle() {
                    debug!(server_id = %server.id, cpu_usage = server.cpu_usage, "Rack idled");
                    report.idled.push(server.id.clone());
                }
                server.power_state = PowerState::Idle;
            } else if server.is_idle() && rng.gen::<f64>() < self.wake_probability {
                server.power_state = PowerState::Normal;
                server.cpu_usage = samplers.base_load(rng);
                debug!(server_id = %server.id, cpu_usage = server.cpu_usage, "Rack woken");
                report.woken.push(server.id.clone());
            }
        }

        if !report.is_empty() {
            info!(
                transfers = report.transfers.len(),
                idled = report.idled.len(),
                woken = report.woken.len(),
                "Workload optimized"
            );
        }
        report
    }

    fn transfer(&self, fleet: &mut FleetState, high: usize, low: usize) -> Transfer {
        let (source_id, amount) = {
            let source = &fleet.servers()[high];
            (source.id.clone(), (source.cpu_usage - self.rebalance_target) / 2.0)
        };
        let vm = Vm::new(fleet.allocate_vm_id(&source_id), source_id.clone(), amount);

        let target = &mut fleet.servers_mut()[low];
        target.absorb_load(&vm);
        let transfer = Transfer {
            vm_id: vm.id.clone(),
            from: source_id,
            to: target.id.clone(),
            cpu_load: amount,
        };
        target.vms.push(vm);

        fleet.servers_mut()[high].cpu_usage -= amount;
        transfer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Maintenance, MaintenanceKind, Server};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn balancer() -> WorkloadBalancer {
        WorkloadBalancer::new(&FleetConfig::default())
    }

    fn samplers() -> LoadSamplers {
        LoadSamplers::new(&FleetConfig::default()).unwrap()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "{} != {}", actual, expected);
    }

    #[test]
    fn test_overloaded_rack_sheds_to_underutilized() {
        let mut fleet = FleetState::from_servers(vec![
            Server::new("Rack-1", 90.0, 70.0, 50.0, 44.0),
            Server::new("Rack-2", 20.0, 24.0, 16.0, 37.0),
        ]);
        let mut rng = StdRng::seed_from_u64(1);

        let report = balancer().optimize(&mut fleet, &samplers(), &mut rng);

        assert_eq!(report.transfers.len(), 1);
        let transfer = &report.transfers[0];
        assert_eq!(transfer.from, "Rack-1");
        assert_eq!(transfer.to, "Rack-2");
        assert_eq!(transfer.cpu_load, 15.0);

        let source = fleet.get("Rack-1").unwrap();
        let target = fleet.get("Rack-2").unwrap();
        assert_eq!(source.cpu_usage, 75.0);
        assert_eq!(target.cpu_usage, 35.0);
        assert_close(target.memory_usage, 24.0 + 18.0);
        assert_close(target.network_load, 16.0 + 12.0);
        assert_eq!(target.vms.len(), 1);
        assert_eq!(target.vms[0].source_server, "Rack-1");
    }

    #[test]
    fn test_rebalance_only_debits_source_cpu() {
        let mut fleet = FleetState::from_servers(vec![
            Server::new("Rack-1", 90.0, 70.0, 50.0, 44.0),
            Server::new("Rack-2", 20.0, 24.0, 16.0, 37.0),
        ]);
        let mut rng = StdRng::seed_from_u64(1);

        balancer().optimize(&mut fleet, &samplers(), &mut rng);

        let source = fleet.get("Rack-1").unwrap();
        assert_eq!(source.memory_usage, 70.0);
        assert_eq!(source.network_load, 50.0);
    }

    #[test]
    fn test_target_credit_is_unclipped() {
        let mut fleet = FleetState::from_servers(vec![
            Server::new("Rack-1", 95.0, 70.0, 50.0, 44.0),
            Server::new("Rack-2", 25.0, 88.0, 99.0, 37.0),
        ]);
        let mut rng = StdRng::seed_from_u64(1);

        balancer().optimize(&mut fleet, &samplers(), &mut rng);

        let target = fleet.get("Rack-2").unwrap();
        assert_eq!(target.cpu_usage, 42.5);
        assert_close(target.memory_usage, 88.0 + 21.0);
        assert_close(target.network_load, 99.0 + 14.0);
    }

    #[test]
    fn test_target_keeps_receiving_until_above_threshold() {
        // Rack-3 absorbs 10 then stays below 30 and absorbs again
        let mut fleet = FleetState::from_servers(vec![
            Server::new("Rack-1", 82.0, 70.0, 50.0, 44.0),
            Server::new("Rack-2", 81.0, 70.0, 50.0, 44.0),
            Server::new("Rack-3", 15.0, 24.0, 16.0, 37.0),
        ]);
        let mut rng = StdRng::seed_from_u64(1);

        let report = balancer().optimize(&mut fleet, &samplers(), &mut rng);

        assert_eq!(report.transfers.len(), 2);
        assert_eq!(report.transfers[0].from, "Rack-2");
        assert_eq!(report.transfers[0].cpu_load, 10.5);
        assert_eq!(report.transfers[1].from, "Rack-1");
        assert_eq!(report.transfers[1].cpu_load, 11.0);
        assert_eq!(fleet.get("Rack-3").unwrap().vms.len(), 2);
        assert_eq!(fleet.get("Rack-3").unwrap().cpu_usage, 36.5);
    }

    #[test]
    fn test_vm_count_grows_by_transfers_only() {
        let mut fleet = FleetState::from_servers(vec![
            Server::new("Rack-1", 92.0, 70.0, 50.0, 44.0),
            Server::new("Rack-2", 12.0, 24.0, 16.0, 37.0),
            Server::new("Rack-3", 18.0, 24.0, 16.0, 37.0),
        ]);
        let before = fleet.vm_count();
        let mut rng = StdRng::seed_from_u64(1);

        let report = balancer().optimize(&mut fleet, &samplers(), &mut rng);

        assert_eq!(fleet.vm_count(), before + report.transfers.len());
        let ids: Vec<&str> = fleet
            .servers()
            .iter()
            .flat_map(|s| s.vms.iter().map(|vm| vm.id.as_str()))
            .collect();
        let mut unique = ids.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(ids.len(), unique.len());
    }

    #[test]
    fn test_skips_racks_that_cannot_host() {
        let mut locked = Server::new("Rack-2", 20.0, 24.0, 16.0, 37.0);
        locked.can_host_vms = false;
        let mut fleet = FleetState::from_servers(vec![
            Server::new("Rack-1", 90.0, 70.0, 50.0, 44.0),
            locked,
        ]);
        let mut rng = StdRng::seed_from_u64(1);

        let report = balancer().optimize(&mut fleet, &samplers(), &mut rng);
        assert!(report.transfers.is_empty());
        assert_eq!(fleet.get("Rack-1").unwrap().cpu_usage, 90.0);
    }

    #[test]
    fn test_maintenance_racks_excluded() {
        let mut serviced = Server::new("Rack-2", 20.0, 24.0, 16.0, 37.0);
        serviced.maintenance = Some(Maintenance {
            kind: MaintenanceKind::Repair,
            started_at: chrono::Utc::now(),
        });
        let mut fleet = FleetState::from_servers(vec![
            Server::new("Rack-1", 90.0, 70.0, 50.0, 44.0),
            serviced,
        ]);
        let mut rng = StdRng::seed_from_u64(1);

        let report = balancer().optimize(&mut fleet, &samplers(), &mut rng);
        assert!(report.transfers.is_empty());
    }

    #[test]
    fn test_empty_low_rack_goes_idle() {
        let mut fleet = FleetState::from_servers(vec![Server::new("Rack-1", 12.0, 24.0, 16.0, 35.0)]);
        let mut rng = StdRng::seed_from_u64(1);

        let report = balancer().optimize(&mut fleet, &samplers(), &mut rng);
        assert_eq!(report.idled, vec!["Rack-1".to_string()]);
        assert!(fleet.servers()[0].is_idle());
    }

    #[test]
    fn test_low_rack_with_vms_stays_awake() {
        let mut server = Server::new("Rack-1", 12.0, 24.0, 16.0, 35.0);
        server.vms.push(Vm::new("VM-1", "Rack-1", 5.0));
        let mut fleet = FleetState::from_servers(vec![server]);
        let mut rng = StdRng::seed_from_u64(1);

        balancer().optimize(&mut fleet, &samplers(), &mut rng);
        assert_eq!(fleet.servers()[0].power_state, PowerState::Normal);
    }

    #[test]
    fn test_idle_rack_with_vms_eventually_wakes() {
        let config = FleetConfig {
            wake_probability: 1.0,
            ..Default::default()
        };
        let mut idle = Server::idle("Rack-1", 35.0);
        idle.vms.push(Vm::new("VM-1", "Rack-2", 10.0));
        let mut fleet = FleetState::from_servers(vec![idle]);
        let mut rng = StdRng::seed_from_u64(1);

        let report = WorkloadBalancer::new(&config).optimize(&mut fleet, &samplers(), &mut rng);
        assert_eq!(report.woken, vec!["Rack-1".to_string()]);
        assert_eq!(fleet.servers()[0].power_state, PowerState::Normal);
    }

    #[test]
    fn test_never_wakes_with_zero_probability() {
        let config = FleetConfig {
            wake_probability: 0.0,
            ..Default::default()
        };
        let mut idle = Server::idle("Rack-1", 35.0);
        idle.vms.push(Vm::new("VM-1", "Rack-2", 10.0));
        let mut fleet = FleetState::from_servers(vec![idle]);
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..50 {
            WorkloadBalancer::new(&config).optimize(&mut fleet, &samplers(), &mut rng);
        }
        assert!(fleet.servers()[0].is_idle());
    }
}
