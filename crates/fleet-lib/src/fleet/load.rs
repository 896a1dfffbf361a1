//! Per-tick load and temperature evolution

use super::sampling::LoadSamplers;
use super::state::FleetState;
use crate::models::{
    FaultType, CPU_BOUNDS, MEMORY_BOUNDS, NETWORK_BOUNDS, TEMPERATURE_BOUNDS,
};
use rand::Rng;

/// Advance loads and temperatures of every schedulable rack by one step
///
/// Healthy racks drift by a normal jitter plus the cpu load of their VMs,
/// clipped to the metric bounds; idle racks stay pinned at the idle loads.
/// Faulted racks keep their loads. Temperatures of non-idle racks follow
/// cpu, except racks with a temperature fault which run hot. Idle racks
/// keep their last temperature.
pub fn evolve<R: Rng + ?Sized>(fleet: &mut FleetState, samplers: &LoadSamplers, rng: &mut R) {
    for server in fleet.servers_mut() {
        if !server.is_schedulable() {
            continue;
        }

        if !server.has_fault() {
            let variation = samplers.load_variation(rng);
            if server.is_idle() {
                server.pin_idle_loads();
            } else {
                let vm_cpu = server.hosted_cpu();
                server.cpu_usage = CPU_BOUNDS.clamp(server.cpu_usage + variation + vm_cpu);
                server.memory_usage =
                    MEMORY_BOUNDS.clamp(server.memory_usage + variation * 0.5 + vm_cpu * 1.2);
                server.network_load =
                    NETWORK_BOUNDS.clamp(server.network_load + variation * 1.5 + vm_cpu * 0.8);
            }
        }

        if server.is_idle() {
            continue;
        }
        server.temperature = if server.fault == Some(FaultType::Temperature) {
            rng.gen_range(45.0..50.0)
        } else {
            let load_factor = server.cpu_usage / 100.0;
            TEMPERATURE_BOUNDS
                .clamp(35.0 + load_factor * 10.0 + samplers.temperature_noise(rng))
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FleetConfig;
    use crate::models::{
        Maintenance, MaintenanceKind, PowerState, Server, Vm, IDLE_CPU, IDLE_MEMORY, IDLE_NETWORK,
    };
    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn quiet_samplers() -> LoadSamplers {
        LoadSamplers::new(&FleetConfig {
            load_variation_std_dev: 0.0,
            temperature_noise_std_dev: 0.0,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_vm_load_accumulates_and_clips() {
        let mut server = Server::new("Rack-1", 50.0, 40.0, 20.0, 35.0);
        server.vms.push(Vm::new("VM-1", "Rack-1", 10.0));
        let mut fleet = FleetState::from_servers(vec![server]);
        let mut rng = StdRng::seed_from_u64(1);

        evolve(&mut fleet, &quiet_samplers(), &mut rng);
        let server = &fleet.servers()[0];
        assert!((server.cpu_usage - 60.0).abs() < 1e-9);
        assert!((server.memory_usage - 52.0).abs() < 1e-9);
        assert!((server.network_load - 28.0).abs() < 1e-9);
        assert!((server.temperature - 41.0).abs() < 1e-9);

        for _ in 0..10 {
            evolve(&mut fleet, &quiet_samplers(), &mut rng);
        }
        let server = &fleet.servers()[0];
        assert_eq!(server.cpu_usage, 95.0);
        assert_eq!(server.memory_usage, 90.0);
        assert_eq!(server.network_load, 100.0);
    }

    #[test]
    fn test_idle_rack_pinned_and_temperature_kept() {
        let mut idle = Server::idle("Rack-1", 33.3);
        idle.vms.push(Vm::new("VM-1", "Rack-2", 25.0));
        let mut fleet = FleetState::from_servers(vec![idle]);
        let mut rng = StdRng::seed_from_u64(1);

        evolve(&mut fleet, &LoadSamplers::new(&FleetConfig::default()).unwrap(), &mut rng);
        let server = &fleet.servers()[0];
        assert_eq!(server.power_state, PowerState::Idle);
        assert_eq!(server.cpu_usage, IDLE_CPU);
        assert_eq!(server.memory_usage, IDLE_MEMORY);
        assert_eq!(server.network_load, IDLE_NETWORK);
        assert_eq!(server.temperature, 33.3);
    }

    #[test]
    fn test_faulted_rack_keeps_loads() {
        let mut faulty = Server::new("Rack-1", 97.0, 93.0, 40.0, 38.0);
        faulty.fault = Some(FaultType::Load);
        let mut fleet = FleetState::from_servers(vec![faulty]);
        let mut rng = StdRng::seed_from_u64(1);

        evolve(&mut fleet, &quiet_samplers(), &mut rng);
        let server = &fleet.servers()[0];
        assert_eq!(server.cpu_usage, 97.0);
        assert_eq!(server.memory_usage, 93.0);
        // Temperature still tracks cpu: 35 + 9.7
        assert!((server.temperature - 44.7).abs() < 1e-9);
    }

    #[test]
    fn test_temperature_fault_runs_hot() {
        let mut faulty = Server::new("Rack-1", 40.0, 48.0, 32.0, 46.0);
        faulty.fault = Some(FaultType::Temperature);
        let mut fleet = FleetState::from_servers(vec![faulty]);
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..20 {
            evolve(&mut fleet, &quiet_samplers(), &mut rng);
            assert!((45.0..50.0).contains(&fleet.servers()[0].temperature));
        }
    }

    #[test]
    fn test_maintenance_rack_untouched() {
        let mut serviced = Server::new("Rack-1", 40.0, 48.0, 32.0, 39.0);
        serviced.maintenance = Some(Maintenance {
            kind: MaintenanceKind::Repair,
            started_at: Utc::now(),
        });
        let before = serviced.clone();
        let mut fleet = FleetState::from_servers(vec![serviced]);
        let mut rng = StdRng::seed_from_u64(1);

        evolve(&mut fleet, &LoadSamplers::new(&FleetConfig::default()).unwrap(), &mut rng);
        assert_eq!(fleet.servers()[0], before);
    }

    #[test]
    fn test_loads_stay_in_bounds_under_noise() {
        let servers = (1..=10)
            .map(|i| {
                let mut s = Server::new(format!("Rack-{}", i), 30.0, 36.0, 24.0, 35.0);
                if i % 3 == 0 {
                    s.vms.push(Vm::new(format!("VM-{}", i), "Rack-1", 20.0));
                }
                s
            })
            .collect();
        let mut fleet = FleetState::from_servers(servers);
        let samplers = LoadSamplers::new(&FleetConfig::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(99);

        for _ in 0..200 {
            evolve(&mut fleet, &samplers, &mut rng);
            for s in fleet.servers() {
                assert!(CPU_BOUNDS.contains(s.cpu_usage));
                assert!(MEMORY_BOUNDS.contains(s.memory_usage));
                assert!(NETWORK_BOUNDS.contains(s.network_load));
                assert!(TEMPERATURE_BOUNDS.contains(s.temperature));
            }
        }
    }
}
