//! Authoritative record of every rack and its VMs

use super::sampling::LoadSamplers;
use crate::config::FleetConfig;
use crate::models::{FleetSummary, Server, Vm};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

/// Ordered collection of racks
///
/// Racks keep their creation order so that iteration, and therefore every
/// seeded random draw made while iterating, is reproducible.
#[derive(Debug, Clone, Default)]
pub struct FleetState {
    servers: Vec<Server>,
    next_vm_seq: u64,
}

impl FleetState {
    /// Wrap an explicit set of racks
    pub fn from_servers(servers: Vec<Server>) -> Self {
        Self {
            servers,
            next_vm_seq: 0,
        }
    }

    /// Create `config.server_count` racks named `Rack-1..Rack-N`
    ///
    /// Each rack draws a base load; a fraction of racks start idle with
    /// pinned minimal loads, the rest carry the base load with memory and
    /// network derived from it.
    pub fn initialize<R: Rng + ?Sized>(
        config: &FleetConfig,
        samplers: &LoadSamplers,
        rng: &mut R,
    ) -> Self {
        let servers = (1..=config.server_count)
            .map(|i| {
                let id = format!("Rack-{}", i);
                let base_load = samplers.base_load(rng);
                let is_idle = rng.gen::<f64>() < config.idle_probability;
                let temperature = samplers.temperature(rng);
                if is_idle {
                    Server::idle(id, temperature)
                } else {
                    Server::new(id, base_load, base_load * 1.2, base_load * 0.8, temperature)
                }
            })
            .collect();

        Self::from_servers(servers)
    }

    /// Place the initial VMs
    ///
    /// A fraction of the active, non-idle racks (rounded down) each get
    /// between one and `max_initial_vms` VMs. Host loads grow additively and
    /// are not clipped here.
    pub fn seed_initial_vms<R: Rng + ?Sized>(&mut self, config: &FleetConfig, rng: &mut R) {
        let pool: Vec<usize> = self.indices_where(Server::accepts_migrations);
        let host_count = (pool.len() as f64 * config.vm_host_fraction).floor() as usize;
        let hosts: Vec<usize> = pool.choose_multiple(rng, host_count).copied().collect();

        for host in hosts {
            let vm_count = rng.gen_range(1..=config.max_initial_vms);
            for _ in 0..vm_count {
                let Some(&source) = pool.choose(rng) else {
                    return;
                };
                let cpu_load = rng.gen_range(config.vm_load_min..config.vm_load_max);
                let source_id = self.servers[source].id.clone();
                let vm = Vm::new(self.allocate_vm_id(&source_id), source_id, cpu_load);

                let server = &mut self.servers[host];
                server.absorb_load(&vm);
                server.vms.push(vm);
            }
        }

        debug!(
            hosts = host_count,
            vms = self.vm_count(),
            "Seeded initial VMs"
        );
    }

    pub fn servers(&self) -> &[Server] {
        &self.servers
    }

    pub(crate) fn servers_mut(&mut self) -> &mut [Server] {
        &mut self.servers
    }

    pub fn get(&self, id: &str) -> Option<&Server> {
        self.servers.iter().find(|s| s.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Server> {
        self.servers.iter_mut().find(|s| s.id == id)
    }

    pub(crate) fn position(&self, id: &str) -> Option<usize> {
        self.servers.iter().position(|s| s.id == id)
    }

    pub(crate) fn indices_where(&self, predicate: impl Fn(&Server) -> bool) -> Vec<usize> {
        self.servers
            .iter()
            .enumerate()
            .filter(|(_, s)| predicate(s))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// VMs hosted across the whole fleet
    pub fn vm_count(&self) -> usize {
        self.servers.iter().map(|s| s.vms.len()).sum()
    }

    pub fn summary(&self) -> FleetSummary {
        FleetSummary::from_servers(&self.servers)
    }

    /// Unique id for a VM originating from `source`
    pub(crate) fn allocate_vm_id(&mut self, source: &str) -> String {
        self.next_vm_seq += 1;
        format!("VM-{}-{:05}", source, self.next_vm_seq)
    }
}
