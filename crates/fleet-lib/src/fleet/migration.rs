//! VM evacuation from a rack
//!
//! Each VM on the source independently lands on a uniformly chosen target
//! among the active, non-idle racks that are not in maintenance. Target
//! loads grow by the VM's loads, clipped to the metric bounds.

use super::state::FleetState;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, warn};

/// Where a migrated VM ended up
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VmPlacement {
    pub vm_id: String,
    pub target_id: String,
}

/// Result of evacuating one rack
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MigrationOutcome {
    pub source_id: String,
    pub placements: Vec<VmPlacement>,
    /// VMs left on the source because no target was available
    pub stranded: usize,
}

impl MigrationOutcome {
    pub fn migrated(&self) -> usize {
        self.placements.len()
    }
}

/// Move every VM off the rack at `source`
///
/// With no eligible target the VMs stay where they are and are reported as
/// stranded; they are never dropped.
pub fn migrate_from<R: Rng + ?Sized>(
    fleet: &mut FleetState,
    source: usize,
    rng: &mut R,
) -> MigrationOutcome {
    let source_id = fleet.servers()[source].id.clone();
    let targets: Vec<usize> = fleet
        .indices_where(|s| s.accepts_migrations())
        .into_iter()
        .filter(|&i| i != source)
        .collect();

    let vm_count = fleet.servers()[source].vms.len();
    if targets.is_empty() {
        if vm_count > 0 {
            warn!(
                source_id = %source_id,
                vms = vm_count,
                "No migration target available, VMs remain on source"
            );
        }
        return MigrationOutcome {
            source_id,
            placements: Vec::new(),
            stranded: vm_count,
        };
    }

    let vms = std::mem::take(&mut fleet.servers_mut()[source].vms);
    let mut placements = Vec::with_capacity(vms.len());
    for vm in vms {
        let Some(&target) = targets.choose(rng) else {
            break;
        };
        let server = &mut fleet.servers_mut()[target];
        server.absorb_load_clipped(&vm);
        debug!(vm_id = %vm.id, source_id = %source_id, target_id = %server.id, "Migrated VM");
        placements.push(VmPlacement {
            vm_id: vm.id.clone(),
            target_id: server.id.clone(),
        });
        server.vms.push(vm);
    }

    MigrationOutcome {
        source_id,
        placements,
        stranded: 0,
    }
}
