//! Maintenance lifecycle: `active -> maintenance -> active`
//!
//! Starting maintenance evacuates the rack immediately. Completion is only
//! noticed by the next tick at or after `started_at + duration`, so its
//! latency is bounded by the tick interval.

use super::migration::{migrate_from, MigrationOutcome};
use super::sampling::LoadSamplers;
use super::state::FleetState;
use crate::error::{FleetError, Result};
use crate::models::{Maintenance, MaintenanceKind, PowerState, ServerStatus};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::info;

/// Put a rack into maintenance and migrate its VMs away
pub fn start_maintenance<R: Rng + ?Sized>(
    fleet: &mut FleetState,
    server_id: &str,
    kind: MaintenanceKind,
    rng: &mut R,
    now: DateTime<Utc>,
) -> Result<MigrationOutcome> {
    let index = fleet
        .position(server_id)
        .ok_or_else(|| FleetError::UnknownServer(server_id.to_string()))?;

    let server = &mut fleet.servers_mut()[index];
    server.maintenance = Some(Maintenance {
        kind,
        started_at: now,
    });
    server.status = ServerStatus::Maintenance;
    info!(server_id = %server_id, kind = %kind, "Maintenance started");

    Ok(migrate_from(fleet, index, rng))
}

/// Return every rack whose maintenance window has elapsed to service
///
/// A serviced rack comes back active, in the normal power state, with its
/// fault cleared and a freshly drawn temperature. Returns the ids of the
/// racks that completed.
pub fn complete_due<R: Rng + ?Sized>(
    fleet: &mut FleetState,
    samplers: &LoadSamplers,
    duration: Duration,
    rng: &mut R,
    now: DateTime<Utc>,
) -> Vec<String> {
    let mut completed = Vec::new();
    for server in fleet.servers_mut() {
        let Some(maintenance) = server.maintenance else {
            continue;
        };
        if now - maintenance.started_at < duration {
            continue;
        }

        server.maintenance = None;
        server.temperature = samplers.temperature(rng);
        server.status = ServerStatus::Active;
        server.power_state = PowerState::Normal;
        server.fault = None;

        info!(
            server_id = %server.id,
            kind = %maintenance.kind,
            elapsed_secs = (now - maintenance.started_at).num_seconds(),
            "Maintenance completed"
        );
        completed.push(server.id.clone());
    }
    completed
}
