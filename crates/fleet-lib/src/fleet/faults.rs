//! Periodic fault injection
//!
//! Every `fault_interval` one randomly chosen healthy, active, non-idle rack
//! is degraded with a temperature, load or power fault.

use super::state::FleetState;
use crate::models::{FaultType, PowerState};
use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, warn};

/// Fault applied to a rack by the injector
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InjectedFault {
    pub server_id: String,
    pub fault_type: FaultType,
    pub injected_at: DateTime<Utc>,
}

/// Timer-gated fault generator
#[derive(Debug, Clone)]
pub struct FaultInjector {
    interval: Duration,
    last_injection: DateTime<Utc>,
}

impl FaultInjector {
    /// The first fault can fire one interval after `started_at`
    pub fn new(interval: Duration, started_at: DateTime<Utc>) -> Self {
        Self {
            interval,
            last_injection: started_at,
        }
    }

    pub fn last_injection(&self) -> DateTime<Utc> {
        self.last_injection
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now - self.last_injection >= self.interval
    }

    /// Inject a fault if the interval has elapsed
    ///
    /// The timer resets whenever the interval has elapsed, even if no rack
    /// was eligible, so an unhealthy fleet is not polled on every tick.
    pub fn maybe_inject<R: Rng + ?Sized>(
        &mut self,
        fleet: &mut FleetState,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> Option<InjectedFault> {
        if !self.is_due(now) {
            return None;
        }
        self.last_injection = now;

        let eligible = fleet.indices_where(|s| s.accepts_faults());
        let Some(&index) = eligible.choose(rng) else {
            debug!("No rack eligible for fault injection");
            return None;
        };
        let fault_type = *FaultType::ALL.choose(rng)?;

        let server = &mut fleet.servers_mut()[index];
        match fault_type {
            FaultType::Temperature => {
                server.temperature = rng.gen_range(45.0..50.0);
            }
            FaultType::Load => {
                server.cpu_usage = rng.gen_range(90.0..100.0);
                server.memory_usage = rng.gen_range(90.0..100.0);
            }
            FaultType::Power => {
                server.power_state = PowerState::Warning;
                server.temperature = rng.gen_range(42.0..45.0);
            }
        }
        server.fault = Some(fault_type);

        warn!(
            server_id = %server.id,
            fault_type = %fault_type,
            temperature = server.temperature,
            cpu_usage = server.cpu_usage,
            "Injected fault"
        );

        Some(InjectedFault {
            server_id: server.id.clone(),
            fault_type,
            injected_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Maintenance, MaintenanceKind, Server};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn healthy(id: &str) -> Server {
        Server::new(id, 40.0, 48.0, 32.0, 38.0)
    }

    #[test]
    fn test_not_due_before_interval() {
        let mut fleet = FleetState::from_servers(vec![healthy("Rack-1")]);
        let mut injector = FaultInjector::new(Duration::minutes(2), t0());
        let mut rng = StdRng::seed_from_u64(1);

        let result = injector.maybe_inject(&mut fleet, &mut rng, t0() + Duration::seconds(119));
        assert!(result.is_none());
        assert!(!fleet.servers()[0].has_fault());
        assert_eq!(injector.last_injection(), t0());
    }

    #[test]
    fn test_injects_once_due() {
        let mut fleet = FleetState::from_servers(vec![healthy("Rack-1")]);
        let mut injector = FaultInjector::new(Duration::minutes(2), t0());
        let mut rng = StdRng::seed_from_u64(1);
        let now = t0() + Duration::minutes(2);

        let fault = injector.maybe_inject(&mut fleet, &mut rng, now).unwrap();
        let server = &fleet.servers()[0];
        assert_eq!(fault.server_id, "Rack-1");
        assert_eq!(server.fault, Some(fault.fault_type));
        match fault.fault_type {
            FaultType::Temperature => assert!((45.0..50.0).contains(&server.temperature)),
            FaultType::Load => {
                assert!((90.0..100.0).contains(&server.cpu_usage));
                assert!((90.0..100.0).contains(&server.memory_usage));
            }
            FaultType::Power => {
                assert_eq!(server.power_state, PowerState::Warning);
                assert!((42.0..45.0).contains(&server.temperature));
            }
        }

        // Timer reset: the very next tick is not due
        assert!(injector
            .maybe_inject(&mut fleet, &mut rng, now + Duration::seconds(1))
            .is_none());
    }

    #[test]
    fn test_skips_ineligible_racks() {
        let mut faulted = healthy("Rack-1");
        faulted.fault = Some(FaultType::Load);
        let idle = Server::idle("Rack-2", 35.0);
        let mut serviced = healthy("Rack-3");
        serviced.maintenance = Some(Maintenance {
            kind: MaintenanceKind::Repair,
            started_at: t0(),
        });
        let mut fleet = FleetState::from_servers(vec![faulted, idle, serviced, healthy("Rack-4")]);
        let mut injector = FaultInjector::new(Duration::minutes(2), t0());
        let mut rng = StdRng::seed_from_u64(5);

        for round in 1..=10 {
            let now = t0() + Duration::minutes(2 * round);
            if let Some(fault) = injector.maybe_inject(&mut fleet, &mut rng, now) {
                assert_eq!(fault.server_id, "Rack-4");
            }
        }
        assert!(fleet.get("Rack-4").unwrap().has_fault());
        assert!(!fleet.get("Rack-2").unwrap().has_fault());
        assert!(!fleet.get("Rack-3").unwrap().has_fault());
    }

    #[test]
    fn test_empty_pool_still_resets_timer() {
        let mut fleet = FleetState::from_servers(vec![Server::idle("Rack-1", 35.0)]);
        let mut injector = FaultInjector::new(Duration::minutes(2), t0());
        let mut rng = StdRng::seed_from_u64(3);
        let now = t0() + Duration::minutes(3);

        assert!(injector.maybe_inject(&mut fleet, &mut rng, now).is_none());
        assert_eq!(injector.last_injection(), now);
    }
}
