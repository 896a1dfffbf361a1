//! Simulation configuration
//!
//! Every tunable of the fleet simulation and the rack monitor lives here
//! with defaults matching the reference policy. Both structs deserialize
//! with missing fields falling back to those defaults, so a caller can
//! override a single knob from the environment.

use crate::error::{FleetError, Result};
use crate::monitor::Thresholds;
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Fleet-side policy: initialization, faults, maintenance, balancing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    /// Number of racks created at initialization
    pub server_count: usize,
    /// Minimum time between two fault injections
    pub fault_interval_secs: i64,
    /// Time a server spends in maintenance before it is returned to service
    pub maintenance_duration_secs: i64,
    /// Probability that a rack starts out idle
    pub idle_probability: f64,
    /// Mean of the initial (and wake-up) cpu load
    pub base_load_mean: f64,
    /// Standard deviation of the initial (and wake-up) cpu load
    pub base_load_std_dev: f64,
    /// Mean temperature at boot and after maintenance
    pub temperature_mean: f64,
    pub temperature_std_dev: f64,
    /// Fraction of active racks seeded with VMs
    pub vm_host_fraction: f64,
    /// Upper bound of VMs seeded per host (lower bound is 1)
    pub max_initial_vms: usize,
    pub vm_load_min: f64,
    pub vm_load_max: f64,
    /// Standard deviation of the per-tick load jitter
    pub load_variation_std_dev: f64,
    /// Standard deviation of the per-tick temperature noise
    pub temperature_noise_std_dev: f64,
    /// Racks above this cpu shed load during optimization
    pub overload_threshold: f64,
    /// Racks below this cpu accept load during optimization
    pub underutilized_threshold: f64,
    /// Cpu level an overloaded rack converges towards
    pub rebalance_target: f64,
    /// Racks below this cpu with no VMs are put to sleep
    pub idle_threshold: f64,
    /// Per-call chance that an idle rack wakes up
    pub wake_probability: f64,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            server_count: 20,
            fault_interval_secs: 120,
            maintenance_duration_secs: 60,
            idle_probability: 0.2,
            base_load_mean: 30.0,
            base_load_std_dev: 10.0,
            temperature_mean: 35.0,
            temperature_std_dev: 2.0,
            vm_host_fraction: 0.6,
            max_initial_vms: 3,
            vm_load_min: 10.0,
            vm_load_max: 30.0,
            load_variation_std_dev: 5.0,
            temperature_noise_std_dev: 0.5,
            overload_threshold: 80.0,
            underutilized_threshold: 30.0,
            rebalance_target: 60.0,
            idle_threshold: 15.0,
            wake_probability: 0.1,
        }
    }
}

impl FleetConfig {
    pub fn fault_interval(&self) -> Duration {
        Duration::seconds(self.fault_interval_secs)
    }

    pub fn maintenance_duration(&self) -> Duration {
        Duration::seconds(self.maintenance_duration_secs)
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.server_count == 0 {
            return Err(invalid("server_count must be at least 1"));
        }
        for (name, p) in [
            ("idle_probability", self.idle_probability),
            ("vm_host_fraction", self.vm_host_fraction),
            ("wake_probability", self.wake_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(invalid(format!("{} must be within [0, 1], got {}", name, p)));
            }
        }
        for (name, value) in [
            ("base_load_mean", self.base_load_mean),
            ("temperature_mean", self.temperature_mean),
            ("overload_threshold", self.overload_threshold),
            ("underutilized_threshold", self.underutilized_threshold),
            ("rebalance_target", self.rebalance_target),
            ("idle_threshold", self.idle_threshold),
        ] {
            require_finite(name, value)?;
        }
        for (name, value) in [
            ("base_load_std_dev", self.base_load_std_dev),
            ("temperature_std_dev", self.temperature_std_dev),
            ("load_variation_std_dev", self.load_variation_std_dev),
            ("temperature_noise_std_dev", self.temperature_noise_std_dev),
        ] {
            require_std_dev(name, value)?;
        }
        if self.max_initial_vms == 0 {
            return Err(invalid("max_initial_vms must be at least 1"));
        }
        for (name, value) in [
            ("vm_load_min", self.vm_load_min),
            ("vm_load_max", self.vm_load_max),
        ] {
            if !(0.0..=MAX_LOAD_PERCENT).contains(&value) {
                return Err(invalid(format!(
                    "{} must be within [0, {}], got {}",
                    name, MAX_LOAD_PERCENT, value
                )));
            }
        }
        if self.vm_load_min >= self.vm_load_max {
            return Err(invalid("vm_load_min must be below vm_load_max"));
        }
        require_interval("fault_interval_secs", self.fault_interval_secs)?;
        require_interval("maintenance_duration_secs", self.maintenance_duration_secs)?;
        if self.underutilized_threshold >= self.overload_threshold {
            return Err(invalid(
                "underutilized_threshold must be below overload_threshold",
            ));
        }
        Ok(())
    }
}

/// Rack-monitor policy: history depth, alert retention, prediction weights
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Samples kept per rack (4 hours at one sample per minute)
    pub history_capacity: usize,
    pub thresholds: Thresholds,
    /// Alerts older than this are pruned on every analysis
    pub alert_retention_secs: i64,
    /// Window used to count recent alerts for prediction
    pub alert_window_secs: i64,
    /// Samples required before a prediction is attempted
    pub min_prediction_samples: usize,
    /// Points required before a trend is computed
    pub min_trend_points: usize,
    /// Normalized trend above which a metric counts as rising
    pub trend_threshold: f64,
    /// Recent alerts at or above which alert frequency counts as high
    pub alert_frequency: usize,
    pub temperature_weight: f64,
    pub vibration_weight: f64,
    pub power_weight: f64,
    pub alert_weight: f64,
    pub critical_confidence: f64,
    pub warning_confidence: f64,
    /// Failure horizon reported for critical predictions
    pub critical_horizon_secs: i64,
    /// Failure horizon reported for warning predictions
    pub warning_horizon_secs: i64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            history_capacity: 240,
            thresholds: Thresholds::default(),
            alert_retention_secs: 24 * 60 * 60,
            alert_window_secs: 60 * 60,
            min_prediction_samples: 60,
            min_trend_points: 30,
            trend_threshold: 0.7,
            alert_frequency: 3,
            temperature_weight: 0.3,
            vibration_weight: 0.3,
            power_weight: 0.2,
            alert_weight: 0.2,
            critical_confidence: 0.8,
            warning_confidence: 0.5,
            critical_horizon_secs: 30 * 60,
            warning_horizon_secs: 2 * 60 * 60,
        }
    }
}

impl MonitorConfig {
    pub fn alert_retention(&self) -> Duration {
        Duration::seconds(self.alert_retention_secs)
    }

    pub fn alert_window(&self) -> Duration {
        Duration::seconds(self.alert_window_secs)
    }

    pub fn critical_horizon(&self) -> Duration {
        Duration::seconds(self.critical_horizon_secs)
    }

    pub fn warning_horizon(&self) -> Duration {
        Duration::seconds(self.warning_horizon_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.history_capacity == 0 {
            return Err(invalid("history_capacity must be at least 1"));
        }
        if self.min_trend_points < 2 {
            return Err(invalid("min_trend_points must be at least 2"));
        }
        for (name, secs) in [
            ("alert_retention_secs", self.alert_retention_secs),
            ("alert_window_secs", self.alert_window_secs),
            ("critical_horizon_secs", self.critical_horizon_secs),
            ("warning_horizon_secs", self.warning_horizon_secs),
        ] {
            require_interval(name, secs)?;
        }
        for (name, value) in [
            ("trend_threshold", self.trend_threshold),
            ("temperature_weight", self.temperature_weight),
            ("vibration_weight", self.vibration_weight),
            ("power_weight", self.power_weight),
            ("alert_weight", self.alert_weight),
            ("critical_confidence", self.critical_confidence),
            ("warning_confidence", self.warning_confidence),
        ] {
            require_finite(name, value)?;
        }
        if self.warning_confidence > self.critical_confidence {
            return Err(invalid(
                "warning_confidence must not exceed critical_confidence",
            ));
        }
        self.thresholds.validate()
    }
}

/// Complete configuration for one simulation instance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub fleet: FleetConfig,
    pub monitor: MonitorConfig,
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        self.fleet.validate()?;
        self.monitor.validate()
    }
}

/// Longest interval accepted for any `*_secs` setting (one year)
pub const MAX_INTERVAL_SECS: i64 = 365 * 24 * 60 * 60;

const MAX_LOAD_PERCENT: f64 = 100.0;

fn require_finite(name: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(invalid(format!("{} must be finite, got {}", name, value)))
    }
}

fn require_std_dev(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(format!(
            "{} must be finite and not negative, got {}",
            name, value
        )))
    }
}

fn require_interval(name: &str, secs: i64) -> Result<()> {
    if (0..=MAX_INTERVAL_SECS).contains(&secs) {
        Ok(())
    } else {
        Err(invalid(format!(
            "{} must be within [0, {}], got {}",
            name, MAX_INTERVAL_SECS, secs
        )))
    }
}

pub(crate) fn invalid(reason: impl Into<String>) -> FleetError {
    FleetError::InvalidConfig(reason.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_empty_fleet() {
        let config = FleetConfig {
            server_count: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(FleetError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_probability_out_of_range() {
        let config = FleetConfig {
            wake_probability: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_inverted_confidence_levels() {
        let config = MonitorConfig {
            warning_confidence: 0.9,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_non_finite_vm_load() {
        for config in [
            FleetConfig {
                vm_load_min: f64::NAN,
                ..Default::default()
            },
            FleetConfig {
                vm_load_max: f64::INFINITY,
                ..Default::default()
            },
            FleetConfig {
                vm_load_min: -5.0,
                ..Default::default()
            },
        ] {
            assert!(matches!(
                config.validate(),
                Err(FleetError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn test_rejects_non_finite_fleet_settings() {
        let cases = [
            FleetConfig {
                base_load_mean: f64::NAN,
                ..Default::default()
            },
            FleetConfig {
                temperature_mean: f64::NEG_INFINITY,
                ..Default::default()
            },
            FleetConfig {
                base_load_std_dev: -1.0,
                ..Default::default()
            },
            FleetConfig {
                load_variation_std_dev: f64::NAN,
                ..Default::default()
            },
            FleetConfig {
                temperature_noise_std_dev: f64::INFINITY,
                ..Default::default()
            },
            FleetConfig {
                rebalance_target: f64::NAN,
                ..Default::default()
            },
            FleetConfig {
                idle_threshold: f64::INFINITY,
                ..Default::default()
            },
            FleetConfig {
                overload_threshold: f64::NAN,
                ..Default::default()
            },
            FleetConfig {
                idle_probability: f64::NAN,
                ..Default::default()
            },
        ];
        for config in cases {
            assert!(config.validate().is_err(), "accepted {:?}", config);
        }
    }

    #[test]
    fn test_rejects_fleet_intervals_out_of_range() {
        let cases = [
            FleetConfig {
                fault_interval_secs: -1,
                ..Default::default()
            },
            FleetConfig {
                fault_interval_secs: MAX_INTERVAL_SECS + 1,
                ..Default::default()
            },
            FleetConfig {
                maintenance_duration_secs: 9_000_000_000_000,
                ..Default::default()
            },
        ];
        for config in cases {
            assert!(config.validate().is_err(), "accepted {:?}", config);
        }
        let one_year = FleetConfig {
            maintenance_duration_secs: MAX_INTERVAL_SECS,
            ..Default::default()
        };
        assert!(one_year.validate().is_ok());
    }

    #[test]
    fn test_rejects_monitor_intervals_out_of_range() {
        let cases = [
            MonitorConfig {
                alert_retention_secs: 9_000_000_000_000,
                ..Default::default()
            },
            MonitorConfig {
                alert_window_secs: -60,
                ..Default::default()
            },
            MonitorConfig {
                critical_horizon_secs: i64::MAX,
                ..Default::default()
            },
            MonitorConfig {
                warning_horizon_secs: MAX_INTERVAL_SECS + 1,
                ..Default::default()
            },
        ];
        for config in cases {
            assert!(matches!(
                config.validate(),
                Err(FleetError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn test_rejects_non_finite_prediction_settings() {
        let cases = [
            MonitorConfig {
                trend_threshold: f64::NAN,
                ..Default::default()
            },
            MonitorConfig {
                temperature_weight: f64::INFINITY,
                ..Default::default()
            },
            MonitorConfig {
                alert_weight: f64::NAN,
                ..Default::default()
            },
            MonitorConfig {
                critical_confidence: f64::NAN,
                ..Default::default()
            },
            MonitorConfig {
                warning_confidence: f64::NEG_INFINITY,
                ..Default::default()
            },
        ];
        for config in cases {
            assert!(config.validate().is_err(), "accepted {:?}", config);
        }
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let config: SimulationConfig =
            serde_json::from_str(r#"{"fleet": {"server_count": 4}}"#).unwrap();
        assert_eq!(config.fleet.server_count, 4);
        assert_eq!(config.fleet.fault_interval_secs, 120);
        assert_eq!(config.monitor.history_capacity, 240);
    }

    #[test]
    fn test_durations() {
        let config = MonitorConfig::default();
        assert_eq!(config.alert_retention(), Duration::hours(24));
        assert_eq!(config.critical_horizon(), Duration::minutes(30));
        assert_eq!(FleetConfig::default().fault_interval(), Duration::minutes(2));
    }
}
