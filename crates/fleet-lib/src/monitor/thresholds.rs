//! Two-tier metric thresholds and rack status classification

use crate::config::invalid;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Health of a single metric or a whole rack, ordered by severity
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RackStatus {
    #[default]
    Normal,
    Warning,
    Critical,
}

impl RackStatus {
    pub const ALL: [RackStatus; 3] = [RackStatus::Normal, RackStatus::Warning, RackStatus::Critical];

    /// Worst of the given statuses; normal when empty
    pub fn combine(statuses: impl IntoIterator<Item = RackStatus>) -> RackStatus {
        statuses.into_iter().max().unwrap_or_default()
    }

    pub fn severity(self) -> Option<AlertSeverity> {
        match self {
            RackStatus::Normal => None,
            RackStatus::Warning => Some(AlertSeverity::Warning),
            RackStatus::Critical => Some(AlertSeverity::Critical),
        }
    }
}

impl std::fmt::Display for RackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RackStatus::Normal => write!(f, "normal"),
            RackStatus::Warning => write!(f, "warning"),
            RackStatus::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertSeverity::Warning => write!(f, "warning"),
            AlertSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// Warning and critical levels for one metric; both inclusive
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricThresholds {
    pub warning: f64,
    pub critical: f64,
}

impl MetricThresholds {
    pub const fn new(warning: f64, critical: f64) -> Self {
        Self { warning, critical }
    }

    pub fn classify(&self, value: f64) -> RackStatus {
        if value >= self.critical {
            RackStatus::Critical
        } else if value >= self.warning {
            RackStatus::Warning
        } else {
            RackStatus::Normal
        }
    }
}

/// Thresholds for every monitored rack metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Degrees Celsius
    pub temperature: MetricThresholds,
    /// g
    pub vibration: MetricThresholds,
    /// Watts
    pub power: MetricThresholds,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            temperature: MetricThresholds::new(42.0, 45.0),
            vibration: MetricThresholds::new(0.8, 1.2),
            power: MetricThresholds::new(1200.0, 1500.0),
        }
    }
}

impl Thresholds {
    pub fn validate(&self) -> Result<()> {
        for (name, t) in [
            ("temperature", self.temperature),
            ("vibration", self.vibration),
            ("power", self.power),
        ] {
            if !(t.warning.is_finite() && t.critical.is_finite()) || t.warning > t.critical {
                return Err(invalid(format!(
                    "{} warning threshold must be finite and not above critical",
                    name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_is_inclusive() {
        let t = Thresholds::default();
        assert_eq!(t.temperature.classify(41.9), RackStatus::Normal);
        assert_eq!(t.temperature.classify(42.0), RackStatus::Warning);
        assert_eq!(t.temperature.classify(45.0), RackStatus::Critical);
        assert_eq!(t.vibration.classify(1.0), RackStatus::Warning);
        assert_eq!(t.power.classify(1500.0), RackStatus::Critical);
    }

    #[test]
    fn test_combine_takes_worst() {
        assert_eq!(RackStatus::combine([]), RackStatus::Normal);
        assert_eq!(
            RackStatus::combine([RackStatus::Warning, RackStatus::Normal]),
            RackStatus::Warning
        );
        assert_eq!(
            RackStatus::combine([RackStatus::Warning, RackStatus::Critical, RackStatus::Normal]),
            RackStatus::Critical
        );
    }

    #[test]
    fn test_only_abnormal_status_has_severity() {
        assert_eq!(RackStatus::Normal.severity(), None);
        assert_eq!(RackStatus::Critical.severity(), Some(AlertSeverity::Critical));
    }

    #[test]
    fn test_rejects_inverted_thresholds() {
        let mut t = Thresholds::default();
        t.power = MetricThresholds::new(1600.0, 1500.0);
        assert!(t.validate().is_err());
    }
}
