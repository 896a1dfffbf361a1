//! Rolling alert log of each rack

use super::thresholds::AlertSeverity;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub timestamp: DateTime<Utc>,
    pub severity: AlertSeverity,
}

/// Alerts of one rack in arrival order
#[derive(Debug, Clone, Default)]
pub struct AlertLog {
    records: Vec<AlertRecord>,
}

impl AlertLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, timestamp: DateTime<Utc>, severity: AlertSeverity) {
        self.records.push(AlertRecord {
            timestamp,
            severity,
        });
    }

    /// Drop every alert older than `now - retention`; returns how many went
    pub fn prune(&mut self, now: DateTime<Utc>, retention: Duration) -> usize {
        let cutoff = now - retention;
        let before = self.records.len();
        self.records.retain(|r| r.timestamp > cutoff);
        before - self.records.len()
    }

    /// Alerts raised within `window` before `now`
    pub fn count_since(&self, now: DateTime<Utc>, window: Duration) -> usize {
        let cutoff = now - window;
        self.records.iter().filter(|r| r.timestamp > cutoff).count()
    }

    pub fn records(&self) -> &[AlertRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
