//! Per-rack sensor history
//!
//! Each rack keeps a fixed-capacity ring of samples; appending to a full
//! ring evicts the oldest sample.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// One sensor reading; the owning rack is the key of its history
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub vibration: f64,
    pub power: f64,
}

/// Bounded sample ring of one rack
#[derive(Debug, Clone)]
pub struct RackHistory {
    samples: VecDeque<MetricSample>,
    capacity: usize,
}

impl RackHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample: MetricSample) {
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples oldest first
    pub fn samples(&self) -> impl Iterator<Item = &MetricSample> {
        self.samples.iter()
    }

    pub fn latest(&self) -> Option<&MetricSample> {
        self.samples.back()
    }

    pub fn temperatures(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.temperature).collect()
    }

    pub fn vibrations(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.vibration).collect()
    }

    pub fn powers(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.power).collect()
    }
}

/// Histories of every rack seen so far, keyed by rack id
#[derive(Debug, Clone)]
pub struct MetricHistoryStore {
    racks: BTreeMap<String, RackHistory>,
    capacity: usize,
}

impl MetricHistoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            racks: BTreeMap::new(),
            capacity,
        }
    }

    /// Append a sample, creating the rack's history on first sight
    ///
    /// The rack id is only copied when a new history is created. Returns the
    /// number of samples now held for the rack.
    pub fn record(&mut self, rack_id: &str, sample: MetricSample) -> usize {
        match self.racks.get_mut(rack_id) {
            Some(history) => {
                history.push(sample);
                history.len()
            }
            None => {
                let mut history = RackHistory::new(self.capacity);
                history.push(sample);
                self.racks.insert(rack_id.to_string(), history);
                1
            }
        }
    }

    pub fn get(&self, rack_id: &str) -> Option<&RackHistory> {
        self.racks.get(rack_id)
    }

    pub fn rack_ids(&self) -> impl Iterator<Item = &str> {
        self.racks.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.racks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.racks.is_empty()
    }
}
