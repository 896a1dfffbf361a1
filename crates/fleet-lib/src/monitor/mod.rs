//! Rack sensor monitoring and failure prediction
//!
//! `RackMonitor` keeps, per rack id, a bounded sensor history, a rolling
//! alert log and the latest failure prediction. Racks are tracked lazily
//! from their first analysis; queries about unknown racks return empty
//! defaults instead of failing.

mod alerts;
mod history;
mod predictor;
mod thresholds;
mod trend;

pub use alerts::{AlertLog, AlertRecord};
pub use history::{MetricHistoryStore, MetricSample, RackHistory};
pub use predictor::{FailurePredictor, PredictionSignals, PredictionState};
pub use thresholds::{AlertSeverity, MetricThresholds, RackStatus, Thresholds};
pub use trend::TrendAnalyzer;

use crate::config::MonitorConfig;
use crate::error::Result;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// A reading with its own classification
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricReading {
    pub value: f64,
    pub status: RackStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RackMetrics {
    pub temperature: MetricReading,
    pub vibration: MetricReading,
    pub power: MetricReading,
}

/// Result of analyzing one sensor reading of a rack
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RackAnalysis {
    pub rack_id: String,
    /// Worst of the per-metric statuses
    pub status: RackStatus,
    pub prediction: PredictionState,
    pub metrics: RackMetrics,
    /// Alerts retained after pruning
    pub alert_count: usize,
}

/// Store of every tracked rack's history, alerts and prediction
#[derive(Debug, Clone)]
pub struct RackMonitor {
    thresholds: Thresholds,
    predictor: FailurePredictor,
    history: MetricHistoryStore,
    alerts: BTreeMap<String, AlertLog>,
    predictions: BTreeMap<String, PredictionState>,
    alert_retention: Duration,
    alert_window: Duration,
}

impl RackMonitor {
    pub fn new(config: &MonitorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            thresholds: config.thresholds.clone(),
            predictor: FailurePredictor::new(config),
            history: MetricHistoryStore::new(config.history_capacity),
            alerts: BTreeMap::new(),
            predictions: BTreeMap::new(),
            alert_retention: config.alert_retention(),
            alert_window: config.alert_window(),
        })
    }

    /// Record a sensor reading, update alerts and refresh the prediction
    pub fn analyze_rack(
        &mut self,
        rack_id: &str,
        temperature: f64,
        vibration: f64,
        power: f64,
        now: DateTime<Utc>,
    ) -> RackAnalysis {
        self.history.record(
            rack_id,
            MetricSample {
                timestamp: now,
                temperature,
                vibration,
                power,
            },
        );

        let metrics = RackMetrics {
            temperature: MetricReading {
                value: temperature,
                status: self.thresholds.temperature.classify(temperature),
            },
            vibration: MetricReading {
                value: vibration,
                status: self.thresholds.vibration.classify(vibration),
            },
            power: MetricReading {
                value: power,
                status: self.thresholds.power.classify(power),
            },
        };
        let status = RackStatus::combine([
            metrics.temperature.status,
            metrics.vibration.status,
            metrics.power.status,
        ]);

        let log = self.alerts.entry(rack_id.to_string()).or_default();
        if let Some(severity) = status.severity() {
            log.append(now, severity);
            debug!(rack_id = %rack_id, severity = %severity, temperature, vibration, power, "Rack alert");
        }
        log.prune(now, self.alert_retention);
        let alert_count = log.len();

        let prediction = self.predict_failure(rack_id, now);

        RackAnalysis {
            rack_id: rack_id.to_string(),
            status,
            prediction,
            metrics,
            alert_count,
        }
    }

    /// Re-evaluate the failure prediction of a rack
    ///
    /// With fewer samples than the prediction floor the existing prediction
    /// is returned unchanged; otherwise it is replaced wholesale.
    pub fn predict_failure(&mut self, rack_id: &str, now: DateTime<Utc>) -> PredictionState {
        let Some(history) = self.history.get(rack_id) else {
            return self.prediction(rack_id);
        };
        if !self.predictor.has_enough_samples(history.len()) {
            return self.prediction(rack_id);
        }

        let recent_alerts = self
            .alerts
            .get(rack_id)
            .map(|log| log.count_since(now, self.alert_window))
            .unwrap_or(0);
        let signals = self.predictor.signals(
            &history.temperatures(),
            &history.vibrations(),
            &history.powers(),
            recent_alerts,
        );
        let state = self.predictor.evaluate(&signals, now);

        let previous = self
            .predictions
            .insert(rack_id.to_string(), state.clone())
            .map(|p| p.status)
            .unwrap_or_default();
        if state.status != previous {
            match state.status {
                RackStatus::Critical => warn!(
                    rack_id = %rack_id,
                    confidence = state.confidence,
                    reasons = ?state.reasons,
                    "Rack failure predicted"
                ),
                _ => info!(
                    rack_id = %rack_id,
                    status = %state.status,
                    confidence = state.confidence,
                    "Rack prediction changed"
                ),
            }
        }
        state
    }

    /// Alerts of a rack oldest first; empty for unknown racks
    pub fn alert_history(&self, rack_id: &str) -> &[AlertRecord] {
        self.alerts
            .get(rack_id)
            .map(AlertLog::records)
            .unwrap_or(&[])
    }

    /// Latest prediction of a rack; the default normal state when unknown
    pub fn prediction(&self, rack_id: &str) -> PredictionState {
        self.predictions.get(rack_id).cloned().unwrap_or_default()
    }

    pub fn predictions(&self) -> impl Iterator<Item = (&str, &PredictionState)> {
        self.predictions.iter().map(|(id, p)| (id.as_str(), p))
    }

    pub fn history(&self, rack_id: &str) -> Option<&RackHistory> {
        self.history.get(rack_id)
    }

    /// Trend of each series of a rack: (temperature, vibration, power)
    pub fn trends(&self, rack_id: &str) -> (f64, f64, f64) {
        let Some(history) = self.history.get(rack_id) else {
            return (0.0, 0.0, 0.0);
        };
        let trend = self.predictor.trend_analyzer();
        (
            trend.trend(&history.temperatures()),
            trend.trend(&history.vibrations()),
            trend.trend(&history.powers()),
        )
    }

    pub fn tracked_racks(&self) -> usize {
        self.history.len()
    }
}
