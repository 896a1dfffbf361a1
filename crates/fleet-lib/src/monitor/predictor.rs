//! Rule-based rack failure prediction
//!
//! Four signals each contribute a fixed weight to a confidence score:
//! rising temperature, rising vibration, rising power and a high recent
//! alert count. The score maps to a status and a failure horizon.

use super::thresholds::RackStatus;
use super::trend::TrendAnalyzer;
use crate::config::MonitorConfig;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Latest failure prediction of a rack; replaced wholesale on every evaluation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionState {
    pub status: RackStatus,
    pub confidence: f64,
    pub predicted_failure_time: Option<DateTime<Utc>>,
    pub reasons: Vec<String>,
}

/// Inputs of one prediction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionSignals {
    pub temperature_trend: f64,
    pub vibration_trend: f64,
    pub power_trend: f64,
    pub recent_alerts: usize,
}

#[derive(Debug, Clone)]
pub struct FailurePredictor {
    trend: TrendAnalyzer,
    min_samples: usize,
    trend_threshold: f64,
    alert_frequency: usize,
    temperature_weight: f64,
    vibration_weight: f64,
    power_weight: f64,
    alert_weight: f64,
    critical_confidence: f64,
    warning_confidence: f64,
    critical_horizon: Duration,
    warning_horizon: Duration,
}

impl FailurePredictor {
    pub fn new(config: &MonitorConfig) -> Self {
        Self {
            trend: TrendAnalyzer::new(config.min_trend_points),
            min_samples: config.min_prediction_samples,
            trend_threshold: config.trend_threshold,
            alert_frequency: config.alert_frequency,
            temperature_weight: config.temperature_weight,
            vibration_weight: config.vibration_weight,
            power_weight: config.power_weight,
            alert_weight: config.alert_weight,
            critical_confidence: config.critical_confidence,
            warning_confidence: config.warning_confidence,
            critical_horizon: config.critical_horizon(),
            warning_horizon: config.warning_horizon(),
        }
    }

    pub fn trend_analyzer(&self) -> &TrendAnalyzer {
        &self.trend
    }

    /// Whether a history of `samples` points is long enough to predict from
    pub fn has_enough_samples(&self, samples: usize) -> bool {
        samples >= self.min_samples
    }

    /// Compute the signals from raw series
    pub fn signals(
        &self,
        temperatures: &[f64],
        vibrations: &[f64],
        powers: &[f64],
        recent_alerts: usize,
    ) -> PredictionSignals {
        PredictionSignals {
            temperature_trend: self.trend.trend(temperatures),
            vibration_trend: self.trend.trend(vibrations),
            power_trend: self.trend.trend(powers),
            recent_alerts,
        }
    }

    /// Score the signals into a fresh prediction
    pub fn evaluate(&self, signals: &PredictionSignals, now: DateTime<Utc>) -> PredictionState {
        let mut confidence = 0.0;
        let mut reasons = Vec::new();

        if signals.temperature_trend > self.trend_threshold {
            confidence += self.temperature_weight;
            reasons.push("Rising temperature trend".to_string());
        }
        if signals.vibration_trend > self.trend_threshold {
            confidence += self.vibration_weight;
            reasons.push("Increasing vibration levels".to_string());
        }
        if signals.power_trend > self.trend_threshold {
            confidence += self.power_weight;
            reasons.push("Growing power consumption".to_string());
        }
        if signals.recent_alerts >= self.alert_frequency {
            confidence += self.alert_weight;
            reasons.push(format!(
                "High alert frequency ({} in last hour)",
                signals.recent_alerts
            ));
        }

        let (status, predicted_failure_time) = self.classify(confidence, now);
        PredictionState {
            status,
            confidence,
            predicted_failure_time,
            reasons,
        }
    }

    /// Map a confidence score to a status and failure horizon
    pub fn classify(
        &self,
        confidence: f64,
        now: DateTime<Utc>,
    ) -> (RackStatus, Option<DateTime<Utc>>) {
        if confidence >= self.critical_confidence {
            (RackStatus::Critical, Some(now + self.critical_horizon))
        } else if confidence >= self.warning_confidence {
            (RackStatus::Warning, Some(now + self.warning_horizon))
        } else {
            (RackStatus::Normal, None)
        }
    }
}

impl Default for FailurePredictor {
    fn default() -> Self {
        Self::new(&MonitorConfig::default())
    }
}
