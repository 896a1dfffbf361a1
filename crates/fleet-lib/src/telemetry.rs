//! Synthetic rack sensor readings
//!
//! Racks only report temperature themselves; vibration and power draw are
//! synthesized around nominal values so the rack monitor has three series
//! to analyze.

use crate::error::Result;
use crate::models::Server;
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Nominal vibration, in g
const VIBRATION_MEAN: f64 = 0.5;
const VIBRATION_STD_DEV: f64 = 0.2;
/// Nominal power draw, in watts
const POWER_MEAN: f64 = 1000.0;
const POWER_STD_DEV: f64 = 100.0;

/// One synthesized reading of a rack
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub temperature: f64,
    pub vibration: f64,
    pub power: f64,
}

#[derive(Debug, Clone)]
pub struct SensorSynthesizer {
    vibration: Normal<f64>,
    power: Normal<f64>,
}

impl SensorSynthesizer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            vibration: Normal::new(VIBRATION_MEAN, VIBRATION_STD_DEV)?,
            power: Normal::new(POWER_MEAN, POWER_STD_DEV)?,
        })
    }

    /// Reading for a rack: its own temperature plus synthetic vibration and power
    pub fn read<R: Rng + ?Sized>(&self, server: &Server, rng: &mut R) -> SensorReading {
        SensorReading {
            temperature: server.temperature,
            vibration: self.vibration.sample(rng).max(0.0),
            power: self.power.sample(rng).max(0.0),
        }
    }
}
