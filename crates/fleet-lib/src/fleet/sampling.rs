//! Probability distributions driving the fleet simulation

use crate::config::FleetConfig;
use crate::error::Result;
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Normal distributions built once from the fleet configuration
#[derive(Debug, Clone)]
pub struct LoadSamplers {
    base_load: Normal<f64>,
    temperature: Normal<f64>,
    load_variation: Normal<f64>,
    temperature_noise: Normal<f64>,
}

impl LoadSamplers {
    pub fn new(config: &FleetConfig) -> Result<Self> {
        Ok(Self {
            base_load: Normal::new(config.base_load_mean, config.base_load_std_dev)?,
            temperature: Normal::new(config.temperature_mean, config.temperature_std_dev)?,
            load_variation: Normal::new(0.0, config.load_variation_std_dev)?,
            temperature_noise: Normal::new(0.0, config.temperature_noise_std_dev)?,
        })
    }

    /// Cpu load of a booting or waking rack
    pub fn base_load<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.base_load.sample(rng)
    }

    /// Temperature of a booting or freshly serviced rack
    pub fn temperature<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.temperature.sample(rng)
    }

    /// Zero-mean per-tick load jitter
    pub fn load_variation<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.load_variation.sample(rng)
    }

    /// Zero-mean per-tick temperature jitter
    pub fn temperature_noise<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.temperature_noise.sample(rng)
    }
}
