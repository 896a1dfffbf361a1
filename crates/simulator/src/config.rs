//! Simulator configuration

use anyhow::{ensure, Result};
use fleet_lib::SimulationConfig;
use serde::Deserialize;

/// Simulator configuration
///
/// Read from an optional `fleet-sim.{toml,yaml,json}` file and `FLEET_*`
/// environment variables; nested keys use `__`, e.g.
/// `FLEET_SIMULATION__FLEET__SERVER_COUNT=40`.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulatorConfig {
    /// Name attached to structured log records
    #[serde(default = "default_node_name")]
    pub node_name: String,

    /// API server port for health/metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Interval between simulation steps in seconds
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,

    /// Seed for the random source; random when unset
    #[serde(default)]
    pub seed: Option<u64>,

    /// Start repair/replace maintenance automatically
    #[serde(default = "default_auto_maintenance")]
    pub auto_maintenance: bool,

    #[serde(default)]
    pub simulation: SimulationConfig,
}

fn default_node_name() -> String {
    std::env::var("NODE_NAME").unwrap_or_else(|_| "fleet-sim".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_tick_interval() -> u64 {
    5
}

fn default_auto_maintenance() -> bool {
    true
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            node_name: default_node_name(),
            api_port: default_api_port(),
            tick_interval_secs: default_tick_interval(),
            seed: None,
            auto_maintenance: default_auto_maintenance(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl SimulatorConfig {
    /// Load configuration from environment and config file
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("fleet-sim").required(false))
            .add_source(
                config::Environment::with_prefix("FLEET")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: SimulatorConfig = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.tick_interval_secs > 0, "tick_interval_secs must be positive");
        self.simulation.validate()?;
        Ok(())
    }

    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.tick_interval_secs)
    }
}
