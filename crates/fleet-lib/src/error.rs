//! Error types for the fleet simulation core

use thiserror::Error;

/// Errors surfaced by the fleet core
///
/// Runtime degeneracies (empty target pools, unknown rack histories) are
/// reported as data, so only construction and addressing errors live here.
#[derive(Error, Debug)]
pub enum FleetError {
    #[error("Server not found: {0}")]
    UnknownServer(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid sampling distribution: {0}")]
    Distribution(#[from] rand_distr::NormalError),
}

pub type Result<T> = std::result::Result<T, FleetError>;
