//! Error type for the step-counting engine.
//!
//! Stages never fail; errors only arise at the edges: configuration that
//! cannot be honoured, a stage list that does not form a valid chain, and
//! metrics requested before the pipeline has produced anything to derive
//! them from.

use thiserror::Error;

use crate::types::StageRole;

#[derive(Debug, Error)]
pub enum PedometerError {
    /// A metric needs a detected peak and none exists yet.
    #[error("no data point has been produced yet")]
    NoData,

    /// Configuration value out of its accepted range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Stage roles supplied by a factory do not match either topology.
    #[error("stage roles {0:?} do not form a valid pipeline")]
    InvalidTopology(Vec<StageRole>),

    /// JSON configuration could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PedometerError>;
