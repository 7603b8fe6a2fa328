//! Error types for chart and configuration loading

use thiserror::Error;

/// Errors raised while resolving chart vocabulary or reading a chart value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChartError {
    #[error("unknown planet: {0}")]
    UnknownPlanet(String),

    #[error("unknown sign: {0}")]
    UnknownSign(String),

    #[error("unknown angle: {0}")]
    UnknownAngle(String),

    #[error("unknown aspect kind: {0}")]
    UnknownAspect(String),

    #[error("unknown dignity: {0}")]
    UnknownDignity(String),

    #[error("invalid chart value: {0}")]
    InvalidChart(String),
}

/// Errors raised while loading a dignity configuration document.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("malformed configuration document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Name(#[from] ChartError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
