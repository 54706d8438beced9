use std::fmt;

use chrono::NaiveDate;

#[derive(Debug)]
pub enum EngineError {
    /// Analysis start date after end date. Rejected before any fetch.
    InvalidRange { start: NaiveDate, end: NaiveDate },
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad role map, empty field list, inverted
    /// filter window, duplicate estate, etc.). Fatal at construction.
    ConfigValidation(String),
    /// Data gateway unreachable. Recovered per unit by the orchestrator.
    Connection(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRange { start, end } => {
                write!(f, "invalid range: start {start} is after end {end}")
            }
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::Connection(msg) => write!(f, "connection failure: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<crate::gateway::GatewayError> for EngineError {
    fn from(e: crate::gateway::GatewayError) -> Self {
        Self::Connection(e.to_string())
    }
}
