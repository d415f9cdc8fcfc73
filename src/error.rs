use thiserror::Error;

use crate::plan::Intent;

/// Why a raw plan document could not be turned into a [`crate::plan::QueryPlan`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Malformed plan: {0}")]
    Malformed(String),
    #[error("Plan has no intent")]
    MissingIntent,
    #[error("No plan available: {0}")]
    NoPlanAvailable(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("Unknown field: {0}")]
    UnknownField(String),
    #[error("Intent {0} cannot be executed against the dataset")]
    NotExecutable(Intent),
}

#[derive(Error, Debug)]
pub enum ScriptlinkError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Dataset error: {0}")]
    Dataset(String),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error("No conversation context available")]
    NoContextAvailable,
    #[error("Lock poisoned: {0}")]
    Lock(String),
}

pub type Result<T> = std::result::Result<T, ScriptlinkError>;

// Helper conversions
impl From<config::ConfigError> for ScriptlinkError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
impl From<serde_json::Error> for ScriptlinkError {
    fn from(e: serde_json::Error) -> Self { Self::Dataset(e.to_string()) }
}
impl From<std::io::Error> for ScriptlinkError {
    fn from(e: std::io::Error) -> Self { Self::Dataset(e.to_string()) }
}
