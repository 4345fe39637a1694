//! Error types for stage table loading and validation.

use thiserror::Error;

use crate::types::{EventType, FunctionKind};

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or validating a stage table.
///
/// Every variant is fatal: generation never starts from a table that
/// failed validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read stage table {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse stage table: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render stage table: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid account id {0:?} (expected 12 digits)")]
    InvalidAccountId(String),

    #[error("invalid region {0:?}")]
    InvalidRegion(String),

    #[error("stage table defines no stages")]
    NoStages,

    #[error("stage {0:?} has no deployment groups")]
    NoDeploymentGroups(String),

    #[error("invalid stage name {0:?} (expected ASCII letters and digits)")]
    InvalidStageName(String),

    #[error("duplicate deployment target {stage}/{region}")]
    DuplicateTarget { stage: String, region: String },

    #[error("stage {stage:?} tunes unknown queue {key:?}")]
    UnknownQueue { stage: String, key: String },

    #[error("stage {stage:?} tunes unknown function {name:?}")]
    UnknownFunction { stage: String, name: String },

    #[error("stage {stage:?} has no queue tuning for {queue}")]
    MissingQueueTuning { stage: String, queue: EventType },

    #[error("stage {stage:?} has no batch tuning for {function}")]
    MissingBatchTuning { stage: String, function: FunctionKind },

    #[error("stage {stage:?}: {field} out of range ({detail})")]
    OutOfRange {
        stage: String,
        field: &'static str,
        detail: String,
    },

    #[error("team contact field {0} must not be empty")]
    EmptyTeamField(&'static str),
}
