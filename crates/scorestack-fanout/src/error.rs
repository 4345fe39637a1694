//! Fan-out error types.

use std::path::PathBuf;

use scorestack_builders::BuildError;
use scorestack_core::ConfigError;
use scorestack_template::TemplateError;
use thiserror::Error;

pub type FanOutResult<T> = Result<T, FanOutError>;

/// A failure anywhere in the run aborts the whole run.
#[derive(Debug, Error)]
pub enum FanOutError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("building {target}: {source}")]
    Build {
        target: String,
        #[source]
        source: BuildError,
    },

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("duplicate stack {0}")]
    DuplicateStack(String),

    #[error("group {group}: stack {stack} depends on {missing}, which is not in the group")]
    MissingDependency {
        group: String,
        stack: String,
        missing: String,
    },

    #[error("group {group}: dependency cycle among {stacks:?}")]
    Cycle { group: String, stacks: Vec<String> },

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to render manifest: {0}")]
    Json(#[from] serde_json::Error),
}
