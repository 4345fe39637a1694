//! Builder error types.

use scorestack_core::ConfigError;
use scorestack_template::TemplateError;
use thiserror::Error;

/// Errors raised while declaring a resource group. All are fatal.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("declaration error: {0}")]
    Template(#[from] TemplateError),
}

pub type BuildResult<T> = Result<T, BuildError>;
