pub mod config;
pub mod error;
pub mod naming;
pub mod types;

pub use config::{DeploymentGroup, PipelineMeta, StageConfig, StageTable};
pub use error::{ConfigError, ConfigResult};
pub use naming::Arn;
pub use types::*;
