//! Declaration-time errors for stacks and templates.

use thiserror::Error;

/// Result type alias for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Conflicts detected while declaring resources into a stack.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("duplicate logical id {logical_id} in stack {stack}")]
    DuplicateLogicalId { stack: String, logical_id: String },

    #[error("duplicate output {output} in stack {stack}")]
    DuplicateOutput { stack: String, output: String },

    #[error("invalid logical id {0:?} (must be alphanumeric and non-empty)")]
    InvalidLogicalId(String),

    #[error("resource {resource} in stack {stack} depends on undeclared {missing}")]
    DanglingDependsOn {
        stack: String,
        resource: String,
        missing: String,
    },

    #[error("resource {resource} in stack {stack} references undeclared {missing}")]
    DanglingReference {
        stack: String,
        resource: String,
        missing: String,
    },

    #[error("physical name {name:?} declared twice for {type_name} in stack {stack}")]
    DuplicatePhysicalName {
        stack: String,
        type_name: &'static str,
        name: String,
    },

    #[error("stack {0} cannot depend on itself")]
    SelfDependency(String),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
