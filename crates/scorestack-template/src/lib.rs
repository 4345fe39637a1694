//! scorestack-template: provider resource model.
//!
//! Builders declare typed resources into [`Stack`]s; a stack renders to a
//! provider template (CloudFormation JSON dialect). Values crossing stack
//! boundaries travel either as computed plain strings or as exported
//! outputs consumed through [`Value::Import`].

pub mod error;
pub mod metric;
pub mod policy;
pub mod resource;
pub mod stack;
pub mod value;

pub use error::{TemplateError, TemplateResult};
pub use metric::{MathExpression, Metric, MetricSource, Statistic, Unit};
pub use policy::{PolicyDocument, Principal, Statement};
pub use resource::{Resource, ResourceKind};
pub use stack::{Environment, Stack, logical_id};
pub use value::Value;
