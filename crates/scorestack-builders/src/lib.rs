//! scorestack-builders: resource group builders.
//!
//! Each builder takes the [`BuildContext`] of one deployment target plus the
//! handles of the groups it consumes, declares one [`Stack`], records a
//! stack-level dependency on every group whose handle it used, and returns
//! a [`Built`] with its own handle and the alarms it declared.
//!
//! # Architecture
//!
//! ```text
//! network    VPC, subnets, endpoints, flow logs, ticketing topics
//!   ├── store      feature table, graph cluster
//!   ├── messaging  queue pairs, trigger/scores topics, event bus
//!   └── hosting    model, endpoint, autoscaling
//! compute    functions + triggers        (store, messaging)
//! integ      test runner role            (compute, messaging, store)
//! ```
//!
//! [`Stack`]: scorestack_template::Stack

pub mod compute;
pub mod context;
pub mod error;
pub mod hosting;
pub mod integ;
pub mod messaging;
pub mod network;
pub mod store;

pub use context::{BuildContext, Built, StackKind};
pub use error::{BuildError, BuildResult};
