//! scorestack-fanout: stage table to deployment graph.
//!
//! [`FanOut::run`] flattens the stage table into deployment targets and
//! walks each one through its [`BuildPhase`]s, producing one
//! [`DeploymentGroupPlan`] per target. Groups are independent; inside a
//! group, stacks carry explicit edges that [`DeploymentGraph::validate`]
//! checks for closure and acyclicity. [`synthesize`] renders the graph to
//! disk.
//!
//! # Components
//!
//! - **`phase`**: per-target phase state machine
//! - **`driver`**: builder sequencing, monitor stack assembly
//! - **`graph`**: groups, edges, topological order
//! - **`synth`**: templates, digests, manifest

pub mod driver;
pub mod error;
pub mod graph;
pub mod phase;
pub mod synth;

pub use driver::FanOut;
pub use error::{FanOutError, FanOutResult};
pub use graph::{DeploymentGraph, DeploymentGroupPlan};
pub use phase::BuildPhase;
pub use synth::{Manifest, synthesize};
