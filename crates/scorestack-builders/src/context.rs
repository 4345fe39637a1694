//! Per-target build context shared by every builder.

use std::fmt;

use scorestack_core::{Arn, ArtifactConfig, DeploymentTarget, StageTable, TeamContact};
use scorestack_observe::alarm::{self, AlarmDef, AlarmRef};
use scorestack_observe::Ticketing;
use scorestack_template::{Environment, Stack};
use serde::Serialize;

use crate::error::BuildResult;

/// Resource groups declared for one deployment target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum StackKind {
    Network,
    Store,
    Messaging,
    Hosting,
    Compute,
    IntegTests,
    Monitor,
}

impl StackKind {
    pub fn name(self) -> &'static str {
        match self {
            StackKind::Network => "Network",
            StackKind::Store => "Store",
            StackKind::Messaging => "Messaging",
            StackKind::Hosting => "Hosting",
            StackKind::Compute => "Compute",
            StackKind::IntegTests => "IntegTests",
            StackKind::Monitor => "Monitor",
        }
    }

    /// `{Kind}-{stage}-{region}`.
    pub fn stack_id(self, suffix: &str) -> String {
        format!("{}-{suffix}", self.name())
    }

    fn description(self) -> &'static str {
        match self {
            StackKind::Network => "network boundary, endpoints, flow logs and ticketing topics",
            StackKind::Store => "feature table and graph cluster",
            StackKind::Messaging => "event queues, topics and the click-through event bus",
            StackKind::Hosting => "scoring model endpoint",
            StackKind::Compute => "stream functions and their queue triggers",
            StackKind::IntegTests => "integration test runner resources",
            StackKind::Monitor => "custom metric alarms and dashboards",
        }
    }
}

impl fmt::Display for StackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Output of one builder: the declared stack, the handle downstream
/// builders consume, and the alarms declared along the way.
#[derive(Debug, Clone)]
pub struct Built<H> {
    pub stack: Stack,
    pub handle: H,
    pub alarms: Vec<AlarmRef>,
}

/// Everything a builder needs to know about its target.
#[derive(Debug, Clone)]
pub struct BuildContext<'a> {
    pub application: &'a str,
    pub target: &'a DeploymentTarget,
    pub team: &'a TeamContact,
    pub artifacts: &'a ArtifactConfig,
    ticketing: Ticketing,
}

impl<'a> BuildContext<'a> {
    pub fn new(table: &'a StageTable, target: &'a DeploymentTarget) -> Self {
        Self {
            application: &table.application,
            target,
            team: &table.team,
            artifacts: &table.artifacts,
            ticketing: Ticketing::for_target(target, &table.team),
        }
    }

    pub fn suffix(&self) -> String {
        self.target.suffix()
    }

    /// Physical name `{base}-{stage}-{region}`.
    pub fn name(&self, base: &str) -> String {
        self.target.name(base)
    }

    pub fn arn(&self) -> Arn<'a> {
        Arn::new(&self.target.account_id, &self.target.region)
    }

    pub fn env(&self) -> Environment {
        Environment::new(&self.target.account_id, &self.target.region)
    }

    pub fn stack_id(&self, kind: StackKind) -> String {
        kind.stack_id(&self.suffix())
    }

    /// Empty stack of `kind`, tagged with the application and stage.
    pub fn stack(&self, kind: StackKind) -> Stack {
        let mut stack = Stack::new(
            self.stack_id(kind),
            self.env(),
            format!("{} {} ({})", self.application, kind.description(), self.suffix()),
        );
        stack.tag("Application", self.application);
        stack.tag("Stage", &self.target.stage_name);
        stack
    }

    pub fn ticketing(&self) -> &Ticketing {
        &self.ticketing
    }

    pub fn setup_alarms(&self) -> bool {
        self.target.setup_alarms
    }

    /// Declare `defs` into `stack`, or nothing when the stage does not set
    /// up alarms.
    pub fn declare_alarms(
        &self,
        stack: &mut Stack,
        defs: impl IntoIterator<Item = AlarmDef>,
    ) -> BuildResult<Vec<AlarmRef>> {
        if !self.setup_alarms() {
            return Ok(Vec::new());
        }
        Ok(alarm::declare_all(stack, defs, &self.ticketing)?)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Built-in table and its flattened targets:
    /// Devo/eu-west-1, Devo/us-east-1, Prod/eu-west-1.
    pub(crate) fn fixture() -> (StageTable, Vec<DeploymentTarget>) {
        let table = StageTable::builtin().unwrap();
        let targets = table.targets().unwrap();
        (table, targets)
    }

    #[test]
    fn stacks_are_named_and_tagged() {
        let (table, targets) = fixture();
        let ctx = BuildContext::new(&table, &targets[2]);
        let stack = ctx.stack(StackKind::Messaging);
        assert_eq!(stack.id, "Messaging-Prod-eu-west-1");
        assert_eq!(stack.tags()["Stage"], "Prod");
        assert_eq!(ctx.name("ClickThroughEventsBus"), "ClickThroughEventsBus-Prod-eu-west-1");
    }

    #[test]
    fn alarms_skipped_without_setup() {
        let (table, targets) = fixture();
        let ctx = BuildContext::new(&table, &targets[0]);
        let mut stack = ctx.stack(StackKind::Compute);
        let defs = scorestack_observe::sets::function_alarms("IngestEventsLambda", "IngestEventsLambda-Devo-eu-west-1");
        assert!(ctx.declare_alarms(&mut stack, defs).unwrap().is_empty());
        assert!(stack.resources().is_empty());
    }
}
