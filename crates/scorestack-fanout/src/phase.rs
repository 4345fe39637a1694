//! Per-target build phases.

use std::fmt;

use serde::Serialize;
use tracing::debug;

/// Phase of one target's build. Groups are built in this order; the
/// integration test phase is skipped when the target does not request it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum BuildPhase {
    Network,
    StoreAndMessaging,
    Compute,
    IntegrationTests,
    Observability,
    Complete,
}

impl BuildPhase {
    /// Successor of `self`. `Complete` is terminal.
    pub fn next(self, run_integration_tests: bool) -> BuildPhase {
        match self {
            BuildPhase::Network => BuildPhase::StoreAndMessaging,
            BuildPhase::StoreAndMessaging => BuildPhase::Compute,
            BuildPhase::Compute if run_integration_tests => BuildPhase::IntegrationTests,
            BuildPhase::Compute | BuildPhase::IntegrationTests => BuildPhase::Observability,
            BuildPhase::Observability | BuildPhase::Complete => BuildPhase::Complete,
        }
    }
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildPhase::Network => "network",
            BuildPhase::StoreAndMessaging => "store-and-messaging",
            BuildPhase::Compute => "compute",
            BuildPhase::IntegrationTests => "integration-tests",
            BuildPhase::Observability => "observability",
            BuildPhase::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// Walks one target through its phases and records every phase entered.
#[derive(Debug, Clone)]
pub(crate) struct PhaseWalk {
    target: String,
    run_integration_tests: bool,
    visited: Vec<BuildPhase>,
}

impl PhaseWalk {
    pub(crate) fn start(target: impl Into<String>, run_integration_tests: bool) -> Self {
        Self {
            target: target.into(),
            run_integration_tests,
            visited: vec![BuildPhase::Network],
        }
    }

    pub(crate) fn current(&self) -> BuildPhase {
        self.visited.last().copied().unwrap_or(BuildPhase::Network)
    }

    /// Move to the next phase and return it.
    pub(crate) fn advance(&mut self) -> BuildPhase {
        let from = self.current();
        let to = from.next(self.run_integration_tests);
        if to != from {
            self.visited.push(to);
            debug!(target = %self.target, from = %from, to = %to, "phase transition");
        }
        to
    }

    pub(crate) fn into_visited(self) -> Vec<BuildPhase> {
        self.visited
    }
}
