//! Deployment graph: one group of stacks per target, with explicit
//! stack-level edges.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use petgraph::Direction;
use petgraph::algo::{kosaraju_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};

use scorestack_core::{DeploymentTarget, PipelineMeta};
use scorestack_observe::AlarmRef;
use scorestack_template::Stack;

use crate::error::{FanOutError, FanOutResult};
use crate::phase::BuildPhase;

/// Stacks of one deployment target, in build order.
#[derive(Debug, Clone)]
pub struct DeploymentGroupPlan {
    pub target: DeploymentTarget,
    pub stacks: Vec<Stack>,
    /// Every alarm declared for the target, ticketed or not.
    pub alarms: Vec<AlarmRef>,
    pub phases: Vec<BuildPhase>,
}

impl DeploymentGroupPlan {
    /// `{stage}-{region}`.
    pub fn name(&self) -> String {
        self.target.suffix()
    }

    pub fn stack(&self, id: &str) -> Option<&Stack> {
        self.stacks.iter().find(|s| s.id == id)
    }

    pub fn stack_ids(&self) -> Vec<&str> {
        self.stacks.iter().map(|s| s.id.as_str()).collect()
    }

    /// `(from, to)`: `from` deploys after `to`.
    pub fn edges(&self) -> Vec<(&str, &str)> {
        self.stacks
            .iter()
            .flat_map(|s| s.dependencies().iter().map(move |d| (s.id.as_str(), d.as_str())))
            .collect()
    }

    /// Every stack renders, every edge stays inside the group, and the
    /// edges are acyclic.
    pub fn validate(&self) -> FanOutResult<()> {
        let mut seen = BTreeSet::new();
        for stack in &self.stacks {
            if !seen.insert(stack.id.as_str()) {
                return Err(FanOutError::DuplicateStack(stack.id.clone()));
            }
            stack.validate()?;
        }
        for (from, to) in self.edges() {
            if !seen.contains(to) {
                return Err(FanOutError::MissingDependency {
                    group: self.name(),
                    stack: from.to_string(),
                    missing: to.to_string(),
                });
            }
        }
        self.deployment_order().map(|_| ())
    }

    /// Stack graph with an edge from each dependency to its dependent.
    /// Node indices follow build order.
    fn dependency_graph(&self) -> DiGraph<&str, ()> {
        let mut graph = DiGraph::with_capacity(self.stacks.len(), self.stacks.len() * 2);
        let index: BTreeMap<&str, NodeIndex> = self
            .stacks
            .iter()
            .map(|s| (s.id.as_str(), graph.add_node(s.id.as_str())))
            .collect();
        for (from, to) in self.edges() {
            if let (Some(&dependent), Some(&dependency)) = (index.get(from), index.get(to)) {
                graph.add_edge(dependency, dependent, ());
            }
        }
        graph
    }

    /// Topological order. Ties resolve in build order, so the result is
    /// stable across runs.
    pub fn deployment_order(&self) -> FanOutResult<Vec<&Stack>> {
        let graph = self.dependency_graph();
        if let Err(cycle) = toposort(&graph, None) {
            let mut stacks: Vec<String> = kosaraju_scc(&graph)
                .into_iter()
                .find(|component| component.contains(&cycle.node_id()))
                .unwrap_or_else(|| vec![cycle.node_id()])
                .into_iter()
                .map(|idx| graph[idx].to_string())
                .collect();
            stacks.sort_by_key(|id| self.stacks.iter().position(|s| s.id == *id));
            return Err(FanOutError::Cycle {
                group: self.name(),
                stacks,
            });
        }

        let mut pending: Vec<usize> = graph
            .node_indices()
            .map(|idx| graph.neighbors_directed(idx, Direction::Incoming).count())
            .collect();
        let mut ready: VecDeque<NodeIndex> = graph.node_indices().filter(|idx| pending[idx.index()] == 0).collect();
        let mut order = Vec::with_capacity(self.stacks.len());
        while let Some(idx) = ready.pop_front() {
            order.push(&self.stacks[idx.index()]);
            let mut dependents: Vec<NodeIndex> = graph.neighbors_directed(idx, Direction::Outgoing).collect();
            dependents.sort_unstable();
            for dependent in dependents {
                pending[dependent.index()] -= 1;
                if pending[dependent.index()] == 0 {
                    ready.push_back(dependent);
                }
            }
        }
        Ok(order)
    }
}

/// Everything one run of the generator produces.
#[derive(Debug, Clone)]
pub struct DeploymentGraph {
    pub pipeline: PipelineMeta,
    pub groups: Vec<DeploymentGroupPlan>,
}

impl DeploymentGraph {
    pub fn group(&self, name: &str) -> Option<&DeploymentGroupPlan> {
        self.groups.iter().find(|g| g.name() == name)
    }

    pub fn stack_count(&self) -> usize {
        self.groups.iter().map(|g| g.stacks.len()).sum()
    }

    /// Validate every group; stack ids must also be unique across groups.
    pub fn validate(&self) -> FanOutResult<()> {
        let mut seen = BTreeSet::new();
        for group in &self.groups {
            for id in group.stack_ids() {
                if !seen.insert(id) {
                    return Err(FanOutError::DuplicateStack(id.to_string()));
                }
            }
            group.validate()?;
        }
        Ok(())
    }
}
