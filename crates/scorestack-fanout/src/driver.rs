//! Fan-out driver: one deployment group per target of the stage table.

use scorestack_builders::{
    BuildContext, BuildError, BuildResult, StackKind, compute, hosting, integ, messaging, network, store,
};
use scorestack_core::{DeploymentTarget, StageTable};
use scorestack_observe::{AlarmRef, monitor};
use scorestack_template::Stack;
use tracing::info;

use crate::error::{FanOutError, FanOutResult};
use crate::graph::{DeploymentGraph, DeploymentGroupPlan};
use crate::phase::{BuildPhase, PhaseWalk};

pub struct FanOut;

impl FanOut {
    /// Build every target of `table`, in table order. The first failure
    /// aborts the run.
    pub fn run(table: &StageTable) -> FanOutResult<DeploymentGraph> {
        let targets = table.targets()?;
        info!(application = %table.application, targets = targets.len(), "fanning out stage table");

        let groups = targets
            .iter()
            .map(|target| plan_target(table, target))
            .collect::<FanOutResult<Vec<_>>>()?;

        let graph = DeploymentGraph {
            pipeline: table.pipeline.clone(),
            groups,
        };
        graph.validate()?;
        info!(groups = graph.groups.len(), stacks = graph.stack_count(), "deployment graph ready");
        Ok(graph)
    }
}

fn plan_target(table: &StageTable, target: &DeploymentTarget) -> FanOutResult<DeploymentGroupPlan> {
    let suffix = target.suffix();
    let ctx = BuildContext::new(table, target);
    let fail = failed(&suffix);

    let mut walk = PhaseWalk::start(&suffix, target.approval.run_integration_tests);
    let mut stacks = Vec::new();
    let mut alarms = Vec::new();

    let network = network::build(&ctx).map_err(&fail)?;
    walk.advance();

    let store = store::build(&ctx, &network.handle).map_err(&fail)?;
    let messaging = messaging::build(&ctx, &network.handle, &hosting::model_role_name(&ctx)).map_err(&fail)?;
    let hosting = if target.deploy_model_hosting {
        Some(hosting::build(&ctx, &network.handle).map_err(&fail)?)
    } else {
        None
    };
    walk.advance();

    let compute = compute::build(&ctx, &network.handle, &store.handle, &messaging.handle).map_err(&fail)?;
    let integ = if walk.advance() == BuildPhase::IntegrationTests {
        let built = integ::build(&ctx, &compute.handle, &messaging.handle, &store.handle).map_err(&fail)?;
        walk.advance();
        Some(built)
    } else {
        None
    };

    let mut upstream = vec![
        compute.handle.stack_id.clone(),
        messaging.handle.stack_id.clone(),
        store.handle.stack_id.clone(),
    ];
    if let Some(hosting) = &hosting {
        upstream.push(hosting.handle.stack_id.clone());
    }

    alarms.extend(messaging.alarms);
    alarms.extend(compute.alarms);
    stacks.push(network.stack);
    stacks.push(store.stack);
    stacks.push(messaging.stack);
    if let Some(hosting) = hosting {
        alarms.extend(hosting.alarms);
        stacks.push(hosting.stack);
    }
    stacks.push(compute.stack);
    if let Some(integ) = integ {
        stacks.push(integ.stack);
    }

    let (monitor_stack, alarms) = build_monitor(&ctx, &upstream, &alarms).map_err(&fail)?;
    stacks.push(monitor_stack);
    walk.advance();

    info!(
        target = %suffix,
        stacks = stacks.len(),
        alarms = alarms.len(),
        ticketed = alarms.iter().filter(|a| a.is_ticketed()).count(),
        phase = %walk.current(),
        "deployment group planned"
    );

    Ok(DeploymentGroupPlan {
        target: target.clone(),
        stacks,
        alarms,
        phases: walk.into_visited(),
    })
}

/// Tags a builder failure with the target it happened in.
fn failed(target: &str) -> impl Fn(BuildError) -> FanOutError + '_ {
    move |source| FanOutError::Build {
        target: target.to_string(),
        source,
    }
}

/// Monitor stack: depends on `upstream` and collects every alarm declared there.
fn build_monitor(
    ctx: &BuildContext<'_>,
    upstream: &[String],
    alarms: &[AlarmRef],
) -> BuildResult<(Stack, Vec<AlarmRef>)> {
    let mut stack = ctx.stack(StackKind::Monitor);
    for id in upstream {
        stack.add_dependency(id.as_str())?;
    }
    let alarms = monitor::declare(&mut stack, alarms, ctx.ticketing(), ctx.setup_alarms())?;
    Ok((stack, alarms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_fans_out() {
        let table = StageTable::builtin().unwrap();
        let graph = FanOut::run(&table).unwrap();
        let names: Vec<String> = graph.groups.iter().map(|g| g.name()).collect();
        assert_eq!(names, vec!["Devo-eu-west-1", "Devo-us-east-1", "Prod-eu-west-1"]);

        let devo = graph.group("Devo-eu-west-1").unwrap();
        assert!(devo.phases.contains(&BuildPhase::IntegrationTests));
        assert!(devo.stack("IntegTests-Devo-eu-west-1").is_some());

        let prod = graph.group("Prod-eu-west-1").unwrap();
        assert!(!prod.phases.contains(&BuildPhase::IntegrationTests));
        assert_eq!(prod.phases.last(), Some(&BuildPhase::Complete));
        let order: Vec<&str> = prod.deployment_order().unwrap().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(order[0], "Network-Prod-eu-west-1");
        assert_eq!(order.last(), Some(&"Monitor-Prod-eu-west-1"));
    }

    #[test]
    fn monitor_depends_on_hosting_only_when_deployed() {
        let mut table = StageTable::builtin().unwrap();
        table.stages[1].deployment_groups[0].deploy_model_hosting = false;
        let graph = FanOut::run(&table).unwrap();
        let prod = graph.group("Prod-eu-west-1").unwrap();
        assert!(prod.stack("Hosting-Prod-eu-west-1").is_none());
        let monitor = prod.stack("Monitor-Prod-eu-west-1").unwrap();
        assert!(!monitor.dependencies().contains("Hosting-Prod-eu-west-1"));

        let devo = graph.group("Devo-eu-west-1").unwrap();
        let monitor = devo.stack("Monitor-Devo-eu-west-1").unwrap();
        assert!(monitor.dependencies().contains("Hosting-Devo-eu-west-1"));
    }

    #[test]
    fn monitor_failure_names_target() {
        let table = StageTable::builtin().unwrap();
        let target = table.targets().unwrap().pop().unwrap();
        let ctx = BuildContext::new(&table, &target);
        let own_id = ctx.stack_id(StackKind::Monitor);

        let err = build_monitor(&ctx, &[own_id], &[])
            .map_err(failed(&target.suffix()))
            .unwrap_err();
        match err {
            FanOutError::Build { target, source } => {
                assert_eq!(target, "Prod-eu-west-1");
                assert!(matches!(source, BuildError::Template(_)));
            }
            other => panic!("expected build error, got {other:?}"),
        }
    }
}
