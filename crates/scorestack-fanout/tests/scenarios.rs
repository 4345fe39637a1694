use std::fs;

use scorestack_core::{EventType, FunctionKind, StageTable};
use scorestack_fanout::synth::{MANIFEST_FILE, template_file};
use scorestack_fanout::{DeploymentGraph, FanOut, FanOutError, synthesize};
use scorestack_observe::{CUSTOM_METRICS, Severity};
use scorestack_template::ResourceKind;
use sha2::{Digest, Sha256};

fn builtin() -> StageTable {
    StageTable::builtin().unwrap()
}

fn run(table: &StageTable) -> DeploymentGraph {
    FanOut::run(table).unwrap()
}

// ── Alarms ────────────────────────────────────────────────────────

#[test]
fn alarm_count_follows_setup_alarms() {
    let graph = run(&builtin());

    let prod = graph.group("Prod-eu-west-1").unwrap();
    // 3 per queue, 1 per function, 6 on the endpoint, plus the catalog.
    let expected = 9 + 3 + 6 + CUSTOM_METRICS.len();
    assert_eq!(prod.alarms.len(), expected);
    let declared: usize = prod
        .stacks
        .iter()
        .map(|s| s.resources_of_type("AWS::CloudWatch::Alarm").len())
        .sum();
    assert_eq!(declared, expected);

    for name in ["Devo-eu-west-1", "Devo-us-east-1"] {
        let devo = graph.group(name).unwrap();
        assert!(devo.alarms.is_empty(), "{name}");
        for stack in &devo.stacks {
            assert!(stack.resources_of_type("AWS::CloudWatch::Alarm").is_empty(), "{}", stack.id);
        }
    }
}

#[test]
fn two_entry_table_yields_independent_groups() {
    let mut table = builtin();
    table.stages[0].deployment_groups.remove(0);
    // Devo declares alarms too, so the absence of tickets is not vacuous.
    table.stages[0].setup_alarms = true;
    let graph = run(&table);

    assert_eq!(graph.groups.len(), 2);
    let devo = graph.group("Devo-us-east-1").unwrap();
    let prod = graph.group("Prod-eu-west-1").unwrap();

    assert!(prod.alarms.iter().all(|a| a.is_ticketed()));
    assert!(prod.alarms.iter().any(|a| a.severity == Severity::Sev2_5));
    assert!(prod.alarms.iter().any(|a| a.severity == Severity::Sev3));
    assert!(!devo.alarms.is_empty());
    assert!(devo.alarms.iter().all(|a| !a.is_ticketed()));
    assert!(devo.alarms.iter().all(|a| a.severity == Severity::None));

    let actions = |g: &scorestack_fanout::DeploymentGroupPlan| -> Vec<usize> {
        g.stacks
            .iter()
            .flat_map(|s| {
                s.collect(|k| match k {
                    ResourceKind::Alarm(a) => Some(a),
                    _ => None,
                })
            })
            .map(|a| a.alarm_actions.len())
            .collect()
    };
    assert_eq!(actions(devo).len(), devo.alarms.len());
    assert!(actions(devo).iter().all(|&n| n == 0));
    assert!(actions(prod).iter().all(|&n| n == 1));

    // No edge crosses groups.
    for (from, to) in prod.edges() {
        assert!(from.ends_with("Prod-eu-west-1") && to.ends_with("Prod-eu-west-1"), "{from} -> {to}");
    }
    for (from, to) in devo.edges() {
        assert!(from.ends_with("Devo-us-east-1") && to.ends_with("Devo-us-east-1"), "{from} -> {to}");
    }

    // Ticketing topics exist only where ticketing is on.
    let topics = |g: &scorestack_fanout::DeploymentGroupPlan| {
        g.stacks
            .iter()
            .flat_map(|s| {
                s.collect(|k| match k {
                    ResourceKind::Topic(t) => Some(t),
                    _ => None,
                })
            })
            .filter(|t| t.topic_name.contains("-Tickets-"))
            .count()
    };
    assert_eq!(topics(prod), 2);
    assert_eq!(topics(devo), 0);
}

// ── Queues and triggers ───────────────────────────────────────────

#[test]
fn queue_policies_match_table() {
    let graph = run(&builtin());
    for group in &graph.groups {
        let messaging = group.stack(&format!("Messaging-{}", group.name())).unwrap();
        let queues = messaging.collect(|k| match k {
            ResourceKind::Queue(q) => Some(q),
            _ => None,
        });
        assert_eq!(queues.len(), 6);
        for event in EventType::ALL {
            let policy = event.policy();
            let primary = queues
                .iter()
                .find(|q| q.queue_name == group.target.name(event.queue_base_name()))
                .unwrap();
            assert_eq!(primary.visibility_timeout, policy.visibility_timeout.as_secs());
            assert_eq!(primary.message_retention_period, policy.retention_period.as_secs());
            assert_eq!(
                primary.redrive_policy.as_ref().unwrap().max_receive_count,
                policy.max_receive_count
            );
            assert_eq!(
                primary.delay_seconds,
                group.target.queue_tuning(event).unwrap().delivery_delay.as_secs()
            );
        }
    }
}

#[test]
fn batch_tuning_matches_stage() {
    let graph = run(&builtin());
    for group in &graph.groups {
        let compute = group.stack(&format!("Compute-{}", group.name())).unwrap();
        let mappings = compute.collect(|k| match k {
            ResourceKind::EventSourceMapping(m) => Some(m),
            _ => None,
        });
        for function in FunctionKind::ALL {
            let tuning = group.target.batch_tuning(function).unwrap();
            let mapping = mappings
                .iter()
                .find(|m| m.function_name == group.target.name(function.base_name()))
                .unwrap();
            assert_eq!(mapping.batch_size, tuning.batch_size);
            assert_eq!(mapping.maximum_batching_window_in_seconds, tuning.max_batching_window.as_secs());
        }
    }
}

// ── Graph shape ───────────────────────────────────────────────────

#[test]
fn integration_tests_only_when_requested() {
    let graph = run(&builtin());
    for group in &graph.groups {
        let integ_id = format!("IntegTests-{}", group.name());
        let present = group.stack(&integ_id).is_some();
        assert_eq!(present, group.target.approval.run_integration_tests, "{integ_id}");
        if !present {
            assert!(group.edges().iter().all(|(_, to)| *to != integ_id));
        }
    }
}

#[test]
fn edges_follow_consumed_handles() {
    let graph = run(&builtin());
    let devo = graph.group("Devo-eu-west-1").unwrap();
    let deps = |kind: &str| -> Vec<String> {
        devo.stack(&format!("{kind}-Devo-eu-west-1"))
            .unwrap()
            .dependencies()
            .iter()
            .map(|d| d.trim_end_matches("-Devo-eu-west-1").to_string())
            .collect()
    };
    assert!(deps("Network").is_empty());
    assert_eq!(deps("Store"), vec!["Network"]);
    assert_eq!(deps("Messaging"), vec!["Network"]);
    assert_eq!(deps("Hosting"), vec!["Network"]);
    assert_eq!(deps("Compute"), vec!["Messaging", "Store"]);
    assert_eq!(deps("IntegTests"), vec!["Compute", "Messaging", "Store"]);
    assert_eq!(deps("Monitor"), vec!["Compute", "Hosting", "Messaging", "Store"]);
}

#[test]
fn regeneration_is_identical() {
    let table = builtin();
    let first = run(&table);
    let second = run(&table);
    assert_eq!(first.stack_count(), second.stack_count());
    for (a, b) in first.groups.iter().zip(&second.groups) {
        for (x, y) in a.stacks.iter().zip(&b.stacks) {
            assert_eq!(x.to_template().unwrap(), y.to_template().unwrap(), "{}", x.id);
        }
    }
}

#[test]
fn invalid_table_aborts_run() {
    let mut table = builtin();
    let duplicate = table.stages[1].deployment_groups[0].clone();
    table.stages[1].deployment_groups.push(duplicate);
    assert!(matches!(FanOut::run(&table), Err(FanOutError::Config(_))));
}

// ── Synthesis ─────────────────────────────────────────────────────

#[test]
fn synthesize_writes_templates_and_manifest() {
    let graph = run(&builtin());
    let dir = tempfile::tempdir().unwrap();
    let manifest = synthesize(&graph, dir.path()).unwrap();

    assert!(dir.path().join(MANIFEST_FILE).exists());
    assert_eq!(manifest.groups.len(), 3);
    let prod = manifest.groups.iter().find(|g| g.name == "Prod-eu-west-1").unwrap();
    assert_eq!(prod.environment, "aws://367428151234/eu-west-1");
    assert_eq!(prod.deployment_order.first().map(String::as_str), Some("Network-Prod-eu-west-1"));

    for group in &manifest.groups {
        for (id, entry) in &group.stacks {
            assert_eq!(entry.template, template_file(id));
            let content = fs::read(dir.path().join(&entry.template)).unwrap();
            assert_eq!(hex::encode(Sha256::digest(&content)), entry.sha256, "{id}");
        }
    }

    let on_disk: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join(MANIFEST_FILE)).unwrap()).unwrap();
    assert_eq!(on_disk["pipeline"]["name"], "OrderScoringPipeline");
}

#[test]
fn synthesis_is_deterministic() {
    let table = builtin();
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    let first = synthesize(&run(&table), a.path()).unwrap();
    let second = synthesize(&run(&table), b.path()).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        fs::read(a.path().join(MANIFEST_FILE)).unwrap(),
        fs::read(b.path().join(MANIFEST_FILE)).unwrap()
    );
}

#[test]
fn resynthesis_drops_stale_templates() {
    let dir = tempfile::tempdir().unwrap();
    synthesize(&run(&builtin()), dir.path()).unwrap();
    let integ = dir.path().join(template_file("IntegTests-Devo-eu-west-1"));
    assert!(integ.exists());
    fs::write(dir.path().join("notes.txt"), "kept").unwrap();

    let mut table = builtin();
    table.stages[0].deployment_groups[0].approval.run_integration_tests = false;
    let manifest = synthesize(&run(&table), dir.path()).unwrap();

    assert!(!integ.exists());
    assert!(dir.path().join("notes.txt").exists());
    let listed: usize = manifest.groups.iter().map(|g| g.stacks.len()).sum();
    let on_disk = fs::read_dir(dir.path())
        .unwrap()
        .filter(|e| e.as_ref().unwrap().file_name().to_string_lossy().ends_with(".template.json"))
        .count();
    assert_eq!(on_disk, listed);
}
