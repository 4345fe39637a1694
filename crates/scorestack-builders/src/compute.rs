//! Compute: the three stream functions, their roles and queue triggers.
//!
//! Every function drains one primary queue with partial-batch failure
//! reporting. Roles are scoped to the exact table, queue and topic ARNs;
//! the only wildcard grant is metric publishing, which has no resource.
//! Graph access goes through a separate role the function roles assume.

use std::collections::BTreeMap;

use scorestack_core::naming::managed_policy;
use scorestack_core::{Channel, FunctionKind};
use scorestack_observe::{panels, sets};
use scorestack_template::resource::{
    EventSourceMappingProperties, FunctionEnvironment, FunctionProperties, IamRoleProperties, ImageCode,
    ImageConfig, InlinePolicy, VpcConfig,
};
use scorestack_template::{PolicyDocument, Principal, Resource, Stack, Statement, Value};
use tracing::{debug, info};

use crate::context::{BuildContext, Built, StackKind};
use crate::error::BuildResult;
use crate::messaging::MessagingHandle;
use crate::network::NetworkHandle;
use crate::store::StoreHandle;

pub const MEMORY_MB: u32 = 1024;
pub const TIMEOUT_SECS: u64 = 900;
const GRAPH_ROLE: &str = "OrderGraphAccessRole";

const QUEUE_ACTIONS: [&str; 4] = [
    "sqs:ReceiveMessage",
    "sqs:GetQueueAttributes",
    "sqs:SendMessage",
    "sqs:DeleteMessage",
];

/// Inference tuning passed through to the handler unchanged.
const INFERENCE_CONSTANTS: [(&str, &str); 5] = [
    ("INFERENCE_IO_DEBUG", "F"),
    ("NEPTUNE_EVALUATION_TIMEOUT", "5000"),
    ("NEPTUNE_DROP_QUERY_TIMEOUT", "200000"),
    ("ab_MOD", "11"),
    ("ab_minVal", "1"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionHandle {
    pub kind: FunctionKind,
    pub name: String,
    pub arn: String,
    pub role_arn: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputeHandle {
    pub stack_id: String,
    pub functions: Vec<FunctionHandle>,
    pub graph_role_arn: String,
}

fn role_logical_id(kind: FunctionKind) -> String {
    format!("{}Role", kind.base_name())
}

/// Handler entry point inside the image of `channel`.
fn command(kind: FunctionKind, channel: Channel) -> String {
    let package = match channel {
        Channel::Production => "order_scoring_stream",
        Channel::Experiment => "order_scoring_experiments",
    };
    let handler = match kind {
        FunctionKind::Ingest => "ingestion_handler.handle_ingestion",
        FunctionKind::Inference => "inference_handler.handle_inference",
        FunctionKind::ClickThrough => "click_through_handler.handle_click_through",
    };
    format!("{package}.{handler}")
}

fn table_actions(kind: FunctionKind) -> &'static [&'static str] {
    match kind {
        FunctionKind::Inference => &["dynamodb:BatchGet*"],
        FunctionKind::Ingest | FunctionKind::ClickThrough => {
            &["dynamodb:BatchGet*", "dynamodb:GetItem", "dynamodb:PutItem"]
        }
    }
}

pub fn build(
    ctx: &BuildContext<'_>,
    network: &NetworkHandle,
    store: &StoreHandle,
    messaging: &MessagingHandle,
) -> BuildResult<Built<ComputeHandle>> {
    let mut stack = ctx.stack(StackKind::Compute);
    stack.add_dependency(&messaging.stack_id)?;
    stack.add_dependency(&store.stack_id)?;
    let arn = ctx.arn();

    let role_arns: Vec<(FunctionKind, String)> = FunctionKind::ALL
        .into_iter()
        .map(|kind| (kind, arn.role(&ctx.name(&role_logical_id(kind)))))
        .collect();

    for kind in FunctionKind::ALL {
        function_role(&mut stack, ctx, kind, store, messaging)?;
    }

    let graph_role_name = ctx.name(GRAPH_ROLE);
    let graph_role_arn = arn.role(&graph_role_name);
    let mut graph_role = Resource::new(IamRoleProperties {
        role_name: Some(graph_role_name),
        description: Some("Graph cluster access assumed by the stream functions".to_string()),
        assume_role_policy_document: PolicyDocument::new(role_arns.iter().map(|(_, role)| {
            Statement::allow(["sts:AssumeRole"], Vec::<Value>::new()).with_principal(Principal::aws(role))
        })),
        managed_policy_arns: Vec::new(),
        policies: vec![InlinePolicy {
            policy_name: "GraphIamAuth".to_string(),
            policy_document: PolicyDocument::new([Statement::allow(
                ["neptune-db:*"],
                [Value::join([
                    Value::str(arn.graph_cluster_prefix()),
                    store.graph_resource_id.clone(),
                    Value::str("/*"),
                ])],
            )]),
        }],
    });
    for kind in FunctionKind::ALL {
        graph_role = graph_role.depends_on(role_logical_id(kind));
    }
    stack.add(GRAPH_ROLE, graph_role)?;

    let mut functions = Vec::new();
    let mut alarms = Vec::new();
    for (kind, role_arn) in role_arns {
        let function = declare_function(&mut stack, ctx, kind, role_arn, &graph_role_arn, network, store, messaging)?;

        let queue = messaging.queue(kind.event_source());
        panels::function_dashboard(
            &ctx.name(&format!("{}-Dashboard", kind.base_name())),
            &function.name,
            &queue.name,
            &queue.dlq_name,
        )
        .declare(&mut stack)?;
        alarms.extend(ctx.declare_alarms(&mut stack, sets::function_alarms(kind.base_name(), &function.name))?);

        functions.push(function);
    }

    info!(stack = %stack.id, functions = functions.len(), alarms = alarms.len(), "compute group built");
    let handle = ComputeHandle {
        stack_id: stack.id.clone(),
        functions,
        graph_role_arn,
    };
    Ok(Built { stack, handle, alarms })
}

fn function_role(
    stack: &mut Stack,
    ctx: &BuildContext<'_>,
    kind: FunctionKind,
    store: &StoreHandle,
    messaging: &MessagingHandle,
) -> BuildResult<()> {
    let queue = messaging.queue(kind.event_source());
    let mut statements = vec![
        Statement::allow(table_actions(kind).iter().copied(), [store.table_arn.as_str()]),
        Statement::allow(QUEUE_ACTIONS, [queue.arn.as_str(), queue.dlq_arn.as_str()]),
    ];
    if kind == FunctionKind::Inference {
        statements.push(Statement::allow(
            ["sns:Publish", "sns:GetTopicAttributes", "sns:ListTopics"],
            [messaging.scores_topic_arn.as_str()],
        ));
    }
    statements.push(Statement::allow(["cloudwatch:PutMetricData"], ["*"]));

    let id = role_logical_id(kind);
    stack.add(
        id.clone(),
        Resource::new(IamRoleProperties {
            role_name: Some(ctx.name(&id)),
            description: None,
            assume_role_policy_document: PolicyDocument::assume_role(Principal::service("lambda.amazonaws.com")),
            managed_policy_arns: vec![
                managed_policy("service-role/AWSLambdaBasicExecutionRole"),
                managed_policy("service-role/AWSLambdaVPCAccessExecutionRole"),
            ],
            policies: vec![InlinePolicy {
                policy_name: "StreamAccess".to_string(),
                policy_document: PolicyDocument::new(statements),
            }],
        }),
    )?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn declare_function(
    stack: &mut Stack,
    ctx: &BuildContext<'_>,
    kind: FunctionKind,
    role_arn: String,
    graph_role_arn: &str,
    network: &NetworkHandle,
    store: &StoreHandle,
    messaging: &MessagingHandle,
) -> BuildResult<FunctionHandle> {
    let target = ctx.target;
    let name = ctx.name(kind.base_name());
    let tuning = target.batch_tuning(kind)?;
    let repository = match target.channel {
        Channel::Production => &ctx.artifacts.stream_repository,
        Channel::Experiment => &ctx.artifacts.experiment_repository,
    };

    // Inference only reads the graph.
    let (graph_host, graph_port) = match kind {
        FunctionKind::Inference => (&store.graph_read_endpoint, &store.graph_port),
        FunctionKind::Ingest | FunctionKind::ClickThrough => (&store.graph_endpoint, &store.graph_port),
    };
    let mut variables = BTreeMap::from([
        ("NeptuneIamRoleArn".to_string(), Value::str(graph_role_arn)),
        ("OrderFeaturesDDBTableArn".to_string(), Value::str(&store.table_arn)),
        ("NeptuneEndpointHostname".to_string(), graph_host.clone()),
        ("NeptuneEndpointPort".to_string(), graph_port.clone()),
        ("RealtimeOrderScoresSNSTopic".to_string(), Value::str(&messaging.scores_topic_arn)),
        ("AWS_SERVICE_REGION".to_string(), Value::str(&target.region)),
    ]);
    if kind == FunctionKind::Inference {
        variables.extend(INFERENCE_CONSTANTS.iter().map(|(k, v)| (k.to_string(), Value::str(*v))));
    }

    let id = kind.base_name();
    stack.add(
        id,
        Resource::new(FunctionProperties {
            function_name: name.clone(),
            description: format!("{} stream handler ({})", kind.base_name(), ctx.suffix()),
            package_type: "Image",
            code: ImageCode {
                image_uri: ctx.artifacts.image_uri(repository, &target.account_id, &target.region),
            },
            image_config: ImageConfig {
                command: vec![command(kind, target.channel)],
            },
            role: role_arn.clone(),
            memory_size: MEMORY_MB,
            timeout: TIMEOUT_SECS,
            reserved_concurrent_executions: kind.reserved_concurrency(),
            environment: FunctionEnvironment { variables },
            vpc_config: VpcConfig {
                subnet_ids: network.private_subnets.clone(),
                security_group_ids: vec![network.security_group.clone()],
            },
        })
        .depends_on(role_logical_id(kind)),
    )?;

    let queue = messaging.queue(kind.event_source());
    stack.add(
        format!("{id}EventSourceMapping"),
        Resource::new(EventSourceMappingProperties {
            event_source_arn: queue.arn.clone(),
            function_name: name.clone(),
            enabled: true,
            batch_size: tuning.batch_size,
            maximum_batching_window_in_seconds: tuning.max_batching_window.as_secs(),
            function_response_types: vec!["ReportBatchItemFailures"],
        })
        .depends_on(id),
    )?;
    debug!(function = %name, queue = %queue.name, batch_size = tuning.batch_size, "declared function trigger");

    Ok(FunctionHandle {
        kind,
        arn: ctx.arn().function(&name),
        name,
        role_arn,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::fixture;
    use crate::{hosting, messaging, network, store};
    use scorestack_template::ResourceKind;

    fn built(target: usize) -> Built<ComputeHandle> {
        let (table, targets) = fixture();
        let ctx = BuildContext::new(&table, &targets[target]);
        let net = network::build(&ctx).unwrap();
        let st = store::build(&ctx, &net.handle).unwrap();
        let msg = messaging::build(&ctx, &net.handle, &hosting::model_role_name(&ctx)).unwrap();
        build(&ctx, &net.handle, &st.handle, &msg.handle).unwrap()
    }

    fn roles(stack: &Stack) -> Vec<&IamRoleProperties> {
        stack.collect(|k| match k {
            ResourceKind::IamRole(r) => Some(r),
            _ => None,
        })
    }

    #[test]
    fn batch_tuning_follows_stage() {
        let b = built(2);
        let mappings = b.stack.collect(|k| match k {
            ResourceKind::EventSourceMapping(m) => Some(m),
            _ => None,
        });
        assert_eq!(mappings.len(), 3);
        let expected = [
            ("IngestEventsLambda-Prod-eu-west-1", 100, 60),
            ("InferenceEventsLambda-Prod-eu-west-1", 25, 60),
            ("ClickThroughLambda-Prod-eu-west-1", 500, 300),
        ];
        for (function, size, window) in expected {
            let m = mappings.iter().find(|m| m.function_name == function).unwrap();
            assert_eq!(m.batch_size, size);
            assert_eq!(m.maximum_batching_window_in_seconds, window);
            assert_eq!(m.function_response_types, vec!["ReportBatchItemFailures"]);
        }
    }

    #[test]
    fn metric_publishing_is_the_only_wildcard() {
        let b = built(0);
        for role in roles(&b.stack) {
            for doc in role.inline_documents() {
                for action in doc.wildcard_actions() {
                    assert_eq!(action, "cloudwatch:PutMetricData");
                }
            }
        }
    }

    #[test]
    fn role_grants_match_function() {
        let b = built(0);
        let role = |name: &str| {
            roles(&b.stack)
                .into_iter()
                .find(|r| r.role_name.as_deref() == Some(name))
                .unwrap()
                .inline_documents()
                .next()
                .unwrap()
                .clone()
        };
        let table = "arn:aws:dynamodb:eu-west-1:367428151234:table/ClickThroughOrdersTable-Devo-eu-west-1";

        let inference = role("InferenceEventsLambdaRole-Devo-eu-west-1");
        assert!(inference.grants_on("dynamodb:BatchGet*", table));
        assert!(!inference.grants("dynamodb:PutItem"));
        assert!(inference.grants_on(
            "sns:Publish",
            "arn:aws:sns:eu-west-1:367428151234:RealtimeOrderScoresTopic-Devo-eu-west-1"
        ));

        let ingest = role("IngestEventsLambdaRole-Devo-eu-west-1");
        assert!(ingest.grants_on("dynamodb:PutItem", table));
        assert!(ingest.grants_on(
            "sqs:DeleteMessage",
            "arn:aws:sqs:eu-west-1:367428151234:IngestOrderEventsQueueDLQ-Devo-eu-west-1"
        ));
        assert!(!ingest.grants("sns:Publish"));
    }

    #[test]
    fn inference_environment() {
        let b = built(0);
        let t = b.stack.to_template().unwrap();
        let env = &t["Resources"]["InferenceEventsLambda"]["Properties"]["Environment"]["Variables"];
        assert_eq!(env["NEPTUNE_EVALUATION_TIMEOUT"], "5000");
        assert_eq!(env["ab_MOD"], "11");
        assert_eq!(
            env["NeptuneEndpointHostname"]["Fn::ImportValue"],
            "Store-Devo-eu-west-1-GraphReadEndpoint"
        );
        let ingest = &t["Resources"]["IngestEventsLambda"]["Properties"]["Environment"]["Variables"];
        assert_eq!(ingest["NeptuneEndpointHostname"]["Fn::ImportValue"], "Store-Devo-eu-west-1-GraphEndpoint");
        assert!(ingest.get("ab_MOD").is_none());
    }

    #[test]
    fn channel_selects_image() {
        let prod = built(0).stack.to_template().unwrap();
        let props = &prod["Resources"]["IngestEventsLambda"]["Properties"];
        assert_eq!(
            props["Code"]["ImageUri"],
            "367428151234.dkr.ecr.eu-west-1.amazonaws.com/order-scoring-stream:mainline"
        );
        assert_eq!(props["ImageConfig"]["Command"][0], "order_scoring_stream.ingestion_handler.handle_ingestion");
        assert_eq!(props["ReservedConcurrentExecutions"], 1);

        let exp = built(1).stack.to_template().unwrap();
        let props = &exp["Resources"]["InferenceEventsLambda"]["Properties"];
        assert_eq!(
            props["ImageConfig"]["Command"][0],
            "order_scoring_experiments.inference_handler.handle_inference"
        );
        assert_eq!(props["ReservedConcurrentExecutions"], 100);
    }

    #[test]
    fn dashboards_always_alarms_with_setup() {
        let devo = built(0);
        assert_eq!(devo.stack.resources_of_type("AWS::CloudWatch::Dashboard").len(), 3);
        assert!(devo.alarms.is_empty());
        let prod = built(2);
        assert_eq!(prod.alarms.len(), 3);
        assert!(prod.stack.dependencies().contains("Messaging-Prod-eu-west-1"));
        assert!(prod.stack.dependencies().contains("Store-Prod-eu-west-1"));

        let t = prod.stack.to_template().unwrap();
        let graph = &t["Resources"]["OrderGraphAccessRole"]["Properties"];
        assert_eq!(graph["AssumeRolePolicyDocument"]["Statement"].as_array().unwrap().len(), 3);
        assert_eq!(
            graph["Policies"][0]["PolicyDocument"]["Statement"][0]["Resource"][0]["Fn::Join"][1][1]["Fn::ImportValue"],
            "Store-Prod-eu-west-1-GraphResourceId"
        );
    }
}
