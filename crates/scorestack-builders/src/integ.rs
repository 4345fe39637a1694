//! Integration test runner resources, declared only for targets whose
//! approval step runs the integration suite.

use scorestack_template::resource::{FunctionPermissionProperties, IamRoleProperties, InlinePolicy};
use scorestack_template::{PolicyDocument, Principal, Resource, Statement, Value};
use serde_json::json;
use tracing::info;

use crate::compute::ComputeHandle;
use crate::context::{BuildContext, Built, StackKind};
use crate::error::BuildResult;
use crate::messaging::MessagingHandle;
use crate::store::StoreHandle;

const RUNNER_ROLE: &str = "IntegTestRunnerRole";

#[derive(Debug, Clone, PartialEq)]
pub struct IntegHandle {
    pub stack_id: String,
    pub role_arn: String,
    /// Environment handed to the test runner.
    pub run_definition: serde_json::Value,
}

pub fn build(
    ctx: &BuildContext<'_>,
    compute: &ComputeHandle,
    messaging: &MessagingHandle,
    store: &StoreHandle,
) -> BuildResult<Built<IntegHandle>> {
    let mut stack = ctx.stack(StackKind::IntegTests);
    stack.add_dependency(&compute.stack_id)?;
    stack.add_dependency(&messaging.stack_id)?;
    stack.add_dependency(&store.stack_id)?;

    let queue_arns: Vec<&str> = messaging
        .queues()
        .into_iter()
        .flat_map(|q| [q.arn.as_str(), q.dlq_arn.as_str()])
        .collect();
    let function_arns: Vec<&str> = compute.functions.iter().map(|f| f.arn.as_str()).collect();

    let role_name = ctx.name(RUNNER_ROLE);
    let role_arn = ctx.arn().role(&role_name);
    stack.add(
        RUNNER_ROLE,
        Resource::new(IamRoleProperties {
            role_name: Some(role_name),
            description: Some("Invocation role of the integration test runner".to_string()),
            assume_role_policy_document: PolicyDocument::assume_role(Principal::service("lambda.amazonaws.com")),
            managed_policy_arns: Vec::new(),
            policies: vec![InlinePolicy {
                policy_name: "IntegTestAccess".to_string(),
                policy_document: PolicyDocument::new([
                    Statement::allow(
                        [
                            "cloudwatch:GetMetricData",
                            "sqs:ReceiveMessage",
                            "sqs:GetQueueAttributes",
                            "sqs:SendMessage",
                            "sqs:DeleteMessage",
                        ],
                        queue_arns.iter().copied(),
                    ),
                    Statement::allow(
                        [
                            "cloudwatch:GetMetricData",
                            "cloudwatch:PutMetricData",
                            "logs:GetLogEvents",
                            "logs:PutLogEvents",
                        ],
                        ["*"],
                    ),
                    Statement::allow(
                        [
                            "dynamodb:GetItem",
                            "dynamodb:PutItem",
                            "dynamodb:UpdateItem",
                            "dynamodb:DeleteItem",
                        ],
                        [store.table_arn.as_str()],
                    ),
                    Statement::allow(["lambda:InvokeFunction"], function_arns.iter().copied()),
                ]),
            }],
        }),
    )?;

    for function in &compute.functions {
        stack.add(
            format!("{}InvokePermission", function.kind.base_name()),
            Resource::new(FunctionPermissionProperties {
                action: "lambda:InvokeFunction",
                function_name: function.name.clone(),
                principal: role_arn.clone(),
            })
            .depends_on(RUNNER_ROLE),
        )?;
    }

    let run_definition = json!({
        "role": role_arn,
        "environment": {
            "AWS_ACCOUNT": ctx.target.account_id,
            "STAGE": ctx.target.stage_name,
            "AWS_REGION": ctx.target.region,
        },
        "functions": compute.functions.iter().map(|f| f.name.as_str()).collect::<Vec<_>>(),
    });
    stack.output(
        "RunDefinition",
        Value::str(run_definition.to_string()),
        Some("Integration test run definition".to_string()),
    )?;

    info!(stack = %stack.id, functions = compute.functions.len(), "integration test group built");
    Ok(Built {
        handle: IntegHandle {
            stack_id: stack.id.clone(),
            role_arn,
            run_definition,
        },
        stack,
        alarms: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::fixture;
    use crate::{compute, hosting, messaging, network, store};
    use scorestack_template::ResourceKind;

    fn built() -> Built<IntegHandle> {
        let (table, targets) = fixture();
        let ctx = BuildContext::new(&table, &targets[0]);
        let net = network::build(&ctx).unwrap();
        let st = store::build(&ctx, &net.handle).unwrap();
        let msg = messaging::build(&ctx, &net.handle, &hosting::model_role_name(&ctx)).unwrap();
        let cmp = compute::build(&ctx, &net.handle, &st.handle, &msg.handle).unwrap();
        build(&ctx, &cmp.handle, &msg.handle, &st.handle).unwrap()
    }

    #[test]
    fn runner_role_grants() {
        let b = built();
        let roles = b.stack.collect(|k| match k {
            ResourceKind::IamRole(r) => Some(r),
            _ => None,
        });
        let doc = roles[0].inline_documents().next().unwrap();
        assert!(doc.grants_on(
            "sqs:SendMessage",
            "arn:aws:sqs:eu-west-1:367428151234:ClickThroughEventsQueueDLQ-Devo-eu-west-1"
        ));
        assert!(doc.grants_on(
            "dynamodb:DeleteItem",
            "arn:aws:dynamodb:eu-west-1:367428151234:table/ClickThroughOrdersTable-Devo-eu-west-1"
        ));
        assert!(doc.grants_on(
            "lambda:InvokeFunction",
            "arn:aws:lambda:eu-west-1:367428151234:function:InferenceEventsLambda-Devo-eu-west-1"
        ));
        assert_eq!(b.stack.resources_of_type("AWS::Lambda::Permission").len(), 3);
    }

    #[test]
    fn run_definition_output() {
        let b = built();
        assert_eq!(b.handle.run_definition["environment"]["STAGE"], "Devo");
        assert_eq!(b.handle.run_definition["environment"]["AWS_REGION"], "eu-west-1");
        let deps = b.stack.dependencies();
        for id in ["Compute-Devo-eu-west-1", "Messaging-Devo-eu-west-1", "Store-Devo-eu-west-1"] {
            assert!(deps.contains(id), "{id}");
        }
        let t = b.stack.to_template().unwrap();
        let raw = t["Outputs"]["RunDefinition"]["Value"].as_str().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed, b.handle.run_definition);
    }
}
