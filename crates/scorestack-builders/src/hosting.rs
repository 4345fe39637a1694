//! Model hosting: the scoring model, its endpoint and autoscaling.

use std::collections::BTreeMap;

use scorestack_core::naming::managed_policy;
use scorestack_observe::{panels, sets};
use scorestack_template::resource::{
    ContainerDefinition, EndpointConfigProperties, EndpointProperties, IamRoleProperties, InlinePolicy,
    ModelProperties, ModelVpcConfig, PredefinedMetric, ProductionVariant, ScalableTargetProperties,
    ScalingPolicyProperties, TargetTracking,
};
use scorestack_template::{PolicyDocument, Principal, Resource, Statement, Value};
use tracing::info;

use crate::context::{BuildContext, Built, StackKind};
use crate::error::BuildResult;
use crate::messaging::TRIGGER_TOPIC;
use crate::network::NetworkHandle;

pub const MODEL_ROLE: &str = "OrderScoringModelRole";
pub const MODEL: &str = "OrderScoringModel";
pub const ENDPOINT: &str = "OrderScoringEndpoint";
pub const VARIANT: &str = "main";
const INSTANCE_TYPE: &str = "ml.c5.xlarge";
const MAX_INSTANCES: u32 = 10;
/// Target invocations per instance per second.
const INVOCATIONS_PER_INSTANCE: f64 = 100.0;

/// Execution role name of the model. Messaging needs it before hosting is
/// built, so it is derived from the target alone.
pub fn model_role_name(ctx: &BuildContext<'_>) -> String {
    ctx.name(MODEL_ROLE)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostingHandle {
    pub stack_id: String,
    pub role_name: String,
    pub endpoint_name: String,
    pub variant: String,
}

pub fn build(ctx: &BuildContext<'_>, network: &NetworkHandle) -> BuildResult<Built<HostingHandle>> {
    let mut stack = ctx.stack(StackKind::Hosting);
    stack.add_dependency(&network.stack_id)?;
    let arn = ctx.arn();
    let target = ctx.target;

    let role_name = model_role_name(ctx);
    let role_arn = arn.role(&role_name);
    stack.add(
        MODEL_ROLE,
        Resource::new(IamRoleProperties {
            role_name: Some(role_name.clone()),
            description: Some("Execution role of the scoring model".to_string()),
            assume_role_policy_document: PolicyDocument::assume_role(Principal::service("sagemaker.amazonaws.com")),
            managed_policy_arns: vec![managed_policy("AmazonSageMakerFullAccess")],
            policies: vec![InlinePolicy {
                policy_name: "PublishTriggerEvents".to_string(),
                policy_document: PolicyDocument::new([Statement::allow(
                    ["sns:Publish"],
                    [arn.topic(&ctx.name(TRIGGER_TOPIC))],
                )]),
            }],
        }),
    )?;

    let model_name = ctx.name(MODEL);
    let mut environment = BTreeMap::new();
    environment.insert("AWS_DEFAULT_REGION".to_string(), target.region.clone());
    environment.insert("AWS_ACCOUNT".to_string(), target.account_id.clone());
    stack.add(
        MODEL,
        Resource::new(ModelProperties {
            model_name: model_name.clone(),
            execution_role_arn: role_arn,
            primary_container: ContainerDefinition {
                image: ctx
                    .artifacts
                    .image_uri(&ctx.artifacts.model_repository, &target.account_id, &target.region),
                model_data_url: ctx.artifacts.model_data_url.clone(),
                environment,
            },
            vpc_config: ModelVpcConfig {
                subnets: network.private_subnets.clone(),
                security_group_ids: vec![network.security_group.clone()],
            },
        })
        .depends_on(MODEL_ROLE),
    )?;

    let config_name = ctx.name("OrderScoringEndpointConfig");
    stack.add(
        "OrderScoringEndpointConfig",
        Resource::new(EndpointConfigProperties {
            endpoint_config_name: config_name.clone(),
            production_variants: vec![ProductionVariant {
                variant_name: VARIANT.to_string(),
                model_name,
                instance_type: INSTANCE_TYPE.to_string(),
                initial_instance_count: 1,
                initial_variant_weight: 1.0,
            }],
        })
        .depends_on(MODEL),
    )?;

    let endpoint_name = ctx.name(ENDPOINT);
    stack.add(
        ENDPOINT,
        Resource::new(EndpointProperties {
            endpoint_name: endpoint_name.clone(),
            endpoint_config_name: config_name,
        })
        .depends_on("OrderScoringEndpointConfig"),
    )?;

    let scalable_target = stack.add(
        "EndpointScalableTarget",
        Resource::new(ScalableTargetProperties {
            service_namespace: "sagemaker",
            resource_id: format!("endpoint/{endpoint_name}/variant/{VARIANT}"),
            scalable_dimension: "sagemaker:variant:DesiredInstanceCount",
            min_capacity: 1,
            max_capacity: MAX_INSTANCES,
        })
        .depends_on(ENDPOINT),
    )?;
    stack.add(
        "EndpointScalingPolicy",
        Resource::new(ScalingPolicyProperties {
            policy_name: "LimitRPS".to_string(),
            policy_type: "TargetTrackingScaling",
            scaling_target_id: scalable_target,
            target_tracking_scaling_policy_configuration: TargetTracking {
                // Tracked per minute by the provider.
                target_value: INVOCATIONS_PER_INSTANCE * 60.0,
                predefined_metric_specification: PredefinedMetric {
                    predefined_metric_type: "SageMakerVariantInvocationsPerInstance",
                },
            },
        }),
    )?;

    panels::endpoint_dashboard(&ctx.name("Endpoint-Dashboard"), &endpoint_name, VARIANT).declare(&mut stack)?;
    let alarms = ctx.declare_alarms(&mut stack, sets::endpoint_alarms(ENDPOINT, &endpoint_name, VARIANT))?;

    stack.output(
        "EndpointName",
        Value::str(&endpoint_name),
        Some("Scoring endpoint invoked by the inference function".to_string()),
    )?;

    info!(stack = %stack.id, endpoint = %endpoint_name, alarms = alarms.len(), "hosting group built");
    let handle = HostingHandle {
        stack_id: stack.id.clone(),
        role_name,
        endpoint_name,
        variant: VARIANT.to_string(),
    };
    Ok(Built { stack, handle, alarms })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::fixture;
    use crate::network;

    fn built(target: usize) -> Built<HostingHandle> {
        let (table, targets) = fixture();
        let ctx = BuildContext::new(&table, &targets[target]);
        let net = network::build(&ctx).unwrap();
        build(&ctx, &net.handle).unwrap()
    }

    #[test]
    fn endpoint_and_scaling() {
        let b = built(2);
        assert_eq!(b.handle.role_name, "OrderScoringModelRole-Prod-eu-west-1");
        assert_eq!(b.handle.endpoint_name, "OrderScoringEndpoint-Prod-eu-west-1");
        assert!(b.stack.dependencies().contains("Network-Prod-eu-west-1"));

        let t = b.stack.to_template().unwrap();
        let variant = &t["Resources"]["OrderScoringEndpointConfig"]["Properties"]["ProductionVariants"][0];
        assert_eq!(variant["InstanceType"], "ml.c5.xlarge");
        assert_eq!(variant["VariantName"], "main");

        let scaling = &t["Resources"]["EndpointScalableTarget"]["Properties"];
        assert_eq!(scaling["MaxCapacity"], 10);
        assert_eq!(
            scaling["ResourceId"],
            "endpoint/OrderScoringEndpoint-Prod-eu-west-1/variant/main"
        );
        let policy = &t["Resources"]["EndpointScalingPolicy"]["Properties"];
        assert_eq!(policy["PolicyName"], "LimitRPS");
        assert_eq!(policy["ScalingTargetId"]["Ref"], "EndpointScalableTarget");

        let container = &t["Resources"]["OrderScoringModel"]["Properties"]["PrimaryContainer"];
        assert_eq!(
            container["Image"],
            "367428151234.dkr.ecr.eu-west-1.amazonaws.com/order-scoring-model:mainline"
        );
        assert_eq!(container["Environment"]["AWS_ACCOUNT"], "367428151234");
    }

    #[test]
    fn alarms_only_with_setup() {
        assert_eq!(built(2).alarms.len(), 6);
        let devo = built(0);
        assert!(devo.alarms.is_empty());
        assert_eq!(devo.stack.resources_of_type("AWS::CloudWatch::Dashboard").len(), 1);
    }

    #[test]
    fn role_name_is_computed() {
        let (table, targets) = fixture();
        let ctx = BuildContext::new(&table, &targets[1]);
        assert_eq!(model_role_name(&ctx), "OrderScoringModelRole-Devo-us-east-1");
    }
}
