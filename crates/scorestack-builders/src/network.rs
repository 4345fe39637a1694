//! Network boundary: VPC, subnets, endpoints, flow logs.
//!
//! Every other group attaches to the boundary through the ids exported
//! here. The network group also owns the ticketing topics and, on the
//! production channel, the dashboard-viewer role.

use scorestack_core::Channel;
use scorestack_template::resource::{
    EipProperties, EndpointType, FlowLogProperties, IamRoleProperties, InlinePolicy,
    InternetGatewayProperties, LogGroupProperties, NatGatewayProperties, RouteProperties,
    RouteTableProperties, SecurityGroupProperties, SecurityGroupRule, SubnetProperties,
    SubnetRouteTableAssociationProperties, Tag, VpcEndpointProperties, VpcGatewayAttachmentProperties,
    VpcProperties, name_tag,
};
use scorestack_template::{PolicyDocument, Principal, Resource, Stack, Statement, Value};
use tracing::{debug, info};

use crate::context::{BuildContext, Built, StackKind};
use crate::error::BuildResult;

pub const VPC_CIDR: &str = "10.0.0.0/16";
const PUBLIC_CIDRS: [&str; 2] = ["10.0.0.0/19", "10.0.32.0/19"];
const PRIVATE_CIDRS: [&str; 2] = ["10.0.64.0/19", "10.0.96.0/19"];
/// Subnets reserved for the graph cluster.
pub const GRAPH_CIDRS: [&str; 2] = ["10.0.192.0/24", "10.0.200.0/24"];
const FLOW_LOG_RETENTION_DAYS: u32 = 14;

const INTERFACE_SERVICES: [(&str, &str); 3] = [("Sts", "sts"), ("Sns", "sns"), ("Sqs", "sqs")];

const DASHBOARD_VIEWER_ACTIONS: [&str; 6] = [
    "cloudwatch:DescribeAlarms",
    "cloudwatch:GetDashboard",
    "cloudwatch:GetInsightRuleReport",
    "cloudwatch:GetMetricData",
    "cloudwatch:ListDashboards",
    "logs:FilterLogEvents",
];

/// Boundary ids as seen from other stacks of the same target.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkHandle {
    pub stack_id: String,
    pub private_subnets: Vec<Value>,
    pub graph_subnets: Vec<Value>,
    pub security_group: Value,
}

pub fn build(ctx: &BuildContext<'_>) -> BuildResult<Built<NetworkHandle>> {
    let mut stack = ctx.stack(StackKind::Network);
    let suffix = ctx.suffix();
    let region = &ctx.target.region;
    let zones = [format!("{region}a"), format!("{region}b")];

    let vpc = stack.add(
        "Vpc",
        Resource::new(VpcProperties {
            cidr_block: VPC_CIDR.to_string(),
            enable_dns_hostnames: true,
            enable_dns_support: true,
            tags: name_tag(ctx.name("Vpc")),
        }),
    )?;

    // Public side: internet gateway, one public route table.
    let igw = stack.add(
        "InternetGateway",
        Resource::new(InternetGatewayProperties {
            tags: name_tag(ctx.name("InternetGateway")),
        }),
    )?;
    stack.add(
        "InternetGatewayAttachment",
        Resource::new(VpcGatewayAttachmentProperties {
            vpc_id: vpc.clone(),
            internet_gateway_id: igw.clone(),
        }),
    )?;
    let public_rt = stack.add(
        "PublicRouteTable",
        Resource::new(RouteTableProperties {
            vpc_id: vpc.clone(),
            tags: name_tag(ctx.name("PublicRouteTable")),
        }),
    )?;
    stack.add(
        "PublicDefaultRoute",
        Resource::new(RouteProperties {
            route_table_id: public_rt.clone(),
            destination_cidr_block: "0.0.0.0/0".to_string(),
            gateway_id: Some(igw),
            nat_gateway_id: None,
        })
        .depends_on("InternetGatewayAttachment"),
    )?;

    // Per zone: public subnet + NAT, private subnet routed through it,
    // graph subnet sharing the private route table.
    let mut private_subnets = Vec::new();
    let mut graph_subnets = Vec::new();
    let mut private_tables = Vec::new();
    for (i, zone) in zones.iter().enumerate() {
        let public = subnet(&mut stack, &format!("PublicSubnet{i}"), &vpc, PUBLIC_CIDRS[i], zone, true, ctx)?;
        associate(&mut stack, &format!("PublicSubnet{i}"), &public, &public_rt)?;

        stack.add(format!("NatEip{i}"), Resource::new(EipProperties { domain: "vpc" }))?;
        let nat = stack.add(
            format!("NatGateway{i}"),
            Resource::new(NatGatewayProperties {
                allocation_id: Value::get_att(format!("NatEip{i}"), "AllocationId"),
                subnet_id: public,
                tags: name_tag(ctx.name(&format!("NatGateway{i}"))),
            })
            .depends_on("InternetGatewayAttachment"),
        )?;

        let rt = stack.add(
            format!("PrivateRouteTable{i}"),
            Resource::new(RouteTableProperties {
                vpc_id: vpc.clone(),
                tags: name_tag(ctx.name(&format!("PrivateRouteTable{i}"))),
            }),
        )?;
        stack.add(
            format!("PrivateDefaultRoute{i}"),
            Resource::new(RouteProperties {
                route_table_id: rt.clone(),
                destination_cidr_block: "0.0.0.0/0".to_string(),
                gateway_id: None,
                nat_gateway_id: Some(nat),
            }),
        )?;

        let private = subnet(&mut stack, &format!("PrivateSubnet{i}"), &vpc, PRIVATE_CIDRS[i], zone, false, ctx)?;
        associate(&mut stack, &format!("PrivateSubnet{i}"), &private, &rt)?;
        private_subnets.push(private);

        let graph = subnet(&mut stack, &format!("NeptunePrivateSubnet{i}"), &vpc, GRAPH_CIDRS[i], zone, false, ctx)?;
        associate(&mut stack, &format!("NeptunePrivateSubnet{i}"), &graph, &rt)?;
        graph_subnets.push(graph);

        private_tables.push(rt);
    }

    // Gateway endpoints for the storage tier.
    stack.add(
        "S3Endpoint",
        Resource::new(VpcEndpointProperties {
            vpc_id: vpc.clone(),
            service_name: format!("com.amazonaws.{region}.s3"),
            vpc_endpoint_type: EndpointType::Gateway,
            route_table_ids: private_tables.clone(),
            subnet_ids: Vec::new(),
            security_group_ids: Vec::new(),
            private_dns_enabled: None,
            policy_document: None,
        }),
    )?;
    stack.add(
        "DynamoDbEndpoint",
        Resource::new(VpcEndpointProperties {
            vpc_id: vpc.clone(),
            service_name: format!("com.amazonaws.{region}.dynamodb"),
            vpc_endpoint_type: EndpointType::Gateway,
            route_table_ids: private_tables,
            subnet_ids: Vec::new(),
            security_group_ids: Vec::new(),
            private_dns_enabled: None,
            policy_document: Some(PolicyDocument::new([Statement::allow(
                [
                    "dynamodb:BatchGet*",
                    "dynamodb:GetItem",
                    "dynamodb:PutItem",
                    "dynamodb:PartiQLUpdate",
                ],
                ["*"],
            )
            .with_principal(Principal::Any)])),
        }),
    )?;

    // Open interface endpoints: HTTPS from anywhere inside the VPC.
    let endpoint_sg = stack.add(
        "InterfaceEndpointSecurityGroup",
        Resource::new(SecurityGroupProperties {
            group_description: "HTTPS from the VPC to interface endpoints".to_string(),
            vpc_id: vpc.clone(),
            security_group_ingress: vec![SecurityGroupRule::tcp(443, VPC_CIDR)],
            security_group_egress: Vec::new(),
            tags: name_tag(ctx.name("InterfaceEndpoints")),
        }),
    )?;
    for (id, service) in INTERFACE_SERVICES {
        stack.add(
            format!("{id}Endpoint"),
            Resource::new(VpcEndpointProperties {
                vpc_id: vpc.clone(),
                service_name: format!("com.amazonaws.{region}.{service}"),
                vpc_endpoint_type: EndpointType::Interface,
                route_table_ids: Vec::new(),
                subnet_ids: private_subnets.clone(),
                security_group_ids: vec![endpoint_sg.clone()],
                private_dns_enabled: Some(true),
                policy_document: None,
            }),
        )?;
    }

    flow_log(&mut stack, ctx, &vpc)?;

    let model_sg = stack.add(
        "ModelSecurityGroup",
        Resource::new(SecurityGroupProperties {
            group_description: "Model endpoint and stream functions".to_string(),
            vpc_id: vpc.clone(),
            security_group_ingress: vec![SecurityGroupRule::all_traffic(VPC_CIDR).describe("intra-VPC")],
            security_group_egress: vec![SecurityGroupRule::all_traffic("0.0.0.0/0")],
            tags: name_tag(ctx.name("ModelSecurityGroup")),
        }),
    )?;

    if ctx.target.channel == Channel::Production {
        if let Some(account) = &ctx.team.dashboards_account {
            dashboard_viewer_role(&mut stack, &suffix, account)?;
        }
    }

    ctx.ticketing().declare_topics(&mut stack)?;

    stack.export("VpcId", vpc)?;
    let handle = NetworkHandle {
        stack_id: stack.id.clone(),
        private_subnets: export_all(&mut stack, "PrivateSubnet", private_subnets)?,
        graph_subnets: export_all(&mut stack, "GraphSubnet", graph_subnets)?,
        security_group: stack.export("ModelSecurityGroup", model_sg)?,
    };
    info!(stack = %stack.id, resources = stack.resources().len(), "network group built");

    Ok(Built {
        stack,
        handle,
        alarms: Vec::new(),
    })
}

fn subnet(
    stack: &mut Stack,
    id: &str,
    vpc: &Value,
    cidr: &str,
    zone: &str,
    public: bool,
    ctx: &BuildContext<'_>,
) -> BuildResult<Value> {
    Ok(stack.add(
        id,
        Resource::new(SubnetProperties {
            vpc_id: vpc.clone(),
            cidr_block: cidr.to_string(),
            availability_zone: zone.to_string(),
            map_public_ip_on_launch: public,
            tags: name_tag(ctx.name(id)),
        }),
    )?)
}

fn associate(stack: &mut Stack, subnet_id: &str, subnet: &Value, table: &Value) -> BuildResult<()> {
    stack.add(
        format!("{subnet_id}RouteTableAssociation"),
        Resource::new(SubnetRouteTableAssociationProperties {
            subnet_id: subnet.clone(),
            route_table_id: table.clone(),
        }),
    )?;
    Ok(())
}

fn export_all(stack: &mut Stack, prefix: &str, values: Vec<Value>) -> BuildResult<Vec<Value>> {
    values
        .into_iter()
        .enumerate()
        .map(|(i, v)| Ok(stack.export(format!("{prefix}{i}"), v)?))
        .collect()
}

/// All-traffic flow log into a dedicated log group.
fn flow_log(stack: &mut Stack, ctx: &BuildContext<'_>, vpc: &Value) -> BuildResult<()> {
    let name = ctx.name("FlowLog");
    let log_group = format!("/{}/flow-logs/{name}", ctx.application);
    let role_name = ctx.name("FlowLogRole");
    let arn = ctx.arn();

    stack.add(
        "FlowLogGroup",
        Resource::new(LogGroupProperties {
            log_group_name: log_group.clone(),
            retention_in_days: FLOW_LOG_RETENTION_DAYS,
        }),
    )?;
    stack.add(
        "FlowLogRole",
        Resource::new(IamRoleProperties {
            role_name: Some(role_name.clone()),
            description: Some("Delivers VPC flow logs".to_string()),
            assume_role_policy_document: PolicyDocument::assume_role(Principal::service(
                "vpc-flow-logs.amazonaws.com",
            )),
            managed_policy_arns: Vec::new(),
            policies: vec![InlinePolicy {
                policy_name: "FlowLogDelivery".to_string(),
                policy_document: PolicyDocument::new([Statement::allow(
                    ["logs:CreateLogStream", "logs:PutLogEvents", "logs:DescribeLogStreams"],
                    [format!("{}:*", arn.log_group(&log_group))],
                )]),
            }],
        }),
    )?;
    stack.add(
        "FlowLog",
        Resource::new(FlowLogProperties {
            resource_id: vpc.clone(),
            resource_type: "VPC",
            traffic_type: "ALL",
            log_destination_type: "cloud-watch-logs",
            log_group_name: log_group,
            deliver_logs_permission_arn: arn.role(&role_name),
            tags: vec![Tag::new("Name", &name), Tag::new("Stage", ctx.suffix())],
        })
        .depends_on("FlowLogGroup")
        .depends_on("FlowLogRole"),
    )?;
    debug!(flow_log = %name, "declared flow log");
    Ok(())
}

/// Read-only CloudWatch role for the embedded dashboards account.
fn dashboard_viewer_role(stack: &mut Stack, suffix: &str, account: &str) -> BuildResult<()> {
    stack.add(
        "DashboardViewerRole",
        Resource::new(IamRoleProperties {
            role_name: Some(format!("CloudWatchDashboards-{suffix}")),
            description: Some("Role used for embedded dashboards".to_string()),
            assume_role_policy_document: PolicyDocument::assume_role(Principal::aws(format!(
                "arn:aws:iam::{account}:root"
            ))),
            managed_policy_arns: Vec::new(),
            policies: vec![InlinePolicy {
                policy_name: "CloudWatchAccess".to_string(),
                policy_document: PolicyDocument::new([Statement::allow(DASHBOARD_VIEWER_ACTIONS, ["*"])]),
            }],
        }),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::fixture;
    use scorestack_template::ResourceKind;

    #[test]
    fn boundary_layout() {
        let (table, targets) = fixture();
        let ctx = BuildContext::new(&table, &targets[0]);
        let built = build(&ctx).unwrap();
        let stack = &built.stack;

        assert_eq!(stack.resources_of_type("AWS::EC2::VPC").len(), 1);
        assert_eq!(stack.resources_of_type("AWS::EC2::Subnet").len(), 6);
        assert_eq!(stack.resources_of_type("AWS::EC2::VPCEndpoint").len(), 5);
        assert_eq!(stack.resources_of_type("AWS::EC2::FlowLog").len(), 1);

        let graph_cidrs: Vec<&str> = stack
            .collect(|k| match k {
                ResourceKind::Subnet(p) => Some(p),
                _ => None,
            })
            .into_iter()
            .filter(|s| s.tags[0].value.starts_with("NeptunePrivateSubnet"))
            .map(|s| s.cidr_block.as_str())
            .collect();
        assert_eq!(graph_cidrs, GRAPH_CIDRS);

        assert_eq!(built.handle.vpc_id, Value::import("Network-Devo-eu-west-1-VpcId"));
        assert_eq!(built.handle.graph_subnets.len(), 2);
        assert!(built.alarms.is_empty());
        stack.to_template().unwrap();
    }

    #[test]
    fn dynamodb_endpoint_policy() {
        let (table, targets) = fixture();
        let ctx = BuildContext::new(&table, &targets[0]);
        let built = build(&ctx).unwrap();
        let t = built.stack.to_template().unwrap();
        let statement = &t["Resources"]["DynamoDbEndpoint"]["Properties"]["PolicyDocument"]["Statement"][0];
        assert_eq!(statement["Principal"], "*");
        assert_eq!(statement["Action"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn viewer_role_only_on_production_channel() {
        let (table, targets) = fixture();
        let has_viewer = |i: usize| {
            let ctx = BuildContext::new(&table, &targets[i]);
            build(&ctx).unwrap().stack.resources().contains_key("DashboardViewerRole")
        };
        assert!(has_viewer(0));
        assert!(!has_viewer(1), "experiment channel gets no viewer role");
    }

    #[test]
    fn ticketing_topics_follow_target() {
        let (table, targets) = fixture();
        let devo = build(&BuildContext::new(&table, &targets[0])).unwrap();
        assert!(devo.stack.resources_of_type("AWS::SNS::Topic").is_empty());
        let prod = build(&BuildContext::new(&table, &targets[2])).unwrap();
        assert_eq!(prod.stack.resources_of_type("AWS::SNS::Topic").len(), 2);
    }
}
