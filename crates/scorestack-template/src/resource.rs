//! Provider resource kinds and their properties.
//!
//! Each [`ResourceKind`] variant wraps a property struct whose field names
//! render in the provider's PascalCase. A [`Resource`] pairs a kind with
//! explicit `DependsOn` edges and serializes as
//! `{"Type": ..., "Properties": ..., "DependsOn": [...]}`.

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::metric::{Dimension, MetricDataQuery, MetricSource, Unit, dimensions};
use crate::policy::PolicyDocument;
use crate::value::Value;

macro_rules! resource_kinds {
    ($($variant:ident($props:ident) => $type_name:tt,)*) => {
        /// Every resource type the generator declares.
        #[derive(Debug, Clone, PartialEq, Serialize)]
        #[serde(untagged)]
        pub enum ResourceKind {
            $($variant($props),)*
        }

        impl ResourceKind {
            /// Provider type name, e.g. `AWS::SQS::Queue`.
            pub fn type_name(&self) -> &'static str {
                match self {
                    $(ResourceKind::$variant(_) => $type_name,)*
                }
            }
        }

        $(
            impl From<$props> for ResourceKind {
                fn from(props: $props) -> Self {
                    ResourceKind::$variant(props)
                }
            }
        )*
    };
}

resource_kinds! {
    Vpc(VpcProperties) => "AWS::EC2::VPC",
    Subnet(SubnetProperties) => "AWS::EC2::Subnet",
    InternetGateway(InternetGatewayProperties) => "AWS::EC2::InternetGateway",
    VpcGatewayAttachment(VpcGatewayAttachmentProperties) => "AWS::EC2::VPCGatewayAttachment",
    Eip(EipProperties) => "AWS::EC2::EIP",
    NatGateway(NatGatewayProperties) => "AWS::EC2::NatGateway",
    RouteTable(RouteTableProperties) => "AWS::EC2::RouteTable",
    Route(RouteProperties) => "AWS::EC2::Route",
    SubnetRouteTableAssociation(SubnetRouteTableAssociationProperties) => "AWS::EC2::SubnetRouteTableAssociation",
    VpcEndpoint(VpcEndpointProperties) => "AWS::EC2::VPCEndpoint",
    SecurityGroup(SecurityGroupProperties) => "AWS::EC2::SecurityGroup",
    FlowLog(FlowLogProperties) => "AWS::EC2::FlowLog",
    LogGroup(LogGroupProperties) => "AWS::Logs::LogGroup",
    IamRole(IamRoleProperties) => "AWS::IAM::Role",
    DynamoTable(DynamoTableProperties) => "AWS::DynamoDB::Table",
    GraphSubnetGroup(GraphSubnetGroupProperties) => "AWS::Neptune::DBSubnetGroup",
    GraphCluster(GraphClusterProperties) => "AWS::Neptune::DBCluster",
    GraphInstance(GraphInstanceProperties) => "AWS::Neptune::DBInstance",
    Queue(QueueProperties) => "AWS::SQS::Queue",
    QueuePolicy(QueuePolicyProperties) => "AWS::SQS::QueuePolicy",
    Topic(TopicProperties) => "AWS::SNS::Topic",
    TopicPolicy(TopicPolicyProperties) => "AWS::SNS::TopicPolicy",
    Subscription(SubscriptionProperties) => "AWS::SNS::Subscription",
    EventBus(EventBusProperties) => "AWS::Events::EventBus",
    EventRule(EventRuleProperties) => "AWS::Events::Rule",
    Function(FunctionProperties) => "AWS::Lambda::Function",
    EventSourceMapping(EventSourceMappingProperties) => "AWS::Lambda::EventSourceMapping",
    FunctionPermission(FunctionPermissionProperties) => "AWS::Lambda::Permission",
    Model(ModelProperties) => "AWS::SageMaker::Model",
    EndpointConfig(EndpointConfigProperties) => "AWS::SageMaker::EndpointConfig",
    Endpoint(EndpointProperties) => "AWS::SageMaker::Endpoint",
    ScalableTarget(ScalableTargetProperties) => "AWS::ApplicationAutoScaling::ScalableTarget",
    ScalingPolicy(ScalingPolicyProperties) => "AWS::ApplicationAutoScaling::ScalingPolicy",
    Alarm(AlarmProperties) => "AWS::CloudWatch::Alarm",
    Dashboard(DashboardProperties) => "AWS::CloudWatch::Dashboard",
}

impl ResourceKind {
    /// Explicit physical name, for kinds that carry one.
    pub fn physical_name(&self) -> Option<&str> {
        let name = match self {
            ResourceKind::LogGroup(p) => &p.log_group_name,
            ResourceKind::IamRole(p) => p.role_name.as_ref()?,
            ResourceKind::DynamoTable(p) => &p.table_name,
            ResourceKind::GraphSubnetGroup(p) => &p.db_subnet_group_name,
            ResourceKind::GraphCluster(p) => &p.db_cluster_identifier,
            ResourceKind::GraphInstance(p) => &p.db_instance_identifier,
            ResourceKind::Queue(p) => &p.queue_name,
            ResourceKind::Topic(p) => &p.topic_name,
            ResourceKind::EventBus(p) => &p.name,
            ResourceKind::EventRule(p) => &p.name,
            ResourceKind::Function(p) => &p.function_name,
            ResourceKind::Model(p) => &p.model_name,
            ResourceKind::EndpointConfig(p) => &p.endpoint_config_name,
            ResourceKind::Endpoint(p) => &p.endpoint_name,
            ResourceKind::Alarm(p) => &p.alarm_name,
            ResourceKind::Dashboard(p) => &p.dashboard_name,
            _ => return None,
        };
        Some(name.as_str())
    }
}

/// A declared resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub kind: ResourceKind,
    pub depends_on: Vec<String>,
}

impl Resource {
    pub fn new(kind: impl Into<ResourceKind>) -> Self {
        Self {
            kind: kind.into(),
            depends_on: Vec::new(),
        }
    }

    pub fn depends_on(mut self, logical_id: impl Into<String>) -> Self {
        self.depends_on.push(logical_id.into());
        self
    }

    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }
}

impl Serialize for Resource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("Type", self.kind.type_name())?;
        map.serialize_entry("Properties", &self.kind)?;
        if !self.depends_on.is_empty() {
            map.serialize_entry("DependsOn", &self.depends_on)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

pub fn name_tag(value: impl Into<String>) -> Vec<Tag> {
    vec![Tag::new("Name", value)]
}

// ── Network ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct VpcProperties {
    pub cidr_block: String,
    pub enable_dns_hostnames: bool,
    pub enable_dns_support: bool,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SubnetProperties {
    pub vpc_id: Value,
    pub cidr_block: String,
    pub availability_zone: String,
    pub map_public_ip_on_launch: bool,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InternetGatewayProperties {
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct VpcGatewayAttachmentProperties {
    pub vpc_id: Value,
    pub internet_gateway_id: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EipProperties {
    pub domain: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NatGatewayProperties {
    pub allocation_id: Value,
    pub subnet_id: Value,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RouteTableProperties {
    pub vpc_id: Value,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RouteProperties {
    pub route_table_id: Value,
    pub destination_cidr_block: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nat_gateway_id: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SubnetRouteTableAssociationProperties {
    pub subnet_id: Value,
    pub route_table_id: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EndpointType {
    Gateway,
    Interface,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct VpcEndpointProperties {
    pub vpc_id: Value,
    pub service_name: String,
    pub vpc_endpoint_type: EndpointType,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub route_table_ids: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subnet_ids: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security_group_ids: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_dns_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_document: Option<PolicyDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityGroupRule {
    pub ip_protocol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_port: Option<u16>,
    pub cidr_ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SecurityGroupRule {
    /// All protocols, all ports.
    pub fn all_traffic(cidr: impl Into<String>) -> Self {
        Self {
            ip_protocol: "-1".to_string(),
            from_port: None,
            to_port: None,
            cidr_ip: cidr.into(),
            description: None,
        }
    }

    pub fn tcp(port: u16, cidr: impl Into<String>) -> Self {
        Self {
            ip_protocol: "tcp".to_string(),
            from_port: Some(port),
            to_port: Some(port),
            cidr_ip: cidr.into(),
            description: None,
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityGroupProperties {
    pub group_description: String,
    pub vpc_id: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security_group_ingress: Vec<SecurityGroupRule>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security_group_egress: Vec<SecurityGroupRule>,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FlowLogProperties {
    pub resource_id: Value,
    pub resource_type: &'static str,
    pub traffic_type: &'static str,
    pub log_destination_type: &'static str,
    pub log_group_name: String,
    pub deliver_logs_permission_arn: String,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogGroupProperties {
    pub log_group_name: String,
    pub retention_in_days: u32,
}

// ── IAM ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InlinePolicy {
    pub policy_name: String,
    pub policy_document: PolicyDocument,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct IamRoleProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub assume_role_policy_document: PolicyDocument,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub managed_policy_arns: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<InlinePolicy>,
}

impl IamRoleProperties {
    /// Inline policy documents in declaration order.
    pub fn inline_documents(&self) -> impl Iterator<Item = &PolicyDocument> {
        self.policies.iter().map(|p| &p.policy_document)
    }
}

// ── Storage ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttributeDefinition {
    pub attribute_name: String,
    pub attribute_type: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeySchemaElement {
    pub attribute_name: String,
    pub key_type: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TimeToLive {
    pub attribute_name: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PointInTimeRecovery {
    pub point_in_time_recovery_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SseSpecification {
    #[serde(rename = "SSEEnabled")]
    pub sse_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DynamoTableProperties {
    pub table_name: String,
    pub attribute_definitions: Vec<AttributeDefinition>,
    pub key_schema: Vec<KeySchemaElement>,
    pub billing_mode: &'static str,
    pub time_to_live_specification: TimeToLive,
    pub point_in_time_recovery_specification: PointInTimeRecovery,
    #[serde(rename = "SSESpecification")]
    pub sse_specification: SseSpecification,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphSubnetGroupProperties {
    #[serde(rename = "DBSubnetGroupName")]
    pub db_subnet_group_name: String,
    #[serde(rename = "DBSubnetGroupDescription")]
    pub db_subnet_group_description: String,
    #[serde(rename = "SubnetIds")]
    pub subnet_ids: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphClusterProperties {
    #[serde(rename = "DBClusterIdentifier")]
    pub db_cluster_identifier: String,
    #[serde(rename = "DBSubnetGroupName")]
    pub db_subnet_group_name: Value,
    #[serde(rename = "VpcSecurityGroupIds")]
    pub vpc_security_group_ids: Vec<Value>,
    #[serde(rename = "IamAuthEnabled")]
    pub iam_auth_enabled: bool,
    #[serde(rename = "StorageEncrypted")]
    pub storage_encrypted: bool,
    #[serde(rename = "Port")]
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphInstanceProperties {
    #[serde(rename = "DBInstanceIdentifier")]
    pub db_instance_identifier: String,
    #[serde(rename = "DBInstanceClass")]
    pub db_instance_class: String,
    #[serde(rename = "DBClusterIdentifier")]
    pub db_cluster_identifier: Value,
}

// ── Messaging ─────────────────────────────────────────────────────

/// Dead-letter redrive. The provider expects camelCase keys here.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedrivePolicy {
    pub dead_letter_target_arn: String,
    pub max_receive_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueueProperties {
    pub queue_name: String,
    pub visibility_timeout: u64,
    pub message_retention_period: u64,
    pub delay_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redrive_policy: Option<RedrivePolicy>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueuePolicyProperties {
    pub queues: Vec<String>,
    pub policy_document: PolicyDocument,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TopicProperties {
    pub topic_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TopicPolicyProperties {
    pub topics: Vec<String>,
    pub policy_document: PolicyDocument,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SubscriptionProperties {
    pub topic_arn: String,
    pub protocol: &'static str,
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_message_delivery: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EventBusProperties {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RuleTarget {
    pub id: String,
    pub arn: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EventRuleProperties {
    pub name: String,
    pub description: String,
    pub event_bus_name: String,
    pub event_pattern: serde_json::Value,
    pub targets: Vec<RuleTarget>,
}

// ── Compute ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageCode {
    pub image_uri: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageConfig {
    pub command: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FunctionEnvironment {
    pub variables: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct VpcConfig {
    pub subnet_ids: Vec<Value>,
    pub security_group_ids: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FunctionProperties {
    pub function_name: String,
    pub description: String,
    pub package_type: &'static str,
    pub code: ImageCode,
    pub image_config: ImageConfig,
    pub role: String,
    pub memory_size: u32,
    /// Seconds.
    pub timeout: u64,
    pub reserved_concurrent_executions: u32,
    pub environment: FunctionEnvironment,
    pub vpc_config: VpcConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EventSourceMappingProperties {
    pub event_source_arn: String,
    pub function_name: String,
    pub enabled: bool,
    pub batch_size: u32,
    pub maximum_batching_window_in_seconds: u64,
    pub function_response_types: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FunctionPermissionProperties {
    pub action: &'static str,
    pub function_name: String,
    pub principal: String,
}

// ── Model hosting ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerDefinition {
    pub image: String,
    pub model_data_url: String,
    pub environment: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModelVpcConfig {
    pub subnets: Vec<Value>,
    pub security_group_ids: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModelProperties {
    pub model_name: String,
    pub execution_role_arn: String,
    pub primary_container: ContainerDefinition,
    pub vpc_config: ModelVpcConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProductionVariant {
    pub variant_name: String,
    pub model_name: String,
    pub instance_type: String,
    pub initial_instance_count: u32,
    pub initial_variant_weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EndpointConfigProperties {
    pub endpoint_config_name: String,
    pub production_variants: Vec<ProductionVariant>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EndpointProperties {
    pub endpoint_name: String,
    pub endpoint_config_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScalableTargetProperties {
    pub service_namespace: &'static str,
    pub resource_id: String,
    pub scalable_dimension: &'static str,
    pub min_capacity: u32,
    pub max_capacity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PredefinedMetric {
    pub predefined_metric_type: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TargetTracking {
    pub target_value: f64,
    pub predefined_metric_specification: PredefinedMetric,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScalingPolicyProperties {
    pub policy_name: String,
    pub policy_type: &'static str,
    pub scaling_target_id: Value,
    pub target_tracking_scaling_policy_configuration: TargetTracking,
}

// ── Observability ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ComparisonOperator {
    GreaterThanThreshold,
    GreaterThanOrEqualToThreshold,
    LessThanThreshold,
    LessThanOrEqualToThreshold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TreatMissingData {
    Breaching,
    NotBreaching,
    Ignore,
    Missing,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AlarmProperties {
    pub alarm_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alarm_description: Option<String>,
    pub comparison_operator: ComparisonOperator,
    pub threshold: f64,
    pub evaluation_periods: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datapoints_to_alarm: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub treat_missing_data: Option<TreatMissingData>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alarm_actions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric_name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dimensions: Vec<Dimension>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extended_statistic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub metrics: Vec<MetricDataQuery>,
}

impl AlarmProperties {
    /// Alarm over a metric or expression. Plain metrics render inline;
    /// expressions render as a `Metrics` query list.
    pub fn new(
        alarm_name: impl Into<String>,
        source: &MetricSource,
        comparison_operator: ComparisonOperator,
        threshold: f64,
        evaluation_periods: u32,
    ) -> Self {
        let mut props = Self {
            alarm_name: alarm_name.into(),
            alarm_description: None,
            comparison_operator,
            threshold,
            evaluation_periods,
            datapoints_to_alarm: None,
            treat_missing_data: None,
            alarm_actions: Vec::new(),
            namespace: None,
            metric_name: None,
            dimensions: Vec::new(),
            statistic: None,
            extended_statistic: None,
            period: None,
            unit: None,
            metrics: Vec::new(),
        };
        match source {
            MetricSource::Metric(m) => {
                props.namespace = Some(m.namespace.clone());
                props.metric_name = Some(m.name.clone());
                props.dimensions = dimensions(&m.dimensions);
                if m.statistic.is_extended() {
                    props.extended_statistic = Some(m.statistic.as_str().to_string());
                } else {
                    props.statistic = Some(m.statistic.as_str().to_string());
                }
                props.period = Some(m.period_secs());
                props.unit = m.unit;
            }
            MetricSource::Expression(e) => props.metrics = e.to_queries(),
        }
        props
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.alarm_description = Some(description.into());
        self
    }

    pub fn datapoints_to_alarm(mut self, datapoints: Option<u32>) -> Self {
        self.datapoints_to_alarm = datapoints;
        self
    }

    pub fn treat_missing_data(mut self, treatment: TreatMissingData) -> Self {
        self.treat_missing_data = Some(treatment);
        self
    }

    pub fn action(mut self, arn: impl Into<String>) -> Self {
        self.alarm_actions.push(arn.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DashboardProperties {
    pub dashboard_name: String,
    /// Rendered widget JSON.
    pub dashboard_body: String,
}
