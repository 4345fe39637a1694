//! Durable store: the click-through feature table and the graph cluster.

use scorestack_observe::panels;
use scorestack_template::resource::{
    AttributeDefinition, DynamoTableProperties, GraphClusterProperties, GraphInstanceProperties,
    GraphSubnetGroupProperties, KeySchemaElement, PointInTimeRecovery, SseSpecification, TimeToLive,
};
use scorestack_template::{Resource, Value};
use tracing::info;

use crate::context::{BuildContext, Built, StackKind};
use crate::error::BuildResult;
use crate::network::NetworkHandle;

pub const TABLE_BASE_NAME: &str = "ClickThroughOrdersTable";
pub const PARTITION_KEY: &str = "orderId";
pub const TTL_ATTRIBUTE: &str = "expiresAt";
pub const GRAPH_PORT: u16 = 8182;
const GRAPH_INSTANCE_CLASS: &str = "db.r5.large";

#[derive(Debug, Clone, PartialEq)]
pub struct StoreHandle {
    pub stack_id: String,
    pub table_name: String,
    pub table_arn: String,
    /// Cluster attributes are only known once deployed, so they travel as
    /// imports.
    pub graph_endpoint: Value,
    pub graph_read_endpoint: Value,
    pub graph_port: Value,
    pub graph_resource_id: Value,
}

pub fn build(ctx: &BuildContext<'_>, network: &NetworkHandle) -> BuildResult<Built<StoreHandle>> {
    let mut stack = ctx.stack(StackKind::Store);
    stack.add_dependency(&network.stack_id)?;

    let table_name = ctx.name(TABLE_BASE_NAME);
    stack.add(
        TABLE_BASE_NAME,
        Resource::new(DynamoTableProperties {
            table_name: table_name.clone(),
            attribute_definitions: vec![AttributeDefinition {
                attribute_name: PARTITION_KEY.to_string(),
                attribute_type: "S",
            }],
            key_schema: vec![KeySchemaElement {
                attribute_name: PARTITION_KEY.to_string(),
                key_type: "HASH",
            }],
            billing_mode: "PAY_PER_REQUEST",
            time_to_live_specification: TimeToLive {
                attribute_name: TTL_ATTRIBUTE.to_string(),
                enabled: true,
            },
            point_in_time_recovery_specification: PointInTimeRecovery {
                point_in_time_recovery_enabled: true,
            },
            sse_specification: SseSpecification { sse_enabled: true },
        }),
    )?;

    // Identifiers are lower-cased by the provider; declare them that way.
    let graph_name = ctx.name("order-graph").to_lowercase();
    let subnet_group = stack.add(
        "GraphSubnetGroup",
        Resource::new(GraphSubnetGroupProperties {
            db_subnet_group_name: format!("{graph_name}-subnets"),
            db_subnet_group_description: "Graph cluster subnets".to_string(),
            subnet_ids: network.graph_subnets.clone(),
        }),
    )?;
    let cluster = stack.add(
        "GraphCluster",
        Resource::new(GraphClusterProperties {
            db_cluster_identifier: graph_name.clone(),
            db_subnet_group_name: subnet_group,
            vpc_security_group_ids: vec![network.security_group.clone()],
            iam_auth_enabled: true,
            storage_encrypted: true,
            port: GRAPH_PORT,
        }),
    )?;
    stack.add(
        "GraphInstance0",
        Resource::new(GraphInstanceProperties {
            db_instance_identifier: format!("{graph_name}-0"),
            db_instance_class: GRAPH_INSTANCE_CLASS.to_string(),
            db_cluster_identifier: cluster,
        }),
    )?;

    let dashboard = panels::table_dashboard(&ctx.name("DynamoDB-Dashboard"), &table_name);
    dashboard.declare(&mut stack)?;

    let handle = StoreHandle {
        stack_id: stack.id.clone(),
        table_arn: ctx.arn().table(&table_name),
        table_name,
        graph_endpoint: stack.export("GraphEndpoint", Value::get_att("GraphCluster", "Endpoint"))?,
        graph_read_endpoint: stack.export("GraphReadEndpoint", Value::get_att("GraphCluster", "ReadEndpoint"))?,
        graph_port: stack.export("GraphPort", Value::get_att("GraphCluster", "Port"))?,
        graph_resource_id: stack.export("GraphResourceId", Value::get_att("GraphCluster", "ClusterResourceId"))?,
    };
    info!(stack = %stack.id, table = %handle.table_name, "store group built");

    Ok(Built {
        stack,
        handle,
        alarms: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::fixture;
    use crate::network;

    #[test]
    fn table_and_cluster() {
        let (table, targets) = fixture();
        let ctx = BuildContext::new(&table, &targets[2]);
        let net = network::build(&ctx).unwrap();
        let built = build(&ctx, &net.handle).unwrap();

        assert_eq!(built.handle.table_name, "ClickThroughOrdersTable-Prod-eu-west-1");
        assert!(built.stack.dependencies().contains("Network-Prod-eu-west-1"));

        let t = built.stack.to_template().unwrap();
        let props = &t["Resources"]["ClickThroughOrdersTable"]["Properties"];
        assert_eq!(props["KeySchema"][0]["AttributeName"], "orderId");
        assert_eq!(props["TimeToLiveSpecification"]["AttributeName"], "expiresAt");
        assert_eq!(props["PointInTimeRecoverySpecification"]["PointInTimeRecoveryEnabled"], true);
        assert_eq!(props["BillingMode"], "PAY_PER_REQUEST");

        let cluster = &t["Resources"]["GraphCluster"]["Properties"];
        assert_eq!(cluster["IamAuthEnabled"], true);
        assert_eq!(cluster["DBClusterIdentifier"], "order-graph-prod-eu-west-1");
        assert_eq!(
            t["Resources"]["GraphSubnetGroup"]["Properties"]["SubnetIds"][0]["Fn::ImportValue"],
            "Network-Prod-eu-west-1-GraphSubnet0"
        );
        assert_eq!(t["Outputs"].as_object().unwrap().len(), 4);
    }

    #[test]
    fn store_declares_no_alarms() {
        let (table, targets) = fixture();
        let ctx = BuildContext::new(&table, &targets[2]);
        let net = network::build(&ctx).unwrap();
        let built = build(&ctx, &net.handle).unwrap();
        assert!(built.alarms.is_empty());
        assert_eq!(built.stack.resources_of_type("AWS::CloudWatch::Dashboard").len(), 1);
    }
}
