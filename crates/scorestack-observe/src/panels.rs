//! Per-resource dashboards: functions with their queues, the table, and
//! the model endpoint.

use std::time::Duration;

use scorestack_template::{Metric, Statistic, Unit};

use crate::dashboard::{Dashboard, Widget};

pub const LAMBDA: &str = "AWS/Lambda";
pub const SQS: &str = "AWS/SQS";
pub const DYNAMODB: &str = "AWS/DynamoDB";
/// Invocation and latency metrics of hosted endpoints.
pub const SAGEMAKER: &str = "AWS/SageMaker";
/// Instance utilization metrics of hosted endpoints.
pub const SAGEMAKER_INSTANCES: &str = "/aws/sagemaker/Endpoints";

const ONE_MINUTE: Duration = Duration::from_secs(60);

// ── Metric helpers ────────────────────────────────────────────────

pub fn function_metric(function_name: &str, name: &str) -> Metric {
    Metric::new(LAMBDA, name).dimension("FunctionName", function_name)
}

pub fn queue_metric(queue_name: &str, name: &str) -> Metric {
    Metric::new(SQS, name).dimension("QueueName", queue_name)
}

pub fn table_metric(table_name: &str, name: &str) -> Metric {
    Metric::new(DYNAMODB, name).dimension("TableName", table_name)
}

pub fn endpoint_metric(endpoint: &str, variant: &str, name: &str) -> Metric {
    Metric::new(SAGEMAKER, name)
        .dimension("EndpointName", endpoint)
        .dimension("VariantName", variant)
}

/// Instance metrics are utilization percentages.
pub fn endpoint_instance_metric(endpoint: &str, variant: &str, name: &str) -> Metric {
    Metric::new(SAGEMAKER_INSTANCES, name)
        .dimension("EndpointName", endpoint)
        .dimension("VariantName", variant)
        .unit(Unit::Percent)
}

fn percentiles(metric: Metric) -> Vec<Metric> {
    [Statistic::P50, Statistic::P90, Statistic::P99]
        .into_iter()
        .map(|stat| metric.clone().statistic(stat))
        .collect()
}

// ── Dashboards ────────────────────────────────────────────────────

/// One dashboard per stream function, covering the function and the
/// queue pair it drains.
pub fn function_dashboard(name: &str, function_name: &str, queue_name: &str, dlq_name: &str) -> Dashboard {
    let f = |metric: &str| function_metric(function_name, metric);
    let q = |metric: &str| queue_metric(queue_name, metric);
    let sum = |metric: &str| Widget::graph(metric, [q(metric).statistic(Statistic::Sum)]);

    let mut dashboard = Dashboard::new(name);
    dashboard
        .row([
            Widget::graph("Lambda Duration", percentiles(f("Duration"))),
            Widget::graph("Lambda Invocation Errors", [f("Errors").statistic(Statistic::Sum)]),
            Widget::graph("Lambda Throttles", [f("Throttles").statistic(Statistic::Sum)]),
        ])
        .row([
            Widget::graph("Invocations", [f("Invocations").statistic(Statistic::Sum)]),
            Widget::graph(
                "ApproximateAgeOfOldestMessage",
                [q("ApproximateAgeOfOldestMessage").statistic(Statistic::Max)],
            ),
            Widget::graph(
                "DLQ ApproximateAgeOfOldestMessage",
                [queue_metric(dlq_name, "ApproximateAgeOfOldestMessage").statistic(Statistic::Max)],
            ),
        ])
        .row([
            Widget::graph_lr(
                "ApproximateNumberOfMessagesNotVisible",
                [q("ApproximateNumberOfMessagesNotVisible").statistic(Statistic::Max)],
                [q("ApproximateNumberOfMessagesNotVisible").statistic(Statistic::Sum)],
            ),
            Widget::graph_lr(
                "ApproximateNumberOfMessagesVisible",
                [q("ApproximateNumberOfMessagesVisible").statistic(Statistic::Max)],
                [q("ApproximateNumberOfMessagesVisible").statistic(Statistic::Sum)],
            ),
            Widget::graph("SentMessageSize", [q("SentMessageSize").statistic(Statistic::Max)]),
        ])
        .row([
            sum("NumberOfEmptyReceives"),
            sum("NumberOfMessagesDeleted"),
            sum("NumberOfMessagesReceived"),
            sum("NumberOfMessagesSent"),
        ]);
    dashboard
}

/// Capacity, latency and throttling of the feature table.
pub fn table_dashboard(name: &str, table_name: &str) -> Dashboard {
    let t = |metric: &str| table_metric(table_name, metric);
    let capacity = |metric: &str| {
        Widget::graph_lr(
            metric,
            [t(metric).statistic(Statistic::Max), t(metric).statistic(Statistic::Avg)],
            [t(metric).statistic(Statistic::Sum)],
        )
    };
    let latency = |operation: &str| {
        Widget::graph(
            format!("SuccessfulRequestLatency {operation}"),
            [Statistic::P90, Statistic::P99, Statistic::P99_9].map(|stat| {
                t("SuccessfulRequestLatency")
                    .dimension("Operation", operation)
                    .statistic(stat)
            }),
        )
    };
    let throttled = |operation: &str, stat: Statistic| {
        t("ThrottledRequests")
            .dimension("Operation", operation)
            .statistic(stat)
            .period(ONE_MINUTE)
    };

    let mut dashboard = Dashboard::new(name);
    dashboard
        .row([
            capacity("ConsumedReadCapacityUnits"),
            capacity("ConsumedWriteCapacityUnits"),
        ])
        .row([latency("BatchGetItem"), latency("PutItem")])
        .row([Widget::graph_lr(
            "ThrottledRequests",
            [
                throttled("BatchGetItem", Statistic::Sum),
                throttled("BatchGetItem", Statistic::N),
            ],
            [
                throttled("PutItem", Statistic::Sum),
                throttled("PutItem", Statistic::N),
            ],
        )]);
    dashboard
}

/// Utilization, traffic and latency of the hosted model endpoint.
pub fn endpoint_dashboard(name: &str, endpoint: &str, variant: &str) -> Dashboard {
    let e = |metric: &str| endpoint_metric(endpoint, variant, metric);
    let i = |metric: &str| endpoint_instance_metric(endpoint, variant, metric);

    let mut dashboard = Dashboard::new(name);
    dashboard
        .row([
            Widget::graph("CPU Utilization", [i("CPUUtilization")]),
            Widget::graph("Memory Utilization", [i("MemoryUtilization")]),
            Widget::graph("Disk Utilization", [i("DiskUtilization")]),
        ])
        .row([
            Widget::graph("Invocations", [e("Invocations").statistic(Statistic::Sum)]),
            Widget::graph(
                "Invocations Per Instance",
                [e("InvocationsPerInstance").statistic(Statistic::Sum)],
            ),
            Widget::graph(
                "Invocation Errors",
                [
                    e("Invocation4XXErrors").statistic(Statistic::Sum),
                    e("Invocation5XXErrors").statistic(Statistic::Sum),
                ],
            ),
        ])
        .row([
            Widget::graph("Model Latency", percentiles(e("ModelLatency"))),
            Widget::graph("Overhead Latency", percentiles(e("OverheadLatency"))),
        ]);
    dashboard
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(widget: &Widget) -> Vec<&Metric> {
        match widget {
            Widget::Graph { left, right, .. } => left.iter().chain(right).collect(),
            Widget::Alarm { .. } => Vec::new(),
        }
    }

    #[test]
    fn function_dashboard_covers_queue_pair() {
        let d = function_dashboard(
            "IngestEventsLambda-Devo-eu-west-1-Dashboard",
            "IngestEventsLambda-Devo-eu-west-1",
            "IngestOrderEventsQueue-Devo-eu-west-1",
            "IngestOrderEventsQueueDLQ-Devo-eu-west-1",
        );
        assert_eq!(d.rows().len(), 4);
        assert_eq!(d.widget_count(), 13);
        let dlq = d
            .widgets()
            .find(|w| w.title() == "DLQ ApproximateAgeOfOldestMessage")
            .unwrap();
        assert_eq!(
            metrics(dlq)[0].dimensions["QueueName"],
            "IngestOrderEventsQueueDLQ-Devo-eu-west-1"
        );
        assert!(d.rows()[3].iter().all(|w| metrics(w)[0].statistic == Statistic::Sum));
    }

    #[test]
    fn table_throttles_per_minute() {
        let d = table_dashboard("T", "ClickThroughOrdersTable-Prod-eu-west-1");
        let throttled = d.widgets().find(|w| w.title() == "ThrottledRequests").unwrap();
        let ms = metrics(throttled);
        assert_eq!(ms.len(), 4);
        assert!(ms.iter().all(|m| m.period == ONE_MINUTE));
        let latency = d.widgets().find(|w| w.title() == "SuccessfulRequestLatency PutItem").unwrap();
        assert_eq!(metrics(latency)[2].statistic, Statistic::P99_9);
        assert_eq!(metrics(latency)[0].period, Duration::from_secs(300));
    }

    #[test]
    fn endpoint_namespaces() {
        let d = endpoint_dashboard("E", "OrderScoringEndpoint-Prod-eu-west-1", "main");
        let cpu = d.widgets().find(|w| w.title() == "CPU Utilization").unwrap();
        assert_eq!(metrics(cpu)[0].namespace, SAGEMAKER_INSTANCES);
        assert_eq!(metrics(cpu)[0].unit, Some(Unit::Percent));
        let latency = d.widgets().find(|w| w.title() == "Model Latency").unwrap();
        assert_eq!(metrics(latency).len(), 3);
        assert_eq!(metrics(latency)[0].namespace, SAGEMAKER);
        assert_eq!(metrics(latency)[0].dimensions["VariantName"], "main");
    }
}
