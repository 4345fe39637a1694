//! Standard alarm sets for queues, functions and the model endpoint.

use scorestack_core::EventType;
use scorestack_template::resource::ComparisonOperator;
use scorestack_template::{MathExpression, Metric, Statistic};

use crate::alarm::AlarmDef;
use crate::panels::{endpoint_instance_metric, endpoint_metric, function_metric, queue_metric};
use crate::ticketing::Severity;

/// Minimum messages published per period before producers look unhealthy.
pub const MIN_MESSAGES_SENT: f64 = 200.0;
/// Stale visible messages tolerated before consumers look unhealthy.
pub const MAX_STALE_MESSAGES: f64 = 20.0;
pub const MAX_FUNCTION_ERRORS: f64 = 50.0;

/// Three alarms per event queue: producer silence, consumer lag, and any
/// message reaching the dead-letter queue.
pub fn queue_alarms(event: EventType, queue_name: &str, dlq_name: &str) -> Vec<AlarmDef> {
    let base = event.queue_base_name();
    let threshold = event.policy().oldest_message_threshold_secs;

    let sent = AlarmDef::new(
        format!("{base}-NumberOfMessagesSent"),
        queue_metric(queue_name, "NumberOfMessagesSent").statistic(Statistic::Sum),
        ComparisonOperator::LessThanThreshold,
        MIN_MESSAGES_SENT,
        10,
        Severity::Sev3,
    )
    .describe(format!(
        "Messages sent to {queue_name} too low! Please check Publishers' health status"
    ));

    let stale = AlarmDef::new(
        format!("{base}-StaleMessages"),
        MathExpression::new(format!("IF((m1>{threshold}), m2, 0)"))
            .using(
                "m1",
                queue_metric(queue_name, "ApproximateAgeOfOldestMessage").statistic(Statistic::Max),
            )
            .using(
                "m2",
                queue_metric(queue_name, "ApproximateNumberOfMessagesVisible").statistic(Statistic::Max),
            )
            .label("Visible messages older than the age threshold"),
        ComparisonOperator::GreaterThanThreshold,
        MAX_STALE_MESSAGES,
        4,
        Severity::Sev2_5,
    )
    .describe(format!(
        "Messages waiting in {queue_name} for more than {threshold}s too high! Please check Consumers' health status"
    ));

    let dead_letters = AlarmDef::new(
        format!("{}-MessagesVisible", event.dlq_base_name()),
        queue_metric(dlq_name, "ApproximateNumberOfMessagesVisible").statistic(Statistic::Max),
        ComparisonOperator::GreaterThanThreshold,
        0.0,
        1,
        Severity::Sev2_5,
    )
    .describe(format!(
        "Messages visible in {dlq_name} greater than ZERO. Is consumer down?"
    ));

    vec![sent, stale, dead_letters]
}

/// Invocation errors of one stream function.
pub fn function_alarms(base_name: &str, function_name: &str) -> Vec<AlarmDef> {
    vec![
        AlarmDef::new(
            format!("{base_name}-LAMBDA_INVOCATION_ERRORS"),
            function_metric(function_name, "Errors").statistic(Statistic::Sum),
            ComparisonOperator::GreaterThanThreshold,
            MAX_FUNCTION_ERRORS,
            5,
            Severity::Sev2_5,
        )
        .describe(format!("{function_name} invocation errors too high"))
        .not_breaching(),
    ]
}

/// Six SEV3 alarms over the endpoint's latency, utilization and errors.
pub fn endpoint_alarms(base_name: &str, endpoint: &str, variant: &str) -> Vec<AlarmDef> {
    let over = |suffix: &str, metric: Metric, threshold: f64, periods: u32| {
        AlarmDef::new(
            format!("{base_name}-{suffix}SEV3"),
            metric,
            ComparisonOperator::GreaterThanThreshold,
            threshold,
            periods,
            Severity::Sev3,
        )
        .describe(format!("{suffix} of {endpoint} too high"))
    };

    vec![
        over(
            "ModelLatency",
            endpoint_metric(endpoint, variant, "ModelLatency").statistic(Statistic::P90),
            100_000.0,
            3,
        )
        .not_breaching(),
        over(
            "CpuUtilization",
            endpoint_instance_metric(endpoint, variant, "CPUUtilization"),
            160.0,
            3,
        ),
        over(
            "DiskUtilization",
            endpoint_instance_metric(endpoint, variant, "DiskUtilization"),
            80.0,
            3,
        ),
        over(
            "MemoryUtilization",
            endpoint_instance_metric(endpoint, variant, "MemoryUtilization"),
            80.0,
            3,
        ),
        over(
            "Invocation4XXErrors",
            endpoint_metric(endpoint, variant, "Invocation4XXErrors").statistic(Statistic::Sum),
            10.0,
            1,
        )
        .not_breaching(),
        over(
            "Invocation5XXErrors",
            endpoint_metric(endpoint, variant, "Invocation5XXErrors").statistic(Statistic::Sum),
            1.0,
            1,
        )
        .not_breaching(),
    ]
}
