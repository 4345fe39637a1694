//! Messaging: one queue pair per event type, the trigger and scores
//! topics, and the click-through event bus.

use scorestack_core::EventType;
use scorestack_observe::catalog::LAMBDA_NAMESPACE;
use scorestack_observe::{panels, sets};
use scorestack_template::resource::{
    EventBusProperties, EventRuleProperties, QueuePolicyProperties, QueueProperties, RedrivePolicy,
    RuleTarget, SubscriptionProperties, TopicPolicyProperties, TopicProperties,
};
use scorestack_template::{PolicyDocument, Principal, Resource, Stack, Statement};
use serde_json::json;
use tracing::{debug, info};

use crate::context::{BuildContext, Built, StackKind};
use crate::error::BuildResult;
use crate::network::NetworkHandle;

pub const TRIGGER_TOPIC: &str = "OrderTriggerEventsTopic";
pub const SCORES_TOPIC: &str = "RealtimeOrderScoresTopic";
pub const EVENT_BUS: &str = "ClickThroughEventsBus";
const EVENT_RULE: &str = "ClickThroughEventsRule";
/// Session name the hosting service uses when assuming the model role.
const MODEL_SESSION: &str = "SageMaker";

/// A primary queue and its dead-letter queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuePair {
    pub event: EventType,
    pub name: String,
    pub arn: String,
    pub url: String,
    pub dlq_name: String,
    pub dlq_arn: String,
    pub dlq_url: String,
}

impl QueuePair {
    /// Names and ARNs are fixed by the event type and the target.
    pub fn new(ctx: &BuildContext<'_>, event: EventType) -> Self {
        let arn = ctx.arn();
        let name = ctx.name(event.queue_base_name());
        let dlq_name = ctx.name(event.dlq_base_name());
        Self {
            event,
            arn: arn.queue(&name),
            url: arn.queue_url(&name),
            dlq_arn: arn.queue(&dlq_name),
            dlq_url: arn.queue_url(&dlq_name),
            name,
            dlq_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagingHandle {
    pub stack_id: String,
    pub ingest: QueuePair,
    pub inference: QueuePair,
    pub click_through: QueuePair,
    pub trigger_topic_arn: String,
    pub scores_topic_name: String,
    pub scores_topic_arn: String,
    pub event_bus_name: String,
}

impl MessagingHandle {
    pub fn queue(&self, event: EventType) -> &QueuePair {
        match event {
            EventType::Ingest => &self.ingest,
            EventType::Inference => &self.inference,
            EventType::ClickThrough => &self.click_through,
        }
    }

    pub fn queues(&self) -> [&QueuePair; 3] {
        [&self.ingest, &self.inference, &self.click_through]
    }
}

/// `model_role_name` is the hosting execution role allowed to publish
/// trigger events; it is computed, so messaging never waits on hosting.
pub fn build(
    ctx: &BuildContext<'_>,
    network: &NetworkHandle,
    model_role_name: &str,
) -> BuildResult<Built<MessagingHandle>> {
    let mut stack = ctx.stack(StackKind::Messaging);
    stack.add_dependency(&network.stack_id)?;
    let arn = ctx.arn();

    let pairs = EventType::ALL.map(|event| QueuePair::new(ctx, event));
    for pair in &pairs {
        queue_pair(&mut stack, ctx, pair)?;
    }
    let [ingest, inference, click_through] = pairs;

    // Trigger topic: the model publishes, every primary queue receives.
    let trigger_name = ctx.name(TRIGGER_TOPIC);
    let trigger_arn = arn.topic(&trigger_name);
    stack.add(
        TRIGGER_TOPIC,
        Resource::new(TopicProperties {
            topic_name: trigger_name.clone(),
            display_name: None,
            tags: Vec::new(),
        }),
    )?;
    stack.add(
        format!("{TRIGGER_TOPIC}Policy"),
        Resource::new(TopicPolicyProperties {
            topics: vec![trigger_arn.clone()],
            policy_document: PolicyDocument::new([Statement::allow(["sns:Publish"], [trigger_arn.as_str()])
                .with_sid("ModelToTriggerTopicPublish")
                .with_principal(Principal::aws(arn.assumed_role(model_role_name, MODEL_SESSION)))]),
        })
        .depends_on(TRIGGER_TOPIC),
    )?;

    let event_bus_name = ctx.name(EVENT_BUS);
    let rule_name = ctx.name(EVENT_RULE);
    let rule_arn = format!(
        "arn:aws:events:{}:{}:rule/{event_bus_name}/{rule_name}",
        ctx.target.region, ctx.target.account_id
    );

    for pair in [&ingest, &inference, &click_through] {
        let base = pair.event.queue_base_name();
        stack.add(
            format!("{base}TriggerSubscription"),
            Resource::new(SubscriptionProperties {
                topic_arn: trigger_arn.clone(),
                protocol: "sqs",
                endpoint: pair.arn.clone(),
                raw_message_delivery: Some(true),
            })
            .depends_on(TRIGGER_TOPIC)
            .depends_on(base),
        )?;

        let mut statements = vec![
            Statement::allow(["sqs:SendMessage"], [pair.arn.as_str()])
                .with_sid("TriggerTopicSend")
                .with_principal(Principal::service("sns.amazonaws.com"))
                .from_source(trigger_arn.clone()),
        ];
        if pair.event == EventType::ClickThrough {
            statements.push(
                Statement::allow(["sqs:SendMessage"], [pair.arn.as_str()])
                    .with_sid("EventRuleSend")
                    .with_principal(Principal::service("events.amazonaws.com"))
                    .from_source(rule_arn.clone()),
            );
        }
        stack.add(
            format!("{base}Policy"),
            Resource::new(QueuePolicyProperties {
                queues: vec![pair.url.clone()],
                policy_document: PolicyDocument::new(statements),
            })
            .depends_on(base),
        )?;
    }

    let scores_topic_name = ctx.name(SCORES_TOPIC);
    stack.add(
        SCORES_TOPIC,
        Resource::new(TopicProperties {
            topic_name: scores_topic_name.clone(),
            display_name: None,
            tags: Vec::new(),
        }),
    )?;

    // Click-through events from the functions' namespaces land in the
    // click-through queue.
    stack.add(
        EVENT_BUS,
        Resource::new(EventBusProperties {
            name: event_bus_name.clone(),
        }),
    )?;
    stack.add(
        EVENT_RULE,
        Resource::new(EventRuleProperties {
            name: rule_name,
            description: "Forward click-through events to the click-through queue".to_string(),
            event_bus_name: event_bus_name.clone(),
            event_pattern: json!({ "source": [panels::LAMBDA, LAMBDA_NAMESPACE] }),
            targets: vec![RuleTarget {
                id: "ClickThroughQueue".to_string(),
                arn: click_through.arn.clone(),
            }],
        })
        .depends_on(EVENT_BUS)
        .depends_on(EventType::ClickThrough.queue_base_name()),
    )?;

    let mut alarms = Vec::new();
    for pair in [&ingest, &inference, &click_through] {
        alarms.extend(ctx.declare_alarms(&mut stack, sets::queue_alarms(pair.event, &pair.name, &pair.dlq_name))?);
    }

    let handle = MessagingHandle {
        stack_id: stack.id.clone(),
        ingest,
        inference,
        click_through,
        trigger_topic_arn: trigger_arn,
        scores_topic_arn: arn.topic(&scores_topic_name),
        scores_topic_name,
        event_bus_name,
    };
    info!(stack = %stack.id, alarms = alarms.len(), "messaging group built");

    Ok(Built { stack, handle, alarms })
}

/// Dead-letter queue first, then the primary queue redriving into it.
fn queue_pair(stack: &mut Stack, ctx: &BuildContext<'_>, pair: &QueuePair) -> BuildResult<()> {
    let policy = pair.event.policy();
    let tuning = ctx.target.queue_tuning(pair.event)?;

    stack.add(
        pair.event.dlq_base_name(),
        Resource::new(QueueProperties {
            queue_name: pair.dlq_name.clone(),
            visibility_timeout: policy.visibility_timeout.as_secs(),
            message_retention_period: policy.dlq_retention_period.as_secs(),
            delay_seconds: 0,
            redrive_policy: None,
        }),
    )?;
    stack.add(
        pair.event.queue_base_name(),
        Resource::new(QueueProperties {
            queue_name: pair.name.clone(),
            visibility_timeout: policy.visibility_timeout.as_secs(),
            message_retention_period: policy.retention_period.as_secs(),
            delay_seconds: tuning.delivery_delay.as_secs(),
            redrive_policy: Some(RedrivePolicy {
                dead_letter_target_arn: pair.dlq_arn.clone(),
                max_receive_count: policy.max_receive_count,
            }),
        })
        .depends_on(pair.event.dlq_base_name()),
    )?;
    debug!(queue = %pair.name, event = %pair.event, "declared queue pair");
    Ok(())
}
