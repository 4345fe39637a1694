//! Shared types used across scorestack crates.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::naming;

// ── Event types and their queue policy ─────────────────────────────

/// Logical event type carried by one primary/dead-letter queue pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventType {
    Ingest,
    Inference,
    ClickThrough,
}

impl EventType {
    pub const ALL: [EventType; 3] = [EventType::Ingest, EventType::Inference, EventType::ClickThrough];

    /// Base name of the primary queue.
    pub fn queue_base_name(self) -> &'static str {
        match self {
            EventType::Ingest => "IngestOrderEventsQueue",
            EventType::Inference => "InferenceOrderEventsQueue",
            EventType::ClickThrough => "ClickThroughEventsQueue",
        }
    }

    /// Base name of the dead-letter queue.
    pub fn dlq_base_name(self) -> &'static str {
        match self {
            EventType::Ingest => "IngestOrderEventsQueueDLQ",
            EventType::Inference => "InferenceOrderEventsQueueDLQ",
            EventType::ClickThrough => "ClickThroughEventsQueueDLQ",
        }
    }

    /// Fixed redrive and visibility policy for this event type.
    ///
    /// Ingestion retries more at a shorter visibility; inference retries
    /// less at a longer visibility to cover heavier processing.
    pub fn policy(self) -> QueuePolicy {
        match self {
            EventType::Ingest | EventType::ClickThrough => QueuePolicy {
                visibility_timeout: Duration::from_secs(1000),
                max_receive_count: 5,
                retention_period: Duration::from_secs(14 * 86_400),
                dlq_retention_period: Duration::from_secs(14 * 86_400),
                oldest_message_threshold_secs: 2000,
            },
            EventType::Inference => QueuePolicy {
                visibility_timeout: Duration::from_secs(20 * 60),
                max_receive_count: 3,
                retention_period: Duration::from_secs(7 * 86_400),
                dlq_retention_period: Duration::from_secs(14 * 86_400),
                oldest_message_threshold_secs: 1000,
            },
        }
    }

    /// Key used for this event type in the stage table.
    pub fn key(self) -> &'static str {
        match self {
            EventType::Ingest => "ingest",
            EventType::Inference => "inference",
            EventType::ClickThrough => "click-through",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.key() == key)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Redrive and retention constants for one event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuePolicy {
    pub visibility_timeout: Duration,
    pub max_receive_count: u32,
    pub retention_period: Duration,
    pub dlq_retention_period: Duration,
    /// Age (seconds) beyond which visible messages count towards the
    /// consumer-health alarm.
    pub oldest_message_threshold_secs: u64,
}

// ── Functions ─────────────────────────────────────────────────────

/// Serverless function handlers bound to the event queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FunctionKind {
    #[serde(rename = "IngestEventsLambda")]
    Ingest,
    #[serde(rename = "InferenceEventsLambda")]
    Inference,
    #[serde(rename = "ClickThroughLambda")]
    ClickThrough,
}

impl FunctionKind {
    pub const ALL: [FunctionKind; 3] = [FunctionKind::Ingest, FunctionKind::Inference, FunctionKind::ClickThrough];

    pub fn base_name(self) -> &'static str {
        match self {
            FunctionKind::Ingest => "IngestEventsLambda",
            FunctionKind::Inference => "InferenceEventsLambda",
            FunctionKind::ClickThrough => "ClickThroughLambda",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.base_name() == name)
    }

    /// The queue this function drains.
    pub fn event_source(self) -> EventType {
        match self {
            FunctionKind::Ingest => EventType::Ingest,
            FunctionKind::Inference => EventType::Inference,
            FunctionKind::ClickThrough => EventType::ClickThrough,
        }
    }

    /// Reserved concurrency cap.
    pub fn reserved_concurrency(self) -> u32 {
        match self {
            FunctionKind::Inference => 100,
            FunctionKind::Ingest | FunctionKind::ClickThrough => 1,
        }
    }
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.base_name())
    }
}

// ── Per-stage tuning ──────────────────────────────────────────────

/// Deployment channel of a target. Selects the code image family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    #[default]
    Production,
    Experiment,
}

/// Per-queue tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueueTuning {
    #[serde(with = "humantime_serde")]
    pub delivery_delay: Duration,
}

/// Per-function batching knobs for the queue event-source mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchTuning {
    pub batch_size: u32,
    #[serde(with = "humantime_serde")]
    pub max_batching_window: Duration,
}

/// Approval-step switches for a deployment group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApprovalConfig {
    #[serde(default)]
    pub run_integration_tests: bool,
}

/// Owning team, threaded into the alarm ticketing side effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TeamContact {
    pub alias: String,
    pub cti: String,
    pub resolver_group: String,
    pub runbook_url: String,
    /// HTTPS endpoint receiving ticket notifications.
    pub ticketing_endpoint: String,
    /// Account hosting embedded dashboards; gets a read-only viewer role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboards_account: Option<String>,
}

/// Container image coordinates for functions and the hosted model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArtifactConfig {
    pub stream_repository: String,
    pub experiment_repository: String,
    pub model_repository: String,
    pub tag: String,
    /// Model archive location, e.g. "s3://bucket/OrderScoringModel/20220125.tar.gz".
    pub model_data_url: String,
}

impl ArtifactConfig {
    /// ECR image URI in the target's own account and region.
    pub fn image_uri(&self, repository: &str, account_id: &str, region: &str) -> String {
        format!("{account_id}.dkr.ecr.{region}.amazonaws.com/{repository}:{}", self.tag)
    }
}

// ── Deployment target ─────────────────────────────────────────────

/// One account + region + stage unit for which a full resource graph
/// is built. Immutable once flattened out of the stage table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentTarget {
    pub account_id: String,
    pub region: String,
    pub stage_name: String,
    pub is_production: bool,
    pub setup_alarms: bool,
    pub channel: Channel,
    pub queue_config: BTreeMap<EventType, QueueTuning>,
    pub compute_config: BTreeMap<FunctionKind, BatchTuning>,
    pub approval: ApprovalConfig,
    pub enable_ticketing: bool,
    pub deploy_model_hosting: bool,
}

impl DeploymentTarget {
    /// Resource-naming suffix, unique per table: `{stage}-{region}`.
    pub fn suffix(&self) -> String {
        format!("{}-{}", self.stage_name, self.region)
    }

    /// `{base}-{stage}-{region}`.
    pub fn name(&self, base: &str) -> String {
        naming::join(base, &self.suffix())
    }

    /// Tickets are cut only for production stages that opted in.
    pub fn ticketing_enabled(&self) -> bool {
        self.is_production && self.enable_ticketing
    }

    /// Batch tuning for a function. There is no fallback default.
    pub fn batch_tuning(&self, function: FunctionKind) -> ConfigResult<&BatchTuning> {
        self.compute_config
            .get(&function)
            .ok_or_else(|| ConfigError::MissingBatchTuning {
                stage: self.stage_name.clone(),
                function,
            })
    }

    pub fn queue_tuning(&self, event: EventType) -> ConfigResult<&QueueTuning> {
        self.queue_config
            .get(&event)
            .ok_or_else(|| ConfigError::MissingQueueTuning {
                stage: self.stage_name.clone(),
                queue: event,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(stage: &str, production: bool, ticketing: bool) -> DeploymentTarget {
        DeploymentTarget {
            account_id: "111122223333".to_string(),
            region: "eu-west-1".to_string(),
            stage_name: stage.to_string(),
            is_production: production,
            setup_alarms: production,
            channel: Channel::Production,
            queue_config: BTreeMap::new(),
            compute_config: BTreeMap::new(),
            approval: ApprovalConfig::default(),
            enable_ticketing: ticketing,
            deploy_model_hosting: true,
        }
    }

    #[test]
    fn queue_policy_table() {
        let ingest = EventType::Ingest.policy();
        assert_eq!(ingest.max_receive_count, 5);
        assert_eq!(ingest.visibility_timeout, Duration::from_secs(1000));

        let inference = EventType::Inference.policy();
        assert_eq!(inference.max_receive_count, 3);
        assert_eq!(inference.visibility_timeout, Duration::from_secs(1200));

        let ct = EventType::ClickThrough.policy();
        assert_eq!(ct.max_receive_count, 5);
        assert_eq!(ct.visibility_timeout, Duration::from_secs(1000));
    }

    #[test]
    fn suffix_and_names() {
        let t = target("Prod", true, true);
        assert_eq!(t.suffix(), "Prod-eu-west-1");
        assert_eq!(t.name("ClickThroughEventsQueue"), "ClickThroughEventsQueue-Prod-eu-west-1");
    }

    #[test]
    fn ticketing_requires_production() {
        assert!(target("Prod", true, true).ticketing_enabled());
        assert!(!target("Prod", true, false).ticketing_enabled());
        assert!(!target("Devo", false, true).ticketing_enabled());
    }

    #[test]
    fn missing_batch_tuning_is_an_error() {
        let t = target("Devo", false, false);
        let err = t.batch_tuning(FunctionKind::Inference).unwrap_err();
        assert!(err.to_string().contains("InferenceEventsLambda"));
    }

    #[test]
    fn event_type_keys() {
        assert_eq!(EventType::ClickThrough.to_string(), "click-through");
        assert_eq!(EventType::from_key("inference"), Some(EventType::Inference));
        assert_eq!(EventType::from_key("clickthrough"), None);
        assert_eq!(FunctionKind::from_name("ClickThroughLambda"), Some(FunctionKind::ClickThrough));
        assert_eq!(FunctionKind::Ingest.event_source(), EventType::Ingest);
        assert_eq!(FunctionKind::Inference.reserved_concurrency(), 100);
    }
}
