//! Alarm severity and the ticketing side effect.
//!
//! Ticketing is an alarm action: each severity gets a notification topic
//! tagged with the owning team's routing data, subscribed to the team's
//! ticketing endpoint. Alarms publish to the topic of their severity.
//! Everything here is computed from the deployment target and the
//! [`TeamContact`] passed in; nothing is global.

use std::fmt;

use scorestack_core::{Arn, DeploymentTarget, TeamContact};
use scorestack_template::resource::{SubscriptionProperties, Tag, TopicProperties};
use scorestack_template::{Resource, Stack, TemplateResult, logical_id};
use serde::Serialize;
use tracing::debug;

/// Ticket severity cut when an alarm fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Dashboard only; no ticket.
    None,
    Sev2_5,
    Sev3,
}

impl Severity {
    pub const TICKETED: [Severity; 2] = [Severity::Sev2_5, Severity::Sev3];

    /// Batch-sensitive and explicitly escalated alarms page at SEV2.5.
    pub fn classify(batch_job_sensitive: bool, sev2_action: bool) -> Self {
        if batch_job_sensitive || sev2_action {
            Severity::Sev2_5
        } else {
            Severity::Sev3
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::None => "NONE",
            Severity::Sev2_5 => "SEV2.5",
            Severity::Sev3 => "SEV3",
        }
    }

    /// Form usable in resource names.
    fn slug(self) -> &'static str {
        match self {
            Severity::None => "None",
            Severity::Sev2_5 => "Sev2-5",
            Severity::Sev3 => "Sev3",
        }
    }
}

impl Serialize for Severity {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Ticket routing for one deployment target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticketing {
    enabled: bool,
    account_id: String,
    region: String,
    suffix: String,
    team: TeamContact,
}

impl Ticketing {
    pub fn for_target(target: &DeploymentTarget, team: &TeamContact) -> Self {
        Self {
            enabled: target.ticketing_enabled(),
            account_id: target.account_id.clone(),
            region: target.region.clone(),
            suffix: target.suffix(),
            team: team.clone(),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn team(&self) -> &TeamContact {
        &self.team
    }

    /// Naming suffix of the target, `{stage}-{region}`.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Severity actually applied: `None` whenever ticketing is off.
    pub fn effective(&self, severity: Severity) -> Severity {
        if self.enabled { severity } else { Severity::None }
    }

    pub fn topic_name(&self, severity: Severity) -> String {
        format!("{}-Tickets-{}-{}", self.team.alias, severity.slug(), self.suffix)
    }

    /// Topic ARN an alarm of this severity notifies, if any.
    pub fn action(&self, severity: Severity) -> Option<String> {
        match self.effective(severity) {
            Severity::None => None,
            sev => Some(Arn::new(&self.account_id, &self.region).topic(&self.topic_name(sev))),
        }
    }

    /// Declare one ticketing topic per severity plus its HTTPS
    /// subscription. No-op when ticketing is off.
    pub fn declare_topics(&self, stack: &mut Stack) -> TemplateResult<()> {
        if !self.enabled {
            return Ok(());
        }
        let arn = Arn::new(&self.account_id, &self.region);
        for severity in Severity::TICKETED {
            let name = self.topic_name(severity);
            let id = logical_id(&format!("TicketingTopic{}", severity.slug()));
            stack.add(
                id.clone(),
                Resource::new(TopicProperties {
                    topic_name: name.clone(),
                    display_name: Some(format!("{} {} tickets", self.team.alias, severity.label())),
                    tags: vec![
                        Tag::new("Cti", &self.team.cti),
                        Tag::new("ResolverGroup", &self.team.resolver_group),
                        Tag::new("Severity", severity.label()),
                    ],
                }),
            )?;
            stack.add(
                format!("{id}Subscription"),
                Resource::new(SubscriptionProperties {
                    topic_arn: arn.topic(&name),
                    protocol: "https",
                    endpoint: self.team.ticketing_endpoint.clone(),
                    raw_message_delivery: None,
                })
                .depends_on(id),
            )?;
            debug!(topic = %name, severity = %severity, "declared ticketing topic");
        }
        Ok(())
    }
}
