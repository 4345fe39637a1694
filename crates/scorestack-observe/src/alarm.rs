//! Alarm declarations.
//!
//! Builders describe alarms as [`AlarmDef`]s; [`declare`] turns one into a
//! provider alarm inside a stack, applies the target's naming suffix and
//! ticket action, and hands back an [`AlarmRef`] so the monitor stack can
//! list every alarm of the target.

use scorestack_core::Arn;
use scorestack_template::resource::{AlarmProperties, ComparisonOperator, TreatMissingData};
use scorestack_template::{MetricSource, Resource, Stack, TemplateResult, logical_id};
use serde::Serialize;
use tracing::debug;

use crate::catalog::AlarmSpec;
use crate::ticketing::{Severity, Ticketing};

/// An alarm before it is bound to a target.
#[derive(Debug, Clone, PartialEq)]
pub struct AlarmDef {
    /// Base name; the target suffix is appended on declaration.
    pub name: String,
    pub description: String,
    pub source: MetricSource,
    pub comparison: ComparisonOperator,
    pub threshold: f64,
    pub evaluation_periods: u32,
    pub datapoints_to_alarm: Option<u32>,
    pub treat_missing_data: Option<TreatMissingData>,
    /// Severity before ticketing is taken into account.
    pub severity: Severity,
}

impl AlarmDef {
    pub fn new(
        name: impl Into<String>,
        source: impl Into<MetricSource>,
        comparison: ComparisonOperator,
        threshold: f64,
        evaluation_periods: u32,
        severity: Severity,
    ) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            source: source.into(),
            comparison,
            threshold,
            evaluation_periods,
            datapoints_to_alarm: None,
            treat_missing_data: None,
            severity,
        }
    }

    /// Alarm for a catalog entry: `> threshold`, missing data not breaching.
    pub fn from_spec(spec: &AlarmSpec) -> Self {
        Self::new(
            format!("{}Alarm", spec.metric_name),
            spec.source(),
            ComparisonOperator::GreaterThanThreshold,
            spec.threshold,
            spec.evaluation_periods(),
            spec.severity(),
        )
        .describe(format!(
            "{} breached the threshold ({})",
            spec.metric_name, spec.threshold
        ))
        .datapoints(spec.datapoints_to_alarm)
        .not_breaching()
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn datapoints(mut self, datapoints: Option<u32>) -> Self {
        self.datapoints_to_alarm = datapoints;
        self
    }

    pub fn not_breaching(mut self) -> Self {
        self.treat_missing_data = Some(TreatMissingData::NotBreaching);
        self
    }
}

/// A declared alarm, as seen from outside its stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlarmRef {
    pub stack_id: String,
    pub logical_id: String,
    pub name: String,
    pub arn: String,
    /// Effective severity: `None` when the target does not ticket.
    pub severity: Severity,
    /// Topic notified when the alarm fires.
    pub action: Option<String>,
}

impl AlarmRef {
    pub fn is_ticketed(&self) -> bool {
        self.action.is_some()
    }
}

/// Declare `def` into `stack` for the target behind `ticketing`.
pub fn declare(stack: &mut Stack, def: AlarmDef, ticketing: &Ticketing) -> TemplateResult<AlarmRef> {
    let name = format!("{}-{}", def.name, ticketing.suffix());
    let id = logical_id(&def.name);
    let severity = ticketing.effective(def.severity);
    let action = ticketing.action(def.severity);

    let description = format!(
        "{}.\nSeverity: {}. Refer to the service runbook - {}",
        def.description,
        def.severity,
        ticketing.team().runbook_url
    );
    let mut props = AlarmProperties::new(
        name.clone(),
        &def.source,
        def.comparison,
        def.threshold,
        def.evaluation_periods,
    )
    .description(description)
    .datapoints_to_alarm(def.datapoints_to_alarm);
    if let Some(treatment) = def.treat_missing_data {
        props = props.treat_missing_data(treatment);
    }
    if let Some(topic) = &action {
        props = props.action(topic.clone());
    }

    stack.add(id.clone(), Resource::new(props))?;
    debug!(alarm = %name, severity = %severity, ticketed = action.is_some(), "declared alarm");

    Ok(AlarmRef {
        stack_id: stack.id.clone(),
        logical_id: id,
        arn: Arn::new(&stack.env.account_id, &stack.env.region).alarm(&name),
        name,
        severity,
        action,
    })
}

/// Declare every def in order.
pub fn declare_all(
    stack: &mut Stack,
    defs: impl IntoIterator<Item = AlarmDef>,
    ticketing: &Ticketing,
) -> TemplateResult<Vec<AlarmRef>> {
    defs.into_iter().map(|def| declare(stack, def, ticketing)).collect()
}
