//! Monitor group: application metric dashboard, custom-metric alarms and
//! the overview of every alarm declared for a target.

use scorestack_template::{Stack, TemplateResult};
use tracing::info;

use crate::alarm::{self, AlarmDef, AlarmRef};
use crate::catalog::{CUSTOM_METRICS, DEFAULT_PERIOD};
use crate::dashboard::{Dashboard, Widget};
use crate::ticketing::Ticketing;

const ALARMS_PER_ROW: usize = 4;

/// Populate the monitor stack. `upstream` holds the alarms declared by the
/// other groups of the target; the returned list adds the custom-metric
/// alarms declared here. Alarms are only declared when `setup_alarms`.
pub fn declare(
    stack: &mut Stack,
    upstream: &[AlarmRef],
    ticketing: &Ticketing,
    setup_alarms: bool,
) -> TemplateResult<Vec<AlarmRef>> {
    let suffix = ticketing.suffix().to_string();

    custom_metrics_dashboard(&format!("CustomMetrics-Dashboard-{suffix}")).declare(stack)?;

    let mut alarms = upstream.to_vec();
    if setup_alarms {
        let custom = alarm::declare_all(stack, CUSTOM_METRICS.iter().map(AlarmDef::from_spec), ticketing)?;
        alarms.extend(custom);
    }

    if !alarms.is_empty() {
        alarm_overview(&format!("Alarms-Overview-{suffix}"), &alarms).declare(stack)?;
    }

    info!(
        stack = %stack.id,
        alarms = alarms.len(),
        ticketed = alarms.iter().filter(|a| a.is_ticketed()).count(),
        "monitor group populated"
    );
    Ok(alarms)
}

/// One graph per catalog metric at the default period.
pub fn custom_metrics_dashboard(name: &str) -> Dashboard {
    let mut dashboard = Dashboard::new(name);
    dashboard.row(CUSTOM_METRICS.iter().map(|spec| {
        Widget::graph(
            format!("{} {}", spec.namespace, spec.metric_name),
            [spec.metric().period(DEFAULT_PERIOD)],
        )
    }));
    dashboard
}

/// One alarm widget per alarm, in declaration order.
pub fn alarm_overview(name: &str, alarms: &[AlarmRef]) -> Dashboard {
    let mut dashboard = Dashboard::new(name);
    for chunk in alarms.chunks(ALARMS_PER_ROW) {
        dashboard.row(chunk.iter().map(|a| Widget::alarm(&a.name, &a.arn)));
    }
    dashboard
}
