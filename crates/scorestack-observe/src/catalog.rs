//! Static catalog of application (custom) metrics and their alarms.

use std::time::Duration;

use scorestack_template::{MathExpression, Metric, MetricSource, Statistic, Unit};

use crate::ticketing::Severity;

/// Namespace the stream functions publish to.
pub const LAMBDA_NAMESPACE: &str = "OrderScoringRealtimeLambda";
/// Namespace the hosted model publishes to.
pub const SAGEMAKER_NAMESPACE: &str = "OrderScoringRealtimeSagemaker";

pub const DEFAULT_PERIOD: Duration = Duration::from_secs(300);
pub const DEFAULT_EVALUATION_PERIODS: u32 = 5;

/// Keeps an alarm quiet during the weekly graph maintenance window
/// (Thursday 22:00-22:30 UTC) and the daily purge job (20:00-20:45 UTC).
pub const SUPPRESSION_EXPRESSION: &str =
    "IF((DAY(m1)!=3 OR HOUR(m1)!=22 OR MINUTE(m1)>30) AND (HOUR(m1)!=20 OR MINUTE(m1)>45), m1)";

/// One custom metric and the alarm watching it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlarmSpec {
    pub metric_name: &'static str,
    pub statistic: Statistic,
    pub unit: Unit,
    pub threshold: f64,
    pub evaluation_periods: Option<u32>,
    pub datapoints_to_alarm: Option<u32>,
    pub sev2_action: bool,
    pub namespace: &'static str,
    pub batch_job_sensitive: bool,
    pub period: Option<Duration>,
}

impl AlarmSpec {
    const fn new(metric_name: &'static str, statistic: Statistic, unit: Unit, threshold: f64) -> Self {
        Self {
            metric_name,
            statistic,
            unit,
            threshold,
            evaluation_periods: None,
            datapoints_to_alarm: None,
            sev2_action: false,
            namespace: LAMBDA_NAMESPACE,
            batch_job_sensitive: false,
            period: None,
        }
    }

    const fn count(metric_name: &'static str, threshold: f64) -> Self {
        Self::new(metric_name, Statistic::Sum, Unit::Count, threshold)
    }

    const fn latency(metric_name: &'static str, statistic: Statistic, threshold: f64) -> Self {
        Self::new(metric_name, statistic, Unit::Milliseconds, threshold)
    }

    const fn sev2(mut self) -> Self {
        self.sev2_action = true;
        self
    }

    const fn batch_sensitive(mut self) -> Self {
        self.batch_job_sensitive = true;
        self
    }

    const fn every(mut self, secs: u64) -> Self {
        self.period = Some(Duration::from_secs(secs));
        self
    }

    const fn evaluate(mut self, periods: u32, datapoints: u32) -> Self {
        self.evaluation_periods = Some(periods);
        self.datapoints_to_alarm = Some(datapoints);
        self
    }

    const fn sagemaker(mut self) -> Self {
        self.namespace = SAGEMAKER_NAMESPACE;
        self
    }

    pub fn severity(&self) -> Severity {
        Severity::classify(self.batch_job_sensitive, self.sev2_action)
    }

    pub fn period(&self) -> Duration {
        self.period.unwrap_or(DEFAULT_PERIOD)
    }

    pub fn evaluation_periods(&self) -> u32 {
        self.evaluation_periods.unwrap_or(DEFAULT_EVALUATION_PERIODS)
    }

    pub fn metric(&self) -> Metric {
        Metric::new(self.namespace, self.metric_name)
            .statistic(self.statistic)
            .unit(self.unit)
            .period(self.period())
    }

    /// What the alarm evaluates: the metric itself, or the metric behind
    /// the maintenance-window suppression when batch-sensitive.
    pub fn source(&self) -> MetricSource {
        if self.batch_job_sensitive {
            MathExpression::new(SUPPRESSION_EXPRESSION)
                .using("m1", self.metric())
                .period(self.period())
                .into()
        } else {
            self.metric().into()
        }
    }
}

pub const CUSTOM_METRICS: &[AlarmSpec] = &[
    AlarmSpec::count("DDBFetchError", 20.0).sev2().every(60),
    AlarmSpec::count("DDBPersistError", 20.0).sev2(),
    AlarmSpec::count("InvalidCycleInputError", 20.0),
    AlarmSpec::count("InvalidOrderDayDiffError", 20.0),
    AlarmSpec::count("ModelInvokeFailure", 20.0).sev2(),
    AlarmSpec::count("NeptuneFetchError", 40.0).sev2().evaluate(15, 15).every(60),
    AlarmSpec::count("NeptunePersistError", 20.0).sev2(),
    AlarmSpec::count("InvalidEdgeFeatureInputError", 10.0),
    AlarmSpec::count("SNSPublishError", 20.0).sev2(),
    AlarmSpec::count("InvalidInputError", 20.0).sev2(),
    AlarmSpec::count("INVALID_LAMBDA_INPUT", 10.0).sev2(),
    AlarmSpec::count("FEATURE_VALUE_PARSE_ERROR", 10.0),
    AlarmSpec::latency("DDB_FETCH_LATENCY", Statistic::P99, 350.0).sev2(),
    AlarmSpec::latency("DDB_PERSIST_LATENCY", Statistic::Tm99, 15.0).sev2(),
    AlarmSpec::latency("MODEL_INVOKE_LATENCY", Statistic::P99, 1500.0),
    AlarmSpec::latency("NEPTUNE_DEDUPLICATION_LATENCY", Statistic::Tm99, 1600.0).batch_sensitive(),
    AlarmSpec::latency("NEPTUNE_FETCH_LATENCY", Statistic::Tm99, 1000.0)
        .sev2()
        .batch_sensitive(),
    AlarmSpec::latency("NEPTUNE_PERSIST_LATENCY", Statistic::Tm99, 60.0).batch_sensitive(),
    AlarmSpec::latency("OTF_SNS_PUBLISH_LATENCY", Statistic::P99, 100.0),
    AlarmSpec::latency("TOTAL_INFERENCE_LATENCY", Statistic::Tm99, 1500.0)
        .sev2()
        .batch_sensitive(),
    AlarmSpec::latency("TOTAL_INGEST_LATENCY", Statistic::Tm99, 80.0).batch_sensitive(),
    AlarmSpec::latency("SAGEMAKER_SNS_PUBLISH_SUCCESS", Statistic::P99, 100.0).sagemaker(),
    AlarmSpec::latency("SAGEMAKER_SNS_PUBLISH_ERROR", Statistic::Sum, 10.0).sagemaker(),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn catalog_shape() {
        assert_eq!(CUSTOM_METRICS.len(), 23);
        let names: HashSet<_> = CUSTOM_METRICS.iter().map(|s| s.metric_name).collect();
        assert_eq!(names.len(), CUSTOM_METRICS.len());
        assert_eq!(
            CUSTOM_METRICS.iter().filter(|s| s.namespace == SAGEMAKER_NAMESPACE).count(),
            2
        );
    }

    #[test]
    fn defaults_apply() {
        let spec = CUSTOM_METRICS.iter().find(|s| s.metric_name == "DDBPersistError").unwrap();
        assert_eq!(spec.period(), Duration::from_secs(300));
        assert_eq!(spec.evaluation_periods(), 5);
        assert_eq!(spec.severity(), Severity::Sev2_5);

        let spec = CUSTOM_METRICS.iter().find(|s| s.metric_name == "NeptuneFetchError").unwrap();
        assert_eq!(spec.period(), Duration::from_secs(60));
        assert_eq!(spec.evaluation_periods(), 15);
        assert_eq!(spec.datapoints_to_alarm, Some(15));
    }

    #[test]
    fn batch_sensitive_metrics_are_suppressed() {
        for spec in CUSTOM_METRICS {
            let source = spec.source();
            if spec.batch_job_sensitive {
                assert_eq!(source.expression(), Some(SUPPRESSION_EXPRESSION));
                assert_eq!(spec.severity(), Severity::Sev2_5, "{}", spec.metric_name);
            } else {
                assert_eq!(source.expression(), None);
            }
        }
        let plain = CUSTOM_METRICS.iter().find(|s| s.metric_name == "InvalidCycleInputError").unwrap();
        assert_eq!(plain.severity(), Severity::Sev3);
    }
}
