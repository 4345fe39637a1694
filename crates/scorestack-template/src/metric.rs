//! Metrics and metric math.
//!
//! A [`Metric`] names one time series (namespace, name, dimensions) and
//! how it is aggregated (statistic, period, unit). A [`MathExpression`]
//! combines metrics bound to short ids (`m1`, `m2`, ...). Both render
//! into alarm properties and dashboard widgets.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::Serialize;

// ── Statistic ─────────────────────────────────────────────────────

/// Aggregation applied over a metric period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Statistic {
    Avg,
    Min,
    Max,
    /// Sample count.
    N,
    P50,
    P90,
    P99,
    /// Trimmed mean of the lowest 99%.
    Tm99,
    P99_9,
    P100,
    Sum,
}

impl Statistic {
    /// Name as accepted by alarms and dashboards.
    pub fn as_str(self) -> &'static str {
        match self {
            Statistic::Avg => "Average",
            Statistic::Min => "Minimum",
            Statistic::Max => "Maximum",
            Statistic::N => "SampleCount",
            Statistic::Sum => "Sum",
            Statistic::P50 => "p50",
            Statistic::P90 => "p90",
            Statistic::P99 => "p99",
            Statistic::Tm99 => "tm99",
            Statistic::P99_9 => "p99.9",
            Statistic::P100 => "p100",
        }
    }

    /// Percentiles and trimmed means go in `ExtendedStatistic`.
    pub fn is_extended(self) -> bool {
        !matches!(
            self,
            Statistic::Avg | Statistic::Min | Statistic::Max | Statistic::N | Statistic::Sum
        )
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metric unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Unit {
    Count,
    Milliseconds,
    Microseconds,
    Seconds,
    Percent,
    Bytes,
    None,
}

// ── Metric ────────────────────────────────────────────────────────

/// One time series plus its aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metric {
    pub namespace: String,
    pub name: String,
    pub dimensions: BTreeMap<String, String>,
    pub statistic: Statistic,
    pub period: Duration,
    pub unit: Option<Unit>,
    pub label: Option<String>,
}

impl Metric {
    /// Average over five minutes until told otherwise.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            dimensions: BTreeMap::new(),
            statistic: Statistic::Avg,
            period: Duration::from_secs(300),
            unit: None,
            label: None,
        }
    }

    pub fn dimension(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.dimensions.insert(name.into(), value.into());
        self
    }

    pub fn statistic(mut self, statistic: Statistic) -> Self {
        self.statistic = statistic;
        self
    }

    pub fn period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn period_secs(&self) -> u64 {
        self.period.as_secs()
    }

    /// Alarm-query form of this metric under the given id.
    pub fn to_query(&self, id: &str, return_data: bool) -> MetricDataQuery {
        MetricDataQuery {
            id: id.to_string(),
            expression: None,
            metric_stat: Some(MetricStat {
                metric: MetricIdentity {
                    namespace: self.namespace.clone(),
                    metric_name: self.name.clone(),
                    dimensions: dimensions(&self.dimensions),
                },
                period: self.period_secs(),
                stat: self.statistic.as_str().to_string(),
                unit: self.unit,
            }),
            label: self.label.clone(),
            period: None,
            return_data,
        }
    }
}

/// A metric-math expression over named metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MathExpression {
    pub expression: String,
    pub using: BTreeMap<String, Metric>,
    pub label: Option<String>,
    pub period: Duration,
}

impl MathExpression {
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            using: BTreeMap::new(),
            label: None,
            period: Duration::from_secs(300),
        }
    }

    pub fn using(mut self, id: impl Into<String>, metric: Metric) -> Self {
        self.using.insert(id.into(), metric);
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Queries for the bound metrics followed by the expression itself,
    /// which is the only one returning data.
    pub fn to_queries(&self) -> Vec<MetricDataQuery> {
        let mut queries: Vec<MetricDataQuery> = self
            .using
            .iter()
            .map(|(id, metric)| metric.to_query(id, false))
            .collect();
        queries.push(MetricDataQuery {
            id: "expr".to_string(),
            expression: Some(self.expression.clone()),
            metric_stat: None,
            label: self.label.clone(),
            period: Some(self.period.as_secs()),
            return_data: true,
        });
        queries
    }
}

/// What an alarm watches: a plain metric or an expression over metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricSource {
    Metric(Metric),
    Expression(MathExpression),
}

impl MetricSource {
    /// Metrics this source reads.
    pub fn metrics(&self) -> Vec<&Metric> {
        match self {
            MetricSource::Metric(m) => vec![m],
            MetricSource::Expression(e) => e.using.values().collect(),
        }
    }

    pub fn expression(&self) -> Option<&str> {
        match self {
            MetricSource::Metric(_) => None,
            MetricSource::Expression(e) => Some(&e.expression),
        }
    }
}

impl From<Metric> for MetricSource {
    fn from(m: Metric) -> Self {
        MetricSource::Metric(m)
    }
}

impl From<MathExpression> for MetricSource {
    fn from(e: MathExpression) -> Self {
        MetricSource::Expression(e)
    }
}

// ── Provider query shapes ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

pub(crate) fn dimensions(map: &BTreeMap<String, String>) -> Vec<Dimension> {
    map.iter()
        .map(|(name, value)| Dimension {
            name: name.clone(),
            value: value.clone(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetricDataQuery {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric_stat: Option<MetricStat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<u64>,
    pub return_data: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetricStat {
    pub metric: MetricIdentity,
    pub period: u64,
    pub stat: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetricIdentity {
    pub namespace: String,
    pub metric_name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dimensions: Vec<Dimension>,
}
