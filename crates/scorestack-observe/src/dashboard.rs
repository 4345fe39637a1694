//! Dashboards: rows of graph and alarm widgets rendered to the provider's
//! dashboard body JSON.

use scorestack_template::resource::DashboardProperties;
use scorestack_template::{Metric, Resource, Stack, TemplateResult, logical_id};
use serde_json::{Value as Json, json};

/// Grid width of a dashboard row.
const GRID_WIDTH: u32 = 24;
const WIDGET_WIDTH: u32 = 6;
const WIDGET_HEIGHT: u32 = 6;

#[derive(Debug, Clone, PartialEq)]
pub enum Widget {
    Graph {
        title: String,
        left: Vec<Metric>,
        right: Vec<Metric>,
    },
    Alarm {
        title: String,
        alarm_arn: String,
    },
}

impl Widget {
    pub fn graph(title: impl Into<String>, left: impl IntoIterator<Item = Metric>) -> Self {
        Widget::Graph {
            title: title.into(),
            left: left.into_iter().collect(),
            right: Vec::new(),
        }
    }

    /// Graph with a second y-axis.
    pub fn graph_lr(
        title: impl Into<String>,
        left: impl IntoIterator<Item = Metric>,
        right: impl IntoIterator<Item = Metric>,
    ) -> Self {
        Widget::Graph {
            title: title.into(),
            left: left.into_iter().collect(),
            right: right.into_iter().collect(),
        }
    }

    pub fn alarm(title: impl Into<String>, alarm_arn: impl Into<String>) -> Self {
        Widget::Alarm {
            title: title.into(),
            alarm_arn: alarm_arn.into(),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Widget::Graph { title, .. } | Widget::Alarm { title, .. } => title,
        }
    }

    fn properties(&self, region: &str) -> Json {
        match self {
            Widget::Graph { left, right, .. } => {
                let metrics: Vec<Json> = left
                    .iter()
                    .map(|m| metric_entry(m, "left"))
                    .chain(right.iter().map(|m| metric_entry(m, "right")))
                    .collect();
                json!({
                    "view": "timeSeries",
                    "title": self.title(),
                    "region": region,
                    "metrics": metrics,
                })
            }
            Widget::Alarm { alarm_arn, .. } => json!({
                "title": self.title(),
                "region": region,
                "annotations": { "alarms": [alarm_arn] },
            }),
        }
    }
}

/// `[namespace, name, dim, value, ..., {stat, period, yAxis}]`.
fn metric_entry(metric: &Metric, axis: &str) -> Json {
    let mut entry = vec![json!(metric.namespace), json!(metric.name)];
    for (name, value) in &metric.dimensions {
        entry.push(json!(name));
        entry.push(json!(value));
    }
    let mut options = json!({
        "stat": metric.statistic.as_str(),
        "period": metric.period_secs(),
        "yAxis": axis,
    });
    if let Some(label) = &metric.label {
        options["label"] = json!(label);
    }
    entry.push(options);
    Json::Array(entry)
}

/// A named dashboard under construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub name: String,
    rows: Vec<Vec<Widget>>,
}

impl Dashboard {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    /// Append widgets as one row; rows wrap at the grid width.
    pub fn row(&mut self, widgets: impl IntoIterator<Item = Widget>) -> &mut Self {
        self.rows.push(widgets.into_iter().collect());
        self
    }

    pub fn rows(&self) -> &[Vec<Widget>] {
        &self.rows
    }

    pub fn widgets(&self) -> impl Iterator<Item = &Widget> {
        self.rows.iter().flatten()
    }

    pub fn widget_count(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    /// Body JSON with widgets laid out left to right, top to bottom.
    pub fn body(&self, region: &str) -> Json {
        let mut widgets = Vec::with_capacity(self.widget_count());
        let mut y = 0;
        for row in &self.rows {
            let mut x = 0;
            for widget in row {
                if x + WIDGET_WIDTH > GRID_WIDTH {
                    x = 0;
                    y += WIDGET_HEIGHT;
                }
                widgets.push(json!({
                    "type": "metric",
                    "x": x,
                    "y": y,
                    "width": WIDGET_WIDTH,
                    "height": WIDGET_HEIGHT,
                    "properties": widget.properties(region),
                }));
                x += WIDGET_WIDTH;
            }
            if !row.is_empty() {
                y += WIDGET_HEIGHT;
            }
        }
        json!({ "widgets": widgets })
    }

    /// Add the dashboard to `stack` under a logical id derived from its name.
    pub fn declare(&self, stack: &mut Stack) -> TemplateResult<()> {
        let body = serde_json::to_string(&self.body(&stack.env.region))?;
        stack.add(
            logical_id(&self.name),
            Resource::new(DashboardProperties {
                dashboard_name: self.name.clone(),
                dashboard_body: body,
            }),
        )?;
        Ok(())
    }
}
