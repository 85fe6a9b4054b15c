use super::{ChartKind, WidgetConfig};
use crate::dashboard::filters::is_blank;
use crate::dashboard::query::{aggregate_key, QueryResult, Record};
use serde::Serialize;
use serde_json::Value;

/// One plotted series, values aligned with [`ChartSeries::labels`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartDataset {
    pub key: String,
    pub label: String,
    pub values: Vec<Option<f64>>,
    /// Set for points above the series mean when conditional formatting is on.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub highlights: Vec<bool>,
}

/// Chart-ready view of a query result.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub datasets: Vec<ChartDataset>,
}

impl ChartSeries {
    /// The x-axis value of `row`, as promoted to a cross-filter.
    pub fn point_value<'a>(config: &WidgetConfig, row: &'a Record) -> Option<&'a Value> {
        let value = row.get(config.x_axis.as_deref()?)?;
        (!is_blank(value)).then_some(value)
    }

    /// Select the widget's data from `result` using the same result keys the
    /// translator asked for.
    pub fn from_result(config: &WidgetConfig, result: &QueryResult) -> Self {
        let (Some(x_axis), Some(y_axis)) = (config.x_axis.as_deref(), config.y_axis.as_deref())
        else {
            return Self::default();
        };
        let primary_key = aggregate_key(y_axis, config.aggregation);
        let sub_group = config
            .sub_group
            .as_deref()
            .filter(|_| config.chart_kind.supports_sub_group())
            .filter(|s| *s != x_axis);

        let mut series = match sub_group {
            Some(sub) => Self::pivot(result, x_axis, sub, &primary_key),
            None => {
                let labels = result
                    .rows
                    .iter()
                    .map(|row| label_of(row.get(x_axis)))
                    .collect();
                let mut keys = vec![(primary_key, y_axis)];
                if config.chart_kind == ChartKind::DualAxis {
                    if let Some(secondary) = config.secondary_y_axis.as_deref() {
                        keys.push((aggregate_key(secondary, config.aggregation), secondary));
                    }
                }
                let datasets = keys
                    .into_iter()
                    .map(|(key, column)| ChartDataset {
                        label: format!("{} of {column}", config.aggregation.label()),
                        values: result
                            .rows
                            .iter()
                            .map(|row| row.get(&key).and_then(number_of))
                            .collect(),
                        key,
                        highlights: Vec::new(),
                    })
                    .collect();
                Self { labels, datasets }
            }
        };

        if config.conditional_formatting {
            for dataset in &mut series.datasets {
                dataset.highlights = above_mean(&dataset.values);
            }
        }
        series
    }

    fn pivot(result: &QueryResult, x_axis: &str, sub_group: &str, key: &str) -> Self {
        let mut labels: Vec<String> = Vec::new();
        let mut groups: Vec<String> = Vec::new();
        let mut cells: Vec<(usize, usize, Option<f64>)> = Vec::new();
        for row in &result.rows {
            let x = position_of(&mut labels, label_of(row.get(x_axis)));
            let g = position_of(&mut groups, label_of(row.get(sub_group)));
            cells.push((x, g, row.get(key).and_then(number_of)));
        }
        let mut datasets: Vec<ChartDataset> = groups
            .into_iter()
            .map(|group| ChartDataset {
                key: key.to_string(),
                label: group,
                values: vec![None; labels.len()],
                highlights: Vec::new(),
            })
            .collect();
        for (x, g, value) in cells {
            datasets[g].values[x] = value;
        }
        Self { labels, datasets }
    }
}

fn position_of(items: &mut Vec<String>, item: String) -> usize {
    match items.iter().position(|i| *i == item) {
        Some(idx) => idx,
        None => {
            items.push(item);
            items.len() - 1
        }
    }
}

fn label_of(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn above_mean(values: &[Option<f64>]) -> Vec<bool> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return vec![false; values.len()];
    }
    let mean = present.iter().sum::<f64>() / present.len() as f64;
    values
        .iter()
        .map(|v| v.map(|v| v > mean).unwrap_or(false))
        .collect()
}
