use crate::dashboard::filters::{is_blank, Scalar};
use crate::dashboard::layout::LayoutConfig;
use crate::dashboard::widgets::{
    clamp_bins, normalize_column, Aggregation, ChartKind, SortOrder, WidgetConfig, WidgetId,
    DEFAULT_HISTOGRAM_BINS,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashSet};

fn default_bins() -> u32 {
    DEFAULT_HISTOGRAM_BINS as u32
}

/// Stored documents may carry `null` where a collection is expected.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Persisted form of one widget.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<WidgetId>,
    #[serde(default)]
    pub chart_type: ChartKind,
    #[serde(default)]
    pub x_axis: Option<String>,
    #[serde(default)]
    pub y_axis: Option<String>,
    #[serde(default)]
    pub aggregation: Aggregation,
    #[serde(default)]
    pub sub_group: Option<String>,
    #[serde(default)]
    pub secondary_y_axis: Option<String>,
    #[serde(default)]
    pub sort_order: SortOrder,
    #[serde(default)]
    pub stacked: bool,
    #[serde(default = "default_bins")]
    pub histogram_bins: u32,
    #[serde(default)]
    pub conditional_formatting: bool,
}

impl ChartEntry {
    pub fn from_config(config: &WidgetConfig) -> Self {
        Self {
            id: Some(config.id),
            chart_type: config.chart_kind,
            x_axis: config.x_axis.clone(),
            y_axis: config.y_axis.clone(),
            aggregation: config.aggregation,
            sub_group: config.sub_group.clone(),
            secondary_y_axis: config.secondary_y_axis.clone(),
            sort_order: config.sort_order,
            stacked: config.stacked,
            histogram_bins: config.histogram_bins as u32,
            conditional_formatting: config.conditional_formatting,
        }
    }

    pub fn to_config(&self, id: WidgetId) -> WidgetConfig {
        WidgetConfig {
            id,
            chart_kind: self.chart_type,
            x_axis: normalize_column(self.x_axis.clone()),
            y_axis: normalize_column(self.y_axis.clone()),
            sub_group: normalize_column(self.sub_group.clone()),
            secondary_y_axis: normalize_column(self.secondary_y_axis.clone()),
            aggregation: self.aggregation,
            sort_order: self.sort_order,
            stacked: self.stacked,
            histogram_bins: clamp_bins(self.histogram_bins),
            conditional_formatting: self.conditional_formatting,
        }
    }
}

/// The dashboard document exchanged with the persistence collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardDocument {
    #[serde(default)]
    pub name: String,
    pub dataset_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub filters: BTreeMap<String, Scalar>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub charts: Vec<ChartEntry>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub layout: LayoutConfig,
}

impl DashboardDocument {
    pub fn new(name: impl Into<String>, dataset_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dataset_id: dataset_id.into(),
            filters: BTreeMap::new(),
            charts: Vec::new(),
            layout: LayoutConfig::default(),
        }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Normalize a loaded document in place, returning a warning per repair.
    ///
    /// Blank filters are removed, histogram bins clamped, duplicate widget
    /// ids cleared (fresh ones are assigned on hydration) and a zero column
    /// count reset.
    pub fn sanitize(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();

        self.filters.retain(|column, value| {
            if column.trim().is_empty() || is_blank(value) {
                warnings.push(format!("empty filter on '{column}' dropped"));
                return false;
            }
            true
        });

        let mut seen = HashSet::new();
        for (idx, chart) in self.charts.iter_mut().enumerate() {
            if let Some(id) = chart.id {
                if !seen.insert(id) {
                    warnings.push(format!("chart {idx} reuses id '{id}'; a new id is assigned"));
                    chart.id = None;
                }
            }
            let bins = clamp_bins(chart.histogram_bins) as u32;
            if bins != chart.histogram_bins {
                warnings.push(format!(
                    "chart {idx} histogram bins {} clamped to {bins}",
                    chart.histogram_bins
                ));
                chart.histogram_bins = bins;
            }
        }

        if self.layout.columns == 0 {
            warnings.push("layout with zero columns reset to default".into());
            self.layout.columns = LayoutConfig::default().columns;
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn legacy_document_decodes() {
        let json = r#"{
            "name": "Sales Overview",
            "dataset_id": "abc",
            "filters": {"category": "Asia"},
            "charts": [{"chart_type": "bar", "x_axis": "region", "y_axis": "amount", "aggregation": "sum"}],
            "layout": {"columns": 2}
        }"#;
        let doc = DashboardDocument::from_json(json).unwrap();
        assert_eq!(doc.charts.len(), 1);
        assert_eq!(doc.charts[0].id, None);
        assert_eq!(doc.charts[0].histogram_bins, 10);
        assert_eq!(doc.layout.columns, 2);
        assert_eq!(doc.filters.get("category"), Some(&json!("Asia")));
    }

    #[test]
    fn null_collections_become_empty() {
        let json = r#"{"name": "x", "dataset_id": "d", "filters": null, "charts": null, "layout": null}"#;
        let doc = DashboardDocument::from_json(json).unwrap();
        assert!(doc.filters.is_empty());
        assert!(doc.charts.is_empty());
        assert_eq!(doc.layout, LayoutConfig::default());
    }

    #[test]
    fn sanitize_repairs_and_warns() {
        let mut doc = DashboardDocument::new("x", "d");
        doc.filters.insert("category".into(), json!(""));
        let mut entry = ChartEntry::from_config(&WidgetConfig::new(WidgetId(1)));
        entry.histogram_bins = 500;
        doc.charts.push(entry.clone());
        doc.charts.push(entry);
        doc.layout.columns = 0;

        let warnings = doc.sanitize();
        assert_eq!(warnings.len(), 5);
        assert!(doc.filters.is_empty());
        assert_eq!(doc.charts[0].histogram_bins, 100);
        assert_eq!(doc.charts[1].id, None);
        assert_eq!(doc.layout.columns, 2);
    }

    #[test]
    fn entry_round_trips_config() {
        let mut cfg = WidgetConfig::new(WidgetId(4));
        cfg.chart_kind = ChartKind::DualAxis;
        cfg.x_axis = Some("month".into());
        cfg.y_axis = Some("revenue".into());
        cfg.secondary_y_axis = Some("cost".into());
        cfg.sort_order = SortOrder::Asc;
        let entry = ChartEntry::from_config(&cfg);
        assert_eq!(entry.to_config(WidgetId(4)), cfg);
    }
}
