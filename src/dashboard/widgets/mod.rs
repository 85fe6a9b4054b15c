use serde::{Deserialize, Serialize};

mod controller;
mod series;

pub use controller::{
    CompletionOutcome, FetchTicket, TranslateContext, WidgetController, WidgetFailure,
    WidgetState, EXECUTOR_FAILURE_MESSAGE,
};
pub use series::{ChartDataset, ChartSeries};

pub const MIN_HISTOGRAM_BINS: u8 = 2;
pub const MAX_HISTOGRAM_BINS: u8 = 100;
pub const DEFAULT_HISTOGRAM_BINS: u8 = 10;

/// Identity of a widget inside one dashboard. Never reused after removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WidgetId(pub u64);

impl std::fmt::Display for WidgetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "widget-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    Line,
    Area,
    Pie,
    Table,
    Kpi,
    Histogram,
    Funnel,
    DualAxis,
}

impl Default for ChartKind {
    fn default() -> Self {
        Self::Bar
    }
}

impl ChartKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
            ChartKind::Area => "area",
            ChartKind::Pie => "pie",
            ChartKind::Table => "table",
            ChartKind::Kpi => "kpi",
            ChartKind::Histogram => "histogram",
            ChartKind::Funnel => "funnel",
            ChartKind::DualAxis => "dual_axis",
        }
    }

    /// Kinds that can split each x value into series by a second column.
    pub fn supports_sub_group(&self) -> bool {
        matches!(
            self,
            ChartKind::Bar | ChartKind::Line | ChartKind::Area | ChartKind::Table
        )
    }

    pub fn supports_secondary_axis(&self) -> bool {
        matches!(self, ChartKind::DualAxis)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Sum,
    Avg,
    Count,
    Min,
    Max,
}

impl Default for Aggregation {
    fn default() -> Self {
        Self::Sum
    }
}

impl Aggregation {
    /// Wire name, also the suffix of result keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregation::Sum => "sum",
            Aggregation::Avg => "avg",
            Aggregation::Count => "count",
            Aggregation::Min => "min",
            Aggregation::Max => "max",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Aggregation::Sum => "SUM",
            Aggregation::Avg => "AVG",
            Aggregation::Count => "COUNT",
            Aggregation::Min => "MIN",
            Aggregation::Max => "MAX",
        }
    }
}

impl std::fmt::Display for Aggregation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl Default for SortOrder {
    fn default() -> Self {
        Self::Desc
    }
}

/// Declarative state of one chart.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetConfig {
    pub id: WidgetId,
    pub chart_kind: ChartKind,
    pub x_axis: Option<String>,
    pub y_axis: Option<String>,
    pub sub_group: Option<String>,
    pub secondary_y_axis: Option<String>,
    pub aggregation: Aggregation,
    pub sort_order: SortOrder,
    pub stacked: bool,
    pub histogram_bins: u8,
    pub conditional_formatting: bool,
}

impl WidgetConfig {
    /// Default configuration of a newly added widget: a bar chart with no axes.
    pub fn new(id: WidgetId) -> Self {
        Self {
            id,
            chart_kind: ChartKind::default(),
            x_axis: None,
            y_axis: None,
            sub_group: None,
            secondary_y_axis: None,
            aggregation: Aggregation::default(),
            sort_order: SortOrder::default(),
            stacked: false,
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
            conditional_formatting: false,
        }
    }

    pub fn has_axes(&self) -> bool {
        self.x_axis.is_some() && self.y_axis.is_some()
    }

    /// Whether any axis or grouping of this widget names `column`.
    pub fn references(&self, column: &str) -> bool {
        [
            &self.x_axis,
            &self.y_axis,
            &self.sub_group,
            &self.secondary_y_axis,
        ]
        .into_iter()
        .any(|c| c.as_deref() == Some(column))
    }

    /// Apply an edit, returning whether anything changed.
    pub fn apply(&mut self, edit: ConfigEdit) -> bool {
        match edit {
            ConfigEdit::ChartKind(kind) => replace(&mut self.chart_kind, kind),
            ConfigEdit::XAxis(col) => replace(&mut self.x_axis, normalize_column(col)),
            ConfigEdit::YAxis(col) => replace(&mut self.y_axis, normalize_column(col)),
            ConfigEdit::SubGroup(col) => replace(&mut self.sub_group, normalize_column(col)),
            ConfigEdit::SecondaryYAxis(col) => {
                replace(&mut self.secondary_y_axis, normalize_column(col))
            }
            ConfigEdit::Aggregation(agg) => replace(&mut self.aggregation, agg),
            ConfigEdit::SortOrder(order) => replace(&mut self.sort_order, order),
            ConfigEdit::Stacked(stacked) => replace(&mut self.stacked, stacked),
            ConfigEdit::HistogramBins(bins) => {
                replace(&mut self.histogram_bins, clamp_bins(bins))
            }
            ConfigEdit::ConditionalFormatting(on) => {
                replace(&mut self.conditional_formatting, on)
            }
        }
    }
}

/// A single user edit of a widget configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigEdit {
    ChartKind(ChartKind),
    XAxis(Option<String>),
    YAxis(Option<String>),
    SubGroup(Option<String>),
    SecondaryYAxis(Option<String>),
    Aggregation(Aggregation),
    SortOrder(SortOrder),
    Stacked(bool),
    HistogramBins(u32),
    ConditionalFormatting(bool),
}

pub fn clamp_bins(bins: u32) -> u8 {
    bins.clamp(MIN_HISTOGRAM_BINS as u32, MAX_HISTOGRAM_BINS as u32) as u8
}

/// Blank column selections mean "not chosen".
pub(crate) fn normalize_column(col: Option<String>) -> Option<String> {
    col.map(|c| c.trim().to_string()).filter(|c| !c.is_empty())
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}
