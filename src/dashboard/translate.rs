//! Turns a widget configuration plus the active filters into a query request.

use crate::catalog::{find_column, Column};
use crate::dashboard::filters::{FilterPredicate, FilterSet};
use crate::dashboard::query::{aggregate_key, AggregationSpec, QueryRequest, SortSpec};
use crate::dashboard::widgets::{Aggregation, ChartKind, WidgetConfig};

pub const DEFAULT_QUERY_LIMIT: u32 = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// X or Y axis not chosen.
    MissingAxes,
    /// A non-count aggregation over a column that is not numeric.
    IncompatibleAggregation {
        column: String,
        aggregation: Aggregation,
    },
    /// The configuration names a column the dataset does not have.
    UnknownColumn(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::MissingAxes => write!(f, "Please select both X and Y axes"),
            ValidationError::IncompatibleAggregation {
                column,
                aggregation,
            } => write!(
                f,
                "cannot apply {} to non-numeric column '{column}'",
                aggregation.label()
            ),
            ValidationError::UnknownColumn(column) => {
                write!(f, "column '{column}' does not exist in this dataset")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Translate with the default row limit.
pub fn translate(
    config: &WidgetConfig,
    filters: &FilterSet,
    catalog: &[Column],
) -> Result<QueryRequest, ValidationError> {
    translate_with_limit(config, filters, catalog, DEFAULT_QUERY_LIMIT)
}

/// Pure translation of a widget configuration into a query request.
///
/// Performs no I/O. Rejected input yields a typed [`ValidationError`].
pub fn translate_with_limit(
    config: &WidgetConfig,
    filters: &FilterSet,
    catalog: &[Column],
    limit: u32,
) -> Result<QueryRequest, ValidationError> {
    let (x_axis, y_axis) = match (config.x_axis.as_deref(), config.y_axis.as_deref()) {
        (Some(x), Some(y)) => (x, y),
        _ => return Err(ValidationError::MissingAxes),
    };
    let sub_group = config
        .sub_group
        .as_deref()
        .filter(|_| config.chart_kind.supports_sub_group())
        .filter(|s| *s != x_axis);
    let secondary = config
        .secondary_y_axis
        .as_deref()
        .filter(|_| config.chart_kind.supports_secondary_axis());

    // Count is legal over any column type.
    if config.aggregation != Aggregation::Count {
        for measure in [Some(y_axis), secondary].into_iter().flatten() {
            if let Some(column) = find_column(catalog, measure) {
                if !column.dtype.is_numeric() {
                    return Err(ValidationError::IncompatibleAggregation {
                        column: measure.to_string(),
                        aggregation: config.aggregation,
                    });
                }
            }
        }
    }

    for name in [Some(x_axis), Some(y_axis), sub_group, secondary]
        .into_iter()
        .flatten()
    {
        if find_column(catalog, name).is_none() {
            return Err(ValidationError::UnknownColumn(name.to_string()));
        }
    }

    let mut group_by = vec![x_axis.to_string()];
    group_by.extend(sub_group.map(str::to_string));

    let mut aggregations = vec![AggregationSpec {
        column: y_axis.to_string(),
        function: config.aggregation,
    }];
    aggregations.extend(secondary.map(|column| AggregationSpec {
        column: column.to_string(),
        function: config.aggregation,
    }));

    let sort_by = vec![SortSpec {
        column: aggregate_key(y_axis, config.aggregation),
        order: config.sort_order,
    }];

    let filters = filters
        .iter()
        .map(|p| FilterPredicate::eq(p.column.clone(), p.value.clone()))
        .collect();

    let is_histogram = config.chart_kind == ChartKind::Histogram;

    Ok(QueryRequest {
        group_by,
        aggregations,
        sort_by,
        filters,
        limit,
        is_histogram,
        histogram_bins: is_histogram.then_some(config.histogram_bins),
    })
}
