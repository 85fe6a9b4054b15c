//! Aggregation request/response types exchanged with the query executor.

use crate::dashboard::filters::FilterPredicate;
use crate::dashboard::widgets::{Aggregation, SortOrder};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Result column name for an aggregate: `"<column>_<function>"`.
///
/// The executor names its output columns this way and charts select their
/// data with the same key, so both sides must build it through here.
pub fn aggregate_key(column: &str, function: Aggregation) -> String {
    format!("{column}_{}", function.as_str())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationSpec {
    pub column: String,
    pub function: Aggregation,
}

impl AggregationSpec {
    pub fn result_key(&self) -> String {
        aggregate_key(&self.column, self.function)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: String,
    pub order: SortOrder,
}

/// A well-formed aggregation request. Only built by the translator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub group_by: Vec<String>,
    pub aggregations: Vec<AggregationSpec>,
    pub sort_by: Vec<SortSpec>,
    pub filters: Vec<FilterPredicate>,
    pub limit: u32,
    pub is_histogram: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub histogram_bins: Option<u8>,
}

pub type Record = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryResult {
    pub rows: Vec<Record>,
}

impl QueryResult {
    pub fn new(rows: Vec<Record>) -> Self {
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
