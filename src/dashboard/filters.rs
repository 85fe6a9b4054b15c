use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Filter values are plain JSON scalars.
pub type Scalar = Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    Eq,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterPredicate {
    pub column: String,
    pub operator: FilterOperator,
    pub value: Scalar,
}

impl FilterPredicate {
    pub fn eq(column: impl Into<String>, value: Scalar) -> Self {
        Self {
            column: column.into(),
            operator: FilterOperator::Eq,
            value,
        }
    }
}

/// Whether a value should clear the filter on its column instead of setting it.
pub fn is_blank(value: &Scalar) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Dashboard-wide filters, at most one predicate per column.
///
/// Iteration is ordered by column name so translated queries are stable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    predicates: BTreeMap<String, FilterPredicate>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a predicate, replacing any existing one on the same column.
    pub fn set(&mut self, predicate: FilterPredicate) -> Option<FilterPredicate> {
        self.predicates.insert(predicate.column.clone(), predicate)
    }

    pub fn remove(&mut self, column: &str) -> Option<FilterPredicate> {
        self.predicates.remove(column)
    }

    pub fn get(&self, column: &str) -> Option<&FilterPredicate> {
        self.predicates.get(column)
    }

    pub fn clear(&mut self) {
        self.predicates.clear();
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FilterPredicate> {
        self.predicates.values()
    }

    /// Persisted form: plain `column -> value` pairs.
    pub fn to_values(&self) -> BTreeMap<String, Scalar> {
        self.predicates
            .iter()
            .map(|(col, p)| (col.clone(), p.value.clone()))
            .collect()
    }

    /// Rebuild from persisted pairs. Blank values are skipped.
    pub fn from_values(values: &BTreeMap<String, Scalar>) -> Self {
        let mut set = Self::new();
        for (column, value) in values {
            if column.trim().is_empty() || is_blank(value) {
                continue;
            }
            set.set(FilterPredicate::eq(column.clone(), value.clone()));
        }
        set
    }
}
