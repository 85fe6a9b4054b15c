//! Computed measures: named formulas evaluated by the analytics service.

use crate::backend::{AnalyticsService, ServiceError};
use crate::catalog::{find_column, Column};
use crate::dashboard::query::Record;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CATEGORY: &str = "General";

static AGGREGATE_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(SUM|AVG|COUNT|MIN|MAX)\s*\(").unwrap());

fn default_category() -> String {
    DEFAULT_CATEGORY.into()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureDefinition {
    pub name: String,
    pub formula: String,
    #[serde(default = "default_category")]
    pub category: String,
}

impl MeasureDefinition {
    pub fn new(name: impl Into<String>, formula: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            formula: formula.into(),
            category: default_category(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Whether the formula aggregates (`SUM(`, `AVG(`, ...) rather than
    /// computing a value per row.
    pub fn is_aggregate(&self) -> bool {
        AGGREGATE_CALL.is_match(&self.formula)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeasureError {
    MissingField,
    Duplicate(String),
    ShadowsColumn(String),
    OutOfRange(usize),
}

impl std::fmt::Display for MeasureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeasureError::MissingField => write!(f, "Please provide both name and formula."),
            MeasureError::Duplicate(n) => write!(f, "Measure with name '{n}' already exists."),
            MeasureError::ShadowsColumn(n) => write!(f, "A raw column named '{n}' already exists."),
            MeasureError::OutOfRange(i) => write!(f, "no measure at position {i}"),
        }
    }
}

impl std::error::Error for MeasureError {}

/// Preview rows returned by the analytics service.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MeasurePreview {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub data: Vec<Record>,
}

/// Ordered measure definitions of one dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasureSet {
    measures: Vec<MeasureDefinition>,
}

impl MeasureSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_definitions(measures: Vec<MeasureDefinition>) -> Self {
        Self { measures }
    }

    pub fn definitions(&self) -> &[MeasureDefinition] {
        &self.measures
    }

    pub fn len(&self) -> usize {
        self.measures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measures.is_empty()
    }

    pub fn add(&mut self, measure: MeasureDefinition, columns: &[Column]) -> Result<(), MeasureError> {
        let name = measure.name.trim();
        if name.is_empty() || measure.formula.trim().is_empty() {
            return Err(MeasureError::MissingField);
        }
        if self.measures.iter().any(|m| m.name == name) {
            return Err(MeasureError::Duplicate(name.to_string()));
        }
        if find_column(columns, name).is_some() {
            return Err(MeasureError::ShadowsColumn(name.to_string()));
        }
        let category = if measure.category.trim().is_empty() {
            default_category()
        } else {
            measure.category
        };
        self.measures.push(MeasureDefinition {
            name: name.to_string(),
            formula: measure.formula,
            category,
        });
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<MeasureDefinition, MeasureError> {
        if index >= self.measures.len() {
            return Err(MeasureError::OutOfRange(index));
        }
        Ok(self.measures.remove(index))
    }

    pub fn preview(
        &self,
        service: &dyn AnalyticsService,
        dataset_id: &str,
    ) -> Result<MeasurePreview, ServiceError> {
        service.preview_measures(dataset_id, &self.measures)
    }

    pub fn save(&self, service: &dyn AnalyticsService, dataset_id: &str) -> Result<(), ServiceError> {
        service.save_measures(dataset_id, &self.measures)?;
        tracing::info!(dataset = dataset_id, measures = self.measures.len(), "measures saved");
        Ok(())
    }
}
