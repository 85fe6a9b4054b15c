//! Column catalog types and the profiling collaborator contract.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Numeric,
    Text,
    Date,
    Boolean,
    Other,
}

impl ColumnType {
    /// Map a profiler dtype string onto a column type.
    ///
    /// Accepts both the profiler's storage dtypes (`int64`, `float64`, `object`,
    /// `datetime`, ...) and the plain type names.
    pub fn from_dtype(dtype: &str) -> Self {
        let dtype = dtype.trim().to_ascii_lowercase();
        match dtype.as_str() {
            "numeric" | "number" => ColumnType::Numeric,
            "text" | "string" | "object" | "category" | "str" => ColumnType::Text,
            "date" | "datetime" => ColumnType::Date,
            "bool" | "boolean" => ColumnType::Boolean,
            d if d.starts_with("int") || d.starts_with("uint") || d.starts_with("float") => {
                ColumnType::Numeric
            }
            d if d.starts_with("datetime") => ColumnType::Date,
            _ => ColumnType::Other,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Numeric)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Numeric => "numeric",
            ColumnType::Text => "text",
            ColumnType::Date => "date",
            ColumnType::Boolean => "boolean",
            ColumnType::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub dtype: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, dtype: ColumnType) -> Self {
        Self {
            name: name.into(),
            dtype,
        }
    }
}

/// Find a column by exact name.
pub fn find_column<'a>(columns: &'a [Column], name: &str) -> Option<&'a Column> {
    columns.iter().find(|c| c.name == name)
}

/// One column entry of the profiling response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    pub dtype: String,
    #[serde(default)]
    pub missing_count: u64,
    #[serde(default)]
    pub missing_percentage: f64,
    #[serde(default)]
    pub unique_count: u64,
}

/// Response of the "load column catalog" call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DatasetProfile {
    #[serde(default)]
    pub columns: Vec<ColumnProfile>,
    #[serde(default)]
    pub total_rows: u64,
    #[serde(default)]
    pub total_columns: u64,
}

impl DatasetProfile {
    pub fn to_columns(&self) -> Vec<Column> {
        self.columns
            .iter()
            .map(|c| Column::new(c.name.clone(), ColumnType::from_dtype(&c.dtype)))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    NotFound(String),
    Unreachable(String),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::NotFound(id) => write!(f, "dataset '{id}' not found"),
            CatalogError::Unreachable(msg) => write!(f, "column catalog unavailable: {msg}"),
        }
    }
}

impl std::error::Error for CatalogError {}

/// Supplies the column profile of a dataset.
pub trait CatalogSource: Send + Sync {
    fn load_profile(&self, dataset_id: &str) -> Result<DatasetProfile, CatalogError>;
}
