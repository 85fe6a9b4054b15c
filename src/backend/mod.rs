//! Collaborator contracts of the dashboard engine and their implementations.
//!
//! The engine only talks to these traits; [`HttpBackend`] speaks to the
//! analytics API and [`FileDashboardStore`] keeps dashboards on disk.

use crate::analytics::{Forecast, ForecastRequest};
use crate::dashboard::config::DashboardDocument;
use crate::dashboard::query::{QueryRequest, QueryResult};
use crate::measures::{MeasureDefinition, MeasurePreview};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod error;
mod file_store;
mod http;

pub use error::{ExecutorError, PersistenceError, ServiceError};
pub use file_store::FileDashboardStore;
pub use http::HttpBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DashboardId(pub i64);

impl std::fmt::Display for DashboardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Entry of the saved dashboard listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub id: DashboardId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Executes aggregation queries against a dataset.
pub trait QueryExecutor: Send + Sync {
    fn run_query(
        &self,
        dataset_id: &str,
        request: &QueryRequest,
    ) -> Result<QueryResult, ExecutorError>;
}

/// Stores dashboard documents. `save` always creates a new record.
pub trait DashboardStore: Send + Sync {
    fn list(&self) -> Result<Vec<DashboardSummary>, PersistenceError>;
    fn load(&self, id: DashboardId) -> Result<DashboardDocument, PersistenceError>;
    fn save(&self, document: &DashboardDocument) -> Result<DashboardId, PersistenceError>;
    fn delete(&self, id: DashboardId) -> Result<(), PersistenceError>;
}

/// Analytics features outside the chart pipeline.
pub trait AnalyticsService: Send + Sync {
    fn forecast(&self, request: &ForecastRequest) -> Result<Forecast, ServiceError>;
    fn preview_measures(
        &self,
        dataset_id: &str,
        measures: &[MeasureDefinition],
    ) -> Result<MeasurePreview, ServiceError>;
    fn save_measures(
        &self,
        dataset_id: &str,
        measures: &[MeasureDefinition],
    ) -> Result<(), ServiceError>;
}
