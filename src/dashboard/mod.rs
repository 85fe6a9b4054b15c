pub mod config;
pub mod dashboard;
pub mod data_cache;
pub mod diagnostics;
pub mod filters;
pub mod layout;
pub mod query;
pub mod translate;
pub mod widgets;

pub use config::{ChartEntry, DashboardDocument};
pub use dashboard::{DashboardCoordinator, DashboardEvent, DashboardServices};
pub use data_cache::CatalogCache;
pub use filters::{FilterPredicate, FilterSet};
pub use query::{QueryRequest, QueryResult};
pub use translate::{translate, ValidationError};
pub use widgets::{ConfigEdit, WidgetConfig, WidgetController, WidgetId, WidgetState};
