//! Dashboard engine: chart widget configuration, query translation and
//! cross-widget filter coordination over one tabular dataset.

pub mod analytics;
pub mod backend;
pub mod catalog;
pub mod dashboard;
pub mod dispatch;
pub mod export;
pub mod logging;
pub mod measures;
pub mod settings;
