use crate::catalog::{CatalogError, CatalogSource, Column};
use std::sync::Arc;

struct CatalogEntry {
    dataset_id: String,
    columns: Arc<Vec<Column>>,
}

/// Column catalog memoized per dataset id.
///
/// Only successful loads are kept; the entry is replaced when a different
/// dataset is requested.
#[derive(Default)]
pub struct CatalogCache {
    entry: Option<CatalogEntry>,
    last_error: Option<CatalogError>,
}

impl CatalogCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(
        &mut self,
        source: &dyn CatalogSource,
        dataset_id: &str,
    ) -> Result<Arc<Vec<Column>>, CatalogError> {
        if let Some(entry) = self.entry.as_ref().filter(|e| e.dataset_id == dataset_id) {
            return Ok(Arc::clone(&entry.columns));
        }
        if self.entry.is_some() {
            tracing::debug!(dataset = dataset_id, "dataset changed; column catalog invalidated");
            self.entry = None;
        }
        match source.load_profile(dataset_id) {
            Ok(profile) => {
                let columns = Arc::new(profile.to_columns());
                tracing::debug!(dataset = dataset_id, columns = columns.len(), "column catalog loaded");
                self.entry = Some(CatalogEntry {
                    dataset_id: dataset_id.to_string(),
                    columns: Arc::clone(&columns),
                });
                self.last_error = None;
                Ok(columns)
            }
            Err(err) => {
                tracing::warn!(dataset = dataset_id, error = %err, "column catalog unavailable");
                self.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Cached columns for `dataset_id`, if loaded.
    pub fn columns(&self, dataset_id: &str) -> Option<&[Column]> {
        self.entry
            .as_ref()
            .filter(|e| e.dataset_id == dataset_id)
            .map(|e| e.columns.as_slice())
    }

    pub fn last_error(&self) -> Option<&CatalogError> {
        self.last_error.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ColumnProfile, DatasetProfile};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSource {
        calls: AtomicUsize,
    }

    impl CatalogSource for CountingSource {
        fn load_profile(&self, dataset_id: &str) -> Result<DatasetProfile, CatalogError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if dataset_id == "missing" {
                return Err(CatalogError::NotFound(dataset_id.into()));
            }
            Ok(DatasetProfile {
                columns: vec![ColumnProfile {
                    name: format!("{dataset_id}_col"),
                    dtype: "int64".into(),
                    missing_count: 0,
                    missing_percentage: 0.0,
                    unique_count: 1,
                }],
                total_rows: 1,
                total_columns: 1,
            })
        }
    }

    #[test]
    fn memoized_per_dataset() {
        let source = CountingSource::default();
        let mut cache = CatalogCache::new();
        cache.load(&source, "a").unwrap();
        cache.load(&source, "a").unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.columns("a").unwrap()[0].name, "a_col");

        cache.load(&source, "b").unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert!(cache.columns("a").is_none());
    }

    #[test]
    fn failures_are_not_cached() {
        let source = CountingSource::default();
        let mut cache = CatalogCache::new();
        assert!(cache.load(&source, "missing").is_err());
        assert!(cache.load(&source, "missing").is_err());
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert!(matches!(cache.last_error(), Some(CatalogError::NotFound(_))));
    }
}
