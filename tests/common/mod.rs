#![allow(dead_code)]

use chartdeck::backend::{
    DashboardId, DashboardStore, DashboardSummary, ExecutorError, PersistenceError, QueryExecutor,
};
use chartdeck::catalog::{CatalogError, CatalogSource, ColumnProfile, DatasetProfile};
use chartdeck::dashboard::query::{QueryRequest, QueryResult, Record};
use chartdeck::dashboard::widgets::{ConfigEdit, FetchTicket, WidgetId};
use chartdeck::dashboard::{DashboardCoordinator, DashboardDocument, DashboardServices};
use chartdeck::dispatch::{Completion, Dispatcher, Job};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const DATASET: &str = "sales";

/// Catalog of named datasets, counting profile loads.
#[derive(Default)]
pub struct MemoryCatalog {
    datasets: HashMap<String, Vec<(String, String)>>,
    pub loads: AtomicUsize,
}

impl MemoryCatalog {
    pub fn with_dataset(mut self, id: &str, columns: &[(&str, &str)]) -> Self {
        self.datasets.insert(
            id.to_string(),
            columns
                .iter()
                .map(|(n, t)| (n.to_string(), t.to_string()))
                .collect(),
        );
        self
    }

    pub fn sales() -> Self {
        Self::default().with_dataset(
            DATASET,
            &[
                ("region", "object"),
                ("amount", "float64"),
                ("quantity", "int64"),
                ("channel", "object"),
                ("order_date", "datetime"),
            ],
        )
    }
}

impl CatalogSource for MemoryCatalog {
    fn load_profile(&self, dataset_id: &str) -> Result<DatasetProfile, CatalogError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let columns = self
            .datasets
            .get(dataset_id)
            .ok_or_else(|| CatalogError::NotFound(dataset_id.to_string()))?;
        Ok(DatasetProfile {
            columns: columns
                .iter()
                .map(|(name, dtype)| ColumnProfile {
                    name: name.clone(),
                    dtype: dtype.clone(),
                    missing_count: 0,
                    missing_percentage: 0.0,
                    unique_count: 0,
                })
                .collect(),
            total_rows: 0,
            total_columns: columns.len() as u64,
        })
    }
}

/// Stores documents in memory, optionally failing every save.
#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<BTreeMap<i64, DashboardDocument>>,
    pub fail_saves: Mutex<bool>,
}

impl MemoryStore {
    pub fn insert(&self, id: i64, doc: DashboardDocument) {
        self.docs.lock().unwrap().insert(id, doc);
    }

    pub fn get(&self, id: i64) -> Option<DashboardDocument> {
        self.docs.lock().unwrap().get(&id).cloned()
    }
}

impl DashboardStore for MemoryStore {
    fn list(&self) -> Result<Vec<DashboardSummary>, PersistenceError> {
        Ok(self
            .docs
            .lock()
            .unwrap()
            .iter()
            .map(|(id, doc)| DashboardSummary {
                id: DashboardId(*id),
                name: doc.name.clone(),
                created_at: None,
            })
            .collect())
    }

    fn load(&self, id: DashboardId) -> Result<DashboardDocument, PersistenceError> {
        self.get(id.0).ok_or(PersistenceError::NotFound(id))
    }

    fn save(&self, document: &DashboardDocument) -> Result<DashboardId, PersistenceError> {
        if *self.fail_saves.lock().unwrap() {
            return Err(PersistenceError::Unreachable("store offline".into()));
        }
        let mut docs = self.docs.lock().unwrap();
        let id = docs.keys().last().map(|id| id + 1).unwrap_or(1);
        docs.insert(id, document.clone());
        Ok(DashboardId(id))
    }

    fn delete(&self, id: DashboardId) -> Result<(), PersistenceError> {
        self.docs
            .lock()
            .unwrap()
            .remove(&id.0)
            .map(|_| ())
            .ok_or(PersistenceError::NotFound(id))
    }
}

/// Records dispatched jobs; completions are queued by the test.
#[derive(Clone, Default)]
pub struct RecordingDispatcher {
    jobs: Arc<Mutex<Vec<Job>>>,
    completions: Arc<Mutex<VecDeque<Completion>>>,
}

impl RecordingDispatcher {
    pub fn take_jobs(&self) -> Vec<Job> {
        std::mem::take(&mut *self.jobs.lock().unwrap())
    }

    pub fn take_tickets(&self) -> Vec<FetchTicket> {
        self.take_jobs()
            .into_iter()
            .filter_map(|job| match job {
                Job::Query { ticket, .. } => Some(ticket),
                Job::Save { .. } => None,
            })
            .collect()
    }

    pub fn complete(&self, completion: Completion) {
        self.completions.lock().unwrap().push_back(completion);
    }

    /// Run pending save jobs against `store` and queue their results.
    pub fn run_saves(&self, store: &dyn DashboardStore) {
        let mut jobs = self.jobs.lock().unwrap();
        let mut keep = Vec::new();
        for job in jobs.drain(..) {
            match job {
                Job::Save {
                    generation,
                    document,
                } => self.complete(Completion::Saved {
                    generation,
                    result: store.save(&document),
                }),
                other => keep.push(other),
            }
        }
        *jobs = keep;
    }
}

impl Dispatcher for RecordingDispatcher {
    fn dispatch(&mut self, job: Job) {
        self.jobs.lock().unwrap().push(job);
    }

    fn drain(&mut self) -> Vec<Completion> {
        self.completions.lock().unwrap().drain(..).collect()
    }
}

/// Executor answering every query with the same rows.
pub struct FixedExecutor {
    pub rows: Vec<Record>,
    pub calls: AtomicUsize,
}

impl QueryExecutor for FixedExecutor {
    fn run_query(
        &self,
        _dataset_id: &str,
        _request: &QueryRequest,
    ) -> Result<QueryResult, ExecutorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(QueryResult::new(self.rows.clone()))
    }
}

pub struct Fixture {
    pub dashboard: DashboardCoordinator,
    pub dispatcher: RecordingDispatcher,
    pub store: Arc<MemoryStore>,
    pub catalog: Arc<MemoryCatalog>,
}

pub fn fixture() -> Fixture {
    let dispatcher = RecordingDispatcher::default();
    let store = Arc::new(MemoryStore::default());
    let catalog = Arc::new(MemoryCatalog::sales());
    let dashboard = DashboardCoordinator::new(
        "Sales Overview",
        DATASET,
        DashboardServices {
            catalog: catalog.clone(),
            store: store.clone(),
            dispatcher: Box::new(dispatcher.clone()),
        },
    );
    Fixture {
        dashboard,
        dispatcher,
        store,
        catalog,
    }
}

/// Add a widget and pick both axes.
pub fn add_chart(dashboard: &mut DashboardCoordinator, x: &str, y: &str) -> WidgetId {
    let id = dashboard.add_widget();
    dashboard.edit_widget(id, ConfigEdit::XAxis(Some(x.into())));
    dashboard.edit_widget(id, ConfigEdit::YAxis(Some(y.into())));
    id
}

pub fn record(pairs: &[(&str, Value)]) -> Record {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

pub fn rows(pairs: &[&[(&str, Value)]]) -> QueryResult {
    QueryResult::new(pairs.iter().map(|r| record(r)).collect())
}
