use super::{DashboardId, DashboardStore, DashboardSummary, PersistenceError};
use crate::dashboard::config::DashboardDocument;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Serialize, Deserialize)]
struct StoredDashboard {
    id: DashboardId,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    document: DashboardDocument,
}

/// Dashboards kept as one pretty printed `<id>.json` file each.
pub struct FileDashboardStore {
    dir: PathBuf,
    /// Serializes id allocation between concurrent saves.
    alloc: Mutex<()>,
}

impl FileDashboardStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            alloc: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: DashboardId) -> PathBuf {
        self.dir.join(format!("{}.json", id.0))
    }

    fn stored_ids(&self) -> Result<Vec<DashboardId>, PersistenceError> {
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<i64>().ok())
            {
                ids.push(DashboardId(id));
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn read(&self, id: DashboardId) -> Result<StoredDashboard, PersistenceError> {
        let path = self.path_for(id);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(PersistenceError::NotFound(id))
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }
}

impl DashboardStore for FileDashboardStore {
    fn list(&self) -> Result<Vec<DashboardSummary>, PersistenceError> {
        let mut summaries = Vec::new();
        for id in self.stored_ids()? {
            match self.read(id) {
                Ok(stored) => summaries.push(DashboardSummary {
                    id: stored.id,
                    name: stored.document.name,
                    created_at: stored.created_at,
                }),
                Err(err) => {
                    tracing::warn!(id = %id, error = %err, "skipping unreadable dashboard file")
                }
            }
        }
        // Newest first; undated entries last.
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(summaries)
    }

    fn load(&self, id: DashboardId) -> Result<DashboardDocument, PersistenceError> {
        Ok(self.read(id)?.document)
    }

    fn save(&self, document: &DashboardDocument) -> Result<DashboardId, PersistenceError> {
        let _guard = self
            .alloc
            .lock()
            .map_err(|_| PersistenceError::Io("dashboard store lock poisoned".into()))?;
        let id = DashboardId(
            self.stored_ids()?
                .last()
                .map(|id| id.0 + 1)
                .unwrap_or(1),
        );
        let stored = StoredDashboard {
            id,
            created_at: Some(Utc::now()),
            document: document.clone(),
        };
        let json = serde_json::to_string_pretty(&stored)?;
        std::fs::write(self.path_for(id), json)?;
        tracing::info!(id = %id, name = %document.name, "dashboard saved");
        Ok(id)
    }

    fn delete(&self, id: DashboardId) -> Result<(), PersistenceError> {
        match std::fs::remove_file(self.path_for(id)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(PersistenceError::NotFound(id))
            }
            Err(err) => Err(err.into()),
        }
    }
}
