use super::{
    AnalyticsService, DashboardId, DashboardStore, DashboardSummary, ExecutorError,
    PersistenceError, QueryExecutor, ServiceError,
};
use crate::analytics::{Forecast, ForecastRequest};
use crate::catalog::{CatalogError, CatalogSource, DatasetProfile};
use crate::dashboard::config::DashboardDocument;
use crate::dashboard::query::{QueryRequest, QueryResult, Record};
use crate::export::{ExportFormat, ExportRenderer, ExportRequest};
use crate::measures::{MeasureDefinition, MeasurePreview};
use crate::settings::ClientConfig;
use anyhow::Context;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

/// Client of the analytics API implementing every collaborator trait.
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

/// Transport level outcome, mapped onto each collaborator's error type.
#[derive(Debug)]
enum Failure {
    Timeout(String),
    Unreachable(String),
    NotFound,
    Status(StatusCode, String),
    Decode(String),
}

impl From<Failure> for ExecutorError {
    fn from(failure: Failure) -> Self {
        match failure {
            Failure::Timeout(_) => ExecutorError::Timeout,
            Failure::Unreachable(msg) => ExecutorError::Unreachable(msg),
            Failure::NotFound => ExecutorError::Rejected("dataset not found".into()),
            Failure::Status(status, msg) => ExecutorError::Rejected(status_message(status, &msg)),
            Failure::Decode(msg) => ExecutorError::Decode(msg),
        }
    }
}

impl From<Failure> for ServiceError {
    fn from(failure: Failure) -> Self {
        match failure {
            Failure::Timeout(msg) | Failure::Unreachable(msg) => ServiceError::Unreachable(msg),
            Failure::NotFound => ServiceError::Rejected("not found".into()),
            Failure::Status(status, msg) => ServiceError::Rejected(status_message(status, &msg)),
            Failure::Decode(msg) => ServiceError::Decode(msg),
        }
    }
}

impl Failure {
    fn into_catalog(self, dataset_id: &str) -> CatalogError {
        match self {
            Failure::NotFound => CatalogError::NotFound(dataset_id.to_string()),
            Failure::Timeout(msg) | Failure::Unreachable(msg) | Failure::Decode(msg) => {
                CatalogError::Unreachable(msg)
            }
            Failure::Status(status, msg) => CatalogError::Unreachable(status_message(status, &msg)),
        }
    }

    fn into_persistence(self, id: Option<DashboardId>) -> PersistenceError {
        match self {
            Failure::NotFound => match id {
                Some(id) => PersistenceError::NotFound(id),
                None => PersistenceError::Rejected("not found".into()),
            },
            Failure::Timeout(msg) | Failure::Unreachable(msg) => PersistenceError::Unreachable(msg),
            Failure::Status(status, msg) => {
                PersistenceError::Rejected(status_message(status, &msg))
            }
            Failure::Decode(msg) => PersistenceError::Decode(msg),
        }
    }
}

fn status_message(status: StatusCode, detail: &str) -> String {
    if detail.is_empty() {
        format!("http status {status}")
    } else {
        format!("http status {status}: {detail}")
    }
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    data: Vec<Record>,
}

#[derive(Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    forecast: Map<String, Value>,
}

#[derive(Deserialize)]
struct SavedResponse {
    id: DashboardId,
}

#[derive(Deserialize)]
struct SummaryResponse {
    id: DashboardId,
    #[serde(default)]
    name: String,
    #[serde(default)]
    created_at: Option<String>,
}

#[derive(Serialize)]
struct MeasuresBody<'a> {
    measures: &'a [MeasureDefinition],
}

/// Accepts RFC 3339 and the naive ISO form the API emits for UTC timestamps.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

impl HttpBackend {
    pub fn new(config: ClientConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.auth_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .context("auth token is not a valid header value")?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("chartdeck/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Join percent-encoded path segments onto the base url.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, Failure> {
        let path = segments
            .iter()
            .map(|s| urlencoding::encode(s).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        self.base_url
            .join(&path)
            .map_err(|e| Failure::Unreachable(format!("invalid endpoint '{path}': {e}")))
    }

    fn send(&self, request: RequestBuilder) -> Result<Response, Failure> {
        let resp = request.send().map_err(|e| {
            if e.is_timeout() {
                Failure::Timeout(e.to_string())
            } else {
                Failure::Unreachable(e.to_string())
            }
        })?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Failure::NotFound);
        }
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(Failure::Status(status, error_detail(&body)));
        }
        Ok(resp)
    }

    fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, Failure> {
        resp.json::<T>().map_err(|e| {
            if e.is_timeout() {
                Failure::Timeout(e.to_string())
            } else {
                Failure::Decode(e.to_string())
            }
        })
    }

    fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, Failure> {
        let url = self.endpoint(segments)?;
        tracing::debug!(%url, "GET");
        Self::read_json(self.send(self.client.get(url))?)
    }

    fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, Failure> {
        let url = self.endpoint(segments)?;
        tracing::debug!(%url, "POST");
        Self::read_json(self.send(self.client.post(url).json(body))?)
    }
}

/// Pull `detail` out of an API error body, falling back to the raw text.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("detail").map(|d| match d {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }))
        .unwrap_or_else(|| body.trim().chars().take(200).collect())
}

impl CatalogSource for HttpBackend {
    fn load_profile(&self, dataset_id: &str) -> Result<DatasetProfile, CatalogError> {
        self.get_json(&["datasets", dataset_id, "profile"])
            .map_err(|f| f.into_catalog(dataset_id))
    }
}

impl QueryExecutor for HttpBackend {
    fn run_query(
        &self,
        dataset_id: &str,
        request: &QueryRequest,
    ) -> Result<QueryResult, ExecutorError> {
        let resp: QueryResponse = self.post_json(&["query", dataset_id], request)?;
        Ok(QueryResult::new(resp.data))
    }
}

impl DashboardStore for HttpBackend {
    fn list(&self) -> Result<Vec<DashboardSummary>, PersistenceError> {
        let raw: Vec<SummaryResponse> = self
            .get_json(&["dashboards"])
            .map_err(|f| f.into_persistence(None))?;
        Ok(raw
            .into_iter()
            .map(|s| DashboardSummary {
                id: s.id,
                name: s.name,
                created_at: s.created_at.as_deref().and_then(parse_timestamp),
            })
            .collect())
    }

    fn load(&self, id: DashboardId) -> Result<DashboardDocument, PersistenceError> {
        let key = id.to_string();
        self.get_json(&["dashboards", &key])
            .map_err(|f| f.into_persistence(Some(id)))
    }

    fn save(&self, document: &DashboardDocument) -> Result<DashboardId, PersistenceError> {
        let saved: SavedResponse = self
            .post_json(&["dashboards"], document)
            .map_err(|f| f.into_persistence(None))?;
        Ok(saved.id)
    }

    fn delete(&self, id: DashboardId) -> Result<(), PersistenceError> {
        let key = id.to_string();
        let url = self
            .endpoint(&["dashboards", &key])
            .map_err(|f| f.into_persistence(Some(id)))?;
        tracing::debug!(%url, "DELETE");
        self.send(self.client.delete(url))
            .map_err(|f| f.into_persistence(Some(id)))?;
        Ok(())
    }
}

impl AnalyticsService for HttpBackend {
    fn forecast(&self, request: &ForecastRequest) -> Result<Forecast, ServiceError> {
        let resp: ForecastResponse = self.post_json(&["analytics", "forecast"], request)?;
        Forecast::from_map(&resp.forecast).map_err(ServiceError::Decode)
    }

    fn preview_measures(
        &self,
        dataset_id: &str,
        measures: &[MeasureDefinition],
    ) -> Result<MeasurePreview, ServiceError> {
        Ok(self.post_json(
            &["data-modeling", dataset_id, "preview"],
            &MeasuresBody { measures },
        )?)
    }

    fn save_measures(
        &self,
        dataset_id: &str,
        measures: &[MeasureDefinition],
    ) -> Result<(), ServiceError> {
        let url = self.endpoint(&["data-modeling", dataset_id, "save"])?;
        tracing::debug!(%url, "PUT");
        self.send(self.client.put(url).json(&MeasuresBody { measures }))?;
        Ok(())
    }
}

impl ExportRenderer for HttpBackend {
    fn render(&self, request: &ExportRequest) -> Result<Vec<u8>, ServiceError> {
        let id = match (request.format, request.dashboard_id) {
            (ExportFormat::Pdf, Some(id)) => id.to_string(),
            (ExportFormat::Pdf, None) => {
                return Err(ServiceError::Rejected("dashboard has no saved id".into()))
            }
            (ExportFormat::Png, _) => {
                return Err(ServiceError::Rejected(format!(
                    "image export of '{}' is rendered by the host",
                    request.region
                )))
            }
        };
        let url = self.endpoint(&["export", "dashboard", &id, "pdf"])?;
        tracing::debug!(%url, "GET");
        let resp = self.send(self.client.get(url))?;
        let bytes = resp
            .bytes()
            .map_err(|e| ServiceError::Unreachable(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn backend(base: &str) -> HttpBackend {
        let config = ClientConfig::new(base, Some("secret".into()), Duration::from_secs(1)).unwrap();
        HttpBackend::new(config).unwrap()
    }

    #[test]
    fn endpoint_encodes_segments() {
        let http = backend("http://localhost:8000/api");
        let url = http.endpoint(&["datasets", "a b/c", "profile"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/api/datasets/a%20b%2Fc/profile"
        );
    }

    #[test]
    fn parses_naive_and_rfc3339_timestamps() {
        assert!(parse_timestamp("2024-05-01T10:20:30.123456").is_some());
        assert!(parse_timestamp("2024-05-01T10:20:30Z").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn error_detail_prefers_api_message() {
        assert_eq!(error_detail(r#"{"detail": "bad column"}"#), "bad column");
        assert_eq!(error_detail("plain failure"), "plain failure");
    }

    #[test]
    fn not_found_maps_per_collaborator() {
        assert_eq!(
            Failure::NotFound.into_persistence(Some(DashboardId(4))),
            PersistenceError::NotFound(DashboardId(4))
        );
        assert_eq!(
            Failure::NotFound.into_catalog("d1"),
            CatalogError::NotFound("d1".into())
        );
        assert_eq!(
            ExecutorError::from(Failure::Timeout("slow".into())),
            ExecutorError::Timeout
        );
    }

    #[test]
    fn unreachable_server_is_reported() {
        // Port 9 (discard) is closed on test machines.
        let http = backend("http://127.0.0.1:9/");
        let err = http.load_profile("d1").unwrap_err();
        assert!(matches!(err, CatalogError::Unreachable(_)));
    }
}
