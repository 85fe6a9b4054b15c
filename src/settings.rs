use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    /// Root of the analytics API. Relative endpoint paths are joined onto it.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Bearer token sent with every request. `None` sends no `Authorization` header.
    #[serde(default)]
    pub auth_token: Option<String>,
    /// Timeout applied to every collaborator call, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Row limit placed on every aggregation query.
    #[serde(default = "default_query_limit")]
    pub query_limit: u32,
    /// When enabled the application initialises the logger at debug level.
    /// Defaults to `false` when the field is missing in the settings file.
    #[serde(default)]
    pub debug_logging: bool,
    /// Optional file receiving log output instead of stdout.
    #[serde(default)]
    pub log_file: Option<String>,
    /// Column count used for the grid of a freshly created dashboard.
    #[serde(default = "default_layout_columns")]
    pub layout_columns: u8,
    /// Directory for the local dashboard store. If `None`, dashboards are
    /// persisted through the API only.
    #[serde(default)]
    pub dashboards_dir: Option<String>,
}

fn default_api_base_url() -> String {
    "http://localhost:8000/".into()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_query_limit() -> u32 {
    crate::dashboard::translate::DEFAULT_QUERY_LIMIT
}

fn default_layout_columns() -> u8 {
    crate::dashboard::layout::DEFAULT_COLUMNS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            auth_token: None,
            request_timeout_secs: default_request_timeout(),
            query_limit: default_query_limit(),
            debug_logging: false,
            log_file: None,
            layout_columns: default_layout_columns(),
            dashboards_dir: None,
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn log_path(&self) -> Option<PathBuf> {
        self.log_file
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
    }

    /// Build the explicit client configuration handed to the HTTP backend.
    pub fn client_config(&self) -> anyhow::Result<ClientConfig> {
        ClientConfig::new(
            &self.api_base_url,
            self.auth_token.clone(),
            Duration::from_secs(self.request_timeout_secs.max(1)),
        )
    }
}

/// Connection settings for the collaborator API.
///
/// Passed to the backend at construction; nothing about the session lives in
/// global state.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: Url,
    pub auth_token: Option<String>,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: &str, auth_token: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let trimmed = base_url.trim();
        // `Url::join` replaces the last segment unless the base ends with a slash.
        let normalized = if trimmed.ends_with('/') {
            trimmed.to_string()
        } else {
            format!("{trimmed}/")
        };
        let base_url = Url::parse(&normalized)?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("api base url '{trimmed}' cannot be used as a base");
        }
        let auth_token = auth_token.filter(|t| !t.trim().is_empty());
        Ok(Self {
            base_url,
            auth_token,
            timeout,
        })
    }
}
