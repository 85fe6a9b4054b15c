use crate::backend::{DashboardId, ServiceError};
use serde::{Deserialize, Serialize};

/// Region of the rendered dashboard captured by image export.
pub const CANVAS_REGION: &str = "dashboard-canvas";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Pdf,
    Png,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Png => "png",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Png => "image/png",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRequest {
    pub dashboard_id: Option<DashboardId>,
    pub name: String,
    pub region: String,
    pub format: ExportFormat,
}

impl ExportRequest {
    /// Build a request, refusing PDF export of a dashboard that was never saved.
    pub fn new(
        dashboard_id: Option<DashboardId>,
        name: impl Into<String>,
        format: ExportFormat,
    ) -> Result<Self, ExportError> {
        if format == ExportFormat::Pdf && dashboard_id.is_none() {
            return Err(ExportError::NotSaved);
        }
        Ok(Self {
            dashboard_id,
            name: name.into(),
            region: CANVAS_REGION.into(),
            format,
        })
    }

    /// Suggested file name for the artifact.
    pub fn file_name(&self) -> String {
        let stem = slug::slugify(&self.name);
        let stem = if stem.is_empty() { "dashboard".to_string() } else { stem };
        format!("{stem}.{}", self.format.extension())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Produces the exported document. Rendering is left to the implementation.
pub trait ExportRenderer {
    fn render(&self, request: &ExportRequest) -> Result<Vec<u8>, ServiceError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportError {
    NotSaved,
    Renderer(ServiceError),
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::NotSaved => write!(f, "save the dashboard before exporting it as PDF"),
            ExportError::Renderer(err) => write!(f, "export failed: {err}"),
        }
    }
}

impl std::error::Error for ExportError {}

pub fn export(request: &ExportRequest, renderer: &dyn ExportRenderer) -> Result<ExportArtifact, ExportError> {
    let bytes = renderer.render(request).map_err(ExportError::Renderer)?;
    tracing::info!(
        format = request.format.extension(),
        bytes = bytes.len(),
        "dashboard exported"
    );
    Ok(ExportArtifact {
        file_name: request.file_name(),
        mime_type: request.format.mime_type(),
        bytes,
    })
}
