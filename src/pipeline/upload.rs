use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};

use super::bundle::BundleArtifact;
use super::error::PipelineError;
use super::project::ProjectConfig;
use super::provenance::ProvenanceRecord;

/// Multipart field carrying the archive.
pub const FILE_FIELD: &str = "file";
/// Multipart field carrying the JSON provenance.
pub const GIT_INFO_FIELD: &str = "gitInfo";

const ARCHIVE_FILE_NAME: &str = "bundle.tar.gz";
const ARCHIVE_CONTENT_TYPE: &str = "application/gzip";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// One upload attempt. Consumed by [`Uploader::upload`]; dropping it removes
/// the bundle from disk.
#[derive(Debug)]
pub struct UploadRequest {
    pub artifact: BundleArtifact,
    pub provenance: ProvenanceRecord,
    pub project_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub deployment_id: String,
}

/// Sends a bundle to the deployment API. Implementations make exactly one
/// attempt per call.
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(
        &self,
        request: UploadRequest,
        config: &ProjectConfig,
    ) -> Result<UploadResult, PipelineError>;
}

/// reqwest-backed [`Uploader`].
#[derive(Debug, Clone)]
pub struct HttpUploader {
    client: reqwest::Client,
}

impl HttpUploader {
    pub fn new() -> Result<Self, PipelineError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ecus/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(PipelineError::Transport)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Uploader for HttpUploader {
    #[tracing::instrument(
        skip_all,
        fields(project_id = %request.project_id, size = request.artifact.size()),
        err
    )]
    async fn upload(
        &self,
        request: UploadRequest,
        config: &ProjectConfig,
    ) -> Result<UploadResult, PipelineError> {
        config.validate()?;
        let url = config.upload_url()?;

        let archive = tokio::fs::read(request.artifact.path())
            .await
            .map_err(|e| PipelineError::BundleFailed(format!("failed to read bundle: {e}")))?;
        let git_info = serde_json::to_string(&request.provenance)
            .map_err(|e| PipelineError::BundleFailed(format!("failed to encode gitInfo: {e}")))?;

        let file = Part::bytes(archive)
            .file_name(ARCHIVE_FILE_NAME)
            .mime_str(ARCHIVE_CONTENT_TYPE)
            .map_err(PipelineError::Transport)?;
        let form = Form::new()
            .part(FILE_FIELD, file)
            .text(GIT_INFO_FIELD, git_info);

        let response = self
            .client
            .put(url.clone())
            .header(AUTHORIZATION, format!("Bearer {}", config.api_key.trim()))
            .multipart(form)
            .send()
            .await
            .map_err(PipelineError::Transport)?;

        let status = response.status();
        let body = response.text().await.map_err(PipelineError::Transport)?;

        if !status.is_success() {
            tracing::warn!(%url, status = status.as_u16(), "upload rejected");
            return Err(PipelineError::UploadRejected {
                status: status.as_u16(),
                body,
            });
        }

        let deployment_id = parse_deployment_id(&body).map_err(|reason| {
            PipelineError::MalformedResponse {
                status: status.as_u16(),
                reason,
                body: body.clone(),
            }
        })?;

        tracing::info!(%url, %deployment_id, "upload accepted");
        Ok(UploadResult { deployment_id })
    }
}

fn parse_deployment_id(body: &str) -> Result<String, String> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| format!("body is not JSON: {e}"))?;
    let id = match value.get("id") {
        Some(serde_json::Value::String(s)) => s.trim().to_owned(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(other) => return Err(format!("`id` has unexpected type: {other}")),
        None => return Err("response has no `id` field".into()),
    };
    if id.is_empty() {
        return Err("`id` is empty".into());
    }
    Ok(id)
}
