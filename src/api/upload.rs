use axum::extract::{Multipart, State};
use axum::routing::put;
use axum::{Json, Router};
use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::ProjectUploader;
use crate::error::ApiError;
use crate::pipeline::ProvenanceRecord;
use crate::pipeline::upload::{FILE_FIELD, GIT_INFO_FIELD};
use crate::store::{AppState, Deployment};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub id: Uuid,
    pub artifact_key: String,
    pub size: u64,
    pub sha256: String,
}

struct UploadForm {
    archive: Bytes,
    git_info: ProvenanceRecord,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router() -> Router<AppState> {
    Router::new().route("/api/{project_id}/upload", put(upload))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Store the archive under a key unique to this upload, then record the
/// deployment. Nothing is recorded when the store write fails.
#[tracing::instrument(skip(state, multipart), fields(project_id = %auth.project_id), err)]
async fn upload(
    State(state): State<AppState>,
    auth: ProjectUploader,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let form = read_form(multipart).await?;

    let id = Uuid::now_v7();
    let key = artifact_key(&auth.project_id, &form.git_info.commit_hash, id);
    let artifact = state.artifacts.put(&key, form.archive, None).await?;

    let response = UploadResponse {
        id,
        artifact_key: artifact.key.clone(),
        size: artifact.size,
        sha256: artifact.sha256.clone(),
    };

    state
        .deployments
        .record(Deployment {
            id,
            project_id: auth.project_id,
            git_info: form.git_info,
            artifact,
            created_at: Utc::now(),
        })
        .await;

    Ok(Json(response))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut archive = None;
    let mut git_info = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(FILE_FIELD) => archive = Some(field.bytes().await?),
            Some(GIT_INFO_FIELD) => {
                let text = field.text().await?;
                let record: ProvenanceRecord = serde_json::from_str(&text)
                    .map_err(|e| ApiError::BadRequest(format!("invalid gitInfo: {e}")))?;
                git_info = Some(record);
            }
            _ => {}
        }
    }

    let archive = archive
        .filter(|a| !a.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("missing or empty `{FILE_FIELD}` field")))?;
    let git_info =
        git_info.ok_or_else(|| ApiError::BadRequest(format!("missing `{GIT_INFO_FIELD}` field")))?;
    check_commit_hash(&git_info.commit_hash)?;

    Ok(UploadForm { archive, git_info })
}

fn check_commit_hash(hash: &str) -> Result<(), ApiError> {
    if hash.is_empty() || hash.len() > 64 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ApiError::BadRequest(
            "gitInfo.hash must be a hex commit id".into(),
        ));
    }
    Ok(())
}

/// `deployments/{project}/{commit}/{id}.tar.gz`
fn artifact_key(project_id: &str, commit_hash: &str, id: Uuid) -> String {
    let project: String = project_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("deployments/{project}/{commit_hash}/{id}.tar.gz")
}
