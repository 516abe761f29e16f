use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::pipeline::ProvenanceRecord;

use super::artifact::StoredObjectReference;

/// An accepted upload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub id: Uuid,
    pub project_id: String,
    pub git_info: ProvenanceRecord,
    pub artifact: StoredObjectReference,
    pub created_at: DateTime<Utc>,
}

/// Process-local record of deployments, newest last. Unbounded and lost on
/// restart; `get` is a linear scan.
#[derive(Clone, Debug, Default)]
pub struct DeploymentRegistry {
    inner: Arc<RwLock<Vec<Deployment>>>,
}

impl DeploymentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, deployment: Deployment) {
        tracing::info!(
            id = %deployment.id,
            project_id = %deployment.project_id,
            key = %deployment.artifact.key,
            "deployment recorded"
        );
        self.inner.write().await.push(deployment);
    }

    pub async fn get(&self, id: Uuid) -> Option<Deployment> {
        self.inner.read().await.iter().find(|d| d.id == id).cloned()
    }

    /// Newest first, optionally filtered by project. Returns the page and the
    /// total number of matches.
    pub async fn list(
        &self,
        project_id: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> (Vec<Deployment>, usize) {
        let guard = self.inner.read().await;
        let matching: Vec<&Deployment> = guard
            .iter()
            .rev()
            .filter(|d| project_id.is_none_or(|p| d.project_id == p))
            .collect();
        let total = matching.len();
        let page = matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        (page, total)
    }
}
