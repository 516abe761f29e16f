use bytes::Bytes;
use opendal::{ErrorKind, Operator};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("object store unavailable: {0}")]
    Unavailable(#[source] opendal::Error),

    #[error("object store rejected request: {0}")]
    Rejected(#[source] opendal::Error),

    #[error("object not found: {0}")]
    NotFound(String),
}

impl StoreError {
    fn classify(err: opendal::Error) -> Self {
        match err.kind() {
            ErrorKind::PermissionDenied => Self::Unavailable(err),
            _ if err.is_temporary() => Self::Unavailable(err),
            _ => Self::Rejected(err),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(key) => Self::NotFound(key),
            StoreError::Unavailable(e) => {
                tracing::error!(error = %e, "object store unavailable");
                Self::ServiceUnavailable("artifact storage unavailable".into())
            }
            StoreError::Rejected(e) => {
                tracing::error!(error = %e, "object store rejected write");
                Self::BadGateway("artifact storage rejected the object".into())
            }
        }
    }
}

/// Where an object landed, returned by [`ArtifactStore::put`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredObjectReference {
    pub key: String,
    pub content_type: Option<String>,
    pub size: u64,
    pub sha256: String,
}

/// Durable binary storage over an opendal operator (S3 in production,
/// memory in tests).
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    op: Operator,
}

impl ArtifactStore {
    pub fn new(op: Operator) -> Self {
        Self { op }
    }

    /// In-memory store for tests and local runs.
    pub fn memory() -> Result<Self, StoreError> {
        let op = Operator::new(opendal::services::Memory::default())
            .map_err(StoreError::Rejected)?
            .finish();
        Ok(Self::new(op))
    }

    /// Write `bytes` under `key`, replacing any existing object.
    ///
    /// Content type falls back to the key's extension; unknown extensions
    /// leave it unset. One backend attempt, no retry.
    #[tracing::instrument(skip(self, bytes), fields(size = bytes.len()), err)]
    pub async fn put(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: Option<&str>,
    ) -> Result<StoredObjectReference, StoreError> {
        let content_type = content_type.or_else(|| content_type_for(key));
        let size = bytes.len() as u64;
        let sha256 = hex::encode(Sha256::digest(&bytes));

        let mut write = self.op.write_with(key, bytes);
        if let Some(ct) = content_type {
            write = write.content_type(ct);
        }
        write.await.map_err(StoreError::classify)?;

        tracing::info!(key, size, "artifact stored");
        Ok(StoredObjectReference {
            key: key.to_owned(),
            content_type: content_type.map(str::to_owned),
            size,
            sha256,
        })
    }

    pub async fn get(&self, key: &str) -> Result<Bytes, StoreError> {
        match self.op.read(key).await {
            Ok(buf) => Ok(buf.to_bytes()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(key.to_owned())),
            Err(e) => Err(StoreError::classify(e)),
        }
    }
}

/// Content type for a key's extension, if known.
pub fn content_type_for(key: &str) -> Option<&'static str> {
    let name = key.rsplit('/').next().unwrap_or(key);
    if name.ends_with(".tar.gz") {
        return Some("application/gzip");
    }
    let (_, ext) = name.rsplit_once('.')?;
    match ext.to_ascii_lowercase().as_str() {
        "gz" | "tgz" => Some("application/gzip"),
        "zip" => Some("application/zip"),
        "tar" => Some("application/x-tar"),
        "json" => Some("application/json"),
        "js" => Some("application/javascript"),
        "html" => Some("text/html"),
        "css" => Some("text/css"),
        "txt" => Some("text/plain"),
        "svg" => Some("image/svg+xml"),
        "png" => Some("image/png"),
        "wasm" => Some("application/wasm"),
        _ => None,
    }
}
