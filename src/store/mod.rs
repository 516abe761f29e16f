pub mod artifact;
pub mod registry;

use std::sync::Arc;

use crate::config::Config;

pub use artifact::{ArtifactStore, StoreError, StoredObjectReference};
pub use registry::{Deployment, DeploymentRegistry};

#[derive(Clone)]
pub struct AppState {
    pub artifacts: ArtifactStore,
    pub deployments: DeploymentRegistry,
    pub config: Arc<Config>,
}

/// S3-compatible operator built from server config.
pub fn s3_operator(cfg: &Config) -> opendal::Result<opendal::Operator> {
    let builder = opendal::services::S3::default()
        .endpoint(&cfg.s3_endpoint)
        .region(&cfg.s3_region)
        .bucket(&cfg.s3_bucket)
        .access_key_id(&cfg.s3_access_key_id)
        .secret_access_key(&cfg.s3_secret_access_key);
    Ok(opendal::Operator::new(builder)?.finish())
}
