//! Client side of a deployment: provenance, bundle, upload.

pub mod bundle;
pub mod error;
pub mod project;
pub mod provenance;
pub mod upload;

use std::path::Path;

pub use bundle::{BundleArtifact, BundleOptions};
pub use error::PipelineError;
pub use project::ProjectConfig;
pub use provenance::ProvenanceRecord;
pub use upload::{HttpUploader, UploadRequest, UploadResult, Uploader};

/// Milestones reported while [`run`] progresses.
#[derive(Debug)]
pub enum Progress<'a> {
    Collected(&'a ProvenanceRecord),
    Bundled { size: u64, entries: usize },
    Uploading { url: &'a str },
}

/// Run one deployment: validate config, collect provenance, bundle, upload.
///
/// Steps run strictly in order and nothing is retried. The bundle is removed
/// on every exit path, including when the returned future is dropped.
#[tracing::instrument(skip_all, fields(root = %project_root.display(), project_id = %config.project_id), err)]
pub async fn run(
    project_root: &Path,
    config: &ProjectConfig,
    options: &BundleOptions,
    uploader: &dyn Uploader,
    mut on_progress: impl FnMut(Progress<'_>) + Send,
) -> Result<UploadResult, PipelineError> {
    config.validate()?;
    let url = config.upload_url()?;

    let provenance = provenance::collect(project_root).await?;
    on_progress(Progress::Collected(&provenance));

    let artifact = bundle::bundle(project_root, options).await?;
    on_progress(Progress::Bundled {
        size: artifact.size(),
        entries: artifact.entries(),
    });

    let request = UploadRequest {
        artifact,
        provenance,
        project_id: config.project_id.trim().to_owned(),
    };
    on_progress(Progress::Uploading { url: url.as_str() });

    match uploader.upload(request, config).await {
        Ok(result) => Ok(result),
        Err(err @ PipelineError::MalformedResponse { .. }) => {
            tracing::warn!(
                error = %err,
                "remote accepted the upload but the response was unusable; \
                 a deployment may exist server-side"
            );
            Err(err)
        }
        Err(err) => Err(err),
    }
}
