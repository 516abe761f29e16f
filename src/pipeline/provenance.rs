use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::PipelineError;

/// Snapshot of the local git state taken once per upload attempt.
///
/// Serialized with the `gitInfo` wire keys (`hash`, `isClean`, `branch`,
/// `message`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    #[serde(rename = "hash", alias = "commitHash")]
    pub commit_hash: String,
    #[serde(rename = "isClean")]
    pub is_clean: bool,
    pub branch: String,
    #[serde(rename = "message", alias = "latestMessage", default)]
    pub latest_message: Option<String>,
}

impl ProvenanceRecord {
    pub fn short_hash(&self) -> &str {
        self.commit_hash.get(..8).unwrap_or(&self.commit_hash)
    }
}

/// Read commit, cleanliness, branch and latest message for `workdir`.
///
/// Only read-only git subcommands are issued.
#[tracing::instrument(skip_all, fields(workdir = %workdir.display()), err)]
pub async fn collect(workdir: &Path) -> Result<ProvenanceRecord, PipelineError> {
    let inside = git(workdir, &["rev-parse", "--is-inside-work-tree"]).await?;
    if inside.trim() != "true" {
        return Err(PipelineError::ProvenanceUnavailable(
            "not inside a git work tree".into(),
        ));
    }

    let commit_hash = git(workdir, &["rev-parse", "--verify", "HEAD"])
        .await
        .map_err(|_| PipelineError::ProvenanceUnavailable("HEAD has no commits".into()))?
        .trim()
        .to_owned();

    let status = git(workdir, &["status", "--porcelain"]).await?;
    let branch = git(workdir, &["rev-parse", "--abbrev-ref", "HEAD"])
        .await?
        .trim()
        .to_owned();
    let message = git(workdir, &["log", "-1", "--format=%s"]).await?;
    let message = message.trim();

    let record = ProvenanceRecord {
        commit_hash,
        is_clean: status.trim().is_empty(),
        branch,
        latest_message: (!message.is_empty()).then(|| message.to_owned()),
    };
    tracing::debug!(
        hash = %record.commit_hash,
        branch = %record.branch,
        clean = record.is_clean,
        "provenance collected"
    );
    Ok(record)
}

async fn git(workdir: &Path, args: &[&str]) -> Result<String, PipelineError> {
    let output = tokio::process::Command::new("git")
        .args(args)
        .current_dir(workdir)
        .env("GIT_OPTIONAL_LOCKS", "0")
        .output()
        .await
        .map_err(|e| PipelineError::ProvenanceUnavailable(format!("failed to run git: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PipelineError::ProvenanceUnavailable(format!(
            "git {} failed: {}",
            args.join(" "),
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
