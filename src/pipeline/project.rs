use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::PipelineError;

/// Default file name, looked up in the project root.
pub const CONFIG_FILE_NAME: &str = ".ecus.json";

/// Remote target and credentials for one project. Read-only once loaded.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(rename = "url", alias = "remoteUrl", default)]
    pub remote_url: String,
    #[serde(rename = "apikey", alias = "apiKey", default)]
    pub api_key: String,
    #[serde(rename = "projectId", default)]
    pub project_id: String,
}

// Keep the key out of logs.
impl std::fmt::Debug for ProjectConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectConfig")
            .field("remote_url", &self.remote_url)
            .field("api_key", &"<redacted>")
            .field("project_id", &self.project_id)
            .finish()
    }
}

impl ProjectConfig {
    pub async fn load(path: &Path) -> Result<Self, PipelineError> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            PipelineError::ConfigUnreadable(format!("{}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw)
            .map_err(|e| PipelineError::ConfigUnreadable(format!("{}: {e}", path.display())))
    }

    pub async fn save(&self, path: &Path) -> Result<(), PipelineError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| PipelineError::ConfigInvalid(e.to_string()))?;
        tokio::fs::write(path, json + "\n").await.map_err(|e| {
            PipelineError::ConfigUnreadable(format!("{}: {e}", path.display()))
        })
    }

    /// All three fields must be non-blank.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let missing: Vec<&'static str> = [
            ("remoteUrl", &self.remote_url),
            ("apiKey", &self.api_key),
            ("projectId", &self.project_id),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::ConfigIncomplete(missing))
        }
    }

    /// `{remote_url}/api/{project_id}/upload`, with the project id as one
    /// percent-encoded segment.
    pub fn upload_url(&self) -> Result<url::Url, PipelineError> {
        let mut url = url::Url::parse(self.remote_url.trim())
            .map_err(|e| PipelineError::ConfigInvalid(format!("remote url: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(PipelineError::ConfigInvalid(
                "remote url must use http or https scheme".into(),
            ));
        }

        url.path_segments_mut()
            .map_err(|()| PipelineError::ConfigInvalid("remote url cannot be a base".into()))?
            .pop_if_empty()
            .extend(["api", self.project_id.trim(), "upload"]);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn complete() -> ProjectConfig {
        ProjectConfig {
            remote_url: "https://deploy.example.com".into(),
            api_key: "key".into(),
            project_id: "proj".into(),
        }
    }

    #[test]
    fn complete_config_validates() {
        assert!(complete().validate().is_ok());
    }

    #[rstest]
    #[case::no_url(ProjectConfig { remote_url: String::new(), ..complete() }, "remoteUrl")]
    #[case::no_key(ProjectConfig { api_key: String::new(), ..complete() }, "apiKey")]
    #[case::no_project(ProjectConfig { project_id: String::new(), ..complete() }, "projectId")]
    #[case::blank_key(ProjectConfig { api_key: "  ".into(), ..complete() }, "apiKey")]
    fn missing_field_is_reported(#[case] config: ProjectConfig, #[case] field: &str) {
        match config.validate() {
            Err(PipelineError::ConfigIncomplete(missing)) => assert_eq!(missing, vec![field]),
            other => panic!("expected ConfigIncomplete, got {other:?}"),
        }
    }

    #[test]
    fn empty_config_reports_all_fields() {
        let err = ProjectConfig::default().validate().unwrap_err();
        assert!(
            matches!(err, PipelineError::ConfigIncomplete(m) if m == ["remoteUrl", "apiKey", "projectId"])
        );
    }

    #[rstest]
    #[case("https://deploy.example.com", "https://deploy.example.com/api/proj/upload")]
    #[case("https://deploy.example.com/", "https://deploy.example.com/api/proj/upload")]
    #[case("http://host:3000/base", "http://host:3000/base/api/proj/upload")]
    fn upload_url_is_joined(#[case] base: &str, #[case] expected: &str) {
        let config = ProjectConfig {
            remote_url: base.into(),
            ..complete()
        };
        assert_eq!(config.upload_url().unwrap().as_str(), expected);
    }

    #[test]
    fn upload_url_encodes_project_id() {
        let config = ProjectConfig {
            project_id: "a/b c".into(),
            ..complete()
        };
        assert_eq!(
            config.upload_url().unwrap().as_str(),
            "https://deploy.example.com/api/a%2Fb%20c/upload"
        );
    }

    #[rstest]
    #[case("not a url")]
    #[case("ftp://deploy.example.com")]
    fn bad_remote_url_is_invalid(#[case] base: &str) {
        let config = ProjectConfig {
            remote_url: base.into(),
            ..complete()
        };
        assert!(matches!(config.upload_url(), Err(PipelineError::ConfigInvalid(_))));
    }

    #[test]
    fn reads_short_and_long_keys() {
        let short: ProjectConfig =
            serde_json::from_str(r#"{"url":"u","apikey":"k","projectId":"p"}"#).unwrap();
        let long: ProjectConfig =
            serde_json::from_str(r#"{"remoteUrl":"u","apiKey":"k","projectId":"p"}"#).unwrap();
        assert_eq!(short, long);
    }

    #[test]
    fn debug_redacts_api_key() {
        let printed = format!("{:?}", complete());
        assert!(!printed.contains("\"key\""));
        assert!(printed.contains("<redacted>"));
    }

    #[tokio::test]
    async fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        complete().save(&path).await.unwrap();

        let loaded = ProjectConfig::load(&path).await.unwrap();
        assert_eq!(loaded, complete());
    }

    #[tokio::test]
    async fn missing_file_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let err = ProjectConfig::load(&dir.path().join("nope.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::ConfigUnreadable(_)));
    }
}
