use std::collections::HashMap;
use std::env;

/// Server configuration, read from the environment at start.
#[derive(Clone)]
pub struct Config {
    pub listen: String,
    pub s3_endpoint: String,
    pub s3_region: String,
    pub s3_bucket: String,
    pub s3_access_key_id: String,
    pub s3_secret_access_key: String,
    /// project id -> upload key
    pub api_keys: HashMap<String, String>,
    pub admin_token: Option<String>,
    pub max_upload_bytes: usize,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("listen", &self.listen)
            .field("s3_endpoint", &self.s3_endpoint)
            .field("s3_region", &self.s3_region)
            .field("s3_bucket", &self.s3_bucket)
            .field("projects", &self.api_keys.keys().collect::<Vec<_>>())
            .field("admin_enabled", &self.admin_token.is_some())
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish_non_exhaustive()
    }
}

fn parse_api_keys(s: &str) -> HashMap<String, String> {
    s.split(',')
        .filter_map(|pair| {
            let (project, key) = pair.split_once('=')?;
            let (project, key) = (project.trim(), key.trim());
            (!project.is_empty() && !key.is_empty()).then(|| (project.to_owned(), key.to_owned()))
        })
        .collect()
}

impl Config {
    pub fn load() -> Self {
        Self {
            listen: env::var("ECUS_LISTEN").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            s3_endpoint: env::var("S3_ENDPOINT").unwrap_or_else(|_| "http://localhost:9000".into()),
            s3_region: env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into()),
            s3_bucket: env::var("S3_BUCKET_NAME").unwrap_or_else(|_| "ecus".into()),
            s3_access_key_id: env::var("S3_ACCESS_KEY_ID").unwrap_or_default(),
            s3_secret_access_key: env::var("S3_SECRET_ACCESS_KEY").unwrap_or_default(),
            api_keys: env::var("ECUS_API_KEYS")
                .ok()
                .map_or_else(HashMap::new, |v| parse_api_keys(&v)),
            admin_token: env::var("ECUS_ADMIN_TOKEN").ok().filter(|t| !t.is_empty()),
            max_upload_bytes: env::var("ECUS_MAX_UPLOAD_MB")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(512)
                .saturating_mul(1024 * 1024),
        }
    }
}
