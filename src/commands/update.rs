use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use ecus::pipeline::project::CONFIG_FILE_NAME;
use ecus::pipeline::{self, BundleOptions, HttpUploader, PipelineError, Progress, ProjectConfig};

#[derive(Debug, Args)]
pub struct UpdateArgs {
    /// Project root to bundle
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,
    /// Config file, relative to the project root unless absolute
    #[arg(long, default_value = CONFIG_FILE_NAME)]
    pub config: PathBuf,
    /// Extra path components to leave out of the bundle
    #[arg(long = "exclude", value_name = "NAME")]
    pub exclude: Vec<String>,
    /// Upload request timeout
    #[arg(long, default_value_t = 300)]
    pub timeout_secs: u64,
    /// Overrides the api key from the config file
    #[arg(long, env = "ECUS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

pub async fn run(args: UpdateArgs) -> Result<(), PipelineError> {
    let config_path = args.dir.join(&args.config);
    let mut config = ProjectConfig::load(&config_path).await?;
    if let Some(key) = args.api_key.filter(|k| !k.trim().is_empty()) {
        config.api_key = key;
    }

    let options = BundleOptions::default()
        .with_excludes(args.exclude)
        .exclude_file(&args.dir, &config_path);
    let uploader = HttpUploader::with_timeout(Duration::from_secs(args.timeout_secs))?;

    let result = pipeline::run(&args.dir, &config, &options, &uploader, |progress| {
        match progress {
            Progress::Collected(git) => {
                let dirty = if git.is_clean { "" } else { " (dirty)" };
                println!("Branch: {} @ {}{dirty}", git.branch, git.short_hash());
                if let Some(message) = &git.latest_message {
                    println!("  {message}");
                }
            }
            Progress::Bundled { size, entries } => {
                println!("Bundled {entries} files ({size} bytes)");
            }
            Progress::Uploading { url } => println!("Uploading to remote: {url}"),
        }
    })
    .await?;

    println!("Upload completed, deployment id: {}", result.deployment_id);
    Ok(())
}
