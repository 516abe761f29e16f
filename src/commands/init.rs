use std::path::PathBuf;

use clap::Args;
use ecus::pipeline::project::CONFIG_FILE_NAME;
use ecus::pipeline::{PipelineError, ProjectConfig};

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Base url of the deployment server
    #[arg(long)]
    pub url: String,
    /// Upload key issued for this project
    #[arg(long, env = "ECUS_API_KEY", hide_env_values = true)]
    pub api_key: String,
    #[arg(long)]
    pub project_id: String,
    /// Config file to write
    #[arg(long, default_value = CONFIG_FILE_NAME)]
    pub config: PathBuf,
    /// Replace an existing config file
    #[arg(long)]
    pub force: bool,
}

pub async fn run(args: InitArgs) -> Result<(), PipelineError> {
    if !args.force && tokio::fs::try_exists(&args.config).await.unwrap_or(false) {
        return Err(PipelineError::ConfigInvalid(format!(
            "{} already exists (use --force to replace it)",
            args.config.display()
        )));
    }

    let config = ProjectConfig {
        remote_url: args.url,
        api_key: args.api_key,
        project_id: args.project_id,
    };
    config.validate()?;
    config.upload_url()?;
    config.save(&args.config).await?;

    println!("Wrote {}", args.config.display());
    println!("  Remote: {}", config.remote_url);
    println!("  Project: {}", config.project_id);
    println!("Keep {CONFIG_FILE_NAME} out of version control; it holds the api key.");
    Ok(())
}
