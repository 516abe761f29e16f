pub mod init;
pub mod serve;
pub mod update;

use std::process::ExitCode;

use colored::Colorize;
use ecus::pipeline::PipelineError;

/// Print a failure to stderr and turn the outcome into an exit code.
pub fn report(result: Result<(), PipelineError>) -> ExitCode {
    let Err(err) = result else {
        return ExitCode::SUCCESS;
    };

    eprintln!("{} {err}", "error:".red().bold());
    match &err {
        PipelineError::ConfigUnreadable(_) | PipelineError::ConfigIncomplete(_) => {
            eprintln!("Please run `ecus init` before.");
        }
        PipelineError::UploadRejected { body, .. } if !body.is_empty() => {
            eprintln!("{body}");
        }
        PipelineError::MalformedResponse { body, .. } => {
            eprintln!(
                "{} the server answered with success but no deployment id; \
                 check the admin listing before retrying",
                "warning:".yellow().bold()
            );
            if !body.is_empty() {
                eprintln!("{body}");
            }
        }
        _ => {}
    }
    ExitCode::from(err.exit_code())
}
