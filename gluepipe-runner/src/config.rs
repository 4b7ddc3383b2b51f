//! Runner configuration
//!
//! Every setting is a command-line flag with an environment fallback, so the
//! same binary runs unchanged as a Lambda bootstrap (environment only) and
//! from a shell.

use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::service::PromoteSettings;

/// Environment variable holding the Runtime API address inside Lambda
pub const RUNTIME_API_ENV: &str = "AWS_LAMBDA_RUNTIME_API";

#[derive(Debug, Parser)]
#[command(name = "gluepipe-runner")]
#[command(about = "CodePipeline stage actions for Glue jobs", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub config: Config,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Serve invocations from the Lambda Runtime API (default)
    Serve,

    /// Run the handler once against a stage event read from a file
    Invoke {
        /// Path to a CodePipeline job event (JSON)
        event: PathBuf,
    },
}

/// Which stage action this process performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HandlerKind {
    /// Create or update a job definition from a commit
    Promote,
    /// Start a job run
    Run,
}

/// Runner configuration
#[derive(Debug, Clone, Args)]
pub struct Config {
    /// Stage handler to run (the Lambda function's Handler setting)
    #[arg(long, env = "_HANDLER", value_enum)]
    pub handler: HandlerKind,

    /// Source repository holding the promoted commits
    #[arg(long, env = "REPOSITORY_NAME")]
    pub repository_name: Option<String>,

    /// Bucket receiving job scripts
    #[arg(long, env = "GLUE_BUCKET")]
    pub glue_bucket: Option<String>,

    /// Key prefix for job scripts
    #[arg(long, env = "GLUE_PREFIX", default_value = "")]
    pub glue_prefix: String,

    /// Directory holding per-invocation scratch space
    #[arg(long, env = "GLUEPIPE_SCRATCH_DIR", default_value = "/tmp")]
    pub scratch_dir: PathBuf,

    /// Runtime API address (host:port)
    #[arg(long, env = RUNTIME_API_ENV)]
    pub runtime_api: Option<String>,
}

impl Config {
    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.scratch_dir.as_os_str().is_empty() {
            bail!("scratch_dir cannot be empty");
        }

        if self.handler == HandlerKind::Promote {
            self.promote_settings()?;
        }

        Ok(())
    }

    /// Settings of the promote stage
    ///
    /// Requires a repository and a script bucket; surrounding slashes are
    /// trimmed from the prefix.
    pub fn promote_settings(&self) -> Result<PromoteSettings> {
        let repository_name = non_empty(&self.repository_name)
            .ok_or_else(|| anyhow::anyhow!("REPOSITORY_NAME must be set for the promote handler"))?;
        let script_bucket = non_empty(&self.glue_bucket)
            .ok_or_else(|| anyhow::anyhow!("GLUE_BUCKET must be set for the promote handler"))?;

        Ok(PromoteSettings {
            repository_name: repository_name.to_string(),
            script_bucket: script_bucket.to_string(),
            script_prefix: self.glue_prefix.trim_matches('/').to_string(),
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let argv = std::iter::once("gluepipe-runner").chain(args.iter().copied());
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_promote_config() {
        let cli = parse(&[
            "--handler",
            "promote",
            "--repository-name",
            "etl-jobs",
            "--glue-bucket",
            "glue-scripts",
            "--glue-prefix",
            "/glue/scripts/",
        ]);

        assert_eq!(cli.command, None);
        assert!(cli.config.validate().is_ok());
        assert_eq!(
            cli.config.promote_settings().unwrap(),
            PromoteSettings {
                repository_name: "etl-jobs".to_string(),
                script_bucket: "glue-scripts".to_string(),
                script_prefix: "glue/scripts".to_string(),
            }
        );
    }

    #[test]
    fn test_promote_requires_repository_and_bucket() {
        let mut config = parse(&["--handler", "promote", "--glue-bucket", "b"]).config;
        assert!(config.validate().is_err());

        config.repository_name = Some("  ".to_string());
        assert!(config.validate().is_err());

        config.repository_name = Some("etl-jobs".to_string());
        assert!(config.validate().is_ok());

        config.glue_bucket = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_run_config_needs_no_promote_settings() {
        let cli = parse(&["--handler", "run", "--scratch-dir", "/var/tmp", "invoke", "event.json"]);

        assert_eq!(cli.config.handler, HandlerKind::Run);
        assert_eq!(cli.config.scratch_dir, PathBuf::from("/var/tmp"));
        assert!(cli.config.validate().is_ok());
        assert_eq!(
            cli.command,
            Some(Command::Invoke {
                event: PathBuf::from("event.json")
            })
        );
    }

    #[test]
    fn test_empty_scratch_dir_is_rejected() {
        let mut config = parse(&["--handler", "run"]).config;
        config.scratch_dir = PathBuf::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_handler_is_rejected() {
        let result = Cli::try_parse_from(["gluepipe-runner", "--handler", "deploy"]);
        assert!(result.is_err());
    }
}
