//! Gluepipe Runner
//!
//! Lambda bootstrap for the CodePipeline stage actions that manage Glue jobs.
//!
//! Architecture:
//! - Configuration: command-line flags with environment fallbacks
//! - Services: stage handlers (promote, run) and the completion dispatcher
//! - Runtime: Lambda Runtime API client and the invocation loop
//!
//! The same binary serves both actions; `_HANDLER` picks one at startup.

mod config;
mod runtime;
mod service;

use anyhow::{Context, Result};
use clap::Parser;
use gluepipe_client::{
    AwsConfig, BucketStorage, CodeCommitClient, CodePipelineClient, GlueClient, JobService,
    ObjectStorage,
};
use gluepipe_core::domain::event::StageEvent;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Cli, Command, Config, HandlerKind, RUNTIME_API_ENV};
use crate::runtime::{HttpRuntimeApi, InvocationPoller, RuntimeApi, RuntimeError};
use crate::service::{Dispatcher, PromoteHandler, RunHandler, StageHandler};

const INIT_ERROR_TYPE: &str = "Runtime.InitError";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gluepipe_runner=info,gluepipe_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_ansi(false))
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            if e.use_stderr() {
                if let Ok(runtime_api) = std::env::var(RUNTIME_API_ENV) {
                    report_init_error(&HttpRuntimeApi::new(&runtime_api), &e.to_string()).await;
                }
            }
            e.exit()
        }
    };

    info!("Starting Gluepipe Runner ({:?} handler)", cli.config.handler);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&cli.config).await,
        Command::Invoke { event } => invoke(&cli.config, &event).await,
    }
}

/// Serves invocations from the Runtime API until it becomes unreachable
async fn serve(config: &Config) -> Result<()> {
    let runtime_api = config
        .runtime_api
        .as_deref()
        .context("AWS_LAMBDA_RUNTIME_API is not set; use `invoke` outside Lambda")?;
    let runtime = Arc::new(HttpRuntimeApi::new(runtime_api));

    let dispatcher = match build_dispatcher(config) {
        Ok(dispatcher) => dispatcher,
        Err(e) => {
            error!("Initialization failed: {:#}", e);
            report_init_error(runtime.as_ref(), &format!("{:#}", e)).await;
            return Err(e);
        }
    };

    info!("Runner initialized; runtime API at {}", runtime_api);

    let poller = InvocationPoller::new(runtime, Arc::new(dispatcher));
    if let Err(e) = poller.run().await {
        error!("Poller error: {:#}", e);
        return Err(e);
    }

    Ok(())
}

/// Runs the handler once against an event file and prints the result
async fn invoke(config: &Config, event_path: &Path) -> Result<()> {
    let dispatcher = build_dispatcher(config)?;

    let payload = tokio::fs::read(event_path)
        .await
        .with_context(|| format!("Failed to read event file {}", event_path.display()))?;
    let event: StageEvent = serde_json::from_slice(&payload)
        .with_context(|| format!("{} is not a pipeline job event", event_path.display()))?;

    let result = dispatcher.dispatch(event).await;
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}

/// Wires the configured handler to the AWS collaborators
fn build_dispatcher(config: &Config) -> Result<Dispatcher> {
    config.validate()?;

    let aws = AwsConfig::from_env().context("Failed to load AWS configuration")?;
    info!(
        "AWS region {}, endpoint override {:?}",
        aws.region, aws.endpoint_url
    );

    let storage: Arc<dyn ObjectStorage> = Arc::new(BucketStorage::s3(&aws));
    let jobs: Arc<dyn JobService> =
        Arc::new(GlueClient::new(&aws).context("Failed to create Glue client")?);
    let callback = Arc::new(
        CodePipelineClient::new(&aws).context("Failed to create CodePipeline client")?,
    );

    let handler: Arc<dyn StageHandler> = match config.handler {
        HandlerKind::Promote => {
            let settings = config.promote_settings()?;
            info!(
                "Promoting from {} to s3://{}/{}",
                settings.repository_name, settings.script_bucket, settings.script_prefix
            );
            let repository = Arc::new(
                CodeCommitClient::new(&aws).context("Failed to create CodeCommit client")?,
            );
            Arc::new(PromoteHandler::new(settings, storage, repository, jobs))
        }
        HandlerKind::Run => Arc::new(RunHandler::new(storage, jobs)),
    };

    Ok(Dispatcher::new(
        handler,
        callback,
        config.scratch_dir.clone(),
    ))
}

async fn report_init_error(runtime: &dyn RuntimeApi, message: &str) {
    let error = RuntimeError::new(INIT_ERROR_TYPE, message);
    if let Err(e) = runtime.send_init_error(&error).await {
        error!("Failed to report initialization error: {:#}", e);
    }
}
