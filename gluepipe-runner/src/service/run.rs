//! Run stage
//!
//! Starts a run of the job named in the action's `UserParameters`, sized by
//! the configuration committed alongside the job.

use anyhow::{Context, Result};
use async_trait::async_trait;
use gluepipe_client::{JobService, ObjectStorage};
use gluepipe_core::domain::completion::{GLUE_JOB_ID_VARIABLE, OutputVariables};
use gluepipe_core::domain::directive::JobName;
use gluepipe_core::domain::event::StageEvent;
use gluepipe_core::dto::glue::StartJobRunRequest;
use std::sync::Arc;
use tracing::{info, warn};

use super::artifact::{ArtifactWorkspace, ScratchSpace};
use super::{StageError, StageHandler};

/// Starts job runs
pub struct RunHandler {
    jobs: Arc<dyn JobService>,
    workspace: ArtifactWorkspace,
}

impl RunHandler {
    pub fn new(storage: Arc<dyn ObjectStorage>, jobs: Arc<dyn JobService>) -> Self {
        Self {
            jobs,
            workspace: ArtifactWorkspace::new(storage),
        }
    }
}

#[async_trait]
impl StageHandler for RunHandler {
    fn name(&self) -> &'static str {
        "run"
    }

    async fn execute(&self, event: &StageEvent, scratch: &ScratchSpace) -> Result<OutputVariables> {
        let job: JobName = event.user_parameters()?.parse()?;
        info!("Starting a run of job {}", job);

        let artifact = event.source_artifact()?;
        let tree = self.workspace.fetch_and_unpack(&artifact, scratch).await?;
        let config = tree.read_configuration(&job).await?;

        let request = StartJobRunRequest::from_configuration(&job, &config);
        info!(
            "Run sizing: timeout={} workers={} worker_type={}",
            request.timeout, request.number_of_workers, request.worker_type
        );

        let response = self
            .jobs
            .start_job_run(&request)
            .await
            .with_context(|| format!("Failed to start job {}", job))?;

        match response.job_run_id {
            Some(run_id) => {
                info!("Started job run {}", run_id);
                Ok(OutputVariables::from([(
                    GLUE_JOB_ID_VARIABLE.to_string(),
                    run_id,
                )]))
            }
            None => {
                warn!("Start-run response has no JobRunId");
                let raw = serde_json::to_string(&response)?;
                Err(StageError::MissingRunId(raw).into())
            }
        }
    }
}
