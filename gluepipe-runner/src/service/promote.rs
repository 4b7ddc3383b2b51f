//! Promote stage
//!
//! Reads the directive from the commit behind the source artifact, publishes
//! the job script, and creates or updates the job definition from the
//! committed configuration.

use anyhow::{Context, Result};
use async_trait::async_trait;
use gluepipe_client::{JobService, ObjectStorage, RepositoryService};
use gluepipe_core::domain::completion::{GLUE_JOB_NAME_VARIABLE, OutputVariables};
use gluepipe_core::domain::directive::{CommitDirective, DirectiveAction, JobName};
use gluepipe_core::domain::event::StageEvent;
use gluepipe_core::dto::glue::{CreateJobRequest, UpdateJobRequest};
use std::sync::Arc;
use tracing::info;

use super::artifact::{ArtifactWorkspace, ScratchSpace};
use super::{StageError, StageHandler};

/// Where promoted scripts are published and which repository holds the commits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromoteSettings {
    pub repository_name: String,
    pub script_bucket: String,
    /// Key prefix without surrounding slashes; may be empty
    pub script_prefix: String,
}

impl PromoteSettings {
    /// Object key of a job's script: `<prefix>/<job>/<job>.py`
    pub fn script_key(&self, job: &JobName) -> String {
        if self.script_prefix.is_empty() {
            format!("{}/{}", job, job.script_file())
        } else {
            format!("{}/{}/{}", self.script_prefix, job, job.script_file())
        }
    }
}

/// Creates or updates a job definition from a source commit
pub struct PromoteHandler {
    settings: PromoteSettings,
    storage: Arc<dyn ObjectStorage>,
    repository: Arc<dyn RepositoryService>,
    jobs: Arc<dyn JobService>,
    workspace: ArtifactWorkspace,
}

impl PromoteHandler {
    pub fn new(
        settings: PromoteSettings,
        storage: Arc<dyn ObjectStorage>,
        repository: Arc<dyn RepositoryService>,
        jobs: Arc<dyn JobService>,
    ) -> Self {
        let workspace = ArtifactWorkspace::new(Arc::clone(&storage));
        Self {
            settings,
            storage,
            repository,
            jobs,
            workspace,
        }
    }

    /// Resolves the commit and parses its message
    async fn read_directive(&self, revision: &str) -> Result<CommitDirective> {
        info!(
            "Looking up commit {} in {}",
            revision, self.settings.repository_name
        );
        let commit = self
            .repository
            .get_commit(&self.settings.repository_name, revision)
            .await
            .with_context(|| {
                format!(
                    "Failed to look up commit {} in {}",
                    revision, self.settings.repository_name
                )
            })?
            .ok_or_else(|| StageError::CommitNotFound(revision.to_string()))?;

        info!("Commit message: {:?}", commit.message);
        Ok(CommitDirective::parse(&commit.message)?)
    }
}

#[async_trait]
impl StageHandler for PromoteHandler {
    fn name(&self) -> &'static str {
        "promote"
    }

    async fn execute(&self, event: &StageEvent, scratch: &ScratchSpace) -> Result<OutputVariables> {
        let artifact = event.source_artifact()?;
        let revision = artifact.require_revision()?;

        let directive = self.read_directive(revision).await?;
        let job = &directive.job_name;
        info!("Directive: {} {}", directive.action, job);

        let tree = self.workspace.fetch_and_unpack(&artifact, scratch).await?;

        let script = tree.script_path(job).await?;
        let key = self.settings.script_key(job);
        self.storage
            .upload(&script, &self.settings.script_bucket, &key)
            .await
            .with_context(|| {
                format!(
                    "Failed to upload script to s3://{}/{}",
                    self.settings.script_bucket, key
                )
            })?;

        match directive.action {
            DirectiveAction::Create => {
                let config = tree.read_configuration(job).await?;
                let request = CreateJobRequest::from_configuration(job, &config)
                    .with_context(|| format!("Invalid configuration for job {}", job))?;
                let name = self
                    .jobs
                    .create_job(&request)
                    .await
                    .with_context(|| format!("Failed to create job {}", job))?;
                info!("Created job definition {}", name);
            }
            DirectiveAction::Update => {
                let job_update = tree.read_raw_configuration(job).await?;
                let request = UpdateJobRequest::new(job, job_update);
                let name = self
                    .jobs
                    .update_job(&request)
                    .await
                    .with_context(|| format!("Failed to update job {}", job))?;
                info!("Updated job definition {}", name);
            }
        }

        Ok(OutputVariables::from([(
            GLUE_JOB_NAME_VARIABLE.to_string(),
            job.to_string(),
        )]))
    }
}
