//! Job service (Glue)

use async_trait::async_trait;
use gluepipe_core::dto::glue::{
    CreateJobRequest, CreateJobResponse, StartJobRunRequest, StartJobRunResponse,
    UpdateJobRequest, UpdateJobResponse,
};
use tracing::debug;

use crate::AwsConfig;
use crate::error::Result;
use crate::json::AwsJsonClient;

/// Managed job service operations used by the stage handlers
#[async_trait]
pub trait JobService: Send + Sync {
    /// Creates a job definition
    ///
    /// # Returns
    /// The name of the created job
    async fn create_job(&self, request: &CreateJobRequest) -> Result<String>;

    /// Replaces a job definition with `request.job_update`
    ///
    /// # Returns
    /// The name of the updated job
    async fn update_job(&self, request: &UpdateJobRequest) -> Result<String>;

    /// Starts a run of an existing job
    async fn start_job_run(&self, request: &StartJobRunRequest) -> Result<StartJobRunResponse>;
}

/// AWS Glue implementation of [`JobService`]
#[derive(Debug, Clone)]
pub struct GlueClient {
    inner: AwsJsonClient,
}

impl GlueClient {
    pub const SERVICE: &'static str = "glue";
    pub const TARGET_PREFIX: &'static str = "AWSGlue";

    pub fn new(config: &AwsConfig) -> Result<Self> {
        Ok(Self {
            inner: AwsJsonClient::new(config, Self::SERVICE, Self::TARGET_PREFIX)?,
        })
    }
}

#[async_trait]
impl JobService for GlueClient {
    async fn create_job(&self, request: &CreateJobRequest) -> Result<String> {
        let response: CreateJobResponse = self.inner.call("CreateJob", request).await?;
        debug!("CreateJob response: {:?}", response);

        Ok(response.name.unwrap_or_else(|| request.name.clone()))
    }

    async fn update_job(&self, request: &UpdateJobRequest) -> Result<String> {
        let response: UpdateJobResponse = self.inner.call("UpdateJob", request).await?;
        debug!("UpdateJob response: {:?}", response);

        Ok(response.job_name.unwrap_or_else(|| request.job_name.clone()))
    }

    async fn start_job_run(&self, request: &StartJobRunRequest) -> Result<StartJobRunResponse> {
        let response: StartJobRunResponse = self.inner.call("StartJobRun", request).await?;
        debug!("StartJobRun response: {:?}", response);

        Ok(response)
    }
}
