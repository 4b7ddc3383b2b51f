//! Pipeline callback (CodePipeline)

use async_trait::async_trait;
use gluepipe_core::domain::completion::{FailureDetails, OutputVariables};
use gluepipe_core::dto::codepipeline::{PutJobFailureResultRequest, PutJobSuccessResultRequest};
use serde::de::IgnoredAny;

use crate::AwsConfig;
use crate::error::Result;
use crate::json::AwsJsonClient;

/// Reports the outcome of a stage action back to the pipeline
#[async_trait]
pub trait PipelineCallback: Send + Sync {
    /// Marks the pipeline job as succeeded
    ///
    /// # Arguments
    /// * `job_id` - The job-completion token from the stage event
    /// * `output_variables` - Variables exposed to later pipeline stages
    async fn put_job_success_result(
        &self,
        job_id: &str,
        output_variables: &OutputVariables,
    ) -> Result<()>;

    /// Marks the pipeline job as failed
    ///
    /// # Arguments
    /// * `job_id` - The job-completion token from the stage event
    /// * `failure` - Failure kind and message shown on the stage
    async fn put_job_failure_result(&self, job_id: &str, failure: &FailureDetails) -> Result<()>;
}

/// AWS CodePipeline implementation of [`PipelineCallback`]
#[derive(Debug, Clone)]
pub struct CodePipelineClient {
    inner: AwsJsonClient,
}

impl CodePipelineClient {
    pub const SERVICE: &'static str = "codepipeline";
    pub const TARGET_PREFIX: &'static str = "CodePipeline_20150709";

    pub fn new(config: &AwsConfig) -> Result<Self> {
        Ok(Self {
            inner: AwsJsonClient::new(config, Self::SERVICE, Self::TARGET_PREFIX)?,
        })
    }
}

#[async_trait]
impl PipelineCallback for CodePipelineClient {
    async fn put_job_success_result(
        &self,
        job_id: &str,
        output_variables: &OutputVariables,
    ) -> Result<()> {
        let request = PutJobSuccessResultRequest {
            job_id: job_id.to_string(),
            output_variables: output_variables.clone(),
        };
        self.inner
            .call::<_, IgnoredAny>("PutJobSuccessResult", &request)
            .await?;

        Ok(())
    }

    async fn put_job_failure_result(&self, job_id: &str, failure: &FailureDetails) -> Result<()> {
        let request = PutJobFailureResultRequest {
            job_id: job_id.to_string(),
            failure_details: failure.clone(),
        };
        self.inner
            .call::<_, IgnoredAny>("PutJobFailureResult", &request)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeAws, test_config};
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_put_job_success_result() {
        let fake = FakeAws::start_raw(|_, _| (StatusCode::OK, String::new())).await;
        let codepipeline = CodePipelineClient::new(&test_config(&fake.url)).unwrap();

        let variables =
            OutputVariables::from([("glue_job_name".to_string(), "my_job".to_string())]);
        codepipeline
            .put_job_success_result("job-1", &variables)
            .await
            .unwrap();

        let requests = fake.requests();
        assert_eq!(requests[0].target, "CodePipeline_20150709.PutJobSuccessResult");
        assert_eq!(
            requests[0].body,
            json!({"jobId": "job-1", "outputVariables": {"glue_job_name": "my_job"}})
        );
    }

    #[tokio::test]
    async fn test_put_job_failure_result() {
        let fake = FakeAws::start(|_, _| (StatusCode::OK, json!({}))).await;
        let codepipeline = CodePipelineClient::new(&test_config(&fake.url)).unwrap();

        codepipeline
            .put_job_failure_result(
                "job-1",
                &FailureDetails::job_failed("commit is not found abc."),
            )
            .await
            .unwrap();

        let requests = fake.requests();
        assert_eq!(requests[0].target, "CodePipeline_20150709.PutJobFailureResult");
        assert_eq!(
            requests[0].body,
            json!({
                "jobId": "job-1",
                "failureDetails": {"type": "JobFailed", "message": "commit is not found abc."}
            })
        );
    }

    #[tokio::test]
    async fn test_invalid_job_state_is_an_error() {
        let fake = FakeAws::start(|_, _| {
            (
                StatusCode::BAD_REQUEST,
                json!({"__type": "InvalidJobStateException", "message": "job already completed"}),
            )
        })
        .await;
        let codepipeline = CodePipelineClient::new(&test_config(&fake.url)).unwrap();

        let err = codepipeline
            .put_job_success_result("job-1", &OutputVariables::new())
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some("InvalidJobStateException"));
    }
}
