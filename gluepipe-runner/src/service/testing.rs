//! In-memory collaborator doubles for handler tests

use async_trait::async_trait;
use gluepipe_client::{
    ClientError, JobService, ObjectStorage, PipelineCallback, RepositoryService,
};
use gluepipe_core::domain::completion::{FailureDetails, OutputVariables};
use gluepipe_core::domain::event::StageEvent;
use gluepipe_core::dto::codecommit::Commit;
use gluepipe_core::dto::glue::{
    CreateJobRequest, StartJobRunRequest, StartJobRunResponse, UpdateJobRequest,
};
use serde_json::json;
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// A collaborator call, in the order it was made
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    GetCommit { repository: String, commit_id: String },
    Download { bucket: String, key: String },
    Upload { bucket: String, key: String, contents: String },
    CreateJob(CreateJobRequest),
    UpdateJob(UpdateJobRequest),
    StartJobRun(StartJobRunRequest),
    Success { job_id: String, output_variables: OutputVariables },
    Failure { job_id: String, failure: FailureDetails },
}

impl Call {
    pub fn is_report(&self) -> bool {
        matches!(self, Call::Success { .. } | Call::Failure { .. })
    }
}

/// Records every call and serves canned responses
#[derive(Default)]
pub struct FakeServices {
    calls: Mutex<Vec<Call>>,
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    commits: Mutex<HashMap<String, String>>,
    run_response: Mutex<StartJobRunResponse>,
    job_error: Mutex<Option<(&'static str, &'static str)>>,
    callback_error: Mutex<bool>,
}

impl FakeServices {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_object(self: Arc<Self>, bucket: &str, key: &str, contents: Vec<u8>) -> Arc<Self> {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), contents);
        self
    }

    pub fn with_commit(self: Arc<Self>, commit_id: &str, message: &str) -> Arc<Self> {
        self.commits
            .lock()
            .unwrap()
            .insert(commit_id.to_string(), message.to_string());
        self
    }

    pub fn with_run_response(self: Arc<Self>, response: StartJobRunResponse) -> Arc<Self> {
        *self.run_response.lock().unwrap() = response;
        self
    }

    /// Makes every job service call fail with a service error
    pub fn with_job_error(self: Arc<Self>, code: &'static str, message: &'static str) -> Arc<Self> {
        *self.job_error.lock().unwrap() = Some((code, message));
        self
    }

    /// Makes every pipeline callback fail
    pub fn with_failing_callback(self: Arc<Self>) -> Arc<Self> {
        *self.callback_error.lock().unwrap() = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// The single report made, panicking unless there is exactly one
    pub fn report(&self) -> Call {
        let reports: Vec<Call> = self.calls().into_iter().filter(Call::is_report).collect();
        assert_eq!(reports.len(), 1, "expected exactly one report: {:?}", reports);
        reports.into_iter().next().unwrap()
    }

    /// Message of the single failure report
    pub fn failure_message(&self) -> String {
        match self.report() {
            Call::Failure { failure, .. } => failure.message,
            other => panic!("expected a failure report, got {:?}", other),
        }
    }

    /// Output variables of the single success report
    pub fn success_variables(&self) -> OutputVariables {
        match self.report() {
            Call::Success {
                output_variables, ..
            } => output_variables,
            other => panic!("expected a success report, got {:?}", other),
        }
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn job_result(&self) -> Result<(), ClientError> {
        match *self.job_error.lock().unwrap() {
            Some((code, message)) => Err(ClientError::ServiceError {
                service: "glue",
                status: 400,
                code: code.to_string(),
                message: message.to_string(),
            }),
            None => Ok(()),
        }
    }

    fn callback_result(&self) -> Result<(), ClientError> {
        if *self.callback_error.lock().unwrap() {
            return Err(ClientError::ServiceError {
                service: "codepipeline",
                status: 400,
                code: "InvalidJobStateException".to_string(),
                message: "job already completed".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for FakeServices {
    async fn download(
        &self,
        bucket: &str,
        key: &str,
        destination: &Path,
    ) -> Result<u64, ClientError> {
        self.record(Call::Download {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });

        let contents = self
            .objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| ClientError::ServiceError {
                service: "s3",
                status: 404,
                code: "NoSuchKey".to_string(),
                message: format!("no object at {}", key),
            })?;

        tokio::fs::write(destination, &contents).await?;
        Ok(contents.len() as u64)
    }

    async fn upload(&self, source: &Path, bucket: &str, key: &str) -> Result<(), ClientError> {
        let contents = tokio::fs::read_to_string(source).await?;
        self.record(Call::Upload {
            bucket: bucket.to_string(),
            key: key.to_string(),
            contents: contents.clone(),
        });

        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), contents.into_bytes());
        Ok(())
    }
}

#[async_trait]
impl RepositoryService for FakeServices {
    async fn get_commit(
        &self,
        repository: &str,
        commit_id: &str,
    ) -> Result<Option<Commit>, ClientError> {
        self.record(Call::GetCommit {
            repository: repository.to_string(),
            commit_id: commit_id.to_string(),
        });

        let message = self.commits.lock().unwrap().get(commit_id).cloned();
        Ok(message.map(|message| Commit {
            commit_id: Some(commit_id.to_string()),
            message,
            ..Commit::default()
        }))
    }
}

#[async_trait]
impl JobService for FakeServices {
    async fn create_job(&self, request: &CreateJobRequest) -> Result<String, ClientError> {
        self.record(Call::CreateJob(request.clone()));
        self.job_result()?;
        Ok(request.name.clone())
    }

    async fn update_job(&self, request: &UpdateJobRequest) -> Result<String, ClientError> {
        self.record(Call::UpdateJob(request.clone()));
        self.job_result()?;
        Ok(request.job_name.clone())
    }

    async fn start_job_run(
        &self,
        request: &StartJobRunRequest,
    ) -> Result<StartJobRunResponse, ClientError> {
        self.record(Call::StartJobRun(request.clone()));
        self.job_result()?;
        Ok(self.run_response.lock().unwrap().clone())
    }
}

#[async_trait]
impl PipelineCallback for FakeServices {
    async fn put_job_success_result(
        &self,
        job_id: &str,
        output_variables: &OutputVariables,
    ) -> Result<(), ClientError> {
        self.record(Call::Success {
            job_id: job_id.to_string(),
            output_variables: output_variables.clone(),
        });
        self.callback_result()
    }

    async fn put_job_failure_result(
        &self,
        job_id: &str,
        failure: &FailureDetails,
    ) -> Result<(), ClientError> {
        self.record(Call::Failure {
            job_id: job_id.to_string(),
            failure: failure.clone(),
        });
        self.callback_result()
    }
}

/// Builds a zip archive from `(path, contents)` pairs
pub fn zip_archive(files: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, contents) in files {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(contents.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

pub const ARTIFACT_BUCKET: &str = "codepipeline-artifacts";
pub const ARTIFACT_KEY: &str = "etl-pipeline/SourceArti/abc123.zip";

/// A stage event with one S3 input artifact
pub fn stage_event(
    job_id: &str,
    revision: Option<&str>,
    user_parameters: Option<&str>,
) -> StageEvent {
    let mut configuration = json!({"FunctionName": "gluepipe"});
    if let Some(parameters) = user_parameters {
        configuration["UserParameters"] = json!(parameters);
    }

    serde_json::from_value(json!({
        "CodePipeline.job": {
            "id": job_id,
            "accountId": "111122223333",
            "data": {
                "actionConfiguration": {"configuration": configuration},
                "inputArtifacts": [{
                    "name": "SourceArtifact",
                    "revision": revision,
                    "location": {
                        "type": "S3",
                        "s3Location": {
                            "bucketName": ARTIFACT_BUCKET,
                            "objectKey": ARTIFACT_KEY
                        }
                    }
                }],
                "outputArtifacts": []
            }
        }
    }))
    .unwrap()
}
