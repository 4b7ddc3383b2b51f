//! Stage event domain types
//!
//! The payload the pipeline orchestrator hands to a stage action. Only the job
//! id is mandatory; everything else defaults so that a malformed stage still
//! yields a token the handler can report a failure against.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use thiserror::Error;

/// Key of the user parameters entry in the action configuration
pub const USER_PARAMETERS_KEY: &str = "UserParameters";

/// Invocation payload sent by the pipeline orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageEvent {
    #[serde(rename = "CodePipeline.job")]
    pub job: PipelineJob,
}

/// The pipeline job a stage action must complete
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineJob {
    /// Job-completion token
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default)]
    pub data: JobData,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobData {
    #[serde(default)]
    pub action_configuration: ActionConfiguration,
    #[serde(default)]
    pub input_artifacts: Vec<Artifact>,
    #[serde(default)]
    pub output_artifacts: Vec<Artifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuation_token: Option<String>,
}

/// Free-form stage-action configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionConfiguration {
    #[serde(default)]
    pub configuration: BTreeMap<String, JsonValue>,
}

/// An artifact attached to the stage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub revision: Option<String>,
    #[serde(default)]
    pub location: ArtifactLocation,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactLocation {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub s3_location: Option<S3Location>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3Location {
    #[serde(default)]
    pub bucket_name: String,
    #[serde(default)]
    pub object_key: String,
}

/// Pointer to a zipped source bundle in object storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactReference {
    pub bucket: String,
    pub key: String,
    /// Source revision (commit id) the bundle was built from
    pub revision: Option<String>,
}

/// Errors raised while reading the stage event
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventError {
    #[error("stage has no input artifact")]
    NoInputArtifact,

    #[error("input artifact {0} is not stored in S3")]
    NotInObjectStorage(String),

    #[error("input artifact {0} has an incomplete S3 location")]
    IncompleteLocation(String),

    #[error("input artifact {0} carries no source revision")]
    MissingRevision(String),

    #[error("stage configuration has no UserParameters")]
    MissingUserParameters,
}

impl StageEvent {
    /// Job-completion token to echo back to the orchestrator
    pub fn job_id(&self) -> &str {
        &self.job.id
    }

    /// Resolves the first input artifact to an object-storage reference
    pub fn source_artifact(&self) -> Result<ArtifactReference, EventError> {
        let artifact = self
            .job
            .data
            .input_artifacts
            .first()
            .ok_or(EventError::NoInputArtifact)?;

        let location = artifact
            .location
            .s3_location
            .as_ref()
            .ok_or_else(|| EventError::NotInObjectStorage(artifact.display_name().to_string()))?;

        if location.bucket_name.is_empty() || location.object_key.is_empty() {
            return Err(EventError::IncompleteLocation(
                artifact.display_name().to_string(),
            ));
        }

        Ok(ArtifactReference {
            bucket: location.bucket_name.clone(),
            key: location.object_key.clone(),
            revision: artifact.revision.clone(),
        })
    }

    /// The `UserParameters` string of the stage action, trimmed
    pub fn user_parameters(&self) -> Result<&str, EventError> {
        self.job
            .data
            .action_configuration
            .configuration
            .get(USER_PARAMETERS_KEY)
            .and_then(JsonValue::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(EventError::MissingUserParameters)
    }
}

impl Artifact {
    fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }
}

impl ArtifactReference {
    /// Revision of the artifact, required by the promote flow
    pub fn require_revision(&self) -> Result<&str, EventError> {
        self.revision
            .as_deref()
            .ok_or_else(|| EventError::MissingRevision(self.key.clone()))
    }
}
