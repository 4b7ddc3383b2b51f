//! Job service (Glue) DTOs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;

use crate::domain::config::{ConfigError, JobConfiguration};
use crate::domain::directive::JobName;

/// Request to create a job definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateJobRequest {
    pub name: String,
    pub description: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_property: Option<Map<String, JsonValue>>,
    pub command: Map<String, JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_arguments: Option<BTreeMap<String, String>>,
    pub max_retries: u32,
    pub timeout: u32,
    pub glue_version: String,
    pub number_of_workers: u32,
    pub worker_type: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateJobResponse {
    #[serde(default)]
    pub name: Option<String>,
}

/// Request to replace a job definition
///
/// `job_update` is sent as committed; the service replaces the whole
/// definition with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateJobRequest {
    pub job_name: String,
    pub job_update: Map<String, JsonValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateJobResponse {
    #[serde(default)]
    pub job_name: Option<String>,
}

/// Request to start a run of a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StartJobRunRequest {
    pub job_name: String,
    pub timeout: u32,
    pub number_of_workers: u32,
    pub worker_type: String,
}

/// Response to a start-run call
///
/// Unknown keys are kept so the whole response can be echoed back when it
/// lacks a run id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StartJobRunResponse {
    #[serde(rename = "JobRunId", default, skip_serializing_if = "Option::is_none")]
    pub job_run_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl CreateJobRequest {
    /// Builds a create request, applying configuration defaults
    pub fn from_configuration(
        name: &JobName,
        config: &JobConfiguration,
    ) -> Result<Self, ConfigError> {
        let settings = config.settings();

        Ok(Self {
            name: name.to_string(),
            description: settings.description().to_string(),
            role: settings.require_role()?.to_string(),
            execution_property: settings.execution_property.clone(),
            command: settings.require_command()?.clone(),
            default_arguments: settings.default_arguments.clone(),
            max_retries: settings.max_retries(),
            timeout: settings.timeout(),
            glue_version: settings.glue_version().to_string(),
            number_of_workers: settings.number_of_workers(),
            worker_type: settings.worker_type().to_string(),
        })
    }
}

impl UpdateJobRequest {
    pub fn new(name: &JobName, job_update: Map<String, JsonValue>) -> Self {
        Self {
            job_name: name.to_string(),
            job_update,
        }
    }
}

impl StartJobRunRequest {
    pub fn from_configuration(name: &JobName, config: &JobConfiguration) -> Self {
        let settings = config.settings();

        Self {
            job_name: name.to_string(),
            timeout: settings.timeout(),
            number_of_workers: settings.number_of_workers(),
            worker_type: settings.worker_type().to_string(),
        }
    }
}
