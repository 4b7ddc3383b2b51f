//! Completion result domain types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Longest failure message the pipeline callback accepts
pub const MAX_FAILURE_MESSAGE_LEN: usize = 5000;

/// Output variable carrying the promoted job name
pub const GLUE_JOB_NAME_VARIABLE: &str = "glue_job_name";

/// Output variable carrying the started job run id
pub const GLUE_JOB_ID_VARIABLE: &str = "glue_job_id";

pub type OutputVariables = BTreeMap<String, String>;

/// Outcome of one stage invocation
///
/// Exactly one of these is produced and reported per invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CompletionResult {
    Succeeded { output_variables: OutputVariables },
    Failed { failure: FailureDetails },
}

/// Failure category understood by the pipeline callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    JobFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureDetails {
    #[serde(rename = "type")]
    pub kind: FailureKind,
    pub message: String,
}

impl CompletionResult {
    pub fn success(output_variables: OutputVariables) -> Self {
        CompletionResult::Succeeded { output_variables }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        CompletionResult::Failed {
            failure: FailureDetails::job_failed(message),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CompletionResult::Succeeded { .. })
    }
}

impl FailureDetails {
    /// A `JobFailed` failure, message truncated to the callback limit
    pub fn job_failed(message: impl Into<String>) -> Self {
        let mut message = message.into();
        if message.chars().count() > MAX_FAILURE_MESSAGE_LEN {
            message = message.chars().take(MAX_FAILURE_MESSAGE_LEN).collect();
        }

        Self {
            kind: FailureKind::JobFailed,
            message,
        }
    }
}
