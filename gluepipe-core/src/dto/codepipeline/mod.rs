//! Pipeline callback (CodePipeline) DTOs

use serde::{Deserialize, Serialize};

use crate::domain::completion::{FailureDetails, OutputVariables};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutJobSuccessResultRequest {
    pub job_id: String,
    #[serde(default, skip_serializing_if = "OutputVariables::is_empty")]
    pub output_variables: OutputVariables,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutJobFailureResultRequest {
    pub job_id: String,
    pub failure_details: FailureDetails,
}
