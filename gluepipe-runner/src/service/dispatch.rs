//! Completion dispatcher
//!
//! Runs a stage handler for one event and reports its outcome to the
//! pipeline. Every invocation ends in exactly one callback call, and the
//! dispatcher itself never fails: errors from the handler become a failure
//! report, errors from the callback are logged.

use gluepipe_client::PipelineCallback;
use gluepipe_core::domain::completion::CompletionResult;
use gluepipe_core::domain::event::StageEvent;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{Instrument, debug, error, info, info_span};

use super::StageHandler;
use super::artifact::ScratchSpace;

/// Runs stage handlers and reports their completion
pub struct Dispatcher {
    handler: Arc<dyn StageHandler>,
    callback: Arc<dyn PipelineCallback>,
    scratch_root: PathBuf,
}

impl Dispatcher {
    /// Creates a dispatcher
    ///
    /// # Arguments
    /// * `handler` - The stage handler to run for every event
    /// * `callback` - Where the completion result is reported
    /// * `scratch_root` - Directory holding per-invocation scratch space
    pub fn new(
        handler: Arc<dyn StageHandler>,
        callback: Arc<dyn PipelineCallback>,
        scratch_root: PathBuf,
    ) -> Self {
        Self {
            handler,
            callback,
            scratch_root,
        }
    }

    pub fn handler_name(&self) -> &'static str {
        self.handler.name()
    }

    /// Handles one stage event and reports the result
    ///
    /// # Returns
    /// The completion result that was reported
    pub async fn dispatch(&self, event: StageEvent) -> CompletionResult {
        let job_id = event.job_id().to_string();
        let span = info_span!("stage", handler = self.handler.name(), job_id = %job_id);

        async {
            match serde_json::to_string(&event) {
                Ok(raw) => debug!("Received event: {}", raw),
                Err(e) => debug!("Received event (not serializable: {})", e),
            }

            let result = self.execute(&event).await;
            self.report(&job_id, &result).await;
            result
        }
        .instrument(span)
        .await
    }

    /// Reports a failure for a job whose event could not be decoded
    ///
    /// # Arguments
    /// * `job_id` - Job-completion token recovered from the raw payload
    /// * `reason` - Why the event was rejected
    pub async fn reject(&self, job_id: &str, reason: &str) -> CompletionResult {
        let span = info_span!("stage", handler = self.handler.name(), job_id = %job_id);

        async {
            error!("Stage event rejected: {}", reason);
            let result =
                CompletionResult::failure(format!("invalid pipeline job event: {}", reason));
            self.report(job_id, &result).await;
            result
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, event: &StageEvent) -> CompletionResult {
        let outcome = match ScratchSpace::create(&self.scratch_root, event.job_id()).await {
            Ok(scratch) => {
                debug!("Using scratch directory {}", scratch.path().display());
                let outcome = self.handler.execute(event, &scratch).await;
                scratch.cleanup().await;
                outcome
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(output_variables) => {
                info!("Stage succeeded with outputs {:?}", output_variables);
                CompletionResult::success(output_variables)
            }
            Err(e) => {
                error!("Stage failed: {:#}", e);
                CompletionResult::failure(format!("{:#}", e))
            }
        }
    }

    async fn report(&self, job_id: &str, result: &CompletionResult) {
        let reported = match result {
            CompletionResult::Succeeded { output_variables } => {
                self.callback
                    .put_job_success_result(job_id, output_variables)
                    .await
            }
            CompletionResult::Failed { failure } => {
                self.callback.put_job_failure_result(job_id, failure).await
            }
        };

        match reported {
            Ok(()) => info!("Reported completion to pipeline"),
            Err(e) => error!(
                "Failed to report completion to pipeline: {:#}",
                anyhow::Error::new(e)
            ),
        }
    }
}
