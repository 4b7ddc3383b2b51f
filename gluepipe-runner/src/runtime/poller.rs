//! Invocation poller
//!
//! Fetches invocations one at a time and runs each to completion before asking
//! for the next. The Runtime API freezes the process between invocations, so
//! there is no concurrency to manage here.

use anyhow::{Context, Result, anyhow};
use gluepipe_core::domain::event::StageEvent;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::client::{Invocation, RuntimeApi, RuntimeError};
use crate::service::Dispatcher;

const MAX_RETRIES: u32 = 10;
const INITIAL_DELAY_MS: u64 = 500;
const MAX_DELAY_MS: u64 = 30_000;

/// Error type posted for payloads that are not pipeline job events
pub const INVALID_EVENT_ERROR: &str = "InvalidEvent";

/// Poller that feeds runtime invocations to the dispatcher
pub struct InvocationPoller {
    runtime: Arc<dyn RuntimeApi>,
    dispatcher: Arc<Dispatcher>,
}

impl InvocationPoller {
    /// Creates a new invocation poller
    pub fn new(runtime: Arc<dyn RuntimeApi>, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            runtime,
            dispatcher,
        }
    }

    /// Starts the invocation loop
    ///
    /// Only returns when the Runtime API stays unreachable past the retry budget.
    pub async fn run(&self) -> Result<()> {
        info!(
            "Waiting for invocations ({} handler)",
            self.dispatcher.handler_name()
        );

        loop {
            let invocation = self.next_with_retry().await?;
            let request_id = invocation.request_id.clone();

            if let Err(e) = self.process(invocation).await {
                error!("Error completing invocation {}: {:#}", request_id, e);
            }
        }
    }

    /// Fetches the next invocation with exponential backoff
    async fn next_with_retry(&self) -> Result<Invocation> {
        let mut attempt = 0;
        let mut delay_ms = INITIAL_DELAY_MS;

        loop {
            attempt += 1;

            match self.runtime.next_invocation().await {
                Ok(invocation) => {
                    if attempt > 1 {
                        info!("Reached runtime API after {} attempt(s)", attempt);
                    }
                    return Ok(invocation);
                }
                Err(e) => {
                    if attempt >= MAX_RETRIES {
                        error!(
                            "Failed to fetch next invocation after {} attempts",
                            MAX_RETRIES
                        );
                        return Err(anyhow!("Runtime API is unreachable: {:#}", e));
                    }

                    warn!(
                        "Failed to fetch next invocation (attempt {}/{}): {:#}",
                        attempt, MAX_RETRIES, e
                    );
                    warn!("Retrying in {} ms...", delay_ms);

                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;

                    // Exponential backoff with cap
                    delay_ms = (delay_ms * 2).min(MAX_DELAY_MS);
                }
            }
        }
    }

    /// Handles a single invocation and posts its outcome
    pub async fn process(&self, invocation: Invocation) -> Result<()> {
        let request_id = invocation.request_id;
        info!("Processing invocation {}", request_id);
        debug!(
            "Invocation {} deadline={:?} function={:?} trace={:?}",
            request_id, invocation.deadline_ms, invocation.function_arn, invocation.trace_id
        );

        let result = match serde_json::from_slice::<StageEvent>(&invocation.payload) {
            Ok(event) => self.dispatcher.dispatch(event).await,
            Err(e) => match job_id_of(&invocation.payload) {
                // A readable token means the pipeline is waiting on this job
                Some(job_id) => self.dispatcher.reject(&job_id, &e.to_string()).await,
                None => return self.post_invalid_event(&request_id, &e).await,
            },
        };

        let body = serde_json::to_value(&result).context("Failed to serialize result")?;

        self.runtime
            .send_response(&request_id, &body)
            .await
            .context("Failed to post invocation response")
    }

    async fn post_invalid_event(&self, request_id: &str, e: &serde_json::Error) -> Result<()> {
        warn!("Invocation {} is not a pipeline job event: {}", request_id, e);
        let error = RuntimeError::new(
            INVALID_EVENT_ERROR,
            format!("payload is not a pipeline job event: {}", e),
        );
        self.runtime
            .send_error(request_id, &error)
            .await
            .context("Failed to post invocation error")
    }
}

/// Job-completion token of a payload that does not decode as a stage event
fn job_id_of(payload: &[u8]) -> Option<String> {
    let value: JsonValue = serde_json::from_slice(payload).ok()?;
    value
        .get("CodePipeline.job")?
        .get("id")?
        .as_str()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}
