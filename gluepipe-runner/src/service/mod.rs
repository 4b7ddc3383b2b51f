//! Service layer
//!
//! Stage handlers contain the business logic of each pipeline action. They
//! orchestrate the collaborators from `gluepipe-client` and return either the
//! output variables of a successful stage or an error. The [`Dispatcher`]
//! turns that outcome into exactly one report to the pipeline.
//!
//! All handlers are trait-based so the runtime loop and tests can swap them.

mod artifact;
mod dispatch;
mod promote;
mod run;

#[cfg(test)]
pub(crate) mod testing;

use anyhow::Result;
use async_trait::async_trait;
use gluepipe_core::domain::completion::OutputVariables;
use gluepipe_core::domain::event::StageEvent;
use thiserror::Error;

pub use artifact::ScratchSpace;
pub use dispatch::Dispatcher;
pub use promote::{PromoteHandler, PromoteSettings};
pub use run::RunHandler;

/// A pipeline stage action
#[async_trait]
pub trait StageHandler: Send + Sync {
    /// Short name used in logs and spans
    fn name(&self) -> &'static str;

    /// Executes the stage for one event
    ///
    /// # Arguments
    /// * `event` - The stage event delivered by the pipeline
    /// * `scratch` - Scratch directory owned by this invocation
    ///
    /// # Returns
    /// Output variables to publish on success
    async fn execute(&self, event: &StageEvent, scratch: &ScratchSpace)
    -> Result<OutputVariables>;
}

/// Stage failures that do not originate in a collaborator
#[derive(Debug, Error)]
pub enum StageError {
    #[error("commit is not found {0}.")]
    CommitNotFound(String),

    #[error("artifact does not contain {0}")]
    MissingFile(String),

    /// Start-run response without a run id, carried as raw JSON
    #[error("{0}")]
    MissingRunId(String),
}
