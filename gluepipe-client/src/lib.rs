//! Gluepipe Clients
//!
//! Collaborator contracts for the stage handlers, and their AWS
//! implementations:
//! - [`ObjectStorage`]: artifact download and script upload (S3)
//! - [`JobService`]: job definitions and runs (Glue)
//! - [`RepositoryService`]: commit lookup (CodeCommit)
//! - [`PipelineCallback`]: stage outcome reporting (CodePipeline)
//!
//! Handlers only see the traits, so tests can substitute in-memory doubles.
//!
//! # Example
//!
//! ```no_run
//! use gluepipe_client::{AwsConfig, GlueClient, JobService};
//! use gluepipe_core::dto::glue::StartJobRunRequest;
//!
//! # async fn example() -> gluepipe_client::Result<()> {
//! let config = AwsConfig::from_env()?;
//! let glue = GlueClient::new(&config)?;
//!
//! let response = glue
//!     .start_job_run(&StartJobRunRequest {
//!         job_name: "my_job".to_string(),
//!         timeout: 2880,
//!         number_of_workers: 10,
//!         worker_type: "G.1X".to_string(),
//!     })
//!     .await?;
//! println!("Started run {:?}", response.job_run_id);
//! # Ok(())
//! # }
//! ```

pub mod codecommit;
pub mod codepipeline;
pub mod credentials;
pub mod error;
pub mod glue;
pub mod json;
pub mod signing;
pub mod storage;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use codecommit::{CodeCommitClient, RepositoryService};
pub use codepipeline::{CodePipelineClient, PipelineCallback};
pub use credentials::Credentials;
pub use error::{ClientError, Result};
pub use glue::{GlueClient, JobService};
pub use storage::{BucketStorage, ObjectStorage};

/// Region used when none is configured
pub const DEFAULT_REGION: &str = "us-east-1";

/// Settings shared by every AWS client
#[derive(Debug, Clone)]
pub struct AwsConfig {
    /// Region for endpoints and request signing
    pub region: String,
    /// Overrides every service endpoint (e.g. "http://localhost:4566")
    pub endpoint_url: Option<String>,
    pub credentials: Credentials,
}

impl AwsConfig {
    pub fn new(region: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            region: region.into(),
            endpoint_url: None,
            credentials,
        }
    }

    /// Loads configuration from the environment
    ///
    /// Reads AWS_REGION (falling back to AWS_DEFAULT_REGION, then
    /// "us-east-1"), AWS_ENDPOINT_URL and the credential variables.
    pub fn from_env() -> Result<Self> {
        let region = std::env::var("AWS_REGION")
            .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
            .unwrap_or_else(|_| DEFAULT_REGION.to_string());
        let endpoint_url = std::env::var("AWS_ENDPOINT_URL")
            .ok()
            .filter(|url| !url.is_empty());

        Ok(Self {
            region,
            endpoint_url,
            credentials: Credentials::from_env()?,
        })
    }

    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    /// Endpoint URL for a service signing name
    pub fn endpoint_for(&self, service: &str) -> String {
        match &self.endpoint_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}.{}.amazonaws.com", service, self.region),
        }
    }
}
