//! Repository service (CodeCommit)

use async_trait::async_trait;
use gluepipe_core::dto::codecommit::{Commit, GetCommitRequest, GetCommitResponse};
use tracing::debug;

use crate::AwsConfig;
use crate::error::Result;
use crate::json::AwsJsonClient;

/// Source repository operations used by the promote stage
#[async_trait]
pub trait RepositoryService: Send + Sync {
    /// Looks up a commit
    ///
    /// # Returns
    /// `None` when the repository has no such commit; other failures are errors
    async fn get_commit(&self, repository: &str, commit_id: &str) -> Result<Option<Commit>>;
}

/// AWS CodeCommit implementation of [`RepositoryService`]
#[derive(Debug, Clone)]
pub struct CodeCommitClient {
    inner: AwsJsonClient,
}

impl CodeCommitClient {
    pub const SERVICE: &'static str = "codecommit";
    pub const TARGET_PREFIX: &'static str = "CodeCommit_20150413";

    pub fn new(config: &AwsConfig) -> Result<Self> {
        Ok(Self {
            inner: AwsJsonClient::new(config, Self::SERVICE, Self::TARGET_PREFIX)?,
        })
    }
}

#[async_trait]
impl RepositoryService for CodeCommitClient {
    async fn get_commit(&self, repository: &str, commit_id: &str) -> Result<Option<Commit>> {
        let request = GetCommitRequest {
            repository_name: repository.to_string(),
            commit_id: commit_id.to_string(),
        };

        match self
            .inner
            .call::<_, GetCommitResponse>("GetCommit", &request)
            .await
        {
            Ok(response) => {
                debug!("GetCommit response: {:?}", response);
                Ok(response.commit)
            }
            Err(e) if e.code() == Some("CommitDoesNotExistException") => {
                debug!("Commit {} does not exist in {}", commit_id, repository);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
