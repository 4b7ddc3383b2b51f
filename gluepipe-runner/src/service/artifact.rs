//! Artifact workspace
//!
//! Both stage handlers start from the same zipped source tree: download the
//! first input artifact into the invocation's scratch directory, unpack it, and
//! read `<job>/<job>.py` and `<job>/<job>.json` out of the result.

use anyhow::{Context, Result};
use gluepipe_client::ObjectStorage;
use gluepipe_core::domain::config::{self, JobConfiguration};
use gluepipe_core::domain::directive::JobName;
use gluepipe_core::domain::event::ArtifactReference;
use serde_json::{Map, Value as JsonValue};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use zip::ZipArchive;

const SCRATCH_DIR_PREFIX: &str = "gluepipe-";
const MAX_SCRATCH_NAME_LEN: usize = 64;
const ARCHIVE_FILE: &str = "source_code.zip";
const SOURCE_DIR: &str = "source_code";

/// Per-invocation scratch directory
///
/// Derived from the job-completion token so concurrent containers sharing a
/// scratch root never collide. Removed by [`ScratchSpace::cleanup`].
#[derive(Debug)]
pub struct ScratchSpace {
    root: PathBuf,
}

impl ScratchSpace {
    /// Creates an empty scratch directory for a job token under `base`
    ///
    /// Residue from an earlier invocation with the same token is removed first.
    pub async fn create(base: &Path, job_id: &str) -> Result<Self> {
        let root = base.join(format!("{}{}", SCRATCH_DIR_PREFIX, scratch_name(job_id)));

        if tokio::fs::try_exists(&root).await.unwrap_or(false) {
            debug!("Removing scratch residue at {}", root.display());
            tokio::fs::remove_dir_all(&root)
                .await
                .with_context(|| format!("Failed to clear scratch directory {}", root.display()))?;
        }

        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("Failed to create scratch directory {}", root.display()))?;

        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    fn archive_path(&self) -> PathBuf {
        self.root.join(ARCHIVE_FILE)
    }

    fn source_dir(&self) -> PathBuf {
        self.root.join(SOURCE_DIR)
    }

    /// Removes the scratch directory; failures are only logged
    pub async fn cleanup(self) {
        if let Err(e) = tokio::fs::remove_dir_all(&self.root).await {
            warn!(
                "Failed to remove scratch directory {}: {}",
                self.root.display(),
                e
            );
        }
    }
}

/// Directory name for a job token: `[A-Za-z0-9_-]` only, UUID when nothing is left
fn scratch_name(job_id: &str) -> String {
    let name: String = job_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .take(MAX_SCRATCH_NAME_LEN)
        .collect();

    if name.is_empty() {
        Uuid::new_v4().to_string()
    } else {
        name
    }
}

/// Downloads and unpacks source artifacts
pub struct ArtifactWorkspace {
    storage: Arc<dyn ObjectStorage>,
}

impl ArtifactWorkspace {
    pub fn new(storage: Arc<dyn ObjectStorage>) -> Self {
        Self { storage }
    }

    /// Downloads the artifact into `scratch` and extracts it
    ///
    /// # Returns
    /// The extracted source tree
    pub async fn fetch_and_unpack(
        &self,
        artifact: &ArtifactReference,
        scratch: &ScratchSpace,
    ) -> Result<SourceTree> {
        let archive = scratch.archive_path();

        info!(
            "Downloading artifact s3://{}/{}",
            artifact.bucket, artifact.key
        );
        self.storage
            .download(&artifact.bucket, &artifact.key, &archive)
            .await
            .with_context(|| {
                format!(
                    "Failed to download artifact s3://{}/{}",
                    artifact.bucket, artifact.key
                )
            })?;

        let destination = scratch.source_dir();
        let target = destination.clone();
        let entries = tokio::task::spawn_blocking(move || extract(&archive, &target))
            .await
            .context("Artifact extraction task failed")??;

        info!(
            "Extracted {} entries to {}",
            entries,
            destination.display()
        );

        Ok(SourceTree { root: destination })
    }
}

fn extract(archive: &Path, destination: &Path) -> Result<usize> {
    let file = File::open(archive)
        .with_context(|| format!("Failed to open artifact {}", archive.display()))?;
    let mut zip = ZipArchive::new(file).context("Artifact is not a valid zip archive")?;
    let entries = zip.len();

    zip.extract(destination)
        .context("Failed to extract artifact")?;

    Ok(entries)
}

/// An extracted source tree
#[derive(Debug)]
pub struct SourceTree {
    root: PathBuf,
}

impl SourceTree {
    /// Path of `<job>/<job>.py`, which must exist
    pub async fn script_path(&self, job: &JobName) -> Result<PathBuf> {
        let relative = format!("{}/{}", job, job.script_file());
        self.require_file(&relative).await
    }

    /// Reads and parses `<job>/<job>.json`
    pub async fn read_configuration(&self, job: &JobName) -> Result<JobConfiguration> {
        let (relative, bytes) = self.read_configuration_file(job).await?;
        JobConfiguration::from_slice(&bytes).with_context(|| format!("Invalid {}", relative))
    }

    /// Reads `<job>/<job>.json` as a JSON object without decoding its keys
    pub async fn read_raw_configuration(&self, job: &JobName) -> Result<Map<String, JsonValue>> {
        let (relative, bytes) = self.read_configuration_file(job).await?;
        config::read_object(&bytes).with_context(|| format!("Invalid {}", relative))
    }

    async fn read_configuration_file(&self, job: &JobName) -> Result<(String, Vec<u8>)> {
        let relative = format!("{}/{}", job, job.config_file());
        let path = self.require_file(&relative).await?;

        info!("Reading job configuration {}", relative);
        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read {}", relative))?;

        Ok((relative, bytes))
    }

    async fn require_file(&self, relative: &str) -> Result<PathBuf> {
        let path = self.root.join(relative);

        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => Ok(path),
            _ => Err(super::StageError::MissingFile(relative.to_string()).into()),
        }
    }
}
