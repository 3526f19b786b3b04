//! Release Publisher - drives one run from naming to the last upload
//!
//! The run walks the state machine:
//! - resolve the release identifier and artifact name (once)
//! - check the build directory, then archive it
//! - skip every upload when the archive was not produced
//! - upload to each planned target in order, awaiting each one

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::asset_uploader::{AssetUploader, object_key};
use super::release_locator::ReleaseLocator;
use crate::archivers::create_archiver;
use crate::core::config::ReleaseConfig;
use crate::core::error::PublishError;
use crate::core::naming::{ReleaseIdentifier, ReleaseNaming};
use crate::core::retry::{RetryManager, RetryOptions};
use crate::core::state_machine::{RunState, RunStateMachine, StateTransition};
use crate::core::traits::{
    Archiver, ObjectStore, ReleaseHost, RepositoryRef, UploadReceipt, UploadTarget,
};
use crate::targets::{GithubClient, S3Client};

/// How a successful run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunOutcome {
    /// Every planned target received the archive
    Published,
    /// The archiver reported success but wrote nothing
    ArchiveMissing,
    /// No upload target was available
    NothingToPublish,
    /// Archived, uploads skipped on request
    DryRun,
}

/// Report returned after a run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub identifier: ReleaseIdentifier,
    pub artifact_name: String,
    pub archive_path: Option<PathBuf>,
    pub planned_targets: Vec<UploadTarget>,
    pub uploads: Vec<UploadReceipt>,
    pub transitions: Vec<StateTransition>,
    pub duration: Duration,
}

struct GithubTarget {
    host: Box<dyn ReleaseHost>,
    repository: RepositoryRef,
}

struct ObjectStoreTarget {
    store: Box<dyn ObjectStore>,
    bucket: String,
    prefix: String,
}

/// Main release publisher orchestrator
pub struct ReleasePublisher {
    product: String,
    naming: ReleaseNaming,
    build_path: PathBuf,
    output_dir: PathBuf,
    archiver: Box<dyn Archiver>,
    github: Option<GithubTarget>,
    object_store: Option<ObjectStoreTarget>,
    retry: RetryManager,
    dry_run: bool,
}

impl ReleasePublisher {
    /// Create a publisher without upload targets
    ///
    /// # Arguments
    ///
    /// * `product` - Product name, used in the object key
    /// * `naming` - Identifier and artifact name of this run
    /// * `build_path` - Directory to archive
    /// * `output_dir` - Directory the archive is written to
    /// * `archiver` - Compressor for the configured format
    pub fn new(
        product: impl Into<String>,
        naming: ReleaseNaming,
        build_path: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        archiver: Box<dyn Archiver>,
    ) -> Self {
        Self {
            product: product.into(),
            naming,
            build_path: build_path.into(),
            output_dir: output_dir.into(),
            archiver,
            github: None,
            object_store: None,
            retry: RetryManager::new(RetryOptions::default()),
            dry_run: false,
        }
    }

    /// Build the publisher and its HTTP clients from the resolved configuration
    ///
    /// The GitHub target is planned only when the upload policy applies to
    /// this run and a token is available; a missing token is logged and the
    /// target skipped.
    pub fn from_config(config: &ReleaseConfig) -> Result<Self, PublishError> {
        let naming = ReleaseNaming::resolve(
            &config.product,
            &config.build,
            config.archive_format.extension(),
        );
        let tag_triggered = naming.identifier.is_tag();

        let mut publisher = Self::new(
            config.product.clone(),
            naming,
            config.build_path.clone(),
            config.output_dir.clone(),
            create_archiver(config.archive_format),
        )
        .with_retry(config.retry.clone())
        .with_dry_run(config.dry_run);

        let github = &config.github;
        if !github.upload.applies(tag_triggered) {
            tracing::info!(policy = ?github.upload, "GitHub release upload not enabled for this run");
        } else if let Some(token) = &github.token {
            let repository = github.repository.clone().ok_or_else(|| {
                PublishError::ConfigurationMissing {
                    field: "GITHUB_REPOSITORY".to_string(),
                }
            })?;
            let token = SecretString::from(token.expose_secret().to_string());
            let client = GithubClient::new(github.api_url.clone(), token)?;
            publisher = publisher.with_github(Box::new(client), repository);
        } else {
            tracing::warn!("GITHUB_TOKEN is not set, skipping GitHub release upload");
        }

        let store = &config.object_store;
        if store.enabled {
            let credentials =
                store
                    .credentials
                    .as_ref()
                    .ok_or_else(|| PublishError::ConfigurationMissing {
                        field: "S3_ACCESS_KEY_ID".to_string(),
                    })?;
            let client = S3Client::new(store.endpoint.clone(), store.region.clone(), credentials)?
                .with_acl(store.acl.clone());
            publisher = publisher.with_object_store(
                Box::new(client),
                store.bucket.clone(),
                store.prefix.clone(),
            );
        }

        Ok(publisher)
    }

    pub fn with_github(mut self, host: Box<dyn ReleaseHost>, repository: RepositoryRef) -> Self {
        self.github = Some(GithubTarget { host, repository });
        self
    }

    pub fn with_object_store(
        mut self,
        store: Box<dyn ObjectStore>,
        bucket: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        self.object_store = Some(ObjectStoreTarget {
            store,
            bucket: bucket.into(),
            prefix: prefix.into(),
        });
        self
    }

    pub fn with_retry(mut self, options: RetryOptions) -> Self {
        self.retry = RetryManager::new(options);
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn naming(&self) -> &ReleaseNaming {
        &self.naming
    }

    /// Where the archive is written
    pub fn archive_path(&self) -> PathBuf {
        self.output_dir.join(&self.naming.artifact_name)
    }

    /// Upload targets in the order they are attempted
    pub fn planned_targets(&self) -> Vec<UploadTarget> {
        let mut targets = Vec::new();
        if self.github.is_some() {
            targets.push(UploadTarget::GithubRelease);
        }
        if self.object_store.is_some() {
            targets.push(UploadTarget::ObjectStore);
        }
        targets
    }

    /// Run the whole pipeline once
    ///
    /// # Returns
    ///
    /// A report for every run that ends without error, including the runs
    /// that had nothing to upload
    pub async fn run(&self) -> Result<RunReport, PublishError> {
        let started = Instant::now();
        let mut machine = RunStateMachine::new();
        let targets = self.planned_targets();

        tracing::info!(
            identifier = %self.naming.identifier,
            artifact = %self.naming.artifact_name,
            targets = ?targets,
            "starting release run"
        );

        if targets.is_empty() {
            tracing::warn!("No upload target available, nothing to publish");
            machine.transition(RunState::Done)?;
            return Ok(self.report(RunOutcome::NothingToPublish, None, Vec::new(), machine, started));
        }

        // 1. Build directory
        machine.transition(RunState::Validating)?;
        if !is_dir(&self.build_path).await {
            machine.transition(RunState::NoBuildPath)?;
            return Err(PublishError::NoBuildPath {
                path: self.build_path.clone(),
            });
        }

        // 2. Archive
        machine.transition(RunState::Archiving)?;
        tracing::info!(build_path = %self.build_path.display(), format = %self.archiver.format(), "Compressing build...");

        let archive_path = self.archive_path();
        if let Err(e) = remove_stale_archive(&archive_path).await {
            tracing::error!(error = %e, "cannot remove previous archive");
            machine.transition(RunState::ArchiverError)?;
            return Err(e);
        }

        if let Err(e) = self.archiver.compress(&self.build_path, &archive_path).await {
            tracing::error!(error = %e, "archiving failed");
            machine.transition(RunState::ArchiverError)?;
            return Err(e);
        }

        if !tokio::fs::try_exists(&archive_path).await.unwrap_or(false) {
            tracing::warn!(archive = %archive_path.display(), "No release found!");
            machine.transition(RunState::ArchiveMissing)?;
            return Ok(self.report(RunOutcome::ArchiveMissing, None, Vec::new(), machine, started));
        }

        if self.dry_run {
            tracing::info!(archive = %archive_path.display(), targets = ?targets, "dry run, skipping uploads");
            machine.transition(RunState::Done)?;
            return Ok(self.report(
                RunOutcome::DryRun,
                Some(archive_path),
                Vec::new(),
                machine,
                started,
            ));
        }

        // 3. Upload
        machine.transition(RunState::Uploading)?;
        let uploader = match AssetUploader::prepare(&archive_path, &self.naming.artifact_name).await {
            Ok(uploader) => uploader,
            Err(e) => {
                machine.transition(RunState::UploadError)?;
                return Err(e);
            }
        };

        let mut uploads = Vec::new();
        let mut first_error = None;

        for target in &targets {
            let result = match target {
                UploadTarget::GithubRelease => self.upload_to_github(&uploader).await,
                UploadTarget::ObjectStore => self.upload_to_object_store(&uploader).await,
            };

            match result {
                Ok(receipt) => uploads.push(receipt),
                Err(e) => {
                    tracing::error!(upload = %target, error = %e, "upload failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(e) = first_error {
            machine.transition(RunState::UploadError)?;
            return Err(e);
        }

        machine.transition(RunState::Done)?;
        Ok(self.report(RunOutcome::Published, Some(archive_path), uploads, machine, started))
    }

    async fn upload_to_github(&self, uploader: &AssetUploader) -> Result<UploadReceipt, PublishError> {
        let Some(github) = &self.github else {
            return Err(PublishError::InvalidConfig {
                message: "GitHub target is not configured".to_string(),
            });
        };

        let release = ReleaseLocator::new(github.host.as_ref(), &github.repository, &self.retry)
            .locate_or_create(self.naming.identifier.as_str())
            .await?;

        uploader.upload_to_release(github.host.as_ref(), &release).await
    }

    async fn upload_to_object_store(
        &self,
        uploader: &AssetUploader,
    ) -> Result<UploadReceipt, PublishError> {
        let Some(target) = &self.object_store else {
            return Err(PublishError::InvalidConfig {
                message: "S3 target is not configured".to_string(),
            });
        };

        let key = object_key(
            &target.prefix,
            &self.product,
            &self.naming.identifier,
            &self.naming.artifact_name,
        );

        uploader
            .upload_to_object_store(target.store.as_ref(), &target.bucket, &key)
            .await
    }

    fn report(
        &self,
        outcome: RunOutcome,
        archive_path: Option<PathBuf>,
        uploads: Vec<UploadReceipt>,
        machine: RunStateMachine,
        started: Instant,
    ) -> RunReport {
        RunReport {
            outcome,
            identifier: self.naming.identifier.clone(),
            artifact_name: self.naming.artifact_name.clone(),
            archive_path,
            planned_targets: self.planned_targets(),
            uploads,
            transitions: machine.into_history(),
            duration: started.elapsed(),
        }
    }
}

/// Delete an archive left by an earlier run so it is never mistaken for this
/// run's output
async fn remove_stale_archive(path: &Path) -> Result<(), PublishError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            tracing::debug!(archive = %path.display(), "removed previous archive");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(PublishError::io(format!("removing {}", path.display()), e)),
    }
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|metadata| metadata.is_dir())
        .unwrap_or(false)
}
