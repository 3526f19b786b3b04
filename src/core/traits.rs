//! Core traits and types for release publishing
//!
//! This module defines the narrow contracts of the three external
//! collaborators of a run: the archiver, the release hosting API and the
//! object store.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::config::ArchiveFormat;
use crate::core::error::PublishError;

// ============================================================================
// Releases
// ============================================================================

/// Repository hosting the releases (`owner/name`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRef {
    pub owner: String,
    pub name: String,
}

impl RepositoryRef {
    /// Parse an `owner/name` slug
    pub fn parse(slug: &str) -> Option<Self> {
        let (owner, name) = slug.trim().split_once('/')?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return None;
        }

        Some(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Release entry on the hosting service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRelease {
    pub id: u64,
    pub tag_name: String,
    /// Asset upload endpoint; may be a URI template (`...{?name,label}`)
    pub upload_url: String,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub draft: bool,
}

/// Request body for creating a release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRelease {
    pub tag_name: String,
    pub name: String,
    pub prerelease: bool,
    pub draft: bool,
}

impl NewRelease {
    /// Prerelease named after its tag, published immediately
    pub fn prerelease(tag: &str) -> Self {
        Self {
            tag_name: tag.to_string(),
            name: tag.to_string(),
            prerelease: true,
            draft: false,
        }
    }
}

// ============================================================================
// Uploads
// ============================================================================

/// File to upload, with the transfer headers it needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetUpload {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub content_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UploadTarget {
    GithubRelease,
    ObjectStore,
}

impl fmt::Display for UploadTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GithubRelease => f.write_str("GitHub"),
            Self::ObjectStore => f.write_str("S3"),
        }
    }
}

/// Result of a completed upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub target: UploadTarget,
    /// Where the uploaded file can be found
    pub location: String,
    pub bytes: u64,
}

// ============================================================================
// Collaborators
// ============================================================================

/// Compresses a directory into a single archive file
#[async_trait]
pub trait Archiver: Send + Sync {
    fn format(&self) -> ArchiveFormat;

    /// Compress every entry under `source_dir`, recursively, into `archive_path`
    ///
    /// Resolves once the archiver reports completion; a reported success does
    /// not guarantee that the archive exists.
    async fn compress(&self, source_dir: &Path, archive_path: &Path) -> Result<(), PublishError>;
}

/// Release hosting API
#[async_trait]
pub trait ReleaseHost: Send + Sync {
    /// Look up a release by tag; `Ok(None)` when the service answers not-found
    async fn get_release_by_tag(
        &self,
        repository: &RepositoryRef,
        tag: &str,
    ) -> Result<Option<RemoteRelease>, PublishError>;

    async fn create_release(
        &self,
        repository: &RepositoryRef,
        release: &NewRelease,
    ) -> Result<RemoteRelease, PublishError>;

    /// Stream a file from disk to the release as a named asset
    async fn upload_release_asset(
        &self,
        release: &RemoteRelease,
        asset: &AssetUpload,
    ) -> Result<UploadReceipt, PublishError>;
}

/// Object storage bucket
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stream a file from disk to `bucket` under `key`
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        asset: &AssetUpload,
    ) -> Result<UploadReceipt, PublishError>;
}
