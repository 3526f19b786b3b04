//! Configuration structures and types for release-publisher
//!
//! `FileConfig` mirrors the optional YAML file; `ReleaseConfig` is the
//! resolved configuration built once per run and passed to every stage.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::core::naming::BuildEnvironment;
use crate::core::retry::RetryOptions;
use crate::core::traits::RepositoryRef;

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_S3_ENDPOINT: &str = "https://sfo2.digitaloceanspaces.com";
pub const DEFAULT_S3_REGION: &str = "us-east-1";
pub const DEFAULT_BUCKET_PREFIX: &str = "releases";
pub const DEFAULT_BUILD_PATH: &str = "dist";

// ============================================================================
// Enumerations
// ============================================================================

/// Archive container format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArchiveFormat {
    #[serde(rename = "7z")]
    SevenZip,
    #[default]
    #[serde(rename = "zip")]
    Zip,
    #[serde(rename = "tar.gz", alias = "tgz")]
    TarGz,
}

impl ArchiveFormat {
    /// File extension, without the leading dot
    pub fn extension(self) -> &'static str {
        match self {
            Self::SevenZip => "7z",
            Self::Zip => "zip",
            Self::TarGz => "tar.gz",
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ArchiveFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "7z" | "7zip" => Ok(Self::SevenZip),
            "zip" => Ok(Self::Zip),
            "tar.gz" | "tgz" => Ok(Self::TarGz),
            other => Err(format!("unknown archive format '{other}' (expected zip, 7z or tar.gz)")),
        }
    }
}

/// When the archive is attached to a release on the hosting service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GithubUploadPolicy {
    /// Only for tag-triggered runs
    #[default]
    Tag,
    /// For every run, including commit builds
    Always,
    Never,
}

impl GithubUploadPolicy {
    pub fn applies(self, tag_triggered: bool) -> bool {
        match self {
            Self::Tag => tag_triggered,
            Self::Always => true,
            Self::Never => false,
        }
    }
}

impl FromStr for GithubUploadPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tag" | "tags" => Ok(Self::Tag),
            "always" => Ok(Self::Always),
            "never" | "off" | "false" => Ok(Self::Never),
            other => Err(format!("unknown GitHub upload policy '{other}' (expected tag, always or never)")),
        }
    }
}

// ============================================================================
// Configuration file
// ============================================================================

/// Root of the optional `.release-publisher.yaml` file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileConfig {
    /// Product name used in artifact names and object keys
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,

    /// Directory holding the build output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_path: Option<String>,

    /// Directory receiving the archive
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_format: Option<ArchiveFormat>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub github: Option<GithubFileConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_store: Option<ObjectStoreFileConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryFileConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GithubFileConfig {
    /// `owner/name`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload: Option<GithubUploadPolicy>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectStoreFileConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,

    /// Leading path of every object key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,

    /// Canned ACL such as `public-read`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acl: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RetryFileConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_delay_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_delay_ms: Option<u64>,
}

// ============================================================================
// Resolved configuration
// ============================================================================

/// Storage credentials
#[derive(Debug)]
pub struct S3Credentials {
    pub access_key_id: String,
    pub secret_access_key: SecretString,
}

#[derive(Debug)]
pub struct GithubSettings {
    pub repository: Option<RepositoryRef>,
    pub api_url: String,
    pub upload: GithubUploadPolicy,
    /// Absent token means the GitHub target is skipped
    pub token: Option<SecretString>,
}

#[derive(Debug)]
pub struct ObjectStoreSettings {
    pub enabled: bool,
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub prefix: String,
    pub acl: Option<String>,
    pub credentials: Option<S3Credentials>,
}

/// Configuration of one run
#[derive(Debug)]
pub struct ReleaseConfig {
    pub product: String,
    pub build: BuildEnvironment,
    pub build_path: PathBuf,
    pub output_dir: PathBuf,
    pub archive_format: ArchiveFormat,
    pub github: GithubSettings,
    pub object_store: ObjectStoreSettings,
    pub retry: RetryOptions,
    /// Archive the build but skip every upload
    pub dry_run: bool,
}
