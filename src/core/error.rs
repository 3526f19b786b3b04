//! Error handling for release publishing
//!
//! This module provides the error taxonomy of a publishing run with recovery
//! guidance, using the thiserror crate for ergonomic error handling.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for release publishing operations
#[derive(Error, Debug)]
pub enum PublishError {
    // Configuration errors
    #[error("No build path! ({})", .path.display())]
    NoBuildPath { path: PathBuf },

    #[error("Missing configuration: {field}")]
    ConfigurationMissing { field: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    // Release hosting errors
    #[error("[{tag}] Release lookup failed{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    ReleaseLookupFailed {
        tag: String,
        status: Option<u16>,
        message: String,
    },

    #[error("[{tag}] Release creation failed: {message}")]
    ReleaseCreateFailed { tag: String, message: String },

    // Archive errors
    #[error("Archiving failed: {message}")]
    ArchiveFailed { message: String },

    // Upload errors
    #[error("[{target}] Upload failed: {message}")]
    UploadFailed { target: String, message: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // State errors
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}

impl PublishError {
    /// Wrap an I/O error with a short description of what was being done
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Check if the failed operation may be attempted again
    ///
    /// Only release creation is retried; every other failure ends the run.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ReleaseCreateFailed { .. })
    }

    /// Get suggested actions for this error
    pub fn suggested_actions(&self) -> Vec<&'static str> {
        match self {
            Self::NoBuildPath { .. } => vec![
                "Run the build before publishing",
                "Check RELEASE_BUILD_PATH or buildPath in the configuration file",
            ],
            Self::ConfigurationMissing { .. } => vec![
                "Set the missing environment variable",
                "Or add the value to .release-publisher.yaml",
            ],
            Self::InvalidConfig { .. } => vec!["Check the configuration value format"],
            Self::ReleaseLookupFailed { .. } => vec![
                "Check that GITHUB_TOKEN has access to the repository",
                "Check GITHUB_REPOSITORY (owner/repo)",
            ],
            Self::ReleaseCreateFailed { .. } => vec![
                "Check that GITHUB_TOKEN can create releases",
                "Check the release hosting service status",
            ],
            Self::ArchiveFailed { .. } => vec![
                "Check that the archiver is installed (7z for the 7z format)",
                "Check free disk space in the output directory",
            ],
            Self::UploadFailed { .. } => vec![
                "Check network connectivity",
                "Check upload credentials and bucket permissions",
            ],
            Self::Io { .. } => vec!["Check file permissions"],
            Self::InvalidTransition { .. } => vec!["Report this as a bug"],
        }
    }

    /// Get error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoBuildPath { .. } => "NO_BUILD_PATH",
            Self::ConfigurationMissing { .. } => "CONFIGURATION_MISSING",
            Self::InvalidConfig { .. } => "INVALID_CONFIG",
            Self::ReleaseLookupFailed { .. } => "RELEASE_LOOKUP_FAILED",
            Self::ReleaseCreateFailed { .. } => "RELEASE_CREATE_FAILED",
            Self::ArchiveFailed { .. } => "ARCHIVE_FAILED",
            Self::UploadFailed { .. } => "UPLOAD_FAILED",
            Self::Io { .. } => "IO_ERROR",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_build_path_error() {
        let error = PublishError::NoBuildPath {
            path: PathBuf::from("dist/app"),
        };

        assert_eq!(error.code(), "NO_BUILD_PATH");
        assert!(!error.is_retryable());
        assert!(error.to_string().starts_with("No build path!"));
        assert!(error.to_string().contains("dist/app"));
    }

    #[test]
    fn test_lookup_error_with_status() {
        let error = PublishError::ReleaseLookupFailed {
            tag: "v1.2.3".to_string(),
            status: Some(500),
            message: "Internal Server Error".to_string(),
        };

        let display = error.to_string();
        assert!(display.contains("[v1.2.3]"));
        assert!(display.contains("HTTP 500"));
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_lookup_error_without_status() {
        let error = PublishError::ReleaseLookupFailed {
            tag: "v1.2.3".to_string(),
            status: None,
            message: "connection refused".to_string(),
        };

        assert!(!error.to_string().contains("HTTP"));
    }

    #[test]
    fn test_only_create_failures_are_retryable() {
        let create = PublishError::ReleaseCreateFailed {
            tag: "v1".to_string(),
            message: "422".to_string(),
        };
        let upload = PublishError::UploadFailed {
            target: "s3".to_string(),
            message: "403".to_string(),
        };

        assert!(create.is_retryable());
        assert!(!upload.is_retryable());
        assert_eq!(create.code(), "RELEASE_CREATE_FAILED");
    }

    #[test]
    fn test_suggested_actions_present() {
        let error = PublishError::ConfigurationMissing {
            field: "RELEASE_PRODUCT".to_string(),
        };

        let actions = error.suggested_actions();
        assert!(!actions.is_empty());
        assert!(actions.iter().any(|a| a.contains("environment variable")));
    }

    #[test]
    fn test_io_error_keeps_source() {
        let error = PublishError::io(
            "reading archive metadata",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );

        assert_eq!(error.code(), "IO_ERROR");
        assert!(std::error::Error::source(&error).is_some());
        assert_eq!(error.to_string(), "reading archive metadata: gone");
    }
}
