//! Release naming
//!
//! Derives the release identifier and the artifact file name from the build
//! environment. Everything here is pure: no I/O, no errors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix of a reference pushed as a tag
pub const TAG_REF_PREFIX: &str = "refs/tags";

/// Length of the short commit hash used for untagged builds
pub const SHORT_SHA_LENGTH: usize = 7;

/// Placeholder used for environment values that were not provided
pub const UNDEFINED: &str = "undefined";

/// Build-time values describing what triggered the run and what was built
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildEnvironment {
    /// Triggering reference, e.g. `refs/tags/v1.2.3` or `refs/heads/main`
    pub git_ref: Option<String>,
    /// Full commit hash
    pub commit_sha: Option<String>,
    /// Operating system descriptor; the host OS is used when absent
    pub os: Option<String>,
    /// Platform or device descriptor, e.g. `cuda`
    pub platform: Option<String>,
}

impl BuildEnvironment {
    /// Whether the run was triggered by a tag push
    pub fn is_tag_ref(&self) -> bool {
        self.git_ref
            .as_deref()
            .is_some_and(|r| r.starts_with(TAG_REF_PREFIX))
    }

    pub fn os_or_host(&self) -> String {
        self.os.clone().unwrap_or_else(|| host_os().to_string())
    }

    pub fn platform_or_undefined(&self) -> &str {
        self.platform.as_deref().unwrap_or(UNDEFINED)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierKind {
    Tag,
    Commit,
}

/// Tag name or short commit hash identifying the release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseIdentifier {
    value: String,
    kind: IdentifierKind,
}

impl ReleaseIdentifier {
    /// Resolve the identifier from the build environment
    ///
    /// # Examples
    ///
    /// ```
    /// use release_publisher::core::{BuildEnvironment, ReleaseIdentifier};
    ///
    /// let env = BuildEnvironment {
    ///     git_ref: Some("refs/tags/v1.2.3".to_string()),
    ///     ..Default::default()
    /// };
    /// assert_eq!(ReleaseIdentifier::resolve(&env).as_str(), "v1.2.3");
    /// ```
    pub fn resolve(build: &BuildEnvironment) -> Self {
        if build.is_tag_ref() {
            let value = build
                .git_ref
                .as_deref()
                .and_then(|r| r.split('/').nth(2))
                .unwrap_or(UNDEFINED)
                .to_string();

            return Self {
                value,
                kind: IdentifierKind::Tag,
            };
        }

        let value = match build.commit_sha.as_deref() {
            Some(sha) => sha.chars().take(SHORT_SHA_LENGTH).collect(),
            None => UNDEFINED.to_string(),
        };

        Self {
            value,
            kind: IdentifierKind::Commit,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn kind(&self) -> IdentifierKind {
        self.kind
    }

    pub fn is_tag(&self) -> bool {
        self.kind == IdentifierKind::Tag
    }
}

impl fmt::Display for ReleaseIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// Operating system name used in artifact names
pub fn host_os() -> &'static str {
    if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "macos"
    } else {
        "ubuntu"
    }
}

/// Build the artifact file name: `<product>-<id>-<os>-<platform>.<ext>`
pub fn artifact_name(
    product: &str,
    identifier: &ReleaseIdentifier,
    os: &str,
    platform: &str,
    extension: &str,
) -> String {
    format!("{product}-{identifier}-{os}-{platform}.{extension}")
}

/// Identifier and artifact name, computed once per run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseNaming {
    pub identifier: ReleaseIdentifier,
    pub artifact_name: String,
}

impl ReleaseNaming {
    pub fn resolve(product: &str, build: &BuildEnvironment, extension: &str) -> Self {
        let identifier = ReleaseIdentifier::resolve(build);
        let artifact_name = artifact_name(
            product,
            &identifier,
            &build.os_or_host(),
            build.platform_or_undefined(),
            extension,
        );

        Self {
            identifier,
            artifact_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(git_ref: Option<&str>, sha: Option<&str>) -> BuildEnvironment {
        BuildEnvironment {
            git_ref: git_ref.map(str::to_string),
            commit_sha: sha.map(str::to_string),
            os: Some("ubuntu".to_string()),
            platform: Some("cuda".to_string()),
        }
    }

    #[test]
    fn test_tag_ref_uses_third_segment() {
        let id = ReleaseIdentifier::resolve(&env(Some("refs/tags/v1.2.3"), Some("abcdef1234567")));

        assert_eq!(id.as_str(), "v1.2.3");
        assert!(id.is_tag());
    }

    #[test]
    fn test_tag_ref_with_nested_segments_keeps_third_only() {
        let id = ReleaseIdentifier::resolve(&env(Some("refs/tags/release/1.0"), None));

        assert_eq!(id.as_str(), "release");
    }

    #[test]
    fn test_branch_ref_uses_short_sha() {
        let id = ReleaseIdentifier::resolve(&env(Some("refs/heads/main"), Some("abcdef1234567")));

        assert_eq!(id.as_str(), "abcdef1");
        assert_eq!(id.as_str().len(), 7);
        assert_eq!(id.kind(), IdentifierKind::Commit);
    }

    #[test]
    fn test_short_sha_is_not_padded() {
        let id = ReleaseIdentifier::resolve(&env(None, Some("abc")));

        assert_eq!(id.as_str(), "abc");
    }

    #[test]
    fn test_missing_values_become_placeholder() {
        let id = ReleaseIdentifier::resolve(&BuildEnvironment::default());
        assert_eq!(id.as_str(), UNDEFINED);

        let tag_without_name = ReleaseIdentifier::resolve(&env(Some("refs/tags"), None));
        assert_eq!(tag_without_name.as_str(), UNDEFINED);
        assert!(tag_without_name.is_tag());
    }

    #[test]
    fn test_artifact_name_format() {
        let naming = ReleaseNaming::resolve(
            "DreamApp",
            &env(Some("refs/tags/v1.2.3"), None),
            "7z",
        );

        assert_eq!(naming.artifact_name, "DreamApp-v1.2.3-ubuntu-cuda.7z");
    }

    #[test]
    fn test_artifact_name_is_deterministic() {
        let build = env(None, Some("0123456789"));

        let first = ReleaseNaming::resolve("DreamApp", &build, "zip");
        let second = ReleaseNaming::resolve("DreamApp", &build, "zip");

        assert_eq!(first, second);
        assert_eq!(first.artifact_name, "DreamApp-0123456-ubuntu-cuda.zip");
    }

    #[test]
    fn test_missing_platform_propagates_placeholder() {
        let build = BuildEnvironment {
            git_ref: Some("refs/tags/v2".to_string()),
            os: Some("macos".to_string()),
            ..Default::default()
        };

        let naming = ReleaseNaming::resolve("DreamApp", &build, "zip");

        assert_eq!(naming.artifact_name, "DreamApp-v2-macos-undefined.zip");
    }

    #[test]
    fn test_host_os_fallback() {
        let build = BuildEnvironment::default();

        assert_eq!(build.os_or_host(), host_os());
        assert!(["windows", "macos", "ubuntu"].contains(&host_os()));
    }
}
