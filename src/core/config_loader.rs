//! Configuration loader for release-publisher
//!
//! Builds the `ReleaseConfig` of a run from, in priority order:
//! 1. Environment variables
//! 2. Configuration file (`./.release-publisher.yaml` or an explicit path)
//! 3. Default values

use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tokio::fs;

use super::config::*;
use crate::core::error::PublishError;
use crate::core::naming::BuildEnvironment;
use crate::core::retry::RetryOptions;
use crate::core::traits::RepositoryRef;
use crate::security::token_manager::{
    GITHUB_TOKEN_KEY, S3_ACCESS_KEY_KEY, S3_SECRET_KEY_KEY, SecureTokenManager,
};

/// Configuration file name
pub const CONFIG_FILENAME: &str = ".release-publisher.yaml";

/// Environment variable pattern (${VAR_NAME})
const ENV_VAR_PATTERN: &str = r"\$\{([A-Z_][A-Z0-9_]*)\}";

/// Configuration load options
#[derive(Debug, Clone, Default)]
pub struct ConfigLoadOptions {
    /// Explicit configuration file; must exist when given
    pub config_path: Option<PathBuf>,

    /// Directory relative paths are resolved against
    pub working_dir: PathBuf,

    /// Environment variables
    pub env: HashMap<String, String>,

    /// Dry run requested on the command line
    pub dry_run: bool,
}

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and resolve the configuration of a run
    pub async fn load(options: ConfigLoadOptions) -> Result<ReleaseConfig, PublishError> {
        let file_config = match &options.config_path {
            Some(path) => {
                let path = options.working_dir.join(path);
                Self::load_config_file(&path).await?.ok_or_else(|| {
                    PublishError::InvalidConfig {
                        message: format!("config file not found: {}", path.display()),
                    }
                })?
            }
            None => Self::load_config_file(&options.working_dir.join(CONFIG_FILENAME))
                .await?
                .unwrap_or_default(),
        };

        let file_config = Self::expand_env_vars(file_config, &options.env);

        Self::resolve(file_config, &options)
    }

    /// Load configuration from a YAML file, `Ok(None)` when it does not exist
    async fn load_config_file(file_path: &Path) -> Result<Option<FileConfig>, PublishError> {
        if !file_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(file_path)
            .await
            .map_err(|e| PublishError::io(format!("reading {}", file_path.display()), e))?;

        let config: FileConfig =
            serde_yaml::from_str(&content).map_err(|e| PublishError::InvalidConfig {
                message: format!("failed to parse {}: {}", file_path.display(), e),
            })?;

        tracing::debug!(path = %file_path.display(), "loaded configuration file");

        Ok(Some(config))
    }

    /// Merge the file configuration with the environment and validate the result
    pub fn resolve(
        file: FileConfig,
        options: &ConfigLoadOptions,
    ) -> Result<ReleaseConfig, PublishError> {
        let env = &options.env;
        let tokens = SecureTokenManager::from_env(env);

        let product = env_value(env, "RELEASE_PRODUCT")
            .map(str::to_string)
            .or(file.product)
            .ok_or_else(|| missing("RELEASE_PRODUCT"))?;

        let build = BuildEnvironment {
            git_ref: env_value(env, "GITHUB_REF").map(str::to_string),
            commit_sha: env_value(env, "GITHUB_SHA").map(str::to_string),
            os: env_value(env, "BUILD_OS").map(str::to_string),
            platform: env_value(env, "BUILD_PLATFORM")
                .or_else(|| env_value(env, "BUILD_DEVICE"))
                .map(str::to_string),
        };

        let build_path = env_value(env, "RELEASE_BUILD_PATH")
            .map(str::to_string)
            .or(file.build_path)
            .unwrap_or_else(|| DEFAULT_BUILD_PATH.to_string());
        let output_dir = env_value(env, "RELEASE_OUTPUT_DIR")
            .map(str::to_string)
            .or(file.output_dir)
            .unwrap_or_else(|| ".".to_string());

        let archive_format = match env_value(env, "RELEASE_ARCHIVE_FORMAT") {
            Some(value) => parse_value::<ArchiveFormat>("RELEASE_ARCHIVE_FORMAT", value)?,
            None => file.archive_format.unwrap_or_default(),
        };

        let github = Self::resolve_github(file.github.unwrap_or_default(), env, &tokens)?;
        let object_store =
            Self::resolve_object_store(file.object_store.unwrap_or_default(), env, &tokens)?;
        let retry = Self::resolve_retry(file.retry.unwrap_or_default(), env)?;

        let dry_run = options.dry_run
            || match env_value(env, "RELEASE_DRY_RUN") {
                Some(value) => parse_bool("RELEASE_DRY_RUN", value)?,
                None => false,
            };

        Ok(ReleaseConfig {
            product,
            build,
            build_path: options.working_dir.join(build_path),
            output_dir: options.working_dir.join(output_dir),
            archive_format,
            github,
            object_store,
            retry,
            dry_run,
        })
    }

    fn resolve_github(
        file: GithubFileConfig,
        env: &HashMap<String, String>,
        tokens: &SecureTokenManager,
    ) -> Result<GithubSettings, PublishError> {
        let upload = match env_value(env, "RELEASE_GITHUB_UPLOAD") {
            Some(value) => parse_value::<GithubUploadPolicy>("RELEASE_GITHUB_UPLOAD", value)?,
            None => file.upload.unwrap_or_default(),
        };

        let repository = match env_value(env, "GITHUB_REPOSITORY")
            .map(str::to_string)
            .or(file.repository)
        {
            Some(slug) => Some(RepositoryRef::parse(&slug).ok_or_else(|| {
                PublishError::InvalidConfig {
                    message: format!("GITHUB_REPOSITORY must be owner/name, got '{slug}'"),
                }
            })?),
            None => None,
        };

        let token = tokens.get_token(GITHUB_TOKEN_KEY);

        // Without a token the target is skipped, so the repository is only
        // needed when an upload can actually happen.
        if repository.is_none() && token.is_some() && upload != GithubUploadPolicy::Never {
            return Err(missing("GITHUB_REPOSITORY"));
        }

        Ok(GithubSettings {
            repository,
            api_url: env_value(env, "GITHUB_API_URL")
                .map(str::to_string)
                .or(file.api_url)
                .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string()),
            upload,
            token,
        })
    }

    fn resolve_object_store(
        file: ObjectStoreFileConfig,
        env: &HashMap<String, String>,
        tokens: &SecureTokenManager,
    ) -> Result<ObjectStoreSettings, PublishError> {
        let access_key_id = tokens.get_plain(S3_ACCESS_KEY_KEY);
        let secret_access_key = tokens.get_token(S3_SECRET_KEY_KEY);

        let enabled = match env_value(env, "RELEASE_S3_UPLOAD") {
            Some(value) => parse_bool("RELEASE_S3_UPLOAD", value)?,
            None => file.enabled.unwrap_or(access_key_id.is_some()),
        };

        let bucket = env_value(env, "S3_BUCKET")
            .map(str::to_string)
            .or(file.bucket)
            .unwrap_or_default();

        let credentials = match (access_key_id, secret_access_key) {
            (Some(access_key_id), Some(secret_access_key)) => Some(S3Credentials {
                access_key_id,
                secret_access_key,
            }),
            (None, _) if enabled => return Err(missing("S3_ACCESS_KEY_ID")),
            (Some(_), None) if enabled => return Err(missing("S3_SECRET_ACCESS_KEY")),
            _ => None,
        };

        if enabled && bucket.is_empty() {
            return Err(missing("S3_BUCKET"));
        }

        Ok(ObjectStoreSettings {
            enabled,
            endpoint: env_value(env, "S3_ENDPOINT")
                .map(str::to_string)
                .or(file.endpoint)
                .unwrap_or_else(|| DEFAULT_S3_ENDPOINT.to_string()),
            region: env_value(env, "S3_REGION")
                .map(str::to_string)
                .or(file.region)
                .unwrap_or_else(|| DEFAULT_S3_REGION.to_string()),
            bucket,
            prefix: env_value(env, "RELEASE_BUCKET_PREFIX")
                .map(str::to_string)
                .or(file.prefix)
                .unwrap_or_else(|| DEFAULT_BUCKET_PREFIX.to_string()),
            acl: env_value(env, "S3_ACL").map(str::to_string).or(file.acl),
            credentials,
        })
    }

    fn resolve_retry(
        file: RetryFileConfig,
        env: &HashMap<String, String>,
    ) -> Result<RetryOptions, PublishError> {
        let defaults = RetryOptions::default();

        let max_attempts = match env_value(env, "RELEASE_RETRY_ATTEMPTS") {
            Some(value) => parse_value::<u32>("RELEASE_RETRY_ATTEMPTS", value)?,
            None => file.max_attempts.unwrap_or(defaults.max_attempts),
        };

        Ok(RetryOptions {
            max_attempts,
            initial_delay: file
                .initial_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.initial_delay),
            max_delay: file
                .max_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.max_delay),
            ..defaults
        })
    }

    /// Expand `${VAR}` references in the string values of the file
    fn expand_env_vars(mut config: FileConfig, env: &HashMap<String, String>) -> FileConfig {
        let expand = |value: &mut Option<String>| {
            if let Some(v) = value.as_mut() {
                *v = Self::expand_string(v, env);
            }
        };

        expand(&mut config.product);
        expand(&mut config.build_path);
        expand(&mut config.output_dir);

        if let Some(github) = config.github.as_mut() {
            expand(&mut github.repository);
            expand(&mut github.api_url);
        }

        if let Some(store) = config.object_store.as_mut() {
            expand(&mut store.endpoint);
            expand(&mut store.region);
            expand(&mut store.bucket);
            expand(&mut store.prefix);
        }

        config
    }

    /// Expand environment variables in a single string
    ///
    /// Unknown variables are left untouched.
    fn expand_string(input: &str, env: &HashMap<String, String>) -> String {
        let env_var_regex = Regex::new(ENV_VAR_PATTERN).unwrap();

        env_var_regex
            .replace_all(input, |caps: &regex::Captures| match env.get(&caps[1]) {
                Some(value) => value.clone(),
                None => {
                    tracing::warn!("environment variable {} not found", &caps[1]);
                    caps[0].to_string()
                }
            })
            .into_owned()
    }
}

/// Non-empty environment value
fn env_value<'a>(env: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    env.get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

fn missing(field: &str) -> PublishError {
    PublishError::ConfigurationMissing {
        field: field.to_string(),
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, PublishError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse::<T>().map_err(|e| PublishError::InvalidConfig {
        message: format!("{key}: {e}"),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, PublishError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(PublishError::InvalidConfig {
            message: format!("{key}: expected a boolean, got '{other}'"),
        }),
    }
}
