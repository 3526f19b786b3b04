//! Secure token manager with memory-safe handling and masking capabilities
//!
//! Credentials for the release hosting API and the object store are read from
//! the environment once and kept in `secrecy` wrappers, so they never show up
//! in `Debug` output. Any text printed to the console can be passed through
//! [`SecureTokenManager::mask_tokens_in_string`] first.

use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;

pub const GITHUB_TOKEN_KEY: &str = "github";
pub const S3_ACCESS_KEY_KEY: &str = "s3-access-key";
pub const S3_SECRET_KEY_KEY: &str = "s3-secret-key";

/// Credentials with the environment variables they come from
const CREDENTIAL_VARS: &[(&str, &str)] = &[
    (GITHUB_TOKEN_KEY, "GITHUB_TOKEN"),
    (S3_ACCESS_KEY_KEY, "S3_ACCESS_KEY_ID"),
    (S3_SECRET_KEY_KEY, "S3_SECRET_ACCESS_KEY"),
];

/// Secure token manager for upload credentials
///
/// # Examples
///
/// ```
/// use release_publisher::security::SecureTokenManager;
/// use std::collections::HashMap;
///
/// let env = HashMap::from([("GITHUB_TOKEN".to_string(), "ghp_abcdef123456".to_string())]);
/// let manager = SecureTokenManager::from_env(&env);
///
/// assert!(manager.has_token("github"));
/// assert_eq!(manager.mask_tokens_in_string("token ghp_abcdef123456"), "token ghp...456");
/// ```
#[derive(Default)]
pub struct SecureTokenManager {
    tokens: HashMap<String, SecretString>,
}

impl SecureTokenManager {
    /// Collect the known credentials present in `env`
    ///
    /// Empty values are treated as unset.
    pub fn from_env(env: &HashMap<String, String>) -> Self {
        let tokens = CREDENTIAL_VARS
            .iter()
            .filter_map(|(key, var)| {
                let value = env.get(*var)?.trim();
                if value.is_empty() {
                    return None;
                }
                Some((key.to_string(), SecretString::new(value.into())))
            })
            .collect();

        Self { tokens }
    }

    /// Retrieves a credential by key
    pub fn get_token(&self, key: &str) -> Option<SecretString> {
        self.tokens
            .get(key)
            .map(|token| SecretString::new(token.expose_secret().into()))
    }

    /// Retrieves a credential that is an identifier rather than a secret
    pub fn get_plain(&self, key: &str) -> Option<String> {
        self.tokens
            .get(key)
            .map(|token| token.expose_secret().to_string())
    }

    pub fn has_token(&self, key: &str) -> bool {
        self.tokens.contains_key(key)
    }

    /// Gets the environment variable name for a credential key
    pub fn get_token_name(&self, key: &str) -> Option<&'static str> {
        CREDENTIAL_VARS
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, var)| *var)
    }

    /// Masks a token for safe logging
    ///
    /// Shows only the first 3 and last 3 characters for identification purposes.
    /// Tokens shorter than 10 characters are fully masked as "****".
    pub fn mask_token(&self, token: &str) -> String {
        let chars: Vec<char> = token.chars().collect();
        if chars.len() < 10 {
            return "****".to_string();
        }

        let prefix: String = chars[..3].iter().collect();
        let suffix: String = chars[chars.len() - 3..].iter().collect();
        format!("{}...{}", prefix, suffix)
    }

    /// Masks all known tokens in a string
    pub fn mask_tokens_in_string(&self, text: &str) -> String {
        let mut masked = text.to_string();

        for token in self.tokens.values() {
            let token_str = token.expose_secret();
            if let Ok(regex) = Regex::new(&regex::escape(token_str)) {
                let masked_token = self.mask_token(token_str);
                masked = regex
                    .replace_all(&masked, regex::NoExpand(&masked_token))
                    .into_owned();
            }
        }

        masked
    }
}
