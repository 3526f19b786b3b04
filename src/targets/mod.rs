//! Upload targets: the release hosting API and the object store

pub mod github;
pub mod s3;
pub mod sigv4;

pub use github::GithubClient;
pub use s3::S3Client;

use std::path::Path;
use tokio_util::io::ReaderStream;

use crate::core::error::PublishError;

pub(crate) const USER_AGENT: &str = concat!("release-publisher/", env!("CARGO_PKG_VERSION"));

/// Request body streaming `path` from disk
pub(crate) async fn file_body(path: &Path) -> Result<reqwest::Body, PublishError> {
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| PublishError::io(format!("opening {}", path.display()), e))?;

    Ok(reqwest::Body::wrap_stream(ReaderStream::new(file)))
}

/// Response body for error messages
pub(crate) async fn error_body(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error body".to_string());

    format!("HTTP {status}: {}", body.trim())
}

pub(crate) fn http_client() -> Result<reqwest::Client, PublishError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| PublishError::InvalidConfig {
            message: format!("Failed to build HTTP client: {e}"),
        })
}
