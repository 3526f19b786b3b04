//! GitHub releases API client

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::sigv4::uri_encode;
use super::{error_body, file_body, http_client};
use crate::core::error::PublishError;
use crate::core::traits::{
    AssetUpload, NewRelease, ReleaseHost, RemoteRelease, RepositoryRef, UploadReceipt,
    UploadTarget,
};

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";

#[derive(Debug, Deserialize)]
struct ReleaseAsset {
    browser_download_url: String,
    size: u64,
}

/// Client for the releases endpoints of the GitHub REST API
pub struct GithubClient {
    client: reqwest::Client,
    api_url: String,
    token: SecretString,
}

impl GithubClient {
    pub fn new(api_url: impl Into<String>, token: SecretString) -> Result<Self, PublishError> {
        Ok(Self {
            client: http_client()?,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(self.token.expose_secret())
            .header(ACCEPT, GITHUB_ACCEPT)
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
    }

    fn releases_url(&self, repository: &RepositoryRef) -> String {
        format!(
            "{}/repos/{}/{}/releases",
            self.api_url, repository.owner, repository.name
        )
    }
}

/// Drop the URI template suffix of an upload URL (`...assets{?name,label}`)
pub fn upload_endpoint(upload_url: &str) -> &str {
    upload_url
        .split_once('{')
        .map_or(upload_url, |(base, _)| base)
}

#[async_trait]
impl ReleaseHost for GithubClient {
    async fn get_release_by_tag(
        &self,
        repository: &RepositoryRef,
        tag: &str,
    ) -> Result<Option<RemoteRelease>, PublishError> {
        let url = format!(
            "{}/tags/{}",
            self.releases_url(repository),
            uri_encode(tag, true)
        );

        let response = self
            .request(Method::GET, &url)
            .send()
            .await
            .map_err(|e| PublishError::ReleaseLookupFailed {
                tag: tag.to_string(),
                status: None,
                message: e.to_string(),
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !status.is_success() {
            return Err(PublishError::ReleaseLookupFailed {
                tag: tag.to_string(),
                status: Some(status.as_u16()),
                message: error_body(response).await,
            });
        }

        let release = response
            .json::<RemoteRelease>()
            .await
            .map_err(|e| PublishError::ReleaseLookupFailed {
                tag: tag.to_string(),
                status: Some(status.as_u16()),
                message: format!("Failed to parse response: {e}"),
            })?;

        Ok(Some(release))
    }

    async fn create_release(
        &self,
        repository: &RepositoryRef,
        release: &NewRelease,
    ) -> Result<RemoteRelease, PublishError> {
        let create_failed = |message: String| PublishError::ReleaseCreateFailed {
            tag: release.tag_name.clone(),
            message,
        };

        let response = self
            .request(Method::POST, &self.releases_url(repository))
            .json(release)
            .send()
            .await
            .map_err(|e| create_failed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(create_failed(error_body(response).await));
        }

        response
            .json::<RemoteRelease>()
            .await
            .map_err(|e| create_failed(format!("Failed to parse response: {e}")))
    }

    async fn upload_release_asset(
        &self,
        release: &RemoteRelease,
        asset: &AssetUpload,
    ) -> Result<UploadReceipt, PublishError> {
        let upload_failed = |message: String| PublishError::UploadFailed {
            target: UploadTarget::GithubRelease.to_string(),
            message,
        };

        let body = file_body(&asset.path).await?;

        let response = self
            .request(Method::POST, upload_endpoint(&release.upload_url))
            .query(&[("name", asset.name.as_str())])
            .header(CONTENT_LENGTH, asset.size)
            .header(CONTENT_TYPE, asset.content_type.as_str())
            .body(body)
            .send()
            .await
            .map_err(|e| upload_failed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(upload_failed(error_body(response).await));
        }

        let uploaded = response
            .json::<ReleaseAsset>()
            .await
            .map_err(|e| upload_failed(format!("Failed to parse response: {e}")))?;

        Ok(UploadReceipt {
            target: UploadTarget::GithubRelease,
            location: uploaded.browser_download_url,
            bytes: uploaded.size,
        })
    }
}
