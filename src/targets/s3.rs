//! S3-compatible object store client (DigitalOcean Spaces, MinIO, AWS)
//!
//! Objects are written with a single path-style `PUT`. The body is streamed
//! from disk, so the payload is signed as `UNSIGNED-PAYLOAD`.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Url;
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use std::collections::BTreeMap;

use super::sigv4::{AMZ_DATE_FORMAT, CanonicalRequest, SignatureV4, UNSIGNED_PAYLOAD, uri_encode};
use super::{error_body, file_body, http_client};
use crate::core::config::S3Credentials;
use crate::core::error::PublishError;
use crate::core::traits::{AssetUpload, ObjectStore, UploadReceipt, UploadTarget};

const SERVICE: &str = "s3";

pub struct S3Client {
    client: reqwest::Client,
    endpoint: String,
    region: String,
    access_key_id: String,
    secret_access_key: SecretString,
    acl: Option<String>,
}

impl S3Client {
    pub fn new(
        endpoint: impl Into<String>,
        region: impl Into<String>,
        credentials: &S3Credentials,
    ) -> Result<Self, PublishError> {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        Url::parse(&endpoint).map_err(|e| PublishError::InvalidConfig {
            message: format!("Invalid S3 endpoint '{endpoint}': {e}"),
        })?;

        Ok(Self {
            client: http_client()?,
            endpoint,
            region: region.into(),
            access_key_id: credentials.access_key_id.clone(),
            secret_access_key: SecretString::from(
                credentials.secret_access_key.expose_secret().to_string(),
            ),
            acl: None,
        })
    }

    /// Canned ACL sent as `x-amz-acl`; `None` leaves the bucket default
    pub fn with_acl(mut self, acl: Option<String>) -> Self {
        self.acl = acl;
        self
    }

    /// Path-style object URL: `{endpoint}/{bucket}/{key}`
    pub fn object_url(&self, bucket: &str, key: &str) -> Result<Url, PublishError> {
        let url = format!(
            "{}/{}/{}",
            self.endpoint,
            uri_encode(bucket, true),
            uri_encode(key.trim_start_matches('/'), false)
        );

        Url::parse(&url).map_err(|e| PublishError::InvalidConfig {
            message: format!("Invalid object URL '{url}': {e}"),
        })
    }

    fn signer(&self) -> SignatureV4<'_> {
        SignatureV4 {
            access_key_id: &self.access_key_id,
            secret_access_key: self.secret_access_key.expose_secret(),
            region: &self.region,
            service: SERVICE,
        }
    }
}

fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        asset: &AssetUpload,
    ) -> Result<UploadReceipt, PublishError> {
        let upload_failed = |message: String| PublishError::UploadFailed {
            target: UploadTarget::ObjectStore.to_string(),
            message,
        };

        let url = self.object_url(bucket, key)?;
        let now = Utc::now();
        let amz_date = now.format(AMZ_DATE_FORMAT).to_string();

        let mut headers = BTreeMap::new();
        headers.insert("host".to_string(), host_header(&url));
        headers.insert("x-amz-content-sha256".to_string(), UNSIGNED_PAYLOAD.to_string());
        headers.insert("x-amz-date".to_string(), amz_date.clone());
        if let Some(acl) = &self.acl {
            headers.insert("x-amz-acl".to_string(), acl.clone());
        }

        let canonical = CanonicalRequest {
            method: "PUT",
            path: url.path(),
            query: "",
            headers: headers.clone(),
            payload_hash: UNSIGNED_PAYLOAD,
        };
        let authorization = self.signer().authorization(&canonical, now);

        let body = file_body(&asset.path).await?;

        let mut request = self
            .client
            .put(url.clone())
            .header(AUTHORIZATION, authorization)
            .header(CONTENT_LENGTH, asset.size)
            .header(CONTENT_TYPE, asset.content_type.as_str());
        for (name, value) in headers.iter().filter(|(name, _)| name.as_str() != "host") {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| upload_failed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(upload_failed(error_body(response).await));
        }

        tracing::debug!(bucket, key, "object stored");

        Ok(UploadReceipt {
            target: UploadTarget::ObjectStore,
            location: url.to_string(),
            bytes: asset.size,
        })
    }
}
