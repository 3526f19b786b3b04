//! Sends the archive to the release and to the object store

use std::path::Path;

use crate::core::error::PublishError;
use crate::core::naming::ReleaseIdentifier;
use crate::core::traits::{
    AssetUpload, ObjectStore, ReleaseHost, RemoteRelease, UploadReceipt, UploadTarget,
};

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Content type guessed from the file extension
pub fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("7z") => "application/x-7z-compressed",
        Some("zip") => "application/zip",
        Some("gz" | "tgz") => "application/gzip",
        Some("tar") => "application/x-tar",
        Some("xz") => "application/x-xz",
        _ => FALLBACK_CONTENT_TYPE,
    }
}

/// Size and content type of the file at `path`, uploaded as `name`
pub async fn prepare_asset(path: &Path, name: &str) -> Result<AssetUpload, PublishError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| PublishError::io(format!("reading metadata of {}", path.display()), e))?;

    Ok(AssetUpload {
        path: path.to_path_buf(),
        name: name.to_string(),
        size: metadata.len(),
        content_type: content_type_for(path).to_string(),
    })
}

/// `<prefix>/<product>/<identifier>/<name>` with the product lowercased
pub fn object_key(
    prefix: &str,
    product: &str,
    identifier: &ReleaseIdentifier,
    name: &str,
) -> String {
    let product = product.to_lowercase();
    match prefix.trim_matches('/') {
        "" => format!("{product}/{identifier}/{name}"),
        prefix => format!("{prefix}/{product}/{identifier}/{name}"),
    }
}

/// One archive, ready to be uploaded to any number of targets
#[derive(Debug, Clone)]
pub struct AssetUploader {
    asset: AssetUpload,
}

impl AssetUploader {
    pub async fn prepare(path: &Path, name: &str) -> Result<Self, PublishError> {
        Ok(Self {
            asset: prepare_asset(path, name).await?,
        })
    }

    pub fn asset(&self) -> &AssetUpload {
        &self.asset
    }

    pub async fn upload_to_release(
        &self,
        host: &dyn ReleaseHost,
        release: &RemoteRelease,
    ) -> Result<UploadReceipt, PublishError> {
        tracing::info!(
            "Uploading {} to {}...",
            self.asset.name,
            UploadTarget::GithubRelease
        );

        let receipt = host.upload_release_asset(release, &self.asset).await?;
        tracing::info!(location = %receipt.location, bytes = receipt.bytes, "release asset uploaded");

        Ok(receipt)
    }

    pub async fn upload_to_object_store(
        &self,
        store: &dyn ObjectStore,
        bucket: &str,
        key: &str,
    ) -> Result<UploadReceipt, PublishError> {
        tracing::info!(
            "Uploading {} to {}...",
            self.asset.name,
            UploadTarget::ObjectStore
        );

        let receipt = store.put_object(bucket, key, &self.asset).await?;
        tracing::info!(location = %receipt.location, bytes = receipt.bytes, "object uploaded");

        Ok(receipt)
    }
}
