//! In-memory collaborators that record every call into a shared event log

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::core::config::ArchiveFormat;
use crate::core::error::PublishError;
use crate::core::traits::{
    Archiver, AssetUpload, NewRelease, ObjectStore, ReleaseHost, RemoteRelease, RepositoryRef,
    UploadReceipt, UploadTarget,
};

pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn events(log: &EventLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

fn record(log: &EventLog, event: String) {
    log.lock().unwrap().push(event);
}

pub fn release(tag: &str) -> RemoteRelease {
    RemoteRelease {
        id: 7,
        tag_name: tag.to_string(),
        upload_url: "https://uploads.example.test/releases/7/assets{?name,label}".to_string(),
        prerelease: true,
        draft: false,
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ArchiveBehavior {
    WriteFile,
    SucceedWithoutFile,
    Fail,
}

pub struct FakeArchiver {
    pub log: EventLog,
    pub behavior: ArchiveBehavior,
}

#[async_trait]
impl Archiver for FakeArchiver {
    fn format(&self) -> ArchiveFormat {
        ArchiveFormat::Zip
    }

    async fn compress(&self, source_dir: &Path, archive_path: &Path) -> Result<(), PublishError> {
        record(
            &self.log,
            format!("compress {} -> {}", source_dir.display(), archive_path.display()),
        );

        match self.behavior {
            ArchiveBehavior::WriteFile => tokio::fs::write(archive_path, b"archive-bytes")
                .await
                .map_err(|e| PublishError::io("writing fake archive", e)),
            ArchiveBehavior::SucceedWithoutFile => Ok(()),
            ArchiveBehavior::Fail => Err(PublishError::ArchiveFailed {
                message: "compressor crashed".to_string(),
            }),
        }
    }
}

pub struct FakeReleaseHost {
    pub log: EventLog,
    existing: Mutex<Option<RemoteRelease>>,
    lookup_status: Option<u16>,
    create_failures: AtomicU32,
    fail_upload: bool,
}

impl FakeReleaseHost {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            existing: Mutex::new(None),
            lookup_status: None,
            create_failures: AtomicU32::new(0),
            fail_upload: false,
        }
    }

    pub fn with_existing(self, release: RemoteRelease) -> Self {
        *self.existing.lock().unwrap() = Some(release);
        self
    }

    /// Every lookup answers with this non-404 status
    pub fn with_lookup_error(mut self, status: u16) -> Self {
        self.lookup_status = Some(status);
        self
    }

    /// The next `count` create calls fail
    pub fn with_create_failures(self, count: u32) -> Self {
        self.create_failures.store(count, Ordering::SeqCst);
        self
    }

    pub fn with_failing_upload(mut self) -> Self {
        self.fail_upload = true;
        self
    }
}

#[async_trait]
impl ReleaseHost for FakeReleaseHost {
    async fn get_release_by_tag(
        &self,
        repository: &RepositoryRef,
        tag: &str,
    ) -> Result<Option<RemoteRelease>, PublishError> {
        record(&self.log, format!("lookup {repository} {tag}"));

        if let Some(status) = self.lookup_status {
            return Err(PublishError::ReleaseLookupFailed {
                tag: tag.to_string(),
                status: Some(status),
                message: "lookup rejected".to_string(),
            });
        }

        Ok(self.existing.lock().unwrap().clone())
    }

    async fn create_release(
        &self,
        repository: &RepositoryRef,
        new_release: &NewRelease,
    ) -> Result<RemoteRelease, PublishError> {
        record(
            &self.log,
            format!(
                "create {repository} {} prerelease={} draft={}",
                new_release.tag_name, new_release.prerelease, new_release.draft
            ),
        );

        let remaining = self.create_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.create_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(PublishError::ReleaseCreateFailed {
                tag: new_release.tag_name.clone(),
                message: "HTTP 502 Bad Gateway".to_string(),
            });
        }

        let created = release(&new_release.tag_name);
        *self.existing.lock().unwrap() = Some(created.clone());
        Ok(created)
    }

    async fn upload_release_asset(
        &self,
        release: &RemoteRelease,
        asset: &AssetUpload,
    ) -> Result<UploadReceipt, PublishError> {
        record(
            &self.log,
            format!("upload-asset {} {} {}", release.tag_name, asset.name, asset.size),
        );
        // The file must still be on disk when the upload starts
        assert!(asset.path.is_file(), "archive missing at upload time");

        if self.fail_upload {
            return Err(PublishError::UploadFailed {
                target: UploadTarget::GithubRelease.to_string(),
                message: "HTTP 500".to_string(),
            });
        }

        Ok(UploadReceipt {
            target: UploadTarget::GithubRelease,
            location: format!("https://github.example.test/{}/{}", release.tag_name, asset.name),
            bytes: asset.size,
        })
    }
}

pub struct FakeObjectStore {
    pub log: EventLog,
    pub delay: Duration,
    pub fail: bool,
}

impl FakeObjectStore {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            delay: Duration::ZERO,
            fail: false,
        }
    }
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        asset: &AssetUpload,
    ) -> Result<UploadReceipt, PublishError> {
        record(&self.log, format!("put-object {bucket}/{key}"));
        tokio::time::sleep(self.delay).await;

        if self.fail {
            return Err(PublishError::UploadFailed {
                target: UploadTarget::ObjectStore.to_string(),
                message: "HTTP 403".to_string(),
            });
        }

        record(&self.log, format!("put-object-done {bucket}/{key}"));
        Ok(UploadReceipt {
            target: UploadTarget::ObjectStore,
            location: format!("s3://{bucket}/{key}"),
            bytes: asset.size,
        })
    }
}
