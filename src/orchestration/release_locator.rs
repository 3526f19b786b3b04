//! Finds the release for an identifier, creating it as a prerelease if absent

use crate::core::error::PublishError;
use crate::core::retry::RetryManager;
use crate::core::traits::{NewRelease, ReleaseHost, RemoteRelease, RepositoryRef};

pub struct ReleaseLocator<'a> {
    host: &'a dyn ReleaseHost,
    repository: &'a RepositoryRef,
    retry: &'a RetryManager,
}

impl<'a> ReleaseLocator<'a> {
    pub fn new(
        host: &'a dyn ReleaseHost,
        repository: &'a RepositoryRef,
        retry: &'a RetryManager,
    ) -> Self {
        Self {
            host,
            repository,
            retry,
        }
    }

    /// Look the release up by tag and create it when the service answers
    /// not-found
    ///
    /// Lookup errors other than not-found are returned as-is. A failed
    /// creation repeats the whole lookup-or-create, up to the configured number of attempts.
    pub async fn locate_or_create(&self, tag: &str) -> Result<RemoteRelease, PublishError> {
        self.retry.retry(|| self.locate_or_create_once(tag)).await
    }

    async fn locate_or_create_once(&self, tag: &str) -> Result<RemoteRelease, PublishError> {
        if let Some(release) = self.host.get_release_by_tag(self.repository, tag).await? {
            tracing::debug!(tag, release_id = release.id, "found existing release");
            return Ok(release);
        }

        tracing::info!("Creating release for tag: {tag}...");

        self.host
            .create_release(self.repository, &NewRelease::prerelease(tag))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::retry::RetryOptions;
    use crate::orchestration::fakes::{FakeReleaseHost, event_log, events, release};
    use std::time::Duration;

    fn retry(max_attempts: u32) -> RetryManager {
        RetryManager::new(RetryOptions {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
        })
    }

    fn repo() -> RepositoryRef {
        RepositoryRef::parse("dreamnet/dreamapp").unwrap()
    }

    #[tokio::test]
    async fn test_existing_release_is_reused() {
        let log = event_log();
        let host = FakeReleaseHost::new(log.clone()).with_existing(release("v1.2.3"));
        let (repo, retry) = (repo(), retry(3));

        let found = ReleaseLocator::new(&host, &repo, &retry)
            .locate_or_create("v1.2.3")
            .await
            .unwrap();

        assert_eq!(found.tag_name, "v1.2.3");
        assert_eq!(events(&log), vec!["lookup dreamnet/dreamapp v1.2.3"]);
    }

    #[tokio::test]
    async fn test_not_found_creates_one_prerelease() {
        let log = event_log();
        let host = FakeReleaseHost::new(log.clone());
        let (repo, retry) = (repo(), retry(3));

        let created = ReleaseLocator::new(&host, &repo, &retry)
            .locate_or_create("v1.2.3")
            .await
            .unwrap();

        assert!(created.prerelease);
        assert_eq!(
            events(&log),
            vec![
                "lookup dreamnet/dreamapp v1.2.3",
                "create dreamnet/dreamapp v1.2.3 prerelease=true draft=false",
            ]
        );
    }

    #[tokio::test]
    async fn test_lookup_error_is_fatal_without_create() {
        let log = event_log();
        let host = FakeReleaseHost::new(log.clone()).with_lookup_error(500);
        let (repo, retry) = (repo(), retry(3));

        let result = ReleaseLocator::new(&host, &repo, &retry)
            .locate_or_create("v1.2.3")
            .await;

        assert!(matches!(
            result,
            Err(PublishError::ReleaseLookupFailed {
                status: Some(500),
                ..
            })
        ));
        assert_eq!(events(&log), vec!["lookup dreamnet/dreamapp v1.2.3"]);
    }

    #[tokio::test]
    async fn test_create_failure_retries_whole_operation() {
        let log = event_log();
        let host = FakeReleaseHost::new(log.clone()).with_create_failures(1);
        let (repo, retry) = (repo(), retry(3));

        let created = ReleaseLocator::new(&host, &repo, &retry)
            .locate_or_create("v1.2.3")
            .await
            .unwrap();

        assert_eq!(created.tag_name, "v1.2.3");
        assert_eq!(
            events(&log),
            vec![
                "lookup dreamnet/dreamapp v1.2.3",
                "create dreamnet/dreamapp v1.2.3 prerelease=true draft=false",
                "lookup dreamnet/dreamapp v1.2.3",
                "create dreamnet/dreamapp v1.2.3 prerelease=true draft=false",
            ]
        );
    }

    #[tokio::test]
    async fn test_create_retries_are_bounded() {
        let log = event_log();
        let host = FakeReleaseHost::new(log.clone()).with_create_failures(10);
        let (repo, retry) = (repo(), retry(3));

        let result = ReleaseLocator::new(&host, &repo, &retry)
            .locate_or_create("v1.2.3")
            .await;

        assert!(matches!(result, Err(PublishError::ReleaseCreateFailed { .. })));
        let creates = events(&log)
            .iter()
            .filter(|e| e.starts_with("create"))
            .count();
        assert_eq!(creates, 3);
    }
}
