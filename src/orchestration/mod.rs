//! Orchestration layer for release publishing
//!
//! This module provides the high-level components of a run: locating the
//! release, uploading the archive and driving the pipeline.

pub mod asset_uploader;
pub mod release_locator;
pub mod release_publisher;

#[cfg(test)]
pub(crate) mod fakes;

// Re-export main types for convenience
pub use asset_uploader::{AssetUploader, content_type_for, object_key, prepare_asset};
pub use release_locator::ReleaseLocator;
pub use release_publisher::{ReleasePublisher, RunOutcome, RunReport};
