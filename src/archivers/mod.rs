//! Archiver implementations
//!
//! Each archiver compresses the whole build directory, recursively, with
//! entry names relative to that directory.

pub mod seven_zip;
pub mod tar_archiver;
pub mod zip_archiver;

pub use seven_zip::SevenZipArchiver;
pub use tar_archiver::TarGzArchiver;
pub use zip_archiver::ZipArchiver;

use std::fmt::Display;
use std::path::Path;

use crate::core::config::ArchiveFormat;
use crate::core::error::PublishError;
use crate::core::traits::Archiver;

/// Archiver for the configured format
pub fn create_archiver(format: ArchiveFormat) -> Box<dyn Archiver> {
    match format {
        ArchiveFormat::SevenZip => Box::new(SevenZipArchiver::new()),
        ArchiveFormat::Zip => Box::new(ZipArchiver),
        ArchiveFormat::TarGz => Box::new(TarGzArchiver),
    }
}

pub(crate) fn archive_error(e: impl Display) -> PublishError {
    PublishError::ArchiveFailed {
        message: e.to_string(),
    }
}

/// Entry name of `path` inside an archive rooted at `source_dir`, `/`-separated
pub(crate) fn entry_name(source_dir: &Path, path: &Path) -> Result<String, PublishError> {
    let relative = path.strip_prefix(source_dir).map_err(archive_error)?;

    Ok(relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_create_archiver_matches_format() {
        for format in [ArchiveFormat::SevenZip, ArchiveFormat::Zip, ArchiveFormat::TarGz] {
            assert_eq!(create_archiver(format).format(), format);
        }
    }

    #[test]
    fn test_entry_name_is_relative_and_slash_separated() {
        let root = PathBuf::from("build");
        let nested = root.join("bin").join("app");

        assert_eq!(entry_name(&root, &nested).unwrap(), "bin/app");
    }

    #[test]
    fn test_entry_name_outside_root_fails() {
        let result = entry_name(Path::new("build"), Path::new("other/file"));

        assert!(matches!(result, Err(PublishError::ArchiveFailed { .. })));
    }
}
