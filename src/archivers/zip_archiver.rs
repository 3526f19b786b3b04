//! Zip archives written in-process with the `zip` crate

use async_trait::async_trait;
use std::fs::{File, Metadata};
use std::io;
use std::path::Path;
use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use super::{archive_error, entry_name};
use crate::core::config::ArchiveFormat;
use crate::core::error::PublishError;
use crate::core::traits::Archiver;

/// Deflate-compressed zip archive
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipArchiver;

#[async_trait]
impl Archiver for ZipArchiver {
    fn format(&self) -> ArchiveFormat {
        ArchiveFormat::Zip
    }

    async fn compress(&self, source_dir: &Path, archive_path: &Path) -> Result<(), PublishError> {
        let source_dir = source_dir.to_path_buf();
        let archive_path = archive_path.to_path_buf();

        tokio::task::spawn_blocking(move || write_zip(&source_dir, &archive_path))
            .await
            .map_err(|e| archive_error(format!("zip task failed: {e}")))?
    }
}

fn write_zip(source_dir: &Path, archive_path: &Path) -> Result<(), PublishError> {
    let file = File::create(archive_path)
        .map_err(|e| PublishError::io(format!("creating {}", archive_path.display()), e))?;
    let mut zip = ZipWriter::new(file);
    let base_options =
        SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let skip = archive_path.canonicalize().ok();

    for entry in WalkDir::new(source_dir).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(archive_error)?;
        let path = entry.path();

        // The archive may be written inside the directory it compresses
        if skip.as_deref() == Some(path) || path == archive_path {
            continue;
        }

        let name = entry_name(source_dir, path)?;
        let metadata = entry.metadata().map_err(archive_error)?;
        let options = match unix_mode(&metadata) {
            Some(mode) => base_options.unix_permissions(mode),
            None => base_options,
        };

        if entry.path_is_symlink() {
            let target = std::fs::read_link(path)
                .map_err(|e| PublishError::io(format!("reading link {}", path.display()), e))?;
            zip.add_symlink(name, target.to_string_lossy().into_owned(), options)
                .map_err(archive_error)?;
        } else if entry.file_type().is_dir() {
            zip.add_directory(name, options).map_err(archive_error)?;
        } else {
            zip.start_file(name, options).map_err(archive_error)?;
            let mut input = File::open(path)
                .map_err(|e| PublishError::io(format!("reading {}", path.display()), e))?;
            io::copy(&mut input, &mut zip).map_err(archive_error)?;
        }
    }

    zip.finish().map_err(archive_error)?;
    tracing::debug!(archive = %archive_path.display(), "zip archive written");

    Ok(())
}

#[cfg(unix)]
fn unix_mode(metadata: &Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(metadata.permissions().mode())
}

#[cfg(not(unix))]
fn unix_mode(_metadata: &Metadata) -> Option<u32> {
    None
}
