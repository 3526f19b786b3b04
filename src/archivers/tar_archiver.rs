//! Gzip-compressed tarballs written with `tar` + `flate2`

use async_trait::async_trait;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use walkdir::WalkDir;

use super::{archive_error, entry_name};
use crate::core::config::ArchiveFormat;
use crate::core::error::PublishError;
use crate::core::traits::Archiver;

#[derive(Debug, Default, Clone, Copy)]
pub struct TarGzArchiver;

#[async_trait]
impl Archiver for TarGzArchiver {
    fn format(&self) -> ArchiveFormat {
        ArchiveFormat::TarGz
    }

    async fn compress(&self, source_dir: &Path, archive_path: &Path) -> Result<(), PublishError> {
        let source_dir = source_dir.to_path_buf();
        let archive_path = archive_path.to_path_buf();

        tokio::task::spawn_blocking(move || write_tar_gz(&source_dir, &archive_path))
            .await
            .map_err(|e| archive_error(format!("tar task failed: {e}")))?
    }
}

fn write_tar_gz(source_dir: &Path, archive_path: &Path) -> Result<(), PublishError> {
    let file = File::create(archive_path)
        .map_err(|e| PublishError::io(format!("creating {}", archive_path.display()), e))?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut tar = tar::Builder::new(encoder);
    tar.follow_symlinks(false);

    for entry in WalkDir::new(source_dir).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(archive_error)?;
        let path = entry.path();

        if path == archive_path {
            continue;
        }

        let name = entry_name(source_dir, path)?;

        if entry.file_type().is_dir() {
            tar.append_dir(&name, path).map_err(archive_error)?;
        } else {
            tar.append_path_with_name(path, &name)
                .map_err(archive_error)?;
        }
    }

    let encoder = tar.into_inner().map_err(archive_error)?;
    let mut file = encoder.finish().map_err(archive_error)?;
    file.flush().map_err(archive_error)?;

    tracing::debug!(archive = %archive_path.display(), "tar.gz archive written");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    #[tokio::test]
    async fn test_compresses_directory_recursively() {
        let build = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(build.path().join("models")).unwrap();
        std::fs::write(build.path().join("run.sh"), "#!/bin/sh\n").unwrap();
        std::fs::write(build.path().join("models/net.bin"), b"weights").unwrap();

        let out = tempfile::tempdir().unwrap();
        let archive_path = out.path().join("app.tar.gz");

        TarGzArchiver.compress(build.path(), &archive_path).await.unwrap();

        let mut archive = tar::Archive::new(GzDecoder::new(File::open(&archive_path).unwrap()));
        let mut files = Vec::new();
        for entry in archive.entries().unwrap() {
            let mut entry = entry.unwrap();
            let name = entry.path().unwrap().to_string_lossy().into_owned();
            if entry.header().entry_type().is_file() {
                let mut content = Vec::new();
                entry.read_to_end(&mut content).unwrap();
                files.push((name, content));
            }
        }

        files.sort();
        assert_eq!(
            files,
            vec![
                ("models/net.bin".to_string(), b"weights".to_vec()),
                ("run.sh".to_string(), b"#!/bin/sh\n".to_vec()),
            ]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinks_are_stored_as_links() {
        let build = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(build.path().join("lib")).unwrap();
        std::fs::write(build.path().join("lib/libcore.so.1"), b"elf").unwrap();
        std::os::unix::fs::symlink("libcore.so.1", build.path().join("lib/libcore.so")).unwrap();
        std::os::unix::fs::symlink("lib", build.path().join("current")).unwrap();
        let out = tempfile::tempdir().unwrap();
        let archive_path = out.path().join("app.tar.gz");

        TarGzArchiver.compress(build.path(), &archive_path).await.unwrap();

        let mut archive = tar::Archive::new(GzDecoder::new(File::open(&archive_path).unwrap()));
        let mut links = Vec::new();
        let mut files = Vec::new();
        for entry in archive.entries().unwrap() {
            let entry = entry.unwrap();
            let name = entry.path().unwrap().to_string_lossy().into_owned();
            let kind = entry.header().entry_type();
            if kind.is_symlink() {
                let target = entry.link_name().unwrap().unwrap();
                links.push((name, target.to_string_lossy().into_owned()));
            } else if kind.is_file() {
                files.push(name);
            }
        }

        links.sort();
        assert_eq!(
            links,
            vec![
                ("current".to_string(), "lib".to_string()),
                ("lib/libcore.so".to_string(), "libcore.so.1".to_string()),
            ]
        );
        assert_eq!(files, vec!["lib/libcore.so.1".to_string()]);
    }

    #[tokio::test]
    async fn test_unwritable_destination_fails() {
        let build = tempfile::tempdir().unwrap();

        let result = TarGzArchiver
            .compress(build.path(), &build.path().join("no/such/dir/a.tar.gz"))
            .await;

        assert!(matches!(result, Err(PublishError::Io { .. })));
    }
}
