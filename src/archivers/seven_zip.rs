//! 7-Zip archives produced by the external `7z` binary

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

use super::archive_error;
use crate::core::config::ArchiveFormat;
use crate::core::error::PublishError;
use crate::core::traits::Archiver;
use crate::security::command_executor::SafeCommandExecutor;

const DEFAULT_COMMAND: &str = "7z";

/// Runs `7z a -r -y <archive> *` inside the build directory
#[derive(Debug, Clone)]
pub struct SevenZipArchiver {
    command: String,
    timeout: Option<Duration>,
}

impl Default for SevenZipArchiver {
    fn default() -> Self {
        Self::new()
    }
}

impl SevenZipArchiver {
    pub fn new() -> Self {
        Self {
            command: DEFAULT_COMMAND.to_string(),
            timeout: None,
        }
    }

    /// Use another 7-Zip binary, e.g. `7za`
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl Archiver for SevenZipArchiver {
    fn format(&self) -> ArchiveFormat {
        ArchiveFormat::SevenZip
    }

    async fn compress(&self, source_dir: &Path, archive_path: &Path) -> Result<(), PublishError> {
        let mut executor = SafeCommandExecutor::new(source_dir).map_err(archive_error)?;
        if let Some(timeout) = self.timeout {
            executor.set_timeout(timeout);
        }

        // The child runs inside the build directory
        let archive_path = std::path::absolute(archive_path)
            .map_err(|e| PublishError::io("resolving archive path", e))?;
        let archive_arg = archive_path.to_string_lossy();

        let output = executor
            .execute(&self.command, &["a", "-r", "-y", archive_arg.as_ref(), "*"])
            .await
            .map_err(archive_error)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(archive_error(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        tracing::debug!(archive = %archive_path.display(), "7z archive written");

        Ok(())
    }
}
