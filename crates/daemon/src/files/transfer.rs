//! File transfer: storing uploads and opening downloads.
//!
//! Uploads are written to a temporary file next to their destination and
//! renamed into place, so a failed upload never leaves a half-written file
//! under the destination name. Downloads hand out an async file handle for
//! streaming.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use protocol::UploadedFile;
use thiserror::Error;
use tracing::warn;

use super::browser::{BrowserError, DirectoryBrowser};

/// Errors that can occur during file transfer.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Path resolution failed.
    #[error("path validation error: {0}")]
    PathValidation(#[from] BrowserError),

    /// The requested file does not exist.
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    /// The requested path exists but is not a regular file.
    #[error("not a regular file: {0}")]
    NotAFile(PathBuf),

    /// The uploaded file name has no usable final component.
    #[error("invalid upload file name: {0:?}")]
    InvalidFileName(String),

    /// File too large.
    #[error("file too large: {size} bytes exceeds limit of {limit} bytes")]
    FileTooLarge { size: u64, limit: u64 },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// An open file ready to be streamed to the client.
#[derive(Debug)]
pub struct Download {
    /// Open handle positioned at the start.
    pub file: tokio::fs::File,
    /// Size in bytes at open time.
    pub size: u64,
    /// Base name for the attachment header.
    pub file_name: String,
}

/// File transfer handler.
#[derive(Debug, Clone)]
pub struct FileTransfer {
    /// Browser for path validation.
    browser: DirectoryBrowser,
    /// Maximum upload size allowed.
    max_upload_size: u64,
}

impl FileTransfer {
    /// Create a new file transfer handler.
    pub fn new(browser: DirectoryBrowser, max_upload_size: u64) -> Self {
        Self {
            browser,
            max_upload_size,
        }
    }

    /// Maximum upload size in bytes.
    pub fn max_upload_size(&self) -> u64 {
        self.max_upload_size
    }

    /// Store an uploaded file in `dir` under its base name.
    ///
    /// An existing file of the same name is replaced. Returns the destination
    /// path.
    pub fn store_upload(&self, dir: &Path, upload: &UploadedFile) -> Result<PathBuf, TransferError> {
        if upload.len() > self.max_upload_size {
            return Err(TransferError::FileTooLarge {
                size: upload.len(),
                limit: self.max_upload_size,
            });
        }

        let name = upload
            .base_name()
            .ok_or_else(|| TransferError::InvalidFileName(upload.file_name.clone()))?;
        let destination = self.browser.resolve_target(dir, name)?;

        if destination.is_dir() {
            return Err(TransferError::NotAFile(destination));
        }

        let parent = destination.parent().unwrap_or(dir);
        // Fixed length, so any name valid at the destination also fits here.
        let temp_path = parent.join(format!(".filedeck-{}.upload", uuid::Uuid::new_v4().simple()));

        if let Err(e) = write_file(&temp_path, &upload.data) {
            if let Err(cleanup) = fs::remove_file(&temp_path) {
                warn!(path = ?temp_path, error = %cleanup, "Failed to cleanup temp file after write error");
            }
            return Err(e.into());
        }

        // Atomic rename to destination
        if let Err(e) = fs::rename(&temp_path, &destination) {
            if let Err(cleanup) = fs::remove_file(&temp_path) {
                warn!(path = ?temp_path, error = %cleanup, "Failed to cleanup temp file after rename error");
            }
            return Err(e.into());
        }

        Ok(destination)
    }

    /// Open a regular file of `dir` for streaming.
    pub async fn open_download(&self, dir: &Path, name: &str) -> Result<Download, TransferError> {
        let path = self.browser.resolve_target(dir, name)?;

        let metadata = tokio::fs::metadata(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TransferError::FileNotFound(path.clone())
            } else {
                TransferError::Io(e)
            }
        })?;

        if !metadata.is_file() {
            return Err(TransferError::NotAFile(path));
        }

        let file = tokio::fs::File::open(&path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| name.to_string());

        Ok(Download {
            file,
            size: metadata.len(),
            file_name,
        })
    }
}

fn write_file(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)?;
    file.write_all(data)?;
    file.sync_all()
}
