//! Downloads and uploads against the shared root.
//!
//! Uploads are streamed into a hidden part file next to their destination
//! and renamed into place once complete, so a concurrent listing or download
//! never observes a half-written file. Concurrent uploads of the same name
//! resolve as last-rename-wins.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::warn;

use super::browser::{BrowserError, DirectoryBrowser};

/// Characters left unescaped in an RFC 5987 `filename*` value.
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

static PART_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Errors that can occur during file transfer.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The requested path resolves outside the shared root.
    #[error("path is outside the shared root: {0}")]
    PathOutsideRoot(String),

    /// The requested file does not exist or is not a regular file.
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// An upload would replace a directory.
    #[error("path is a directory: {0}")]
    IsADirectory(String),

    /// The uploaded file name is unusable.
    #[error("invalid file name: {0:?}")]
    InvalidFileName(String),

    /// Permission denied.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransferError {
    fn from_browser(err: BrowserError, requested: &str) -> Self {
        match err {
            BrowserError::PathOutsideRoot(p) => TransferError::PathOutsideRoot(p),
            BrowserError::PathNotFound(_) | BrowserError::NotADirectory(_) => {
                TransferError::FileNotFound(requested.to_string())
            }
            BrowserError::PermissionDenied(p) => TransferError::PermissionDenied(p),
            BrowserError::Io(e) => TransferError::Io(e),
        }
    }
}

/// A file resolved for download.
#[derive(Debug, Clone)]
pub struct DownloadTarget {
    /// Canonical path on disk.
    pub path: PathBuf,
    /// Name presented to the client.
    pub file_name: String,
    /// Size in bytes.
    pub size: u64,
}

impl DownloadTarget {
    /// MIME type guessed from the extension.
    pub fn content_type(&self) -> String {
        mime_guess::from_path(&self.path)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    }

    /// `Content-Disposition` value that makes browsers save the file.
    pub fn content_disposition(&self) -> String {
        let ascii: String = self
            .file_name
            .chars()
            .map(|c| {
                if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            ascii,
            utf8_percent_encode(&self.file_name, ATTR_CHAR)
        )
    }
}

/// An upload being streamed to disk.
///
/// Dropping the writer before [`UploadWriter::finish`] removes the part file.
#[derive(Debug)]
pub struct UploadWriter {
    destination: PathBuf,
    part_path: PathBuf,
    file: Option<File>,
    written: u64,
}

impl UploadWriter {
    /// Append a chunk.
    pub async fn write_chunk(&mut self, data: &[u8]) -> Result<(), TransferError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| std::io::Error::other("upload already finished"))?;
        file.write_all(data).await?;
        self.written += data.len() as u64;
        Ok(())
    }

    /// Bytes written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flush and move the file into place.
    pub async fn finish(mut self) -> Result<PathBuf, TransferError> {
        // On error the writer is dropped with its file still set, which
        // removes the part file.
        if let Some(file) = self.file.as_mut() {
            file.flush().await?;
            file.sync_all().await?;
        }
        self.file = None;

        if let Err(e) = fs::rename(&self.part_path, &self.destination).await {
            self.discard().await;
            return Err(e.into());
        }
        Ok(self.destination.clone())
    }

    async fn discard(&self) {
        if let Err(e) = fs::remove_file(&self.part_path).await {
            warn!(
                "Failed to remove partial upload {}: {}",
                self.part_path.display(),
                e
            );
        }
    }
}

impl Drop for UploadWriter {
    fn drop(&mut self) {
        if self.file.is_some() {
            if let Err(e) = std::fs::remove_file(&self.part_path) {
                warn!(
                    "Failed to remove partial upload {}: {}",
                    self.part_path.display(),
                    e
                );
            }
        }
    }
}

/// Download and upload operations for one shared root.
#[derive(Debug, Clone)]
pub struct FileTransfer {
    /// Browser for path validation.
    browser: Arc<DirectoryBrowser>,
}

impl FileTransfer {
    /// Create a transfer handler sharing the browser's root.
    pub fn new(browser: Arc<DirectoryBrowser>) -> Self {
        Self { browser }
    }

    /// The canonical shared root.
    pub fn root(&self) -> &Path {
        self.browser.root()
    }

    /// Resolve a root-relative path to a regular file inside the root.
    pub async fn resolve_download(&self, relative: &str) -> Result<DownloadTarget, TransferError> {
        let path = self
            .browser
            .resolve(relative)
            .map_err(|e| TransferError::from_browser(e, relative))?;

        let metadata = fs::metadata(&path).await?;
        if !metadata.is_file() {
            return Err(TransferError::FileNotFound(relative.to_string()));
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Ok(DownloadTarget {
            path,
            file_name,
            size: metadata.len(),
        })
    }

    /// Check that an uploaded name is a plain file name.
    ///
    /// Rejects empty names, `.` and `..`, NUL bytes and anything containing a
    /// path separator. The name is otherwise kept verbatim.
    pub fn validate_upload_name(name: &str) -> Result<&str, TransferError> {
        let invalid = name.is_empty()
            || name == "."
            || name == ".."
            || name.contains('/')
            || name.contains('\\')
            || name.contains('\0');
        if invalid {
            return Err(TransferError::InvalidFileName(name.to_string()));
        }
        Ok(name)
    }

    /// Destination path for an upload directly in the root.
    pub async fn upload_destination(&self, name: &str) -> Result<PathBuf, TransferError> {
        let name = Self::validate_upload_name(name)?;
        let destination = self.browser.root().join(name);

        // An existing entry may be a symlink; it must not lead outside.
        if let Ok(existing) = fs::symlink_metadata(&destination).await {
            let target = fs::canonicalize(&destination).await;
            match target {
                Ok(canonical) => {
                    let canonical = self
                        .browser
                        .ensure_inside(canonical, name)
                        .map_err(|e| TransferError::from_browser(e, name))?;
                    if canonical.is_dir() {
                        return Err(TransferError::IsADirectory(name.to_string()));
                    }
                }
                // Dangling symlink.
                Err(_) if existing.file_type().is_symlink() => {
                    return Err(TransferError::PathOutsideRoot(name.to_string()));
                }
                Err(e) => return Err(TransferError::Io(e)),
            }
        }

        Ok(destination)
    }

    /// Open a writer for an upload named `name`.
    pub async fn create_upload(&self, name: &str) -> Result<UploadWriter, TransferError> {
        let destination = self.upload_destination(name).await?;

        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let counter = PART_COUNTER.fetch_add(1, Ordering::Relaxed);
        let part_path = self
            .browser
            .root()
            .join(format!(".upload-{:x}-{}.part", nanos, counter));

        let file = File::create(&part_path).await?;

        Ok(UploadWriter {
            destination,
            part_path,
            file: Some(file),
            written: 0,
        })
    }
}
