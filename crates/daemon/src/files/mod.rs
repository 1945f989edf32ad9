//! Filesystem access for the shared folder.
//!
//! This module provides:
//! - Directory listing with search and thumbnails
//! - Download resolution and streamed uploads
//!
//! # Security
//!
//! All request paths are resolved against the shared root. Paths are
//! canonicalized before use and anything that ends up outside the root,
//! including through symlinks, is rejected.

pub mod browser;
pub mod thumbnail;
pub mod transfer;

pub use browser::{BrowserError, DirectoryBrowser, DirectoryEntry};
pub use thumbnail::{MediaKind, Thumbnail, ThumbnailError, ThumbnailGenerator};
pub use transfer::{DownloadTarget, FileTransfer, TransferError, UploadWriter};
