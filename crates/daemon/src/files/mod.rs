//! File manager module for directory browsing and file operations.
//!
//! This module provides the filesystem side of the file manager:
//! - Directory resolution with root fallback and listing
//! - Delete (recursive), rename, create, and text edit operations
//! - Upload storage via temp file and rename, and streamed downloads
//!
//! # Confinement
//!
//! When the browser is confined, requested directories must canonicalize
//! under the root and entry names must be a single path component. Symlinks
//! are only followed when they point inside the root.

pub mod browser;
pub mod ops;
pub mod transfer;

pub use browser::{BrowserError, DirectoryBrowser, DirectoryEntry, EntryKind, Listing};
pub use ops::{remove_tree, FileOpError, FileOps, RemovalStats};
pub use transfer::{Download, FileTransfer, TransferError};
