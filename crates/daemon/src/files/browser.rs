//! Directory browsing with path resolution against the served root.
//!
//! This module resolves the requested directory and entry names to absolute
//! paths, optionally confining them to the root, and lists directories in
//! filesystem-enumeration order with directories ahead of files.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use thiserror::Error;
use tracing::debug;

/// Errors that can occur during directory browsing.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// The requested path is outside the served root.
    #[error("path is outside the served root: {0}")]
    PathOutsideBoundary(PathBuf),

    /// The requested path does not exist.
    #[error("path does not exist: {0}")]
    PathNotFound(PathBuf),

    /// The requested path is not a directory.
    #[error("path is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An entry name that does not denote a single entry of the directory.
    #[error("invalid entry name: {0:?}")]
    InvalidName(String),

    /// Symlink points outside the served root.
    #[error("symlink points outside the served root: {0}")]
    SymlinkOutsideBoundary(PathBuf),

    /// Permission denied.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Kind of a listed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A directory, or a symlink to one.
    Directory,
    /// Anything else: regular files, links to files, special files.
    File,
}

/// A directory entry with metadata.
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    /// Entry name (not full path).
    pub name: String,
    /// Full path of the entry.
    pub path: PathBuf,
    /// Entry kind.
    pub kind: EntryKind,
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// Last modified timestamp.
    pub modified: SystemTime,
}

impl DirectoryEntry {
    /// Whether this entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Contents of one directory, split by kind.
///
/// Both sequences keep the order in which the filesystem enumerated them.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    /// Subdirectories.
    pub directories: Vec<DirectoryEntry>,
    /// Files and other non-directory entries.
    pub files: Vec<DirectoryEntry>,
}

impl Listing {
    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.directories.len() + self.files.len()
    }

    /// Whether the directory is empty.
    pub fn is_empty(&self) -> bool {
        self.directories.is_empty() && self.files.is_empty()
    }

    /// All entries, directories first.
    pub fn iter(&self) -> impl Iterator<Item = &DirectoryEntry> {
        self.directories.iter().chain(self.files.iter())
    }

    /// Find an entry by name.
    pub fn find(&self, name: &str) -> Option<&DirectoryEntry> {
        self.iter().find(|e| e.name == name)
    }
}

/// Directory browser rooted at the served directory.
///
/// With confinement on, every resolved path must canonicalize under the root
/// and entry names must be a single path component. With confinement off,
/// names are joined onto the current directory verbatim.
#[derive(Debug, Clone)]
pub struct DirectoryBrowser {
    /// Canonical root directory.
    root: PathBuf,
    /// Whether resolved paths must stay under `root`.
    confine: bool,
}

impl DirectoryBrowser {
    /// Create a browser for the given root directory.
    ///
    /// The root is canonicalized and must be an existing directory.
    pub fn new(root: impl AsRef<Path>, confine: bool) -> Result<Self, BrowserError> {
        let root = root.as_ref();
        let canonical = canonicalize(root)?;
        if !canonical.is_dir() {
            return Err(BrowserError::NotADirectory(canonical));
        }
        Ok(Self {
            root: canonical,
            confine,
        })
    }

    /// Canonical root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether paths are confined to the root.
    pub fn is_confined(&self) -> bool {
        self.confine
    }

    /// Validate that a path exists and, when confined, lies under the root.
    ///
    /// Returns the canonicalized path if valid.
    pub fn validate_path(&self, path: &Path) -> Result<PathBuf, BrowserError> {
        let canonical = canonicalize(path)?;

        if self.confine && !canonical.starts_with(&self.root) {
            return Err(BrowserError::PathOutsideBoundary(path.to_path_buf()));
        }

        Ok(canonical)
    }

    /// Resolve the requested directory, falling back to the root.
    ///
    /// Relative requests are taken relative to the root. Anything that does
    /// not resolve to an existing directory (inside the root when confined)
    /// yields the root.
    pub fn resolve_dir(&self, requested: Option<&str>) -> PathBuf {
        let Some(requested) = requested.filter(|r| !r.is_empty()) else {
            return self.root.clone();
        };

        let candidate = self.root.join(requested);
        match self.validate_path(&candidate) {
            Ok(dir) if dir.is_dir() => dir,
            Ok(path) => {
                debug!(path = %path.display(), "Requested dir is not a directory, using root");
                self.root.clone()
            }
            Err(e) => {
                debug!(requested, error = %e, "Requested dir rejected, using root");
                self.root.clone()
            }
        }
    }

    /// Resolve an entry name inside `dir` without following it.
    ///
    /// Suitable for operations that act on the entry itself (delete, rename).
    /// The entry does not need to exist.
    pub fn resolve_entry(&self, dir: &Path, name: &str) -> Result<PathBuf, BrowserError> {
        if name.is_empty() {
            return Err(BrowserError::InvalidName(name.to_string()));
        }

        if !self.confine {
            // Appended as text so an absolute name stays below `dir`.
            let mut joined = dir.as_os_str().to_os_string();
            joined.push("/");
            joined.push(name);
            return Ok(PathBuf::from(joined));
        }

        if name.contains('/') || name.contains('\\') {
            return Err(BrowserError::InvalidName(name.to_string()));
        }

        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => return Err(BrowserError::InvalidName(name.to_string())),
        }

        let dir = self.validate_path(dir)?;
        Ok(dir.join(name))
    }

    /// Resolve an entry name inside `dir` for operations that follow links
    /// (read, write, download).
    ///
    /// When confined, an existing symlink must point inside the root.
    pub fn resolve_target(&self, dir: &Path, name: &str) -> Result<PathBuf, BrowserError> {
        let path = self.resolve_entry(dir, name)?;

        if self.confine {
            let is_symlink = fs::symlink_metadata(&path)
                .map(|m| m.file_type().is_symlink())
                .unwrap_or(false);
            if is_symlink && self.validate_path(&path).is_err() {
                return Err(BrowserError::SymlinkOutsideBoundary(path));
            }
        }

        Ok(path)
    }

    /// Directory the "up" link of `dir` points at.
    ///
    /// When confined, the root is its own parent.
    pub fn parent_of(&self, dir: &Path) -> PathBuf {
        if self.confine && dir == self.root {
            return self.root.clone();
        }
        dir.parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| dir.to_path_buf())
    }

    /// List contents of a directory.
    ///
    /// `.` and `..` are never listed; hidden entries are. Entries that cannot
    /// be stat'ed are skipped.
    pub fn list_directory(&self, dir: &Path) -> Result<Listing, BrowserError> {
        let canonical = self.validate_path(dir)?;

        let metadata = fs::metadata(&canonical)?;
        if !metadata.is_dir() {
            return Err(BrowserError::NotADirectory(canonical));
        }

        let entries = fs::read_dir(&canonical)?;
        let mut listing = Listing::default();

        for entry_result in entries {
            let entry = match entry_result {
                Ok(e) => e,
                Err(_) => continue, // Skip entries we can't read
            };

            let name = entry.file_name().to_string_lossy().to_string();
            let path = entry.path();

            // Follow links so that links to directories list as directories;
            // dangling links fall back to the link's own metadata.
            let metadata = match fs::metadata(&path).or_else(|_| entry.metadata()) {
                Ok(m) => m,
                Err(_) => continue, // Skip entries we can't stat
            };

            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);

            if metadata.is_dir() {
                listing.directories.push(DirectoryEntry {
                    name,
                    path,
                    kind: EntryKind::Directory,
                    size: 0,
                    modified,
                });
            } else {
                listing.files.push(DirectoryEntry {
                    name,
                    path,
                    kind: EntryKind::File,
                    size: metadata.len(),
                    modified,
                });
            }
        }

        Ok(listing)
    }
}

/// Canonicalize a path, mapping the common failures to typed errors.
fn canonicalize(path: &Path) -> Result<PathBuf, BrowserError> {
    fs::canonicalize(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => BrowserError::PathNotFound(path.to_path_buf()),
        std::io::ErrorKind::PermissionDenied => BrowserError::PermissionDenied(path.to_path_buf()),
        _ => BrowserError::Io(e),
    })
}
