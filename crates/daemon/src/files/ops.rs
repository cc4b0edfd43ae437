//! Single-step file and directory mutations.
//!
//! Every operation resolves its names under the current directory through the
//! [`DirectoryBrowser`], performs one filesystem change and reports what it
//! did. Nothing is locked; concurrent requests on the same path race at the
//! filesystem level.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use super::browser::{BrowserError, DirectoryBrowser};

/// Errors that can occur during a file operation.
#[derive(Debug, Error)]
pub enum FileOpError {
    /// Path resolution failed.
    #[error(transparent)]
    Browser(#[from] BrowserError),

    /// The target does not exist.
    #[error("not found: {0}")]
    NotFound(PathBuf),

    /// The target exists but is not a regular file.
    #[error("not a regular file: {0}")]
    NotAFile(PathBuf),

    /// The entry to create already exists.
    #[error("already exists: {0}")]
    AlreadyExists(PathBuf),

    /// IO error on a specific path.
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FileOpError {
    fn io(path: &Path) -> impl FnOnce(io::Error) -> FileOpError + '_ {
        move |source| FileOpError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// What a delete removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemovalStats {
    /// Files and symlinks removed.
    pub files: usize,
    /// Directories removed, including the target itself.
    pub directories: usize,
}

impl RemovalStats {
    fn merge(&mut self, other: RemovalStats) {
        self.files += other.files;
        self.directories += other.directories;
    }
}

/// Remove a directory tree depth-first: contents first, then the directory.
///
/// Symlinks are removed, never followed.
pub fn remove_tree(dir: &Path) -> io::Result<RemovalStats> {
    let mut stats = RemovalStats::default();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            stats.merge(remove_tree(&path)?);
        } else {
            fs::remove_file(&path)?;
            stats.files += 1;
        }
    }

    fs::remove_dir(dir)?;
    stats.directories += 1;
    Ok(stats)
}

/// File and directory mutators bound to a browser.
#[derive(Debug, Clone)]
pub struct FileOps {
    browser: DirectoryBrowser,
}

impl FileOps {
    /// Create the mutators on top of a browser.
    pub fn new(browser: DirectoryBrowser) -> Self {
        Self { browser }
    }

    /// Browser used for path resolution.
    pub fn browser(&self) -> &DirectoryBrowser {
        &self.browser
    }

    /// Delete an entry of `dir`.
    ///
    /// Files and symlinks are unlinked; directories are removed recursively.
    pub fn delete(&self, dir: &Path, name: &str) -> Result<RemovalStats, FileOpError> {
        let path = self.browser.resolve_entry(dir, name)?;

        let metadata = match fs::symlink_metadata(&path) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(FileOpError::NotFound(path));
            }
            Err(e) => return Err(FileOpError::io(&path)(e)),
        };

        if metadata.is_dir() {
            let stats = remove_tree(&path).map_err(FileOpError::io(&path))?;
            debug!(path = %path.display(), files = stats.files, directories = stats.directories, "Removed directory tree");
            Ok(stats)
        } else {
            fs::remove_file(&path).map_err(FileOpError::io(&path))?;
            Ok(RemovalStats {
                files: 1,
                directories: 0,
            })
        }
    }

    /// Read a regular file of `dir` as text.
    ///
    /// Invalid UTF-8 sequences are replaced.
    pub fn read_text(&self, dir: &Path, name: &str) -> Result<String, FileOpError> {
        let path = self.regular_file(dir, name)?;
        let bytes = fs::read(&path).map_err(FileOpError::io(&path))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Replace the full contents of a file of `dir`, creating it if needed.
    pub fn write_text(&self, dir: &Path, name: &str, content: &str) -> Result<(), FileOpError> {
        let path = self.browser.resolve_target(dir, name)?;
        if path.is_dir() {
            return Err(FileOpError::NotAFile(path));
        }
        fs::write(&path, content).map_err(FileOpError::io(&path))
    }

    /// Rename `old_name` to `new_name`, both inside `dir`.
    ///
    /// An existing file at the destination is replaced.
    pub fn rename(&self, dir: &Path, old_name: &str, new_name: &str) -> Result<(), FileOpError> {
        let from = self.browser.resolve_entry(dir, old_name)?;
        let to = self.browser.resolve_entry(dir, new_name)?;

        if fs::symlink_metadata(&from).is_err() {
            return Err(FileOpError::NotFound(from));
        }

        fs::rename(&from, &to).map_err(FileOpError::io(&from))
    }

    /// Create an empty file in `dir`, truncating an existing one.
    pub fn create_file(&self, dir: &Path, name: &str) -> Result<(), FileOpError> {
        self.write_text(dir, name, "")
    }

    /// Create an empty directory in `dir`.
    pub fn create_folder(&self, dir: &Path, name: &str) -> Result<(), FileOpError> {
        let path = self.browser.resolve_entry(dir, name)?;
        match fs::create_dir(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(FileOpError::AlreadyExists(path))
            }
            Err(e) => Err(FileOpError::io(&path)(e)),
        }
    }

    /// Resolve `name` and require it to be an existing regular file.
    pub fn regular_file(&self, dir: &Path, name: &str) -> Result<PathBuf, FileOpError> {
        let path = self.browser.resolve_target(dir, name)?;
        match fs::metadata(&path) {
            Ok(m) if m.is_file() => Ok(path),
            Ok(_) => Err(FileOpError::NotAFile(path)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(FileOpError::NotFound(path)),
            Err(e) => Err(FileOpError::io(&path)(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;
    use tempfile::TempDir;

    fn setup() -> (TempDir, FileOps) {
        let temp_dir = TempDir::new().unwrap();
        let browser = DirectoryBrowser::new(temp_dir.path(), true).unwrap();
        (temp_dir, FileOps::new(browser))
    }

    fn root(ops: &FileOps) -> PathBuf {
        ops.browser().root().to_path_buf()
    }

    #[test]
    fn test_delete_file() {
        let (_tmp, ops) = setup();
        let dir = root(&ops);
        fs::write(dir.join("a.txt"), "a").unwrap();

        let stats = ops.delete(&dir, "a.txt").unwrap();
        assert_eq!(stats, RemovalStats { files: 1, directories: 0 });
        assert!(!dir.join("a.txt").exists());
    }

    #[test]
    fn test_delete_directory_recursive() {
        let (_tmp, ops) = setup();
        let dir = root(&ops);
        fs::create_dir_all(dir.join("tree/a/b")).unwrap();
        fs::write(dir.join("tree/one.txt"), "1").unwrap();
        fs::write(dir.join("tree/a/two.txt"), "2").unwrap();
        fs::write(dir.join("tree/a/b/three.txt"), "3").unwrap();
        fs::write(dir.join("keep.txt"), "k").unwrap();

        let stats = ops.delete(&dir, "tree").unwrap();
        assert_eq!(stats, RemovalStats { files: 3, directories: 3 });
        assert!(!dir.join("tree").exists());
        assert!(dir.join("keep.txt").exists());

        let listing = ops.browser().list_directory(&dir).unwrap();
        assert!(listing.find("tree").is_none());
    }

    #[test]
    fn test_delete_does_not_follow_symlinks() {
        let (_tmp, ops) = setup();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("precious.txt"), "p").unwrap();

        let dir = root(&ops);
        fs::create_dir(dir.join("tree")).unwrap();
        symlink(outside.path(), dir.join("tree/link")).unwrap();

        ops.delete(&dir, "tree").unwrap();
        assert!(!dir.join("tree").exists());
        assert!(outside.path().join("precious.txt").exists());
    }

    #[test]
    fn test_delete_missing() {
        let (_tmp, ops) = setup();
        let result = ops.delete(&root(&ops), "nope");
        assert!(matches!(result, Err(FileOpError::NotFound(_))));
    }

    #[test]
    fn test_delete_unconfined_absolute_name() {
        let temp_dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let victim = outside.path().join("victim.txt");
        fs::write(&victim, "keep").unwrap();

        let ops = FileOps::new(DirectoryBrowser::new(temp_dir.path(), false).unwrap());
        let dir = root(&ops);

        assert!(matches!(
            ops.delete(&dir, victim.to_str().unwrap()),
            Err(FileOpError::NotFound(_))
        ));
        assert!(victim.exists());
    }

    #[test]
    fn test_delete_rejects_traversal() {
        let (_tmp, ops) = setup();
        let result = ops.delete(&root(&ops), "..");
        assert!(matches!(
            result,
            Err(FileOpError::Browser(BrowserError::InvalidName(_)))
        ));
    }

    #[test]
    fn test_write_and_read_roundtrip() {
        let (_tmp, ops) = setup();
        let dir = root(&ops);
        fs::write(dir.join("page.html"), "old contents that are longer").unwrap();

        let content = "<h1>new</h1>\r\nline two\n\ttabbed ünïcode";
        ops.write_text(&dir, "page.html", content).unwrap();

        assert_eq!(ops.read_text(&dir, "page.html").unwrap(), content);
        assert_eq!(fs::read(dir.join("page.html")).unwrap(), content.as_bytes());
    }

    #[test]
    fn test_read_text_not_a_file() {
        let (_tmp, ops) = setup();
        let dir = root(&ops);
        fs::create_dir(dir.join("sub")).unwrap();

        assert!(matches!(
            ops.read_text(&dir, "sub"),
            Err(FileOpError::NotAFile(_))
        ));
        assert!(matches!(
            ops.read_text(&dir, "missing"),
            Err(FileOpError::NotFound(_))
        ));
    }

    #[test]
    fn test_read_text_lossy() {
        let (_tmp, ops) = setup();
        let dir = root(&ops);
        fs::write(dir.join("bin"), [b'o', b'k', 0xff]).unwrap();
        assert_eq!(ops.read_text(&dir, "bin").unwrap(), "ok\u{fffd}");
    }

    #[test]
    fn test_write_text_to_directory() {
        let (_tmp, ops) = setup();
        let dir = root(&ops);
        fs::create_dir(dir.join("sub")).unwrap();
        assert!(matches!(
            ops.write_text(&dir, "sub", "x"),
            Err(FileOpError::NotAFile(_))
        ));
    }

    #[test]
    fn test_rename() {
        let (_tmp, ops) = setup();
        let dir = root(&ops);
        fs::write(dir.join("a.txt"), "a").unwrap();

        ops.rename(&dir, "a.txt", "b.txt").unwrap();

        let listing = ops.browser().list_directory(&dir).unwrap();
        assert!(listing.find("a.txt").is_none());
        assert!(listing.find("b.txt").is_some());
        assert_eq!(fs::read_to_string(dir.join("b.txt")).unwrap(), "a");
    }

    #[test]
    fn test_rename_missing() {
        let (_tmp, ops) = setup();
        let result = ops.rename(&root(&ops), "a.txt", "b.txt");
        assert!(matches!(result, Err(FileOpError::NotFound(_))));
    }

    #[test]
    fn test_rename_rejects_escape() {
        let (_tmp, ops) = setup();
        let dir = root(&ops);
        fs::write(dir.join("a.txt"), "a").unwrap();

        let result = ops.rename(&dir, "a.txt", "../a.txt");
        assert!(matches!(result, Err(FileOpError::Browser(_))));
        assert!(dir.join("a.txt").exists());
    }

    #[test]
    fn test_create_file_truncates() {
        let (_tmp, ops) = setup();
        let dir = root(&ops);

        ops.create_file(&dir, "new.txt").unwrap();
        assert_eq!(fs::metadata(dir.join("new.txt")).unwrap().len(), 0);

        fs::write(dir.join("new.txt"), "data").unwrap();
        ops.create_file(&dir, "new.txt").unwrap();
        assert_eq!(fs::metadata(dir.join("new.txt")).unwrap().len(), 0);
    }

    #[test]
    fn test_create_folder() {
        let (_tmp, ops) = setup();
        let dir = root(&ops);

        ops.create_folder(&dir, "assets").unwrap();
        assert!(dir.join("assets").is_dir());

        assert!(matches!(
            ops.create_folder(&dir, "assets"),
            Err(FileOpError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_remove_tree_counts() {
        let temp_dir = TempDir::new().unwrap();
        let tree = temp_dir.path().join("t");
        fs::create_dir_all(tree.join("x/y")).unwrap();
        fs::write(tree.join("x/y/z"), "").unwrap();

        let stats = remove_tree(&tree).unwrap();
        assert_eq!(stats, RemovalStats { files: 1, directories: 3 });
        assert!(!tree.exists());
    }
}
