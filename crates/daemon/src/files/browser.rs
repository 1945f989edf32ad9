//! Directory listing confined to the shared root.
//!
//! Every request path is interpreted relative to the root, normalized
//! lexically, then canonicalized so symlinks cannot lead outside it.

use std::cmp::Ordering;
use std::fs;
use std::path::{Component, Path, PathBuf};

use protocol::{format_size, EntryKind};
use thiserror::Error;
use tracing::debug;

use super::thumbnail::{Thumbnail, ThumbnailGenerator};

/// Errors that can occur during directory browsing.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// The requested path resolves outside the shared root.
    #[error("path is outside the shared root: {0}")]
    PathOutsideRoot(String),

    /// The requested path does not exist.
    #[error("path does not exist: {0}")]
    PathNotFound(PathBuf),

    /// The requested path is not a directory.
    #[error("path is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Permission denied.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One row of a directory listing.
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    /// Entry name (not full path).
    pub name: String,
    /// Full path on disk.
    pub path: PathBuf,
    /// File or directory.
    pub kind: EntryKind,
    /// Lower-cased extension including the dot, `"Folder"` for directories.
    pub type_label: String,
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// Human-readable size, `"-"` for directories.
    pub size_label: String,
    /// Path relative to the root, `/`-separated, without a leading slash.
    pub relative_path: String,
    /// Preview for image and video files.
    pub thumbnail: Option<Thumbnail>,
}

impl DirectoryEntry {
    /// Whether this entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }
}

/// Lists directories under a single shared root.
#[derive(Debug)]
pub struct DirectoryBrowser {
    /// Canonical shared root.
    root: PathBuf,
    /// Whether dot-files are listed.
    show_hidden: bool,
    /// Thumbnail source, `None` when previews are disabled.
    thumbnails: Option<ThumbnailGenerator>,
}

impl DirectoryBrowser {
    /// Create a browser for `root`, which must be an existing directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, BrowserError> {
        let root = root.as_ref();
        let canonical = canonicalize(root)?;
        if !canonical.is_dir() {
            return Err(BrowserError::NotADirectory(root.to_path_buf()));
        }

        Ok(Self {
            root: canonical,
            show_hidden: true,
            thumbnails: None,
        })
    }

    /// Set whether names starting with `.` are listed.
    pub fn show_hidden(mut self, show: bool) -> Self {
        self.show_hidden = show;
        self
    }

    /// Attach a thumbnail generator for media files.
    pub fn with_thumbnails(mut self, generator: ThumbnailGenerator) -> Self {
        self.thumbnails = Some(generator);
        self
    }

    /// The canonical shared root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a root-relative request path to a canonical path inside the root.
    ///
    /// An empty path (or `/`) is the root itself. `..` components that climb
    /// above the root are rejected before touching the filesystem.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, BrowserError> {
        let normalized = normalize(relative)?;
        let canonical = canonicalize(&self.root.join(&normalized))?;
        self.ensure_inside(canonical, relative)
    }

    /// Check that an already-canonical path lies inside the root.
    pub(crate) fn ensure_inside(
        &self,
        canonical: PathBuf,
        requested: &str,
    ) -> Result<PathBuf, BrowserError> {
        if canonical.starts_with(&self.root) {
            Ok(canonical)
        } else {
            Err(BrowserError::PathOutsideRoot(requested.to_string()))
        }
    }

    /// List the directory at `subpath`, keeping names containing `search`.
    ///
    /// The search is a case-insensitive substring match on the entry name;
    /// an empty search keeps everything. Directories come first, then
    /// entries are ordered by case-insensitive name.
    pub fn list(&self, subpath: &str, search: &str) -> Result<Vec<DirectoryEntry>, BrowserError> {
        let dir = self.resolve(subpath)?;
        if !dir.is_dir() {
            return Err(BrowserError::NotADirectory(dir));
        }

        let prefix = subpath.trim_matches('/');
        let needle = search.to_lowercase();
        let mut results = Vec::new();

        for entry_result in fs::read_dir(&dir)? {
            let entry = match entry_result {
                Ok(e) => e,
                Err(_) => continue,
            };

            let name = entry.file_name().to_string_lossy().to_string();
            if !self.show_hidden && name.starts_with('.') {
                continue;
            }
            if !needle.is_empty() && !name.to_lowercase().contains(&needle) {
                continue;
            }

            let path = entry.path();
            if let Err(e) = canonicalize(&path).and_then(|c| self.ensure_inside(c, &name)) {
                debug!("Skipping {}: {}", path.display(), e);
                continue;
            }

            // Follows symlinks, which were just checked to stay inside the root.
            let metadata = match fs::metadata(&path) {
                Ok(m) => m,
                Err(_) => continue,
            };

            let relative_path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{}/{}", prefix, name)
            };

            let row = if metadata.is_dir() {
                DirectoryEntry {
                    name,
                    path,
                    kind: EntryKind::Directory,
                    type_label: "Folder".to_string(),
                    size: 0,
                    size_label: "-".to_string(),
                    relative_path,
                    thumbnail: None,
                }
            } else {
                let thumbnail = self.thumbnails.as_ref().and_then(|g| g.generate(&path));
                DirectoryEntry {
                    type_label: extension_label(&name),
                    name,
                    path,
                    kind: EntryKind::File,
                    size: metadata.len(),
                    size_label: format_size(metadata.len()),
                    relative_path,
                    thumbnail,
                }
            };
            results.push(row);
        }

        results.sort_by(compare_entries);
        Ok(results)
    }
}

fn compare_entries(a: &DirectoryEntry, b: &DirectoryEntry) -> Ordering {
    b.is_dir()
        .cmp(&a.is_dir())
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.name.cmp(&b.name))
}

/// Lower-cased extension including the dot, or empty when there is none.
fn extension_label(name: &str) -> String {
    Path::new(name)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// Lexically normalize a request path, refusing to climb above the root.
fn normalize(relative: &str) -> Result<PathBuf, BrowserError> {
    let mut normalized = PathBuf::new();
    for component in Path::new(relative.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(BrowserError::PathOutsideRoot(relative.to_string()));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(BrowserError::PathOutsideRoot(relative.to_string()));
            }
        }
    }
    Ok(normalized)
}

fn canonicalize(path: &Path) -> Result<PathBuf, BrowserError> {
    fs::canonicalize(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => BrowserError::PathNotFound(path.to_path_buf()),
        std::io::ErrorKind::PermissionDenied => BrowserError::PermissionDenied(path.to_path_buf()),
        _ => BrowserError::Io(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    fn setup_test_dir() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();

        fs::write(base.join("a.txt"), "hello").unwrap();
        RgbImage::from_pixel(8, 8, Rgb([0, 0, 255]))
            .save(base.join("b.png"))
            .unwrap();
        fs::create_dir(base.join("sub")).unwrap();
        fs::write(base.join("sub").join("inner.TXT"), vec![0u8; 2048]).unwrap();
        fs::write(base.join(".hidden"), "secret").unwrap();

        temp_dir
    }

    fn names(entries: &[DirectoryEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_list_root() {
        let temp_dir = setup_test_dir();
        let browser = DirectoryBrowser::new(temp_dir.path()).unwrap();

        let entries = browser.list("", "").unwrap();
        assert_eq!(names(&entries), vec!["sub", ".hidden", "a.txt", "b.png"]);

        let a = entries.iter().find(|e| e.name == "a.txt").unwrap();
        assert_eq!(a.kind, EntryKind::File);
        assert_eq!(a.type_label, ".txt");
        assert_eq!(a.size, 5);
        assert_eq!(a.size_label, "5.00 B");
        assert_eq!(a.relative_path, "a.txt");

        let sub = entries.iter().find(|e| e.name == "sub").unwrap();
        assert!(sub.is_dir());
        assert_eq!(sub.type_label, "Folder");
        assert_eq!(sub.size_label, "-");

        let hidden = entries.iter().find(|e| e.name == ".hidden").unwrap();
        assert_eq!(hidden.type_label, "");
    }

    #[test]
    fn test_list_hides_dotfiles_when_configured() {
        let temp_dir = setup_test_dir();
        let browser = DirectoryBrowser::new(temp_dir.path())
            .unwrap()
            .show_hidden(false);

        let entries = browser.list("", "").unwrap();
        assert!(!names(&entries).contains(&".hidden"));
    }

    #[test]
    fn test_list_subdirectory_relative_paths() {
        let temp_dir = setup_test_dir();
        let browser = DirectoryBrowser::new(temp_dir.path()).unwrap();

        let entries = browser.list("sub", "").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].relative_path, "sub/inner.TXT");
        assert_eq!(entries[0].type_label, ".txt");
        assert_eq!(entries[0].size_label, "2.00 KB");

        // Leading and trailing slashes are tolerated.
        let entries = browser.list("/sub/", "").unwrap();
        assert_eq!(entries[0].relative_path, "sub/inner.TXT");
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let temp_dir = setup_test_dir();
        let browser = DirectoryBrowser::new(temp_dir.path()).unwrap();

        assert_eq!(names(&browser.list("", "b").unwrap()), vec!["sub", "b.png"]);
        assert_eq!(names(&browser.list("", "A.T").unwrap()), vec!["a.txt"]);
        assert!(browser.list("", "zzz").unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_image_lists_without_thumbnail() {
        let temp_dir = setup_test_dir();
        fs::write(temp_dir.path().join("broken.png"), b"not a png at all").unwrap();
        let browser = DirectoryBrowser::new(temp_dir.path())
            .unwrap()
            .with_thumbnails(ThumbnailGenerator::new(100).with_ffmpeg(None));

        let entries = browser.list("", "").unwrap();
        let broken = entries.iter().find(|e| e.name == "broken.png").unwrap();
        assert!(broken.thumbnail.is_none());
        assert_eq!(broken.type_label, ".png");

        let good = entries.iter().find(|e| e.name == "b.png").unwrap();
        assert!(good.thumbnail.is_some());
    }

    #[test]
    fn test_thumbnails_only_for_media() {
        let temp_dir = setup_test_dir();
        let browser = DirectoryBrowser::new(temp_dir.path())
            .unwrap()
            .with_thumbnails(ThumbnailGenerator::new(100).with_ffmpeg(None));

        let entries = browser.list("", "").unwrap();
        let png = entries.iter().find(|e| e.name == "b.png").unwrap();
        let txt = entries.iter().find(|e| e.name == "a.txt").unwrap();
        assert!(png.thumbnail.is_some());
        assert!(txt.thumbnail.is_none());
    }

    #[test]
    fn test_no_thumbnails_without_generator() {
        let temp_dir = setup_test_dir();
        let browser = DirectoryBrowser::new(temp_dir.path()).unwrap();

        let entries = browser.list("", "").unwrap();
        assert!(entries.iter().all(|e| e.thumbnail.is_none()));
    }

    #[test]
    fn test_missing_folder() {
        let temp_dir = setup_test_dir();
        let browser = DirectoryBrowser::new(temp_dir.path()).unwrap();

        assert!(matches!(
            browser.list("nope", ""),
            Err(BrowserError::PathNotFound(_))
        ));
    }

    #[test]
    fn test_listing_a_file_is_not_a_directory() {
        let temp_dir = setup_test_dir();
        let browser = DirectoryBrowser::new(temp_dir.path()).unwrap();

        assert!(matches!(
            browser.list("a.txt", ""),
            Err(BrowserError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_traversal_is_rejected() {
        let temp_dir = setup_test_dir();
        let browser = DirectoryBrowser::new(temp_dir.path()).unwrap();

        for path in ["..", "../etc", "sub/../../etc", "sub/../.."] {
            assert!(
                matches!(browser.resolve(path), Err(BrowserError::PathOutsideRoot(_))),
                "{} should be rejected",
                path
            );
        }
    }

    #[test]
    fn test_dotdot_inside_root_is_allowed() {
        let temp_dir = setup_test_dir();
        let browser = DirectoryBrowser::new(temp_dir.path()).unwrap();

        let resolved = browser.resolve("sub/../a.txt").unwrap();
        assert_eq!(resolved, browser.root().join("a.txt"));
        assert_eq!(browser.resolve("").unwrap(), browser.root());
    }

    #[test]
    fn test_new_requires_directory() {
        let temp_dir = setup_test_dir();
        assert!(matches!(
            DirectoryBrowser::new(temp_dir.path().join("a.txt")),
            Err(BrowserError::NotADirectory(_))
        ));
        assert!(matches!(
            DirectoryBrowser::new(temp_dir.path().join("missing")),
            Err(BrowserError::PathNotFound(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_outside_root_is_rejected() {
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("secret.txt"), "nope").unwrap();

        let temp_dir = setup_test_dir();
        std::os::unix::fs::symlink(outside.path(), temp_dir.path().join("escape")).unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("secret.txt"),
            temp_dir.path().join("secret-link.txt"),
        )
        .unwrap();

        let browser = DirectoryBrowser::new(temp_dir.path()).unwrap();

        assert!(matches!(
            browser.resolve("escape/secret.txt"),
            Err(BrowserError::PathOutsideRoot(_))
        ));
        assert!(matches!(
            browser.list("escape", ""),
            Err(BrowserError::PathOutsideRoot(_))
        ));

        let entries = browser.list("", "").unwrap();
        let listed = names(&entries);
        assert!(!listed.contains(&"escape"));
        assert!(!listed.contains(&"secret-link.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_inside_root_is_followed() {
        let temp_dir = setup_test_dir();
        std::os::unix::fs::symlink(temp_dir.path().join("sub"), temp_dir.path().join("alias"))
            .unwrap();

        let browser = DirectoryBrowser::new(temp_dir.path()).unwrap();
        let entries = browser.list("", "alias").unwrap();

        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_dir());
        assert_eq!(browser.list("alias", "").unwrap().len(), 1);
    }

    #[test]
    fn test_extension_label() {
        assert_eq!(extension_label("report.PDF"), ".pdf");
        assert_eq!(extension_label("archive.tar.gz"), ".gz");
        assert_eq!(extension_label("Makefile"), "");
        assert_eq!(extension_label(".bashrc"), "");
    }
}
