//! Local filesystem storage for accepted uploads.
//!
//! Every upload lands directly inside a single directory, named by the client-supplied filename.
//! The directory is created on first use. Existing files with the same name are truncated and
//! overwritten; concurrent uploads of the same name are not coordinated.

use std::path::{Component, Path, PathBuf};

use tokio::fs::{self, File};
use tracing::{debug, instrument};

use crate::config::UploadsConfig;
use crate::errors::{Error, INVALID_FILE_NAME, Result};

/// Permissions for a newly created upload directory
#[cfg(unix)]
const DIR_MODE: u32 = 0o755;

/// A path inside the upload directory that a file may be written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination(PathBuf);

impl Destination {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct UploadStorage {
    root: PathBuf,
    sanitize_filenames: bool,
}

impl UploadStorage {
    pub fn new(config: &UploadsConfig) -> Self {
        Self {
            root: config.dir.clone(),
            sanitize_filenames: config.sanitize_filenames,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a client-supplied filename to its destination.
    ///
    /// With sanitizing enabled, names that are empty, refer to `.`/`..`, or contain a path
    /// separator, NUL byte or root are refused. Otherwise the name is joined onto the root
    /// unmodified: no basename stripping, so separators and `..` components are honored.
    pub fn resolve(&self, file_name: &str) -> Result<Destination> {
        if self.sanitize_filenames && !is_plain_file_name(file_name) {
            return Err(Error::bad_request(INVALID_FILE_NAME));
        }
        Ok(Destination(self.root.join(file_name)))
    }

    /// Create the upload directory and any missing parents.
    pub async fn ensure_root(&self) -> Result<()> {
        if fs::metadata(&self.root).await.is_ok_and(|m| m.is_dir()) {
            return Ok(());
        }

        debug!(dir = %self.root.display(), "Creating upload directory");
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(DIR_MODE);
        builder
            .create(&self.root)
            .await
            .map_err(|e| Error::storage(format!("create upload directory {}", self.root.display()), e))
    }

    /// Open `destination` for writing, creating the upload directory first if needed.
    ///
    /// An existing file is truncated. The returned handle is positioned at offset zero.
    #[instrument(skip(self), fields(path = %destination.path().display()))]
    pub async fn open(&self, destination: &Destination) -> Result<File> {
        self.ensure_root().await?;
        File::create(destination.path())
            .await
            .map_err(|e| Error::storage(format!("create {}", destination.path().display()), e))
    }
}

/// A single normal path component with no separators of either platform
fn is_plain_file_name(name: &str) -> bool {
    if name.is_empty() || name.contains(['/', '\\', '\0']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!((components.next(), components.next()), (Some(Component::Normal(_)), None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::AsyncWriteExt;

    fn storage(root: &Path, sanitize_filenames: bool) -> UploadStorage {
        UploadStorage::new(&UploadsConfig {
            dir: root.to_path_buf(),
            sanitize_filenames,
            ..Default::default()
        })
    }

    #[test]
    fn test_plain_names_resolve_inside_root() {
        let storage = storage(Path::new("uploads"), true);
        let dest = storage.resolve("cat.png").unwrap();
        assert_eq!(dest.path(), Path::new("uploads/cat.png"));

        let dest = storage.resolve("archive.tar.gz").unwrap();
        assert_eq!(dest.path(), Path::new("uploads/archive.tar.gz"));
    }

    #[test]
    fn test_unsafe_names_rejected_when_sanitizing() {
        let storage = storage(Path::new("uploads"), true);
        for name in ["", ".", "..", "../escape.png", "a/b.png", "a\\b.png", "/etc/passwd", "nul\0.png"] {
            let err = storage.resolve(name).unwrap_err();
            assert_eq!(err.user_message(), INVALID_FILE_NAME, "name {name:?} should be rejected");
        }
    }

    #[test]
    fn test_names_joined_verbatim_without_sanitizing() {
        let storage = storage(Path::new("uploads"), false);
        let dest = storage.resolve("../escape.png").unwrap();
        assert_eq!(dest.path(), Path::new("uploads/../escape.png"));
    }

    #[tokio::test]
    async fn test_open_creates_missing_directory() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("nested").join("uploads");
        let storage = storage(&root, true);

        let dest = storage.resolve("a.png").unwrap();
        let mut file = storage.open(&dest).await.unwrap();
        file.write_all(b"data").await.unwrap();
        file.flush().await.unwrap();

        assert!(root.is_dir());
        assert_eq!(std::fs::read(root.join("a.png")).unwrap(), b"data");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_created_directory_mode() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("uploads");
        storage(&root, true).ensure_root().await.unwrap();

        // The process umask can only clear bits
        let mode = std::fs::metadata(&root).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode & !DIR_MODE, 0);
        assert_ne!(mode & 0o700, 0);
    }

    #[tokio::test]
    async fn test_open_truncates_existing_file() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(tmp.path(), true);
        std::fs::write(tmp.path().join("a.png"), b"a much longer previous body").unwrap();

        let dest = storage.resolve("a.png").unwrap();
        let mut file = storage.open(&dest).await.unwrap();
        file.write_all(b"new").await.unwrap();
        file.flush().await.unwrap();

        assert_eq!(std::fs::read(tmp.path().join("a.png")).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_open_fails_when_root_is_a_file() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("uploads");
        std::fs::write(&root, b"not a directory").unwrap();
        let storage = storage(&root, true);

        let dest = storage.resolve("a.png").unwrap();
        let err = storage.open(&dest).await.unwrap_err();
        assert_eq!(err.user_message(), "Error saving the file");
    }
}
