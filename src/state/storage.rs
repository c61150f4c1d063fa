// File system operations for storing clothing photos
use sha2::{Digest, Sha256};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to get app data directory")]
    NoAppDataDir,
    #[error("Failed to persist image {path}: {reason}")]
    ImagePersist { path: String, reason: String },
}

impl StorageError {
    fn persist(path: &Path, reason: impl ToString) -> Self {
        StorageError::ImagePersist {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Owns the directory that holds copied clothing photos.
///
/// Every item record points at a file inside this directory (or at a remote
/// URL for sample data). Files outside the directory are never touched.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the image directory if it is missing
    pub async fn ensure_dir(&self) -> StorageResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Copy `source` into the image directory as `filename` and return the new path.
    ///
    /// The copy is verified against the source digest before the path is
    /// handed back, so callers can insert a record referencing it. The source
    /// is only read. An existing file named `filename` is an error and is
    /// left untouched; otherwise a partial destination is removed on failure.
    pub async fn save(&self, source: &Path, filename: &str) -> StorageResult<PathBuf> {
        if !is_plain_filename(filename) {
            return Err(StorageError::persist(
                &self.dir.join(filename),
                "filename must be a single path component",
            ));
        }

        self.ensure_dir()
            .await
            .map_err(|e| StorageError::persist(&self.dir, e))?;

        let source_bytes = tokio::fs::read(source)
            .await
            .map_err(|e| StorageError::persist(source, e))?;

        let dest = self.dir.join(filename);
        if dest.as_path() == source {
            return Err(StorageError::persist(&dest, "source is already the destination"));
        }

        // Never replace an existing photo; only a file this call created may be discarded
        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&dest)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(StorageError::persist(&dest, "a file with this name already exists"));
            }
            Err(e) => return Err(StorageError::persist(&dest, e)),
        };

        let written = match file.write_all(&source_bytes).await {
            Ok(()) => file.sync_all().await,
            Err(e) => Err(e),
        };
        drop(file);
        if let Err(e) = written {
            discard_partial(&dest).await;
            return Err(StorageError::persist(&dest, e));
        }

        let expected = calculate_sha256(&source_bytes);
        let written = match tokio::fs::read(&dest).await {
            Ok(bytes) => calculate_sha256(&bytes),
            Err(e) => {
                discard_partial(&dest).await;
                return Err(StorageError::persist(&dest, e));
            }
        };
        if written != expected {
            discard_partial(&dest).await;
            return Err(StorageError::persist(&dest, "checksum mismatch after copy"));
        }

        log::debug!(
            "Stored image {} ({} bytes, sha256 {})",
            dest.display(),
            source_bytes.len(),
            expected
        );

        Ok(dest)
    }

    /// Delete a stored image. Missing files and paths outside the image
    /// directory are left alone. Returns whether a file was deleted.
    pub async fn remove(&self, path: &Path) -> StorageResult<bool> {
        if !self.owns(path) {
            log::debug!("Skipping image outside store: {}", path.display());
            return Ok(false);
        }

        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                log::debug!("Removed image {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether `path` names a file directly inside the image directory
    pub fn owns(&self, path: &Path) -> bool {
        match (path.parent(), path.file_name()) {
            (Some(parent), Some(name)) => {
                parent == self.dir.as_path() && is_plain_filename(&name.to_string_lossy())
            }
            _ => false,
        }
    }
}

/// Name under which the photo for item `id` is stored: `<id>.<ext>`, keeping
/// the source extension (lowercased) and falling back to `jpg`.
pub fn image_filename(id: &str, source: &Path) -> String {
    let ext = source
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "jpg".to_string());
    format!("{}.{}", id, ext)
}

/// Calculate SHA256 hash of data
pub fn calculate_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn is_plain_filename(filename: &str) -> bool {
    let mut components = Path::new(filename).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

async fn discard_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("Failed to clean up partial image {}: {}", path.display(), e);
        }
    }
}
