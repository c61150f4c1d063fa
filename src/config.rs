// Where the wardrobe keeps its database and photos
use std::path::{Path, PathBuf};

use crate::state::StorageError;

/// Overrides the data directory when set
pub const DATA_DIR_ENV: &str = "WARDROBE_DATA_DIR";

const APP_DIR_NAME: &str = "com.wardrobe.app";
const DB_FILE_NAME: &str = "wardrobe.db";
const IMAGE_DIR_NAME: &str = "wardrobe";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    data_dir: PathBuf,
}

impl AppConfig {
    /// Resolve the data directory from `WARDROBE_DATA_DIR`, falling back to
    /// the platform data directory:
    /// - Linux: ~/.local/share/com.wardrobe.app
    /// - macOS: ~/Library/Application Support/com.wardrobe.app
    /// - Windows: %APPDATA%\com.wardrobe.app
    pub fn from_env() -> Result<Self, StorageError> {
        if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::with_data_dir(dir));
        }

        let data_dir = dirs::data_dir().ok_or(StorageError::NoAppDataDir)?;
        Ok(Self::with_data_dir(data_dir.join(APP_DIR_NAME)))
    }

    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }

    pub fn image_dir(&self) -> PathBuf {
        self.data_dir.join(IMAGE_DIR_NAME)
    }
}
