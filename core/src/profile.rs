//! The user's profile image, shared by every screen of a host application.
//!
//! # Design
//! `ProfileImageStore` is an ordinary value the host creates once and passes
//! to whatever needs it. Start-up is explicit: `new` builds an unready store,
//! `init` reads the persisted value, falls back to `DEFAULT_PROFILE_IMAGE`
//! and marks the store ready. Until then `image()` is `None`.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_PROFILE_IMAGE: &str = "/2221.png";

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("profile storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("profile storage is corrupt: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persists the profile image reference between runs.
pub trait ProfileStorage {
    fn load(&self) -> Result<Option<String>, ProfileError>;
    fn save(&self, image: &str) -> Result<(), ProfileError>;
}

/// Keeps the value in memory only.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    image: RefCell<Option<String>>,
}

impl MemoryStorage {
    pub fn with_image(image: impl Into<String>) -> Self {
        Self {
            image: RefCell::new(Some(image.into())),
        }
    }
}

impl ProfileStorage for MemoryStorage {
    fn load(&self) -> Result<Option<String>, ProfileError> {
        Ok(self.image.borrow().clone())
    }

    fn save(&self, image: &str) -> Result<(), ProfileError> {
        *self.image.borrow_mut() = Some(image.to_string());
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileDoc {
    profile_image: Option<String>,
}

/// Stores the value as a small JSON document on disk.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProfileStorage for FileStorage {
    fn load(&self) -> Result<Option<String>, ProfileError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)?;
        let doc: ProfileDoc = serde_json::from_str(&raw)?;
        Ok(doc.profile_image)
    }

    fn save(&self, image: &str) -> Result<(), ProfileError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let doc = ProfileDoc {
            profile_image: Some(image.to_string()),
        };
        fs::write(&self.path, serde_json::to_string_pretty(&doc)?)?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct ProfileImageStore<P> {
    storage: P,
    image: String,
    ready: bool,
}

impl<P: ProfileStorage> ProfileImageStore<P> {
    pub fn new(storage: P) -> Self {
        Self {
            storage,
            image: DEFAULT_PROFILE_IMAGE.to_string(),
            ready: false,
        }
    }

    /// `new` followed by `init`.
    pub fn open(storage: P) -> Self {
        let mut store = Self::new(storage);
        store.init();
        store
    }

    /// Read the persisted image, fall back to the default, mark ready.
    ///
    /// Unreadable storage is logged and treated as empty.
    pub fn init(&mut self) {
        let persisted = match self.storage.load() {
            Ok(image) => image,
            Err(err) => {
                warn!(error = %err, "could not read persisted profile image");
                None
            }
        };
        self.image = persisted
            .filter(|image| !image.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PROFILE_IMAGE.to_string());
        self.ready = true;
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn image(&self) -> Option<&str> {
        self.ready.then_some(self.image.as_str())
    }

    /// Persist `image` and make it current. The in-memory value only changes
    /// once the write succeeded.
    pub fn set_image(&mut self, image: impl Into<String>) -> Result<(), ProfileError> {
        let image = image.into();
        self.storage.save(&image)?;
        self.image = image;
        self.ready = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_ready_until_initialised() {
        let mut store = ProfileImageStore::new(MemoryStorage::with_image("/me.png"));
        assert!(!store.is_ready());
        assert_eq!(store.image(), None);
        store.init();
        assert!(store.is_ready());
        assert_eq!(store.image(), Some("/me.png"));
    }

    #[test]
    fn falls_back_to_default_when_nothing_persisted() {
        let store = ProfileImageStore::open(MemoryStorage::default());
        assert_eq!(store.image(), Some(DEFAULT_PROFILE_IMAGE));

        let store = ProfileImageStore::open(MemoryStorage::with_image(""));
        assert_eq!(store.image(), Some(DEFAULT_PROFILE_IMAGE));
    }

    #[test]
    fn set_image_persists() {
        let mut store = ProfileImageStore::open(MemoryStorage::default());
        store.set_image("https://cdn.test/u/1.jpg").unwrap();
        assert_eq!(store.image(), Some("https://cdn.test/u/1.jpg"));
        assert_eq!(
            store.storage.load().unwrap().as_deref(),
            Some("https://cdn.test/u/1.jpg")
        );
    }

    #[test]
    fn file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("profile.json");

        let mut store = ProfileImageStore::open(FileStorage::new(&path));
        assert_eq!(store.image(), Some(DEFAULT_PROFILE_IMAGE));
        store.set_image("/uploads/avatar.png").unwrap();

        let reopened = ProfileImageStore::open(FileStorage::new(&path));
        assert_eq!(reopened.image(), Some("/uploads/avatar.png"));
    }

    #[test]
    fn corrupt_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        fs::write(&path, "{not json").unwrap();

        let storage = FileStorage::new(&path);
        assert!(matches!(storage.load(), Err(ProfileError::Json(_))));
        let store = ProfileImageStore::open(storage);
        assert_eq!(store.image(), Some(DEFAULT_PROFILE_IMAGE));
    }
}
