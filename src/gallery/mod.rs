// Gallery module - file-backed section and image store
mod error;
mod handlers;
mod ingest;
mod listing;
mod mutation;
mod sanitize;
mod sections;
mod sidecar;
mod types;


// Re-export public items
pub use error::GalleryError;
pub use handlers::{
    create_section_handler, delete_image_handler, delete_section_handler, featured_handler,
    hero_handler, image_handler, list_images_handler, list_sections_handler,
    set_caption_handler, upload_handler,
};
pub use sanitize::{is_valid_section_name, sanitize};
pub use sidecar::SIDECAR_FILE_NAME;
pub use types::*;

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

pub const ALLOWED_EXTENSIONS: [&str; 4] = [".png", ".jpg", ".jpeg", ".webp"];

pub type SharedGallery = Arc<Gallery>;

pub struct Gallery {
    pub(crate) config: crate::StorageConfig,
    section_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Gallery {
    pub fn new(config: crate::StorageConfig) -> Self {
        Self {
            config,
            section_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    pub fn default_section(&self) -> &str {
        &self.config.default_section
    }

    /// Stored images only: reserved `_` and `.` names are skipped.
    pub(crate) fn is_image(&self, file_name: &str) -> bool {
        !file_name.starts_with('_')
            && !file_name.starts_with('.')
            && has_allowed_extension(file_name)
    }

    /// Join a caller-supplied section name onto the root, refusing anything
    /// that sanitizing would change.
    pub(crate) fn section_path(&self, section: &str) -> Result<PathBuf, GalleryError> {
        if !is_valid_section_name(section) {
            return Err(GalleryError::InvalidSectionName(section.to_string()));
        }
        Ok(self.config.root.join(section))
    }

    /// Run `op` while holding the section's mutex. Serializes create/delete
    /// and sidecar updates within one section. The entry is dropped again once
    /// nobody holds it and the section directory does not exist.
    pub(crate) fn with_section_lock<T>(&self, section: &str, op: impl FnOnce() -> T) -> T {
        let lock = self.section_lock(section);
        let result = {
            let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            op()
        };
        drop(lock);

        if !self.config.root.join(section).is_dir() {
            let mut locks = self
                .section_locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if locks
                .get(section)
                .is_some_and(|lock| Arc::strong_count(lock) == 1)
            {
                locks.remove(section);
            }
        }

        result
    }

    fn section_lock(&self, section: &str) -> Arc<Mutex<()>> {
        let mut locks = self
            .section_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks
            .entry(section.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Extension filter for incoming uploads; any name is fine otherwise.
pub(crate) fn has_allowed_extension(file_name: &str) -> bool {
    let lower = file_name.to_lowercase();
    ALLOWED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}
