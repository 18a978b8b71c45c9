use super::{
    DeleteReport, Gallery, GalleryError, SectionSummary, is_valid_section_name, sanitize,
};
use std::{fs, path::Path};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

impl Gallery {
    /// Ensure the storage root and the default section exist. Safe to call on
    /// every start.
    pub fn initialize(&self) -> Result<(), GalleryError> {
        fs::create_dir_all(&self.config.root)?;

        let default_path = self.section_path(&self.config.default_section)?;
        if !default_path.is_dir() {
            fs::create_dir_all(&default_path)?;
            info!("Created default section '{}'", self.config.default_section);
        }

        Ok(())
    }

    pub fn list_sections(&self) -> Vec<String> {
        let entries = match fs::read_dir(&self.config.root) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Storage root {:?} not readable: {}", self.config.root, e);
                return Vec::new();
            }
        };

        let mut sections: Vec<String> = entries
            .flatten()
            .filter(|entry| entry.path().is_dir())
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .filter(|name| is_valid_section_name(name))
            .collect();
        sections.sort();
        sections
    }

    pub fn section_summaries(&self) -> Vec<SectionSummary> {
        self.list_sections()
            .into_iter()
            .map(|name| {
                let image_count = self.count_images(&name);
                SectionSummary { name, image_count }
            })
            .collect()
    }

    /// Create a section from raw user input. Returns `false` when the name
    /// sanitizes to nothing or the directory already exists.
    pub fn create_section(&self, raw_name: &str) -> bool {
        self.try_create_section(raw_name).is_ok()
    }

    /// Like [`Gallery::create_section`] but reports why creation was refused.
    /// Two raw names that sanitize to the same directory are treated as a
    /// collision, not as aliases.
    pub fn try_create_section(&self, raw_name: &str) -> Result<String, GalleryError> {
        let clean_name = sanitize(raw_name);
        if clean_name.is_empty() {
            return Err(GalleryError::InvalidSectionName(raw_name.to_string()));
        }

        let path = self.config.root.join(&clean_name);
        self.with_section_lock(&clean_name, || {
            if path.exists() {
                debug!(
                    "Refusing to create section {:?}: '{}' already exists",
                    raw_name, clean_name
                );
                return Err(GalleryError::SectionExists(clean_name.clone()));
            }

            fs::create_dir_all(&path)?;
            info!("Created section '{}'", clean_name);
            Ok(())
        })?;
        Ok(clean_name)
    }

    /// Remove a section and everything under it, continuing past individual
    /// failures.
    pub fn delete_section(&self, name: &str) -> Result<DeleteReport, GalleryError> {
        let section_path = self.section_path(name)?;
        Ok(self.with_section_lock(name, || remove_section_tree(name, &section_path)))
    }
}

fn remove_section_tree(name: &str, section_path: &Path) -> DeleteReport {
    let mut report = DeleteReport::default();
    if !section_path.exists() {
        return report;
    }

    for entry in WalkDir::new(section_path).contents_first(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Failed to walk section '{}': {}", name, e);
                report.dirs_failed += 1;
                continue;
            }
        };

        if entry.file_type().is_dir() {
            match fs::remove_dir(entry.path()) {
                Ok(()) => report.dirs_removed += 1,
                Err(e) => {
                    warn!("Failed to remove directory {:?}: {}", entry.path(), e);
                    report.dirs_failed += 1;
                }
            }
        } else {
            match fs::remove_file(entry.path()) {
                Ok(()) => report.files_removed += 1,
                Err(e) => {
                    warn!("Failed to remove file {:?}: {}", entry.path(), e);
                    report.files_failed += 1;
                }
            }
        }
    }

    if report.is_complete() {
        info!(
            "Deleted section '{}' ({} files, {} directories)",
            name, report.files_removed, report.dirs_removed
        );
    } else {
        warn!(
            "Section '{}' partially deleted: {} files and {} directories could not be removed",
            name, report.files_failed, report.dirs_failed
        );
    }

    report
}
