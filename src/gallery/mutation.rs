use super::{
    Gallery, GalleryError, is_valid_section_name,
    sidecar::{read_captions, sidecar_exists, write_captions},
};
use std::{
    fs, io,
    path::{Component, Path, PathBuf},
};
use tracing::{debug, info};

impl Gallery {
    /// Turn a caller handle (`section/date/filename`) back into a path under
    /// the storage root.
    pub fn resolve_handle(&self, handle: &str) -> Result<PathBuf, GalleryError> {
        let invalid = || GalleryError::InvalidHandle(handle.to_string());

        let segments: Vec<&str> = handle.trim_matches('/').split('/').collect();
        if segments.len() < 2 {
            return Err(invalid());
        }
        if !is_valid_section_name(segments[0]) {
            return Err(invalid());
        }
        if segments
            .iter()
            .any(|s| s.is_empty() || *s == "." || *s == ".." || s.contains('\\'))
        {
            return Err(invalid());
        }

        let file_name = segments[segments.len() - 1];
        if file_name.starts_with('_') || file_name.starts_with('.') {
            return Err(invalid());
        }

        Ok(segments
            .iter()
            .fold(self.config.root.clone(), |path, segment| path.join(segment)))
    }

    fn section_of(&self, path: &Path) -> Result<String, GalleryError> {
        let invalid = || GalleryError::InvalidHandle(path.display().to_string());

        let relative = path.strip_prefix(&self.config.root).map_err(|_| invalid())?;
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(invalid());
        }

        let section = relative
            .components()
            .next()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .ok_or_else(invalid)?;
        if !is_valid_section_name(&section) || relative.components().count() < 2 {
            return Err(invalid());
        }
        Ok(section)
    }

    /// Remove one image and its caption. Deleting something already gone is
    /// not an error.
    pub fn delete(&self, image_path: &Path) -> Result<(), GalleryError> {
        let section = self.section_of(image_path)?;
        self.with_section_lock(&section, || remove_image(image_path))
    }

    pub fn delete_by_handle(&self, handle: &str) -> Result<(), GalleryError> {
        let path = self.resolve_handle(handle)?;
        self.delete(&path)
    }

    /// Set or clear (empty string) the caption of an existing image.
    pub fn set_caption(&self, handle: &str, caption: &str) -> Result<(), GalleryError> {
        let path = self.resolve_handle(handle)?;
        let section = self.section_of(&path)?;
        self.with_section_lock(&section, || write_caption(&path, handle, caption))
    }
}

fn remove_image(image_path: &Path) -> Result<(), GalleryError> {
    match fs::remove_file(image_path) {
        Ok(()) => info!("Deleted image {:?}", image_path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("Image {:?} already gone", image_path);
        }
        Err(e) => return Err(e.into()),
    }

    if let (Some(dir), Some(file_name)) = (image_path.parent(), image_path.file_name())
        && sidecar_exists(dir)
    {
        let file_name = file_name.to_string_lossy();
        let mut captions = read_captions(dir);
        if captions.remove(file_name.as_ref()).is_some() {
            write_captions(dir, &captions)?;
            debug!("Removed caption for {}", file_name);
        }
    }

    Ok(())
}

fn write_caption(path: &Path, handle: &str, caption: &str) -> Result<(), GalleryError> {
    if !path.is_file() {
        return Err(GalleryError::NotFound);
    }

    let (Some(dir), Some(file_name)) = (path.parent(), path.file_name()) else {
        return Err(GalleryError::InvalidHandle(handle.to_string()));
    };
    let file_name = file_name.to_string_lossy().to_string();

    let mut captions = read_captions(dir);
    let caption = caption.trim();
    if caption.is_empty() {
        if captions.remove(&file_name).is_none() {
            return Ok(());
        }
    } else {
        captions.insert(file_name, caption.to_string());
    }

    Ok(write_captions(dir, &captions)?)
}
