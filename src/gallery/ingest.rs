use super::{Gallery, GalleryError, ImageRecord, sidecar::Captions};
use chrono::{Local, NaiveDateTime};
use rand::{Rng, distr::Alphanumeric};
use std::{
    fs::{self, File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

const MAX_NAME_ATTEMPTS: usize = 8;

/// Browsers may send a full client-side path; only the final component is
/// kept.
pub(crate) fn clean_original_filename(raw: &str) -> Result<String, GalleryError> {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or("").trim();
    if name.is_empty() || name.chars().all(|c| c == '.') {
        return Err(GalleryError::InvalidFilename(raw.to_string()));
    }
    Ok(name.to_string())
}

fn random_suffix() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect::<String>()
        .to_lowercase()
}

/// `name.jpg` -> `name-<suffix>.jpg`
fn with_suffix(file_name: &str, suffix: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}-{}.{}", stem, suffix, ext),
        _ => format!("{}-{}", file_name, suffix),
    }
}

/// Create the destination without ever clobbering an existing image.
fn create_unique(dir: &Path, base_name: &str) -> Result<(PathBuf, File), GalleryError> {
    let mut candidate = base_name.to_string();

    for _ in 0..MAX_NAME_ATTEMPTS {
        let path = dir.join(&candidate);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                debug!("{:?} already exists, retrying with a suffix", path);
                candidate = with_suffix(base_name, &random_suffix());
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(GalleryError::IoError(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("could not find a free name for {}", base_name),
    )))
}

impl Gallery {
    /// Store an uploaded image under today's date partition.
    pub fn save(
        &self,
        section: &str,
        bytes: &[u8],
        original_filename: &str,
    ) -> Result<ImageRecord, GalleryError> {
        self.save_at(section, bytes, original_filename, Local::now().naive_local())
    }

    pub fn save_at(
        &self,
        section: &str,
        bytes: &[u8],
        original_filename: &str,
        at: NaiveDateTime,
    ) -> Result<ImageRecord, GalleryError> {
        let section_path = self.section_path(section)?;
        let original = clean_original_filename(original_filename)?;

        let date_partition = at.format("%Y-%m-%d").to_string();
        let time_prefix = at.format("%H-%M-%S").to_string();

        let base_name = format!("{}_{}", time_prefix, original);
        let path = self.with_section_lock(section, || -> Result<PathBuf, GalleryError> {
            let date_path = section_path.join(&date_partition);
            fs::create_dir_all(&date_path)?;

            let (path, mut file) = create_unique(&date_path, &base_name)?;

            if let Err(e) = file.write_all(bytes).and_then(|_| file.sync_all()) {
                warn!("Failed to write {:?}: {}", path, e);
                drop(file);
                let _ = fs::remove_file(&path);
                return Err(e.into());
            }
            Ok(path)
        })?;

        info!(
            "Stored {} bytes as {:?} in section '{}'",
            bytes.len(),
            path.file_name().unwrap_or_default(),
            section
        );

        self.record_from_path(section, &path, &Captions::new())
            .ok_or(GalleryError::InvalidFilename(original))
    }
}
