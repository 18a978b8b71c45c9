use super::{
    FeaturedImage, Gallery, ImageRecord,
    sidecar::{Captions, read_captions},
};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};
use tracing::debug;
use walkdir::WalkDir;

/// The part of a stored filename before the first underscore.
pub(crate) fn time_prefix(filename: &str) -> &str {
    filename.split('_').next().unwrap_or(filename)
}

pub(crate) fn parse_timestamp(date: &str, time_prefix: &str) -> Option<NaiveDateTime> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    let time = NaiveTime::parse_from_str(time_prefix, "%H-%M-%S").ok()?;
    Some(date.and_time(time))
}

pub(crate) fn image_url(handle: &str) -> String {
    let encoded: Vec<String> = handle
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    format!("/api/images/{}", encoded.join("/"))
}

impl Gallery {
    /// All images in a section, newest first. Unknown or invalid sections list
    /// as empty.
    pub fn list_images(&self, section: &str) -> Vec<ImageRecord> {
        let section_path = match self.section_path(section) {
            Ok(path) => path,
            Err(_) => return Vec::new(),
        };

        if !section_path.is_dir() {
            return Vec::new();
        }

        let mut captions_by_dir: HashMap<PathBuf, Captions> = HashMap::new();
        let mut images = Vec::new();

        for entry in WalkDir::new(&section_path).min_depth(1).into_iter().flatten() {
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(file_name) = entry.file_name().to_str() else {
                continue;
            };
            if !self.is_image(file_name) {
                continue;
            }

            let dir = entry
                .path()
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| section_path.clone());
            let captions = captions_by_dir
                .entry(dir.clone())
                .or_insert_with(|| read_captions(&dir));

            if let Some(record) = self.record_from_path(section, entry.path(), captions) {
                images.push(record);
            }
        }

        sort_newest_first(&mut images);

        debug!("Listed {} images in section '{}'", images.len(), section);
        images
    }

    pub(crate) fn record_from_path(
        &self,
        section: &str,
        path: &Path,
        captions: &Captions,
    ) -> Option<ImageRecord> {
        let filename = path.file_name()?.to_str()?.to_string();
        let relative = path.strip_prefix(&self.config.root).ok()?;
        let handle = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect::<Vec<_>>()
            .join("/");

        let date = path
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "Unknown".to_string());
        let raw_time = time_prefix(&filename).to_string();

        let metadata = std::fs::metadata(path).ok();
        let timestamp = parse_timestamp(&date, &raw_time).or_else(|| {
            metadata
                .as_ref()
                .and_then(|m| m.modified().ok())
                .map(|modified| DateTime::<Local>::from(modified).naive_local())
        });

        Some(ImageRecord {
            path: path.to_path_buf(),
            url: image_url(&handle),
            handle,
            section: section.to_string(),
            time: raw_time.replace('-', ":"),
            sort_key: format!("{}{}", date, raw_time),
            date,
            timestamp,
            size: metadata.map(|m| m.len()).unwrap_or(0),
            caption: captions.get(&filename).cloned(),
            filename,
        })
    }

    pub(crate) fn count_images(&self, section: &str) -> usize {
        let Ok(section_path) = self.section_path(section) else {
            return 0;
        };

        WalkDir::new(section_path)
            .min_depth(1)
            .into_iter()
            .flatten()
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| entry.file_name().to_str().is_some_and(|n| self.is_image(n)))
            .count()
    }

    /// Newest image of the default section.
    pub fn hero(&self) -> Option<ImageRecord> {
        self.list_images(&self.config.default_section)
            .into_iter()
            .next()
    }

    /// Newest image of each section, in section order.
    pub fn featured(&self, limit: usize) -> Vec<FeaturedImage> {
        let mut featured = Vec::new();

        for section in self.list_sections() {
            if featured.len() >= limit {
                break;
            }
            if let Some(image) = self.list_images(&section).into_iter().next() {
                featured.push(FeaturedImage { section, image });
            }
        }

        featured
    }
}

/// Structured timestamp first; the legacy string key only breaks ties.
/// Records without any timestamp sort last.
pub(crate) fn sort_newest_first(images: &mut [ImageRecord]) {
    images.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| b.sort_key.cmp(&a.sort_key))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_prefix_and_timestamp() {
        assert_eq!(time_prefix("09-05-01_render.png"), "09-05-01");
        assert_eq!(time_prefix("no-underscore.png"), "no-underscore.png");

        let ts = parse_timestamp("2024-01-02", "08-00-00").unwrap();
        assert_eq!(ts.to_string(), "2024-01-02 08:00:00");
        assert!(parse_timestamp("Selected Works", "08-00-00").is_none());
        assert!(parse_timestamp("2024-01-02", "render.png").is_none());
    }

    #[test]
    fn test_image_url_encodes_segments() {
        assert_eq!(
            image_url("Selected Works/2024-01-01/09-00-00_a b.jpg"),
            "/api/images/Selected%20Works/2024-01-01/09-00-00_a%20b.jpg"
        );
    }
}
