use crate::atomic_file::write_json_atomic;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

/// Per-directory caption file. The leading underscore keeps it out of image
/// walks.
pub const SIDECAR_FILE_NAME: &str = "_metadata.json";

pub(crate) type Captions = BTreeMap<String, String>;

/// Missing or unreadable sidecars read as empty.
pub(crate) fn read_captions(dir: &Path) -> Captions {
    let path = dir.join(SIDECAR_FILE_NAME);
    let json = match std::fs::read_to_string(&path) {
        Ok(json) => json,
        Err(_) => return Captions::new(),
    };

    match serde_json::from_str(&json) {
        Ok(captions) => captions,
        Err(e) => {
            warn!("Ignoring malformed caption sidecar {:?}: {}", path, e);
            Captions::new()
        }
    }
}

pub(crate) fn write_captions(dir: &Path, captions: &Captions) -> std::io::Result<()> {
    write_json_atomic(&dir.join(SIDECAR_FILE_NAME), captions)
}

pub(crate) fn sidecar_exists(dir: &Path) -> bool {
    dir.join(SIDECAR_FILE_NAME).is_file()
}
