//! Persisted per-folder watermarks.
//!
//! The control file lists the folders to watch and, for each, the newest
//! modification time already copied. The batch driver reads it before
//! planning and writes it back once a batch has moved a watermark.

use crate::error::EngineError;
use crate::model::{Watermarks, WorkItem};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

/// Reads and writes the watermark mapping.
pub trait ControlStore {
    fn read(&self, path: &Path) -> Result<Watermarks, EngineError>;

    fn write(&self, path: &Path, watermarks: &Watermarks) -> Result<(), EngineError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ControlFile {
    #[serde(default)]
    folders: Watermarks,
}

/// Control file stored as JSON: `{"folders": {"<folder>": "<RFC 3339>"}}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonControlStore;

impl ControlStore for JsonControlStore {
    fn read(&self, path: &Path) -> Result<Watermarks, EngineError> {
        let text = fs::read_to_string(path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                EngineError::ControlFileNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                EngineError::ControlFileInvalid {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                }
            }
        })?;

        let file: ControlFile =
            serde_json::from_str(&text).map_err(|e| EngineError::ControlFileInvalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        Ok(file.folders)
    }

    fn write(&self, path: &Path, watermarks: &Watermarks) -> Result<(), EngineError> {
        let file = ControlFile {
            folders: watermarks.clone(),
        };
        let text = serde_json::to_string_pretty(&file).map_err(|e| EngineError::ControlFileWrite {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidData, e),
        })?;
        fs::write(path, text).map_err(|e| EngineError::ControlFileWrite {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Move the item's folder watermark up to the item's modification time.
///
/// Items outside any folder are ignored. Returns true if the mapping changed.
pub fn advance_watermark(watermarks: &mut Watermarks, item: &WorkItem) -> bool {
    let Some(folder) = item.folder() else {
        return false;
    };
    let modified = DateTime::<Utc>::from(item.modified);

    match watermarks.get_mut(folder) {
        Some(current) if *current >= modified => false,
        Some(current) => {
            *current = modified;
            true
        }
        None => {
            watermarks.insert(folder.to_string(), modified);
            true
        }
    }
}

/// Pull a folder watermark back so that anything modified at `failed_at`
/// is listed again by the next scan.
///
/// Returns true if the mapping changed.
pub fn hold_watermark_before(watermarks: &mut Watermarks, folder: &str, failed_at: DateTime<Utc>) -> bool {
    let limit = failed_at - Duration::nanoseconds(1);
    match watermarks.get_mut(folder) {
        Some(current) if *current > limit => {
            *current = limit;
            true
        }
        _ => false,
    }
}
