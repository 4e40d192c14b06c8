//! Worklist construction.
//!
//! Decides which source files still need copying. The copy engine never
//! calls into this module; the batch driver asks a `WorklistProvider` for
//! the ordered list and feeds it to the engine one file at a time.

use crate::error::EngineError;
use crate::model::{Watermarks, WorkItem};
use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Produces the ordered list of files to copy.
pub trait WorklistProvider {
    /// Return pending items sorted ascending by relative path.
    ///
    /// Only folders named in `watermarks` are considered.
    fn worklist(&self, watermarks: &Watermarks) -> Result<Vec<WorkItem>, EngineError>;
}

/// Scans one level of each watermarked folder under the source root.
///
/// A file is pending when its extension is in the filter, nothing exists at
/// the same relative path under the destination root, and it was modified
/// strictly after its folder's watermark.
#[derive(Debug, Clone)]
pub struct FolderScanner {
    source_root: PathBuf,
    destination_root: PathBuf,
    extensions: Vec<String>,
}

impl FolderScanner {
    /// Create a scanner. Extensions are matched case-insensitively and are
    /// given without the leading dot.
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(
        source_root: P,
        destination_root: Q,
        extensions: &[String],
    ) -> Self {
        FolderScanner {
            source_root: source_root.as_ref().to_path_buf(),
            destination_root: destination_root.as_ref().to_path_buf(),
            extensions: extensions.iter().map(|e| e.to_ascii_lowercase()).collect(),
        }
    }

    fn wanted(&self, name: &str) -> bool {
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => {
                let ext = ext.to_ascii_lowercase();
                self.extensions.iter().any(|wanted| *wanted == ext)
            }
            _ => false,
        }
    }

    fn scan_folder(
        &self,
        folder: &str,
        watermark: &DateTime<Utc>,
        items: &mut Vec<WorkItem>,
    ) -> Result<(), EngineError> {
        let source_folder = self.source_root.join(folder);
        let destination_folder = self.destination_root.join(folder);

        let entries = match fs::read_dir(&source_folder) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(folder, "source folder missing, skipped");
                return Ok(());
            }
            Err(e) => {
                return Err(EngineError::EnumerationFailed {
                    path: source_folder,
                    source: e,
                })
            }
        };

        for entry in entries {
            let entry = entry.map_err(|e| EngineError::EnumerationFailed {
                path: source_folder.clone(),
                source: e,
            })?;

            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if !self.wanted(name) {
                continue;
            }

            if fs::symlink_metadata(destination_folder.join(name)).is_ok() {
                continue;
            }

            let metadata = entry.metadata().map_err(|e| EngineError::EnumerationFailed {
                path: entry.path(),
                source: e,
            })?;
            if !metadata.is_file() {
                continue;
            }

            let modified = metadata.modified().map_err(|e| EngineError::EnumerationFailed {
                path: entry.path(),
                source: e,
            })?;
            if DateTime::<Utc>::from(modified) > *watermark {
                items.push(WorkItem {
                    relative_path: format!("{}/{}", folder, name),
                    length: metadata.len(),
                    modified,
                });
            }
        }

        Ok(())
    }
}

impl WorklistProvider for FolderScanner {
    fn worklist(&self, watermarks: &Watermarks) -> Result<Vec<WorkItem>, EngineError> {
        let mut items = Vec::new();
        for (folder, watermark) in watermarks {
            self.scan_folder(folder, watermark, &mut items)?;
        }
        items.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        debug!(count = items.len(), "worklist built");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use filetime::FileTime;

    fn default_extensions() -> Vec<String> {
        vec!["avi".to_string(), "mp4".to_string(), "mpg".to_string()]
    }

    fn write_at(path: &Path, contents: &[u8], unix_secs: i64) {
        fs::create_dir_all(path.parent().unwrap()).expect("Failed to create folder");
        fs::write(path, contents).expect("Failed to write file");
        filetime::set_file_mtime(path, FileTime::from_unix_time(unix_secs, 0))
            .expect("Failed to set mtime");
    }

    fn watermark(unix_secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(unix_secs, 0).unwrap()
    }

    #[test]
    fn test_worklist_filters_and_sorts() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        fs::create_dir_all(&dst).expect("Failed to create dst");

        write_at(&src.join("Show/ep2.avi"), b"22", 2_000);
        write_at(&src.join("Show/ep1.MP4"), b"1", 2_000);
        write_at(&src.join("Show/notes.txt"), b"skip", 2_000);
        write_at(&src.join("Show/old.mpg"), b"old", 500);
        write_at(&src.join("Show/copied.avi"), b"done", 2_000);
        write_at(&dst.join("Show/copied.avi"), b"done", 2_000);
        write_at(&src.join("Other/x.avi"), b"ignored folder", 2_000);

        let mut marks = Watermarks::new();
        marks.insert("Show".to_string(), watermark(1_000));

        let scanner = FolderScanner::new(&src, &dst, &default_extensions());
        let items = scanner.worklist(&marks).expect("Failed to build worklist");

        let paths: Vec<_> = items.iter().map(|i| i.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["Show/ep1.MP4", "Show/ep2.avi"]);
        assert_eq!(items[1].length, 2);
    }

    #[test]
    fn test_worklist_requires_strictly_newer() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        write_at(&src.join("Show/same.avi"), b"x", 1_000);

        let mut marks = Watermarks::new();
        marks.insert("Show".to_string(), watermark(1_000));

        let scanner = FolderScanner::new(&src, &dst, &default_extensions());
        assert!(scanner.worklist(&marks).expect("Failed to build worklist").is_empty());
    }

    #[test]
    fn test_worklist_skips_missing_folder() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let mut marks = Watermarks::new();
        marks.insert("Gone".to_string(), watermark(0));

        let scanner = FolderScanner::new(temp_dir.path(), temp_dir.path(), &default_extensions());
        assert!(scanner.worklist(&marks).expect("Failed to build worklist").is_empty());
    }

    #[test]
    fn test_extension_matching() {
        let scanner = FolderScanner::new("/s", "/d", &["AVI".to_string()]);
        assert!(scanner.wanted("movie.avi"));
        assert!(scanner.wanted("movie.AvI"));
        assert!(!scanner.wanted("movie.avi.part"));
        assert!(!scanner.wanted(".avi"));
        assert!(!scanner.wanted("avi"));
    }
}
