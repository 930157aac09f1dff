use std::path::{Path, PathBuf};

use log::{info, warn};
use walkdir::WalkDir;

use crate::label::verify_image;
use crate::registry::ClassEntry;

/// Default accepted image extension.
pub const DEFAULT_IMAGE_EXTENSIONS: [&str; 1] = ["jpg"];

/// Outcome of scanning one class folder.
#[derive(Clone, Debug)]
pub struct ClassScan {
    pub source_key: String,
    pub display_name: String,
    pub status: ScanStatus,
}

#[derive(Clone, Debug)]
pub enum ScanStatus {
    /// The class folder does not exist under the source root.
    Missing { dir: PathBuf },
    /// The folder was listed; `images` holds readable files in name order.
    Scanned {
        images: Vec<PathBuf>,
        unreadable: Vec<UnreadableFile>,
    },
}

/// A file that matched the extension filter but could not be decoded.
#[derive(Clone, Debug)]
pub struct UnreadableFile {
    pub path: PathBuf,
    pub reason: String,
}

impl ClassScan {
    pub fn image_count(&self) -> usize {
        match &self.status {
            ScanStatus::Scanned { images, .. } => images.len(),
            ScanStatus::Missing { .. } => 0,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self.status, ScanStatus::Missing { .. })
    }
}

/// List and decode-check the images of one class folder (`<source_root>/<source_key>`).
///
/// Only direct children whose extension matches `extensions`
/// (case-insensitive) are considered.
pub fn scan_class(source_root: &Path, entry: &ClassEntry, extensions: &[String]) -> ClassScan {
    let dir = source_root.join(&entry.source_key);

    let status = if !dir.is_dir() {
        warn!(
            "source directory for class '{}' not found: {}",
            entry.source_key,
            dir.display()
        );
        ScanStatus::Missing { dir }
    } else {
        let (images, unreadable) = collect_images(&dir, extensions);
        info!(
            "class '{}': found {} image(s){}",
            entry.display_name,
            images.len(),
            if unreadable.is_empty() {
                String::new()
            } else {
                format!(", skipped {} unreadable", unreadable.len())
            }
        );
        ScanStatus::Scanned { images, unreadable }
    };

    ClassScan {
        source_key: entry.source_key.clone(),
        display_name: entry.display_name.clone(),
        status,
    }
}

fn collect_images(dir: &Path, extensions: &[String]) -> (Vec<PathBuf>, Vec<UnreadableFile>) {
    let mut images = Vec::new();
    let mut unreadable = Vec::new();

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().unwrap_or(dir).to_path_buf();
                warn!("failed to list {}: {}", path.display(), err);
                unreadable.push(UnreadableFile {
                    path,
                    reason: err.to_string(),
                });
                continue;
            }
        };

        if !entry.file_type().is_file() || !has_extension(entry.path(), extensions) {
            continue;
        }

        match verify_image(entry.path()) {
            Ok(_) => images.push(entry.into_path()),
            Err(err) => {
                warn!("skipping unreadable image: {err}");
                unreadable.push(UnreadableFile {
                    path: entry.into_path(),
                    reason: err.to_string(),
                });
            }
        }
    }

    (images, unreadable)
}

pub(crate) fn has_extension(path: &Path, allowed: &[String]) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };

    allowed
        .iter()
        .any(|allowed_ext| ext.eq_ignore_ascii_case(allowed_ext.trim_start_matches('.')))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn entry(key: &str) -> ClassEntry {
        ClassEntry {
            source_key: key.to_string(),
            numeric_id: 0,
            display_name: crate::registry::display_name_for(key).to_string(),
        }
    }

    fn jpg() -> Vec<String> {
        vec!["jpg".to_string()]
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        assert!(has_extension(Path::new("a.JPG"), &jpg()));
        assert!(has_extension(Path::new("a.jpg"), &[".jpg".to_string()]));
        assert!(!has_extension(Path::new("a.png"), &jpg()));
        assert!(!has_extension(Path::new("jpg"), &jpg()));
    }

    #[test]
    fn missing_directory_is_reported() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let scan = scan_class(temp.path(), &entry("B-explosive"), &jpg());
        assert!(scan.is_missing());
        assert_eq!(scan.image_count(), 0);
    }

    #[test]
    fn scan_skips_nested_and_unmatched_files() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let dir = temp.path().join("A-firearms");
        fs::create_dir_all(dir.join("nested")).expect("create dirs");
        fs::write(dir.join("notes.txt"), b"hi").expect("write txt");
        fs::write(dir.join("empty.jpg"), b"").expect("write empty jpg");
        fs::write(dir.join("nested/deep.jpg"), b"").expect("write nested");

        let scan = scan_class(temp.path(), &entry("A-firearms"), &jpg());
        match scan.status {
            ScanStatus::Scanned { images, unreadable } => {
                assert!(images.is_empty());
                assert_eq!(unreadable.len(), 1);
                assert!(unreadable[0].path.ends_with("empty.jpg"));
            }
            ScanStatus::Missing { .. } => panic!("directory exists"),
        }
    }
}
