use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::descriptor::DESCRIPTOR_FILE_NAME;
use crate::error::YoloprepError;

/// A train/validation partition name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitKind {
    Train,
    Val,
}

impl SplitKind {
    pub const ALL: [SplitKind; 2] = [SplitKind::Train, SplitKind::Val];

    pub fn as_str(self) -> &'static str {
        match self {
            SplitKind::Train => "train",
            SplitKind::Val => "val",
        }
    }
}

/// Directory layout of a YOLO dataset root.
#[derive(Clone, Debug)]
pub struct DatasetLayout {
    root: PathBuf,
}

impl DatasetLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create `images/{train,val}` and `labels/{train,val}` under `root`.
    ///
    /// Existing directories are left as they are. Any failure here is fatal
    /// for a build.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self, YoloprepError> {
        let layout = Self::new(root);

        for dir in layout.split_dirs() {
            fs::create_dir_all(&dir)
                .map_err(|source| YoloprepError::CreateLayout { path: dir, source })?;
        }

        Ok(layout)
    }

    /// Number of entries already present in the split directories.
    pub fn existing_entries(&self) -> usize {
        self.split_dirs()
            .iter()
            .filter_map(|dir| fs::read_dir(dir).ok())
            .map(|entries| entries.count())
            .sum()
    }

    /// Empty the split directories, leaving them in place.
    pub fn clear_splits(&self) -> Result<(), YoloprepError> {
        for dir in self.split_dirs() {
            if dir.exists() {
                fs::remove_dir_all(&dir).map_err(|source| YoloprepError::CreateLayout {
                    path: dir.clone(),
                    source,
                })?;
            }
            fs::create_dir_all(&dir)
                .map_err(|source| YoloprepError::CreateLayout { path: dir, source })?;
        }
        Ok(())
    }

    fn split_dirs(&self) -> Vec<PathBuf> {
        SplitKind::ALL
            .iter()
            .flat_map(|&split| [self.images_dir(split), self.labels_dir(split)])
            .collect()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn images_dir(&self, split: SplitKind) -> PathBuf {
        self.root.join("images").join(split.as_str())
    }

    pub fn labels_dir(&self, split: SplitKind) -> PathBuf {
        self.root.join("labels").join(split.as_str())
    }

    pub fn descriptor_path(&self) -> PathBuf {
        self.root.join(DESCRIPTOR_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_is_idempotent() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let root = temp.path().join("dataset");

        DatasetLayout::create(&root).expect("first create");
        fs::write(root.join("images/train/keep.jpg"), b"x").expect("write file");
        let layout = DatasetLayout::create(&root).expect("second create");

        assert!(layout.labels_dir(SplitKind::Val).is_dir());
        assert!(root.join("images/train/keep.jpg").is_file());
    }

    #[test]
    fn clear_splits_empties_existing_output() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let layout = DatasetLayout::create(temp.path().join("dataset")).expect("create");
        fs::write(layout.images_dir(SplitKind::Train).join("old.jpg"), b"x").expect("write");
        fs::write(layout.labels_dir(SplitKind::Val).join("old.txt"), b"x").expect("write");
        assert_eq!(layout.existing_entries(), 2);

        layout.clear_splits().expect("clear");
        assert_eq!(layout.existing_entries(), 0);
        assert!(layout.images_dir(SplitKind::Train).is_dir());
    }

    #[test]
    fn create_fails_when_root_is_a_file() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let root = temp.path().join("dataset");
        fs::write(&root, b"not a dir").expect("write blocker");

        let err = DatasetLayout::create(&root).unwrap_err();
        assert!(matches!(err, YoloprepError::CreateLayout { .. }));
    }
}
