//! The `data.yaml` dataset descriptor read by YOLO trainers.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::YoloprepError;

/// File name of the descriptor inside the dataset root.
pub const DESCRIPTOR_FILE_NAME: &str = "data.yaml";

/// Relative image directory of the training split.
pub const TRAIN_SUBPATH: &str = "images/train";

/// Relative image directory of the validation split.
pub const VAL_SUBPATH: &str = "images/val";

/// Where the trainer finds images, and how class ids map to names.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DatasetDescriptor {
    /// Absolute dataset root.
    pub path: PathBuf,
    pub train: String,
    pub val: String,
    pub names: BTreeMap<usize, String>,
}

impl DatasetDescriptor {
    /// Descriptor with the standard split sub-paths.
    pub fn new(root: impl Into<PathBuf>, names: BTreeMap<usize, String>) -> Self {
        Self {
            path: root.into(),
            train: TRAIN_SUBPATH.to_string(),
            val: VAL_SUBPATH.to_string(),
            names,
        }
    }

    /// True when `names` covers exactly the ids `0..names.len()`.
    pub fn has_contiguous_names(&self) -> bool {
        self.names.keys().copied().eq(0..self.names.len())
    }

    pub fn to_yaml_string(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Write the descriptor to `path`.
    ///
    /// The content goes to a sibling temporary file first and is renamed into
    /// place, so readers never observe a partial descriptor.
    pub fn write(&self, path: &Path) -> Result<(), YoloprepError> {
        let write_error = |message: String| YoloprepError::DescriptorWrite {
            path: path.to_path_buf(),
            message,
        };

        let yaml = self
            .to_yaml_string()
            .map_err(|source| write_error(source.to_string()))?;

        let tmp_path = path.with_extension("yaml.tmp");
        fs::write(&tmp_path, yaml).map_err(|source| write_error(source.to_string()))?;
        fs::rename(&tmp_path, path).map_err(|source| {
            let _ = fs::remove_file(&tmp_path);
            write_error(source.to_string())
        })
    }

    /// Read a descriptor, accepting `names` as either a mapping or a list.
    pub fn read(path: &Path) -> Result<Self, YoloprepError> {
        let data = fs::read_to_string(path)?;
        Self::from_yaml_str(&data, path)
    }

    fn from_yaml_str(data: &str, path: &Path) -> Result<Self, YoloprepError> {
        let raw: RawDescriptor =
            serde_yaml::from_str(data).map_err(|source| YoloprepError::DescriptorParse {
                path: path.to_path_buf(),
                source,
            })?;

        let names = match raw.names {
            RawNames::Sequence(names) => names.into_iter().enumerate().collect(),
            RawNames::Mapping(mapping) => mapping,
        };

        Ok(Self {
            path: raw.path.unwrap_or_default(),
            train: raw.train.unwrap_or_else(|| TRAIN_SUBPATH.to_string()),
            val: raw.val.unwrap_or_else(|| VAL_SUBPATH.to_string()),
            names,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawDescriptor {
    #[serde(default)]
    path: Option<PathBuf>,
    #[serde(default)]
    train: Option<String>,
    #[serde(default)]
    val: Option<String>,
    #[serde(default)]
    names: RawNames,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawNames {
    Sequence(Vec<String>),
    Mapping(BTreeMap<usize, String>),
}

impl Default for RawNames {
    fn default() -> Self {
        RawNames::Mapping(BTreeMap::new())
    }
}
