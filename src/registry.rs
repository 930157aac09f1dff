//! Class registry: source category folders to YOLO class ids.
//!
//! Source folders are named `<code>-<label>` (for example `A-firearms`). The
//! registry assigns each folder the 0-based position it has in the configured
//! list, and a display name taken from the text after the last `-`.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::error::YoloprepError;

/// One registered class.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClassEntry {
    /// Folder name under the source root, e.g. `A-firearms`.
    pub source_key: String,

    /// Contiguous 0-based class id.
    pub numeric_id: usize,

    /// Name written to the dataset descriptor, e.g. `firearms`.
    pub display_name: String,
}

/// Ordered mapping from source folders to class ids and names.
///
/// Ids always form the range `0..len()` with no gaps.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassRegistry {
    entries: Vec<ClassEntry>,
}

impl ClassRegistry {
    /// Build a registry from an ordered list of source folder names.
    ///
    /// The id of each class is its position in `source_keys`. An empty list,
    /// a blank or path-like key, or a repeated key is an error.
    pub fn new<S: AsRef<str>>(source_keys: &[S]) -> Result<Self, YoloprepError> {
        if source_keys.is_empty() {
            return Err(YoloprepError::EmptyClassList);
        }

        let mut seen: HashMap<&str, usize> = HashMap::new();
        let mut entries = Vec::with_capacity(source_keys.len());

        for (index, key) in source_keys.iter().enumerate() {
            let key = key.as_ref();
            validate_source_key(index, key)?;

            if let Some(first) = seen.insert(key, index) {
                return Err(YoloprepError::DuplicateClass {
                    key: key.to_string(),
                    first,
                    second: index,
                });
            }

            entries.push(ClassEntry {
                source_key: key.to_string(),
                numeric_id: index,
                display_name: display_name_for(key).to_string(),
            });
        }

        Ok(Self { entries })
    }

    /// A registry with no classes.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ClassEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a class by numeric id.
    pub fn get(&self, numeric_id: usize) -> Option<&ClassEntry> {
        self.entries.get(numeric_id)
    }

    /// Look up a class by its source folder name.
    pub fn by_source_key(&self, source_key: &str) -> Option<&ClassEntry> {
        self.entries
            .iter()
            .find(|entry| entry.source_key == source_key)
    }

    /// The `id -> display name` mapping written to `data.yaml`.
    pub fn names(&self) -> BTreeMap<usize, String> {
        self.entries
            .iter()
            .map(|entry| (entry.numeric_id, entry.display_name.clone()))
            .collect()
    }

    /// Keep only the entries accepted by `keep`, renumbered in their original
    /// order so that ids stay contiguous.
    pub fn compact<F>(&self, mut keep: F) -> ClassRegistry
    where
        F: FnMut(&ClassEntry) -> bool,
    {
        let entries = self
            .entries
            .iter()
            .filter(|entry| keep(entry))
            .enumerate()
            .map(|(numeric_id, entry)| ClassEntry {
                numeric_id,
                ..entry.clone()
            })
            .collect();

        ClassRegistry { entries }
    }
}

/// Display name for a source key: the text after the last `-`, or the whole
/// key when it has no separator.
pub fn display_name_for(source_key: &str) -> &str {
    source_key.rsplit('-').next().unwrap_or(source_key)
}

fn validate_source_key(index: usize, key: &str) -> Result<(), YoloprepError> {
    if key.trim().is_empty() {
        return Err(YoloprepError::InvalidClassKey {
            index,
            message: "key is blank".to_string(),
        });
    }

    if key.contains('/') || key.contains('\\') || key == "." || key == ".." {
        return Err(YoloprepError::InvalidClassKey {
            index,
            message: format!("'{key}' must be a single folder name"),
        });
    }

    if display_name_for(key).trim().is_empty() {
        return Err(YoloprepError::InvalidClassKey {
            index,
            message: format!("'{key}' has no label after the last '-'"),
        });
    }

    Ok(())
}
