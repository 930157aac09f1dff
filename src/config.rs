//! Optional YAML pipeline configuration.
//!
//! Every field is optional; command-line flags take precedence over values
//! read from the file.
//!
//! ```yaml
//! source: train_data
//! output: dataset
//! classes:
//!   - A-firearms
//!   - B-explosive
//! train_ratio: 0.8
//! seed: 42
//! extensions: [jpg, jpeg]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::builder::BuildOptions;
use crate::error::YoloprepError;

/// Default source root, relative to the working directory.
pub const DEFAULT_SOURCE_ROOT: &str = "train_data";

/// Default dataset root, relative to the working directory.
pub const DEFAULT_DATASET_ROOT: &str = "dataset";

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    #[serde(default)]
    pub source: Option<PathBuf>,
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub train_ratio: Option<f64>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub keep_empty_classes: Option<bool>,
    #[serde(default)]
    pub clean: Option<bool>,
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self, YoloprepError> {
        let data = fs::read_to_string(path)?;
        Self::from_yaml_str(&data, path)
    }

    pub fn from_yaml_str(data: &str, path: &Path) -> Result<Self, YoloprepError> {
        serde_yaml::from_str(data).map_err(|source| YoloprepError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Values given on the command line; `None`/empty means "not given".
#[derive(Clone, Debug, Default)]
pub struct BuildOverrides {
    pub source: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub classes: Vec<String>,
    pub train_ratio: Option<f64>,
    pub seed: Option<u64>,
    pub extensions: Vec<String>,
    pub keep_empty_classes: bool,
    pub clean: bool,
}

/// Merge command-line overrides over an optional config file into build
/// options, falling back to the defaults.
pub fn resolve_build_options(
    overrides: BuildOverrides,
    file: Option<PipelineConfig>,
) -> BuildOptions {
    let file = file.unwrap_or_default();

    let source = overrides
        .source
        .or(file.source)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SOURCE_ROOT));
    let output = overrides
        .output
        .or(file.output)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATASET_ROOT));
    let classes = if overrides.classes.is_empty() {
        file.classes
    } else {
        overrides.classes
    };

    let mut opts = BuildOptions::new(source, output, classes);

    if let Some(ratio) = overrides.train_ratio.or(file.train_ratio) {
        opts.train_ratio = ratio;
    }
    opts.seed = overrides.seed.or(file.seed);

    let extensions = if overrides.extensions.is_empty() {
        file.extensions
    } else {
        overrides.extensions
    };
    if !extensions.is_empty() {
        opts.extensions = extensions;
    }

    opts.keep_empty_classes =
        overrides.keep_empty_classes || file.keep_empty_classes.unwrap_or(false);
    opts.clean = overrides.clean || file.clean.unwrap_or(false);

    opts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let config = PipelineConfig::from_yaml_str(
            "source: raw\noutput: out\nclasses: [A-cat, B-dog]\ntrain_ratio: 0.75\nseed: 9\n",
            Path::new("cfg.yaml"),
        )
        .expect("parse");

        assert_eq!(config.source, Some(PathBuf::from("raw")));
        assert_eq!(config.classes, vec!["A-cat", "B-dog"]);
        assert_eq!(config.seed, Some(9));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = PipelineConfig::from_yaml_str("sourcee: raw\n", Path::new("cfg.yaml"))
            .unwrap_err();
        assert!(matches!(err, YoloprepError::ConfigParse { .. }));
    }

    #[test]
    fn flags_override_file_values() {
        let file = PipelineConfig {
            source: Some("raw".into()),
            classes: vec!["A-cat".into()],
            seed: Some(1),
            train_ratio: Some(0.5),
            ..Default::default()
        };
        let overrides = BuildOverrides {
            classes: vec!["B-dog".into()],
            seed: Some(2),
            ..Default::default()
        };

        let opts = resolve_build_options(overrides, Some(file));
        assert_eq!(opts.source_root, PathBuf::from("raw"));
        assert_eq!(opts.dataset_root, PathBuf::from(DEFAULT_DATASET_ROOT));
        assert_eq!(opts.classes, vec!["B-dog"]);
        assert_eq!(opts.seed, Some(2));
        assert_eq!(opts.train_ratio, 0.5);
        assert_eq!(opts.extensions, vec!["jpg"]);
    }
}
