use std::path::PathBuf;
use thiserror::Error;

use crate::check::CheckReport;

/// The main error type for yoloprep operations.
#[derive(Debug, Error)]
pub enum YoloprepError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to create dataset layout at {path}: {source}")]
    CreateLayout {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Class list is empty; nothing to register")]
    EmptyClassList,

    #[error("Duplicate class source key '{key}' at positions {first} and {second}")]
    DuplicateClass {
        key: String,
        first: usize,
        second: usize,
    },

    #[error("Invalid class source key at position {index}: {message}")]
    InvalidClassKey { index: usize, message: String },

    #[error("Unreadable image {path}: {message}")]
    UnreadableImage { path: PathBuf, message: String },

    #[error("Failed to write label file {path}: {source}")]
    LabelWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse label file {path} at line {line}: {message}")]
    LabelParse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Failed to write dataset descriptor {path}: {message}")]
    DescriptorWrite { path: PathBuf, message: String },

    #[error("Failed to parse dataset descriptor {path}: {source}")]
    DescriptorParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to serialize report: {0}")]
    ReportJson(#[from] serde_json::Error),

    #[error("Invalid options: {message}")]
    InvalidOptions { message: String },

    #[error("Dataset at {path} has no images; refusing to start training")]
    NothingToTrain { path: PathBuf },

    #[error("Failed to launch '{program}': {source}")]
    TrainerLaunch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{stage} command failed ({status})")]
    TrainerFailed { stage: &'static str, status: String },

    #[error("{stage} finished but expected artifact is missing: {path}")]
    ArtifactMissing { stage: &'static str, path: PathBuf },

    #[error("Dataset check failed with {error_count} error(s) and {warning_count} warning(s)")]
    CheckFailed {
        error_count: usize,
        warning_count: usize,
        report: CheckReport,
    },
}
