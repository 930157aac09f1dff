//! Build report types.
//!
//! Recoverable problems hit while building a dataset (missing class folders,
//! unreadable images, failed copies) are collected here instead of aborting
//! the run, and rendered as the final summary.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use super::layout::SplitKind;

/// Everything that happened during one dataset build.
#[derive(Clone, Debug, Default, Serialize)]
pub struct BuildReport {
    pub source_root: PathBuf,
    pub dataset_root: PathBuf,
    /// Set once the descriptor has been written.
    pub descriptor_path: Option<PathBuf>,
    pub seed: Option<u64>,
    /// One entry per configured class, in configuration order.
    pub classes: Vec<ClassSummary>,
    pub train: SplitSummary,
    pub val: SplitSummary,
    pub issues: Vec<BuildIssue>,
}

impl BuildReport {
    pub fn new(source_root: impl Into<PathBuf>, dataset_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            dataset_root: dataset_root.into(),
            ..Default::default()
        }
    }

    pub fn add(&mut self, issue: BuildIssue) {
        self.issues.push(issue);
    }

    pub fn split(&self, kind: SplitKind) -> &SplitSummary {
        match kind {
            SplitKind::Train => &self.train,
            SplitKind::Val => &self.val,
        }
    }

    pub fn split_mut(&mut self, kind: SplitKind) -> &mut SplitSummary {
        match kind {
            SplitKind::Train => &mut self.train,
            SplitKind::Val => &mut self.val,
        }
    }

    /// Valid images found across all classes.
    pub fn total_images(&self) -> usize {
        self.train.images + self.val.images
    }

    /// Number of classes that ended up in the descriptor.
    pub fn registered_class_count(&self) -> usize {
        self.classes.iter().filter(|c| c.class_id.is_some()).count()
    }

    /// Source keys of classes whose folder was missing.
    pub fn skipped_classes(&self) -> Vec<&str> {
        self.classes
            .iter()
            .filter(|c| matches!(c.status, ClassStatus::Missing))
            .map(|c| c.source_key.as_str())
            .collect()
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    /// Issues carrying the given code.
    pub fn issues_with(&self, code: IssueCode) -> impl Iterator<Item = &BuildIssue> {
        self.issues.iter().filter(move |i| i.code == code)
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Dataset built at {}: {} image(s), {} class(es)",
            self.dataset_root.display(),
            self.total_images(),
            self.registered_class_count()
        )?;

        for kind in SplitKind::ALL {
            let split = self.split(kind);
            writeln!(
                f,
                "  {:<5} {} image(s), {} label(s) written",
                kind.as_str(),
                split.images,
                split.labels_written
            )?;
        }

        writeln!(f)?;
        writeln!(f, "Classes:")?;
        for class in &self.classes {
            let id = class
                .class_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string());
            match class.status {
                ClassStatus::Scanned { images, unreadable } => writeln!(
                    f,
                    "  [{:>2}] {} ({}): {} image(s), {} unreadable",
                    id, class.display_name, class.source_key, images, unreadable
                )?,
                ClassStatus::Missing => writeln!(
                    f,
                    "  [{:>2}] {} ({}): skipped, folder missing",
                    id, class.display_name, class.source_key
                )?,
            }
        }

        if !self.issues.is_empty() {
            writeln!(f)?;
            writeln!(
                f,
                "Issues: {} error(s), {} warning(s)",
                self.error_count(),
                self.warning_count()
            )?;
            for issue in &self.issues {
                writeln!(f, "  {}", issue)?;
            }
        }

        if let Some(path) = &self.descriptor_path {
            writeln!(f)?;
            writeln!(f, "Descriptor: {}", path.display())?;
        }

        Ok(())
    }
}

/// Per-class scan outcome.
#[derive(Clone, Debug, Serialize)]
pub struct ClassSummary {
    pub source_key: String,
    pub display_name: String,
    /// Id in the written descriptor; `None` when the class was dropped.
    pub class_id: Option<usize>,
    pub status: ClassStatus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ClassStatus {
    Scanned { images: usize, unreadable: usize },
    Missing,
}

/// Counts for one split.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SplitSummary {
    /// Records assigned to this split.
    pub images: usize,
    /// Images copied into `images/<split>`.
    pub copied: usize,
    /// Label files written into `labels/<split>`.
    pub labels_written: usize,
    pub copy_failures: usize,
    pub label_failures: usize,
}

/// A single recoverable problem.
#[derive(Clone, Debug, Serialize)]
pub struct BuildIssue {
    pub severity: Severity,
    pub code: IssueCode,
    pub message: String,
    pub context: IssueContext,
}

impl BuildIssue {
    pub fn error(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            context,
        }
    }

    pub fn warning(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            context,
        }
    }
}

impl fmt::Display for BuildIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN ",
        };
        write!(
            f,
            "[{}] {:?} in {}: {}",
            severity, self.code, self.context, self.message
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

/// Stable issue codes, part of the JSON report schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    /// The configured class list could not be registered.
    InvalidClassList,
    /// A configured class has no folder under the source root.
    MissingSourceClass,
    /// An image matched the filter but could not be read.
    UnreadableImage,
    /// Copying an image into the dataset failed.
    CopyFailed,
    /// Writing a label file failed; the copied image has no label.
    LabelFailed,
    /// Two images share a file name within one split; the later one wins.
    FilenameCollision,
    /// No valid images were found at all.
    EmptyDataset,
    /// The split directories already held files from an earlier build.
    StaleOutput,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueContext {
    Dataset,
    Class { source_key: String },
    Image { path: PathBuf },
}

impl fmt::Display for IssueContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueContext::Dataset => write!(f, "dataset"),
            IssueContext::Class { source_key } => write!(f, "class {}", source_key),
            IssueContext::Image { path } => write!(f, "image {}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_severity() {
        let mut report = BuildReport::new("train_data", "dataset");
        report.add(BuildIssue::warning(
            IssueCode::MissingSourceClass,
            "folder missing",
            IssueContext::Class {
                source_key: "B-explosive".into(),
            },
        ));
        report.add(BuildIssue::error(
            IssueCode::InvalidClassList,
            "empty",
            IssueContext::Dataset,
        ));

        assert_eq!(report.warning_count(), 1);
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.issues_with(IssueCode::MissingSourceClass).count(), 1);
    }

    #[test]
    fn summary_lists_skipped_classes() {
        let mut report = BuildReport::new("train_data", "dataset");
        report.classes.push(ClassSummary {
            source_key: "B-explosive".into(),
            display_name: "explosive".into(),
            class_id: None,
            status: ClassStatus::Missing,
        });
        report.train.images = 8;
        report.val.images = 2;

        let text = report.to_string();
        assert!(text.contains("10 image(s)"));
        assert!(text.contains("skipped, folder missing"));
        assert_eq!(report.skipped_classes(), vec!["B-explosive"]);
    }

    #[test]
    fn report_serializes_to_json() {
        let mut report = BuildReport::new("train_data", "dataset");
        report.add(BuildIssue::warning(
            IssueCode::EmptyDataset,
            "no images",
            IssueContext::Dataset,
        ));

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"severity\":\"warning\""));
        assert!(json.contains("\"code\":\"empty_dataset\""));
        assert!(json.contains("\"kind\":\"dataset\""));
    }
}
