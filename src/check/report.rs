//! Check report types.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// The result of checking a built dataset.
#[derive(Clone, Debug, Default, Serialize)]
pub struct CheckReport {
    /// Images seen across both splits.
    pub images_checked: usize,
    pub labels_checked: usize,
    pub issues: Vec<CheckIssue>,
}

impl CheckReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, issue: CheckIssue) {
        self.issues.push(issue);
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == CheckSeverity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == CheckSeverity::Warning)
            .count()
    }

    /// Returns true if there are no errors.
    pub fn is_ok(&self) -> bool {
        self.error_count() == 0
    }

    /// Returns true if there are no issues at all.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn has_code(&self, code: CheckCode) -> bool {
        self.issues.iter().any(|i| i.code == code)
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.issues.is_empty() {
            return writeln!(
                f,
                "Check passed: {} image(s), {} label file(s), no issues found",
                self.images_checked, self.labels_checked
            );
        }

        writeln!(
            f,
            "Check completed with {} error(s) and {} warning(s):",
            self.error_count(),
            self.warning_count()
        )?;
        writeln!(f)?;

        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }

        Ok(())
    }
}

/// A single check finding.
#[derive(Clone, Debug, Serialize)]
pub struct CheckIssue {
    pub severity: CheckSeverity,
    pub code: CheckCode,
    pub message: String,
    pub path: PathBuf,
}

impl CheckIssue {
    pub fn error(code: CheckCode, message: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            severity: CheckSeverity::Error,
            code,
            message: message.into(),
            path: path.into(),
        }
    }

    pub fn warning(code: CheckCode, message: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            severity: CheckSeverity::Warning,
            code,
            message: message.into(),
            path: path.into(),
        }
    }
}

impl fmt::Display for CheckIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            CheckSeverity::Error => "ERROR",
            CheckSeverity::Warning => "WARN ",
        };
        write!(
            f,
            "[{}] {:?} in {}: {}",
            severity,
            self.code,
            self.path.display(),
            self.message
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckSeverity {
    Warning,
    Error,
}

/// Stable codes for check findings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckCode {
    // Descriptor
    /// `data.yaml` is absent or unreadable.
    MissingDescriptor,
    /// `names` does not cover `0..N` without gaps.
    NonContiguousNames,
    /// A split directory named by the descriptor does not exist.
    MissingSplitDir,

    // Pairing
    /// An image has no label with the same stem.
    MissingLabel,
    /// A label has no image with the same stem.
    OrphanLabel,
    /// A split contains no images.
    EmptySplit,

    // Label content
    /// A label line is not `class x y w h`.
    MalformedLabelLine,
    /// A class id is not present in `names`.
    UnknownClassId,
    /// A coordinate lies outside `[0, 1]` or a size is zero.
    CoordinateOutOfRange,
}
