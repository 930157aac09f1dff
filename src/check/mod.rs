//! Consistency check for a built YOLO dataset.
//!
//! Reads `data.yaml`, then walks each split and verifies that:
//! - every image has a label file with the same stem (and vice versa)
//! - every label line is `class_id x y w h` with a known class id
//! - coordinates lie in `[0, 1]` and sizes are non-zero
//!
//! Missing labels are warnings: a failed label synthesis leaves an image
//! without a label, and trainers treat it as background.

mod report;

pub use report::{CheckCode, CheckIssue, CheckReport, CheckSeverity};

use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::builder::has_extension;
use crate::descriptor::{DatasetDescriptor, DESCRIPTOR_FILE_NAME};
use crate::label::{parse_label_line, LABEL_EXTENSION};

/// Image extensions recognized when pairing images with labels.
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];

/// Options for dataset checking.
#[derive(Clone, Debug)]
pub struct CheckOptions {
    /// If true, treat warnings as errors.
    pub strict: bool,
    pub image_extensions: Vec<String>,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            strict: false,
            image_extensions: IMAGE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

/// Check the dataset rooted at `root` and report every finding.
pub fn check_dataset(root: &Path, opts: &CheckOptions) -> CheckReport {
    let mut report = CheckReport::new();
    let descriptor_path = root.join(DESCRIPTOR_FILE_NAME);

    let descriptor = match DatasetDescriptor::read(&descriptor_path) {
        Ok(descriptor) => Some(descriptor),
        Err(err) => {
            report.add(CheckIssue::error(
                CheckCode::MissingDescriptor,
                err.to_string(),
                &descriptor_path,
            ));
            None
        }
    };

    if let Some(descriptor) = &descriptor {
        if !descriptor.has_contiguous_names() {
            let ids: Vec<String> = descriptor.names.keys().map(|id| id.to_string()).collect();
            report.add(CheckIssue::error(
                CheckCode::NonContiguousNames,
                format!(
                    "names must cover ids 0..{} without gaps, found [{}]",
                    descriptor.names.len(),
                    ids.join(", ")
                ),
                &descriptor_path,
            ));
        }
    }

    let class_count = descriptor.as_ref().map(|d| d.names.len());
    let subpaths = match &descriptor {
        Some(d) => [d.train.clone(), d.val.clone()],
        None => [
            crate::descriptor::TRAIN_SUBPATH.to_string(),
            crate::descriptor::VAL_SUBPATH.to_string(),
        ],
    };

    for subpath in &subpaths {
        let images_dir = root.join(subpath);
        let labels_dir = root.join(label_subpath(Path::new(subpath)));
        check_split(
            &images_dir,
            &labels_dir,
            class_count,
            &opts.image_extensions,
            &mut report,
        );
    }

    report
}

/// Label directory matching an image directory: the last `images`
/// component becomes `labels`.
pub fn label_subpath(image_subpath: &Path) -> PathBuf {
    let components: Vec<Component> = image_subpath.components().collect();
    let swap_at = components
        .iter()
        .rposition(|c| c.as_os_str() == "images");

    components
        .iter()
        .enumerate()
        .map(|(index, component)| {
            if Some(index) == swap_at {
                Path::new("labels")
            } else {
                Path::new(component.as_os_str())
            }
        })
        .collect()
}

fn check_split(
    images_dir: &Path,
    labels_dir: &Path,
    class_count: Option<usize>,
    image_extensions: &[String],
    report: &mut CheckReport,
) {
    if !images_dir.is_dir() {
        report.add(CheckIssue::error(
            CheckCode::MissingSplitDir,
            "image directory does not exist",
            images_dir,
        ));
        return;
    }

    let images = collect_files(images_dir, image_extensions);
    let image_stems: BTreeSet<PathBuf> = images
        .iter()
        .map(|path| relative_stem(images_dir, path))
        .collect();

    if images.is_empty() {
        report.add(CheckIssue::warning(
            CheckCode::EmptySplit,
            "split contains no images",
            images_dir,
        ));
    }

    for image in &images {
        report.images_checked += 1;
        let label = labels_dir.join(label_file_name(&relative_stem(images_dir, image)));
        if !label.is_file() {
            report.add(CheckIssue::warning(
                CheckCode::MissingLabel,
                format!("no label file at {}", label.display()),
                image,
            ));
        }
    }

    if !labels_dir.is_dir() {
        return;
    }

    for label in collect_files(labels_dir, &[LABEL_EXTENSION.to_string()]) {
        report.labels_checked += 1;
        if !image_stems.contains(&relative_stem(labels_dir, &label)) {
            report.add(CheckIssue::warning(
                CheckCode::OrphanLabel,
                "no image with a matching file stem",
                &label,
            ));
        }
        check_label_file(&label, class_count, report);
    }
}

fn check_label_file(path: &Path, class_count: Option<usize>, report: &mut CheckReport) {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            report.add(CheckIssue::error(
                CheckCode::MalformedLabelLine,
                format!("cannot read label file: {err}"),
                path,
            ));
            return;
        }
    };

    for (line_idx, line) in content.lines().enumerate() {
        let annotation = match parse_label_line(line, path, line_idx + 1) {
            Ok(Some(annotation)) => annotation,
            Ok(None) => continue,
            Err(err) => {
                report.add(CheckIssue::error(
                    CheckCode::MalformedLabelLine,
                    err.to_string(),
                    path,
                ));
                continue;
            }
        };

        if let Some(count) = class_count {
            if annotation.class_id >= count {
                report.add(CheckIssue::error(
                    CheckCode::UnknownClassId,
                    format!(
                        "line {}: class_id {} is out of range for {} class(es)",
                        line_idx + 1,
                        annotation.class_id,
                        count
                    ),
                    path,
                ));
            }
        }

        if !annotation.is_normalized() {
            report.add(CheckIssue::error(
                CheckCode::CoordinateOutOfRange,
                format!("line {}: box '{}' is not normalized", line_idx + 1, annotation),
                path,
            ));
        }
    }
}

fn collect_files(root: &Path, extensions: &[String]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .min_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && has_extension(entry.path(), extensions))
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

fn relative_stem(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root).unwrap_or(path).with_extension("")
}

/// `stem` plus `.txt`. Appended rather than swapped in, so dots inside the
/// stem (`img.v2`) survive.
fn label_file_name(stem: &Path) -> PathBuf {
    let mut name = stem.as_os_str().to_os_string();
    name.push(".");
    name.push(LABEL_EXTENSION);
    PathBuf::from(name)
}
