//! Dataset assembly: class folders in, YOLO dataset out.
//!
//! The build runs in fixed phases:
//!
//! 1. create `images/{train,val}` and `labels/{train,val}` (the only fatal
//!    step), emptying them first when `clean` is set
//! 2. register the configured classes
//! 3. scan every class folder, in configuration order
//! 4. shuffle all records and cut them into train/val
//! 5. copy images and synthesize a label for each
//! 6. write `data.yaml`
//!
//! Everything that goes wrong after step 1 is logged, recorded in the
//! [`BuildReport`] and skipped.

mod layout;
mod report;
mod scan;
mod split;

pub use layout::{DatasetLayout, SplitKind};
pub use report::{
    BuildIssue, BuildReport, ClassStatus, ClassSummary, IssueCode, IssueContext, Severity,
    SplitSummary,
};
pub(crate) use scan::has_extension;
pub use scan::{scan_class, ClassScan, ScanStatus, UnreadableFile, DEFAULT_IMAGE_EXTENSIONS};
pub use split::{
    shuffle_records, split_records, train_count, ImageRecord, Split, DEFAULT_TRAIN_RATIO,
};

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;

use log::{debug, info, warn};

use crate::descriptor::DatasetDescriptor;
use crate::error::YoloprepError;
use crate::label::{BoundingBoxEstimator, CenteredBoxEstimator, LabelSynthesizer, LABEL_EXTENSION};
use crate::registry::ClassRegistry;

/// Options for a dataset build.
#[derive(Clone, Debug)]
pub struct BuildOptions {
    /// Directory holding one folder per class.
    pub source_root: PathBuf,
    /// Directory the YOLO dataset is written to.
    pub dataset_root: PathBuf,
    /// Ordered class folder names; position is the class id.
    pub classes: Vec<String>,
    /// Accepted image extensions, matched case-insensitively.
    pub extensions: Vec<String>,
    /// Share of images assigned to the training split.
    pub train_ratio: f64,
    /// Shuffle seed. `None` gives a different split on every run.
    pub seed: Option<u64>,
    /// Keep classes without images in the descriptor instead of dropping
    /// them and renumbering the rest.
    pub keep_empty_classes: bool,
    /// Empty the split directories before copying.
    pub clean: bool,
}

impl BuildOptions {
    pub fn new(
        source_root: impl Into<PathBuf>,
        dataset_root: impl Into<PathBuf>,
        classes: Vec<String>,
    ) -> Self {
        Self {
            source_root: source_root.into(),
            dataset_root: dataset_root.into(),
            classes,
            extensions: DEFAULT_IMAGE_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            train_ratio: DEFAULT_TRAIN_RATIO,
            seed: None,
            keep_empty_classes: false,
            clean: false,
        }
    }
}

/// Validate build options before running.
pub fn validate_build_options(opts: &BuildOptions) -> Result<(), YoloprepError> {
    if !(0.0..=1.0).contains(&opts.train_ratio) {
        return Err(YoloprepError::InvalidOptions {
            message: format!(
                "train ratio must be in the interval [0.0, 1.0], got {}",
                opts.train_ratio
            ),
        });
    }

    let usable_extensions = opts
        .extensions
        .iter()
        .filter(|ext| !ext.trim_start_matches('.').trim().is_empty())
        .count();
    if usable_extensions == 0 {
        return Err(YoloprepError::InvalidOptions {
            message: "at least one image extension is required".to_string(),
        });
    }

    Ok(())
}

/// Build a dataset with the default centered-box labels.
pub fn build_dataset(opts: &BuildOptions) -> Result<BuildReport, YoloprepError> {
    build_dataset_with_estimator(opts, &CenteredBoxEstimator::new())
}

/// Build a dataset, taking boxes from `estimator`.
///
/// Returns an error only for invalid options or when the dataset layout or
/// descriptor cannot be written; every other problem ends up in the report.
pub fn build_dataset_with_estimator(
    opts: &BuildOptions,
    estimator: &dyn BoundingBoxEstimator,
) -> Result<BuildReport, YoloprepError> {
    validate_build_options(opts)?;

    let layout = DatasetLayout::create(&opts.dataset_root)?;
    let mut report = BuildReport::new(&opts.source_root, &opts.dataset_root);
    report.seed = opts.seed;

    if opts.clean {
        layout.clear_splits()?;
    } else {
        let existing = layout.existing_entries();
        if existing > 0 {
            warn!(
                "{} already holds {existing} file(s) from an earlier build; use clean to remove them",
                layout.root().display()
            );
            report.add(BuildIssue::warning(
                IssueCode::StaleOutput,
                format!("{existing} file(s) from an earlier build remain in the split directories"),
                IssueContext::Dataset,
            ));
        }
    }

    let configured = match ClassRegistry::new(&opts.classes) {
        Ok(registry) => registry,
        Err(err) => {
            warn!("class list rejected, building an empty dataset: {err}");
            report.add(BuildIssue::error(
                IssueCode::InvalidClassList,
                err.to_string(),
                IssueContext::Dataset,
            ));
            ClassRegistry::empty()
        }
    };

    let scans: Vec<ClassScan> = configured
        .entries()
        .iter()
        .map(|entry| scan_class(&opts.source_root, entry, &opts.extensions))
        .collect();

    let registry = if opts.keep_empty_classes {
        configured
    } else {
        configured.compact(|entry| scans[entry.numeric_id].image_count() > 0)
    };

    let records = scans.into_iter().fold(Vec::new(), |mut records, scan| {
        records.extend(record_scan(&mut report, &registry, scan));
        records
    });

    let split = split_records(records, opts.train_ratio, opts.seed);
    report.train.images = split.train.len();
    report.val.images = split.val.len();
    info!(
        "split {} image(s) into {} train / {} val",
        split.total(),
        split.train.len(),
        split.val.len()
    );

    if split.total() == 0 {
        warn!("no valid images found; writing an empty dataset");
        report.add(BuildIssue::warning(
            IssueCode::EmptyDataset,
            "no valid images were found in any class folder",
            IssueContext::Dataset,
        ));
    }

    let synthesizer = LabelSynthesizer::new(estimator);
    for kind in SplitKind::ALL {
        materialize_split(&layout, kind, split.get(kind), &synthesizer, &mut report);
    }

    let root = std::path::absolute(layout.root()).map_err(|source| {
        YoloprepError::DescriptorWrite {
            path: layout.descriptor_path(),
            message: format!("cannot resolve absolute dataset root: {source}"),
        }
    })?;
    let descriptor = DatasetDescriptor::new(root, registry.names());
    let descriptor_path = layout.descriptor_path();
    descriptor.write(&descriptor_path)?;
    info!("wrote dataset descriptor {}", descriptor_path.display());
    report.descriptor_path = Some(descriptor_path);

    Ok(report)
}

/// Fold one class scan into the report and turn its images into records.
fn record_scan(
    report: &mut BuildReport,
    registry: &ClassRegistry,
    scan: ClassScan,
) -> Vec<ImageRecord> {
    let entry = registry.by_source_key(&scan.source_key);

    let (status, images) = match scan.status {
        ScanStatus::Missing { dir } => {
            report.add(BuildIssue::warning(
                IssueCode::MissingSourceClass,
                format!("source folder not found: {}", dir.display()),
                IssueContext::Class {
                    source_key: scan.source_key.clone(),
                },
            ));
            (ClassStatus::Missing, Vec::new())
        }
        ScanStatus::Scanned { images, unreadable } => {
            for file in &unreadable {
                report.add(BuildIssue::warning(
                    IssueCode::UnreadableImage,
                    file.reason.clone(),
                    IssueContext::Image {
                        path: file.path.clone(),
                    },
                ));
            }
            let status = ClassStatus::Scanned {
                images: images.len(),
                unreadable: unreadable.len(),
            };
            (status, images)
        }
    };

    report.classes.push(ClassSummary {
        source_key: scan.source_key,
        display_name: scan.display_name,
        class_id: entry.map(|e| e.numeric_id),
        status,
    });

    let Some(entry) = entry else {
        return Vec::new();
    };

    images
        .into_iter()
        .map(|path| ImageRecord {
            path,
            class_id: entry.numeric_id,
            class_name: entry.display_name.clone(),
        })
        .collect()
}

/// Copy every record of one split and write its label.
fn materialize_split(
    layout: &DatasetLayout,
    kind: SplitKind,
    records: &[ImageRecord],
    synthesizer: &LabelSynthesizer<'_>,
    report: &mut BuildReport,
) {
    let images_dir = layout.images_dir(kind);
    let labels_dir = layout.labels_dir(kind);
    let mut written: HashMap<OsString, PathBuf> = HashMap::new();

    for record in records {
        let (Some(file_name), Some(stem)) = (record.path.file_name(), record.path.file_stem())
        else {
            continue;
        };

        if let Some(previous) = written.insert(file_name.to_os_string(), record.path.clone()) {
            warn!(
                "{} overwrites {} in images/{}",
                record.path.display(),
                previous.display(),
                kind.as_str()
            );
            report.add(BuildIssue::warning(
                IssueCode::FilenameCollision,
                format!(
                    "file name already used by {} in the {} split",
                    previous.display(),
                    kind.as_str()
                ),
                IssueContext::Image {
                    path: record.path.clone(),
                },
            ));
        }

        let dest = images_dir.join(file_name);
        if let Err(err) = fs::copy(&record.path, &dest) {
            warn!(
                "failed to copy {} to {}: {err}",
                record.path.display(),
                dest.display()
            );
            report.split_mut(kind).copy_failures += 1;
            report.add(BuildIssue::warning(
                IssueCode::CopyFailed,
                format!("copy to {} failed: {err}", dest.display()),
                IssueContext::Image {
                    path: record.path.clone(),
                },
            ));
            continue;
        }
        report.split_mut(kind).copied += 1;

        let mut label_name = stem.to_os_string();
        label_name.push(".");
        label_name.push(LABEL_EXTENSION);
        let label_path = labels_dir.join(label_name);

        match synthesizer.synthesize(&record.path, record.class_id, &label_path) {
            Ok(annotation) => {
                debug!("{} -> {}", label_path.display(), annotation);
                report.split_mut(kind).labels_written += 1;
            }
            Err(err) => {
                warn!("no label for {}: {err}", record.path.display());
                report.split_mut(kind).label_failures += 1;
                report.add(BuildIssue::warning(
                    IssueCode::LabelFailed,
                    err.to_string(),
                    IssueContext::Image {
                        path: record.path.clone(),
                    },
                ));
            }
        }
    }

    info!(
        "{} split: {} image(s) copied, {} label(s) written",
        kind.as_str(),
        report.split(kind).copied,
        report.split(kind).labels_written
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn write_images(dir: &Path, prefix: &str, count: usize, ext: &str) {
        fs::create_dir_all(dir).expect("create class dir");
        for i in 0..count {
            image::RgbImage::from_pixel(4, 4, image::Rgb([30, 60, 90]))
                .save(dir.join(format!("{prefix}_{i:02}.{ext}")))
                .expect("encode image");
        }
    }

    #[test]
    fn options_reject_bad_ratio_and_extensions() {
        let mut opts = BuildOptions::new("src", "dst", vec!["A-a".into()]);
        opts.train_ratio = 1.5;
        assert!(validate_build_options(&opts).is_err());

        opts.train_ratio = 0.8;
        opts.extensions = vec![".".into()];
        assert!(validate_build_options(&opts).is_err());
    }

    #[test]
    fn extension_filter_is_configurable() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let source = temp.path().join("train_data");
        write_images(&source.join("A-cat"), "cat", 3, "bmp");
        write_images(&source.join("A-cat"), "jpgcat", 2, "jpg");

        let mut opts = BuildOptions::new(&source, temp.path().join("dataset"), vec!["A-cat".into()]);
        opts.extensions = vec!["bmp".into()];
        let report = build_dataset(&opts).expect("build");

        assert_eq!(report.total_images(), 3);
    }

    #[test]
    fn keep_empty_classes_retains_configured_ids() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let source = temp.path().join("train_data");
        write_images(&source.join("B-dog"), "dog", 5, "jpg");

        let mut opts = BuildOptions::new(
            &source,
            temp.path().join("dataset"),
            vec!["A-cat".into(), "B-dog".into()],
        );
        opts.keep_empty_classes = true;
        opts.seed = Some(1);
        let report = build_dataset(&opts).expect("build");

        let descriptor =
            DatasetDescriptor::read(report.descriptor_path.as_deref().expect("descriptor"))
                .expect("read descriptor");
        assert_eq!(descriptor.names.len(), 2);
        assert_eq!(report.classes[1].class_id, Some(1));

        let label = fs::read_dir(temp.path().join("dataset/labels/train"))
            .expect("list labels")
            .next()
            .expect("one label")
            .expect("entry");
        let content = fs::read_to_string(label.path()).expect("read label");
        assert!(content.starts_with("1 "));
    }

    #[test]
    fn filename_collisions_are_reported() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let source = temp.path().join("train_data");
        write_images(&source.join("A-cat"), "same", 1, "jpg");
        write_images(&source.join("B-dog"), "same", 1, "jpg");

        let mut opts = BuildOptions::new(
            &source,
            temp.path().join("dataset"),
            vec!["A-cat".into(), "B-dog".into()],
        );
        opts.train_ratio = 1.0;
        let report = build_dataset(&opts).expect("build");

        assert_eq!(report.train.copied, 2);
        assert_eq!(report.issues_with(IssueCode::FilenameCollision).count(), 1);
        let copied = fs::read_dir(temp.path().join("dataset/images/train"))
            .expect("list images")
            .count();
        assert_eq!(copied, 1);
    }
}
