//! yoloprep: turn class-folder image trees into YOLO detection datasets.
//!
//! A source tree with one folder per class (`train_data/A-firearms/*.jpg`)
//! becomes a YOLO dataset with `images/{train,val}`, `labels/{train,val}` and
//! a `data.yaml` descriptor. Since class folders carry no box positions,
//! labels come from a pluggable [`label::BoundingBoxEstimator`]; the default
//! assumes the subject fills the central 80% of the frame.
//!
//! # Modules
//!
//! - [`registry`]: class folder names to contiguous class ids
//! - [`label`]: label synthesis and label-line parsing
//! - [`builder`]: scanning, splitting, copying and descriptor writing
//! - [`descriptor`]: the `data.yaml` model
//! - [`check`]: consistency check of a built dataset
//! - [`trainer`]: handoff to an external trainer/exporter
//! - [`config`]: optional YAML configuration
//! - [`error`]: error types for yoloprep operations

pub mod builder;
pub mod check;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod label;
pub mod registry;
pub mod trainer;

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use log::info;

pub use error::YoloprepError;

use builder::BuildReport;
use config::{BuildOverrides, PipelineConfig, DEFAULT_DATASET_ROOT};
use descriptor::DESCRIPTOR_FILE_NAME;
use trainer::{Device, ExportConfig, ExportFormat, Exporter, TrainConfig, Trainer, UltralyticsCli};

/// The yoloprep CLI application.
#[derive(Parser)]
#[command(name = "yoloprep")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Build a YOLO dataset from class folders.
    Prepare(PrepareArgs),
    /// Check a built dataset for missing or malformed labels.
    Check(CheckArgs),
    /// Build a dataset, train a model on it and export the model.
    Train(TrainArgs),
}

/// Output format for reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

/// Arguments for the prepare subcommand.
#[derive(clap::Args)]
struct PrepareArgs {
    /// Directory holding one folder per class [default: train_data].
    #[arg(long, env = "YOLOPREP_SOURCE")]
    source: Option<PathBuf>,

    /// Directory the dataset is written to [default: dataset].
    #[arg(long, env = "YOLOPREP_OUTPUT")]
    output: Option<PathBuf>,

    /// Ordered, comma-separated class folder names; position is the class id.
    #[arg(long, value_delimiter = ',')]
    classes: Vec<String>,

    /// YAML config file; flags given here take precedence.
    #[arg(long, env = "YOLOPREP_CONFIG")]
    config: Option<PathBuf>,

    /// Share of images for the training split [default: 0.8].
    #[arg(long, value_parser = parse_ratio)]
    train_ratio: Option<f64>,

    /// Shuffle seed for a reproducible split.
    #[arg(long)]
    seed: Option<u64>,

    /// Accepted image extensions, comma-separated [default: jpg].
    #[arg(long = "ext", value_delimiter = ',')]
    extensions: Vec<String>,

    /// Keep classes without images in data.yaml instead of renumbering.
    #[arg(long)]
    keep_empty_classes: bool,

    /// Empty images/ and labels/ split directories before copying.
    #[arg(long)]
    clean: bool,

    /// Output format for the build summary.
    #[arg(long, value_enum, default_value = "text")]
    report: ReportFormat,
}

/// Arguments for the check subcommand.
#[derive(clap::Args)]
struct CheckArgs {
    /// Dataset root containing data.yaml.
    #[arg(default_value = DEFAULT_DATASET_ROOT)]
    dataset: PathBuf,

    /// Treat warnings as errors (exit non-zero if any warnings).
    #[arg(long)]
    strict: bool,

    /// Output format for the report.
    #[arg(long, value_enum, default_value = "text")]
    report: ReportFormat,
}

/// Arguments for the train subcommand.
#[derive(clap::Args)]
struct TrainArgs {
    #[command(flatten)]
    prepare: PrepareArgs,

    /// Training device.
    #[arg(long, value_enum, default_value = "cpu")]
    device: Device,

    /// Number of training epochs.
    #[arg(long, default_value_t = 50)]
    epochs: u32,

    /// Batch size [default: 8 on cpu, 16 on cuda].
    #[arg(long)]
    batch: Option<u32>,

    /// Square input size in pixels.
    #[arg(long, default_value_t = trainer::DEFAULT_IMGSZ)]
    imgsz: u32,

    /// Model definition or checkpoint.
    #[arg(long, default_value = "yolov8n.yaml")]
    model: String,

    /// Parent directory for training runs.
    #[arg(long, default_value = "runs/detect")]
    project: PathBuf,

    /// Run name [default: yolov8n_<imgsz>_<cpu|gpu>].
    #[arg(long)]
    name: Option<String>,

    /// Trainer executable.
    #[arg(long, default_value = "yolo", env = "YOLOPREP_YOLO_BIN")]
    yolo_bin: String,

    /// Export format for the trained model.
    #[arg(long, value_enum, default_value = "onnx")]
    export_format: ExportFormat,

    /// Stop after training.
    #[arg(long)]
    skip_export: bool,

    /// Copy the exported model to this file or directory.
    #[arg(long)]
    deploy_to: Option<PathBuf>,
}

/// Run the yoloprep CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), YoloprepError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Prepare(args)) => run_prepare(args).map(|_| ()),
        Some(Commands::Check(args)) => run_check(args),
        Some(Commands::Train(args)) => run_train(args),
        None => {
            println!("yoloprep {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Assemble class-folder images into YOLO detection datasets.");
            println!();
            println!("Run 'yoloprep --help' for usage information.");
            Ok(())
        }
    }
}

fn parse_ratio(raw: &str) -> Result<f64, String> {
    match raw.parse::<f64>() {
        Ok(value) if (0.0..=1.0).contains(&value) => Ok(value),
        _ => Err("ratio must be between 0.0 and 1.0".to_string()),
    }
}

/// Execute the prepare subcommand and print its summary.
fn run_prepare(args: PrepareArgs) -> Result<BuildReport, YoloprepError> {
    let file = match &args.config {
        Some(path) => Some(PipelineConfig::load(path)?),
        None => None,
    };

    let overrides = BuildOverrides {
        source: args.source,
        output: args.output,
        classes: args.classes,
        train_ratio: args.train_ratio,
        seed: args.seed,
        extensions: args.extensions,
        keep_empty_classes: args.keep_empty_classes,
        clean: args.clean,
    };
    let opts = config::resolve_build_options(overrides, file);

    info!(
        "building dataset from {} into {}",
        opts.source_root.display(),
        opts.dataset_root.display()
    );
    let report = builder::build_dataset(&opts)?;

    match args.report {
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        ReportFormat::Text => print!("{}", report),
    }

    Ok(report)
}

/// Execute the check subcommand.
fn run_check(args: CheckArgs) -> Result<(), YoloprepError> {
    let opts = check::CheckOptions {
        strict: args.strict,
        ..Default::default()
    };
    let report = check::check_dataset(&args.dataset, &opts);

    match args.report {
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        ReportFormat::Text => print!("{}", report),
    }

    let has_errors = report.error_count() > 0;
    let has_warnings = report.warning_count() > 0;

    if has_errors || (opts.strict && has_warnings) {
        Err(YoloprepError::CheckFailed {
            error_count: report.error_count(),
            warning_count: report.warning_count(),
            report,
        })
    } else {
        Ok(())
    }
}

/// Execute the train subcommand: prepare, train, export, deploy.
fn run_train(args: TrainArgs) -> Result<(), YoloprepError> {
    let report = run_prepare(args.prepare)?;
    if report.total_images() == 0 {
        return Err(YoloprepError::NothingToTrain {
            path: report.dataset_root.clone(),
        });
    }

    let descriptor_path = report
        .descriptor_path
        .clone()
        .unwrap_or_else(|| report.dataset_root.join(DESCRIPTOR_FILE_NAME));

    let mut config = TrainConfig::for_device(args.device);
    config.model = args.model;
    config.epochs = args.epochs;
    config.imgsz = args.imgsz;
    config.project = args.project;
    config.name = args
        .name
        .unwrap_or_else(|| trainer::run_name(args.imgsz, args.device));
    if let Some(batch) = args.batch {
        config.batch = batch;
    }

    let cli = UltralyticsCli::new(&args.yolo_bin);
    info!(
        "training on {} ({} epochs, batch {}, imgsz {})",
        args.device.as_str(),
        config.epochs,
        config.batch,
        config.imgsz
    );
    let weights = cli.train(&descriptor_path, &config)?;
    println!("Trained model: {}", weights.display());

    if args.skip_export {
        return Ok(());
    }

    let export = ExportConfig {
        format: args.export_format,
        imgsz: args.imgsz,
        ..Default::default()
    };
    let exported = cli.export(&weights, &export)?;
    println!(
        "Exported model: {} (input {}x{}, {} class(es))",
        exported.display(),
        export.imgsz,
        export.imgsz,
        report.registered_class_count()
    );

    if let Some(target) = args.deploy_to {
        let deployed = deploy_model(&exported, &target)?;
        println!("Deployed model: {}", deployed.display());
    }

    Ok(())
}

/// Copy an exported model to `target`, which may be a directory.
fn deploy_model(exported: &Path, target: &Path) -> Result<PathBuf, YoloprepError> {
    let dest = match exported.file_name() {
        Some(name) if target.is_dir() => target.join(name),
        _ => target.to_path_buf(),
    };
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::copy(exported, &dest)?;
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_parser_bounds() {
        assert_eq!(parse_ratio("0.8"), Ok(0.8));
        assert!(parse_ratio("1.2").is_err());
        assert!(parse_ratio("abc").is_err());
    }

    #[test]
    fn deploy_into_directory_keeps_file_name() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let exported = temp.path().join("best.onnx");
        fs::write(&exported, b"model").expect("write model");
        let target = temp.path().join("deploy");
        fs::create_dir_all(&target).expect("create target");

        let dest = deploy_model(&exported, &target).expect("deploy");
        assert_eq!(dest, target.join("best.onnx"));
        assert_eq!(fs::read(dest).expect("read"), b"model");
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
