//! Handoff to an external object-detection trainer and exporter.
//!
//! Training and export are opaque, slow and fallible. The crate only builds
//! the parameter set, runs the collaborator once, and reports whether the
//! expected artifact appeared. There are no retries.

mod ultralytics;

pub use ultralytics::UltralyticsCli;

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::YoloprepError;

/// Compute device handed to the trainer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    Cpu,
    Cuda,
}

impl Device {
    pub fn as_str(self) -> &'static str {
        match self {
            Device::Cpu => "cpu",
            Device::Cuda => "cuda",
        }
    }

    /// Short tag used in run names.
    pub fn run_tag(self) -> &'static str {
        match self {
            Device::Cpu => "cpu",
            Device::Cuda => "gpu",
        }
    }
}

/// Optimizer and augmentation settings, passed through verbatim.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Hyperparameters {
    pub patience: u32,
    pub lr0: f64,
    pub lrf: f64,
    pub momentum: f64,
    pub weight_decay: f64,
    pub warmup_epochs: f64,
    pub warmup_momentum: f64,
    pub box_gain: f64,
    pub cls_gain: f64,
    pub dfl_gain: f64,
    pub hsv_h: f64,
    pub hsv_s: f64,
    pub hsv_v: f64,
    pub degrees: f64,
    pub translate: f64,
    pub scale: f64,
    pub shear: f64,
    pub perspective: f64,
    pub flipud: f64,
    pub fliplr: f64,
    pub mosaic: f64,
    pub mixup: f64,
    pub copy_paste: f64,
}

impl Hyperparameters {
    /// Defaults tuned for small edge models. Mixup and copy-paste are only
    /// enabled on CUDA.
    pub fn for_device(device: Device) -> Self {
        let gpu_only = if device == Device::Cuda { 0.5 } else { 0.0 };
        Self {
            patience: 10,
            lr0: 0.01,
            lrf: 0.01,
            momentum: 0.937,
            weight_decay: 0.0005,
            warmup_epochs: 3.0,
            warmup_momentum: 0.8,
            box_gain: 7.5,
            cls_gain: 0.5,
            dfl_gain: 1.5,
            hsv_h: 0.015,
            hsv_s: 0.7,
            hsv_v: 0.4,
            degrees: 0.0,
            translate: 0.1,
            scale: 0.5,
            shear: 0.0,
            perspective: 0.0,
            flipud: 0.0,
            fliplr: 0.5,
            mosaic: 1.0,
            mixup: gpu_only,
            copy_paste: gpu_only,
        }
    }

    /// `key=value` pairs in trainer argument syntax.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("patience", self.patience.to_string()),
            ("lr0", self.lr0.to_string()),
            ("lrf", self.lrf.to_string()),
            ("momentum", self.momentum.to_string()),
            ("weight_decay", self.weight_decay.to_string()),
            ("warmup_epochs", self.warmup_epochs.to_string()),
            ("warmup_momentum", self.warmup_momentum.to_string()),
            ("box", self.box_gain.to_string()),
            ("cls", self.cls_gain.to_string()),
            ("dfl", self.dfl_gain.to_string()),
            ("hsv_h", self.hsv_h.to_string()),
            ("hsv_s", self.hsv_s.to_string()),
            ("hsv_v", self.hsv_v.to_string()),
            ("degrees", self.degrees.to_string()),
            ("translate", self.translate.to_string()),
            ("scale", self.scale.to_string()),
            ("shear", self.shear.to_string()),
            ("perspective", self.perspective.to_string()),
            ("flipud", self.flipud.to_string()),
            ("fliplr", self.fliplr.to_string()),
            ("mosaic", self.mosaic.to_string()),
            ("mixup", self.mixup.to_string()),
            ("copy_paste", self.copy_paste.to_string()),
        ]
    }
}

/// Everything the trainer needs besides the descriptor.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrainConfig {
    /// Model definition or checkpoint, e.g. `yolov8n.yaml`.
    pub model: String,
    pub device: Device,
    pub epochs: u32,
    pub batch: u32,
    pub workers: u32,
    /// Square input size in pixels.
    pub imgsz: u32,
    pub cache: bool,
    pub amp: bool,
    pub save_period: u32,
    /// Parent directory for run outputs.
    pub project: PathBuf,
    /// Run directory name under `project`.
    pub name: String,
    pub hyperparameters: Hyperparameters,
}

/// Default input size: 160x160.
pub const DEFAULT_IMGSZ: u32 = 160;

impl TrainConfig {
    /// Defaults for `device`: larger batches, more workers, caching and AMP
    /// on CUDA.
    pub fn for_device(device: Device) -> Self {
        let cuda = device == Device::Cuda;
        Self {
            model: "yolov8n.yaml".to_string(),
            device,
            epochs: 50,
            batch: if cuda { 16 } else { 8 },
            workers: if cuda { 4 } else { 2 },
            imgsz: DEFAULT_IMGSZ,
            cache: cuda,
            amp: cuda,
            save_period: 10,
            project: PathBuf::from("runs/detect"),
            name: run_name(DEFAULT_IMGSZ, device),
            hyperparameters: Hyperparameters::for_device(device),
        }
    }

    /// Where the trainer leaves the best checkpoint.
    pub fn weights_path(&self) -> PathBuf {
        self.project
            .join(&self.name)
            .join("weights")
            .join("best.pt")
    }
}

/// Run directory name, e.g. `yolov8n_160_cpu`.
pub fn run_name(imgsz: u32, device: Device) -> String {
    format!("yolov8n_{}_{}", imgsz, device.run_tag())
}

/// Interchange format for exported models.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    #[default]
    Onnx,
    Torchscript,
}

impl ExportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Onnx => "onnx",
            ExportFormat::Torchscript => "torchscript",
        }
    }

    /// Extension of the exported file.
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Onnx => "onnx",
            ExportFormat::Torchscript => "torchscript",
        }
    }
}

/// Export settings. Static shapes and full precision for edge targets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExportConfig {
    pub format: ExportFormat,
    pub imgsz: u32,
    pub opset: u32,
    pub simplify: bool,
    pub dynamic: bool,
    pub half: bool,
    pub int8: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: ExportFormat::Onnx,
            imgsz: DEFAULT_IMGSZ,
            opset: 12,
            simplify: true,
            dynamic: false,
            half: false,
            int8: false,
        }
    }
}

/// Trains a model from a dataset descriptor.
pub trait Trainer {
    /// Returns the path of the trained model artifact.
    fn train(&self, descriptor_path: &Path, config: &TrainConfig)
        -> Result<PathBuf, YoloprepError>;
}

/// Converts a trained model to an interchange format.
pub trait Exporter {
    /// Returns the path of the exported file.
    fn export(&self, model_path: &Path, config: &ExportConfig) -> Result<PathBuf, YoloprepError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_defaults_differ() {
        let cpu = TrainConfig::for_device(Device::Cpu);
        let gpu = TrainConfig::for_device(Device::Cuda);

        assert_eq!((cpu.batch, cpu.workers), (8, 2));
        assert_eq!((gpu.batch, gpu.workers), (16, 4));
        assert!(!cpu.amp && gpu.amp);
        assert_eq!(cpu.hyperparameters.mixup, 0.0);
        assert_eq!(gpu.hyperparameters.copy_paste, 0.5);
        assert_eq!(cpu.name, "yolov8n_160_cpu");
        assert_eq!(gpu.name, "yolov8n_160_gpu");
    }

    #[test]
    fn weights_path_follows_run_layout() {
        let config = TrainConfig::for_device(Device::Cpu);
        assert_eq!(
            config.weights_path(),
            PathBuf::from("runs/detect/yolov8n_160_cpu/weights/best.pt")
        );
    }

    #[test]
    fn hyperparameter_pairs_use_trainer_keys() {
        let pairs = Hyperparameters::for_device(Device::Cpu).to_pairs();
        assert!(pairs.contains(&("box", "7.5".to_string())));
        assert!(pairs.contains(&("momentum", "0.937".to_string())));
        assert_eq!(pairs.len(), 23);
    }
}
