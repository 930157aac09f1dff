use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::info;

use super::{ExportConfig, Exporter, TrainConfig, Trainer};
use crate::error::YoloprepError;

/// Runs training and export through the Ultralytics `yolo` command line.
///
/// The child inherits stdout/stderr so progress stays visible.
#[derive(Clone, Debug)]
pub struct UltralyticsCli {
    program: OsString,
    leading_args: Vec<OsString>,
}

impl UltralyticsCli {
    /// Invoke `program` directly (usually `yolo`).
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    /// Invoke through a launcher, e.g. `uv run yolo`.
    pub fn with_launcher<I, S>(program: impl Into<OsString>, leading_args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            program: program.into(),
            leading_args: leading_args.into_iter().map(Into::into).collect(),
        }
    }

    /// The command `train` would run.
    pub fn train_command(&self, descriptor_path: &Path, config: &TrainConfig) -> Command {
        let mut cmd = self.base_command();
        cmd.args(["detect", "train"]);
        cmd.arg(kv("data", descriptor_path.display()));
        cmd.arg(kv("model", &config.model));
        cmd.arg(kv("epochs", config.epochs));
        cmd.arg(kv("imgsz", config.imgsz));
        cmd.arg(kv("batch", config.batch));
        cmd.arg(kv("workers", config.workers));
        cmd.arg(kv("device", config.device.as_str()));
        for (key, value) in config.hyperparameters.to_pairs() {
            cmd.arg(kv(key, value));
        }
        cmd.arg(kv("save", py_bool(true)));
        cmd.arg(kv("save_period", config.save_period));
        cmd.arg(kv("cache", py_bool(config.cache)));
        cmd.arg(kv("amp", py_bool(config.amp)));
        cmd.arg(kv("half", py_bool(false)));
        cmd.arg(kv("deterministic", py_bool(false)));
        cmd.arg(kv("project", config.project.display()));
        cmd.arg(kv("name", &config.name));
        cmd.arg(kv("exist_ok", py_bool(true)));
        cmd.arg(kv("verbose", py_bool(true)));
        cmd
    }

    /// The command `export` would run.
    pub fn export_command(&self, model_path: &Path, config: &ExportConfig) -> Command {
        let mut cmd = self.base_command();
        cmd.arg("export");
        cmd.arg(kv("model", model_path.display()));
        cmd.arg(kv("format", config.format.as_str()));
        cmd.arg(kv("imgsz", config.imgsz));
        cmd.arg(kv("opset", config.opset));
        cmd.arg(kv("simplify", py_bool(config.simplify)));
        cmd.arg(kv("dynamic", py_bool(config.dynamic)));
        cmd.arg(kv("half", py_bool(config.half)));
        cmd.arg(kv("int8", py_bool(config.int8)));
        cmd
    }

    fn base_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args);
        cmd
    }

    fn run(&self, stage: &'static str, mut cmd: Command) -> Result<(), YoloprepError> {
        info!("{stage}: running {:?}", cmd);
        let status = cmd.status().map_err(|source| YoloprepError::TrainerLaunch {
            program: self.program.to_string_lossy().into_owned(),
            source,
        })?;

        if !status.success() {
            return Err(YoloprepError::TrainerFailed {
                stage,
                status: status.to_string(),
            });
        }
        Ok(())
    }
}

impl Default for UltralyticsCli {
    fn default() -> Self {
        Self::new("yolo")
    }
}

impl Trainer for UltralyticsCli {
    fn train(
        &self,
        descriptor_path: &Path,
        config: &TrainConfig,
    ) -> Result<PathBuf, YoloprepError> {
        self.run("train", self.train_command(descriptor_path, config))?;

        let weights = config.weights_path();
        if !weights.is_file() {
            return Err(YoloprepError::ArtifactMissing {
                stage: "train",
                path: weights,
            });
        }
        info!("train: model artifact at {}", weights.display());
        Ok(weights)
    }
}

impl Exporter for UltralyticsCli {
    fn export(&self, model_path: &Path, config: &ExportConfig) -> Result<PathBuf, YoloprepError> {
        self.run("export", self.export_command(model_path, config))?;

        let exported = model_path.with_extension(config.format.extension());
        if !exported.exists() {
            return Err(YoloprepError::ArtifactMissing {
                stage: "export",
                path: exported,
            });
        }
        info!("export: wrote {}", exported.display());
        Ok(exported)
    }
}

fn kv(key: &str, value: impl std::fmt::Display) -> String {
    format!("{key}={value}")
}

fn py_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}
