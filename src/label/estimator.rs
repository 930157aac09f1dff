//! Bounding box estimation for images that carry only a class label.

use std::path::Path;

use super::{Annotation, ImageDimensions};
use crate::error::YoloprepError;

/// Produces a box for an image whose only known fact is its class.
///
/// The dataset builder calls this once per image after the image has been
/// probed successfully. Implementations backed by a real annotation source
/// can read whatever they need from `image_path`.
pub trait BoundingBoxEstimator {
    fn estimate(
        &self,
        image_path: &Path,
        dimensions: ImageDimensions,
        class_id: usize,
    ) -> Result<Annotation, YoloprepError>;
}

/// Default box fraction: the subject is assumed to fill 80% of each axis.
pub const DEFAULT_BOX_FRACTION: f64 = 0.8;

/// Emits a box centered in the frame covering a fixed fraction of each axis.
///
/// This is a placeholder for real annotation, not object detection. It
/// assumes the subject fills the frame, so images with small or off-center
/// subjects are silently mislabeled.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CenteredBoxEstimator {
    fraction: f64,
}

impl CenteredBoxEstimator {
    pub fn new() -> Self {
        Self {
            fraction: DEFAULT_BOX_FRACTION,
        }
    }

    /// Use a different box fraction; must be in `(0, 1]`.
    pub fn with_fraction(fraction: f64) -> Result<Self, YoloprepError> {
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(YoloprepError::InvalidOptions {
                message: format!("box fraction must be in (0.0, 1.0], got {fraction}"),
            });
        }
        Ok(Self { fraction })
    }

    pub fn fraction(&self) -> f64 {
        self.fraction
    }
}

impl Default for CenteredBoxEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl BoundingBoxEstimator for CenteredBoxEstimator {
    fn estimate(
        &self,
        _image_path: &Path,
        _dimensions: ImageDimensions,
        class_id: usize,
    ) -> Result<Annotation, YoloprepError> {
        Ok(Annotation {
            class_id,
            x_center: 0.5,
            y_center: 0.5,
            width: self.fraction,
            height: self.fraction,
        })
    }
}
