//! YOLO label synthesis.
//!
//! A label file holds one line per box: `class_id x_center y_center width
//! height`, with coordinates normalized to the image size. For class-folder
//! datasets there is no real localization, so the box comes from a
//! [`BoundingBoxEstimator`].

mod estimator;

pub use estimator::{BoundingBoxEstimator, CenteredBoxEstimator, DEFAULT_BOX_FRACTION};

use std::fmt;
use std::fs;
use std::path::Path;

use image::ImageReader;

use crate::error::YoloprepError;

/// Extension used for label files.
pub const LABEL_EXTENSION: &str = "txt";

/// A YOLO-normalized bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Annotation {
    pub class_id: usize,
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
}

impl Annotation {
    /// True when the center lies in `[0, 1]` and the size in `(0, 1]`.
    pub fn is_normalized(&self) -> bool {
        let unit = |v: f64| (0.0..=1.0).contains(&v);
        let size = |v: f64| v > 0.0 && v <= 1.0;
        unit(self.x_center) && unit(self.y_center) && size(self.width) && size(self.height)
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.class_id, self.x_center, self.y_center, self.width, self.height
        )
    }
}

/// Pixel dimensions read from an image header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

/// Read an image's dimensions from its header.
///
/// Zero-byte files, unrecognized formats, truncated headers and zero-sized
/// images are all reported as [`YoloprepError::UnreadableImage`].
pub fn probe_image(path: &Path) -> Result<ImageDimensions, YoloprepError> {
    let unreadable = |message: String| YoloprepError::UnreadableImage {
        path: path.to_path_buf(),
        message,
    };

    let size = imagesize::size(path).map_err(|source| unreadable(source.to_string()))?;

    let width: u32 = size
        .width
        .try_into()
        .map_err(|_| unreadable(format!("width {} does not fit in u32", size.width)))?;
    let height: u32 = size
        .height
        .try_into()
        .map_err(|_| unreadable(format!("height {} does not fit in u32", size.height)))?;

    if width == 0 || height == 0 {
        return Err(unreadable(format!("zero-sized image {width}x{height}")));
    }

    Ok(ImageDimensions { width, height })
}

/// Fully decode an image and return its dimensions.
///
/// Unlike [`probe_image`] this catches files whose header is intact but whose
/// pixel data cannot be decoded.
pub fn verify_image(path: &Path) -> Result<ImageDimensions, YoloprepError> {
    let unreadable = |message: String| YoloprepError::UnreadableImage {
        path: path.to_path_buf(),
        message,
    };

    let decoded = ImageReader::open(path)
        .map_err(|source| unreadable(source.to_string()))?
        .with_guessed_format()
        .map_err(|source| unreadable(source.to_string()))?
        .decode()
        .map_err(|source| unreadable(format!("cannot decode: {source}")))?;

    let (width, height) = (decoded.width(), decoded.height());
    if width == 0 || height == 0 {
        return Err(unreadable(format!("zero-sized image {width}x{height}")));
    }

    Ok(ImageDimensions { width, height })
}

/// Writes one label file per image using a box estimator.
pub struct LabelSynthesizer<'a> {
    estimator: &'a dyn BoundingBoxEstimator,
}

impl<'a> LabelSynthesizer<'a> {
    pub fn new(estimator: &'a dyn BoundingBoxEstimator) -> Self {
        Self { estimator }
    }

    /// Probe `image_path`, estimate its box and write it to `label_path`.
    ///
    /// Nothing is written when the image cannot be read.
    pub fn synthesize(
        &self,
        image_path: &Path,
        class_id: usize,
        label_path: &Path,
    ) -> Result<Annotation, YoloprepError> {
        let dimensions = probe_image(image_path)?;
        let annotation = self.estimator.estimate(image_path, dimensions, class_id)?;

        fs::write(label_path, format!("{annotation}\n")).map_err(|source| {
            YoloprepError::LabelWrite {
                path: label_path.to_path_buf(),
                source,
            }
        })?;

        Ok(annotation)
    }
}

/// Parse one label line. Blank lines yield `Ok(None)`.
pub fn parse_label_line(
    line: &str,
    file_path: &Path,
    line_num: usize,
) -> Result<Option<Annotation>, YoloprepError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let parse_error = |message: String| YoloprepError::LabelParse {
        path: file_path.to_path_buf(),
        line: line_num,
        message,
    };

    // Bounded so that pathological lines do not allocate without limit.
    let tokens: Vec<&str> = trimmed.split_whitespace().take(6).collect();
    if tokens.len() != 5 {
        let found = if tokens.len() > 5 {
            "more than 5".to_string()
        } else {
            tokens.len().to_string()
        };
        return Err(parse_error(format!("expected 5 tokens, found {found}")));
    }

    let class_id = tokens[0].parse::<usize>().map_err(|_| {
        parse_error(format!(
            "invalid class_id '{}'; expected non-negative integer",
            tokens[0]
        ))
    })?;

    let mut coords = [0.0f64; 4];
    let fields = ["x_center", "y_center", "width", "height"];
    for (slot, (raw, field)) in coords.iter_mut().zip(tokens[1..].iter().zip(fields)) {
        *slot = raw.parse::<f64>().map_err(|_| {
            parse_error(format!(
                "invalid {field} '{raw}'; expected floating-point number"
            ))
        })?;
    }

    Ok(Some(Annotation {
        class_id,
        x_center: coords[0],
        y_center: coords[1],
        width: coords[2],
        height: coords[3],
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// SOF header only, no scan data: enough for `probe_image`, not for a decoder.
    fn jpeg_header(width: u16, height: u16) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xC0, 0x00, 0x11, 0x08];
        bytes.extend_from_slice(&height.to_be_bytes());
        bytes.extend_from_slice(&width.to_be_bytes());
        bytes.extend_from_slice(&[0x03, 0x01, 0x22, 0x00, 0x02, 0x11, 0x01, 0x03, 0x11, 0x01]);
        bytes.extend_from_slice(&[0xFF, 0xD9]);
        bytes
    }

    fn write_jpeg(path: &Path, width: u32, height: u32) {
        image::RgbImage::from_pixel(width, height, image::Rgb([200, 80, 40]))
            .save(path)
            .expect("encode jpeg");
    }

    #[test]
    fn verify_decodes_real_jpeg() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("a.jpg");
        write_jpeg(&path, 20, 12);

        let dims = verify_image(&path).expect("verify");
        assert_eq!(
            dims,
            ImageDimensions {
                width: 20,
                height: 12
            }
        );
    }

    #[test]
    fn verify_rejects_intact_header_with_corrupt_body() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("corrupt.jpg");
        let mut bytes = jpeg_header(32, 24);
        bytes.truncate(bytes.len() - 2);
        bytes.extend_from_slice(b"garbage garbage");
        fs::write(&path, bytes).expect("write corrupt jpeg");

        assert!(probe_image(&path).is_ok());
        assert!(matches!(
            verify_image(&path),
            Err(YoloprepError::UnreadableImage { .. })
        ));
    }

    #[test]
    fn probe_reads_jpeg_header() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("a.jpg");
        fs::write(&path, jpeg_header(32, 24)).expect("write jpeg");

        let dims = probe_image(&path).expect("probe");
        assert_eq!(
            dims,
            ImageDimensions {
                width: 32,
                height: 24
            }
        );
    }

    #[test]
    fn probe_rejects_zero_byte_and_garbage() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let empty = temp.path().join("empty.jpg");
        let garbage = temp.path().join("garbage.jpg");
        fs::write(&empty, b"").expect("write empty");
        fs::write(&garbage, b"definitely not an image").expect("write garbage");

        assert!(matches!(
            probe_image(&empty),
            Err(YoloprepError::UnreadableImage { .. })
        ));
        assert!(matches!(
            probe_image(&garbage),
            Err(YoloprepError::UnreadableImage { .. })
        ));
    }

    #[test]
    fn probe_rejects_zero_dimensions() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("flat.jpg");
        fs::write(&path, jpeg_header(0, 10)).expect("write jpeg");

        assert!(probe_image(&path).is_err());
    }

    #[test]
    fn synthesize_writes_single_line() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let image = temp.path().join("img.jpg");
        let label = temp.path().join("img.txt");
        write_jpeg(&image, 16, 16);

        let estimator = CenteredBoxEstimator::new();
        let ann = LabelSynthesizer::new(&estimator)
            .synthesize(&image, 4, &label)
            .expect("synthesize");

        assert_eq!(ann.class_id, 4);
        assert_eq!(
            fs::read_to_string(&label).expect("read label"),
            "4 0.5 0.5 0.8 0.8\n"
        );
    }

    #[test]
    fn synthesize_writes_nothing_for_unreadable_image() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let image = temp.path().join("broken.jpg");
        let label = temp.path().join("broken.txt");
        fs::write(&image, b"").expect("write empty");

        let estimator = CenteredBoxEstimator::new();
        let result = LabelSynthesizer::new(&estimator).synthesize(&image, 0, &label);

        assert!(result.is_err());
        assert!(!label.exists());
    }

    #[test]
    fn parse_label_line_accepts_valid_rows() {
        let parsed = parse_label_line("2 0.5 0.25 0.3 0.1", Path::new("a.txt"), 1)
            .expect("parse should succeed")
            .expect("line should produce a row");

        assert_eq!(
            parsed,
            Annotation {
                class_id: 2,
                x_center: 0.5,
                y_center: 0.25,
                width: 0.3,
                height: 0.1,
            }
        );
    }

    #[test]
    fn parse_label_line_rejects_wrong_token_counts() {
        assert!(parse_label_line("0 0.1 0.2", Path::new("a.txt"), 1).is_err());
        assert!(parse_label_line("0 0.1 0.2 0.3 0.4 0.5", Path::new("a.txt"), 1).is_err());
        assert!(parse_label_line("x 0.1 0.2 0.3 0.4", Path::new("a.txt"), 1).is_err());
        assert!(parse_label_line("   ", Path::new("a.txt"), 1)
            .expect("blank")
            .is_none());
    }

    #[test]
    fn normalized_check_rejects_zero_size() {
        let ann = Annotation {
            class_id: 0,
            x_center: 0.5,
            y_center: 0.5,
            width: 0.0,
            height: 0.5,
        };
        assert!(!ann.is_normalized());
    }
}
