#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

/// Encode a small solid-color JPEG at `path`.
pub fn write_jpeg(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    image::RgbImage::from_pixel(width, height, image::Rgb([120, 90, 60]))
        .save(path)
        .expect("encode jpeg file");
}

/// A JPEG whose SOF header is intact but whose body is not decodable.
pub fn write_corrupt_jpeg(path: &Path, width: u16, height: u16) {
    let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xC0, 0x00, 0x11, 0x08];
    bytes.extend_from_slice(&height.to_be_bytes());
    bytes.extend_from_slice(&width.to_be_bytes());
    bytes.extend_from_slice(&[0x03, 0x01, 0x22, 0x00, 0x02, 0x11, 0x01, 0x03, 0x11, 0x01]);
    bytes.extend_from_slice(b"garbage garbage");

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, bytes).expect("write corrupt jpeg");
}

/// Fill `source/<class_key>/` with `count` small JPEGs named `img_NN.jpg`.
pub fn populate_class(source: &Path, class_key: &str, count: usize) -> Vec<PathBuf> {
    (0..count)
        .map(|i| {
            let path = source.join(class_key).join(format!("img_{i:02}.jpg"));
            write_jpeg(&path, 64, 48);
            path
        })
        .collect()
}

/// Sorted file names in `dir`.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("read dir")
        .map(|entry| {
            entry
                .expect("dir entry")
                .file_name()
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    names.sort();
    names
}
