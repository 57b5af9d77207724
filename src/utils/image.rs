//! Utility functions for image I/O.
//!
//! This module provides the filesystem boundary of the pipeline: loading
//! input photographs, listing the images in a directory and writing the
//! composed canvases back out.

use crate::core::errors::MatteError;
use image::{DynamicImage, RgbImage};
use std::path::{Path, PathBuf};

/// File extensions accepted as input, compared case-insensitively.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Converts a DynamicImage to an RgbImage.
pub fn dynamic_to_rgb(img: DynamicImage) -> RgbImage {
    img.to_rgb8()
}

/// Loads an image from a file path and converts it to RgbImage.
///
/// # Errors
///
/// Returns `MatteError::ImageLoad` if the file cannot be opened or decoded.
pub fn load_image(path: &Path) -> Result<RgbImage, MatteError> {
    let img = image::open(path).map_err(MatteError::ImageLoad)?;
    Ok(dynamic_to_rgb(img))
}

/// Writes `image` to `path`, picking the encoder from the extension.
pub fn save_image(image: &RgbImage, path: &Path) -> Result<(), MatteError> {
    image
        .save(path)
        .map_err(|e| MatteError::image_save(path, e))
}

/// Whether `path` has one of the [`SUPPORTED_EXTENSIONS`].
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

/// Lists the supported image files directly inside `dir`, sorted by path.
///
/// Subdirectories are not descended into.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>, MatteError> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_supported_image(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(is_supported_image(Path::new("a/b/photo.JPG")));
        assert!(is_supported_image(Path::new("scan.png")));
        assert!(is_supported_image(Path::new("r_001.jpeg")));
        assert!(!is_supported_image(Path::new("transforms.json")));
        assert!(!is_supported_image(Path::new("noext")));
    }

    #[test]
    fn list_images_sorts_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.jpg", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.png")).unwrap();

        let listed = list_images(dir.path()).unwrap();
        let names: Vec<_> = listed
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.png"]);
    }

    #[test]
    fn load_image_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"not a jpeg").unwrap();
        assert!(matches!(load_image(&path), Err(MatteError::ImageLoad(_))));
    }

    #[test]
    fn save_then_load_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let img = RgbImage::from_pixel(3, 2, image::Rgb([10, 20, 30]));
        save_image(&img, &path).unwrap();
        assert_eq!(load_image(&path).unwrap(), img);
    }
}
