//! PNG output for composited sprites.

use std::fs;
use std::path::Path;

use image::RgbaImage;

use crate::error::{MontageError, Result};

/// Write a composited image to a PNG file.
///
/// Missing parent directories are created. Permission failures on either
/// the directory or the file are reported as `TargetNotWritable`.
pub fn write_png(image: &RgbaImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| MontageError::write_failed(parent, e))?;

        let readonly = fs::metadata(parent)
            .map(|m| m.permissions().readonly())
            .unwrap_or(false);
        if readonly {
            return Err(MontageError::TargetNotWritable {
                path: parent.to_path_buf(),
            });
        }
    }

    image
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|e| match e {
            image::ImageError::IoError(io) => MontageError::write_failed(path, io),
            other => MontageError::Image {
                path: path.to_path_buf(),
                message: format!("Failed to write PNG: {}", other),
            },
        })
}
