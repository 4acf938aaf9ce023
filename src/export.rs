use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use image::RgbaImage;
use thiserror::Error;

use crate::raster::Canvas;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("frame buffer of {len} bytes does not fit {width}x{height}")]
    BufferSize { width: u32, height: u32, len: usize },
    #[error("snapshot directory {0:?} does not exist")]
    MissingDir(PathBuf),
    #[error("failed to encode snapshot: {0}")]
    Image(#[from] image::ImageError),
}

/// Convert a canvas into an owned RGBA image.
pub fn to_image(canvas: &Canvas) -> Result<RgbaImage, ExportError> {
    let bytes = canvas.as_bytes().to_vec();
    let len = bytes.len();
    RgbaImage::from_raw(canvas.width(), canvas.height(), bytes).ok_or(ExportError::BufferSize {
        width: canvas.width(),
        height: canvas.height(),
        len,
    })
}

/// Save `canvas` to an explicit PNG path.
pub fn save_png(canvas: &Canvas, path: &Path) -> Result<(), ExportError> {
    to_image(canvas)?.save(path)?;
    log::info!("saved {}x{} frame to {}", canvas.width(), canvas.height(), path.display());
    Ok(())
}

/// Save `canvas` into `dir` under a timestamped name and return the path.
pub fn save_snapshot(canvas: &Canvas, dir: &Path) -> Result<PathBuf, ExportError> {
    if !dir.is_dir() {
        return Err(ExportError::MissingDir(dir.to_path_buf()));
    }
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let path = dir.join(format!("harmonograph_{stamp}.png"));
    save_png(canvas, &path)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::BLACK;

    #[test]
    fn test_to_image_keeps_pixels() {
        let mut canvas = Canvas::filled(3, 2, BLACK);
        canvas.fill_rect(
            &glam::DAffine2::IDENTITY,
            glam::DVec2::new(1.0, 1.0),
            glam::DVec2::new(1.0, 1.0),
            [10, 20, 30, 255],
        );
        let img = to_image(&canvas).unwrap();
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.get_pixel(1, 1).0, [10, 20, 30, 255]);
        assert_eq!(img.get_pixel(0, 0).0, BLACK);
    }

    #[test]
    fn test_snapshot_into_missing_dir_fails() {
        let canvas = Canvas::filled(2, 2, BLACK);
        let dir = std::env::temp_dir().join("harmonograph-does-not-exist-7f3a");
        let err = save_snapshot(&canvas, &dir).unwrap_err();
        assert!(matches!(err, ExportError::MissingDir(_)));
    }

    #[test]
    fn test_snapshot_roundtrips_through_png() {
        let canvas = Canvas::filled(4, 4, [1, 2, 3, 255]);
        let path = save_snapshot(&canvas, &std::env::temp_dir()).unwrap();
        let back = image::open(&path).unwrap().to_rgba8();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(back.dimensions(), (4, 4));
        assert_eq!(back.get_pixel(3, 3).0, [1, 2, 3, 255]);
    }
}
