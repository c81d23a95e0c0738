//! Solid-colour reference images for smoke tests and demos.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{ImageFormat, Rgb, RgbImage};

use crate::error::Result;

/// Named colours covering each heuristic branch: three soils and three
/// leaf conditions.
pub const SOLID_FIXTURES: [(&str, [u8; 3]); 6] = [
    ("dark_soil", [30, 25, 20]),
    ("red_soil", [180, 80, 60]),
    ("bright_soil", [220, 210, 180]),
    ("green_leaf", [50, 160, 50]),
    ("brown_leaf", [150, 90, 50]),
    ("white_leaf", [230, 230, 225]),
];

/// Encode a `size` x `size` image of one colour as PNG.
pub fn solid_png(rgb: [u8; 3], size: u32) -> Result<Vec<u8>> {
    let img = RgbImage::from_pixel(size, size, Rgb(rgb));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}

/// Write every entry of [`SOLID_FIXTURES`] into `dir` as `<name>.png`.
pub fn write_solid_fixtures(dir: impl AsRef<Path>, size: u32) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(SOLID_FIXTURES.len());
    for (name, rgb) in SOLID_FIXTURES {
        let path = dir.join(format!("{}.png", name));
        RgbImage::from_pixel(size, size, Rgb(rgb)).save(&path)?;
        tracing::debug!(path = %path.display(), "Wrote fixture");
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid_png_decodes_to_same_colour() {
        let bytes = solid_png([50, 160, 50], 16).unwrap();
        let img = image::load_from_memory(&bytes).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (16, 16));
        assert_eq!(img.get_pixel(7, 7).0, [50, 160, 50]);
    }

    #[test]
    fn test_write_solid_fixtures() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_solid_fixtures(dir.path().join("fixtures"), 8).unwrap();
        assert_eq!(paths.len(), SOLID_FIXTURES.len());
        assert!(paths.iter().all(|p| p.is_file()));
        assert!(paths[0].ends_with("dark_soil.png"));
    }
}
