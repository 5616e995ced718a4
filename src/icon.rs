//! Source icon loading and pixel-geometry helpers.
//!
//! A [`SkillIcon`] is a validated 32x32 RGBA source image whose identity is
//! its file stem. Validation happens once at construction so the rest of
//! the pipeline can treat icons as well-formed.

use std::path::Path;

use image::{DynamicImage, Rgba, RgbaImage};
use log::warn;

use crate::error::{Error, Result};

/// Edge length of every source icon and every produced artifact.
pub const ICON_SIZE: u32 = 32;

/// A single source skill icon.
///
/// Invariant: the buffer is exactly [`ICON_SIZE`] x [`ICON_SIZE`] and the
/// source file carried an alpha channel. Both are checked at construction;
/// a `SkillIcon` in hand is always safe to mask and combine.
#[derive(Debug, Clone, PartialEq)]
pub struct SkillIcon {
    stem: String,
    data: RgbaImage,
}

impl SkillIcon {
    /// Validates a decoded image and wraps it as a skill icon.
    ///
    /// The dynamic image is checked before conversion: its dimensions must
    /// be exactly 32x32 and its color type must carry alpha.
    pub fn from_dynamic(stem: impl Into<String>, image: DynamicImage) -> Result<Self> {
        let stem = stem.into();
        let (width, height) = (image.width(), image.height());
        let color = image.color();

        if width != ICON_SIZE || height != ICON_SIZE {
            return Err(Error::InvalidDimensions {
                name: stem,
                width,
                height,
                channels: color.channel_count(),
            });
        }
        if !color.has_alpha() {
            return Err(Error::MissingAlphaChannel { name: stem });
        }

        Ok(Self {
            stem,
            data: image.to_rgba8(),
        })
    }

    /// Loads and validates one icon file.
    pub fn load(path: &Path) -> Result<Self> {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let image = image::open(path).map_err(|source| Error::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_dynamic(stem, image)
    }

    /// The icon's identity: its filename without extension.
    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// The icon's pixel buffer. Read-only; masking produces copies.
    pub fn data(&self) -> &RgbaImage {
        &self.data
    }
}

/// Loads every raster image in a directory as a skill icon.
///
/// Files whose extension the decoder does not recognize are ignored.
/// Icons that fail to decode or validate are logged and skipped (siblings
/// still load); a duplicate stem across extensions keeps the first file in
/// sorted order and skips the rest. Directory-level I/O errors propagate.
pub fn load_dir(dir: &Path) -> Result<Vec<SkillIcon>> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)?
        .collect::<std::io::Result<Vec<_>>>()?
        .into_iter()
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(image::ImageFormat::from_extension)
                    .is_some()
        })
        .collect();
    paths.sort();

    let mut icons: Vec<SkillIcon> = Vec::with_capacity(paths.len());
    for path in &paths {
        match SkillIcon::load(path) {
            Ok(icon) => {
                if icons.iter().any(|existing| existing.stem() == icon.stem()) {
                    warn!(
                        "duplicate icon stem `{}`, skipping {}",
                        icon.stem(),
                        path.display()
                    );
                } else {
                    icons.push(icon);
                }
            }
            Err(err) if err.is_per_unit() => {
                warn!("skipping {}: {err}", path.display());
            }
            Err(err) => return Err(err),
        }
    }
    Ok(icons)
}

/// Decodes an image file straight to RGBA. Used for the static UI assets,
/// where any failure is fatal to the run.
pub(crate) fn open_rgba(path: &Path) -> Result<RgbaImage> {
    let image = image::open(path).map_err(|source| Error::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(image.to_rgba8())
}

// ============================================================================
// Geometry helpers
// ============================================================================

/// Offset that centers an `inner` rectangle within an `outer` one.
///
/// Integer division, biased toward the top-left for odd differences.
pub fn center_offset(outer: (u32, u32), inner: (u32, u32)) -> (u32, u32) {
    (
        outer.0.saturating_sub(inner.0) / 2,
        outer.1.saturating_sub(inner.1) / 2,
    )
}

/// Copies the `width` x `height` region at (`x`, `y`) out of an image.
pub fn crop(image: &RgbaImage, x: u32, y: u32, width: u32, height: u32) -> RgbaImage {
    image::imageops::crop_imm(image, x, y, width, height).to_image()
}

/// Places an image onto a fresh transparent canvas at (`left`, `top`).
///
/// Pixels are copied verbatim (no blending); everything outside the placed
/// region stays fully transparent. Source pixels falling outside the canvas
/// are dropped.
pub fn pad_onto_canvas(
    image: &RgbaImage,
    canvas_width: u32,
    canvas_height: u32,
    left: u32,
    top: u32,
) -> RgbaImage {
    let mut canvas = RgbaImage::from_pixel(canvas_width, canvas_height, Rgba([0, 0, 0, 0]));
    for (x, y, pixel) in image.enumerate_pixels() {
        let (cx, cy) = (left + x, top + y);
        if cx < canvas_width && cy < canvas_height {
            canvas.put_pixel(cx, cy, *pixel);
        }
    }
    canvas
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba(rgba))
    }

    #[test]
    fn valid_icon_accepted() {
        let img = DynamicImage::ImageRgba8(solid(32, 32, [10, 20, 30, 255]));
        let icon = SkillIcon::from_dynamic("fireball", img).unwrap();
        assert_eq!(icon.stem(), "fireball");
        assert_eq!(icon.data().dimensions(), (32, 32));
    }

    #[test]
    fn wrong_size_rejected_with_shape() {
        let img = DynamicImage::ImageRgba8(solid(16, 16, [0, 0, 0, 255]));
        let err = SkillIcon::from_dynamic("tiny", img).unwrap_err();
        assert_eq!(err.to_string(), "tiny is (16, 16, 4), not (32, 32, 4)");
    }

    #[test]
    fn missing_alpha_rejected() {
        let rgb = DynamicImage::ImageRgb8(image::RgbImage::new(32, 32));
        let err = SkillIcon::from_dynamic("flat", rgb).unwrap_err();
        assert!(matches!(err, Error::MissingAlphaChannel { .. }));
    }

    #[test]
    fn load_dir_skips_bad_icons() {
        let dir = tempfile::tempdir().unwrap();
        solid(32, 32, [255, 0, 0, 255])
            .save(dir.path().join("a.png"))
            .unwrap();
        solid(32, 32, [0, 255, 0, 255])
            .save(dir.path().join("b.png"))
            .unwrap();
        // Wrong size: should be skipped, not abort the directory.
        solid(16, 16, [0, 0, 255, 255])
            .save(dir.path().join("small.png"))
            .unwrap();
        // Not an image extension: ignored outright.
        std::fs::write(dir.path().join("notes.txt"), b"hello").unwrap();

        let icons = load_dir(dir.path()).unwrap();
        let stems: Vec<_> = icons.iter().map(|i| i.stem().to_string()).collect();
        assert_eq!(stems, ["a", "b"]);
    }

    #[test]
    fn load_dir_keeps_first_duplicate_stem() {
        let dir = tempfile::tempdir().unwrap();
        solid(32, 32, [255, 0, 0, 255])
            .save(dir.path().join("a.png"))
            .unwrap();
        solid(32, 32, [0, 255, 0, 255])
            .save(dir.path().join("a.tga"))
            .unwrap();

        let icons = load_dir(dir.path()).unwrap();
        assert_eq!(icons.len(), 1);
        // a.png sorts before a.tga
        assert_eq!(icons[0].data().get_pixel(0, 0).0, [255, 0, 0, 255]);
    }

    #[test]
    fn center_offset_integer_division() {
        assert_eq!(center_offset((40, 40), (32, 32)), (4, 4));
        assert_eq!(center_offset((33, 35), (32, 32)), (0, 1));
        // Inner larger than outer clamps to zero rather than underflowing.
        assert_eq!(center_offset((16, 16), (32, 32)), (0, 0));
    }

    #[test]
    fn pad_places_region_and_leaves_rest_transparent() {
        let glyph = solid(13, 14, [1, 2, 3, 255]);
        let canvas = pad_onto_canvas(&glyph, 32, 32, 19, 18);

        assert_eq!(canvas.dimensions(), (32, 32));
        assert_eq!(canvas.get_pixel(19, 18).0, [1, 2, 3, 255]);
        assert_eq!(canvas.get_pixel(31, 31).0, [1, 2, 3, 255]);
        assert_eq!(canvas.get_pixel(18, 18).0, [0, 0, 0, 0]);
        assert_eq!(canvas.get_pixel(0, 0).0, [0, 0, 0, 0]);
    }

    #[test]
    fn crop_extracts_region() {
        let mut img = solid(32, 32, [0, 0, 0, 0]);
        img.put_pixel(5, 6, Rgba([9, 9, 9, 255]));
        let region = crop(&img, 5, 6, 2, 2);
        assert_eq!(region.dimensions(), (2, 2));
        assert_eq!(region.get_pixel(0, 0).0, [9, 9, 9, 255]);
    }
}
