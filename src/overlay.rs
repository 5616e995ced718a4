//! Frame and lock overlay compositing.
//!
//! Two sequential passes run over every combined artifact:
//!
//! 1. **Frame pass**: the frame image is composited on top of the
//!    artifact, and the result is laid over a background cut from the
//!    hexagon asset (center-cropped to the 32x32 canvas).
//! 2. **Lock pass**: the lock glyph, cropped to its content box and
//!    padded back to a full canvas flush against the bottom-right corner,
//!    is composited on top of the framed artifact.
//!
//! The assets are loaded once and shared read-only; both passes are pure
//! per-artifact functions.

use std::path::Path;

use image::{Rgba, RgbaImage};

use crate::error::{Error, Result};
use crate::icon::{ICON_SIZE, center_offset, crop, open_rgba, pad_onto_canvas};

/// Hexagon slot background asset.
pub const HEXAGON_ASSET: &str = "VMatrix.SlotState.Equip_ENCore.png";
/// Frame overlay asset.
pub const FRAME_ASSET: &str = "VMatrix.iconFrame.frame3.png";
/// Lock glyph asset.
pub const LOCK_ASSET: &str = "VMatrix.ProtectLock.0.png";

// The shipped lock glyph is 15x17 with its content in the top-left
// 13x14 box.
const LOCK_CROP_WIDTH: u32 = 13;
const LOCK_CROP_HEIGHT: u32 = 14;

// ============================================================================
// OverlayAssets
// ============================================================================

/// The static overlay images, preprocessed once at startup.
///
/// `background` is already center-cropped to the canvas and `lock` is
/// already cropped and repositioned, so the per-artifact passes are plain
/// source-over composites.
#[derive(Debug, Clone)]
pub struct OverlayAssets {
    background: RgbaImage,
    frame: RgbaImage,
    lock: RgbaImage,
}

impl OverlayAssets {
    /// Preprocesses decoded asset images.
    ///
    /// The hexagon must be at least canvas-sized (it is center-cropped to
    /// 32x32); the frame must be exactly canvas-sized; the lock glyph must
    /// contain its 13x14 content box.
    pub fn from_images(hexagon: RgbaImage, frame: RgbaImage, lock: RgbaImage) -> Result<Self> {
        if hexagon.width() < ICON_SIZE || hexagon.height() < ICON_SIZE {
            return Err(Error::InvalidDimensions {
                name: "hexagon asset".to_string(),
                width: hexagon.width(),
                height: hexagon.height(),
                channels: 4,
            });
        }
        if frame.dimensions() != (ICON_SIZE, ICON_SIZE) {
            return Err(Error::InvalidDimensions {
                name: "frame asset".to_string(),
                width: frame.width(),
                height: frame.height(),
                channels: 4,
            });
        }
        if lock.width() < LOCK_CROP_WIDTH || lock.height() < LOCK_CROP_HEIGHT {
            return Err(Error::InvalidDimensions {
                name: "lock asset".to_string(),
                width: lock.width(),
                height: lock.height(),
                channels: 4,
            });
        }

        let (left, top) = center_offset(hexagon.dimensions(), (ICON_SIZE, ICON_SIZE));
        let background = crop(&hexagon, left, top, ICON_SIZE, ICON_SIZE);

        // Crop the glyph to its content box, then pad it back out so it
        // sits flush against the bottom-right canvas corner.
        let glyph = crop(&lock, 0, 0, LOCK_CROP_WIDTH, LOCK_CROP_HEIGHT);
        let lock = pad_onto_canvas(
            &glyph,
            ICON_SIZE,
            ICON_SIZE,
            ICON_SIZE - LOCK_CROP_WIDTH,
            ICON_SIZE - LOCK_CROP_HEIGHT,
        );

        Ok(Self {
            background,
            frame,
            lock,
        })
    }

    /// Loads and preprocesses the three assets from the asset directory.
    /// Any failure here is fatal for the run.
    pub fn load(asset_dir: &Path) -> Result<Self> {
        let hexagon = open_rgba(&asset_dir.join(HEXAGON_ASSET))?;
        let frame = open_rgba(&asset_dir.join(FRAME_ASSET))?;
        let lock = open_rgba(&asset_dir.join(LOCK_ASSET))?;
        Self::from_images(hexagon, frame, lock)
    }

    /// Frame pass: `background <- (artifact over frame)`.
    pub fn apply_frame(&self, artifact: &RgbaImage) -> RgbaImage {
        let mut framed = artifact.clone();
        composite_over(&mut framed, &self.frame, 0, 0);

        let mut out = self.background.clone();
        composite_over(&mut out, &framed, 0, 0);
        out
    }

    /// Lock pass: lock glyph over the framed artifact.
    pub fn apply_lock(&self, framed: &RgbaImage) -> RgbaImage {
        let mut out = framed.clone();
        composite_over(&mut out, &self.lock, 0, 0);
        out
    }
}

// ============================================================================
// Compositing primitives
// ============================================================================

/// Composites a source image onto a destination at the given position
/// with standard source-over alpha blending. Source pixels falling
/// outside the destination are dropped.
pub fn composite_over(dest: &mut RgbaImage, src: &RgbaImage, x: i32, y: i32) {
    let (dest_width, dest_height) = (dest.width() as i32, dest.height() as i32);

    for (sx, sy, &src_pixel) in src.enumerate_pixels() {
        let (dx, dy) = (x + sx as i32, y + sy as i32);
        if (0..dest_width).contains(&dx) && (0..dest_height).contains(&dy) {
            let under = *dest.get_pixel(dx as u32, dy as u32);
            dest.put_pixel(dx as u32, dy as u32, alpha_blend(src_pixel, under));
        }
    }
}

/// Source-over blend of two RGBA pixels.
fn alpha_blend(src: Rgba<u8>, dst: Rgba<u8>) -> Rgba<u8> {
    let sa = src[3] as f32 / 255.0;
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a == 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let mut out = [0u8; 4];
    for channel in 0..3 {
        let s = src[channel] as f32 / 255.0;
        let d = dst[channel] as f32 / 255.0;
        out[channel] = (((s * sa + d * da * (1.0 - sa)) / out_a) * 255.0).round() as u8;
    }
    out[3] = (out_a * 255.0).round() as u8;
    Rgba(out)
}

// ============================================================================
// Tests
// ============================================================================

/// Synthetic assets for tests: hexagon larger than the canvas, opaque
/// frame ring, lock glyph with opaque content box.
#[cfg(test)]
pub(crate) fn test_asset_images() -> (RgbaImage, RgbaImage, RgbaImage) {
    let hexagon = RgbaImage::from_pixel(40, 40, Rgba([40, 40, 40, 255]));
    let frame = RgbaImage::from_fn(32, 32, |x, y| {
        if x == 0 || y == 0 || x == 31 || y == 31 {
            Rgba([255, 255, 0, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    });
    let lock = RgbaImage::from_fn(15, 17, |x, y| {
        if x < LOCK_CROP_WIDTH && y < LOCK_CROP_HEIGHT {
            Rgba([200, 200, 200, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    });
    (hexagon, frame, lock)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assets() -> OverlayAssets {
        let (hexagon, frame, lock) = test_asset_images();
        OverlayAssets::from_images(hexagon, frame, lock).unwrap()
    }

    #[test]
    fn background_is_center_cropped() {
        let mut hexagon = RgbaImage::from_pixel(40, 40, Rgba([0, 0, 0, 255]));
        // Crop offset is (40 - 32) / 2 = 4, so hexagon (5, 5) lands at
        // canvas (1, 1), just inside the frame ring.
        hexagon.put_pixel(5, 5, Rgba([7, 8, 9, 255]));
        let (_, frame, lock) = test_asset_images();

        let assets = OverlayAssets::from_images(hexagon, frame, lock).unwrap();
        let out = assets.apply_frame(&RgbaImage::from_pixel(32, 32, Rgba([0, 0, 0, 0])));
        assert_eq!(out.get_pixel(1, 1).0, [7, 8, 9, 255]);
        assert_eq!(out.get_pixel(2, 2).0, [0, 0, 0, 255]);
        assert_eq!(out.width(), 32);
        assert_eq!(out.height(), 32);
    }

    #[test]
    fn frame_pass_layers_in_order() {
        let assets = assets();
        // Fully transparent artifact: frame ring and hexagon background
        // show through.
        let empty = RgbaImage::from_pixel(32, 32, Rgba([0, 0, 0, 0]));
        let out = assets.apply_frame(&empty);
        assert_eq!(out.get_pixel(0, 0).0, [255, 255, 0, 255], "frame ring");
        assert_eq!(out.get_pixel(16, 16).0, [40, 40, 40, 255], "background");

        // Opaque artifact: it covers the background but the frame is
        // composited on top of it.
        let red = RgbaImage::from_pixel(32, 32, Rgba([255, 0, 0, 255]));
        let out = assets.apply_frame(&red);
        assert_eq!(out.get_pixel(0, 0).0, [255, 255, 0, 255], "frame wins on the ring");
        assert_eq!(out.get_pixel(16, 16).0, [255, 0, 0, 255], "artifact elsewhere");
    }

    #[test]
    fn frame_pass_makes_masked_regions_opaque() {
        let assets = assets();
        let empty = RgbaImage::from_pixel(32, 32, Rgba([0, 0, 0, 0]));
        let out = assets.apply_frame(&empty);
        for pixel in out.pixels() {
            assert_eq!(pixel[3], 255);
        }
    }

    #[test]
    fn lock_sits_flush_bottom_right() {
        let assets = assets();
        let base = RgbaImage::from_pixel(32, 32, Rgba([10, 10, 10, 255]));
        let out = assets.apply_lock(&base);

        // Lock content covers x in [19, 31], y in [18, 31].
        assert_eq!(out.get_pixel(19, 18).0, [200, 200, 200, 255]);
        assert_eq!(out.get_pixel(31, 31).0, [200, 200, 200, 255]);
        // Just outside the glyph the base shows through.
        assert_eq!(out.get_pixel(18, 18).0, [10, 10, 10, 255]);
        assert_eq!(out.get_pixel(19, 17).0, [10, 10, 10, 255]);
    }

    #[test]
    fn undersized_assets_rejected() {
        let (hexagon, frame, lock) = test_asset_images();
        let tiny = RgbaImage::new(16, 16);

        assert!(OverlayAssets::from_images(tiny.clone(), frame.clone(), lock.clone()).is_err());
        assert!(OverlayAssets::from_images(hexagon.clone(), tiny.clone(), lock).is_err());
        assert!(OverlayAssets::from_images(hexagon, frame, RgbaImage::new(4, 4)).is_err());
    }

    #[test]
    fn composite_respects_transparency() {
        let mut dest = RgbaImage::from_pixel(8, 8, Rgba([255, 0, 0, 255]));
        let src = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 255, 128]));
        composite_over(&mut dest, &src, 0, 0);

        let blended = dest.get_pixel(0, 0);
        assert!(blended[0] > 0 && blended[2] > 0, "both colors contribute");
        assert_eq!(dest.get_pixel(7, 7).0, [255, 0, 0, 255], "outside untouched");
    }
}
