//! Directional pixel masks derived from the UI mask templates.
//!
//! Each composite icon has three slots: left, right and up. The template
//! assets define which pixels belong to each slot; everywhere a template
//! is fully transparent, an icon masked for that direction gets blanked.
//! The right template is not shipped as an asset; it is the horizontal
//! mirror of the left one.
//!
//! The combine stage sums masked buffers pixel-wise, which is only an
//! overlay if no pixel is visible in more than one direction. That
//! disjointness is checked once here, at construction, instead of being
//! assumed downstream.

use std::fmt;
use std::path::Path;

use image::{Rgba, RgbaImage, imageops};

use crate::error::{Error, Result};
use crate::icon::{ICON_SIZE, SkillIcon, open_rgba};

/// Template asset defining the left slot (right is its mirror).
pub const LEFT_TEMPLATE: &str = "VMatrix.iconMask.3A_32.png";
/// Template asset defining the up slot.
pub const UP_TEMPLATE: &str = "VMatrix.iconMask.3B_32.png";

// ============================================================================
// Direction
// ============================================================================

/// One of the three canvas zones an icon can occupy in a composite.
///
/// The ordering of [`Direction::ALL`] is the slot order used for
/// combination naming: `{left}+{right}+{up}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Left = 0,
    Right = 1,
    Up = 2,
}

impl Direction {
    /// All directions in slot order.
    pub const ALL: [Direction; 3] = [Direction::Left, Direction::Right, Direction::Up];

    /// Stable lowercase name, also used as the scratch stage directory.
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Up => "up",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// DirectionalMask
// ============================================================================

/// Per-direction sets of pixel coordinates to blank when masking.
///
/// Built once at startup from the two template assets; immutable and
/// shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct DirectionalMask {
    // Indexed by `Direction as usize`.
    blank: [Vec<(u32, u32)>; 3],
}

impl DirectionalMask {
    /// Builds the mask sets from decoded template images.
    ///
    /// `left` and `up` must both be 32x32; the right template is derived
    /// by mirroring `left` horizontally. Fails with [`Error::MaskOverlap`]
    /// if any pixel is visible (non-zero alpha) in more than one
    /// direction's template.
    pub fn from_templates(left: &RgbaImage, up: &RgbaImage) -> Result<Self> {
        check_template_size("left mask template", left)?;
        check_template_size("up mask template", up)?;
        let right = imageops::flip_horizontal(left);

        let templates = [left, &right, up];
        for (i, a) in Direction::ALL.iter().enumerate() {
            for b in &Direction::ALL[i + 1..] {
                let overlap = visible_overlap(templates[*a as usize], templates[*b as usize]);
                if overlap > 0 {
                    return Err(Error::MaskOverlap {
                        a: *a,
                        b: *b,
                        pixels: overlap,
                    });
                }
            }
        }

        Ok(Self {
            blank: [
                blank_coords(left),
                blank_coords(&right),
                blank_coords(up),
            ],
        })
    }

    /// Loads and builds the mask sets from the asset directory.
    pub fn load(asset_dir: &Path) -> Result<Self> {
        let left = open_rgba(&asset_dir.join(LEFT_TEMPLATE))?;
        let up = open_rgba(&asset_dir.join(UP_TEMPLATE))?;
        Self::from_templates(&left, &up)
    }

    /// The coordinates blanked when masking for `direction`.
    pub fn blank_coords(&self, direction: Direction) -> &[(u32, u32)] {
        &self.blank[direction as usize]
    }

    /// Produces the three masked copies of an icon, one per direction.
    ///
    /// Each copy is an independent buffer; masked coordinates are forced
    /// to fully transparent black. The source icon is never mutated, and
    /// the icon's alpha/shape preconditions are guaranteed by
    /// [`SkillIcon`] construction.
    pub fn mask(&self, icon: &SkillIcon) -> MaskedIcon {
        let blank_one = |direction: Direction| {
            let mut copy = icon.data().clone();
            for &(x, y) in self.blank_coords(direction) {
                copy.put_pixel(x, y, Rgba([0, 0, 0, 0]));
            }
            copy
        };

        MaskedIcon {
            stem: icon.stem().to_string(),
            left: blank_one(Direction::Left),
            right: blank_one(Direction::Right),
            up: blank_one(Direction::Up),
        }
    }
}

fn check_template_size(name: &str, template: &RgbaImage) -> Result<()> {
    if template.dimensions() != (ICON_SIZE, ICON_SIZE) {
        return Err(Error::InvalidDimensions {
            name: name.to_string(),
            width: template.width(),
            height: template.height(),
            channels: 4,
        });
    }
    Ok(())
}

fn blank_coords(template: &RgbaImage) -> Vec<(u32, u32)> {
    template
        .enumerate_pixels()
        .filter(|(_, _, pixel)| pixel[3] == 0)
        .map(|(x, y, _)| (x, y))
        .collect()
}

/// Number of pixels visible (alpha != 0) in both templates.
fn visible_overlap(a: &RgbaImage, b: &RgbaImage) -> usize {
    a.pixels()
        .zip(b.pixels())
        .filter(|(pa, pb)| pa[3] != 0 && pb[3] != 0)
        .count()
}

// ============================================================================
// MaskedIcon
// ============================================================================

/// The three per-direction masked copies of one skill icon.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedIcon {
    stem: String,
    left: RgbaImage,
    right: RgbaImage,
    up: RgbaImage,
}

impl MaskedIcon {
    /// Reassembles a masked icon from buffers read back out of the
    /// scratch store.
    pub fn from_parts(
        stem: impl Into<String>,
        left: RgbaImage,
        right: RgbaImage,
        up: RgbaImage,
    ) -> Self {
        Self {
            stem: stem.into(),
            left,
            right,
            up,
        }
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// The buffer masked for the given direction.
    pub fn buffer(&self, direction: Direction) -> &RgbaImage {
        match direction {
            Direction::Left => &self.left,
            Direction::Right => &self.right,
            Direction::Up => &self.up,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

/// Synthetic templates for tests: left slot visible for x < 10, up slot
/// for 10 <= x < 22. The mirror of the left template is then visible for
/// x >= 22, so the three regions partition the canvas.
#[cfg(test)]
pub(crate) fn test_templates() -> (RgbaImage, RgbaImage) {
    let left = RgbaImage::from_fn(32, 32, |x, _| {
        if x < 10 {
            Rgba([255, 255, 255, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    });
    let up = RgbaImage::from_fn(32, 32, |x, _| {
        if (10..22).contains(&x) {
            Rgba([255, 255, 255, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    });
    (left, up)
}
