//! Ordered-triple combination of masked icons.
//!
//! For N source icons the combiner yields every ordered triple of
//! distinct icons, N(N-1)(N-2) artifacts in total. That grows cubically (N=20
//! already means 6840 images), so combinations are produced lazily: the
//! iterator holds only the masked inputs and composes one artifact per
//! `next()` call.

use std::fmt;

use image::RgbaImage;

use crate::mask::{Direction, MaskedIcon};

// ============================================================================
// CombinationKey
// ============================================================================

/// Identity of one ordered triple: which icon sits in which slot.
///
/// Order matters: `(A, B, C)` and `(B, A, C)` are distinct artifacts
/// because the first stem always takes the left slot, the second the
/// right slot and the third the up slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CombinationKey {
    pub left: String,
    pub right: String,
    pub up: String,
}

impl CombinationKey {
    pub fn new(
        left: impl Into<String>,
        right: impl Into<String>,
        up: impl Into<String>,
    ) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
            up: up.into(),
        }
    }

    /// Filename for the artifact, `{left}+{right}+{up}.png`.
    pub fn file_name(&self) -> String {
        format!("{self}.png")
    }
}

impl fmt::Display for CombinationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}+{}", self.left, self.right, self.up)
    }
}

// ============================================================================
// Combiner
// ============================================================================

/// Number of artifacts `combinations` yields for `n` input icons.
pub fn combination_count(n: usize) -> usize {
    if n < 3 { 0 } else { n * (n - 1) * (n - 2) }
}

/// Lazily enumerates every ordered triple of distinct masked icons.
///
/// A pure function of the input slice: re-running it yields the same
/// keys in the same order with identical pixel data.
pub fn combinations(icons: &[MaskedIcon]) -> Combinations<'_> {
    Combinations {
        icons,
        i: 0,
        j: 0,
        k: 0,
    }
}

/// Iterator state for [`combinations`]. Index triples advance in
/// lexicographic order, skipping any triple with a repeated icon.
pub struct Combinations<'a> {
    icons: &'a [MaskedIcon],
    i: usize,
    j: usize,
    k: usize,
}

impl Iterator for Combinations<'_> {
    type Item = (CombinationKey, RgbaImage);

    fn next(&mut self) -> Option<Self::Item> {
        let n = self.icons.len();
        loop {
            if self.i >= n {
                return None;
            }
            if self.j >= n {
                self.i += 1;
                self.j = 0;
                self.k = 0;
                continue;
            }
            if self.k >= n {
                self.j += 1;
                self.k = 0;
                continue;
            }

            let (i, j, k) = (self.i, self.j, self.k);
            self.k += 1;
            if i == j || j == k || i == k {
                continue;
            }

            let (a, b, c) = (&self.icons[i], &self.icons[j], &self.icons[k]);
            let key = CombinationKey::new(a.stem(), b.stem(), c.stem());
            let image = sum_masked(
                a.buffer(Direction::Left),
                b.buffer(Direction::Right),
                c.buffer(Direction::Up),
            );
            return Some((key, image));
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let total = combination_count(self.icons.len());
        (0, Some(total))
    }
}

/// Pixel-wise sum of the three masked buffers.
///
/// Because the visible mask regions are disjoint (checked at
/// `DirectionalMask` construction), at most one input contributes a
/// non-zero value per coordinate and the sum behaves as a plain overlay.
/// Channels still saturate at 255 so that an overlap or a translucent
/// input can never wrap around.
fn sum_masked(left: &RgbaImage, right: &RgbaImage, up: &RgbaImage) -> RgbaImage {
    let mut out = left.clone();
    for (dst, src) in out.pixels_mut().zip(right.pixels()) {
        for channel in 0..4 {
            dst[channel] = dst[channel].saturating_add(src[channel]);
        }
    }
    for (dst, src) in out.pixels_mut().zip(up.pixels()) {
        for channel in 0..4 {
            dst[channel] = dst[channel].saturating_add(src[channel]);
        }
    }
    out
}

// ============================================================================
// Tests
// ============================================================================
