//! vmatrix-icons: composite matrix-icon synthesis
//!
//! This crate builds composite game-UI icons from a directory of 32x32
//! RGBA skill icons. Every ordered triple of distinct icons is rendered
//! into one "matrix" icon: each icon is masked to its slot region (left,
//! right or up), the three masked buffers are summed into one image, and
//! a hexagon background, frame and lock glyph are composited on top.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use vmatrix_icons::{DirStore, Pipeline, load_dir};
//!
//! # fn main() -> vmatrix_icons::Result<()> {
//! let pipeline = Pipeline::load(Path::new("img/VMatrixUI"))?;
//!
//! let job = Path::new("img/skills/Adele");
//! let icons = load_dir(job)?;
//! pipeline.process(&DirStore::new(job), &icons)?;
//! # Ok(())
//! # }
//! ```
//!
//! The final artifacts land under `comb+frame+lock/` inside the job
//! directory, named `{left}+{right}+{up}.png`; all intermediate stage
//! directories are removed afterwards. Note that the artifact count is
//! N(N-1)(N-2) for N icons, so large directories produce a lot of files.

mod combine;
mod error;
mod icon;
mod mask;
mod overlay;
mod pipeline;
mod store;

pub use combine::{CombinationKey, Combinations, combination_count, combinations};
pub use error::{Error, Result};
pub use icon::{ICON_SIZE, SkillIcon, center_offset, crop, load_dir, pad_onto_canvas};
pub use mask::{Direction, DirectionalMask, LEFT_TEMPLATE, MaskedIcon, UP_TEMPLATE};
pub use overlay::{
    FRAME_ASSET, HEXAGON_ASSET, LOCK_ASSET, OverlayAssets, composite_over,
};
pub use pipeline::{Pipeline, clean};
pub use store::{DirStore, MemStore, ScratchStore, Stage};
