//! The pipeline orchestrator.
//!
//! Drives one job directory through the stages in strict order:
//! mask -> combine -> frame -> lock -> cleanup. Each stage is gated on
//! its predecessor's output being present in the scratch store; running a
//! stage out of order is a fatal [`Error::StageOrdering`].
//!
//! Error policy is uniform per-unit isolation: a bad icon or a failed
//! artifact encode is logged and skipped while the batch continues. Only
//! stage-ordering and store-level I/O failures abort the job, and a
//! partially written scratch directory is left as-is for inspection.

use std::path::Path;

use image::RgbaImage;
use log::{debug, info, warn};

use crate::combine::{combination_count, combinations};
use crate::error::{Error, Result};
use crate::icon::SkillIcon;
use crate::mask::{Direction, DirectionalMask, MaskedIcon};
use crate::overlay::OverlayAssets;
use crate::store::{ScratchStore, Stage};

/// Reads one icon's three masked buffers back out of the store.
fn read_masked<S: ScratchStore>(store: &S, stem: &str, name: &str) -> Result<MaskedIcon> {
    let left = store.read(Stage::Masked(Direction::Left), name)?;
    let right = store.read(Stage::Masked(Direction::Right), name)?;
    let up = store.read(Stage::Masked(Direction::Up), name)?;
    Ok(MaskedIcon::from_parts(stem, left, right, up))
}

/// Deletes every scratch stage, keeping only the final artifacts.
///
/// Idempotent: running it twice, or on a directory that was never
/// processed, is not an error.
pub fn clean<S: ScratchStore>(store: &S) -> Result<()> {
    for stage in Stage::scratch() {
        store.remove(stage)?;
    }
    Ok(())
}

/// Orchestrates masking, combination and overlay compositing for one job
/// directory at a time.
///
/// Holds only the immutable startup state (mask sets and overlay assets);
/// all per-job state lives in the scratch store, so one pipeline can be
/// shared across any number of independent jobs.
pub struct Pipeline {
    mask: DirectionalMask,
    overlays: OverlayAssets,
}

impl Pipeline {
    pub fn new(mask: DirectionalMask, overlays: OverlayAssets) -> Self {
        Self { mask, overlays }
    }

    /// Loads the mask templates and overlay assets from one directory.
    /// Any failure here is fatal: no stage can run without the assets.
    pub fn load(asset_dir: &Path) -> Result<Self> {
        Ok(Self::new(
            DirectionalMask::load(asset_dir)?,
            OverlayAssets::load(asset_dir)?,
        ))
    }

    /// Runs the full pipeline over the given icons.
    ///
    /// Stages run strictly in sequence; after the lock pass the scratch
    /// stages are deleted, leaving `comb+frame+lock` as the only durable
    /// output.
    pub fn process<S: ScratchStore>(&self, store: &S, icons: &[SkillIcon]) -> Result<()> {
        self.write_masked(store, icons)?;
        self.combine_stage(store)?;
        self.frame_stage(store)?;
        self.lock_stage(store)?;
        clean(store)?;
        info!("pipeline finished, {} artifacts durable", store.list(Stage::Locked)?.len());
        Ok(())
    }

    /// Stage (a): write the three masked copies of every icon.
    fn write_masked<S: ScratchStore>(&self, store: &S, icons: &[SkillIcon]) -> Result<()> {
        for direction in Direction::ALL {
            store.prepare(Stage::Masked(direction))?;
        }

        for icon in icons {
            let masked = self.mask.mask(icon);
            let name = format!("{}.png", icon.stem());
            for direction in Direction::ALL {
                match store.write(Stage::Masked(direction), &name, masked.buffer(direction)) {
                    Ok(()) => {}
                    Err(err) if err.is_per_unit() => {
                        warn!("masking {name} for {direction} failed: {err}");
                        break;
                    }
                    Err(err) => return Err(err),
                }
            }
        }

        info!("masked {} icons", icons.len());
        Ok(())
    }

    /// Stage (b): enumerate ordered triples and write the combined
    /// artifacts.
    fn combine_stage<S: ScratchStore>(&self, store: &S) -> Result<()> {
        for direction in Direction::ALL {
            if !store.contains(Stage::Masked(direction)) {
                return Err(Error::StageOrdering {
                    stage: Stage::Masked(direction).dir_name(),
                });
            }
        }

        // Only icons present in all three direction stages take part;
        // an icon whose masked copies were skipped drops out here.
        let mut names = store.list(Stage::Masked(Direction::Left))?;
        for direction in [Direction::Right, Direction::Up] {
            let present = store.list(Stage::Masked(direction))?;
            names.retain(|name| present.contains(name));
        }

        let mut masked: Vec<MaskedIcon> = Vec::with_capacity(names.len());
        for name in &names {
            let stem = name.strip_suffix(".png").unwrap_or(name);
            match read_masked(store, stem, name) {
                Ok(icon) => masked.push(icon),
                Err(err) if err.is_per_unit() => {
                    warn!("reading masked copies of {name} failed: {err}");
                }
                Err(err) => return Err(err),
            }
        }

        info!(
            "combining {} icons into {} artifacts",
            masked.len(),
            combination_count(masked.len())
        );

        store.prepare(Stage::Combined)?;
        for (key, image) in combinations(&masked) {
            match store.write(Stage::Combined, &key.file_name(), &image) {
                Ok(()) => debug!("combined {key}"),
                Err(err) if err.is_per_unit() => {
                    warn!("writing combination {key} failed: {err}");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Stage (c), first pass: hexagon background and frame.
    fn frame_stage<S: ScratchStore>(&self, store: &S) -> Result<()> {
        self.overlay_pass(store, Stage::Combined, Stage::Framed, |image| {
            self.overlays.apply_frame(image)
        })
    }

    /// Stage (c), second pass: lock glyph.
    fn lock_stage<S: ScratchStore>(&self, store: &S) -> Result<()> {
        self.overlay_pass(store, Stage::Framed, Stage::Locked, |image| {
            self.overlays.apply_lock(image)
        })
    }

    /// Applies one per-artifact compositing pass from one stage to the
    /// next. Artifacts are independent; per-unit failures are skipped.
    fn overlay_pass<S, F>(&self, store: &S, from: Stage, to: Stage, apply: F) -> Result<()>
    where
        S: ScratchStore,
        F: Fn(&RgbaImage) -> RgbaImage,
    {
        if !store.contains(from) {
            return Err(Error::StageOrdering {
                stage: from.dir_name(),
            });
        }
        store.prepare(to)?;

        let names = store.list(from)?;
        let mut written = 0usize;
        for name in &names {
            let artifact = match store.read(from, name) {
                Ok(image) => image,
                Err(err) if err.is_per_unit() => {
                    warn!("reading {}/{name} failed: {err}", from.dir_name());
                    continue;
                }
                Err(err) => return Err(err),
            };
            match store.write(to, name, &apply(&artifact)) {
                Ok(()) => written += 1,
                Err(err) if err.is_per_unit() => {
                    warn!("writing {}/{name} failed: {err}", to.dir_name());
                }
                Err(err) => return Err(err),
            }
        }

        info!("{}: {written}/{} artifacts", to.dir_name(), names.len());
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icon;
    use crate::mask::test_templates;
    use crate::overlay::test_asset_images;
    use crate::store::{DirStore, MemStore};
    use image::{DynamicImage, Rgba, RgbaImage};

    fn test_pipeline() -> Pipeline {
        let (left, up) = test_templates();
        let mask = DirectionalMask::from_templates(&left, &up).unwrap();
        let (hexagon, frame, lock) = test_asset_images();
        let overlays = OverlayAssets::from_images(hexagon, frame, lock).unwrap();
        Pipeline::new(mask, overlays)
    }

    fn solid_icon(stem: &str, rgba: [u8; 4]) -> SkillIcon {
        let img = RgbaImage::from_pixel(32, 32, Rgba(rgba));
        SkillIcon::from_dynamic(stem, DynamicImage::ImageRgba8(img)).unwrap()
    }

    fn abc_icons() -> Vec<SkillIcon> {
        vec![
            solid_icon("A", [255, 0, 0, 255]),
            solid_icon("B", [0, 255, 0, 255]),
            solid_icon("C", [0, 0, 255, 255]),
        ]
    }

    #[test]
    fn end_to_end_three_icons() {
        let pipeline = test_pipeline();
        let store = MemStore::new();
        pipeline.process(&store, &abc_icons()).unwrap();

        // Exactly the six ordered-triple artifacts survive.
        assert_eq!(
            store.list(Stage::Locked).unwrap(),
            [
                "A+B+C.png",
                "A+C+B.png",
                "B+A+C.png",
                "B+C+A.png",
                "C+A+B.png",
                "C+B+A.png",
            ]
        );

        // Scratch stages are gone.
        for stage in Stage::scratch() {
            assert!(!store.contains(stage), "{} should be removed", stage.dir_name());
        }

        // A+B+C: A (red) in the left region, B (green) in the right
        // region, C (blue) in the up region, away from frame and lock.
        let artifact = store.read(Stage::Locked, "A+B+C.png").unwrap();
        assert_eq!(artifact.get_pixel(5, 10).0, [255, 0, 0, 255]);
        assert_eq!(artifact.get_pixel(25, 5).0, [0, 255, 0, 255]);
        assert_eq!(artifact.get_pixel(16, 10).0, [0, 0, 255, 255]);

        // Frame ring on top, lock glyph flush bottom-right, and the
        // whole canvas opaque after compositing.
        assert_eq!(artifact.get_pixel(0, 0).0, [255, 255, 0, 255]);
        assert_eq!(artifact.get_pixel(31, 31).0, [200, 200, 200, 255]);
        for pixel in artifact.pixels() {
            assert_eq!(pixel[3], 255);
        }
    }

    #[test]
    fn end_to_end_on_directory_store() {
        let dir = tempfile::tempdir().unwrap();
        for icon in abc_icons() {
            icon.data()
                .save(dir.path().join(format!("{}.png", icon.stem())))
                .unwrap();
        }

        let pipeline = test_pipeline();
        let store = DirStore::new(dir.path());
        let icons = icon::load_dir(dir.path()).unwrap();
        pipeline.process(&store, &icons).unwrap();

        let durable = dir.path().join("comb+frame+lock");
        assert!(durable.join("A+B+C.png").is_file());
        assert_eq!(std::fs::read_dir(&durable).unwrap().count(), 6);

        // Intermediates deleted, sources untouched.
        for name in ["left", "right", "up", "comb", "comb+frame"] {
            assert!(!dir.path().join(name).exists(), "{name} should be deleted");
        }
        assert!(dir.path().join("A.png").is_file());
    }

    #[test]
    fn combine_without_masking_is_stage_ordering_error() {
        let pipeline = test_pipeline();
        let store = MemStore::new();
        let err = pipeline.combine_stage(&store).unwrap_err();
        assert!(matches!(err, Error::StageOrdering { stage: "left" }));
    }

    #[test]
    fn frame_pass_without_combine_is_stage_ordering_error() {
        let pipeline = test_pipeline();
        let store = MemStore::new();
        let err = pipeline.frame_stage(&store).unwrap_err();
        assert!(matches!(err, Error::StageOrdering { stage: "comb" }));
    }

    #[test]
    fn lock_pass_without_frame_is_stage_ordering_error() {
        let pipeline = test_pipeline();
        let store = MemStore::new();
        let err = pipeline.lock_stage(&store).unwrap_err();
        assert!(matches!(err, Error::StageOrdering { stage: "comb+frame" }));
    }

    #[test]
    fn cleanup_is_idempotent() {
        let store = MemStore::new();
        // Never processed: nothing to remove, no error.
        clean(&store).unwrap();

        let pipeline = test_pipeline();
        pipeline.process(&store, &abc_icons()).unwrap();
        clean(&store).unwrap();
        clean(&store).unwrap();
        assert!(store.contains(Stage::Locked));
    }

    /// Store that refuses to encode one specific key; everything else is
    /// delegated to an in-memory store.
    struct RejectingStore {
        inner: MemStore,
        reject: (Stage, &'static str),
    }

    impl RejectingStore {
        fn new(stage: Stage, name: &'static str) -> Self {
            Self {
                inner: MemStore::new(),
                reject: (stage, name),
            }
        }
    }

    impl ScratchStore for RejectingStore {
        fn prepare(&self, stage: Stage) -> crate::Result<()> {
            self.inner.prepare(stage)
        }

        fn write(&self, stage: Stage, name: &str, image: &RgbaImage) -> crate::Result<()> {
            if (stage, name) == self.reject {
                return Err(Error::Encode {
                    key: format!("{}/{name}", stage.dir_name()),
                    source: image::ImageError::IoError(std::io::Error::other(
                        "encoder rejected buffer",
                    )),
                });
            }
            self.inner.write(stage, name, image)
        }

        fn read(&self, stage: Stage, name: &str) -> crate::Result<RgbaImage> {
            self.inner.read(stage, name)
        }

        fn list(&self, stage: Stage) -> crate::Result<Vec<String>> {
            self.inner.list(stage)
        }

        fn contains(&self, stage: Stage) -> bool {
            self.inner.contains(stage)
        }

        fn remove(&self, stage: Stage) -> crate::Result<()> {
            self.inner.remove(stage)
        }
    }

    #[test]
    fn failed_combination_encode_skips_only_that_artifact() {
        let pipeline = test_pipeline();
        let store = RejectingStore::new(Stage::Combined, "A+B+C.png");

        pipeline.process(&store, &abc_icons()).unwrap();

        let names = store.list(Stage::Locked).unwrap();
        assert_eq!(
            names,
            ["A+C+B.png", "B+A+C.png", "B+C+A.png", "C+A+B.png", "C+B+A.png"]
        );
    }

    #[test]
    fn failed_overlay_encode_skips_only_that_artifact() {
        let pipeline = test_pipeline();
        let store = RejectingStore::new(Stage::Framed, "B+A+C.png");

        pipeline.process(&store, &abc_icons()).unwrap();

        let names = store.list(Stage::Locked).unwrap();
        assert_eq!(names.len(), 5);
        assert!(!names.contains(&"B+A+C.png".to_string()));
    }

    #[test]
    fn failed_masked_encode_drops_only_that_icon() {
        let pipeline = test_pipeline();
        // B's right-direction copy never lands, so B drops out of the
        // combination set while A, C and D still produce their triples.
        let store = RejectingStore::new(Stage::Masked(Direction::Right), "B.png");
        let mut icons = abc_icons();
        icons.push(solid_icon("D", [128, 128, 128, 255]));

        pipeline.process(&store, &icons).unwrap();

        let names = store.list(Stage::Locked).unwrap();
        assert_eq!(names.len(), 6, "A, C, D form 3*2*1 ordered triples");
        assert!(names.iter().all(|n| !n.contains('B')));
    }

    #[test]
    fn four_icons_yield_twenty_four_artifacts() {
        let pipeline = test_pipeline();
        let store = MemStore::new();
        let mut icons = abc_icons();
        icons.push(solid_icon("D", [128, 128, 128, 255]));

        pipeline.process(&store, &icons).unwrap();
        assert_eq!(store.list(Stage::Locked).unwrap().len(), 24);
    }

    #[test]
    fn invalid_icons_do_not_block_valid_triples() {
        // The 16x16 icon never becomes a SkillIcon; loading rejects it.
        let dir = tempfile::tempdir().unwrap();
        for icon in abc_icons() {
            icon.data()
                .save(dir.path().join(format!("{}.png", icon.stem())))
                .unwrap();
        }
        RgbaImage::from_pixel(16, 16, Rgba([9, 9, 9, 255]))
            .save(dir.path().join("bad.png"))
            .unwrap();

        let icons = icon::load_dir(dir.path()).unwrap();
        assert_eq!(icons.len(), 3);

        let pipeline = test_pipeline();
        let store = MemStore::new();
        pipeline.process(&store, &icons).unwrap();
        let names = store.list(Stage::Locked).unwrap();
        assert_eq!(names.len(), 6);
        assert!(names.iter().all(|n| !n.contains("bad")));
    }
}
