//! The staged scratch store.
//!
//! Every pipeline stage reads from one named collection of images and
//! writes to another. On disk that is a subdirectory per stage inside the
//! job directory; [`ScratchStore`] lifts the pattern into a trait so the
//! pipeline can also run against an in-memory backing in tests.
//!
//! Writes to distinct keys are independent and stage creation is
//! create-if-absent, so a parallel driver needs no extra locking over a
//! store whose per-key writes are atomic.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use image::{ImageError, RgbaImage};

use crate::error::{Error, Result};
use crate::mask::Direction;

// ============================================================================
// Stage
// ============================================================================

/// Typed key for one stage collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Per-direction masked copies of the source icons.
    Masked(Direction),
    /// Raw combined artifacts.
    Combined,
    /// Combined artifacts with hexagon background and frame applied.
    Framed,
    /// Final artifacts with the lock glyph applied. The only durable stage.
    Locked,
}

impl Stage {
    /// Directory name of the stage inside a job directory.
    pub fn dir_name(self) -> &'static str {
        match self {
            Stage::Masked(direction) => direction.as_str(),
            Stage::Combined => "comb",
            Stage::Framed => "comb+frame",
            Stage::Locked => "comb+frame+lock",
        }
    }

    /// The stages deleted by cleanup, leaving only [`Stage::Locked`].
    pub fn scratch() -> [Stage; 5] {
        [
            Stage::Masked(Direction::Left),
            Stage::Masked(Direction::Right),
            Stage::Masked(Direction::Up),
            Stage::Combined,
            Stage::Framed,
        ]
    }
}

// ============================================================================
// ScratchStore
// ============================================================================

/// Key-value image storage with one namespace per stage.
///
/// Keys are plain filenames; the full identity of a value is
/// `(stage, name)`. Implementations must make [`prepare`](Self::prepare)
/// and [`remove`](Self::remove) idempotent.
pub trait ScratchStore {
    /// Creates the stage collection if it does not exist yet.
    fn prepare(&self, stage: Stage) -> Result<()>;

    /// Writes one image under `stage/name`.
    fn write(&self, stage: Stage, name: &str, image: &RgbaImage) -> Result<()>;

    /// Reads the image stored under `stage/name`.
    fn read(&self, stage: Stage, name: &str) -> Result<RgbaImage>;

    /// Lists the names in a stage, sorted.
    fn list(&self, stage: Stage) -> Result<Vec<String>>;

    /// True if the stage collection exists (even when empty).
    fn contains(&self, stage: Stage) -> bool;

    /// Deletes the stage collection and everything in it. No error if it
    /// is already absent.
    fn remove(&self, stage: Stage) -> Result<()>;
}

// ============================================================================
// DirStore
// ============================================================================

/// Directory-backed store rooted at one job directory.
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    fn stage_dir(&self, stage: Stage) -> PathBuf {
        self.root.join(stage.dir_name())
    }
}

impl ScratchStore for DirStore {
    fn prepare(&self, stage: Stage) -> Result<()> {
        std::fs::create_dir_all(self.stage_dir(stage))?;
        Ok(())
    }

    fn write(&self, stage: Stage, name: &str, image: &RgbaImage) -> Result<()> {
        let path = self.stage_dir(stage).join(name);
        image.save(&path).map_err(|err| match err {
            ImageError::IoError(io_err) => Error::Io(io_err),
            other => Error::Encode {
                key: format!("{}/{name}", stage.dir_name()),
                source: other,
            },
        })
    }

    fn read(&self, stage: Stage, name: &str) -> Result<RgbaImage> {
        let path = self.stage_dir(stage).join(name);
        let image = image::open(&path).map_err(|source| Error::Decode { path, source })?;
        Ok(image.to_rgba8())
    }

    fn list(&self, stage: Stage) -> Result<Vec<String>> {
        let mut names: Vec<String> = std::fs::read_dir(self.stage_dir(stage))?
            .collect::<io::Result<Vec<_>>>()?
            .into_iter()
            .filter(|entry| entry.path().is_file())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        Ok(names)
    }

    fn contains(&self, stage: Stage) -> bool {
        self.stage_dir(stage).is_dir()
    }

    fn remove(&self, stage: Stage) -> Result<()> {
        match std::fs::remove_dir_all(self.stage_dir(stage)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

// ============================================================================
// MemStore
// ============================================================================

/// In-memory store, primarily for tests.
///
/// `BTreeMap` keeps listing order identical to the sorted directory
/// listing of [`DirStore`].
#[derive(Debug, Default)]
pub struct MemStore {
    stages: Mutex<HashMap<Stage, BTreeMap<String, RgbaImage>>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScratchStore for MemStore {
    fn prepare(&self, stage: Stage) -> Result<()> {
        self.stages.lock().unwrap().entry(stage).or_default();
        Ok(())
    }

    fn write(&self, stage: Stage, name: &str, image: &RgbaImage) -> Result<()> {
        self.stages
            .lock()
            .unwrap()
            .entry(stage)
            .or_default()
            .insert(name.to_string(), image.clone());
        Ok(())
    }

    fn read(&self, stage: Stage, name: &str) -> Result<RgbaImage> {
        self.stages
            .lock()
            .unwrap()
            .get(&stage)
            .and_then(|entries| entries.get(name).cloned())
            .ok_or_else(|| {
                Error::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{}/{name} not in store", stage.dir_name()),
                ))
            })
    }

    fn list(&self, stage: Stage) -> Result<Vec<String>> {
        let stages = self.stages.lock().unwrap();
        let entries = stages.get(&stage).ok_or_else(|| {
            Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("stage {} not in store", stage.dir_name()),
            ))
        })?;
        Ok(entries.keys().cloned().collect())
    }

    fn contains(&self, stage: Stage) -> bool {
        self.stages.lock().unwrap().contains_key(&stage)
    }

    fn remove(&self, stage: Stage) -> Result<()> {
        self.stages.lock().unwrap().remove(&stage);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
