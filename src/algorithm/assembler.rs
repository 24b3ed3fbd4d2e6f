//! Grid traversal, matching and compositing
//!
//! Assembly runs in two phases. Planning downsamples the target once to
//! `columns × accuracy` by `rows × accuracy` pixels, reads each cell's signature
//! from that working copy and asks the matcher for a candidate. Rendering resolves
//! every chosen candidate to pixels, crops it to the cell aspect ratio, resizes it
//! to the exact cell size and pastes it onto a transparent canvas.

use crate::algorithm::matcher::{MatchConfig, Matcher};
use crate::algorithm::store::SignatureStore;
use crate::analysis::signature::{SIGNATURE_FILTER, Signature, expected_len};
use crate::io::configuration::{
    DEFAULT_ACCURACY, DEFAULT_COLUMNS, DEFAULT_ROWS, DEFAULT_SCALE, MAX_CANVAS_DIMENSION,
};
use crate::io::error::{MosaicError, Result, WithCell, invalid_parameter};
use crate::io::image::TileSource;
use crate::io::progress::ProgressManager;
use crate::spatial::crop::crop_to_fit;
use crate::spatial::grid::GridGeometry;
use bitvec::vec::BitVec;
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};
use ndarray::Array2;
use rand::{SeedableRng, rngs::StdRng};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::{debug, info, warn};

/// Resampling filter for resizing tiles to their cell
pub const TILE_FILTER: FilterType = FilterType::Lanczos3;

/// Whether a candidate may appear in more than one cell
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReusePolicy {
    /// Candidates may repeat; variety comes from the randomized pool
    #[default]
    Reuse,
    /// A matched candidate is unavailable until the pool runs dry, then all are released
    Exclusive,
}

/// Run configuration shared by extraction, matching and assembly
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MosaicConfig {
    /// Number of grid columns
    pub columns: u32,
    /// Number of grid rows
    pub rows: u32,
    /// Signature side length
    pub accuracy: u32,
    /// Output size multiplier relative to the target
    pub scale: u32,
    /// Seed for the per-cell random choices
    pub seed: u64,
    /// Candidate reuse policy
    pub reuse: ReusePolicy,
    /// Matcher parameters
    pub matching: MatchConfig,
}

impl Default for MosaicConfig {
    fn default() -> Self {
        Self {
            columns: DEFAULT_COLUMNS,
            rows: DEFAULT_ROWS,
            accuracy: DEFAULT_ACCURACY,
            scale: DEFAULT_SCALE,
            seed: 0,
            reuse: ReusePolicy::default(),
            matching: MatchConfig::default(),
        }
    }
}

impl MosaicConfig {
    /// Check every parameter before any processing starts
    ///
    /// # Errors
    ///
    /// Returns an error if a grid dimension, the accuracy or the scale is zero,
    /// or the matcher parameters are invalid
    pub fn validate(&self) -> Result<()> {
        for (parameter, value) in [
            ("columns", self.columns),
            ("rows", self.rows),
            ("accuracy", self.accuracy),
            ("scale", self.scale),
        ] {
            if value == 0 {
                return Err(invalid_parameter(
                    parameter,
                    &value,
                    &"must be greater than zero",
                ));
            }
        }
        self.matching.validate()
    }

    /// Grid layout over a target of the given size, after scaling
    ///
    /// # Errors
    ///
    /// Returns an error if the scaled canvas exceeds [`MAX_CANVAS_DIMENSION`]
    /// or is too small for the requested grid
    pub fn geometry_for(&self, width: u32, height: u32) -> Result<GridGeometry> {
        let scaled_width = scaled_dimension(width, self.scale)?;
        let scaled_height = scaled_dimension(height, self.scale)?;
        GridGeometry::new(scaled_width, scaled_height, self.columns, self.rows)
    }
}

fn scaled_dimension(value: u32, scale: u32) -> Result<u32> {
    value
        .checked_mul(scale)
        .filter(|&scaled| scaled <= MAX_CANVAS_DIMENSION)
        .ok_or_else(|| {
            invalid_parameter(
                "scale",
                &scale,
                &format!("scaled dimension exceeds {MAX_CANVAS_DIMENSION} pixels"),
            )
        })
}

/// Candidate assignment for every grid cell
#[derive(Clone, Debug)]
pub struct MosaicPlan {
    /// Layout the plan was computed for
    pub geometry: GridGeometry,
    /// Store index per cell, indexed by (`row`, `col`)
    pub assignments: Array2<usize>,
}

impl MosaicPlan {
    /// Store index assigned to cell (`col`, `row`)
    pub fn candidate_at(&self, col: u32, row: u32) -> Option<usize> {
        self.assignments.get([row as usize, col as usize]).copied()
    }

    /// Number of distinct candidates used
    pub fn distinct_candidates(&self) -> usize {
        let mut used: Vec<usize> = self.assignments.iter().copied().collect();
        used.sort_unstable();
        used.dedup();
        used.len()
    }
}

/// Drives planning and rendering of a mosaic
pub struct Assembler {
    config: MosaicConfig,
    matcher: Matcher,
    cancel: Option<Arc<AtomicBool>>,
    progress: ProgressManager,
}

impl Assembler {
    /// Create an assembler for the given configuration
    pub fn new(config: MosaicConfig) -> Self {
        Self {
            config,
            matcher: Matcher::new(config.matching),
            cancel: None,
            progress: ProgressManager::hidden(),
        }
    }

    /// Abort between cells once `flag` is set
    #[must_use]
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Report matching and rendering progress
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressManager) -> Self {
        self.progress = progress;
        self
    }

    /// Configuration in use
    pub const fn config(&self) -> &MosaicConfig {
        &self.config
    }

    /// Target downsampled so each cell covers one `accuracy × accuracy` block
    pub fn working_copy(&self, target: &DynamicImage) -> RgbaImage {
        let accuracy = self.config.accuracy.max(1);
        target
            .resize_exact(
                self.config.columns.saturating_mul(accuracy),
                self.config.rows.saturating_mul(accuracy),
                SIGNATURE_FILTER,
            )
            .to_rgba8()
    }

    /// Signature of cell (`col`, `row`) read from a working copy
    pub fn cell_signature(&self, working: &RgbaImage, col: u32, row: u32) -> Signature {
        let accuracy = self.config.accuracy.max(1);
        Signature::from_block(working, col * accuracy, row * accuracy, accuracy)
    }

    /// Match every cell of `target` against the store
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The configuration or grid geometry is invalid
    /// - The store was built with a different accuracy
    /// - A cell cannot gather a large enough candidate pool
    /// - Assembly is cancelled
    pub fn plan(&self, target: &DynamicImage, store: &SignatureStore) -> Result<MosaicPlan> {
        self.config.validate()?;
        let geometry = self.config.geometry_for(target.width(), target.height())?;
        self.check_store(store)?;

        let working = self.working_copy(target);
        let total = geometry.cell_count();
        info!(
            cells = total,
            candidates = store.len(),
            "matching {}x{} grid",
            geometry.columns(),
            geometry.rows()
        );

        let bar = self.progress.start_phase("Matching", total);
        let assignments = match self.config.reuse {
            ReusePolicy::Reuse => self.plan_shared(&working, geometry, store, &bar)?,
            ReusePolicy::Exclusive => self.plan_exclusive(&working, geometry, store, &bar)?,
        };
        bar.finish();

        let assignments = Array2::from_shape_vec(
            (geometry.rows() as usize, geometry.columns() as usize),
            assignments,
        )
        .map_err(|e| invalid_parameter("grid", &total, &e))?;

        Ok(MosaicPlan {
            geometry,
            assignments,
        })
    }

    // Cells are independent and the store is read-only, so matching runs in parallel
    fn plan_shared(
        &self,
        working: &RgbaImage,
        geometry: GridGeometry,
        store: &SignatureStore,
        bar: &indicatif::ProgressBar,
    ) -> Result<Vec<usize>> {
        let total = geometry.cell_count();
        let completed = AtomicUsize::new(0);

        (0..total)
            .into_par_iter()
            .map(|index| -> Result<usize> {
                self.check_cancelled(completed.load(Ordering::Relaxed), total)?;
                let (col, row) = geometry.cell_position(index);
                let signature = self.cell_signature(working, col, row);
                let mut rng = cell_rng(self.config.seed, index);
                let matched = self
                    .matcher
                    .find_match(&signature, store, &mut rng)
                    .at_cell(col, row)?;
                completed.fetch_add(1, Ordering::Relaxed);
                bar.inc(1);
                Ok(matched.index)
            })
            .collect()
    }

    fn plan_exclusive(
        &self,
        working: &RgbaImage,
        geometry: GridGeometry,
        store: &SignatureStore,
        bar: &indicatif::ProgressBar,
    ) -> Result<Vec<usize>> {
        let total = geometry.cell_count();
        let min_pool = self.config.matching.min_pool.max(1);
        let mut consumed: BitVec = BitVec::repeat(false, store.len());
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut assignments = Vec::with_capacity(total);

        for (index, (col, row)) in geometry.cells().enumerate() {
            self.check_cancelled(index, total)?;

            if store.len() - consumed.count_ones() < min_pool {
                debug!(cell = index, "releasing consumed candidates");
                consumed.fill(false);
            }

            let signature = self.cell_signature(working, col, row);
            let matched = self
                .matcher
                .find_match_excluding(&signature, store, &consumed, &mut rng)
                .at_cell(col, row)?;
            consumed.set(matched.index, true);
            assignments.push(matched.index);
            bar.inc(1);
        }

        Ok(assignments)
    }

    /// Composite the planned tiles onto a transparent canvas
    ///
    /// Cells are grouped by candidate so each tile is loaded exactly once. A tile
    /// that cannot be loaded is logged and its cells are left transparent.
    ///
    /// # Errors
    ///
    /// Returns an error if the plan references an index missing from the store
    pub fn render<T: TileSource + ?Sized>(
        &self,
        plan: &MosaicPlan,
        store: &SignatureStore,
        tiles: &T,
    ) -> Result<RgbaImage> {
        let geometry = plan.geometry;
        let ratio = geometry.aspect_ratio();
        let mut canvas = RgbaImage::new(geometry.width(), geometry.height());

        // One candidate is decoded at a time and dropped once its cells are pasted
        let mut cells_by_candidate: BTreeMap<usize, Vec<(u32, u32)>> = BTreeMap::new();
        for ((row, col), &index) in plan.assignments.indexed_iter() {
            cells_by_candidate
                .entry(index)
                .or_default()
                .push((col as u32, row as u32));
        }

        let mut skipped = 0usize;
        let bar = self.progress.start_phase("Rendering", geometry.cell_count());
        for (index, cells) in cells_by_candidate {
            let candidate = store.entry(index)?;
            let source = match tiles.load_tile(&candidate.id) {
                Ok(image) => crop_to_fit(&image, ratio),
                Err(error) => {
                    warn!(id = %candidate.id, %error, "skipping unreadable tile");
                    skipped += cells.len();
                    bar.inc(cells.len() as u64);
                    continue;
                }
            };

            // Cells share at most four distinct sizes
            let mut resized: HashMap<(u32, u32), RgbaImage> = HashMap::new();
            for (col, row) in cells {
                let rect = geometry.cell_rect(col, row);
                let tile = resized.entry((rect.width, rect.height)).or_insert_with(|| {
                    source
                        .resize_exact(rect.width, rect.height, TILE_FILTER)
                        .to_rgba8()
                });
                imageops::replace(&mut canvas, &*tile, i64::from(rect.x), i64::from(rect.y));
                bar.inc(1);
            }
        }
        bar.finish();

        if skipped > 0 {
            warn!(cells = skipped, "cells left transparent");
        }
        Ok(canvas)
    }

    /// Plan and render in one step
    ///
    /// # Errors
    ///
    /// Returns any error from [`Self::plan`] or [`Self::render`]
    pub fn assemble<T: TileSource + ?Sized>(
        &self,
        target: &DynamicImage,
        store: &SignatureStore,
        tiles: &T,
    ) -> Result<RgbaImage> {
        let plan = self.plan(target, store)?;
        debug!(distinct = plan.distinct_candidates(), "plan complete");
        self.render(&plan, store, tiles)
    }

    fn check_store(&self, store: &SignatureStore) -> Result<()> {
        if store.accuracy() == self.config.accuracy {
            return Ok(());
        }
        Err(MosaicError::SignatureMismatch {
            id: store
                .entries()
                .first()
                .map(|entry| entry.id.clone())
                .unwrap_or_default(),
            expected: expected_len(self.config.accuracy),
            found: expected_len(store.accuracy()),
        })
    }

    fn check_cancelled(&self, completed: usize, total: usize) -> Result<()> {
        if self
            .cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
        {
            return Err(MosaicError::Cancelled { completed, total });
        }
        Ok(())
    }
}

/// Independent, reproducible generator for the cell at `index`
pub fn cell_rng(seed: u64, index: usize) -> StdRng {
    // Golden-ratio increment spreads neighbouring cells across the seed space
    StdRng::seed_from_u64(seed ^ (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}
