//! Command-line interface for building a mosaic from a target and a candidate directory

use crate::algorithm::assembler::{Assembler, MosaicConfig, ReusePolicy};
use crate::algorithm::matcher::MatchConfig;
use crate::io::cache::{CacheKey, SignatureCache};
use crate::io::configuration::{
    DEFAULT_ACCURACY, DEFAULT_CACHE_DIR, DEFAULT_COLUMNS, DEFAULT_MAX_RETRIES, DEFAULT_MIN_POOL,
    DEFAULT_ROWS, DEFAULT_SCALE, DEFAULT_THRESHOLD, DEFAULT_THRESHOLD_STEP,
};
use crate::io::error::{Result, invalid_parameter};
use crate::io::image::{FileTileSource, load_image, output_path, save_image};
use crate::io::progress::ProgressManager;
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "photomosaic")]
#[command(
    author,
    version,
    about = "Rebuild an image as a grid of color-matched candidate images"
)]
/// Command-line arguments for the mosaic tool
pub struct Cli {
    /// Image to reproduce as a mosaic
    #[arg(value_name = "TARGET")]
    pub target: PathBuf,

    /// Directory of candidate tile images
    #[arg(value_name = "CANDIDATES")]
    pub candidates: PathBuf,

    /// Number of grid columns
    #[arg(short, long, default_value_t = DEFAULT_COLUMNS)]
    pub columns: u32,

    /// Number of grid rows
    #[arg(short, long, default_value_t = DEFAULT_ROWS)]
    pub rows: u32,

    /// Signature side length (samples per cell = accuracy²)
    #[arg(short, long, default_value_t = DEFAULT_ACCURACY)]
    pub accuracy: u32,

    /// Output size multiplier
    #[arg(short, long, default_value_t = DEFAULT_SCALE)]
    pub scale: u32,

    /// Output file (defaults to <target>_mosaic.<ext>)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Random seed for reproducible output
    #[arg(long)]
    pub seed: Option<u64>,

    /// Initial match score threshold
    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: f64,

    /// Threshold increase per retry
    #[arg(long, default_value_t = DEFAULT_THRESHOLD_STEP)]
    pub threshold_step: f64,

    /// Maximum threshold increases per cell
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: usize,

    /// Qualifying candidates required before picking one at random
    #[arg(long, default_value_t = DEFAULT_MIN_POOL)]
    pub min_pool: usize,

    /// Do not reuse a candidate until every candidate has been used
    #[arg(short, long)]
    pub exclusive: bool,

    /// Directory for cropped candidates and cached signatures
    #[arg(long, default_value = DEFAULT_CACHE_DIR)]
    pub cache_dir: PathBuf,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Check if progress should be displayed
    pub const fn should_show_progress(&self) -> bool {
        !self.quiet
    }

    /// Output location, explicit or derived from the target
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| output_path(&self.target))
    }

    /// Run configuration derived from the arguments
    ///
    /// Without `--seed` a fresh seed is drawn.
    pub fn mosaic_config(&self) -> MosaicConfig {
        MosaicConfig {
            columns: self.columns,
            rows: self.rows,
            accuracy: self.accuracy,
            scale: self.scale,
            seed: self.seed.unwrap_or_else(rand::random),
            reuse: if self.exclusive {
                ReusePolicy::Exclusive
            } else {
                ReusePolicy::Reuse
            },
            matching: MatchConfig {
                initial_threshold: self.threshold,
                threshold_step: self.threshold_step,
                min_pool: self.min_pool,
                max_retries: self.max_retries,
            },
        }
    }

    /// Fail fast on missing inputs before any processing
    ///
    /// # Errors
    ///
    /// Returns an error if the target is not a file or the candidate path is not a directory
    pub fn validate_paths(&self) -> Result<()> {
        if !self.target.is_file() {
            return Err(invalid_parameter(
                "target",
                &self.target.display(),
                &"file does not exist",
            ));
        }
        if !self.candidates.is_dir() {
            return Err(invalid_parameter(
                "candidates",
                &self.candidates.display(),
                &"directory does not exist",
            ));
        }
        Ok(())
    }
}

/// Orchestrates a full mosaic run from parsed arguments
pub struct MosaicRunner {
    cli: Cli,
    config: MosaicConfig,
    progress: ProgressManager,
}

impl MosaicRunner {
    /// Create a runner from CLI arguments
    pub fn new(cli: Cli) -> Self {
        let config = cli.mosaic_config();
        let progress = if cli.should_show_progress() {
            ProgressManager::new()
        } else {
            ProgressManager::hidden()
        };

        Self {
            cli,
            config,
            progress,
        }
    }

    /// Configuration the run will use
    pub const fn config(&self) -> &MosaicConfig {
        &self.config
    }

    /// Validate, build or load signatures, assemble and save
    ///
    /// Returns the path of the written mosaic.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid, the target cannot be decoded,
    /// the cache cannot be built, matching fails or the output cannot be written
    pub fn run(&self) -> Result<PathBuf> {
        let start_time = Instant::now();
        self.config.validate()?;
        self.cli.validate_paths()?;

        let target = load_image(&self.cli.target)?;
        let geometry = self.config.geometry_for(target.width(), target.height())?;
        info!(
            seed = self.config.seed,
            width = geometry.width(),
            height = geometry.height(),
            cell_width = geometry.cell_width(),
            cell_height = geometry.cell_height(),
            "starting mosaic"
        );

        let cache = SignatureCache::new(
            &self.cli.cache_dir,
            CacheKey::from(&self.config),
            geometry.aspect_ratio(),
        )
        .with_progress(self.progress.clone());
        let store = cache.load_or_build(&self.cli.candidates)?;

        let assembler = Assembler::new(self.config).with_progress(self.progress.clone());
        let canvas = assembler.assemble(&target, &store, &FileTileSource)?;

        let output = self.cli.output_path();
        save_image(&canvas, &output)?;
        self.progress.finish();

        info!(
            path = %output.display(),
            elapsed = ?start_time.elapsed(),
            "mosaic written"
        );
        Ok(output)
    }
}
