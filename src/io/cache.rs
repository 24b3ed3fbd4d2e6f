//! On-disk cache of cropped candidates and their signatures
//!
//! Everything is keyed by a `{columns}-{rows}-{accuracy}` suffix so data built
//! for one grid configuration is never read back for another:
//! - `<root>/cropped-<suffix>/` holds each candidate cropped to the cell ratio
//! - `<root>/meta-<suffix>.json` maps cropped paths to their signatures

use crate::algorithm::assembler::MosaicConfig;
use crate::algorithm::store::SignatureStore;
use crate::analysis::signature::{Signature, extract};
use crate::io::configuration::{CROPPED_DIR_PREFIX, METADATA_PREFIX};
use crate::io::error::{MosaicError, Result, file_system_error};
use crate::io::image::{is_supported_image, load_image};
use crate::io::progress::ProgressManager;
use crate::spatial::crop::crop_to_fit;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Grid configuration a cache entry belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Number of grid columns
    pub columns: u32,
    /// Number of grid rows
    pub rows: u32,
    /// Signature side length
    pub accuracy: u32,
}

impl CacheKey {
    /// Create a key from grid dimensions and accuracy
    pub const fn new(columns: u32, rows: u32, accuracy: u32) -> Self {
        Self {
            columns,
            rows,
            accuracy,
        }
    }

    /// Filename suffix identifying this configuration
    pub fn suffix(&self) -> String {
        format!("{}-{}-{}", self.columns, self.rows, self.accuracy)
    }
}

impl From<&MosaicConfig> for CacheKey {
    fn from(config: &MosaicConfig) -> Self {
        Self::new(config.columns, config.rows, config.accuracy)
    }
}

/// Loads or builds the signature store for one grid configuration
pub struct SignatureCache {
    root: PathBuf,
    key: CacheKey,
    aspect_ratio: f64,
    progress: ProgressManager,
}

impl SignatureCache {
    /// Create a cache rooted at `root` for candidates cropped to `aspect_ratio`
    pub fn new(root: impl Into<PathBuf>, key: CacheKey, aspect_ratio: f64) -> Self {
        Self {
            root: root.into(),
            key,
            aspect_ratio,
            progress: ProgressManager::hidden(),
        }
    }

    /// Report cropping and extraction progress
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressManager) -> Self {
        self.progress = progress;
        self
    }

    /// Configuration this cache is keyed by
    pub const fn key(&self) -> CacheKey {
        self.key
    }

    /// Directory of cropped candidates
    pub fn cropped_dir(&self) -> PathBuf {
        self.root
            .join(format!("{CROPPED_DIR_PREFIX}{}", self.key.suffix()))
    }

    /// Signature metadata file
    pub fn metadata_path(&self) -> PathBuf {
        self.root
            .join(format!("{METADATA_PREFIX}{}.json", self.key.suffix()))
    }

    /// Load persisted signatures, if present
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata exists but cannot be read, is malformed,
    /// or holds signatures of the wrong length
    pub fn load(&self) -> Result<Option<SignatureStore>> {
        let path = self.metadata_path();
        if !path.exists() {
            return Ok(None);
        }

        let file = File::open(&path).map_err(|e| file_system_error(&path, "open metadata", e))?;
        SignatureStore::read_json(BufReader::new(file), self.key.accuracy)
            .map(Some)
            .map_err(|error| match error {
                MosaicError::CacheFormat { source, .. } => MosaicError::CacheFormat {
                    path: path.clone(),
                    source,
                },
                other => other,
            })
    }

    /// Persist signatures for this configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory or file cannot be written
    pub fn save(&self, store: &SignatureStore) -> Result<()> {
        std::fs::create_dir_all(&self.root)
            .map_err(|e| file_system_error(&self.root, "create cache directory", e))?;

        let path = self.metadata_path();
        let file =
            File::create(&path).map_err(|e| file_system_error(&path, "create metadata", e))?;
        let mut writer = BufWriter::new(file);
        store
            .write_json(&mut writer)
            .map_err(|e| MosaicError::CacheFormat {
                path: path.clone(),
                source: e,
            })?;
        writer
            .flush()
            .map_err(|e| file_system_error(&path, "write metadata", e))
    }

    /// Return the cached store, building and persisting it on a miss
    ///
    /// # Errors
    ///
    /// Returns an error if the candidate directory cannot be listed or the cache
    /// cannot be read or written. Individual unreadable candidates are skipped.
    pub fn load_or_build(&self, candidate_dir: &Path) -> Result<SignatureStore> {
        if let Some(store) = self.load()? {
            info!(
                candidates = store.len(),
                suffix = %self.key.suffix(),
                "loaded cached signatures"
            );
            return Ok(store);
        }

        let cropped = self.crop_candidates(candidate_dir)?;
        debug!(cropped, "cropped new candidates");

        let store = self.build_store()?;
        self.save(&store)?;
        info!(
            candidates = store.len(),
            path = %self.metadata_path().display(),
            "built signature cache"
        );
        Ok(store)
    }

    /// Crop every candidate into the cropped directory, reusing earlier crops
    ///
    /// Returns the number of newly cropped files.
    ///
    /// # Errors
    ///
    /// Returns an error if either directory cannot be created or listed
    pub fn crop_candidates(&self, candidate_dir: &Path) -> Result<usize> {
        let cropped_dir = self.cropped_dir();
        std::fs::create_dir_all(&cropped_dir)
            .map_err(|e| file_system_error(&cropped_dir, "create directory", e))?;

        let candidates = list_candidates(candidate_dir)?;
        let bar = self.progress.start_phase("Cropping", candidates.len());

        let cropped = candidates
            .par_iter()
            .filter(|source| {
                let outcome = source.file_name().is_some_and(|name| {
                    let destination = cropped_dir.join(name);
                    !destination.exists() && self.crop_one(source, &destination)
                });
                bar.inc(1);
                outcome
            })
            .count();

        bar.finish();
        Ok(cropped)
    }

    fn crop_one(&self, source: &Path, destination: &Path) -> bool {
        let image = match load_image(source) {
            Ok(image) => image,
            Err(error) => {
                warn!(%error, "skipping candidate");
                return false;
            }
        };

        match crop_to_fit(&image, self.aspect_ratio).save(destination) {
            Ok(()) => true,
            Err(error) => {
                warn!(path = %destination.display(), %error, "failed to store cropped candidate");
                false
            }
        }
    }

    /// Extract signatures for every cropped candidate
    ///
    /// # Errors
    ///
    /// Returns an error if the cropped directory cannot be listed
    pub fn build_store(&self) -> Result<SignatureStore> {
        let accuracy = self.key.accuracy;
        let cropped = list_candidates(&self.cropped_dir())?;
        let bar = self.progress.start_phase("Signatures", cropped.len());

        let entries: Vec<(String, Signature)> = cropped
            .par_iter()
            .filter_map(|path| {
                // Ids are persisted as JSON strings and must round-trip to the same file
                let entry = match path.to_str().map(|id| (id, load_image(path))) {
                    None => {
                        warn!(path = %path.display(), "skipping candidate with non-UTF-8 path");
                        None
                    }
                    Some((id, Ok(image))) => Some((id.to_owned(), extract(&image, accuracy))),
                    Some((_, Err(error))) => {
                        warn!(%error, "skipping cropped candidate");
                        None
                    }
                };
                bar.inc(1);
                entry
            })
            .collect();

        bar.finish();
        SignatureStore::from_entries(accuracy, entries)
    }
}

/// Image files directly inside `dir`, sorted by path
///
/// # Errors
///
/// Returns an error if the directory cannot be read
pub fn list_candidates(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        std::fs::read_dir(dir).map_err(|e| file_system_error(dir, "list candidates", e))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| file_system_error(dir, "list candidates", e))?
            .path();
        if !path.is_file() {
            continue;
        }
        if is_supported_image(&path) {
            files.push(path);
        } else {
            debug!(path = %path.display(), "ignoring non-image file");
        }
    }
    files.sort();
    Ok(files)
}
