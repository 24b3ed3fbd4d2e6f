//! Threshold-expanding randomized nearest-signature search
//!
//! Always returning the single closest candidate makes a mosaic repeat the same
//! few images across every similar region. Instead, every candidate scoring
//! below a threshold forms a qualifying pool and one member is drawn uniformly.
//! When the pool is too small the threshold is relaxed step by step, up to a
//! fixed number of expansions.

use crate::algorithm::store::SignatureStore;
use crate::analysis::signature::Signature;
use crate::io::configuration::{
    DEFAULT_MAX_RETRIES, DEFAULT_MIN_POOL, DEFAULT_THRESHOLD, DEFAULT_THRESHOLD_STEP,
};
use crate::io::error::{MosaicError, Result, invalid_parameter};
use bitvec::slice::BitSlice;
use rand::Rng;
use tracing::trace;

/// Parameters of the threshold-expanding search
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchConfig {
    /// Score threshold of the first pass
    pub initial_threshold: f64,
    /// Amount added to the threshold on each retry
    pub threshold_step: f64,
    /// Qualifying candidates required before a random pick is made
    pub min_pool: usize,
    /// Maximum number of threshold expansions per match
    pub max_retries: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            initial_threshold: DEFAULT_THRESHOLD,
            threshold_step: DEFAULT_THRESHOLD_STEP,
            min_pool: DEFAULT_MIN_POOL,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl MatchConfig {
    /// Check that the search is well defined
    ///
    /// # Errors
    ///
    /// Returns an error if the threshold is not finite, the step is not a positive
    /// finite number, or the minimum pool size is zero
    pub fn validate(&self) -> Result<()> {
        if !self.initial_threshold.is_finite() {
            return Err(invalid_parameter(
                "threshold",
                &self.initial_threshold,
                &"must be a finite number",
            ));
        }
        if !self.threshold_step.is_finite() || self.threshold_step <= 0.0 {
            return Err(invalid_parameter(
                "threshold_step",
                &self.threshold_step,
                &"must be a positive finite number",
            ));
        }
        if self.min_pool == 0 {
            return Err(invalid_parameter(
                "min_pool",
                &self.min_pool,
                &"must be at least one",
            ));
        }
        Ok(())
    }
}

/// Outcome of a single match
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchResult {
    /// Store index of the chosen candidate
    pub index: usize,
    /// Score of the chosen candidate
    pub score: f64,
    /// Store index of the lowest-scoring candidate
    pub best_index: usize,
    /// Lowest score seen
    pub best_score: f64,
    /// Threshold at which the pool qualified
    pub threshold: f64,
    /// Number of threshold expansions performed
    pub retries: usize,
    /// Size of the qualifying pool the choice was drawn from
    pub pool_size: usize,
}

/// Selects candidates for cell signatures
#[derive(Clone, Copy, Debug, Default)]
pub struct Matcher {
    config: MatchConfig,
}

impl Matcher {
    /// Create a matcher with the given search parameters
    pub const fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    /// Search parameters in use
    pub const fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Choose a candidate for `cell` from the whole store
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A candidate signature length differs from the cell signature
    /// - Fewer than `min_pool` candidates exist
    /// - `max_retries` expansions do not produce a large enough pool
    pub fn find_match<R: Rng + ?Sized>(
        &self,
        cell: &Signature,
        store: &SignatureStore,
        rng: &mut R,
    ) -> Result<MatchResult> {
        self.select(cell, store, None, rng)
    }

    /// Choose a candidate for `cell`, ignoring candidates whose bit is set in `consumed`
    ///
    /// # Errors
    ///
    /// Same conditions as [`Self::find_match`], counted over unconsumed candidates only
    pub fn find_match_excluding<R: Rng + ?Sized>(
        &self,
        cell: &Signature,
        store: &SignatureStore,
        consumed: &BitSlice,
        rng: &mut R,
    ) -> Result<MatchResult> {
        self.select(cell, store, Some(consumed), rng)
    }

    /// Score every available candidate against `cell`
    ///
    /// Returns (store index, total score) pairs in store order.
    ///
    /// # Errors
    ///
    /// Returns an error if a candidate signature length differs from the cell signature
    pub fn score_candidates(
        cell: &Signature,
        store: &SignatureStore,
        excluded: Option<&BitSlice>,
    ) -> Result<Vec<(usize, f64)>> {
        let mut scored = Vec::with_capacity(store.len());
        for (index, entry) in store.entries().iter().enumerate() {
            if excluded.is_some_and(|bits| bits.get(index).is_some_and(|bit| *bit)) {
                continue;
            }
            let score =
                cell.score(&entry.signature)
                    .ok_or_else(|| MosaicError::SignatureMismatch {
                        id: entry.id.clone(),
                        expected: cell.len(),
                        found: entry.signature.len(),
                    })?;
            scored.push((index, score));
        }
        Ok(scored)
    }

    fn select<R: Rng + ?Sized>(
        &self,
        cell: &Signature,
        store: &SignatureStore,
        excluded: Option<&BitSlice>,
        rng: &mut R,
    ) -> Result<MatchResult> {
        let scored = Self::score_candidates(cell, store, excluded)?;
        let min_pool = self.config.min_pool.max(1);

        // Pool-size guard: no threshold can ever qualify enough candidates
        if scored.len() < min_pool {
            return Err(MosaicError::PoolExhausted {
                pool_size: scored.len(),
                retries: 0,
                final_threshold: self.config.initial_threshold,
                cell: None,
            });
        }

        let (best_index, best_score) = scored.iter().fold(
            (usize::MAX, f64::INFINITY),
            |best, &(index, score)| if score < best.1 { (index, score) } else { best },
        );

        let mut threshold = self.config.initial_threshold;
        let mut qualifying: Vec<(usize, f64)> = Vec::with_capacity(scored.len());
        for retries in 0..=self.config.max_retries {
            qualifying.clear();
            qualifying.extend(scored.iter().filter(|(_, score)| *score < threshold));

            if qualifying.len() >= min_pool {
                let pick = rng.random_range(0..qualifying.len());
                if let Some(&(index, score)) = qualifying.get(pick) {
                    trace!(index, score, threshold, retries, "matched cell");
                    return Ok(MatchResult {
                        index,
                        score,
                        best_index,
                        best_score,
                        threshold,
                        retries,
                        pool_size: qualifying.len(),
                    });
                }
            }

            if retries < self.config.max_retries {
                threshold += self.config.threshold_step;
            }
        }

        Err(MosaicError::PoolExhausted {
            pool_size: scored.len(),
            retries: self.config.max_retries,
            final_threshold: threshold,
            cell: None,
        })
    }
}
