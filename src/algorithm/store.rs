//! Candidate signature store
//!
//! Built once per run, from fresh extraction or from persisted metadata, and
//! read-only during assembly. Every signature in a store shares one accuracy,
//! so scores computed against it are always comparable.

use crate::analysis::signature::{Signature, expected_len};
use crate::io::error::{MosaicError, Result};
use crate::math::color::ColorSample;
use std::collections::{BTreeMap, HashMap};
use std::io::{Read, Write};

/// A candidate identifier paired with its signature
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CandidateEntry {
    /// Stable identifier, usually the path of the cropped candidate image
    pub id: String,
    /// Color signature of the candidate
    pub signature: Signature,
}

/// Mapping from candidate identifier to signature
#[derive(Clone, Debug)]
pub struct SignatureStore {
    accuracy: u32,
    entries: Vec<CandidateEntry>,
    positions: HashMap<String, usize>,
}

impl SignatureStore {
    /// Create an empty store for signatures of the given accuracy
    pub fn new(accuracy: u32) -> Self {
        Self {
            accuracy,
            entries: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// Build a store from (identifier, signature) pairs
    ///
    /// # Errors
    ///
    /// Returns an error if any signature has the wrong length or an identifier repeats
    pub fn from_entries<I>(accuracy: u32, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, Signature)>,
    {
        let mut store = Self::new(accuracy);
        for (id, signature) in entries {
            store.insert(id, signature)?;
        }
        Ok(store)
    }

    /// Add a candidate
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The signature length is not `accuracy²`
    /// - The identifier is already present
    pub fn insert(&mut self, id: impl Into<String>, signature: Signature) -> Result<usize> {
        let id = id.into();
        let expected = expected_len(self.accuracy);
        if signature.len() != expected {
            return Err(MosaicError::SignatureMismatch {
                id,
                expected,
                found: signature.len(),
            });
        }
        if self.positions.contains_key(&id) {
            return Err(MosaicError::DuplicateCandidate { id });
        }

        let index = self.entries.len();
        self.positions.insert(id.clone(), index);
        self.entries.push(CandidateEntry { id, signature });
        Ok(index)
    }

    /// Signature side length shared by all entries
    pub const fn accuracy(&self) -> u32 {
        self.accuracy
    }

    /// Number of candidates
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store has no candidates
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in insertion order
    pub fn entries(&self) -> &[CandidateEntry] {
        &self.entries
    }

    /// Entry at `index`
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of bounds
    pub fn entry(&self, index: usize) -> Result<&CandidateEntry> {
        self.entries
            .get(index)
            .ok_or(MosaicError::UnknownCandidate {
                index,
                store_size: self.entries.len(),
            })
    }

    /// Index of the candidate with the given identifier
    pub fn position(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    /// Signature of the candidate with the given identifier
    pub fn signature(&self, id: &str) -> Option<&Signature> {
        self.position(id)
            .and_then(|index| self.entries.get(index))
            .map(|entry| &entry.signature)
    }

    /// Serialize as a JSON object of identifier to sample arrays
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails
    pub fn write_json<W: Write>(&self, writer: W) -> serde_json::Result<()> {
        let persisted: BTreeMap<&str, &[ColorSample]> = self
            .entries
            .iter()
            .map(|entry| (entry.id.as_str(), entry.signature.samples()))
            .collect();
        serde_json::to_writer(writer, &persisted)
    }

    /// Deserialize from the JSON form written by [`Self::write_json`]
    ///
    /// Entries are ordered by identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a signature has the wrong length.
    /// Malformed JSON is reported as [`MosaicError::CacheFormat`] with an unknown path.
    pub fn read_json<R: Read>(reader: R, accuracy: u32) -> Result<Self> {
        let persisted: BTreeMap<String, Vec<ColorSample>> = serde_json::from_reader(reader)
            .map_err(|e| MosaicError::CacheFormat {
                path: "<unknown>".into(),
                source: e,
            })?;
        Self::from_entries(
            accuracy,
            persisted
                .into_iter()
                .map(|(id, samples)| (id, Signature::new(samples))),
        )
    }
}
