//! Persisted corpus: a vector index file paired with a chunk-list file.
//!
//! The two files are written together and only make sense together: row `i`
//! of the index is the embedding of entry `i` in the chunk list. The pair is
//! rebuilt wholesale on every ingest; there is no update or delete path.
//! The writes are atomic only by convention — a crash between them leaves a
//! mismatched pair, which [`CorpusStore::load`] reports as corrupt.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::index::{FlatIndex, IndexError};

/// Corpus store persistence errors.
#[derive(Debug)]
pub enum StoreError {
    /// One of the pair's files does not exist.
    Missing(PathBuf),
    /// A file exists but cannot be decoded, or the pair is inconsistent.
    Corrupt(String),
    /// Any other filesystem failure.
    Io(PathBuf, io::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Missing(path) => write!(f, "corpus file missing: {}", path.display()),
            StoreError::Corrupt(e) => write!(f, "corpus store corrupt: {}", e),
            StoreError::Io(path, e) => write!(f, "corpus store i/o on {}: {}", path.display(), e),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(_, e) => Some(e),
            _ => None,
        }
    }
}

/// A chunk returned from a nearest-neighbor lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct Retrieved {
    pub row: usize,
    pub distance: f32,
    pub text: String,
}

/// The pairing of a [`FlatIndex`] with its ordered chunk list.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusStore {
    index: FlatIndex,
    chunks: Vec<String>,
}

impl CorpusStore {
    /// Pair an index with its chunk list. The row count must equal the
    /// chunk count.
    pub fn new(index: FlatIndex, chunks: Vec<String>) -> Result<Self, StoreError> {
        if index.len() != chunks.len() {
            return Err(StoreError::Corrupt(format!(
                "index has {} rows but chunk list has {} entries",
                index.len(),
                chunks.len()
            )));
        }
        Ok(Self { index, chunks })
    }

    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Look up the `k` chunks nearest to `query`, with their distances.
    pub fn nearest(&self, query: &[f32], k: usize) -> Result<Vec<Retrieved>, IndexError> {
        let hits = self.index.search(query, k)?;
        Ok(hits
            .into_iter()
            .map(|(row, distance)| Retrieved {
                row,
                distance,
                text: self.chunks[row].clone(),
            })
            .collect())
    }

    /// Write the index file, then the chunk-list file.
    pub fn save(&self, index_path: &Path, chunks_path: &Path) -> Result<(), StoreError> {
        fs::write(index_path, self.index.to_bytes())
            .map_err(|e| StoreError::Io(index_path.to_path_buf(), e))?;

        let json = serde_json::to_vec(&self.chunks)
            .map_err(|e| StoreError::Corrupt(format!("chunk list did not serialize: {}", e)))?;
        fs::write(chunks_path, json).map_err(|e| StoreError::Io(chunks_path.to_path_buf(), e))?;
        Ok(())
    }

    /// Read both files back and re-check the row-count invariant.
    pub fn load(index_path: &Path, chunks_path: &Path) -> Result<Self, StoreError> {
        let index_bytes = read_required(index_path)?;
        let chunk_bytes = read_required(chunks_path)?;

        let index = FlatIndex::from_bytes(&index_bytes)
            .map_err(|e| StoreError::Corrupt(format!("{}: {}", index_path.display(), e)))?;
        let chunks: Vec<String> = serde_json::from_slice(&chunk_bytes)
            .map_err(|e| StoreError::Corrupt(format!("{}: {}", chunks_path.display(), e)))?;

        Self::new(index, chunks)
    }
}

fn read_required(path: &Path) -> Result<Vec<u8>, StoreError> {
    match fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(StoreError::Missing(path.to_path_buf()))
        }
        Err(e) => Err(StoreError::Io(path.to_path_buf(), e)),
    }
}
