//! Flat L2 vector index.
//!
//! Stores embeddings row-major in insertion order and answers
//! nearest-neighbor queries with an exhaustive L2 scan: recall is exact and
//! each query costs O(rows × dims). Rows are identified by their insertion
//! position, which is also the position of the matching chunk in the corpus
//! chunk list.
//!
//! The on-disk layout is a small header (magic, dims, row count) followed by
//! the rows as little-endian `f32` bytes.

use std::fmt;

const MAGIC: &[u8; 4] = b"CBKX";
const HEADER_LEN: usize = 12;

/// Errors raised by [`FlatIndex`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    /// A vector's dimension does not match the index dimension.
    DimensionMismatch { expected: usize, got: usize },
    /// A serialized index could not be decoded.
    Layout(String),
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexError::DimensionMismatch { expected, got } => {
                write!(f, "vector dimension {} does not match index dimension {}", got, expected)
            }
            IndexError::Layout(e) => write!(f, "bad index layout: {}", e),
        }
    }
}

impl std::error::Error for IndexError {}

/// Flat (exhaustive) L2 index over fixed-dimension `f32` vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dims: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Create an empty index for vectors of `dims` dimensions.
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            data: Vec::new(),
        }
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Number of stored rows.
    pub fn len(&self) -> usize {
        if self.dims == 0 {
            0
        } else {
            self.data.len() / self.dims
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append rows in the order given. Row ids ascend from the current size.
    pub fn add(&mut self, vectors: &[Vec<f32>]) -> Result<(), IndexError> {
        for v in vectors {
            if v.len() != self.dims {
                return Err(IndexError::DimensionMismatch {
                    expected: self.dims,
                    got: v.len(),
                });
            }
        }
        for v in vectors {
            self.data.extend_from_slice(v);
        }
        Ok(())
    }

    /// Return up to `k` `(row, distance)` pairs nearest to `query`,
    /// ascending by L2 distance. Equal distances resolve to the lower row
    /// id. When `k` exceeds the row count, every row is returned.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>, IndexError> {
        if query.len() != self.dims {
            return Err(IndexError::DimensionMismatch {
                expected: self.dims,
                got: query.len(),
            });
        }

        if self.data.is_empty() {
            return Ok(Vec::new());
        }

        let mut hits: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dims)
            .enumerate()
            .map(|(row, stored)| (row, l2_distance(query, stored)))
            .collect();

        // Stable sort keeps insertion order among equal distances.
        hits.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }

    /// Encode as header + little-endian `f32` rows.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.data.len() * 4);
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&(self.dims as u32).to_le_bytes());
        bytes.extend_from_slice(&(self.len() as u32).to_le_bytes());
        for &v in &self.data {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes
    }

    /// Decode the layout written by [`FlatIndex::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, IndexError> {
        if bytes.len() < HEADER_LEN {
            return Err(IndexError::Layout("file shorter than header".to_string()));
        }
        if &bytes[0..4] != MAGIC {
            return Err(IndexError::Layout("bad magic".to_string()));
        }
        let dims = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
        let rows = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;

        let payload = &bytes[HEADER_LEN..];
        let expected = dims
            .checked_mul(rows)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| IndexError::Layout("header overflows".to_string()))?;
        if payload.len() != expected {
            return Err(IndexError::Layout(format!(
                "expected {} payload bytes for {} rows of {} dims, found {}",
                expected,
                rows,
                dims,
                payload.len()
            )));
        }

        let data = payload
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok(Self { dims, data })
    }
}

fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}
