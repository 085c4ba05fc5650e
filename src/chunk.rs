//! Fixed-size sliding-window text chunker.
//!
//! Splits extracted text into windows of `chunk_size` characters, each
//! overlapping its predecessor by `overlap` characters. Windows are cut at
//! character offsets, not word or sentence boundaries, so a word may
//! straddle two chunks.

use std::fmt;

/// Rejected chunker configuration: a window that cannot advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfigError {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl fmt::Display for ChunkConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "chunk window cannot advance: overlap {} must be smaller than chunk size {}",
            self.overlap, self.chunk_size
        )
    }
}

impl std::error::Error for ChunkConfigError {}

/// Split `text` into overlapping windows of `chunk_size` characters.
///
/// Window `i` starts at character offset `i * (chunk_size - overlap)`; the
/// final window may be shorter. A trailing window that would start inside
/// its predecessor's overlap region carries no new text and is not emitted.
/// Empty input yields a single empty chunk, so every document contributes
/// at least one corpus row.
pub fn chunk_text(
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<String>, ChunkConfigError> {
    if overlap >= chunk_size {
        return Err(ChunkConfigError {
            chunk_size,
            overlap,
        });
    }

    // Offsets are in characters so a window boundary never lands inside a
    // multi-byte code point.
    let chars: Vec<char> = text.chars().collect();
    let step = chunk_size - overlap;

    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        start += step;
        if start + overlap >= chars.len() {
            break;
        }
    }

    Ok(chunks)
}
