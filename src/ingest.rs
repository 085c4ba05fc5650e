//! Ingestion phase: documents → chunks → embeddings → corpus store.
//!
//! Scans the document directory for PDFs (sorted path order), extracts each
//! one, reads the spreadsheet's data rows, chunks everything, embeds the
//! chunks, and writes the corpus store pair. The store is rebuilt wholesale
//! on every run. Extraction and embedding failures are fatal for the whole
//! pass; nothing is skipped or retried.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

use crate::chunk::chunk_text;
use crate::config::Config;
use crate::embed::TextEmbedder;
use crate::extract;
use crate::index::FlatIndex;
use crate::ocr::OcrEngine;
use crate::sheet;
use crate::store::CorpusStore;

/// Chunked corpus text before embedding.
pub struct CollectedCorpus {
    pub chunks: Vec<String>,
    pub documents: usize,
    pub rows: usize,
}

/// Ingest counters for the summary output.
#[derive(Debug)]
pub struct IngestReport {
    pub documents: usize,
    pub rows: usize,
    pub chunks: usize,
    pub dims: usize,
}

/// Extract and chunk every input without touching the embedding model.
pub fn collect_corpus(config: &Config, ocr: &dyn OcrEngine) -> Result<CollectedCorpus> {
    let chunk_chars = config.chunking.chunk_chars;
    let overlap_chars = config.chunking.overlap_chars;

    let mut chunks = Vec::new();
    let mut documents = 0;

    for path in pdf_files(&config.documents.dir)? {
        info!(path = %path.display(), "extracting document");
        let text = extract::extract_pdf(&path, ocr, config.ocr.min_native_chars)
            .with_context(|| format!("extracting {}", path.display()))?;
        chunks.extend(chunk_text(&text, chunk_chars, overlap_chars)?);
        documents += 1;
    }

    let mut rows = 0;
    if let Some(sheet_path) = &config.documents.spreadsheet {
        let row_texts = sheet::read_rows(sheet_path)
            .with_context(|| format!("reading {}", sheet_path.display()))?;
        rows = row_texts.len();
        for row in &row_texts {
            chunks.extend(chunk_text(row, chunk_chars, overlap_chars)?);
        }
    }

    Ok(CollectedCorpus {
        chunks,
        documents,
        rows,
    })
}

/// Report item and chunk counts without embedding or writing anything.
pub fn run_dry_run(config: &Config, ocr: &dyn OcrEngine) -> Result<()> {
    let corpus = collect_corpus(config, ocr)?;
    println!("ingest (dry-run)");
    println!("  documents: {}", corpus.documents);
    println!("  spreadsheet rows: {}", corpus.rows);
    println!("  chunks: {}", corpus.chunks.len());
    Ok(())
}

/// Run the full ingest pass and write the corpus store.
pub fn run_ingest(
    config: &Config,
    ocr: &dyn OcrEngine,
    embedder: &mut dyn TextEmbedder,
) -> Result<IngestReport> {
    let corpus = collect_corpus(config, ocr)?;

    info!(
        chunks = corpus.chunks.len(),
        model = embedder.model_name(),
        "embedding corpus"
    );
    let vectors = embedder.embed(&corpus.chunks)?;

    let mut index = FlatIndex::new(embedder.dims());
    index.add(&vectors)?;

    let report = IngestReport {
        documents: corpus.documents,
        rows: corpus.rows,
        chunks: corpus.chunks.len(),
        dims: embedder.dims(),
    };

    let store = CorpusStore::new(index, corpus.chunks)?;
    ensure_parent(&config.store.index_path)?;
    ensure_parent(&config.store.chunks_path)?;
    store.save(&config.store.index_path, &config.store.chunks_path)?;

    println!("ingest");
    println!("  documents: {}", report.documents);
    println!("  spreadsheet rows: {}", report.rows);
    println!("  chunks: {}", report.chunks);
    println!("  vectors: {} ({} dims)", report.chunks, report.dims);
    println!(
        "  store: {} + {}",
        config.store.index_path.display(),
        config.store.chunks_path.display()
    );
    println!("ok");

    Ok(report)
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    Ok(())
}

/// PDF paths under `dir`, sorted for deterministic corpus order.
fn pdf_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        bail!("document directory does not exist: {}", dir.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        if is_pdf {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_pdf_files_filters_and_sorts() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("b.pdf"), b"").unwrap();
        fs::write(tmp.path().join("a.PDF"), b"").unwrap();
        fs::write(tmp.path().join("notes.txt"), b"").unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("sub/c.pdf"), b"").unwrap();

        let files = pdf_files(tmp.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(tmp.path()).unwrap().display().to_string())
            .collect();

        assert_eq!(names, vec!["a.PDF", "b.pdf", "sub/c.pdf"]);
    }

    #[test]
    fn test_missing_document_dir_fails() {
        let err = pdf_files(Path::new("no/such/dir")).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
