use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub documents: DocumentsConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DocumentsConfig {
    /// Directory scanned (recursively) for PDF documents.
    pub dir: PathBuf,
    /// Optional workbook of case rows, ingested after the PDFs.
    #[serde(default)]
    pub spreadsheet: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_chars")]
    pub chunk_chars: usize,
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_chars: default_chunk_chars(),
            overlap_chars: default_overlap_chars(),
        }
    }
}

fn default_chunk_chars() -> usize {
    500
}
fn default_overlap_chars() -> usize {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct OcrConfig {
    /// Recognition language passed to the OCR engine.
    #[serde(default = "default_ocr_lang")]
    pub lang: String,
    /// Pages with fewer trimmed native characters than this are treated as
    /// scans and OCR'd. A heuristic with no deeper rationale; tune per
    /// corpus.
    #[serde(default = "default_min_native_chars")]
    pub min_native_chars: usize,
    /// Render resolution for pages sent to OCR.
    #[serde(default = "default_ocr_dpi")]
    pub dpi: u32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            lang: default_ocr_lang(),
            min_native_chars: default_min_native_chars(),
            dpi: default_ocr_dpi(),
        }
    }
}

fn default_ocr_lang() -> String {
    "spa".to_string()
}
fn default_min_native_chars() -> usize {
    20
}
fn default_ocr_dpi() -> u32 {
    300
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Override the model's known dimensionality, if set.
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            dims: None,
            batch_size: default_batch_size(),
        }
    }
}

fn default_embedding_model() -> String {
    "all-minilm-l6-v2".to_string()
}
fn default_batch_size() -> usize {
    64
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,
    #[serde(default = "default_chunks_path")]
    pub chunks_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            index_path: default_index_path(),
            chunks_path: default_chunks_path(),
        }
    }
}

fn default_index_path() -> PathBuf {
    PathBuf::from("data/corpus.index")
}
fn default_chunks_path() -> PathBuf {
    PathBuf::from("data/corpus.chunks.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_url")]
    pub url: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Generation halts at the first of these sequences.
    #[serde(default = "default_stop")]
    pub stop: Vec<String>,
    /// Prompt template; `{context}` and `{question}` are substituted.
    #[serde(default = "default_template")]
    pub template: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            url: default_generation_url(),
            model: default_generation_model(),
            max_tokens: default_max_tokens(),
            stop: default_stop(),
            template: default_template(),
        }
    }
}

fn default_generation_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_generation_model() -> String {
    "llama3".to_string()
}
fn default_max_tokens() -> u32 {
    300
}
fn default_stop() -> Vec<String> {
    vec!["\n".to_string()]
}
fn default_template() -> String {
    "Use the following context to answer the question.\n\n{context}\n\nQuestion: {question}\nAnswer:"
        .to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate chunking
    if config.chunking.chunk_chars == 0 {
        anyhow::bail!("chunking.chunk_chars must be > 0");
    }
    if config.chunking.overlap_chars >= config.chunking.chunk_chars {
        anyhow::bail!(
            "chunking.overlap_chars ({}) must be smaller than chunking.chunk_chars ({})",
            config.chunking.overlap_chars,
            config.chunking.chunk_chars
        );
    }

    // Validate retrieval
    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }

    // Validate embedding
    if config.embedding.dims == Some(0) {
        anyhow::bail!("embedding.dims must be > 0 when set");
    }
    if config.embedding.batch_size == 0 {
        anyhow::bail!("embedding.batch_size must be > 0");
    }

    // Validate generation
    if config.generation.max_tokens == 0 {
        anyhow::bail!("generation.max_tokens must be > 0");
    }
    for placeholder in ["{context}", "{question}"] {
        if !config.generation.template.contains(placeholder) {
            anyhow::bail!("generation.template must contain {}", placeholder);
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(body: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let file = write_config("[documents]\ndir = \"cases\"\n");
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.chunking.chunk_chars, 500);
        assert_eq!(config.chunking.overlap_chars, 100);
        assert_eq!(config.ocr.min_native_chars, 20);
        assert_eq!(config.ocr.lang, "spa");
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.generation.stop, vec!["\n".to_string()]);
        assert!(config.documents.spreadsheet.is_none());
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk() {
        let file = write_config(
            "[documents]\ndir = \"cases\"\n[chunking]\nchunk_chars = 100\noverlap_chars = 100\n",
        );
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("overlap_chars"));
    }

    #[test]
    fn test_template_must_keep_placeholders() {
        let file = write_config(
            "[documents]\ndir = \"cases\"\n[generation]\ntemplate = \"Answer: {question}\"\n",
        );
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("{context}"));
    }

    #[test]
    fn test_zero_top_k_rejected() {
        let file = write_config("[documents]\ndir = \"cases\"\n[retrieval]\ntop_k = 0\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = load_config(Path::new("no/such/casebook.toml")).unwrap_err();
        assert!(err.to_string().contains("casebook.toml"));
    }
}
