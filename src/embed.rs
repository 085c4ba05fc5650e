//! Sentence-embedding boundary.
//!
//! [`TextEmbedder`] is the capability the pipeline needs: an ordered batch
//! of N strings in, N vectors of a fixed dimension out, same order, no
//! caching. The production implementation runs a pretrained model locally
//! via fastembed; the model is downloaded on first use, then loaded into
//! memory once per embedder and dropped with it.

use std::fmt;

use crate::config::EmbeddingConfig;

/// Embedding failures.
#[derive(Debug, Clone)]
pub enum EmbedError {
    /// The model could not be resolved or loaded.
    ModelInit(String),
    /// Inference failed or returned a malformed batch.
    Inference(String),
}

impl fmt::Display for EmbedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmbedError::ModelInit(e) => write!(f, "embedding model failed to load: {}", e),
            EmbedError::Inference(e) => write!(f, "embedding inference failed: {}", e),
        }
    }
}

impl std::error::Error for EmbedError {}

/// Maps ordered text batches to equal-length batches of fixed-dimension
/// vectors.
pub trait TextEmbedder {
    /// Model identifier, for logging and store provenance.
    fn model_name(&self) -> &str;

    /// Output vector dimensionality.
    fn dims(&self) -> usize;

    /// Embed a batch. Returns one vector per input, in input order.
    fn embed(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;

    /// Embed a single query text.
    fn embed_one(&mut self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut vectors = self.embed(&[text.to_string()])?;
        vectors
            .pop()
            .ok_or_else(|| EmbedError::Inference("empty embedding batch".to_string()))
    }
}

/// Construct the configured embedder.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Box<dyn TextEmbedder>, EmbedError> {
    #[cfg(feature = "local-embeddings")]
    {
        Ok(Box::new(LocalEmbedder::new(config)?))
    }
    #[cfg(not(feature = "local-embeddings"))]
    {
        let _ = config;
        Err(EmbedError::ModelInit(
            "this build has no embedding backend; rebuild with the local-embeddings feature"
                .to_string(),
        ))
    }
}

#[cfg(feature = "local-embeddings")]
pub use local::LocalEmbedder;

#[cfg(feature = "local-embeddings")]
mod local {
    use super::{EmbedError, TextEmbedder};
    use crate::config::EmbeddingConfig;
    use tracing::info;

    /// Local sentence embeddings via fastembed.
    pub struct LocalEmbedder {
        model_name: String,
        dims: usize,
        batch_size: usize,
        model: fastembed::TextEmbedding,
    }

    impl LocalEmbedder {
        /// Resolve and load the configured model. The first call for a
        /// given model downloads it to the local cache.
        pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbedError> {
            let (fastembed_model, default_dims) = model_by_name(&config.model)?;
            let dims = config.dims.unwrap_or(default_dims);

            info!(model = %config.model, dims, "loading embedding model");
            let model = fastembed::TextEmbedding::try_new(
                fastembed::InitOptions::new(fastembed_model).with_show_download_progress(true),
            )
            .map_err(|e| EmbedError::ModelInit(e.to_string()))?;

            Ok(Self {
                model_name: config.model.clone(),
                dims,
                batch_size: config.batch_size,
                model,
            })
        }
    }

    impl TextEmbedder for LocalEmbedder {
        fn model_name(&self) -> &str {
            &self.model_name
        }

        fn dims(&self) -> usize {
            self.dims
        }

        fn embed(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
            let vectors = self
                .model
                .embed(texts.to_vec(), Some(self.batch_size))
                .map_err(|e| EmbedError::Inference(e.to_string()))?;
            if vectors.len() != texts.len() {
                return Err(EmbedError::Inference(format!(
                    "model returned {} vectors for {} texts",
                    vectors.len(),
                    texts.len()
                )));
            }
            Ok(vectors)
        }
    }

    fn model_by_name(name: &str) -> Result<(fastembed::EmbeddingModel, usize), EmbedError> {
        match name {
            "all-minilm-l6-v2" => Ok((fastembed::EmbeddingModel::AllMiniLML6V2, 384)),
            "bge-small-en-v1.5" => Ok((fastembed::EmbeddingModel::BGESmallENV15, 384)),
            "bge-base-en-v1.5" => Ok((fastembed::EmbeddingModel::BGEBaseENV15, 768)),
            "nomic-embed-text-v1.5" => Ok((fastembed::EmbeddingModel::NomicEmbedTextV15, 768)),
            "multilingual-e5-small" => Ok((fastembed::EmbeddingModel::MultilingualE5Small, 384)),
            "multilingual-e5-base" => Ok((fastembed::EmbeddingModel::MultilingualE5Base, 768)),
            other => Err(EmbedError::ModelInit(format!(
                "unknown embedding model: '{}'. Supported models: all-minilm-l6-v2, \
                 bge-small-en-v1.5, bge-base-en-v1.5, nomic-embed-text-v1.5, \
                 multilingual-e5-small, multilingual-e5-base",
                other
            ))),
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_unknown_model_name_rejected() {
            let err = model_by_name("word2vec-classic").unwrap_err();
            assert!(matches!(err, EmbedError::ModelInit(_)));
            assert!(err.to_string().contains("word2vec-classic"));
        }

        #[test]
        fn test_known_models_carry_dims() {
            let (_, dims) = model_by_name("all-minilm-l6-v2").unwrap();
            assert_eq!(dims, 384);
            let (_, dims) = model_by_name("multilingual-e5-base").unwrap();
            assert_eq!(dims, 768);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Embeds each text as [len, vowel count].
    struct CountingEmbedder;

    impl TextEmbedder for CountingEmbedder {
        fn model_name(&self) -> &str {
            "counting"
        }

        fn dims(&self) -> usize {
            2
        }

        fn embed(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
            Ok(texts
                .iter()
                .map(|t| {
                    let vowels = t.chars().filter(|c| "aeiou".contains(*c)).count();
                    vec![t.len() as f32, vowels as f32]
                })
                .collect())
        }
    }

    #[test]
    fn test_embed_preserves_order_and_count() {
        let mut embedder = CountingEmbedder;
        let texts = vec!["ab".to_string(), "aeiou".to_string(), String::new()];
        let vectors = embedder.embed(&texts).unwrap();
        assert_eq!(vectors.len(), 3);
        assert_eq!(vectors[0], vec![2.0, 1.0]);
        assert_eq!(vectors[1], vec![5.0, 5.0]);
        assert_eq!(vectors[2], vec![0.0, 0.0]);
    }

    #[test]
    fn test_embed_one_unwraps_single_vector() {
        let mut embedder = CountingEmbedder;
        let vector = embedder.embed_one("aaa").unwrap();
        assert_eq!(vector, vec![3.0, 3.0]);
    }
}
