//! Query phase: retrieve context and generate an answer.
//!
//! The question is embedded with the same model that built the corpus, the
//! nearest chunks are pulled from the store, and the prompt template is
//! filled with the context block and the question before one generation
//! call. The prompt is transient; nothing here writes to the store.

use anyhow::Result;

use crate::embed::TextEmbedder;
use crate::generate::Generator;
use crate::store::{CorpusStore, Retrieved};

/// Embed `question` and return its `top_k` nearest chunks.
pub fn retrieve(
    store: &CorpusStore,
    embedder: &mut dyn TextEmbedder,
    question: &str,
    top_k: usize,
) -> Result<Vec<Retrieved>> {
    let query = embedder.embed_one(question)?;
    Ok(store.nearest(&query, top_k)?)
}

/// Fill `template`, joining the retrieved chunks with blank lines into the
/// `{context}` block.
pub fn build_prompt(template: &str, context: &[Retrieved], question: &str) -> String {
    let context_block = context
        .iter()
        .map(|r| r.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    template
        .replace("{context}", &context_block)
        .replace("{question}", question)
}

/// Answer `question` against the store: retrieve, assemble, generate.
/// Returns the trimmed completion.
pub fn answer(
    store: &CorpusStore,
    embedder: &mut dyn TextEmbedder,
    generator: &dyn Generator,
    question: &str,
    top_k: usize,
    template: &str,
) -> Result<String> {
    let context = retrieve(store, embedder, question, top_k)?;
    let prompt = build_prompt(template, &context, question);
    let completion = generator.complete(&prompt)?;
    Ok(completion.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerationConfig;
    use crate::embed::EmbedError;
    use crate::generate::GenerateError;
    use crate::index::FlatIndex;
    use std::cell::RefCell;

    /// One-hot embeddings keyed on a known keyword per dimension.
    struct KeywordEmbedder {
        keywords: Vec<&'static str>,
    }

    impl TextEmbedder for KeywordEmbedder {
        fn model_name(&self) -> &str {
            "keyword"
        }

        fn dims(&self) -> usize {
            self.keywords.len()
        }

        fn embed(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
            Ok(texts
                .iter()
                .map(|t| {
                    self.keywords
                        .iter()
                        .map(|k| if t.contains(k) { 1.0 } else { 0.0 })
                        .collect()
                })
                .collect())
        }
    }

    /// Returns a canned completion and records the prompt it was given.
    struct CapturingGenerator {
        prompt_seen: RefCell<Option<String>>,
    }

    impl CapturingGenerator {
        fn new() -> Self {
            Self {
                prompt_seen: RefCell::new(None),
            }
        }
    }

    impl Generator for CapturingGenerator {
        fn complete(&self, prompt: &str) -> Result<String, GenerateError> {
            *self.prompt_seen.borrow_mut() = Some(prompt.to_string());
            Ok("  the matching case is case X  \n".to_string())
        }
    }

    fn keyword_store(embedder: &mut KeywordEmbedder, chunks: &[&str]) -> CorpusStore {
        let texts: Vec<String> = chunks.iter().map(|c| c.to_string()).collect();
        let vectors = embedder.embed(&texts).unwrap();
        let mut index = FlatIndex::new(embedder.dims());
        index.add(&vectors).unwrap();
        CorpusStore::new(index, texts).unwrap()
    }

    #[test]
    fn test_build_prompt_joins_context_with_blank_lines() {
        let context = vec![
            Retrieved {
                row: 0,
                distance: 0.1,
                text: "first chunk".to_string(),
            },
            Retrieved {
                row: 1,
                distance: 0.2,
                text: "second chunk".to_string(),
            },
        ];
        let template = GenerationConfig::default().template;

        let prompt = build_prompt(&template, &context, "what happened?");

        assert!(prompt.contains("first chunk\n\nsecond chunk"));
        assert!(prompt.contains("Question: what happened?"));
        assert!(!prompt.contains("{context}"));
        assert!(!prompt.contains("{question}"));
    }

    #[test]
    fn test_answer_feeds_matching_chunk_to_generator() {
        let mut embedder = KeywordEmbedder {
            keywords: vec!["X", "Y"],
        };
        let store = keyword_store(
            &mut embedder,
            &["case about topic X", "case about topic Y", "unrelated case"],
        );
        let generator = CapturingGenerator::new();
        let template = GenerationConfig::default().template;

        let completion = answer(&store, &mut embedder, &generator, "X?", 3, &template).unwrap();

        assert_eq!(completion, "the matching case is case X");
        let prompt = generator.prompt_seen.borrow().clone().unwrap();
        assert!(prompt.contains("case about topic X"));
        assert!(prompt.contains("X?"));
    }

    #[test]
    fn test_retrieve_honors_top_k() {
        let mut embedder = KeywordEmbedder {
            keywords: vec!["X"],
        };
        let store = keyword_store(&mut embedder, &["X one", "X two", "other", "another"]);

        let hits = retrieve(&store, &mut embedder, "X?", 2).unwrap();

        assert_eq!(hits.len(), 2);
        // Both keyword matches sit closer to the query than the rest.
        assert_eq!(hits[0].text, "X one");
        assert_eq!(hits[1].text, "X two");
    }
}
