//! # Casebook CLI (`cbk`)
//!
//! The `cbk` binary drives the two pipeline phases and a retrieval
//! inspection command. All commands read a TOML configuration file.
//!
//! ```bash
//! cbk ingest --config ./casebook.toml        # build the corpus store
//! cbk ingest --dry-run                       # counts only, no model load
//! cbk search "wrist fracture"                # show nearest chunks
//! cbk ask "What similar cases exist about topic X?"
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use casebook::answer;
use casebook::config;
use casebook::embed;
use casebook::generate::OllamaGenerator;
use casebook::ingest;
use casebook::ocr::TesseractOcr;
use casebook::store::CorpusStore;

/// Casebook — question answering over case PDFs and spreadsheets.
#[derive(Parser)]
#[command(
    name = "cbk",
    about = "Casebook — a local-first question-answering pipeline over case PDFs and spreadsheets",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./casebook.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Rebuild the corpus store from the configured documents.
    ///
    /// Extracts every PDF under the document directory (scanned pages go
    /// through OCR) and every data row of the spreadsheet, chunks and
    /// embeds the text, and writes the index/chunk-list pair. Any
    /// extraction or embedding failure aborts the whole pass.
    Ingest {
        /// Show document and chunk counts without embedding or writing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the chunks nearest to a query, with distances.
    ///
    /// Useful for inspecting retrieval quality without involving the
    /// language model.
    Search {
        /// The query text.
        query: String,

        /// Maximum number of chunks to show (defaults to retrieval.top_k).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Answer a question from the ingested corpus.
    Ask {
        /// The question to answer.
        question: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Ingest { dry_run } => {
            let ocr = TesseractOcr::new(cfg.ocr.lang.clone(), cfg.ocr.dpi);
            if dry_run {
                ingest::run_dry_run(&cfg, &ocr)?;
            } else {
                let mut embedder = embed::create_embedder(&cfg.embedding)?;
                ingest::run_ingest(&cfg, &ocr, embedder.as_mut())?;
            }
        }
        Commands::Search { query, limit } => {
            let store = CorpusStore::load(&cfg.store.index_path, &cfg.store.chunks_path)?;
            let mut embedder = embed::create_embedder(&cfg.embedding)?;
            let k = limit.unwrap_or(cfg.retrieval.top_k);
            let hits = answer::retrieve(&store, embedder.as_mut(), &query, k)?;

            if hits.is_empty() {
                println!("No results.");
                return Ok(());
            }
            for (i, hit) in hits.iter().enumerate() {
                let snippet: String = hit.text.chars().take(240).collect();
                println!("{:>2}. row {} (distance {:.4})", i + 1, hit.row, hit.distance);
                println!("    {}", snippet);
            }
        }
        Commands::Ask { question } => {
            let store = CorpusStore::load(&cfg.store.index_path, &cfg.store.chunks_path)?;
            let mut embedder = embed::create_embedder(&cfg.embedding)?;
            let generator = OllamaGenerator::new(&cfg.generation);

            let completion = answer::answer(
                &store,
                embedder.as_mut(),
                &generator,
                &question,
                cfg.retrieval.top_k,
                &cfg.generation.template,
            )?;
            println!("{}", completion);
        }
    }

    Ok(())
}
