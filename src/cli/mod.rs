//! CLI module for pdfrag.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// pdfrag - Question answering over a folder of PDFs
///
/// Indexes PDFs into Elasticsearch with Amazon Bedrock embeddings and answers
/// questions with a tool-calling agent.
#[derive(Parser, Debug)]
#[command(name = "pdfrag")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load, index and answer one question in a single pass
    Run {
        /// Question for the agent (defaults to the configured question)
        question: Option<String>,

        /// Folder of PDFs (defaults to the configured input directory)
        #[arg(short, long)]
        dir: Option<String>,
    },

    /// Load and index the PDFs in a folder
    Index {
        /// Folder of PDFs (defaults to the configured input directory)
        #[arg(short, long)]
        dir: Option<String>,

        /// Descend into subfolders
        #[arg(short, long)]
        recursive: bool,

        /// Leave files that are already indexed untouched
        #[arg(long)]
        skip_existing: bool,
    },

    /// Ask the agent a question over the existing index
    Ask {
        /// The question to ask
        question: String,
    },

    /// Answer a question with the query engine only and show sources
    Query {
        /// The question to ask
        question: String,

        /// Number of chunks to retrieve
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Search for relevant chunks
    Search {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value = "5")]
        limit: usize,

        /// Minimum similarity score (0.0-1.0)
        #[arg(short, long, default_value = "0.0")]
        min_score: f32,
    },

    /// List indexed files
    List,

    /// Check configuration and connectivity
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write a configuration file with the current values
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}
