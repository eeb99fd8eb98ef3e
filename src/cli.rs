use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Deployment profile (development, production)
    #[arg(short, long)]
    pub profile: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the canonical form of a prompt
    Normalize {
        /// Prompt text (comma-separated)
        prompt: String,
    },

    /// List the blocks of a prompt
    Blocks {
        /// Prompt text (comma-separated)
        prompt: String,
    },

    /// Translate a single text
    Translate {
        /// Text to translate
        text: String,

        /// Translate into English instead of from it
        #[arg(long)]
        to_english: bool,
    },

    /// Translate every block of a prompt with one batch request
    TranslateAll {
        /// Prompt text (comma-separated)
        prompt: String,

        /// Translate into English instead of from it
        #[arg(long)]
        to_english: bool,

        /// Pick the direction from the prompt content (CJK text goes to English)
        #[arg(long, conflicts_with = "to_english")]
        auto_direction: bool,
    },

    /// Reorder the blocks of a prompt
    Reorder {
        /// Prompt text (comma-separated)
        prompt: String,

        /// New order as zero-based block positions (comma-separated)
        #[arg(short, long)]
        order: String,
    },
}

/// Parse a comma-separated list of block positions
pub fn parse_order(order: &str) -> std::result::Result<Vec<usize>, String> {
    order
        .split(',')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(|piece| {
            piece
                .parse::<usize>()
                .map_err(|e| format!("Invalid position '{}': {}", piece, e))
        })
        .collect()
}
