use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

#[derive(Parser)]
#[command(
    name = "scribe-batch",
    about = "Fetch YouTube transcripts in rate-limited batches",
    version,
    long_about = "Fetches transcripts for up to 50 videos sequentially, pacing requests and backing off when YouTube rate limits. Writes one file per video or a single aggregated file, and reports every item's outcome."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch transcripts for a batch of videos
    Fetch {
        /// Video URLs or ids (1 to 50)
        #[arg(value_name = "URL_OR_ID", required = true)]
        identifiers: Vec<String>,

        /// Write one file per video, or all transcripts into one file
        #[arg(short, long, value_enum, default_value = "individual")]
        mode: OutputMode,

        /// Output directory (individual) or file (aggregated), relative to the output root
        #[arg(short, long, value_name = "PATH")]
        output: String,

        /// Include timestamps before each line
        #[arg(long)]
        timestamps: bool,

        /// Caption language (overrides the configured language)
        #[arg(short, long, value_name = "LANG")]
        language: Option<String>,

        /// Report format
        #[arg(short, long, value_enum, default_value = "text")]
        format: ReportFormat,
    },

    /// Show or initialize configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,

        /// Write a default configuration file
        #[arg(long)]
        init: bool,
    },
}

/// Where batch transcripts are written
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// One file per video inside the output directory
    Individual,
    /// A single file with a section per video
    Aggregated,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ReportFormat {
    /// Plain text
    Text,
    /// JSON
    Json,
}

impl std::fmt::Display for OutputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputMode::Individual => write!(f, "individual"),
            OutputMode::Aggregated => write!(f, "aggregated"),
        }
    }
}
