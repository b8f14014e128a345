use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod identifier;
pub mod processor;
pub mod writer;
pub mod youtube;

pub use processor::{failure_message, DestinationHint, TranscriptProcessor};
pub use writer::WriteOptions;
pub use youtube::YtDlpFetcher;

/// One timed line of a transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Segment text
    pub text: String,

    /// Start time in seconds
    pub start_secs: f64,

    /// Duration in seconds
    pub duration_secs: f64,
}

impl TranscriptSegment {
    pub fn new(text: impl Into<String>, start_secs: f64, duration_secs: f64) -> Self {
        Self {
            text: text.into(),
            start_secs,
            duration_secs,
        }
    }
}

/// Errors raised by a transcript source.
///
/// Messages are unstructured on purpose: callers classify them by content.
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("No transcript found for {0}")]
    NoTranscript(String),

    #[error("yt-dlp failed: {0}")]
    Command(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Source of transcripts for a normalized identifier
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptFetcher: Send + Sync {
    /// Fetch every segment of the transcript; an empty list means none exists
    async fn fetch(&self, identifier: &str) -> Result<Vec<TranscriptSegment>, FetchError>;
}
