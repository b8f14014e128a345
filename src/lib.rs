//! Scribe Batch - rate-limited batch fetching of YouTube transcripts
//!
//! Transcripts are fetched one at a time through a single [`RateLimitedExecutor`],
//! which spaces requests and backs off on rate-limit errors. A batch writes either
//! one file per video or one aggregated file, and always reports an outcome for
//! every input.

pub mod batch;
pub mod cli;
pub mod config;
pub mod output;
pub mod ratelimit;
pub mod transcript;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use batch::{BatchError, BatchOrchestrator, BatchRequest, BatchSummary, ItemOutcome};
pub use cli::{Cli, Commands, OutputMode, ReportFormat};
pub use config::{Config, ThrottleConfig};
pub use ratelimit::{FailureKind, RateLimitedExecutor};
pub use transcript::{TranscriptFetcher, TranscriptSegment, YtDlpFetcher};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;
