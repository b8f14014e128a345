use indicatif::ProgressBar;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::OutputMode;
use crate::ratelimit::{FailureKind, RateLimitedExecutor};
use crate::transcript::{TranscriptFetcher, TranscriptProcessor, WriteOptions};
use crate::utils::{validate_destination, PathError};

pub mod aggregated;
pub mod individual;

pub const MAX_BATCH_SIZE: usize = 50;

/// Fatal, batch-level errors; no summary is produced when one occurs
#[derive(thiserror::Error, Debug)]
pub enum BatchError {
    #[error("Batch must contain between 1 and {max} identifiers, got {count}")]
    InvalidBatchSize { count: usize, max: usize },

    #[error("Invalid destination: {0}")]
    InvalidDestination(#[from] PathError),

    #[error("Failed to prepare output {}: {source}", .path.display())]
    OutputSetup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to finalize output {}: {source}", .path.display())]
    StreamClose {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result for a single input identifier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemOutcome {
    pub identifier: String,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_kind: Option<FailureKind>,
}

impl ItemOutcome {
    pub fn success(
        identifier: impl Into<String>,
        destination: PathBuf,
        label: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            succeeded: true,
            destination: Some(destination),
            label: Some(label.into()),
            failure_message: None,
            failure_kind: None,
        }
    }

    pub fn failure(
        identifier: impl Into<String>,
        kind: FailureKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            succeeded: false,
            destination: None,
            label: None,
            failure_message: Some(message.into()),
            failure_kind: Some(kind),
        }
    }
}

/// One batch invocation
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub identifiers: Vec<String>,
    pub mode: OutputMode,
    /// Directory (individual) or file (aggregated), relative to the output root
    pub destination: String,
}

/// Outcomes in input order plus counts
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub outcomes: Vec<ItemOutcome>,
    pub destination: PathBuf,
    pub mode: OutputMode,
    pub total: usize,
    pub succeeded_count: usize,
    pub failed_count: usize,
}

impl BatchSummary {
    pub fn new(outcomes: Vec<ItemOutcome>, destination: PathBuf, mode: OutputMode) -> Self {
        let succeeded_count = outcomes.iter().filter(|o| o.succeeded).count();
        Self {
            total: outcomes.len(),
            failed_count: outcomes.len() - succeeded_count,
            succeeded_count,
            outcomes,
            destination,
            mode,
        }
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.outcomes.iter().filter(|o| o.succeeded)
    }

    pub fn failed(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded)
    }
}

/// Runs a batch sequentially through one shared [`RateLimitedExecutor`]
pub struct BatchOrchestrator<'a, F: TranscriptFetcher + ?Sized> {
    processor: TranscriptProcessor<'a, F>,
    output_root: PathBuf,
    progress: ProgressBar,
}

impl<'a, F: TranscriptFetcher + ?Sized> BatchOrchestrator<'a, F> {
    pub fn new(
        executor: &'a RateLimitedExecutor,
        fetcher: &'a F,
        output_root: impl Into<PathBuf>,
        options: WriteOptions,
    ) -> Self {
        Self {
            processor: TranscriptProcessor::new(executor, fetcher, options),
            output_root: output_root.into(),
            progress: ProgressBar::hidden(),
        }
    }

    /// Report per-item progress on `progress`
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub async fn run(&self, request: &BatchRequest) -> Result<BatchSummary, BatchError> {
        let count = request.identifiers.len();
        if count == 0 || count > MAX_BATCH_SIZE {
            return Err(BatchError::InvalidBatchSize {
                count,
                max: MAX_BATCH_SIZE,
            });
        }
        let destination = validate_destination(&self.output_root, &request.destination)?;

        tracing::info!(
            count,
            mode = %request.mode,
            destination = %destination.display(),
            "Starting batch"
        );
        self.progress.set_length(count as u64);

        let outcomes = match request.mode {
            OutputMode::Individual => {
                let identifiers = &request.identifiers;
                individual::run(&self.processor, identifiers, &destination, &self.progress).await?
            }
            OutputMode::Aggregated => {
                let identifiers = &request.identifiers;
                aggregated::run(&self.processor, identifiers, &destination, &self.progress).await?
            }
        };
        self.progress.finish_and_clear();

        let summary = BatchSummary::new(outcomes, destination, request.mode);
        tracing::info!(
            total = summary.total,
            succeeded = summary.succeeded_count,
            failed = summary.failed_count,
            "Batch complete"
        );
        Ok(summary)
    }
}
