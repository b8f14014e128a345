//! Aggregated output: every transcript in one file, each under its own header.
//!
//! Layout:
//!
//! ```text
//! # Transcript Batch
//! # Items: 2
//! # Generated: 2024-05-01T12:00:00+00:00
//! # Mode: aggregated
//!
//! ## Source: <identifier>
//! ## Status: success
//! ## Label: <label>
//!
//! <transcript lines>
//!
//! ================================...
//!
//! ## Source: <identifier>
//! ## Status: failed
//! ## Error: <message>
//! ```

use indicatif::ProgressBar;
use std::path::Path;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

use super::{BatchError, ItemOutcome};
use crate::transcript::processor::ItemFailure;
use crate::transcript::writer::{derive_label, write_segments, WriteOptions};
use crate::transcript::{TranscriptFetcher, TranscriptProcessor, TranscriptSegment};
use crate::utils::single_line;

const SEPARATOR_WIDTH: usize = 80;

fn header(count: usize) -> String {
    format!(
        "# Transcript Batch\n# Items: {}\n# Generated: {}\n# Mode: aggregated\n\n",
        count,
        chrono::Utc::now().to_rfc3339()
    )
}

fn separator() -> String {
    format!("\n{}\n\n", "=".repeat(SEPARATOR_WIDTH))
}

async fn write_success<W: AsyncWrite + Unpin>(
    out: &mut W,
    identifier: &str,
    label: &str,
    segments: &[TranscriptSegment],
    options: &WriteOptions,
) -> std::io::Result<()> {
    let meta = format!("## Source: {}\n## Status: success\n## Label: {}\n\n", identifier, label);
    out.write_all(meta.as_bytes()).await?;
    write_segments(out, segments, options).await
}

async fn write_failure<W: AsyncWrite + Unpin>(
    out: &mut W,
    identifier: &str,
    failure: &ItemFailure,
) -> std::io::Result<()> {
    let meta = format!(
        "## Source: {}\n## Status: failed\n## Error: {}\n",
        identifier,
        single_line(&failure.message)
    );
    out.write_all(meta.as_bytes()).await
}

/// Write one item's block (preceded by a separator after the first item)
async fn write_item<W: AsyncWrite + Unpin>(
    out: &mut W,
    index: usize,
    identifier: &str,
    fetched: &Result<Vec<TranscriptSegment>, ItemFailure>,
    options: &WriteOptions,
) -> std::io::Result<Option<String>> {
    if index > 0 {
        out.write_all(separator().as_bytes()).await?;
    }
    match fetched {
        Ok(segments) => {
            let label = derive_label(segments.first());
            write_success(out, identifier, &label, segments, options).await?;
            Ok(Some(label))
        }
        Err(failure) => {
            write_failure(out, identifier, failure).await?;
            Ok(None)
        }
    }
}

/// Fetch one item and append it to the shared stream; never fails the batch
async fn process_into<F, W>(
    processor: &TranscriptProcessor<'_, F>,
    out: &mut W,
    path: &Path,
    index: usize,
    identifier: &str,
) -> ItemOutcome
where
    F: TranscriptFetcher + ?Sized,
    W: AsyncWrite + Unpin,
{
    let fetched = processor.fetch_segments(identifier).await;
    let written = write_item(out, index, identifier, &fetched, processor.options()).await;

    match (fetched, written) {
        (_, Err(error)) => {
            let raw = format!("failed to write to aggregated output: {}", error);
            let failure = ItemFailure::from_raw(&raw);
            tracing::warn!("Failed to write {}: {}", identifier, failure.message);
            ItemOutcome::failure(identifier, failure.kind, failure.message)
        }
        (Err(failure), Ok(_)) => {
            tracing::warn!("Failed to fetch {}: {}", identifier, failure.message);
            ItemOutcome::failure(identifier, failure.kind, failure.message)
        }
        (Ok(_), Ok(label)) => {
            tracing::info!("Appended transcript for {}", identifier);
            ItemOutcome::success(identifier, path.to_path_buf(), label.unwrap_or_default())
        }
    }
}

/// Write all transcripts into the single file at `path`.
///
/// The stream is closed once after the loop; a failed close is fatal and the
/// partial file is removed.
pub async fn run<F: TranscriptFetcher + ?Sized>(
    processor: &TranscriptProcessor<'_, F>,
    identifiers: &[String],
    path: &Path,
    progress: &ProgressBar,
) -> Result<Vec<ItemOutcome>, BatchError> {
    let setup_error = |source| BatchError::OutputSetup {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs_err::tokio::create_dir_all(parent).await.map_err(setup_error)?;
    }
    let file = fs_err::tokio::File::create(path).await.map_err(setup_error)?;
    let mut out = BufWriter::new(file);

    write_stream(processor, identifiers, path, &mut out, progress).await
}

/// Header, one block per item, then a single shutdown of `out`.
///
/// `path` is the file behind `out`; it is removed when the header or the close fails.
async fn write_stream<F, W>(
    processor: &TranscriptProcessor<'_, F>,
    identifiers: &[String],
    path: &Path,
    out: &mut W,
    progress: &ProgressBar,
) -> Result<Vec<ItemOutcome>, BatchError>
where
    F: TranscriptFetcher + ?Sized,
    W: AsyncWrite + Unpin,
{
    if let Err(source) = out.write_all(header(identifiers.len()).as_bytes()).await {
        discard(path).await;
        return Err(BatchError::OutputSetup {
            path: path.to_path_buf(),
            source,
        });
    }

    let mut outcomes = Vec::with_capacity(identifiers.len());
    for (index, identifier) in identifiers.iter().enumerate() {
        progress.set_message(identifier.clone());
        outcomes.push(process_into(processor, out, path, index, identifier).await);
        progress.inc(1);
    }

    if let Err(source) = out.shutdown().await {
        discard(path).await;
        return Err(BatchError::StreamClose {
            path: path.to_path_buf(),
            source,
        });
    }

    Ok(outcomes)
}

async fn discard(path: &Path) {
    if let Err(e) = fs_err::tokio::remove_file(path).await {
        tracing::warn!("Could not remove incomplete output: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThrottleConfig;
    use crate::ratelimit::{FailureKind, RateLimitedExecutor};
    use crate::test_helpers::FlakyWriter;
    use crate::transcript::MockTranscriptFetcher;

    fn executor() -> RateLimitedExecutor {
        RateLimitedExecutor::new(ThrottleConfig {
            min_delay_ms: 0,
            max_retries: 0,
            backoff_multiplier: 1.0,
            jitter_enabled: false,
        })
    }

    fn fetcher() -> MockTranscriptFetcher {
        let mut fetcher = MockTranscriptFetcher::new();
        fetcher
            .expect_fetch()
            .returning(|_| Ok(vec![TranscriptSegment::new("hello there", 0.0, 1.0)]));
        fetcher
    }

    fn identifiers(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn test_header_lists_count_and_mode() {
        let header = header(3);
        assert!(header.starts_with("# Transcript Batch\n# Items: 3\n# Generated: "));
        assert!(header.contains("# Mode: aggregated\n"));
    }

    #[tokio::test]
    async fn test_failure_block() {
        let mut out = Vec::new();
        let failure = ItemFailure::from_raw("Video not found");

        write_failure(&mut out, "abc", &failure).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(
            text.starts_with("## Source: abc\n## Status: failed\n## Error: Transcript unavailable")
        );
    }

    #[tokio::test]
    async fn test_multi_line_error_stays_in_its_header() {
        let mut out = Vec::new();
        let failure = ItemFailure::from_raw("ERROR: [youtube] abc: boom\nWARNING: retrying\n");

        write_failure(&mut out, "abc", &failure).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text
            .ends_with("## Error: Unknown error: ERROR: [youtube] abc: boom WARNING: retrying\n"));
    }

    #[tokio::test]
    async fn test_failed_close_is_fatal_and_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("all.txt");
        std::fs::write(&path, "partial").unwrap();
        let executor = executor();
        let fetcher = fetcher();
        let processor = TranscriptProcessor::new(&executor, &fetcher, WriteOptions::default());
        let mut out = FlakyWriter::failing_shutdown();

        let result = write_stream(
            &processor,
            &identifiers(&["A", "B"]),
            &path,
            &mut out,
            &ProgressBar::hidden(),
        )
        .await;

        assert!(matches!(result, Err(BatchError::StreamClose { .. })));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_failed_header_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("all.txt");
        std::fs::write(&path, "").unwrap();
        let executor = executor();
        let fetcher = MockTranscriptFetcher::new();
        let processor = TranscriptProcessor::new(&executor, &fetcher, WriteOptions::default());
        let mut out = FlakyWriter::failing_on("# Transcript Batch");

        let result = write_stream(
            &processor,
            &identifiers(&["A"]),
            &path,
            &mut out,
            &ProgressBar::hidden(),
        )
        .await;

        assert!(matches!(result, Err(BatchError::OutputSetup { .. })));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_item_write_failure_does_not_stop_batch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("all.txt");
        let executor = executor();
        let fetcher = fetcher();
        let processor = TranscriptProcessor::new(&executor, &fetcher, WriteOptions::default());
        let mut out = FlakyWriter::failing_on("## Source: B");

        let outcomes = write_stream(
            &processor,
            &identifiers(&["A", "B", "C"]),
            &path,
            &mut out,
            &ProgressBar::hidden(),
        )
        .await
        .unwrap();

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].succeeded);
        assert!(!outcomes[1].succeeded);
        assert_eq!(outcomes[1].failure_kind, Some(FailureKind::Unknown));
        let message = outcomes[1].failure_message.as_deref().unwrap();
        assert!(message.contains("failed to write to aggregated output"));
        assert!(outcomes[2].succeeded);

        let text = out.text();
        assert!(text.contains("## Source: A\n## Status: success"));
        assert!(!text.contains("## Source: B"));
        assert!(text.contains("## Source: C\n## Status: success"));
    }
}
