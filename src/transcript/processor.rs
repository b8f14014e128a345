use std::path::{Path, PathBuf};
use tokio::io::{AsyncWrite, BufWriter};

use super::identifier::normalize;
use super::writer::{derive_label, write_segments, WriteOptions};
use super::{TranscriptFetcher, TranscriptSegment};
use crate::batch::ItemOutcome;
use crate::ratelimit::{classify, FailureKind, RateLimitedExecutor};
use crate::utils::single_line;

/// Where a processed transcript goes: `<dir>/<label>_<unique_suffix>.txt`
#[derive(Debug, Clone)]
pub struct DestinationHint {
    pub dir: PathBuf,
    pub unique_suffix: String,
}

impl DestinationHint {
    pub fn file_for(&self, label: &str) -> PathBuf {
        self.dir.join(format!("{}_{}.txt", label, self.unique_suffix))
    }
}

/// A classified item-level failure
#[derive(Debug, Clone, PartialEq)]
pub struct ItemFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl ItemFailure {
    /// Classify a raw error message and attach the matching user-facing text
    pub fn from_raw(raw: &str) -> Self {
        let kind = classify(raw);
        Self {
            kind,
            message: failure_message(kind, raw),
        }
    }
}

/// Actionable, user-facing message for a classified failure, always a single line
pub fn failure_message(kind: FailureKind, raw: &str) -> String {
    let raw = single_line(raw);
    match kind {
        FailureKind::NotFound => {
            format!("Transcript unavailable: the video may not exist or has no captions ({})", raw)
        }
        FailureKind::Disabled => format!("Transcripts are disabled for this video ({})", raw),
        FailureKind::RateLimited => {
            format!("Rate limited: try again later or increase the delay ({})", raw)
        }
        FailureKind::Unknown => format!("Unknown error: {}", raw),
    }
}

/// Fetches one transcript through the shared executor and writes it to its own file
pub struct TranscriptProcessor<'a, F: TranscriptFetcher + ?Sized> {
    executor: &'a RateLimitedExecutor,
    fetcher: &'a F,
    options: WriteOptions,
}

impl<'a, F: TranscriptFetcher + ?Sized> TranscriptProcessor<'a, F> {
    pub fn new(executor: &'a RateLimitedExecutor, fetcher: &'a F, options: WriteOptions) -> Self {
        Self {
            executor,
            fetcher,
            options,
        }
    }

    pub fn options(&self) -> &WriteOptions {
        &self.options
    }

    /// Normalize `identifier` and fetch it through the rate-limited executor.
    /// An empty transcript is reported as not found.
    pub async fn fetch_segments(
        &self,
        identifier: &str,
    ) -> Result<Vec<TranscriptSegment>, ItemFailure> {
        let normalized = normalize(identifier);

        let segments = self
            .executor
            .execute(|| self.fetcher.fetch(&normalized))
            .await
            .map_err(|e| ItemFailure::from_raw(&e.to_string()))?;

        if segments.is_empty() {
            let raw = format!("no transcript returned for {}", normalized);
            return Err(ItemFailure {
                kind: FailureKind::NotFound,
                message: failure_message(FailureKind::NotFound, &raw),
            });
        }

        Ok(segments)
    }

    /// Process one identifier; every failure is captured in the returned outcome
    pub async fn process(&self, identifier: &str, hint: &DestinationHint) -> ItemOutcome {
        let segments = match self.fetch_segments(identifier).await {
            Ok(segments) => segments,
            Err(failure) => {
                tracing::warn!("Failed to fetch {}: {}", identifier, failure.message);
                return ItemOutcome::failure(identifier, failure.kind, failure.message);
            }
        };

        let label = derive_label(segments.first());
        let path = hint.file_for(&label);

        let saved = match fs_err::tokio::File::create(&path).await {
            Ok(file) => save_segments(&path, BufWriter::new(file), &segments, &self.options).await,
            Err(error) => Err(write_failure(&error)),
        };
        if let Err(failure) = saved {
            tracing::warn!("Failed to save {}: {}", identifier, failure.message);
            return ItemOutcome::failure(identifier, failure.kind, failure.message);
        }

        tracing::info!("Saved transcript for {} to {}", identifier, path.display());
        ItemOutcome::success(identifier, path, label)
    }
}

fn write_failure(error: &std::io::Error) -> ItemFailure {
    ItemFailure::from_raw(&format!("failed to write transcript: {}", error))
}

/// Stream `segments` into `writer`, the already-created file at `path`.
/// On failure the partial file is removed.
async fn save_segments<W: AsyncWrite + Unpin>(
    path: &Path,
    mut writer: W,
    segments: &[TranscriptSegment],
    options: &WriteOptions,
) -> Result<(), ItemFailure> {
    if let Err(error) = write_segments(&mut writer, segments, options).await {
        drop(writer);
        remove_partial(path).await;
        return Err(write_failure(&error));
    }
    Ok(())
}

/// Best-effort removal of a partially written file
async fn remove_partial(path: &Path) {
    if let Err(e) = fs_err::tokio::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Could not remove partial file: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThrottleConfig;
    use crate::test_helpers::FlakyWriter;
    use crate::transcript::{FetchError, MockTranscriptFetcher};
    use mockall::predicate::eq;

    fn executor() -> RateLimitedExecutor {
        RateLimitedExecutor::new(ThrottleConfig {
            min_delay_ms: 0,
            max_retries: 2,
            backoff_multiplier: 1.0,
            jitter_enabled: false,
        })
    }

    fn hint(dir: &Path) -> DestinationHint {
        DestinationHint {
            dir: dir.to_path_buf(),
            unique_suffix: "dQw4w9WgXcQ_01".to_string(),
        }
    }

    #[tokio::test]
    async fn test_process_writes_transcript_file() {
        let dir = tempfile::tempdir().unwrap();
        let executor = executor();
        let mut fetcher = MockTranscriptFetcher::new();
        fetcher
            .expect_fetch()
            .with(eq("https://www.youtube.com/watch?v=dQw4w9WgXcQ"))
            .times(1)
            .returning(|_| {
                Ok(vec![
                    TranscriptSegment::new("never gonna give you up", 0.0, 2.0),
                    TranscriptSegment::new("never gonna let you down", 2.0, 2.0),
                ])
            });
        let processor = TranscriptProcessor::new(&executor, &fetcher, WriteOptions::default());

        let outcome = processor.process("https://youtu.be/dQw4w9WgXcQ", &hint(dir.path())).await;

        assert!(outcome.succeeded);
        assert_eq!(outcome.identifier, "https://youtu.be/dQw4w9WgXcQ");
        assert_eq!(outcome.label.as_deref(), Some("never_gonna_give_you_up"));
        let path = outcome.destination.unwrap();
        assert_eq!(path, dir.path().join("never_gonna_give_you_up_dQw4w9WgXcQ_01.txt"));
        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content, "never gonna give you up\nnever gonna let you down\n");
    }

    #[tokio::test]
    async fn test_empty_transcript_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let executor = executor();
        let mut fetcher = MockTranscriptFetcher::new();
        fetcher.expect_fetch().times(1).returning(|_| Ok(Vec::new()));
        let processor = TranscriptProcessor::new(&executor, &fetcher, WriteOptions::default());

        let outcome = processor.process("dQw4w9WgXcQ", &hint(dir.path())).await;

        assert!(!outcome.succeeded);
        assert_eq!(outcome.failure_kind, Some(FailureKind::NotFound));
        assert!(outcome.destination.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_disabled_transcript_is_classified() {
        let dir = tempfile::tempdir().unwrap();
        let executor = executor();
        let mut fetcher = MockTranscriptFetcher::new();
        fetcher
            .expect_fetch()
            .times(1)
            .returning(|_| {
                Err(FetchError::Command("Subtitles are disabled for this video".into()))
            });
        let processor = TranscriptProcessor::new(&executor, &fetcher, WriteOptions::default());

        let outcome = processor.process("dQw4w9WgXcQ", &hint(dir.path())).await;

        assert_eq!(outcome.failure_kind, Some(FailureKind::Disabled));
        assert!(outcome.failure_message.unwrap().starts_with("Transcripts are disabled"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_is_retried_then_reported() {
        let dir = tempfile::tempdir().unwrap();
        let executor = executor();
        let mut fetcher = MockTranscriptFetcher::new();
        fetcher
            .expect_fetch()
            .times(3)
            .returning(|_| Err(FetchError::Command("HTTP Error 429: Too Many Requests".into())));
        let processor = TranscriptProcessor::new(&executor, &fetcher, WriteOptions::default());

        let outcome = processor.process("dQw4w9WgXcQ", &hint(dir.path())).await;

        assert_eq!(outcome.failure_kind, Some(FailureKind::RateLimited));
        assert!(outcome.failure_message.unwrap().contains("Max retries (2) exceeded"));
    }

    #[tokio::test]
    async fn test_write_failure_is_captured() {
        let dir = tempfile::tempdir().unwrap();
        let executor = executor();
        let mut fetcher = MockTranscriptFetcher::new();
        fetcher
            .expect_fetch()
            .returning(|_| Ok(vec![TranscriptSegment::new("hello", 0.0, 1.0)]));
        let processor = TranscriptProcessor::new(&executor, &fetcher, WriteOptions::default());
        let missing = DestinationHint {
            dir: dir.path().join("does-not-exist"),
            unique_suffix: "x_01".to_string(),
        };

        let outcome = processor.process("dQw4w9WgXcQ", &missing).await;

        assert!(!outcome.succeeded);
        assert!(outcome.failure_message.unwrap().contains("failed to write transcript"));
    }

    #[tokio::test]
    async fn test_failed_write_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello_x_01.txt");
        std::fs::write(&path, "hel").unwrap();
        let segments = vec![TranscriptSegment::new("hello", 0.0, 1.0)];

        let result = save_segments(
            &path,
            FlakyWriter::failing_all(),
            &segments,
            &WriteOptions::default(),
        )
        .await;

        let failure = result.unwrap_err();
        assert!(failure.message.contains("failed to write transcript"));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_successful_save_keeps_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello_x_01.txt");
        std::fs::write(&path, "").unwrap();
        let segments = vec![TranscriptSegment::new("hello", 0.0, 1.0)];
        let mut out = FlakyWriter::default();

        let result = save_segments(&path, &mut out, &segments, &WriteOptions::default()).await;

        assert!(result.is_ok());
        assert!(path.exists());
        assert_eq!(out.text(), "hello\n");
    }

    #[test]
    fn test_multi_line_errors_become_one_line() {
        let failure = ItemFailure::from_raw("ERROR: unable to download\n  caused by: timeout\n");

        assert!(!failure.message.contains('\n'));
        assert_eq!(
            failure.message,
            "Unknown error: ERROR: unable to download caused by: timeout"
        );
    }

    #[test]
    fn test_failure_messages_are_specific() {
        assert!(failure_message(FailureKind::RateLimited, "429").starts_with("Rate limited"));
        assert!(failure_message(FailureKind::NotFound, "x").starts_with("Transcript unavailable"));
        assert_eq!(failure_message(FailureKind::Unknown, "boom"), "Unknown error: boom");
    }
}
