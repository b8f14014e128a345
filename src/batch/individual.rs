use indicatif::ProgressBar;
use std::path::Path;

use super::{BatchError, ItemOutcome};
use crate::transcript::identifier::extract_video_id;
use crate::transcript::{DestinationHint, TranscriptFetcher, TranscriptProcessor};
use crate::utils::unique_token;

/// File-name suffix unique within the batch: `<video id or timestamp token>_<1-based index>`
pub fn unique_suffix(identifier: &str, index: usize) -> String {
    let token = extract_video_id(identifier).unwrap_or_else(unique_token);
    format!("{}_{:02}", token, index + 1)
}

/// Write each transcript to its own file under `dir`
pub async fn run<F: TranscriptFetcher + ?Sized>(
    processor: &TranscriptProcessor<'_, F>,
    identifiers: &[String],
    dir: &Path,
    progress: &ProgressBar,
) -> Result<Vec<ItemOutcome>, BatchError> {
    fs_err::tokio::create_dir_all(dir)
        .await
        .map_err(|source| BatchError::OutputSetup {
            path: dir.to_path_buf(),
            source,
        })?;

    let mut outcomes = Vec::with_capacity(identifiers.len());
    for (index, identifier) in identifiers.iter().enumerate() {
        progress.set_message(identifier.clone());

        let hint = DestinationHint {
            dir: dir.to_path_buf(),
            unique_suffix: unique_suffix(identifier, index),
        };
        outcomes.push(processor.process(identifier, &hint).await);

        progress.inc(1);
    }

    Ok(outcomes)
}
