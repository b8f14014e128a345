use std::fmt::Write as _;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::TranscriptSegment;
use crate::utils::{format_timestamp, sanitize_filename, timestamp_token};

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
const LABEL_WORDS: usize = 5;
const LABEL_MAX_LEN: usize = 50;

/// How segments are rendered into an output stream
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Segments rendered and written per chunk
    pub chunk_size: usize,

    /// Prefix each line with `[hh:mm:ss]`
    pub include_timestamps: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            include_timestamps: false,
        }
    }
}

/// Short filename-safe label from the first words of a transcript
pub fn derive_label(first: Option<&TranscriptSegment>) -> String {
    let words = first
        .map(|segment| {
            segment
                .text
                .split_whitespace()
                .take(LABEL_WORDS)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default();

    let mut label = sanitize_filename(&words);
    label.truncate(LABEL_MAX_LEN);
    let label = label.trim_end_matches('_').to_string();

    if label.is_empty() {
        format!("transcript_{}", timestamp_token())
    } else {
        label
    }
}

fn render_chunk(chunk: &[TranscriptSegment], options: &WriteOptions, buffer: &mut String) {
    buffer.clear();
    for segment in chunk {
        if options.include_timestamps {
            let _ = write!(buffer, "[{}] ", format_timestamp(segment.start_secs));
        }
        buffer.push_str(segment.text.trim());
        buffer.push('\n');
    }
}

/// Stream segments into `out` one chunk at a time; only one rendered chunk is held in memory
pub async fn write_segments<W>(
    out: &mut W,
    segments: &[TranscriptSegment],
    options: &WriteOptions,
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let chunk_size = options.chunk_size.max(1);
    let mut buffer = String::new();

    for chunk in segments.chunks(chunk_size) {
        render_chunk(chunk, options, &mut buffer);
        out.write_all(buffer.as_bytes()).await?;
    }
    out.flush().await
}
