use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::process::Stdio;
use tokio::process::Command;

use super::{FetchError, TranscriptFetcher, TranscriptSegment};

const CAPTION_FORMAT: &str = "json3";

/// YouTube transcript source: yt-dlp resolves the caption track, reqwest downloads it
pub struct YtDlpFetcher {
    yt_dlp_path: String,
    language: String,
    http: reqwest::Client,
}

/// yt-dlp's json3 caption format
#[derive(Debug, Deserialize)]
struct Json3Captions {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
struct Json3Event {
    #[serde(rename = "tStartMs", default)]
    start_ms: u64,
    #[serde(rename = "dDurationMs", default)]
    duration_ms: u64,
    #[serde(default)]
    segs: Option<Vec<Json3Seg>>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    #[serde(default)]
    utf8: String,
}

impl YtDlpFetcher {
    pub fn new(yt_dlp_path: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            yt_dlp_path: yt_dlp_path.into(),
            language: language.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Check if yt-dlp is available
    pub async fn check_availability(&self) -> bool {
        Command::new(&self.yt_dlp_path)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }

    /// Get video information using yt-dlp
    async fn get_video_info(&self, url: &str) -> Result<Value, FetchError> {
        tracing::debug!("Extracting video info for: {}", url);

        let output = Command::new(&self.yt_dlp_path)
            .args(["--dump-json", "--skip-download", "--no-playlist", url])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(FetchError::Command(error.trim().to_string()));
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }

    /// Find the json3 caption URL, preferring uploaded subtitles over automatic ones
    fn caption_url(&self, info: &Value) -> Option<String> {
        ["subtitles", "automatic_captions"].iter().find_map(|section| {
            info[section][&self.language]
                .as_array()?
                .iter()
                .find(|track| track["ext"].as_str() == Some(CAPTION_FORMAT))
                .and_then(|track| track["url"].as_str())
                .map(str::to_string)
        })
    }

    async fn download_captions(&self, url: &str) -> Result<Json3Captions, FetchError> {
        let response = self.http.get(url).send().await?.error_for_status()?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

fn into_segments(captions: Json3Captions) -> Vec<TranscriptSegment> {
    captions
        .events
        .into_iter()
        .filter_map(|event| {
            let text: String = event.segs?.into_iter().map(|seg| seg.utf8).collect();
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            (!text.is_empty()).then(|| {
                TranscriptSegment::new(
                    text,
                    event.start_ms as f64 / 1000.0,
                    event.duration_ms as f64 / 1000.0,
                )
            })
        })
        .collect()
}

#[async_trait]
impl TranscriptFetcher for YtDlpFetcher {
    async fn fetch(&self, identifier: &str) -> Result<Vec<TranscriptSegment>, FetchError> {
        let info = self.get_video_info(identifier).await?;

        let Some(url) = self.caption_url(&info) else {
            return Err(FetchError::NoTranscript(format!(
                "{} (language: {})",
                identifier, self.language
            )));
        };

        tracing::debug!("Downloading captions for {}", identifier);
        let captions = self.download_captions(&url).await?;
        Ok(into_segments(captions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_caption_url_prefers_uploaded_subtitles() {
        let fetcher = YtDlpFetcher::new("yt-dlp", "en");
        let info = json!({
            "subtitles": { "en": [
                { "ext": "vtt", "url": "https://example.com/manual.vtt" },
                { "ext": "json3", "url": "https://example.com/manual.json3" }
            ]},
            "automatic_captions": { "en": [
                { "ext": "json3", "url": "https://example.com/auto.json3" }
            ]}
        });
        assert_eq!(
            fetcher.caption_url(&info).as_deref(),
            Some("https://example.com/manual.json3")
        );
    }

    #[test]
    fn test_caption_url_falls_back_to_automatic() {
        let fetcher = YtDlpFetcher::new("yt-dlp", "de");
        let info = json!({
            "subtitles": {},
            "automatic_captions": { "de": [
                { "ext": "json3", "url": "https://example.com/auto.json3" }
            ]}
        });
        assert_eq!(
            fetcher.caption_url(&info).as_deref(),
            Some("https://example.com/auto.json3")
        );
        assert!(YtDlpFetcher::new("yt-dlp", "fr").caption_url(&info).is_none());
    }

    #[test]
    fn test_json3_events_become_segments() {
        let captions: Json3Captions = serde_json::from_value(json!({
            "events": [
                { "tStartMs": 0, "dDurationMs": 4000 },
                {
                    "tStartMs": 1500,
                    "dDurationMs": 2000,
                    "segs": [{ "utf8": "hello " }, { "utf8": "world" }]
                },
                { "tStartMs": 3500, "dDurationMs": 500, "segs": [{ "utf8": "\n" }] }
            ]
        }))
        .unwrap();

        let segments = into_segments(captions);
        assert_eq!(segments, vec![TranscriptSegment::new("hello world", 1.5, 2.0)]);
    }
}
