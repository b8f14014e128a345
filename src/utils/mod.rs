pub mod paths;

pub use paths::{validate_destination, PathError};

/// Format a start offset as `hh:mm:ss`
pub fn format_timestamp(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

/// Sanitize text into a filename token: alphanumerics, hyphens and underscores only
pub fn sanitize_filename(filename: &str) -> String {
    let replaced: String = filename
        .chars()
        .map(|c| match c {
            c if c.is_ascii_alphanumeric() || c == '-' || c == '_' => c,
            // Everything else, whitespace included, becomes a separator
            _ => '_',
        })
        .collect();

    // Collapse runs of separators and trim them from both ends
    replaced
        .split('_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Collapse all whitespace runs, newlines included, into single spaces
pub fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Timestamp token used when nothing better identifies an item
pub fn timestamp_token() -> String {
    chrono::Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Timestamp token with a short random suffix
pub fn unique_token() -> String {
    let random_suffix = uuid::Uuid::new_v4().to_string()[..8].to_string();
    format!("{}_{}", timestamp_token(), random_suffix)
}
