use serde::{Deserialize, Serialize};

/// Category of a failed fetch, derived from the collaborator's error text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotFound,
    Disabled,
    RateLimited,
    Unknown,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::NotFound => "not_found",
            FailureKind::Disabled => "disabled",
            FailureKind::RateLimited => "rate_limited",
            FailureKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const RATE_LIMIT_SIGNALS: &[&str] = &["429", "too many requests", "rate limit"];
const DISABLED_SIGNALS: &[&str] = &["disabled"];
const NOT_FOUND_SIGNALS: &[&str] = &["not found", "no transcript", "unavailable"];

/// Classify an error message by case-insensitive substring match.
///
/// Rate-limit signals win over everything else, so a "429" that also mentions
/// an unavailable resource is still retried.
pub fn classify(message: &str) -> FailureKind {
    let lower = message.to_lowercase();
    let contains_any = |signals: &[&str]| signals.iter().any(|s| lower.contains(s));

    if contains_any(RATE_LIMIT_SIGNALS) {
        FailureKind::RateLimited
    } else if contains_any(DISABLED_SIGNALS) {
        FailureKind::Disabled
    } else if contains_any(NOT_FOUND_SIGNALS) {
        FailureKind::NotFound
    } else {
        FailureKind::Unknown
    }
}

pub fn is_rate_limit_error(message: &str) -> bool {
    classify(message) == FailureKind::RateLimited
}
