use serde::Serialize;

use super::ThrottleSettings;

pub const ENV_MIN_DELAY_MS: &str = "SCRIBE_MIN_DELAY_MS";
pub const ENV_MAX_RETRIES: &str = "SCRIBE_MAX_RETRIES";
pub const ENV_BACKOFF_MULTIPLIER: &str = "SCRIBE_BACKOFF_MULTIPLIER";
pub const ENV_JITTER: &str = "SCRIBE_JITTER";

pub const DEFAULT_MIN_DELAY_MS: u64 = 2000;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;
pub const DEFAULT_JITTER: bool = true;

const MAX_RETRIES_LIMIT: u32 = 10;
const BACKOFF_RANGE: std::ops::RangeInclusive<f64> = 1.0..=5.0;

/// Validated pacing parameters for the rate-limited executor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThrottleConfig {
    pub min_delay_ms: u64,
    pub max_retries: u32,
    pub backoff_multiplier: f64,
    pub jitter_enabled: bool,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: DEFAULT_MIN_DELAY_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            jitter_enabled: DEFAULT_JITTER,
        }
    }
}

impl ThrottleConfig {
    /// Build from file settings, with `lookup` (normally the process environment)
    /// taking precedence. Invalid values fall back to their default with a warning.
    pub fn resolve<L>(file: &ThrottleSettings, lookup: L) -> Self
    where
        L: Fn(&str) -> Option<String>,
    {
        let raw = |key: &str, from_file: Option<String>| lookup(key).or(from_file);

        let min_delay_ms = raw(ENV_MIN_DELAY_MS, file.min_delay_ms.map(|v| v.to_string()))
            .map(|value| {
                parse_min_delay(&value).unwrap_or_else(|| {
                    warn_invalid(ENV_MIN_DELAY_MS, &value, DEFAULT_MIN_DELAY_MS);
                    DEFAULT_MIN_DELAY_MS
                })
            })
            .unwrap_or(DEFAULT_MIN_DELAY_MS);

        let max_retries = raw(ENV_MAX_RETRIES, file.max_retries.map(|v| v.to_string()))
            .map(|value| {
                parse_max_retries(&value).unwrap_or_else(|| {
                    warn_invalid(ENV_MAX_RETRIES, &value, DEFAULT_MAX_RETRIES);
                    DEFAULT_MAX_RETRIES
                })
            })
            .unwrap_or(DEFAULT_MAX_RETRIES);

        let file_multiplier = file.backoff_multiplier.map(|v| v.to_string());
        let backoff_multiplier = raw(ENV_BACKOFF_MULTIPLIER, file_multiplier)
            .map(|value| {
                parse_backoff(&value).unwrap_or_else(|| {
                    warn_invalid(ENV_BACKOFF_MULTIPLIER, &value, DEFAULT_BACKOFF_MULTIPLIER);
                    DEFAULT_BACKOFF_MULTIPLIER
                })
            })
            .unwrap_or(DEFAULT_BACKOFF_MULTIPLIER);

        let jitter_enabled = raw(ENV_JITTER, file.jitter.map(|v| v.to_string()))
            .map(|value| {
                parse_bool(&value).unwrap_or_else(|| {
                    warn_invalid(ENV_JITTER, &value, DEFAULT_JITTER);
                    DEFAULT_JITTER
                })
            })
            .unwrap_or(DEFAULT_JITTER);

        Self {
            min_delay_ms,
            max_retries,
            backoff_multiplier,
            jitter_enabled,
        }
    }
}

fn warn_invalid(key: &str, value: &str, default: impl std::fmt::Display) {
    tracing::warn!("Invalid value {:?} for {}, using default {}", value, key, default);
}

fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_min_delay(value: &str) -> Option<u64> {
    parse_number(value)
        .filter(|v| *v >= 0.0)
        .map(|v| v.floor() as u64)
}

fn parse_max_retries(value: &str) -> Option<u32> {
    parse_number(value)
        .filter(|v| v.fract() == 0.0 && (0.0..=MAX_RETRIES_LIMIT as f64).contains(v))
        .map(|v| v as u32)
}

fn parse_backoff(value: &str) -> Option<f64> {
    parse_number(value).filter(|v| BACKOFF_RANGE.contains(v))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
