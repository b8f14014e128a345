use anyhow::Result;
use std::fmt::Write as _;

use crate::batch::BatchSummary;
use crate::utils::single_line;

/// Human-readable batch report
pub fn format_summary(summary: &BatchSummary) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Batch transcript fetch complete ({} mode)", summary.mode);
    let _ = writeln!(out, "Destination: {}", summary.destination.display());
    let _ = writeln!(
        out,
        "Total: {}  Succeeded: {}  Failed: {}",
        summary.total, summary.succeeded_count, summary.failed_count
    );

    if summary.succeeded_count > 0 {
        let _ = writeln!(out, "\nSucceeded:");
        for outcome in summary.succeeded() {
            let destination = outcome
                .destination
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            match &outcome.label {
                Some(label) => {
                    let _ = writeln!(
                        out,
                        "  ✓ {} [{}] -> {}",
                        outcome.identifier, label, destination
                    );
                }
                None => {
                    let _ = writeln!(out, "  ✓ {} -> {}", outcome.identifier, destination);
                }
            }
        }
    }

    if summary.failed_count > 0 {
        let _ = writeln!(out, "\nFailed:");
        for outcome in summary.failed() {
            let message = outcome.failure_message.as_deref().unwrap_or("Unknown error");
            let _ = writeln!(out, "  ✗ {}: {}", outcome.identifier, single_line(message));
        }
    }

    out
}

/// Batch report as pretty-printed JSON
pub fn format_summary_json(summary: &BatchSummary) -> Result<String> {
    Ok(serde_json::to_string_pretty(summary)?)
}
