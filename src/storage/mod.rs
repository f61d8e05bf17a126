//! Persistence layer.
//!
//! Reads the line-delimited token and proxy files and appends one JSON
//! line per finished round to the run log. The run log is never
//! rewritten.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::{debug, error, info};

use crate::types::{RoundReport, TaskOutcome};

/// Load a line-delimited file: trimmed, blank lines skipped.
///
/// A missing file is logged and yields an empty list; the caller decides
/// whether that is fatal.
pub fn load_lines(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();

    if !path.exists() {
        error!(path = %path.display(), "File not found");
        return Ok(Vec::new());
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let lines: Vec<String> = contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();

    info!(path = %path.display(), count = lines.len(), "Loaded entries");
    Ok(lines)
}

/// One line of the run log.
#[derive(Debug, Serialize)]
struct RunLogLine<'a> {
    recorded_at: DateTime<Utc>,
    round: u64,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    succeeded: usize,
    failed: usize,
    outcomes: &'a [TaskOutcome],
}

/// Append a round summary as a single JSON line.
pub fn append_round(path: impl AsRef<Path>, report: &RoundReport) -> Result<()> {
    let path = path.as_ref();
    let line = RunLogLine {
        recorded_at: Utc::now(),
        round: report.round,
        started_at: report.started_at,
        finished_at: report.finished_at,
        succeeded: report.succeeded(),
        failed: report.failed(),
        outcomes: &report.outcomes,
    };
    let json = serde_json::to_string(&line).context("Failed to serialise round report")?;

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open run log {}", path.display()))?;
    writeln!(file, "{json}").with_context(|| format!("Failed to write run log {}", path.display()))?;

    debug!(path = %path.display(), round = report.round, "Round appended to run log");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
