//! Reading flat comment lists from files or stdin.

use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use threadloom_core::{CommentRecord, Normalizer, RawComment};

/// Reads the whole source: the file at `path`, or stdin when `None`.
fn read_source(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("read comments from {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("read comments from stdin")?;
            Ok(buf)
        }
    }
}

/// Parses a JSON array of comments, or one comment per line (JSON lines).
pub fn parse_comments(text: &str) -> Result<Vec<RawComment>> {
    let trimmed = text.trim_start();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).context("parse comment array");
    }

    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line).with_context(|| format!("parse comment on line {}", idx + 1))
        })
        .collect()
}

/// Reads, parses, and ingests comments in one step.
pub fn load_records(path: Option<&Path>, normalizer: &Normalizer) -> Result<Vec<CommentRecord>> {
    let text = read_source(path)?;
    let raw = parse_comments(&text)?;
    tracing::debug!(count = raw.len(), "read comments");
    Ok(raw.into_iter().map(|r| normalizer.ingest(r)).collect())
}
