//! `threadloom render`: print the forest as an outline or JSON.

use std::path::Path;

use anyhow::{Context, Result};
use threadloom_core::config::{Config, OutputFormat};
use threadloom_core::{ExpansionState, ThreadNode, ThreadRow, flatten_visible};

use crate::cli::input;

pub struct RenderOptions<'a> {
    pub file: Option<&'a Path>,
    pub format: OutputFormat,
    pub expand_all: bool,
    pub show_timestamps: bool,
}

pub fn run(opts: &RenderOptions<'_>, config: &Config) -> Result<()> {
    let normalizer = config.normalizer();
    let records = input::load_records(opts.file, &normalizer)?;
    let forest = threadloom_core::thread_with_report(records, &normalizer).0;

    match opts.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&forest).context("serialize forest")?;
            println!("{json}");
        }
        OutputFormat::Text => {
            if forest.is_empty() {
                println!("No comments found.");
            } else {
                let state = if opts.expand_all {
                    ExpansionState::expand_all()
                } else {
                    ExpansionState::new()
                };
                print!("{}", outline(&forest, &state, opts.show_timestamps));
            }
        }
    }
    Ok(())
}

fn replies_label(count: usize) -> String {
    if count == 1 {
        "1 reply".to_string()
    } else {
        format!("{count} replies")
    }
}

fn row_line(row: &ThreadRow<'_>, show_timestamps: bool) -> String {
    let node: &ThreadNode = row.node;
    let marker = if node.is_leaf() {
        '-'
    } else if row.expanded {
        'v'
    } else {
        '+'
    };

    let mut line = format!("{}{marker} {}", "  ".repeat(row.depth), node.id);
    if let Some(author) = node.record.author() {
        line.push_str(&format!("  {author}"));
    }
    if show_timestamps {
        line.push_str(&format!("  {}", node.created_at()));
    }
    if node.reply_count() > 0 {
        line.push_str(&format!("  ({})", replies_label(node.reply_count())));
    }
    line
}

/// One line per visible row, indented two spaces per depth.
pub fn outline(forest: &[ThreadNode], state: &ExpansionState, show_timestamps: bool) -> String {
    let mut out = String::new();
    for row in flatten_visible(forest, state) {
        out.push_str(&row_line(&row, show_timestamps));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use threadloom_core::{CommentRecord, ParentRef, Payload, Timestamp};

    use super::*;

    fn comment(id: &str, parent: Option<&str>, t: i64) -> CommentRecord {
        CommentRecord::new(
            id,
            parent.map_or(ParentRef::None, |p| ParentRef::Id(p.to_string())),
            Timestamp::from_millis(t),
        )
    }

    #[test]
    fn test_outline_default_expansion() {
        let mut payload = Payload::new();
        payload.insert("author".into(), "ana".into());
        let forest = threadloom_core::thread(vec![
            comment("c1", None, 10).with_payload(payload),
            comment("c2", Some("c1"), 20),
            comment("c3", Some("c1"), 15),
            comment("c4", Some("c3"), 30),
        ]);

        let text = outline(&forest, &ExpansionState::new(), false);

        assert_eq!(
            text,
            "v c1  ana  (3 replies)\n  + c3  (1 reply)\n  - c2\n"
        );
    }

    #[test]
    fn test_outline_expand_all_with_timestamps() {
        let forest = threadloom_core::thread(vec![
            comment("c1", None, 1_704_067_200_000),
            comment("c2", Some("c1"), 1_704_067_260_000),
        ]);

        let text = outline(&forest, &ExpansionState::expand_all(), true);

        assert_eq!(
            text,
            "v c1  2024-01-01T00:00:00Z  (1 reply)\n  - c2  2024-01-01T00:01:00Z\n"
        );
    }
}
