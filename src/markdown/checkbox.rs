//! Checkbox mutator
//!
//! Toggling a task item rewrites exactly one source line: the line the item
//! starts on. The item is flipped, re-serialized to its one-line form, and
//! spliced back in place of the original line. Nothing is re-parsed here;
//! the caller hands the new text to whoever owns the source.

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::markdown::parser::{MarkdownNode, MarkdownNodeType};
use crate::markdown::serialize::{is_list_marker, item_body, marker_text};

/// Replace one line of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSplice {
    /// 0-based line index
    pub line_index: usize,
    /// New line content, without a line terminator
    pub replacement: String,
}

impl SourceSplice {
    pub fn new(line_index: usize, replacement: impl Into<String>) -> Self {
        Self {
            line_index,
            replacement: replacement.into(),
        }
    }

    /// Apply the splice to `source`.
    ///
    /// Lines are split on `\n` only, so empty lines and a trailing newline
    /// survive untouched. A `\r` ending the replaced line is kept.
    pub fn apply(&self, source: &str) -> Result<String> {
        let mut lines: Vec<&str> = source.split('\n').collect();
        let line_count = lines.len();
        let Some(original) = lines.get(self.line_index) else {
            return Err(Error::SpliceOutOfRange {
                line: self.line_index + 1,
                line_count,
            });
        };

        let replacement = if original.ends_with('\r') && !self.replacement.ends_with('\r') {
            format!("{}\r", self.replacement)
        } else {
            self.replacement.clone()
        };
        lines[self.line_index] = &replacement;

        Ok(lines.join("\n"))
    }
}

/// Work out the splice that toggles `item`'s checkbox in `source`.
///
/// `None` when the node is not a task item, has no source range, or its start
/// line is not in `source`.
pub fn plan_toggle(item: &MarkdownNode, source: &str) -> Option<SourceSplice> {
    let MarkdownNodeType::Item {
        marker,
        checkbox: Some(checkbox),
    } = &item.node_type
    else {
        return None;
    };
    let Some(range) = item.source_range else {
        debug!("Task item has no source range; toggle skipped");
        return None;
    };

    let line_index = range.start.line.checked_sub(1)?;
    let line = source.split('\n').nth(line_index)?;
    let line = line.strip_suffix('\r').unwrap_or(line);

    // Everything left of the marker (indentation, quote markers) is kept
    let marker_offset = range.start.column.saturating_sub(1);
    let (prefix, rest) = if marker_offset <= line.len() && line.is_char_boundary(marker_offset) {
        line.split_at(marker_offset)
    } else {
        line.split_at(line.len() - line.trim_start().len())
    };

    // Keep the marker as the author wrote it when it is still a marker
    let marker = match rest.split_whitespace().next() {
        Some(token) if is_list_marker(token) => token.to_string(),
        _ => marker_text(*marker),
    };

    let body = item_body(item, Some(checkbox.toggled()));
    let replacement = format!("{}{} {}", prefix, marker, body);

    Some(SourceSplice::new(line_index, replacement.trim_end()))
}

/// Toggle `item`'s checkbox and return the new full source text.
///
/// Returns `source` unchanged when the item cannot be toggled.
pub fn toggle(item: &MarkdownNode, source: &str) -> String {
    let Some(splice) = plan_toggle(item, source) else {
        return source.to_string();
    };
    match splice.apply(source) {
        Ok(text) => text,
        Err(err) => {
            warn!("Checkbox toggle skipped: {}", err);
            source.to_string()
        }
    }
}

/// The task item whose first line is `line` (1-based), searching depth first.
pub fn find_task_item(root: &MarkdownNode, line: usize) -> Option<&MarkdownNode> {
    if root.checkbox().is_some() && root.start_line() == Some(line) {
        return Some(root);
    }
    root.children
        .iter()
        .find_map(|child| find_task_item(child, line))
}

/// All task items in document order.
pub fn task_items(root: &MarkdownNode) -> Vec<&MarkdownNode> {
    let mut items = Vec::new();
    collect_task_items(root, &mut items);
    items
}

fn collect_task_items<'a>(node: &'a MarkdownNode, items: &mut Vec<&'a MarkdownNode>) {
    if node.checkbox().is_some() {
        items.push(node);
    }
    for child in &node.children {
        collect_task_items(child, items);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
