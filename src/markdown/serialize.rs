//! One-line Markdown serialization of list items
//!
//! Only the first line of an item is ever regenerated: the marker, the task
//! checkbox, and the inline content of its first paragraph up to the first
//! line break. Nested blocks live on their own source lines and are left to
//! the source text.

use crate::markdown::parser::{Checkbox, ItemMarker, MarkdownNode, MarkdownNodeType};

/// Text of a list marker, e.g. `-` or `3.`.
pub fn marker_text(marker: ItemMarker) -> String {
    match marker {
        ItemMarker::Bullet(c) => c.to_string(),
        ItemMarker::Ordered { number, delimiter } => format!("{}{}", number, delimiter),
    }
}

/// Task checkbox as written in source.
pub fn checkbox_text(checkbox: Checkbox) -> &'static str {
    match checkbox {
        Checkbox::Checked => "[x]",
        Checkbox::Unchecked => "[ ]",
    }
}

/// Whether `token` is a valid list marker on its own.
pub fn is_list_marker(token: &str) -> bool {
    if matches!(token, "-" | "*" | "+") {
        return true;
    }
    let Some(digits) = token
        .strip_suffix('.')
        .or_else(|| token.strip_suffix(')'))
    else {
        return false;
    };
    !digits.is_empty() && digits.len() <= 9 && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Everything after the marker: the checkbox (if any) and the first line of
/// content. Trimmed.
pub fn item_body(item: &MarkdownNode, checkbox: Option<Checkbox>) -> String {
    let mut body = String::new();
    if let Some(checkbox) = checkbox {
        body.push_str(checkbox_text(checkbox));
        body.push(' ');
    }
    body.push_str(&first_line_content(item));
    body.trim().to_string()
}

/// The whole first line of an item: marker, checkbox and content.
pub fn serialize_item(item: &MarkdownNode) -> String {
    let (marker, checkbox) = match &item.node_type {
        MarkdownNodeType::Item { marker, checkbox } => (*marker, *checkbox),
        _ => return first_line_content(item),
    };
    format!("{} {}", marker_text(marker), item_body(item, checkbox))
        .trim_end()
        .to_string()
}

/// Inline Markdown of the item's leading paragraph or heading.
fn first_line_content(item: &MarkdownNode) -> String {
    let Some(first) = item.children.first() else {
        return String::new();
    };

    let mut out = String::new();
    match &first.node_type {
        MarkdownNodeType::Paragraph => {
            write_inlines(&first.children, true, &mut out);
        }
        MarkdownNodeType::Heading { level, .. } => {
            out.push_str(&"#".repeat(*level as usize));
            out.push(' ');
            write_inlines(&first.children, true, &mut out);
        }
        _ => {}
    }
    out
}

/// Append inline nodes as Markdown. Returns `false` once a line break was
/// reached, after which nothing more is written.
///
/// A hard break at the top level is kept as a trailing backslash so the next
/// source line still continues the paragraph with a hard break. Inside
/// emphasis or a link the break cannot be kept on one line and is dropped.
///
/// Adjacent text nodes are escaped as one string, since the parser may split
/// a word around delimiter characters.
fn write_inlines(nodes: &[MarkdownNode], top_level: bool, out: &mut String) -> bool {
    let mut pending = String::new();
    for node in nodes {
        if let MarkdownNodeType::Text(text) = &node.node_type {
            pending.push_str(text);
            continue;
        }
        // `!` directly before a link would make it an image
        let bang =
            matches!(node.node_type, MarkdownNodeType::Link { .. }) && pending.ends_with('!');
        if bang {
            pending.pop();
        }
        escape_text(&pending, out);
        if bang {
            out.push_str("\\!");
        }
        pending.clear();
        if !write_inline(node, top_level, out) {
            return false;
        }
    }
    escape_text(&pending, out);
    true
}

fn write_inline(node: &MarkdownNode, top_level: bool, out: &mut String) -> bool {
    match &node.node_type {
        MarkdownNodeType::Text(text) => escape_text(text, out),
        MarkdownNodeType::SoftBreak => return false,
        MarkdownNodeType::LineBreak => {
            if top_level {
                out.push('\\');
            }
            return false;
        }
        MarkdownNodeType::Code(code) => write_code_span(code, out),
        MarkdownNodeType::HtmlInline(html) => out.push_str(html),
        MarkdownNodeType::Emphasis => return wrap(node, "*", "*", out),
        MarkdownNodeType::Strong => return wrap(node, "**", "**", out),
        MarkdownNodeType::Strikethrough => return wrap(node, "~~", "~~", out),
        MarkdownNodeType::Superscript => return wrap(node, "^", "^", out),
        MarkdownNodeType::Link { url, title } => {
            // Autolinked URLs round-trip as bare text
            let text = node.text_content();
            if title.is_empty() && (text == *url || format!("mailto:{}", text) == *url) {
                out.push_str(&text);
                return true;
            }
            out.push('[');
            let complete = write_inlines(&node.children, false, out);
            out.push_str("](");
            write_destination(url, title, out);
            out.push(')');
            return complete;
        }
        MarkdownNodeType::Image { url, title } => {
            out.push_str("![");
            escape_text(&node.text_content(), out);
            out.push_str("](");
            write_destination(url, title, out);
            out.push(')');
        }
        MarkdownNodeType::FootnoteReference(name) => {
            out.push_str("[^");
            out.push_str(name);
            out.push(']');
        }
        _ => escape_text(&node.text_content(), out),
    }
    true
}

fn wrap(node: &MarkdownNode, open: &str, close: &str, out: &mut String) -> bool {
    out.push_str(open);
    let complete = write_inlines(&node.children, false, out);
    out.push_str(close);
    complete
}

fn write_destination(url: &str, title: &str, out: &mut String) {
    if url.contains(' ') {
        out.push('<');
        out.push_str(url);
        out.push('>');
    } else {
        out.push_str(url);
    }
    if !title.is_empty() {
        out.push_str(" \"");
        out.push_str(&title.replace('"', "\\\""));
        out.push('"');
    }
}

/// Backtick fence one longer than the longest run inside the code.
fn write_code_span(code: &str, out: &mut String) {
    let mut longest = 0;
    let mut run = 0;
    for c in code.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    let fence = "`".repeat(longest + 1);
    // A span that starts and ends with a space loses one on each side when
    // parsed, so it gets one extra of each
    let spaced = code.starts_with(' ') && code.ends_with(' ') && !code.trim().is_empty();
    let pad = code.starts_with('`') || code.ends_with('`') || spaced;

    out.push_str(&fence);
    if pad {
        out.push(' ');
    }
    out.push_str(code);
    if pad {
        out.push(' ');
    }
    out.push_str(&fence);
}

/// Escape characters that would otherwise start inline syntax.
///
/// Entities have already been decoded by the parser, so a literal `<` or `&`
/// must not be written back raw or it may turn into HTML or an entity again.
/// Underscores inside words are left alone; they never open emphasis.
fn escape_text(text: &str, out: &mut String) {
    let chars: Vec<char> = text.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        let before = i.checked_sub(1).map(|j| chars[j]);
        let after = chars.get(i + 1).copied();
        let escape = match c {
            '\\' | '*' | '`' | '[' | ']' | '~' => true,
            '_' => {
                !(before.is_some_and(char::is_alphanumeric)
                    && after.is_some_and(char::is_alphanumeric))
            }
            // Autolinks and inline HTML need a non-space right after `<`
            '<' => after.is_some_and(|a| !a.is_whitespace()),
            // Named and numeric character references
            '&' => after.is_some_and(|a| a == '#' || a.is_ascii_alphanumeric()),
            '!' => after == Some('['),
            '^' => after.is_some_and(|a| !a.is_whitespace()),
            _ => false,
        };
        if escape {
            out.push('\\');
        }
        out.push(c);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
