//! Render tree produced by the render visitor
//!
//! A `RenderNode` is an inert description of what to draw: styled text runs,
//! nested layout blocks, and leaf widgets. It holds no reference back to the
//! Markdown AST; everything an interactive widget needs at activation time
//! (the precomputed source splice, the live source text, the edit handler) is
//! captured by value when the tree is built.

use std::fmt;
use std::sync::Arc;

use egui::{Color32, RichText};
use log::{debug, warn};

use crate::config::FontGroup;
use crate::markdown::checkbox::SourceSplice;
use crate::markdown::highlight::{HighlightKey, HighlightResult};

/// Callback invoked with the complete new source text after an edit.
pub type EditHandler = Arc<dyn Fn(String) + Send + Sync>;

// ─────────────────────────────────────────────────────────────────────────────
// Styled Text
// ─────────────────────────────────────────────────────────────────────────────

/// Which font a run is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontRole {
    #[default]
    Body,
    Monospace,
    /// Heading level 1-6
    Heading(u8),
}

/// Visual attributes of a text run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunStyle {
    pub font: FontRole,
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub underline: bool,
    pub superscript: bool,
    pub foreground: Option<Color32>,
    pub background: Option<Color32>,
    /// Link target for runs inside a link
    pub link: Option<String>,
}

impl RunStyle {
    pub fn monospace() -> Self {
        Self {
            font: FontRole::Monospace,
            ..Default::default()
        }
    }

    pub fn with_bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn with_italic(mut self) -> Self {
        self.italic = true;
        self
    }

    pub fn with_strikethrough(mut self) -> Self {
        self.strikethrough = true;
        self
    }

    pub fn with_superscript(mut self) -> Self {
        self.superscript = true;
        self
    }

    pub fn with_font(mut self, font: FontRole) -> Self {
        self.font = font;
        self
    }

    pub fn with_foreground(mut self, color: Color32) -> Self {
        self.foreground = Some(color);
        self
    }

    pub fn with_link(mut self, url: &str, color: Color32) -> Self {
        self.link = Some(url.to_string());
        self.underline = true;
        self.foreground = Some(color);
        self
    }
}

/// A run of text drawn with a single style.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub style: RunStyle,
}

impl TextRun {
    pub fn new(text: impl Into<String>, style: RunStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    /// Convert this run to egui RichText using the given font sizes.
    pub fn to_rich_text(&self, fonts: &FontGroup) -> RichText {
        let mut rich_text = RichText::new(&self.text).font(fonts.font_id(self.style.font));

        if let Some(color) = self.style.foreground {
            rich_text = rich_text.color(color);
        }
        if let Some(color) = self.style.background {
            rich_text = rich_text.background_color(color);
        }
        if self.style.bold {
            rich_text = rich_text.strong();
        }
        if self.style.italic {
            rich_text = rich_text.italics();
        }
        if self.style.strikethrough {
            rich_text = rich_text.strikethrough();
        }
        if self.style.underline {
            rich_text = rich_text.underline();
        }
        if self.style.superscript {
            rich_text = rich_text.raised();
        }

        rich_text
    }
}

/// A sequence of styled runs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StyledText {
    pub runs: Vec<TextRun>,
}

impl StyledText {
    pub fn new(runs: Vec<TextRun>) -> Self {
        Self { runs }
    }

    /// Text in the code font with no other styling.
    pub fn plain_monospace(text: &str) -> Self {
        Self::new(vec![TextRun::new(text, RunStyle::monospace())])
    }

    pub fn push(&mut self, run: TextRun) {
        self.runs.push(run);
    }

    pub fn extend(&mut self, other: StyledText) {
        self.runs.extend(other.runs);
    }

    pub fn is_empty(&self) -> bool {
        self.runs.iter().all(|run| run.text.is_empty())
    }

    /// The text with styling dropped.
    pub fn plain_text(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Layout Blocks
// ─────────────────────────────────────────────────────────────────────────────

/// Spacing around a block.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Padding {
    pub leading: f32,
    pub vertical: f32,
}

impl Padding {
    pub fn vertical(amount: f32) -> Self {
        Self {
            leading: 0.0,
            vertical: amount,
        }
    }
}

/// Decoration drawn alongside a stack.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Decoration {
    #[default]
    None,
    /// Vertical bar on the leading edge, as for block quotes
    QuoteBar(Color32),
}

/// Vertically stacked children.
#[derive(Debug, Clone, Default)]
pub struct Stack {
    pub children: Vec<RenderNode>,
    pub spacing: f32,
    pub padding: Padding,
    pub decoration: Decoration,
}

/// A rendered list.
#[derive(Debug, Clone)]
pub struct ListView {
    pub ordered: bool,
    pub rows: Vec<ListRow>,
    pub spacing: f32,
    pub padding: Padding,
}

/// The marker drawn before a list item.
#[derive(Debug, Clone, PartialEq)]
pub enum ListMarker {
    /// 1-based position among the item's siblings
    Ordinal(usize),
    Bullet(String),
}

impl fmt::Display for ListMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListMarker::Ordinal(n) => write!(f, "{}.", n),
            ListMarker::Bullet(glyph) => write!(f, "{}", glyph),
        }
    }
}

/// One list item laid out as marker + content.
#[derive(Debug, Clone)]
pub struct ListRow {
    pub marker: ListMarker,
    pub checkbox: Option<CheckboxWidget>,
    /// Indent before the marker; non-zero only at the outermost list
    pub leading_indent: f32,
    pub content: Box<RenderNode>,
}

/// A table laid out as rows of cells.
#[derive(Debug, Clone, Default)]
pub struct TableView {
    pub rows: Vec<TableRowView>,
}

#[derive(Debug, Clone, Default)]
pub struct TableRowView {
    pub header: bool,
    pub cells: Vec<StyledText>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Widgets
// ─────────────────────────────────────────────────────────────────────────────

/// Interactive task list checkbox.
#[derive(Clone)]
pub struct CheckboxWidget {
    pub checked: bool,
    pub tint: Color32,
    splice: Option<SourceSplice>,
    source: Arc<str>,
    handler: Option<EditHandler>,
}

impl CheckboxWidget {
    pub fn new(
        checked: bool,
        tint: Color32,
        splice: Option<SourceSplice>,
        source: Arc<str>,
        handler: Option<EditHandler>,
    ) -> Self {
        Self {
            checked,
            tint,
            splice,
            source,
            handler,
        }
    }

    /// Whether activating this checkbox can change the source.
    pub fn is_interactive(&self) -> bool {
        self.splice.is_some() && self.handler.is_some()
    }

    /// The splice applied on activation.
    pub fn splice(&self) -> Option<&SourceSplice> {
        self.splice.as_ref()
    }

    /// Flip the checkbox: compute the new source and hand it to the edit
    /// handler.
    ///
    /// Returns the new text, or `None` when nothing changed (no source range
    /// was recorded, or the captured source no longer has the target line).
    pub fn toggle(&self) -> Option<String> {
        let splice = self.splice.as_ref()?;
        let new_text = match splice.apply(&self.source) {
            Ok(text) => text,
            Err(err) => {
                warn!("Checkbox toggle skipped: {}", err);
                return None;
            }
        };

        match &self.handler {
            Some(handler) => handler(new_text.clone()),
            None => debug!("Checkbox toggled without an edit handler"),
        }
        Some(new_text)
    }
}

impl fmt::Debug for CheckboxWidget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckboxWidget")
            .field("checked", &self.checked)
            .field("splice", &self.splice)
            .field("interactive", &self.is_interactive())
            .finish()
    }
}

/// A code block whose content is swapped in when its highlight resolves.
#[derive(Debug, Clone)]
pub struct CodeBlockView {
    pub language: Option<String>,
    pub code: String,
    /// Identity of the content currently wanted for this block
    pub key: HighlightKey,
    /// What is displayed now: plain monospace until highlighting lands
    pub content: StyledText,
    pub highlighted: bool,
    pub padding: Padding,
}

impl CodeBlockView {
    /// Apply a resolved highlight if it is for this block's current key.
    ///
    /// Results for any other key are stale and ignored. Returns whether the
    /// content changed.
    pub fn apply(&mut self, result: &HighlightResult) -> bool {
        if result.key != self.key {
            return false;
        }
        self.content = result.styled.clone();
        self.highlighted = true;
        true
    }
}

/// An image reference.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageView {
    pub url: String,
    pub alt: String,
    pub title: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Render Node
// ─────────────────────────────────────────────────────────────────────────────

/// Output unit of the render visitor.
#[derive(Debug, Clone, Default)]
pub enum RenderNode {
    /// Nothing to draw
    #[default]
    Empty,
    /// A block of inline text
    Text(StyledText),
    Stack(Stack),
    List(ListView),
    CodeBlock(CodeBlockView),
    Table(TableView),
    Image(ImageView),
    /// Horizontal rule
    Rule,
}

impl RenderNode {
    pub fn is_empty(&self) -> bool {
        matches!(self, RenderNode::Empty)
    }

    /// All visible text, blocks separated by newlines.
    pub fn plain_text(&self) -> String {
        let mut lines = Vec::new();
        self.collect_plain(&mut lines);
        lines.join("\n")
    }

    fn collect_plain(&self, lines: &mut Vec<String>) {
        match self {
            RenderNode::Empty | RenderNode::Rule => {}
            RenderNode::Text(text) => lines.push(text.plain_text()),
            RenderNode::Stack(stack) => {
                for child in &stack.children {
                    child.collect_plain(lines);
                }
            }
            RenderNode::List(list) => {
                for row in &list.rows {
                    row.content.collect_plain(lines);
                }
            }
            RenderNode::CodeBlock(block) => lines.push(block.content.plain_text()),
            RenderNode::Table(table) => {
                for row in &table.rows {
                    let cells: Vec<String> = row.cells.iter().map(|c| c.plain_text()).collect();
                    lines.push(cells.join(" | "));
                }
            }
            RenderNode::Image(image) => lines.push(image.alt.clone()),
        }
    }

    /// Visit every code block in document order.
    pub fn code_blocks(&self) -> Vec<&CodeBlockView> {
        let mut blocks = Vec::new();
        self.walk(&mut |node| {
            if let RenderNode::CodeBlock(block) = node {
                blocks.push(block);
            }
        });
        blocks
    }

    /// Visit every code block mutably in document order.
    pub fn for_each_code_block_mut(&mut self, f: &mut dyn FnMut(&mut CodeBlockView)) {
        match self {
            RenderNode::CodeBlock(block) => f(block),
            RenderNode::Stack(stack) => {
                for child in &mut stack.children {
                    child.for_each_code_block_mut(f);
                }
            }
            RenderNode::List(list) => {
                for row in &mut list.rows {
                    row.content.for_each_code_block_mut(f);
                }
            }
            _ => {}
        }
    }

    /// Every list in document order, outer lists before the lists they contain.
    pub fn lists(&self) -> Vec<&ListView> {
        let mut lists = Vec::new();
        self.walk(&mut |node| {
            if let RenderNode::List(list) = node {
                lists.push(list);
            }
        });
        lists
    }

    /// Every checkbox in document order. A row's checkbox comes before the
    /// checkboxes of lists nested in that row.
    pub fn checkboxes(&self) -> Vec<&CheckboxWidget> {
        let mut checkboxes = Vec::new();
        self.collect_checkboxes(&mut checkboxes);
        checkboxes
    }

    fn collect_checkboxes<'a>(&'a self, checkboxes: &mut Vec<&'a CheckboxWidget>) {
        match self {
            RenderNode::Stack(stack) => {
                for child in &stack.children {
                    child.collect_checkboxes(checkboxes);
                }
            }
            RenderNode::List(list) => {
                for row in &list.rows {
                    checkboxes.extend(row.checkbox.as_ref());
                    row.content.collect_checkboxes(checkboxes);
                }
            }
            _ => {}
        }
    }

    fn walk<'a>(&'a self, f: &mut dyn FnMut(&'a RenderNode)) {
        f(self);
        match self {
            RenderNode::Stack(stack) => {
                for child in &stack.children {
                    child.walk(f);
                }
            }
            RenderNode::List(list) => {
                for row in &list.rows {
                    row.content.walk(f);
                }
            }
            _ => {}
        }
    }

    /// Indented one-line-per-node listing, for debugging and the CLI.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.write_outline(&mut out, 0);
        out
    }

    fn write_outline(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        match self {
            RenderNode::Empty => {}
            RenderNode::Rule => out.push_str(&format!("{}---\n", indent)),
            RenderNode::Text(text) => {
                out.push_str(&format!("{}{}\n", indent, text.plain_text()));
            }
            RenderNode::Stack(stack) => {
                for child in &stack.children {
                    child.write_outline(out, depth);
                }
            }
            RenderNode::List(list) => {
                for row in &list.rows {
                    let checkbox = match &row.checkbox {
                        Some(c) if c.checked => "[x] ",
                        Some(_) => "[ ] ",
                        None => "",
                    };
                    out.push_str(&format!("{}{} {}\n", indent, row.marker, checkbox));
                    row.content.write_outline(out, depth + 1);
                }
            }
            RenderNode::CodeBlock(block) => {
                let state = if block.highlighted { "highlighted" } else { "plain" };
                out.push_str(&format!(
                    "{}```{} ({})\n",
                    indent,
                    block.language.as_deref().unwrap_or(""),
                    state
                ));
                for line in block.code.lines() {
                    out.push_str(&format!("{}{}\n", indent, line));
                }
                out.push_str(&format!("{}```\n", indent));
            }
            RenderNode::Table(table) => {
                for row in &table.rows {
                    let cells: Vec<String> = row.cells.iter().map(|c| c.plain_text()).collect();
                    out.push_str(&format!("{}| {} |\n", indent, cells.join(" | ")));
                }
            }
            RenderNode::Image(image) => {
                out.push_str(&format!("{}![{}]({})\n", indent, image.alt, image.url));
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
