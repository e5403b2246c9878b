//! Render visitor
//!
//! Walks a `MarkdownNode` tree and builds the matching `RenderNode` tree.
//! Every node kind has an arm in `Renderer::render`; kinds without a visual
//! of their own fall back to their text or to an empty node, so a pass always
//! yields a complete tree.
//!
//! Layout state travels down the recursion in a `TraversalContext`. Nested
//! lists get a copy with `list_depth` one higher; siblings never see each
//! other's context.

use std::fmt;
use std::sync::Arc;

use log::{debug, warn};

use crate::config::{ColorMode, LayoutConfig};
use crate::markdown::checkbox::plan_toggle;
use crate::markdown::highlight::{HighlightCache, HighlightKey};
use crate::markdown::parser::{parse_markdown, MarkdownNode, MarkdownNodeType};
use crate::markdown::render_node::{
    CheckboxWidget, CodeBlockView, Decoration, EditHandler, FontRole, ImageView, ListMarker,
    ListRow, ListView, Padding, RenderNode, RunStyle, Stack, StyledText, TableRowView,
    TableView, TextRun,
};

/// Opacity applied to the inline code tint for its background.
const INLINE_CODE_BACKGROUND_ALPHA: f32 = 0.1;

// ─────────────────────────────────────────────────────────────────────────────
// Traversal Context
// ─────────────────────────────────────────────────────────────────────────────

/// Per-call layout state threaded through the recursion.
#[derive(Clone)]
pub struct TraversalContext {
    /// Number of lists enclosing the node being rendered
    pub list_depth: usize,
    pub component_spacing: f32,
    pub list_indent: f32,
    /// Receives the full new source when a checkbox is toggled
    pub edit_handler: Option<EditHandler>,
    /// The source text the tree is being built from
    pub live_source: Arc<str>,
}

impl TraversalContext {
    /// Context for the document root.
    pub fn new(config: &LayoutConfig, source: impl Into<Arc<str>>) -> Self {
        Self {
            list_depth: 0,
            component_spacing: config.component_spacing,
            list_indent: config.list_indent,
            edit_handler: None,
            live_source: source.into(),
        }
    }

    pub fn with_edit_handler(mut self, handler: EditHandler) -> Self {
        self.edit_handler = Some(handler);
        self
    }

    /// Whether no list encloses the current node.
    pub fn is_top_level(&self) -> bool {
        self.list_depth == 0
    }

    /// Copy for the content of a list one level deeper.
    fn nested_list(&self) -> Self {
        Self {
            list_depth: self.list_depth + 1,
            ..self.clone()
        }
    }

    /// Gap between sibling blocks; only the top level gets one.
    fn block_spacing(&self) -> f32 {
        if self.is_top_level() {
            self.component_spacing
        } else {
            0.0
        }
    }

    fn block_padding(&self) -> Padding {
        if self.is_top_level() {
            Padding::vertical(self.component_spacing / 2.0)
        } else {
            Padding::default()
        }
    }
}

impl fmt::Debug for TraversalContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraversalContext")
            .field("list_depth", &self.list_depth)
            .field("component_spacing", &self.component_spacing)
            .field("list_indent", &self.list_indent)
            .field("edit_handler", &self.edit_handler.is_some())
            .field("live_source_len", &self.live_source.len())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Renderer
// ─────────────────────────────────────────────────────────────────────────────

/// Builds render trees. Reads the layout configuration and the highlight
/// cache; mutates neither.
pub struct Renderer<'a> {
    config: &'a LayoutConfig,
    highlights: &'a HighlightCache,
    color_mode: ColorMode,
}

impl<'a> Renderer<'a> {
    pub fn new(config: &'a LayoutConfig, highlights: &'a HighlightCache, color_mode: ColorMode) -> Self {
        Self {
            config,
            highlights,
            color_mode,
        }
    }

    /// Parse `source` and render the whole document.
    pub fn render_source(&self, source: &str, edit_handler: Option<EditHandler>) -> RenderNode {
        let doc = match parse_markdown(source) {
            Ok(doc) => doc,
            Err(e) => {
                warn!("Failed to parse document, rendering nothing: {}", e);
                return RenderNode::Empty;
            }
        };
        let mut ctx = TraversalContext::new(self.config, source);
        ctx.edit_handler = edit_handler;
        self.render(&doc.root, &ctx)
    }

    /// Render one node and its subtree.
    pub fn render(&self, node: &MarkdownNode, ctx: &TraversalContext) -> RenderNode {
        match &node.node_type {
            MarkdownNodeType::Document => self.block(&node.children, ctx),

            MarkdownNodeType::Paragraph => self.paragraph(node),

            MarkdownNodeType::Heading { level, .. } => {
                let style = RunStyle::default()
                    .with_font(FontRole::Heading(*level as u8))
                    .with_bold();
                RenderNode::Text(self.inline_text(&node.children, style))
            }

            MarkdownNodeType::BlockQuote => {
                let mut inner = self.block(&node.children, ctx);
                if let RenderNode::Stack(stack) = &mut inner {
                    stack.padding.leading = ctx.list_indent;
                    stack.decoration = Decoration::QuoteBar(self.config.quote_tint);
                }
                inner
            }

            MarkdownNodeType::List { list_type, .. } => {
                self.list(node, list_type.is_ordered(), ctx)
            }

            // An item outside a list has no marker to draw
            MarkdownNodeType::Item { .. } => self.block(&node.children, ctx),

            MarkdownNodeType::CodeBlock {
                language, literal, ..
            } => self.code_block(language.as_deref(), literal, ctx),

            MarkdownNodeType::HtmlBlock(html) => RenderNode::Text(StyledText::new(vec![
                TextRun::new(html.trim_end_matches('\n'), RunStyle::default()),
            ])),

            MarkdownNodeType::ThematicBreak => RenderNode::Rule,

            MarkdownNodeType::Table { .. } => self.table(node),

            MarkdownNodeType::TableRow { .. } | MarkdownNodeType::TableCell => {
                RenderNode::Text(self.inline_text(&node.children, RunStyle::default()))
            }

            MarkdownNodeType::Text(_)
            | MarkdownNodeType::SoftBreak
            | MarkdownNodeType::LineBreak
            | MarkdownNodeType::Code(_)
            | MarkdownNodeType::HtmlInline(_)
            | MarkdownNodeType::Emphasis
            | MarkdownNodeType::Strong
            | MarkdownNodeType::Strikethrough
            | MarkdownNodeType::Superscript
            | MarkdownNodeType::Link { .. }
            | MarkdownNodeType::Image { .. }
            | MarkdownNodeType::FootnoteReference(_) => {
                RenderNode::Text(self.inline_text(std::slice::from_ref(node), RunStyle::default()))
            }

            MarkdownNodeType::FootnoteDefinition(name) => {
                let label = RenderNode::Text(StyledText::new(vec![TextRun::new(
                    format!("[{}]", name),
                    RunStyle::default().with_superscript(),
                )]));
                let mut children = vec![label];
                children.extend(node.children.iter().map(|child| self.render(child, ctx)));
                RenderNode::Stack(Stack {
                    children,
                    spacing: ctx.block_spacing(),
                    ..Default::default()
                })
            }

            MarkdownNodeType::DescriptionList
            | MarkdownNodeType::DescriptionItem
            | MarkdownNodeType::DescriptionTerm => self.block(&node.children, ctx),

            MarkdownNodeType::DescriptionDetails => {
                let mut inner = self.block(&node.children, ctx);
                if let RenderNode::Stack(stack) = &mut inner {
                    stack.padding.leading = ctx.list_indent;
                }
                inner
            }

            MarkdownNodeType::FrontMatter(content) => {
                RenderNode::Text(StyledText::plain_monospace(content.trim_end()))
            }

            MarkdownNodeType::Other => self.fallback(node, ctx),
        }
    }

    /// Children stacked vertically.
    fn block(&self, children: &[MarkdownNode], ctx: &TraversalContext) -> RenderNode {
        RenderNode::Stack(Stack {
            children: children.iter().map(|child| self.render(child, ctx)).collect(),
            spacing: ctx.block_spacing(),
            padding: ctx.block_padding(),
            decoration: Decoration::None,
        })
    }

    /// Whatever text a node we cannot draw carries, or nothing.
    fn fallback(&self, node: &MarkdownNode, ctx: &TraversalContext) -> RenderNode {
        debug!("Rendering unhandled node kind by fallback");
        if !node.children.is_empty() {
            return self.block(&node.children, ctx);
        }
        let text = node.text_content();
        if text.is_empty() {
            RenderNode::Empty
        } else {
            RenderNode::Text(StyledText::new(vec![TextRun::new(text, RunStyle::default())]))
        }
    }

    fn paragraph(&self, node: &MarkdownNode) -> RenderNode {
        // A lone image is a block of its own
        if let [child] = node.children.as_slice() {
            if let MarkdownNodeType::Image { url, title } = &child.node_type {
                return RenderNode::Image(ImageView {
                    url: url.clone(),
                    alt: child.text_content(),
                    title: title.clone(),
                });
            }
        }
        RenderNode::Text(self.inline_text(&node.children, RunStyle::default()))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lists
    // ─────────────────────────────────────────────────────────────────────────

    fn list(&self, node: &MarkdownNode, ordered: bool, ctx: &TraversalContext) -> RenderNode {
        if let Some(stray) = node
            .children
            .iter()
            .find(|child| !matches!(child.node_type, MarkdownNodeType::Item { .. }))
        {
            warn!(
                "List contains a non-item child ({:?}); rendering nothing for it",
                stray.node_type
            );
            return RenderNode::Empty;
        }

        // Indent once, at the outermost list
        let leading_indent = if ctx.is_top_level() {
            ctx.list_indent
        } else {
            0.0
        };
        let item_ctx = ctx.nested_list();

        let rows = node
            .children
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let marker = if ordered {
                    ListMarker::Ordinal(index + 1)
                } else {
                    ListMarker::Bullet(self.config.unordered_list_bullet.clone())
                };
                ListRow {
                    marker,
                    checkbox: self.checkbox(item, &item_ctx),
                    leading_indent,
                    content: Box::new(self.item_content(item, &item_ctx)),
                }
            })
            .collect();

        RenderNode::List(ListView {
            ordered,
            rows,
            spacing: ctx.block_spacing(),
            padding: ctx.block_padding(),
        })
    }

    fn item_content(&self, item: &MarkdownNode, ctx: &TraversalContext) -> RenderNode {
        match item.children.as_slice() {
            [] => RenderNode::Text(StyledText::default()),
            [only] => self.render(only, ctx),
            children => self.block(children, ctx),
        }
    }

    fn checkbox(&self, item: &MarkdownNode, ctx: &TraversalContext) -> Option<CheckboxWidget> {
        let checked = item.checkbox()?.is_checked();
        let tint = if checked {
            self.config.checkbox_checked_tint
        } else {
            self.config.checkbox_unchecked_tint
        };
        Some(CheckboxWidget::new(
            checked,
            tint,
            plan_toggle(item, &ctx.live_source),
            Arc::clone(&ctx.live_source),
            ctx.edit_handler.clone(),
        ))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Code and Tables
    // ─────────────────────────────────────────────────────────────────────────

    fn code_block(&self, language: Option<&str>, literal: &str, ctx: &TraversalContext) -> RenderNode {
        let code = strip_trailing_newline(literal);
        let theme = self.config.code_theme.theme_for(self.color_mode);
        let key = HighlightKey::new(language, code, theme, self.color_mode);

        let (content, highlighted) = match self.highlights.lookup(&key) {
            Some(styled) => (styled.clone(), true),
            None => (StyledText::plain_monospace(code), false),
        };

        RenderNode::CodeBlock(CodeBlockView {
            language: language.map(str::to_string),
            code: code.to_string(),
            key,
            content,
            highlighted,
            padding: ctx.block_padding(),
        })
    }

    fn table(&self, node: &MarkdownNode) -> RenderNode {
        let rows = node
            .children
            .iter()
            .map(|row| {
                let header = matches!(row.node_type, MarkdownNodeType::TableRow { header: true });
                let base = if header {
                    RunStyle::default().with_bold()
                } else {
                    RunStyle::default()
                };
                TableRowView {
                    header,
                    cells: row
                        .children
                        .iter()
                        .map(|cell| self.inline_text(&cell.children, base.clone()))
                        .collect(),
                }
            })
            .collect();
        RenderNode::Table(TableView { rows })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inline Content
    // ─────────────────────────────────────────────────────────────────────────

    fn inline_text(&self, nodes: &[MarkdownNode], style: RunStyle) -> StyledText {
        let mut text = StyledText::default();
        for node in nodes {
            self.inline(node, &style, &mut text);
        }
        text
    }

    /// Append one inline node. `style` accumulates formatting from enclosing
    /// nodes so nested emphasis combines.
    fn inline(&self, node: &MarkdownNode, style: &RunStyle, out: &mut StyledText) {
        let children = |style: RunStyle, out: &mut StyledText| {
            for child in &node.children {
                self.inline(child, &style, out);
            }
        };

        match &node.node_type {
            MarkdownNodeType::Text(text) => out.push(TextRun::new(text.as_str(), style.clone())),
            MarkdownNodeType::SoftBreak => out.push(TextRun::new(" ", style.clone())),
            MarkdownNodeType::LineBreak => out.push(TextRun::new("\n", style.clone())),
            MarkdownNodeType::Code(code) => {
                // Inline code keeps its own look regardless of the surrounding style
                let tint = self.config.inline_code_tint;
                let mut code_style = RunStyle::monospace().with_foreground(tint);
                code_style.background = Some(tint.gamma_multiply(INLINE_CODE_BACKGROUND_ALPHA));
                out.push(TextRun::new(code.as_str(), code_style));
            }
            // Raw HTML is shown as written
            MarkdownNodeType::HtmlInline(html) => out.push(TextRun::new(html.as_str(), style.clone())),
            MarkdownNodeType::Emphasis => children(style.clone().with_italic(), out),
            MarkdownNodeType::Strong => children(style.clone().with_bold(), out),
            MarkdownNodeType::Strikethrough => children(style.clone().with_strikethrough(), out),
            MarkdownNodeType::Superscript => children(style.clone().with_superscript(), out),
            MarkdownNodeType::Link { url, .. } => {
                children(style.clone().with_link(url, self.config.link_tint), out)
            }
            MarkdownNodeType::Image { .. } => {
                out.push(TextRun::new(node.text_content(), style.clone().with_italic()))
            }
            MarkdownNodeType::FootnoteReference(name) => out.push(TextRun::new(
                format!("[{}]", name),
                style.clone().with_superscript(),
            )),
            _ => {
                if node.children.is_empty() {
                    let text = node.text_content();
                    if !text.is_empty() {
                        out.push(TextRun::new(text, style.clone()));
                    }
                } else {
                    children(style.clone(), out);
                }
            }
        }
    }
}

/// Drop the one `\n` left by the code fence. Anything before it, a `\r`
/// included, is code.
fn strip_trailing_newline(literal: &str) -> &str {
    literal.strip_suffix('\n').unwrap_or(literal)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::parser::{Checkbox, ItemMarker, ListType};
    use egui::Color32;
    use std::sync::Mutex;

    fn render_with(source: &str, config: &LayoutConfig, handler: Option<EditHandler>) -> RenderNode {
        let cache = HighlightCache::default();
        Renderer::new(config, &cache, ColorMode::Light).render_source(source, handler)
    }

    fn render(source: &str) -> RenderNode {
        render_with(source, &LayoutConfig::default(), None)
    }

    fn ordinals(list: &ListView) -> Vec<usize> {
        list.rows
            .iter()
            .map(|row| match row.marker {
                ListMarker::Ordinal(n) => n,
                ListMarker::Bullet(_) => 0,
            })
            .collect()
    }

    fn first_text(tree: &RenderNode) -> StyledText {
        let RenderNode::Stack(stack) = tree else {
            panic!("document renders as a stack");
        };
        match &stack.children[0] {
            RenderNode::Text(text) => text.clone(),
            other => panic!("Expected text, got {:?}", other),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // List Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_ordered_list_ordinals() {
        let tree = render("1. a\n2. b\n3. c");
        let lists = tree.lists();
        assert_eq!(ordinals(lists[0]), vec![1, 2, 3]);
    }

    #[test]
    fn test_ordinals_ignore_source_numbers() {
        let tree = render("5. a\n9. b");
        assert_eq!(ordinals(tree.lists()[0]), vec![1, 2]);
    }

    #[test]
    fn test_nested_ordinals_restart() {
        let tree = render("1. a\n2. b\n   1. x\n   2. y\n3. c");
        let lists = tree.lists();
        assert_eq!(lists.len(), 2);
        assert_eq!(ordinals(lists[0]), vec![1, 2, 3]);
        assert_eq!(ordinals(lists[1]), vec![1, 2]);
    }

    #[test]
    fn test_bullet_comes_from_config() {
        let config = LayoutConfig {
            unordered_list_bullet: "*".to_string(),
            ..Default::default()
        };
        let tree = render_with("- a\n- b", &config, None);
        let list = tree.lists()[0];
        assert!(!list.ordered);
        assert!(list
            .rows
            .iter()
            .all(|row| row.marker == ListMarker::Bullet("*".to_string())));
    }

    #[test]
    fn test_indent_only_at_outermost_list() {
        let tree = render("- a\n  - b\n    - c");
        let lists = tree.lists();
        assert_eq!(lists.len(), 3);
        assert_eq!(lists[0].rows[0].leading_indent, 12.0);
        assert_eq!(lists[1].rows[0].leading_indent, 0.0);
        assert_eq!(lists[2].rows[0].leading_indent, 0.0);
        assert_eq!(lists[0].spacing, 8.0);
        assert_eq!(lists[1].spacing, 0.0);
    }

    #[test]
    fn test_list_with_stray_child_renders_nothing() {
        let list = MarkdownNode::new(
            MarkdownNodeType::List {
                list_type: ListType::Bullet,
                tight: true,
            },
            None,
        )
        .with_children(vec![MarkdownNode::new(MarkdownNodeType::Paragraph, None)]);

        let config = LayoutConfig::default();
        let cache = HighlightCache::default();
        let renderer = Renderer::new(&config, &cache, ColorMode::Light);
        let ctx = TraversalContext::new(&config, "");
        assert!(renderer.render(&list, &ctx).is_empty());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Checkbox Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_checkbox_indicators() {
        let tree = render("- [ ] task one\n- [x] task two");
        let checked: Vec<bool> = tree.checkboxes().iter().map(|c| c.checked).collect();
        assert_eq!(checked, vec![false, true]);

        let config = LayoutConfig::default();
        let boxes = tree.checkboxes();
        assert_eq!(boxes[0].tint, config.checkbox_unchecked_tint);
        assert_eq!(boxes[1].tint, config.checkbox_checked_tint);
    }

    #[test]
    fn test_checkboxes_in_document_order() {
        let tree = render("- [ ] a\n  - [x] b\n- [ ] c");
        let lines: Vec<usize> = tree
            .checkboxes()
            .iter()
            .filter_map(|c| c.splice().map(|s| s.line_index))
            .collect();
        assert_eq!(lines, vec![0, 1, 2]);

        let checked: Vec<bool> = tree.checkboxes().iter().map(|c| c.checked).collect();
        assert_eq!(checked, vec![false, true, false]);
    }

    #[test]
    fn test_checkbox_toggle_reaches_handler() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        let handler: EditHandler = Arc::new(move |text: String| sink.lock().unwrap().push(text));

        let tree = render_with(
            "- [ ] task one\n- [x] task two",
            &LayoutConfig::default(),
            Some(handler),
        );
        let first = tree.checkboxes()[0];
        assert!(first.is_interactive());
        first.toggle();

        assert_eq!(
            *received.lock().unwrap(),
            vec!["- [x] task one\n- [x] task two".to_string()]
        );
    }

    #[test]
    fn test_checkbox_without_handler_is_not_interactive() {
        let tree = render("- [ ] task");
        assert!(!tree.checkboxes()[0].is_interactive());
    }

    #[test]
    fn test_checkbox_without_position_has_no_splice() {
        let item = MarkdownNode::new(
            MarkdownNodeType::Item {
                marker: ItemMarker::Bullet('-'),
                checkbox: Some(Checkbox::Unchecked),
            },
            None,
        );
        let list = MarkdownNode::new(
            MarkdownNodeType::List {
                list_type: ListType::Bullet,
                tight: true,
            },
            None,
        )
        .with_children(vec![item]);

        let config = LayoutConfig::default();
        let cache = HighlightCache::default();
        let renderer = Renderer::new(&config, &cache, ColorMode::Light);
        let ctx = TraversalContext::new(&config, "- [ ] a").with_edit_handler(Arc::new(|_: String| {}));
        let tree = renderer.render(&list, &ctx);
        let checkbox = tree.checkboxes()[0];
        assert!(checkbox.splice().is_none());
        assert_eq!(checkbox.toggle(), None);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Code Block Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_code_block_strips_one_newline() {
        let tree = render("```rust\nfn main() {}\n\n```");
        let block = tree.code_blocks()[0];
        assert_eq!(block.code, "fn main() {}\n");
        assert_eq!(block.key.theme, "InspiredGitHub");
        assert_eq!(block.key.color_mode, ColorMode::Light);
        assert!(!block.highlighted);
    }

    #[test]
    fn test_code_block_uses_cached_highlight() {
        let config = LayoutConfig::default();
        let mut cache = HighlightCache::default();
        let key = HighlightKey::new(Some("rust"), "let x = 1;", "base16-ocean.dark", ColorMode::Dark);
        let styled = cache.highlight_now(&key);

        let tree = Renderer::new(&config, &cache, ColorMode::Dark)
            .render_source("```rust\nlet x = 1;\n```", None);
        let block = tree.code_blocks()[0];
        assert_eq!(block.key, key);
        assert!(block.highlighted);
        assert_eq!(block.content, styled);
    }

    #[test]
    fn test_unknown_language_is_plain_monospace() {
        let tree = render("```not-a-real-language\nsome text\n```");
        let block = tree.code_blocks()[0];
        assert_eq!(block.content, StyledText::plain_monospace("some text"));
    }

    #[test]
    fn test_strip_trailing_newline() {
        assert_eq!(strip_trailing_newline("a\n"), "a");
        assert_eq!(strip_trailing_newline("a\r\n"), "a\r");
        assert_eq!(strip_trailing_newline("a\n\n"), "a\n");
        assert_eq!(strip_trailing_newline("a"), "a");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inline Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_nested_emphasis_accumulates() {
        let text = first_text(&render("***both***"));
        let run = text.runs.iter().find(|r| r.text == "both").unwrap();
        assert!(run.style.bold);
        assert!(run.style.italic);
    }

    #[test]
    fn test_inline_code_tint() {
        let config = LayoutConfig {
            inline_code_tint: Color32::from_rgb(200, 0, 0),
            ..Default::default()
        };
        let text = first_text(&render_with("use `x` here", &config, None));
        let run = text.runs.iter().find(|r| r.text == "x").unwrap();
        assert_eq!(run.style.font, FontRole::Monospace);
        assert_eq!(run.style.foreground, Some(Color32::from_rgb(200, 0, 0)));
        assert!(run.style.background.is_some());
        assert_ne!(run.style.background, run.style.foreground);
    }

    #[test]
    fn test_inline_html_verbatim() {
        let text = first_text(&render("a <b>bold</b> c"));
        assert_eq!(text.plain_text(), "a <b>bold</b> c");
    }

    #[test]
    fn test_link_carries_url() {
        let text = first_text(&render("[site](https://example.com)"));
        assert_eq!(text.runs[0].style.link.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn test_heading_font_role() {
        let text = first_text(&render("## Title"));
        assert_eq!(text.runs[0].style.font, FontRole::Heading(2));
        assert!(text.runs[0].style.bold);
    }

    #[test]
    fn test_other_blocks() {
        let tree = render("> quoted\n\n---\n\n| a | b |\n|---|---|\n| 1 | 2 |\n\n![alt](img.png)");
        let RenderNode::Stack(stack) = &tree else {
            panic!("document renders as a stack");
        };
        assert!(matches!(
            &stack.children[0],
            RenderNode::Stack(Stack {
                decoration: Decoration::QuoteBar(_),
                ..
            })
        ));
        assert!(matches!(stack.children[1], RenderNode::Rule));
        match &stack.children[2] {
            RenderNode::Table(table) => {
                assert_eq!(table.rows.len(), 2);
                assert!(table.rows[0].header);
                assert_eq!(table.rows[1].cells[1].plain_text(), "2");
            }
            other => panic!("Expected table, got {:?}", other),
        }
        assert!(matches!(&stack.children[3], RenderNode::Image(img) if img.alt == "alt"));
    }

    #[test]
    fn test_unknown_kind_falls_back_to_text() {
        let node = MarkdownNode::new(MarkdownNodeType::Other, None)
            .with_children(vec![MarkdownNode::new(MarkdownNodeType::Text("kept".into()), None)]);
        let config = LayoutConfig::default();
        let cache = HighlightCache::default();
        let renderer = Renderer::new(&config, &cache, ColorMode::Light);
        let tree = renderer.render(&node, &TraversalContext::new(&config, ""));
        assert_eq!(tree.plain_text(), "kept");

        let bare = MarkdownNode::new(MarkdownNodeType::Other, None);
        assert!(renderer
            .render(&bare, &TraversalContext::new(&config, ""))
            .is_empty());
    }

    #[test]
    fn test_context_descend_does_not_leak() {
        let config = LayoutConfig::default();
        let ctx = TraversalContext::new(&config, "x");
        let nested = ctx.nested_list();
        assert_eq!(ctx.list_depth, 0);
        assert_eq!(nested.list_depth, 1);
        assert!(Arc::ptr_eq(&ctx.live_source, &nested.live_source));
    }
}
