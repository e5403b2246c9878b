//! Markdown AST adapter over comrak
//!
//! Parses Markdown with comrak (CommonMark + GFM) and converts the arena tree
//! into an owned `MarkdownNode` tree. Every node carries its kind, its
//! children in order, and an optional source range. List items additionally
//! carry their checkbox state and the marker they were written with, which is
//! what the checkbox mutator needs to write the item back out.

use comrak::{
    nodes::{
        AstNode, ListDelimType, ListType as ComrakListType, NodeList, NodeValue,
        TableAlignment as ComrakTableAlignment,
    },
    parse_document, Arena, Options,
};
use log::debug;

use crate::error::Result;

// ─────────────────────────────────────────────────────────────────────────────
// Public Types
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration options for markdown parsing.
#[derive(Debug, Clone)]
pub struct MarkdownOptions {
    /// Enable GitHub Flavored Markdown tables
    pub tables: bool,
    /// Enable strikethrough syntax (~~text~~)
    pub strikethrough: bool,
    /// Enable autolink URLs and emails
    pub autolink: bool,
    /// Enable task lists (- [ ] and - [x])
    pub tasklist: bool,
    /// Enable superscript (^text^)
    pub superscript: bool,
    /// Enable footnotes
    pub footnotes: bool,
    /// Enable description lists
    pub description_lists: bool,
    /// Enable front matter (YAML/TOML)
    pub front_matter_delimiter: Option<String>,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            tables: true,
            strikethrough: true,
            autolink: true,
            tasklist: true,
            superscript: false,
            footnotes: true,
            description_lists: false,
            front_matter_delimiter: Some("---".to_string()),
        }
    }
}

impl MarkdownOptions {
    /// Convert to comrak Options.
    fn to_comrak_options(&self) -> Options {
        let mut options = Options::default();

        options.extension.strikethrough = self.strikethrough;
        options.extension.table = self.tables;
        options.extension.autolink = self.autolink;
        options.extension.tasklist = self.tasklist;
        options.extension.superscript = self.superscript;
        options.extension.footnotes = self.footnotes;
        options.extension.description_lists = self.description_lists;
        options.extension.front_matter_delimiter = self.front_matter_delimiter.clone();

        options
    }
}

/// Heading level (H1-H6)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingLevel {
    H1 = 1,
    H2 = 2,
    H3 = 3,
    H4 = 4,
    H5 = 5,
    H6 = 6,
}

impl From<u8> for HeadingLevel {
    fn from(level: u8) -> Self {
        match level {
            1 => HeadingLevel::H1,
            2 => HeadingLevel::H2,
            3 => HeadingLevel::H3,
            4 => HeadingLevel::H4,
            5 => HeadingLevel::H5,
            _ => HeadingLevel::H6,
        }
    }
}

/// List type (ordered or unordered)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListType {
    Bullet,
    Ordered { start: u32, delimiter: char },
}

impl ListType {
    pub fn is_ordered(&self) -> bool {
        matches!(self, ListType::Ordered { .. })
    }
}

/// The marker a list item was written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemMarker {
    /// `-`, `*` or `+`
    Bullet(char),
    /// `3.` or `3)`
    Ordered { number: u32, delimiter: char },
}

impl Default for ItemMarker {
    fn default() -> Self {
        ItemMarker::Bullet('-')
    }
}

/// Task list checkbox state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkbox {
    Unchecked,
    Checked,
}

impl Checkbox {
    /// The opposite state.
    pub fn toggled(self) -> Self {
        match self {
            Checkbox::Unchecked => Checkbox::Checked,
            Checkbox::Checked => Checkbox::Unchecked,
        }
    }

    pub fn is_checked(self) -> bool {
        matches!(self, Checkbox::Checked)
    }
}

/// Table cell alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableAlignment {
    #[default]
    None,
    Left,
    Center,
    Right,
}

impl From<ComrakTableAlignment> for TableAlignment {
    fn from(align: ComrakTableAlignment) -> Self {
        match align {
            ComrakTableAlignment::None => TableAlignment::None,
            ComrakTableAlignment::Left => TableAlignment::Left,
            ComrakTableAlignment::Center => TableAlignment::Center,
            ComrakTableAlignment::Right => TableAlignment::Right,
        }
    }
}

/// Represents the kind of a markdown node and its payload.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkdownNodeType {
    /// Root document node
    Document,
    /// Block quote (>)
    BlockQuote,
    /// List container
    List { list_type: ListType, tight: bool },
    /// List item, with its checkbox when it is a task
    Item {
        marker: ItemMarker,
        checkbox: Option<Checkbox>,
    },
    /// Code block; `language` is the first word of the info string
    CodeBlock {
        language: Option<String>,
        info: String,
        literal: String,
    },
    /// HTML block
    HtmlBlock(String),
    /// Paragraph
    Paragraph,
    /// Heading (H1-H6)
    Heading { level: HeadingLevel, setext: bool },
    /// Thematic break (horizontal rule)
    ThematicBreak,
    /// Table
    Table {
        alignments: Vec<TableAlignment>,
        num_columns: usize,
    },
    /// Table row
    TableRow { header: bool },
    /// Table cell
    TableCell,
    /// Inline text content
    Text(String),
    /// Soft line break
    SoftBreak,
    /// Hard line break
    LineBreak,
    /// Inline code
    Code(String),
    /// Inline HTML
    HtmlInline(String),
    /// Emphasis (italic)
    Emphasis,
    /// Strong emphasis (bold)
    Strong,
    /// Strikethrough
    Strikethrough,
    /// Superscript
    Superscript,
    /// Link
    Link { url: String, title: String },
    /// Image
    Image { url: String, title: String },
    /// Footnote reference
    FootnoteReference(String),
    /// Footnote definition
    FootnoteDefinition(String),
    /// Description list
    DescriptionList,
    /// Description item
    DescriptionItem,
    /// Description term
    DescriptionTerm,
    /// Description details
    DescriptionDetails,
    /// Front matter (YAML/TOML)
    FrontMatter(String),
    /// A parser node kind this adapter does not model
    Other,
}

/// A line/column position in the source (both 1-indexed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourcePosition {
    pub line: usize,
    pub column: usize,
}

/// A node's span in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceRange {
    pub start: SourcePosition,
    pub end: SourcePosition,
}

impl SourceRange {
    pub fn new(start_line: usize, start_column: usize, end_line: usize, end_column: usize) -> Self {
        Self {
            start: SourcePosition {
                line: start_line,
                column: start_column,
            },
            end: SourcePosition {
                line: end_line,
                column: end_column,
            },
        }
    }
}

/// A node in the markdown AST.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkdownNode {
    /// The kind of this node
    pub node_type: MarkdownNodeType,
    /// Child nodes
    pub children: Vec<MarkdownNode>,
    /// Position in the source, when the parser recorded one
    pub source_range: Option<SourceRange>,
}

impl MarkdownNode {
    /// Create a node without children.
    pub fn new(node_type: MarkdownNodeType, source_range: Option<SourceRange>) -> Self {
        Self {
            node_type,
            children: Vec::new(),
            source_range,
        }
    }

    /// Builder-style helper to attach children.
    pub fn with_children(mut self, children: Vec<MarkdownNode>) -> Self {
        self.children = children;
        self
    }

    /// First source line (1-indexed), if known.
    pub fn start_line(&self) -> Option<usize> {
        self.source_range.map(|r| r.start.line)
    }

    /// Checkbox state for task list items, `None` for everything else.
    pub fn checkbox(&self) -> Option<Checkbox> {
        match &self.node_type {
            MarkdownNodeType::Item { checkbox, .. } => *checkbox,
            _ => None,
        }
    }

    /// Number of nodes in this subtree, including this one.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(MarkdownNode::node_count).sum::<usize>()
    }

    /// Get all text content from this node and its descendants.
    pub fn text_content(&self) -> String {
        let mut text = String::new();
        self.collect_text(&mut text);
        text
    }

    fn collect_text(&self, output: &mut String) {
        match &self.node_type {
            MarkdownNodeType::Text(t) => output.push_str(t),
            MarkdownNodeType::Code(t) => output.push_str(t),
            MarkdownNodeType::SoftBreak => output.push(' '),
            MarkdownNodeType::LineBreak => output.push('\n'),
            _ => {}
        }
        for child in &self.children {
            child.collect_text(output);
        }
    }
}

/// A parsed markdown document.
#[derive(Debug, Clone)]
pub struct MarkdownDocument {
    /// Root node of the AST
    pub root: MarkdownNode,
    /// Front matter content if present
    pub front_matter: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Public API Functions
// ─────────────────────────────────────────────────────────────────────────────

/// Parse markdown text into an AST document.
///
/// # Example
/// ```ignore
/// let doc = parse_markdown("- [ ] task")?;
/// assert!(matches!(doc.root.children[0].node_type, MarkdownNodeType::List { .. }));
/// ```
pub fn parse_markdown(markdown: &str) -> Result<MarkdownDocument> {
    parse_markdown_with_options(markdown, &MarkdownOptions::default())
}

/// Parse markdown text with custom options.
pub fn parse_markdown_with_options(
    markdown: &str,
    options: &MarkdownOptions,
) -> Result<MarkdownDocument> {
    let arena = Arena::new();
    let comrak_options = options.to_comrak_options();

    let root = parse_document(&arena, markdown, &comrak_options);

    let mut front_matter = None;
    let converted_root = convert_node(root, None, &mut front_matter)?;
    debug!("Parsed document into {} nodes", converted_root.node_count());

    Ok(MarkdownDocument {
        root: converted_root,
        front_matter,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal Conversion Functions
// ─────────────────────────────────────────────────────────────────────────────

/// What a list tells its items about their marker.
#[derive(Debug, Clone, Copy)]
struct ListContext {
    list_type: ListType,
    bullet: char,
    index: usize,
}

impl ListContext {
    fn from_list(list: &NodeList) -> Self {
        Self {
            list_type: convert_list_type(list),
            bullet: list.bullet_char as char,
            index: 0,
        }
    }

    fn marker(&self) -> ItemMarker {
        match self.list_type {
            ListType::Bullet => ItemMarker::Bullet(self.bullet),
            ListType::Ordered { start, delimiter } => ItemMarker::Ordered {
                number: start + self.index as u32,
                delimiter,
            },
        }
    }
}

/// Convert a comrak AST node to our MarkdownNode structure.
fn convert_node<'a>(
    node: &'a AstNode<'a>,
    list: Option<ListContext>,
    front_matter: &mut Option<String>,
) -> Result<MarkdownNode> {
    let ast = node.data.borrow();
    let sourcepos = ast.sourcepos;

    let node_type = convert_node_value(&ast.value, list, front_matter)?;

    // comrak leaves line 0 on nodes it synthesised without a position
    let source_range = (sourcepos.start.line > 0).then(|| {
        SourceRange::new(
            sourcepos.start.line,
            sourcepos.start.column,
            sourcepos.end.line,
            sourcepos.end.column,
        )
    });

    let mut markdown_node = MarkdownNode::new(node_type, source_range);

    let child_list = match &ast.value {
        NodeValue::List(nl) => Some(ListContext::from_list(nl)),
        _ => None,
    };

    for (index, child) in node.children().enumerate() {
        let context = child_list.map(|ctx| ListContext { index, ..ctx });
        markdown_node
            .children
            .push(convert_node(child, context, front_matter)?);
    }

    Ok(markdown_node)
}

fn convert_list_type(list: &NodeList) -> ListType {
    match list.list_type {
        ComrakListType::Bullet => ListType::Bullet,
        ComrakListType::Ordered => ListType::Ordered {
            start: list.start as u32,
            delimiter: if list.delimiter == ListDelimType::Period {
                '.'
            } else {
                ')'
            },
        },
    }
}

fn checkbox_from_symbol(symbol: Option<char>) -> Checkbox {
    match symbol {
        Some(c) if !c.is_whitespace() => Checkbox::Checked,
        _ => Checkbox::Unchecked,
    }
}

/// The first word of a code block info string, if any.
fn language_from_info(info: &str) -> Option<String> {
    info.split_whitespace().next().map(str::to_string)
}

/// Convert a comrak NodeValue to our MarkdownNodeType.
fn convert_node_value(
    value: &NodeValue,
    list: Option<ListContext>,
    front_matter: &mut Option<String>,
) -> Result<MarkdownNodeType> {
    let node_type = match value {
        NodeValue::Document => MarkdownNodeType::Document,
        NodeValue::BlockQuote => MarkdownNodeType::BlockQuote,
        NodeValue::List(nl) => MarkdownNodeType::List {
            list_type: convert_list_type(nl),
            tight: nl.tight,
        },
        NodeValue::Item(nl) => {
            let marker = match nl.list_type {
                ComrakListType::Bullet => ItemMarker::Bullet(nl.bullet_char as char),
                ComrakListType::Ordered => ItemMarker::Ordered {
                    number: nl.start as u32,
                    delimiter: if nl.delimiter == ListDelimType::Period {
                        '.'
                    } else {
                        ')'
                    },
                },
            };
            MarkdownNodeType::Item {
                marker,
                checkbox: None,
            }
        }
        // With tasklists enabled comrak rewrites the item itself
        NodeValue::TaskItem(symbol) => MarkdownNodeType::Item {
            marker: list.map(|ctx| ctx.marker()).unwrap_or_default(),
            checkbox: Some(checkbox_from_symbol(*symbol)),
        },
        NodeValue::CodeBlock(code) => MarkdownNodeType::CodeBlock {
            language: language_from_info(&code.info),
            info: code.info.clone(),
            literal: code.literal.clone(),
        },
        NodeValue::HtmlBlock(html) => MarkdownNodeType::HtmlBlock(html.literal.clone()),
        NodeValue::Paragraph => MarkdownNodeType::Paragraph,
        NodeValue::Heading(heading) => MarkdownNodeType::Heading {
            level: HeadingLevel::from(heading.level),
            setext: heading.setext,
        },
        NodeValue::ThematicBreak => MarkdownNodeType::ThematicBreak,
        NodeValue::Table(table) => MarkdownNodeType::Table {
            alignments: table
                .alignments
                .iter()
                .map(|a| TableAlignment::from(*a))
                .collect(),
            num_columns: table.num_columns,
        },
        NodeValue::TableRow(header) => MarkdownNodeType::TableRow { header: *header },
        NodeValue::TableCell => MarkdownNodeType::TableCell,
        NodeValue::Text(text) => MarkdownNodeType::Text(text.clone()),
        NodeValue::SoftBreak => MarkdownNodeType::SoftBreak,
        NodeValue::LineBreak => MarkdownNodeType::LineBreak,
        NodeValue::Code(code) => MarkdownNodeType::Code(code.literal.clone()),
        NodeValue::HtmlInline(html) => MarkdownNodeType::HtmlInline(html.clone()),
        NodeValue::Emph => MarkdownNodeType::Emphasis,
        NodeValue::Strong => MarkdownNodeType::Strong,
        NodeValue::Strikethrough => MarkdownNodeType::Strikethrough,
        NodeValue::Superscript => MarkdownNodeType::Superscript,
        NodeValue::Link(link) => MarkdownNodeType::Link {
            url: link.url.clone(),
            title: link.title.clone(),
        },
        NodeValue::Image(image) => MarkdownNodeType::Image {
            url: image.url.clone(),
            title: image.title.clone(),
        },
        NodeValue::FootnoteReference(ref_data) => {
            MarkdownNodeType::FootnoteReference(ref_data.name.clone())
        }
        NodeValue::FootnoteDefinition(def) => {
            MarkdownNodeType::FootnoteDefinition(def.name.clone())
        }
        NodeValue::DescriptionList => MarkdownNodeType::DescriptionList,
        NodeValue::DescriptionItem(_) => MarkdownNodeType::DescriptionItem,
        NodeValue::DescriptionTerm => MarkdownNodeType::DescriptionTerm,
        NodeValue::DescriptionDetails => MarkdownNodeType::DescriptionDetails,
        NodeValue::FrontMatter(fm) => {
            *front_matter = Some(fm.clone());
            MarkdownNodeType::FrontMatter(fm.clone())
        }
        _ => MarkdownNodeType::Other,
    };

    Ok(node_type)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn first_list(doc: &MarkdownDocument) -> &MarkdownNode {
        doc.root
            .children
            .iter()
            .find(|n| matches!(n.node_type, MarkdownNodeType::List { .. }))
            .expect("document should contain a list")
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Basic Parsing Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_parse_empty_document() {
        let doc = parse_markdown("").unwrap();
        assert!(matches!(doc.root.node_type, MarkdownNodeType::Document));
        assert!(doc.root.children.is_empty());
    }

    #[test]
    fn test_parse_heading() {
        let doc = parse_markdown("## Heading 2").unwrap();
        if let MarkdownNodeType::Heading { level, .. } = &doc.root.children[0].node_type {
            assert_eq!(*level, HeadingLevel::H2);
        } else {
            panic!("Expected heading node");
        }
    }

    #[test]
    fn test_parse_malformed_markdown() {
        let inputs = [
            "# Unclosed heading",
            "```\nunclosed code block",
            "| broken | table",
            "[unclosed link(",
            "![broken image",
            "***nested emphasis**",
            "- [ ]",
        ];

        for input in inputs {
            assert!(parse_markdown(input).is_ok(), "Failed to parse: {}", input);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // List Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_parse_unordered_list() {
        let doc = parse_markdown("- Item 1\n- Item 2\n- Item 3").unwrap();
        let list = first_list(&doc);
        assert!(matches!(
            list.node_type,
            MarkdownNodeType::List {
                list_type: ListType::Bullet,
                ..
            }
        ));
        assert_eq!(list.children.len(), 3);
        assert!(list
            .children
            .iter()
            .all(|item| item.checkbox().is_none()));
    }

    #[test]
    fn test_parse_ordered_list_markers() {
        let doc = parse_markdown("3. First\n4. Second").unwrap();
        let list = first_list(&doc);
        if let MarkdownNodeType::List {
            list_type: ListType::Ordered { start, delimiter },
            ..
        } = &list.node_type
        {
            assert_eq!(*start, 3);
            assert_eq!(*delimiter, '.');
        } else {
            panic!("Expected ordered list");
        }

        match &list.children[1].node_type {
            MarkdownNodeType::Item {
                marker: ItemMarker::Ordered { number, .. },
                ..
            } => assert_eq!(*number, 4),
            other => panic!("Expected ordered item, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_task_list() {
        let doc = parse_markdown("- [ ] Unchecked\n- [x] Checked").unwrap();
        let list = first_list(&doc);
        assert_eq!(list.children.len(), 2);
        assert_eq!(list.children[0].checkbox(), Some(Checkbox::Unchecked));
        assert_eq!(list.children[1].checkbox(), Some(Checkbox::Checked));
        assert_eq!(list.children[0].text_content(), "Unchecked");
        // The marker is item state, not a child
        assert_eq!(list.children[0].children.len(), 1);
        assert!(matches!(
            list.children[0].children[0].node_type,
            MarkdownNodeType::Paragraph
        ));
    }

    #[test]
    fn test_task_item_marker_comes_from_list() {
        let doc = parse_markdown("* [x] star").unwrap();
        let item = &first_list(&doc).children[0];
        assert!(matches!(
            item.node_type,
            MarkdownNodeType::Item {
                marker: ItemMarker::Bullet('*'),
                ..
            }
        ));
    }

    #[test]
    fn test_list_item_source_range() {
        let doc = parse_markdown("intro\n\n- one\n  - nested").unwrap();
        let list = first_list(&doc);
        let item = &list.children[0];
        let range = item.source_range.expect("items carry positions");
        assert_eq!(range.start.line, 3);
        assert_eq!(range.start.column, 1);

        let nested = item
            .children
            .iter()
            .find(|c| matches!(c.node_type, MarkdownNodeType::List { .. }))
            .expect("nested list");
        let nested_range = nested.children[0].source_range.unwrap();
        assert_eq!(nested_range.start.line, 4);
        assert_eq!(nested_range.start.column, 3);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Code Block Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_code_block_language_is_first_word() {
        let doc = parse_markdown("```rust ignore\nfn main() {}\n```").unwrap();
        match &doc.root.children[0].node_type {
            MarkdownNodeType::CodeBlock {
                language,
                info,
                literal,
            } => {
                assert_eq!(language.as_deref(), Some("rust"));
                assert_eq!(info, "rust ignore");
                assert_eq!(literal, "fn main() {}\n");
            }
            other => panic!("Expected code block, got {:?}", other),
        }
    }

    #[test]
    fn test_code_block_without_language() {
        let doc = parse_markdown("```\nplain\n```").unwrap();
        assert!(matches!(
            &doc.root.children[0].node_type,
            MarkdownNodeType::CodeBlock { language: None, .. }
        ));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inline and Misc Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_parse_inline_nodes() {
        let doc = parse_markdown("a **b** *c* `d` <span>e</span> [f](http://x)").unwrap();
        let para = &doc.root.children[0];
        let kinds: Vec<_> = para.children.iter().map(|c| &c.node_type).collect();
        assert!(kinds.iter().any(|k| matches!(k, MarkdownNodeType::Strong)));
        assert!(kinds.iter().any(|k| matches!(k, MarkdownNodeType::Emphasis)));
        assert!(kinds.iter().any(|k| matches!(k, MarkdownNodeType::Code(c) if c == "d")));
        assert!(kinds
            .iter()
            .any(|k| matches!(k, MarkdownNodeType::HtmlInline(h) if h == "<span>")));
        assert!(kinds
            .iter()
            .any(|k| matches!(k, MarkdownNodeType::Link { url, .. } if url == "http://x")));
    }

    #[test]
    fn test_parse_front_matter() {
        let doc = parse_markdown("---\ntitle: x\n---\n\n# Body").unwrap();
        assert!(doc.front_matter.is_some());
    }

    #[test]
    fn test_node_count() {
        let doc = parse_markdown("# A\n\nb").unwrap();
        // document, heading, text, paragraph, text
        assert_eq!(doc.root.node_count(), 5);
    }
}
