//! Markdown parsing, rendering, and checkbox editing
//!
//! This module turns Markdown text into a render tree using the comrak
//! library, a CommonMark + GFM compatible parser, and syntect for code
//! highlighting.
//!
//! # Features
//! - Parse markdown text to an owned AST with source ranges
//! - Render the AST into an inert `RenderNode` tree
//! - Toggle task list checkboxes by rewriting one source line
//! - Cache code highlighting keyed by language, code, theme and color mode
//!
//! # Example
//! ```ignore
//! use markview::markdown::{HighlightCache, Renderer};
//! use markview::config::{ColorMode, LayoutConfig};
//!
//! let config = LayoutConfig::default();
//! let cache = HighlightCache::default();
//! let tree = Renderer::new(&config, &cache, ColorMode::Light)
//!     .render_source("- [ ] task", None);
//! ```

pub mod checkbox;
pub mod highlight;
mod parser;
pub mod render;
pub mod render_node;
mod serialize;
pub mod syntax;

pub use checkbox::{find_task_item, plan_toggle, task_items, toggle, SourceSplice};
pub use highlight::{HighlightCache, HighlightKey, HighlightResult, HighlightState};
pub use parser::{
    parse_markdown, parse_markdown_with_options, Checkbox, HeadingLevel, ItemMarker, ListType,
    MarkdownDocument, MarkdownNode, MarkdownNodeType, MarkdownOptions, SourcePosition,
    SourceRange, TableAlignment,
};
pub use render::{Renderer, TraversalContext};
pub use render_node::{
    CheckboxWidget, CodeBlockView, Decoration, EditHandler, FontRole, ImageView, ListMarker,
    ListRow, ListView, Padding, RenderNode, RunStyle, Stack, StyledText, TableRowView, TableView,
    TextRun,
};
pub use serialize::serialize_item;
pub use syntax::{shared_highlighter, Highlighter, SyntectHighlighter};
