//! markview - Markdown render engine
//!
//! Parses Markdown with comrak, renders it into an inert tree of displayable
//! components, highlights code blocks asynchronously with syntect, and writes
//! task list checkbox toggles back into the source text.

pub mod buffer;
pub mod config;
pub mod error;
pub mod markdown;
pub mod view;

pub use buffer::{SourceBuffer, TextChanged};
pub use config::{ColorMode, LayoutConfig};
pub use error::{Error, Result};
pub use markdown::{HighlightCache, RenderNode, Renderer, TraversalContext};
pub use view::MarkdownView;
