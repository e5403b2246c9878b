//! Markdown view
//!
//! Wires the source buffer, parser, render visitor and highlight cache
//! together for a host UI. Every change to the source re-derives the whole
//! render tree; highlights land per code block as they resolve.
//!
//! The host calls `poll()` once per frame.

use std::sync::mpsc::Receiver;
use std::time::Duration;

use log::{debug, info};

use crate::buffer::{SourceBuffer, TextChanged};
use crate::config::{ColorMode, LayoutConfig};
use crate::markdown::{
    HighlightCache, HighlightKey, HighlightResult, HighlightState, RenderNode, Renderer,
};

/// A rendered Markdown document kept in sync with its source.
pub struct MarkdownView {
    buffer: SourceBuffer,
    changes: Receiver<TextChanged>,
    config: LayoutConfig,
    cache: HighlightCache,
    color_mode: ColorMode,
    tree: RenderNode,
}

impl MarkdownView {
    /// Create a view over `text` with the bundled syntect highlighter.
    pub fn new(text: impl Into<String>, config: LayoutConfig, color_mode: ColorMode) -> Self {
        Self::with_cache(text, config, color_mode, HighlightCache::default())
    }

    pub fn with_cache(
        text: impl Into<String>,
        config: LayoutConfig,
        color_mode: ColorMode,
        cache: HighlightCache,
    ) -> Self {
        let mut buffer = SourceBuffer::new(text);
        let changes = buffer.subscribe();
        let mut view = Self {
            buffer,
            changes,
            config,
            cache,
            color_mode,
            tree: RenderNode::Empty,
        };
        view.refresh();
        view
    }

    pub fn tree(&self) -> &RenderNode {
        &self.tree
    }

    pub fn text(&self) -> &str {
        self.buffer.text()
    }

    pub fn buffer(&self) -> &SourceBuffer {
        &self.buffer
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn color_mode(&self) -> ColorMode {
        self.color_mode
    }

    pub fn cache(&self) -> &HighlightCache {
        &self.cache
    }

    /// Re-parse and re-render the whole document, then schedule highlighting
    /// for every code block.
    pub fn refresh(&mut self) {
        self.cache
            .set_theme(self.config.code_theme.theme_for(self.color_mode));

        let handler = self.buffer.edit_handler();
        self.tree = Renderer::new(&self.config, &self.cache, self.color_mode)
            .render_source(self.buffer.text(), Some(handler));

        let keys: Vec<HighlightKey> = self
            .tree
            .code_blocks()
            .iter()
            .filter(|block| !block.highlighted)
            .map(|block| block.key.clone())
            .collect();
        debug!("Rendered document with {} code block(s) to highlight", keys.len());

        for key in keys {
            if let HighlightState::Ready(styled) = self.cache.request(&key) {
                self.apply(&HighlightResult { key, styled });
            }
        }
    }

    /// Apply queued edits and finished highlights. Returns whether the tree
    /// changed.
    pub fn poll(&mut self) -> bool {
        self.buffer.apply_pending_edits();
        let edited = self.changes.try_iter().count() > 0;
        if edited {
            self.refresh();
        }

        let mut updated = false;
        for result in self.cache.poll() {
            updated |= self.apply(&result);
        }
        edited || updated
    }

    /// Block until outstanding highlights resolve or `timeout` elapses.
    pub fn wait_for_highlights(&mut self, timeout: Duration) -> bool {
        let mut updated = false;
        for result in self.cache.wait(timeout) {
            updated |= self.apply(&result);
        }
        updated
    }

    /// Hand a highlight to every block that currently wants it. Blocks whose
    /// key moved on ignore it.
    fn apply(&mut self, result: &HighlightResult) -> bool {
        let mut applied = false;
        self.tree.for_each_code_block_mut(&mut |block| {
            applied |= block.apply(result);
        });
        applied
    }

    /// Replace the source text and re-render.
    pub fn set_text(&mut self, text: impl Into<String>) {
        if self.buffer.set_text(text) {
            self.poll();
        }
    }

    pub fn set_color_mode(&mut self, color_mode: ColorMode) {
        if self.color_mode == color_mode {
            return;
        }
        info!("Switching to {} mode", color_mode.label());
        self.color_mode = color_mode;
        self.refresh();
    }

    pub fn set_config(&mut self, config: LayoutConfig) {
        self.config = config;
        self.refresh();
    }

    /// Toggle the checkbox of the task item that starts on `line` (1-based).
    ///
    /// Returns whether the source changed.
    pub fn toggle_line(&mut self, line: usize) -> bool {
        let Some(index) = line.checked_sub(1) else {
            return false;
        };
        let toggled = self
            .tree
            .checkboxes()
            .into_iter()
            .find(|checkbox| checkbox.splice().map(|s| s.line_index) == Some(index))
            .and_then(|checkbox| checkbox.toggle())
            .is_some();

        if toggled {
            self.poll();
        } else {
            debug!("No task item starts on line {}", line);
        }
        toggled
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
