//! Source buffer
//!
//! Holds the Markdown text a view is built from and tells subscribers when it
//! changes. Edits coming from render-tree widgets arrive through a channel
//! and are applied on the owner's thread with `apply_pending_edits()`, so the
//! text is only ever mutated from one place.
//!
//! A widget computes its edit against the text it was rendered from. If the
//! buffer moved on before the edit is applied, the edit is replayed line by
//! line onto the current text; edits that touch a line which changed since
//! are dropped.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};

use log::{debug, warn};

use crate::error::Result;
use crate::markdown::{EditHandler, SourceSplice};

/// Notification sent to subscribers after the text changed.
#[derive(Debug, Clone)]
pub struct TextChanged {
    /// Buffer version after the change
    pub version: u64,
    pub text: Arc<str>,
}

/// A full-text edit and the text it was computed from.
#[derive(Debug)]
struct PendingEdit {
    base_version: u64,
    base: Arc<str>,
    text: String,
}

/// The current Markdown source plus change notifications.
#[derive(Debug)]
pub struct SourceBuffer {
    text: Arc<str>,
    version: u64,
    subscribers: Vec<Sender<TextChanged>>,
    edit_sender: Sender<PendingEdit>,
    edit_receiver: Receiver<PendingEdit>,
}

impl Default for SourceBuffer {
    fn default() -> Self {
        Self::new("")
    }
}

impl SourceBuffer {
    pub fn new(text: impl Into<String>) -> Self {
        let text: String = text.into();
        let (edit_sender, edit_receiver) = channel();
        Self {
            text: Arc::from(text),
            version: 0,
            subscribers: Vec::new(),
            edit_sender,
            edit_receiver,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// The text as a shared handle, cheap to clone into render trees.
    pub fn shared_text(&self) -> Arc<str> {
        Arc::clone(&self.text)
    }

    /// Incremented on every change.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Receive a `TextChanged` for every subsequent change.
    pub fn subscribe(&mut self) -> Receiver<TextChanged> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    /// Replace the whole text. Returns `false` if it was already `text`.
    pub fn set_text(&mut self, text: impl Into<String>) -> bool {
        let text: String = text.into();
        if *self.text == *text {
            return false;
        }
        self.text = Arc::from(text);
        self.version += 1;
        self.notify();
        true
    }

    /// Replace one line.
    pub fn apply_splice(&mut self, splice: &SourceSplice) -> Result<()> {
        let text = splice.apply(&self.text)?;
        self.set_text(text);
        Ok(())
    }

    /// A callback that queues a full-text replacement for this buffer.
    ///
    /// The replacement is taken to be based on the text as it is now. The
    /// callback may be called from any thread; the edit takes effect at the
    /// next `apply_pending_edits()`.
    pub fn edit_handler(&self) -> EditHandler {
        let sender = Mutex::new(self.edit_sender.clone());
        let base_version = self.version;
        let base = self.shared_text();
        Arc::new(move |text: String| {
            let edit = PendingEdit {
                base_version,
                base: Arc::clone(&base),
                text,
            };
            let sent = match sender.lock() {
                Ok(tx) => tx.send(edit),
                Err(poisoned) => poisoned.into_inner().send(edit),
            };
            if sent.is_err() {
                debug!("Edit dropped: source buffer no longer exists");
            }
        })
    }

    /// Apply queued edits in arrival order. Returns whether the text changed.
    pub fn apply_pending_edits(&mut self) -> bool {
        let mut changed = false;
        while let Ok(edit) = self.edit_receiver.try_recv() {
            if edit.base_version == self.version {
                changed |= self.set_text(edit.text);
                continue;
            }
            match rebase(&edit.base, &edit.text, &self.text) {
                Some(text) => changed |= self.set_text(text),
                None => warn!(
                    "Dropping edit made against version {}: the lines it changes were edited since (now version {})",
                    edit.base_version, self.version
                ),
            }
        }
        changed
    }

    fn notify(&mut self) {
        let event = TextChanged {
            version: self.version,
            text: Arc::clone(&self.text),
        };
        // Subscribers that hung up are dropped
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        debug!(
            "Source changed (version {}, {} subscriber(s))",
            self.version,
            self.subscribers.len()
        );
    }
}

/// Replay the lines `edited` changed relative to `base` onto `current`.
///
/// Only edits that keep the line count are replayed, and only when every
/// line they change is still as it was in `base`.
fn rebase(base: &str, edited: &str, current: &str) -> Option<String> {
    let base: Vec<&str> = base.split('\n').collect();
    let edited: Vec<&str> = edited.split('\n').collect();
    let mut lines: Vec<&str> = current.split('\n').collect();
    if base.len() != edited.len() || base.len() != lines.len() {
        return None;
    }

    for (index, (old, new)) in base.iter().zip(&edited).enumerate() {
        if old == new {
            continue;
        }
        if lines[index] != *old {
            return None;
        }
        lines[index] = *new;
    }
    Some(lines.join("\n"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
