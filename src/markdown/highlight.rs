//! Highlight cache
//!
//! Maps a `HighlightKey` (language, code, theme, color mode) to styled code.
//! Requests for keys that are not resolved yet are queued for a small fixed
//! set of worker threads; until then callers get plain monospace text.
//! Workers are started on demand, up to `MAX_WORKERS`, and exit when the
//! cache is dropped. Results come back through a channel and are drained
//! with `poll()`, the same way file watcher events are drained by the host's
//! frame loop.
//!
//! The cache never evicts on a theme change. A new theme or color mode
//! produces new keys, and entries under the old keys are simply no longer
//! looked up.

use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::config::ColorMode;
use crate::markdown::render_node::StyledText;
use crate::markdown::syntax::{shared_highlighter, Highlighter};

// ─────────────────────────────────────────────────────────────────────────────
// Keys and Results
// ─────────────────────────────────────────────────────────────────────────────

/// Identity of one highlighted rendering of a code block.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HighlightKey {
    /// Language tag as written in the document
    pub language: Option<String>,
    pub code: String,
    pub theme: String,
    pub color_mode: ColorMode,
}

impl HighlightKey {
    pub fn new(language: Option<&str>, code: &str, theme: &str, color_mode: ColorMode) -> Self {
        Self {
            language: language.map(str::to_string),
            code: code.to_string(),
            theme: theme.to_string(),
            color_mode,
        }
    }
}

/// A finished highlight, tagged with the key it was computed for.
#[derive(Debug, Clone)]
pub struct HighlightResult {
    pub key: HighlightKey,
    pub styled: StyledText,
}

/// Outcome of a highlight request.
#[derive(Debug, Clone, PartialEq)]
pub enum HighlightState {
    /// Final output for the key
    Ready(StyledText),
    /// Work is in flight; the payload is the unstyled stand-in
    Pending(StyledText),
}

impl HighlightState {
    /// What to display right now.
    pub fn styled(&self) -> &StyledText {
        match self {
            HighlightState::Ready(styled) | HighlightState::Pending(styled) => styled,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, HighlightState::Ready(_))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Highlight Cache
// ─────────────────────────────────────────────────────────────────────────────

/// Most worker threads one cache will run.
pub const MAX_WORKERS: usize = 4;

/// A queued highlight with its language already resolved.
struct HighlightJob {
    key: HighlightKey,
    language: String,
}

/// Cache of highlighted code keyed by `HighlightKey`.
pub struct HighlightCache {
    highlighter: Arc<dyn Highlighter>,
    /// Lowercased language identifiers the highlighter accepts
    languages: HashSet<String>,
    resolved: HashMap<HighlightKey, StyledText>,
    in_flight: HashSet<HighlightKey>,
    sender: Sender<HighlightResult>,
    receiver: Receiver<HighlightResult>,
    jobs: Sender<HighlightJob>,
    job_queue: Arc<Mutex<Receiver<HighlightJob>>>,
    workers: usize,
    max_workers: usize,
    active_theme: Option<String>,
}

impl Default for HighlightCache {
    fn default() -> Self {
        Self::new(shared_highlighter())
    }
}

impl HighlightCache {
    /// A cache running up to one worker per core, between 2 and `MAX_WORKERS`.
    pub fn new(highlighter: Arc<dyn Highlighter>) -> Self {
        let cores = thread::available_parallelism().map_or(2, |n| n.get());
        Self::with_workers(highlighter, cores.clamp(2, MAX_WORKERS))
    }

    /// A cache running at most `max_workers` worker threads (1 to
    /// `MAX_WORKERS`).
    pub fn with_workers(highlighter: Arc<dyn Highlighter>, max_workers: usize) -> Self {
        let languages = highlighter
            .supported_languages()
            .into_iter()
            .map(|lang| lang.to_lowercase())
            .collect();
        let (sender, receiver) = channel();
        let (jobs, job_queue) = channel();
        Self {
            highlighter,
            languages,
            resolved: HashMap::new(),
            in_flight: HashSet::new(),
            sender,
            receiver,
            jobs,
            job_queue: Arc::new(Mutex::new(job_queue)),
            workers: 0,
            max_workers: max_workers.clamp(1, MAX_WORKERS),
            active_theme: None,
        }
    }

    /// The highlighter's identifier for a document language tag.
    ///
    /// Matching is case-insensitive. Absent or unknown tags yield `None`.
    pub fn resolve_language(&self, tag: Option<&str>) -> Option<String> {
        let lower = tag?.trim().to_lowercase();
        if lower.is_empty() {
            return None;
        }
        self.languages.contains(&lower).then_some(lower)
    }

    /// Resolved output for a key, if any.
    pub fn lookup(&self, key: &HighlightKey) -> Option<&StyledText> {
        self.resolved.get(key)
    }

    /// Ask for the highlighted form of `key`.
    ///
    /// Returns the cached output when present. Unsupported languages resolve
    /// immediately to plain monospace text. Otherwise the key is queued for
    /// the workers (unless it already is) and the plain text is returned as a
    /// stand-in. If no worker thread can be started the key is highlighted on
    /// the calling thread.
    pub fn request(&mut self, key: &HighlightKey) -> HighlightState {
        if let Some(styled) = self.resolved.get(key) {
            return HighlightState::Ready(styled.clone());
        }

        let Some(language) = self.resolve_language(key.language.as_deref()) else {
            let plain = StyledText::plain_monospace(&key.code);
            self.resolved.insert(key.clone(), plain.clone());
            return HighlightState::Ready(plain);
        };

        let fallback = StyledText::plain_monospace(&key.code);
        if self.in_flight.contains(key) {
            return HighlightState::Pending(fallback);
        }

        // Grow the pool while queued work outnumbers the workers
        if self.workers < self.max_workers && self.in_flight.len() >= self.workers {
            self.spawn_worker();
        }
        if self.workers == 0 {
            return HighlightState::Ready(self.highlight_now(key));
        }

        let job = HighlightJob {
            key: key.clone(),
            language,
        };
        if self.jobs.send(job).is_err() {
            warn!("Highlight queue closed, highlighting inline");
            return HighlightState::Ready(self.highlight_now(key));
        }

        debug!(
            "Highlight queued for {:?} ({} bytes)",
            key.language,
            key.code.len()
        );
        self.in_flight.insert(key.clone());
        HighlightState::Pending(fallback)
    }

    fn spawn_worker(&mut self) {
        let highlighter = Arc::clone(&self.highlighter);
        let jobs = Arc::clone(&self.job_queue);
        let results = self.sender.clone();
        let spawned = thread::Builder::new()
            .name(format!("markview-highlight-{}", self.workers))
            .spawn(move || run_worker(highlighter.as_ref(), &jobs, &results));

        match spawned {
            Ok(_) => {
                self.workers += 1;
                debug!("Started highlight worker {}/{}", self.workers, self.max_workers);
            }
            Err(e) => warn!("Failed to start highlight worker: {}", e),
        }
    }

    /// Number of worker threads started so far.
    pub fn worker_count(&self) -> usize {
        self.workers
    }

    /// Highlight `key` on the calling thread and cache the result.
    pub fn highlight_now(&mut self, key: &HighlightKey) -> StyledText {
        if let Some(styled) = self.resolved.get(key) {
            return styled.clone();
        }
        let styled = match self.resolve_language(key.language.as_deref()) {
            Some(language) => compute(self.highlighter.as_ref(), key, &language),
            None => StyledText::plain_monospace(&key.code),
        };
        self.resolved.insert(key.clone(), styled.clone());
        styled
    }

    /// Drain finished work into the cache and return it.
    ///
    /// Non-blocking.
    pub fn poll(&mut self) -> Vec<HighlightResult> {
        let mut results = Vec::new();
        while let Ok(result) = self.receiver.try_recv() {
            self.store(&result);
            results.push(result);
        }
        results
    }

    /// Block until nothing is in flight or `timeout` elapses.
    pub fn wait(&mut self, timeout: Duration) -> Vec<HighlightResult> {
        let deadline = Instant::now() + timeout;
        let mut results = Vec::new();
        while !self.in_flight.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.receiver.recv_timeout(remaining) {
                Ok(result) => {
                    self.store(&result);
                    results.push(result);
                }
                Err(RecvTimeoutError::Timeout) => {
                    warn!(
                        "Timed out with {} highlight(s) still running",
                        self.in_flight.len()
                    );
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        results
    }

    fn store(&mut self, result: &HighlightResult) {
        self.in_flight.remove(&result.key);
        self.resolved
            .insert(result.key.clone(), result.styled.clone());
    }

    /// Switch the highlighter's theme.
    ///
    /// Keys already carry their theme, so no entry is evicted.
    pub fn set_theme(&mut self, theme: &str) {
        if self.active_theme.as_deref() == Some(theme) {
            return;
        }
        debug!("Highlight theme set to {}", theme);
        self.highlighter.set_theme(theme);
        self.active_theme = Some(theme.to_string());
    }

    pub fn active_theme(&self) -> Option<&str> {
        self.active_theme.as_deref()
    }

    /// Theme names known to the highlighter.
    pub fn available_themes(&self) -> Vec<String> {
        self.highlighter.available_themes()
    }

    /// Drop every resolved entry. Work in flight still lands when it finishes.
    pub fn clear(&mut self) {
        self.resolved.clear();
    }

    /// Number of requests still being computed.
    pub fn pending_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Number of resolved entries.
    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }
}

/// Take jobs until the cache hangs up.
fn run_worker(
    highlighter: &dyn Highlighter,
    jobs: &Mutex<Receiver<HighlightJob>>,
    results: &Sender<HighlightResult>,
) {
    loop {
        // The lock is held only while waiting for the next job
        let job = match jobs.lock() {
            Ok(queue) => queue.recv(),
            Err(poisoned) => poisoned.into_inner().recv(),
        };
        let Ok(job) = job else {
            break;
        };
        let styled = compute(highlighter, &job.key, &job.language);
        let result = HighlightResult {
            key: job.key,
            styled,
        };
        if results.send(result).is_err() {
            break;
        }
    }
}

/// Highlight with an already-resolved language, degrading to plain text.
fn compute(highlighter: &dyn Highlighter, key: &HighlightKey, language: &str) -> StyledText {
    highlighter
        .highlight(&key.code, language, &key.theme)
        .unwrap_or_else(|| StyledText::plain_monospace(&key.code))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::render_node::{RunStyle, TextRun};
    use egui::Color32;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Condvar, Mutex};

    /// Uppercases code and tints it per theme; counts calls.
    #[derive(Default)]
    struct FakeHighlighter {
        calls: AtomicUsize,
        theme: Mutex<String>,
    }

    impl Highlighter for FakeHighlighter {
        fn supported_languages(&self) -> Vec<String> {
            vec!["Rust".to_string(), "python".to_string()]
        }

        fn highlight(&self, code: &str, _language: &str, theme: &str) -> Option<StyledText> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let color = if theme == "dark" {
                Color32::WHITE
            } else {
                Color32::BLACK
            };
            Some(StyledText::new(vec![TextRun::new(
                code.to_uppercase(),
                RunStyle::monospace().with_foreground(color),
            )]))
        }

        fn set_theme(&self, theme: &str) {
            *self.theme.lock().unwrap() = theme.to_string();
        }
    }

    /// Blocks every highlight until released.
    struct GatedHighlighter {
        gate: Arc<(Mutex<bool>, Condvar)>,
    }

    impl Highlighter for GatedHighlighter {
        fn supported_languages(&self) -> Vec<String> {
            vec!["rust".to_string()]
        }

        fn highlight(&self, code: &str, _language: &str, _theme: &str) -> Option<StyledText> {
            let (lock, cvar) = &*self.gate;
            let mut open = lock.lock().unwrap();
            while !*open {
                open = cvar.wait(open).unwrap();
            }
            Some(StyledText::new(vec![TextRun::new(code, RunStyle::default().with_bold())]))
        }

        fn set_theme(&self, _theme: &str) {}
    }

    fn key(language: Option<&str>, code: &str, mode: ColorMode) -> HighlightKey {
        let theme = if mode.is_dark() { "dark" } else { "light" };
        HighlightKey::new(language, code, theme, mode)
    }

    #[test]
    fn test_resolve_language_case_insensitive() {
        let cache = HighlightCache::new(Arc::new(FakeHighlighter::default()));
        assert_eq!(cache.resolve_language(Some("RUST")).as_deref(), Some("rust"));
        assert_eq!(cache.resolve_language(Some("Python")).as_deref(), Some("python"));
        assert_eq!(cache.resolve_language(Some("not-a-real-language")), None);
        assert_eq!(cache.resolve_language(Some("")), None);
        assert_eq!(cache.resolve_language(None), None);
    }

    #[test]
    fn test_unsupported_language_is_plain_and_ready() {
        let fake = Arc::new(FakeHighlighter::default());
        let mut cache = HighlightCache::new(fake.clone());
        let k = key(Some("not-a-real-language"), "some code", ColorMode::Light);

        let state = cache.request(&k);
        assert!(state.is_ready());
        assert_eq!(state.styled().plain_text(), "some code");
        assert_eq!(fake.calls.load(Ordering::SeqCst), 0);
        assert_eq!(cache.pending_count(), 0);
    }

    #[test]
    fn test_request_then_poll_resolves() {
        let mut cache = HighlightCache::new(Arc::new(FakeHighlighter::default()));
        let k = key(Some("rust"), "fn x()", ColorMode::Light);

        let state = cache.request(&k);
        assert!(!state.is_ready());
        assert_eq!(state.styled().plain_text(), "fn x()");

        let results = cache.wait(Duration::from_secs(5));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].key, k);
        assert_eq!(cache.lookup(&k).unwrap().plain_text(), "FN X()");
        assert!(cache.request(&k).is_ready());
    }

    #[test]
    fn test_identical_key_is_stable() {
        let fake = Arc::new(FakeHighlighter::default());
        let mut cache = HighlightCache::new(fake.clone());
        let k = key(Some("rust"), "let a = 1;", ColorMode::Dark);

        let first = cache.highlight_now(&k);
        let second = cache.highlight_now(&k);
        assert_eq!(first, second);
        assert_eq!(fake.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_color_mode_changes_key_and_output() {
        let mut cache = HighlightCache::new(Arc::new(FakeHighlighter::default()));
        let light = key(Some("rust"), "let a = 1;", ColorMode::Light);
        let dark = key(Some("rust"), "let a = 1;", ColorMode::Dark);
        assert_ne!(light, dark);

        let light_out = cache.highlight_now(&light);
        let dark_out = cache.highlight_now(&dark);
        assert_eq!(light_out.plain_text(), dark_out.plain_text());
        assert_ne!(light_out, dark_out);
    }

    #[test]
    fn test_one_in_flight_per_key() {
        let gate = Arc::new((Mutex::new(false), Condvar::new()));
        let mut cache = HighlightCache::new(Arc::new(GatedHighlighter { gate: gate.clone() }));
        let k = key(Some("rust"), "x", ColorMode::Light);

        assert!(!cache.request(&k).is_ready());
        assert!(!cache.request(&k).is_ready());
        assert_eq!(cache.pending_count(), 1);

        {
            let (lock, cvar) = &*gate;
            *lock.lock().unwrap() = true;
            cvar.notify_all();
        }

        let results = cache.wait(Duration::from_secs(5));
        assert_eq!(results.len(), 1);
        assert_eq!(cache.pending_count(), 0);
    }

    #[test]
    fn test_worker_count_is_bounded() {
        let gate = Arc::new((Mutex::new(false), Condvar::new()));
        let mut cache =
            HighlightCache::with_workers(Arc::new(GatedHighlighter { gate: gate.clone() }), 2);

        for i in 0..40 {
            let k = key(Some("rust"), &format!("let v{} = {};", i, i), ColorMode::Light);
            assert!(!cache.request(&k).is_ready());
        }
        assert_eq!(cache.pending_count(), 40);
        assert_eq!(cache.worker_count(), 2);

        {
            let (lock, cvar) = &*gate;
            *lock.lock().unwrap() = true;
            cvar.notify_all();
        }

        let results = cache.wait(Duration::from_secs(10));
        assert_eq!(results.len(), 40);
        assert_eq!(cache.pending_count(), 0);
        assert_eq!(cache.len(), 40);
        assert_eq!(cache.worker_count(), 2);
    }

    #[test]
    fn test_default_pool_size() {
        let mut cache = HighlightCache::new(Arc::new(FakeHighlighter::default()));
        for i in 0..100 {
            cache.request(&key(Some("rust"), &i.to_string(), ColorMode::Dark));
        }
        cache.wait(Duration::from_secs(10));
        assert_eq!(cache.len(), 100);
        assert!(cache.worker_count() >= 1);
        assert!(cache.worker_count() <= MAX_WORKERS);
    }

    #[test]
    fn test_set_theme_reaches_highlighter() {
        let fake = Arc::new(FakeHighlighter::default());
        let mut cache = HighlightCache::new(fake.clone());
        cache.set_theme("Solarized (dark)");
        assert_eq!(cache.active_theme(), Some("Solarized (dark)"));
        assert_eq!(*fake.theme.lock().unwrap(), "Solarized (dark)");
    }

    #[test]
    fn test_clear_drops_entries() {
        let mut cache = HighlightCache::new(Arc::new(FakeHighlighter::default()));
        cache.highlight_now(&key(Some("rust"), "a", ColorMode::Light));
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_syntect_backed_cache_degrades_unknown_language() {
        let mut cache = HighlightCache::default();
        let k = HighlightKey::new(
            Some("not-a-real-language"),
            "plain words",
            "InspiredGitHub",
            ColorMode::Light,
        );
        let styled = cache.highlight_now(&k);
        assert_eq!(styled, StyledText::plain_monospace("plain words"));
    }
}
