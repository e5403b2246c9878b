//! Syntax highlighting collaborator
//!
//! `Highlighter` is the seam between the highlight cache and whatever engine
//! styles code. `SyntectHighlighter` is the bundled implementation: it loads
//! syntect's default syntaxes and themes once and turns highlighted ranges into
//! `StyledText` runs.

use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock, RwLock};

use egui::Color32;
use log::{debug, warn};
use syntect::easy::HighlightLines;
use syntect::highlighting::{FontStyle, Style, Theme, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

use crate::config::DEFAULT_LIGHT_THEME;
use crate::markdown::render_node::{RunStyle, StyledText, TextRun};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Fallback theme if the specified theme is not found
pub const FALLBACK_THEME: &str = "base16-ocean.dark";

/// Common language aliases and the syntect extension they map to.
const LANGUAGE_ALIASES: &[(&str, &str)] = &[
    ("rust", "rs"),
    ("python", "py"),
    ("javascript", "js"),
    ("typescript", "ts"),
    ("c++", "cpp"),
    ("cxx", "cpp"),
    ("csharp", "cs"),
    ("c#", "cs"),
    ("kotlin", "kt"),
    ("golang", "go"),
    ("ruby", "rb"),
    ("htm", "html"),
    ("yml", "yaml"),
    ("markdown", "md"),
    ("shell", "sh"),
    ("bash", "sh"),
    ("zsh", "sh"),
    ("powershell", "ps1"),
    ("dockerfile", "Dockerfile"),
    ("docker", "Dockerfile"),
    ("makefile", "Makefile"),
    ("make", "Makefile"),
    ("perl", "pl"),
    ("haskell", "hs"),
    ("elixir", "ex"),
    ("erlang", "erl"),
    ("clojure", "clj"),
    ("patch", "diff"),
    ("cfg", "ini"),
];

// ─────────────────────────────────────────────────────────────────────────────
// Highlighter Trait
// ─────────────────────────────────────────────────────────────────────────────

/// A syntax highlighting engine.
///
/// Implementations are shared across highlight worker threads.
pub trait Highlighter: Send + Sync {
    /// Language identifiers this highlighter accepts.
    fn supported_languages(&self) -> Vec<String>;

    /// Highlight `code` as `language` with the named theme.
    ///
    /// `None` means the language is not recognized.
    fn highlight(&self, code: &str, language: &str, theme: &str) -> Option<StyledText>;

    /// Set the theme used when a requested theme is unknown.
    fn set_theme(&self, theme: &str);

    /// Names of the themes this highlighter knows.
    fn available_themes(&self) -> Vec<String> {
        Vec::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Syntect Highlighter
// ─────────────────────────────────────────────────────────────────────────────

/// Highlighter backed by syntect's bundled syntax and theme sets.
pub struct SyntectHighlighter {
    /// Loaded syntax definitions
    syntax_set: SyntaxSet,
    /// Loaded color themes
    theme_set: ThemeSet,
    /// Theme used when a key names a theme that is not loaded
    active_theme: RwLock<String>,
}

impl Default for SyntectHighlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntectHighlighter {
    /// Load the default syntaxes and themes bundled with syntect.
    ///
    /// This is relatively expensive; prefer `shared_highlighter()`.
    pub fn new() -> Self {
        debug!("Loading syntect syntax and theme sets");
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let theme_set = ThemeSet::load_defaults();
        debug!(
            "Loaded {} syntaxes and {} themes",
            syntax_set.syntaxes().len(),
            theme_set.themes.len()
        );
        Self {
            syntax_set,
            theme_set,
            active_theme: RwLock::new(DEFAULT_LIGHT_THEME.to_string()),
        }
    }

    /// Get a theme by name, falling back to the active theme, then to the
    /// fallback theme.
    fn get_theme(&self, name: &str) -> Option<&Theme> {
        if let Some(theme) = self.theme_set.themes.get(name) {
            return Some(theme);
        }
        let active = self
            .active_theme
            .read()
            .map(|name| name.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone());
        self.theme_set
            .themes
            .get(&active)
            .or_else(|| self.theme_set.themes.get(FALLBACK_THEME))
            .or_else(|| self.theme_set.themes.values().next())
    }

    /// Find syntax definition for a language identifier.
    ///
    /// Tries the alias table and extensions first, then names, both
    /// case-insensitively.
    fn find_syntax(&self, language: &str) -> Option<&SyntaxReference> {
        if language.is_empty() {
            return None;
        }
        let lang_lower = language.to_lowercase();

        let extension = LANGUAGE_ALIASES
            .iter()
            .find(|(alias, _)| *alias == lang_lower)
            .map(|(_, ext)| *ext)
            .unwrap_or(lang_lower.as_str());

        if let Some(syntax) = self.syntax_set.find_syntax_by_extension(extension) {
            return Some(syntax);
        }
        if let Some(syntax) = self.syntax_set.find_syntax_by_name(language) {
            return Some(syntax);
        }
        self.syntax_set
            .syntaxes()
            .iter()
            .find(|syntax| syntax.name.to_lowercase() == lang_lower)
    }
}

impl Highlighter for SyntectHighlighter {
    fn supported_languages(&self) -> Vec<String> {
        let mut languages = BTreeSet::new();
        for syntax in self.syntax_set.syntaxes() {
            languages.insert(syntax.name.to_lowercase());
            for ext in &syntax.file_extensions {
                languages.insert(ext.to_lowercase());
            }
        }
        for (alias, _) in LANGUAGE_ALIASES {
            if self.find_syntax(alias).is_some() {
                languages.insert(alias.to_string());
            }
        }
        languages.into_iter().collect()
    }

    fn highlight(&self, code: &str, language: &str, theme: &str) -> Option<StyledText> {
        let syntax = match self.find_syntax(language) {
            Some(syntax) => syntax,
            None => {
                debug!("No syntax found for language: {}", language);
                return None;
            }
        };
        let theme = self.get_theme(theme)?;
        let default_color = theme.settings.foreground.map(syntect_to_egui_color);

        let mut highlighter = HighlightLines::new(syntax, theme);
        let mut styled = StyledText::default();

        for line in LinesWithEndings::from(code) {
            match highlighter.highlight_line(line, &self.syntax_set) {
                Ok(ranges) => {
                    for (style, text) in ranges {
                        styled.push(style_to_run(style, text));
                    }
                }
                Err(e) => {
                    warn!("Failed to highlight line: {}", e);
                    let mut run_style = RunStyle::monospace();
                    run_style.foreground = default_color;
                    styled.push(TextRun::new(line, run_style));
                }
            }
        }

        Some(styled)
    }

    fn set_theme(&self, theme: &str) {
        match self.active_theme.write() {
            Ok(mut active) => *active = theme.to_string(),
            Err(poisoned) => *poisoned.into_inner() = theme.to_string(),
        }
    }

    fn available_themes(&self) -> Vec<String> {
        self.theme_set.themes.keys().cloned().collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helper Functions
// ─────────────────────────────────────────────────────────────────────────────

/// Convert syntect Color to egui Color32.
pub fn syntect_to_egui_color(color: syntect::highlighting::Color) -> Color32 {
    Color32::from_rgba_unmultiplied(color.r, color.g, color.b, color.a)
}

/// Convert a syntect style and its text to a monospace run.
fn style_to_run(style: Style, text: &str) -> TextRun {
    let mut run_style = RunStyle::monospace().with_foreground(syntect_to_egui_color(style.foreground));
    run_style.bold = style.font_style.contains(FontStyle::BOLD);
    run_style.italic = style.font_style.contains(FontStyle::ITALIC);
    run_style.underline = style.font_style.contains(FontStyle::UNDERLINE);
    TextRun::new(text, run_style)
}

// ─────────────────────────────────────────────────────────────────────────────
// Global Highlighter Instance
// ─────────────────────────────────────────────────────────────────────────────

/// Process-wide syntect highlighter, loaded on first access.
static HIGHLIGHTER: OnceLock<Arc<SyntectHighlighter>> = OnceLock::new();

/// Get or create the shared syntect highlighter.
pub fn shared_highlighter() -> Arc<SyntectHighlighter> {
    Arc::clone(HIGHLIGHTER.get_or_init(|| Arc::new(SyntectHighlighter::new())))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_themes() {
        let themes = shared_highlighter().available_themes();
        assert!(themes.iter().any(|t| t == "base16-ocean.dark"));
        assert!(themes.iter().any(|t| t == "InspiredGitHub"));
    }

    #[test]
    fn test_supported_languages_are_lowercase() {
        let languages = shared_highlighter().supported_languages();
        assert!(languages.iter().any(|l| l == "rust"));
        assert!(languages.iter().any(|l| l == "rs"));
        assert!(languages.iter().any(|l| l == "python"));
        assert!(languages.iter().all(|l| l.to_lowercase() == *l));
    }

    #[test]
    fn test_highlight_rust_code_keeps_text() {
        let code = "fn main() {\n    println!(\"Hello\");\n}";
        let styled = shared_highlighter()
            .highlight(code, "rust", "base16-ocean.dark")
            .expect("rust is supported");
        assert_eq!(styled.plain_text(), code);
        assert!(styled.runs.len() > 1);
        assert!(styled
            .runs
            .iter()
            .all(|r| r.style.font == crate::markdown::render_node::FontRole::Monospace));
    }

    #[test]
    fn test_highlight_unknown_language() {
        assert!(shared_highlighter()
            .highlight("text", "not-a-real-language", FALLBACK_THEME)
            .is_none());
    }

    #[test]
    fn test_unknown_theme_falls_back() {
        let styled = shared_highlighter().highlight("x = 1", "python", "no-such-theme");
        assert!(styled.is_some());
    }

    #[test]
    fn test_theme_changes_colors() {
        let highlighter = shared_highlighter();
        let code = "let answer = 42;";
        let light = highlighter.highlight(code, "rust", "InspiredGitHub").unwrap();
        let dark = highlighter.highlight(code, "rust", "base16-ocean.dark").unwrap();
        assert_ne!(light, dark);
    }

    #[test]
    fn test_language_aliases() {
        let highlighter = SyntectHighlighter::new();
        for (alias, canonical) in [("rs", "rust"), ("py", "python"), ("js", "javascript")] {
            let a = highlighter.find_syntax(alias).map(|s| s.name.clone());
            let b = highlighter.find_syntax(canonical).map(|s| s.name.clone());
            assert_eq!(a, b, "Alias {} should map to same syntax as {}", alias, canonical);
        }
    }

    #[test]
    fn test_find_syntax_is_case_insensitive() {
        let highlighter = SyntectHighlighter::new();
        assert!(highlighter.find_syntax("RUST").is_some());
        assert!(highlighter.find_syntax("Python").is_some());
        assert!(highlighter.find_syntax("").is_none());
    }

    #[test]
    fn test_syntect_to_egui_color() {
        let color = syntect_to_egui_color(syntect::highlighting::Color {
            r: 255,
            g: 128,
            b: 64,
            a: 255,
        });
        assert_eq!(color.r(), 255);
        assert_eq!(color.g(), 128);
        assert_eq!(color.b(), 64);
    }

    #[test]
    fn test_shared_highlighter_is_singleton() {
        let a = shared_highlighter();
        let b = shared_highlighter();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
