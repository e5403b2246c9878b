//! Layout configuration for the Markdown renderer
//!
//! `LayoutConfig` is the immutable settings value the render visitor reads:
//! spacing, list indentation, the bullet glyph, font sizes, tints, and the
//! highlight theme names for light and dark mode. It round-trips through JSON
//! so hosts can persist it.

use crate::markdown::render_node::FontRole;
use egui::{Color32, FontFamily, FontId};
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Color Mode
// ─────────────────────────────────────────────────────────────────────────────

/// Light or dark appearance. Part of every highlight key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Light,
    Dark,
}

impl ColorMode {
    /// Toggle between Light and Dark.
    pub fn toggle(&self) -> Self {
        match self {
            ColorMode::Light => ColorMode::Dark,
            ColorMode::Dark => ColorMode::Light,
        }
    }

    /// Get a display label for the mode.
    pub fn label(&self) -> &'static str {
        match self {
            ColorMode::Light => "light",
            ColorMode::Dark => "dark",
        }
    }

    pub fn is_dark(&self) -> bool {
        matches!(self, ColorMode::Dark)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Code Highlighter Theme
// ─────────────────────────────────────────────────────────────────────────────

/// Default highlight theme for light mode (bundled with syntect)
pub const DEFAULT_LIGHT_THEME: &str = "InspiredGitHub";

/// Default highlight theme for dark mode (bundled with syntect)
pub const DEFAULT_DARK_THEME: &str = "base16-ocean.dark";

/// A pair of highlight theme names, one per color mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeHighlighterTheme {
    /// Theme name used in light mode
    pub light: String,
    /// Theme name used in dark mode
    pub dark: String,
}

impl Default for CodeHighlighterTheme {
    fn default() -> Self {
        Self::new(DEFAULT_LIGHT_THEME, DEFAULT_DARK_THEME)
    }
}

impl CodeHighlighterTheme {
    /// Create a theme pair that adapts to light and dark mode.
    pub fn new(light: impl Into<String>, dark: impl Into<String>) -> Self {
        Self {
            light: light.into(),
            dark: dark.into(),
        }
    }

    /// Use one theme for both modes.
    ///
    /// Check the code stays readable against both backgrounds first.
    pub fn single(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            light: name.clone(),
            dark: name,
        }
    }

    /// The theme name for the given mode.
    pub fn theme_for(&self, mode: ColorMode) -> &str {
        match mode {
            ColorMode::Light => &self.light,
            ColorMode::Dark => &self.dark,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Font Group
// ─────────────────────────────────────────────────────────────────────────────

/// Font sizes for each text role.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontGroup {
    /// Body text size in points
    pub body_size: f32,
    /// Code block and inline code size in points
    pub code_size: f32,
    /// Multipliers of `body_size` for H1 through H6
    pub heading_scales: [f32; 6],
}

impl Default for FontGroup {
    fn default() -> Self {
        Self {
            body_size: 14.0,
            code_size: 13.0,
            heading_scales: [2.0, 1.6, 1.35, 1.15, 1.0, 0.9],
        }
    }
}

impl FontGroup {
    /// Point size for a text role.
    pub fn size_for(&self, role: FontRole) -> f32 {
        match role {
            FontRole::Body => self.body_size,
            FontRole::Monospace => self.code_size,
            FontRole::Heading(level) => {
                let index = (level.clamp(1, 6) - 1) as usize;
                self.body_size * self.heading_scales[index]
            }
        }
    }

    /// egui font for a text role.
    pub fn font_id(&self, role: FontRole) -> FontId {
        let family = match role {
            FontRole::Monospace => FontFamily::Monospace,
            FontRole::Body | FontRole::Heading(_) => FontFamily::Proportional,
        };
        FontId::new(self.size_for(role), family)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Layout Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Settings read by the render visitor. Read-only for a render pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Vertical gap between sibling blocks
    pub component_spacing: f32,
    /// Leading indent applied at the outermost list boundary
    pub list_indent: f32,
    /// Glyph drawn in front of unordered list items
    pub unordered_list_bullet: String,
    /// Font sizes
    pub font_group: FontGroup,
    /// Foreground tint for inline code (background is the same tint at 10%)
    pub inline_code_tint: Color32,
    /// Link text color
    pub link_tint: Color32,
    /// Checked checkbox color
    pub checkbox_checked_tint: Color32,
    /// Unchecked checkbox color
    pub checkbox_unchecked_tint: Color32,
    /// Block quote bar and text color
    pub quote_tint: Color32,
    /// Highlight themes per color mode
    pub code_theme: CodeHighlighterTheme,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            component_spacing: 8.0,
            list_indent: 12.0,
            unordered_list_bullet: DEFAULT_BULLET.to_string(),
            font_group: FontGroup::default(),
            inline_code_tint: Color32::from_rgb(220, 50, 100),
            link_tint: Color32::from_rgb(0, 100, 200),
            checkbox_checked_tint: Color32::from_rgb(0, 122, 255),
            checkbox_unchecked_tint: Color32::from_rgb(142, 142, 147),
            quote_tint: Color32::from_rgb(128, 128, 128),
            code_theme: CodeHighlighterTheme::default(),
        }
    }
}

/// Bullet used when the configured one is empty.
pub const DEFAULT_BULLET: &str = "\u{2022}";

impl LayoutConfig {
    /// Maximum component spacing.
    pub const MAX_SPACING: f32 = 64.0;
    /// Maximum list indent.
    pub const MAX_LIST_INDENT: f32 = 128.0;
    /// Minimum allowed font size.
    pub const MIN_FONT_SIZE: f32 = 6.0;
    /// Maximum allowed font size.
    pub const MAX_FONT_SIZE: f32 = 72.0;

    /// Clamp values to valid ranges.
    ///
    /// Useful after loading a file that might have been edited by hand.
    pub fn sanitize(&mut self) {
        self.component_spacing = clamp_finite(self.component_spacing, 0.0, Self::MAX_SPACING);
        self.list_indent = clamp_finite(self.list_indent, 0.0, Self::MAX_LIST_INDENT);

        let fonts = &mut self.font_group;
        fonts.body_size = clamp_finite(fonts.body_size, Self::MIN_FONT_SIZE, Self::MAX_FONT_SIZE);
        fonts.code_size = clamp_finite(fonts.code_size, Self::MIN_FONT_SIZE, Self::MAX_FONT_SIZE);
        for scale in fonts.heading_scales.iter_mut() {
            *scale = clamp_finite(*scale, 0.5, 4.0);
        }

        if self.unordered_list_bullet.trim().is_empty() {
            self.unordered_list_bullet = DEFAULT_BULLET.to_string();
        }
        if self.code_theme.light.is_empty() {
            self.code_theme.light = DEFAULT_LIGHT_THEME.to_string();
        }
        if self.code_theme.dark.is_empty() {
            self.code_theme.dark = DEFAULT_DARK_THEME.to_string();
        }
    }

    /// Deserialize and then sanitize.
    pub fn from_json_sanitized(json: &str) -> Result<Self, serde_json::Error> {
        let mut config: Self = serde_json::from_str(json)?;
        config.sanitize();
        Ok(config)
    }
}

/// Clamp, mapping NaN to the lower bound.
fn clamp_finite(value: f32, min: f32, max: f32) -> f32 {
    if value.is_nan() {
        min
    } else {
        value.clamp(min, max)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
