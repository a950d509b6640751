//! Dual-theme code highlighting using syntect.
//!
//! A [`Highlighter`] loads the syntax definitions and both themes once and is
//! read-only afterwards, so one instance can be shared through an `Arc` by
//! every rendering thread.

use super::html_escape;
use serde::{Deserialize, Serialize};
use std::path::Path;
use syntect::easy::HighlightLines;
use syntect::highlighting::{Color, Style, Theme, ThemeSet};
use syntect::html::{styled_line_to_highlighted_html, IncludeBackground};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;
use thiserror::Error;

pub const DEFAULT_DARK_THEME: &str = "base16-ocean.dark";
pub const DEFAULT_LIGHT_THEME: &str = "InspiredGitHub";
pub const DEFAULT_LANG_PREFIX: &str = "language-";

#[derive(Error, Debug)]
pub enum HighlightError {
    #[error("unknown theme `{name}` (available: {available})")]
    UnknownTheme { name: String, available: String },

    #[error("failed to load theme file {path}: {source}")]
    ThemeFile {
        path: String,
        #[source]
        source: syntect::LoadingError,
    },
}

/// Theme names for the two variants. A value ending in `.tmTheme` is read
/// from disk, anything else is looked up in syntect's bundled themes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HighlightConfig {
    #[serde(default = "default_dark")]
    pub dark: String,

    #[serde(default = "default_light")]
    pub light: String,
}

fn default_dark() -> String {
    DEFAULT_DARK_THEME.to_string()
}

fn default_light() -> String {
    DEFAULT_LIGHT_THEME.to_string()
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            dark: default_dark(),
            light: default_light(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeVariant {
    Dark,
    Light,
}

impl ThemeVariant {
    pub fn css_class(self) -> &'static str {
        match self {
            ThemeVariant::Dark => "highlight-dark",
            ThemeVariant::Light => "highlight-light",
        }
    }
}

/// One themed rendering of a code block, kept line by line so decorators
/// can wrap individual lines before the block is assembled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightedCode {
    pub variant: ThemeVariant,
    pub theme: String,
    pub background: Option<String>,
    pub foreground: Option<String>,
    pub lang: String,
    /// One `<span class="line">` per source line.
    pub lines: Vec<String>,
}

impl HighlightedCode {
    /// Assemble the `<pre><code>` fragment around the given line bodies.
    pub fn render(&self, lines: &[String], lang_prefix: &str) -> String {
        let mut style = String::new();
        if let Some(bg) = &self.background {
            style.push_str(&format!("background-color:{bg};"));
        }
        if let Some(fg) = &self.foreground {
            style.push_str(&format!("color:{fg};"));
        }

        let mut html = format!(
            "<pre class=\"highlight {}\" data-theme=\"{}\"",
            self.variant.css_class(),
            html_escape(&self.theme)
        );
        if !style.is_empty() {
            html.push_str(&format!(" style=\"{style}\""));
        }
        html.push_str("><code");
        if !self.lang.is_empty() {
            html.push_str(&format!(
                " class=\"{}{}\"",
                html_escape(lang_prefix),
                html_escape(&self.lang)
            ));
        }
        html.push('>');
        html.push_str(&lines.join("\n"));
        html.push_str("</code></pre>\n");
        html
    }

    pub fn to_html(&self) -> String {
        self.render(&self.lines, DEFAULT_LANG_PREFIX)
    }
}

/// Both themed renderings of the same code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DualHighlight {
    pub dark: HighlightedCode,
    pub light: HighlightedCode,
}

impl DualHighlight {
    pub fn to_html(&self) -> (String, String) {
        (self.dark.to_html(), self.light.to_html())
    }

    pub fn variants(&self) -> [&HighlightedCode; 2] {
        [&self.dark, &self.light]
    }
}

pub struct Highlighter {
    syntaxes: SyntaxSet,
    dark: NamedTheme,
    light: NamedTheme,
}

struct NamedTheme {
    name: String,
    theme: Theme,
}

impl Highlighter {
    /// Load syntect's bundled grammars and resolve both themes.
    pub fn new(config: &HighlightConfig) -> Result<Self, HighlightError> {
        let theme_set = ThemeSet::load_defaults();
        let dark = resolve_theme(&theme_set, &config.dark)?;
        let light = resolve_theme(&theme_set, &config.light)?;

        tracing::debug!("Highlighter ready (dark: {}, light: {})", dark.name, light.name);

        Ok(Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
            dark,
            light,
        })
    }

    pub fn dark_theme(&self) -> &str {
        &self.dark.name
    }

    pub fn light_theme(&self) -> &str {
        &self.light.name
    }

    /// Highlight `code` with both themes.
    ///
    /// Unknown or empty language tags fall back to plain text with the same
    /// structure, so theme CSS still applies.
    pub fn highlight(&self, code: &str, lang: &str) -> DualHighlight {
        let syntax = self.find_syntax(lang);
        DualHighlight {
            dark: self.highlight_with(code, lang, syntax, ThemeVariant::Dark),
            light: self.highlight_with(code, lang, syntax, ThemeVariant::Light),
        }
    }

    pub fn supports_language(&self, lang: &str) -> bool {
        self.lookup_syntax(lang).is_some()
    }

    fn lookup_syntax(&self, lang: &str) -> Option<&SyntaxReference> {
        if lang.is_empty() {
            return None;
        }
        self.syntaxes
            .find_syntax_by_token(lang)
            .or_else(|| self.syntaxes.find_syntax_by_extension(lang))
    }

    fn find_syntax(&self, lang: &str) -> &SyntaxReference {
        self.lookup_syntax(lang)
            .unwrap_or_else(|| self.syntaxes.find_syntax_plain_text())
    }

    fn highlight_with(
        &self,
        code: &str,
        lang: &str,
        syntax: &SyntaxReference,
        variant: ThemeVariant,
    ) -> HighlightedCode {
        let named = match variant {
            ThemeVariant::Dark => &self.dark,
            ThemeVariant::Light => &self.light,
        };

        let lines = match self.styled_lines(code, syntax, &named.theme) {
            Ok(lines) => lines,
            Err(err) => {
                tracing::warn!("Highlighting {} failed, using plain text: {}", lang, err);
                plain_lines(code)
            }
        };

        HighlightedCode {
            variant,
            theme: named.name.clone(),
            background: named.theme.settings.background.map(css_color),
            foreground: named.theme.settings.foreground.map(css_color),
            lang: lang.to_string(),
            lines,
        }
    }

    fn styled_lines(
        &self,
        code: &str,
        syntax: &SyntaxReference,
        theme: &Theme,
    ) -> Result<Vec<String>, syntect::Error> {
        let mut highlighter = HighlightLines::new(syntax, theme);
        let mut lines = Vec::new();

        for line in LinesWithEndings::from(code) {
            let regions = highlighter.highlight_line(line, &self.syntaxes)?;
            // Line endings stay out of the per-line spans.
            let regions: Vec<(Style, &str)> = regions
                .into_iter()
                .map(|(style, text)| (style, text.trim_end_matches(|c: char| c == '\n' || c == '\r')))
                .filter(|(_, text)| !text.is_empty())
                .collect();
            let html = styled_line_to_highlighted_html(&regions, IncludeBackground::No)?;
            lines.push(format!("<span class=\"line\">{html}</span>"));
        }

        if lines.is_empty() {
            lines.push("<span class=\"line\"></span>".to_string());
        }
        Ok(lines)
    }
}

impl Default for Highlighter {
    /// Bundled default themes; falls back to an empty theme if syntect ever
    /// stops shipping one of them.
    fn default() -> Self {
        let theme_set = ThemeSet::load_defaults();
        let named = |name: &str| NamedTheme {
            name: name.to_string(),
            theme: theme_set.themes.get(name).cloned().unwrap_or_default(),
        };
        Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
            dark: named(DEFAULT_DARK_THEME),
            light: named(DEFAULT_LIGHT_THEME),
        }
    }
}

fn resolve_theme(theme_set: &ThemeSet, name: &str) -> Result<NamedTheme, HighlightError> {
    if name.ends_with(".tmTheme") {
        let theme = ThemeSet::get_theme(Path::new(name)).map_err(|source| HighlightError::ThemeFile {
            path: name.to_string(),
            source,
        })?;
        let display = Path::new(name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(name)
            .to_string();
        return Ok(NamedTheme { name: display, theme });
    }

    match theme_set.themes.get(name) {
        Some(theme) => Ok(NamedTheme {
            name: name.to_string(),
            theme: theme.clone(),
        }),
        None => Err(HighlightError::UnknownTheme {
            name: name.to_string(),
            available: available_themes().join(", "),
        }),
    }
}

/// Names of syntect's bundled themes, sorted.
pub fn available_themes() -> Vec<String> {
    ThemeSet::load_defaults().themes.keys().cloned().collect()
}

/// Bundled syntax names with their file extensions.
pub fn available_languages() -> Vec<(String, Vec<String>)> {
    let mut langs: Vec<(String, Vec<String>)> = SyntaxSet::load_defaults_newlines()
        .syntaxes()
        .iter()
        .map(|s| (s.name.clone(), s.file_extensions.clone()))
        .collect();
    langs.sort();
    langs
}

fn plain_lines(code: &str) -> Vec<String> {
    let mut lines: Vec<String> = code
        .lines()
        .map(|line| format!("<span class=\"line\">{}</span>", html_escape(line)))
        .collect();
    if lines.is_empty() {
        lines.push("<span class=\"line\"></span>".to_string());
    }
    lines
}

fn css_color(color: Color) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
}
