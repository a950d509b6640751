//! Markdown processing pipeline with pluggable syntax extensions.

pub mod extensions;
pub mod highlight;
pub mod linkify;
pub mod registry;
pub mod renderer;
pub mod token;
pub mod tokenizer;

#[cfg(test)]
mod test_integration;

use registry::{DocumentEnv, ExtensionError, ExtensionRegistry, HeadingAnchor, Hook, RegistryError};
use renderer::HtmlWriter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use token::{for_each_inline_run, Token};
use tokenizer::Tokenizer;

pub use highlight::{HighlightConfig, Highlighter};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("invalid markdown option `{option}`: {reason}")]
    InvalidOption { option: &'static str, reason: String },

    #[error(transparent)]
    Extension(#[from] ExtensionError),
}

/// Per-render markdown options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Pass raw HTML through; escaped otherwise.
    pub html: bool,
    /// Turn bare `http(s)://` and `www.` URLs into links.
    pub linkify: bool,
    /// Render single newlines inside paragraphs as `<br />`.
    pub breaks: bool,
    /// Smart quotes and dashes.
    pub typographer: bool,
    /// Class prefix on the `<code>` element of fences.
    pub lang_prefix: String,
    /// Maximum nesting depth of custom blocks.
    pub max_nesting: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            html: true,
            linkify: true,
            breaks: true,
            typographer: false,
            lang_prefix: highlight::DEFAULT_LANG_PREFIX.to_string(),
            max_nesting: 100,
        }
    }
}

impl RenderOptions {
    pub fn validate(&self) -> Result<(), RenderError> {
        if self.max_nesting == 0 {
            return Err(RenderError::InvalidOption {
                option: "max_nesting",
                reason: "must be at least 1".to_string(),
            });
        }
        if self
            .lang_prefix
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '<' | '>'))
        {
            return Err(RenderError::InvalidOption {
                option: "lang_prefix",
                reason: format!("`{}` must not contain whitespace or quotes", self.lang_prefix),
            });
        }
        Ok(())
    }
}

/// Output of one document render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedDocument {
    pub html: String,
    pub headings: Vec<HeadingAnchor>,
    pub toc_html: Option<String>,
}

/// Markdown processor: an extension registry plus a highlighter.
///
/// Holds no per-document state, so one instance can be shared across
/// threads behind an `Arc`.
#[derive(Clone)]
pub struct MarkdownProcessor {
    registry: Arc<ExtensionRegistry>,
    highlighter: Arc<Highlighter>,
}

impl MarkdownProcessor {
    pub fn new(registry: ExtensionRegistry, highlighter: Arc<Highlighter>) -> Self {
        Self {
            registry: Arc::new(registry),
            highlighter,
        }
    }

    /// Stock extensions and default themes.
    pub fn with_default_extensions(site_url: Option<&str>) -> Result<Self, RegistryError> {
        let registry = extensions::build_registry(&extensions::default_extensions(), site_url)?;
        Ok(Self::new(registry, Arc::new(Highlighter::default())))
    }

    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    pub fn highlighter(&self) -> &Highlighter {
        &self.highlighter
    }

    /// Tokenize and run every extension pass, stopping short of HTML.
    pub fn parse(
        &self,
        markdown: &str,
        options: &RenderOptions,
    ) -> Result<(Vec<Token>, DocumentEnv), RenderError> {
        options.validate()?;

        let mut tokens = Tokenizer::new(&self.registry, options).tokenize(markdown);
        if options.linkify {
            linkify::linkify(&mut tokens);
        }

        let mut env = DocumentEnv::new();
        for extension in self.registry.iter() {
            let hooks = extension.hooks();
            if hooks.contains(&Hook::Inline) {
                for_each_inline_run(&mut tokens, &mut |run| extension.parse_inline(run, &mut env));
            }
            if hooks.contains(&Hook::Core) {
                tracing::trace!("Running core pass {}", extension.name());
                extension.transform(&mut tokens, &mut env)?;
            }
        }

        Ok((tokens, env))
    }

    /// Convert markdown to HTML with all registered extensions.
    pub fn render(&self, markdown: &str, options: &RenderOptions) -> Result<RenderedDocument, RenderError> {
        let (tokens, env) = self.parse(markdown, options)?;

        let mut writer = HtmlWriter::new(&self.registry, &self.highlighter, options);
        writer.write_tokens(&tokens)?;
        let html = writer.finish();

        let toc_html = (!env.headings.is_empty()).then(|| render_toc(&env.headings));
        Ok(RenderedDocument {
            html,
            headings: env.headings,
            toc_html,
        })
    }
}

impl std::fmt::Debug for MarkdownProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkdownProcessor")
            .field("registry", &self.registry)
            .field("dark_theme", &self.highlighter.dark_theme())
            .field("light_theme", &self.highlighter.light_theme())
            .finish()
    }
}

pub fn render_toc(headings: &[HeadingAnchor]) -> String {
    let mut html = String::from(r#"<nav class="toc-nav"><h3>Contents</h3><ul class="toc-list">"#);
    for h in headings {
        html.push_str(&format!(
            r##"<li class="toc-level-{}"><a href="#{}">{}</a></li>"##,
            h.level,
            html_escape(&h.slug),
            html_escape(&h.title)
        ));
    }
    html.push_str("</ul></nav>");
    html
}

pub(crate) fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
