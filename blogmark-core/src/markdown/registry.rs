//! Ordered extension registry.
//!
//! Extensions declare the hook points they use. The registry keeps them in
//! registration order, which is the order their passes run in and the order
//! code-line decorators wrap in. Render-rule overrides are exclusive: a second
//! extension claiming the same token type is rejected when the registry is
//! assembled, long before any document is rendered.

use super::renderer::HtmlWriter;
use super::token::{Token, TokenType};
use crate::slug::SlugRegistry;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("render rule for `{token}` is claimed by both `{existing}` and `{incoming}`")]
    RuleConflict {
        token: TokenType,
        existing: &'static str,
        incoming: &'static str,
    },

    #[error("extension `{0}` is registered more than once")]
    Duplicate(&'static str),

    #[error("extension `{0}` declares no hook points")]
    NoHooks(&'static str),

    #[error("invalid options for extension `{extension}`: {reason}")]
    InvalidOptions {
        extension: &'static str,
        reason: String,
    },
}

/// Failure raised by an extension while processing one document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("extension `{extension}` failed: {message}")]
pub struct ExtensionError {
    pub extension: &'static str,
    pub message: String,
}

impl ExtensionError {
    pub fn new(extension: &'static str, message: impl Into<String>) -> Self {
        Self {
            extension,
            message: message.into(),
        }
    }
}

/// Where an extension plugs into the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    /// Recognizes custom block syntax line by line while tokenizing.
    Block,
    /// Rewrites each run of inline tokens.
    Inline,
    /// Rewrites the whole token tree.
    Core,
    /// Replaces the default HTML for one token type.
    Render(TokenType),
    /// Decorates the rendered lines of every fence.
    CodeLine,
}

/// A custom block recognized by a [`Hook::Block`] extension.
#[derive(Debug, Clone)]
pub struct BlockMatch {
    /// Token to emit; its children are filled from `body`.
    pub token: Token,
    /// Line indices whose content is tokenized as the token's children.
    pub body: Range<usize>,
    /// First line index after the block.
    pub end: usize,
}

/// One rendered source line of a fence, handed to code-line decorators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeLine {
    /// 1-indexed line number.
    pub number: usize,
    pub html: String,
}

/// Heading anchor collected while rendering, for tables of contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct HeadingAnchor {
    pub level: u8,
    pub title: String,
    pub slug: String,
}

/// Per-document state shared by the extensions of one render.
#[derive(Debug, Default)]
pub struct DocumentEnv {
    pub slugs: SlugRegistry,
    pub headings: Vec<HeadingAnchor>,
    counters: BTreeMap<&'static str, usize>,
}

impl DocumentEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deterministic per-document id: `prefix-1`, `prefix-2`, ...
    pub fn next_id(&mut self, prefix: &'static str) -> String {
        let counter = self.counters.entry(prefix).or_insert(0);
        *counter += 1;
        format!("{prefix}-{counter}")
    }
}

/// A syntax extension. Every method has a no-op default; the registry only
/// calls the ones matching the declared [`Hook`]s.
pub trait Extension: Send + Sync {
    fn name(&self) -> &'static str;

    fn hooks(&self) -> Vec<Hook>;

    /// `lines` ends where the enclosing block ends; `at` indexes into it.
    fn parse_block(&self, _lines: &[&str], _at: usize) -> Option<BlockMatch> {
        None
    }

    fn parse_inline(&self, _run: &mut Vec<Token>, _env: &mut DocumentEnv) {}

    fn transform(&self, _tokens: &mut Vec<Token>, _env: &mut DocumentEnv) -> Result<(), ExtensionError> {
        Ok(())
    }

    fn render(&self, token: &Token, writer: &mut HtmlWriter<'_>) -> Result<(), ExtensionError> {
        writer.write_default(token)
    }

    fn decorate_lines(&self, _fence: &Token, _lines: &mut [CodeLine]) {}
}

#[derive(Default, Clone)]
pub struct ExtensionRegistry {
    extensions: Vec<Arc<dyn Extension>>,
    rules: HashMap<TokenType, usize>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an extension after the ones already registered.
    pub fn register<E: Extension + 'static>(&mut self, extension: E) -> Result<&mut Self, RegistryError> {
        self.register_arc(Arc::new(extension))
    }

    pub fn register_arc(&mut self, extension: Arc<dyn Extension>) -> Result<&mut Self, RegistryError> {
        let name = extension.name();
        if self.extensions.iter().any(|e| e.name() == name) {
            return Err(RegistryError::Duplicate(name));
        }

        let hooks = extension.hooks();
        if hooks.is_empty() {
            return Err(RegistryError::NoHooks(name));
        }

        let index = self.extensions.len();
        let mut claimed = Vec::new();
        for hook in &hooks {
            if let Hook::Render(ty) = hook {
                if let Some(&owner) = self.rules.get(ty) {
                    return Err(RegistryError::RuleConflict {
                        token: *ty,
                        existing: self.extensions[owner].name(),
                        incoming: name,
                    });
                }
                claimed.push(*ty);
            }
        }
        for ty in claimed {
            self.rules.insert(ty, index);
        }

        tracing::debug!("Registered extension {} with hooks {:?}", name, hooks);
        self.extensions.push(extension);
        Ok(self)
    }

    /// Builder-style registration.
    pub fn with<E: Extension + 'static>(mut self, extension: E) -> Result<Self, RegistryError> {
        self.register(extension)?;
        Ok(self)
    }

    /// Extension names in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.extensions.iter().map(|e| e.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Extension> {
        self.extensions.iter().map(|e| e.as_ref())
    }

    pub fn with_hook(&self, hook: Hook) -> impl Iterator<Item = &dyn Extension> {
        self.extensions
            .iter()
            .filter(move |e| e.hooks().contains(&hook))
            .map(|e| e.as_ref())
    }

    pub fn rule_for(&self, ty: TokenType) -> Option<&dyn Extension> {
        self.rules.get(&ty).map(|&idx| self.extensions[idx].as_ref())
    }
}

impl std::fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("extensions", &self.names())
            .finish()
    }
}
