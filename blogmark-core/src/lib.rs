//! # blogmark-core
//!
//! Core library for the blogmark markdown pipeline.
//!
//! This crate provides the tokenizer and renderer, the ordered syntax
//! extension registry with the shipped extensions, the dual-theme code
//! highlighter, heading slugs, front matter parsing, configuration and the
//! batch site builder.

pub mod builder;
pub mod config;
pub mod frontmatter;
pub mod markdown;
pub mod models;
pub mod slug;

pub use builder::{BuildError, BuildReport, DocumentFailure, SiteBuilder};
pub use config::{Config, ConfigError};
pub use markdown::extensions::ExtensionConfig;
pub use markdown::highlight::{DualHighlight, HighlightConfig, Highlighter};
pub use markdown::registry::{Extension, ExtensionRegistry, HeadingAnchor, Hook, RegistryError};
pub use markdown::{MarkdownProcessor, RenderError, RenderOptions, RenderedDocument};
pub use models::{Frontmatter, HeadTag, MetaEntry, PageSummary, RenderedPage};
pub use slug::{slugify, SlugRegistry};
