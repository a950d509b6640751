//! # blogmark-render
//!
//! Wraps rendered markdown fragments in the configured layout component.
//!
//! This crate handles HTML template rendering using Askama.

pub mod templates;

pub use templates::{render_page, PageTemplate, TemplateError};
