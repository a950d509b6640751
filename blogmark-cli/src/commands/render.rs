//! Render command implementation.

use super::load_config;
use crate::RenderFormat;
use anyhow::{Context, Result};
use blogmark_core::SiteBuilder;
use blogmark_render::render_page;
use std::path::Path;

/// Render one markdown file and print it to stdout.
pub fn render_file(config_path: &Path, file: &Path, format: RenderFormat, wrap: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let builder = SiteBuilder::new(config).context("Invalid configuration")?;
    let page = builder
        .render_file(file)
        .with_context(|| format!("Failed to render {:?}", file))?;

    let html = if wrap {
        render_page(&page, &builder.config().wrapper)?
    } else {
        page.document.html.clone()
    };

    match format {
        RenderFormat::Html => print!("{html}"),
        RenderFormat::Json => {
            let value = serde_json::json!({
                "title": page.title,
                "date": page.date,
                "tags": page.tags,
                "frontmatter": page.frontmatter,
                "head": page.head(),
                "headings": page.document.headings,
                "toc_html": page.document.toc_html,
                "html": html,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }
    Ok(())
}
