//! Askama template definitions.

use askama::Template;
use blogmark_core::config::WrapperConfig;
use blogmark_core::RenderedPage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Failed to render page template: {0}")]
    Render(#[from] askama::Error),
}

/// Layout wrapper around one rendered page
#[derive(Template)]
#[template(path = "page.html")]
pub struct PageTemplate {
    // Wrapper component
    pub component: String,
    pub classes: String,

    // Page metadata
    pub title: String,
    pub date: Option<String>,
    pub tags: Vec<String>,

    // Content
    pub content: String,
    pub toc_html: Option<String>,
}

impl PageTemplate {
    pub fn new(page: &RenderedPage, wrapper: &WrapperConfig) -> Self {
        let toc_html = if wrapper.include_toc {
            page.document.toc_html.clone()
        } else {
            None
        };

        Self {
            component: wrapper.component.clone(),
            classes: wrapper.classes.clone(),
            title: page.title.clone(),
            date: page.date.map(|d| d.format("%Y-%m-%d").to_string()),
            tags: page.tags.clone(),
            content: page.document.html.clone(),
            toc_html,
        }
    }
}

/// Render `page` inside the wrapper component.
pub fn render_page(page: &RenderedPage, wrapper: &WrapperConfig) -> Result<String, TemplateError> {
    Ok(PageTemplate::new(page, wrapper).render()?)
}
