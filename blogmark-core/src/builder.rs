//! Site building logic - discovers pages and renders each one independently.

use crate::{
    config::{Config, ConfigError},
    frontmatter::{parse_frontmatter, FrontmatterError},
    markdown::{MarkdownProcessor, RenderError},
    models::{sort_newest_first, PageSummary, RenderedPage},
};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use walkdir::WalkDir;

/// Manifest file written next to the rendered pages.
pub const MANIFEST_FILE: &str = "pages.json";

const MARKDOWN_EXTENSIONS: [&str; 2] = ["md", "markdown"];

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Frontmatter error: {0}")]
    Frontmatter(#[from] FrontmatterError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Failed to serialize manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl BuildError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BuildError::Io {
            path: path.into(),
            source,
        }
    }
}

/// A document that failed to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Outcome of a batch build.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub pages: Vec<RenderedPage>,
    pub failures: Vec<DocumentFailure>,
}

impl BuildReport {
    pub fn record(&mut self, path: &Path, result: Result<RenderedPage, BuildError>) {
        match result {
            Ok(page) => self.pages.push(page),
            Err(err) => self.record_failure(path, err),
        }
    }

    pub fn record_failure(&mut self, path: &Path, error: impl std::fmt::Display) {
        tracing::error!("Failed to render {}: {}", path.display(), error);
        self.failures.push(DocumentFailure {
            path: path.to_path_buf(),
            error: error.to_string(),
        });
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Manifest entries, newest first.
    pub fn summaries(&self) -> Vec<PageSummary> {
        let mut summaries: Vec<PageSummary> = self.pages.iter().map(RenderedPage::summary).collect();
        sort_newest_first(&mut summaries);
        summaries
    }
}

/// Main site builder
///
/// Construction validates the configuration and builds the extension
/// registry and highlighter, so every configuration error surfaces before
/// the first document is read.
#[derive(Clone)]
pub struct SiteBuilder {
    config: Arc<Config>,
    processor: MarkdownProcessor,
    ignores: Vec<Regex>,
}

impl SiteBuilder {
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let registry = config.extension_registry()?;
        let highlighter = config.highlighter()?;
        let ignores = config.ignore_regexes()?;

        tracing::debug!(
            "Extensions: {}",
            registry.names().join(", ")
        );

        Ok(Self {
            config: Arc::new(config),
            processor: MarkdownProcessor::new(registry, Arc::new(highlighter)),
            ignores,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn processor(&self) -> &MarkdownProcessor {
        &self.processor
    }

    /// Markdown files under the content directory, sorted, minus ignored ones.
    pub fn discover(&self) -> Result<Vec<PathBuf>, BuildError> {
        let content_dir = self.config.content_dir();
        if !content_dir.is_dir() {
            return Err(BuildError::io(
                &content_dir,
                std::io::Error::new(std::io::ErrorKind::NotFound, "content directory not found"),
            ));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&content_dir).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!("Skipping unreadable entry: {}", err);
                    continue;
                }
            };
            if !entry.file_type().is_file() || !is_markdown(entry.path()) {
                continue;
            }

            let rel = relative_to(entry.path(), &content_dir);
            let rel_str = rel.to_string_lossy().replace('\\', "/");
            if self.ignores.iter().any(|re| re.is_match(&rel_str)) {
                tracing::debug!("Ignoring {} due to ignore_patterns", rel_str);
                continue;
            }
            files.push(entry.path().to_path_buf());
        }

        tracing::info!("Found {} markdown files", files.len());
        Ok(files)
    }

    /// Read and render one file.
    pub fn render_file(&self, path: &Path) -> Result<RenderedPage, BuildError> {
        let content = fs::read_to_string(path).map_err(|e| BuildError::io(path, e))?;
        let rel = relative_to(path, &self.config.content_dir());
        self.render_source(&rel, &content)
    }

    /// Render already-loaded source; `rel` is the content-relative path.
    pub fn render_source(&self, rel: &Path, content: &str) -> Result<RenderedPage, BuildError> {
        let (frontmatter, body) = parse_frontmatter(content)?;
        let document = self.processor.render(&body, &self.config.markdown)?;

        let title = if !frontmatter.title.trim().is_empty() {
            frontmatter.title.trim().to_string()
        } else if let Some(first) = document.headings.first() {
            first.title.clone()
        } else {
            rel.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        };

        tracing::debug!(
            "Rendered {} ({} headings)",
            rel.display(),
            document.headings.len()
        );

        Ok(RenderedPage {
            source: rel.to_path_buf(),
            output: rel.with_extension("html"),
            title,
            date: frontmatter.publication_date(),
            tags: frontmatter.all_tags(),
            frontmatter,
            document,
        })
    }

    /// Render every discovered page on the current thread.
    ///
    /// A failing page is logged and recorded; with `build.fail_fast` the
    /// remaining pages are skipped.
    pub fn build(&self) -> Result<BuildReport, BuildError> {
        let files = self.discover()?;
        let mut report = BuildReport::default();

        for path in &files {
            report.record(path, self.render_file(path));
            if self.config.build.fail_fast && !report.is_success() {
                tracing::warn!("Stopping after first failure (fail_fast)");
                break;
            }
        }

        tracing::info!(
            "Rendered {} pages ({} failed)",
            report.pages.len(),
            report.failures.len()
        );
        Ok(report)
    }

    /// Write `pages.json` into the output directory.
    pub fn write_manifest(&self, pages: &[PageSummary]) -> Result<PathBuf, BuildError> {
        let output_dir = self.config.output_dir();
        fs::create_dir_all(&output_dir).map_err(|e| BuildError::io(&output_dir, e))?;

        let path = output_dir.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(pages)?;
        fs::write(&path, json).map_err(|e| BuildError::io(&path, e))?;
        Ok(path)
    }
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| MARKDOWN_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

fn relative_to(path: &Path, base: &Path) -> PathBuf {
    path.strip_prefix(base).unwrap_or(path).to_path_buf()
}
