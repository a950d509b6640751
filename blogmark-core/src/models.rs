//! Page content model: front matter, rendered pages and the page manifest.

use crate::markdown::registry::HeadingAnchor;
use crate::markdown::RenderedDocument;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One `<meta>` entry declared in front matter.
///
/// Only `name` and `content` are interpreted; `property`, `charset` and any
/// other attribute are carried through to the head tags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(flatten)]
    pub attrs: BTreeMap<String, String>,
}

impl MetaEntry {
    fn is_named(&self, name: &str) -> bool {
        self.name
            .as_deref()
            .is_some_and(|n| n.eq_ignore_ascii_case(name))
    }

    /// All attributes, `name` and `content` included.
    fn to_attrs(&self) -> BTreeMap<String, String> {
        let mut attrs = self.attrs.clone();
        if let Some(name) = &self.name {
            attrs.insert("name".to_string(), name.clone());
        }
        if let Some(content) = &self.content {
            attrs.insert("content".to_string(), content.clone());
        }
        attrs
    }
}

/// A document head element (`<title>` or `<meta>`) derived from front matter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadTag {
    pub tag: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl HeadTag {
    fn title(title: &str) -> Self {
        Self {
            tag: "title".to_string(),
            attrs: BTreeMap::new(),
            content: Some(title.to_string()),
        }
    }

    fn meta(attrs: BTreeMap<String, String>) -> Self {
        Self {
            tag: "meta".to_string(),
            attrs,
            content: None,
        }
    }
}

/// Frontmatter metadata from markdown files
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Frontmatter {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub date: Option<String>,

    #[serde(default)]
    pub updated: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub meta: Vec<MetaEntry>,

    #[serde(default)]
    pub draft: bool,

    /// Keys this crate doesn't interpret, kept for templates and the manifest.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Frontmatter {
    /// `meta` keywords, split on commas.
    pub fn keywords(&self) -> Vec<String> {
        self.meta
            .iter()
            .filter(|m| m.is_named("keywords"))
            .filter_map(|m| m.content.as_deref())
            .flat_map(|content| content.split(','))
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Explicit tags followed by meta keywords, first occurrence wins.
    pub fn all_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = Vec::new();
        for tag in self.tags.iter().cloned().chain(self.keywords()) {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        tags
    }

    /// Head tags for a page titled `title`: the title, the description and
    /// every `meta` entry, in that order.
    pub fn head(&self, title: &str) -> Vec<HeadTag> {
        let mut head = Vec::new();
        if !title.is_empty() {
            head.push(HeadTag::title(title));
        }

        let described = self.meta.iter().any(|m| m.is_named("description"));
        if let Some(description) = self.description.as_deref().filter(|_| !described) {
            let attrs = BTreeMap::from([
                ("name".to_string(), "description".to_string()),
                ("content".to_string(), description.to_string()),
            ]);
            head.push(HeadTag::meta(attrs));
        }

        head.extend(
            self.meta
                .iter()
                .map(MetaEntry::to_attrs)
                .filter(|attrs| !attrs.is_empty())
                .map(HeadTag::meta),
        );
        head
    }

    pub fn publication_date(&self) -> Option<NaiveDate> {
        self.date.as_deref().and_then(parse_date)
    }

    pub fn updated_date(&self) -> Option<NaiveDate> {
        self.updated.as_deref().and_then(parse_date)
    }
}

/// `YYYY-MM-DD`, or the date part of an RFC 3339 timestamp.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
        chrono::DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.date_naive())
    })
}

/// A rendered markdown page.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedPage {
    /// Source path relative to the content directory.
    pub source: PathBuf,
    /// Output path relative to the output directory.
    pub output: PathBuf,
    pub title: String,
    pub frontmatter: Frontmatter,
    pub date: Option<NaiveDate>,
    pub tags: Vec<String>,
    pub document: RenderedDocument,
}

impl RenderedPage {
    pub fn is_draft(&self) -> bool {
        self.frontmatter.draft
    }

    pub fn head(&self) -> Vec<HeadTag> {
        self.frontmatter.head(&self.title)
    }

    pub fn summary(&self) -> PageSummary {
        PageSummary {
            path: url_path(&self.output),
            source: url_path(&self.source),
            title: self.title.clone(),
            description: self.frontmatter.description.clone(),
            date: self.date,
            tags: self.tags.clone(),
            draft: self.is_draft(),
            head: self.head(),
            headings: self.document.headings.clone(),
        }
    }
}

/// Manifest entry written to `pages.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSummary {
    pub path: String,
    pub source: String,
    pub title: String,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
    pub tags: Vec<String>,
    pub draft: bool,
    #[serde(default)]
    pub head: Vec<HeadTag>,
    pub headings: Vec<HeadingAnchor>,
}

/// Newest first; undated pages last, ties by path.
pub fn sort_newest_first(pages: &mut [PageSummary]) {
    pages.sort_by(|a, b| match (a.date, b.date) {
        (Some(x), Some(y)) => y.cmp(&x).then_with(|| a.path.cmp(&b.path)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.path.cmp(&b.path),
    });
}

/// Relative path with `/` separators regardless of platform.
fn url_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
