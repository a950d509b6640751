//! Slug generation and per-document uniqueness.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use unicode_segmentation::UnicodeSegmentation;

/// Slug used when a heading has no sluggable characters at all.
pub const FALLBACK_SLUG: &str = "section";

fn hyphen_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-+").expect("valid regex"))
}

/// Convert a string to a URL-fragment-safe slug
///
/// Rules:
/// - Lowercase
/// - Replace whitespace and underscores with hyphens
/// - Remove special characters (except hyphens)
/// - Collapse multiple hyphens
/// - Trim leading/trailing hyphens
///
/// # Examples
///
/// ```
/// use blogmark_core::slugify;
///
/// assert_eq!(slugify("Hello World"), "hello-world");
/// assert_eq!(slugify("Rust & Safety"), "rust-safety");
/// assert_eq!(slugify("C++ Programming"), "c-programming");
/// ```
pub fn slugify(input: &str) -> String {
    let lowercased = input.to_lowercase();

    let with_hyphens = lowercased
        .graphemes(true)
        .map(|g| match g {
            " " | "_" | "\t" | "\n" | "\r" | "\u{a0}" => "-",
            _ => g,
        })
        .collect::<String>();

    // Keep ascii alphanumerics, hyphens and unicode letters; whole graphemes
    // so combining marks stay attached to their base character.
    let cleaned = with_hyphens
        .graphemes(true)
        .filter_map(|g| {
            let c = g.chars().next()?;
            if c.is_ascii_alphanumeric() || c == '-' || c.is_alphabetic() {
                Some(g)
            } else {
                None
            }
        })
        .collect::<String>();

    let collapsed = hyphen_runs().replace_all(&cleaned, "-");
    collapsed.trim_matches('-').to_string()
}

/// Slug → occurrence bookkeeping for one document.
///
/// Created when a document render starts and dropped when it ends, so two
/// documents never influence each other's anchors.
#[derive(Debug, Clone, Default)]
pub struct SlugRegistry {
    counts: HashMap<String, usize>,
}

impl SlugRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `base` the first time it is seen, then `base-1`, `base-2`, ...
    ///
    /// Suffixed candidates already claimed by another heading are skipped.
    pub fn unique(&mut self, base: &str) -> String {
        let base = if base.is_empty() { FALLBACK_SLUG } else { base };

        let Some(&seen) = self.counts.get(base) else {
            self.counts.insert(base.to_string(), 0);
            return base.to_string();
        };

        let mut n = seen;
        let candidate = loop {
            n += 1;
            let candidate = format!("{base}-{n}");
            if !self.counts.contains_key(&candidate) {
                break candidate;
            }
        };

        self.counts.insert(base.to_string(), n);
        self.counts.insert(candidate.clone(), 0);
        candidate
    }

    /// Reserve an author-supplied id so generated slugs never collide with it.
    pub fn claim(&mut self, slug: &str) {
        self.counts.entry(slug.to_string()).or_insert(0);
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.counts.contains_key(slug)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}
