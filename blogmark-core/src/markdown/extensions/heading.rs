//! Heading ids and permalink anchors.

use super::check_class;
use crate::markdown::registry::{DocumentEnv, Extension, ExtensionError, HeadingAnchor, Hook, RegistryError};
use crate::markdown::token::{walk_tokens_mut, Attrs, Token, TokenType};
use crate::slug::slugify;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const NAME: &str = "heading";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorPlacement {
    Before,
    After,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadingOptions {
    /// Inject the permalink `<a>`; ids are assigned either way.
    pub permalink: bool,
    pub placement: AnchorPlacement,
    pub symbol: String,
    pub class: String,
    pub aria_hidden: bool,
    /// Separate the anchor from the heading text with a space.
    pub space: bool,
    pub tab_index: Option<i32>,
    /// Extra class(es) added to every processed heading.
    pub heading_class: Option<String>,
    pub min_level: u8,
    pub max_level: u8,
}

impl Default for HeadingOptions {
    fn default() -> Self {
        Self {
            permalink: true,
            placement: AnchorPlacement::Before,
            symbol: "#".to_string(),
            class: "header-anchor".to_string(),
            aria_hidden: true,
            space: false,
            tab_index: Some(-1),
            heading_class: None,
            min_level: 1,
            max_level: 6,
        }
    }
}

pub struct HeadingAnchors {
    options: HeadingOptions,
}

impl HeadingAnchors {
    pub fn new(options: HeadingOptions) -> Result<Self, RegistryError> {
        if options.min_level < 1 || options.max_level > 6 || options.min_level > options.max_level {
            return Err(RegistryError::InvalidOptions {
                extension: NAME,
                reason: format!(
                    "heading levels must satisfy 1 <= min_level <= max_level <= 6 (got {}..={})",
                    options.min_level, options.max_level
                ),
            });
        }
        check_class(NAME, "class", &options.class)?;
        if let Some(class) = &options.heading_class {
            check_class(NAME, "heading_class", class)?;
        }
        Ok(Self { options })
    }

    fn in_range(&self, token: &Token) -> bool {
        token.ty == TokenType::Heading
            && (self.options.min_level..=self.options.max_level).contains(&token.level)
    }

    fn process(&self, heading: &mut Token, env: &mut DocumentEnv, explicit_ids: &mut HashSet<String>) {
        let title = heading.plain_text().trim().to_string();

        let slug = match heading.attrs.get("id").filter(|id| !id.is_empty()) {
            Some(explicit) if explicit_ids.insert(explicit.to_string()) => explicit.to_string(),
            Some(explicit) => {
                let slug = env.slugs.unique(explicit);
                tracing::warn!("Duplicate heading id `{}`, using `{}`", explicit, slug);
                slug
            }
            None => env.slugs.unique(&slugify(&title)),
        };

        let mut attrs = Attrs::new();
        attrs.set("id", slug.clone());
        if let Some(tab_index) = self.options.tab_index {
            attrs.set("tabindex", tab_index.to_string());
        }
        for (name, value) in heading.attrs.iter().filter(|(name, _)| *name != "id") {
            attrs.set(name, value);
        }
        if let Some(class) = &self.options.heading_class {
            attrs.add_class(class);
        }
        heading.attrs = attrs;

        if self.options.permalink {
            self.inject_anchor(heading, &slug);
        }

        env.headings.push(HeadingAnchor {
            level: heading.level,
            title,
            slug,
        });
    }

    fn inject_anchor(&self, heading: &mut Token, slug: &str) {
        let mut anchor = Token::new(TokenType::Link);
        if !self.options.class.is_empty() {
            anchor.attrs.set("class", self.options.class.clone());
        }
        anchor.attrs.set("href", format!("#{slug}"));
        if self.options.aria_hidden {
            anchor.attrs.set("aria-hidden", "true");
        }
        anchor.children.push(Token::text(self.options.symbol.clone()));

        match self.options.placement {
            AnchorPlacement::Before => {
                if self.options.space {
                    heading.children.insert(0, Token::text(" "));
                }
                heading.children.insert(0, anchor);
            }
            AnchorPlacement::After => {
                if self.options.space {
                    heading.children.push(Token::text(" "));
                }
                heading.children.push(anchor);
            }
        }
    }
}

impl Extension for HeadingAnchors {
    fn name(&self) -> &'static str {
        NAME
    }

    fn hooks(&self) -> Vec<Hook> {
        vec![Hook::Core]
    }

    fn transform(&self, tokens: &mut Vec<Token>, env: &mut DocumentEnv) -> Result<(), ExtensionError> {
        // Explicit ids are reserved up front so generated slugs never take them.
        walk_tokens_mut(tokens, &mut |token| {
            if self.in_range(token) {
                if let Some(id) = token.attrs.get("id").filter(|id| !id.is_empty()) {
                    env.slugs.claim(id);
                }
            }
        });

        let mut explicit_ids = HashSet::new();
        walk_tokens_mut(tokens, &mut |token| {
            if self.in_range(token) {
                self.process(token, env, &mut explicit_ids);
            }
        });
        Ok(())
    }
}
