//! External link attributes.

use super::check_class;
use crate::markdown::registry::{DocumentEnv, Extension, ExtensionError, Hook, RegistryError};
use crate::markdown::token::{walk_tokens_mut, Token, TokenType};
use serde::{Deserialize, Serialize};
use url::{Origin, Url};

pub const NAME: &str = "links";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinksOptions {
    pub target: Option<String>,
    pub rel: Option<String>,
    pub class: Option<String>,
    /// Overrides the site URL as the origin links are compared against.
    pub origin: Option<String>,
}

impl Default for LinksOptions {
    fn default() -> Self {
        Self {
            target: Some("_blank".to_string()),
            rel: Some("noopener noreferrer".to_string()),
            class: None,
            origin: None,
        }
    }
}

pub struct ExternalLinks {
    options: LinksOptions,
    site: Option<Url>,
}

impl ExternalLinks {
    pub fn new(options: LinksOptions, site_url: Option<&str>) -> Result<Self, RegistryError> {
        let site = match options.origin.as_deref().or(site_url) {
            Some(raw) => Some(Url::parse(raw).map_err(|e| RegistryError::InvalidOptions {
                extension: NAME,
                reason: format!("invalid site origin `{raw}`: {e}"),
            })?),
            None => None,
        };
        if let Some(class) = &options.class {
            check_class(NAME, "class", class)?;
        }
        Ok(Self { options, site })
    }

    fn site_origin(&self) -> Option<Origin> {
        self.site.as_ref().map(Url::origin)
    }

    /// Absolute http(s) or protocol-relative URL pointing off-site.
    pub fn is_external(&self, href: &str) -> bool {
        let href = href.trim();
        let lower = href.to_ascii_lowercase();

        let parsed = if lower.starts_with("//") {
            let scheme = self.site.as_ref().map(Url::scheme).unwrap_or("https");
            Url::parse(&format!("{scheme}:{href}"))
        } else if lower.starts_with("http://") || lower.starts_with("https://") {
            Url::parse(href)
        } else {
            return false;
        };

        match (parsed, self.site_origin()) {
            (Ok(url), Some(site)) => url.origin() != site,
            (Ok(_), None) => true,
            (Err(_), _) => false,
        }
    }
}

impl Extension for ExternalLinks {
    fn name(&self) -> &'static str {
        NAME
    }

    fn hooks(&self) -> Vec<Hook> {
        vec![Hook::Core]
    }

    fn transform(&self, tokens: &mut Vec<Token>, _env: &mut DocumentEnv) -> Result<(), ExtensionError> {
        walk_tokens_mut(tokens, &mut |token| {
            if token.ty != TokenType::Link {
                return;
            }
            let external = token
                .attrs
                .get("href")
                .map(|href| self.is_external(href))
                .unwrap_or(false);
            if !external {
                return;
            }
            if let Some(target) = &self.options.target {
                token.attrs.set("target", target.clone());
            }
            if let Some(rel) = &self.options.rel {
                token.attrs.set("rel", rel.clone());
            }
            if let Some(class) = &self.options.class {
                token.attrs.add_class(class);
            }
        });
        Ok(())
    }
}
