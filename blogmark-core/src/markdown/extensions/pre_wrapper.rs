//! Wraps both themed renderings of a fence in one language container.

use super::check_class;
use crate::markdown::html_escape;
use crate::markdown::registry::{Extension, ExtensionError, Hook, RegistryError};
use crate::markdown::renderer::HtmlWriter;
use crate::markdown::token::{Token, TokenType};
use serde::{Deserialize, Serialize};

pub const NAME: &str = "pre-wrapper";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreWrapperOptions {
    /// Emit `<span class="lang">LANG</span>` inside the wrapper.
    pub show_language: bool,
    pub class_prefix: String,
    /// Class used when the fence has no language tag.
    pub fallback_language: String,
}

impl Default for PreWrapperOptions {
    fn default() -> Self {
        Self {
            show_language: true,
            class_prefix: "language-".to_string(),
            fallback_language: "text".to_string(),
        }
    }
}

pub struct PreWrapper {
    options: PreWrapperOptions,
}

impl PreWrapper {
    pub fn new(options: PreWrapperOptions) -> Result<Self, RegistryError> {
        check_class(NAME, "class_prefix", &options.class_prefix)?;
        check_class(NAME, "fallback_language", &options.fallback_language)?;
        Ok(Self { options })
    }
}

impl Extension for PreWrapper {
    fn name(&self) -> &'static str {
        NAME
    }

    fn hooks(&self) -> Vec<Hook> {
        vec![Hook::Render(TokenType::Fence)]
    }

    fn render(&self, token: &Token, writer: &mut HtmlWriter<'_>) -> Result<(), ExtensionError> {
        let lang = match token.fence_language() {
            "" => self.options.fallback_language.as_str(),
            lang => lang,
        };
        let lang = html_escape(lang);

        writer.push_str(&format!(
            "<div class=\"{}{lang}\">",
            html_escape(&self.options.class_prefix)
        ));
        if self.options.show_language {
            writer.push_str(&format!("<span class=\"lang\">{lang}</span>"));
        }
        writer.push_str("\n");
        writer.write_default(token)?;
        writer.push_str("</div>\n");
        Ok(())
    }
}
