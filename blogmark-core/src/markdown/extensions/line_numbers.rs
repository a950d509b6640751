use super::check_class;
use crate::markdown::html_escape;
use crate::markdown::registry::{CodeLine, Extension, Hook, RegistryError};
use crate::markdown::token::Token;
use serde::{Deserialize, Serialize};

pub const NAME: &str = "line-numbers";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineNumbersOptions {
    /// Number fences that carry neither `:line-numbers` nor `:no-line-numbers`.
    pub enabled_by_default: bool,
    pub class: String,
}

impl Default for LineNumbersOptions {
    fn default() -> Self {
        Self {
            enabled_by_default: true,
            class: "numbered-line".to_string(),
        }
    }
}

/// Wraps every code line in `<span class="numbered-line" data-line="N">`.
pub struct LineNumbers {
    options: LineNumbersOptions,
}

impl LineNumbers {
    pub fn new(options: LineNumbersOptions) -> Result<Self, RegistryError> {
        check_class(NAME, "class", &options.class)?;
        Ok(Self { options })
    }

    fn enabled_for(&self, info: &str) -> bool {
        if info.contains(":no-line-numbers") {
            false
        } else if info.contains(":line-numbers") {
            true
        } else {
            self.options.enabled_by_default
        }
    }
}

impl Extension for LineNumbers {
    fn name(&self) -> &'static str {
        NAME
    }

    fn hooks(&self) -> Vec<Hook> {
        vec![Hook::CodeLine]
    }

    fn decorate_lines(&self, fence: &Token, lines: &mut [CodeLine]) {
        if !self.enabled_for(&fence.info) {
            return;
        }
        let class = html_escape(&self.options.class);
        for line in lines.iter_mut() {
            line.html = format!(
                "<span class=\"{class}\" data-line=\"{}\">{}</span>",
                line.number, line.html
            );
        }
    }
}
