//! `{1,3-5}` line highlighting for fences.

use super::check_class;
use crate::markdown::html_escape;
use crate::markdown::registry::{CodeLine, DocumentEnv, Extension, ExtensionError, Hook, RegistryError};
use crate::markdown::token::{walk_tokens_mut, Token, TokenType};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

pub const NAME: &str = "line-highlight";

/// Fence attribute holding the raw line directive.
pub const LINES_ATTR: &str = "data-highlight-lines";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineHighlightOptions {
    pub class: String,
}

impl Default for LineHighlightOptions {
    fn default() -> Self {
        Self {
            class: "highlighted".to_string(),
        }
    }
}

pub struct LineHighlight {
    options: LineHighlightOptions,
}

impl LineHighlight {
    pub fn new(options: LineHighlightOptions) -> Result<Self, RegistryError> {
        check_class(NAME, "class", &options.class)?;
        Ok(Self { options })
    }
}

impl Extension for LineHighlight {
    fn name(&self) -> &'static str {
        NAME
    }

    fn hooks(&self) -> Vec<Hook> {
        vec![Hook::Core, Hook::CodeLine]
    }

    fn transform(&self, tokens: &mut Vec<Token>, _env: &mut DocumentEnv) -> Result<(), ExtensionError> {
        walk_tokens_mut(tokens, &mut |token| {
            if token.ty != TokenType::Fence {
                return;
            }
            if let Some((info, lines)) = split_directive(&token.info) {
                token.info = info;
                token.attrs.set(LINES_ATTR, lines);
            }
        });
        Ok(())
    }

    fn decorate_lines(&self, fence: &Token, lines: &mut [CodeLine]) {
        let Some(directive) = fence.attrs.get(LINES_ATTR) else {
            return;
        };
        let ranges = parse_ranges(directive);
        if ranges.is_empty() {
            return;
        }
        let class = html_escape(&self.options.class);
        for line in lines.iter_mut() {
            if ranges.iter().any(|r| r.contains(&line.number)) {
                line.html = format!("<span class=\"{class}\">{}</span>", line.html);
            }
        }
    }
}

/// Split `js {1,3}:no-line-numbers` into `js:no-line-numbers` and `1,3`.
///
/// Only braces holding digits, commas, dashes and spaces count.
fn split_directive(info: &str) -> Option<(String, String)> {
    let open = info.find('{')?;
    let close = open + info[open..].find('}')?;
    let inner = &info[open + 1..close];
    if !inner
        .chars()
        .all(|c| c.is_ascii_digit() || c == ',' || c == '-' || c == ' ')
    {
        return None;
    }
    let rest = format!("{}{}", info[..open].trim_end(), &info[close + 1..]);
    Some((rest.trim().to_string(), inner.trim().to_string()))
}

/// 1-indexed inclusive ranges; malformed or reversed parts are dropped.
fn parse_ranges(directive: &str) -> Vec<RangeInclusive<usize>> {
    directive
        .split(',')
        .filter_map(|part| {
            let part = part.trim();
            let (start, end) = match part.split_once('-') {
                Some((a, b)) => (a.trim().parse::<usize>().ok()?, b.trim().parse::<usize>().ok()?),
                None => {
                    let n = part.parse::<usize>().ok()?;
                    (n, n)
                }
            };
            (start >= 1 && start <= end).then_some(start..=end)
        })
        .collect()
}
