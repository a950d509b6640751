//! `::: kind [title]` custom blocks.
//!
//! A container opens with a run of three or more colons followed by a known
//! kind, and closes on a line holding only a colon run at least as long as
//! the opener. Containers nest; an inner opener must be closed before the
//! outer closer counts. Openers naming an unknown kind are not containers and
//! stay literal text.

use super::check_class;
use crate::markdown::html_escape;
use crate::markdown::registry::{BlockMatch, Extension, ExtensionError, Hook, RegistryError};
use crate::markdown::renderer::HtmlWriter;
use crate::markdown::token::{Token, TokenType};
use crate::markdown::tokenizer::FenceTracker;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const NAME: &str = "container";

/// Kind rendered as `<details>` instead of a `<div>`.
pub const DETAILS: &str = "details";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerOptions {
    pub kinds: Vec<String>,
    /// Title used when the opener has none; falls back to the kind name.
    pub titles: BTreeMap<String, String>,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        let titles = [
            ("tip", "TIP"),
            ("info", "INFO"),
            ("warning", "WARNING"),
            ("danger", "DANGER"),
            ("details", "Details"),
        ];
        Self {
            kinds: titles.iter().map(|(kind, _)| kind.to_string()).collect(),
            titles: titles
                .iter()
                .map(|(kind, title)| (kind.to_string(), title.to_string()))
                .collect(),
        }
    }
}

pub struct Containers {
    options: ContainerOptions,
}

impl Containers {
    pub fn new(options: ContainerOptions) -> Result<Self, RegistryError> {
        for kind in &options.kinds {
            let valid = !kind.is_empty()
                && kind
                    .chars()
                    .all(|c| c.is_alphanumeric() || c == '-' || c == '_');
            if !valid {
                return Err(RegistryError::InvalidOptions {
                    extension: NAME,
                    reason: format!("invalid container kind `{kind}`"),
                });
            }
        }
        for title in options.titles.values() {
            check_class(NAME, "titles", title)?;
        }
        Ok(Self { options })
    }

    fn is_known(&self, kind: &str) -> bool {
        self.options.kinds.iter().any(|k| k == kind)
    }

    fn default_title(&self, kind: &str) -> String {
        self.options
            .titles
            .get(kind)
            .cloned()
            .unwrap_or_else(|| kind.to_uppercase())
    }
}

/// Opening line: `(marker length, kind, title)`.
fn parse_opener(line: &str) -> Option<(usize, &str, &str)> {
    let (run, rest) = colon_run(line)?;
    let rest = rest.trim();
    if rest.is_empty() {
        return None;
    }
    let (kind, title) = match rest.split_once(char::is_whitespace) {
        Some((kind, title)) => (kind, title.trim()),
        None => (rest, ""),
    };
    Some((run, kind, title))
}

/// Closing line: colon run length when the line holds nothing else.
fn parse_closer(line: &str) -> Option<usize> {
    let (run, rest) = colon_run(line)?;
    rest.trim().is_empty().then_some(run)
}

fn colon_run(line: &str) -> Option<(usize, &str)> {
    let trimmed = line.trim_start_matches(' ');
    if line.len() - trimmed.len() > 3 {
        return None;
    }
    let run = trimmed.chars().take_while(|&c| c == ':').count();
    (run >= 3).then(|| (run, &trimmed[run..]))
}

impl Extension for Containers {
    fn name(&self) -> &'static str {
        NAME
    }

    fn hooks(&self) -> Vec<Hook> {
        vec![Hook::Block, Hook::Render(TokenType::Container)]
    }

    fn parse_block(&self, lines: &[&str], at: usize) -> Option<BlockMatch> {
        let (marker, kind, title) = parse_opener(lines[at])?;
        if !self.is_known(kind) {
            return None;
        }

        let mut depth = 0usize;
        let mut fence = FenceTracker::default();
        let mut close = None;
        for (i, line) in lines.iter().enumerate().skip(at + 1) {
            if fence.observe(line) {
                continue;
            }
            // Unknown kinds stay literal text, so they open nothing.
            if parse_opener(line).is_some_and(|(_, inner, _)| self.is_known(inner)) {
                depth += 1;
            } else if let Some(run) = parse_closer(line) {
                if depth > 0 {
                    depth -= 1;
                } else if run >= marker {
                    close = Some(i);
                    break;
                }
            }
        }

        let title = if title.is_empty() {
            self.default_title(kind)
        } else {
            title.to_string()
        };
        let token = Token {
            info: kind.to_string(),
            content: title,
            ..Token::new(TokenType::Container)
        };

        Some(match close {
            Some(close) => BlockMatch {
                token,
                body: at + 1..close,
                end: close + 1,
            },
            None => BlockMatch {
                token,
                body: at + 1..lines.len(),
                end: lines.len(),
            },
        })
    }

    fn render(&self, token: &Token, writer: &mut HtmlWriter<'_>) -> Result<(), ExtensionError> {
        let kind = html_escape(&token.info);
        let title = html_escape(&token.content);

        if token.info == DETAILS {
            writer.push_str(&format!(
                "<details class=\"{kind} custom-block\"><summary>{title}</summary>\n"
            ));
            writer.write_tokens(&token.children)?;
            writer.push_str("</details>\n");
        } else {
            writer.push_str(&format!(
                "<div class=\"{kind} custom-block\"><p class=\"custom-block-title\">{title}</p>\n"
            ));
            writer.write_tokens(&token.children)?;
            writer.push_str("</div>\n");
        }
        Ok(())
    }
}
