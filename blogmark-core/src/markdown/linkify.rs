//! Auto-linking of bare `http(s)://` and `www.` URLs in text.

use super::token::{for_each_inline_run, Token, TokenType};
use regex::Regex;
use std::sync::OnceLock;

fn bare_url() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)\b(?:https?://|www\.)[^\s<>"]+"#).expect("valid linkify regex"))
}

/// Replace bare URLs in text tokens with link tokens.
///
/// Text already inside a link, an image, code, or an inline `<a>` element is
/// left alone.
pub fn linkify(tokens: &mut Vec<Token>) {
    for_each_inline_run(tokens, &mut linkify_run);
}

fn linkify_run(run: &mut Vec<Token>) {
    let mut anchor_depth = 0usize;
    let mut out = Vec::with_capacity(run.len());

    for token in run.drain(..) {
        match token.ty {
            TokenType::InlineHtml => {
                let html = token.content.trim_start().to_ascii_lowercase();
                if html.starts_with("<a ") || html.starts_with("<a>") {
                    anchor_depth += 1;
                } else if html.starts_with("</a") {
                    anchor_depth = anchor_depth.saturating_sub(1);
                }
                out.push(token);
            }
            TokenType::Text if anchor_depth == 0 && bare_url().is_match(&token.content) => {
                split_links(token, &mut out);
            }
            _ => out.push(token),
        }
    }

    *run = out;
}

fn split_links(token: Token, out: &mut Vec<Token>) {
    let text = token.content.as_str();
    let mut last = 0;

    for found in bare_url().find_iter(text) {
        let url = trim_trailing(found.as_str());
        if !has_host(url) {
            continue;
        }
        let start = found.start();
        let end = start + url.len();

        if start > last {
            out.push(piece(&token, &text[last..start]));
        }
        let href = if url.to_ascii_lowercase().starts_with("www.") {
            format!("http://{url}")
        } else {
            url.to_string()
        };
        let mut link = Token::new(TokenType::Link)
            .with_attr("href", href)
            .with_children(vec![piece(&token, url)]);
        link.lines = token.lines.clone();
        out.push(link);
        last = end;
    }

    if last < text.len() {
        out.push(piece(&token, &text[last..]));
    }
}

fn piece(source: &Token, text: &str) -> Token {
    Token {
        lines: source.lines.clone(),
        ..Token::text(text)
    }
}

/// Drop sentence punctuation and unbalanced closing parens from the end.
fn trim_trailing(url: &str) -> &str {
    let mut url = url;
    loop {
        let Some(last) = url.chars().last() else {
            return url;
        };
        let trim = match last {
            '.' | ',' | ';' | ':' | '!' | '?' | '\'' | '*' | '_' | '~' => true,
            ')' => url.matches(')').count() > url.matches('(').count(),
            _ => false,
        };
        if !trim {
            return url;
        }
        url = &url[..url.len() - last.len_utf8()];
    }
}

fn has_host(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    let rest = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
        .or_else(|| lower.strip_prefix("www."))
        .unwrap_or("");
    rest.chars().next().is_some_and(|c| c.is_alphanumeric())
}
