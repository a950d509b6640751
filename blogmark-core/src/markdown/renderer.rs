//! Token tree → HTML.

use super::highlight::Highlighter;
use super::registry::{CodeLine, Extension, ExtensionError, ExtensionRegistry, Hook};
use super::token::{Attrs, Token, TokenType};
use super::{html_escape, RenderOptions};
use std::collections::HashMap;

/// Output buffer plus the context render rules need.
///
/// Every token goes through [`HtmlWriter::write_token`], which dispatches to
/// the extension owning that token type's render rule or falls back to
/// [`HtmlWriter::write_default`].
pub struct HtmlWriter<'a> {
    registry: &'a ExtensionRegistry,
    highlighter: &'a Highlighter,
    options: &'a RenderOptions,
    out: String,
    in_table_head: bool,
    footnotes: HashMap<String, usize>,
}

impl<'a> HtmlWriter<'a> {
    pub fn new(
        registry: &'a ExtensionRegistry,
        highlighter: &'a Highlighter,
        options: &'a RenderOptions,
    ) -> Self {
        Self {
            registry,
            highlighter,
            options,
            out: String::new(),
            in_table_head: false,
            footnotes: HashMap::new(),
        }
    }

    pub fn options(&self) -> &RenderOptions {
        self.options
    }

    pub fn highlighter(&self) -> &Highlighter {
        self.highlighter
    }

    pub fn push_str(&mut self, html: &str) {
        self.out.push_str(html);
    }

    /// Append `text` HTML-escaped.
    pub fn push_text(&mut self, text: &str) {
        self.out.push_str(&html_escape(text));
    }

    /// Append ` name="value"` pairs, values escaped.
    pub fn push_attrs(&mut self, attrs: &Attrs) {
        for (name, value) in attrs.iter() {
            self.out.push(' ');
            self.out.push_str(name);
            self.out.push_str("=\"");
            self.out.push_str(&html_escape(value));
            self.out.push('"');
        }
    }

    pub fn write_tokens(&mut self, tokens: &[Token]) -> Result<(), ExtensionError> {
        for token in tokens {
            self.write_token(token)?;
        }
        Ok(())
    }

    pub fn write_token(&mut self, token: &Token) -> Result<(), ExtensionError> {
        let registry = self.registry;
        match registry.rule_for(token.ty) {
            Some(rule) => rule.render(token, self),
            None => self.write_default(token),
        }
    }

    /// Built-in HTML for `token`; extension rules call this to wrap it.
    pub fn write_default(&mut self, token: &Token) -> Result<(), ExtensionError> {
        match token.ty {
            TokenType::Paragraph => self.wrap(token, "p", "\n")?,
            TokenType::Heading => {
                let tag = format!("h{}", token.level.clamp(1, 6));
                self.wrap(token, &tag, "\n")?;
            }
            TokenType::BlockQuote => {
                self.out.push_str("<blockquote");
                self.push_attrs(&token.attrs);
                self.out.push_str(">\n");
                self.write_tokens(&token.children)?;
                self.out.push_str("</blockquote>\n");
            }
            TokenType::Fence => self.write_fence(token)?,
            TokenType::CodeBlock => {
                self.out.push_str("<pre><code>");
                self.push_text(&token.content);
                self.out.push_str("</code></pre>\n");
            }
            TokenType::BulletList => self.write_list(token, "ul")?,
            TokenType::OrderedList => self.write_list(token, "ol")?,
            TokenType::ListItem => self.wrap(token, "li", "\n")?,
            TokenType::Container => {
                let mut attrs = token.attrs.clone();
                attrs.add_class(&token.info);
                self.out.push_str("<div");
                self.push_attrs(&attrs);
                self.out.push_str(">\n");
                self.write_tokens(&token.children)?;
                self.out.push_str("</div>\n");
            }
            TokenType::Table => {
                self.out.push_str("<table");
                self.push_attrs(&token.attrs);
                self.out.push('>');
                self.write_tokens(&token.children)?;
                self.out.push_str("</tbody></table>\n");
            }
            TokenType::TableHead => {
                self.in_table_head = true;
                self.out.push_str("<thead><tr>");
                self.write_tokens(&token.children)?;
                self.out.push_str("</tr></thead><tbody>\n");
                self.in_table_head = false;
            }
            TokenType::TableRow => self.wrap(token, "tr", "\n")?,
            TokenType::TableCell => {
                let tag = if self.in_table_head { "th" } else { "td" };
                self.wrap(token, tag, "")?;
            }
            TokenType::Rule => self.out.push_str("<hr />\n"),
            TokenType::HtmlBlock => self.write_html(&token.content),
            TokenType::FootnoteDefinition => {
                let number = self.footnote_number(&token.info);
                self.out.push_str("<div class=\"footnote-definition\" id=\"");
                self.push_text(&token.info);
                self.out.push_str(&format!(
                    "\"><sup class=\"footnote-definition-label\">{number}</sup>\n"
                ));
                self.write_tokens(&token.children)?;
                self.out.push_str("</div>\n");
            }
            TokenType::DefinitionList => {
                self.out.push_str("<dl>\n");
                self.write_tokens(&token.children)?;
                self.out.push_str("</dl>\n");
            }
            TokenType::DefinitionTerm => self.wrap(token, "dt", "\n")?,
            TokenType::DefinitionDetails => self.wrap(token, "dd", "\n")?,

            TokenType::Text => self.push_text(&token.content),
            TokenType::Code => {
                self.out.push_str("<code>");
                self.push_text(&token.content);
                self.out.push_str("</code>");
            }
            TokenType::InlineHtml => self.write_html(&token.content),
            TokenType::SoftBreak => {
                if self.options.breaks {
                    self.out.push_str("<br />\n");
                } else {
                    self.out.push('\n');
                }
            }
            TokenType::HardBreak => self.out.push_str("<br />\n"),
            TokenType::Emphasis => self.wrap(token, "em", "")?,
            TokenType::Strong => self.wrap(token, "strong", "")?,
            TokenType::Strikethrough => self.wrap(token, "del", "")?,
            TokenType::Superscript => self.wrap(token, "sup", "")?,
            TokenType::Subscript => self.wrap(token, "sub", "")?,
            TokenType::Link => self.wrap(token, "a", "")?,
            TokenType::Image => {
                self.out.push_str("<img");
                if let Some(src) = token.attrs.get("src") {
                    self.out.push_str(" src=\"");
                    self.push_text(src);
                    self.out.push('"');
                }
                self.out.push_str(" alt=\"");
                self.push_text(&token.plain_text());
                self.out.push('"');
                let rest: Vec<_> = token.attrs.iter().filter(|(k, _)| *k != "src").collect();
                for (name, value) in rest {
                    self.out.push_str(&format!(" {}=\"{}\"", name, html_escape(value)));
                }
                self.out.push_str(" />");
            }
            TokenType::FootnoteReference => {
                let number = self.footnote_number(&token.info);
                self.out.push_str("<sup class=\"footnote-reference\"><a href=\"#");
                self.push_text(&token.info);
                self.out.push_str(&format!("\">{number}</a></sup>"));
            }
            TokenType::TaskCheckbox => {
                self.out.push_str("<input");
                self.push_attrs(&token.attrs);
                self.out.push_str(" />");
            }
            TokenType::Label => self.wrap(token, "label", "")?,
        }
        Ok(())
    }

    /// Highlight a fence with both themes, run code-line decorators over
    /// each rendering in registration order, then assemble the blocks.
    pub fn write_fence(&mut self, token: &Token) -> Result<(), ExtensionError> {
        let registry = self.registry;
        let decorators: Vec<&dyn Extension> = registry.with_hook(Hook::CodeLine).collect();
        let highlighted = self.highlighter.highlight(&token.content, token.fence_language());

        for variant in highlighted.variants() {
            let mut lines: Vec<CodeLine> = variant
                .lines
                .iter()
                .enumerate()
                .map(|(idx, html)| CodeLine {
                    number: idx + 1,
                    html: html.clone(),
                })
                .collect();
            for decorator in &decorators {
                decorator.decorate_lines(token, &mut lines);
            }
            let bodies: Vec<String> = lines.into_iter().map(|line| line.html).collect();
            self.out
                .push_str(&variant.render(&bodies, &self.options.lang_prefix));
        }
        Ok(())
    }

    pub fn finish(self) -> String {
        self.out
    }

    fn wrap(&mut self, token: &Token, tag: &str, trailer: &str) -> Result<(), ExtensionError> {
        self.out.push('<');
        self.out.push_str(tag);
        self.push_attrs(&token.attrs);
        self.out.push('>');
        self.write_tokens(&token.children)?;
        self.out.push_str("</");
        self.out.push_str(tag);
        self.out.push('>');
        self.out.push_str(trailer);
        Ok(())
    }

    fn write_list(&mut self, token: &Token, tag: &str) -> Result<(), ExtensionError> {
        self.out.push('<');
        self.out.push_str(tag);
        self.push_attrs(&token.attrs);
        self.out.push_str(">\n");
        self.write_tokens(&token.children)?;
        self.out.push_str(&format!("</{tag}>\n"));
        Ok(())
    }

    fn write_html(&mut self, html: &str) {
        if self.options.html {
            self.out.push_str(html);
        } else {
            self.push_text(html);
        }
    }

    fn footnote_number(&mut self, label: &str) -> usize {
        let next = self.footnotes.len() + 1;
        *self.footnotes.entry(label.to_string()).or_insert(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::highlight::HighlightConfig;
    use crate::markdown::tokenizer::Tokenizer;
    use std::sync::OnceLock;

    fn highlighter() -> &'static Highlighter {
        static HL: OnceLock<Highlighter> = OnceLock::new();
        HL.get_or_init(|| Highlighter::new(&HighlightConfig::default()).unwrap())
    }

    fn render_with(markdown: &str, registry: &ExtensionRegistry, options: &RenderOptions) -> String {
        let tokens = Tokenizer::new(registry, options).tokenize(markdown);
        let mut writer = HtmlWriter::new(registry, highlighter(), options);
        writer.write_tokens(&tokens).unwrap();
        writer.finish()
    }

    fn render(markdown: &str) -> String {
        render_with(markdown, &ExtensionRegistry::new(), &RenderOptions::default())
    }

    #[test]
    fn test_basic_blocks() {
        let html = render("# Title\n\nHello *world* & `a<b`\n\n> quoted\n\n---\n");
        assert!(html.contains("<h1>Title</h1>\n"));
        assert!(html.contains("<p>Hello <em>world</em> &amp; <code>a&lt;b</code></p>\n"));
        assert!(html.contains("<blockquote>\n<p>quoted</p>\n</blockquote>\n"));
        assert!(html.contains("<hr />\n"));
    }

    #[test]
    fn test_lists_and_tables() {
        let html = render("- a\n- b\n\n| x | y |\n|---|:-:|\n| 1 | 2 |\n");
        assert!(html.contains("<ul>\n<li>a</li>\n<li>b</li>\n</ul>\n"));
        assert!(html.contains("<thead><tr><th>x</th><th style=\"text-align: center\">y</th></tr></thead><tbody>\n"));
        assert!(html.contains("<tr><td>1</td><td style=\"text-align: center\">2</td></tr>\n</tbody></table>"));
    }

    #[test]
    fn test_fence_renders_both_themes() {
        let html = render("```rust\nfn main() {}\n```\n");
        assert_eq!(html.matches("<pre class=\"highlight").count(), 2);
        assert!(html.contains("highlight-dark"));
        assert!(html.contains("highlight-light"));
        assert!(html.contains("<code class=\"language-rust\">"));
    }

    #[test]
    fn test_lang_prefix_option() {
        let options = RenderOptions {
            lang_prefix: "lang-".to_string(),
            ..RenderOptions::default()
        };
        let html = render_with("```js\nx\n```\n", &ExtensionRegistry::new(), &options);
        assert!(html.contains("<code class=\"lang-js\">"));
        assert!(!html.contains("language-js"));
    }

    #[test]
    fn test_indented_code_is_escaped() {
        let html = render("    <b>bold</b>\n");
        assert_eq!(html, "<pre><code>&lt;b&gt;bold&lt;/b&gt;\n</code></pre>\n");
    }

    #[test]
    fn test_html_option() {
        let md = "<div class=\"x\">raw</div>\n\ninline <span>html</span>\n";
        let allowed = render(md);
        assert!(allowed.contains("<div class=\"x\">raw</div>"));
        assert!(allowed.contains("<span>html</span>"));

        let options = RenderOptions {
            html: false,
            ..RenderOptions::default()
        };
        let escaped = render_with(md, &ExtensionRegistry::new(), &options);
        assert!(escaped.contains("&lt;div class=&quot;x&quot;&gt;raw&lt;/div&gt;"));
        assert!(escaped.contains("&lt;span&gt;html&lt;/span&gt;"));
    }

    #[test]
    fn test_breaks_option() {
        let with_breaks = render("one\ntwo\n");
        assert_eq!(with_breaks, "<p>one<br />\ntwo</p>\n");

        let options = RenderOptions {
            breaks: false,
            ..RenderOptions::default()
        };
        let without = render_with("one\ntwo\n", &ExtensionRegistry::new(), &options);
        assert_eq!(without, "<p>one\ntwo</p>\n");
    }

    #[test]
    fn test_footnotes_numbered_by_first_use() {
        let html = render("A[^b] and B[^a].\n\n[^a]: first\n[^b]: second\n");
        assert!(html.contains("<sup class=\"footnote-reference\"><a href=\"#b\">1</a></sup>"));
        assert!(html.contains("<sup class=\"footnote-reference\"><a href=\"#a\">2</a></sup>"));
        assert!(html.contains("id=\"a\"><sup class=\"footnote-definition-label\">2</sup>"));
    }

    #[test]
    fn test_images_use_alt_text() {
        let html = render("![A *cat*](/cat.png \"Cat\")\n");
        assert!(html.contains("<img src=\"/cat.png\" alt=\"A cat\" title=\"Cat\" />"));
    }
}
