//! Token tree produced by the tokenizer and consumed by extensions and the
//! renderer.

use serde::Serialize;
use std::ops::Range;

/// Kind of a token. Data that varies per kind lives on [`Token`] itself
/// (`level`, `content`, `info`, `attrs`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    // Blocks
    Paragraph,
    Heading,
    BlockQuote,
    /// Fenced code block; `info` holds the info string, `content` the code.
    Fence,
    /// Indented code block.
    CodeBlock,
    BulletList,
    OrderedList,
    ListItem,
    /// Custom `::: kind` block; `info` is the kind, `content` the title.
    Container,
    Table,
    TableHead,
    TableRow,
    TableCell,
    Rule,
    HtmlBlock,
    FootnoteDefinition,
    DefinitionList,
    DefinitionTerm,
    DefinitionDetails,

    // Inlines
    Text,
    Code,
    InlineHtml,
    SoftBreak,
    HardBreak,
    Emphasis,
    Strong,
    Strikethrough,
    Superscript,
    Subscript,
    Link,
    Image,
    FootnoteReference,
    TaskCheckbox,
    Label,
}

impl TokenType {
    pub fn is_block(self) -> bool {
        matches!(
            self,
            TokenType::Paragraph
                | TokenType::Heading
                | TokenType::BlockQuote
                | TokenType::Fence
                | TokenType::CodeBlock
                | TokenType::BulletList
                | TokenType::OrderedList
                | TokenType::ListItem
                | TokenType::Container
                | TokenType::Table
                | TokenType::TableHead
                | TokenType::TableRow
                | TokenType::TableCell
                | TokenType::Rule
                | TokenType::HtmlBlock
                | TokenType::FootnoteDefinition
                | TokenType::DefinitionList
                | TokenType::DefinitionTerm
                | TokenType::DefinitionDetails
        )
    }

    pub fn is_inline(self) -> bool {
        !self.is_block()
    }

    /// Tokens whose text lives in `content` rather than in children.
    pub fn is_raw(self) -> bool {
        matches!(
            self,
            TokenType::Fence | TokenType::CodeBlock | TokenType::HtmlBlock
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TokenType::Paragraph => "paragraph",
            TokenType::Heading => "heading",
            TokenType::BlockQuote => "blockquote",
            TokenType::Fence => "fence",
            TokenType::CodeBlock => "code_block",
            TokenType::BulletList => "bullet_list",
            TokenType::OrderedList => "ordered_list",
            TokenType::ListItem => "list_item",
            TokenType::Container => "container",
            TokenType::Table => "table",
            TokenType::TableHead => "table_head",
            TokenType::TableRow => "table_row",
            TokenType::TableCell => "table_cell",
            TokenType::Rule => "rule",
            TokenType::HtmlBlock => "html_block",
            TokenType::FootnoteDefinition => "footnote_definition",
            TokenType::DefinitionList => "definition_list",
            TokenType::DefinitionTerm => "definition_term",
            TokenType::DefinitionDetails => "definition_details",
            TokenType::Text => "text",
            TokenType::Code => "code",
            TokenType::InlineHtml => "inline_html",
            TokenType::SoftBreak => "soft_break",
            TokenType::HardBreak => "hard_break",
            TokenType::Emphasis => "emphasis",
            TokenType::Strong => "strong",
            TokenType::Strikethrough => "strikethrough",
            TokenType::Superscript => "superscript",
            TokenType::Subscript => "subscript",
            TokenType::Link => "link",
            TokenType::Image => "image",
            TokenType::FootnoteReference => "footnote_reference",
            TokenType::TaskCheckbox => "task_checkbox",
            TokenType::Label => "label",
        }
    }
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Insertion-ordered HTML attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Attrs(Vec<(String, String)>);

impl Attrs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Set an attribute, replacing an existing value in place.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == name) {
            Some((_, existing)) => *existing = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let idx = self.0.iter().position(|(k, _)| k == name)?;
        Some(self.0.remove(idx).1)
    }

    /// Append one or more space separated classes to the `class` attribute.
    pub fn add_class(&mut self, class: &str) {
        let class = class.trim();
        if class.is_empty() {
            return;
        }
        match self.0.iter_mut().find(|(k, _)| k == "class") {
            Some((_, existing)) if existing.is_empty() => *existing = class.to_string(),
            Some((_, existing)) => {
                existing.push(' ');
                existing.push_str(class);
            }
            None => self.0.push(("class".to_string(), class.to_string())),
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.get("class")
            .map(|c| c.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A node of the document tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub ty: TokenType,
    /// Heading level (1-6); 0 for every other kind.
    pub level: u8,
    /// Raw text for leaf tokens (text, code, html, fence body).
    pub content: String,
    /// Fence info string, container kind or footnote label.
    pub info: String,
    pub attrs: Attrs,
    pub children: Vec<Token>,
    /// Source lines covered, 0-based and half-open.
    pub lines: Option<Range<usize>>,
}

impl Token {
    pub fn new(ty: TokenType) -> Self {
        Self {
            ty,
            level: 0,
            content: String::new(),
            info: String::new(),
            attrs: Attrs::new(),
            children: Vec::new(),
            lines: None,
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::new(TokenType::Text)
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.set(name, value);
        self
    }

    pub fn with_children(mut self, children: Vec<Token>) -> Self {
        self.children = children;
        self
    }

    /// Plain text of this token and its descendants (text and code spans).
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    /// Language tag of a fence: the info string up to whitespace, `{` or `:`.
    pub fn fence_language(&self) -> &str {
        fence_language(&self.info)
    }

    /// Depth-first, document-order visit of this token and all descendants.
    pub fn walk_mut(&mut self, f: &mut dyn FnMut(&mut Token)) {
        f(self);
        for child in &mut self.children {
            child.walk_mut(f);
        }
    }
}

fn collect_text(token: &Token, out: &mut String) {
    match token.ty {
        TokenType::Text | TokenType::Code => out.push_str(&token.content),
        TokenType::SoftBreak | TokenType::HardBreak => out.push(' '),
        _ => {
            for child in &token.children {
                collect_text(child, out);
            }
        }
    }
}

pub fn fence_language(info: &str) -> &str {
    let info = info.trim_start();
    let end = info
        .find(|c: char| c.is_whitespace() || c == '{' || c == ':')
        .unwrap_or(info.len());
    &info[..end]
}

/// Depth-first, document-order visit over a token sequence.
pub fn walk_tokens_mut(tokens: &mut [Token], f: &mut dyn FnMut(&mut Token)) {
    for token in tokens {
        token.walk_mut(f);
    }
}

/// Call `f` on every run of inline tokens, innermost runs included.
///
/// A run is the child list of any token that holds inline children. Link and
/// image labels and code are not descended into.
pub fn for_each_inline_run(tokens: &mut Vec<Token>, f: &mut dyn FnMut(&mut Vec<Token>)) {
    if tokens.iter().any(|t| t.ty.is_inline()) {
        f(tokens);
    }
    for token in tokens.iter_mut() {
        if matches!(token.ty, TokenType::Link | TokenType::Image) || token.ty.is_raw() {
            continue;
        }
        if !token.children.is_empty() {
            for_each_inline_run(&mut token.children, f);
        }
    }
}
