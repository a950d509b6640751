//! Markdown source → token tree.
//!
//! Block-parse extensions get the first look at every line outside a code
//! fence. Runs of lines they don't claim are parsed by pulldown-cmark and the
//! event stream is folded into nested [`Token`]s carrying source line ranges.

use super::registry::{Extension, ExtensionRegistry, Hook};
use super::token::{Token, TokenType};
use super::RenderOptions;
use pulldown_cmark::{
    Alignment, BrokenLink, CodeBlockKind, CowStr, Event, LinkType, Options, Parser, Tag,
};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::sync::OnceLock;

enum Segment {
    Markdown(Range<usize>),
    Block {
        token: Token,
        lines: Range<usize>,
        children: Vec<Segment>,
    },
}

#[derive(Default)]
struct Definitions {
    /// Normalized label -> (destination, title).
    links: HashMap<String, (String, String)>,
    footnotes: HashSet<String>,
}

/// Case-fold and collapse whitespace, as CommonMark matches labels.
fn normalize_label(label: &str) -> String {
    label.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

pub struct Tokenizer<'a> {
    registry: &'a ExtensionRegistry,
    options: &'a RenderOptions,
}

impl<'a> Tokenizer<'a> {
    pub fn new(registry: &'a ExtensionRegistry, options: &'a RenderOptions) -> Self {
        Self { registry, options }
    }

    pub fn tokenize(&self, markdown: &str) -> Vec<Token> {
        let source = Source::new(markdown);
        let segments = self.segment(&source, 0..source.lines.len(), 0);

        let mut defs = Definitions::default();
        self.collect_definitions(&source, &segments, &mut defs);

        let mut out = Vec::new();
        self.emit(&source, segments, &defs, &mut out);
        if !defs.footnotes.is_empty() {
            resolve_footnote_refs(&mut out, &defs.footnotes);
        }
        out
    }

    /// Split `range` into markdown runs and blocks claimed by block-parse
    /// extensions.
    fn segment(&self, source: &Source<'_>, range: Range<usize>, depth: usize) -> Vec<Segment> {
        let mut out = Vec::new();
        let block_parsers: Vec<&dyn Extension> = if depth < self.options.max_nesting {
            self.registry.with_hook(Hook::Block).collect()
        } else {
            Vec::new()
        };

        let mut fence = FenceTracker::default();
        let mut chunk_start = range.start;
        let mut i = range.start;

        while i < range.end {
            if fence.observe(source.lines[i]) {
                i += 1;
                continue;
            }

            let matched = block_parsers
                .iter()
                .find_map(|ext| ext.parse_block(&source.lines[..range.end], i));

            match matched {
                Some(block) if block.end > i => {
                    if chunk_start < i {
                        out.push(Segment::Markdown(chunk_start..i));
                    }

                    let end = block.end.min(range.end);
                    let body = block.body.start.max(i)..block.body.end.min(end);
                    let children = if body.start < body.end {
                        self.segment(source, body, depth + 1)
                    } else {
                        Vec::new()
                    };
                    out.push(Segment::Block {
                        token: block.token,
                        lines: i..end,
                        children,
                    });

                    i = end;
                    chunk_start = end;
                }
                _ => i += 1,
            }
        }

        if chunk_start < range.end {
            out.push(Segment::Markdown(chunk_start..range.end));
        }
        out
    }

    /// Link reference and footnote definitions apply to the whole document,
    /// not just the markdown run they appear in.
    fn collect_definitions(&self, source: &Source<'_>, segments: &[Segment], defs: &mut Definitions) {
        for segment in segments {
            match segment {
                Segment::Markdown(lines) => {
                    let chunk = &source.text[source.byte_range(lines.clone())];
                    let parser = Parser::new_ext(chunk, self.parser_options());
                    for (label, def) in parser.reference_definitions().iter() {
                        let title = def.title.as_ref().map(|t| t.to_string()).unwrap_or_default();
                        defs.links
                            .entry(normalize_label(label))
                            .or_insert_with(|| (def.dest.to_string(), title));
                    }
                    for event in parser {
                        if let Event::Start(Tag::FootnoteDefinition(label)) = event {
                            defs.footnotes.insert(normalize_label(&label));
                        }
                    }
                }
                Segment::Block { children, .. } => self.collect_definitions(source, children, defs),
            }
        }
    }

    fn emit(&self, source: &Source<'_>, segments: Vec<Segment>, defs: &Definitions, out: &mut Vec<Token>) {
        for segment in segments {
            match segment {
                Segment::Markdown(lines) => self.parse_markdown(source, lines, defs, out),
                Segment::Block {
                    mut token,
                    lines,
                    children,
                } => {
                    self.emit(source, children, defs, &mut token.children);
                    token.lines = Some(lines);
                    out.push(token);
                }
            }
        }
    }

    fn parser_options(&self) -> Options {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
        if self.options.typographer {
            options.insert(Options::ENABLE_SMART_PUNCTUATION);
        }
        // Task list markers are left as text for the task-list extension.
        options
    }

    fn parse_markdown(
        &self,
        source: &Source<'_>,
        lines: Range<usize>,
        defs: &Definitions,
        out: &mut Vec<Token>,
    ) {
        if lines.start >= lines.end {
            return;
        }
        let bytes = source.byte_range(lines);
        let base = bytes.start;
        let chunk = &source.text[bytes];

        let mut stack: Vec<Token> = Vec::new();
        let mut table = TableState::default();

        // References defined in another run resolve through the callback.
        let mut resolve = |link: BrokenLink<'_>| {
            defs.links
                .get(&normalize_label(&link.reference))
                .map(|(dest, title)| (CowStr::from(dest.clone()), CowStr::from(title.clone())))
        };
        let parser =
            Parser::new_with_broken_link_callback(chunk, self.parser_options(), Some(&mut resolve));

        for (event, span) in parser.into_offset_iter() {
            let lines = source.line_span(base + span.start..base + span.end);
            match event {
                Event::Start(tag) => {
                    let mut token = open_tag(tag, &mut table);
                    token.lines = Some(lines);
                    stack.push(token);
                }
                Event::End(_) => {
                    if let Some(token) = stack.pop() {
                        push_token(&mut stack, out, token);
                    }
                }
                Event::Text(text) => match stack.last_mut() {
                    Some(top) if top.ty.is_raw() => top.content.push_str(&text),
                    _ => push_token(&mut stack, out, leaf(TokenType::Text, &text, lines)),
                },
                Event::Html(html) => match stack.last_mut() {
                    Some(top) if top.ty == TokenType::HtmlBlock => top.content.push_str(&html),
                    _ => push_token(&mut stack, out, leaf(TokenType::HtmlBlock, &html, lines)),
                },
                Event::Code(code) => push_token(&mut stack, out, leaf(TokenType::Code, &code, lines)),
                Event::InlineMath(math) | Event::DisplayMath(math) => {
                    push_token(&mut stack, out, leaf(TokenType::Code, &math, lines))
                }
                Event::InlineHtml(html) => {
                    push_token(&mut stack, out, leaf(TokenType::InlineHtml, &html, lines))
                }
                Event::FootnoteReference(label) => {
                    let mut token = leaf(TokenType::FootnoteReference, "", lines);
                    token.info = label.to_string();
                    push_token(&mut stack, out, token);
                }
                Event::SoftBreak => push_token(&mut stack, out, leaf(TokenType::SoftBreak, "", lines)),
                Event::HardBreak => push_token(&mut stack, out, leaf(TokenType::HardBreak, "", lines)),
                Event::Rule => push_token(&mut stack, out, leaf(TokenType::Rule, "", lines)),
                Event::TaskListMarker(checked) => {
                    let mut token = leaf(TokenType::TaskCheckbox, "", lines);
                    token.attrs.set("type", "checkbox");
                    token.attrs.set("disabled", "");
                    if checked {
                        token.attrs.set("checked", "");
                    }
                    push_token(&mut stack, out, token);
                }
            }
        }

        while let Some(token) = stack.pop() {
            push_token(&mut stack, out, token);
        }
    }
}

#[derive(Default)]
struct TableState {
    aligns: Vec<Alignment>,
    cell: usize,
}

fn open_tag(tag: Tag<'_>, table: &mut TableState) -> Token {
    match tag {
        Tag::Paragraph => Token::new(TokenType::Paragraph),
        Tag::Heading {
            level,
            id,
            classes,
            attrs,
        } => {
            let mut token = Token::new(TokenType::Heading);
            token.level = level as u8;
            if let Some(id) = id {
                token.attrs.set("id", id.to_string());
            }
            for class in classes {
                token.attrs.add_class(&class);
            }
            for (key, value) in attrs {
                token
                    .attrs
                    .set(key.to_string(), value.map(|v| v.to_string()).unwrap_or_default());
            }
            token
        }
        Tag::BlockQuote(_) => Token::new(TokenType::BlockQuote),
        Tag::CodeBlock(CodeBlockKind::Fenced(info)) => Token {
            info: info.to_string(),
            ..Token::new(TokenType::Fence)
        },
        Tag::CodeBlock(CodeBlockKind::Indented) => Token::new(TokenType::CodeBlock),
        Tag::HtmlBlock => Token::new(TokenType::HtmlBlock),
        Tag::List(Some(start)) => {
            let mut token = Token::new(TokenType::OrderedList);
            if start != 1 {
                token.attrs.set("start", start.to_string());
            }
            token
        }
        Tag::List(None) => Token::new(TokenType::BulletList),
        Tag::Item => Token::new(TokenType::ListItem),
        Tag::FootnoteDefinition(label) => Token {
            info: label.to_string(),
            ..Token::new(TokenType::FootnoteDefinition)
        },
        Tag::DefinitionList => Token::new(TokenType::DefinitionList),
        Tag::DefinitionListTitle => Token::new(TokenType::DefinitionTerm),
        Tag::DefinitionListDefinition => Token::new(TokenType::DefinitionDetails),
        Tag::Table(aligns) => {
            table.aligns = aligns;
            Token::new(TokenType::Table)
        }
        Tag::TableHead => {
            table.cell = 0;
            Token::new(TokenType::TableHead)
        }
        Tag::TableRow => {
            table.cell = 0;
            Token::new(TokenType::TableRow)
        }
        Tag::TableCell => {
            let mut token = Token::new(TokenType::TableCell);
            let align = match table.aligns.get(table.cell) {
                Some(Alignment::Left) => Some("left"),
                Some(Alignment::Center) => Some("center"),
                Some(Alignment::Right) => Some("right"),
                _ => None,
            };
            if let Some(align) = align {
                token.attrs.set("style", format!("text-align: {align}"));
            }
            table.cell += 1;
            token
        }
        Tag::Emphasis => Token::new(TokenType::Emphasis),
        Tag::Strong => Token::new(TokenType::Strong),
        Tag::Strikethrough => Token::new(TokenType::Strikethrough),
        Tag::Superscript => Token::new(TokenType::Superscript),
        Tag::Subscript => Token::new(TokenType::Subscript),
        Tag::Link {
            link_type,
            dest_url,
            title,
            ..
        } => {
            let href = if link_type == LinkType::Email && !dest_url.starts_with("mailto:") {
                format!("mailto:{dest_url}")
            } else {
                dest_url.to_string()
            };
            let mut token = Token::new(TokenType::Link).with_attr("href", href);
            if !title.is_empty() {
                token.attrs.set("title", title.to_string());
            }
            token
        }
        Tag::Image { dest_url, title, .. } => {
            let mut token = Token::new(TokenType::Image).with_attr("src", dest_url.to_string());
            if !title.is_empty() {
                token.attrs.set("title", title.to_string());
            }
            token
        }
        // Metadata blocks are not enabled; front matter is split off before
        // the pipeline runs.
        Tag::MetadataBlock(_) => Token::new(TokenType::CodeBlock),
    }
}

fn leaf(ty: TokenType, content: &str, lines: Range<usize>) -> Token {
    Token {
        content: content.to_string(),
        lines: Some(lines),
        ..Token::new(ty)
    }
}

/// Attach `token` to the innermost open token, merging adjacent text.
fn push_token(stack: &mut [Token], out: &mut Vec<Token>, token: Token) {
    let target = match stack.last_mut() {
        Some(parent) => &mut parent.children,
        None => out,
    };

    if token.ty == TokenType::Text {
        if let Some(last) = target.last_mut() {
            if last.ty == TokenType::Text {
                last.content.push_str(&token.content);
                if let (Some(a), Some(b)) = (&last.lines, &token.lines) {
                    last.lines = Some(a.start.min(b.start)..a.end.max(b.end));
                }
                return;
            }
        }
    }
    target.push(token);
}

fn footnote_ref_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[\^([^\]\s]+)\]").expect("valid regex"))
}

/// Turn `[^label]` text into footnote references when the definition lives
/// in a different markdown run than the reference.
fn resolve_footnote_refs(tokens: &mut Vec<Token>, labels: &HashSet<String>) {
    let mut i = 0;
    while i < tokens.len() {
        if tokens[i].ty != TokenType::Text {
            resolve_footnote_refs(&mut tokens[i].children, labels);
            i += 1;
            continue;
        }
        match split_footnote_refs(&tokens[i], labels) {
            Some(parts) => {
                let n = parts.len();
                tokens.splice(i..i + 1, parts);
                i += n;
            }
            None => i += 1,
        }
    }
}

fn split_footnote_refs(text: &Token, labels: &HashSet<String>) -> Option<Vec<Token>> {
    let mut parts = Vec::new();
    let mut last = 0;
    for caps in footnote_ref_regex().captures_iter(&text.content) {
        let (Some(whole), Some(label)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if !labels.contains(&normalize_label(label.as_str())) {
            continue;
        }
        if whole.start() > last {
            parts.push(Token {
                lines: text.lines.clone(),
                ..Token::text(&text.content[last..whole.start()])
            });
        }
        parts.push(Token {
            info: label.as_str().to_string(),
            lines: text.lines.clone(),
            ..Token::new(TokenType::FootnoteReference)
        });
        last = whole.end();
    }
    if parts.is_empty() {
        return None;
    }
    if last < text.content.len() {
        parts.push(Token {
            lines: text.lines.clone(),
            ..Token::text(&text.content[last..])
        });
    }
    Some(parts)
}

/// Line table over the whole document.
struct Source<'s> {
    text: &'s str,
    starts: Vec<usize>,
    lines: Vec<&'s str>,
}

impl<'s> Source<'s> {
    fn new(text: &'s str) -> Self {
        let mut starts = Vec::new();
        let mut lines = Vec::new();
        let mut offset = 0;
        for raw in text.split_inclusive('\n') {
            starts.push(offset);
            lines.push(raw.trim_end_matches(|c: char| c == '\n' || c == '\r'));
            offset += raw.len();
        }
        Self {
            text,
            starts,
            lines,
        }
    }

    fn byte_range(&self, lines: Range<usize>) -> Range<usize> {
        let start = self.starts.get(lines.start).copied().unwrap_or(self.text.len());
        let end = self.starts.get(lines.end).copied().unwrap_or(self.text.len());
        start..end
    }

    fn line_of(&self, offset: usize) -> usize {
        self.starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1)
    }

    fn line_span(&self, bytes: Range<usize>) -> Range<usize> {
        let start = self.line_of(bytes.start);
        let end = if bytes.end > bytes.start {
            self.line_of(bytes.end - 1) + 1
        } else {
            start + 1
        };
        start..end
    }
}

/// Tracks whether lines are inside a ``` / ~~~ code fence so block-parse
/// extensions never see fenced code.
#[derive(Debug, Default)]
pub(crate) struct FenceTracker {
    open: Option<(char, usize)>,
}

impl FenceTracker {
    /// Feed the next line; true when the line belongs to a fence (including
    /// its opening and closing lines).
    pub(crate) fn observe(&mut self, line: &str) -> bool {
        let trimmed = line.trim_start_matches(' ');
        let indent = line.len() - trimmed.len();

        match self.open {
            Some((marker, len)) => {
                let run = trimmed.chars().take_while(|&c| c == marker).count();
                if indent <= 3 && run >= len && trimmed[run * marker.len_utf8()..].trim().is_empty() {
                    self.open = None;
                }
                true
            }
            None => {
                if indent > 3 {
                    return false;
                }
                for marker in ['`', '~'] {
                    let run = trimmed.chars().take_while(|&c| c == marker).count();
                    if run >= 3 {
                        if marker == '`' && trimmed[run..].contains('`') {
                            return false;
                        }
                        self.open = Some((marker, run));
                        return true;
                    }
                }
                false
            }
        }
    }

    pub(crate) fn is_open(&self) -> bool {
        self.open.is_some()
    }
}
