//! Integration tests for the full markdown pipeline

use super::extensions::{
    build_registry, default_extensions, ContainerOptions, ExtensionConfig, LinksOptions,
};
use super::registry::Extension;
use super::token::{walk_tokens_mut, TokenType};
use super::*;
use regex::Regex;
use std::sync::{Mutex, OnceLock};

fn processor() -> &'static MarkdownProcessor {
    static PROCESSOR: OnceLock<MarkdownProcessor> = OnceLock::new();
    PROCESSOR.get_or_init(|| {
        MarkdownProcessor::with_default_extensions(Some("https://blog.example.com")).unwrap()
    })
}

fn render(markdown: &str) -> RenderedDocument {
    processor()
        .render(markdown, &RenderOptions::default())
        .unwrap()
}

/// Text of every rendered code line that carries `class`.
fn lines_with_class(html: &str, class: &str) -> Vec<String> {
    let tags = Regex::new(r"<[^>]+>").unwrap();
    let marker = format!("class=\"{class}\"");
    html.lines()
        .filter(|line| line.contains(&marker))
        .map(|line| tags.replace_all(line, "").to_string())
        .collect()
}

#[test]
fn test_duplicate_headings_get_suffixed_slugs() {
    let doc = render("# Hello World\n\n# Hello World");
    println!("HTML: {}", doc.html);

    let slugs: Vec<_> = doc.headings.iter().map(|h| h.slug.as_str()).collect();
    assert_eq!(slugs, vec!["hello-world", "hello-world-1"]);
    assert!(doc.html.contains(
        "<h1 id=\"hello-world\" tabindex=\"-1\"><a class=\"header-anchor\" href=\"#hello-world\" aria-hidden=\"true\">#</a>Hello World</h1>"
    ));
    assert!(doc.html.contains("id=\"hello-world-1\""));

    let toc = doc.toc_html.expect("headings produce a TOC");
    assert!(toc.contains("<a href=\"#hello-world-1\">Hello World</a>"));
}

#[test]
fn test_rendering_is_deterministic() {
    let markdown = "# A\n\n## A\n\n- [ ] one\n- [x] two\n\n```js {2}\nlet a;\nlet b;\n```\n\n::: tip\nhi https://x.dev\n:::\n";
    let first = render(markdown);
    for _ in 0..5 {
        assert_eq!(render(markdown), first, "Output should be byte-identical");
    }
}

#[test]
fn test_shared_processor_across_threads() {
    let markdown = "# Title\n\n```rust\nfn main() {}\n```\n";
    let expected = render(markdown).html;

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let processor = processor().clone();
            std::thread::spawn(move || {
                processor
                    .render(markdown, &RenderOptions::default())
                    .unwrap()
                    .html
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

#[test]
fn test_out_of_range_highlight_is_ignored() {
    let doc = render("```js {99}\na\nb\nc\n```\n");
    println!("HTML: {}", doc.html);
    assert!(!doc.html.contains("class=\"highlighted\""));
    assert!(!doc.html.contains("{99}"));
}

#[test]
fn test_only_requested_line_is_highlighted() {
    let doc = render("```js {2}\na\nb\nc\n```\n");
    println!("HTML: {}", doc.html);

    // One hit per theme variant.
    assert_eq!(lines_with_class(&doc.html, "highlighted"), vec!["b", "b"]);
}

#[test]
fn test_numbered_line_wraps_highlighted_line() {
    let doc = render("```js {2}\na\nb\nc\n```\n");
    assert!(doc
        .html
        .contains("<span class=\"numbered-line\" data-line=\"2\"><span class=\"highlighted\"><span class=\"line\">"));
    assert!(doc
        .html
        .contains("<span class=\"numbered-line\" data-line=\"1\"><span class=\"line\">"));
}

#[test]
fn test_fence_is_wrapped_with_both_themes() {
    let doc = render("```python\nprint('hi')\n```\n");
    let html = &doc.html;
    assert!(html.starts_with("<div class=\"language-python\">"));
    assert!(html.contains("highlight-dark"));
    assert!(html.contains("highlight-light"));
    assert!(html.contains("<code class=\"language-python\">"));
}

#[test]
fn test_unknown_language_still_renders() {
    let doc = render("```definitely-not-a-language\n<x>\n```\n");
    assert_eq!(doc.html.matches("<pre").count(), 2);
    assert!(doc.html.contains("&lt;x&gt;"));
}

#[test]
fn test_external_links_get_target_and_rel() {
    let doc = render("[ext](https://rust-lang.org) [int](/about) [same](https://blog.example.com/x) [frag](#top)");
    println!("HTML: {}", doc.html);
    assert!(doc.html.contains(
        "<a href=\"https://rust-lang.org\" target=\"_blank\" rel=\"noopener noreferrer\">ext</a>"
    ));
    assert!(doc.html.contains("<a href=\"/about\">int</a>"));
    assert!(doc.html.contains("<a href=\"https://blog.example.com/x\">same</a>"));
    assert!(doc.html.contains("<a href=\"#top\">frag</a>"));
}

#[test]
fn test_linkified_urls_are_external_links() {
    let doc = render("Visit https://crates.io today.");
    assert!(doc.html.contains(
        "<a href=\"https://crates.io\" target=\"_blank\" rel=\"noopener noreferrer\">https://crates.io</a> today."
    ));
}

#[test]
fn test_linkify_can_be_disabled() {
    let options = RenderOptions {
        linkify: false,
        ..RenderOptions::default()
    };
    let doc = processor().render("Visit https://crates.io", &options).unwrap();
    assert_eq!(doc.html, "<p>Visit https://crates.io</p>\n");
}

#[test]
fn test_containers() {
    let doc = render("::: tip\nBe careful\n:::\n\n::: details Click me\nHidden\n:::\n");
    println!("HTML: {}", doc.html);
    assert!(doc.html.contains(
        "<div class=\"tip custom-block\"><p class=\"custom-block-title\">TIP</p>\n<p>Be careful</p>\n</div>\n"
    ));
    assert!(doc.html.contains(
        "<details class=\"details custom-block\"><summary>Click me</summary>\n<p>Hidden</p>\n</details>\n"
    ));
}

#[test]
fn test_unknown_container_is_literal_text() {
    let doc = render("::: mystery\nbody\n:::\n");
    assert!(doc.html.starts_with("<p>::: mystery"));
    assert!(!doc.html.contains("custom-block"));
}

#[test]
fn test_nested_container_headings_get_ids() {
    let doc = render("::: warning Heads up\n## Inside\n\n::: info\nnested\n:::\n:::\n\n## Inside\n");
    println!("HTML: {}", doc.html);
    let slugs: Vec<_> = doc.headings.iter().map(|h| h.slug.as_str()).collect();
    assert_eq!(slugs, vec!["inside", "inside-1"]);
    assert!(doc.html.contains("<div class=\"info custom-block\">"));
    let warning = doc.html.find("warning custom-block").unwrap();
    let info = doc.html.find("info custom-block").unwrap();
    assert!(warning < info);
}

#[test]
fn test_task_lists() {
    let doc = render("- [ ] todo\n- [x] done\n- plain\n");
    println!("HTML: {}", doc.html);
    assert!(doc.html.starts_with("<ul class=\"contains-task-list\">"));
    assert!(doc.html.contains(
        "<li class=\"task-list-item\"><input class=\"task-list-item-checkbox\" type=\"checkbox\" id=\"task-item-1\" disabled=\"\" /><label for=\"task-item-1\">todo</label></li>"
    ));
    assert!(doc.html.contains("id=\"task-item-2\" checked=\"\" disabled=\"\""));
    assert!(doc.html.contains("<li>plain</li>"));
}

#[test]
fn test_token_order_is_preserved() {
    let (tokens, _) = processor()
        .parse("# One\n\npara\n\n::: tip\nx\n:::\n\n```\ncode\n```\n\n- item\n", &RenderOptions::default())
        .unwrap();
    let starts: Vec<usize> = tokens
        .iter()
        .map(|t| t.lines.as_ref().map(|r| r.start).unwrap_or(0))
        .collect();
    let mut sorted = starts.clone();
    sorted.sort();
    assert_eq!(starts, sorted);
    assert_eq!(tokens.len(), 5);
}

#[test]
fn test_malformed_markdown_is_not_an_error() {
    let doc = render("**unclosed [link](\n\n```\nunterminated fence");
    assert!(doc.html.contains("**unclosed"));
    assert!(doc.html.contains("unterminated fence"));
}

#[test]
fn test_raw_html_option() {
    let escaped = processor()
        .render(
            "<script>alert(1)</script>\n",
            &RenderOptions {
                html: false,
                ..RenderOptions::default()
            },
        )
        .unwrap();
    assert!(!escaped.html.contains("<script>"));
    assert!(escaped.html.contains("&lt;script&gt;"));
}

#[test]
fn test_registry_order_changes_wrapping() {
    // Numbers registered first end up inside the highlight wrapper.
    let mut configs: Vec<ExtensionConfig> = default_extensions();
    let numbers = configs.remove(2);
    configs.insert(0, numbers);
    let registry = build_registry(&configs, None).unwrap();
    let processor = MarkdownProcessor::new(registry, Arc::new(Highlighter::default()));
    let doc = processor
        .render("```js {1}\na\n```\n", &RenderOptions::default())
        .unwrap();
    assert!(doc
        .html
        .contains("<span class=\"highlighted\"><span class=\"numbered-line\" data-line=\"1\">"));
}

#[test]
fn test_links_without_site_url() {
    let configs = vec![ExtensionConfig::Links(LinksOptions {
        class: Some("ext".into()),
        ..LinksOptions::default()
    })];
    let registry = build_registry(&configs, None).unwrap();
    let processor = MarkdownProcessor::new(registry, Arc::new(Highlighter::default()));
    let doc = processor
        .render("[a](https://blog.example.com)", &RenderOptions::default())
        .unwrap();
    assert!(doc.html.contains("class=\"ext\""));
}

#[test]
fn test_no_extensions_renders_plain_markdown() {
    let processor = MarkdownProcessor::new(ExtensionRegistry::new(), Arc::new(Highlighter::default()));
    let doc = processor
        .render("# Plain\n\n::: tip\nx\n:::\n", &RenderOptions::default())
        .unwrap();
    assert!(doc.html.starts_with("<h1>Plain</h1>\n"));
    assert!(doc.headings.is_empty());
    assert!(doc.toc_html.is_none());
}

#[test]
fn test_reference_links_resolve_across_containers() {
    let doc = render("See [the docs][docs].\n\n::: tip\nhi\n:::\n\n[docs]: https://docs.rs\n");
    println!("HTML: {}", doc.html);
    assert!(doc.html.starts_with("<p>See <a href=\"https://docs.rs\""));
    assert!(!doc.html.contains("[docs]"));
}

#[test]
fn test_footnotes_resolve_across_containers() {
    let doc = render("Claim[^1].\n\n::: tip\nhi\n:::\n\n[^1]: Source.\n");
    println!("HTML: {}", doc.html);
    assert!(doc
        .html
        .contains("<p>Claim<sup class=\"footnote-reference\"><a href=\"#1\">1</a></sup>.</p>"));
    assert!(doc.html.contains("class=\"footnote-definition\""));
}

#[test]
fn test_unknown_inner_container_does_not_swallow_content() {
    let doc = render("::: tip\n::: mystery\n:::\nafter\n");
    println!("HTML: {}", doc.html);
    let close = doc.html.find("</div>").unwrap();
    let after = doc.html.rfind("after").unwrap();
    assert!(doc.html.contains("::: mystery"));
    assert!(after > close, "`after` must follow the tip container");
}

/// Appends a marker to every text token in a core pass.
struct Suffix {
    name: &'static str,
    suffix: &'static str,
}

impl Extension for Suffix {
    fn name(&self) -> &'static str {
        self.name
    }

    fn hooks(&self) -> Vec<Hook> {
        vec![Hook::Core]
    }

    fn transform(&self, tokens: &mut Vec<Token>, _env: &mut DocumentEnv) -> Result<(), ExtensionError> {
        walk_tokens_mut(tokens, &mut |t| {
            if t.ty == TokenType::Text {
                t.content.push_str(self.suffix);
            }
        });
        Ok(())
    }
}

/// Uppercases text in each inline run and logs the run it saw.
#[derive(Default)]
struct Upper {
    runs: Arc<Mutex<Vec<String>>>,
}

impl Extension for Upper {
    fn name(&self) -> &'static str {
        "upper"
    }

    fn hooks(&self) -> Vec<Hook> {
        vec![Hook::Inline]
    }

    fn parse_inline(&self, run: &mut Vec<Token>, _env: &mut DocumentEnv) {
        let seen: String = run
            .iter()
            .filter(|t| t.ty == TokenType::Text)
            .map(|t| t.content.as_str())
            .collect();
        if let Ok(mut runs) = self.runs.lock() {
            runs.push(seen);
        }
        for token in run.iter_mut().filter(|t| t.ty == TokenType::Text) {
            token.content = token.content.to_uppercase();
        }
    }
}

#[test]
fn test_inline_hooks_visit_nested_runs_in_registration_order() {
    let upper = Upper::default();
    let runs = Arc::clone(&upper.runs);

    let mut registry =
        build_registry(&[ExtensionConfig::Container(ContainerOptions::default())], None).unwrap();
    registry
        .register(Suffix {
            name: "before",
            suffix: "?",
        })
        .unwrap();
    registry.register(upper).unwrap();
    registry
        .register(Suffix {
            name: "after",
            suffix: "!",
        })
        .unwrap();
    let processor = MarkdownProcessor::new(registry, Arc::new(Highlighter::default()));

    let (mut tokens, _) = processor
        .parse("hello *world*\n\n::: tip\ninside\n:::\n", &RenderOptions::default())
        .unwrap();

    assert_eq!(*runs.lock().unwrap(), vec!["hello ?", "world?", "inside?"]);

    let mut texts = Vec::new();
    walk_tokens_mut(&mut tokens, &mut |t| {
        if t.ty == TokenType::Text {
            texts.push(t.content.clone());
        }
    });
    assert_eq!(texts, vec!["HELLO ?!", "WORLD?!", "INSIDE?!"]);
}
