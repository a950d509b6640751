use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const CONFIG: &str = r#"
site:
  title: "Test"
  url: "https://blog.example.com"
paths:
  content: "content"
  output: "dist"
"#;

fn write(root: &Path, rel: &str, body: &str) -> std::io::Result<()> {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, body)
}

#[allow(deprecated)]
fn blogmark(dir: &Path) -> Result<Command, Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("blogmark")?;
    cmd.current_dir(dir);
    Ok(cmd)
}

#[test]
fn build_writes_pages_manifest_and_stylesheet() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write(dir.path(), "blogmark.yml", CONFIG)?;
    write(
        dir.path(),
        "content/posts/hello.md",
        "---\ntitle: Hello\ndate: 2024-03-01\ndescription: Greeting\nmeta:\n  - property: og:type\n    content: article\n---\n# Hello World\n\nSee [docs](https://docs.rs) and [home](/about).\n\n```js {2}\na\nb\nc\n```\n",
    )?;
    write(dir.path(), "content/about.md", "# About\n")?;

    blogmark(dir.path())?
        .args(["build", "--jobs", "2"])
        .assert()
        .success();

    let page = fs::read_to_string(dir.path().join("dist/posts/hello.html"))?;
    assert!(page.starts_with("<div class=\"post__layout !mx-auto prose dark:prose-dark\" data-component=\"Markdown\""));
    assert!(page.contains("id=\"hello-world\""));
    assert!(page.contains("href=\"https://docs.rs\" target=\"_blank\" rel=\"noopener noreferrer\""));
    assert!(page.contains("<a href=\"/about\">home</a>"));
    assert!(page.contains("highlight-dark"));
    assert!(page.contains("highlight-light"));
    assert!(page.contains("class=\"highlighted\""));

    assert!(dir.path().join("dist/about.html").exists());
    assert!(dir.path().join("dist/blogmark.css").exists());

    let manifest: Value = serde_json::from_str(&fs::read_to_string(dir.path().join("dist/pages.json"))?)?;
    let pages = manifest.as_array().expect("manifest is an array");
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0]["path"], "posts/hello.html");
    assert_eq!(pages[0]["title"], "Hello");
    assert_eq!(pages[0]["headings"][0]["slug"], "hello-world");
    assert_eq!(pages[0]["head"][0]["tag"], "title");
    assert_eq!(pages[0]["head"][0]["content"], "Hello");
    assert_eq!(pages[0]["head"][1]["attrs"]["name"], "description");
    assert_eq!(pages[0]["head"][1]["attrs"]["content"], "Greeting");
    assert_eq!(pages[0]["head"][2]["attrs"]["property"], "og:type");
    assert_eq!(pages[1]["path"], "about.html");

    Ok(())
}

#[test]
fn build_isolates_bad_front_matter() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write(dir.path(), "blogmark.yml", CONFIG)?;
    write(dir.path(), "content/a.md", "# Fine\n")?;
    write(dir.path(), "content/b.md", "---\ntitle: [unclosed\n---\nbody\n")?;
    write(dir.path(), "content/c.md", "# Also fine\n")?;

    blogmark(dir.path())?
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("b.md"))
        .stderr(predicate::str::contains("1 of 3 pages failed to render"));

    assert!(dir.path().join("dist/a.html").exists());
    assert!(!dir.path().join("dist/b.html").exists());
    assert!(dir.path().join("dist/c.html").exists());

    let manifest: Value = serde_json::from_str(&fs::read_to_string(dir.path().join("dist/pages.json"))?)?;
    assert_eq!(manifest.as_array().map(Vec::len), Some(2));

    Ok(())
}

#[test]
fn invalid_config_fails_before_rendering() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write(
        dir.path(),
        "blogmark.yml",
        "extensions:\n  - name: container\n  - name: container\n",
    )?;
    write(dir.path(), "content/a.md", "# Fine\n")?;

    blogmark(dir.path())?
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration"));

    assert!(!dir.path().join("dist").exists());
    Ok(())
}

#[test]
fn init_then_build() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;

    blogmark(dir.path())?
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("blogmark initialized"));

    assert!(dir.path().join("blogmark.yml").exists());
    assert!(dir.path().join("content/index.md").exists());

    blogmark(dir.path())?.arg("build").assert().success();

    let page = fs::read_to_string(dir.path().join("dist/index.html"))?;
    assert!(page.contains("custom-block"));
    assert!(page.contains("class=\"group relative\""));
    assert!(page.contains("target=\"_blank\""));

    Ok(())
}

#[test]
fn render_prints_fragment() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write(dir.path(), "post.md", "# Hello World\n\n# Hello World\n")?;

    blogmark(dir.path())?
        .args(["render", "post.md"])
        .assert()
        .success()
        .stdout(predicate::str::contains("id=\"hello-world\""))
        .stdout(predicate::str::contains("id=\"hello-world-1\""))
        .stdout(predicate::str::contains("data-component").not());

    blogmark(dir.path())?
        .args(["render", "post.md", "--wrap"])
        .assert()
        .success()
        .stdout(predicate::str::contains("data-component=\"Markdown\""));

    Ok(())
}

#[test]
fn render_json_includes_headings() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write(dir.path(), "post.md", "---\ntitle: Post\n---\n## Intro\n\ntext\n")?;

    let output = blogmark(dir.path())?
        .args(["render", "post.md", "--format", "json"])
        .output()?;
    assert!(output.status.success());

    let json: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(json["title"], "Post");
    assert_eq!(json["headings"][0]["slug"], "intro");
    assert_eq!(json["headings"][0]["level"], 2);
    assert_eq!(json["head"][0]["tag"], "title");
    assert_eq!(json["head"][0]["content"], "Post");
    assert!(json["html"].as_str().unwrap_or_default().contains("<p>text</p>"));

    Ok(())
}

#[test]
fn missing_explicit_config_is_an_error() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    blogmark(dir.path())?
        .args(["--config", "nope.yml", "build"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
    Ok(())
}

#[test]
fn themes_lists_defaults() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    blogmark(dir.path())?
        .arg("themes")
        .assert()
        .success()
        .stdout(predicate::str::contains("base16-ocean.dark (configured dark)"))
        .stdout(predicate::str::contains("InspiredGitHub (configured light)"))
        .stdout(predicate::str::contains("Rust"));
    Ok(())
}

#[test]
fn themes_marks_configured_pair() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write(
        dir.path(),
        "blogmark.yml",
        "highlight:\n  dark: \"Solarized (dark)\"\n  light: \"Solarized (light)\"\n",
    )?;
    blogmark(dir.path())?
        .arg("themes")
        .assert()
        .success()
        .stdout(predicate::str::contains("Solarized (dark) (configured dark)"))
        .stdout(predicate::str::contains("Solarized (light) (configured light)"))
        .stdout(predicate::str::contains("base16-ocean.dark (configured").not());
    Ok(())
}
