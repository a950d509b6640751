//! Init command implementation.

use anyhow::{Context, Result};
use blogmark_core::config::DEFAULT_CONFIG_FILE;
use std::fs;
use std::path::Path;

const DEFAULT_CONFIG: &str = include_str!("../../../blogmark.yml.example");

/// Initialize a new blogmark project
pub fn init_project(path: Option<&Path>) -> Result<()> {
    let root = path.unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(root).with_context(|| format!("Failed to create {:?}", root))?;

    write_config(root)?;
    scaffold_content(root)?;

    println!("✓ blogmark initialized in {:?}", root);
    println!("  - Edit {} to set the site URL and extensions", DEFAULT_CONFIG_FILE);
    println!("  - Write pages in content/, then run `blogmark build`");
    Ok(())
}

fn write_config(root: &Path) -> Result<()> {
    let config_path = root.join(DEFAULT_CONFIG_FILE);
    if config_path.exists() {
        println!("{} already exists at {:?}", DEFAULT_CONFIG_FILE, config_path);
        return Ok(());
    }

    fs::write(&config_path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {:?}", config_path))?;
    println!("Created {:?}", config_path);
    Ok(())
}

fn scaffold_content(root: &Path) -> Result<()> {
    let content = root.join("content");
    fs::create_dir_all(&content).with_context(|| format!("Failed to create {:?}", content))?;

    let sample = content.join("index.md");
    if !sample.exists() {
        fs::write(&sample, SAMPLE_PAGE).with_context(|| format!("Failed to write {:?}", sample))?;
        println!("Created {:?}", sample);
    }
    Ok(())
}

const SAMPLE_PAGE: &str = r#"---
title: Hello blogmark
date: 2025-01-01
meta:
  - name: description
    content: A first page
  - name: keywords
    content: blogmark, intro
---

# Hello blogmark

Headings get anchors, and links to other sites open in a new tab: https://example.org

::: tip
Containers take a kind and an optional title.
:::

```rust {2}
fn main() {
    println!("this line is highlighted");
}
```
"#;
