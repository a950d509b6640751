//! Themes command implementation.

use super::load_config;
use anyhow::Result;
use blogmark_core::markdown::highlight::{available_languages, available_themes};
use std::path::Path;

/// Print the bundled highlight themes, marking the configured pair, and the
/// language tags.
pub fn list_themes(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let dark = config.highlight.dark.as_str();
    let light = config.highlight.light.as_str();

    let themes = available_themes();
    println!("Themes:");
    for theme in &themes {
        println!("  {theme}{}", marker(theme, dark, light));
    }
    // `.tmTheme` files from the config are not part of the bundled set.
    for custom in [dark, light] {
        if !themes.iter().any(|t| t == custom) {
            println!("  {custom}{}", marker(custom, dark, light));
        }
    }

    println!();
    println!("Languages:");
    for (name, tokens) in available_languages() {
        if tokens.is_empty() {
            println!("  {name}");
        } else {
            println!("  {name}: {}", tokens.join(", "));
        }
    }
    Ok(())
}

fn marker(theme: &str, dark: &str, light: &str) -> &'static str {
    match (theme == dark, theme == light) {
        (true, true) => " (configured dark, light)",
        (true, false) => " (configured dark)",
        (false, true) => " (configured light)",
        (false, false) => "",
    }
}
