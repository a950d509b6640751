//! CLI command implementations.

pub mod build;
pub mod init;
pub mod render;
pub mod themes;

pub use build::{build_site, BuildOptions};
pub use init::init_project;
pub use render::render_file;
pub use themes::list_themes;

use anyhow::{bail, Context, Result};
use blogmark_core::config::DEFAULT_CONFIG_FILE;
use blogmark_core::Config;
use std::path::Path;

/// Load the config file; a missing default `blogmark.yml` means stock settings.
pub(crate) fn load_config(config_path: &Path) -> Result<Config> {
    if config_path.exists() {
        tracing::info!("Loading config from {:?}", config_path);
        return Config::from_file(config_path).context("Failed to load configuration");
    }
    if config_path == Path::new(DEFAULT_CONFIG_FILE) {
        tracing::debug!("No {} found; using defaults", DEFAULT_CONFIG_FILE);
        return Ok(Config::default());
    }
    bail!("Config file {:?} not found", config_path)
}
