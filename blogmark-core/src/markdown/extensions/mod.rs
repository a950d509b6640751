//! Shipped syntax extensions and their configuration.
//!
//! Extensions are listed in `blogmark.yml` under `extensions:`, each entry
//! tagged by `name`. The list order is the registration order.

pub mod container;
pub mod heading;
pub mod line_highlight;
pub mod line_numbers;
pub mod links;
pub mod pre_wrapper;
pub mod task_list;

use super::registry::{Extension, ExtensionRegistry, RegistryError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use container::{ContainerOptions, Containers};
pub use heading::{AnchorPlacement, HeadingAnchors, HeadingOptions};
pub use line_highlight::{LineHighlight, LineHighlightOptions};
pub use line_numbers::{LineNumbers, LineNumbersOptions};
pub use links::{ExternalLinks, LinksOptions};
pub use pre_wrapper::{PreWrapper, PreWrapperOptions};
pub use task_list::{TaskList, TaskListOptions};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "kebab-case")]
pub enum ExtensionConfig {
    LineHighlight(LineHighlightOptions),
    PreWrapper(PreWrapperOptions),
    LineNumbers(LineNumbersOptions),
    Container(ContainerOptions),
    Heading(HeadingOptions),
    TaskList(TaskListOptions),
    Links(LinksOptions),
}

impl ExtensionConfig {
    pub fn name(&self) -> &'static str {
        match self {
            ExtensionConfig::LineHighlight(_) => line_highlight::NAME,
            ExtensionConfig::PreWrapper(_) => pre_wrapper::NAME,
            ExtensionConfig::LineNumbers(_) => line_numbers::NAME,
            ExtensionConfig::Container(_) => container::NAME,
            ExtensionConfig::Heading(_) => heading::NAME,
            ExtensionConfig::TaskList(_) => task_list::NAME,
            ExtensionConfig::Links(_) => links::NAME,
        }
    }

    /// Validate the options and instantiate the extension.
    ///
    /// `site_url` is the configured site URL, used to tell internal links
    /// from external ones.
    pub fn build(&self, site_url: Option<&str>) -> Result<Arc<dyn Extension>, RegistryError> {
        let extension: Arc<dyn Extension> = match self {
            ExtensionConfig::LineHighlight(opts) => Arc::new(LineHighlight::new(opts.clone())?),
            ExtensionConfig::PreWrapper(opts) => Arc::new(PreWrapper::new(opts.clone())?),
            ExtensionConfig::LineNumbers(opts) => Arc::new(LineNumbers::new(opts.clone())?),
            ExtensionConfig::Container(opts) => Arc::new(Containers::new(opts.clone())?),
            ExtensionConfig::Heading(opts) => Arc::new(HeadingAnchors::new(opts.clone())?),
            ExtensionConfig::TaskList(opts) => Arc::new(TaskList::new(opts.clone())),
            ExtensionConfig::Links(opts) => Arc::new(ExternalLinks::new(opts.clone(), site_url)?),
        };
        Ok(extension)
    }
}

/// The blog's stock extension order.
pub fn default_extensions() -> Vec<ExtensionConfig> {
    vec![
        ExtensionConfig::LineHighlight(LineHighlightOptions::default()),
        ExtensionConfig::PreWrapper(PreWrapperOptions::default()),
        ExtensionConfig::LineNumbers(LineNumbersOptions::default()),
        ExtensionConfig::Container(ContainerOptions::default()),
        ExtensionConfig::Heading(HeadingOptions::default()),
        ExtensionConfig::TaskList(TaskListOptions::default()),
        ExtensionConfig::Links(LinksOptions::default()),
    ]
}

/// Build a registry from configuration entries, in order.
pub fn build_registry(
    configs: &[ExtensionConfig],
    site_url: Option<&str>,
) -> Result<ExtensionRegistry, RegistryError> {
    let mut registry = ExtensionRegistry::new();
    for config in configs {
        registry.register_arc(config.build(site_url)?)?;
    }
    Ok(registry)
}

/// Reject option values that end up inside a quoted HTML attribute.
pub(crate) fn check_class(
    extension: &'static str,
    field: &str,
    value: &str,
) -> Result<(), RegistryError> {
    if value.contains(['"', '<', '>']) {
        return Err(RegistryError::InvalidOptions {
            extension,
            reason: format!("`{field}` must not contain quotes or angle brackets"),
        });
    }
    Ok(())
}
