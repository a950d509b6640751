//! Configuration parsing and management.

use crate::markdown::extensions::{build_registry, default_extensions, ExtensionConfig};
use crate::markdown::highlight::{HighlightConfig, HighlightError, Highlighter};
use crate::markdown::registry::{ExtensionRegistry, RegistryError};
use crate::markdown::{RenderError, RenderOptions};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "blogmark.yml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid ignore pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid site url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Invalid build.jobs: must be at least 1")]
    InvalidJobs,

    #[error(transparent)]
    Markdown(#[from] RenderError),

    #[error(transparent)]
    Extension(#[from] RegistryError),

    #[error(transparent)]
    Highlight(#[from] HighlightError),
}

/// Main configuration struct matching the blogmark.yml schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    /// Regexes matched against content-relative paths.
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    #[serde(default)]
    pub markdown: RenderOptions,

    #[serde(default)]
    pub highlight: HighlightConfig,

    #[serde(default)]
    pub wrapper: WrapperConfig,

    /// Ordered extension list; omitted means the stock set.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<ExtensionConfig>,

    #[serde(default)]
    pub build: BuildConfig,

    // Internal: path to config file (for relative path resolution)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_title")]
    pub title: String,

    /// Canonical site URL; links to other origins count as external.
    #[serde(default)]
    pub url: Option<String>,
}

fn default_title() -> String {
    String::from("Blog")
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_content")]
    pub content: PathBuf,

    #[serde(default = "default_output")]
    pub output: PathBuf,
}

fn default_content() -> PathBuf {
    PathBuf::from("content")
}

fn default_output() -> PathBuf {
    PathBuf::from("dist")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            content: default_content(),
            output: default_output(),
        }
    }
}

/// Layout component every rendered page is wrapped in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WrapperConfig {
    #[serde(default = "default_component")]
    pub component: String,

    #[serde(default = "default_classes")]
    pub classes: String,

    #[serde(default)]
    pub include_toc: bool,
}

fn default_component() -> String {
    String::from("Markdown")
}

fn default_classes() -> String {
    String::from("post__layout !mx-auto prose dark:prose-dark")
}

impl Default for WrapperConfig {
    fn default() -> Self {
        Self {
            component: default_component(),
            classes: default_classes(),
            include_toc: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildConfig {
    /// Stop at the first failed document.
    #[serde(default)]
    pub fail_fast: bool,

    /// Parallel renders; defaults to the available parallelism.
    #[serde(default)]
    pub jobs: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site: SiteConfig::default(),
            paths: PathsConfig::default(),
            ignore_patterns: Vec::new(),
            markdown: RenderOptions::default(),
            highlight: HighlightConfig::default(),
            wrapper: WrapperConfig::default(),
            extensions: default_extensions(),
            build: BuildConfig::default(),
            config_path: None,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&contents)?;

        // Store config file path for relative path resolution
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Get the content directory, resolved relative to config file
    pub fn content_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.content)
    }

    /// Get the output directory, resolved relative to config file
    pub fn output_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.output)
    }

    /// Worker count for parallel builds.
    pub fn jobs(&self) -> usize {
        self.build.jobs.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    /// Check every setting that can be checked without touching content.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.markdown.validate()?;
        if let Some(url) = &self.site.url {
            url::Url::parse(url).map_err(|source| ConfigError::InvalidUrl {
                url: url.clone(),
                source,
            })?;
        }
        if self.build.jobs == Some(0) {
            return Err(ConfigError::InvalidJobs);
        }
        self.ignore_regexes()?;
        Ok(())
    }

    pub fn ignore_regexes(&self) -> Result<Vec<Regex>, ConfigError> {
        self.ignore_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect()
    }

    /// Instantiate the configured extensions, in order.
    pub fn extension_registry(&self) -> Result<ExtensionRegistry, ConfigError> {
        Ok(build_registry(&self.extensions, self.site.url.as_deref())?)
    }

    /// Theme settings with `.tmTheme` paths resolved against the config file.
    pub fn highlight_config(&self) -> HighlightConfig {
        let resolve = |theme: &str| {
            if theme.ends_with(".tmTheme") {
                self.resolve_path(Path::new(theme))
                    .to_string_lossy()
                    .into_owned()
            } else {
                theme.to_string()
            }
        };
        HighlightConfig {
            dark: resolve(&self.highlight.dark),
            light: resolve(&self.highlight.light),
        }
    }

    pub fn highlighter(&self) -> Result<Highlighter, ConfigError> {
        Ok(Highlighter::new(&self.highlight_config())?)
    }

    /// Resolve a path relative to the config file location
    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            return path.to_path_buf();
        }
        match self.config_path.as_deref().and_then(Path::parent) {
            Some(parent) => parent.join(path),
            None => path.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_values() {
        let config = Config::from_yaml("").unwrap();
        assert_eq!(config.site.title, "Blog");
        assert_eq!(config.paths.content, PathBuf::from("content"));
        assert_eq!(config.paths.output, PathBuf::from("dist"));
        assert_eq!(config.wrapper.component, "Markdown");
        assert_eq!(config.extensions, default_extensions());
        assert!(config.markdown.breaks);
        assert!(!config.build.fail_fast);
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
site:
  title: Notes
  url: https://notes.example.com
paths:
  content: posts
  output: public
ignore_patterns:
  - "^drafts/"
markdown:
  breaks: false
highlight:
  dark: Solarized (dark)
wrapper:
  component: Article
  include_toc: true
extensions:
  - name: heading
    symbol: "§"
  - name: links
build:
  fail_fast: true
  jobs: 2
"#;
        let config = Config::from_yaml(yaml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.site.url.as_deref(), Some("https://notes.example.com"));
        assert!(!config.markdown.breaks);
        assert_eq!(config.highlight.dark, "Solarized (dark)");
        assert_eq!(config.highlight.light, "InspiredGitHub");
        assert_eq!(config.wrapper.classes, "post__layout !mx-auto prose dark:prose-dark");
        assert!(config.wrapper.include_toc);
        assert_eq!(config.jobs(), 2);

        let registry = config.extension_registry().unwrap();
        assert_eq!(registry.names(), vec!["heading", "links"]);
    }

    #[test]
    fn test_paths_resolve_relative_to_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blogmark.yml");
        std::fs::write(&path, "paths:\n  content: src/pages\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.content_dir(), dir.path().join("src/pages"));
        assert_eq!(config.output_dir(), dir.path().join("dist"));
        assert_eq!(config.config_path(), Some(path.as_path()));
    }

    #[test]
    fn test_theme_file_resolved_relative_to_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "highlight:\n  dark: themes/night.tmTheme").unwrap();
        let config = Config::from_file(file.path()).unwrap();
        let resolved = config.highlight_config();
        let parent = file.path().parent().unwrap();
        assert_eq!(
            PathBuf::from(resolved.dark),
            parent.join("themes/night.tmTheme")
        );
        assert_eq!(resolved.light, "InspiredGitHub");
    }

    #[test]
    fn test_validation_errors() {
        let bad_pattern = Config::from_yaml("ignore_patterns: ['(']").unwrap();
        assert!(matches!(
            bad_pattern.validate(),
            Err(ConfigError::InvalidPattern { .. })
        ));

        let bad_url = Config::from_yaml("site:\n  url: not a url\n").unwrap();
        assert!(matches!(bad_url.validate(), Err(ConfigError::InvalidUrl { .. })));

        let bad_nesting = Config::from_yaml("markdown:\n  max_nesting: 0\n").unwrap();
        assert!(matches!(bad_nesting.validate(), Err(ConfigError::Markdown(_))));

        let bad_jobs = Config::from_yaml("build:\n  jobs: 0\n").unwrap();
        assert!(matches!(bad_jobs.validate(), Err(ConfigError::InvalidJobs)));
    }

    #[test]
    fn test_unknown_theme_is_fatal() {
        let config = Config::from_yaml("highlight:\n  light: No Such Theme\n").unwrap();
        assert!(matches!(
            config.highlighter(),
            Err(ConfigError::Highlight(HighlightError::UnknownTheme { .. }))
        ));
    }

    #[test]
    fn test_conflicting_extensions_are_fatal() {
        let config = Config::from_yaml("extensions:\n  - name: container\n  - name: container\n").unwrap();
        assert!(matches!(
            config.extension_registry(),
            Err(ConfigError::Extension(RegistryError::Duplicate("container")))
        ));
    }
}
