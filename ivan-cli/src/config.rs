use anyhow::Result;
use config::{Config as ConfigBuilder, Environment, File};
use ivan_core::plugin::DEFAULT_SYNTAX_THEME;
use ivan_core::publish::{DEFAULT_CONTENT_DIR, DEFAULT_FEED_ITEMS, DEFAULT_OUTPUT_DIR, DEFAULT_RESOURCES_DIR};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CONFIG_FILE: &str = "Ivan.toml";

/// Where to read content from and write the site to.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BuildConfig {
    /// Folder of section folders and markdown files
    pub content: String,
    /// Folder the generated site is written to
    pub output: String,
    /// Static files copied verbatim into the output
    pub resources: String,
    /// syntect theme used by the syntax highlighter
    pub syntax_theme: String,
    /// Number of items in the RSS feed
    pub feed_items: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            content: DEFAULT_CONTENT_DIR.to_string(),
            output: DEFAULT_OUTPUT_DIR.to_string(),
            resources: DEFAULT_RESOURCES_DIR.to_string(),
            syntax_theme: DEFAULT_SYNTAX_THEME.to_string(),
            feed_items: DEFAULT_FEED_ITEMS,
        }
    }
}

impl BuildConfig {
    /// Load configuration with cascading precedence:
    /// 1. Environment variables (IVAN_*, highest priority)
    /// 2. Configuration file
    /// 3. Defaults (lowest priority)
    pub fn load<P: AsRef<Path>>(config_file: P) -> Result<Self> {
        let config_file = config_file.as_ref();
        let mut builder = ConfigBuilder::builder();

        builder = builder.add_source(ConfigBuilder::try_from(&Self::default())?);

        if config_file.exists() {
            builder = builder.add_source(File::from(config_file));
        }

        builder = builder.add_source(
            Environment::with_prefix("IVAN")
                .prefix_separator("_")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = BuildConfig::default();
        assert_eq!(config.content, "Content");
        assert_eq!(config.output, "Output");
        assert_eq!(config.resources, "Resources");
        assert_eq!(config.syntax_theme, "base16-ocean.dark");
        assert_eq!(config.feed_items, 20);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = BuildConfig::load(tmp.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config.output, "Output");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        std::fs::write(&path, "output = \"public\"\nfeed_items = 5\n").unwrap();

        let config = BuildConfig::load(&path).unwrap();
        assert_eq!(config.output, "public");
        assert_eq!(config.feed_items, 5);
        // Should still have defaults for non-overridden values
        assert_eq!(config.content, "Content");
    }
}
