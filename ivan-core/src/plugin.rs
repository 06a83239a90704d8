use std::sync::LazyLock;

use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

use crate::error::PublishError;
use crate::markdown::PageElement;

// Initialize syntax highlighting resources once
static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

pub const DEFAULT_SYNTAX_THEME: &str = "base16-ocean.dark";

pub type PluginError = Box<dyn std::error::Error + Send + Sync>;

/// A named transform over the parsed Markdown of every item, page and intro.
///
/// Plugins run in the order they were added to the publisher, each seeing the
/// output of the previous one.
pub trait Plugin {
    fn name(&self) -> &str;

    fn transform(&self, elements: Vec<PageElement>) -> Result<Vec<PageElement>, PluginError>;
}

/// Replaces fenced code blocks with syntect-highlighted HTML.
pub struct SyntaxHighlight {
    theme: String,
}

impl SyntaxHighlight {
    pub fn new() -> Self {
        Self::with_theme(DEFAULT_SYNTAX_THEME)
    }

    pub fn with_theme<S: Into<String>>(theme: S) -> Self {
        Self {
            theme: theme.into(),
        }
    }

    /// Names accepted by `with_theme`, sorted.
    pub fn available_themes() -> Vec<&'static str> {
        THEME_SET.themes.keys().map(String::as_str).collect()
    }

    fn highlight(&self, theme: &syntect::highlighting::Theme, language: &str, code: &str) -> Option<String> {
        let syntax = SYNTAX_SET.find_syntax_by_token(language).or_else(|| {
            // Fallback mappings for languages missing from the default set
            match language {
                "nix" => SYNTAX_SET.find_syntax_by_name("JavaScript"),
                "toml" => SYNTAX_SET.find_syntax_by_name("YAML"),
                "terraform" | "hcl" => SYNTAX_SET.find_syntax_by_name("JavaScript"),
                _ => None,
            }
        })?;

        match highlighted_html_for_string(code, &SYNTAX_SET, syntax, theme) {
            Ok(html) => Some(html),
            Err(e) => {
                log::warn!("Could not highlight {} code block: {}", language, e);
                None
            }
        }
    }
}

impl Default for SyntaxHighlight {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for SyntaxHighlight {
    fn name(&self) -> &str {
        "syntax-highlight"
    }

    fn transform(&self, elements: Vec<PageElement>) -> Result<Vec<PageElement>, PluginError> {
        let theme = THEME_SET
            .themes
            .get(&self.theme)
            .ok_or_else(|| {
                format!(
                    "unknown syntax theme '{}', expected one of: {}",
                    self.theme,
                    Self::available_themes().join(", ")
                )
            })?;

        Ok(self.highlight_elements(theme, elements))
    }
}

impl SyntaxHighlight {
    fn highlight_elements(
        &self,
        theme: &syntect::highlighting::Theme,
        elements: Vec<PageElement>,
    ) -> Vec<PageElement> {
        elements
            .into_iter()
            .map(|element| match element {
                PageElement::CodeBlock {
                    language: Some(language),
                    content,
                } => match self.highlight(theme, &language, &content) {
                    Some(html) => PageElement::Html { content: html },
                    None => PageElement::CodeBlock {
                        language: Some(language),
                        content,
                    },
                },
                PageElement::BlockQuote { content } => PageElement::BlockQuote {
                    content: self.highlight_elements(theme, content),
                },
                PageElement::List { items, start } => PageElement::List {
                    items: items
                        .into_iter()
                        .map(|mut item| {
                            item.blocks = self.highlight_elements(theme, item.blocks);
                            item
                        })
                        .collect(),
                    start,
                },
                other => other,
            })
            .collect()
    }
}

/// Runs `plugins` over `elements` in list order.
pub fn apply_all(
    plugins: &[Box<dyn Plugin>],
    elements: Vec<PageElement>,
) -> Result<Vec<PageElement>, PublishError> {
    plugins.iter().try_fold(elements, |elements, plugin| {
        plugin
            .transform(elements)
            .map_err(|e| PublishError::plugin(plugin.name(), e))
    })
}
