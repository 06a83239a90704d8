use std::path::{Path, PathBuf};

use crate::template::{TemplateError, TemplateRenderer};

/// Templates every theme has to provide.
pub const REQUIRED_TEMPLATES: &[&str] = &[
    "index.html",
    "section.html",
    "item.html",
    "page.html",
    "tags.html",
    "tag.html",
];

pub const STYLESHEET: &str = "styles.css";

const FOUNDATION_TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../themes/foundation/base.html")),
    ("index.html", include_str!("../themes/foundation/index.html")),
    ("section.html", include_str!("../themes/foundation/section.html")),
    ("item.html", include_str!("../themes/foundation/item.html")),
    ("page.html", include_str!("../themes/foundation/page.html")),
    ("tags.html", include_str!("../themes/foundation/tags.html")),
    ("tag.html", include_str!("../themes/foundation/tag.html")),
    ("item_list.html", include_str!("../themes/foundation/item_list.html")),
];

const FOUNDATION_STYLESHEET: &str = include_str!("../themes/foundation/styles.css");

#[derive(Debug, Clone)]
enum ThemeSource {
    Builtin {
        templates: &'static [(&'static str, &'static str)],
        stylesheet: &'static str,
    },
    Directory(PathBuf),
}

/// A named bundle of templates and a stylesheet.
#[derive(Debug, Clone)]
pub struct Theme {
    name: String,
    source: ThemeSource,
}

pub(crate) struct LoadedTheme {
    pub renderer: TemplateRenderer,
    pub stylesheet: Option<String>,
}

impl Theme {
    /// The built-in theme, compiled into the binary.
    pub fn foundation() -> Self {
        Self {
            name: "foundation".into(),
            source: ThemeSource::Builtin {
                templates: FOUNDATION_TEMPLATES,
                stylesheet: FOUNDATION_STYLESHEET,
            },
        }
    }

    /// A theme package on disk: tera `*.html` templates plus an optional `styles.css`.
    pub fn from_dir<P: AsRef<Path>>(name: impl Into<String>, path: P) -> Self {
        Self {
            name: name.into(),
            source: ThemeSource::Directory(path.as_ref().to_path_buf()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn load(&self) -> Result<LoadedTheme, TemplateError> {
        let (renderer, stylesheet) = match &self.source {
            ThemeSource::Builtin {
                templates,
                stylesheet,
            } => (
                TemplateRenderer::from_raw(templates)?,
                Some(stylesheet.to_string()),
            ),
            ThemeSource::Directory(dir) => {
                let renderer = TemplateRenderer::from_dir(dir)?;
                let css = dir.join(STYLESHEET);
                let stylesheet = if css.is_file() {
                    Some(std::fs::read_to_string(css)?)
                } else {
                    None
                };
                (renderer, stylesheet)
            }
        };

        renderer.require(REQUIRED_TEMPLATES)?;
        Ok(LoadedTheme {
            renderer,
            stylesheet,
        })
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::foundation()
    }
}
