use std::path::Path;

use serde::Serialize;
use tera::{Context, Tera};

#[derive(Debug)]
pub enum TemplateError {
    TeraError(tera::Error),
    IoError(std::io::Error),
    MissingTemplate(String),
}

impl From<tera::Error> for TemplateError {
    fn from(err: tera::Error) -> Self {
        TemplateError::TeraError(err)
    }
}

impl From<std::io::Error> for TemplateError {
    fn from(err: std::io::Error) -> Self {
        TemplateError::IoError(err)
    }
}

impl std::fmt::Display for TemplateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateError::TeraError(e) => write!(f, "Template error: {}", e),
            TemplateError::IoError(e) => write!(f, "IO error: {}", e),
            TemplateError::MissingTemplate(name) => write!(f, "Theme has no '{}' template", name),
        }
    }
}

impl std::error::Error for TemplateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TemplateError::TeraError(e) => Some(e),
            TemplateError::IoError(e) => Some(e),
            TemplateError::MissingTemplate(_) => None,
        }
    }
}

/// Tera wrapper holding the context shared by every rendered page.
pub struct TemplateRenderer {
    tera: Tera,
    global: Context,
}

impl TemplateRenderer {
    pub fn new(tera: Tera) -> Self {
        Self {
            tera,
            global: Context::new(),
        }
    }

    /// Load every `*.html` template below a theme directory
    pub fn from_dir(theme_dir: &Path) -> Result<Self, TemplateError> {
        if !theme_dir.is_dir() {
            return Err(TemplateError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("theme directory {} not found", theme_dir.display()),
            )));
        }
        let glob = theme_dir.join("**").join("*.html");
        let tera = Tera::new(&glob.to_string_lossy())?;
        Ok(Self::new(tera))
    }

    pub fn from_raw(templates: &[(&str, &str)]) -> Result<Self, TemplateError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(templates.iter().copied())?;
        Ok(Self::new(tera))
    }

    pub fn require(&self, names: &[&str]) -> Result<(), TemplateError> {
        let available: Vec<&str> = self.tera.get_template_names().collect();
        match names.iter().find(|name| !available.contains(name)) {
            Some(missing) => Err(TemplateError::MissingTemplate(missing.to_string())),
            None => Ok(()),
        }
    }

    /// Add a value visible to every template
    pub fn set_global<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) {
        self.global.insert(key, value);
    }

    /// Render a template with the global context plus page-specific values
    pub fn render(&self, template: &str, context: &Context) -> Result<String, TemplateError> {
        let mut full = self.global.clone();
        full.extend(context.clone());
        Ok(self.tera.render(template, &full)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_and_page_context() {
        let mut renderer = TemplateRenderer::from_raw(&[("t.html", "{{ site }}/{{ page }}")]).unwrap();
        renderer.set_global("site", "ivan");
        renderer.set_global("page", "global");

        let mut ctx = Context::new();
        ctx.insert("page", "local");
        assert_eq!(renderer.render("t.html", &ctx).unwrap(), "ivan/local");
    }

    #[test]
    fn test_require_reports_missing() {
        let renderer = TemplateRenderer::from_raw(&[("index.html", "")]).unwrap();
        assert!(renderer.require(&["index.html"]).is_ok());
        assert!(matches!(
            renderer.require(&["index.html", "item.html"]),
            Err(TemplateError::MissingTemplate(name)) if name == "item.html"
        ));
    }
}
