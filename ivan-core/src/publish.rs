use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Serialize;
use tera::Context;
use walkdir::WalkDir;

use crate::content::ContentScanner;
use crate::error::{PublishError, Stage};
use crate::feed;
use crate::markdown::{render_elements_to_html, slugify};
use crate::plugin::{Plugin, apply_all};
use crate::site::{Content, Item, Page};
use crate::template::TemplateRenderer;
use crate::theme::{STYLESHEET, Theme};
use crate::website::{SectionId, Website};

pub const DEFAULT_CONTENT_DIR: &str = "Content";
pub const DEFAULT_OUTPUT_DIR: &str = "Output";
pub const DEFAULT_RESOURCES_DIR: &str = "Resources";
pub const DEFAULT_FEED_ITEMS: usize = 20;

pub const FEED_FILE: &str = "feed.rss";
pub const SITEMAP_FILE: &str = "sitemap.xml";

#[derive(Debug, Serialize)]
pub struct NavItem {
    pub id: String,
    pub text: String,
    pub link: String,
}

#[derive(Debug, Serialize)]
struct TagLink {
    name: String,
    url: String,
}

#[derive(Debug, Serialize)]
struct ItemSummary {
    title: String,
    description: String,
    url: String,
    section: &'static str,
    date: String,
    date_iso: String,
    tags: Vec<TagLink>,
}

/// A rendered file waiting to be written, relative to the output folder.
#[derive(Debug)]
pub(crate) struct Artifact {
    pub path: PathBuf,
    pub contents: String,
    /// What produced the file, for collision reports.
    pub origin: String,
}

impl Artifact {
    fn new<P: Into<PathBuf>>(path: P, contents: String, origin: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            contents,
            origin: origin.into(),
        }
    }
}

/// Assembles one publishing run: a website, exactly one theme and an ordered
/// list of plugins, then `publish()` generates the site.
pub struct Publisher<'a, S: SectionId> {
    website: &'a Website<S>,
    content_dir: PathBuf,
    output_dir: PathBuf,
    resources_dir: PathBuf,
    theme: Theme,
    plugins: Vec<Box<dyn Plugin>>,
    feed_items: usize,
}

impl<'a, S: SectionId> Publisher<'a, S> {
    pub fn new(website: &'a Website<S>) -> Self {
        Self {
            website,
            content_dir: PathBuf::from(DEFAULT_CONTENT_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            resources_dir: PathBuf::from(DEFAULT_RESOURCES_DIR),
            theme: Theme::foundation(),
            plugins: Vec::new(),
            feed_items: DEFAULT_FEED_ITEMS,
        }
    }

    // Paths
    pub fn content_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.content_dir = path.as_ref().to_path_buf();
        self
    }

    pub fn output_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output_dir = path.as_ref().to_path_buf();
        self
    }

    pub fn resources_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.resources_dir = path.as_ref().to_path_buf();
        self
    }

    // Presentation
    pub fn theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    pub fn plugin<P: Plugin + 'static>(mut self, plugin: P) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    pub fn plugins(mut self, plugins: Vec<Box<dyn Plugin>>) -> Self {
        self.plugins.extend(plugins);
        self
    }

    pub fn feed_items(mut self, count: usize) -> Self {
        self.feed_items = count;
        self
    }

    /// Generate the site. Nothing is written unless every page rendered.
    pub fn publish(self) -> Result<(), PublishError> {
        info!(
            "Publishing {} with theme '{}' and {} plugin(s)",
            self.website.name(),
            self.theme.name(),
            self.plugins.len()
        );

        // CONFIGURE
        self.website.check()?;
        let loaded = self.theme.load().map_err(|e| {
            PublishError::new(
                Stage::Configuration,
                format!("could not load theme '{}'", self.theme.name()),
            )
            .with_source(e)
        })?;

        // SCAN
        let mut content = ContentScanner::<S>::new(&self.content_dir).scan()?;

        // TRANSFORM
        for plugin in &self.plugins {
            debug!("Installing plugin '{}'", plugin.name());
        }
        content.try_for_each_body(|body| {
            let elements = std::mem::take(body);
            *body = apply_all(&self.plugins, elements)?;
            Ok::<(), PublishError>(())
        })?;

        // RENDER
        let mut renderer = loaded.renderer;
        let site = SiteRenderer::new(self.website, &content, &mut renderer);
        let mut artifacts = site.render_all()?;

        if let Some(css) = loaded.stylesheet {
            artifacts.push(Artifact::new(STYLESHEET, css, "theme stylesheet"));
        }
        artifacts.push(Artifact::new(
            FEED_FILE,
            feed::rss(self.website, &content, self.feed_items),
            "feed",
        ));
        artifacts.push(Artifact::new(
            SITEMAP_FILE,
            feed::sitemap(self.website, &content),
            "sitemap",
        ));
        check_collisions(&artifacts)?;

        // WRITE
        clear_output(&self.output_dir)?;
        for artifact in &artifacts {
            write_artifact(&self.output_dir, artifact)?;
        }
        copy_resources(&self.resources_dir, &self.output_dir)?;

        info!(
            "Published {} files to {}",
            artifacts.len(),
            self.output_dir.display()
        );
        Ok(())
    }
}

impl<S: SectionId> Website<S> {
    /// Publish from the default `Content`, `Resources` and `Output` folders.
    pub fn publish(&self, theme: Theme, plugins: Vec<Box<dyn Plugin>>) -> Result<(), PublishError> {
        publish(self, theme, plugins)
    }
}

pub fn publish<S: SectionId>(
    website: &Website<S>,
    theme: Theme,
    plugins: Vec<Box<dyn Plugin>>,
) -> Result<(), PublishError> {
    Publisher::new(website).theme(theme).plugins(plugins).publish()
}

pub fn navigation<S: SectionId>(content: &Content<S>) -> Vec<NavItem> {
    content
        .sections
        .iter()
        .map(|section| NavItem {
            id: section.id.id().to_string(),
            text: section.title(),
            link: section.url(),
        })
        .collect()
}

struct SiteRenderer<'a, S: SectionId> {
    content: &'a Content<S>,
    renderer: &'a TemplateRenderer,
}

impl<'a, S: SectionId> SiteRenderer<'a, S> {
    fn new(website: &Website<S>, content: &'a Content<S>, renderer: &'a mut TemplateRenderer) -> Self {
        // Set global context once
        renderer.set_global("site", &website.meta());
        renderer.set_global("navigation", &navigation(content));
        renderer.set_global("stylesheet", STYLESHEET);
        renderer.set_global("feed", FEED_FILE);

        Self { content, renderer }
    }

    fn render_all(&self) -> Result<Vec<Artifact>, PublishError> {
        let mut artifacts = Vec::new();

        artifacts.push(self.render_home()?);

        for section in &self.content.sections {
            let mut context = page_context(&section.url(), section.id.id());
            context.insert(
                "section",
                &serde_json::json!({
                    "id": section.id.id(),
                    "title": section.title(),
                    "url": section.url(),
                    "content": section.intro.as_ref().map(|i| render_elements_to_html(&i.body)).unwrap_or_default(),
                }),
            );
            context.insert("items", &summaries(section.items.iter()));
            artifacts.push(self.render(
                "section.html",
                &context,
                PathBuf::from(section.id.id()).join("index.html"),
                format!("section '{}'", section.id.id()),
            )?);

            for item in &section.items {
                artifacts.push(self.render_item(item)?);
            }
        }

        for page in &self.content.pages {
            artifacts.push(self.render_page(page)?);
        }

        artifacts.extend(self.render_tags()?);

        Ok(artifacts)
    }

    fn render_home(&self) -> Result<Artifact, PublishError> {
        let mut context = page_context("/", "");
        let intro = self.content.home.as_ref();
        context.insert(
            "intro",
            &serde_json::json!({
                "title": intro.and_then(|i| i.title.clone()),
                "description": intro.and_then(|i| i.description.clone()),
                "content": intro.map(|i| render_elements_to_html(&i.body)).unwrap_or_default(),
            }),
        );
        context.insert("items", &summaries(self.content.items_by_date().into_iter()));

        self.render("index.html", &context, PathBuf::from("index.html"), "home page")
    }

    fn render_item(&self, item: &Item<S>) -> Result<Artifact, PublishError> {
        let mut context = page_context(&item.url(), item.section.id());
        let summary = summary(item);
        context.insert(
            "item",
            &serde_json::json!({
                "title": summary.title,
                "description": summary.description,
                "url": summary.url,
                "section": summary.section,
                "date": summary.date,
                "date_iso": summary.date_iso,
                "tags": summary.tags,
                "image": item.image,
                "content": render_elements_to_html(&item.body),
            }),
        );

        self.render("item.html", &context, item.out_path(), item.source.display().to_string())
    }

    fn render_page(&self, page: &Page) -> Result<Artifact, PublishError> {
        let mut context = page_context(&page.url(), "");
        context.insert(
            "page",
            &serde_json::json!({
                "title": page.title,
                "description": page.description,
                "url": page.url(),
                "content": render_elements_to_html(&page.body),
            }),
        );

        self.render("page.html", &context, page.out_path(), page.source.display().to_string())
    }

    fn render_tags(&self) -> Result<Vec<Artifact>, PublishError> {
        let tags = self.content.tags();
        let mut artifacts = Vec::with_capacity(tags.len() + 1);

        let listing: Vec<_> = tags
            .values()
            .map(|tag| {
                serde_json::json!({
                    "name": tag.name,
                    "url": tag.url(),
                    "count": tag.items.len(),
                })
            })
            .collect();
        let mut context = page_context("/tags/", "");
        context.insert("tags", &listing);
        artifacts.push(self.render(
            "tags.html",
            &context,
            PathBuf::from("tags/index.html"),
            "tag listing",
        )?);

        for tag in tags.values() {
            let mut context = page_context(&tag.url(), "");
            context.insert("tag", &TagLink {
                name: tag.name.clone(),
                url: tag.url(),
            });
            context.insert("items", &summaries(tag.items.iter().copied()));
            artifacts.push(self.render(
                "tag.html",
                &context,
                PathBuf::from("tags").join(&tag.slug).join("index.html"),
                format!("tag '{}'", tag.name),
            )?);
        }

        Ok(artifacts)
    }

    fn render(
        &self,
        template: &str,
        context: &Context,
        out_path: PathBuf,
        origin: impl Into<String>,
    ) -> Result<Artifact, PublishError> {
        debug!("Rendering {} with {}", out_path.display(), template);
        let html = self
            .renderer
            .render(template, context)
            .map_err(|e| PublishError::rendering(template, e).with_path(&out_path))?;
        Ok(Artifact::new(out_path, html, origin))
    }
}

fn page_context(path: &str, selected: &str) -> Context {
    let mut context = Context::new();
    context.insert("path", path);
    context.insert("selected", selected);
    context
}

fn summary<S: SectionId>(item: &Item<S>) -> ItemSummary {
    ItemSummary {
        title: item.title.clone(),
        description: item.description.clone(),
        url: item.url(),
        section: item.section.id(),
        date: item.date.format("%B %-d, %Y").to_string(),
        date_iso: item.date.format("%Y-%m-%dT%H:%M:%S").to_string(),
        tags: item
            .tags
            .iter()
            .filter_map(|name| {
                let slug = slugify(name);
                (!slug.is_empty()).then(|| TagLink {
                    name: name.clone(),
                    url: format!("/tags/{}/", slug),
                })
            })
            .collect(),
    }
}

fn summaries<'i, S: SectionId + 'i>(items: impl Iterator<Item = &'i Item<S>>) -> Vec<ItemSummary> {
    items.map(summary).collect()
}

/// Two sources rendering to the same file would silently overwrite one another.
fn check_collisions(artifacts: &[Artifact]) -> Result<(), PublishError> {
    let mut seen: HashMap<&Path, &str> = HashMap::with_capacity(artifacts.len());
    for artifact in artifacts {
        if let Some(first) = seen.insert(&artifact.path, &artifact.origin) {
            return Err(PublishError::new(
                Stage::Content,
                format!(
                    "{} and {} both produce {}",
                    first,
                    artifact.origin,
                    artifact.path.display()
                ),
            )
            .with_path(&artifact.path));
        }
    }
    Ok(())
}

/// Empty the output folder, keeping a `.git` folder if one is present.
fn clear_output(output_dir: &Path) -> Result<(), PublishError> {
    if !output_dir.exists() {
        return std::fs::create_dir_all(output_dir).map_err(|e| PublishError::output(output_dir, e));
    }

    let entries = std::fs::read_dir(output_dir).map_err(|e| PublishError::output(output_dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| PublishError::output(output_dir, e))?;
        if entry.file_name() == ".git" {
            continue;
        }
        let path = entry.path();
        let removed = if path.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        removed.map_err(|e| PublishError::output(&path, e))?;
    }

    Ok(())
}

fn write_artifact(output_dir: &Path, artifact: &Artifact) -> Result<(), PublishError> {
    let output_path = output_dir.join(&artifact.path);
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| PublishError::output(parent, e))?;
    }
    std::fs::write(&output_path, &artifact.contents).map_err(|e| PublishError::output(&output_path, e))
}

fn copy_resources(resources_dir: &Path, output_dir: &Path) -> Result<(), PublishError> {
    if !resources_dir.is_dir() {
        debug!("No resources folder at {}", resources_dir.display());
        return Ok(());
    }

    for entry in WalkDir::new(resources_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(resources_dir).to_path_buf();
            PublishError::output(&path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(resources_dir)
            .map_err(|e| PublishError::new(Stage::Output, e.to_string()).with_path(entry.path()))?;
        let target = output_dir.join(relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PublishError::output(parent, e))?;
        }
        std::fs::copy(entry.path(), &target).map_err(|e| PublishError::output(entry.path(), e))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::parse_date;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Blog {
        Life,
    }

    impl SectionId for Blog {
        const ALL: &'static [Self] = &[Blog::Life];

        fn id(&self) -> &'static str {
            "life"
        }
    }

    #[test]
    fn test_summary_skips_tags_without_slug() {
        let item = Item {
            section: Blog::Life,
            path: "walk".into(),
            title: "A walk".into(),
            description: String::new(),
            date: parse_date("2021-04-01").unwrap(),
            tags: vec!["!!".into(), "Lillesand".into()],
            image: None,
            body: Vec::new(),
            source: "life/walk.md".into(),
        };

        let tags = summary(&item).tags;
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "Lillesand");
        assert_eq!(tags[0].url, "/tags/lillesand/");
    }

    #[test]
    fn test_collisions_name_both_sources() {
        let artifacts = vec![
            Artifact::new("vapor/index.html", String::new(), "section 'vapor'"),
            Artifact::new("about/index.html", String::new(), "Content/about.md"),
            Artifact::new("vapor/index.html", String::new(), "Content/vapor.md"),
        ];

        let err = check_collisions(&artifacts).unwrap_err();
        assert_eq!(err.stage, Stage::Content);
        assert!(err.message.contains("section 'vapor' and Content/vapor.md"));
        assert_eq!(err.path.as_deref(), Some(Path::new("vapor/index.html")));

        assert!(check_collisions(&artifacts[..2]).is_ok());
    }
}
