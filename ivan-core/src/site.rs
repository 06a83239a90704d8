use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDateTime;

use crate::markdown::{PageElement, slugify};
use crate::website::SectionId;

/// Markdown introduction shown above a listing (home page or section index).
#[derive(Debug, Clone, Default)]
pub struct Intro {
    pub title: Option<String>,
    pub description: Option<String>,
    pub body: Vec<PageElement>,
}

/// A dated post belonging to one section.
#[derive(Debug, Clone)]
pub struct Item<S: SectionId> {
    pub section: S,
    /// Path below the section folder, without extension, `/`-separated.
    pub path: String,
    pub title: String,
    pub description: String,
    pub date: NaiveDateTime,
    pub tags: Vec<String>,
    pub image: Option<String>,
    pub body: Vec<PageElement>,
    pub source: PathBuf,
}

impl<S: SectionId> Item<S> {
    pub fn url(&self) -> String {
        format!("/{}/{}/", self.section.id(), self.path)
    }

    pub fn out_path(&self) -> PathBuf {
        PathBuf::from(self.section.id())
            .join(&self.path)
            .join("index.html")
    }
}

/// A free-standing page outside of any section, e.g. `about.md`.
#[derive(Debug, Clone)]
pub struct Page {
    pub path: String,
    pub title: String,
    pub description: String,
    pub body: Vec<PageElement>,
    pub source: PathBuf,
}

impl Page {
    pub fn url(&self) -> String {
        format!("/{}/", self.path)
    }

    pub fn out_path(&self) -> PathBuf {
        PathBuf::from(&self.path).join("index.html")
    }
}

#[derive(Debug, Clone)]
pub struct Section<S: SectionId> {
    pub id: S,
    pub intro: Option<Intro>,
    pub items: Vec<Item<S>>,
}

impl<S: SectionId> Section<S> {
    pub fn title(&self) -> String {
        self.intro
            .as_ref()
            .and_then(|i| i.title.clone())
            .unwrap_or_else(|| self.id.title())
    }

    pub fn url(&self) -> String {
        format!("/{}/", self.id.id())
    }
}

/// Everything discovered under the content root.
#[derive(Debug, Clone)]
pub struct Content<S: SectionId> {
    pub home: Option<Intro>,
    /// One entry per declared section, in declared order.
    pub sections: Vec<Section<S>>,
    pub pages: Vec<Page>,
}

impl<S: SectionId> Content<S> {
    pub fn items(&self) -> impl Iterator<Item = &Item<S>> {
        self.sections.iter().flat_map(|s| s.items.iter())
    }

    /// All items across sections, newest first.
    pub fn items_by_date(&self) -> Vec<&Item<S>> {
        let mut items: Vec<_> = self.items().collect();
        items.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.url().cmp(&b.url())));
        items
    }

    /// Items grouped by tag slug. Keyed and sorted for stable output.
    pub fn tags(&self) -> BTreeMap<String, Tag<'_, S>> {
        let mut tags: BTreeMap<String, Tag<'_, S>> = BTreeMap::new();
        for item in self.items_by_date() {
            for name in &item.tags {
                let slug = slugify(name);
                if slug.is_empty() {
                    continue;
                }
                tags.entry(slug.clone())
                    .or_insert_with(|| Tag {
                        name: name.clone(),
                        slug,
                        items: Vec::new(),
                    })
                    .items
                    .push(item);
            }
        }
        tags
    }

    /// Applies `f` to every element tree: home intro, section intros, items and pages.
    pub fn try_for_each_body<E>(
        &mut self,
        mut f: impl FnMut(&mut Vec<PageElement>) -> Result<(), E>,
    ) -> Result<(), E> {
        if let Some(home) = &mut self.home {
            f(&mut home.body)?;
        }
        for section in &mut self.sections {
            if let Some(intro) = &mut section.intro {
                f(&mut intro.body)?;
            }
            for item in &mut section.items {
                f(&mut item.body)?;
            }
        }
        for page in &mut self.pages {
            f(&mut page.body)?;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct Tag<'a, S: SectionId> {
    pub name: String,
    pub slug: String,
    pub items: Vec<&'a Item<S>>,
}

impl<S: SectionId> Tag<'_, S> {
    pub fn url(&self) -> String {
        format!("/tags/{}/", self.slug)
    }
}
