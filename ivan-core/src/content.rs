use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use log::{debug, info, warn};
use thiserror::Error;
use walkdir::WalkDir;

use crate::markdown::{Document, slugify};
use crate::site::{Content, Intro, Item, Page, Section};
use crate::website::SectionId;

const INDEX_FILE: &str = "index.md";

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("content folder not found: {}", .0.display())]
    MissingRoot(PathBuf),
    #[error("IO error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid front matter in {}: {source}", .path.display())]
    FrontMatter {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },
    #[error("invalid path: {}", .0.display())]
    InvalidPath(PathBuf),
}

impl ContentError {
    pub fn path(&self) -> &Path {
        match self {
            ContentError::MissingRoot(p) | ContentError::InvalidPath(p) => p,
            ContentError::Io { path, .. } | ContentError::FrontMatter { path, .. } => path,
        }
    }
}

/// Walks a content folder laid out as
/// `index.md`, `<page>.md`, `<section>/index.md` and `<section>/**/<item>.md`.
pub struct ContentScanner<S: SectionId> {
    source_dir: PathBuf,
    sections: PhantomData<S>,
}

impl<S: SectionId> ContentScanner<S> {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            source_dir: path.as_ref().to_path_buf(),
            sections: PhantomData,
        }
    }

    pub fn scan(&self) -> Result<Content<S>, ContentError> {
        if !self.source_dir.is_dir() {
            return Err(ContentError::MissingRoot(self.source_dir.clone()));
        }
        info!("Scanning content in {}", self.source_dir.display());

        let home_path = self.source_dir.join(INDEX_FILE);
        let home = if home_path.is_file() {
            Some(read_intro(&home_path)?)
        } else {
            None
        };

        let sections = S::ALL
            .iter()
            .map(|&id| self.scan_section(id))
            .collect::<Result<Vec<_>, _>>()?;

        let pages = self.scan_pages()?;

        info!(
            "Discovered {} items in {} sections, {} pages",
            sections.iter().map(|s| s.items.len()).sum::<usize>(),
            sections.len(),
            pages.len()
        );

        Ok(Content {
            home,
            sections,
            pages,
        })
    }

    fn scan_section(&self, id: S) -> Result<Section<S>, ContentError> {
        let dir = self.source_dir.join(id.id());
        let mut section = Section {
            id,
            intro: None,
            items: Vec::new(),
        };

        if !dir.is_dir() {
            debug!("Section '{}' has no content folder", id.id());
            return Ok(section);
        }

        for path in markdown_files(&dir)? {
            let relative = path
                .strip_prefix(&dir)
                .map_err(|_| ContentError::InvalidPath(path.clone()))?;

            if relative == Path::new(INDEX_FILE) {
                section.intro = Some(read_intro(&path)?);
                continue;
            }

            section.items.push(read_item(id, relative, &path)?);
        }

        section
            .items
            .sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.path.cmp(&b.path)));

        Ok(section)
    }

    fn scan_pages(&self) -> Result<Vec<Page>, ContentError> {
        let mut pages = Vec::new();

        for entry in sorted_entries(&self.source_dir)? {
            let file_name = entry.to_string_lossy().to_string();
            let path = self.source_dir.join(&entry);

            if path.is_dir() {
                if S::from_id(&file_name).is_none() {
                    warn!("Skipping folder '{}': not a declared section", file_name);
                }
                continue;
            }

            if !is_markdown(&path) || file_name == INDEX_FILE {
                continue;
            }

            debug!("Reading page {}", path.display());
            let doc = read_document(&path)?;
            let stem = relative_stem(Path::new(&entry)).ok_or_else(|| ContentError::InvalidPath(path.clone()))?;
            pages.push(Page {
                title: doc.title().unwrap_or_else(|| stem.clone()),
                description: doc.description().unwrap_or_default(),
                path: stem,
                body: doc.elements,
                source: path,
            });
        }

        Ok(pages)
    }
}

fn read_document(path: &Path) -> Result<Document, ContentError> {
    let source = std::fs::read_to_string(path).map_err(|source| ContentError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    Document::parse(&source).map_err(|source| ContentError::FrontMatter {
        path: path.to_path_buf(),
        source,
    })
}

fn read_intro(path: &Path) -> Result<Intro, ContentError> {
    let doc = read_document(path)?;
    Ok(Intro {
        title: doc.title(),
        description: doc.description(),
        body: doc.elements,
    })
}

fn read_item<S: SectionId>(section: S, relative: &Path, path: &Path) -> Result<Item<S>, ContentError> {
    debug!("Reading item {}", path.display());
    let doc = read_document(path)?;
    let stem = relative_stem(relative).ok_or_else(|| ContentError::InvalidPath(path.to_path_buf()))?;

    let date = match doc.front.parsed_date() {
        Some(date) => date,
        None => {
            if doc.front.date.is_some() {
                warn!("Unreadable date in {}, using modification time", path.display());
            }
            modification_date(path)?
        }
    };

    Ok(Item {
        section,
        title: doc.title().unwrap_or_else(|| stem.clone()),
        description: doc.description().unwrap_or_default(),
        date,
        tags: doc.front.tags.clone(),
        image: doc.front.image.clone(),
        path: stem,
        body: doc.elements,
        source: path.to_path_buf(),
    })
}

fn modification_date(path: &Path) -> Result<NaiveDateTime, ContentError> {
    let modified = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|source| ContentError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(DateTime::<Utc>::from(modified).naive_utc())
}

/// `2020/My Post.md` becomes `2020/my-post`. `None` when a segment has no
/// characters left to form a URL from.
fn relative_stem(relative: &Path) -> Option<String> {
    relative
        .with_extension("")
        .components()
        .map(|c| {
            let slug = slugify(&c.as_os_str().to_string_lossy());
            (!slug.is_empty()).then_some(slug)
        })
        .collect::<Option<Vec<_>>>()
        .map(|segments| segments.join("/"))
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, ContentError> {
    let io_err = |source| ContentError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        entries.push(PathBuf::from(entry.map_err(io_err)?.file_name()));
    }
    entries.sort();

    Ok(entries)
}

fn markdown_files(dir: &Path) -> Result<Vec<PathBuf>, ContentError> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| ContentError::Io {
            path: e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf()),
            source: e.into(),
        })?;

        if entry.file_type().is_file() && is_markdown(entry.path()) {
            paths.push(entry.into_path());
        }
    }

    Ok(paths)
}

fn is_markdown(path: &Path) -> bool {
    path.extension().map(|ext| ext == "md").unwrap_or(false)
}
