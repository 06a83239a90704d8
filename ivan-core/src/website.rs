use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::Serialize;
use url::Url;

/// A closed set of top-level content sections.
///
/// Implemented by a plain enum; `ALL` lists the variants in the order they
/// should appear in the site navigation.
pub trait SectionId: Copy + Eq + Hash + fmt::Debug + 'static {
    const ALL: &'static [Self];

    /// Identifier used as folder name under the content root and as URL segment.
    fn id(&self) -> &'static str;

    fn title(&self) -> String {
        let id = self.id();
        let mut chars = id.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    fn from_id(id: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.id() == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    English,
    Norwegian,
    Swedish,
    Danish,
    German,
    French,
    Spanish,
}

impl Language {
    pub fn tag(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Norwegian => "nb",
            Language::Swedish => "sv",
            Language::Danish => "da",
            Language::German => "de",
            Language::French => "fr",
            Language::Spanish => "es",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Why a descriptor cannot be published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorProblem {
    NoSections,
    DuplicateSection(&'static str),
    RelativeUrl(String),
}

impl fmt::Display for DescriptorProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptorProblem::NoSections => write!(f, "no sections declared"),
            DescriptorProblem::DuplicateSection(id) => write!(f, "section '{}' declared twice", id),
            DescriptorProblem::RelativeUrl(url) => write!(f, "url '{}' has no host", url),
        }
    }
}

/// Site-level metadata and the section set of a blog.
#[derive(Debug, Clone)]
pub struct Website<S: SectionId> {
    url: Url,
    name: String,
    description: String,
    language: Language,
    image_path: Option<PathBuf>,
    sections: PhantomData<S>,
}

impl<S: SectionId> Website<S> {
    pub fn new(url: Url, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            url,
            name: name.into(),
            description: description.into(),
            language: Language::default(),
            image_path: None,
            sections: PhantomData,
        }
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn with_image_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.image_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn image_path(&self) -> Option<&Path> {
        self.image_path.as_deref()
    }

    pub fn sections(&self) -> &'static [S] {
        S::ALL
    }

    /// Absolute URL for a site-relative path such as `vapor/my-post/`.
    ///
    /// Segments are percent-encoded where needed.
    pub fn absolute_url(&self, path: &str) -> String {
        let mut base = self.url.clone();
        if !base.path().ends_with('/') {
            let dir = format!("{}/", base.path());
            base.set_path(&dir);
        }

        let path = path.trim_start_matches('/');
        match base.join(path) {
            Ok(url) => url.into(),
            Err(_) => format!("{}{}", base, path),
        }
    }

    pub fn check(&self) -> Result<(), DescriptorProblem> {
        if S::ALL.is_empty() {
            return Err(DescriptorProblem::NoSections);
        }

        let mut seen = HashSet::new();
        for section in S::ALL {
            if !seen.insert(section.id()) {
                return Err(DescriptorProblem::DuplicateSection(section.id()));
            }
        }

        if self.url.cannot_be_a_base() || !self.url.has_host() {
            return Err(DescriptorProblem::RelativeUrl(self.url.to_string()));
        }

        Ok(())
    }

    pub(crate) fn meta(&self) -> SiteMeta {
        SiteMeta {
            url: self.url.as_str().trim_end_matches('/').to_string(),
            name: self.name.clone(),
            description: self.description.clone(),
            language: self.language.tag(),
            image: self
                .image_path
                .as_ref()
                .map(|p| self.absolute_url(&p.to_string_lossy())),
        }
    }
}

/// Template-facing view of the descriptor.
#[derive(Debug, Clone, Serialize)]
pub struct SiteMeta {
    pub url: String,
    pub name: String,
    pub description: String,
    pub language: &'static str,
    pub image: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Section {
        Vapor,
        Life,
    }

    impl SectionId for Section {
        const ALL: &'static [Self] = &[Section::Vapor, Section::Life];

        fn id(&self) -> &'static str {
            match self {
                Section::Vapor => "vapor",
                Section::Life => "life",
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Twice {
        A,
        B,
    }

    impl SectionId for Twice {
        const ALL: &'static [Self] = &[Twice::A, Twice::B];

        fn id(&self) -> &'static str {
            "same"
        }
    }

    fn site() -> Website<Section> {
        Website::new(
            Url::parse("https://ivan.myrvold.blog").unwrap(),
            "Ivan's Blog",
            "Seaside notes",
        )
    }

    #[test]
    fn test_sections_in_declared_order() {
        let ids: Vec<_> = site().sections().iter().map(|s| s.id()).collect();
        assert_eq!(ids, vec!["vapor", "life"]);
        assert_eq!(Section::Life.title(), "Life");
        assert_eq!(Section::from_id("vapor"), Some(Section::Vapor));
        assert_eq!(Section::from_id("aws"), None);
    }

    #[test]
    fn test_check_accepts_valid_site() {
        assert_eq!(site().check(), Ok(()));
    }

    #[test]
    fn test_check_rejects_duplicate_ids() {
        let site: Website<Twice> = Website::new(Url::parse("https://x.test").unwrap(), "X", "");
        assert_eq!(site.check(), Err(DescriptorProblem::DuplicateSection("same")));
    }

    #[test]
    fn test_check_rejects_url_without_host() {
        let site: Website<Section> = Website::new(Url::parse("mailto:ivan@x.test").unwrap(), "X", "");
        assert!(matches!(site.check(), Err(DescriptorProblem::RelativeUrl(_))));
    }

    #[test]
    fn test_absolute_url() {
        let site = site();
        assert_eq!(site.absolute_url(""), "https://ivan.myrvold.blog/");
        assert_eq!(site.absolute_url("/vapor/"), "https://ivan.myrvold.blog/vapor/");
        assert_eq!(
            site.absolute_url("/life/My Post/"),
            "https://ivan.myrvold.blog/life/My%20Post/"
        );
        assert_eq!(site.absolute_url("/life/sjø/"), "https://ivan.myrvold.blog/life/sj%C3%B8/");
    }

    #[test]
    fn test_absolute_url_under_subpath() {
        let site: Website<Section> =
            Website::new(Url::parse("https://example.test/blog").unwrap(), "X", "");
        assert_eq!(site.absolute_url("/vapor/"), "https://example.test/blog/vapor/");
        assert_eq!(site.absolute_url(""), "https://example.test/blog/");
    }

    #[test]
    fn test_meta_defaults() {
        let meta = site().with_language(Language::Norwegian).meta();
        assert_eq!(meta.language, "nb");
        assert_eq!(meta.url, "https://ivan.myrvold.blog");
        assert!(meta.image.is_none());
    }
}
