use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::content::ContentError;
use crate::template::TemplateError;
use crate::website::DescriptorProblem;

type Source = Box<dyn std::error::Error + Send + Sync>;

/// Where in the publishing run a failure happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Configuration,
    Content,
    Plugin(String),
    Rendering,
    Output,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Configuration => write!(f, "configuration"),
            Stage::Content => write!(f, "content discovery"),
            Stage::Plugin(name) => write!(f, "plugin '{}'", name),
            Stage::Rendering => write!(f, "rendering"),
            Stage::Output => write!(f, "writing output"),
        }
    }
}

/// The one failure a publishing run can end with.
#[derive(Debug, Error)]
#[error("publishing failed during {stage}{}: {message}", path_note(.path))]
pub struct PublishError {
    pub stage: Stage,
    pub path: Option<PathBuf>,
    pub message: String,
    #[source]
    source: Option<Source>,
}

fn path_note(path: &Option<PathBuf>) -> String {
    match path {
        Some(p) => format!(" ({})", p.display()),
        None => String::new(),
    }
}

impl PublishError {
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            path: None,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: Into<Source>,
    {
        self.source = Some(source.into());
        self
    }

    pub(crate) fn plugin(name: &str, source: Source) -> Self {
        Self::new(Stage::Plugin(name.to_string()), source.to_string()).with_source(source)
    }

    pub(crate) fn rendering(template: &str, source: TemplateError) -> Self {
        Self::new(Stage::Rendering, format!("could not render {}", template)).with_source(source)
    }

    pub(crate) fn output(path: &Path, source: std::io::Error) -> Self {
        Self::new(Stage::Output, source.to_string())
            .with_path(path)
            .with_source(source)
    }
}

impl From<DescriptorProblem> for PublishError {
    fn from(problem: DescriptorProblem) -> Self {
        Self::new(Stage::Configuration, problem.to_string())
    }
}

impl From<ContentError> for PublishError {
    fn from(err: ContentError) -> Self {
        let path = err.path().to_path_buf();
        Self::new(Stage::Content, err.to_string())
            .with_path(path)
            .with_source(err)
    }
}
