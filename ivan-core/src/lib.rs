pub mod content;
pub mod error;
pub mod feed;
pub mod markdown;
pub mod plugin;
pub mod publish;
pub mod site;
pub mod template;
pub mod theme;
pub mod website;

// Re-export main types
pub use content::{ContentError, ContentScanner};
pub use error::{PublishError, Stage};
pub use plugin::{Plugin, PluginError, SyntaxHighlight};
pub use publish::{NavItem, Publisher, publish};
pub use site::{Content, Intro, Item, Page, Section};
pub use template::{TemplateError, TemplateRenderer};
pub use theme::Theme;
pub use website::{Language, SectionId, Website};

pub use url::Url;
