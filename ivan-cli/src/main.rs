mod config;

use anyhow::{Context, Result};
use ivan_core::{Language, Publisher, SectionId, SyntaxHighlight, Theme, Url, Website};
use log::info;

use crate::config::{BuildConfig, CONFIG_FILE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Section {
    Projects,
    Vapor,
    Aws,
    Ios,
    Life,
}

impl SectionId for Section {
    const ALL: &'static [Self] = &[
        Section::Projects,
        Section::Vapor,
        Section::Aws,
        Section::Ios,
        Section::Life,
    ];

    fn id(&self) -> &'static str {
        match self {
            Section::Projects => "projects",
            Section::Vapor => "vapor",
            Section::Aws => "aws",
            Section::Ios => "ios",
            Section::Life => "life",
        }
    }

    fn title(&self) -> String {
        match self {
            Section::Projects => "Projects",
            Section::Vapor => "Vapor",
            Section::Aws => "AWS",
            Section::Ios => "iOS",
            Section::Life => "Life",
        }
        .to_string()
    }
}

fn website() -> Result<Website<Section>> {
    let url = Url::parse("https://ivan.myrvold.blog").context("site url")?;

    Ok(Website::new(
        url,
        "Ivan's Blog",
        "I live in a small beautiful seaside town in south Norway called Lillesand. \
         My interests is in Web technologies, Cloud (AWS, Digital Ocean), Terraform, Ansible, \
         server-side Swift, MacOS and iOS.",
    )
    .with_language(Language::English))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let build = BuildConfig::load(CONFIG_FILE)?;
    let site = website()?;

    Publisher::new(&site)
        .content_dir(&build.content)
        .output_dir(&build.output)
        .resources_dir(&build.resources)
        .feed_items(build.feed_items)
        .theme(Theme::foundation())
        .plugin(SyntaxHighlight::with_theme(build.syntax_theme.as_str()))
        .publish()?;

    info!("Site published to {}", build.output);
    Ok(())
}
