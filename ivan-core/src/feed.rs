//! Syndication and crawler files: the RSS feed and `sitemap.xml`.
//!
//! Dates come from item metadata only, so two runs over the same content
//! produce the same bytes.

use chrono::NaiveDateTime;
use rss::{ChannelBuilder, GuidBuilder, ItemBuilder};

use crate::markdown::render_elements_to_html;
use crate::site::Content;
use crate::website::{SectionId, Website};

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

fn rfc2822(date: &NaiveDateTime) -> String {
    date.and_utc().to_rfc2822()
}

/// RSS 2.0 feed of the newest `limit` items across all sections.
pub fn rss<S: SectionId>(website: &Website<S>, content: &Content<S>, limit: usize) -> String {
    let newest = content.items_by_date();

    let items: Vec<rss::Item> = newest
        .iter()
        .take(limit)
        .map(|item| {
            let link = website.absolute_url(&item.url());
            ItemBuilder::default()
                .title(Some(item.title.clone()))
                .link(Some(link.clone()))
                .guid(Some(GuidBuilder::default().permalink(true).value(link).build()))
                .description(Some(item.description.clone()))
                .pub_date(Some(rfc2822(&item.date)))
                .content(Some(render_elements_to_html(&item.body)))
                .build()
        })
        .collect();

    let channel = ChannelBuilder::default()
        .title(website.name())
        .link(website.absolute_url(""))
        .description(website.description())
        .language(Some(website.language().tag().to_string()))
        .generator(Some("ivan".to_string()))
        .last_build_date(newest.first().map(|item| rfc2822(&item.date)))
        .items(items)
        .build();

    channel.to_string()
}

struct UrlEntry {
    loc: String,
    lastmod: Option<String>,
}

pub fn sitemap<S: SectionId>(website: &Website<S>, content: &Content<S>) -> String {
    let mut urls = vec![UrlEntry {
        loc: website.absolute_url(""),
        lastmod: None,
    }];

    for section in &content.sections {
        urls.push(UrlEntry {
            loc: website.absolute_url(&section.url()),
            lastmod: section.items.first().map(|i| i.date.format("%Y-%m-%d").to_string()),
        });
        for item in &section.items {
            urls.push(UrlEntry {
                loc: website.absolute_url(&item.url()),
                lastmod: Some(item.date.format("%Y-%m-%d").to_string()),
            });
        }
    }

    for page in &content.pages {
        urls.push(UrlEntry {
            loc: website.absolute_url(&page.url()),
            lastmod: None,
        });
    }

    let mut xml = String::with_capacity(256 + urls.len() * 96);
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<urlset xmlns=\"");
    xml.push_str(SITEMAP_NS);
    xml.push_str("\">\n");

    for entry in urls {
        xml.push_str("  <url>\n    <loc>");
        xml.push_str(&html_escape::encode_text(&entry.loc));
        xml.push_str("</loc>\n");
        if let Some(lastmod) = entry.lastmod {
            xml.push_str("    <lastmod>");
            xml.push_str(&lastmod);
            xml.push_str("</lastmod>\n");
        }
        xml.push_str("  </url>\n");
    }

    xml.push_str("</urlset>\n");
    xml
}
