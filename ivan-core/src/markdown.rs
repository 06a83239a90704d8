use chrono::{NaiveDate, NaiveDateTime};
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq)]
pub enum PageElement {
    Heading { level: u32, content: Vec<InlineElement> },
    Paragraph { content: Vec<InlineElement> },
    CodeBlock { language: Option<String>, content: String },
    /// `start` is `Some(n)` for an ordered list numbered from `n`.
    List { items: Vec<ListItem>, start: Option<u64> },
    BlockQuote { content: Vec<PageElement> },
    Table { headers: Vec<Vec<InlineElement>>, rows: Vec<Vec<Vec<InlineElement>>> },
    HorizontalRule,
    Html { content: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum InlineElement {
    Text(String),
    Link { text: String, url: String, title: Option<String> },
    Image { alt: String, url: String, title: Option<String> },
    Emphasis { level: u8, content: Vec<InlineElement> }, // 1=italic, 2=bold
    Code(String),
    Html(String),
    SoftBreak,
    HardBreak,
    Strikethrough { content: Vec<InlineElement> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListItem {
    pub content: Vec<InlineElement>,
    /// Blocks following the item text: nested lists, code, quotes.
    pub blocks: Vec<PageElement>,
    pub checked: Option<bool>, // For task lists
}

/// Metadata block at the top of a content file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FrontMatter {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub image: Option<String>,
    #[serde(deserialize_with = "deserialize_tags")]
    pub tags: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTags {
    List(Vec<String>),
    Csv(String),
}

fn deserialize_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<RawTags>::deserialize(deserializer)?;
    let tags = match raw {
        Some(RawTags::List(tags)) => tags,
        Some(RawTags::Csv(tags)) => tags.split(',').map(str::to_string).collect(),
        None => Vec::new(),
    };

    Ok(tags
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect())
}

impl FrontMatter {
    /// Date in `YYYY-MM-DD HH:MM` (seconds optional) or plain `YYYY-MM-DD` form.
    pub fn parsed_date(&self) -> Option<NaiveDateTime> {
        self.date.as_deref().and_then(parse_date)
    }
}

pub fn parse_date(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

#[derive(Debug, Clone, Default)]
pub struct Document {
    pub front: FrontMatter,
    pub elements: Vec<PageElement>,
}

impl Document {
    pub fn parse(source: &str) -> Result<Self, serde_yaml_ng::Error> {
        let (front, body) = split_front_matter(source);
        let front = match front {
            Some(yaml) if !yaml.trim().is_empty() => serde_yaml_ng::from_str(yaml)?,
            _ => FrontMatter::default(),
        };

        Ok(Self {
            front,
            elements: parse_elements(body),
        })
    }

    pub fn title(&self) -> Option<String> {
        self.front.title.clone().or_else(|| {
            self.elements.iter().find_map(|el| match el {
                PageElement::Heading { level: 1, content } => Some(render_inline_elements_text(content)),
                _ => None,
            })
        })
    }

    pub fn description(&self) -> Option<String> {
        self.front.description.clone().or_else(|| {
            self.elements.iter().find_map(|el| match el {
                PageElement::Paragraph { content } => Some(render_inline_elements_text(content)),
                _ => None,
            })
        })
    }
}

/// Splits a leading `---` delimited block off the rest of the file.
pub fn split_front_matter(content: &str) -> (Option<&str>, &str) {
    let Some(rest) = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))
    else {
        return (None, content);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            return (Some(&rest[..offset]), &rest[offset + line.len()..]);
        }
        offset += line.len();
    }

    (None, content)
}

pub fn parse_elements(content: &str) -> Vec<PageElement> {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    let parser = Parser::new_ext(content, options);

    let mut elements = Vec::new();
    let mut stack: Vec<ElementBuilder> = Vec::new();

    for event in parser {
        match event {
            Event::Start(tag) => {
                stack.push(ElementBuilder::from_tag(tag));
            }
            Event::End(_) => {
                if let Some(builder) = stack.pop() {
                    finish_builder(builder, &mut stack, &mut elements);
                }
            }
            Event::Text(text) => match stack.last_mut() {
                Some(builder) if builder.collects_raw() => builder.raw.push_str(&text),
                Some(builder) => builder.add_inline(InlineElement::Text(text.to_string())),
                None => elements.push(PageElement::Paragraph {
                    content: vec![InlineElement::Text(text.to_string())],
                }),
            },
            Event::Code(code) => {
                if let Some(builder) = stack.last_mut() {
                    builder.add_inline(InlineElement::Code(code.to_string()));
                }
            }
            Event::Html(html) => match stack.last_mut() {
                Some(builder) if builder.collects_raw() => builder.raw.push_str(&html),
                Some(builder) => builder.add_inline(InlineElement::Html(html.to_string())),
                None => elements.push(PageElement::Html { content: html.to_string() }),
            },
            Event::InlineHtml(html) => {
                if let Some(builder) = stack.last_mut() {
                    builder.add_inline(InlineElement::Html(html.to_string()));
                }
            }
            Event::SoftBreak => {
                if let Some(builder) = stack.last_mut() {
                    builder.add_inline(InlineElement::SoftBreak);
                }
            }
            Event::HardBreak => {
                if let Some(builder) = stack.last_mut() {
                    builder.add_inline(InlineElement::HardBreak);
                }
            }
            Event::TaskListMarker(checked) => {
                let item = stack
                    .iter_mut()
                    .rev()
                    .find(|b| matches!(b.kind, BuilderKind::ListItem));
                if let Some(item) = item {
                    item.checked = Some(checked);
                }
            }
            Event::Rule => match stack.last_mut() {
                Some(parent) => parent.add_child(PageElement::HorizontalRule),
                None => elements.push(PageElement::HorizontalRule),
            },
            _ => {}
        }
    }

    elements
}

fn finish_builder(
    builder: ElementBuilder,
    stack: &mut Vec<ElementBuilder>,
    elements: &mut Vec<PageElement>,
) {
    match builder.kind {
        BuilderKind::Emphasis(_)
        | BuilderKind::Strikethrough
        | BuilderKind::Link(_, _)
        | BuilderKind::Image(_, _) => {
            let Some(parent) = stack.last_mut() else {
                return;
            };
            let inline = match builder.kind {
                BuilderKind::Emphasis(level) => InlineElement::Emphasis {
                    level,
                    content: builder.inline_content,
                },
                BuilderKind::Strikethrough => InlineElement::Strikethrough {
                    content: builder.inline_content,
                },
                BuilderKind::Link(url, title) => {
                    let text = render_inline_elements_text(&builder.inline_content);
                    InlineElement::Link { text, url, title }
                }
                BuilderKind::Image(url, title) => {
                    let alt = render_inline_elements_text(&builder.inline_content);
                    InlineElement::Image { alt, url, title }
                }
                _ => return,
            };
            parent.add_inline(inline);
        }
        BuilderKind::ListItem => {
            if let Some(parent) = stack.last_mut() {
                parent.list_items.push(ListItem {
                    content: builder.inline_content,
                    blocks: builder.block_content,
                    checked: builder.checked,
                });
            }
        }
        BuilderKind::TableCell => {
            if let Some(parent) = stack.last_mut() {
                parent.table_data.current_row.push(builder.inline_content);
            }
        }
        BuilderKind::TableHead => {
            if let Some(parent) = stack.last_mut() {
                parent.table_data.headers = builder.table_data.current_row;
            }
        }
        BuilderKind::TableRow => {
            if let Some(parent) = stack.last_mut() {
                parent.table_data.rows.push(builder.table_data.current_row);
            }
        }
        BuilderKind::Transparent => {
            // Unsupported containers hand their inline content to the parent.
            match stack.last_mut() {
                Some(parent) => {
                    for inline in builder.inline_content {
                        parent.add_inline(inline);
                    }
                }
                None if !builder.inline_content.is_empty() => {
                    elements.push(PageElement::Paragraph {
                        content: builder.inline_content,
                    });
                }
                None => {}
            }
        }
        _ => {
            let Some(element) = builder.build() else {
                return;
            };
            match stack.last_mut() {
                Some(parent) => parent.add_child(element),
                None => elements.push(element),
            }
        }
    }
}

#[derive(Debug)]
struct ElementBuilder {
    kind: BuilderKind,
    inline_content: Vec<InlineElement>,
    block_content: Vec<PageElement>,
    list_items: Vec<ListItem>,
    table_data: TableBuilder,
    checked: Option<bool>,
    raw: String,
}

#[derive(Debug)]
enum BuilderKind {
    Heading(u32),
    Paragraph,
    CodeBlock(Option<String>),
    HtmlBlock,
    List(Option<u64>), // start number
    BlockQuote,
    ListItem,
    Table,
    TableHead,
    TableRow,
    TableCell,
    Emphasis(u8),
    Strikethrough,
    Link(String, Option<String>),  // url, title
    Image(String, Option<String>), // url, title
    Transparent,
}

#[derive(Debug, Default)]
struct TableBuilder {
    headers: Vec<Vec<InlineElement>>,
    rows: Vec<Vec<Vec<InlineElement>>>,
    current_row: Vec<Vec<InlineElement>>,
}

impl ElementBuilder {
    fn from_tag(tag: Tag) -> Self {
        let kind = match tag {
            Tag::Heading { level, .. } => BuilderKind::Heading(level as u32),
            Tag::Paragraph => BuilderKind::Paragraph,
            Tag::CodeBlock(CodeBlockKind::Fenced(lang)) => {
                // Info strings may carry attributes after the language: "rust,ignore".
                let lang = lang.split([',', ' ']).next().unwrap_or_default().trim().to_string();
                BuilderKind::CodeBlock(if lang.is_empty() { None } else { Some(lang) })
            }
            Tag::CodeBlock(CodeBlockKind::Indented) => BuilderKind::CodeBlock(None),
            Tag::HtmlBlock => BuilderKind::HtmlBlock,
            Tag::List(start) => BuilderKind::List(start),
            Tag::Item => BuilderKind::ListItem,
            Tag::BlockQuote(_) => BuilderKind::BlockQuote,
            Tag::Table(_) => BuilderKind::Table,
            Tag::TableHead => BuilderKind::TableHead,
            Tag::TableRow => BuilderKind::TableRow,
            Tag::TableCell => BuilderKind::TableCell,
            Tag::Emphasis => BuilderKind::Emphasis(1),
            Tag::Strong => BuilderKind::Emphasis(2),
            Tag::Strikethrough => BuilderKind::Strikethrough,
            Tag::Link { dest_url, title, .. } => {
                let title_str = if title.is_empty() { None } else { Some(title.to_string()) };
                BuilderKind::Link(dest_url.to_string(), title_str)
            }
            Tag::Image { dest_url, title, .. } => {
                let title_str = if title.is_empty() { None } else { Some(title.to_string()) };
                BuilderKind::Image(dest_url.to_string(), title_str)
            }
            _ => BuilderKind::Transparent,
        };

        Self {
            kind,
            inline_content: Vec::new(),
            block_content: Vec::new(),
            list_items: Vec::new(),
            table_data: TableBuilder::default(),
            checked: None,
            raw: String::new(),
        }
    }

    fn collects_raw(&self) -> bool {
        matches!(self.kind, BuilderKind::CodeBlock(_) | BuilderKind::HtmlBlock)
    }

    fn add_inline(&mut self, elem: InlineElement) {
        self.inline_content.push(elem);
    }

    fn add_child(&mut self, elem: PageElement) {
        match &mut self.kind {
            BuilderKind::BlockQuote => {
                self.block_content.push(elem);
            }
            BuilderKind::ListItem => match elem {
                // Loose lists wrap item text in paragraphs
                PageElement::Paragraph { content } if self.block_content.is_empty() => {
                    if !self.inline_content.is_empty() {
                        self.inline_content.push(InlineElement::SoftBreak);
                    }
                    self.inline_content.extend(content);
                }
                other => self.block_content.push(other),
            },
            _ => {}
        }
    }

    fn build(self) -> Option<PageElement> {
        match self.kind {
            BuilderKind::Heading(level) => Some(PageElement::Heading {
                level,
                content: self.inline_content,
            }),
            BuilderKind::Paragraph => {
                if !self.inline_content.is_empty() {
                    Some(PageElement::Paragraph {
                        content: self.inline_content,
                    })
                } else {
                    None
                }
            }
            BuilderKind::CodeBlock(language) => Some(PageElement::CodeBlock {
                language,
                content: self.raw,
            }),
            BuilderKind::HtmlBlock => Some(PageElement::Html { content: self.raw }),
            BuilderKind::List(start) => Some(PageElement::List {
                items: self.list_items,
                start,
            }),
            BuilderKind::BlockQuote => Some(PageElement::BlockQuote {
                content: self.block_content,
            }),
            BuilderKind::Table => Some(PageElement::Table {
                headers: self.table_data.headers,
                rows: self.table_data.rows,
            }),
            _ => None,
        }
    }
}

/// Lowercase ASCII slug: `"Server-Side Swift!"` becomes `"server-side-swift"`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

// HTML Rendering functions
pub fn render_elements_to_html(elements: &[PageElement]) -> String {
    let mut html = String::new();

    for element in elements {
        html.push_str(&render_element(element));
    }

    html
}

fn render_element(element: &PageElement) -> String {
    match element {
        PageElement::Heading { level, content } => {
            format!("<h{0}>{1}</h{0}>\n", level, render_inline_elements(content))
        }
        PageElement::Paragraph { content } => {
            format!("<p>{}</p>\n", render_inline_elements(content))
        }
        PageElement::CodeBlock { language, content } => match language {
            Some(lang) => format!(
                "<pre><code class=\"language-{}\">{}</code></pre>\n",
                html_escape::encode_double_quoted_attribute(lang),
                html_escape::encode_text(content)
            ),
            None => format!("<pre><code>{}</code></pre>\n", html_escape::encode_text(content)),
        },
        PageElement::List { items, start } => render_list(items, *start),
        PageElement::BlockQuote { content } => {
            let inner = render_elements_to_html(content);
            format!("<blockquote>\n{}</blockquote>\n", inner)
        }
        PageElement::Table { headers, rows } => render_table(headers, rows),
        PageElement::HorizontalRule => "<hr />\n".to_string(),
        PageElement::Html { content } => {
            if content.ends_with('\n') {
                content.clone()
            } else {
                format!("{}\n", content)
            }
        }
    }
}

pub fn render_inline_elements_text(elements: &[InlineElement]) -> String {
    let mut text = String::new();

    for element in elements {
        match element {
            InlineElement::Text(s) => text.push_str(s),
            InlineElement::Link { text: link_text, .. } => text.push_str(link_text),
            InlineElement::Image { alt, .. } => text.push_str(alt),
            InlineElement::Emphasis { content, .. } => {
                text.push_str(&render_inline_elements_text(content));
            }
            InlineElement::Code(code) => text.push_str(code),
            InlineElement::Html(_) => {}
            InlineElement::SoftBreak | InlineElement::HardBreak => text.push(' '),
            InlineElement::Strikethrough { content } => {
                text.push_str(&render_inline_elements_text(content));
            }
        }
    }

    text
}

fn render_inline_elements(elements: &[InlineElement]) -> String {
    let mut html = String::new();

    for element in elements {
        match element {
            InlineElement::Text(text) => {
                html.push_str(&html_escape::encode_text(text));
            }
            InlineElement::Link { text, url, title } => {
                let title_attr = title
                    .as_ref()
                    .map(|t| format!(" title=\"{}\"", html_escape::encode_double_quoted_attribute(t)))
                    .unwrap_or_default();
                html.push_str(&format!(
                    "<a href=\"{}\"{}>{}</a>",
                    html_escape::encode_double_quoted_attribute(url),
                    title_attr,
                    html_escape::encode_text(text)
                ));
            }
            InlineElement::Image { alt, url, title } => {
                let title_attr = title
                    .as_ref()
                    .map(|t| format!(" title=\"{}\"", html_escape::encode_double_quoted_attribute(t)))
                    .unwrap_or_default();
                html.push_str(&format!(
                    "<img src=\"{}\" alt=\"{}\"{}/>",
                    html_escape::encode_double_quoted_attribute(url),
                    html_escape::encode_double_quoted_attribute(alt),
                    title_attr
                ));
            }
            InlineElement::Emphasis { level, content } => match level {
                1 => html.push_str(&format!("<em>{}</em>", render_inline_elements(content))),
                2 => html.push_str(&format!("<strong>{}</strong>", render_inline_elements(content))),
                _ => html.push_str(&render_inline_elements(content)),
            },
            InlineElement::Code(code) => {
                html.push_str(&format!("<code>{}</code>", html_escape::encode_text(code)));
            }
            InlineElement::Html(raw) => html.push_str(raw),
            InlineElement::SoftBreak => html.push('\n'),
            InlineElement::HardBreak => html.push_str("<br />\n"),
            InlineElement::Strikethrough { content } => {
                html.push_str(&format!("<del>{}</del>", render_inline_elements(content)));
            }
        }
    }

    html
}

fn render_list(items: &[ListItem], start: Option<u64>) -> String {
    let items_html: String = items.iter().map(render_list_item).collect();
    match start {
        None => format!("<ul>\n{}</ul>\n", items_html),
        Some(1) => format!("<ol>\n{}</ol>\n", items_html),
        Some(n) => format!("<ol start=\"{}\">\n{}</ol>\n", n, items_html),
    }
}

fn render_list_item(item: &ListItem) -> String {
    let mut html = String::from("<li>");

    match item.checked {
        Some(true) => html.push_str("<input type=\"checkbox\" checked disabled/> "),
        Some(false) => html.push_str("<input type=\"checkbox\" disabled/> "),
        None => {}
    }
    html.push_str(&render_inline_elements(&item.content));

    if !item.blocks.is_empty() {
        html.push('\n');
        html.push_str(&render_elements_to_html(&item.blocks));
    }

    html.push_str("</li>\n");
    html
}

fn render_table(headers: &[Vec<InlineElement>], rows: &[Vec<Vec<InlineElement>>]) -> String {
    let mut html = String::from("<table>\n");

    if !headers.is_empty() {
        html.push_str("<thead>\n<tr>\n");
        for header in headers {
            html.push_str(&format!("<th>{}</th>\n", render_inline_elements(header)));
        }
        html.push_str("</tr>\n</thead>\n");
    }

    if !rows.is_empty() {
        html.push_str("<tbody>\n");
        for row in rows {
            html.push_str("<tr>\n");
            for cell in row {
                html.push_str(&format!("<td>{}</td>\n", render_inline_elements(cell)));
            }
            html.push_str("</tr>\n");
        }
        html.push_str("</tbody>\n");
    }

    html.push_str("</table>\n");
    html
}
