use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use ivan_core::markdown::PageElement;
use ivan_core::{Plugin, PluginError, Publisher, SectionId, Stage, SyntaxHighlight, Theme, Url, Website};
use tempfile::TempDir;
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Section {
    Alpha,
    Beta,
}

impl SectionId for Section {
    const ALL: &'static [Self] = &[Section::Alpha, Section::Beta];

    fn id(&self) -> &'static str {
        match self {
            Section::Alpha => "alpha",
            Section::Beta => "beta",
        }
    }
}

struct Marker(&'static str);

impl Plugin for Marker {
    fn name(&self) -> &str {
        self.0
    }

    fn transform(&self, mut elements: Vec<PageElement>) -> Result<Vec<PageElement>, PluginError> {
        elements.push(PageElement::Html {
            content: format!("<p class=\"marker\">{}</p>", self.0),
        });
        Ok(elements)
    }
}

struct Failing;

impl Plugin for Failing {
    fn name(&self) -> &str {
        "failing"
    }

    fn transform(&self, _: Vec<PageElement>) -> Result<Vec<PageElement>, PluginError> {
        Err("refusing to run".into())
    }
}

struct Fixture {
    _tmp: TempDir,
    content: PathBuf,
    resources: PathBuf,
    output: PathBuf,
}

fn write(root: &Path, rel: &str, body: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

fn fixture() -> Fixture {
    let tmp = TempDir::new().unwrap();
    let content = tmp.path().join("Content");
    let resources = tmp.path().join("Resources");
    let output = tmp.path().join("Output");

    write(&content, "index.md", "# Welcome\n\nA blog from Lillesand.\n");
    write(&content, "about.md", "# About\n\nWho I am.\n");
    write(
        &content,
        "alpha/first.md",
        "---\ndate: 2021-02-03 10:00\ntags: swift, vapor\n---\n# First post\n\nIntro text.\n\n```rust\nfn main() {}\n```\n",
    );
    write(
        &content,
        "beta/second.md",
        "---\ntitle: Second post\ndate: 2021-05-06\ntags: [life]\n---\nJust a note.\n",
    );
    write(&resources, "images/logo.svg", "<svg/>");

    Fixture {
        _tmp: tmp,
        content,
        resources,
        output,
    }
}

fn website() -> Website<Section> {
    Website::new(Url::parse("https://example.test").unwrap(), "X", "A test site")
}

fn publisher<'a>(site: &'a Website<Section>, fx: &Fixture) -> Publisher<'a, Section> {
    Publisher::new(site)
        .content_dir(&fx.content)
        .resources_dir(&fx.resources)
        .output_dir(&fx.output)
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| panic!("reading {}: {}", path.display(), e))
}

fn read_tree(dir: &Path) -> BTreeMap<String, Vec<u8>> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(dir).unwrap().to_string_lossy().to_string();
            (rel, fs::read(e.path()).unwrap())
        })
        .collect()
}

fn nav_entries(html: &str) -> Vec<String> {
    let start = html.find("<nav>").expect("page has a nav");
    let end = html.find("</nav>").expect("nav is closed");
    html[start..end]
        .split("<li>")
        .skip(1)
        .filter_map(|li| {
            let text_start = li.find('>')? + 1;
            let text_end = li.find("</a>")?;
            Some(li[text_start..text_end].to_string())
        })
        .collect()
}

#[test]
fn test_navigation_lists_declared_sections_in_order() {
    let fx = fixture();
    let site = website();
    publisher(&site, &fx).theme(Theme::foundation()).publish().unwrap();

    let home = read(&fx.output.join("index.html"));
    assert_eq!(nav_entries(&home), vec!["Alpha", "Beta"]);

    let item = read(&fx.output.join("alpha/first/index.html"));
    assert_eq!(nav_entries(&item), vec!["Alpha", "Beta"]);
    assert!(item.contains("class=\"selected\">Alpha</a>"));
}

#[test]
fn test_generates_full_site_layout() {
    let fx = fixture();
    let site = website();
    publisher(&site, &fx).publish().unwrap();

    for file in [
        "index.html",
        "alpha/index.html",
        "alpha/first/index.html",
        "beta/index.html",
        "beta/second/index.html",
        "about/index.html",
        "tags/index.html",
        "tags/swift/index.html",
        "tags/vapor/index.html",
        "tags/life/index.html",
        "styles.css",
        "feed.rss",
        "sitemap.xml",
        "images/logo.svg",
    ] {
        assert!(fx.output.join(file).is_file(), "missing {}", file);
    }

    let home = read(&fx.output.join("index.html"));
    assert!(home.contains("A blog from Lillesand."));
    // Newest item first on the home page
    let second = home.find("Second post").unwrap();
    let first = home.find("First post").unwrap();
    assert!(second < first);

    let item = read(&fx.output.join("alpha/first/index.html"));
    assert!(item.contains("February 3, 2021"));

    let feed = read(&fx.output.join("feed.rss"));
    assert!(feed.contains("https://example.test/beta/second/"));
}

#[test]
fn test_empty_plugin_list_leaves_content_untouched() {
    let fx = fixture();
    let site = website();
    publisher(&site, &fx).plugins(Vec::new()).publish().unwrap();

    let item = read(&fx.output.join("alpha/first/index.html"));
    assert!(item.contains("<pre><code class=\"language-rust\">fn main() {}\n</code></pre>"));
    assert!(!item.contains("<pre style="));
}

#[test]
fn test_syntax_highlight_plugin() {
    let fx = fixture();
    let site = website();
    publisher(&site, &fx).plugin(SyntaxHighlight::new()).publish().unwrap();

    let item = read(&fx.output.join("alpha/first/index.html"));
    assert!(item.contains("<pre style="));
    assert!(!item.contains("language-rust"));
}

#[test]
fn test_plugins_apply_in_list_order() {
    let fx = fixture();
    let site = website();

    publisher(&site, &fx)
        .plugin(Marker("one"))
        .plugin(Marker("two"))
        .publish()
        .unwrap();
    let item = read(&fx.output.join("beta/second/index.html"));
    assert!(item.find(">one<").unwrap() < item.find(">two<").unwrap());

    publisher(&site, &fx)
        .plugin(Marker("two"))
        .plugin(Marker("one"))
        .publish()
        .unwrap();
    let item = read(&fx.output.join("beta/second/index.html"));
    assert!(item.find(">two<").unwrap() < item.find(">one<").unwrap());
}

#[test]
fn test_republishing_is_byte_identical() {
    let fx = fixture();
    let site = website();

    publisher(&site, &fx).plugin(SyntaxHighlight::new()).publish().unwrap();
    let first = read_tree(&fx.output);

    publisher(&site, &fx).plugin(SyntaxHighlight::new()).publish().unwrap();
    let second = read_tree(&fx.output);

    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn test_stale_output_removed_but_git_kept() {
    let fx = fixture();
    write(&fx.output, "stale.html", "old");
    write(&fx.output, ".git/HEAD", "ref: refs/heads/main");

    let site = website();
    publisher(&site, &fx).publish().unwrap();

    assert!(!fx.output.join("stale.html").exists());
    assert!(fx.output.join(".git/HEAD").exists());
}

#[test]
fn test_missing_content_fails() {
    let fx = fixture();
    let site = website();
    let err = publisher(&site, &fx)
        .content_dir(fx.content.join("nope"))
        .publish()
        .unwrap_err();

    assert_eq!(err.stage, Stage::Content);
    assert!(!fx.output.exists());
}

#[test]
fn test_incomplete_theme_fails_before_output() {
    let fx = fixture();
    let theme_dir = fx.content.parent().unwrap().join("theme");
    write(&theme_dir, "index.html", "home");

    let site = website();
    let err = publisher(&site, &fx)
        .theme(Theme::from_dir("broken", &theme_dir))
        .publish()
        .unwrap_err();

    assert_eq!(err.stage, Stage::Configuration);
    assert!(err.to_string().contains("broken"));
    assert!(!fx.output.exists());
}

#[test]
fn test_plugin_failure_keeps_previous_output() {
    let fx = fixture();
    let site = website();
    publisher(&site, &fx).publish().unwrap();

    let err = publisher(&site, &fx).plugin(Failing).publish().unwrap_err();
    assert_eq!(err.stage, Stage::Plugin("failing".into()));
    assert!(fx.output.join("index.html").exists());
}

#[test]
fn test_custom_theme_from_dir() {
    let fx = fixture();
    let theme_dir = fx.content.parent().unwrap().join("theme");
    for name in ["index", "section", "item", "page", "tags", "tag"] {
        write(
            &theme_dir,
            &format!("{}.html", name),
            &format!("{}:{{% for n in navigation %}}[{{{{ n.text }}}}]{{% endfor %}}", name),
        );
    }

    let site = website();
    publisher(&site, &fx)
        .theme(Theme::from_dir("plain", &theme_dir))
        .publish()
        .unwrap();

    assert_eq!(read(&fx.output.join("index.html")), "index:[Alpha][Beta]");
    assert_eq!(read(&fx.output.join("beta/second/index.html")), "item:[Alpha][Beta]");
    assert!(!fx.output.join("styles.css").exists());
}

#[test]
fn test_page_named_after_section_is_rejected() {
    let fx = fixture();
    write(&fx.content, "alpha/index.md", "# Alpha intro\n");
    write(&fx.content, "alpha.md", "# Alpha page\n");

    let site = website();
    let err = publisher(&site, &fx).publish().unwrap_err();

    assert_eq!(err.stage, Stage::Content);
    assert!(err.message.contains("section 'alpha'"));
    assert!(err.message.contains("alpha.md"));
    assert!(!fx.output.exists());
}

#[test]
fn test_page_named_tags_is_rejected() {
    let fx = fixture();
    write(&fx.content, "tags.md", "# My tags\n");

    let site = website();
    let err = publisher(&site, &fx).publish().unwrap_err();

    assert_eq!(err.stage, Stage::Content);
    assert!(err.message.contains("tag listing"));
    assert!(err.message.contains("tags.md"));
    assert_eq!(err.path.as_deref(), Some(Path::new("tags/index.html")));
}

#[test]
fn test_file_names_with_spaces_give_valid_urls() {
    let fx = fixture();
    write(&fx.content, "alpha/My Trip.md", "---\ndate: 2021-07-01\n---\n# My trip\n");

    let site = website();
    publisher(&site, &fx).publish().unwrap();

    assert!(fx.output.join("alpha/my-trip/index.html").exists());
    let sitemap = read(&fx.output.join("sitemap.xml"));
    assert!(sitemap.contains("<loc>https://example.test/alpha/my-trip/</loc>"));
    assert!(!sitemap.contains("My Trip"));
    let feed = read(&fx.output.join("feed.rss"));
    assert!(feed.contains("<link>https://example.test/alpha/my-trip/</link>"));
}

#[test]
fn test_list_item_code_is_highlighted_in_output() {
    let fx = fixture();
    write(
        &fx.content,
        "beta/steps.md",
        "---\ndate: 2021-08-01\n---\n1. Install:\n\n   ```rust\n   fn install() {}\n   ```\n\n2. Run\n",
    );

    let site = website();
    publisher(&site, &fx).plugin(SyntaxHighlight::new()).publish().unwrap();

    let html = read(&fx.output.join("beta/steps/index.html"));
    assert!(html.contains("install"));
    assert!(html.contains("<pre style="));
}
