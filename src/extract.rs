//! Readable-content extraction from raw page HTML.
//!
//! Providers hand back whole pages; this module pulls out the pieces the
//! pipeline cares about:
//!
//! - **Text**: paragraph and heading elements, blank-line separated, with
//!   short navigation/boilerplate fragments dropped
//! - **Image**: `og:image` meta tag, then `twitter:image`, then the first
//!   inline `<img>`; relative URLs resolved against the page URL
//! - **Title**: the `<title>` element, when present and non-empty
//!
//! Parsing is synchronous; no document handle is held across an await point.

use crate::models::Extraction;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use url::Url;

/// Minimum length of at least one paragraph for an extraction to count as
/// article content rather than boilerplate.
pub const MIN_PARAGRAPH_CHARS: usize = 80;

/// Text fragments shorter than this are treated as navigation/boilerplate
/// and dropped, unless they are headings.
const MIN_FRAGMENT_CHARS: usize = 40;

static BODY_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p, h1, h2, h3").expect("static selector"));
static OG_IMAGE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="og:image"]"#).expect("static selector"));
static TWITTER_IMAGE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="twitter:image"]"#).expect("static selector"));
static IMG_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("img[src]").expect("static selector"));
static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("title").expect("static selector"));

/// Extract text, image URL, and title from a page.
///
/// # Arguments
///
/// * `html` - The raw page HTML as returned by a provider
/// * `page_url` - The page's own URL, used to resolve relative image paths
pub fn extract_page(html: &str, page_url: &Url) -> Extraction {
    let document = Html::parse_document(html);
    Extraction {
        text: extract_text(&document),
        image_url: extract_image(&document, page_url),
        title: extract_title(&document),
    }
}

/// True when the text contains at least one paragraph long enough to be
/// article content. The success criterion for a provider attempt.
pub fn meets_minimum(text: &str) -> bool {
    text.split("\n\n")
        .any(|para| para.trim().chars().count() > MIN_PARAGRAPH_CHARS)
}

fn extract_text(document: &Html) -> String {
    let mut fragments = Vec::new();
    for element in document.select(&BODY_SELECTOR) {
        let text = element.text().collect::<Vec<_>>().join(" ");
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.is_empty() {
            continue;
        }
        let is_heading = matches!(element.value().name(), "h1" | "h2" | "h3");
        if is_heading || text.chars().count() >= MIN_FRAGMENT_CHARS {
            fragments.push(text);
        }
    }
    fragments.join("\n\n")
}

fn extract_image(document: &Html, page_url: &Url) -> Option<String> {
    let meta_content = |selector: &Selector| {
        document
            .select(selector)
            .filter_map(|el| el.value().attr("content"))
            .find(|content| !content.trim().is_empty())
            .map(str::to_string)
    };

    let candidate = meta_content(&OG_IMAGE_SELECTOR)
        .or_else(|| meta_content(&TWITTER_IMAGE_SELECTOR))
        .or_else(|| {
            document
                .select(&IMG_SELECTOR)
                .filter_map(|el| el.value().attr("src"))
                .find(|src| !src.trim().is_empty())
                .map(str::to_string)
        })?;

    page_url.join(candidate.trim()).ok().map(|u| u.to_string())
}

fn extract_title(document: &Html) -> Option<String> {
    document
        .select(&TITLE_SELECTOR)
        .map(|el| el.text().collect::<String>())
        .map(|t| t.trim().to_string())
        .find(|t| !t.is_empty())
}
