//! String-level rewrites applied to section markup before packaging.
//!
//! Each pass is a function `&str -> String`, applied in sequence by the
//! assembler. Packaged pages must stand alone, so inline links are
//! flattened to their text and embedded frames are dropped after their
//! video URLs have been collected.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

/// An inline image scheduled for localization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    /// Absolute source URL.
    pub url: String,
    /// Local name inside the archive's `files/` directory.
    pub filename: String,
}

/// Collect the `img` sources in a fragment, resolving root-relative paths
/// against the site base.
pub fn extract_images(html: &str, base: &Url) -> Vec<ImageRef> {
    let doc = Html::parse_fragment(html);
    let img_sel = Selector::parse("img[src]").expect("valid selector");

    let mut images = Vec::new();
    for img in doc.select(&img_sel) {
        let src = img.value().attr("src").unwrap_or_default();
        if src.is_empty() {
            continue;
        }
        let url = if src.starts_with('/') {
            match base.join(src) {
                Ok(u) => u.to_string(),
                Err(_) => continue,
            }
        } else {
            src.to_string()
        };
        let image = ImageRef {
            filename: name_from_url(&url),
            url,
        };
        if !images.contains(&image) {
            images.push(image);
        }
    }
    images
}

/// Point each collected image's `src` at its local filename.
pub fn rewrite_image_sources(html: &str, images: &[ImageRef], base: &Url) -> String {
    let doc = Html::parse_fragment(html);
    let img_sel = Selector::parse("img[src]").expect("valid selector");

    let mut result = html.to_string();
    for img in doc.select(&img_sel) {
        let Some(src) = img.value().attr("src") else {
            continue;
        };
        let absolute = if src.starts_with('/') {
            match base.join(src) {
                Ok(u) => u.to_string(),
                Err(_) => continue,
            }
        } else {
            src.to_string()
        };
        if let Some(image) = images.iter().find(|i| i.url == absolute) {
            result = result.replace(
                &format!("src=\"{src}\""),
                &format!("src=\"{}\"", image.filename),
            );
        }
    }
    result
}

// ---------------------------------------------------------------------------
// Link and frame stripping
// ---------------------------------------------------------------------------

/// Replace every anchor with its inner content. Offline pages have nowhere
/// for the links to go.
pub fn strip_inline_links(html: &str) -> String {
    static A_TAG_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"</?a(?:\s[^>]*)?>").expect("valid regex"));

    A_TAG_RE.replace_all(html, "").to_string()
}

/// Drop embedded frames. Their video URLs are collected beforehand by
/// [`crate::video::collect_video_urls`].
pub fn remove_iframes(html: &str) -> String {
    static IFRAME_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)<iframe(?:\s[^>]*)?>.*?</iframe>|<iframe(?:\s[^>]*)?/>")
            .expect("valid regex")
    });

    IFRAME_RE.replace_all(html, "").to_string()
}

/// The last path segment of a URL, query and fragment excluded.
pub fn name_from_url(url: &str) -> String {
    let trimmed = url
        .split(['?', '#'])
        .next()
        .unwrap_or(url)
        .trim_end_matches('/');
    trimmed
        .rsplit('/')
        .next()
        .unwrap_or(trimmed)
        .to_string()
}
