//! Section extraction rules and fragment composition.
//!
//! A section is located either by a stable element id or, where the markup
//! offers none, by a heading-text search. Absence of a section is expected
//! (`None`), never an error. Fragments form a monoid under [`merge`] with
//! absence as the identity, which is what lets composite sections (like the
//! "info" block) be built from several independent rules.

use scraper::{ElementRef, Html, Selector};

// ---------------------------------------------------------------------------
// Fragment
// ---------------------------------------------------------------------------

/// A detached piece of page markup, owned by the section that extracted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Title from the fragment's first `h3`, when present.
    pub title: Option<String>,
    /// The serialized markup sub-tree.
    pub html: String,
}

/// Concatenate two optional fragments.
///
/// Associative, with `None` as identity: `merge(None, x) == x == merge(x, None)`.
/// The first operand's title wins when both carry one.
pub fn merge(a: Option<Fragment>, b: Option<Fragment>) -> Option<Fragment> {
    match (a, b) {
        (Some(a), Some(b)) => Some(Fragment {
            title: a.title.or(b.title),
            html: format!("{}{}", a.html, b.html),
        }),
        (a, None) => a,
        (None, b) => b,
    }
}

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

/// A single extraction rule against a parsed page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extractor {
    /// `section#<id>`, where `<id>` is the owning template entry's id.
    ById,
    /// The quick-look box (`div.quick-look`), with scripts, buttons, and
    /// the print/share modal stripped out.
    QuickLook,
    /// The page header block (`div.curriculum-header`).
    CurriculumHeader,
    /// The first `section` whose `h3` text matches the label after
    /// case/whitespace normalization. Used where the markup carries no id.
    Heading(&'static str),
}

impl Extractor {
    /// Apply the rule. `section_id` is the template entry's id, consumed
    /// only by [`Extractor::ById`].
    pub fn apply(&self, doc: &Html, section_id: &str) -> Option<Fragment> {
        match self {
            Self::ById => {
                let sel = Selector::parse(&format!("section#{section_id}")).ok()?;
                let el = doc.select(&sel).next()?;
                Some(Fragment {
                    title: first_h3(el),
                    html: el.html(),
                })
            }
            Self::QuickLook => {
                let sel = Selector::parse("div.quick-look").ok()?;
                let el = doc.select(&sel).next()?;
                Some(Fragment {
                    title: first_h3(el),
                    html: strip_page_chrome(&el.html()),
                })
            }
            Self::CurriculumHeader => {
                let sel = Selector::parse("div.curriculum-header").ok()?;
                let el = doc.select(&sel).next()?;
                Some(Fragment {
                    title: first_h3(el),
                    html: el.html(),
                })
            }
            Self::Heading(label) => find_section_by_heading(doc, label),
        }
    }
}

/// Locate a `section` element by its `h3` heading text.
fn find_section_by_heading(doc: &Html, label: &str) -> Option<Fragment> {
    let section_sel = Selector::parse("section").expect("valid selector");
    let wanted = normalize_text(label);

    for section in doc.select(&section_sel) {
        if let Some(title) = first_h3(section) {
            if normalize_text(&title) == wanted {
                return Some(Fragment {
                    title: Some(title),
                    html: section.html(),
                });
            }
        }
    }
    None
}

/// Text of the element's first `h3` descendant, whitespace-trimmed.
fn first_h3(el: ElementRef<'_>) -> Option<String> {
    let h3_sel = Selector::parse("h3").expect("valid selector");
    el.select(&h3_sel).next().map(|h| {
        h.text().collect::<String>().trim().to_string()
    })
}

/// Case/whitespace-insensitive comparison key for heading matches.
fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Remove scripts, buttons, and the print/share modal from a fragment.
fn strip_page_chrome(html: &str) -> String {
    let doc = Html::parse_fragment(html);
    let chrome_sel =
        Selector::parse("script, button, #PrintShareModal").expect("valid selector");

    let mut result = html.to_string();
    for el in doc.select(&chrome_sel) {
        let outer = el.html();
        result = result.replace(&outer, "");
    }
    result
}

// ---------------------------------------------------------------------------
// ExtractedSection
// ---------------------------------------------------------------------------

/// A rendered section: a fragment bound to its template entry.
#[derive(Debug, Clone)]
pub struct ExtractedSection {
    /// The template entry's id; also the menu entry this section links to.
    pub id: &'static str,
    /// Navigation label for the menu.
    pub menu_name: &'static str,
    /// Title from the markup, when the fragment carried one.
    pub title: Option<String>,
    /// The owned markup fragment.
    pub html: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
        <div class="curriculum-header"><h1>Power Play</h1></div>
        <div class="quick-look">
            <h3>Quick Look</h3>
            <script>trackView();</script>
            <button>Print</button>
            <div id="PrintShareModal"><p>share</p></div>
            <p>Grade level: 5</p>
        </div>
        <section id="summary"><h3>Summary</h3><p>All about energy.</p></section>
        <section><h3>  Engineering   Connection </h3><p>Engineers build.</p></section>
        <section id="intro"><h3>Introduction</h3><p>Welcome.</p></section>
    </body></html>"#;

    fn frag(html: &str) -> Option<Fragment> {
        Some(Fragment {
            title: None,
            html: html.to_string(),
        })
    }

    #[test]
    fn merge_has_absence_as_identity() {
        let x = frag("<p>x</p>");
        assert_eq!(merge(None, x.clone()), x);
        assert_eq!(merge(x.clone(), None), x);
        assert_eq!(merge(None, None), None);
    }

    #[test]
    fn merge_is_associative() {
        let a = frag("<p>a</p>");
        let b = frag("<p>b</p>");
        let c = frag("<p>c</p>");

        let left = merge(merge(a.clone(), b.clone()), c.clone());
        let right = merge(a, merge(b, c));
        assert_eq!(left, right);
        assert_eq!(left.unwrap().html, "<p>a</p><p>b</p><p>c</p>");
    }

    #[test]
    fn by_id_extracts_section_and_title() {
        let doc = Html::parse_document(PAGE);
        let fragment = Extractor::ById.apply(&doc, "summary").unwrap();
        assert_eq!(fragment.title.as_deref(), Some("Summary"));
        assert!(fragment.html.contains("All about energy."));
    }

    #[test]
    fn by_id_absent_is_none() {
        let doc = Html::parse_document(PAGE);
        assert!(Extractor::ById.apply(&doc, "background").is_none());
    }

    #[test]
    fn quick_look_strips_chrome() {
        let doc = Html::parse_document(PAGE);
        let fragment = Extractor::QuickLook.apply(&doc, "quick").unwrap();
        assert!(fragment.html.contains("Grade level: 5"));
        assert!(!fragment.html.contains("<script"));
        assert!(!fragment.html.contains("<button"));
        assert!(!fragment.html.contains("PrintShareModal"));
    }

    #[test]
    fn heading_match_ignores_case_and_whitespace() {
        let doc = Html::parse_document(PAGE);
        let fragment = Extractor::Heading("engineering connection")
            .apply(&doc, "summary")
            .unwrap();
        assert!(fragment.html.contains("Engineers build."));
    }

    #[test]
    fn heading_absent_is_none() {
        let doc = Html::parse_document(PAGE);
        assert!(Extractor::Heading("Acknowledgements").apply(&doc, "info").is_none());
    }
}
