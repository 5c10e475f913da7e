//! Navigation menu derived from a page's curriculum nav.
//!
//! Entries keep the order they appear in the nav. Each entry must end up
//! linked to a rendered section before packaging; an unlinked entry is a
//! template/page mismatch and fails validation.

use scraper::{Html, Selector};
use tracing::debug;

use currichef_shared::{ChefError, Result};

/// Nav entries that never become sections, in normalized form.
const EXCLUDED_TITLES: &[&str] = &["attachments", "comments"];

// ---------------------------------------------------------------------------
// Menu
// ---------------------------------------------------------------------------

/// One navigation entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    /// Normalized key, matched against a template entry's menu name.
    pub name: String,
    /// Display text, as it appeared in the nav.
    pub text: String,
    /// Output file this entry points at inside the document archive.
    pub filename: String,
    /// Set once a rendered section claims the entry.
    pub linked: bool,
}

/// Ordered navigation menu for one curriculum document.
#[derive(Debug, Clone, Default)]
pub struct Menu {
    entries: Vec<MenuEntry>,
}

impl Menu {
    /// Build the menu from the page's `div#CurriculumNav` list items.
    ///
    /// "Quick Look" leads and "Info" trails regardless of the nav contents;
    /// attachment and comment entries are dropped.
    pub fn from_page(doc: &Html) -> Self {
        let mut menu = Self::default();
        menu.add("Quick Look");

        let li_sel = Selector::parse("div#CurriculumNav li").expect("valid selector");
        for li in doc.select(&li_sel) {
            let text = li.text().collect::<String>().trim().to_string();
            if !text.is_empty() {
                menu.add(&text);
            }
        }

        menu.add("Info");
        menu
    }

    /// Append an entry unless its title is excluded. Re-adding an existing
    /// title keeps the original position.
    pub fn add(&mut self, title: &str) {
        let name = normalize_title(title);
        if EXCLUDED_TITLES.contains(&name.as_str()) {
            debug!(title, "skipping excluded nav entry");
            return;
        }
        if self.entries.iter().any(|e| e.name == name) {
            return;
        }
        self.entries.push(MenuEntry {
            filename: format!("{name}.html"),
            name,
            text: title.to_string(),
            linked: false,
        });
    }

    /// Link a rendered section to its entry, returning the output filename.
    /// `None` when the page's nav never listed this section.
    pub fn link(&mut self, menu_name: &str) -> Option<String> {
        let entry = self.entries.iter_mut().find(|e| e.name == menu_name)?;
        entry.linked = true;
        Some(entry.filename.clone())
    }

    /// Drop the entry for a section that turned out to be absent from the
    /// page body.
    pub fn unregister(&mut self, menu_name: &str) {
        self.entries.retain(|e| e.name != menu_name);
    }

    /// The `<ul>` navigation markup shared by every section page.
    ///
    /// The active entry renders as plain text so the current page does not
    /// link to itself.
    pub fn render_navigation(&self, directory: &str, active: Option<&str>) -> String {
        let mut out = String::from("<ul>");
        for entry in &self.entries {
            out.push_str("<li>");
            if active == Some(entry.name.as_str()) {
                out.push_str(&entry.text);
            } else {
                out.push_str(&format!(
                    r#"<a href="{directory}{}">{}</a>"#,
                    entry.filename, entry.text
                ));
            }
            out.push_str("</li>");
        }
        out.push_str("</ul>");
        out
    }

    /// The archive's index page: the bare navigation list.
    pub fn index_document(&self) -> String {
        format!(
            r#"<html><head><meta charset="UTF-8"></head><body>{}</body></html>"#,
            self.render_navigation("files/", None)
        )
    }

    /// Every entry must be linked before packaging.
    pub fn validate(&self) -> Result<()> {
        for entry in &self.entries {
            if !entry.linked {
                return Err(ChefError::IncompleteMenu {
                    entry: entry.name.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn entries(&self) -> &[MenuEntry] {
        &self.entries
    }
}

/// Lowercased, with spaces and slashes mapped to underscores. This is the
/// key the template tables use.
fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase().replace([' ', '/'], "_")
}
