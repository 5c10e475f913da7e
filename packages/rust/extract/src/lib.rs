//! Page fetching and rule-driven HTML section extraction.
//!
//! A curriculum page is parsed once and carved into named sections by the
//! per-collection-type templates in [`template`]. The [`menu`] module keeps
//! the navigation entries in sync with the sections that actually exist.

pub mod fetch;
pub mod menu;
pub mod section;
pub mod template;

pub use fetch::{HttpFetcher, PageFetcher};
pub use menu::Menu;
pub use section::{ExtractedSection, Extractor, Fragment, merge};
pub use template::{SectionSpec, TemplateRender, render, template_for};
