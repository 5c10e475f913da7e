//! Per-collection-type section templates.
//!
//! Each collection type renders through a fixed, ordered table of
//! [`SectionSpec`] entries. The order here is the order sections appear in
//! the packaged document and in the navigation menu.

use scraper::Html;

use currichef_shared::CollectionType;

use crate::section::{merge, ExtractedSection, Extractor, Fragment};

// ---------------------------------------------------------------------------
// SectionSpec
// ---------------------------------------------------------------------------

/// One entry in a collection type's template.
#[derive(Debug)]
pub struct SectionSpec {
    /// Element id consumed by [`Extractor::ById`]; also names the section's
    /// output file.
    pub id: &'static str,
    /// Menu key this section links to, in normalized form.
    pub menu_name: &'static str,
    /// Extraction rules, folded left-to-right under [`merge`].
    pub extractors: &'static [Extractor],
}

const BY_ID: &[Extractor] = &[Extractor::ById];

/// Composite tail shared by most templates: contributor and licensing
/// sections carry no element ids, only headings.
const INFO: &[Extractor] = &[
    Extractor::Heading("Contributors"),
    Extractor::Heading("Copyright"),
    Extractor::Heading("Supporting Program"),
    Extractor::Heading("Acknowledgements"),
];

const ACTIVITY: &[SectionSpec] = &[
    SectionSpec { id: "quick", menu_name: "quick_look", extractors: &[Extractor::QuickLook] },
    SectionSpec {
        id: "summary",
        menu_name: "summary",
        extractors: &[
            Extractor::CurriculumHeader,
            Extractor::ById,
            Extractor::Heading("Engineering Connection"),
        ],
    },
    SectionSpec { id: "prereq", menu_name: "pre-req_knowledge", extractors: BY_ID },
    SectionSpec { id: "objectives", menu_name: "learning_objectives", extractors: BY_ID },
    SectionSpec { id: "morelikethis", menu_name: "more_like_this", extractors: BY_ID },
    SectionSpec { id: "mats", menu_name: "materials_list", extractors: BY_ID },
    SectionSpec { id: "intro", menu_name: "introduction_motivation", extractors: BY_ID },
    SectionSpec { id: "vocab", menu_name: "vocabulary_definitions", extractors: BY_ID },
    SectionSpec { id: "procedure", menu_name: "procedure", extractors: BY_ID },
    SectionSpec { id: "safety", menu_name: "safety_issues", extractors: BY_ID },
    SectionSpec { id: "quest", menu_name: "investigating_questions", extractors: BY_ID },
    SectionSpec { id: "troubleshooting", menu_name: "troubleshooting_tips", extractors: BY_ID },
    SectionSpec { id: "assessment", menu_name: "assessment", extractors: BY_ID },
    SectionSpec { id: "scaling", menu_name: "activity_scaling", extractors: BY_ID },
    SectionSpec { id: "extensions", menu_name: "activity_extensions", extractors: BY_ID },
    SectionSpec { id: "multimedia", menu_name: "additional_multimedia_support", extractors: BY_ID },
    SectionSpec { id: "references", menu_name: "references", extractors: BY_ID },
    SectionSpec { id: "info", menu_name: "info", extractors: INFO },
];

const LESSON: &[SectionSpec] = &[
    SectionSpec { id: "quick", menu_name: "quick_look", extractors: &[Extractor::QuickLook] },
    SectionSpec {
        id: "summary",
        menu_name: "summary",
        extractors: &[
            Extractor::CurriculumHeader,
            Extractor::ById,
            Extractor::Heading("Engineering Connection"),
        ],
    },
    SectionSpec { id: "prereq", menu_name: "pre-req_knowledge", extractors: BY_ID },
    SectionSpec { id: "objectives", menu_name: "learning_objectives", extractors: BY_ID },
    SectionSpec { id: "morelikethis", menu_name: "more_like_this", extractors: BY_ID },
    SectionSpec { id: "intro", menu_name: "introduction_motivation", extractors: BY_ID },
    SectionSpec { id: "background", menu_name: "background", extractors: BY_ID },
    SectionSpec { id: "vocab", menu_name: "vocabulary_definitions", extractors: BY_ID },
    SectionSpec { id: "assoc", menu_name: "associated_activities", extractors: BY_ID },
    SectionSpec { id: "closure", menu_name: "lesson_closure", extractors: BY_ID },
    SectionSpec { id: "assessment", menu_name: "assessment", extractors: BY_ID },
    SectionSpec { id: "multimedia", menu_name: "additional_multimedia_support", extractors: BY_ID },
    SectionSpec { id: "extensions", menu_name: "extensions", extractors: BY_ID },
    SectionSpec { id: "references", menu_name: "references", extractors: BY_ID },
    SectionSpec { id: "info", menu_name: "info", extractors: INFO },
];

const CURRICULAR_UNIT: &[SectionSpec] = &[
    SectionSpec { id: "quick", menu_name: "quick_look", extractors: &[Extractor::QuickLook] },
    SectionSpec {
        id: "summary",
        menu_name: "summary",
        extractors: &[Extractor::CurriculumHeader, Extractor::ById],
    },
    SectionSpec { id: "morelikethis", menu_name: "more_like_this", extractors: BY_ID },
    SectionSpec { id: "overview", menu_name: "unit_overview", extractors: BY_ID },
    SectionSpec { id: "schedule", menu_name: "unit_schedule", extractors: BY_ID },
    SectionSpec { id: "assessment", menu_name: "assessment", extractors: BY_ID },
    SectionSpec { id: "info", menu_name: "info", extractors: INFO },
];

const SPRINKLE: &[SectionSpec] = &[
    SectionSpec { id: "quick", menu_name: "quick_look", extractors: &[Extractor::QuickLook] },
    SectionSpec {
        id: "intro",
        menu_name: "introduction",
        extractors: &[Extractor::CurriculumHeader, Extractor::ById],
    },
    SectionSpec { id: "sups", menu_name: "supplies", extractors: BY_ID },
    SectionSpec { id: "procedure", menu_name: "procedure", extractors: BY_ID },
    SectionSpec { id: "wrapup", menu_name: "wrap_up_-_thought_questions", extractors: BY_ID },
    SectionSpec { id: "morelikethis", menu_name: "more_like_this", extractors: BY_ID },
    SectionSpec { id: "info", menu_name: "info", extractors: INFO },
];

const MAKER_CHALLENGE: &[SectionSpec] = &[
    SectionSpec { id: "quick", menu_name: "quick_look", extractors: &[Extractor::QuickLook] },
    SectionSpec {
        id: "summary",
        menu_name: "maker_challenge_recap",
        extractors: &[Extractor::CurriculumHeader, Extractor::ById],
    },
    SectionSpec { id: "morelikethis", menu_name: "more_like_this", extractors: BY_ID },
    SectionSpec { id: "mats", menu_name: "maker_materials_&_supplies", extractors: BY_ID },
    SectionSpec { id: "kickoff", menu_name: "kickoff", extractors: BY_ID },
    SectionSpec { id: "resources", menu_name: "resources", extractors: BY_ID },
    SectionSpec { id: "makertime", menu_name: "maker_time", extractors: BY_ID },
    SectionSpec { id: "wrapup", menu_name: "wrap_up", extractors: BY_ID },
    SectionSpec { id: "tips", menu_name: "tips", extractors: BY_ID },
    SectionSpec { id: "other", menu_name: "other", extractors: BY_ID },
    SectionSpec { id: "acknowledgements", menu_name: "acknowledgements", extractors: BY_ID },
    // The maker challenge info block never carries an Acknowledgements
    // heading; that content lives in its own id-bearing section above.
    SectionSpec {
        id: "info",
        menu_name: "info",
        extractors: &[
            Extractor::Heading("Contributors"),
            Extractor::Heading("Copyright"),
            Extractor::Heading("Supporting Program"),
        ],
    },
];

/// The template for a collection type.
pub fn template_for(collection: CollectionType) -> &'static [SectionSpec] {
    match collection {
        CollectionType::Activity => ACTIVITY,
        CollectionType::Lesson => LESSON,
        CollectionType::CurricularUnit => CURRICULAR_UNIT,
        CollectionType::Sprinkle => SPRINKLE,
        CollectionType::MakerChallenge => MAKER_CHALLENGE,
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Iterator over a template's entries paired with their extracted sections.
///
/// Every entry is yielded, present or not, so the caller can unlink menu
/// entries for absent sections.
pub struct TemplateRender<'a> {
    doc: &'a Html,
    specs: std::slice::Iter<'static, SectionSpec>,
}

impl<'a> Iterator for TemplateRender<'a> {
    type Item = (&'static SectionSpec, Option<ExtractedSection>);

    fn next(&mut self) -> Option<Self::Item> {
        let spec = self.specs.next()?;

        let fragment = spec
            .extractors
            .iter()
            .fold(None, |acc, ex| merge(acc, ex.apply(self.doc, spec.id)));

        let section = fragment.map(|Fragment { title, html }| ExtractedSection {
            id: spec.id,
            menu_name: spec.menu_name,
            title,
            // Composite entries get one wrapper so downstream rewrites see a
            // single root element.
            html: if spec.extractors.len() > 1 {
                format!("<div>{html}</div>")
            } else {
                html
            },
        });

        Some((spec, section))
    }
}

/// Render a parsed page through the template for its collection type.
pub fn render(doc: &Html, collection: CollectionType) -> TemplateRender<'_> {
    TemplateRender {
        doc,
        specs: template_for(collection).iter(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LESSON_PAGE: &str = r#"<html><body>
        <div class="curriculum-header"><h1>Circuits</h1></div>
        <div class="quick-look"><h3>Quick Look</h3><p>Grades 3-5</p></div>
        <section id="summary"><h3>Summary</h3><p>Lesson summary.</p></section>
        <section><h3>Engineering Connection</h3><p>Relevance.</p></section>
        <section id="objectives"><h3>Learning Objectives</h3><ul><li>One</li></ul></section>
        <section><h3>Contributors</h3><p>Jane Doe</p></section>
        <section><h3>Copyright</h3><p>&copy; 2011 Regents</p></section>
    </body></html>"#;

    #[test]
    fn every_template_entry_is_yielded_in_order() {
        let doc = Html::parse_document(LESSON_PAGE);
        let ids: Vec<&str> = render(&doc, CollectionType::Lesson)
            .map(|(spec, _)| spec.id)
            .collect();
        let expected: Vec<&str> = template_for(CollectionType::Lesson)
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn missing_lesson_background_renders_as_absent() {
        let doc = Html::parse_document(LESSON_PAGE);
        let background = render(&doc, CollectionType::Lesson)
            .find(|(spec, _)| spec.id == "background")
            .unwrap();
        assert!(background.1.is_none());
    }

    #[test]
    fn composite_summary_merges_header_body_and_connection() {
        let doc = Html::parse_document(LESSON_PAGE);
        let (_, summary) = render(&doc, CollectionType::Lesson)
            .find(|(spec, _)| spec.id == "summary")
            .unwrap();
        let summary = summary.unwrap();
        assert!(summary.html.starts_with("<div>"));
        assert!(summary.html.contains("Circuits"));
        assert!(summary.html.contains("Lesson summary."));
        assert!(summary.html.contains("Relevance."));
    }

    #[test]
    fn partial_composite_still_renders() {
        // Info block with only two of the four headings present.
        let doc = Html::parse_document(LESSON_PAGE);
        let (_, info) = render(&doc, CollectionType::Lesson)
            .find(|(spec, _)| spec.id == "info")
            .unwrap();
        let info = info.unwrap();
        assert!(info.html.contains("Jane Doe"));
        assert!(info.html.contains("2011 Regents"));
    }

    #[test]
    fn simple_section_is_not_wrapped() {
        let doc = Html::parse_document(LESSON_PAGE);
        let (_, objectives) = render(&doc, CollectionType::Lesson)
            .find(|(spec, _)| spec.id == "objectives")
            .unwrap();
        assert!(objectives.unwrap().html.starts_with("<section"));
    }

    #[test]
    fn all_collection_types_have_quick_look_first_and_info_last() {
        for ct in [
            CollectionType::Activity,
            CollectionType::Lesson,
            CollectionType::CurricularUnit,
            CollectionType::Sprinkle,
            CollectionType::MakerChallenge,
        ] {
            let template = template_for(ct);
            assert_eq!(template.first().unwrap().id, "quick");
            assert_eq!(template.last().unwrap().id, "info");
        }
    }
}
