//! Collection assembly: one curriculum page → one packaged document
//! subtree.
//!
//! Parsing is synchronous and front-loaded: everything the async packaging
//! phase needs is pulled out of the DOM into owned strings first, so no
//! parsed document is ever held across an await.

use std::path::PathBuf;

use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

use currichef_extract::{template, Menu, PageFetcher};
use currichef_media::{
    self as media, ResolveOptions, VideoInfoProvider, VideoLinkCollector,
};
use currichef_shared::{
    ChefError, CollectionType, ContentKind, ContentNode, FileRef, LicenseInfo,
    ResourceDescriptor, Result,
};

use crate::context::CrossRefContext;
use crate::sink::ArchiveWriter;

/// Fallback copyright holder when the page carries no Copyright section.
const DEFAULT_HOLDER: &str = "TeachEngineering";

/// Knobs for one assembly run, shared across collections.
#[derive(Debug, Clone)]
pub struct AssembleOptions {
    pub base_url: Url,
    pub language: String,
    /// Root for downloaded PDFs and videos (`<data_dir>/pdfs/<title>`,
    /// `<data_dir>/videos`).
    pub data_dir: PathBuf,
    pub download_videos: bool,
    pub record_embed_only: bool,
    pub include_video_channels: bool,
    pub max_video_height: u32,
}

/// One assembled collection, ready for the tree composer.
#[derive(Debug)]
pub struct AssembledCollection {
    pub node: ContentNode,
    pub subject_areas: Vec<String>,
    pub url: String,
}

// ---------------------------------------------------------------------------
// Synchronous page carving
// ---------------------------------------------------------------------------

/// Everything the packaging phase needs, carved out of the parsed page.
#[derive(Debug)]
struct PageParts {
    title: String,
    description: String,
    holder: String,
    menu: Menu,
    /// (output filename, section markup), in template order.
    sections: Vec<(String, String)>,
    subject_areas: Vec<String>,
    schedule_links: Vec<String>,
}

fn carve_page(
    html: &str,
    descriptor: &ResourceDescriptor,
    base_url: &Url,
) -> Result<PageParts> {
    let doc = Html::parse_document(html);

    let mut menu = Menu::from_page(&doc);
    let mut sections = Vec::new();
    let mut schedule_html = None;

    for (spec, section) in template::render(&doc, descriptor.collection) {
        match section {
            Some(section) => match menu.link(spec.menu_name) {
                Some(filename) => {
                    if descriptor.collection == CollectionType::CurricularUnit
                        && spec.id == "schedule"
                    {
                        schedule_html = Some(section.html.clone());
                    }
                    sections.push((filename, section.html));
                }
                None => {
                    debug!(section = spec.id, "section present but absent from nav");
                }
            },
            None => menu.unregister(spec.menu_name),
        }
    }

    menu.validate()?;

    let schedule_links = schedule_html
        .as_deref()
        .map(|html| resource_links(html, base_url))
        .unwrap_or_default();

    Ok(PageParts {
        title: page_title(&doc).unwrap_or_else(|| descriptor.title.clone()),
        description: og_description(&doc).unwrap_or_else(|| descriptor.summary.clone()),
        holder: copyright_holder(&doc).unwrap_or_else(|| DEFAULT_HOLDER.to_string()),
        menu,
        sections,
        subject_areas: subject_areas(&doc),
        schedule_links,
    })
}

/// `span.title-prefix` + `span.curriculum-title`, when the page has them.
fn page_title(doc: &Html) -> Option<String> {
    let title_sel = Selector::parse("span.curriculum-title").expect("valid selector");
    let prefix_sel = Selector::parse("span.title-prefix").expect("valid selector");

    let title = doc
        .select(&title_sel)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())?;
    let prefix = doc
        .select(&prefix_sel)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string());

    Some(match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{prefix} {title}"),
        _ => title,
    })
}

fn og_description(doc: &Html) -> Option<String> {
    let sel = Selector::parse(r#"meta[property="og:description"]"#).expect("valid selector");
    doc.select(&sel)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(str::to_string)
}

/// Text after the copyright sign in the page's Copyright section.
fn copyright_holder(doc: &Html) -> Option<String> {
    let section_sel = Selector::parse("section").expect("valid selector");
    let h3_sel = Selector::parse("h3").expect("valid selector");

    for section in doc.select(&section_sel) {
        let is_copyright = section
            .select(&h3_sel)
            .next()
            .map(|h| h.text().collect::<String>().trim() == "Copyright")
            .unwrap_or(false);
        if !is_copyright {
            continue;
        }
        let text: String = section.text().collect();
        if let Some(idx) = text.find('©') {
            let holder = text[idx + '©'.len_utf8()..].trim().to_string();
            if !holder.is_empty() {
                return Some(holder);
            }
        }
    }
    None
}

/// Subject areas from the quick-look box; empty when the page lists none.
fn subject_areas(doc: &Html) -> Vec<String> {
    let sel = Selector::parse("div.quick-look a.subject-area").expect("valid selector");
    let mut areas: Vec<String> = Vec::new();
    for a in doc.select(&sel) {
        let area = a.text().collect::<String>().trim().to_string();
        if !area.is_empty() && !areas.contains(&area) {
            areas.push(area);
        }
    }
    areas
}

/// Lesson and activity URLs referenced from a fragment, absolute and
/// deduplicated in document order.
fn resource_links(html: &str, base_url: &Url) -> Vec<String> {
    let doc = Html::parse_fragment(html);
    let a_sel = Selector::parse("a[href]").expect("valid selector");

    let mut links = Vec::new();
    for a in doc.select(&a_sel) {
        let href = a.value().attr("href").unwrap_or_default();
        if !href.contains("/lessons/view/") && !href.contains("/activities/view/") {
            continue;
        }
        let Ok(url) = base_url.join(href) else {
            continue;
        };
        let url = url.to_string();
        if !links.contains(&url) {
            links.push(url);
        }
    }
    links
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Assemble one descriptor into a packaged document subtree.
///
/// The caller owns the archive and its path; `archive_path` is what the
/// emitted file refs point at.
#[instrument(skip_all, fields(collection = %descriptor.collection, id = %descriptor.id))]
pub async fn assemble<F, P, A>(
    fetcher: &F,
    videos: &P,
    collector: &VideoLinkCollector,
    archive: &mut A,
    archive_path: &str,
    descriptor: &ResourceDescriptor,
    ctx: &mut CrossRefContext,
    opts: &AssembleOptions,
) -> Result<AssembledCollection>
where
    F: PageFetcher,
    P: VideoInfoProvider,
    A: ArchiveWriter,
{
    info!(url = %descriptor.url, "assembling collection");
    let html = fetcher.fetch(&descriptor.url).await?;
    let parts = carve_page(&html, descriptor, &opts.base_url)?;

    for link in &parts.schedule_links {
        ctx.record_schedule_link(&descriptor.url, link);
    }

    let mut node = ContentNode::topic(&descriptor.url, &parts.title)
        .with_description(&parts.description)
        .with_language(&opts.language)
        .with_license(LicenseInfo::cc_by(&parts.holder));

    // Menu index plus one page per present section, all inside the
    // per-collection archive.
    archive.add_bytes("index.html", parts.menu.index_document().as_bytes())?;

    for (filename, section_html) in &parts.sections {
        let images = media::extract_images(section_html, &opts.base_url);
        for image in &images {
            match fetcher.fetch_bytes(&image.url).await {
                Ok(bytes) => archive.add_bytes(&format!("files/{}", image.filename), &bytes)?,
                Err(e) => warn!(url = %image.url, error = %e, "skipping image"),
            }
        }

        let mut content = media::rewrite_image_sources(section_html, &images, &opts.base_url);
        content = media::remove_iframes(&content);
        content = media::strip_inline_links(&content);

        let active = filename.trim_end_matches(".html");
        let nav = parts.menu.render_navigation("", Some(active));
        let page = format!(
            r#"<html><head><meta charset="UTF-8"></head><body>{nav}{content}</body></html>"#
        );
        archive.add_bytes(&format!("files/{filename}"), page.as_bytes())?;
    }

    archive.finish()?;

    node.children.push(
        ContentNode {
            kind: ContentKind::Html5,
            source_id: format!("{}#menu", descriptor.url),
            title: "Menu Index".into(),
            description: String::new(),
            language: opts.language.clone(),
            license: None,
            children: Vec::new(),
            files: vec![FileRef::Html5 {
                path: archive_path.to_string(),
            }],
            placeholder: false,
        },
    );

    // Attachments and videos are searched across the whole page; some sit
    // outside any templated section.
    if let Some(files) = assemble_pdfs(fetcher, &html, &parts.title, opts).await? {
        node.children.push(files);
    }
    if let Some(video_topic) = assemble_videos(videos, collector, &html, descriptor, opts).await? {
        node.children.push(video_topic);
    }

    Ok(AssembledCollection {
        node,
        subject_areas: parts.subject_areas,
        url: descriptor.url.clone(),
    })
}

/// Download the page's PDF attachments into a "Files" topic.
async fn assemble_pdfs<F: PageFetcher>(
    fetcher: &F,
    html: &str,
    title: &str,
    opts: &AssembleOptions,
) -> Result<Option<ContentNode>> {
    let links = media::extract_pdf_links(html, &opts.base_url);
    if links.is_empty() {
        return Ok(None);
    }

    let dir = opts.data_dir.join("pdfs").join(title);
    let downloaded = media::download_pdfs(fetcher, &links, &dir).await?;
    if downloaded.is_empty() {
        return Ok(None);
    }

    let mut topic = ContentNode::topic(dir.display().to_string(), "Files")
        .with_language(&opts.language);
    for pdf in downloaded {
        topic.children.push(
            ContentNode {
                kind: ContentKind::Document,
                source_id: pdf.url,
                title: pdf.name.trim_end_matches(".pdf").to_string(),
                description: String::new(),
                language: opts.language.clone(),
                license: None,
                children: Vec::new(),
                files: vec![FileRef::Document {
                    path: pdf.path.display().to_string(),
                }],
                placeholder: false,
            },
        );
    }
    Ok(Some(topic))
}

/// Resolve the page's video references into a "Videos" topic.
async fn assemble_videos<P: VideoInfoProvider>(
    videos: &P,
    collector: &VideoLinkCollector,
    html: &str,
    descriptor: &ResourceDescriptor,
    opts: &AssembleOptions,
) -> Result<Option<ContentNode>> {
    let urls = collector.collect(html).await;
    if urls.is_empty() {
        return Ok(None);
    }

    let resolve_opts = ResolveOptions {
        download: opts.download_videos,
        max_height: opts.max_video_height,
        record_embed_only: opts.record_embed_only,
    };
    let video_dir = opts.data_dir.join("videos");

    let mut topic = ContentNode::topic(format!("{}#videos", descriptor.url), "Videos")
        .with_language(&opts.language);
    for url in &urls {
        let Some(resource) = media::resolve_video(videos, url, resolve_opts, &video_dir).await?
        else {
            continue;
        };

        let mut files = Vec::new();
        if let Some(path) = &resource.path {
            files.push(FileRef::Video {
                path: path.display().to_string(),
            });
        }
        for language in &resource.subtitle_languages {
            files.push(FileRef::Subtitles {
                youtube_id: resource.id.clone(),
                language: language.clone(),
            });
        }

        topic.children.push(
            ContentNode {
                kind: ContentKind::Video,
                source_id: resource.url.clone(),
                title: resource.title.clone(),
                description: String::new(),
                language: opts.language.clone(),
                license: Some(LicenseInfo::cc_by(DEFAULT_HOLDER)),
                children: Vec::new(),
                files,
                placeholder: false,
            },
        );
    }

    if topic.children.is_empty() {
        return Ok(None);
    }
    Ok(Some(topic))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemoryArchive;
    use currichef_media::VideoInfo;
    use currichef_shared::Result;

    const LESSON_PAGE: &str = r#"<html>
    <head><meta property="og:description" content="How circuits work."></head>
    <body>
        <span class="title-prefix">Lesson:</span>
        <span class="curriculum-title">Completing the Circuit</span>
        <div id="CurriculumNav"><ul>
            <li>Summary</li>
            <li>Learning Objectives</li>
            <li>Attachments</li>
        </ul></div>
        <div class="curriculum-header"><h1>Completing the Circuit</h1></div>
        <div class="quick-look">
            <h3>Quick Look</h3>
            <div id="PrintShareModal"></div>
            <a class="subject-area" href="/browse?s=ps">Physical Science</a>
        </div>
        <section id="summary"><h3>Summary</h3>
            <p>Students explore circuits.</p>
            <img src="/content/les/circuit.png">
        </section>
        <section id="objectives"><h3>Learning Objectives</h3>
            <a href="/content/les/worksheet.pdf">Worksheet</a>
        </section>
        <section><h3>Copyright</h3><p>© 2011 Regents of the University of Colorado</p></section>
    </body></html>"#;

    fn descriptor() -> ResourceDescriptor {
        ResourceDescriptor {
            id: "cub_circuit_lesson01".into(),
            url: "https://www.teachengineering.org/lessons/view/cub_circuit_lesson01".into(),
            spanish_url: None,
            spanish_version_id: None,
            collection: CollectionType::Lesson,
            title: "Completing the Circuit".into(),
            summary: "fallback summary".into(),
            grade_target: Some(4),
            grade_range: None,
        }
    }

    fn base() -> Url {
        Url::parse("https://www.teachengineering.org").unwrap()
    }

    #[test]
    fn carve_extracts_title_description_and_holder() {
        let parts = carve_page(LESSON_PAGE, &descriptor(), &base()).unwrap();
        assert_eq!(parts.title, "Lesson: Completing the Circuit");
        assert_eq!(parts.description, "How circuits work.");
        assert_eq!(parts.holder, "2011 Regents of the University of Colorado");
        assert_eq!(parts.subject_areas, ["Physical Science"]);
    }

    #[test]
    fn carve_keeps_only_nav_present_sections() {
        let parts = carve_page(LESSON_PAGE, &descriptor(), &base()).unwrap();
        let filenames: Vec<&str> = parts.sections.iter().map(|(f, _)| f.as_str()).collect();
        // quick_look and info are forced entries; summary and objectives
        // come from the nav. Everything else was unregistered.
        assert_eq!(
            filenames,
            [
                "quick_look.html",
                "summary.html",
                "learning_objectives.html",
                "info.html"
            ]
        );
        assert!(parts.menu.validate().is_ok());
    }

    #[test]
    fn carve_fails_on_nav_entry_without_section() {
        let page = r#"<html><body>
            <div id="CurriculumNav"><ul><li>Procedure</li></ul></div>
            <div class="quick-look"><h3>Quick Look</h3><div id="PrintShareModal"></div></div>
            <section><h3>Copyright</h3><p>© Holder</p></section>
        </body></html>"#;
        let err = carve_page(page, &descriptor(), &base()).unwrap_err();
        assert!(matches!(err, ChefError::IncompleteMenu { entry } if entry == "procedure"));
    }

    #[test]
    fn schedule_links_collected_for_units() {
        let page = r#"<html><body>
            <div id="CurriculumNav"><ul><li>Unit Schedule</li></ul></div>
            <div class="quick-look"><h3>Quick Look</h3><div id="PrintShareModal"></div></div>
            <section id="schedule"><h3>Unit Schedule</h3>
                <a href="/lessons/view/cub_energy_lesson01">Lesson 1</a>
                <a href="/activities/view/cub_energy_activity01">Activity 1</a>
                <a href="/lessons/view/cub_energy_lesson01">Lesson 1 again</a>
                <a href="/curricularunits/view/other_unit">Other unit</a>
            </section>
            <section><h3>Contributors</h3><p>Jane</p></section>
        </body></html>"#;
        let mut desc = descriptor();
        desc.collection = CollectionType::CurricularUnit;

        let parts = carve_page(page, &desc, &base()).unwrap();
        assert_eq!(
            parts.schedule_links,
            [
                "https://www.teachengineering.org/lessons/view/cub_energy_lesson01",
                "https://www.teachengineering.org/activities/view/cub_energy_activity01"
            ]
        );
    }

    struct StubFetcher;

    impl PageFetcher for StubFetcher {
        async fn fetch(&self, _url: &str) -> Result<String> {
            Ok(LESSON_PAGE.to_string())
        }

        async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
            if url.ends_with(".png") {
                Ok(b"\x89PNG".to_vec())
            } else {
                Ok(b"%PDF-1.4".to_vec())
            }
        }
    }

    struct StubVideos;

    impl VideoInfoProvider for StubVideos {
        async fn probe(&self, _url: &str) -> Result<VideoInfo> {
            Err(ChefError::parse("no videos in this test"))
        }

        async fn download(&self, _url: &str, _dest: &std::path::Path, _h: u32) -> Result<()> {
            unreachable!("probe always fails")
        }
    }

    fn options(data_dir: PathBuf) -> AssembleOptions {
        AssembleOptions {
            base_url: base(),
            language: "en".into(),
            data_dir,
            download_videos: false,
            record_embed_only: false,
            include_video_channels: false,
            max_video_height: 720,
        }
    }

    #[tokio::test]
    async fn assemble_packages_sections_and_attachments() {
        let data_dir =
            std::env::temp_dir().join(format!("currichef-asm-{}", std::process::id()));
        let mut archive = MemoryArchive::default();
        let mut ctx = CrossRefContext::new();
        let collector = VideoLinkCollector::new(reqwest::Client::new(), false);

        let assembled = assemble(
            &StubFetcher,
            &StubVideos,
            &collector,
            &mut archive,
            "lesson.zip",
            &descriptor(),
            &mut ctx,
            &options(data_dir.clone()),
        )
        .await
        .unwrap();

        let names: Vec<&str> = archive.entries.iter().map(|(n, _)| n.as_str()).collect();
        assert!(names.contains(&"index.html"));
        assert!(names.contains(&"files/summary.html"));
        assert!(names.contains(&"files/circuit.png"));
        assert!(archive.finished);

        // Packaged section pages are self-contained.
        let (_, summary) = archive
            .entries
            .iter()
            .find(|(n, _)| n == "files/summary.html")
            .unwrap();
        let summary = String::from_utf8(summary.clone()).unwrap();
        assert!(summary.contains(r#"src="circuit.png""#));
        assert!(summary.contains("<li>Summary</li>"));
        assert!(!summary.contains("<a href=\"/"));

        let node = &assembled.node;
        assert_eq!(node.title, "Lesson: Completing the Circuit");
        assert_eq!(
            node.license.as_ref().unwrap().copyright_holder,
            "2011 Regents of the University of Colorado"
        );
        assert_eq!(node.children[0].title, "Menu Index");

        let files = node.children.iter().find(|c| c.title == "Files").unwrap();
        assert_eq!(files.children.len(), 1);
        assert_eq!(files.children[0].title, "worksheet");

        assert_eq!(assembled.subject_areas, ["Physical Science"]);

        let _ = std::fs::remove_dir_all(&data_dir);
    }
}
