//! The two chef phases: `crawl` (discovery → resource tree file) and
//! `scrape` (resource tree file → packaged channel tree).
//!
//! The phases are decoupled on purpose: the intermediate file lets a long
//! scrape be re-run without re-hitting the search index.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};
use url::Url;

use currichef_discovery::ResourceBrowser;
use currichef_extract::PageFetcher;
use currichef_media::{VideoInfoProvider, VideoLinkCollector};
use currichef_shared::{
    AppConfig, ChannelTree, ChefError, LicenseInfo, ResourceDescriptor, ResourceTree, Result,
};

use crate::assembler::{assemble, AssembleOptions};
use crate::composer::TreeComposer;
use crate::context::CrossRefContext;
use crate::sink::{TreeWriter, ZipArchive};

/// Directory under the data dir for stage output files.
const TREES_DIR: &str = "trees";
/// Crawl phase output.
const CRAWL_OUTPUT: &str = "web_resource_tree.json";
/// Scrape phase output.
const SCRAPE_OUTPUT: &str = "channel_tree.json";

const CHANNEL_TITLE: &str = "TeachEngineering";
const CHANNEL_TITLE_ES: &str = "TeachEngineering (español)";
const CHANNEL_DESCRIPTION: &str = "The TeachEngineering digital library is a collaborative \
project between faculty, students and teachers associated with five founding partner \
universities, with National Science Foundation funding. The collection continues to grow \
and evolve with new additions submitted from more than 50 additional contributor \
organizations, a cadre of volunteer teacher and engineer reviewers, and feedback from \
teachers who use the curricula in their classrooms.";
const DEFAULT_THUMBNAIL: &str =
    "https://www.teachengineering.org/images/logos/v-636511398960000000/TELogoNew.png";

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Phase and per-item reporting for long runs.
pub trait Progress: Send + Sync {
    fn phase(&self, name: &str);
    fn item(&self, current: usize, total: usize, title: &str);
    fn done(&self, summary: &RunSummary);
}

/// No-op reporter for headless and test usage.
pub struct SilentProgress;

impl Progress for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn item(&self, _current: usize, _total: usize, _title: &str) {}
    fn done(&self, _summary: &RunSummary) {}
}

/// Outcome of a scrape run.
#[derive(Debug)]
pub struct RunSummary {
    pub resources: usize,
    pub assembled: usize,
    pub skipped: usize,
    pub tree_path: PathBuf,
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// Crawl phase
// ---------------------------------------------------------------------------

pub fn crawl_output_path(config: &AppConfig) -> PathBuf {
    Path::new(&config.scrape.data_dir)
        .join(TREES_DIR)
        .join(CRAWL_OUTPUT)
}

/// Enumerate every curriculum resource and persist the intermediate
/// resource tree.
#[instrument(skip_all)]
pub async fn crawl<W: TreeWriter>(
    config: &AppConfig,
    writer: &W,
    progress: &dyn Progress,
) -> Result<PathBuf> {
    progress.phase("Discovering resources");

    let base_url = parse_base_url(config)?;
    let browse_url = base_url
        .join("curriculum/browse")
        .map_err(|e| ChefError::config(format!("bad browse URL: {e}")))?;

    let browser = ResourceBrowser::new(browse_url.as_str(), &base_url, config.discovery.clone())?;
    let resources = browser.enumerate().await?;

    let mut tree = ResourceTree::new(CHANNEL_TITLE);
    tree.children = resources;

    let path = crawl_output_path(config);
    writer.write(&path, &tree)?;
    info!(resources = tree.children.len(), path = %path.display(), "crawl stage written");
    Ok(path)
}

// ---------------------------------------------------------------------------
// Scrape phase
// ---------------------------------------------------------------------------

/// Assemble every crawled resource and compose the channel tree.
///
/// Per-item failures are logged and skipped; the run continues. Only
/// configuration problems and an unreadable crawl file are fatal.
#[instrument(skip_all)]
pub async fn scrape<F, P, W>(
    config: &AppConfig,
    fetcher: &F,
    videos: &P,
    writer: &W,
    progress: &dyn Progress,
) -> Result<RunSummary>
where
    F: PageFetcher,
    P: VideoInfoProvider,
    W: TreeWriter,
{
    let start = Instant::now();
    let base_url = parse_base_url(config)?;
    let spanish = config.channel.language == "es";

    progress.phase("Reading crawl output");
    let crawl_path = crawl_output_path(config);
    let tree = read_resource_tree(&crawl_path)?;
    let descriptors = select_descriptors(tree.children, spanish);
    let total = descriptors.len();

    let data_dir = PathBuf::from(&config.scrape.data_dir);
    let assemble_opts = AssembleOptions {
        base_url: base_url.clone(),
        language: config.channel.language.clone(),
        data_dir: data_dir.clone(),
        download_videos: config.scrape.download_videos,
        record_embed_only: config.scrape.record_embed_only,
        include_video_channels: config.scrape.include_video_channels,
        max_video_height: config.scrape.max_video_height,
    };

    let collector = VideoLinkCollector::new(
        reqwest::Client::new(),
        config.scrape.include_video_channels,
    );
    let mut composer = TreeComposer::new(channel_root(config, spanish));
    let mut ctx = CrossRefContext::new();
    let mut assembled = 0usize;
    let mut skipped = 0usize;

    progress.phase("Assembling collections");
    for (i, descriptor) in descriptors.iter().enumerate() {
        progress.item(i + 1, total, &descriptor.title);

        let archive_path = data_dir.join("zips").join(format!("{}.zip", descriptor.id));
        let result = async {
            let mut archive = ZipArchive::create(&archive_path)?;
            assemble(
                fetcher,
                videos,
                &collector,
                &mut archive,
                &archive_path.display().to_string(),
                descriptor,
                &mut ctx,
                &assemble_opts,
            )
            .await
        }
        .await;

        match result {
            Ok(collection) => {
                composer.insert(
                    collection.node,
                    descriptor.collection,
                    &collection.subject_areas,
                    &ctx,
                );
                assembled += 1;
            }
            Err(e) => {
                warn!(url = %descriptor.url, error = %e, "skipping collection");
                // A failed assembly leaves a truncated archive behind.
                let _ = std::fs::remove_file(&archive_path);
                skipped += 1;
            }
        }

        if config.scrape.rate_limit_ms > 0 && i + 1 < total {
            tokio::time::sleep(Duration::from_millis(config.scrape.rate_limit_ms)).await;
        }
    }

    progress.phase("Composing channel tree");
    let channel = composer.resolve();

    let tree_path = data_dir.join(TREES_DIR).join(SCRAPE_OUTPUT);
    writer.write(&tree_path, &channel)?;

    let summary = RunSummary {
        resources: total,
        assembled,
        skipped,
        tree_path,
        elapsed: start.elapsed(),
    };
    progress.done(&summary);
    info!(
        resources = summary.resources,
        assembled = summary.assembled,
        skipped = summary.skipped,
        elapsed_ms = summary.elapsed.as_millis(),
        "scrape stage complete"
    );
    Ok(summary)
}

fn parse_base_url(config: &AppConfig) -> Result<Url> {
    Url::parse(&config.channel.base_url)
        .map_err(|e| ChefError::config(format!("bad base URL {}: {e}", config.channel.base_url)))
}

fn read_resource_tree(path: &Path) -> Result<ResourceTree> {
    let content = std::fs::read_to_string(path).map_err(|e| ChefError::io(path, e))?;
    let tree: ResourceTree = serde_json::from_str(&content)
        .map_err(|e| ChefError::validation(format!("bad crawl file {}: {e}", path.display())))?;
    tree.validate()?;
    Ok(tree)
}

/// English mode takes every descriptor as-is. Spanish mode keeps only
/// resources with a Spanish variant and retargets them at it.
fn select_descriptors(
    descriptors: Vec<ResourceDescriptor>,
    spanish: bool,
) -> Vec<ResourceDescriptor> {
    if !spanish {
        return descriptors;
    }
    descriptors
        .into_iter()
        .filter_map(|mut d| {
            let spanish_url = d.spanish_url.take()?;
            d.url = spanish_url;
            Some(d)
        })
        .collect()
}

fn channel_root(config: &AppConfig, spanish: bool) -> ChannelTree {
    ChannelTree {
        source_domain: config.channel.hostname.clone(),
        source_id: if spanish {
            "teachengineering-es".into()
        } else {
            "teachengineering".into()
        },
        title: if spanish { CHANNEL_TITLE_ES } else { CHANNEL_TITLE }.into(),
        description: CHANNEL_DESCRIPTION.into(),
        thumbnail: Some(
            config
                .channel
                .thumbnail
                .clone()
                .unwrap_or_else(|| DEFAULT_THUMBNAIL.into()),
        ),
        language: config.channel.language.clone(),
        license: Some(LicenseInfo::cc_by(CHANNEL_TITLE)),
        children: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::JsonTreeWriter;
    use currichef_media::VideoInfo;
    use currichef_shared::CollectionType;

    const PAGE: &str = r##"<html>
    <head><meta property="og:description" content="desc"></head>
    <body>
        <div id="CurriculumNav"><ul><li>Summary</li></ul></div>
        <div class="quick-look"><h3>Quick Look</h3>
            <a class="subject-area" href="#">Science</a>
        </div>
        <div class="curriculum-header"><h1>T</h1></div>
        <section id="summary"><h3>Summary</h3><p>body</p></section>
        <section><h3>Copyright</h3><p>© Holder</p></section>
    </body></html>"##;

    struct StubFetcher;

    impl PageFetcher for StubFetcher {
        async fn fetch(&self, url: &str) -> Result<String> {
            if url.contains("broken") {
                return Err(ChefError::Http {
                    url: url.to_string(),
                    status: 404,
                });
            }
            Ok(PAGE.to_string())
        }

        async fn fetch_bytes(&self, _url: &str) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    struct NoVideos;

    impl VideoInfoProvider for NoVideos {
        async fn probe(&self, _url: &str) -> Result<VideoInfo> {
            Err(ChefError::parse("none"))
        }

        async fn download(&self, _u: &str, _d: &Path, _h: u32) -> Result<()> {
            unreachable!()
        }
    }

    fn descriptor(id: &str, collection: CollectionType) -> ResourceDescriptor {
        ResourceDescriptor {
            id: id.into(),
            url: format!(
                "https://www.teachengineering.org/{}/view/{id}",
                collection.url_segment()
            ),
            spanish_url: None,
            spanish_version_id: None,
            collection,
            title: id.into(),
            summary: String::new(),
            grade_target: None,
            grade_range: None,
        }
    }

    fn test_config(data_dir: &Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.scrape.data_dir = data_dir.display().to_string();
        config.scrape.rate_limit_ms = 0;
        config
    }

    fn write_crawl_file(config: &AppConfig, descriptors: Vec<ResourceDescriptor>) {
        let mut tree = ResourceTree::new(CHANNEL_TITLE);
        tree.children = descriptors;
        JsonTreeWriter
            .write(&crawl_output_path(config), &tree)
            .unwrap();
    }

    #[tokio::test]
    async fn scrape_assembles_composes_and_writes_tree() {
        let dir = std::env::temp_dir().join(format!("currichef-pipe-{}", std::process::id()));
        let config = test_config(&dir);
        write_crawl_file(
            &config,
            vec![
                descriptor("les_one", CollectionType::Lesson),
                descriptor("act_broken", CollectionType::Activity),
            ],
        );

        let summary = scrape(&config, &StubFetcher, &NoVideos, &JsonTreeWriter, &SilentProgress)
            .await
            .unwrap();

        assert_eq!(summary.resources, 2);
        assert_eq!(summary.assembled, 1);
        assert_eq!(summary.skipped, 1);

        let written = std::fs::read_to_string(&summary.tree_path).unwrap();
        let channel: ChannelTree = serde_json::from_str(&written).unwrap();
        assert_eq!(channel.title, CHANNEL_TITLE);
        assert_eq!(channel.children.len(), 1);
        assert_eq!(channel.children[0].source_id, "Science");

        // The skipped resource must not leave a truncated archive behind.
        assert!(dir.join("zips").join("les_one.zip").exists());
        assert!(!dir.join("zips").join("act_broken.zip").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn scrape_rejects_foreign_crawl_file() {
        let dir = std::env::temp_dir().join(format!("currichef-pipe-bad-{}", std::process::id()));
        let config = test_config(&dir);
        JsonTreeWriter
            .write(
                &crawl_output_path(&config),
                &serde_json::json!({"kind": "SomethingElse", "title": "x", "children": []}),
            )
            .unwrap();

        let err = scrape(&config, &StubFetcher, &NoVideos, &JsonTreeWriter, &SilentProgress)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unexpected resource tree kind"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn spanish_mode_filters_and_retargets() {
        let mut with_spanish = descriptor("les_one", CollectionType::Lesson);
        with_spanish.spanish_version_id = Some("les_one_es".into());
        with_spanish.spanish_url =
            Some("https://www.teachengineering.org/lessons/view/les_one_es".into());
        let without = descriptor("act_two", CollectionType::Activity);

        let selected = select_descriptors(vec![with_spanish, without], true);
        assert_eq!(selected.len(), 1);
        assert!(selected[0].url.ends_with("les_one_es"));
    }

    #[test]
    fn english_mode_keeps_everything() {
        let descriptors = vec![
            descriptor("les_one", CollectionType::Lesson),
            descriptor("act_two", CollectionType::Activity),
        ];
        assert_eq!(select_descriptors(descriptors, false).len(), 2);
    }
}
