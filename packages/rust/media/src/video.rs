//! Video link collection and resolution.
//!
//! Sections reference videos through embedded frames and plain anchors,
//! the latter sometimes behind URL shorteners. Collection normalizes all
//! of these to watch URLs; resolution probes each one through an external
//! yt-dlp binary and optionally downloads it.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;

use scraper::{Html, Selector};
use serde::Deserialize;
use tracing::{debug, info, warn};

use currichef_shared::{ChefError, Result};

/// Hosts known to shorten URLs; anything this short is suspect too.
const SHORTENER_HOSTS: &[&str] = &[
    "bitly.com",
    "goo.gl",
    "tinyurl.com",
    "ow.ly",
    "ls.gd",
    "buff.ly",
    "adf.ly",
    "bit.do",
    "mcaf.ee",
];

// ---------------------------------------------------------------------------
// URL classification
// ---------------------------------------------------------------------------

/// Whether a URL points at hosted video content. Channel and user pages
/// are excluded unless asked for.
pub fn is_video_host(url: &str, include_channels: bool) -> bool {
    let hosted = url.contains("youtube") || url.contains("youtu.be");
    if include_channels {
        hosted
    } else {
        hosted && !url.contains("user") && !url.contains("/c/")
    }
}

/// Normalize an embed URL to its watch form, dropping the query string.
pub fn transform_embed(url: &str) -> String {
    let url = url.split('?').next().unwrap_or(url);
    url.replace("embed/", "watch?v=")
}

/// Whether a URL is a direct watch URL. Only these are downloadable;
/// everything else is at best recorded by reference.
pub fn is_watch_url(url: &str) -> bool {
    url.contains("watch?v=") || url.contains("youtu.be/")
}

/// Whether a URL likely passes through a shortener: a known shortener
/// host, or any suspiciously short domain.
pub fn is_probable_shortener(url: &str) -> bool {
    let Some(rest) = url.split_once("://").map(|(_, rest)| rest) else {
        return false;
    };
    let domain = rest.split('/').next().unwrap_or(rest);
    domain.len() < 12 || SHORTENER_HOSTS.contains(&domain)
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

/// Collects video URLs from section markup, expanding shortened links.
pub struct VideoLinkCollector {
    client: reqwest::Client,
    include_channels: bool,
    max_tries: u32,
    retry_delay: Duration,
    extra_shortener_hosts: Vec<String>,
}

impl VideoLinkCollector {
    pub fn new(client: reqwest::Client, include_channels: bool) -> Self {
        Self {
            client,
            include_channels,
            max_tries: 3,
            retry_delay: Duration::from_secs(3),
            extra_shortener_hosts: Vec::new(),
        }
    }

    #[cfg(test)]
    fn with_retry(mut self, max_tries: u32, retry_delay: Duration) -> Self {
        self.max_tries = max_tries;
        self.retry_delay = retry_delay;
        self
    }

    #[cfg(test)]
    fn with_shortener_host(mut self, host: &str) -> Self {
        let host = host.split_once("://").map_or(host, |(_, rest)| rest);
        self.extra_shortener_hosts
            .push(host.trim_end_matches('/').to_string());
        self
    }

    fn is_shortener(&self, url: &str) -> bool {
        if is_probable_shortener(url) {
            return true;
        }
        let Some(rest) = url.split_once("://").map(|(_, rest)| rest) else {
            return false;
        };
        let domain = rest.split('/').next().unwrap_or(rest);
        self.extra_shortener_hosts.iter().any(|h| h == domain)
    }

    /// Video URLs referenced by a fragment, in first-seen order.
    ///
    /// Frame sources are normalized to watch form. Anchor targets behind a
    /// probable shortener are expanded with a redirect-following HEAD; a
    /// connection failure there requeues the same link a bounded number of
    /// times before it is abandoned.
    pub async fn collect(&self, html: &str) -> Vec<String> {
        let doc = Html::parse_fragment(html);
        let mut urls: Vec<String> = Vec::new();

        let iframe_sel = Selector::parse("iframe[src]").expect("valid selector");
        for iframe in doc.select(&iframe_sel) {
            let src = iframe.value().attr("src").unwrap_or_default();
            if is_video_host(src, true) {
                let url = transform_embed(src);
                if !urls.contains(&url) {
                    urls.push(url);
                }
            }
        }

        let a_sel = Selector::parse("a[href]").expect("valid selector");
        let mut queue: VecDeque<String> = doc
            .select(&a_sel)
            .filter_map(|a| a.value().attr("href"))
            .filter(|href| href.starts_with("http"))
            .map(str::to_string)
            .collect();

        let mut tries = 0;
        while let Some(href) = queue.pop_front() {
            let url = if self.is_shortener(&href) {
                match self.expand(&href).await {
                    Ok(url) => {
                        tries = 0;
                        url
                    }
                    Err(e) if e.is_transient() => {
                        tries += 1;
                        if tries < self.max_tries {
                            debug!(%href, tries, "connection error expanding link, requeueing");
                            queue.push_front(href);
                        } else {
                            warn!(%href, "giving up on shortened link");
                        }
                        tokio::time::sleep(self.retry_delay).await;
                        continue;
                    }
                    Err(e) => {
                        debug!(%href, error = %e, "skipping unexpandable link");
                        tries = 0;
                        continue;
                    }
                }
            } else {
                tries = 0;
                href
            };

            if is_video_host(&url, self.include_channels) && !urls.contains(&url) {
                urls.push(url);
            }
        }

        urls
    }

    /// Follow redirects with a HEAD request and return the final URL.
    ///
    /// Hitting the redirect limit is not transient; those links are
    /// skipped on the first failure instead of requeued.
    async fn expand(&self, url: &str) -> Result<String> {
        let response = self.client.head(url).send().await.map_err(|e| {
            if e.is_redirect() {
                ChefError::parse(format!("{url}: {e}"))
            } else {
                ChefError::Network(format!("{url}: {e}"))
            }
        })?;
        Ok(response.url().to_string())
    }
}

/// Convenience wrapper over [`VideoLinkCollector::collect`].
pub async fn collect_video_urls(
    client: reqwest::Client,
    html: &str,
    include_channels: bool,
) -> Vec<String> {
    VideoLinkCollector::new(client, include_channels)
        .collect(html)
        .await
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Metadata probed from a video URL.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoInfo {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub license: Option<String>,
    /// Subtitle track languages keyed as yt-dlp reports them.
    #[serde(default, rename = "subtitles")]
    subtitles: std::collections::BTreeMap<String, serde_json::Value>,
}

impl VideoInfo {
    pub fn subtitle_languages(&self) -> Vec<String> {
        self.subtitles.keys().cloned().collect()
    }
}

/// Probes and downloads videos. The default implementation shells out to
/// yt-dlp; tests substitute canned metadata.
pub trait VideoInfoProvider {
    fn probe(&self, url: &str) -> impl Future<Output = Result<VideoInfo>> + Send;

    fn download(
        &self,
        url: &str,
        dest: &Path,
        max_height: u32,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// yt-dlp subprocess provider.
pub struct YtDlpProvider {
    binary: String,
}

impl YtDlpProvider {
    pub fn new() -> Self {
        Self {
            binary: "yt-dlp".to_string(),
        }
    }
}

impl Default for YtDlpProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoInfoProvider for YtDlpProvider {
    async fn probe(&self, url: &str) -> Result<VideoInfo> {
        let output = tokio::process::Command::new(&self.binary)
            .args(["-J", "--no-warnings", url])
            .output()
            .await
            .map_err(|e| ChefError::Network(format!("yt-dlp spawn failed: {e}")))?;

        if !output.status.success() {
            return Err(ChefError::parse(format!(
                "yt-dlp probe failed for {url}: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| ChefError::parse(format!("yt-dlp metadata for {url}: {e}")))
    }

    async fn download(&self, url: &str, dest: &Path, max_height: u32) -> Result<()> {
        let format = format!(
            "bestvideo[height<={max_height}][ext=mp4]+bestaudio[ext=m4a]\
             /best[height<={max_height}][ext=mp4]"
        );
        let output = tokio::process::Command::new(&self.binary)
            .args(["-f", &format, "--restrict-filenames", "--no-warnings", "-o"])
            .arg(dest)
            .arg(url)
            .output()
            .await
            .map_err(|e| ChefError::Network(format!("yt-dlp spawn failed: {e}")))?;

        if !output.status.success() {
            return Err(ChefError::Network(format!(
                "yt-dlp download failed for {url}: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        // A zero-byte file means the muxer bailed out after the status
        // already reported success.
        let meta = tokio::fs::metadata(dest)
            .await
            .map_err(|e| ChefError::io(dest, e))?;
        if meta.len() == 0 {
            return Err(ChefError::validation(format!(
                "empty download for {url}"
            )));
        }
        Ok(())
    }
}

/// A resolved video, downloaded or recorded by reference.
#[derive(Debug, Clone)]
pub struct VideoResource {
    pub url: String,
    pub id: String,
    pub title: String,
    /// Present only when the video was downloaded.
    pub path: Option<PathBuf>,
    pub subtitle_languages: Vec<String>,
}

/// Options for [`resolve_video`].
#[derive(Debug, Clone, Copy)]
pub struct ResolveOptions {
    pub download: bool,
    pub max_height: u32,
    /// Keep non-watch URLs (embeds without a watch form) as metadata-only
    /// entries instead of dropping them.
    pub record_embed_only: bool,
}

const PROBE_TRIES: u32 = 3;
const PROBE_DELAY: Duration = Duration::from_secs(3);

/// Probe one video URL and optionally download it.
///
/// Only videos under the standard hosting license (or with none reported)
/// are taken; anything else needs per-video clearance and is skipped.
/// Transient probe failures are retried a fixed number of times; anything
/// else skips the item rather than failing the page.
pub async fn resolve_video<P: VideoInfoProvider>(
    provider: &P,
    url: &str,
    opts: ResolveOptions,
    video_dir: &Path,
) -> Result<Option<VideoResource>> {
    if !is_watch_url(url) && !opts.record_embed_only {
        debug!(%url, "dropping non-watch video URL");
        return Ok(None);
    }

    let info = match probe_with_retry(provider, url).await {
        Ok(info) => info,
        Err(e) => {
            warn!(%url, error = %e, "skipping unprobeable video");
            return Ok(None);
        }
    };

    match info.license.as_deref() {
        None | Some("Standard YouTube License") => {}
        Some(other) => {
            info!(%url, license = other, "skipping video with non-standard license");
            return Ok(None);
        }
    }

    let path = if opts.download && is_watch_url(url) {
        tokio::fs::create_dir_all(video_dir)
            .await
            .map_err(|e| ChefError::io(video_dir, e))?;
        let dest = video_dir.join(format!("{}.mp4", info.id));
        match provider.download(url, &dest, opts.max_height).await {
            Ok(()) => Some(dest),
            Err(e) => {
                warn!(%url, error = %e, "skipping failed video download");
                return Ok(None);
            }
        }
    } else {
        None
    };

    let subtitle_languages = info.subtitle_languages();
    Ok(Some(VideoResource {
        url: url.to_string(),
        id: info.id,
        title: info.title,
        subtitle_languages,
        path,
    }))
}

async fn probe_with_retry<P: VideoInfoProvider>(provider: &P, url: &str) -> Result<VideoInfo> {
    let mut attempt = 0;
    loop {
        match provider.probe(url).await {
            Ok(info) => return Ok(info),
            Err(e) if e.is_transient() => {
                attempt += 1;
                if attempt >= PROBE_TRIES {
                    return Err(e);
                }
                debug!(%url, attempt, "transient probe failure, retrying");
                tokio::time::sleep(PROBE_DELAY).await;
            }
            Err(e) => return Err(e),
        }
    }
}
