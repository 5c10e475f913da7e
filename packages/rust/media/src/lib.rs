//! Media resolution for extracted sections.
//!
//! Sections reference three kinds of media: inline images (localized into
//! the document archive), PDF attachments (downloaded beside the document),
//! and video links (probed and optionally downloaded through yt-dlp).

pub mod pdf;
pub mod rewrite;
pub mod video;

pub use pdf::{download_pdfs, extract_pdf_links, DownloadedPdf, PdfLink};
pub use rewrite::{
    extract_images, name_from_url, remove_iframes, rewrite_image_sources, strip_inline_links,
    ImageRef,
};
pub use video::{
    collect_video_urls, is_probable_shortener, is_video_host, is_watch_url, resolve_video,
    transform_embed, ResolveOptions, VideoInfo, VideoInfoProvider, VideoLinkCollector,
    VideoResource, YtDlpProvider,
};
