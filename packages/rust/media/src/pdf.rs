//! PDF attachment discovery and download.

use scraper::{Html, Selector};
use tracing::warn;
use url::Url;

use currichef_extract::PageFetcher;
use currichef_shared::Result;

use crate::rewrite::name_from_url;

/// A PDF attachment referenced from a section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfLink {
    /// Local name derived from the URL's last segment.
    pub name: String,
    /// Absolute download URL.
    pub url: String,
}

/// Collect the PDF links in a fragment: site-content anchors whose href
/// ends in `.pdf`, deduplicated by absolute URL in first-seen order.
pub fn extract_pdf_links(html: &str, base: &Url) -> Vec<PdfLink> {
    let doc = Html::parse_fragment(html);
    let a_sel = Selector::parse("a[href]").expect("valid selector");
    let site_host = base.host_str().unwrap_or_default();

    let mut links: Vec<PdfLink> = Vec::new();
    for a in doc.select(&a_sel) {
        let href = a.value().attr("href").unwrap_or_default();
        if !href.ends_with(".pdf") {
            continue;
        }
        let on_site = href.starts_with("/content")
            || Url::parse(href)
                .ok()
                .and_then(|u| u.host_str().map(|h| h.ends_with(site_host)))
                .unwrap_or(false);
        if !on_site {
            continue;
        }
        let Ok(url) = base.join(href) else {
            continue;
        };
        let url = url.to_string();
        if links.iter().any(|l| l.url == url) {
            continue;
        }
        links.push(PdfLink {
            name: name_from_url(&url),
            url,
        });
    }
    links
}

/// A PDF downloaded into the data directory.
#[derive(Debug, Clone)]
pub struct DownloadedPdf {
    pub name: String,
    pub url: String,
    pub path: std::path::PathBuf,
}

/// Download each PDF into `dir`. A failed item is logged and skipped; the
/// rest of the batch still downloads.
pub async fn download_pdfs<F: PageFetcher>(
    fetcher: &F,
    links: &[PdfLink],
    dir: &std::path::Path,
) -> Result<Vec<DownloadedPdf>> {
    if links.is_empty() {
        return Ok(Vec::new());
    }
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| currichef_shared::ChefError::io(dir, e))?;

    let mut downloaded = Vec::new();
    for link in links {
        let bytes = match fetcher.fetch_bytes(&link.url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(url = %link.url, error = %e, "skipping attachment");
                continue;
            }
        };
        let path = dir.join(&link.name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| currichef_shared::ChefError::io(&path, e))?;
        downloaded.push(DownloadedPdf {
            name: link.name.clone(),
            url: link.url.clone(),
            path,
        });
    }
    Ok(downloaded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.teachengineering.org").unwrap()
    }

    #[test]
    fn pdf_links_filtered_to_site_content() {
        let html = r#"<section>
            <a href="/content/act/worksheet.pdf">Worksheet</a>
            <a href="https://www.teachengineering.org/content/act/rubric.pdf">Rubric</a>
            <a href="https://elsewhere.example.org/paper.pdf">Paper</a>
            <a href="/content/act/photo.png">Photo</a>
        </section>"#;

        let links = extract_pdf_links(html, &base());
        let names: Vec<&str> = links.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["worksheet.pdf", "rubric.pdf"]);
    }

    #[test]
    fn pdf_links_deduped_by_absolute_url() {
        let html = r#"<section>
            <a href="/content/act/worksheet.pdf">first</a>
            <a href="https://www.teachengineering.org/content/act/worksheet.pdf">again</a>
        </section>"#;

        let links = extract_pdf_links(html, &base());
        assert_eq!(links.len(), 1);
    }

    #[tokio::test]
    async fn failed_download_skips_item_but_keeps_batch() {
        use currichef_extract::HttpFetcher;

        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::path("/content/ok.pdf"))
            .respond_with(
                wiremock::ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4".to_vec()),
            )
            .mount(&server)
            .await;
        wiremock::Mock::given(wiremock::matchers::path("/content/gone.pdf"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let links = vec![
            PdfLink {
                name: "gone.pdf".into(),
                url: format!("{}/content/gone.pdf", server.uri()),
            },
            PdfLink {
                name: "ok.pdf".into(),
                url: format!("{}/content/ok.pdf", server.uri()),
            },
        ];

        let dir = std::env::temp_dir().join(format!("currichef-pdf-{}", std::process::id()));
        let fetcher = HttpFetcher::new(0, std::time::Duration::from_millis(0)).unwrap();
        let downloaded = download_pdfs(&fetcher, &links, &dir).await.unwrap();

        assert_eq!(downloaded.len(), 1);
        assert_eq!(downloaded[0].name, "ok.pdf");
        assert!(downloaded[0].path.exists());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
