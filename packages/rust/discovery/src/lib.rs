//! Resource discovery against the curriculum site's search index.
//!
//! The browse page embeds its Azure Search settings (service name, index
//! name, API key, version) in inline scripts. Discovery scrapes those
//! settings once, then paginates the index in fixed-size batches and yields
//! one [`ResourceDescriptor`] per curriculum resource.

mod settings;

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use url::Url;

use currichef_shared::{ChefError, DiscoveryConfig, ResourceDescriptor, Result};

pub use settings::{SearchSettings, parse_search_settings};

/// User-Agent string for discovery requests.
const USER_AGENT: &str = concat!("currichef/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

/// One page of the search index response.
#[derive(Debug, Deserialize)]
struct IndexPage {
    /// Total result count, present when `$count=true` is requested.
    #[serde(rename = "@odata.count")]
    count: Option<u64>,
    value: Vec<IndexDoc>,
}

/// One document in the search index.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexDoc {
    id: String,
    collection: String,
    #[serde(default)]
    spanish_version_id: Option<String>,
    title: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    grade_target: Option<i64>,
    #[serde(default)]
    grade_range: Option<i64>,
}

// ---------------------------------------------------------------------------
// ResourceBrowser
// ---------------------------------------------------------------------------

/// Paginates the search index and enumerates every curriculum resource.
pub struct ResourceBrowser {
    client: reqwest::Client,
    /// The curriculum browse page carrying the inline search settings.
    browse_url: String,
    /// Site base URL, used to build per-resource view URLs.
    base_url: Url,
    config: DiscoveryConfig,
    /// Search endpoint override; defaults to the Azure host derived from
    /// the scraped settings.
    endpoint: Option<String>,
}

impl ResourceBrowser {
    pub fn new(browse_url: impl Into<String>, base_url: &Url, config: DiscoveryConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ChefError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            browse_url: browse_url.into(),
            base_url: base_url.clone(),
            config,
            endpoint: None,
        })
    }

    /// Query a fixed search endpoint instead of the host derived from the
    /// scraped settings (mirrors, tests).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Enumerate all resources in the index's natural sort order.
    ///
    /// The total count is read from the first page and used as the stop
    /// condition. A malformed page triggers a fixed delay and a retry of
    /// the same offset, bounded by `config.max_retries`. Order is not
    /// guaranteed stable across runs if the index changes between calls.
    #[instrument(skip_all, fields(browse_url = %self.browse_url))]
    pub async fn enumerate(&self) -> Result<Vec<ResourceDescriptor>> {
        let page_html = self.fetch_text(&self.browse_url).await?;
        let settings = parse_search_settings(&page_html)?;
        info!(service = %settings.service_name, index = %settings.index_name, "search settings scraped");

        let endpoint = match &self.endpoint {
            Some(e) => e.trim_end_matches('/').to_string(),
            None => settings.default_endpoint(),
        };

        let batch = self.config.batch_size.max(1);
        let mut offset: u64 = 0;
        let mut total: Option<u64> = None;
        let mut retries: u32 = 0;
        let mut resources = Vec::new();

        loop {
            let url = settings.docs_url(&endpoint, offset, batch);
            debug!(offset, "fetching index page");

            match self.fetch_page(&url).await {
                Ok(page) => {
                    retries = 0;
                    if total.is_none() {
                        let count = page.count.unwrap_or(0);
                        info!(total = count, "index size reported");
                        total = Some(count);
                    }
                    for doc in page.value {
                        resources.push(self.to_descriptor(doc)?);
                    }
                    offset += batch;
                    if offset >= total.unwrap_or(0) {
                        break;
                    }
                }
                Err(e) => {
                    // Retry the same offset after a fixed delay; do not skip.
                    retries += 1;
                    if retries > self.config.max_retries {
                        return Err(ChefError::validation(format!(
                            "index page at offset {offset} stayed malformed after {retries} attempts: {e}"
                        )));
                    }
                    warn!(offset, attempt = retries, error = %e, "malformed index page, retrying");
                    tokio::time::sleep(Duration::from_secs(self.config.retry_delay_secs)).await;
                }
            }
        }

        info!(resources = resources.len(), "discovery complete");
        Ok(resources)
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ChefError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChefError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| ChefError::Network(format!("{url}: body read failed: {e}")))
    }

    async fn fetch_page(&self, url: &str) -> Result<IndexPage> {
        let body = self.fetch_text(url).await?;
        serde_json::from_str(&body)
            .map_err(|e| ChefError::parse(format!("bad index page: {e}")))
    }

    fn to_descriptor(&self, doc: IndexDoc) -> Result<ResourceDescriptor> {
        let collection = doc.collection.parse()?;
        let url = build_resource_url(&self.base_url, &doc.id, collection)?;
        let spanish_url = match &doc.spanish_version_id {
            Some(id) => Some(build_resource_url(&self.base_url, id, collection)?),
            None => None,
        };

        Ok(ResourceDescriptor {
            id: doc.id,
            url,
            spanish_url,
            spanish_version_id: doc.spanish_version_id,
            collection,
            title: doc.title,
            summary: doc.summary.unwrap_or_default(),
            grade_target: doc.grade_target,
            grade_range: doc.grade_range,
        })
    }
}

/// Build a resource view URL, e.g. `<base>/lessons/view/<id>`.
pub fn build_resource_url(
    base_url: &Url,
    id: &str,
    collection: currichef_shared::CollectionType,
) -> Result<String> {
    base_url
        .join(&format!("{}/view/{id}", collection.url_segment()))
        .map(|u| u.to_string())
        .map_err(|e| ChefError::validation(format!("bad resource id {id}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use currichef_shared::CollectionType;

    fn browse_page_html() -> String {
        r#"<html><head>
        <script>
        var searchConfig = {
            serviceName: "curriculum-search",
            indexName: "resources",
            apiKey: "A1B2C3",
            apiVersion: "2017-11-11"
        };
        </script>
        </head><body></body></html>"#
            .to_string()
    }

    fn index_doc(id: &str, collection: &str, title: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "collection": collection,
            "spanishVersionId": null,
            "title": title,
            "summary": "",
            "gradeTarget": 5,
            "gradeRange": 2,
        })
    }

    #[test]
    fn resource_url_built_from_collection_segment() {
        let base = Url::parse("https://www.teachengineering.org").unwrap();
        let url = build_resource_url(&base, "cub_energy_lesson01", CollectionType::Lesson).unwrap();
        assert_eq!(
            url,
            "https://www.teachengineering.org/lessons/view/cub_energy_lesson01"
        );
    }

    #[tokio::test]
    async fn enumerate_paginates_until_count() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/browse"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(browse_page_html()))
            .mount(&server)
            .await;

        let page1 = serde_json::json!({
            "@odata.count": 3,
            "value": [
                index_doc("act_one", "Activities", "Activity One"),
                index_doc("les_two", "Lessons", "Lesson Two"),
            ],
        });
        let page2 = serde_json::json!({
            "@odata.count": 3,
            "value": [index_doc("unit_three", "CurricularUnits", "Unit Three")],
        });

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/indexes/resources/docs"))
            .and(wiremock::matchers::query_param("$skip", "0"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(&page1))
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/indexes/resources/docs"))
            .and(wiremock::matchers::query_param("$skip", "2"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(&page2))
            .mount(&server)
            .await;

        let base = Url::parse("https://www.teachengineering.org").unwrap();
        let config = DiscoveryConfig {
            batch_size: 2,
            max_retries: 1,
            retry_delay_secs: 0,
        };
        let browser = ResourceBrowser::new(format!("{}/browse", server.uri()), &base, config)
            .unwrap()
            .with_endpoint(server.uri());

        let resources = browser.enumerate().await.unwrap();
        assert_eq!(resources.len(), 3);
        assert_eq!(resources[0].id, "act_one");
        assert_eq!(resources[0].collection, CollectionType::Activity);
        assert_eq!(
            resources[2].url,
            "https://www.teachengineering.org/curricularunits/view/unit_three"
        );
    }

    #[tokio::test]
    async fn malformed_page_retries_same_offset() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/browse"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(browse_page_html()))
            .mount(&server)
            .await;

        // First hit at offset 0 is garbage, the retry succeeds.
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/indexes/resources/docs"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("<not json>"))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        let page = serde_json::json!({
            "@odata.count": 1,
            "value": [index_doc("spr_one", "Sprinkles", "Sprinkle One")],
        });
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/indexes/resources/docs"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(&page))
            .mount(&server)
            .await;

        let base = Url::parse("https://www.teachengineering.org").unwrap();
        let config = DiscoveryConfig {
            batch_size: 10,
            max_retries: 2,
            retry_delay_secs: 0,
        };
        let browser = ResourceBrowser::new(format!("{}/browse", server.uri()), &base, config)
            .unwrap()
            .with_endpoint(server.uri());

        let resources = browser.enumerate().await.unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].collection, CollectionType::Sprinkle);
    }

    #[tokio::test]
    async fn malformed_page_gives_up_after_bound() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/browse"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(browse_page_html()))
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/indexes/resources/docs"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("{}{}"))
            .mount(&server)
            .await;

        let base = Url::parse("https://www.teachengineering.org").unwrap();
        let config = DiscoveryConfig {
            batch_size: 10,
            max_retries: 2,
            retry_delay_secs: 0,
        };
        let browser = ResourceBrowser::new(format!("{}/browse", server.uri()), &base, config)
            .unwrap()
            .with_endpoint(server.uri());

        let err = browser.enumerate().await.unwrap_err();
        assert!(err.to_string().contains("malformed"));
    }
}
