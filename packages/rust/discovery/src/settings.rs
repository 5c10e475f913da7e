//! Extraction of the embedded search settings from the browse page.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use currichef_shared::{ChefError, Result};

/// Azure Search connection settings embedded in the browse page's scripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSettings {
    pub service_name: String,
    pub index_name: String,
    pub api_key: String,
    pub api_version: String,
}

impl SearchSettings {
    /// The Azure host derived from the service name.
    pub fn default_endpoint(&self) -> String {
        format!("https://{}.search.windows.net", self.service_name)
    }

    /// The docs query URL for one page of the index.
    ///
    /// `$count=true` asks for the total; results are ordered by
    /// `sortableTitle`, the index's natural sort order.
    pub fn docs_url(&self, endpoint: &str, offset: u64, batch: u64) -> String {
        format!(
            "{endpoint}/indexes/{index}/docs?api-version={version}&api-key={key}\
             &search=&$count=true&$top={batch}&$skip={offset}\
             &searchMode=all&scoringProfile=FieldBoost&$orderby=sortableTitle",
            index = self.index_name,
            version = self.api_version,
            key = self.api_key,
        )
    }
}

/// Key/value pairs like `serviceName: "curriculum-search"` inside a script.
static SETTING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(serviceName|indexName|apiKey|apiVersion)\s*[:=]\s*['"]([^'"]+)['"]"#)
        .expect("valid regex")
});

/// Scan the browse page's inline scripts for the four search settings.
pub fn parse_search_settings(html: &str) -> Result<SearchSettings> {
    let doc = Html::parse_document(html);
    let script_sel = Selector::parse("script").expect("valid selector");

    let mut service_name = None;
    let mut index_name = None;
    let mut api_key = None;
    let mut api_version = None;

    for script in doc.select(&script_sel) {
        let text: String = script.text().collect();
        for caps in SETTING_RE.captures_iter(&text) {
            let value = caps[2].to_string();
            match &caps[1] {
                "serviceName" => service_name = Some(value),
                "indexName" => index_name = Some(value),
                "apiKey" => api_key = Some(value),
                "apiVersion" => api_version = Some(value),
                _ => unreachable!(),
            }
        }
    }

    match (service_name, index_name, api_key, api_version) {
        (Some(service_name), Some(index_name), Some(api_key), Some(api_version)) => {
            Ok(SearchSettings {
                service_name,
                index_name,
                api_key,
                api_version,
            })
        }
        _ => Err(ChefError::parse(
            "browse page does not embed complete search settings",
        )),
    }
}
