//! Socrata catalog source.
//!
//! Discovery scrapes the browse/embed listing, which is the only complete
//! dataset inventory Socrata exposes without an API key. Metadata probes use
//! the resource API with `$limit=1` because the platform rejects HEAD; the
//! response body is dropped unread.

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use once_cell::sync::Lazy;
use regex_lite::Regex;
use reqwest::header::{HeaderMap, HeaderName, CONTENT_TYPE, LAST_MODIFIED};
use reqwest::Client;
use tracing::{debug, info};

use crate::catalog::{Catalog, CatalogItem};
use crate::transfer::ContentStream;

use super::error::SourceError;
use super::traits::CatalogSource;
use super::types::ResourceHeaders;

static ROW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<tr([^>]*)>(.*?)</tr>").expect("valid regex"));
static CLASS_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"class="([^"]*)""#).expect("valid regex"));
static VIEW_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"data-viewid="([^"]+)""#).expect("valid regex"));
static NAME_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<a([^>]*class="[^"]*nameLink[^"]*"[^>]*)>(.*?)</a>"#).expect("valid regex")
});
static HREF_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"href="([^"]*)""#).expect("valid regex"));
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

/// Source backed by a Socrata data portal (e.g. `data.cityofchicago.org`).
pub struct SocrataSource {
    client: Client,
    catalog_id: String,
    format: String,
    page_size: usize,
}

impl SocrataSource {
    pub fn new(
        catalog_id: impl Into<String>,
        format: impl Into<String>,
        page_size: usize,
    ) -> Self {
        Self {
            client: Client::new(),
            catalog_id: catalog_id.into(),
            format: format.into(),
            page_size,
        }
    }

    fn listing_url(&self, page: usize) -> String {
        format!(
            "https://{}/browse/embed?limitTo=datasets&utf8=%E2%9C%93&page={page}&limit={}",
            self.catalog_id, self.page_size
        )
    }

    fn resource_url(&self, id: &str, extension: &str) -> String {
        format!("https://{}/resource/{id}.{extension}", self.catalog_id)
    }

    async fn fetch_listing_page(&self, page: usize) -> Result<Vec<CatalogItem>, SourceError> {
        let url = self.listing_url(page);
        debug!(url, "fetching catalog listing page");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        Ok(parse_listing(&body))
    }
}

#[async_trait]
impl CatalogSource for SocrataSource {
    fn name(&self) -> &str {
        "socrata"
    }

    async fn discover(&self) -> Result<Catalog, SourceError> {
        if self.catalog_id.is_empty() {
            return Err(SourceError::MissingCatalogId);
        }

        let mut catalog = Catalog::new(&self.catalog_id);
        let mut page = 1;
        loop {
            let items = self.fetch_listing_page(page).await?;
            let count = items.len();
            for item in items {
                catalog.insert(item);
            }
            if count < self.page_size {
                break;
            }
            page += 1;
        }

        info!(
            catalog = %self.catalog_id,
            items = catalog.items.len(),
            "discovered catalog"
        );
        Ok(catalog)
    }

    async fn fetch_headers(&self, id: &str) -> Result<ResourceHeaders, SourceError> {
        // $limit=1 keeps the body tiny; we never read it.
        let url = format!("{}?$limit=1", self.resource_url(id, "json"));
        debug!(url, "probing resource headers");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url,
                status: status.as_u16(),
            });
        }

        Ok(ResourceHeaders {
            last_modified: header_string(response.headers(), LAST_MODIFIED),
            content_type: header_string(response.headers(), CONTENT_TYPE),
        })
    }

    async fn open_content(&self, id: &str) -> Result<ContentStream, SourceError> {
        let url = self.resource_url(id, &self.format);
        debug!(url, "opening resource content");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url,
                status: status.as_u16(),
            });
        }

        Ok(response
            .bytes_stream()
            .map_err(std::io::Error::other)
            .boxed())
    }
}

fn header_string(headers: &HeaderMap, name: HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

/// Extract catalog items from one browse/embed listing page.
///
/// Rows carry `class="item"` and a `data-viewid` attribute; the display name
/// and link live on the row's `nameLink` anchor. Rows missing any of these
/// are skipped.
fn parse_listing(html: &str) -> Vec<CatalogItem> {
    let mut items = Vec::new();
    for row in ROW.captures_iter(html) {
        let attrs = &row[1];
        let inner = &row[2];

        let is_item = CLASS_ATTR
            .captures(attrs)
            .map(|c| c[1].split_whitespace().any(|class| class == "item"))
            .unwrap_or(false);
        if !is_item {
            continue;
        }
        let Some(id) = VIEW_ID.captures(attrs).map(|c| c[1].to_string()) else {
            continue;
        };
        let Some(link) = NAME_LINK.captures(inner) else {
            continue;
        };

        let href = HREF_ATTR.captures(&link[1]).map(|c| c[1].to_string());
        let name = decode_entities(TAG.replace_all(&link[2], "").trim());
        items.push(CatalogItem::new(id, name, href));
    }
    items
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
      <table class="gridList">
        <tr class="headers"><th>Name</th></tr>
        <tr class="item even" data-viewid="abcd-1234">
          <td class="richSection">
            <a class="nameLink" href="https://data.example.gov/d/abcd-1234">
              Crime Data 2020!!
            </a>
          </td>
        </tr>
        <tr class="item odd" data-viewid="efgh-5678">
          <td class="richSection">
            <a class="otherLink" href="/nope">skip me</a>
            <a class="nameLink" href="/d/efgh-5678">Parks &amp; Recreation</a>
          </td>
        </tr>
        <tr class="item even">
          <td>row without a view id is ignored</td>
        </tr>
      </table>
    "#;

    #[test]
    fn test_parse_listing_extracts_items() {
        let items = parse_listing(LISTING);
        assert_eq!(items.len(), 2);

        assert_eq!(items[0].id, "abcd-1234");
        assert_eq!(items[0].display_name, "Crime Data 2020!!");
        assert_eq!(items[0].slug, "crime-data-2020");
        assert_eq!(
            items[0].source_link.as_deref(),
            Some("https://data.example.gov/d/abcd-1234")
        );

        assert_eq!(items[1].display_name, "Parks & Recreation");
        assert_eq!(items[1].slug, "parks-recreation");
        assert_eq!(items[1].source_link.as_deref(), Some("/d/efgh-5678"));
    }

    #[test]
    fn test_parse_listing_empty_page() {
        assert!(parse_listing("<table class=\"gridList\"></table>").is_empty());
    }

    #[test]
    fn test_listing_url_paging() {
        let source = SocrataSource::new("data.example.gov", "csv", 5000);
        assert_eq!(
            source.listing_url(1),
            "https://data.example.gov/browse/embed?limitTo=datasets&utf8=%E2%9C%93&page=1&limit=5000"
        );
        assert!(source.listing_url(3).contains("page=3"));
    }

    #[test]
    fn test_resource_urls() {
        let source = SocrataSource::new("data.example.gov", "csv", 5000);
        assert_eq!(
            source.resource_url("abcd-1234", "csv"),
            "https://data.example.gov/resource/abcd-1234.csv"
        );
        assert_eq!(
            source.resource_url("abcd-1234", "json"),
            "https://data.example.gov/resource/abcd-1234.json"
        );
    }

    #[tokio::test]
    async fn test_discover_requires_catalog_id() {
        let source = SocrataSource::new("", "csv", 5000);
        let err = source.discover().await.unwrap_err();
        assert!(matches!(err, SourceError::MissingCatalogId));
    }
}
