//! Lookup of tile services in the [QuickMapServices](https://qms.nextgis.com) catalog.
//!
//! This is the only part of the crate doing network requests. Failures are
//! reported as they are, without retries.

use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::value::Attributes;
use crate::{ProviderError, ProviderResult, TileProvider};

/// Geoservices endpoint of the public QuickMapServices API.
pub const QMS_API_URL: &str = "https://qms.nextgis.com/api/v1/geoservices";

/// A search hit.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QmsService {
    /// Catalog identifier used to fetch the details.
    pub id: i64,
    /// Service name.
    pub name: String,
}

/// Full description of one service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QmsServiceDetails {
    /// Service name.
    pub name: String,
    /// TMS URL template.
    pub url: String,
    /// Minimum zoom level.
    #[serde(default)]
    pub z_min: Option<i64>,
    /// Maximum zoom level.
    #[serde(default)]
    pub z_max: Option<i64>,
    /// Attribution text.
    #[serde(default)]
    pub copyright_text: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SearchResponse {
    List(Vec<QmsService>),
    Page { results: Vec<QmsService> },
}

impl From<SearchResponse> for Vec<QmsService> {
    fn from(value: SearchResponse) -> Self {
        match value {
            SearchResponse::List(v) | SearchResponse::Page { results: v } => v,
        }
    }
}

/// Pick the service whose name matches `name` exactly.
pub fn select_service<'a>(services: &'a [QmsService], name: &str) -> ProviderResult<&'a QmsService> {
    services
        .iter()
        .find(|s| s.name == name)
        .ok_or_else(|| ProviderError::QmsServiceNotFound(name.to_string()))
}

/// Convert service details into a provider. Zoom levels are only set when
/// the catalog provides them, a missing attribution becomes an empty string.
pub fn provider_from_details(details: QmsServiceDetails) -> ProviderResult<TileProvider> {
    let mut attributes = Attributes::new();
    attributes.insert("name".to_string(), details.name.into());
    attributes.insert("url".to_string(), details.url.into());
    if let Some(z_min) = details.z_min {
        attributes.insert("min_zoom".to_string(), z_min.into());
    }
    if let Some(z_max) = details.z_max {
        attributes.insert("max_zoom".to_string(), z_max.into());
    }
    attributes.insert(
        "attribution".to_string(),
        details.copyright_text.unwrap_or_default().into(),
    );
    TileProvider::new(attributes)
}

/// Client for the QuickMapServices geoservices API.
#[derive(Debug, Clone)]
pub struct QmsClient {
    client: reqwest::Client,
    base_url: String,
}

impl Default for QmsClient {
    fn default() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: QMS_API_URL.to_string(),
        }
    }
}

impl QmsClient {
    /// Client for the public catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Client for a mirror or test server.
    pub fn with_base_url(base_url: &str) -> ProviderResult<Self> {
        Url::parse(base_url).map_err(|e| ProviderError::QmsUrlError(e, base_url.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..Self::default()
        })
    }

    fn url(&self, path: &str) -> ProviderResult<Url> {
        let url = format!("{}/{path}", self.base_url);
        Url::parse(&url).map_err(|e| ProviderError::QmsUrlError(e, url))
    }

    /// URL searching for TMS services in Web Mercator matching `name`.
    pub fn search_url(&self, name: &str) -> ProviderResult<Url> {
        let mut url = self.url("")?;
        url.query_pairs_mut()
            .append_pair("search", name)
            .append_pair("type", "tms")
            .append_pair("epsg", "3857");
        Ok(url)
    }

    /// Search the catalog.
    pub async fn search(&self, name: &str) -> ProviderResult<Vec<QmsService>> {
        let url = self.search_url(name)?;
        debug!("Searching QuickMapServices: {url}");
        let response: SearchResponse = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.into())
    }

    /// Fetch the details of one service.
    pub async fn details(&self, id: i64) -> ProviderResult<QmsServiceDetails> {
        let url = self.url(&id.to_string())?;
        debug!("Fetching QuickMapServices service {id}: {url}");
        Ok(self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }

    /// Create a provider from the TMS service named exactly `name`.
    pub async fn provider(&self, name: &str) -> ProviderResult<TileProvider> {
        let services = self.search(name).await?;
        let service = select_service(&services, name)?;
        let details = self.details(service.id).await?;
        provider_from_details(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn services() -> Vec<QmsService> {
        let response: SearchResponse = serde_json::from_str(
            r#"[
                {"id": 1, "name": "OSM Standard (Wikimedia)", "type": "tms"},
                {"id": 2, "name": "OSM Standard", "type": "tms"}
            ]"#,
        )
        .unwrap();
        response.into()
    }

    #[test]
    fn select_exact_name() {
        let services = services();
        assert_eq!(select_service(&services, "OSM Standard").unwrap().id, 2);
        let err = select_service(&services, "osm standard").unwrap_err();
        assert_eq!(
            err.to_string(),
            "No TileMap service with name 'osm standard' found."
        );
    }

    #[test]
    fn paginated_search_response() {
        let response: SearchResponse =
            serde_json::from_str(r#"{"count": 1, "results": [{"id": 7, "name": "A"}]}"#).unwrap();
        let services: Vec<QmsService> = response.into();
        assert_eq!(services, [QmsService { id: 7, name: "A".to_string() }]);
    }

    #[test]
    fn details_to_provider() {
        let details: QmsServiceDetails = serde_json::from_str(
            r#"{
                "id": 2,
                "name": "OSM Standard",
                "url": "https://tile.openstreetmap.org/{z}/{x}/{y}.png",
                "z_min": 0,
                "z_max": 19,
                "copyright_text": "OpenStreetMap contributors"
            }"#,
        )
        .unwrap();
        let provider = provider_from_details(details).unwrap();
        assert_eq!(provider.name(), "OSM Standard");
        assert_eq!(provider.min_zoom(), Some(0));
        assert_eq!(provider.max_zoom(), Some(19));
        assert_eq!(provider.attribution(), "OpenStreetMap contributors");
    }

    #[test]
    fn details_without_optional_fields() {
        let details: QmsServiceDetails =
            serde_json::from_str(r#"{"name": "X", "url": "https://x/{z}/{x}/{y}", "z_min": null}"#)
                .unwrap();
        let provider = provider_from_details(details).unwrap();
        assert_eq!(provider.keys().collect::<Vec<_>>(), ["name", "url", "attribution"]);
        assert_eq!(provider.attribution(), "");
    }

    #[test]
    fn search_url() {
        let client = QmsClient::with_base_url("http://localhost:1234/api/").unwrap();
        assert_eq!(
            client.search_url("OSM Standard").unwrap().as_str(),
            "http://localhost:1234/api/?search=OSM+Standard&type=tms&epsg=3857"
        );
        assert!(QmsClient::with_base_url("not a url").is_err());
    }
}
