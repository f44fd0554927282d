use async_trait::async_trait;
use tracing::{debug, warn};

use super::{
    error::CatalogError,
    wire::{parse_detail, parse_search},
    Catalog,
};
use crate::{
    config::CatalogConfig,
    models::{MovieDetail, SearchResultItem},
};

/// HTTP client for an OMDb-compatible catalog.
///
/// Endpoint and access key come from [`CatalogConfig`]; nothing is read from
/// ambient state.
#[derive(Debug, Clone)]
pub struct OmdbClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OmdbClient {
    /// Build a client from configuration.
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let mut builder =
            reqwest::Client::builder().user_agent(concat!("popcorn/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        if !config.has_api_key() {
            warn!("No catalog API key configured; requests will likely be rejected");
        }
        Ok(Self {
            http: builder.build()?,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// `GET {base_url}?{param}={value}&apikey={key}`.
    fn request(&self, param: &str, value: &str) -> Result<reqwest::Request, CatalogError> {
        Ok(self
            .http
            .get(&self.base_url)
            .query(&[(param, value), ("apikey", self.api_key.as_str())])
            .build()?)
    }

    async fn fetch(&self, param: &str, value: &str) -> Result<Vec<u8>, CatalogError> {
        let request = self.request(param, value)?;
        let resp = self.http.execute(request).await?;
        let resp = check_response(resp)?;
        Ok(resp.bytes().await?.to_vec())
    }
}

#[async_trait]
impl Catalog for OmdbClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchResultItem>, CatalogError> {
        debug!(query, "Catalog search");
        let body = self.fetch("s", query).await?;
        parse_search(&body)
    }

    async fn detail(&self, id: &str) -> Result<MovieDetail, CatalogError> {
        debug!(id, "Catalog detail");
        let body = self.fetch("i", id).await?;
        parse_detail(&body)
    }
}

/// Map any non-success status to [`CatalogError::Status`].
fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, CatalogError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(CatalogError::Status {
            status: status.as_u16(),
        });
    }
    Ok(resp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::error::FETCH_FAILED_MESSAGE;

    fn mock_response(status: u16) -> reqwest::Response {
        reqwest::Response::from(
            ::http::Response::builder()
                .status(status)
                .body("")
                .unwrap(),
        )
    }

    #[test]
    fn non_success_status_is_fetch_failure() {
        let err = check_response(mock_response(500)).unwrap_err();
        assert!(matches!(err, CatalogError::Status { status: 500 }));
        assert_eq!(err.user_message(), FETCH_FAILED_MESSAGE);

        let err = check_response(mock_response(401)).unwrap_err();
        assert!(matches!(err, CatalogError::Status { status: 401 }));
    }

    #[test]
    fn success_status_passes_through() {
        assert!(check_response(mock_response(200)).is_ok());
    }

    fn client_with_key(key: &str) -> OmdbClient {
        let config = CatalogConfig {
            base_url: "https://catalog.test/".to_string(),
            api_key: key.to_string(),
            ..CatalogConfig::default()
        };
        OmdbClient::new(&config).unwrap()
    }

    fn query_pairs(request: &reqwest::Request) -> Vec<(String, String)> {
        request
            .url()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn search_request_carries_query_and_key() {
        let client = client_with_key("k3y");
        let request = client.request("s", "the matrix").unwrap();
        assert_eq!(request.method(), reqwest::Method::GET);
        assert_eq!(request.url().host_str(), Some("catalog.test"));
        assert_eq!(
            query_pairs(&request),
            vec![
                ("s".to_string(), "the matrix".to_string()),
                ("apikey".to_string(), "k3y".to_string()),
            ]
        );
    }

    #[test]
    fn detail_request_carries_id_and_key() {
        let client = client_with_key("k3y");
        let request = client.request("i", "tt0133093").unwrap();
        assert_eq!(
            query_pairs(&request),
            vec![
                ("i".to_string(), "tt0133093".to_string()),
                ("apikey".to_string(), "k3y".to_string()),
            ]
        );
    }

    #[test]
    fn client_builds_from_default_config() {
        let config = CatalogConfig {
            api_key: "key".to_string(),
            timeout_secs: Some(3),
            ..CatalogConfig::default()
        };
        let client = OmdbClient::new(&config).unwrap();
        assert_eq!(client.api_key, "key");
        assert_eq!(client.base_url, config.base_url);
    }
}
