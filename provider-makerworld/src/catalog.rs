//! MakerWorld catalog client
//!
//! Fetches a maker's published-design list, full design detail, and the
//! short-lived download URLs for model archives and print-profile instance
//! files. All requests ride on the shared session [`HttpClient`], so the
//! platform's anti-bot cookies apply uniformly.

use crate::error::{ProviderError, Result};
use crate::http::{HttpClient, HttpRequest};
use crate::types::{
    DesignDetailDto, DesignListDto, DownloadUrlDto, RemoteDesignDetail, RemoteDesignSummary,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Read operations against a remote design platform
#[async_trait]
pub trait DesignCatalog: Send + Sync {
    /// All published designs for the maker identified by `handle`/`user_id`
    async fn list_published(
        &self,
        handle: &str,
        user_id: &str,
    ) -> Result<Vec<RemoteDesignSummary>>;

    /// Full detail for one design, by internal numeric id
    async fn design_detail(&self, remote_id: i64) -> Result<RemoteDesignDetail>;

    /// Short-lived URL for the design's model-file archive
    async fn model_archive_url(&self, remote_id: i64) -> Result<String>;

    /// Short-lived URL for one print-profile instance file
    async fn instance_file_url(&self, instance_id: i64) -> Result<String>;
}

const DEFAULT_BASE_URL: &str = "https://makerworld.com/api/v1";
const LIST_PAGE_SIZE: usize = 50;

/// [`DesignCatalog`] backed by the MakerWorld web API
pub struct MakerWorldCatalog {
    http: Arc<dyn HttpClient>,
    base_url: String,
}

impl MakerWorldCatalog {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Override the API base URL (testing, regional mirrors)
    pub fn with_base_url(http: Arc<dyn HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: String) -> Result<T> {
        let request = HttpRequest::get(url).header("Accept", "application/json");
        let response = self.http.execute(request).await?;

        if !response.is_success() {
            return Err(ProviderError::Api {
                status: response.status,
                message: response.text(),
            });
        }

        response.json()
    }
}

#[async_trait]
impl DesignCatalog for MakerWorldCatalog {
    #[instrument(skip(self))]
    async fn list_published(
        &self,
        handle: &str,
        user_id: &str,
    ) -> Result<Vec<RemoteDesignSummary>> {
        let mut designs = Vec::new();
        let mut offset = 0usize;

        loop {
            let url = format!(
                "{}/design-service/published/{}/design?handle=%40{}&limit={}&offset={}",
                self.base_url,
                user_id,
                urlencoding::encode(handle),
                LIST_PAGE_SIZE,
                offset
            );

            let page: DesignListDto = self.get_json(url).await?;
            let count = page.hits.len();
            designs.extend(page.hits.into_iter().map(RemoteDesignSummary::from));

            debug!(offset, count, total = page.total, "Fetched design list page");

            // A short page is the last page. The total is advisory only,
            // some responses omit it.
            if count < LIST_PAGE_SIZE {
                break;
            }
            offset += count;
        }

        debug!(designs = designs.len(), "Fetched published design list");
        Ok(designs)
    }

    #[instrument(skip(self))]
    async fn design_detail(&self, remote_id: i64) -> Result<RemoteDesignDetail> {
        let url = format!("{}/design-service/design/{}", self.base_url, remote_id);
        let dto: DesignDetailDto = self.get_json(url).await?;
        Ok(dto.into())
    }

    #[instrument(skip(self))]
    async fn model_archive_url(&self, remote_id: i64) -> Result<String> {
        let url = format!(
            "{}/design-service/design/{}/download",
            self.base_url, remote_id
        );
        let dto: DownloadUrlDto = self.get_json(url).await?;
        if dto.url.is_empty() {
            warn!(remote_id, "Empty archive download URL");
            return Err(ProviderError::Parse(
                "Archive download URL was empty".to_string(),
            ));
        }
        Ok(dto.url)
    }

    #[instrument(skip(self))]
    async fn instance_file_url(&self, instance_id: i64) -> Result<String> {
        let url = format!(
            "{}/design-service/instance/{}/f3mf?type=download",
            self.base_url, instance_id
        );
        let dto: DownloadUrlDto = self.get_json(url).await?;
        Ok(dto.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpMethod, HttpResponse};
    use bytes::Bytes;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        Http {}

        #[async_trait]
        impl HttpClient for Http {
            async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
        }
    }

    fn json_response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    #[tokio::test]
    async fn test_list_published_single_page() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .withf(|req| {
                req.method == HttpMethod::Get
                    && req.url.contains("/design-service/published/u-9/design")
                    && req.url.contains("handle=%40maker")
                    && req.url.contains("offset=0")
            })
            .times(1)
            .returning(|_| {
                Ok(json_response(
                    200,
                    r#"{"total": 1, "hits": [{"id": 42, "designId": "MW-42", "title": "Cube", "tags": ["test"]}]}"#,
                ))
            });

        let catalog = MakerWorldCatalog::new(Arc::new(http));
        let designs = catalog.list_published("maker", "u-9").await.unwrap();

        assert_eq!(designs.len(), 1);
        assert_eq!(designs[0].id, 42);
        assert_eq!(designs[0].public_id.as_deref(), Some("MW-42"));
    }

    #[tokio::test]
    async fn test_list_published_paginates() {
        let mut http = MockHttp::new();

        let full_page: Vec<String> = (0..LIST_PAGE_SIZE)
            .map(|i| format!(r#"{{"id": {}, "title": "d{}"}}"#, i, i))
            .collect();
        let first = format!(r#"{{"total": 51, "hits": [{}]}}"#, full_page.join(","));

        http.expect_execute()
            .withf(|req| req.url.contains("offset=0"))
            .times(1)
            .returning(move |_| Ok(json_response(200, &first)));
        http.expect_execute()
            .withf(|req| req.url.contains("offset=50"))
            .times(1)
            .returning(|_| {
                Ok(json_response(
                    200,
                    r#"{"total": 51, "hits": [{"id": 50, "title": "d50"}]}"#,
                ))
            });

        let catalog = MakerWorldCatalog::new(Arc::new(http));
        let designs = catalog.list_published("maker", "u-9").await.unwrap();
        assert_eq!(designs.len(), 51);
    }

    #[tokio::test]
    async fn test_captcha_status_maps_to_api_error() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .returning(|_| Ok(json_response(418, "challenge required")));

        let catalog = MakerWorldCatalog::new(Arc::new(http));
        let err = catalog.list_published("maker", "u-9").await.unwrap_err();
        assert!(err.is_captcha());
    }

    #[tokio::test]
    async fn test_design_detail_conversion() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .withf(|req| req.url.ends_with("/design-service/design/42"))
            .returning(|_| {
                Ok(json_response(
                    200,
                    r#"{"id": 42, "title": "Cube", "modelFiles": [{"name": "cube.stl"}], "instances": [{"id": 1, "title": "0.2mm"}]}"#,
                ))
            });

        let catalog = MakerWorldCatalog::new(Arc::new(http));
        let detail = catalog.design_detail(42).await.unwrap();

        assert_eq!(detail.summary.title, "Cube");
        assert_eq!(detail.model_files[0].name, "cube.stl");
        assert_eq!(detail.instances[0].name, "0.2mm");
    }

    #[tokio::test]
    async fn test_model_archive_url() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .withf(|req| req.url.ends_with("/design-service/design/42/download"))
            .returning(|_| {
                Ok(json_response(
                    200,
                    r#"{"url": "https://makerworld.bblmw.com/archive/42.zip"}"#,
                ))
            });

        let catalog = MakerWorldCatalog::new(Arc::new(http));
        let url = catalog.model_archive_url(42).await.unwrap();
        assert_eq!(url, "https://makerworld.bblmw.com/archive/42.zip");
    }

    #[tokio::test]
    async fn test_malformed_detail_is_parse_error() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .returning(|_| Ok(json_response(200, r#"{"unexpected": true}"#)));

        let catalog = MakerWorldCatalog::new(Arc::new(http));
        let err = catalog.design_detail(42).await.unwrap_err();
        assert!(matches!(err, ProviderError::Parse(_)));
    }
}
