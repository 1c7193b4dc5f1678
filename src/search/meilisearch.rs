//! Meilisearch REST adapter
//!
//! Write calls return once Meilisearch has enqueued the task; the adapter
//! does not poll task completion.

use super::document::SearchDocument;
use super::engine::{
    EngineIndexStats, EngineSearchRequest, EngineSearchResponse, IndexSettings, SearchEngine,
};
use super::error::{SearchError, SearchResult};
use crate::config::MeilisearchConfig;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

const PRIMARY_KEY: &str = "id";

/// [`SearchEngine`] backed by a Meilisearch server
#[derive(Clone)]
pub struct MeilisearchEngine {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl MeilisearchEngine {
    pub fn new(config: &MeilisearchConfig) -> SearchResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("manuscript-search/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                SearchError::InvalidConfiguration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.resolved_api_key(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Base URL plus `segments`, each percent-encoded as a single path segment
    fn segments_url(&self, segments: &[&str]) -> SearchResult<Url> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            SearchError::InvalidConfiguration(format!("Invalid Meilisearch URL: {}", e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                SearchError::InvalidConfiguration(format!(
                    "Meilisearch URL cannot be a base: {}",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> SearchResult<Response> {
        Ok(self.authorize(request).send().await?)
    }

    async fn put_setting<T: Serialize + ?Sized>(
        &self,
        uid: &str,
        setting: &str,
        value: &T,
    ) -> SearchResult<()> {
        let response = self
            .send(
                self.client
                    .put(self.url(&format!("/indexes/{}/settings/{}", uid, setting)))
                    .json(value),
            )
            .await?;
        expect_success(response).await.map(|_| ())
    }
}

/// Meilisearch document ids are limited to ASCII alphanumerics, `-` and `_`
fn is_document_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 511
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Turn a non-2xx response into [`SearchError::EngineRejected`]
async fn expect_success(response: Response) -> SearchResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or(body);
    Err(SearchError::EngineRejected {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl SearchEngine for MeilisearchEngine {
    async fn health(&self) -> bool {
        match self.send(self.client.get(self.url("/health"))).await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(error = %e, url = %self.base_url, "Meilisearch health check failed");
                false
            }
        }
    }

    async fn ensure_index_and_settings(
        &self,
        uid: &str,
        settings: &IndexSettings,
    ) -> SearchResult<()> {
        let response = self
            .send(self.client.get(self.url(&format!("/indexes/{}", uid))))
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            info!(uid, "Creating search index");
            let created = self
                .send(
                    self.client
                        .post(self.url("/indexes"))
                        .json(&json!({ "uid": uid, "primaryKey": PRIMARY_KEY })),
                )
                .await?;
            expect_success(created).await?;
        } else {
            expect_success(response).await?;
        }

        self.put_setting(uid, "filterable-attributes", &settings.filterable_attributes)
            .await?;
        self.put_setting(uid, "sortable-attributes", &settings.sortable_attributes)
            .await?;
        self.put_setting(uid, "searchable-attributes", &settings.searchable_attributes)
            .await?;

        debug!(uid, "Pushed index settings");
        Ok(())
    }

    async fn add_documents(&self, uid: &str, documents: &[SearchDocument]) -> SearchResult<()> {
        if documents.is_empty() {
            return Ok(());
        }
        let response = self
            .send(
                self.client
                    .put(self.url(&format!("/indexes/{}/documents", uid)))
                    .query(&[("primaryKey", PRIMARY_KEY)])
                    .json(documents),
            )
            .await?;
        expect_success(response).await?;
        debug!(uid, documents = documents.len(), "Enqueued document batch");
        Ok(())
    }

    async fn delete_all(&self, uid: &str) -> SearchResult<()> {
        let response = self
            .send(self.client.delete(self.url(&format!("/indexes/{}/documents", uid))))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(uid, "Index missing, nothing to delete");
            return Ok(());
        }
        expect_success(response).await.map(|_| ())
    }

    async fn search(
        &self,
        uid: &str,
        request: &EngineSearchRequest,
    ) -> SearchResult<EngineSearchResponse> {
        let response = self
            .send(
                self.client
                    .post(self.url(&format!("/indexes/{}/search", uid)))
                    .json(request),
            )
            .await?;
        let response = expect_success(response).await?;
        let body: EngineSearchResponse = response.json().await?;
        Ok(body)
    }

    async fn get_document(&self, uid: &str, id: &str) -> SearchResult<Option<Value>> {
        if !is_document_id(id) {
            debug!(uid, id, "Rejecting malformed document id");
            return Ok(None);
        }
        let response = self
            .send(self.client.get(self.segments_url(&["indexes", uid, "documents", id])?))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = expect_success(response).await?;
        Ok(Some(response.json().await?))
    }

    async fn stats(&self, uid: &str) -> SearchResult<EngineIndexStats> {
        let response = self
            .send(self.client.get(self.url(&format!("/indexes/{}/stats", uid))))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(EngineIndexStats::default());
        }
        let response = expect_success(response).await?;
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> MeilisearchConfig {
        MeilisearchConfig {
            url: url.to_string(),
            api_key: Some("masterKey".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_base_url_is_normalised() {
        let engine = MeilisearchEngine::new(&config("http://localhost:7700/")).unwrap();
        assert_eq!(engine.base_url(), "http://localhost:7700");
        assert_eq!(engine.url("/health"), "http://localhost:7700/health");
    }

    #[test]
    fn test_document_id_charset() {
        assert!(is_document_id("31_0"));
        assert!(is_document_id("item-part-7"));
        assert!(!is_document_id(""));
        assert!(!is_document_id(".."));
        assert!(!is_document_id("../../../keys"));
        assert!(!is_document_id("7?fields=*"));
        assert!(!is_document_id("7%2F..%2Fkeys"));
    }

    #[test]
    fn test_segments_are_encoded_individually() {
        let engine = MeilisearchEngine::new(&config("http://localhost:7700/")).unwrap();
        let url = engine
            .segments_url(&["indexes", "texts", "documents", "a/b c"])
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:7700/indexes/texts/documents/a%2Fb%20c");
    }

    #[tokio::test]
    async fn test_document_lookup_stays_on_the_documents_route() {
        let mut server = mockito::Server::new_async().await;
        let document = server
            .mock("GET", "/indexes/texts/documents/31_0")
            .match_header("authorization", "Bearer masterKey")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"31_0","content":"Foo Bar"}"#)
            .create_async()
            .await;
        let keys = server
            .mock("GET", "/keys")
            .with_status(200)
            .with_body(r#"{"results":[{"key":"admin"}]}"#)
            .expect(0)
            .create_async()
            .await;
        let listing = server
            .mock("GET", "/indexes/texts/documents")
            .with_status(200)
            .with_body(r#"{"results":[]}"#)
            .expect(0)
            .create_async()
            .await;

        let engine = MeilisearchEngine::new(&config(&server.url())).unwrap();

        let found = engine.get_document("texts", "31_0").await.unwrap().unwrap();
        assert_eq!(found["content"], "Foo Bar");
        assert!(engine.get_document("texts", "../../../keys").await.unwrap().is_none());
        assert!(engine.get_document("texts", "..").await.unwrap().is_none());
        assert!(engine.get_document("texts", "").await.unwrap().is_none());

        document.assert_async().await;
        keys.assert_async().await;
        listing.assert_async().await;
    }

    #[tokio::test]
    async fn test_unreachable_engine_is_unhealthy_and_transient() {
        let engine = MeilisearchEngine::new(&MeilisearchConfig {
            timeout_secs: 1,
            ..config("http://127.0.0.1:9")
        })
        .unwrap();
        assert!(!engine.health().await);

        let err = engine.delete_all("item_parts").await.unwrap_err();
        assert!(err.is_transient());
    }
}
