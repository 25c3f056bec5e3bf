//! FirestoreProductStore -- concrete [`ProductStore`] over the Firestore REST API.
//!
//! - `query_published`: `documents:runQuery` filtered on `publishOnline == true`.
//! - `get_one`: `GET documents/{collection}/{id}`.
//! - `get_many`: `documents:runQuery` with `__name__ IN [...]`.
//! - `subscribe_published`: a polling task, see [`poll_published`].
//!
//! The optional web API key is held as a [`SecretString`] and only exposed
//! when building request URLs.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

use malim_core::catalog::{MAX_BATCH_IDS, ProductFeed, ProductStore};
use malim_types::catalog::Product;
use malim_types::config::{CatalogConfig, FirestoreConfig};
use malim_types::error::StoreError;

use super::feed::poll_published;
use super::value::{Document, RunQueryItem};

/// Request timeout for every store call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Buffered feed events before the poller waits for the consumer.
const FEED_CAPACITY: usize = 4;

/// Read-only client for the published catalog collection.
#[derive(Clone)]
pub struct FirestoreProductStore {
    client: reqwest::Client,
    base_url: String,
    project_id: String,
    collection: String,
    api_key: Option<SecretString>,
    poll_interval: Duration,
}

impl FirestoreProductStore {
    pub fn new(firestore: &FirestoreConfig, catalog: &CatalogConfig) -> Result<Self, StoreError> {
        if firestore.project_id.trim().is_empty() {
            return Err(StoreError::Connection(
                "firestore.project_id is not configured".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| StoreError::Connection(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: firestore.base_url.trim_end_matches('/').to_string(),
            project_id: firestore.project_id.clone(),
            collection: catalog.collection.clone(),
            api_key: firestore.api_key.clone().map(SecretString::from),
            poll_interval: Duration::from_secs(catalog.poll_interval_secs.max(1)),
        })
    }

    fn database_path(&self) -> String {
        format!("projects/{}/databases/(default)/documents", self.project_id)
    }

    fn document_path(&self, id: &str) -> String {
        format!("{}/{}/{}", self.database_path(), self.collection, id)
    }

    fn url(&self, path: &str) -> String {
        let mut url = format!("{}/{}", self.base_url, path);
        if let Some(key) = &self.api_key {
            url.push_str("?key=");
            url.push_str(key.expose_secret());
        }
        url
    }

    /// Run a structured query against the collection and decode every
    /// returned document. Documents that fail to decode are skipped.
    async fn run_query(&self, filter: Value) -> Result<Vec<Product>, StoreError> {
        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": self.collection }],
                "where": filter,
            }
        });
        let url = self.url(&format!("{}:runQuery", self.database_path()));

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Connection(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(StoreError::Query(format!("HTTP {status}: {error_body}")));
        }

        let items: Vec<RunQueryItem> = response
            .json()
            .await
            .map_err(|e| StoreError::Deserialization(format!("invalid runQuery response: {e}")))?;

        let mut products = Vec::with_capacity(items.len());
        for document in items.into_iter().filter_map(|item| item.document) {
            match document.into_product() {
                Ok(product) => products.push(product),
                Err(err) => tracing::warn!(error = %err, "skipping undecodable document"),
            }
        }
        Ok(products)
    }
}

// FirestoreProductStore does not derive Debug; the API key must never be printed.

impl ProductStore for FirestoreProductStore {
    async fn query_published(&self) -> Result<Vec<Product>, StoreError> {
        let products = self
            .run_query(json!({
                "fieldFilter": {
                    "field": { "fieldPath": "publishOnline" },
                    "op": "EQUAL",
                    "value": { "booleanValue": true }
                }
            }))
            .await?;
        tracing::debug!(count = products.len(), "queried published products");
        Ok(products)
    }

    fn subscribe_published(&self) -> Result<ProductFeed, StoreError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| StoreError::Connection(format!("no async runtime for feed: {e}")))?;
        let (publisher, feed) = ProductFeed::channel(FEED_CAPACITY);
        runtime.spawn(poll_published(self.clone(), self.poll_interval, publisher));
        Ok(feed)
    }

    async fn get_one(&self, id: &str) -> Result<Product, StoreError> {
        let url = self.url(&self.document_path(id));
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| StoreError::Connection(e.without_url().to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound);
        }
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(StoreError::Query(format!("HTTP {status}: {error_body}")));
        }

        let document: Document = response
            .json()
            .await
            .map_err(|e| StoreError::Deserialization(format!("invalid document: {e}")))?;
        document.into_product()
    }

    async fn get_many(&self, ids: &[String]) -> Result<Vec<Product>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        if ids.len() > MAX_BATCH_IDS {
            return Err(StoreError::Query(format!(
                "batch of {} ids exceeds the IN limit of {MAX_BATCH_IDS}",
                ids.len()
            )));
        }

        let references: Vec<Value> = ids
            .iter()
            .map(|id| json!({ "referenceValue": self.document_path(id) }))
            .collect();

        self.run_query(json!({
            "fieldFilter": {
                "field": { "fieldPath": "__name__" },
                "op": "IN",
                "value": { "arrayValue": { "values": references } }
            }
        }))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RUN_QUERY: &str = "/projects/malim/databases/(default)/documents:runQuery";

    fn store(server: &MockServer) -> FirestoreProductStore {
        let firestore = FirestoreConfig {
            project_id: "malim".to_string(),
            api_key: Some("web-key".to_string()),
            base_url: server.uri(),
        };
        FirestoreProductStore::new(&firestore, &CatalogConfig::default()).unwrap()
    }

    fn document(id: &str, published: bool, date_added: i64) -> Value {
        json!({
            "name": format!("projects/malim/databases/(default)/documents/disponible/{id}"),
            "fields": {
                "name": { "stringValue": format!("Prenda {id}") },
                "publicPrice": { "integerValue": "600" },
                "publishOnline": { "booleanValue": published },
                "dateAdded": { "integerValue": date_added.to_string() }
            }
        })
    }

    #[test]
    fn new_requires_project_id() {
        let result = FirestoreProductStore::new(&FirestoreConfig::default(), &CatalogConfig::default());
        assert!(matches!(result, Err(StoreError::Connection(_))));
    }

    #[tokio::test]
    async fn query_published_filters_on_publish_flag() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(RUN_QUERY))
            .and(query_param("key", "web-key"))
            .and(body_partial_json(json!({
                "structuredQuery": {
                    "from": [{ "collectionId": "disponible" }],
                    "where": { "fieldFilter": { "field": { "fieldPath": "publishOnline" } } }
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "document": document("A", true, 100), "readTime": "2026-03-01T00:00:00Z" },
                { "document": { "name": "projects/malim/databases/(default)/documents/disponible/BAD", "fields": {} } },
                { "document": document("B", true, 200) }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let products = store(&server).query_published().await.unwrap();
        let ids: Vec<&str> = products.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn empty_query_result_has_no_documents() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(RUN_QUERY))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{ "readTime": "2026-03-01T00:00:00Z" }])),
            )
            .mount(&server)
            .await;

        assert!(store(&server).query_published().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_one_maps_404_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects/malim/databases/(default)/documents/disponible/NOPE"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": { "code": 404, "status": "NOT_FOUND" }
            })))
            .mount(&server)
            .await;

        assert_eq!(store(&server).get_one("NOPE").await.unwrap_err(), StoreError::NotFound);
    }

    #[tokio::test]
    async fn get_one_returns_unpublished_documents_too() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects/malim/databases/(default)/documents/disponible/Z"))
            .respond_with(ResponseTemplate::new(200).set_body_json(document("Z", false, 5)))
            .mount(&server)
            .await;

        let product = store(&server).get_one("Z").await.unwrap();
        assert_eq!(product.id, "Z");
        assert!(!product.is_published());
    }

    #[tokio::test]
    async fn get_many_sends_name_in_filter() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(RUN_QUERY))
            .and(body_partial_json(json!({
                "structuredQuery": { "where": { "fieldFilter": {
                    "field": { "fieldPath": "__name__" },
                    "op": "IN",
                    "value": { "arrayValue": { "values": [
                        { "referenceValue": "projects/malim/databases/(default)/documents/disponible/C" }
                    ] } }
                } } }
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{ "document": document("C", true, 1) }])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let products = store(&server).get_many(&["C".to_string()]).await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id, "C");
    }

    #[tokio::test]
    async fn get_many_rejects_oversized_batches() {
        let server = MockServer::start().await;
        let ids: Vec<String> = (0..11).map(|i| format!("P{i}")).collect();
        let err = store(&server).get_many(&ids).await.unwrap_err();
        assert!(matches!(err, StoreError::Query(_)));
    }

    #[tokio::test]
    async fn server_error_is_a_query_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(RUN_QUERY))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let err = store(&server).query_published().await.unwrap_err();
        assert!(matches!(err, StoreError::Query(msg) if msg.contains("503")));
    }
}
