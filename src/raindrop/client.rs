use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use super::types::{
    Collection, CollectionId, CollectionRef, ItemResponse, ItemsResponse, NewCollection, Raindrop,
    RaindropUpdate,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Page size for bookmark listings (the API maximum).
pub const PER_PAGE: usize = 50;

/// Safety valve for the paging loop.
const MAX_PAGES: u32 = 1000;

#[derive(Debug, Error)]
pub enum RaindropError {
    /// Network-level error (DNS, connection, TLS, timeout)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// 2xx response whose envelope carries `"result": false`
    #[error("API error: {0}")]
    Api(String),
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Response too large")]
    ResponseTooLarge,
    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
}

/// Bearer-authenticated client for the raindrop.io REST API.
pub struct RaindropClient {
    http: reqwest::Client,
    base: Url,
    token: SecretString,
}

impl RaindropClient {
    /// Build a client rooted at `base_url` (e.g. `https://api.raindrop.io/rest/v1/`).
    pub fn new(token: SecretString, base_url: &str) -> Result<Self, RaindropError> {
        // Url::join drops the last path segment unless the base ends in '/'
        let base = if base_url.ends_with('/') {
            Url::parse(base_url)?
        } else {
            Url::parse(&format!("{}/", base_url))?
        };
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("raindrop2rss/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, base, token })
    }

    // ========================================================================
    // Bookmarks
    // ========================================================================

    /// One page of bookmarks from `collection`, zero-based.
    pub async fn list_raindrops(
        &self,
        collection: CollectionRef,
        page: u32,
    ) -> Result<Vec<Raindrop>, RaindropError> {
        let mut url = self.endpoint(&format!("raindrops/{}", collection.id()))?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("perpage", &PER_PAGE.to_string());

        let response: ItemsResponse<Raindrop> = self.send(self.http.get(url)).await?;
        into_items(response)
    }

    /// Every bookmark in `collection`, following pages until a short page.
    pub async fn search(&self, collection: CollectionRef) -> Result<Vec<Raindrop>, RaindropError> {
        let mut all = Vec::new();
        for page in 0..MAX_PAGES {
            let items = self.list_raindrops(collection, page).await?;
            let count = items.len();
            all.extend(items);
            if count < PER_PAGE {
                tracing::debug!(
                    collection = collection.id(),
                    pages = page + 1,
                    total = all.len(),
                    "Listed bookmarks"
                );
                return Ok(all);
            }
        }
        tracing::warn!(
            collection = collection.id(),
            max_pages = MAX_PAGES,
            "Stopped listing bookmarks at page limit"
        );
        Ok(all)
    }

    /// Move a bookmark to `collection_id` and replace its tags.
    pub async fn update_raindrop(
        &self,
        id: i64,
        collection_id: i64,
        link: &str,
        tags: &[&str],
    ) -> Result<Raindrop, RaindropError> {
        let url = self.endpoint(&format!("raindrop/{}", id))?;
        let body = RaindropUpdate {
            collection: CollectionId { id: collection_id },
            link,
            tags,
        };
        let response: ItemResponse<Raindrop> =
            self.send(json_body(self.http.put(url), &body)?).await?;
        into_item(response)
    }

    // ========================================================================
    // Collections
    // ========================================================================

    /// Root and nested collections.
    pub async fn collections(&self) -> Result<Vec<Collection>, RaindropError> {
        let root: ItemsResponse<Collection> =
            self.send(self.http.get(self.endpoint("collections")?)).await?;
        let mut collections = into_items(root)?;

        let children: ItemsResponse<Collection> = self
            .send(self.http.get(self.endpoint("collections/childrens")?))
            .await?;
        collections.extend(into_items(children)?);
        Ok(collections)
    }

    pub async fn create_collection(&self, title: &str) -> Result<Collection, RaindropError> {
        let url = self.endpoint("collection")?;
        let response: ItemResponse<Collection> = self
            .send(json_body(self.http.post(url), &NewCollection { title })?)
            .await?;
        let collection = into_item(response)?;
        tracing::info!(id = collection.id, title = %collection.title, "Created collection");
        Ok(collection)
    }

    /// The collection titled exactly `title`, created if there is none.
    pub async fn get_or_create_collection(&self, title: &str) -> Result<Collection, RaindropError> {
        if let Some(existing) = self
            .collections()
            .await?
            .into_iter()
            .find(|c| c.title == title)
        {
            return Ok(existing);
        }
        self.create_collection(title).await
    }

    // ========================================================================
    // Transport
    // ========================================================================

    fn endpoint(&self, path: &str) -> Result<Url, RaindropError> {
        Ok(self.base.join(path)?)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, RaindropError> {
        let response = request
            .bearer_auth(self.token.expose_secret())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RaindropError::HttpStatus(response.status().as_u16()));
        }

        let bytes = read_limited_bytes(response, MAX_RESPONSE_SIZE).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn json_body<B: Serialize>(
    request: reqwest::RequestBuilder,
    body: &B,
) -> Result<reqwest::RequestBuilder, RaindropError> {
    Ok(request
        .header(CONTENT_TYPE, "application/json")
        .body(serde_json::to_vec(body)?))
}

fn into_items<T>(response: ItemsResponse<T>) -> Result<Vec<T>, RaindropError> {
    if !response.result {
        return Err(api_error(response.error_message));
    }
    Ok(response.items)
}

fn into_item<T>(response: ItemResponse<T>) -> Result<T, RaindropError> {
    match response.item {
        Some(item) if response.result => Ok(item),
        _ => Err(api_error(response.error_message)),
    }
}

fn api_error(message: Option<String>) -> RaindropError {
    RaindropError::Api(message.unwrap_or_else(|| "request was not successful".to_string()))
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, RaindropError> {
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(RaindropError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(RaindropError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> RaindropClient {
        RaindropClient::new(SecretString::from("test-token".to_string()), &server.uri()).unwrap()
    }

    fn raindrop_json(id: i64) -> serde_json::Value {
        json!({
            "_id": id,
            "link": format!("https://example.com/{}", id),
            "title": format!("Bookmark {}", id),
            "created": "2024-05-01T08:00:00.000Z",
        })
    }

    #[tokio::test]
    async fn test_list_raindrops_sends_bearer_and_paging() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/raindrops/-1"))
            .and(query_param("page", "0"))
            .and(query_param("perpage", "50"))
            .and(header("Authorization", "Bearer test-token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"result": true, "items": [raindrop_json(1)]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let items = client(&server)
            .list_raindrops(CollectionRef::Unsorted, 0)
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Bookmark 1");
    }

    #[tokio::test]
    async fn test_search_follows_pages() {
        let server = MockServer::start().await;
        let full_page: Vec<_> = (0..PER_PAGE as i64).map(raindrop_json).collect();
        Mock::given(method("GET"))
            .and(path("/raindrops/0"))
            .and(query_param("page", "0"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"result": true, "items": full_page})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/raindrops/0"))
            .and(query_param("page", "1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"result": true, "items": [raindrop_json(100)]})),
            )
            .mount(&server)
            .await;

        let items = client(&server).search(CollectionRef::All).await.unwrap();
        assert_eq!(items.len(), PER_PAGE + 1);
        assert_eq!(items.last().unwrap().id, 100);
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client(&server)
            .list_raindrops(CollectionRef::Unsorted, 0)
            .await
            .unwrap_err();
        match err {
            RaindropError::HttpStatus(401) => {}
            e => panic!("Expected HttpStatus(401), got {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_result_false_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"result": false, "errorMessage": "Collection not found"}),
            ))
            .mount(&server)
            .await;

        let err = client(&server)
            .list_raindrops(CollectionRef::Id(5), 0)
            .await
            .unwrap_err();
        match err {
            RaindropError::Api(msg) => assert_eq!(msg, "Collection not found"),
            e => panic!("Expected Api error, got {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_malformed_json_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client(&server).collections().await.unwrap_err();
        assert!(matches!(err, RaindropError::Decode(_)));
    }

    #[tokio::test]
    async fn test_get_or_create_finds_nested_collection() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"result": true, "items": [{"_id": 1, "title": "Reading"}]}),
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/collections/childrens"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"result": true, "items": [{"_id": 2, "title": "Handled"}]}),
            ))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let collection = client(&server)
            .get_or_create_collection("Handled")
            .await
            .unwrap();
        assert_eq!(collection.id, 2);
    }

    #[tokio::test]
    async fn test_get_or_create_creates_missing_collection() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": true, "items": []})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/collection"))
            .and(body_json(json!({"title": "Handled"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"result": true, "item": {"_id": 77, "title": "Handled"}}),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let collection = client(&server)
            .get_or_create_collection("Handled")
            .await
            .unwrap();
        assert_eq!(collection.id, 77);
    }

    #[tokio::test]
    async fn test_update_raindrop_moves_and_tags() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/raindrop/42"))
            .and(body_json(json!({
                "collection": {"$id": 77},
                "link": "https://example.com/42",
                "tags": ["rss"],
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"result": true, "item": raindrop_json(42)})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let updated = client(&server)
            .update_raindrop(42, 77, "https://example.com/42", &["rss"])
            .await
            .unwrap();
        assert_eq!(updated.id, 42);
    }

    #[test]
    fn test_invalid_base_url() {
        let result = RaindropClient::new(SecretString::from("t".to_string()), "not a url");
        assert!(matches!(result, Err(RaindropError::InvalidBaseUrl(_))));
    }
}
