//! OneDrive items API client
//!
//! Provides a typed HTTP client for the item-ID-addressed OneDrive API.
//! Every request obtains its bearer token from the shared [`TokenStore`],
//! so an expired token is refreshed before the call goes out.
//!
//! Request paths are built from item IDs appended to the configured base
//! URL (`https://api.onedrive.com/v1.0/drive/items` by default).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use drivefs_core::domain::ItemId;
//! use drivefs_graph::auth::TokenStore;
//! use drivefs_graph::client::ApiClient;
//! use drivefs_graph::models::QueryOptions;
//!
//! # async fn example(tokens: Arc<TokenStore>) -> Result<(), drivefs_graph::GraphError> {
//! let client = ApiClient::new("https://api.onedrive.com/v1.0/drive/items", tokens)?;
//! let items = client
//!     .list_children(&ItemId::root(), &QueryOptions::stat_fields(false))
//!     .await?;
//! println!("{} items in the drive root", items.len());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use drivefs_core::domain::ItemId;
use futures_util::stream::{BoxStream, StreamExt};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::TokenStore;
use crate::models::{
    ChildrenPage, CreateLinkRequest, DriveItem, ErrorEnvelope, ItemPatch, NewFolder, Permission,
    QueryOptions,
};
use crate::retry::{retry_after_from, DEFAULT_MAX_RETRIES};
use crate::GraphError;

/// Streamed download body
pub type DownloadStream = BoxStream<'static, Result<Vec<u8>, GraphError>>;

/// Destination of an upload
#[derive(Debug, Clone, Copy)]
pub enum UploadTarget<'a> {
    /// Overwrite the content of an existing item
    Item(&'a ItemId),
    /// Create or overwrite the child `name` of `parent`
    Child { parent: &'a ItemId, name: &'a str },
}

// ============================================================================
// ApiClient
// ============================================================================

/// HTTP client for the OneDrive items API
pub struct ApiClient {
    http: Client,
    base_url: Url,
    tokens: Arc<TokenStore>,
    max_retries: u32,
}

impl ApiClient {
    /// Creates a client for the API rooted at `base_url`
    pub fn new(base_url: &str, tokens: Arc<TokenStore>) -> Result<Self, GraphError> {
        let base_url =
            Url::parse(base_url).map_err(|e| GraphError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(GraphError::InvalidUrl(base_url.to_string()));
        }

        Ok(Self {
            http: Client::new(),
            base_url,
            tokens,
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    /// Sets how often a throttled (429) request is retried
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    /// URL of `segments` below the base URL; each segment is percent-encoded
    pub fn item_url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Absolute URLs are used as-is, anything else is relative to the base
    fn resolve(&self, path_or_url: &str) -> Result<Url, GraphError> {
        if path_or_url.starts_with("https://") || path_or_url.starts_with("http://") {
            return Url::parse(path_or_url)
                .map_err(|e| GraphError::InvalidUrl(format!("{path_or_url}: {e}")));
        }

        let (path, query) = match path_or_url.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (path_or_url, None),
        };
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut url = self.item_url(&segments);
        url.set_query(query);
        Ok(url)
    }

    // ========================================================================
    // Request execution
    // ========================================================================

    /// Sends an authenticated request, retrying on HTTP 429
    ///
    /// `build` is invoked once per attempt so the request body can be
    /// rebuilt. The token store is consulted before every attempt.
    pub(crate) async fn send<F>(&self, what: &str, build: F) -> Result<Response, GraphError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            let token = self.tokens.access_token().await?;
            let response = build(&self.http).bearer_auth(&token).send().await?;

            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                if attempt > 0 {
                    info!(request = what, attempt, "Request succeeded after retry");
                }
                return check_status(response).await;
            }

            let retry_after = retry_after_from(response.headers());
            if attempt >= self.max_retries {
                warn!(request = what, attempts = attempt + 1, "429 retry limit exhausted");
                return Err(GraphError::TooManyRequests { retry_after });
            }

            info!(
                request = what,
                attempt,
                retry_after_ms = retry_after.as_millis(),
                "Received 429, backing off"
            );
            tokio::time::sleep(retry_after).await;
            attempt += 1;
        }
    }

    /// Performs one authenticated JSON call
    ///
    /// `path_or_url` is either an absolute URL or a path relative to the
    /// base URL, optionally with a query string. Empty bodies yield
    /// `Value::Null`.
    pub async fn request(
        &self,
        method: Method,
        path_or_url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<serde_json::Value, GraphError> {
        let url = self.resolve(path_or_url)?;
        let response = self
            .send(path_or_url, |http| {
                let builder = http.request(method.clone(), url.clone());
                match body {
                    Some(b) => builder.json(b),
                    None => builder,
                }
            })
            .await?;

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(serde_json::Value::Null);
        }
        decode(&bytes)
    }

    // ========================================================================
    // Listings
    // ========================================================================

    /// Lists all children of a folder, following `@odata.nextLink`
    ///
    /// Pages are concatenated in the order received. The result is not a
    /// snapshot: items changed while paging may be missed or repeated.
    pub async fn list_children(
        &self,
        id: &ItemId,
        options: &QueryOptions,
    ) -> Result<Vec<DriveItem>, GraphError> {
        let mut url = self.item_url(&[id.as_str(), "children"]);
        options.apply(&mut url);

        debug!(item = %id, "Listing children");

        let mut page = self.children_page(url).await?;
        let mut items = std::mem::take(&mut page.value);
        let mut page_count: u32 = 1;

        while let Some(next_link) = page.next_link.take() {
            page_count += 1;
            debug!(page = page_count, "Following children nextLink");

            let next_url = Url::parse(&next_link)
                .map_err(|e| GraphError::InvalidUrl(format!("nextLink {next_link}: {e}")))?;
            page = self.children_page(next_url).await?;

            debug!(
                page = page_count,
                items = page.value.len(),
                has_next = page.next_link.is_some(),
                "Received children page"
            );
            items.append(&mut page.value);
        }

        debug!(
            item = %id,
            total_items = items.len(),
            total_pages = page_count,
            "Children listing complete"
        );
        Ok(items)
    }

    /// Fetches a single page of a children listing
    pub async fn children_page(&self, url: Url) -> Result<ChildrenPage, GraphError> {
        let response = self
            .send("children", |http| http.get(url.clone()))
            .await?;
        json(response).await
    }

    /// True if the folder has at least one child folder
    pub async fn has_child_folders(&self, id: &ItemId) -> Result<bool, GraphError> {
        let mut url = self.item_url(&[id.as_str(), "children"]);
        QueryOptions::subfolder_probe().apply(&mut url);
        let page = self.children_page(url).await?;
        Ok(!page.value.is_empty())
    }

    // ========================================================================
    // Items
    // ========================================================================

    pub async fn get_item(
        &self,
        id: &ItemId,
        options: &QueryOptions,
    ) -> Result<DriveItem, GraphError> {
        let mut url = self.item_url(&[id.as_str()]);
        options.apply(&mut url);
        let response = self.send("get item", |http| http.get(url.clone())).await?;
        json(response).await
    }

    /// Looks up a child by name; `None` if there is none
    pub async fn find_child(
        &self,
        parent: &ItemId,
        name: &str,
    ) -> Result<Option<DriveItem>, GraphError> {
        let mut url = self.item_url(&[parent.as_str(), "children", name]);
        QueryOptions::id_only().apply(&mut url);

        match self.send("find child", |http| http.get(url.clone())).await {
            Ok(response) => json(response).await.map(Some),
            Err(GraphError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn create_folder(&self, parent: &ItemId, name: &str) -> Result<DriveItem, GraphError> {
        let url = self.item_url(&[parent.as_str(), "children"]);
        let body = NewFolder {
            name,
            folder: serde_json::Map::new(),
        };

        debug!(parent = %parent, name, "Creating folder");
        let response = self
            .send("create folder", |http| http.post(url.clone()).json(&body))
            .await?;
        json(response).await
    }

    /// Renames and/or moves an item
    pub async fn update_item(&self, id: &ItemId, patch: &ItemPatch) -> Result<DriveItem, GraphError> {
        let url = self.item_url(&[id.as_str()]);
        let response = self
            .send("update item", |http| http.patch(url.clone()).json(patch))
            .await?;
        json(response).await
    }

    pub async fn delete_item(&self, id: &ItemId) -> Result<(), GraphError> {
        let url = self.item_url(&[id.as_str()]);
        debug!(item = %id, "Deleting item");
        self.send("delete item", |http| http.delete(url.clone()))
            .await?;
        Ok(())
    }

    // ========================================================================
    // Content
    // ========================================================================

    /// Uploads content, overwriting any existing file
    pub async fn upload(
        &self,
        target: UploadTarget<'_>,
        content: Vec<u8>,
    ) -> Result<DriveItem, GraphError> {
        let mut url = match target {
            UploadTarget::Item(id) => self.item_url(&[id.as_str(), "content"]),
            UploadTarget::Child { parent, name } => {
                self.item_url(&[parent.as_str(), "children", name, "content"])
            }
        };
        url.query_pairs_mut().append_pair("overwrite", "true");

        debug!(?target, size = content.len(), "Uploading content");
        let response = self
            .send("upload", |http| {
                http.put(url.clone())
                    .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                    .body(content.clone())
            })
            .await?;
        json(response).await
    }

    /// Streams the content of a file
    pub async fn download(&self, id: &ItemId) -> Result<DownloadStream, GraphError> {
        let url = self.item_url(&[id.as_str(), "content"]);
        debug!(item = %id, "Downloading content");

        let response = self.send("download", |http| http.get(url.clone())).await?;
        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(GraphError::from))
            .boxed())
    }

    /// Creates an anonymous embed link and returns its web URL
    pub async fn create_share_link(&self, id: &ItemId) -> Result<Option<String>, GraphError> {
        let url = self.item_url(&[id.as_str(), "action.createLink"]);
        let body = CreateLinkRequest {
            kind: "embed",
            scope: "anonymous",
        };

        let response = self
            .send("create link", |http| http.post(url.clone()).json(&body))
            .await?;
        let permission: Permission = json(response).await?;
        Ok(permission.link.and_then(|l| l.web_url))
    }

    /// Fetches the medium thumbnail image of an item
    pub async fn thumbnail(&self, id: &ItemId) -> Result<Vec<u8>, GraphError> {
        let url = self.item_url(&[id.as_str(), "thumbnails", "0", "medium", "content"]);
        let response = self.send("thumbnail", |http| http.get(url.clone())).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

// ============================================================================
// Response handling
// ============================================================================

/// Maps a non-success response to a [`GraphError`]
async fn check_status(response: Response) -> Result<Response, GraphError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let (code, message) = match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => (envelope.error.code, envelope.error.message),
        Err(_) => (
            status.canonical_reason().unwrap_or("error").to_string(),
            body,
        ),
    };

    debug!(status = status.as_u16(), code = %code, "API returned error status");

    Err(match status {
        StatusCode::UNAUTHORIZED => GraphError::Unauthorized(message),
        StatusCode::NOT_FOUND => GraphError::NotFound(message),
        StatusCode::CONFLICT => GraphError::Conflict(message),
        _ => GraphError::Api {
            status: status.as_u16(),
            code,
            message,
        },
    })
}

/// Decodes a JSON body, surfacing embedded error payloads
pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, GraphError> {
    if let Ok(envelope) = serde_json::from_slice::<ErrorEnvelope>(bytes) {
        return Err(GraphError::Api {
            status: StatusCode::OK.as_u16(),
            code: envelope.error.code,
            message: envelope.error.message,
        });
    }
    serde_json::from_slice(bytes).map_err(|e| GraphError::InvalidResponse(e.to_string()))
}

pub(crate) async fn json<T: DeserializeOwned>(response: Response) -> Result<T, GraphError> {
    let bytes = response.bytes().await?;
    decode(&bytes)
}
