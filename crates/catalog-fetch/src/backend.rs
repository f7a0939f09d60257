//! Content backend clients.
//!
//! The backend is addressed by `(project, model)` and returns items one page
//! at a time. Two HTTP shapes are supported: the public read API, which
//! returns flat records, and the integration API, which returns key/value
//! field lists that are flattened here so callers always see flat records.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::error::{FetchError, FetchResult};

/// One page of raw items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemsPage {
    pub items: Vec<Value>,
    pub total_count: usize,
}

/// Paginated item listing keyed by project and model.
#[async_trait]
pub trait ContentBackend: Send + Sync {
    /// Fetch one page (1-based) of items.
    async fn items_page(
        &self,
        project: &str,
        model: &str,
        page: usize,
        per_page: usize,
    ) -> FetchResult<ItemsPage>;
}

/// Which HTTP API the backend speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiShape {
    /// `GET /api/p/<project>/<model>` returning `{results, totalCount}`.
    Public,
    /// `GET /api/projects/<project>/models/<model>/items` returning
    /// `{items: [{id, fields: [{key, value}]}], totalCount}`. Needs a token.
    Integration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublicPage {
    #[serde(default)]
    results: Vec<Value>,
    #[serde(default)]
    total_count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntegrationPage {
    #[serde(default)]
    items: Vec<Value>,
    #[serde(default)]
    total_count: usize,
}

/// Content backend reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    token: Option<String>,
    shape: ApiShape,
}

impl HttpBackend {
    pub fn new(base_url: &str, shape: ApiShape, timeout: Duration) -> FetchResult<Self> {
        if base_url.is_empty() {
            return Err(FetchError::InvalidConfig("content backend URL is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            shape,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = (!token.is_empty()).then_some(token);
        self
    }

    pub fn shape(&self) -> ApiShape {
        self.shape
    }

    fn page_url(&self, project: &str, model: &str, page: usize, per_page: usize) -> String {
        match self.shape {
            ApiShape::Public => format!(
                "{}/api/p/{}/{}?page={}&per_page={}",
                self.base_url, project, model, page, per_page
            ),
            ApiShape::Integration => format!(
                "{}/api/projects/{}/models/{}/items?page={}&perPage={}&asset=all",
                self.base_url, project, model, page, per_page
            ),
        }
    }
}

#[async_trait]
impl ContentBackend for HttpBackend {
    #[instrument(skip(self), fields(shape = ?self.shape))]
    async fn items_page(
        &self,
        project: &str,
        model: &str,
        page: usize,
        per_page: usize,
    ) -> FetchResult<ItemsPage> {
        let url = self.page_url(project, model, page, per_page);
        debug!(url = %url, "Fetching items page");

        let mut request = self.client.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(format!("{}/{}", project, model)));
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url,
            });
        }

        match self.shape {
            ApiShape::Public => {
                let page: PublicPage = response.json().await?;
                Ok(ItemsPage {
                    items: page.results,
                    total_count: page.total_count,
                })
            }
            ApiShape::Integration => {
                let page: IntegrationPage = response.json().await?;
                Ok(ItemsPage {
                    items: page.items.into_iter().map(flatten_fields).collect(),
                    total_count: page.total_count,
                })
            }
        }
    }
}

/// Flatten an integration item into a plain record: `id` plus one entry per
/// field and metadata field key. Records that are already flat pass through.
pub fn flatten_fields(item: Value) -> Value {
    let Value::Object(mut obj) = item else {
        return item;
    };
    if !obj.contains_key("fields") {
        return Value::Object(obj);
    }

    let mut flat = Map::new();
    if let Some(id) = obj.remove("id") {
        flat.insert("id".to_string(), id);
    }

    for key in ["metadataFields", "fields"] {
        let Some(Value::Array(fields)) = obj.remove(key) else {
            continue;
        };
        for field in fields {
            let Value::Object(mut field) = field else {
                continue;
            };
            let Some(Value::String(name)) = field.remove("key") else {
                continue;
            };
            let value = field.remove("value").unwrap_or(Value::Null);
            flat.insert(name, value);
        }
    }

    Value::Object(flat)
}
