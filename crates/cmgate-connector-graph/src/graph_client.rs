//! Microsoft Graph HTTP client with token injection and pagination.

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::auth::TokenCache;
use crate::config::GraphConfig;
use crate::error::{GraphError, GraphResult};

/// `OData` error response from Microsoft Graph.
#[derive(Debug, Deserialize)]
pub struct ODataError {
    pub error: ODataErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ODataErrorBody {
    pub code: String,
    pub message: String,
    #[serde(rename = "innerError")]
    pub inner_error: Option<Value>,
}

/// One page of a Graph collection.
#[derive(Debug, Deserialize)]
pub struct ODataResponse<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

/// Query options for a collection request.
#[derive(Debug, Default, Clone)]
pub struct ListOptions {
    pub filter: Option<String>,
    pub select: Option<&'static str>,
    /// Adds `$count=true` and `ConsistencyLevel: eventual`, which Graph
    /// requires for advanced queries such as on-premises attribute filters.
    pub eventual: bool,
}

impl ListOptions {
    #[must_use]
    pub fn filter(filter: impl Into<String>) -> Self {
        Self {
            filter: Some(filter.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn select(mut self, select: &'static str) -> Self {
        self.select = Some(select);
        self
    }

    #[must_use]
    pub fn eventual(mut self) -> Self {
        self.eventual = true;
        self
    }
}

/// Quotes a value for an OData `$filter` string literal.
#[must_use]
pub fn odata_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Microsoft Graph API client.
#[derive(Debug)]
pub struct GraphClient {
    http_client: reqwest::Client,
    token_cache: Arc<TokenCache>,
    base_url: Url,
}

impl GraphClient {
    /// Creates a client and its token cache. No request is made yet.
    pub fn new(config: GraphConfig) -> GraphResult<Self> {
        config.validate()?;
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GraphError::Config(format!("Failed to create HTTP client: {e}")))?;
        let base_url = config.base_url()?;
        let token_cache = Arc::new(TokenCache::new(config, http_client.clone()));
        Ok(Self {
            http_client,
            token_cache,
            base_url,
        })
    }

    /// Absolute URL for a path relative to the Graph base.
    pub fn url(&self, path: &str) -> GraphResult<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// The `@odata.id` reference for an object under the Graph base.
    pub fn reference(&self, path: &str) -> GraphResult<Value> {
        Ok(serde_json::json!({ "@odata.id": self.url(path)?.as_str() }))
    }

    #[instrument(skip(self))]
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> GraphResult<T> {
        let url = self.url(path)?;
        let body = self.execute(Method::GET, url, None, false).await?;
        Ok(serde_json::from_value(body.unwrap_or(Value::Null))?)
    }

    /// Fetches every page of a collection, following `@odata.nextLink`.
    #[instrument(skip(self, options))]
    pub async fn list<T: DeserializeOwned>(
        &self,
        path: &str,
        options: &ListOptions,
    ) -> GraphResult<Vec<T>> {
        let mut url = self.url(path)?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(filter) = &options.filter {
                pairs.append_pair("$filter", filter);
            }
            if let Some(select) = options.select {
                pairs.append_pair("$select", select);
            }
            if options.eventual {
                pairs.append_pair("$count", "true");
            }
        }

        let mut items = Vec::new();
        let mut next = Some(url);
        while let Some(page_url) = next.take() {
            let body = self
                .execute(Method::GET, page_url, None, options.eventual)
                .await?
                .unwrap_or(Value::Null);
            let page: ODataResponse<T> = serde_json::from_value(body)?;
            items.extend(page.value);
            next = page.next_link.as_deref().map(Url::parse).transpose()?;
        }
        Ok(items)
    }

    #[instrument(skip(self, body))]
    pub async fn post(&self, path: &str, body: &Value) -> GraphResult<Option<Value>> {
        let url = self.url(path)?;
        self.execute(Method::POST, url, Some(body), false).await
    }

    #[instrument(skip(self, body))]
    pub async fn put(&self, path: &str, body: &Value) -> GraphResult<Option<Value>> {
        let url = self.url(path)?;
        self.execute(Method::PUT, url, Some(body), false).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, path: &str) -> GraphResult<()> {
        let url = self.url(path)?;
        self.execute(Method::DELETE, url, None, false).await?;
        Ok(())
    }

    /// Sends one request. A 401 invalidates the cached token and the request
    /// is retried once with a fresh one. An empty success body yields `None`.
    async fn execute(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
        eventual: bool,
    ) -> GraphResult<Option<Value>> {
        let mut renewed = false;
        loop {
            let token = self.token_cache.get_token().await?;
            let mut request = self
                .http_client
                .request(method.clone(), url.clone())
                .bearer_auth(&token);
            if eventual {
                request = request.header("ConsistencyLevel", "eventual");
            }
            if let Some(b) = body {
                request = request.json(b);
            }

            let response = request.send().await?;
            let status = response.status();

            if status == StatusCode::UNAUTHORIZED && !renewed {
                warn!(%method, path = url.path(), "Graph rejected the access token, renewing");
                self.token_cache.invalidate().await;
                renewed = true;
                continue;
            }

            let text = response.text().await.unwrap_or_default();
            if status.is_success() {
                debug!(%method, path = url.path(), status = status.as_u16(), "Graph request succeeded");
                if text.trim().is_empty() {
                    return Ok(None);
                }
                return Ok(Some(serde_json::from_str(&text)?));
            }

            if status == StatusCode::NOT_FOUND {
                return Err(GraphError::NotFound(url.path().to_string()));
            }
            return Err(api_error(status, &text));
        }
    }
}

fn api_error(status: StatusCode, body: &str) -> GraphError {
    match serde_json::from_str::<ODataError>(body) {
        Ok(odata) => GraphError::GraphApi {
            status: status.as_u16(),
            code: odata.error.code,
            message: odata.error.message,
            inner_error: odata.error.inner_error.map(|v| v.to_string()),
        },
        Err(_) => GraphError::GraphApi {
            status: status.as_u16(),
            code: status.to_string(),
            message: body.to_string(),
            inner_error: None,
        },
    }
}
