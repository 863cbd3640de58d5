//! AdminService REST provider.
//!
//! The site's AdminService exposes the SMS provider's WMI classes as an OData
//! endpoint under `https://<site server>/AdminService/wmi/`. Queries become
//! `$filter`/`$select` requests, static methods are POSTs to
//! `<Class>.<Method>`, and instance methods are POSTs to
//! `<Class>('<key>')/AdminService.<Method>`.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::error::{ProviderError, ProviderResult};
use crate::object::{InstancePath, PlaneObject};
use crate::provider::ManagementProvider;
use crate::query::WqlQuery;

/// Connection settings for [`AdminServiceProvider`].
#[derive(Clone)]
pub struct AdminServiceConfig {
    /// FQDN of the site server hosting the SMS provider.
    pub site_server: String,
    /// Account used for basic authentication. When unset the request goes out
    /// without credentials and relies on a fronting proxy.
    pub username: Option<String>,
    pub password: Option<SecretString>,
    /// Site servers commonly present internal-CA certificates.
    pub accept_invalid_certs: bool,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for AdminServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminServiceConfig")
            .field("site_server", &self.site_server)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// OData collection envelope.
#[derive(Debug, Deserialize)]
struct ODataRows {
    #[serde(default)]
    value: Vec<PlaneObject>,
}

/// [`ManagementProvider`] over the AdminService REST API.
///
/// Holds a blocking HTTP client: construct and drop it off the async runtime
/// (for example inside `spawn_blocking`).
pub struct AdminServiceProvider {
    config: AdminServiceConfig,
    base_url: Url,
    client: Client,
}

impl std::fmt::Debug for AdminServiceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminServiceProvider")
            .field("base_url", &self.base_url.as_str())
            .field("config", &self.config)
            .finish()
    }
}

impl AdminServiceProvider {
    /// Builds the HTTP client. No request is made until the first call.
    pub fn connect(config: AdminServiceConfig) -> ProviderResult<Self> {
        if config.site_server.trim().is_empty() {
            return Err(ProviderError::Unreachable(
                "site server is not configured".to_string(),
            ));
        }
        let base_url = Url::parse(&format!(
            "https://{}/AdminService/wmi/",
            config.site_server.trim()
        ))?;

        let mut builder = Client::builder().timeout(Duration::from_secs(config.timeout_secs));
        if config.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let client = builder.build()?;

        debug!(base_url = %base_url, "AdminService provider ready");
        Ok(Self {
            config,
            base_url,
            client,
        })
    }

    fn url(&self, path: &str) -> ProviderResult<Url> {
        Ok(self.base_url.join(path)?)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.username {
            Some(username) => request.basic_auth(
                username,
                self.config
                    .password
                    .as_ref()
                    .map(|p| p.expose_secret().to_string()),
            ),
            None => request,
        }
    }

    fn send(&self, request: RequestBuilder, class: &str, method: &str) -> ProviderResult<Response> {
        let response = self.authorize(request).send()?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(map_error_response(status, &body, class, method))
    }
}

/// Pulls the OData error message out of a response body, if there is one.
fn odata_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| {
            json.pointer("/error/message")
                .and_then(Value::as_str)
                .map(ToString::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

fn map_error_response(status: StatusCode, body: &str, class: &str, method: &str) -> ProviderError {
    let message = odata_message(body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ProviderError::Unreachable(format!("credentials rejected ({status})"))
        }
        StatusCode::NOT_FOUND => ProviderError::InstanceNotFound(message),
        StatusCode::CONFLICT => ProviderError::AlreadyExists(message),
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            ProviderError::Unreachable(message)
        }
        _ if message.to_lowercase().contains("already exists") => {
            ProviderError::AlreadyExists(message)
        }
        StatusCode::BAD_REQUEST if method.is_empty() => ProviderError::InvalidQuery(message),
        _ => ProviderError::MethodFailed {
            class: class.to_string(),
            method: if method.is_empty() { status.to_string() } else { method.to_string() },
            message,
        },
    }
}

/// Method calls answer with the out-parameters object; some builds wrap it
/// in a single-element `value` array.
fn out_params(response: Response) -> ProviderResult<PlaneObject> {
    let text = response.text()?;
    if text.trim().is_empty() {
        return Ok(PlaneObject::new());
    }
    let body: Value = serde_json::from_str(&text)?;
    match body {
        Value::Object(mut map) => match map.remove("value") {
            Some(Value::Array(mut items)) if items.len() == 1 => {
                Ok(serde_json::from_value(items.remove(0))?)
            }
            Some(other) => {
                map.insert("value".to_string(), other);
                Ok(PlaneObject::from(map))
            }
            None => Ok(PlaneObject::from(map)),
        },
        _ => Ok(PlaneObject::new()),
    }
}

impl ManagementProvider for AdminServiceProvider {
    fn kind(&self) -> &'static str {
        "admin_service"
    }

    #[instrument(skip(self, query), fields(class = %query.class))]
    fn query(&self, query: &WqlQuery) -> ProviderResult<Vec<PlaneObject>> {
        let mut url = self.url(&query.class)?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(filter) = query.odata_filter() {
                pairs.append_pair("$filter", &filter);
            }
            if let Some(select) = query.odata_select() {
                pairs.append_pair("$select", &select);
            }
        }
        let response = self.send(self.client.get(url), &query.class, "")?;
        let rows: ODataRows = response.json()?;
        Ok(rows.value)
    }

    #[instrument(skip(self, params))]
    fn execute_method(
        &self,
        class: &str,
        method: &str,
        params: PlaneObject,
    ) -> ProviderResult<PlaneObject> {
        let url = self.url(&format!("{class}.{method}"))?;
        let response = self.send(self.client.post(url).json(&params), class, method)?;
        out_params(response)
    }

    #[instrument(skip(self, path, params), fields(path = %path))]
    fn execute_instance_method(
        &self,
        path: &InstancePath,
        method: &str,
        params: PlaneObject,
    ) -> ProviderResult<PlaneObject> {
        let url = self.url(&format!("{}/AdminService.{method}", path.odata_segment()))?;
        let response = self.send(self.client.post(url).json(&params), &path.class, method)?;
        out_params(response)
    }

    #[instrument(skip(self, properties))]
    fn put_instance(&self, class: &str, properties: PlaneObject) -> ProviderResult<PlaneObject> {
        let url = self.url(class)?;
        let response = self.send(self.client.post(url).json(&properties), class, "Put")?;
        out_params(response)
    }

    #[instrument(skip(self, path), fields(path = %path))]
    fn delete_instance(&self, path: &InstancePath) -> ProviderResult<()> {
        let url = self.url(&path.odata_segment())?;
        self.send(self.client.delete(url), &path.class, "Delete")?;
        Ok(())
    }
}

impl Drop for AdminServiceProvider {
    fn drop(&mut self) {
        debug!(site_server = %self.config.site_server, "AdminService provider released");
    }
}
