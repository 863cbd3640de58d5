//! Shared fixtures for the REST edge tests.

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use cmgate_api::{
    api_router, with_http_layers, ApiKeyStore, ApiState, Authenticator, Negotiator,
    TrustedHeaderNegotiator, API_KEY_HEADER,
};
use cmgate_connector_configmgr::{InMemoryProvider, ManagementPlaneClient};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const API_KEY: &str = "test-key-0001";
pub const CLIENT_NAME: &str = "osd-runner";
pub const SITE_CODE: &str = "PS1";
pub const DOMAIN: &str = "CONTOSO";
pub const IDENTITY_HEADER: &str = "x-remote-user";

pub struct TestApp {
    pub router: Router,
    pub site: Arc<InMemoryProvider>,
}

fn build(authenticator: Authenticator) -> TestApp {
    let site = Arc::new(InMemoryProvider::new(SITE_CODE));
    let plane = Arc::new(ManagementPlaneClient::new(site.clone()));
    let state = ApiState::new(plane, None, Some(DOMAIN.to_string()), authenticator);
    TestApp {
        router: with_http_layers(api_router(state)),
        site,
    }
}

fn api_keys() -> ApiKeyStore {
    ApiKeyStore::from_keys([(API_KEY.to_string(), CLIENT_NAME.to_string())])
}

fn windows() -> Arc<dyn Negotiator> {
    Arc::new(TrustedHeaderNegotiator::new(IDENTITY_HEADER).unwrap())
}

/// API key scheme only.
pub fn create_test_app() -> TestApp {
    build(Authenticator::new(Some(api_keys()), None))
}

/// API key and Windows schemes both enabled.
pub fn create_test_app_with_windows() -> TestApp {
    build(Authenticator::new(Some(api_keys()), Some(windows())))
}

/// No scheme enabled.
pub fn create_closed_app() -> TestApp {
    build(Authenticator::default())
}

pub fn request(method: Method, uri: &str, body: Option<Value>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(uri);
    match body {
        Some(_) => builder.header("content-type", "application/json"),
        None => builder,
    }
}

pub fn authed(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = request(method, uri, body.clone()).header(API_KEY_HEADER, API_KEY);
    into_request(builder, body)
}

pub fn into_request(builder: axum::http::request::Builder, body: Option<Value>) -> Request<Body> {
    let body = body.map_or_else(Body::empty, |v| Body::from(v.to_string()));
    builder.body(body).unwrap()
}

pub async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, body)
}
