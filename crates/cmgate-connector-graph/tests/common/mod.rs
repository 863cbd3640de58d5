//! Shared fixtures for the Graph client tests.

#![allow(dead_code)]

use cmgate_connector_graph::{DirectoryPlaneClient, GraphConfig};
use secrecy::SecretString;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TENANT_ID: &str = "test-tenant";

/// Wraps items in an OData collection page.
pub fn create_odata_response(items: Vec<Value>, next_link: Option<&str>) -> Value {
    let mut response = json!({ "value": items });
    if let Some(link) = next_link {
        response["@odata.nextLink"] = json!(link);
    }
    response
}

pub fn create_odata_error(code: &str, message: &str) -> Value {
    json!({
        "error": {
            "code": code,
            "message": message,
            "innerError": { "request-id": "00000000-0000-0000-0000-000000000000" }
        }
    })
}

pub fn create_token_response(access_token: &str, expires_in: u64) -> Value {
    json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "expires_in": expires_in
    })
}

pub fn create_directory_object(id: &str) -> Value {
    json!({ "id": id })
}

pub fn create_managed_device(id: &str, name: &str, agent: &str, enrollment: &str) -> Value {
    json!({
        "id": id,
        "deviceName": name,
        "managementAgent": agent,
        "deviceEnrollmentType": enrollment
    })
}

pub fn create_test_user(id: &str, upn: &str) -> Value {
    json!({
        "id": id,
        "userPrincipalName": upn,
        "displayName": "Test User"
    })
}

/// Mock Graph plus token endpoint.
pub struct MockGraphServer {
    pub server: MockServer,
}

impl MockGraphServer {
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Versioned Graph base under the mock.
    pub fn graph_url(&self) -> String {
        format!("{}/beta/", self.url())
    }

    pub fn token_path() -> String {
        format!("/{TENANT_ID}/oauth2/v2.0/token")
    }

    pub async fn mock_token_endpoint(&self) {
        Mock::given(method("POST"))
            .and(path(Self::token_path()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(create_token_response("mock-access-token", 3600)),
            )
            .mount(&self.server)
            .await;
    }

    /// A client pointed at this server for both authority and Graph.
    pub fn directory(&self) -> DirectoryPlaneClient {
        let mut config = GraphConfig::new(
            TENANT_ID,
            "test-client",
            SecretString::from("test-secret".to_string()),
        );
        config.graph_url = self.graph_url();
        config.authority_url = self.url();
        config.timeout_secs = 5;
        DirectoryPlaneClient::new(config).unwrap()
    }
}
