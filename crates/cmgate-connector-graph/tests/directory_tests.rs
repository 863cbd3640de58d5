//! Directory-plane client tests against a mock Graph endpoint.

mod common;

use cmgate_core::CmgateError;
use common::*;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_group_lookup_returns_first_id() {
    let mock = MockGraphServer::new().await;
    mock.mock_token_endpoint().await;

    Mock::given(method("GET"))
        .and(path("/beta/groups"))
        .and(query_param("$filter", "displayName eq 'Autopilot Devices'"))
        .and(query_param("$select", "id"))
        .and(header("authorization", "Bearer mock-access-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(create_odata_response(
            vec![create_directory_object("group-1"), create_directory_object("group-2")],
            None,
        )))
        .mount(&mock.server)
        .await;

    let id = mock
        .directory()
        .get_group_id_by_name("Autopilot Devices")
        .await
        .unwrap();
    assert_eq!(id.as_deref(), Some("group-1"));
}

#[tokio::test]
async fn test_lookup_without_match_is_none() {
    let mock = MockGraphServer::new().await;
    mock.mock_token_endpoint().await;

    Mock::given(method("GET"))
        .and(path("/beta/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(create_odata_response(vec![], None)))
        .mount(&mock.server)
        .await;

    let id = mock.directory().get_entra_device_id_by_name("GHOST").await.unwrap();
    assert_eq!(id, None);
}

#[tokio::test]
async fn test_filter_literals_are_escaped() {
    let mock = MockGraphServer::new().await;
    mock.mock_token_endpoint().await;

    Mock::given(method("GET"))
        .and(path("/beta/users"))
        .and(query_param("$filter", "(userPrincipalName eq 'o''brien@contoso.com')"))
        .respond_with(ResponseTemplate::new(200).set_body_json(create_odata_response(
            vec![create_directory_object("user-1")],
            None,
        )))
        .mount(&mock.server)
        .await;

    let id = mock
        .directory()
        .get_user_id_by_upn("o'brien@contoso.com")
        .await
        .unwrap();
    assert_eq!(id.as_deref(), Some("user-1"));
}

#[tokio::test]
async fn test_sam_account_lookup_uses_eventual_consistency() {
    let mock = MockGraphServer::new().await;
    mock.mock_token_endpoint().await;

    Mock::given(method("GET"))
        .and(path("/beta/users"))
        .and(query_param("$filter", "onPremisesSamAccountName eq 'jdoe'"))
        .and(query_param("$count", "true"))
        .and(header("ConsistencyLevel", "eventual"))
        .respond_with(ResponseTemplate::new(200).set_body_json(create_odata_response(
            vec![create_directory_object("user-7")],
            None,
        )))
        .expect(1)
        .mount(&mock.server)
        .await;

    let id = mock
        .directory()
        .get_user_id_by_sam_account_name("jdoe")
        .await
        .unwrap();
    assert_eq!(id.as_deref(), Some("user-7"));
}

#[tokio::test]
async fn test_group_membership_follows_next_link() {
    let mock = MockGraphServer::new().await;
    mock.mock_token_endpoint().await;

    let next = format!("{}/beta/groups/group-1/members?$skiptoken=page2", mock.url());
    Mock::given(method("GET"))
        .and(path("/beta/groups/group-1/members"))
        .and(query_param("$skiptoken", "page2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(create_odata_response(
            vec![create_directory_object("device-9")],
            None,
        )))
        .mount(&mock.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/beta/groups/group-1/members"))
        .and(query_param("$select", "id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(create_odata_response(
            vec![create_directory_object("device-1")],
            Some(&next),
        )))
        .mount(&mock.server)
        .await;

    let directory = mock.directory();
    assert!(directory.is_device_member_of_group("device-9", "group-1").await.unwrap());
    assert!(!directory.is_device_member_of_group("device-5", "group-1").await.unwrap());
}

#[tokio::test]
async fn test_add_device_posts_reference_and_accepts_empty_body() {
    let mock = MockGraphServer::new().await;
    mock.mock_token_endpoint().await;

    Mock::given(method("POST"))
        .and(path("/beta/groups/group-1/members/$ref"))
        .and(body_json(json!({
            "@odata.id": format!("{}directoryObjects/device-1", mock.graph_url())
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock.server)
        .await;

    assert!(mock.directory().add_device_to_group("device-1", "group-1").await.unwrap());
}

#[tokio::test]
async fn test_add_existing_member_is_an_error() {
    let mock = MockGraphServer::new().await;
    mock.mock_token_endpoint().await;

    Mock::given(method("POST"))
        .and(path("/beta/groups/group-1/members/$ref"))
        .respond_with(ResponseTemplate::new(400).set_body_json(create_odata_error(
            "Request_BadRequest",
            "One or more added object references already exist for the following modified properties: 'members'.",
        )))
        .mount(&mock.server)
        .await;

    let err = mock
        .directory()
        .add_user_to_group("user-1", "group-1")
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "operation_failed");
    assert!(err.to_string().contains("already exist"));
}

#[tokio::test]
async fn test_add_with_response_body_is_not_a_change() {
    let mock = MockGraphServer::new().await;
    mock.mock_token_endpoint().await;

    Mock::given(method("POST"))
        .and(path("/beta/groups/group-1/members/$ref"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "user-1" })))
        .mount(&mock.server)
        .await;

    assert!(!mock.directory().add_user_to_group("user-1", "group-1").await.unwrap());
}

#[tokio::test]
async fn test_remove_absent_member_returns_false() {
    let mock = MockGraphServer::new().await;
    mock.mock_token_endpoint().await;

    Mock::given(method("DELETE"))
        .and(path("/beta/groups/group-1/members/device-1/$ref"))
        .respond_with(ResponseTemplate::new(404).set_body_json(create_odata_error(
            "Request_ResourceNotFound",
            "Resource 'device-1' does not exist",
        )))
        .mount(&mock.server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/beta/groups/group-1/members/device-2/$ref"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock.server)
        .await;

    let directory = mock.directory();
    assert!(!directory.remove_device_from_group("device-1", "group-1").await.unwrap());
    assert!(directory.remove_device_from_group("device-2", "group-1").await.unwrap());
}

#[tokio::test]
async fn test_unauthorized_renews_token_and_retries_once() {
    let mock = MockGraphServer::new().await;

    Mock::given(method("POST"))
        .and(path(MockGraphServer::token_path()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(create_token_response("mock-access-token", 3600)),
        )
        .expect(2)
        .mount(&mock.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/beta/groups"))
        .respond_with(ResponseTemplate::new(401).set_body_json(create_odata_error(
            "InvalidAuthenticationToken",
            "Access token has expired or is not yet valid.",
        )))
        .up_to_n_times(1)
        .mount(&mock.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/beta/groups"))
        .respond_with(ResponseTemplate::new(200).set_body_json(create_odata_response(
            vec![create_directory_object("group-1")],
            None,
        )))
        .mount(&mock.server)
        .await;

    let id = mock.directory().get_group_id_by_name("Pilot").await.unwrap();
    assert_eq!(id.as_deref(), Some("group-1"));
}

#[tokio::test]
async fn test_second_unauthorized_is_an_error() {
    let mock = MockGraphServer::new().await;
    mock.mock_token_endpoint().await;

    Mock::given(method("GET"))
        .and(path("/beta/groups"))
        .respond_with(ResponseTemplate::new(401).set_body_json(create_odata_error(
            "Authorization_RequestDenied",
            "Insufficient privileges to complete the operation.",
        )))
        .expect(2)
        .mount(&mock.server)
        .await;

    let err = mock.directory().get_group_id_by_name("Pilot").await.unwrap_err();
    assert!(matches!(err, CmgateError::OperationFailed { .. }));
}

#[tokio::test]
async fn test_token_failure_is_unavailable() {
    let mock = MockGraphServer::new().await;

    Mock::given(method("POST"))
        .and(path(MockGraphServer::token_path()))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_client",
            "error_description": "AADSTS7000215: Invalid client secret provided."
        })))
        .mount(&mock.server)
        .await;

    let err = mock.directory().get_group_id_by_name("Pilot").await.unwrap_err();
    assert_eq!(err.error_code(), "unavailable");
}

#[tokio::test]
async fn test_intune_device_and_co_management() {
    let mock = MockGraphServer::new().await;
    mock.mock_token_endpoint().await;

    Mock::given(method("GET"))
        .and(path("/beta/deviceManagement/managedDevices"))
        .and(query_param("$filter", "(deviceName eq 'PC01')"))
        .respond_with(ResponseTemplate::new(200).set_body_json(create_odata_response(
            vec![create_managed_device("md-1", "PC01", "mdm", "windowsAzureADJoin")],
            None,
        )))
        .mount(&mock.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/beta/deviceManagement/managedDevices/md-1"))
        .and(query_param("$select", "id,managementAgent,deviceEnrollmentType"))
        .respond_with(ResponseTemplate::new(200).set_body_json(create_managed_device(
            "md-1",
            "PC01",
            "configurationManagerClientMdm",
            "windowsAzureADJoin",
        )))
        .mount(&mock.server)
        .await;

    let directory = mock.directory();
    let id = directory.get_intune_device_id_by_name("PC01").await.unwrap().unwrap();
    assert_eq!(id, "md-1");
    assert!(directory.is_device_co_managed(&id).await.unwrap());
}

#[tokio::test]
async fn test_primary_user_is_first_upn() {
    let mock = MockGraphServer::new().await;
    mock.mock_token_endpoint().await;

    Mock::given(method("GET"))
        .and(path("/beta/deviceManagement/managedDevices/md-1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(create_odata_response(
            vec![
                create_test_user("user-1", "jdoe@contoso.com"),
                create_test_user("user-2", "asmith@contoso.com"),
            ],
            None,
        )))
        .mount(&mock.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/beta/deviceManagement/managedDevices('md-1')/users/$ref"))
        .and(body_json(json!({
            "@odata.id": format!("{}users/user-2", mock.graph_url())
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock.server)
        .await;

    let directory = mock.directory();
    assert_eq!(
        directory.get_primary_user("md-1").await.unwrap().as_deref(),
        Some("jdoe@contoso.com")
    );
    directory.set_primary_user("md-1", "user-2").await.unwrap();
}

#[tokio::test]
async fn test_device_category_matches_case_insensitively() {
    let mock = MockGraphServer::new().await;
    mock.mock_token_endpoint().await;

    Mock::given(method("GET"))
        .and(path("/beta/deviceManagement/deviceCategories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(create_odata_response(
            vec![
                json!({"id": "cat-1", "displayName": "Kiosk"}),
                json!({"id": "cat-2", "displayName": "Shared Devices"}),
            ],
            None,
        )))
        .mount(&mock.server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/beta/deviceManagement/managedDevices/md-1/deviceCategory/$ref"))
        .and(body_json(json!({
            "@odata.id": format!("{}deviceManagement/deviceCategories/cat-2", mock.graph_url())
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock.server)
        .await;

    let directory = mock.directory();
    directory.set_device_category("md-1", "shared devices").await.unwrap();

    let err = directory.set_device_category("md-1", "Lab").await.unwrap_err();
    assert!(matches!(err, CmgateError::OperationFailed { .. }));
}
