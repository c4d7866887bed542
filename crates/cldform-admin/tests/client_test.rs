//! AdminClient against a local mock server

use cldform_admin::{AdminApi, AdminClient, AdminError, Credentials};
use serde_json::json;
use wiremock::matchers::{basic_auth, body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn client_for(server: &MockServer) -> AdminClient {
    AdminClient::new(Credentials::new("demo", "key", "secret"))
        .unwrap()
        .with_api_base(format!("{}/v1_1", server.uri()))
}

#[tokio::test]
async fn test_get_upload_mapping() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1_1/demo/upload_mappings"))
        .and(query_param("folder", "example"))
        .and(basic_auth("key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "folder": "example",
            "template": "https://example.com/images/"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let mapping = client.get_upload_mapping("example").await.unwrap();
    assert_eq!(mapping.folder, "example");
    assert_eq!(mapping.template, "https://example.com/images/");
}

#[tokio::test]
async fn test_create_upload_mapping_sends_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1_1/demo/upload_mappings"))
        .and(body_string_contains("folder=example"))
        .and(body_string_contains("template=https%3A%2F%2Fexample.com%2Fimages%2F"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "created"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let mapping = client
        .create_upload_mapping("example", "https://example.com/images/")
        .await
        .unwrap();
    assert_eq!(mapping.template, "https://example.com/images/");
}

#[tokio::test]
async fn test_update_upload_mapping() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1_1/demo/upload_mappings"))
        .and(body_string_contains("template=https%3A%2F%2Fexample.org%2Fimages%2F"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "updated"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let mapping = client
        .update_upload_mapping("example", "https://example.org/images/")
        .await
        .unwrap();
    assert_eq!(mapping.template, "https://example.org/images/");
}

#[tokio::test]
async fn test_delete_upload_mapping() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/v1_1/demo/upload_mappings"))
        .and(query_param("folder", "example"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "deleted"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    client.delete_upload_mapping("example").await.unwrap();
}

#[tokio::test]
async fn test_embedded_error_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1_1/demo/upload_mappings"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"message": "Folder missing not found"}
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.get_upload_mapping("missing").await.unwrap_err();
    assert_eq!(err, AdminError::Api("Folder missing not found".to_string()));
}

#[tokio::test]
async fn test_usage() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1_1/demo/usage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "plan": "Free",
            "last_updated": "2022-03-14",
            "bandwidth": {"limit": 1000, "usage": 10, "used_percent": 1.0},
            "requests": 42
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let usage = client.usage().await.unwrap();
    assert_eq!(usage.plan, "Free");
    assert_eq!(usage.bandwidth.limit, 1000);
    assert_eq!(usage.bandwidth.usage, 10);
    assert_eq!(usage.requests, 42);
    assert_eq!(usage.objects.limit, 0);
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let client = AdminClient::new(Credentials::new("demo", "key", "secret"))
        .unwrap()
        .with_api_base(format!("{}/v1_1", uri));
    let err = client.usage().await.unwrap_err();
    assert!(err.is_transport());
}
