//! End-to-end HTTP behavior of the SCIM surface: filter, PATCH, and
//! pagination scenarios driven through the real router via
//! `tower::ServiceExt::oneshot`, against an in-memory upstream.

use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::common::{FakeStore, app, body_json, delete_req, get_req, json_req};

#[tokio::test]
async fn filter_equality_is_case_insensitive() {
    let store = FakeStore::new().seed(
        "Users",
        vec![
            json!({"id": "1", "userName": "Alice"}),
            json!({"id": "2", "userName": "bob"}),
        ],
    );
    let response = app(store)
        .oneshot(get_req("/Users?filter=userName+eq+%22alice%22"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["totalResults"], 1);
    assert_eq!(body["Resources"][0]["id"], "1");
}

#[tokio::test]
async fn complex_predicate_with_sub_attribute_matches() {
    let store = FakeStore::new().seed(
        "Users",
        vec![json!({
            "id": "1",
            "emails": [
                {"type": "work", "primary": true, "value": "a@corp.io"},
                {"type": "home", "primary": false, "value": "a@home.io"},
            ],
        })],
    );
    let filter = r#"emails[type eq "work" and primary eq true].value co "@corp""#;
    let uri = format!("/Users?filter={}", urlencoding_lite(filter));
    let response = app(store).oneshot(get_req(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["totalResults"], 1);
}

#[tokio::test]
async fn malformed_filter_returns_invalid_filter_envelope() {
    let store = FakeStore::new().seed("Users", vec![json!({"id": "1"})]);
    let response = app(store)
        .oneshot(get_req("/Users?filter=userName+eq"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(
        body["schemas"][0],
        "urn:ietf:params:scim:api:messages:2.0:Error"
    );
    assert_eq!(body["scimType"], "invalidFilter");
}

#[tokio::test]
async fn patch_replace_is_idempotent() {
    let store = FakeStore::new().seed("Users", vec![json!({"id": "x", "active": true})]);
    let app = app(store);

    let operations = json!({
        "Operations": [{"op": "replace", "path": "active", "value": false}],
    });
    let response = app
        .clone()
        .oneshot(json_req(Method::PATCH, "/Users/x", operations.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["active"], false);

    let response = app
        .oneshot(json_req(Method::PATCH, "/Users/x", operations))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["active"], false);
}

#[tokio::test]
async fn patch_add_appends_to_multi_valued_attribute() {
    let store = FakeStore::new().seed("Groups", vec![json!({"id": "g", "members": [{"value": "u0"}]})]);
    let operations = json!({
        "Operations": [{"op": "add", "path": "members", "value": [{"value": "u1"}]}],
    });
    let response = app(store)
        .oneshot(json_req(Method::PATCH, "/Groups/g", operations))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let members = body["members"].as_array().unwrap();
    assert_eq!(members.len(), 2);
    assert!(members.iter().any(|m| m["value"] == "u0"));
    assert!(members.iter().any(|m| m["value"] == "u1"));
}

#[tokio::test]
async fn create_get_replace_delete_round_trip() {
    let store = FakeStore::new();
    let app = app(store);

    let created = json!({"id": "1", "userName": "carol"});
    let response = app
        .clone()
        .oneshot(json_req(Method::POST, "/Users", created.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app.clone().oneshot(get_req("/Users/1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["userName"], "carol");

    let replaced = json!({"id": "1", "userName": "carol2"});
    let response = app
        .clone()
        .oneshot(json_req(Method::PUT, "/Users/1", replaced))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(delete_req("/Users/1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.oneshot(get_req("/Users/1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn discovery_documents_are_served_bare_and_under_v2() {
    let store = FakeStore::new();
    let app = app(store);
    let response = app.clone().oneshot(get_req("/ServiceProviderConfig")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get_req("/v2/ServiceProviderConfig")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn health_check_returns_ok() {
    let app = app(FakeStore::new());
    let response = app.oneshot(get_req("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

/// Minimal percent-encoding for the handful of characters filter
/// expressions need in a query string; avoids pulling in a URL-encoding
/// dependency for test-only use.
fn urlencoding_lite(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            ' ' => "+".to_string(),
            '"' => "%22".to_string(),
            '@' => "%40".to_string(),
            '[' => "%5B".to_string(),
            ']' => "%5D".to_string(),
            other => other.to_string(),
        })
        .collect()
}
