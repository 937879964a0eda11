//! Pagination adapter behavior against the real router: filtering,
//! windowing, and the `totalResults` lower-bound contract.

use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

use crate::common::{FakeStore, app, get_req};

fn five_hundred_users() -> Vec<serde_json::Value> {
    (0..500)
        .map(|i| json!({"id": i.to_string(), "userName": format!("user{i}"), "active": i % 5 < 2}))
        .collect()
}

#[tokio::test]
async fn filtered_window_returns_requested_page_with_lower_bound_total() {
    // 500 users, every cycle of 5 has 2 active -> 200 active total, but the
    // fetch-enough loop stops as soon as it has collected this window's 150
    // matches (well before scanning the whole 500-record collection), so
    // totalResults here is a lower bound rather than the exact 200.
    let store = FakeStore::new().seed("Users", five_hundred_users());
    let response = app(store)
        .oneshot(get_req("/Users?filter=active+eq+true&startIndex=101&count=50"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = crate::common::body_json(response).await;

    assert!(body["totalResults"].as_u64().unwrap() >= 150);
    assert_eq!(body["startIndex"], 101);
    assert_eq!(body["itemsPerPage"], 50);
    assert_eq!(body["Resources"].as_array().unwrap().len(), 50);
}

#[tokio::test]
async fn filtered_window_reports_exact_total_once_upstream_is_exhausted() {
    // Requesting the window that covers the very last active users forces
    // the loop to scan every page until upstream reports exhaustion, so
    // totalResults is exact rather than a lower bound.
    let store = FakeStore::new().seed("Users", five_hundred_users());
    let response = app(store)
        .oneshot(get_req("/Users?filter=active+eq+true&startIndex=151&count=50"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = crate::common::body_json(response).await;

    assert_eq!(body["totalResults"], 200);
    assert_eq!(body["startIndex"], 151);
    assert_eq!(body["itemsPerPage"], 50);
    assert_eq!(body["Resources"].as_array().unwrap().len(), 50);
}

#[tokio::test]
async fn unfiltered_list_defaults_to_full_first_page() {
    let store = FakeStore::new().seed(
        "Users",
        vec![json!({"id": "1"}), json!({"id": "2"}), json!({"id": "3"})],
    );
    let response = app(store).oneshot(get_req("/Users")).await.unwrap();
    let body = crate::common::body_json(response).await;
    assert_eq!(body["totalResults"], 3);
    assert_eq!(body["startIndex"], 1);
}

#[tokio::test]
async fn sort_by_orders_results_ascending_by_default() {
    let store = FakeStore::new().seed(
        "Users",
        vec![
            json!({"id": "1", "userName": "carol"}),
            json!({"id": "2", "userName": "alice"}),
            json!({"id": "3", "userName": "bob"}),
        ],
    );
    let response = app(store).oneshot(get_req("/Users?sortBy=userName")).await.unwrap();
    let body = crate::common::body_json(response).await;
    let names: Vec<_> = body["Resources"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["userName"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["alice", "bob", "carol"]);
}
