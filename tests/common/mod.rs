//! Shared test scaffolding: an in-memory `ResourceStore` fake and small HTTP
//! request builders, so integration tests exercise the real router without
//! a live upstream.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, Response};
use scim_upgrade_proxy::cache::ResponseCache;
use scim_upgrade_proxy::context::RequestContext;
use scim_upgrade_proxy::coordinator::RequestCoordinator;
use scim_upgrade_proxy::error::{UpstreamError, UpstreamResult};
use scim_upgrade_proxy::upstream::ResourceStore;
use serde_json::Value;
use std::time::Duration;

/// The page size this fake enforces regardless of the requested `count`,
/// mirroring a real upstream's own server-side page size cap.
const MAX_PAGE_SIZE: usize = 100;

/// An in-memory upstream, keyed by resource type, standing in for the
/// legacy CRUD-only SCIM service.
pub struct FakeStore {
    resources: Mutex<HashMap<String, Vec<Value>>>,
    pub supports_patch: bool,
}

impl FakeStore {
    pub fn new() -> Self {
        Self {
            resources: Mutex::new(HashMap::new()),
            supports_patch: false,
        }
    }

    pub fn seed(self, resource_type: &str, resources: Vec<Value>) -> Self {
        self.resources
            .lock()
            .unwrap()
            .insert(resource_type.to_string(), resources);
        self
    }
}

#[async_trait]
impl ResourceStore for FakeStore {
    async fn get(&self, resource_type: &str, id: &str, _ctx: &RequestContext) -> UpstreamResult<Value> {
        self.resources
            .lock()
            .unwrap()
            .get(resource_type)
            .into_iter()
            .flatten()
            .find(|r| r["id"] == Value::String(id.to_string()))
            .cloned()
            .ok_or_else(|| UpstreamError::Status {
                status: 404,
                body: serde_json::json!({
                    "schemas": ["urn:ietf:params:scim:api:messages:2.0:Error"],
                    "status": "404",
                    "detail": format!("{resource_type} {id} not found"),
                }),
            })
    }

    /// Caps every page at [`MAX_PAGE_SIZE`] regardless of the requested
    /// `count`, the way a real upstream enforces its own server-side page
    /// size limit, so tests exercise the sequential fetch-enough loop
    /// rather than a single round trip.
    async fn list(
        &self,
        resource_type: &str,
        _ctx: &RequestContext,
        start_index: usize,
        count: usize,
    ) -> UpstreamResult<scim_upgrade_proxy::upstream::UpstreamPage> {
        let all = self
            .resources
            .lock()
            .unwrap()
            .get(resource_type)
            .cloned()
            .unwrap_or_default();
        let total = all.len();
        let start = start_index.saturating_sub(1).min(total);
        let page_size = count.min(MAX_PAGE_SIZE);
        let end = (start + page_size).min(total);
        Ok(scim_upgrade_proxy::upstream::UpstreamPage {
            items: all[start..end].to_vec(),
            total_results: Some(total),
        })
    }

    async fn create(&self, resource_type: &str, body: Value, _ctx: &RequestContext) -> UpstreamResult<Value> {
        self.resources
            .lock()
            .unwrap()
            .entry(resource_type.to_string())
            .or_default()
            .push(body.clone());
        Ok(body)
    }

    async fn replace(
        &self,
        resource_type: &str,
        id: &str,
        body: Value,
        _ctx: &RequestContext,
    ) -> UpstreamResult<Value> {
        let mut store = self.resources.lock().unwrap();
        let list = store.entry(resource_type.to_string()).or_default();
        match list.iter_mut().find(|r| r["id"] == Value::String(id.to_string())) {
            Some(existing) => {
                *existing = body.clone();
                Ok(body)
            }
            None => Err(UpstreamError::Status {
                status: 404,
                body: serde_json::json!({"detail": "not found"}),
            }),
        }
    }

    async fn delete(&self, resource_type: &str, id: &str, _ctx: &RequestContext) -> UpstreamResult<()> {
        let mut store = self.resources.lock().unwrap();
        let list = store.entry(resource_type.to_string()).or_default();
        list.retain(|r| r["id"] != Value::String(id.to_string()));
        Ok(())
    }

    async fn upstream_patch(
        &self,
        _resource_type: &str,
        _id: &str,
        _body: Value,
        _ctx: &RequestContext,
    ) -> UpstreamResult<Option<Value>> {
        Ok(None)
    }
}

/// Build a router over a freshly seeded `FakeStore`.
pub fn app(store: FakeStore) -> Router {
    let coordinator = Arc::new(RequestCoordinator::new(
        Arc::new(store),
        ResponseCache::new(Duration::from_secs(30), 1000),
        50,
        20,
        2000,
    ));
    scim_upgrade_proxy::http::build(coordinator)
}

pub fn get_req(uri: &str) -> Request<Body> {
    Request::builder().method(Method::GET).uri(uri).body(Body::empty()).unwrap()
}

pub fn delete_req(uri: &str) -> Request<Body> {
    Request::builder().method(Method::DELETE).uri(uri).body(Body::empty()).unwrap()
}

pub fn json_req(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
