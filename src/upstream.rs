//! Upstream Client (spec.md §4.9): talks to the legacy CRUD-only SCIM
//! service over a pooled HTTP connection, forwarding client headers
//! (minus hop-by-hop ones) so authentication stays transparent to the
//! proxy.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::HeaderMap;
use reqwest::Client;
use serde_json::Value;

use crate::context::RequestContext;
use crate::error::{UpstreamError, UpstreamResult};

/// Headers that are connection-scoped rather than end-to-end, and are
/// never forwarded upstream (RFC 7230 §6.1, plus `Host`, which must be
/// re-derived for the upstream's own address).
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

/// One page of a `list` call: the items returned, and the upstream's own
/// reported `totalResults` when its response carries one (a plain JSON
/// array has no such figure).
#[derive(Debug, Clone)]
pub struct UpstreamPage {
    pub items: Vec<Value>,
    pub total_results: Option<usize>,
}

/// Abstracts the legacy upstream so the Request Coordinator can be tested
/// against an in-memory fake instead of a live HTTP service.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn get(&self, resource_type: &str, id: &str, ctx: &RequestContext) -> UpstreamResult<Value>;

    /// Fetch one page starting at the 1-based `start_index`, at most
    /// `count` records. The upstream enforces its own maximum page size
    /// independently of `count`; callers loop on the returned page size,
    /// not on `count`, to detect exhaustion.
    async fn list(
        &self,
        resource_type: &str,
        ctx: &RequestContext,
        start_index: usize,
        count: usize,
    ) -> UpstreamResult<UpstreamPage>;

    async fn create(&self, resource_type: &str, body: Value, ctx: &RequestContext) -> UpstreamResult<Value>;

    async fn replace(
        &self,
        resource_type: &str,
        id: &str,
        body: Value,
        ctx: &RequestContext,
    ) -> UpstreamResult<Value>;

    async fn delete(&self, resource_type: &str, id: &str, ctx: &RequestContext) -> UpstreamResult<()>;

    /// Native PATCH support. Returns `Ok(None)` when the upstream has no
    /// PATCH endpoint and the Coordinator should fall back to
    /// read-modify-write; returns `Err` only for genuine transport/status
    /// failures that should abort the request.
    async fn upstream_patch(
        &self,
        resource_type: &str,
        id: &str,
        body: Value,
        ctx: &RequestContext,
    ) -> UpstreamResult<Option<Value>>;
}

/// A pooled `reqwest` client against the configured upstream base URL.
#[derive(Clone)]
pub struct UpstreamClient {
    client: Arc<Client>,
    base_url: String,
    supports_patch: bool,
}

impl UpstreamClient {
    /// Build a client with a per-request timeout. `supports_patch` should
    /// be probed once at startup (e.g. via an `OPTIONS` request or static
    /// configuration) and held for the process lifetime.
    pub fn new(base_url: impl Into<String>, timeout: Duration, supports_patch: bool) -> UpstreamResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(UpstreamError::from)?;
        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            supports_patch,
        })
    }

    fn url(&self, resource_type: &str, id: Option<&str>) -> String {
        match id {
            Some(id) => format!("{}/{}/{}", self.base_url, resource_type, id),
            None => format!("{}/{}", self.base_url, resource_type),
        }
    }

    fn forward_headers(ctx: &RequestContext) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in ctx.headers.iter() {
            if HOP_BY_HOP_HEADERS.contains(&name.as_str()) {
                continue;
            }
            headers.append(name.clone(), value.clone());
        }
        headers
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> UpstreamResult<reqwest::Response> {
        let response = request.send().await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status().as_u16();
            log::warn!("upstream returned non-2xx status {status}, passing through");
            let body = response
                .json::<Value>()
                .await
                .unwrap_or_else(|_| Value::Null);
            Err(UpstreamError::Status { status, body })
        }
    }

    async fn body_json(response: reqwest::Response) -> UpstreamResult<Value> {
        response.json::<Value>().await.map_err(UpstreamError::from)
    }
}

#[async_trait]
impl ResourceStore for UpstreamClient {
    async fn get(&self, resource_type: &str, id: &str, ctx: &RequestContext) -> UpstreamResult<Value> {
        let request = self
            .client
            .get(self.url(resource_type, Some(id)))
            .headers(Self::forward_headers(ctx));
        let response = self.send(request).await?;
        Self::body_json(response).await
    }

    async fn list(
        &self,
        resource_type: &str,
        ctx: &RequestContext,
        start_index: usize,
        count: usize,
    ) -> UpstreamResult<UpstreamPage> {
        let request = self
            .client
            .get(self.url(resource_type, None))
            .query(&[("startIndex", start_index.to_string()), ("count", count.to_string())])
            .headers(Self::forward_headers(ctx));
        let response = self.send(request).await?;
        let body = Self::body_json(response).await?;
        log::trace!("upstream page fetch {resource_type} startIndex={start_index} count={count}");
        match body {
            Value::Array(items) => Ok(UpstreamPage { items, total_results: None }),
            Value::Object(ref map) if map.contains_key("Resources") => {
                let items = map["Resources"].as_array().cloned().unwrap_or_default();
                let total_results = map
                    .get("totalResults")
                    .and_then(Value::as_u64)
                    .map(|n| n as usize);
                Ok(UpstreamPage { items, total_results })
            }
            other => Ok(UpstreamPage { items: vec![other], total_results: None }),
        }
    }

    async fn create(&self, resource_type: &str, body: Value, ctx: &RequestContext) -> UpstreamResult<Value> {
        let request = self
            .client
            .post(self.url(resource_type, None))
            .headers(Self::forward_headers(ctx))
            .json(&body);
        let response = self.send(request).await?;
        Self::body_json(response).await
    }

    async fn replace(
        &self,
        resource_type: &str,
        id: &str,
        body: Value,
        ctx: &RequestContext,
    ) -> UpstreamResult<Value> {
        let request = self
            .client
            .put(self.url(resource_type, Some(id)))
            .headers(Self::forward_headers(ctx))
            .json(&body);
        let response = self.send(request).await?;
        Self::body_json(response).await
    }

    async fn delete(&self, resource_type: &str, id: &str, ctx: &RequestContext) -> UpstreamResult<()> {
        let request = self
            .client
            .delete(self.url(resource_type, Some(id)))
            .headers(Self::forward_headers(ctx));
        self.send(request).await?;
        Ok(())
    }

    async fn upstream_patch(
        &self,
        resource_type: &str,
        id: &str,
        body: Value,
        ctx: &RequestContext,
    ) -> UpstreamResult<Option<Value>> {
        if !self.supports_patch {
            return Ok(None);
        }
        let request = self
            .client
            .patch(self.url(resource_type, Some(id)))
            .headers(Self::forward_headers(ctx))
            .json(&body);
        match self.send(request).await {
            Ok(response) => Ok(Some(Self::body_json(response).await?)),
            Err(UpstreamError::Status { status: 501, .. }) | Err(UpstreamError::Status { status: 405, .. }) => {
                Ok(None)
            }
            Err(other) => Err(other),
        }
    }
}
