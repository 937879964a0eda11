//! Request Coordinator (spec.md §4.10): orchestrates the Response Cache,
//! Upstream Client, Pagination Adapter, and PATCH Applier into the six
//! operations the HTTP layer dispatches to.

use std::sync::Arc;

use serde_json::Value;

use crate::cache::{CacheKey, ResponseCache};
use crate::context::{ListQuery, RequestContext};
use crate::error::{ProxyError, ProxyResult};
use crate::filter;
use crate::pagination::{self, PagedResult};
use crate::patch::{self, PatchOperation};
use crate::upstream::ResourceStore;

/// The raw material handed to the Pagination Adapter once fetching is
/// done: everything examined, and whether that set is the upstream's
/// entire collection (so `totalResults` can be reported as exact rather
/// than a lower bound).
#[derive(serde::Serialize, serde::Deserialize)]
struct FetchedSet {
    items: Vec<Value>,
    exhausted: bool,
}

/// The proxy's core: every HTTP handler calls exactly one method here.
pub struct RequestCoordinator {
    store: Arc<dyn ResourceStore>,
    cache: ResponseCache,
    max_filter_complexity: usize,
    filter_fetch_multiplier: usize,
    max_filter_fetch_size: usize,
}

impl RequestCoordinator {
    pub fn new(
        store: Arc<dyn ResourceStore>,
        cache: ResponseCache,
        max_filter_complexity: usize,
        filter_fetch_multiplier: usize,
        max_filter_fetch_size: usize,
    ) -> Self {
        Self {
            store,
            cache,
            max_filter_complexity,
            filter_fetch_multiplier,
            max_filter_fetch_size,
        }
    }

    /// `GET /Users`, `GET /Groups`.
    pub async fn list(
        &self,
        resource_type: &str,
        query: &ListQuery,
        ctx: &RequestContext,
    ) -> ProxyResult<PagedResult> {
        let key = CacheKey::new(resource_type, &list_cache_path(resource_type, query), &ctx.headers);
        let store = self.store.clone();
        let resource_type_owned = resource_type.to_string();
        let ctx_owned = ctx.clone();
        let query_owned = query.clone();
        let max_filter_complexity = self.max_filter_complexity;
        let filter_fetch_multiplier = self.filter_fetch_multiplier;
        let max_filter_fetch_size = self.max_filter_fetch_size;

        let cached = self
            .cache
            .get_or_fetch(key, async move {
                fetch_candidates(
                    &store,
                    &resource_type_owned,
                    &ctx_owned,
                    &query_owned,
                    max_filter_complexity,
                    filter_fetch_multiplier,
                    max_filter_fetch_size,
                )
                .await
                .and_then(|set| serde_json::to_value(set).map_err(|e| ProxyError::internal(e.to_string())))
            })
            .await
            .map_err(unwrap_cached_error)?;

        let fetched: FetchedSet =
            serde_json::from_value(cached).map_err(|e| ProxyError::internal(e.to_string()))?;

        log::debug!(
            "list {resource_type}: {} candidates examined, exhausted={}",
            fetched.items.len(),
            fetched.exhausted
        );

        pagination::apply_query(fetched.items, query, fetched.exhausted, self.max_filter_complexity)
    }

    /// `GET /{Resource}/{id}`.
    pub async fn get(&self, resource_type: &str, id: &str, ctx: &RequestContext) -> ProxyResult<Value> {
        let key = CacheKey::new(resource_type, &format!("/{resource_type}/{id}"), &ctx.headers);
        let store = self.store.clone();
        let resource_type_owned = resource_type.to_string();
        let id_owned = id.to_string();
        let ctx_owned = ctx.clone();

        self.cache
            .get_or_fetch(key, async move {
                store
                    .get(&resource_type_owned, &id_owned, &ctx_owned)
                    .await
                    .map_err(ProxyError::from)
            })
            .await
            .map_err(unwrap_cached_error)
    }

    /// `POST /{Resource}`.
    pub async fn create(&self, resource_type: &str, body: Value, ctx: &RequestContext) -> ProxyResult<Value> {
        let created = self.store.create(resource_type, body, ctx).await?;
        self.cache.invalidate_resource_type(resource_type);
        Ok(created)
    }

    /// `PUT /{Resource}/{id}`.
    pub async fn replace(
        &self,
        resource_type: &str,
        id: &str,
        body: Value,
        ctx: &RequestContext,
    ) -> ProxyResult<Value> {
        let replaced = self.store.replace(resource_type, id, body, ctx).await?;
        self.cache.invalidate_resource_type(resource_type);
        Ok(replaced)
    }

    /// `DELETE /{Resource}/{id}`.
    pub async fn delete(&self, resource_type: &str, id: &str, ctx: &RequestContext) -> ProxyResult<()> {
        self.store.delete(resource_type, id, ctx).await?;
        self.cache.invalidate_resource_type(resource_type);
        Ok(())
    }

    /// `PATCH /{Resource}/{id}`: attempts upstream-native PATCH first; falls
    /// back to read-modify-write only when upstream signals it has no
    /// PATCH support (a 501 or 405), never on other failures, since retrying
    /// a non-idempotent PATCH after an ambiguous failure could double-apply
    /// it (spec.md §9, resolved in SPEC_FULL.md §15).
    pub async fn patch(
        &self,
        resource_type: &str,
        id: &str,
        operations: &[PatchOperation],
        ctx: &RequestContext,
    ) -> ProxyResult<Value> {
        let patch_body = serde_json::json!({
            "schemas": ["urn:ietf:params:scim:api:messages:2.0:PatchOp"],
            "Operations": operations,
        });

        if let Some(result) = self
            .store
            .upstream_patch(resource_type, id, patch_body, ctx)
            .await?
        {
            self.cache.invalidate_resource_type(resource_type);
            return Ok(result);
        }

        let mut resource = self.store.get(resource_type, id, ctx).await?;
        patch::apply(&mut resource, operations)?;
        let replaced = self.store.replace(resource_type, id, resource, ctx).await?;
        self.cache.invalidate_resource_type(resource_type);
        Ok(replaced)
    }
}

/// Fetch-enough strategy (spec.md §4.7): forward `startIndex`/`count`
/// straight to upstream when there's nothing the proxy needs to compute
/// locally (no filter, no sort); otherwise page sequentially, accumulating
/// every record examined, until enough matches are collected, the fetch
/// bound is hit, or upstream reports exhaustion.
async fn fetch_candidates(
    store: &Arc<dyn ResourceStore>,
    resource_type: &str,
    ctx: &RequestContext,
    query: &ListQuery,
    max_filter_complexity: usize,
    filter_fetch_multiplier: usize,
    max_filter_fetch_size: usize,
) -> ProxyResult<FetchedSet> {
    if query.filter.is_none() && query.sort_by.is_none() {
        log::debug!("{resource_type} list: no filter or sort, forwarding startIndex/count to upstream");
        let count = if query.count == 0 { max_filter_fetch_size } else { query.count };
        let page = store.list(resource_type, ctx, query.start_index, count).await?;
        let next_start = query.start_index + page.items.len();
        let exhausted = page_is_exhausted(page.items.len(), count, page.total_results, next_start);
        return Ok(FetchedSet { items: page.items, exhausted });
    }

    let filter_node = query
        .filter
        .as_deref()
        .map(|expr| filter::parse(expr, max_filter_complexity))
        .transpose()?;

    log::debug!("{resource_type} list: filter or sort present, paging sequentially until enough matches or exhaustion");
    let fetch_bound = pagination::fetch_size(query.count, filter_fetch_multiplier, max_filter_fetch_size);
    let target_matches = if query.count == 0 {
        usize::MAX
    } else {
        query.start_index.saturating_sub(1) + query.count
    };

    let mut items = Vec::new();
    let mut matches_found = 0usize;
    let mut fetched_total = 0usize;
    let mut next_start = 1usize;
    let mut exhausted = false;

    while fetched_total < fetch_bound {
        let page_request = fetch_bound - fetched_total;
        let page = store.list(resource_type, ctx, next_start, page_request).await?;
        let page_len = page.items.len();
        fetched_total += page_len;
        next_start += page_len;

        for item in &page.items {
            let is_match = filter_node.as_ref().map(|node| filter::evaluate(node, item)).unwrap_or(true);
            if is_match {
                matches_found += 1;
            }
        }
        log::trace!(
            "{resource_type} page fetch: {page_len} records, {matches_found} matches so far"
        );
        items.extend(page.items);

        if page_is_exhausted(page_len, page_request, page.total_results, next_start) {
            exhausted = true;
            break;
        }
        if matches_found >= target_matches {
            break;
        }
    }

    if !exhausted && matches_found < target_matches {
        log::warn!(
            "{resource_type} list request exhausted MAX_FILTER_FETCH_SIZE ({fetch_bound}) before collecting its full window; totalResults will be a lower bound"
        );
    } else if !exhausted {
        log::debug!("{resource_type} list request found its window's worth of matches before upstream exhaustion; totalResults will be a lower bound");
    }

    Ok(FetchedSet { items, exhausted })
}

/// A page is exhausted when upstream reports a `totalResults` and the range
/// fetched so far already covers it, or, absent that figure (a plain JSON
/// array response), when upstream returned fewer records than requested —
/// the only signal available that nothing is left to page through. The
/// `totalResults` check takes priority: an upstream enforcing its own page
/// size cap below what was requested returns a "short" page on every call
/// long before its collection is actually exhausted, so the short-page
/// heuristic alone would stop the loop far too early whenever a reliable
/// total is available.
fn page_is_exhausted(page_len: usize, requested: usize, total_results: Option<usize>, next_start: usize) -> bool {
    match total_results {
        Some(total) => next_start > total,
        None => page_len < requested,
    }
}

fn unwrap_cached_error(error: Arc<ProxyError>) -> ProxyError {
    match Arc::try_unwrap(error) {
        Ok(owned) => owned,
        Err(shared) => ProxyError::internal(shared.to_string()),
    }
}

fn list_cache_path(resource_type: &str, query: &ListQuery) -> String {
    let mut parts = vec![format!("/{resource_type}")];
    if let Some(filter) = &query.filter {
        parts.push(format!("filter={filter}"));
    }
    if let Some(sort_by) = &query.sort_by {
        parts.push(format!("sortBy={sort_by}"));
    }
    parts.push(format!("startIndex={}", query.start_index));
    parts.push(format!("count={}", query.count));
    if !query.attributes.is_empty() {
        let mut attrs = query.attributes.clone();
        attrs.sort();
        parts.push(format!("attributes={}", attrs.join(",")));
    }
    if !query.excluded_attributes.is_empty() {
        let mut attrs = query.excluded_attributes.clone();
        attrs.sort();
        parts.push(format!("excludedAttributes={}", attrs.join(",")));
    }
    parts.join("&")
}
