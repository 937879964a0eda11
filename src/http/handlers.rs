//! HTTP handlers: extract a request, call exactly one [`RequestCoordinator`]
//! method, and translate the result back into an HTTP response.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::context::{ListQuery, RequestContext, SortOrder};
use crate::coordinator::RequestCoordinator;
use crate::patch::PatchRequest;

use super::scim_error::{ScimError, ScimJson};

pub type AppState = Arc<RequestCoordinator>;

/// Query parameters accepted on `GET /{Resource}` (spec.md §6).
#[derive(Debug, Deserialize)]
pub struct ListParams {
    filter: Option<String>,
    #[serde(rename = "sortBy")]
    sort_by: Option<String>,
    #[serde(rename = "sortOrder")]
    sort_order: Option<String>,
    #[serde(rename = "startIndex")]
    start_index: Option<usize>,
    count: Option<usize>,
    attributes: Option<String>,
    #[serde(rename = "excludedAttributes")]
    excluded_attributes: Option<String>,
}

impl From<ListParams> for ListQuery {
    fn from(params: ListParams) -> Self {
        let mut query = ListQuery::new();
        if let Some(filter) = params.filter {
            query = query.with_filter(filter);
        }
        query.sort_by = params.sort_by;
        if let Some(order) = params.sort_order {
            query.sort_order = SortOrder::parse(&order);
        }
        if let Some(start_index) = params.start_index {
            query = query.with_start_index(start_index);
        }
        if let Some(count) = params.count {
            query = query.with_count(count);
        }
        query.attributes = split_csv(params.attributes);
        query.excluded_attributes = split_csv(params.excluded_attributes);
        query
    }
}

fn split_csv(value: Option<String>) -> Vec<String> {
    value
        .map(|v| v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}

fn list_response(resource_type: &str, result: crate::pagination::PagedResult) -> Value {
    json!({
        "schemas": ["urn:ietf:params:scim:api:messages:2.0:ListResponse"],
        "totalResults": result.total_results,
        "startIndex": result.start_index,
        "itemsPerPage": result.items_per_page,
        "Resources": result.resources,
        "resourceType": resource_type,
    })
}

pub async fn list(
    State(coordinator): State<AppState>,
    Path(resource_type): Path<String>,
    Query(params): Query<ListParams>,
    headers: HeaderMap,
) -> Result<ScimJson, ScimError> {
    let ctx = RequestContext::new(headers);
    let query: ListQuery = params.into();
    let result = coordinator.list(&resource_type, &query, &ctx).await?;
    Ok(ScimJson(list_response(&resource_type, result)))
}

pub async fn get(
    State(coordinator): State<AppState>,
    Path((resource_type, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<ScimJson, ScimError> {
    let ctx = RequestContext::new(headers);
    let resource = coordinator.get(&resource_type, &id, &ctx).await?;
    Ok(ScimJson(resource))
}

pub async fn create(
    State(coordinator): State<AppState>,
    Path(resource_type): Path<String>,
    headers: HeaderMap,
    axum::Json(body): axum::Json<Value>,
) -> Result<(axum::http::StatusCode, ScimJson), ScimError> {
    let ctx = RequestContext::new(headers);
    let created = coordinator.create(&resource_type, body, &ctx).await?;
    Ok((axum::http::StatusCode::CREATED, ScimJson(created)))
}

pub async fn replace(
    State(coordinator): State<AppState>,
    Path((resource_type, id)): Path<(String, String)>,
    headers: HeaderMap,
    axum::Json(body): axum::Json<Value>,
) -> Result<ScimJson, ScimError> {
    let ctx = RequestContext::new(headers);
    let replaced = coordinator.replace(&resource_type, &id, body, &ctx).await?;
    Ok(ScimJson(replaced))
}

pub async fn patch(
    State(coordinator): State<AppState>,
    Path((resource_type, id)): Path<(String, String)>,
    headers: HeaderMap,
    axum::Json(body): axum::Json<PatchRequest>,
) -> Result<ScimJson, ScimError> {
    let ctx = RequestContext::new(headers);
    let patched = coordinator
        .patch(&resource_type, &id, &body.operations, &ctx)
        .await?;
    Ok(ScimJson(patched))
}

pub async fn delete(
    State(coordinator): State<AppState>,
    Path((resource_type, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<axum::http::StatusCode, ScimError> {
    let ctx = RequestContext::new(headers);
    coordinator.delete(&resource_type, &id, &ctx).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}
