//! Static SCIM discovery documents (spec.md §4.10, §6): `ServiceProviderConfig`
//! and `ResourceTypes` advertise the filter, PATCH, and pagination support
//! this proxy adds on top of the upstream.

use axum::Json;
use serde_json::{Value, json};

pub async fn service_provider_config() -> Json<Value> {
    Json(json!({
        "schemas": ["urn:ietf:params:scim:schemas:core:2.0:ServiceProviderConfig"],
        "patch": { "supported": true },
        "bulk": { "supported": false, "maxOperations": 0, "maxPayloadSize": 0 },
        "filter": { "supported": true, "maxResults": 2000 },
        "changePassword": { "supported": false },
        "sort": { "supported": true },
        "etag": { "supported": false },
        "authenticationSchemes": [],
    }))
}

pub async fn resource_types() -> Json<Value> {
    Json(json!([
        resource_type_document("User", "/Users"),
        resource_type_document("Group", "/Groups"),
    ]))
}

pub async fn user_resource_type() -> Json<Value> {
    Json(resource_type_document("User", "/Users"))
}

pub async fn group_resource_type() -> Json<Value> {
    Json(resource_type_document("Group", "/Groups"))
}

fn resource_type_document(name: &str, endpoint: &str) -> Value {
    json!({
        "schemas": ["urn:ietf:params:scim:schemas:core:2.0:ResourceType"],
        "id": name,
        "name": name,
        "endpoint": endpoint,
        "schema": format!("urn:ietf:params:scim:schemas:core:2.0:{name}"),
    })
}

pub async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}
