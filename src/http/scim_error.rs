//! SCIM `Error` response envelope (RFC 7644 §3.12, spec.md §6).

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;

use crate::error::ProxyError;

const ERROR_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:Error";

#[derive(Debug, Serialize)]
struct ScimErrorBody {
    schemas: [&'static str; 1],
    status: String,
    #[serde(rename = "scimType", skip_serializing_if = "Option::is_none")]
    scim_type: Option<&'static str>,
    detail: String,
}

/// Wraps a [`ProxyError`] so axum can turn it directly into an HTTP
/// response: upstream errors pass their body through unchanged, every
/// other error becomes a SCIM `Error` envelope.
pub struct ScimError(pub ProxyError);

impl From<ProxyError> for ScimError {
    fn from(error: ProxyError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ScimError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if let Some(body) = self.0.upstream_body() {
            return (status, Json(body.clone())).into_response();
        }

        let body = ScimErrorBody {
            schemas: [ERROR_SCHEMA],
            status: status.as_u16().to_string(),
            scim_type: self.0.scim_type(),
            detail: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// A successful SCIM response body: plain JSON with the SCIM content type.
pub struct ScimJson(pub Value);

impl IntoResponse for ScimJson {
    fn into_response(self) -> Response {
        let mut response = Json(self.0).into_response();
        response.headers_mut().insert(
            axum::http::header::CONTENT_TYPE,
            "application/scim+json".parse().unwrap(),
        );
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_error_passes_body_through() {
        let error = ProxyError::Upstream(crate::error::UpstreamError::Status {
            status: 404,
            body: serde_json::json!({"detail": "not found"}),
        });
        let response = ScimError(error).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn filter_error_becomes_scim_envelope() {
        let error = ProxyError::Filter(crate::error::FilterError::invalid("bad token"));
        let response = ScimError(error).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
