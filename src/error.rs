//! Error types for the SCIM upgrade proxy.
//!
//! Each concern (filter parsing, PATCH application, upstream transport,
//! configuration) gets its own `thiserror` enum, mirroring the way a single
//! umbrella error type wraps narrower, purpose-built ones. `ProxyError` is
//! the type the Request Coordinator and HTTP router actually see; everything
//! else converts into it with `#[from]`.

use serde_json::Value;

/// Top-level error type for a single proxied request.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// A filter expression failed to parse or exceeded the complexity limit.
    #[error("filter error: {0}")]
    Filter(#[from] FilterError),

    /// A PATCH operation's path or semantics were rejected.
    #[error("patch error: {0}")]
    Patch(#[from] PatchError),

    /// The upstream SCIM service could not be reached, or reported failure.
    #[error("upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    /// An unexpected internal failure.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl ProxyError {
    /// Construct an [`ProxyError::Internal`] from any displayable cause.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// The SCIM `scimType` token for this error, per RFC 7644 §3.12.
    pub fn scim_type(&self) -> Option<&'static str> {
        match self {
            Self::Filter(FilterError::InvalidFilter { .. }) => Some("invalidFilter"),
            Self::Filter(FilterError::TooComplex { .. }) => Some("tooMany"),
            Self::Patch(PatchError::InvalidPath { .. }) => Some("invalidPath"),
            Self::Patch(PatchError::NoTarget) => Some("noTarget"),
            Self::Patch(PatchError::Mutability { .. }) => Some("mutability"),
            Self::Upstream(_) => None,
            Self::Internal { .. } => None,
        }
    }

    /// The HTTP status this error maps to.
    pub fn status(&self) -> u16 {
        match self {
            Self::Filter(_) => 400,
            Self::Patch(_) => 400,
            Self::Upstream(UpstreamError::Status { status, .. }) => *status,
            Self::Upstream(UpstreamError::Unavailable { .. }) => 502,
            Self::Internal { .. } => 500,
        }
    }

    /// The upstream response body to pass through verbatim, if this error
    /// wraps a non-2xx upstream response (spec: upstream errors surface
    /// status and body unchanged).
    pub fn upstream_body(&self) -> Option<&Value> {
        match self {
            Self::Upstream(UpstreamError::Status { body, .. }) => Some(body),
            _ => None,
        }
    }
}

/// Errors raised while lexing, parsing, or evaluating a SCIM filter.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    /// The filter text is not a well-formed RFC 7644 §3.4.2.2 expression.
    #[error("invalid filter at position {position:?}: {message}")]
    InvalidFilter {
        /// Human-readable description of the parse failure.
        message: String,
        /// Byte offset into the filter string where parsing failed, if known.
        position: Option<usize>,
    },

    /// The filter's complexity counter exceeded `MAX_FILTER_COMPLEXITY`.
    #[error("filter too complex: {found} nodes exceeds limit of {limit}")]
    TooComplex {
        /// The configured maximum.
        limit: usize,
        /// The complexity actually counted before the parser gave up.
        found: usize,
    },
}

impl FilterError {
    /// Construct an [`FilterError::InvalidFilter`] with no known position.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidFilter {
            message: message.into(),
            position: None,
        }
    }

    /// Construct an [`FilterError::InvalidFilter`] at a specific position.
    pub fn invalid_at(message: impl Into<String>, position: usize) -> Self {
        Self::InvalidFilter {
            message: message.into(),
            position: Some(position),
        }
    }
}

/// Errors raised while parsing or applying a PATCH operation.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    /// The PATCH `path` could not be parsed.
    #[error("invalid patch path: {message}")]
    InvalidPath {
        /// Description of what makes the path invalid.
        message: String,
    },

    /// A selector that was required to match at least one element matched
    /// nothing (an `add` with a selector that selects no elements).
    #[error("patch selector matched no target")]
    NoTarget,

    /// The operation attempted to modify an immutable attribute
    /// (`schemas`, `id`, or `meta`).
    #[error("attribute '{attribute}' is immutable")]
    Mutability {
        /// The immutable attribute the operation attempted to touch.
        attribute: String,
    },
}

/// Errors raised by the Upstream Client when talking to the legacy SCIM
/// service.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// The upstream responded with a non-2xx status. The body is preserved
    /// so SCIM error envelopes from the upstream pass through unchanged.
    #[error("upstream returned status {status}")]
    Status {
        /// The upstream's HTTP status code.
        status: u16,
        /// The upstream's response body, passed through verbatim.
        body: Value,
    },

    /// A transport-level failure: connection refused, DNS failure, or
    /// the per-request timeout elapsed.
    #[error("upstream unavailable: {message}")]
    Unavailable {
        /// Description of the transport failure.
        message: String,
    },
}

impl From<reqwest::Error> for UpstreamError {
    fn from(error: reqwest::Error) -> Self {
        Self::Unavailable {
            message: error.to_string(),
        }
    }
}

/// Errors raised while loading and validating process configuration.
///
/// Kept separate from [`ProxyError`] because configuration failures occur
/// before any request exists and are fatal to the process, not a single
/// request.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable was not set.
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    /// An environment variable was set but could not be parsed.
    #[error("invalid value for environment variable {name}: {value}")]
    Invalid {
        /// The name of the offending variable.
        name: &'static str,
        /// The value that failed to parse.
        value: String,
    },
}

/// Result alias for request-handling code.
pub type ProxyResult<T> = Result<T, ProxyError>;
/// Result alias for filter lexing/parsing/evaluation.
pub type FilterResult<T> = Result<T, FilterError>;
/// Result alias for PATCH path parsing/application.
pub type PatchResult<T> = Result<T, PatchError>;
/// Result alias for upstream transport.
pub type UpstreamResult<T> = Result<T, UpstreamError>;
/// Result alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scim_type_matches_spec_taxonomy() {
        let err = ProxyError::Filter(FilterError::invalid("bad token"));
        assert_eq!(err.scim_type(), Some("invalidFilter"));
        assert_eq!(err.status(), 400);

        let err = ProxyError::Filter(FilterError::TooComplex {
            limit: 2,
            found: 3,
        });
        assert_eq!(err.scim_type(), Some("tooMany"));

        let err = ProxyError::Patch(PatchError::NoTarget);
        assert_eq!(err.scim_type(), Some("noTarget"));

        let err = ProxyError::Upstream(UpstreamError::Status {
            status: 404,
            body: serde_json::json!({"detail": "not found"}),
        });
        assert_eq!(err.status(), 404);
        assert!(err.upstream_body().is_some());
    }

    #[test]
    fn internal_error_maps_to_500() {
        let err = ProxyError::internal("boom");
        assert_eq!(err.status(), 500);
        assert!(err.scim_type().is_none());
    }
}
