//! Request context and list-query parameters threaded through the proxy.

use http::HeaderMap;
use uuid::Uuid;

/// Per-request context: a correlation id for logging, and the client's
/// original headers, forwarded to upstream verbatim (spec: "transparent to
/// authentication"). Carried by value through the Coordinator and into the
/// Upstream Client and Response Cache (whose key includes an auth hash
/// derived from these headers).
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Correlation id for this request, used only in log lines.
    pub request_id: String,
    /// Client-supplied request headers, prior to hop-by-hop stripping.
    pub headers: HeaderMap,
}

impl RequestContext {
    /// Create a context with a generated correlation id.
    pub fn new(headers: HeaderMap) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            headers,
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new(HeaderMap::new())
    }
}

/// Query parameters for a list (`GET /Users`, `GET /Groups`) request.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    /// Raw filter expression, if given.
    pub filter: Option<String>,
    /// Attribute to sort by, if given.
    pub sort_by: Option<String>,
    /// Sort direction; defaults to ascending when `sort_by` is given.
    pub sort_order: SortOrder,
    /// 1-based start index (SCIM convention).
    pub start_index: usize,
    /// Maximum number of resources to return.
    pub count: usize,
    /// Attributes to retain in the response, if given.
    pub attributes: Vec<String>,
    /// Attributes to drop from the response, if given.
    pub excluded_attributes: Vec<String>,
}

impl ListQuery {
    /// Build a new query with SCIM's 1-based default start index.
    pub fn new() -> Self {
        Self {
            start_index: 1,
            count: 0,
            ..Default::default()
        }
    }

    /// Set the filter expression.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Set the start index.
    pub fn with_start_index(mut self, start_index: usize) -> Self {
        self.start_index = start_index.max(1);
        self
    }

    /// Set the requested page size.
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }
}

/// Sort direction for list responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Ascending (the SCIM default).
    #[default]
    Ascending,
    /// Descending.
    Descending,
}

impl SortOrder {
    /// Parse the SCIM `sortOrder` query value (`ascending` / `descending`).
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("descending") {
            SortOrder::Descending
        } else {
            SortOrder::Ascending
        }
    }
}
