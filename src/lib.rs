//! # SCIM Upgrade Proxy
//!
//! A protocol-upgrading proxy that sits in front of a legacy, CRUD-only SCIM
//! 2.0 service and adds the parts of RFC 7644 the upstream never implemented:
//! attribute filtering (§3.4.2.2), PATCH (§3.5.2), pagination, sorting, and
//! attribute projection. Every response is served from a short-lived cache
//! with single-flight coalescing, so a burst of identical requests only
//! reaches the upstream once.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use scim_upgrade_proxy::cache::ResponseCache;
//! use scim_upgrade_proxy::config::ProxyConfig;
//! use scim_upgrade_proxy::coordinator::RequestCoordinator;
//! use scim_upgrade_proxy::upstream::UpstreamClient;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ProxyConfig::from_env()?;
//! let upstream = UpstreamClient::new(&config.upstream_base_url, config.upstream_timeout, false)?;
//! let cache = ResponseCache::new(config.cache_ttl, config.cache_max_size);
//! let coordinator = Arc::new(RequestCoordinator::new(
//!     Arc::new(upstream),
//!     cache,
//!     config.max_filter_complexity,
//!     config.filter_fetch_multiplier,
//!     config.max_filter_fetch_size,
//! ));
//! let router = scim_upgrade_proxy::http::build(coordinator);
//! # let _ = router;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod context;
pub mod coordinator;
pub mod error;
pub mod filter;
pub mod http;
pub mod pagination;
pub mod patch;
pub mod upstream;

pub use cache::{CacheKey, ResponseCache};
pub use config::ProxyConfig;
pub use context::{ListQuery, RequestContext, SortOrder};
pub use coordinator::RequestCoordinator;
pub use error::{
    ConfigError, FilterError, PatchError, ProxyError, ProxyResult, UpstreamError,
};
pub use upstream::{ResourceStore, UpstreamClient};
