//! HTTP layer (spec.md §6, §11): thin axum bindings over the Request
//! Coordinator. Router contract only — no business logic lives here.

pub mod discovery;
pub mod handlers;
pub mod router;
pub mod scim_error;

pub use handlers::AppState;
pub use router::build;
