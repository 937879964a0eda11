//! HTTP Router (spec.md §6, §11): binds the Request Coordinator to the SCIM
//! HTTP surface, mounted both bare and under `/v2`.

use axum::Router;
use axum::routing::get;

use super::discovery;
use super::handlers::{self, AppState};

pub fn build(state: AppState) -> Router {
    Router::new()
        .merge(resource_routes())
        .nest("/v2", resource_routes())
        .route("/health", get(discovery::health))
        .with_state(state)
}

fn resource_routes() -> Router<AppState> {
    Router::new()
        .route("/:resource_type", get(handlers::list).post(handlers::create))
        .route(
            "/:resource_type/:id",
            get(handlers::get)
                .put(handlers::replace)
                .patch(handlers::patch)
                .delete(handlers::delete),
        )
        .route(
            "/ServiceProviderConfig",
            get(discovery::service_provider_config),
        )
        .route("/ResourceTypes", get(discovery::resource_types))
        .route("/ResourceTypes/User", get(discovery::user_resource_type))
        .route("/ResourceTypes/Group", get(discovery::group_resource_type))
}
