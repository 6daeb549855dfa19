//! Axum router construction.
//!
//! Builds the application router with all routes and middleware layers.
//! Elevated routes enforce credentials through the
//! [`Elevated`](crate::middleware::auth::Elevated) extractor, since the same
//! path can be public for one method and elevated for another.

use axum::middleware;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::context::AppContext;
use crate::middleware::request_id::request_id_middleware;
use crate::routes;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::health::health_check,
        routes::segments::list_for_item,
        routes::segments::list_all,
        routes::segments::create_segment,
        routes::segments::delete_segment,
        routes::provider::host_segments,
        routes::client::client_script,
    ),
    components(schemas(
        routes::health::HealthResponse,
        routes::segments::SegmentResponse,
        routes::segments::CreateSegmentRequest,
        crate::provider::HostSegment,
    ))
)]
pub struct ApiDoc;

/// Build the complete Axum router.
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route(
            "/segments",
            get(routes::segments::list_all).post(routes::segments::create_segment),
        )
        .route(
            "/segments/{id}",
            get(routes::segments::list_for_item).delete(routes::segments::delete_segment),
        )
        .route(
            "/provider/segments/{id}",
            get(routes::provider::host_segments),
        )
        .route("/client-script", get(routes::client::client_script))
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
