//! Client script endpoint.

use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::IntoResponse;

use crate::context::AppContext;

/// Base URL the browser should call back to: the configured public URL, or
/// whatever host the request arrived on.
fn server_base(ctx: &AppContext, headers: &HeaderMap) -> String {
    if let Some(ref url) = ctx.config.server.public_url {
        return url.clone();
    }
    headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(|host| format!("http://{host}"))
        .unwrap_or_default()
}

/// GET /client-script
#[utoipa::path(
    get,
    path = "/client-script",
    responses(
        (status = 200, description = "Browser skip engine", content_type = "application/javascript", body = String)
    )
)]
pub async fn client_script(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let base = server_base(&ctx, &headers);
    let body = ctx.client_script.render(&ctx.config.engine, &base);
    (
        [
            (header::CONTENT_TYPE, "application/javascript; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
}
