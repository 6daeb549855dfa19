//! Host segment-provider endpoint.
//!
//! The media host calls this to learn which ranges of an item to offer for
//! skipping. Answers are always 200: unsupported items and store failures
//! produce an empty list.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use sw_core::ItemKind;

use crate::context::AppContext;
use crate::error::AppError;
use crate::middleware::auth::Elevated;
use crate::provider::{HostSegment, SegmentProvider};
use crate::routes::segments::parse_item_id;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ProviderParams {
    /// Host item type, e.g. `Movie` or `Episode`.
    pub item_type: Option<String>,
}

/// GET /provider/segments/{id}
#[utoipa::path(
    get,
    path = "/provider/segments/{id}",
    params(("id" = String, Path, description = "Media item id"), ProviderParams),
    responses(
        (status = 200, description = "Segments in host format", body = Vec<HostSegment>),
        (status = 400, description = "Malformed item id"),
        (status = 401, description = "Missing or invalid credentials")
    )
)]
pub async fn host_segments(
    _elevated: Elevated,
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    Query(params): Query<ProviderParams>,
) -> Result<Json<Vec<HostSegment>>, AppError> {
    let item_id = parse_item_id(&id)?;

    if let Some(kind) = params.item_type.as_deref() {
        let kind: ItemKind = kind.parse().unwrap_or(ItemKind::Other);
        if !SegmentProvider::supports(kind) {
            tracing::debug!(item = %item_id, kind = %kind, "Item type has no segments");
            return Ok(Json(Vec::new()));
        }
    }

    Ok(Json(ctx.provider.get_segments(item_id)))
}
