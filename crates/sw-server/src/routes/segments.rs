//! Segment store route handlers.

use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use sw_core::{ItemId, SegmentId};

use crate::context::AppContext;
use crate::error::AppError;
use crate::extract::JsonBody;
use crate::middleware::auth::Elevated;

/// A stored segment on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct SegmentResponse {
    pub id: i64,
    pub item_id: String,
    pub start: f64,
    pub end: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl SegmentResponse {
    fn from_model(segment: &sw_db::models::Segment) -> Self {
        Self {
            id: segment.id.get(),
            item_id: segment.item_id.to_string(),
            start: segment.start,
            end: segment.end,
            reason: segment.reason.clone(),
        }
    }
}

/// Body of `POST /segments`. camelCase field names are accepted as well.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct CreateSegmentRequest {
    #[serde(alias = "itemId")]
    pub item_id: String,
    #[serde(alias = "start")]
    pub start: f64,
    #[serde(alias = "end")]
    pub end: f64,
    #[serde(default, alias = "reason")]
    pub reason: Option<String>,
}

pub(crate) fn parse_item_id(raw: &str) -> Result<ItemId, AppError> {
    raw.parse()
        .map_err(|_| sw_core::Error::Validation(format!("Invalid item id: {raw}")).into())
}

/// GET /segments/{id}
#[utoipa::path(
    get,
    path = "/segments/{id}",
    params(("id" = String, Path, description = "Media item id")),
    responses(
        (status = 200, description = "Segments of the item ordered by start", body = Vec<SegmentResponse>),
        (status = 400, description = "Malformed item id")
    )
)]
pub async fn list_for_item(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<Vec<SegmentResponse>>, AppError> {
    let item_id = parse_item_id(&id)?;
    let conn = sw_db::pool::get_conn(&ctx.db)?;
    let segments = sw_db::queries::segments::list_by_item(&conn, item_id)?;
    Ok(Json(segments.iter().map(SegmentResponse::from_model).collect()))
}

/// GET /segments
#[utoipa::path(
    get,
    path = "/segments",
    responses(
        (status = 200, description = "All segments keyed by item id", body = BTreeMap<String, Vec<SegmentResponse>>),
        (status = 401, description = "Missing or invalid credentials")
    )
)]
pub async fn list_all(
    _elevated: Elevated,
    State(ctx): State<AppContext>,
) -> Result<Json<BTreeMap<String, Vec<SegmentResponse>>>, AppError> {
    let conn = sw_db::pool::get_conn(&ctx.db)?;
    let grouped = sw_db::queries::segments::list_all(&conn)?
        .into_iter()
        .map(|(item, segments)| {
            (
                item.to_string(),
                segments.iter().map(SegmentResponse::from_model).collect(),
            )
        })
        .collect();
    Ok(Json(grouped))
}

/// POST /segments
#[utoipa::path(
    post,
    path = "/segments",
    request_body = CreateSegmentRequest,
    responses(
        (status = 200, description = "Segment created", body = SegmentResponse),
        (status = 400, description = "Invalid bounds, reason or item id"),
        (status = 401, description = "Missing or invalid credentials")
    )
)]
pub async fn create_segment(
    _elevated: Elevated,
    State(ctx): State<AppContext>,
    JsonBody(req): JsonBody<CreateSegmentRequest>,
) -> Result<Json<SegmentResponse>, AppError> {
    let item_id = parse_item_id(&req.item_id)?;

    let segment = {
        let conn = sw_db::pool::get_conn(&ctx.db)?;
        sw_db::queries::segments::add_segment(
            &conn,
            item_id,
            req.start,
            req.end,
            req.reason.as_deref(),
        )?
    };

    tracing::info!(
        segment = %segment.id,
        item = %item_id,
        start = segment.start,
        end = segment.end,
        "Segment created"
    );

    ctx.provider.notify_changed(item_id).await;
    Ok(Json(SegmentResponse::from_model(&segment)))
}

/// DELETE /segments/{id}
#[utoipa::path(
    delete,
    path = "/segments/{id}",
    params(("id" = i64, Path, description = "Segment id")),
    responses(
        (status = 200, description = "Segment deleted", body = SegmentResponse),
        (status = 401, description = "Missing or invalid credentials"),
        (status = 404, description = "Unknown segment id")
    )
)]
pub async fn delete_segment(
    _elevated: Elevated,
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<SegmentResponse>, AppError> {
    let segment_id: SegmentId = id
        .parse()
        .map_err(|_| sw_core::Error::Validation(format!("Invalid segment id: {id}")))?;

    let deleted = {
        let conn = sw_db::pool::get_conn(&ctx.db)?;
        sw_db::queries::segments::delete_segment(&conn, segment_id)?
    };
    let segment = deleted.ok_or_else(|| sw_core::Error::not_found("segment", segment_id))?;

    tracing::info!(segment = %segment.id, item = %segment.item_id, "Segment deleted");

    ctx.provider.notify_changed(segment.item_id).await;
    Ok(Json(SegmentResponse::from_model(&segment)))
}
