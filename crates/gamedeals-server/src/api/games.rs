//! Read handlers for game records and the discount ledger, plus the two
//! write triggers (crawl, expired refresh).
//!
//! List responses are sorted in the handler, not in storage: the sort key
//! arrives as a serialized field name (camelCase, `-` prefix for
//! descending) and entries missing the field always sort last, which is a
//! front-end contract rather than anything SQL `ORDER BY` expresses
//! cleanly. Record sets are small enough that this stays cheap.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use gamedeals_core::sort_by_field;

use crate::middleware::RequestId;

use super::{map_crawl_error, map_store_error, ApiError, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ListQuery {
    pub page_no: Option<usize>,
    pub page_size: Option<usize>,
    pub sort_by: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct LedgerQuery {
    pub sort_by: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CrawlRequest {
    pub start_page: Option<u32>,
    pub segment: Option<String>,
}

pub(super) async fn list_games(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let games = state
        .store
        .list_games()
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;

    let mut values = to_values(&games, &req_id.0)?;
    let sort_by = query.sort_by.as_deref().unwrap_or("-discountStartAt");
    sort_by_field(&mut values, sort_by);

    let page_no = query.page_no.unwrap_or(1).max(1);
    let page_size = query.page_size.unwrap_or(20).max(1);
    let page: Vec<Value> = values
        .into_iter()
        .skip((page_no - 1) * page_size)
        .take(page_size)
        .collect();

    Ok(Json(Value::Array(page)))
}

pub(super) async fn get_game(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let game = state
        .store
        .get_game(&id)
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;

    match game {
        Some(game) => Ok(Json(to_value(&game, &req_id.0)?)),
        None => Ok(Json(Value::Null)),
    }
}

pub(super) async fn list_discount_records(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
    Query(query): Query<LedgerQuery>,
) -> Result<Json<Value>, ApiError> {
    let records = state
        .store
        .list_discount_records(&id)
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;

    let mut values = to_values(&records, &req_id.0)?;
    let sort_by = query.sort_by.as_deref().unwrap_or("-createdAt");
    sort_by_field(&mut values, sort_by);

    Ok(Json(Value::Array(values)))
}

/// Runs one synchronous, time-boxed crawl pass and returns the resumption
/// cursor (`nextPage: null` when the catalog pass completed).
pub(super) async fn trigger_crawl(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    // The body is optional; an empty body means "from the beginning".
    let request: CrawlRequest = if body.is_empty() {
        CrawlRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            ApiError::new(
                req_id.0.clone(),
                "bad_request",
                format!("invalid request body: {e}"),
            )
        })?
    };

    let start_page = request.start_page.unwrap_or(1);
    let outcome = state
        .crawler
        .crawl(state.store.as_ref(), start_page, request.segment.as_deref())
        .await
        .map_err(|e| map_crawl_error(req_id.0.clone(), &e))?;

    tracing::info!(
        request_id = %req_id.0,
        stop = ?outcome.stop,
        next_page = ?outcome.next_page,
        pages_crawled = outcome.pages_crawled,
        games_written = outcome.games_written,
        discount_records_written = outcome.discount_records_written,
        "crawl pass finished"
    );

    Ok(Json(json!({ "nextPage": outcome.next_page })))
}

pub(super) async fn refresh_expired(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<Value>, ApiError> {
    let considered = state
        .crawler
        .refresh_expired(state.store.as_ref(), Utc::now())
        .await
        .map_err(|e| map_crawl_error(req_id.0.clone(), &e))?;

    tracing::info!(request_id = %req_id.0, considered, "expired-discount refresh finished");
    Ok(Json(json!({ "considered": considered })))
}

fn to_value<T: Serialize>(item: &T, request_id: &str) -> Result<Value, ApiError> {
    serde_json::to_value(item).map_err(|e| {
        tracing::error!(error = %e, "record serialization failed");
        ApiError::new(request_id, "internal_error", "record serialization failed")
    })
}

fn to_values<T: Serialize>(items: &[T], request_id: &str) -> Result<Vec<Value>, ApiError> {
    items.iter().map(|item| to_value(item, request_id)).collect()
}
