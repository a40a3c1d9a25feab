//! Axum router and all HTTP handlers for zc-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers (tracing, CORS).  Authentication is part of the router
//! itself so the scenario tests in `tests/` exercise it too.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    middleware,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::info;
use zc_reconcile::wire::WireReport;
use zc_store::{list_folder, CheckRequest, FolderListing};

use crate::{
    api_types::{
        BucketQuery, CheckQuery, DeleteResponse, HealthResponse, ListQuery,
        PresignDownloadRequest, PresignResponse, PresignUploadRequest, ZonesResponse,
    },
    auth::require_bearer,
    error::ApiError,
    state::AppState,
};

const DEFAULT_UPLOAD_CONTENT_TYPE: &str = "application/octet-stream";

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Every route except `/v1/health` sits behind [`require_bearer`].
pub fn build_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/zones", get(zones))
        .route("/list", get(list_objects))
        .route("/consistency/check", get(consistency_check))
        .route("/presign/download", post(presign_download))
        .route("/presign/upload", post(presign_upload))
        .route("/objects/:zone/*key", delete(delete_object))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            require_bearer,
        ));

    Router::new()
        .route("/v1/health", get(health))
        .merge(protected)
        .with_state(state)
}

fn non_empty(v: Option<&str>) -> Option<&str> {
    v.filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        service: st.build.service.to_string(),
        version: st.build.version.to_string(),
    })
}

// ---------------------------------------------------------------------------
// GET /zones
// ---------------------------------------------------------------------------

pub(crate) async fn zones(State(st): State<Arc<AppState>>) -> Json<ZonesResponse> {
    Json(ZonesResponse {
        zones: st.checker.registry().zones().to_vec(),
        bucket: st.checker.default_bucket().map(str::to_string),
    })
}

// ---------------------------------------------------------------------------
// GET /list
// ---------------------------------------------------------------------------

/// Folder-style listing of one zone.
pub(crate) async fn list_objects(
    State(st): State<Arc<AppState>>,
    Query(q): Query<ListQuery>,
) -> Result<Json<FolderListing>, ApiError> {
    let bucket = st.checker.bucket(q.bucket.as_deref())?;
    let zone = non_empty(q.zone.as_deref())
        .ok_or_else(|| ApiError::BadRequest("Missing 'zone'".to_string()))?;
    let store = st.checker.store(zone)?;

    let listing = list_folder(store.as_ref(), bucket, &q.prefix).await?;
    Ok(Json(listing))
}

// ---------------------------------------------------------------------------
// GET /consistency/check
// ---------------------------------------------------------------------------

pub(crate) async fn consistency_check(
    State(st): State<Arc<AppState>>,
    Query(q): Query<CheckQuery>,
) -> Result<Json<WireReport>, ApiError> {
    st.checker.bucket(q.bucket.as_deref())?;
    let current_zone = non_empty(q.current_zone.as_deref())
        .ok_or_else(|| ApiError::BadRequest("Missing 'currentZone'".to_string()))?;

    let report = st
        .checker
        .check(CheckRequest {
            key: q.key.as_deref().unwrap_or_default(),
            current_zone,
            bucket: q.bucket.as_deref(),
        })
        .await?;
    Ok(Json(WireReport::from(&report)))
}

// ---------------------------------------------------------------------------
// POST /presign/download
// ---------------------------------------------------------------------------

pub(crate) async fn presign_download(
    State(st): State<Arc<AppState>>,
    Query(q): Query<BucketQuery>,
    Json(body): Json<PresignDownloadRequest>,
) -> Result<Json<PresignResponse>, ApiError> {
    let bucket = st.checker.bucket(q.bucket.as_deref())?;
    let (Some(zone), Some(key)) = (non_empty(body.zone.as_deref()), non_empty(body.key.as_deref()))
    else {
        return Err(ApiError::BadRequest("Missing 'zone' or 'key'".to_string()));
    };
    let store = st.checker.store(zone)?;
    let version_id = non_empty(body.version_id.as_deref());

    let url = store
        .presign_get(bucket, key, version_id, st.presign_ttl)
        .await?;
    info!(zone, bucket, key, version_id = version_id.unwrap_or("-"), "presign/download");
    Ok(Json(PresignResponse { url }))
}

// ---------------------------------------------------------------------------
// POST /presign/upload
// ---------------------------------------------------------------------------

pub(crate) async fn presign_upload(
    State(st): State<Arc<AppState>>,
    Query(q): Query<BucketQuery>,
    Json(body): Json<PresignUploadRequest>,
) -> Result<Json<PresignResponse>, ApiError> {
    let bucket = st.checker.bucket(q.bucket.as_deref())?;
    let (Some(zone), Some(key)) = (non_empty(body.zone.as_deref()), non_empty(body.key.as_deref()))
    else {
        return Err(ApiError::BadRequest("Missing 'zone' or 'key'".to_string()));
    };
    let store = st.checker.store(zone)?;
    let content_type =
        non_empty(body.content_type.as_deref()).unwrap_or(DEFAULT_UPLOAD_CONTENT_TYPE);

    let url = store
        .presign_put(bucket, key, content_type, st.presign_upload_ttl)
        .await?;
    info!(zone, bucket, key, content_type, "presign/upload");
    Ok(Json(PresignResponse { url }))
}

// ---------------------------------------------------------------------------
// DELETE /objects/{zone}/{key}
// ---------------------------------------------------------------------------

/// Deletes `key` in one zone only. Other zones keep their copies, so the next
/// consistency check reports the zone as holding a delete marker.
pub(crate) async fn delete_object(
    State(st): State<Arc<AppState>>,
    Path((zone, key)): Path<(String, String)>,
    Query(q): Query<BucketQuery>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let bucket = st.checker.bucket(q.bucket.as_deref())?;
    let key = key.trim_start_matches('/');
    if key.is_empty() {
        return Err(ApiError::BadRequest("Missing 'key'".to_string()));
    }
    let store = st.checker.store(&zone)?;

    store.delete_object(bucket, key).await?;
    info!(zone = %zone, bucket, key, "object deleted");
    Ok(Json(DeleteResponse {
        status: "ok".to_string(),
        message: format!("Object '{key}' deleted from zone '{zone}'."),
    }))
}
