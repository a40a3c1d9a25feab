//! Request and response types for all zc-daemon HTTP endpoints.
//!
//! These types are `Serialize + Deserialize` so they can be JSON-encoded
//! by Axum and decoded by tests.  No business logic lives here.

use serde::{Deserialize, Serialize};
use zc_config::Zone;

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Body of every non-2xx response produced by a handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

// ---------------------------------------------------------------------------
// /zones
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZonesResponse {
    /// Configured order.
    pub zones: Vec<Zone>,
    pub bucket: Option<String>,
}

// ---------------------------------------------------------------------------
// /list
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListQuery {
    pub zone: Option<String>,
    #[serde(default)]
    pub prefix: String,
    pub bucket: Option<String>,
}

// ---------------------------------------------------------------------------
// /consistency/check
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckQuery {
    pub key: Option<String>,
    /// Zone the caller is currently browsing.
    #[serde(rename = "currentZone")]
    pub current_zone: Option<String>,
    pub bucket: Option<String>,
}

// ---------------------------------------------------------------------------
// /presign/*
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BucketQuery {
    pub bucket: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PresignDownloadRequest {
    pub zone: Option<String>,
    pub key: Option<String>,
    /// Omitted or empty: current version.
    pub version_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PresignUploadRequest {
    pub zone: Option<String>,
    pub key: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresignResponse {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub status: String,
    pub message: String,
}
