//! Listing adapter: store version listing -> [`VersionEntry`] values.
//!
//! Object stores answer a version listing with two separate collections
//! (versions and delete markers). Each collection is normalized straight into
//! the matching [`EntryKind`], so provenance is carried by the type rather
//! than by a flag patched onto the raw record.
//!
//! # Design constraints
//! - Pure conversion. No IO.
//! - Never fails. Missing optional fields stay `None`; a record without a
//!   timestamp cannot be ordered against anything and is dropped.
//! - The listing is a prefix query, so records for longer keys sharing the
//!   prefix are discarded by [`entries_for_key`].

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::VersionEntry;

/// One record of a version listing, as returned by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawRecord {
    pub key: String,
    #[serde(default)]
    pub version_id: Option<String>,
    /// Possibly quoted (`"\"abc\""`). Never present on delete markers.
    #[serde(default)]
    pub etag: Option<String>,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub size: Option<i64>,
    #[serde(default)]
    pub is_latest: Option<bool>,
}

/// Both collections of a version listing for one prefix in one zone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawVersionListing {
    #[serde(default)]
    pub versions: Vec<RawRecord>,
    #[serde(default)]
    pub delete_markers: Vec<RawRecord>,
}

/// Canonical ETag form: surrounding quote characters removed.
pub fn strip_etag_quotes(etag: &str) -> String {
    etag.trim_matches('"').to_string()
}

pub fn normalize_version(raw: &RawRecord) -> Option<VersionEntry> {
    let last_modified = raw.last_modified?;
    let etag = raw
        .etag
        .as_deref()
        .map(strip_etag_quotes)
        .filter(|e| !e.is_empty());
    let size = raw.size.and_then(|s| u64::try_from(s).ok());
    Some(VersionEntry::version(
        raw.version_id.clone(),
        etag,
        size,
        last_modified,
        raw.is_latest.unwrap_or(false),
    ))
}

pub fn normalize_delete_marker(raw: &RawRecord) -> Option<VersionEntry> {
    let last_modified = raw.last_modified?;
    Some(VersionEntry::delete_marker(
        raw.version_id.clone(),
        last_modified,
        raw.is_latest.unwrap_or(false),
    ))
}

/// Union of versions and delete markers whose key is exactly `key`.
pub fn entries_for_key(listing: &RawVersionListing, key: &str) -> Vec<VersionEntry> {
    let versions = listing
        .versions
        .iter()
        .filter(|r| r.key == key)
        .filter_map(normalize_version);
    let markers = listing
        .delete_markers
        .iter()
        .filter(|r| r.key == key)
        .filter_map(normalize_delete_marker);
    versions.chain(markers).collect()
}
