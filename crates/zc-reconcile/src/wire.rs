//! JSON wire shape of a [`ReconciliationReport`].
//!
//! Field names are part of the public HTTP contract and must not change.
//! Timestamps are ISO-8601 with whole-second precision (`2024-05-01T12:00:00+00:00`);
//! sub-second precision is dropped here and nowhere else.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::{EntryKind, ReconciliationReport, VersionEntry, ZoneReport, ZoneState};

/// Render a timestamp the way every endpoint does: UTC, seconds precision.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, false)
}

pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, WireError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| WireError::BadTimestamp {
            raw: s.to_string(),
            reason: e.to_string(),
        })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    BadTimestamp { raw: String, reason: String },
}

impl std::fmt::Display for WireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadTimestamp { raw, reason } => {
                write!(f, "invalid last_modified '{raw}': {reason}")
            }
        }
    }
}

impl std::error::Error for WireError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireEntryType {
    Version,
    DeleteMarker,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireEntry {
    #[serde(rename = "type")]
    pub entry_type: WireEntryType,
    pub version_id: Option<String>,
    pub etag: Option<String>,
    pub last_modified: String,
    pub size: Option<u64>,
    pub is_latest: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireZone {
    pub zone: String,
    pub state: ZoneState,
    pub latest: Option<WireEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireReport {
    pub consistent: bool,
    pub per_zone: Vec<WireZone>,
    pub recommended_download_zone: Option<String>,
    pub current_zone_latest_is_delete_marker: bool,
}

impl From<&VersionEntry> for WireEntry {
    fn from(e: &VersionEntry) -> Self {
        let entry_type = match e.kind {
            EntryKind::Version { .. } => WireEntryType::Version,
            EntryKind::DeleteMarker => WireEntryType::DeleteMarker,
        };
        Self {
            entry_type,
            version_id: e.version_id.clone(),
            etag: e.etag().map(str::to_string),
            last_modified: format_timestamp(&e.last_modified),
            size: e.size(),
            is_latest: e.is_latest,
        }
    }
}

impl TryFrom<WireEntry> for VersionEntry {
    type Error = WireError;

    fn try_from(w: WireEntry) -> Result<Self, Self::Error> {
        let last_modified = parse_timestamp(&w.last_modified)?;
        Ok(match w.entry_type {
            WireEntryType::Version => {
                VersionEntry::version(w.version_id, w.etag, w.size, last_modified, w.is_latest)
            }
            WireEntryType::DeleteMarker => {
                VersionEntry::delete_marker(w.version_id, last_modified, w.is_latest)
            }
        })
    }
}

impl From<&ReconciliationReport> for WireReport {
    fn from(r: &ReconciliationReport) -> Self {
        Self {
            consistent: r.consistent,
            per_zone: r
                .per_zone
                .iter()
                .map(|z| WireZone {
                    zone: z.zone_name.clone(),
                    state: z.state,
                    latest: z.latest.as_ref().map(WireEntry::from),
                    error: z.error.clone(),
                })
                .collect(),
            recommended_download_zone: r.recommended_zone.clone(),
            current_zone_latest_is_delete_marker: r.current_zone_is_delete_marker,
        }
    }
}

impl TryFrom<WireReport> for ReconciliationReport {
    type Error = WireError;

    fn try_from(w: WireReport) -> Result<Self, Self::Error> {
        let per_zone = w
            .per_zone
            .into_iter()
            .map(|z| {
                Ok(ZoneReport {
                    zone_name: z.zone,
                    state: z.state,
                    latest: z.latest.map(VersionEntry::try_from).transpose()?,
                    error: z.error,
                })
            })
            .collect::<Result<Vec<_>, WireError>>()?;
        Ok(Self {
            consistent: w.consistent,
            per_zone,
            recommended_zone: w.recommended_download_zone,
            current_zone_is_delete_marker: w.current_zone_latest_is_delete_marker,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_drops_fraction_and_keeps_offset() {
        let ts: DateTime<Utc> = "2024-05-01T12:00:00.987654Z".parse().unwrap();
        assert_eq!(format_timestamp(&ts), "2024-05-01T12:00:00+00:00");
    }

    #[test]
    fn error_field_omitted_when_absent() {
        let z = WireZone {
            zone: "z1".into(),
            state: ZoneState::Missing,
            latest: None,
            error: None,
        };
        let v = serde_json::to_value(&z).unwrap();
        assert!(v.get("error").is_none());
        assert_eq!(v["state"], "Missing");
        assert!(v["latest"].is_null());
    }

    #[test]
    fn bad_timestamp_is_rejected() {
        assert!(parse_timestamp("yesterday").is_err());
    }
}
