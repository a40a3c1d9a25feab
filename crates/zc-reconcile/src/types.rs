use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a single listing entry represents.
///
/// Content fields only exist on `Version`; a delete marker has no body.
/// Either field may still be absent when the store omitted it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntryKind {
    Version {
        etag: Option<String>,
        size: Option<u64>,
    },
    DeleteMarker,
}

/// One version or delete marker of a key in one zone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionEntry {
    pub kind: EntryKind,
    /// Store-assigned id. `None` on unversioned buckets.
    pub version_id: Option<String>,
    /// Full store precision. Truncation only happens in the classifier and on the wire.
    pub last_modified: DateTime<Utc>,
    /// The store's own head flag. Informational; the engine recomputes "latest".
    pub is_latest: bool,
}

impl VersionEntry {
    pub fn version(
        version_id: Option<String>,
        etag: Option<String>,
        size: Option<u64>,
        last_modified: DateTime<Utc>,
        is_latest: bool,
    ) -> Self {
        Self {
            kind: EntryKind::Version { etag, size },
            version_id,
            last_modified,
            is_latest,
        }
    }

    pub fn delete_marker(
        version_id: Option<String>,
        last_modified: DateTime<Utc>,
        is_latest: bool,
    ) -> Self {
        Self {
            kind: EntryKind::DeleteMarker,
            version_id,
            last_modified,
            is_latest,
        }
    }

    pub fn is_delete_marker(&self) -> bool {
        matches!(self.kind, EntryKind::DeleteMarker)
    }

    pub fn etag(&self) -> Option<&str> {
        match &self.kind {
            EntryKind::Version { etag, .. } => etag.as_deref(),
            EntryKind::DeleteMarker => None,
        }
    }

    pub fn size(&self) -> Option<u64> {
        match &self.kind {
            EntryKind::Version { size, .. } => *size,
            EntryKind::DeleteMarker => None,
        }
    }

    /// `last_modified` truncated to whole seconds (UNIX epoch seconds).
    pub fn last_modified_secs(&self) -> i64 {
        self.last_modified.timestamp()
    }
}

/// Raw outcome of fetching one zone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ZoneOutcome {
    /// Entries for exactly the requested key, in no particular order.
    Entries(Vec<VersionEntry>),
    /// The store could not be reached or refused the listing.
    Failed(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ZoneResult {
    pub zone_name: String,
    pub outcome: ZoneOutcome,
}

impl ZoneResult {
    pub fn entries(zone_name: impl Into<String>, entries: Vec<VersionEntry>) -> Self {
        Self {
            zone_name: zone_name.into(),
            outcome: ZoneOutcome::Entries(entries),
        }
    }

    pub fn failed(zone_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            zone_name: zone_name.into(),
            outcome: ZoneOutcome::Failed(error.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, ZoneOutcome::Failed(_))
    }
}

/// The entry judged most recent within one zone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ZoneLatest {
    pub zone_name: String,
    /// `None` when the zone holds nothing for the key, or when the fetch failed.
    pub latest: Option<VersionEntry>,
    pub error: Option<String>,
}

/// Freshness of one zone relative to the global latest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ZoneState {
    Latest,
    Outdated,
    Missing,
    Unknown,
}

impl ZoneState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneState::Latest => "Latest",
            ZoneState::Outdated => "Outdated",
            ZoneState::Missing => "Missing",
            ZoneState::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for ZoneState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ZoneReport {
    pub zone_name: String,
    pub state: ZoneState,
    pub latest: Option<VersionEntry>,
    pub error: Option<String>,
}

/// Full report. `per_zone` follows the configured zone order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconciliationReport {
    pub consistent: bool,
    pub per_zone: Vec<ZoneReport>,
    pub recommended_zone: Option<String>,
    /// Whether the caller-nominated zone's own latest entry is a delete marker.
    pub current_zone_is_delete_marker: bool,
}

impl ReconciliationReport {
    pub fn zone(&self, zone_name: &str) -> Option<&ZoneReport> {
        self.per_zone.iter().find(|z| z.zone_name == zone_name)
    }

    pub fn state_of(&self, zone_name: &str) -> Option<ZoneState> {
        self.zone(zone_name).map(|z| z.state)
    }

    pub fn unknown_zones(&self) -> usize {
        self.per_zone
            .iter()
            .filter(|z| z.state == ZoneState::Unknown)
            .count()
    }
}
