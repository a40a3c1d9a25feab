use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::{
    EntryKind, ReconciliationReport, VersionEntry, ZoneLatest, ZoneOutcome, ZoneReport, ZoneResult,
    ZoneState,
};

/// Ordering used to pick the head of one zone.
///
/// Primary key is `last_modified`. Stores do not agree on how equal timestamps
/// are ordered, so ties are broken explicitly:
/// 1. a delete marker ranks above a version (the marker is written on top of
///    the version it hides),
/// 2. then the lexically greater `version_id` (absent ranks lowest).
fn cmp_within_zone(a: &VersionEntry, b: &VersionEntry) -> Ordering {
    fn kind_rank(k: &EntryKind) -> u8 {
        match k {
            EntryKind::Version { .. } => 0,
            EntryKind::DeleteMarker => 1,
        }
    }

    a.last_modified
        .cmp(&b.last_modified)
        .then_with(|| kind_rank(&a.kind).cmp(&kind_rank(&b.kind)))
        .then_with(|| a.version_id.cmp(&b.version_id))
}

/// Most recent entry of one zone, or `None` for an empty set.
pub fn latest_in_zone(entries: &[VersionEntry]) -> Option<&VersionEntry> {
    entries.iter().max_by(|a, b| cmp_within_zone(a, b))
}

pub fn zone_latest(result: &ZoneResult) -> ZoneLatest {
    match &result.outcome {
        ZoneOutcome::Entries(entries) => ZoneLatest {
            zone_name: result.zone_name.clone(),
            latest: latest_in_zone(entries).cloned(),
            error: None,
        },
        ZoneOutcome::Failed(err) => ZoneLatest {
            zone_name: result.zone_name.clone(),
            latest: None,
            error: Some(err.clone()),
        },
    }
}

/// A zone's latest entry selected across zones.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GlobalPick<'a> {
    pub zone_name: &'a str,
    pub entry: &'a VersionEntry,
}

/// Max raw `last_modified` across zones. Only a strictly newer entry replaces
/// the current pick, so on a tie the zone configured first wins.
fn best_across_zones(zones: &[ZoneLatest], skip_delete_markers: bool) -> Option<GlobalPick<'_>> {
    let mut best: Option<GlobalPick<'_>> = None;
    for z in zones {
        if z.error.is_some() {
            continue;
        }
        let Some(entry) = z.latest.as_ref() else {
            continue;
        };
        if skip_delete_markers && entry.is_delete_marker() {
            continue;
        }
        let newer = match best {
            None => true,
            Some(b) => entry.last_modified > b.entry.last_modified,
        };
        if newer {
            best = Some(GlobalPick {
                zone_name: &z.zone_name,
                entry,
            });
        }
    }
    best
}

pub fn global_latest(zones: &[ZoneLatest]) -> Option<GlobalPick<'_>> {
    best_across_zones(zones, false)
}

/// Best zone to read object content from: like [`global_latest`] but delete
/// markers are not candidates.
pub fn recommended_zone(zones: &[ZoneLatest]) -> Option<&str> {
    best_across_zones(zones, true).map(|p| p.zone_name)
}

/// True iff no zone failed and every live latest entry carries the same ETag
/// (with at least one ETag present).
pub fn is_consistent(zones: &[ZoneLatest]) -> bool {
    if zones.iter().any(|z| z.error.is_some()) {
        return false;
    }
    let etags: BTreeSet<&str> = zones
        .iter()
        .filter_map(|z| z.latest.as_ref())
        .filter_map(|e| e.etag())
        .collect();
    etags.len() == 1
}

/// Freshness of one zone against the global latest.
///
/// "Latest" compares timestamps truncated to whole seconds: writes landing
/// in the same second in different zones count as the same event.
pub fn classify_zone(zone: &ZoneLatest, global: Option<&VersionEntry>) -> ZoneState {
    if zone.error.is_some() {
        return ZoneState::Unknown;
    }
    let global_is_delete = global.is_some_and(|g| g.is_delete_marker());
    match (&zone.latest, global) {
        (None, _) if global_is_delete => ZoneState::Latest,
        (None, _) => ZoneState::Missing,
        (Some(entry), Some(g)) if entry.last_modified_secs() == g.last_modified_secs() => {
            ZoneState::Latest
        }
        (Some(_), _) => ZoneState::Outdated,
    }
}

/// Reconcile one key across zones.
///
/// `results` must be in configured zone order; that order drives both the
/// report layout and the tie-break between zones.
pub fn reconcile(results: &[ZoneResult], current_zone: &str) -> ReconciliationReport {
    let latests: Vec<ZoneLatest> = results.iter().map(zone_latest).collect();

    let global = global_latest(&latests).map(|p| p.entry);
    let recommended = recommended_zone(&latests).map(str::to_string);
    let consistent = is_consistent(&latests);

    let current_zone_is_delete_marker = latests
        .iter()
        .find(|z| z.zone_name == current_zone)
        .and_then(|z| z.latest.as_ref())
        .is_some_and(VersionEntry::is_delete_marker);

    let per_zone = latests
        .iter()
        .map(|z| ZoneReport {
            zone_name: z.zone_name.clone(),
            state: classify_zone(z, global),
            latest: z.latest.clone(),
            error: z.error.clone(),
        })
        .collect();

    ReconciliationReport {
        consistent,
        per_zone,
        recommended_zone: recommended,
        current_zone_is_delete_marker,
    }
}
