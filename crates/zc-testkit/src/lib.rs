//! Test fixtures for zonecheck.
//!
//! - [`MemoryStore`]: in-memory [`ObjectStore`] with failure and latency injection.
//! - Record builders and a [`checker`] helper wiring memory stores into a
//!   [`ZoneChecker`].
//!
//! Used ONLY from dev-dependencies.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use zc_config::{Zone, ZoneRegistry};
use zc_reconcile::RawRecord;
use zc_store::{ObjectStore, StoreSet, ZoneChecker};

mod memory_store;

pub use memory_store::MemoryStore;

/// Parse an RFC 3339 timestamp. Panics on bad input (tests only).
pub fn ts(s: &str) -> DateTime<Utc> {
    s.parse()
        .unwrap_or_else(|e| panic!("bad test timestamp {s:?}: {e}"))
}

/// Raw version record as a store would return it (quoted ETag).
pub fn version_record(key: &str, version_id: &str, etag: &str, at: &str) -> RawRecord {
    RawRecord {
        key: key.to_string(),
        version_id: Some(version_id.to_string()),
        etag: Some(format!("\"{etag}\"")),
        last_modified: Some(ts(at)),
        size: Some(etag.len() as i64),
        is_latest: Some(false),
    }
}

pub fn marker_record(key: &str, version_id: &str, at: &str) -> RawRecord {
    RawRecord {
        key: key.to_string(),
        version_id: Some(version_id.to_string()),
        etag: None,
        last_modified: Some(ts(at)),
        size: None,
        is_latest: Some(false),
    }
}

/// Registry with `memory://<name>` endpoints, in the given order.
pub fn registry(names: &[&str]) -> ZoneRegistry {
    ZoneRegistry::new(
        names
            .iter()
            .map(|n| Zone::new(*n, format!("memory://{n}")))
            .collect(),
    )
    .unwrap_or_else(|e| panic!("bad test registry {names:?}: {e}"))
}

/// One fresh [`MemoryStore`] per zone name, in order.
pub fn memory_zones(names: &[&str]) -> Vec<(String, Arc<MemoryStore>)> {
    names
        .iter()
        .map(|n| (n.to_string(), Arc::new(MemoryStore::new(*n))))
        .collect()
}

/// Checker over memory stores with a 2s fetch deadline.
pub fn checker(zones: &[(String, Arc<MemoryStore>)], default_bucket: Option<&str>) -> ZoneChecker {
    let names: Vec<&str> = zones.iter().map(|(n, _)| n.as_str()).collect();
    let mut stores = StoreSet::new();
    for (name, store) in zones {
        stores.insert(name.clone(), Arc::clone(store) as Arc<dyn ObjectStore>);
    }
    ZoneChecker::new(
        registry(&names),
        stores,
        default_bucket.map(str::to_string),
        Duration::from_secs(2),
    )
}
