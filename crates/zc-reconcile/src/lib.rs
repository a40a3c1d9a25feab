//! zc-reconcile
//!
//! Cross-zone version reconciliation engine.
//!
//! Given the raw version / delete-marker listing of one key from every
//! configured zone, the engine computes:
//! - each zone's latest entry
//! - the global latest entry across zones
//! - whether the zones agree (consistency verdict)
//! - a recommended zone to download content from
//! - a Latest / Outdated / Missing / Unknown state per zone
//!
//! Deterministic, pure logic. No IO. No store calls.

mod engine;
mod listing;
mod types;
pub mod wire;

pub use engine::{
    classify_zone, global_latest, is_consistent, latest_in_zone, recommended_zone, reconcile,
    zone_latest, GlobalPick,
};
pub use listing::{
    entries_for_key, normalize_delete_marker, normalize_version, strip_etag_quotes, RawRecord,
    RawVersionListing,
};
pub use types::*;
