//! zc-store
//!
//! Object-store boundary for zonecheck.
//!
//! - [`ObjectStore`] is the per-zone client contract. [`S3Store`] implements
//!   it over the S3 API; tests use the in-memory store from `zc-testkit`.
//! - [`fetch_zone`] / [`fetch_all_zones`] turn one listing per zone into a
//!   [`zc_reconcile::ZoneResult`], converting every failure into a zone-scoped
//!   error so one unreachable zone never aborts a comparison.
//! - [`ZoneChecker`] ties registry, clients and defaults together and runs a
//!   full reconciliation for one key.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use zc_reconcile::RawVersionListing;

mod check;
mod fetch;
mod folder;
mod s3;

pub use check::{CheckError, CheckRequest, ZoneChecker};
pub use fetch::{fetch_all_zones, fetch_zone};
pub use folder::{list_folder, normalize_prefix, FolderItem, FolderListing};
pub use s3::S3Store;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The store answered with an error (NoSuchBucket, AccessDenied, ...).
    #[error("{message}")]
    Service {
        code: Option<String>,
        message: String,
    },
    /// The request never got a store answer (DNS, TLS, connection reset, ...).
    #[error("transport error: {0}")]
    Transport(String),
    #[error("presign error: {0}")]
    Presign(String),
    #[error("no response within {}s", .0.as_secs())]
    Timeout(Duration),
}

// ---------------------------------------------------------------------------
// Folder listing page
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderObject {
    pub key: String,
    pub last_modified: Option<DateTime<Utc>>,
    pub size: Option<u64>,
}

/// One page of a delimiter (`/`) listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderPage {
    /// Full common prefixes, e.g. `photos/2024/`.
    pub common_prefixes: Vec<String>,
    pub objects: Vec<FolderObject>,
    /// Set only when the listing was truncated.
    pub next_continuation_token: Option<String>,
}

// ---------------------------------------------------------------------------
// Store contract
// ---------------------------------------------------------------------------

/// Per-zone object-store client.
///
/// Implementations must be `Send + Sync`; one instance per zone is shared by
/// all requests.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Every version and delete marker whose key starts with `key`.
    ///
    /// This is a prefix query: callers must discard records for other keys.
    async fn list_versions(&self, bucket: &str, key: &str)
        -> Result<RawVersionListing, StoreError>;

    async fn list_folder_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
    ) -> Result<FolderPage, StoreError>;

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
        ttl: Duration,
    ) -> Result<String, StoreError>;

    async fn presign_put(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        ttl: Duration,
    ) -> Result<String, StoreError>;

    /// Unversioned delete of `key`. On a versioned bucket this adds a delete
    /// marker on top of the key's history; no version is removed.
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// StoreSet
// ---------------------------------------------------------------------------

/// Zone name -> client. Cheap to clone.
#[derive(Clone, Default)]
pub struct StoreSet {
    stores: Vec<(String, Arc<dyn ObjectStore>)>,
}

impl StoreSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any client already registered under `zone`.
    pub fn insert(&mut self, zone: impl Into<String>, store: Arc<dyn ObjectStore>) {
        let zone = zone.into();
        self.stores.retain(|(name, _)| *name != zone);
        self.stores.push((zone, store));
    }

    pub fn with_store(mut self, zone: impl Into<String>, store: Arc<dyn ObjectStore>) -> Self {
        self.insert(zone, store);
        self
    }

    pub fn get(&self, zone: &str) -> Option<Arc<dyn ObjectStore>> {
        self.stores
            .iter()
            .find(|(name, _)| name == zone)
            .map(|(_, s)| Arc::clone(s))
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}

impl std::fmt::Debug for StoreSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.stores.iter().map(|(name, _)| name))
            .finish()
    }
}
