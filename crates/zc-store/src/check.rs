use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::info;
use zc_config::{Settings, ZoneRegistry};
use zc_reconcile::{reconcile, ReconciliationReport};

use crate::{fetch_all_zones, ObjectStore, StoreSet};

/// Request-level failures. Raised before any zone is contacted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckError {
    #[error("Missing 'bucket' and no BUCKET default set.")]
    NoTargetStore,
    #[error("Zone '{0}' not found")]
    UnknownZone(String),
    #[error("Missing 'key'")]
    EmptyKey,
}

#[derive(Debug, Clone, Copy)]
pub struct CheckRequest<'a> {
    pub key: &'a str,
    pub current_zone: &'a str,
    /// Overrides the configured default bucket.
    pub bucket: Option<&'a str>,
}

/// Registry, per-zone clients and request defaults, assembled once at startup.
#[derive(Debug, Clone)]
pub struct ZoneChecker {
    registry: ZoneRegistry,
    stores: StoreSet,
    default_bucket: Option<String>,
    fetch_timeout: Duration,
}

impl ZoneChecker {
    pub fn new(
        registry: ZoneRegistry,
        stores: StoreSet,
        default_bucket: Option<String>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            stores,
            default_bucket,
            fetch_timeout,
        }
    }

    pub fn from_settings(settings: &Settings, stores: StoreSet) -> Self {
        Self::new(
            settings.registry.clone(),
            stores,
            settings.default_bucket.clone(),
            settings.fetch_timeout,
        )
    }

    pub fn registry(&self) -> &ZoneRegistry {
        &self.registry
    }

    pub fn default_bucket(&self) -> Option<&str> {
        self.default_bucket.as_deref()
    }

    /// Explicit bucket if non-empty, else the configured default.
    pub fn bucket<'a>(&'a self, explicit: Option<&'a str>) -> Result<&'a str, CheckError> {
        explicit
            .filter(|b| !b.is_empty())
            .or(self.default_bucket())
            .ok_or(CheckError::NoTargetStore)
    }

    /// Client for a zone named by the caller.
    pub fn store(&self, zone: &str) -> Result<Arc<dyn ObjectStore>, CheckError> {
        if !self.registry.contains(zone) {
            return Err(CheckError::UnknownZone(zone.to_string()));
        }
        self.stores
            .get(zone)
            .ok_or_else(|| CheckError::UnknownZone(zone.to_string()))
    }

    /// Reconcile `req.key` across every configured zone.
    ///
    /// Only request validation fails here; per-zone fetch failures are
    /// reported inside the returned report.
    pub async fn check(&self, req: CheckRequest<'_>) -> Result<ReconciliationReport, CheckError> {
        let bucket = self.bucket(req.bucket)?;
        if req.key.is_empty() {
            return Err(CheckError::EmptyKey);
        }
        if !self.registry.contains(req.current_zone) {
            return Err(CheckError::UnknownZone(req.current_zone.to_string()));
        }

        let started = Instant::now();
        let results =
            fetch_all_zones(&self.registry, &self.stores, bucket, req.key, self.fetch_timeout)
                .await;
        let report = reconcile(&results, req.current_zone);

        info!(
            bucket,
            key = req.key,
            consistent = report.consistent,
            recommended = report.recommended_zone.as_deref().unwrap_or("-"),
            unknown_zones = report.unknown_zones(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "consistency check"
        );
        Ok(report)
    }
}
