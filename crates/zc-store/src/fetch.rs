use std::time::Duration;

use futures_util::future::join_all;
use tracing::{debug, warn};
use zc_config::ZoneRegistry;
use zc_reconcile::{entries_for_key, ZoneResult};

use crate::{ObjectStore, StoreError, StoreSet};

/// List `key` in one zone and normalize the result.
///
/// Never fails: a store error or an expired `deadline` becomes
/// [`ZoneResult::failed`] carrying the error text.
pub async fn fetch_zone(
    store: &dyn ObjectStore,
    zone_name: &str,
    bucket: &str,
    key: &str,
    deadline: Duration,
) -> ZoneResult {
    let listed = match tokio::time::timeout(deadline, store.list_versions(bucket, key)).await {
        Ok(res) => res,
        Err(_elapsed) => Err(StoreError::Timeout(deadline)),
    };

    match listed {
        Ok(listing) => {
            let entries = entries_for_key(&listing, key);
            debug!(zone = zone_name, key, entries = entries.len(), "zone fetched");
            ZoneResult::entries(zone_name, entries)
        }
        Err(err) => {
            warn!(zone = zone_name, bucket, key, error = %err, "zone fetch failed");
            ZoneResult::failed(zone_name, err.to_string())
        }
    }
}

/// Fetch every registry zone concurrently; results come back in registry order.
pub async fn fetch_all_zones(
    registry: &ZoneRegistry,
    stores: &StoreSet,
    bucket: &str,
    key: &str,
    deadline: Duration,
) -> Vec<ZoneResult> {
    let fetches = registry.iter().map(|zone| async move {
        match stores.get(&zone.name) {
            Some(store) => fetch_zone(store.as_ref(), &zone.name, bucket, key, deadline).await,
            None => ZoneResult::failed(zone.name.as_str(), "no store client configured for zone"),
        }
    });
    join_all(fetches).await
}
