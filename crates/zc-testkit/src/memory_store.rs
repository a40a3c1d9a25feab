use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use zc_reconcile::{entries_for_key, latest_in_zone, RawRecord, RawVersionListing};
use zc_store::{FolderObject, FolderPage, ObjectStore, StoreError};

/// Minimal fake object store used ONLY for tests.
///
/// Holds raw version / delete-marker records per bucket. Version listings are
/// prefix queries like the real thing, so callers still have to filter for
/// the exact key. Folder listings show each key whose newest record is a
/// version.
pub struct MemoryStore {
    zone: String,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    buckets: BTreeMap<String, RawVersionListing>,
    failure: Option<StoreError>,
    delay: Option<Duration>,
    page_size: Option<usize>,
    version_list_calls: usize,
    folder_page_calls: usize,
    deletes: usize,
}

impl MemoryStore {
    pub fn new(zone: impl Into<String>) -> Self {
        Self {
            zone: zone.into(),
            inner: Mutex::new(Inner::default()),
        }
    }

    fn with_inner<T>(&self, f: impl FnOnce(&mut Inner) -> T) -> T {
        let mut guard = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    pub fn put_version(&self, bucket: &str, record: RawRecord) {
        self.with_inner(|i| {
            i.buckets
                .entry(bucket.to_string())
                .or_default()
                .versions
                .push(record)
        });
    }

    pub fn put_delete_marker(&self, bucket: &str, record: RawRecord) {
        self.with_inner(|i| {
            i.buckets
                .entry(bucket.to_string())
                .or_default()
                .delete_markers
                .push(record)
        });
    }

    /// Every call fails with `err` until [`MemoryStore::recover`].
    pub fn fail_with(&self, err: StoreError) {
        self.with_inner(|i| i.failure = Some(err));
    }

    pub fn recover(&self) {
        self.with_inner(|i| i.failure = None);
    }

    /// Sleep before answering any call.
    pub fn set_delay(&self, delay: Duration) {
        self.with_inner(|i| i.delay = Some(delay));
    }

    /// Split folder listings into pages of `n` entries (folders + objects).
    pub fn set_page_size(&self, n: usize) {
        self.with_inner(|i| i.page_size = Some(n.max(1)));
    }

    pub fn version_list_calls(&self) -> usize {
        self.with_inner(|i| i.version_list_calls)
    }

    pub fn folder_page_calls(&self) -> usize {
        self.with_inner(|i| i.folder_page_calls)
    }

    /// Successful `delete_object` calls so far.
    pub fn deletes(&self) -> usize {
        self.with_inner(|i| i.deletes)
    }

    async fn enter(&self) -> Result<(), StoreError> {
        let (delay, failure) = self.with_inner(|i| (i.delay, i.failure.clone()));
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Folder view: (common prefixes, objects) directly under `prefix`, sorted.
    fn folder_entries(&self, bucket: &str, prefix: &str) -> Vec<FolderRow> {
        let listing = self.with_inner(|i| i.buckets.get(bucket).cloned().unwrap_or_default());

        let mut keys: Vec<&str> = listing
            .versions
            .iter()
            .chain(listing.delete_markers.iter())
            .map(|r| r.key.as_str())
            .filter(|k| k.starts_with(prefix))
            .collect();
        keys.sort_unstable();
        keys.dedup();

        let mut rows: BTreeMap<String, FolderRow> = BTreeMap::new();
        for key in keys {
            let rest = &key[prefix.len()..];
            if let Some(idx) = rest.find('/') {
                let cp = format!("{prefix}{}", &rest[..=idx]);
                rows.insert(cp.clone(), FolderRow::Prefix(cp));
                continue;
            }
            let entries = entries_for_key(&listing, key);
            if let Some(head) = latest_in_zone(&entries) {
                if !head.is_delete_marker() {
                    rows.insert(
                        key.to_string(),
                        FolderRow::Object(FolderObject {
                            key: key.to_string(),
                            last_modified: Some(head.last_modified),
                            size: head.size(),
                        }),
                    );
                }
            }
        }
        rows.into_values().collect()
    }
}

enum FolderRow {
    Prefix(String),
    Object(FolderObject),
}

#[async_trait::async_trait]
impl ObjectStore for MemoryStore {
    async fn list_versions(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<RawVersionListing, StoreError> {
        self.with_inner(|i| i.version_list_calls += 1);
        self.enter().await?;

        let listing = self.with_inner(|i| i.buckets.get(bucket).cloned());
        let Some(listing) = listing else {
            return Err(StoreError::Service {
                code: Some("NoSuchBucket".to_string()),
                message: "The specified bucket does not exist".to_string(),
            });
        };
        Ok(RawVersionListing {
            versions: listing
                .versions
                .into_iter()
                .filter(|r| r.key.starts_with(key))
                .collect(),
            delete_markers: listing
                .delete_markers
                .into_iter()
                .filter(|r| r.key.starts_with(key))
                .collect(),
        })
    }

    async fn list_folder_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
    ) -> Result<FolderPage, StoreError> {
        self.with_inner(|i| i.folder_page_calls += 1);
        self.enter().await?;

        let rows = self.folder_entries(bucket, prefix);
        let start = match continuation {
            Some(tok) => tok.parse::<usize>().map_err(|_| StoreError::Service {
                code: Some("InvalidArgument".to_string()),
                message: format!("bad continuation token {tok:?}"),
            })?,
            None => 0,
        };
        let page_size = self.with_inner(|i| i.page_size).unwrap_or(usize::MAX);
        let total = rows.len();
        let end = start.saturating_add(page_size).min(total);

        let mut page = FolderPage::default();
        for row in rows.into_iter().skip(start).take(end.saturating_sub(start)) {
            match row {
                FolderRow::Prefix(p) => page.common_prefixes.push(p),
                FolderRow::Object(o) => page.objects.push(o),
            }
        }
        if end < total {
            page.next_continuation_token = Some(end.to_string());
        }
        Ok(page)
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
        ttl: Duration,
    ) -> Result<String, StoreError> {
        self.enter().await?;
        let mut url = format!(
            "memory://{}/{bucket}/{key}?op=get&expires={}",
            self.zone,
            ttl.as_secs()
        );
        if let Some(v) = version_id {
            url.push_str(&format!("&versionId={v}"));
        }
        Ok(url)
    }

    async fn presign_put(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        ttl: Duration,
    ) -> Result<String, StoreError> {
        self.enter().await?;
        Ok(format!(
            "memory://{}/{bucket}/{key}?op=put&content-type={content_type}&expires={}",
            self.zone,
            ttl.as_secs()
        ))
    }

    /// Versioned-bucket semantics: the key gets a new latest delete marker.
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        self.enter().await?;
        self.with_inner(|i| {
            let Some(listing) = i.buckets.get_mut(bucket) else {
                return Err(StoreError::Service {
                    code: Some("NoSuchBucket".to_string()),
                    message: "The specified bucket does not exist".to_string(),
                });
            };
            for r in listing
                .versions
                .iter_mut()
                .chain(listing.delete_markers.iter_mut())
                .filter(|r| r.key == key)
            {
                r.is_latest = Some(false);
            }
            i.deletes += 1;
            listing.delete_markers.push(RawRecord {
                key: key.to_string(),
                version_id: Some(format!("dm-{}", i.deletes)),
                etag: None,
                last_modified: Some(chrono::Utc::now()),
                size: None,
                is_latest: Some(true),
            });
            Ok(())
        })
    }
}
