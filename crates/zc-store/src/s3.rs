//! [`ObjectStore`] over the S3 API (Ceph RGW, MinIO, AWS).
//!
//! One client per zone: explicit endpoint, static credentials, path-style
//! addressing (RGW multi-site deployments rarely have wildcard DNS).

use std::sync::Arc;
use std::time::Duration;

use aws_credential_types::Credentials;
use aws_sdk_s3::config::{BehaviorVersion, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::DateTime as SmithyDateTime;
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use tracing::debug;
use zc_config::{StoreCredentials, Zone, ZoneRegistry};
use zc_reconcile::{RawRecord, RawVersionListing};

use crate::{FolderObject, FolderPage, ObjectStore, StoreError, StoreSet};

pub struct S3Store {
    zone: String,
    client: Client,
}

impl S3Store {
    pub fn connect(zone: &Zone, credentials: &StoreCredentials, region: &str) -> Self {
        let creds = Credentials::new(
            credentials.access_key.clone(),
            credentials.secret_key.clone(),
            None,
            None,
            "zonecheck-static",
        );
        let conf = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .endpoint_url(zone.endpoint.clone())
            .credentials_provider(creds)
            .force_path_style(true)
            .build();
        Self {
            zone: zone.name.clone(),
            client: Client::from_conf(conf),
        }
    }

    /// One client per registry zone, in registry order.
    pub fn connect_all(
        registry: &ZoneRegistry,
        credentials: &StoreCredentials,
        region: &str,
    ) -> StoreSet {
        let mut set = StoreSet::new();
        for zone in registry.iter() {
            set.insert(
                zone.name.clone(),
                Arc::new(Self::connect(zone, credentials, region)),
            );
        }
        set
    }
}

fn to_chrono(ts: Option<&SmithyDateTime>) -> Option<DateTime<Utc>> {
    ts.and_then(|t| DateTime::<Utc>::from_timestamp(t.secs(), t.subsec_nanos()))
}

fn sdk_error<E, R>(err: SdkError<E, R>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    match err.as_service_error() {
        Some(service) => StoreError::Service {
            code: service.code().map(str::to_string),
            message: service.message().unwrap_or("S3 Error").to_string(),
        },
        None => StoreError::Transport(DisplayErrorContext(&err).to_string()),
    }
}

#[async_trait::async_trait]
impl ObjectStore for S3Store {
    async fn list_versions(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<RawVersionListing, StoreError> {
        let mut listing = RawVersionListing::default();
        let mut key_marker: Option<String> = None;
        let mut version_marker: Option<String> = None;

        loop {
            let out = self
                .client
                .list_object_versions()
                .bucket(bucket)
                .prefix(key)
                .set_key_marker(key_marker.take())
                .set_version_id_marker(version_marker.take())
                .send()
                .await
                .map_err(sdk_error)?;

            for v in out.versions() {
                listing.versions.push(RawRecord {
                    key: v.key().unwrap_or_default().to_string(),
                    version_id: v.version_id().map(str::to_string),
                    etag: v.e_tag().map(str::to_string),
                    last_modified: to_chrono(v.last_modified()),
                    size: v.size(),
                    is_latest: v.is_latest(),
                });
            }
            for d in out.delete_markers() {
                listing.delete_markers.push(RawRecord {
                    key: d.key().unwrap_or_default().to_string(),
                    version_id: d.version_id().map(str::to_string),
                    etag: None,
                    last_modified: to_chrono(d.last_modified()),
                    size: None,
                    is_latest: d.is_latest(),
                });
            }

            let truncated = out.is_truncated().unwrap_or(false);
            let next_key = out.next_key_marker().map(str::to_string);
            let next_version = out.next_version_id_marker().map(str::to_string);
            if !truncated || next_key.is_none() {
                break;
            }
            key_marker = next_key;
            version_marker = next_version;
        }

        debug!(
            zone = %self.zone,
            bucket,
            key,
            versions = listing.versions.len(),
            delete_markers = listing.delete_markers.len(),
            "list_object_versions"
        );
        Ok(listing)
    }

    async fn list_folder_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
    ) -> Result<FolderPage, StoreError> {
        let mut req = self.client.list_objects_v2().bucket(bucket).delimiter("/");
        if !prefix.is_empty() {
            req = req.prefix(prefix);
        }
        if let Some(token) = continuation {
            req = req.continuation_token(token);
        }
        let out = req.send().await.map_err(sdk_error)?;

        let common_prefixes = out
            .common_prefixes()
            .iter()
            .filter_map(|cp| cp.prefix().map(str::to_string))
            .collect();
        let objects = out
            .contents()
            .iter()
            .map(|o| FolderObject {
                key: o.key().unwrap_or_default().to_string(),
                last_modified: to_chrono(o.last_modified()),
                size: o.size().and_then(|s| u64::try_from(s).ok()),
            })
            .collect();
        let next_continuation_token = if out.is_truncated().unwrap_or(false) {
            out.next_continuation_token().map(str::to_string)
        } else {
            None
        };

        Ok(FolderPage {
            common_prefixes,
            objects,
            next_continuation_token,
        })
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
        ttl: Duration,
    ) -> Result<String, StoreError> {
        let cfg =
            PresigningConfig::expires_in(ttl).map_err(|e| StoreError::Presign(e.to_string()))?;
        let presigned = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .set_version_id(version_id.map(str::to_string))
            .presigned(cfg)
            .await
            .map_err(sdk_error)?;
        Ok(presigned.uri().to_string())
    }

    async fn presign_put(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        ttl: Duration,
    ) -> Result<String, StoreError> {
        let cfg =
            PresigningConfig::expires_in(ttl).map_err(|e| StoreError::Presign(e.to_string()))?;
        let presigned = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .presigned(cfg)
            .await
            .map_err(sdk_error)?;
        Ok(presigned.uri().to_string())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        let out = self
            .client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(sdk_error)?;
        debug!(
            zone = %self.zone,
            bucket,
            key,
            delete_marker = out.delete_marker().unwrap_or(false),
            "object deleted"
        );
        Ok(())
    }
}
