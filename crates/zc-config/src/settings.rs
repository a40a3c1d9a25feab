//! Typed service settings.
//!
//! Resolution order for every value: environment variable (if set and
//! non-empty), then merged YAML, then built-in default.
//!
//! | env var                              | YAML pointer                  | default            |
//! |--------------------------------------|-------------------------------|--------------------|
//! | `S3_ZONES`                           | `/zones` (list of name/endpoint) | required        |
//! | `BUCKET`                             | `/bucket`                     | none               |
//! | `PRESIGN_TTL`                        | `/presign/download_ttl_secs`  | 600                |
//! | `PRESIGN_UPLOAD_TTL`                 | `/presign/upload_ttl_secs`    | 10800              |
//! | `ZC_FETCH_TIMEOUT_SECS`              | `/fetch/timeout_secs`         | 10                 |
//! | `OIDC_ISSUER` / `KEYCLOAK_URL`       | `/auth/oidc_issuer`           | required unless auth disabled |
//! | `OIDC_AUDIENCE` / `KEYCLOAK_AUDIENCE`| `/auth/oidc_audience`         | `ceph-rgw-browser` |
//! | `ZC_AUTH_DISABLED`                   | `/auth/disabled`              | false              |
//! | `ZC_DAEMON_ADDR`                     | `/server/addr`                | `127.0.0.1:8899`   |
//! | `AWS_REGION`                         | `/region`                     | `us-east-1`        |

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::secrets::{resolve_store_credentials, StoreCredentials};
use crate::zones::{parse_zone_list, Zone, ZoneRegistry};
use crate::{load_layered_yaml, LoadedConfig};

pub const DEFAULT_PRESIGN_TTL_SECS: u64 = 600;
/// Large uploads over slow links need far longer than downloads.
pub const DEFAULT_PRESIGN_UPLOAD_TTL_SECS: u64 = 10_800;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_OIDC_AUDIENCE: &str = "ceph-rgw-browser";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8899";

/// YAML shape. Every field is optional so partial layers merge cleanly.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    zones: Vec<Zone>,
    bucket: Option<String>,
    region: Option<String>,
    presign: PresignSection,
    fetch: FetchSection,
    auth: AuthSection,
    server: ServerSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct PresignSection {
    download_ttl_secs: Option<u64>,
    upload_ttl_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct FetchSection {
    timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct AuthSection {
    disabled: bool,
    oidc_issuer: Option<String>,
    oidc_audience: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ServerSection {
    addr: Option<String>,
    cors_origins: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthSettings {
    /// Local development only. Every request is treated as authenticated.
    Disabled,
    Oidc { issuer: String, audience: String },
}

impl AuthSettings {
    /// Keycloak-style JWKS location for an OIDC issuer.
    pub fn jwks_url(&self) -> Option<String> {
        match self {
            AuthSettings::Disabled => None,
            AuthSettings::Oidc { issuer, .. } => Some(format!(
                "{}/protocol/openid-connect/certs",
                issuer.trim_end_matches('/')
            )),
        }
    }
}

/// Fully resolved configuration. Built once at startup, read-only afterwards.
#[derive(Debug, Clone)]
pub struct Settings {
    pub registry: ZoneRegistry,
    /// Used when a request names no bucket. `None` makes such requests fail.
    pub default_bucket: Option<String>,
    pub region: String,
    pub presign_ttl: Duration,
    pub presign_upload_ttl: Duration,
    /// Deadline for one zone's version listing.
    pub fetch_timeout: Duration,
    pub auth: AuthSettings,
    pub credentials: StoreCredentials,
    pub bind_addr: SocketAddr,
    /// Empty means any origin.
    pub cors_origins: Vec<String>,
    pub config_hash: String,
}

impl Settings {
    /// Load YAML layers (possibly none) and resolve against the process environment.
    pub fn load(paths: &[&str]) -> Result<Self> {
        let loaded = load_layered_yaml(paths)?;
        Self::resolve(&loaded, &|k| std::env::var(k).ok())
    }

    pub fn resolve(loaded: &LoadedConfig, env: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let file: FileConfig = serde_json::from_value(loaded.config_json.clone())
            .context("CONFIG_INVALID: config does not match the expected shape")?;
        let var = |name: &str| env(name).filter(|v| !v.trim().is_empty());

        let zones = match var("S3_ZONES") {
            Some(raw) => parse_zone_list(&raw),
            None => file.zones.clone(),
        };
        if zones.is_empty() {
            bail!(
                "CONFIG_NO_ZONES: S3_ZONES is not set. Examples:\n  \
                 S3_ZONES=zone1=https://ceph-zone1.example.com,zone2=https://ceph-zone2.example.com\n  \
                 S3_ZONES=https://ceph-zone1.example.com,https://ceph-zone2.example.com"
            );
        }
        let registry = ZoneRegistry::new(zones)?;

        let default_bucket = var("BUCKET")
            .or(file.bucket.clone())
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty());

        let region = var("AWS_REGION")
            .or(file.region.clone())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let presign_ttl = secs(
            var("PRESIGN_TTL"),
            file.presign.download_ttl_secs,
            DEFAULT_PRESIGN_TTL_SECS,
            "PRESIGN_TTL",
        )?;
        let presign_upload_ttl = secs(
            var("PRESIGN_UPLOAD_TTL"),
            file.presign.upload_ttl_secs,
            DEFAULT_PRESIGN_UPLOAD_TTL_SECS,
            "PRESIGN_UPLOAD_TTL",
        )?;
        let fetch_timeout = secs(
            var("ZC_FETCH_TIMEOUT_SECS"),
            file.fetch.timeout_secs,
            DEFAULT_FETCH_TIMEOUT_SECS,
            "ZC_FETCH_TIMEOUT_SECS",
        )?;

        let auth_disabled = match var("ZC_AUTH_DISABLED") {
            Some(v) => parse_flag(&v).with_context(|| format!("ZC_AUTH_DISABLED={v}"))?,
            None => file.auth.disabled,
        };
        let auth = if auth_disabled {
            AuthSettings::Disabled
        } else {
            let issuer = var("OIDC_ISSUER")
                .or_else(|| var("KEYCLOAK_URL"))
                .or(file.auth.oidc_issuer.clone())
                .context("CONFIG_NO_OIDC_ISSUER: set OIDC_ISSUER (or KEYCLOAK_URL)")?;
            let audience = var("OIDC_AUDIENCE")
                .or_else(|| var("KEYCLOAK_AUDIENCE"))
                .or(file.auth.oidc_audience.clone())
                .unwrap_or_else(|| DEFAULT_OIDC_AUDIENCE.to_string());
            AuthSettings::Oidc { issuer, audience }
        };

        let credentials = resolve_store_credentials(&loaded.config_json, env)?;

        let addr_raw = var("ZC_DAEMON_ADDR")
            .or(file.server.addr.clone())
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = addr_raw
            .parse()
            .with_context(|| format!("CONFIG_INVALID: bind address '{addr_raw}'"))?;

        Ok(Self {
            registry,
            default_bucket,
            region,
            presign_ttl,
            presign_upload_ttl,
            fetch_timeout,
            auth,
            credentials,
            bind_addr,
            cors_origins: file.server.cors_origins,
            config_hash: loaded.config_hash.clone(),
        })
    }
}

fn secs(env_raw: Option<String>, file: Option<u64>, default: u64, name: &str) -> Result<Duration> {
    let n = match env_raw {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .with_context(|| {
                format!("CONFIG_INVALID: {name}='{raw}' is not a whole number of seconds")
            })?,
        None => file.unwrap_or(default),
    };
    if n == 0 {
        bail!("CONFIG_INVALID: {name} must be greater than zero");
    }
    Ok(Duration::from_secs(n))
}

fn parse_flag(v: &str) -> Result<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("expected a boolean flag, got '{other}'"),
    }
}
