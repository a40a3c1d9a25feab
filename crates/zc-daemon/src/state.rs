//! Shared runtime state for zc-daemon.
//!
//! Everything here is built once at startup and read-only afterwards.
//! Handlers receive `State<Arc<AppState>>` from Axum.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use zc_config::{AuthSettings, Settings};
use zc_store::{StoreSet, ZoneChecker};

use crate::auth::{JwksVerifier, TokenVerifier};

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

/// Static build metadata included in health responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self {
            service: "zc-daemon",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub build: BuildInfo,
    /// Registry, per-zone clients, default bucket.
    pub checker: Arc<ZoneChecker>,
    pub presign_ttl: Duration,
    pub presign_upload_ttl: Duration,
    /// `None` disables authentication (local development).
    pub verifier: Option<Arc<dyn TokenVerifier>>,
}

impl AppState {
    /// Unauthenticated state with the default presign lifetimes.
    pub fn new(checker: ZoneChecker) -> Self {
        Self {
            build: BuildInfo::default(),
            checker: Arc::new(checker),
            presign_ttl: Duration::from_secs(zc_config::settings::DEFAULT_PRESIGN_TTL_SECS),
            presign_upload_ttl: Duration::from_secs(
                zc_config::settings::DEFAULT_PRESIGN_UPLOAD_TTL_SECS,
            ),
            verifier: None,
        }
    }

    pub fn with_verifier(mut self, verifier: Arc<dyn TokenVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn with_presign_ttls(mut self, download: Duration, upload: Duration) -> Self {
        self.presign_ttl = download;
        self.presign_upload_ttl = upload;
        self
    }

    pub fn from_settings(settings: &Settings, stores: StoreSet) -> Self {
        let st = Self::new(ZoneChecker::from_settings(settings, stores))
            .with_presign_ttls(settings.presign_ttl, settings.presign_upload_ttl);
        match (&settings.auth, settings.auth.jwks_url()) {
            (AuthSettings::Oidc { audience, .. }, Some(url)) => {
                st.with_verifier(Arc::new(JwksVerifier::new(url, audience.clone())))
            }
            _ => st,
        }
    }
}
