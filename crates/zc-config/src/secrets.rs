//! Secret resolution for object-store credentials.
//!
//! # Contract
//! - Config YAML stores only env var NAMES (`credentials.access_key_env`).
//! - Values are resolved once at startup and passed into store constructors.
//! - `Debug` redacts values. Error messages name the env var, never the value.

use anyhow::{bail, Result};
use serde_json::Value;

pub const DEFAULT_ACCESS_KEY_ENV: &str = "RGW_ACCESS_KEY";
pub const DEFAULT_SECRET_KEY_ENV: &str = "RGW_SECRET_KEY";
/// Consulted when the primary variable is absent or empty.
pub const FALLBACK_ACCESS_KEY_ENV: &str = "S3_ACCESS_KEY";
pub const FALLBACK_SECRET_KEY_ENV: &str = "S3_SECRET_KEY";

/// Shared S3 credentials used for every zone.
#[derive(Clone, PartialEq, Eq)]
pub struct StoreCredentials {
    pub access_key: String,
    pub secret_key: String,
}

impl std::fmt::Debug for StoreCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreCredentials")
            .field("access_key", &"<REDACTED>")
            .field("secret_key", &"<REDACTED>")
            .finish()
    }
}

fn env_name<'a>(config_json: &'a Value, pointer: &str, default: &'a str) -> &'a str {
    config_json
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
}

fn lookup_non_empty(env: &dyn Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    env(name).filter(|v| !v.trim().is_empty())
}

/// Resolve credentials through `env` (normally `std::env::var(..).ok()`).
pub fn resolve_store_credentials(
    config_json: &Value,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<StoreCredentials> {
    let access_var = env_name(config_json, "/credentials/access_key_env", DEFAULT_ACCESS_KEY_ENV);
    let secret_var = env_name(config_json, "/credentials/secret_key_env", DEFAULT_SECRET_KEY_ENV);

    let access_key = lookup_non_empty(env, access_var)
        .or_else(|| lookup_non_empty(env, FALLBACK_ACCESS_KEY_ENV));
    let secret_key = lookup_non_empty(env, secret_var)
        .or_else(|| lookup_non_empty(env, FALLBACK_SECRET_KEY_ENV));

    match (access_key, secret_key) {
        (Some(access_key), Some(secret_key)) => Ok(StoreCredentials {
            access_key,
            secret_key,
        }),
        (None, _) => bail!(
            "SECRETS_MISSING: object-store access key not found; set {access_var} (or {FALLBACK_ACCESS_KEY_ENV})"
        ),
        (_, None) => bail!(
            "SECRETS_MISSING: object-store secret key not found; set {secret_var} (or {FALLBACK_SECRET_KEY_ENV})"
        ),
    }
}
