//! zc-config
//!
//! Startup configuration for zonecheck.
//!
//! - YAML documents are merged in order (later documents override earlier).
//! - Literal secrets in YAML are refused; credentials are referenced by env var NAME.
//! - The merged document is canonicalized and hashed so two processes can
//!   prove they run with the same configuration.
//! - Deployment environment variables (`S3_ZONES`, `BUCKET`,
//!   ...) override the YAML; see [`settings`].

use anyhow::{bail, Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;

pub mod secrets;
pub mod settings;
pub mod zones;

pub use secrets::StoreCredentials;
pub use settings::{AuthSettings, Settings};
pub use zones::{parse_zone_list, Zone, ZoneRegistry};

/// If any leaf string value in the merged config starts with one of these,
/// loading aborts with CONFIG_SECRET_DETECTED.
const SECRET_PREFIXES: &[&str] = &[
    "AKIA",       // AWS access key ID
    "ASIA",       // AWS temporary access key ID
    "-----BEGIN", // PEM private keys
    "eyJ",        // serialized JWT
    "ghp_",       // GitHub PAT
    "glpat-",     // GitLab PAT
    "xoxb-",      // Slack bot token
];

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let raw =
            fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }

    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        // An empty document parses as null; treat it as "no overrides".
        if v_yaml.is_null() {
            continue;
        }
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        merged = deep_merge(merged, v_json);
    }

    enforce_no_secret_literals(&merged)?;

    let canonical_json = canonicalize_json(&merged)?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        (_, b_other) => b_other,
    }
}

/// Compact JSON with keys sorted at every level, so the hash does not depend
/// on YAML key order. `serde_json::Map` is a `BTreeMap` (no `preserve_order`),
/// so plain serialization already emits sorted keys.
fn canonicalize_json(v: &Value) -> Result<String> {
    serde_json::to_string(v).context("canonical json serialize failed")
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    let mut leaves = Vec::new();
    collect_leaf_pointers(v, "", &mut leaves);

    for ptr in leaves {
        if let Some(s) = v.pointer(&ptr).and_then(Value::as_str) {
            if looks_like_secret(s) {
                bail!("CONFIG_SECRET_DETECTED leaf={} value=REDACTED", ptr);
            }
        }
    }
    Ok(())
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    if t.len() < 8 {
        return false;
    }
    SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}

fn collect_leaf_pointers(v: &Value, prefix: &str, out: &mut Vec<String>) {
    match v {
        Value::Object(map) => {
            for (k, vv) in map.iter() {
                let next = format!("{}/{}", prefix, escape_pointer_token(k));
                collect_leaf_pointers(vv, &next, out);
            }
        }
        Value::Array(arr) => {
            for (i, vv) in arr.iter().enumerate() {
                let next = format!("{}/{}", prefix, i);
                collect_leaf_pointers(vv, &next, out);
            }
        }
        _ => out.push(prefix.to_string()),
    }
}

fn escape_pointer_token(s: &str) -> String {
    s.replace('~', "~0").replace('/', "~1")
}
