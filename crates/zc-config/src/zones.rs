//! Zone registry: the ordered list of object-storage endpoints.
//!
//! Order matters. It is the report order and the tie-break order when two
//! zones hold entries with the same timestamp.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub name: String,
    pub endpoint: String,
}

impl Zone {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
        }
    }
}

/// Immutable after construction. Built once at startup and shared read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneRegistry {
    zones: Vec<Zone>,
}

impl ZoneRegistry {
    /// Rejects an empty list, blank names/endpoints and duplicate names.
    pub fn new(zones: Vec<Zone>) -> Result<Self> {
        if zones.is_empty() {
            bail!("CONFIG_NO_ZONES: at least one zone must be configured");
        }
        let mut seen = BTreeSet::new();
        for z in &zones {
            if z.name.trim().is_empty() {
                bail!("CONFIG_ZONE_INVALID: zone with endpoint '{}' has an empty name", z.endpoint);
            }
            if z.endpoint.trim().is_empty() {
                bail!("CONFIG_ZONE_INVALID: zone '{}' has an empty endpoint", z.name);
            }
            if !seen.insert(z.name.as_str()) {
                bail!("CONFIG_ZONE_DUPLICATE: zone name '{}' appears more than once", z.name);
            }
        }
        Ok(Self { zones })
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn iter(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Zone> {
        self.zones.iter().find(|z| z.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        self.zones.iter().map(|z| z.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

/// Parse the `S3_ZONES` format.
///
/// Accepts `name=url,name2=url2` or bare `url1,url2` (mixing is allowed).
/// A bare URL is named after the first label of its hostname; when no
/// hostname can be extracted it becomes `zoneN`, where N counts the bare
/// entries seen so far.
pub fn parse_zone_list(raw: &str) -> Vec<Zone> {
    let mut zones = Vec::new();
    let mut unnamed = 0usize;

    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if let Some((name, endpoint)) = part.split_once('=') {
            zones.push(Zone::new(name.trim(), endpoint.trim()));
            continue;
        }

        let host = url::Url::parse(part)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();
        let name = match host.split('.').next() {
            Some(label) if !label.is_empty() => label.to_string(),
            _ => format!("zone{}", unnamed + 1),
        };
        zones.push(Zone::new(name, part));
        unnamed += 1;
    }

    zones
}
