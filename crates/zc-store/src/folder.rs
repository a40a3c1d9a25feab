//! Folder-style listing of one zone (delimiter `/`).

use serde::{Deserialize, Serialize};
use zc_reconcile::wire::format_timestamp;

use crate::{ObjectStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderItem {
    pub key: String,
    pub last_modified: Option<String>,
    pub size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderListing {
    /// Sub-folder names relative to `prefix`, each ending in `/`.
    pub folders: Vec<String>,
    pub items: Vec<FolderItem>,
    pub prefix: String,
}

/// Non-empty prefixes always end in `/`.
pub fn normalize_prefix(prefix: &str) -> String {
    if prefix.is_empty() || prefix.ends_with('/') {
        prefix.to_string()
    } else {
        format!("{prefix}/")
    }
}

/// Walk every page of `prefix`.
///
/// The directory-marker object whose key equals the prefix is not an item.
pub async fn list_folder(
    store: &dyn ObjectStore,
    bucket: &str,
    prefix: &str,
) -> Result<FolderListing, StoreError> {
    let prefix = normalize_prefix(prefix);
    let mut folders = Vec::new();
    let mut items = Vec::new();
    let mut token: Option<String> = None;

    loop {
        let page = store
            .list_folder_page(bucket, &prefix, token.as_deref())
            .await?;

        for p in page.common_prefixes {
            if p.is_empty() {
                continue;
            }
            let name = match p.strip_prefix(prefix.as_str()) {
                Some(rel) if !prefix.is_empty() => rel.to_string(),
                _ => p,
            };
            folders.push(name);
        }

        for obj in page.objects {
            if !prefix.is_empty() && obj.key == prefix {
                continue;
            }
            items.push(FolderItem {
                key: obj.key,
                last_modified: obj.last_modified.as_ref().map(format_timestamp),
                size: obj.size,
            });
        }

        match page.next_continuation_token {
            Some(next) if token.as_deref() != Some(next.as_str()) => token = Some(next),
            _ => break,
        }
    }

    Ok(FolderListing {
        folders,
        items,
        prefix,
    })
}
