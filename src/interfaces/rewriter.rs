use std::collections::HashSet;

use log::{debug, info, warn};
use serde_yaml::Value;
use thiserror::Error;

use crate::models::{ClashConfig, Proxy};
use crate::settings::Settings;
use crate::utils::http::{web_get_async, FetchError, FetchOptions};
use crate::utils::yaml::{value_kind, value_preview};

#[derive(Error, Debug)]
pub enum RewriteError {
    #[error("Failed to fetch upstream profile: {0}")]
    Fetch(#[from] FetchError),

    #[error("Failed to parse upstream profile: {0}")]
    Decode(#[source] serde_yaml::Error),

    #[error("Local `proxy` must be a sequence of proxies, got {kind}: {preview}")]
    NotASequence { kind: &'static str, preview: String },

    #[error("Local proxy #{index} is invalid: {source}")]
    LocalProxy {
        index: usize,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to serialize merged profile: {0}")]
    Encode(#[source] serde_yaml::Error),
}

/// Turn the untyped `proxy` setting into typed proxies.
///
/// The value has to be a sequence; every entry is decoded on its own so a
/// broken entry can be reported by position. A missing setting (`null`)
/// means there is nothing to inject.
pub fn to_proxy_list(value: &Value) -> Result<Vec<Proxy>, RewriteError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Sequence(entries) => entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let mut entry = entry.clone();
                entry
                    .apply_merge()
                    .and_then(|_| serde_yaml::from_value::<Proxy>(entry))
                    .map_err(|source| RewriteError::LocalProxy { index, source })
            })
            .collect(),
        other => Err(RewriteError::NotASequence {
            kind: value_kind(other),
            preview: value_preview(other),
        }),
    }
}

/// Put `local` in front of the profile's proxies and of every group's members.
///
/// Groups keep their order and every other part of the profile is left
/// alone.
pub fn merge_local_proxies(mut config: ClashConfig, local: Vec<Proxy>) -> ClashConfig {
    let local_names: Vec<String> = local.iter().map(|p| p.name.clone()).collect();

    let remote_names: HashSet<&str> = config.proxies.iter().map(|p| p.name.as_str()).collect();
    for name in &local_names {
        if remote_names.contains(name.as_str()) {
            warn!("Local proxy '{}' shadows an upstream proxy of the same name", name);
        }
    }

    let mut proxies = local;
    proxies.append(&mut config.proxies);
    config.proxies = proxies;

    config.proxy_groups = config
        .proxy_groups
        .into_iter()
        .map(|mut group| {
            let mut members = local_names.clone();
            members.append(&mut group.proxies);
            group.proxies = members;
            group
        })
        .collect();

    config
}

/// Merge the local proxies into an upstream profile given as YAML text
pub fn rewrite(remote: &str, local: &Value) -> Result<String, RewriteError> {
    let config = ClashConfig::from_yaml(remote).map_err(RewriteError::Decode)?;
    let local = to_proxy_list(local)?;

    debug!(
        "Merging {} local proxies into {} upstream proxies and {} groups",
        local.len(),
        config.proxies.len(),
        config.proxy_groups.len()
    );

    let merged = merge_local_proxies(config, local);
    merged.to_yaml().map_err(RewriteError::Encode)
}

/// Fetch the configured upstream profile and merge the local proxies into it
pub async fn fetch_and_rewrite(settings: &Settings) -> Result<String, RewriteError> {
    info!("Fetching upstream profile from {}", settings.url);
    let remote = web_get_async(&settings.url, &FetchOptions::from(settings)).await?;
    debug!("Fetched {} bytes from upstream", remote.len());
    rewrite(&remote, &settings.proxy)
}
