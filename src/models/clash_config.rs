use linked_hash_map::LinkedHashMap;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use super::proxy::{Proxy, ProxyGroup};

/// Keys we do not model explicitly, kept in their original order
pub type ExtraOptions = LinkedHashMap<String, Value>;

/// A complete Clash profile as served by a subscription endpoint.
///
/// Only `proxies` and `proxy-groups` are ever rewritten. Every other
/// field, including keys this struct does not know about, is carried
/// through untouched so the republished profile stays usable by newer
/// Clash cores.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClashConfig {
    // General settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socks_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redir_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mixed_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_lan: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosts: Option<LinkedHashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_controller: Option<String>,

    // Client specific blocks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clash_for_android: Option<ClashForAndroid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,

    // DNS settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns: Option<Dns>,

    // Proxy settings
    #[serde(default)]
    pub proxies: Vec<Proxy>,
    #[serde(default)]
    pub proxy_groups: Vec<ProxyGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<String>>,

    #[serde(flatten)]
    pub extra_options: ExtraOptions,
}

impl ClashConfig {
    /// Parse a profile from YAML text, expanding `<<: *anchor` merge keys
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        let mut value: Value = serde_yaml::from_str(content)?;
        value.apply_merge()?;
        serde_yaml::from_value(value)
    }

    /// Serialize the profile back to YAML text
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

/// Options only understood by Clash for Android
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClashForAndroid {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub append_system_dns: Option<bool>,
    #[serde(flatten)]
    pub extra_options: ExtraOptions,
}

/// Profile settings for Clash
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracing: Option<bool>,
    #[serde(flatten)]
    pub extra_options: ExtraOptions,
}

/// DNS configuration for Clash
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Dns {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listen: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_nameserver: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enhanced_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fake_ip_filter: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nameserver: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_filter: Option<FallbackFilter>,
    #[serde(flatten)]
    pub extra_options: ExtraOptions,
}

/// DNS fallback filter configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FallbackFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geoip: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipcidr: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra_options: ExtraOptions,
}
