//! Typed views of kubectl JSON output
//!
//! Core objects come from `k8s-openapi`; the metrics API and `kubectl version`
//! have no openapi type and are modelled here.

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::Deserialize;
use std::collections::BTreeMap;

pub use k8s_openapi::api::core::v1::{Node, PersistentVolume, PersistentVolumeClaim, Pod};

/// `kubectl get <resource> -o json` list envelope
#[derive(Debug, Clone, Deserialize)]
pub struct ItemList<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

/// An item of `kubectl get nodes.metrics.k8s.io -o json`
#[derive(Debug, Clone, Deserialize)]
pub struct NodeMetrics {
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub usage: BTreeMap<String, Quantity>,
}

impl NodeMetrics {
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }
}

/// `kubectl version -o json`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionReport {
    #[serde(default)]
    pub client_version: Option<BuildInfo>,

    #[serde(default)]
    pub server_version: Option<BuildInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    #[serde(default)]
    pub git_version: String,
}

/// Look up a quantity in an optional resource map (`capacity`, `requests`, `usage`)
pub fn quantity<'a>(map: Option<&'a BTreeMap<String, Quantity>>, key: &str) -> Option<&'a str> {
    map.and_then(|m| m.get(key)).map(|q| q.0.as_str())
}
