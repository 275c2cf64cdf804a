//! Release metadata and cluster capabilities

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name reported as the rendering service in the release block.
pub const SERVICE_NAME: &str = "Capstan";

/// Additional release information needed to compose the render context.
///
/// At most one of `is_install` and `is_upgrade` is true; both are false
/// for a pure render.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseOptions {
    /// Release name
    pub name: String,

    /// Target namespace
    pub namespace: String,

    /// Deployment timestamp
    pub time: DateTime<Utc>,

    /// Revision number, starting at 1
    pub revision: u32,

    /// Is this an install operation?
    pub is_install: bool,

    /// Is this an upgrade operation?
    pub is_upgrade: bool,
}

impl ReleaseOptions {
    /// Release options for a first install
    pub fn for_install(name: &str, namespace: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            time: Utc::now(),
            revision: 1,
            is_install: true,
            is_upgrade: false,
        }
    }

    /// Release options for an upgrade to the given revision
    pub fn for_upgrade(name: &str, namespace: &str, revision: u32) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            time: Utc::now(),
            revision,
            is_install: false,
            is_upgrade: true,
        }
    }

    /// Release options for a pure render, neither install nor upgrade
    pub fn for_render(name: &str, namespace: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            time: Utc::now(),
            revision: 1,
            is_install: false,
            is_upgrade: false,
        }
    }
}

/// Cluster capabilities exposed to templates
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    /// Kubernetes version
    pub kube_version: KubeVersion,

    /// Available API versions
    pub api_versions: BTreeSet<String>,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            kube_version: KubeVersion::default(),
            api_versions: BTreeSet::from(["v1".to_string()]),
        }
    }
}

impl Capabilities {
    /// Check whether an API version is available
    pub fn has_api_version(&self, version: &str) -> bool {
        self.api_versions.contains(version)
    }
}

/// Kubernetes version info
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KubeVersion {
    pub version: String,
    pub major: String,
    pub minor: String,
}

impl Default for KubeVersion {
    fn default() -> Self {
        // A recent stable Kubernetes version, for offline render modes
        Self {
            version: "v1.28.0".to_string(),
            major: "1".to_string(),
            minor: "28".to_string(),
        }
    }
}

impl KubeVersion {
    pub fn new(version: &str) -> Self {
        let version = version.trim_start_matches('v');
        let parts: Vec<&str> = version.split('.').collect();

        Self {
            version: format!("v{}", version),
            major: parts.first().unwrap_or(&"1").to_string(),
            minor: parts.get(1).unwrap_or(&"28").to_string(),
        }
    }
}
