//! Chart definition: metadata, buffered files, and the recursive package tree

use std::collections::HashMap;

use semver::Version;
use serde::{Deserialize, Serialize};

/// API version accepted in `Chart.yaml`.
pub const API_VERSION_V1: &str = "v1";

/// A file buffered into memory during ingestion.
///
/// `name` is a forward-slash relative path with the chart's top-level
/// directory segment already stripped. It never contains `..`, a leading
/// `/`, or a `\` by the time any consumer sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    /// Relative path within the chart
    pub name: String,

    /// Raw file contents
    pub data: Vec<u8>,
}

impl File {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

/// Chart metadata, parsed from `Chart.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Chart name (required, non-empty)
    #[serde(default)]
    pub name: String,

    /// API version; when present it must be `v1`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    /// Chart version (SemVer)
    #[serde(default, with = "version_serde", skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,

    /// Version of the packaged application
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,

    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Home URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<String>,

    /// Icon URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    /// Source URLs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,

    /// Keywords
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,

    /// Maintainers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub maintainers: Vec<Maintainer>,

    /// Annotations
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub annotations: HashMap<String, String>,

    /// Whether the chart is deprecated
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
}

/// Maintainer information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Maintainer {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A chart: metadata, default configuration, templates, misc files, and
/// zero or more dependency charts.
///
/// Dependencies are owned by their parent; the dependency relation is a
/// tree. Upward navigation is done by passing the parent explicitly where
/// a traversal needs it, so no back-pointer is stored.
#[derive(Debug, Clone, Default)]
pub struct Chart {
    /// Contents of `Chart.yaml`; always present after a successful load
    pub metadata: Option<Metadata>,

    /// Default values as raw YAML; empty when the chart declares none
    pub default_values: String,

    /// Template files, in discovery order; every name begins with `templates/`
    pub templates: Vec<File>,

    /// Everything not otherwise classified (README, LICENSE, crds/, ...)
    pub files: Vec<File>,

    /// Nested charts loaded from `charts/`
    pub dependencies: Vec<Chart>,
}

impl Chart {
    /// The chart name, or `""` if metadata has not been attached.
    pub fn name(&self) -> &str {
        self.metadata.as_ref().map_or("", |m| m.name.as_str())
    }

    /// Version of the packaged application, if declared.
    pub fn app_version(&self) -> Option<&str> {
        self.metadata.as_ref()?.app_version.as_deref()
    }

    /// Files under `crds/`, including those of every dependency.
    pub fn crd_files(&self) -> Vec<&File> {
        let mut out: Vec<&File> = self
            .files
            .iter()
            .filter(|f| f.name.starts_with("crds/"))
            .collect();
        for dep in &self.dependencies {
            out.extend(dep.crd_files());
        }
        out
    }
}

/// Custom serde for an optional semver::Version
mod version_serde {
    use semver::Version;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(version: &Option<Version>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match version {
            Some(v) => serializer.serialize_str(&v.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Version>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(s) => Version::parse(&s).map(Some).map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}
