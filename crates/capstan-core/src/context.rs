//! Render-context assembly for the template engine

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::chart::{Chart, Metadata};
use crate::coalesce::coalesce_values;
use crate::error::{CoreError, Result};
use crate::files::Files;
use crate::release::{Capabilities, ReleaseOptions, SERVICE_NAME};
use crate::values::Values;

/// The top-level object handed to the template engine.
#[derive(Debug, Clone, Serialize)]
pub struct RenderContext {
    #[serde(rename = "Release")]
    pub release: ReleaseContext,

    #[serde(rename = "Chart")]
    pub chart: Metadata,

    #[serde(rename = "Files")]
    pub files: Files,

    #[serde(rename = "Capabilities")]
    pub capabilities: Capabilities,

    #[serde(rename = "Values")]
    pub values: Values,
}

/// Release block of the render context
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReleaseContext {
    pub name: String,
    pub namespace: String,
    pub time: DateTime<Utc>,
    pub revision: u32,
    pub is_install: bool,
    pub is_upgrade: bool,
    pub service: String,
}

impl From<&ReleaseOptions> for ReleaseContext {
    fn from(opts: &ReleaseOptions) -> Self {
        Self {
            name: opts.name.clone(),
            namespace: opts.namespace.clone(),
            time: opts.time,
            revision: opts.revision,
            is_install: opts.is_install,
            is_upgrade: opts.is_upgrade,
            service: SERVICE_NAME.to_string(),
        }
    }
}

/// Compose the render context from a loaded chart, raw user overrides,
/// release options, and cluster capabilities.
///
/// Values are coalesced across the whole chart tree as part of this.
pub fn to_render_context(
    chart: &Chart,
    overrides: &str,
    options: &ReleaseOptions,
    capabilities: Capabilities,
) -> Result<RenderContext> {
    let values = coalesce_values(chart, overrides)?;
    let metadata = chart.metadata.clone().ok_or(CoreError::MissingMetadata)?;

    Ok(RenderContext {
        release: ReleaseContext::from(options),
        chart: metadata,
        files: Files::new(&chart.files),
        capabilities,
        values,
    })
}

impl RenderContext {
    /// Convert to a JSON value for engines that take an untyped context.
    pub fn to_json(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::File;

    fn demo_chart() -> Chart {
        Chart {
            metadata: Some(Metadata {
                name: "demo".to_string(),
                app_version: Some("2.0.0".to_string()),
                ..Default::default()
            }),
            default_values: "replicas: 3".to_string(),
            files: vec![File::new("README.md", "# demo")],
            ..Default::default()
        }
    }

    #[test]
    fn test_render_context_shape() {
        let opts = ReleaseOptions::for_install("myapp", "prod");
        let ctx =
            to_render_context(&demo_chart(), "replicas: 5\n", &opts, Capabilities::default())
                .unwrap();

        assert_eq!(ctx.release.name, "myapp");
        assert_eq!(ctx.release.service, SERVICE_NAME);
        assert!(ctx.release.is_install);
        assert_eq!(ctx.chart.name, "demo");
        assert_eq!(ctx.values.get("replicas").unwrap(), 5);
        assert!(ctx.files.exists("README.md"));
    }

    #[test]
    fn test_render_context_json_keys() {
        let opts = ReleaseOptions::for_render("myapp", "default");
        let ctx = to_render_context(&demo_chart(), "", &opts, Capabilities::default()).unwrap();
        let json = ctx.to_json();

        assert_eq!(json["Release"]["Name"], "myapp");
        assert_eq!(json["Release"]["Namespace"], "default");
        assert_eq!(json["Release"]["Revision"], 1);
        assert_eq!(json["Release"]["IsInstall"], false);
        assert_eq!(json["Release"]["IsUpgrade"], false);
        assert_eq!(json["Release"]["Service"], "Capstan");
        assert_eq!(json["Chart"]["name"], "demo");
        assert_eq!(json["Chart"]["appVersion"], "2.0.0");
        assert_eq!(json["Files"]["README.md"], "# demo");
        assert_eq!(json["Capabilities"]["kubeVersion"]["major"], "1");
        assert_eq!(json["Values"]["replicas"], 3);
    }

    #[test]
    fn test_render_context_requires_metadata() {
        let opts = ReleaseOptions::for_render("x", "default");
        let err = to_render_context(&Chart::default(), "", &opts, Capabilities::default())
            .unwrap_err();
        assert!(matches!(err, CoreError::MissingMetadata));
    }
}
