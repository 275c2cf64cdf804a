//! Layered value coalescence across a chart tree
//!
//! Walks the chart tree in pre-order, merging user overrides over each
//! chart's defaults and pushing `global` values down into every
//! dependency. Overrides always beat defaults; within a merge an explicit
//! null on the authoritative side deletes the key instead of carrying a
//! null into the result.

use serde_json::{Map, Value as JsonValue};

use crate::chart::Chart;
use crate::error::{CoreError, Result};
use crate::values::{Values, GLOBAL_KEY};

/// Coalesce user overrides with a chart tree's default values.
///
/// `overrides` is the raw YAML of the user-supplied values and may be
/// empty. The result is the final values tree handed to rendering.
pub fn coalesce_values(chart: &Chart, overrides: &str) -> Result<Values> {
    let dest = Values::from_yaml(overrides)?;
    Ok(Values(coalesce(chart, dest.into_inner())?))
}

/// Merge a chart's defaults under `dest`, then descend into dependencies.
fn coalesce(chart: &Chart, dest: Map<String, JsonValue>) -> Result<Map<String, JsonValue>> {
    let dest = coalesce_defaults(chart, dest);
    coalesce_deps(chart, dest)
}

/// Merge the chart's default values under `dest`, with `dest`
/// authoritative.
///
/// Unparseable defaults are dropped with a warning; the overrides in
/// `dest` survive untouched.
fn coalesce_defaults(chart: &Chart, dest: Map<String, JsonValue>) -> Map<String, JsonValue> {
    if chart.default_values.is_empty() {
        return dest;
    }
    let defaults = match Values::from_yaml(&chart.default_values) {
        Ok(v) => v,
        Err(err) => {
            tracing::warn!(
                "dropping default values of chart '{}': {err}",
                chart.name()
            );
            return dest;
        }
    };
    coalesce_tables(dest, defaults.into_inner(), chart.name())
}

/// Coalesce every dependency of `chart` into its slot under `dest`.
fn coalesce_deps(
    chart: &Chart,
    mut dest: Map<String, JsonValue>,
) -> Result<Map<String, JsonValue>> {
    for sub in &chart.dependencies {
        let name = sub.name();
        let child = match dest.get(name) {
            None => Map::new(),
            Some(JsonValue::Object(m)) => m.clone(),
            Some(_) => {
                return Err(CoreError::DependencyTypeMismatch {
                    name: name.to_string(),
                })
            }
        };
        let child = coalesce_globals(child, &dest, chart.name());
        let merged = coalesce(sub, child)?;
        dest.insert(name.to_string(), JsonValue::Object(merged));
    }
    Ok(dest)
}

/// Graft the parent's globals onto a dependency's values.
///
/// Globals merge top-down, the reverse of the normal precedence: the
/// parent's merged globals already carry any higher-level override, so
/// the parent wins over whatever the child declared.
fn coalesce_globals(
    child: Map<String, JsonValue>,
    parent: &Map<String, JsonValue>,
    chart_name: &str,
) -> Map<String, JsonValue> {
    let child_globals = match child.get(GLOBAL_KEY) {
        None => Map::new(),
        Some(JsonValue::Object(m)) => m.clone(),
        Some(_) => {
            tracing::warn!(
                "skipping globals for chart '{chart_name}': destination '{GLOBAL_KEY}' is not a table"
            );
            return child;
        }
    };
    let parent_globals = match parent.get(GLOBAL_KEY) {
        None => Map::new(),
        Some(JsonValue::Object(m)) => m.clone(),
        Some(_) => {
            tracing::warn!(
                "skipping globals for chart '{chart_name}': source '{GLOBAL_KEY}' is not a table"
            );
            return child;
        }
    };

    let mut rv = child;
    rv.insert(
        GLOBAL_KEY.to_string(),
        JsonValue::Object(coalesce_tables(parent_globals, child_globals, chart_name)),
    );
    rv
}

/// Merge `src` under `dst`, with `dst` authoritative.
///
/// Mappings merge recursively, anything else keeps the `dst` value. An
/// explicit null in `dst` removes the key entirely; the null itself never
/// reaches the result. Table-versus-scalar conflicts keep `dst` and warn.
pub(crate) fn coalesce_tables(
    dst: Map<String, JsonValue>,
    src: Map<String, JsonValue>,
    chart_name: &str,
) -> Map<String, JsonValue> {
    let mut rv = Map::new();
    for (key, src_val) in src {
        let Some(dst_val) = dst.get(&key) else {
            rv.insert(key, src_val);
            continue;
        };
        if dst_val.is_null() {
            // a null override removes the key
            continue;
        }
        match (dst_val, src_val) {
            (JsonValue::Object(d), JsonValue::Object(s)) => {
                rv.insert(key, JsonValue::Object(coalesce_tables(d.clone(), s, chart_name)));
            }
            (JsonValue::Object(_), src_val) => {
                tracing::warn!(
                    "chart '{chart_name}': ignoring non-table value {src_val:?} for table item '{key}'"
                );
                rv.insert(key, dst_val.clone());
            }
            (dst_val, JsonValue::Object(_)) => {
                tracing::warn!(
                    "chart '{chart_name}': ignoring table value for non-table item '{key}'"
                );
                rv.insert(key, dst_val.clone());
            }
            (dst_val, _) => {
                rv.insert(key, dst_val.clone());
            }
        }
    }

    // keys only the authoritative side has, minus consumed nulls
    for (key, val) in dst {
        if val.is_null() {
            continue;
        }
        rv.entry(key).or_insert(val);
    }

    rv
}
