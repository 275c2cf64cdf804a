//! Values handling with deep merge and dotted-path lookups

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::{CoreError, Result};

/// Key under which cross-chart global values are stored.
pub const GLOBAL_KEY: &str = "global";

/// A values tree: a mapping from string keys to scalars, sequences,
/// nested mappings, or explicit nulls.
///
/// Explicit nulls are retained through every merge; they act as deletion
/// sentinels during coalescence and are consumed there.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Values(pub Map<String, JsonValue>);

impl Values {
    /// Create empty values
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Load values from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        Self::from_bytes(&data)
    }

    /// Parse values from a YAML string
    ///
    /// An empty or all-null document yields empty values. Anything other
    /// than a mapping at the top level is rejected.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Self::from_bytes(yaml.as_bytes())
    }

    /// Parse values from raw YAML bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let value: JsonValue = serde_yaml::from_slice(data)?;
        match value {
            JsonValue::Null => Ok(Self::new()),
            JsonValue::Object(map) => Ok(Self(map)),
            other => Err(CoreError::InvalidValues {
                message: format!("expected a top-level mapping, got {}", kind_of(&other)),
            }),
        }
    }

    /// Encode the values to a YAML string
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.0)?)
    }

    /// Borrow the inner mapping
    pub fn inner(&self) -> &Map<String, JsonValue> {
        &self.0
    }

    /// Convert into the inner mapping
    pub fn into_inner(self) -> Map<String, JsonValue> {
        self.0
    }

    /// Check if values are empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Deep merge another Values into this one, preferring the overlay
    ///
    /// Rules:
    /// - Mappings: recursive merge
    /// - Scalars and sequences: overlay replaces base
    pub fn merge(&mut self, overlay: &Values) {
        deep_merge(&mut self.0, &overlay.0);
    }

    /// Deep merge an overlay, preferring the overlay, where an explicit
    /// null in the overlay deletes the key instead of storing the null.
    ///
    /// This is the environment-overlay merge used at load time.
    pub fn apply_overlay(&mut self, overlay: &Values) {
        merge_deleting_nulls(&mut self.0, &overlay.0);
    }

    /// Get a value by dotted path (e.g. `image.tag`)
    pub fn get(&self, path: &str) -> Option<&JsonValue> {
        let mut current = self.0.get(path.split('.').next()?)?;
        for part in path.split('.').skip(1) {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }

    /// Set a value by dotted path, creating intermediate tables as needed
    pub fn set(&mut self, path: &str, value: JsonValue) {
        let parts: Vec<&str> = path.split('.').collect();
        set_nested(&mut self.0, &parts, value);
    }

    /// Resolve a dotted path to a nested table
    ///
    /// Every segment must name a mapping; otherwise a `NoTable` error is
    /// returned.
    pub fn table(&self, path: &str) -> Result<&Map<String, JsonValue>> {
        let mut table = &self.0;
        for part in path.split('.') {
            table = match table.get(part) {
                Some(JsonValue::Object(next)) => next,
                _ => {
                    return Err(CoreError::NoTable {
                        path: path.to_string(),
                    })
                }
            };
        }
        Ok(table)
    }

    /// Resolve a dotted path to a non-table value
    ///
    /// Returns `NoValue` when the path is missing or names a table.
    pub fn path_value(&self, path: &str) -> Result<&JsonValue> {
        let no_value = || CoreError::NoValue {
            path: path.to_string(),
        };
        if path.is_empty() {
            return Err(no_value());
        }
        let (table, key) = match path.rsplit_once('.') {
            Some((table_path, key)) => (self.table(table_path).map_err(|_| no_value())?, key),
            None => (&self.0, path),
        };
        match table.get(key) {
            Some(JsonValue::Object(_)) | None => Err(no_value()),
            Some(v) => Ok(v),
        }
    }
}

fn kind_of(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "a sequence",
        JsonValue::Object(_) => "a mapping",
    }
}

/// Deep merge two mappings, preferring the overlay
fn deep_merge(base: &mut Map<String, JsonValue>, overlay: &Map<String, JsonValue>) {
    for (key, overlay_value) in overlay {
        match base.get_mut(key) {
            Some(base_value) => deep_merge_value(base_value, overlay_value),
            None => {
                base.insert(key.clone(), overlay_value.clone());
            }
        }
    }
}

fn deep_merge_value(base: &mut JsonValue, overlay: &JsonValue) {
    match (base, overlay) {
        (JsonValue::Object(base_map), JsonValue::Object(overlay_map)) => {
            deep_merge(base_map, overlay_map);
        }
        (base, overlay) => {
            *base = overlay.clone();
        }
    }
}

/// Deep merge preferring the overlay, with overlay nulls acting as deletions
fn merge_deleting_nulls(base: &mut Map<String, JsonValue>, overlay: &Map<String, JsonValue>) {
    for (key, overlay_value) in overlay {
        if overlay_value.is_null() {
            base.remove(key);
            continue;
        }
        match base.get_mut(key) {
            Some(JsonValue::Object(base_map)) if overlay_value.is_object() => {
                if let JsonValue::Object(overlay_map) = overlay_value {
                    merge_deleting_nulls(base_map, overlay_map);
                }
            }
            Some(base_value) => *base_value = overlay_value.clone(),
            None => {
                base.insert(key.clone(), overlay_value.clone());
            }
        }
    }
}

/// Set a nested value by path
fn set_nested(map: &mut Map<String, JsonValue>, path: &[&str], new_value: JsonValue) {
    let [key, rest @ ..] = path else { return };
    if rest.is_empty() {
        map.insert((*key).to_string(), new_value);
        return;
    }
    let entry = map
        .entry((*key).to_string())
        .or_insert_with(|| JsonValue::Object(Map::new()));
    if !entry.is_object() {
        *entry = JsonValue::Object(Map::new());
    }
    if let JsonValue::Object(next) = entry {
        set_nested(next, rest, new_value);
    }
}
