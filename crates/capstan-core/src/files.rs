//! Read-only keyed view over a chart's miscellaneous files
//!
//! Templates see a chart's non-template files through this view. The
//! ingestion pipeline already owns every byte in memory, so the view is a
//! plain ordered mapping from relative path to contents; lookups report
//! absence through `Option` rather than errors.

use std::borrow::Cow;

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::chart::File;
use crate::error::{CoreError, Result};

/// Ordered, read-only name-to-contents view over buffered files.
#[derive(Debug, Clone, Default)]
pub struct Files {
    files: IndexMap<String, Vec<u8>>,
}

impl Files {
    /// Build a view over a chart's files, preserving discovery order.
    pub fn new(files: &[File]) -> Self {
        Self {
            files: files
                .iter()
                .map(|f| (f.name.clone(), f.data.clone()))
                .collect(),
        }
    }

    /// File contents as a string, lossily decoded for template use.
    pub fn get(&self, name: &str) -> Option<Cow<'_, str>> {
        self.files.get(name).map(|d| String::from_utf8_lossy(d))
    }

    /// Raw file contents.
    pub fn get_bytes(&self, name: &str) -> Option<&[u8]> {
        self.files.get(name).map(Vec::as_slice)
    }

    /// Check whether a file exists.
    pub fn exists(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    /// File contents split into lines.
    pub fn lines(&self, name: &str) -> Option<Vec<String>> {
        self.get(name)
            .map(|content| content.lines().map(String::from).collect())
    }

    /// File names, in discovery order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// The subset of files whose names match a glob pattern.
    pub fn glob(&self, pattern: &str) -> Result<Files> {
        let pattern = glob::Pattern::new(pattern).map_err(|e| CoreError::GlobPattern {
            message: format!("invalid glob pattern '{}': {}", pattern, e),
        })?;

        Ok(Self {
            files: self
                .files
                .iter()
                .filter(|(name, _)| pattern.matches(name))
                .map(|(name, data)| (name.clone(), data.clone()))
                .collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl Serialize for Files {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.files.len()))?;
        for (name, data) in &self.files {
            map.serialize_entry(name, &String::from_utf8_lossy(data))?;
        }
        map.end()
    }
}
