//! # Access Mapping
//!
//! Translates abstract access levels (`read_only`, `manage`, ...) into the
//! concrete permission strings granted on catalog objects.
//!
//! The map is loaded once at startup and shared read-only behind an `Arc`.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Access level → ordered permissions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessMap {
    levels: IndexMap<String, Vec<String>>,
}

impl AccessMap {
    pub fn new(levels: IndexMap<String, Vec<String>>) -> Self {
        Self { levels }
    }

    /// Parse a JSON object of `level: [permission, ...]`
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn load(path: &Path) -> Result<Self, std::io::Error> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    pub fn levels(&self) -> impl Iterator<Item = &str> {
        self.levels.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

impl Default for AccessMap {
    fn default() -> Self {
        let levels = [
            ("read_only", &["SELECT", "READ_VOLUME", "EXECUTE"][..]),
            ("create", &["CREATE_VOLUME", "CREATE_TABLE"][..]),
            ("manage", &["MANAGE"][..]),
            ("full", &["ALL_PRIVILEGES"][..]),
        ]
        .into_iter()
        .map(|(level, perms)| {
            (
                level.to_string(),
                perms.iter().map(|p| p.to_string()).collect(),
            )
        })
        .collect();
        Self { levels }
    }
}

/// Pure lookup over an [`AccessMap`]
pub trait AccessMapper {
    /// Permissions for `level`; empty when the level is unknown
    fn resolve(&self, level: &str) -> &[String];
}

impl AccessMapper for AccessMap {
    fn resolve(&self, level: &str) -> &[String] {
        self.levels.get(level).map(Vec::as_slice).unwrap_or(&[])
    }
}
