//! Class id to display name lookup.
//!
//! The table is built once at startup and never mutated afterwards. It can
//! come from one of the built-in presets or from a JSON file holding a list
//! of `{ "id": .., "name": .. }` entries:
//!
//! ```json
//! [
//!   { "id": 46, "name": "Banana (কলা)" },
//!   { "id": 47, "name": "Apple (আপেল)" }
//! ]
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while building a class name table.
#[derive(Debug, Error)]
pub enum ClassTableError {
    #[error("Duplicate class id in table: {0}")]
    DuplicateId(u32),

    #[error("Empty display name for class id {0}")]
    EmptyName(u32),

    #[error("Class table is empty")]
    Empty,

    #[error("Failed to read class table {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse class table: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One row of a class table file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ClassEntry {
    pub id: u32,
    pub name: String,
}

/// Immutable mapping from model class id to a display label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassNameTable {
    names: BTreeMap<u32, String>,
}

impl ClassNameTable {
    /// Build a table, rejecting duplicate ids and blank names.
    pub fn from_entries<I>(entries: I) -> Result<Self, ClassTableError>
    where
        I: IntoIterator<Item = ClassEntry>,
    {
        let mut names = BTreeMap::new();
        for entry in entries {
            let name = entry.name.trim();
            if name.is_empty() {
                return Err(ClassTableError::EmptyName(entry.id));
            }
            if names.insert(entry.id, name.to_string()).is_some() {
                return Err(ClassTableError::DuplicateId(entry.id));
            }
        }

        if names.is_empty() {
            return Err(ClassTableError::Empty);
        }

        Ok(Self { names })
    }

    /// Parse a JSON list of entries.
    pub fn from_json(json: &str) -> Result<Self, ClassTableError> {
        let entries: Vec<ClassEntry> = serde_json::from_str(json)?;
        Self::from_entries(entries)
    }

    /// Load a JSON table from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ClassTableError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ClassTableError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Fruit classes of the stock 80-class COCO detectors (YOLOv8 / YOLO11).
    pub fn coco_fruits() -> Self {
        Self::from_static(&[
            (46, "Banana (কলা)"),
            (47, "Apple (আপেল)"),
            (49, "Orange (কমলা)"),
        ])
    }

    /// Six-class fruit model fine-tuned on the custom dataset.
    pub fn custom_fruits() -> Self {
        Self::from_static(&[
            (0, "Apple (আপেল)"),
            (1, "Banana (কলা)"),
            (2, "Mango (আম)"),
            (3, "Orange (কমলা)"),
            (4, "Pomegranate (আনারস)"),
            (5, "Watermelon (তরমুজ)"),
        ])
    }

    fn from_static(rows: &[(u32, &str)]) -> Self {
        Self {
            names: rows
                .iter()
                .map(|(id, name)| (*id, (*name).to_string()))
                .collect(),
        }
    }

    /// Look up the display name for a class id.
    pub fn get(&self, class_id: u32) -> Option<&str> {
        self.names.get(&class_id).map(String::as_str)
    }

    pub fn contains(&self, class_id: u32) -> bool {
        self.names.contains_key(&class_id)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// All display names, ordered by class id.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.values().map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = (u32, &str)> {
        self.names.iter().map(|(id, name)| (*id, name.as_str()))
    }
}

impl Default for ClassNameTable {
    fn default() -> Self {
        Self::coco_fruits()
    }
}

/// What to do with an above-threshold detection whose id is not in the table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UnmappedClassPolicy {
    /// Discard the detection.
    #[default]
    Drop,
    /// Keep the detection under a fixed label.
    Label(String),
}

impl UnmappedClassPolicy {
    pub const DEFAULT_LABEL: &'static str = "Unknown";

    pub fn unknown() -> Self {
        Self::Label(Self::DEFAULT_LABEL.to_string())
    }

    /// Resolve a class id to a display name under this policy.
    pub fn resolve<'a>(&'a self, table: &'a ClassNameTable, class_id: u32) -> Option<&'a str> {
        match table.get(class_id) {
            Some(name) => Some(name),
            None => match self {
                UnmappedClassPolicy::Drop => None,
                UnmappedClassPolicy::Label(label) => Some(label.as_str()),
            },
        }
    }
}

impl fmt::Display for UnmappedClassPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnmappedClassPolicy::Drop => write!(f, "drop"),
            UnmappedClassPolicy::Label(label) => write!(f, "label:{}", label),
        }
    }
}

impl FromStr for UnmappedClassPolicy {
    type Err = UnmappedClassPolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_lowercase().as_str() {
            "drop" | "skip" => return Ok(UnmappedClassPolicy::Drop),
            "unknown" | "label" => return Ok(UnmappedClassPolicy::unknown()),
            _ => {}
        }

        match s.split_once(':') {
            Some((kind, label)) if kind.eq_ignore_ascii_case("label") && !label.trim().is_empty() => {
                Ok(UnmappedClassPolicy::Label(label.trim().to_string()))
            }
            _ => Err(UnmappedClassPolicyParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown unmapped class policy: {0}")]
pub struct UnmappedClassPolicyParseError(String);
