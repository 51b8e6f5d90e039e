//! Script catalog storage
//!
//! The catalog is a single JSON document holding every runnable entry:
//!
//! ```json
//! {
//!     "scripts": [
//!         {
//!             "name": "ocr",
//!             "path": "ocr.py",
//!             "description": "Recognize text on screen",
//!             "keywords": "ocr text screenshot",
//!             "last_run_time": "2024-05-01T09:30:00Z"
//!         }
//!     ]
//! }
//! ```
//!
//! It is read wholesale on load and rewritten wholesale after every run.

use crate::error::{LoadError, PersistError};
use chrono::{DateTime, Utc};
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// File name of the catalog inside the scripts directory
pub const CATALOG_FILE_NAME: &str = "scripts.json";

/// One runnable script in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptEntry {
    /// Display name, also used as the lookup key
    pub name: String,
    /// Script file path relative to the scripts directory
    pub path: String,
    #[serde(default)]
    pub description: String,
    /// Free-text keywords matched by search
    #[serde(default)]
    pub keywords: String,
    /// When the script last ran; `None` if it never has
    #[serde(
        default,
        deserialize_with = "last_run::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_run_time: Option<DateTime<Utc>>,
}

impl ScriptEntry {
    /// Create an entry with empty metadata that has never run
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            description: String::new(),
            keywords: String::new(),
            last_run_time: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_keywords(mut self, keywords: impl Into<String>) -> Self {
        self.keywords = keywords.into();
        self
    }

    pub fn with_last_run(mut self, when: DateTime<Utc>) -> Self {
        self.last_run_time = Some(when);
        self
    }

    /// Whether the entry has a recorded run
    pub fn has_run(&self) -> bool {
        self.last_run_time.is_some()
    }

    /// Case-insensitive substring match on name or keywords.
    ///
    /// `needle` must already be lowercase.
    pub fn matches(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle) || self.keywords.to_lowercase().contains(needle)
    }
}

/// Deserialization of the last-run field.
///
/// Older catalogs store "never run" as the zero timestamp
/// `0001-01-01T00:00:00Z`; that value and `null` both map to `None`.
mod last_run {
    use chrono::{DateTime, Datelike, Utc};
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<DateTime<Utc>>::deserialize(deserializer)?;
        Ok(raw.filter(|when| when.year() > 1))
    }
}

/// Top-level catalog object. Only the object form is accepted; a bare array
/// is malformed.
struct CatalogDocument {
    scripts: Vec<ScriptEntry>,
}

impl<'de> Deserialize<'de> for CatalogDocument {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DocumentVisitor;

        impl<'de> Visitor<'de> for DocumentVisitor {
            type Value = CatalogDocument;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object with a \"scripts\" list")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut scripts = None;
                while let Some(key) = map.next_key::<String>()? {
                    if key == "scripts" {
                        if scripts.is_some() {
                            return Err(de::Error::duplicate_field("scripts"));
                        }
                        scripts = Some(map.next_value()?);
                    } else {
                        map.next_value::<de::IgnoredAny>()?;
                    }
                }
                Ok(CatalogDocument {
                    scripts: scripts.unwrap_or_default(),
                })
            }
        }

        deserializer.deserialize_map(DocumentVisitor)
    }
}

#[derive(Serialize)]
struct CatalogDocumentRef<'a> {
    scripts: &'a [ScriptEntry],
}

/// Reads and writes the catalog document at a fixed path
#[derive(Debug, Clone)]
pub struct CatalogStore {
    path: PathBuf,
}

impl CatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store for `scripts.json` inside a scripts directory
    pub fn in_dir(scripts_dir: impl AsRef<Path>) -> Self {
        Self::new(scripts_dir.as_ref().join(CATALOG_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every entry from disk, in file order
    pub fn read(&self) -> Result<Vec<ScriptEntry>, LoadError> {
        let content = fs::read_to_string(&self.path).map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                LoadError::NotFound {
                    path: self.path.clone(),
                }
            } else {
                LoadError::Read {
                    path: self.path.clone(),
                    source,
                }
            }
        })?;

        let document: CatalogDocument =
            serde_json::from_str(&content).map_err(|source| LoadError::Malformed {
                path: self.path.clone(),
                source,
            })?;

        Ok(document.scripts)
    }

    /// Replace the catalog on disk with `entries`.
    ///
    /// Output is pretty-printed with a four-space indent and written through a
    /// temp file plus rename, so a crash never leaves a truncated catalog.
    pub fn write(&self, entries: &[ScriptEntry]) -> Result<(), PersistError> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        CatalogDocumentRef { scripts: entries }.serialize(&mut serializer)?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, &buf).map_err(|source| PersistError::WriteFailed {
            path: temp_path.clone(),
            source,
        })?;
        fs::rename(&temp_path, &self.path).map_err(|source| PersistError::WriteFailed {
            path: self.path.clone(),
            source,
        })?;

        Ok(())
    }
}
