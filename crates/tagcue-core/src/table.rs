//! Tag-to-slot mapping table.
//!
//! The table is loaded once at startup from a JSON object whose keys are
//! tag UIDs (hex strings) and whose values are clip slots inside a
//! reader's track group:
//!
//! ```json
//! {
//!     "33c29c92": 1,
//!     "a4f21b07": 0
//! }
//! ```
//!
//! Entries are validated strictly at load time. A malformed UID key or an
//! out-of-range slot value fails the whole load rather than surfacing as a
//! crash mid-session.

use crate::{
    Result,
    error::Error,
    types::{ClipSlot, TagUid},
};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Immutable UID-to-slot lookup table.
#[derive(Debug, Clone, Default)]
pub struct TagTable {
    entries: HashMap<TagUid, ClipSlot>,
}

impl TagTable {
    /// Build a table from already-validated entries.
    #[must_use]
    pub fn from_entries(entries: HashMap<TagUid, ClipSlot>) -> Self {
        TagTable { entries }
    }

    /// Parse and validate a table from its JSON representation.
    ///
    /// # Errors
    /// Returns `Error::Table` if:
    /// - The input is not a JSON object of string keys and integer values
    /// - A key is not a valid tag UID
    /// - A value is not a valid clip slot (0-5)
    /// - Two keys normalize to the same UID
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, u64> = serde_json::from_str(json)
            .map_err(|e| Error::Table(format!("failed to parse mapping JSON: {e}")))?;

        let mut entries = HashMap::with_capacity(raw.len());
        for (key, value) in raw {
            let uid = TagUid::parse(&key)
                .map_err(|e| Error::Table(format!("invalid UID key {key:?}: {e}")))?;
            let slot = u8::try_from(value)
                .ok()
                .and_then(|v| ClipSlot::new(v).ok())
                .ok_or_else(|| {
                    Error::Table(format!("invalid slot {value} for UID {key:?}: must be 0-5"))
                })?;
            if entries.insert(uid, slot).is_some() {
                return Err(Error::Table(format!(
                    "duplicate UID after normalization: {key:?}"
                )));
            }
        }

        Ok(TagTable { entries })
    }

    /// Load and validate a table from a JSON file.
    ///
    /// # Errors
    /// Returns `Error::Io` if the file cannot be read, or `Error::Table`
    /// if its contents fail validation.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        TagTable::from_json_str(&json)
    }

    /// Look up the clip slot a UID maps to, if any.
    #[must_use]
    pub fn resolve(&self, uid: &TagUid) -> Option<ClipSlot> {
        self.entries.get(uid).copied()
    }

    /// Number of mapped tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all entries.
    pub fn iter(&self) -> impl Iterator<Item = (&TagUid, ClipSlot)> {
        self.entries.iter().map(|(uid, slot)| (uid, *slot))
    }
}
