//! The in-memory tree node: one versioned snapshot of the catalog.
//!
//! A node owns an ordered table of `(key, value)` rows. Keys are unique
//! within a node and kept in byte order, so serialization through the
//! codec is deterministic. Values are strings; by convention they are
//! storage paths to descriptor blobs or counters rendered as text.
//!
//! Nodes are value types in the commit protocol: a transaction clones the
//! node it wants to change and mutates the clone, never the original.

use std::collections::BTreeMap;

use crate::keys;

/// A versioned snapshot of the catalog tree.
///
/// Carries two pieces of bookkeeping alongside the key table:
///
/// - the **origin version**: the root version this node was loaded from,
///   if it was read out of storage;
/// - the **dirty flag**: whether the node has been mutated since it was
///   loaded or created. The commit protocol refuses clean nodes.
///
/// Equality is structural over the key table only; bookkeeping does not
/// participate, so a decoded copy of an encoded node compares equal to
/// the original.
#[derive(Debug, Clone)]
pub struct TreeNode {
    rows: BTreeMap<String, String>,
    origin_version: Option<u64>,
    dirty: bool,
}

impl Default for TreeNode {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeNode {
    /// Creates an empty node holding only the zero user-key counter.
    #[must_use]
    pub fn new() -> Self {
        let mut rows = BTreeMap::new();
        rows.insert(keys::NUMBER_OF_KEYS.to_string(), "0".to_string());
        Self {
            rows,
            origin_version: None,
            dirty: false,
        }
    }

    /// Builds a node from already-verified rows (codec decode path).
    pub(crate) fn from_rows(rows: BTreeMap<String, String>) -> Self {
        Self {
            rows,
            origin_version: None,
            dirty: false,
        }
    }

    /// Returns the value stored under `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.rows.get(key).map(String::as_str)
    }

    /// Returns true if the node contains `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.rows.contains_key(key)
    }

    /// Inserts or replaces a row and marks the node dirty.
    ///
    /// The user-key counter row is kept in lockstep automatically.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.rows.insert(key.into(), value.into());
        self.sync_counter();
        self.dirty = true;
    }

    /// Removes a row, returning its value.
    ///
    /// Marks the node dirty only when a row was actually removed.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let removed = self.rows.remove(key);
        if removed.is_some() {
            self.sync_counter();
            self.dirty = true;
        }
        removed
    }

    fn sync_counter(&mut self) {
        let count = self.num_user_keys();
        self.rows
            .insert(keys::NUMBER_OF_KEYS.to_string(), count.to_string());
    }

    /// Returns the number of non-reserved keys in the node.
    #[must_use]
    pub fn num_user_keys(&self) -> u64 {
        self.rows.keys().filter(|k| !keys::is_reserved(k)).count() as u64
    }

    /// Iterates all rows in key byte order.
    pub fn rows(&self) -> impl Iterator<Item = (&str, &str)> {
        self.rows.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterates the non-reserved rows in key byte order.
    pub fn user_rows(&self) -> impl Iterator<Item = (&str, &str)> {
        self.rows().filter(|(k, _)| !keys::is_reserved(k))
    }

    /// Returns the storage path of the lakehouse descriptor blob, if set.
    #[must_use]
    pub fn lakehouse_def_path(&self) -> Option<&str> {
        self.get(keys::LAKEHOUSE_DEF)
    }

    /// Returns true if the node has been mutated since load or creation.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns the root version this node was loaded from, if any.
    #[must_use]
    pub fn origin_version(&self) -> Option<u64> {
        self.origin_version
    }

    pub(crate) fn set_origin_version(&mut self, version: u64) {
        self.origin_version = Some(version);
    }
}

impl PartialEq for TreeNode {
    fn eq(&self, other: &Self) -> bool {
        self.rows == other.rows
    }
}

impl Eq for TreeNode {}
