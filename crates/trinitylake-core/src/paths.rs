//! Typed storage keys for compile-time path safety.
//!
//! This module is the single source of truth for the lakehouse storage
//! layout. All writers construct paths through these types; no hardcoded
//! path strings exist outside this module.
//!
//! # Storage Layout
//!
//! ```text
//! {location}/
//! ├── root/
//! │   └── {version:020}              # root node files, one per version
//! ├── lakehouse/
//! │   └── {uuid}.json                # lakehouse descriptor blobs
//! ├── ns/
//! │   └── {namespace}/
//! │       └── {uuid}.json            # namespace descriptor blobs
//! └── tbl/
//!     └── {namespace}/
//!         └── {table}/
//!             └── {uuid}.json        # table descriptor blobs
//! ```
//!
//! Root versions are fixed-width 20-digit decimals so lexicographic order
//! equals numeric order. Descriptor blob paths embed a fresh UUID per write
//! so that writes never conflict; blobs orphaned by abandoned transactions
//! are tolerated garbage.
//!
//! # Example
//!
//! ```rust
//! use trinitylake_core::paths::RootKey;
//!
//! let key = RootKey::version(42);
//! assert_eq!(key.as_ref(), "root/00000000000000000042");
//! assert_eq!(RootKey::parse_version(key.as_ref()), Some(42));
//! ```

use uuid::Uuid;

/// A typed storage key that encodes path structure.
///
/// All key types implement this trait to provide uniform access to the
/// underlying path string.
pub trait StorageKey: AsRef<str> {
    /// Returns the underlying path string.
    fn path(&self) -> &str {
        self.as_ref()
    }
}

/// Width of the zero-padded root version component.
const ROOT_VERSION_WIDTH: usize = 20;

// ============================================================================
// RootKey - committers conditional-create root node files
// ============================================================================

/// A typed key for root node paths.
///
/// # Path Format
///
/// `root/{version:020}`
///
/// Exactly one object may exist per version; the commit protocol publishes
/// these through the conditional-create precondition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RootKey(String);

impl RootKey {
    /// Prefix under which all root node files live.
    pub const PREFIX: &'static str = "root/";

    /// Creates the key for a specific root version.
    #[must_use]
    pub fn version(version: u64) -> Self {
        Self(format!("{}{version:020}", Self::PREFIX))
    }

    /// Extracts the version number from a root node path.
    ///
    /// Returns `None` if the path is not a well-formed root key: wrong
    /// prefix, wrong width, or non-digit characters.
    #[must_use]
    pub fn parse_version(path: &str) -> Option<u64> {
        let digits = path.strip_prefix(Self::PREFIX)?;
        if digits.len() != ROOT_VERSION_WIDTH || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }
}

impl AsRef<str> for RootKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl StorageKey for RootKey {}

impl std::fmt::Display for RootKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// LakehouseDefKey - written once at lakehouse creation
// ============================================================================

/// A typed key for lakehouse descriptor blob paths.
///
/// # Path Format
///
/// `lakehouse/{uuid}.json`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LakehouseDefKey(String);

impl LakehouseDefKey {
    /// Creates a fresh, unique lakehouse descriptor key.
    #[must_use]
    pub fn new_unique() -> Self {
        Self(format!("lakehouse/{}.json", Uuid::new_v4()))
    }
}

impl AsRef<str> for LakehouseDefKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl StorageKey for LakehouseDefKey {}

impl std::fmt::Display for LakehouseDefKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// NamespaceDefKey - written on create/alter namespace
// ============================================================================

/// A typed key for namespace descriptor blob paths.
///
/// # Path Format
///
/// `ns/{namespace}/{uuid}.json`
///
/// The namespace name must already have passed key-encoder validation;
/// this type does not re-validate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamespaceDefKey(String);

impl NamespaceDefKey {
    /// Creates a fresh, unique namespace descriptor key.
    #[must_use]
    pub fn new_unique(namespace: &str) -> Self {
        Self(format!("ns/{namespace}/{}.json", Uuid::new_v4()))
    }
}

impl AsRef<str> for NamespaceDefKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl StorageKey for NamespaceDefKey {}

impl std::fmt::Display for NamespaceDefKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// TableDefKey - written on create/alter table
// ============================================================================

/// A typed key for table descriptor blob paths.
///
/// # Path Format
///
/// `tbl/{namespace}/{table}/{uuid}.json`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableDefKey(String);

impl TableDefKey {
    /// Creates a fresh, unique table descriptor key.
    #[must_use]
    pub fn new_unique(namespace: &str, table: &str) -> Self {
        Self(format!("tbl/{namespace}/{table}/{}.json", Uuid::new_v4()))
    }
}

impl AsRef<str> for TableDefKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl StorageKey for TableDefKey {}

impl std::fmt::Display for TableDefKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
