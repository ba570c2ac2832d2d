//! Tree operations: root discovery and node file I/O.
//!
//! Root nodes live under `root/{version:020}`. Discovery is list-based:
//! the largest listed version wins, then a forward existence probe absorbs
//! listings that lag behind recent commits. This gives committers
//! read-after-write visibility of their own roots even on backends whose
//! listings are only eventually consistent.

use trinitylake_core::error::{Error, Result};
use trinitylake_core::{LakehouseStorage, RootKey, WritePrecondition, WriteResult};

use crate::codec;
use crate::defs::{self, LakehouseDef};
use crate::node::TreeNode;

/// Finds and reads the latest root node.
///
/// # Errors
///
/// Returns [`Error::Uninitialized`] if no root exists, or any storage or
/// decode error encountered along the way.
pub async fn find_latest_root(storage: &LakehouseStorage) -> Result<TreeNode> {
    let listed = storage.list(RootKey::PREFIX).await?;
    let listed_max = listed
        .iter()
        .filter_map(|path| RootKey::parse_version(path))
        .max();

    let mut version = match listed_max {
        Some(v) => v,
        // The listing may lag a very recent creation; probe version 0
        // directly before giving up.
        None => {
            if storage.exists(RootKey::version(0).as_ref()).await? {
                0
            } else {
                return Err(Error::Uninitialized);
            }
        }
    };

    while let Some(next) = version.checked_add(1) {
        if storage.exists(RootKey::version(next).as_ref()).await? {
            version = next;
        } else {
            break;
        }
    }

    read_root(storage, version).await
}

/// Reads and decodes the root node at a specific version.
///
/// The returned node carries the version it was loaded from.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if no root exists at that version, or
/// [`Error::CorruptNode`] if it fails integrity checks.
pub async fn read_root(storage: &LakehouseStorage, version: u64) -> Result<TreeNode> {
    let key = RootKey::version(version);
    let bytes = storage.get_raw(key.as_ref()).await?;
    let mut node = codec::decode(&bytes)?;
    node.set_origin_version(version);
    Ok(node)
}

/// Serializes a node and publishes it as the root for `version` through
/// the conditional-create primitive.
///
/// Returns the raw [`WriteResult`]; callers translate a precondition
/// failure into their own error (commit conflict, already exists).
///
/// # Errors
///
/// Returns an error if encoding or the storage write fails.
pub async fn write_root(
    storage: &LakehouseStorage,
    version: u64,
    node: &TreeNode,
) -> Result<WriteResult> {
    let key = RootKey::version(version);
    let bytes = codec::encode(node)?;
    storage
        .put_raw(key.as_ref(), bytes, WritePrecondition::DoesNotExist)
        .await
}

/// Returns the version a node was loaded from.
///
/// # Errors
///
/// Returns [`Error::Internal`] if the node was never read out of storage.
pub fn root_version(node: &TreeNode) -> Result<u64> {
    node.origin_version()
        .ok_or_else(|| Error::internal("node was not loaded from a root file"))
}

/// Follows a node's lakehouse-definition pointer and reads the descriptor.
///
/// # Errors
///
/// Returns [`Error::CorruptNode`] if the pointer is missing, or any
/// storage or parse error from the blob read.
pub async fn find_lakehouse_def(
    storage: &LakehouseStorage,
    node: &TreeNode,
) -> Result<LakehouseDef> {
    let path = node
        .lakehouse_def_path()
        .ok_or_else(|| Error::corrupt_node("missing lakehouse definition pointer"))?;
    defs::read_lakehouse_def(storage, path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use trinitylake_core::MemoryBackend;

    use crate::keys;

    fn test_storage() -> LakehouseStorage {
        LakehouseStorage::new(Arc::new(MemoryBackend::new()), "demo").unwrap()
    }

    fn root_node() -> TreeNode {
        let mut node = TreeNode::new();
        node.set(keys::LAKEHOUSE_DEF, "lakehouse/def.json");
        node
    }

    #[tokio::test]
    async fn test_find_latest_root_uninitialized() {
        let storage = test_storage();
        let err = find_latest_root(&storage).await.expect_err("should fail");
        assert!(matches!(err, Error::Uninitialized));
    }

    #[tokio::test]
    async fn test_write_then_find_latest() {
        let storage = test_storage();
        let node = root_node();

        let result = write_root(&storage, 0, &node).await.expect("write");
        assert!(matches!(result, WriteResult::Success { .. }));

        let found = find_latest_root(&storage).await.expect("find");
        assert_eq!(found, node);
        assert_eq!(found.origin_version(), Some(0));
        assert!(!found.is_dirty());
    }

    #[tokio::test]
    async fn test_find_latest_picks_max_version() {
        let storage = test_storage();

        let mut v0 = root_node();
        write_root(&storage, 0, &v0).await.expect("write v0");

        v0.set("ns\u{001F}sales", "a");
        write_root(&storage, 1, &v0).await.expect("write v1");

        v0.set("ns\u{001F}ops", "b");
        write_root(&storage, 2, &v0).await.expect("write v2");

        let found = find_latest_root(&storage).await.expect("find");
        assert_eq!(found.origin_version(), Some(2));
        assert_eq!(found.num_user_keys(), 2);
    }

    #[tokio::test]
    async fn test_write_root_is_conditional() {
        let storage = test_storage();
        let node = root_node();

        write_root(&storage, 0, &node).await.expect("first write");
        let second = write_root(&storage, 0, &node).await.expect("second write");
        assert!(matches!(second, WriteResult::PreconditionFailed { .. }));
    }

    #[tokio::test]
    async fn test_read_root_missing_version() {
        let storage = test_storage();
        let err = read_root(&storage, 7).await.expect_err("should fail");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_root_version_requires_loaded_node() {
        let node = root_node();
        assert!(root_version(&node).is_err());

        let mut loaded = root_node();
        loaded.set_origin_version(3);
        assert_eq!(root_version(&loaded).unwrap(), 3);
    }

    #[tokio::test]
    async fn test_find_lakehouse_def_follows_pointer() {
        let storage = test_storage();
        let def = LakehouseDef::default();
        defs::write_lakehouse_def(&storage, "lakehouse/def.json", &def)
            .await
            .expect("write def");

        let node = root_node();
        let found = find_lakehouse_def(&storage, &node).await.expect("read");
        assert_eq!(found, def);
    }

    #[tokio::test]
    async fn test_find_lakehouse_def_missing_pointer() {
        let storage = test_storage();
        let node = TreeNode::new();
        let err = find_lakehouse_def(&storage, &node)
            .await
            .expect_err("should fail");
        assert!(matches!(err, Error::CorruptNode { .. }));
    }
}
