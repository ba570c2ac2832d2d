//! The transaction engine: catalog operations with snapshot isolation and
//! atomic commits.
//!
//! [`Lakehouse`] bundles the storage view; every other piece of state lives
//! in the transaction values passed through the operations. Mutations
//! clone the running root, edit the clone, and hand back a derived
//! [`RunningTransaction`]; the input transaction remains a valid snapshot.
//!
//! Commit linearizes concurrent writers through the storage layer's
//! conditional create: the transaction whose beginning snapshot was
//! version `V` races for `root/{V + 1}`, and exactly one writer per
//! version wins. Losers observe [`Error::CommitConflict`] and may re-begin
//! and replay; the engine never rebases automatically. Descriptor blobs
//! written by a losing transaction stay behind as unreachable garbage -
//! their paths embed a fresh unique component, so they can never be
//! confused with live definitions.

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use trinitylake_core::error::{Error, Result};
use trinitylake_core::{
    LakehouseDefKey, LakehouseStorage, NamespaceDefKey, TableDefKey, WriteResult,
};

use crate::defs::{self, LakehouseDef, NamespaceDef, TableDef};
use crate::keys;
use crate::node::TreeNode;
use crate::transaction::{CommittedTransaction, RunningTransaction, TransactionOptions};
use crate::tree;

/// The catalog handle: entry point for all transactional operations.
#[derive(Debug, Clone)]
pub struct Lakehouse {
    storage: LakehouseStorage,
}

impl Lakehouse {
    /// Wraps an existing lakehouse location.
    ///
    /// No storage I/O happens here; operations fail with
    /// [`Error::Uninitialized`] if the location holds no lakehouse.
    #[must_use]
    pub const fn new(storage: LakehouseStorage) -> Self {
        Self { storage }
    }

    /// Creates a new lakehouse: writes the descriptor blob and publishes
    /// root version 0.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyExists`] if root 0 is already published at
    /// this location, or [`Error::InvalidInput`] if the descriptor fails
    /// validation.
    pub async fn create(storage: LakehouseStorage, def: &LakehouseDef) -> Result<Self> {
        def.validate()?;

        let def_key = LakehouseDefKey::new_unique();
        defs::write_lakehouse_def(&storage, def_key.as_ref(), def).await?;

        let mut root = TreeNode::new();
        root.set(keys::LAKEHOUSE_DEF, def_key.as_ref());

        match tree::write_root(&storage, 0, &root).await? {
            WriteResult::Success { .. } => {
                info!(location = storage.location(), "created lakehouse");
                Ok(Self::new(storage))
            }
            WriteResult::PreconditionFailed { .. } => Err(Error::already_exists(
                "lakehouse",
                storage.location().to_string(),
            )),
        }
    }

    /// Returns the storage view this lakehouse operates on.
    #[must_use]
    pub const fn storage(&self) -> &LakehouseStorage {
        &self.storage
    }

    /// Begins a transaction with default options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Uninitialized`] if no root exists.
    pub async fn begin_transaction(&self) -> Result<RunningTransaction> {
        self.begin_transaction_with_options(&TransactionOptions::default())
            .await
    }

    /// Begins a transaction, capturing the latest root as both the
    /// beginning and running snapshots.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Uninitialized`] if no root exists.
    pub async fn begin_transaction_with_options(
        &self,
        options: &TransactionOptions,
    ) -> Result<RunningTransaction> {
        let current = tree::find_latest_root(&self.storage).await?;
        let transaction_id = Uuid::new_v4().to_string();

        debug!(
            txn_id = %transaction_id,
            version = current.origin_version(),
            "began transaction"
        );

        Ok(RunningTransaction::new(
            transaction_id,
            Utc::now(),
            current.clone(),
            current,
            options.isolation_level(),
        ))
    }

    /// Commits a transaction by publishing its running root at the version
    /// following the beginning snapshot.
    ///
    /// # Errors
    ///
    /// - [`Error::NothingToCommit`] if the running root is unmodified.
    /// - [`Error::CommitConflict`] if another writer already published the
    ///   target version. The transaction is unusable afterwards; re-begin
    ///   against the latest root and replay to retry.
    pub async fn commit_transaction(
        &self,
        transaction: &RunningTransaction,
    ) -> Result<CommittedTransaction> {
        if !transaction.running_root().is_dirty() {
            return Err(Error::NothingToCommit {
                transaction_id: transaction.transaction_id().to_string(),
            });
        }

        let beginning_version = tree::root_version(transaction.beginning_root())?;
        let target_version = beginning_version
            .checked_add(1)
            .ok_or_else(|| Error::internal("root version overflow"))?;

        match tree::write_root(&self.storage, target_version, transaction.running_root()).await? {
            WriteResult::Success { .. } => {
                info!(
                    txn_id = transaction.transaction_id(),
                    version = target_version,
                    "committed transaction"
                );

                let mut committed_root = transaction.running_root().clone();
                committed_root.set_origin_version(target_version);
                Ok(CommittedTransaction::new(
                    transaction.transaction_id().to_string(),
                    committed_root,
                ))
            }
            WriteResult::PreconditionFailed { .. } => Err(Error::CommitConflict {
                version: target_version,
            }),
        }
    }

    async fn lakehouse_def(&self, transaction: &RunningTransaction) -> Result<LakehouseDef> {
        tree::find_lakehouse_def(&self.storage, transaction.running_root()).await
    }

    // ========================================================================
    // Namespace operations
    // ========================================================================

    /// Creates a namespace in the transaction's working snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyExists`] if the namespace is present, or
    /// [`Error::InvalidName`] if the name fails encoder validation.
    pub async fn create_namespace(
        &self,
        transaction: &RunningTransaction,
        namespace: &str,
        def: &NamespaceDef,
    ) -> Result<RunningTransaction> {
        let lakehouse_def = self.lakehouse_def(transaction).await?;
        let key = keys::namespace_key(namespace, &lakehouse_def)?;
        if transaction.running_root().contains(&key) {
            return Err(Error::already_exists("namespace", namespace));
        }

        let def_key = NamespaceDefKey::new_unique(namespace);
        defs::write_namespace_def(&self.storage, def_key.as_ref(), def).await?;

        debug!(
            txn_id = transaction.transaction_id(),
            namespace, "created namespace"
        );

        let mut root = transaction.running_root().clone();
        root.set(key, def_key.as_ref());
        Ok(transaction.with_running_root(root))
    }

    /// Replaces a namespace's definition with a freshly written blob.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the namespace is absent.
    pub async fn alter_namespace(
        &self,
        transaction: &RunningTransaction,
        namespace: &str,
        def: &NamespaceDef,
    ) -> Result<RunningTransaction> {
        let lakehouse_def = self.lakehouse_def(transaction).await?;
        let key = keys::namespace_key(namespace, &lakehouse_def)?;
        if !transaction.running_root().contains(&key) {
            return Err(Error::not_found("namespace", namespace));
        }

        let def_key = NamespaceDefKey::new_unique(namespace);
        defs::write_namespace_def(&self.storage, def_key.as_ref(), def).await?;

        debug!(
            txn_id = transaction.transaction_id(),
            namespace, "altered namespace"
        );

        let mut root = transaction.running_root().clone();
        root.set(key, def_key.as_ref());
        Ok(transaction.with_running_root(root))
    }

    /// Drops a namespace from the transaction's working snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the namespace is absent.
    pub async fn drop_namespace(
        &self,
        transaction: &RunningTransaction,
        namespace: &str,
    ) -> Result<RunningTransaction> {
        let lakehouse_def = self.lakehouse_def(transaction).await?;
        let key = keys::namespace_key(namespace, &lakehouse_def)?;
        if !transaction.running_root().contains(&key) {
            return Err(Error::not_found("namespace", namespace));
        }

        debug!(
            txn_id = transaction.transaction_id(),
            namespace, "dropped namespace"
        );

        let mut root = transaction.running_root().clone();
        root.remove(&key);
        Ok(transaction.with_running_root(root))
    }

    /// Reads a namespace's definition blob.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the namespace is absent.
    pub async fn describe_namespace(
        &self,
        transaction: &RunningTransaction,
        namespace: &str,
    ) -> Result<NamespaceDef> {
        let lakehouse_def = self.lakehouse_def(transaction).await?;
        let key = keys::namespace_key(namespace, &lakehouse_def)?;
        let def_path = transaction
            .running_root()
            .get(&key)
            .ok_or_else(|| Error::not_found("namespace", namespace))?;
        defs::read_namespace_def(&self.storage, def_path).await
    }

    /// Lists all namespace names, in key byte order.
    ///
    /// # Errors
    ///
    /// Returns an error if the lakehouse descriptor cannot be read or a
    /// stored key fails to decode.
    pub async fn show_namespaces(&self, transaction: &RunningTransaction) -> Result<Vec<String>> {
        let lakehouse_def = self.lakehouse_def(transaction).await?;
        transaction
            .running_root()
            .user_rows()
            .filter(|(key, _)| keys::is_namespace_key(key, &lakehouse_def))
            .map(|(key, _)| keys::namespace_name_from_key(key, &lakehouse_def))
            .collect()
    }

    /// Returns true if the namespace exists.
    ///
    /// Never errors for absence.
    ///
    /// # Errors
    ///
    /// Returns an error only for invalid names or storage failures.
    pub async fn namespace_exists(
        &self,
        transaction: &RunningTransaction,
        namespace: &str,
    ) -> Result<bool> {
        let lakehouse_def = self.lakehouse_def(transaction).await?;
        let key = keys::namespace_key(namespace, &lakehouse_def)?;
        Ok(transaction.running_root().contains(&key))
    }

    // ========================================================================
    // Table operations
    // ========================================================================

    /// Creates a table in the transaction's working snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the namespace is absent, or
    /// [`Error::AlreadyExists`] if the table is present.
    pub async fn create_table(
        &self,
        transaction: &RunningTransaction,
        namespace: &str,
        table: &str,
        def: &TableDef,
    ) -> Result<RunningTransaction> {
        let lakehouse_def = self.lakehouse_def(transaction).await?;
        let namespace_key = keys::namespace_key(namespace, &lakehouse_def)?;
        if !transaction.running_root().contains(&namespace_key) {
            return Err(Error::not_found("namespace", namespace));
        }

        let table_key = keys::table_key(namespace, table, &lakehouse_def)?;
        if transaction.running_root().contains(&table_key) {
            return Err(Error::already_exists(
                "table",
                format!("{namespace}.{table}"),
            ));
        }

        let def_key = TableDefKey::new_unique(namespace, table);
        defs::write_table_def(&self.storage, def_key.as_ref(), def).await?;

        debug!(
            txn_id = transaction.transaction_id(),
            namespace, table, "created table"
        );

        let mut root = transaction.running_root().clone();
        root.set(table_key, def_key.as_ref());
        Ok(transaction.with_running_root(root))
    }

    /// Replaces a table's definition with a freshly written blob.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the namespace or table is absent.
    pub async fn alter_table(
        &self,
        transaction: &RunningTransaction,
        namespace: &str,
        table: &str,
        def: &TableDef,
    ) -> Result<RunningTransaction> {
        let lakehouse_def = self.lakehouse_def(transaction).await?;
        let table_key = existing_table_key(transaction, namespace, table, &lakehouse_def)?;

        let def_key = TableDefKey::new_unique(namespace, table);
        defs::write_table_def(&self.storage, def_key.as_ref(), def).await?;

        debug!(
            txn_id = transaction.transaction_id(),
            namespace, table, "altered table"
        );

        let mut root = transaction.running_root().clone();
        root.set(table_key, def_key.as_ref());
        Ok(transaction.with_running_root(root))
    }

    /// Drops a table from the transaction's working snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the namespace or table is absent.
    pub async fn drop_table(
        &self,
        transaction: &RunningTransaction,
        namespace: &str,
        table: &str,
    ) -> Result<RunningTransaction> {
        let lakehouse_def = self.lakehouse_def(transaction).await?;
        let table_key = existing_table_key(transaction, namespace, table, &lakehouse_def)?;

        debug!(
            txn_id = transaction.transaction_id(),
            namespace, table, "dropped table"
        );

        let mut root = transaction.running_root().clone();
        root.remove(&table_key);
        Ok(transaction.with_running_root(root))
    }

    /// Reads a table's definition blob.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the namespace or table is absent.
    pub async fn describe_table(
        &self,
        transaction: &RunningTransaction,
        namespace: &str,
        table: &str,
    ) -> Result<TableDef> {
        let lakehouse_def = self.lakehouse_def(transaction).await?;
        let table_key = existing_table_key(transaction, namespace, table, &lakehouse_def)?;

        let def_path = transaction
            .running_root()
            .get(&table_key)
            .ok_or_else(|| Error::not_found("table", format!("{namespace}.{table}")))?;
        defs::read_table_def(&self.storage, def_path).await
    }

    /// Lists the table names inside `namespace`, in key byte order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the namespace is absent.
    pub async fn show_tables(
        &self,
        transaction: &RunningTransaction,
        namespace: &str,
    ) -> Result<Vec<String>> {
        let lakehouse_def = self.lakehouse_def(transaction).await?;
        let namespace_key = keys::namespace_key(namespace, &lakehouse_def)?;
        if !transaction.running_root().contains(&namespace_key) {
            return Err(Error::not_found("namespace", namespace));
        }

        let mut tables = Vec::new();
        for (key, _) in transaction.running_root().user_rows() {
            if !keys::is_table_key(key, &lakehouse_def) {
                continue;
            }
            let (table_namespace, table) = keys::table_name_from_key(key, &lakehouse_def)?;
            if table_namespace == namespace {
                tables.push(table);
            }
        }
        Ok(tables)
    }

    /// Returns true if the table exists.
    ///
    /// Never errors for absence - a missing namespace simply means the
    /// table does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error only for invalid names or storage failures.
    pub async fn table_exists(
        &self,
        transaction: &RunningTransaction,
        namespace: &str,
        table: &str,
    ) -> Result<bool> {
        let lakehouse_def = self.lakehouse_def(transaction).await?;
        let key = keys::table_key(namespace, table, &lakehouse_def)?;
        Ok(transaction.running_root().contains(&key))
    }
}

/// Resolves the table key after checking namespace and table presence.
fn existing_table_key(
    transaction: &RunningTransaction,
    namespace: &str,
    table: &str,
    lakehouse_def: &LakehouseDef,
) -> Result<String> {
    let namespace_key = keys::namespace_key(namespace, lakehouse_def)?;
    if !transaction.running_root().contains(&namespace_key) {
        return Err(Error::not_found("namespace", namespace));
    }

    let table_key = keys::table_key(namespace, table, lakehouse_def)?;
    if !transaction.running_root().contains(&table_key) {
        return Err(Error::not_found("table", format!("{namespace}.{table}")));
    }
    Ok(table_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use trinitylake_core::MemoryBackend;

    async fn test_lakehouse() -> Lakehouse {
        let storage = LakehouseStorage::new(Arc::new(MemoryBackend::new()), "demo").unwrap();
        Lakehouse::create(storage, &LakehouseDef::default())
            .await
            .expect("create lakehouse")
    }

    #[tokio::test]
    async fn test_create_lakehouse_publishes_root_zero() {
        let lakehouse = test_lakehouse().await;
        let root = tree::find_latest_root(lakehouse.storage())
            .await
            .expect("find root");

        assert_eq!(root.origin_version(), Some(0));
        assert_eq!(root.num_user_keys(), 0);
        assert!(root.lakehouse_def_path().is_some());
    }

    #[tokio::test]
    async fn test_create_lakehouse_twice_is_already_exists() {
        let lakehouse = test_lakehouse().await;
        let err = Lakehouse::create(lakehouse.storage().clone(), &LakehouseDef::default())
            .await
            .expect_err("should fail");
        assert!(matches!(err, Error::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_begin_on_uninitialized_location() {
        let storage = LakehouseStorage::new(Arc::new(MemoryBackend::new()), "empty").unwrap();
        let lakehouse = Lakehouse::new(storage);
        let err = lakehouse
            .begin_transaction()
            .await
            .expect_err("should fail");
        assert!(matches!(err, Error::Uninitialized));
    }

    #[tokio::test]
    async fn test_commit_clean_transaction_is_nothing_to_commit() {
        let lakehouse = test_lakehouse().await;
        let txn = lakehouse.begin_transaction().await.expect("begin");
        let err = lakehouse
            .commit_transaction(&txn)
            .await
            .expect_err("should fail");
        assert!(matches!(err, Error::NothingToCommit { .. }));
    }

    #[tokio::test]
    async fn test_mutations_do_not_alias_input_transaction() {
        let lakehouse = test_lakehouse().await;
        let t1 = lakehouse.begin_transaction().await.expect("begin");
        let t2 = lakehouse
            .create_namespace(&t1, "sales", &NamespaceDef::default())
            .await
            .expect("create namespace");

        assert!(!lakehouse.namespace_exists(&t1, "sales").await.unwrap());
        assert!(lakehouse.namespace_exists(&t2, "sales").await.unwrap());
        assert!(!t1.running_root().is_dirty());
        assert!(t2.running_root().is_dirty());
    }

    #[tokio::test]
    async fn test_committed_root_carries_new_version() {
        let lakehouse = test_lakehouse().await;
        let txn = lakehouse.begin_transaction().await.expect("begin");
        let txn = lakehouse
            .create_namespace(&txn, "sales", &NamespaceDef::default())
            .await
            .expect("create namespace");

        let committed = lakehouse.commit_transaction(&txn).await.expect("commit");
        assert_eq!(committed.committed_root().origin_version(), Some(1));
        assert_eq!(committed.transaction_id(), txn.transaction_id());
    }

    #[tokio::test]
    async fn test_alter_swings_pointer_and_keeps_prior_blob() {
        let lakehouse = test_lakehouse().await;
        let txn = lakehouse.begin_transaction().await.expect("begin");
        let txn = lakehouse
            .create_namespace(&txn, "sales", &NamespaceDef::default())
            .await
            .expect("create");

        let def = LakehouseDef::default();
        let key = keys::namespace_key("sales", &def).unwrap();
        let first_path = txn.running_root().get(&key).unwrap().to_string();

        let altered = NamespaceDef {
            description: Some("altered".into()),
            ..NamespaceDef::default()
        };
        let txn = lakehouse
            .alter_namespace(&txn, "sales", &altered)
            .await
            .expect("alter");
        let second_path = txn.running_root().get(&key).unwrap().to_string();

        assert_ne!(first_path, second_path);

        // The prior blob is still readable
        let prior = defs::read_namespace_def(lakehouse.storage(), &first_path)
            .await
            .expect("prior blob");
        assert_eq!(prior, NamespaceDef::default());
    }
}
