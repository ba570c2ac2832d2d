//! Transaction records: the in-memory state of a catalog transaction.
//!
//! A running transaction pairs the immutable snapshot observed at begin
//! time (the beginning root) with a private working copy (the running
//! root). Mutating operations never edit a transaction in place; they
//! clone the running root, edit the clone, and derive a new transaction
//! value, so earlier transaction values stay valid snapshots.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use trinitylake_core::error::{Error, Result};

use crate::node::TreeNode;

/// Isolation level requested for a transaction.
///
/// Snapshot isolation is the engine's native level: reads come from the
/// beginning root, writes race at commit. Serializable is accepted and
/// recorded for forward compatibility; the version-counter commit protocol
/// already serializes writers, so the distinction only matters once
/// read-set validation lands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IsolationLevel {
    /// Reads from the snapshot captured at begin; first committer wins.
    #[default]
    Snapshot,
    /// Reserved for read-set validation on commit.
    Serializable,
}

impl IsolationLevel {
    /// Returns the canonical option value for this level.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Snapshot => "snapshot",
            Self::Serializable => "serializable",
        }
    }
}

impl FromStr for IsolationLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "snapshot" => Ok(Self::Snapshot),
            "serializable" => Ok(Self::Serializable),
            other => Err(Error::InvalidInput(format!(
                "unknown isolation level: {other}"
            ))),
        }
    }
}

/// Options accepted by `begin_transaction`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionOptions {
    isolation_level: IsolationLevel,
}

impl TransactionOptions {
    /// Option key selecting the isolation level.
    pub const ISOLATION_LEVEL: &'static str = "isolation-level";

    /// Parses options from a string map.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for unknown option keys or values.
    pub fn from_map(options: &HashMap<String, String>) -> Result<Self> {
        let mut parsed = Self::default();
        for (key, value) in options {
            match key.as_str() {
                Self::ISOLATION_LEVEL => {
                    parsed.isolation_level = value.parse()?;
                }
                other => {
                    return Err(Error::InvalidInput(format!(
                        "unknown transaction option: {other}"
                    )));
                }
            }
        }
        Ok(parsed)
    }

    /// Returns the requested isolation level.
    #[must_use]
    pub const fn isolation_level(&self) -> IsolationLevel {
        self.isolation_level
    }
}

/// A transaction in progress.
///
/// Owned by one actor at a time; the engine derives new values instead of
/// mutating, so sharing the beginning snapshot is safe.
#[derive(Debug, Clone)]
pub struct RunningTransaction {
    transaction_id: String,
    began_at: DateTime<Utc>,
    beginning_root: TreeNode,
    running_root: TreeNode,
    isolation_level: IsolationLevel,
}

impl RunningTransaction {
    pub(crate) fn new(
        transaction_id: String,
        began_at: DateTime<Utc>,
        beginning_root: TreeNode,
        running_root: TreeNode,
        isolation_level: IsolationLevel,
    ) -> Self {
        Self {
            transaction_id,
            began_at,
            beginning_root,
            running_root,
            isolation_level,
        }
    }

    /// Returns the opaque transaction identifier.
    #[must_use]
    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    /// Returns the begin timestamp.
    #[must_use]
    pub const fn began_at(&self) -> DateTime<Utc> {
        self.began_at
    }

    /// Returns the immutable snapshot observed at begin time.
    #[must_use]
    pub const fn beginning_root(&self) -> &TreeNode {
        &self.beginning_root
    }

    /// Returns the working copy holding this transaction's edits.
    #[must_use]
    pub const fn running_root(&self) -> &TreeNode {
        &self.running_root
    }

    /// Returns the requested isolation level.
    #[must_use]
    pub const fn isolation_level(&self) -> IsolationLevel {
        self.isolation_level
    }

    /// Derives a transaction with a new running root, leaving `self`
    /// untouched.
    #[must_use]
    pub(crate) fn with_running_root(&self, running_root: TreeNode) -> Self {
        Self {
            transaction_id: self.transaction_id.clone(),
            began_at: self.began_at,
            beginning_root: self.beginning_root.clone(),
            running_root,
            isolation_level: self.isolation_level,
        }
    }
}

/// The record of a successful commit.
#[derive(Debug, Clone)]
pub struct CommittedTransaction {
    transaction_id: String,
    committed_root: TreeNode,
}

impl CommittedTransaction {
    pub(crate) fn new(transaction_id: String, committed_root: TreeNode) -> Self {
        Self {
            transaction_id,
            committed_root,
        }
    }

    /// Returns the opaque transaction identifier.
    #[must_use]
    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    /// Returns the root node that was published.
    #[must_use]
    pub const fn committed_root(&self) -> &TreeNode {
        &self.committed_root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolation_level_parsing() {
        assert_eq!(
            "snapshot".parse::<IsolationLevel>().unwrap(),
            IsolationLevel::Snapshot
        );
        assert_eq!(
            "serializable".parse::<IsolationLevel>().unwrap(),
            IsolationLevel::Serializable
        );
        assert!("read-committed".parse::<IsolationLevel>().is_err());
    }

    #[test]
    fn test_options_default_to_snapshot() {
        let options = TransactionOptions::from_map(&HashMap::new()).unwrap();
        assert_eq!(options.isolation_level(), IsolationLevel::Snapshot);
    }

    #[test]
    fn test_options_parse_isolation_level() {
        let map = HashMap::from([(
            TransactionOptions::ISOLATION_LEVEL.to_string(),
            "serializable".to_string(),
        )]);
        let options = TransactionOptions::from_map(&map).unwrap();
        assert_eq!(options.isolation_level(), IsolationLevel::Serializable);
    }

    #[test]
    fn test_options_reject_unknown_keys() {
        let map = HashMap::from([("retries".to_string(), "3".to_string())]);
        assert!(TransactionOptions::from_map(&map).is_err());
    }

    #[test]
    fn test_with_running_root_does_not_alias() {
        let base = TreeNode::new();
        let txn = RunningTransaction::new(
            "txn-1".into(),
            Utc::now(),
            base.clone(),
            base,
            IsolationLevel::Snapshot,
        );

        let mut edited = txn.running_root().clone();
        edited.set("ns\u{001F}sales", "a");
        let derived = txn.with_running_root(edited);

        assert!(!txn.running_root().contains("ns\u{001F}sales"));
        assert!(derived.running_root().contains("ns\u{001F}sales"));
        assert_eq!(txn.transaction_id(), derived.transaction_id());
    }
}
