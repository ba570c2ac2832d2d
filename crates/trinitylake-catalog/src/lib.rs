//! # trinitylake-catalog
//!
//! Transactional tree engine for the TrinityLake lakehouse catalog.
//!
//! The catalog is a versioned tree of namespaces and tables stored in
//! object storage. Each version of the tree is one immutable **root node**
//! published under `root/{version:020}`; namespace and table definitions
//! are immutable blobs referenced from the root by path. Concurrent
//! writers are linearized by a single storage primitive: the conditional
//! create that rejects overwrites.
//!
//! ## Architecture
//!
//! - [`defs`]: Definition models (lakehouse, namespace, table) and blob I/O
//! - [`keys`]: Deterministic key encoding between domain names and node keys
//! - [`node`]: The in-memory tree node (ordered key table, dirty tracking)
//! - [`codec`]: Deterministic binary serialization of tree nodes
//! - [`tree`]: Root discovery and node file I/O
//! - [`transaction`]: Running and committed transaction records
//! - [`lakehouse`]: The [`Lakehouse`] entry point exposing catalog operations
//!
//! ## Concurrency Model
//!
//! Transactions use optimistic, version-based concurrency control. A
//! transaction captures the latest root at begin time, mutates a private
//! clone, and commits by conditional-creating `root/{begin_version + 1}`.
//! Two transactions that began at the same version race for the next one;
//! exactly one wins and the loser observes a commit conflict it may retry
//! by re-beginning.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use trinitylake_catalog::prelude::*;
//! use trinitylake_core::{LakehouseStorage, MemoryBackend};
//!
//! let storage = LakehouseStorage::new(Arc::new(MemoryBackend::new()), "demo")?;
//! let lakehouse = Lakehouse::create(storage, &LakehouseDef::default()).await?;
//!
//! let txn = lakehouse.begin_transaction().await?;
//! let txn = lakehouse
//!     .create_namespace(&txn, "sales", &NamespaceDef::default())
//!     .await?;
//! lakehouse.commit_transaction(&txn).await?;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod codec;
pub mod defs;
pub mod keys;
pub mod lakehouse;
pub mod node;
pub mod transaction;
pub mod tree;

// Re-export main types at crate root
pub use defs::{LakehouseDef, NamespaceDef, TableDef, TableFormat};
pub use lakehouse::Lakehouse;
pub use node::TreeNode;
pub use transaction::{
    CommittedTransaction, IsolationLevel, RunningTransaction, TransactionOptions,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::defs::{LakehouseDef, NamespaceDef, TableDef, TableFormat};
    pub use crate::lakehouse::Lakehouse;
    pub use crate::node::TreeNode;
    pub use crate::transaction::{
        CommittedTransaction, IsolationLevel, RunningTransaction, TransactionOptions,
    };
    pub use trinitylake_core::error::{Error, Result};
}
