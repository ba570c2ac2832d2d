//! # trinitylake-core
//!
//! Core abstractions for the TrinityLake transactional lakehouse catalog.
//!
//! This crate provides the foundational types used across all TrinityLake
//! components:
//!
//! - **Storage Contract**: Object storage abstraction with conditional-create
//!   semantics, the only coordination point among concurrent committers
//! - **Lakehouse Storage**: Location-scoped storage view with path validation
//! - **Typed Paths**: Strongly-typed storage keys for root nodes and
//!   definition blobs
//! - **Error Types**: Shared error taxonomy and result type
//! - **Observability**: Structured logging initialization and span helpers
//!
//! ## Crate Boundary
//!
//! `trinitylake-core` is the **only** crate allowed to define shared
//! primitives. The catalog engine in `trinitylake-catalog` builds on the
//! contracts defined here and never reaches around them.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use trinitylake_core::prelude::*;
//!
//! let backend = Arc::new(MemoryBackend::new());
//! let storage = LakehouseStorage::new(backend, "demo-lakehouse").unwrap();
//! assert_eq!(storage.location(), "demo-lakehouse");
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod lakehouse_storage;
pub mod observability;
pub mod paths;
pub mod storage;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use trinitylake_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::lakehouse_storage::LakehouseStorage;
    pub use crate::paths::{LakehouseDefKey, NamespaceDefKey, RootKey, StorageKey, TableDefKey};
    pub use crate::storage::{
        MemoryBackend, ObjectMeta, StorageBackend, WritePrecondition, WriteResult,
    };
}

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use lakehouse_storage::LakehouseStorage;
pub use observability::{init_logging, LogFormat};
pub use paths::{LakehouseDefKey, NamespaceDefKey, RootKey, StorageKey, TableDefKey};
pub use storage::{MemoryBackend, ObjectMeta, StorageBackend, WritePrecondition, WriteResult};
