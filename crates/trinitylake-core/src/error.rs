//! Error types and result aliases for TrinityLake.
//!
//! Errors are structured for programmatic handling: every variant carries
//! enough context (object names, versions, paths) to diagnose a failure
//! without consulting logs. The engine recovers nothing locally; all errors
//! propagate to the caller. `CommitConflict` is the only error with a
//! canonical retry strategy (re-begin and replay), which callers implement
//! themselves.

use std::fmt;

/// The result type used throughout TrinityLake.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in TrinityLake operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested object (namespace, table, root node, blob) was not found.
    #[error("{kind} not found: {name}")]
    NotFound {
        /// The kind of object that was looked up.
        kind: &'static str,
        /// The name or path that was looked up.
        name: String,
    },

    /// The object already exists and cannot be created again.
    #[error("{kind} already exists: {name}")]
    AlreadyExists {
        /// The kind of object.
        kind: &'static str,
        /// The name or path of the existing object.
        name: String,
    },

    /// A commit lost the race for its target root version.
    ///
    /// Another writer published the version first. The caller may retry by
    /// beginning a new transaction against the latest root and replaying.
    #[error("commit conflict: root version {version} was already published")]
    CommitConflict {
        /// The root version that was contested.
        version: u64,
    },

    /// Commit was invoked on a transaction with no changes.
    #[error("nothing to commit: transaction {transaction_id} has no changes")]
    NothingToCommit {
        /// The transaction that held no changes.
        transaction_id: String,
    },

    /// No root node exists; the lakehouse has not been created.
    #[error("lakehouse not initialized: no root node found")]
    Uninitialized,

    /// A stored tree node failed integrity checks during decode or encode.
    #[error("corrupt node: {message}")]
    CorruptNode {
        /// Description of the integrity violation.
        message: String,
    },

    /// A node key does not belong to the key class it was decoded as.
    #[error("malformed key: {message}")]
    MalformedKey {
        /// Description of what made the key malformed.
        message: String,
    },

    /// A namespace or table name contains bytes the key encoding reserves.
    #[error("invalid name: {message}")]
    InvalidName {
        /// Description of what made the name invalid.
        message: String,
    },

    /// A storage operation failed for transient or fatal I/O reasons.
    #[error("storage unavailable: {message}")]
    StorageUnavailable {
        /// Description of the storage failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure.
        message: String,
    },

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An internal error occurred that should not happen in normal operation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl Error {
    /// Creates a not-found error for the given object kind and name.
    #[must_use]
    pub fn not_found(kind: &'static str, name: impl fmt::Display) -> Self {
        Self::NotFound {
            kind,
            name: name.to_string(),
        }
    }

    /// Creates an already-exists error for the given object kind and name.
    #[must_use]
    pub fn already_exists(kind: &'static str, name: impl fmt::Display) -> Self {
        Self::AlreadyExists {
            kind,
            name: name.to_string(),
        }
    }

    /// Creates a corrupt-node error with the given message.
    #[must_use]
    pub fn corrupt_node(message: impl Into<String>) -> Self {
        Self::CorruptNode {
            message: message.into(),
        }
    }

    /// Creates a malformed-key error with the given message.
    #[must_use]
    pub fn malformed_key(message: impl Into<String>) -> Self {
        Self::MalformedKey {
            message: message.into(),
        }
    }

    /// Creates an invalid-name error with the given message.
    #[must_use]
    pub fn invalid_name(message: impl Into<String>) -> Self {
        Self::InvalidName {
            message: message.into(),
        }
    }

    /// Creates a storage error with the given message.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::StorageUnavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a storage error with a source cause.
    #[must_use]
    pub fn storage_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::StorageUnavailable {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a serialization error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Creates an internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true for [`Error::NotFound`].
    ///
    /// Existence predicates use this to translate lookup failures into
    /// `false` instead of propagating them.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = Error::not_found("namespace", "sales");
        assert_eq!(err.to_string(), "namespace not found: sales");

        let err = Error::CommitConflict { version: 7 };
        assert_eq!(
            err.to_string(),
            "commit conflict: root version 7 was already published"
        );
    }

    #[test]
    fn is_not_found_matches_only_not_found() {
        assert!(Error::not_found("table", "orders").is_not_found());
        assert!(!Error::already_exists("table", "orders").is_not_found());
        assert!(!Error::Uninitialized.is_not_found());
    }

    #[test]
    fn storage_error_carries_source() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "request timed out");
        let err = Error::storage_with_source("put root/00000000000000000001", io);
        let source = std::error::Error::source(&err).expect("source should be set");
        assert!(source.to_string().contains("timed out"));
    }
}
