//! Lakehouse-scoped storage with path validation.
//!
//! A bucket may host several lakehouses under distinct location prefixes.
//! This module wraps a [`StorageBackend`] with a validated location so that
//! all engine I/O stays inside one lakehouse's subtree and every relative
//! path is checked before it reaches the backend.
//!
//! # Security
//!
//! - All paths are prefixed with the lakehouse location
//! - Path traversal attempts (`..`) are rejected
//! - The location is validated at construction

use bytes::Bytes;
use std::ops::Range;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::storage::{ObjectMeta, StorageBackend, WritePrecondition, WriteResult};

/// Storage view scoped to one lakehouse location.
///
/// All paths passed to the raw operations are relative to the location.
/// Cloning is cheap; the backend is shared.
#[derive(Clone)]
pub struct LakehouseStorage {
    backend: Arc<dyn StorageBackend>,
    location: String,
}

impl LakehouseStorage {
    /// Creates a new storage view rooted at `location`.
    ///
    /// The location may be empty (lakehouse at the bucket root). A trailing
    /// slash is stripped.
    ///
    /// # Errors
    ///
    /// Returns an error if the location contains path traversal sequences,
    /// control characters, or a backslash.
    pub fn new(backend: Arc<dyn StorageBackend>, location: impl Into<String>) -> Result<Self> {
        let mut location = location.into();
        while location.ends_with('/') {
            location.pop();
        }
        Self::validate_location(&location)?;

        Ok(Self { backend, location })
    }

    fn validate_location(location: &str) -> Result<()> {
        if location.contains('\\') {
            return Err(Error::InvalidInput(format!(
                "backslashes not allowed in lakehouse location: {location}"
            )));
        }

        if location.chars().any(char::is_control) {
            return Err(Error::InvalidInput(
                "control characters not allowed in lakehouse location".into(),
            ));
        }

        for segment in location.split('/') {
            if segment == "." || segment == ".." {
                return Err(Error::InvalidInput(format!(
                    "path traversal not allowed in lakehouse location: {location}"
                )));
            }
        }

        Ok(())
    }

    /// Validates a relative path for path traversal attacks.
    fn validate_path(path: &str) -> Result<()> {
        if path.is_empty() {
            return Err(Error::InvalidInput("empty path not allowed".into()));
        }

        if path.starts_with('/') || path.contains('\\') {
            return Err(Error::InvalidInput(format!(
                "path must be relative and slash-separated: {path}"
            )));
        }

        if path.contains('%') {
            return Err(Error::InvalidInput(format!(
                "percent-encoding not allowed in paths: {path}"
            )));
        }

        if path.chars().any(char::is_control) {
            return Err(Error::InvalidInput(format!(
                "control characters not allowed in paths: {path}"
            )));
        }

        for segment in path.split('/') {
            if segment == "." || segment == ".." {
                return Err(Error::InvalidInput(format!(
                    "path traversal not allowed: {path}"
                )));
            }
        }

        Ok(())
    }

    /// Returns the lakehouse location prefix.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Returns the backend for advanced operations.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    fn scoped_path(&self, path: &str) -> String {
        if self.location.is_empty() {
            path.to_string()
        } else {
            format!("{}/{path}", self.location)
        }
    }

    /// Reads an entire object at a location-relative path.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is invalid or the object is not found.
    pub async fn get_raw(&self, path: &str) -> Result<Bytes> {
        Self::validate_path(path)?;
        self.backend.get(&self.scoped_path(path)).await
    }

    /// Reads a byte range at a location-relative path.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is invalid, the object is not found, or
    /// the range is invalid.
    pub async fn get_range_raw(&self, path: &str, range: Range<u64>) -> Result<Bytes> {
        Self::validate_path(path)?;
        self.backend.get_range(&self.scoped_path(path), range).await
    }

    /// Writes data at a location-relative path.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is invalid or the backend fails.
    pub async fn put_raw(
        &self,
        path: &str,
        data: Bytes,
        precondition: WritePrecondition,
    ) -> Result<WriteResult> {
        Self::validate_path(path)?;
        self.backend
            .put(&self.scoped_path(path), data, precondition)
            .await
    }

    /// Deletes an object at a location-relative path (idempotent).
    ///
    /// # Errors
    ///
    /// Returns an error if the path is invalid or the backend fails.
    pub async fn delete_raw(&self, path: &str) -> Result<()> {
        Self::validate_path(path)?;
        self.backend.delete(&self.scoped_path(path)).await
    }

    /// Gets metadata at a location-relative path.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is invalid or the backend fails.
    pub async fn head_raw(&self, path: &str) -> Result<Option<ObjectMeta>> {
        Self::validate_path(path)?;
        self.backend.head(&self.scoped_path(path)).await
    }

    /// Returns true if an object exists at a location-relative path.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is invalid or the backend fails.
    pub async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.head_raw(path).await?.is_some())
    }

    /// Lists objects under a location-relative prefix.
    ///
    /// Returns location-relative paths (the scope prefix is stripped).
    ///
    /// # Errors
    ///
    /// Returns an error if the prefix is invalid or the backend fails.
    pub async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        Self::validate_path(prefix)?;
        let full_prefix = self.scoped_path(prefix);
        let metas = self.backend.list(&full_prefix).await?;

        if self.location.is_empty() {
            return Ok(metas.into_iter().map(|m| m.path).collect());
        }

        let scope_prefix = format!("{}/", self.location);
        Ok(metas
            .into_iter()
            .filter_map(|m| m.path.strip_prefix(&scope_prefix).map(str::to_string))
            .collect())
    }
}

impl std::fmt::Debug for LakehouseStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LakehouseStorage")
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}
