//! Definition models for the lakehouse, namespaces, and tables.
//!
//! Definitions are immutable descriptor blobs stored as JSON under paths
//! that embed a fresh unique component, so writes never conflict. Altering
//! a namespace or table writes a new blob and swings the pointer in the
//! tree node; the prior blob stays readable forever.

use std::collections::HashMap;

use bytes::Bytes;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use trinitylake_core::error::{Error, Result};
use trinitylake_core::{LakehouseStorage, WritePrecondition};

/// Default separator between key components: ASCII unit separator.
///
/// A control character, so it can never appear in a validated name.
pub const DEFAULT_KEY_SEPARATOR: &str = "\u{001F}";

/// Default upper bound on namespace and table name length.
pub const DEFAULT_MAX_NAME_LENGTH: usize = 128;

fn default_format_version() -> u32 {
    1
}

fn default_key_separator() -> String {
    DEFAULT_KEY_SEPARATOR.to_string()
}

fn default_max_name_length() -> usize {
    DEFAULT_MAX_NAME_LENGTH
}

/// Lakehouse descriptor: immutable naming parameters for one catalog.
///
/// Written once at lakehouse creation; the key encoder derives every user
/// key from these parameters, so they can never change for the lifetime of
/// the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LakehouseDef {
    /// Descriptor format version.
    #[serde(default = "default_format_version")]
    pub format_version: u32,

    /// Separator between key components (class prefix, namespace, table).
    #[serde(default = "default_key_separator")]
    pub key_separator: String,

    /// Maximum length of a namespace or table name.
    #[serde(default = "default_max_name_length")]
    pub max_name_length: usize,

    /// Free-form catalog properties.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub properties: HashMap<String, String>,
}

impl Default for LakehouseDef {
    fn default() -> Self {
        Self {
            format_version: default_format_version(),
            key_separator: default_key_separator(),
            max_name_length: default_max_name_length(),
            properties: HashMap::new(),
        }
    }
}

impl LakehouseDef {
    /// Validates the descriptor's naming parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the separator is empty or the
    /// name length bound is zero.
    pub fn validate(&self) -> Result<()> {
        if self.key_separator.is_empty() {
            return Err(Error::InvalidInput(
                "lakehouse key separator cannot be empty".into(),
            ));
        }
        if self.max_name_length == 0 {
            return Err(Error::InvalidInput(
                "lakehouse max name length cannot be zero".into(),
            ));
        }
        Ok(())
    }
}

/// Namespace descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceDef {
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Free-form namespace properties.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub properties: HashMap<String, String>,
}

/// Format of the data a table points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum TableFormat {
    /// Apache Parquet format.
    #[default]
    Parquet,
    /// Delta Lake format.
    Delta,
    /// Apache Iceberg format.
    Iceberg,
    /// CSV files.
    Csv,
    /// JSON files.
    Json,
    /// Avro format.
    Avro,
}

/// Table descriptor.
///
/// The catalog only stores the pointer; physical data files are managed
/// elsewhere.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDef {
    /// Storage location of the table data (object store URI).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Data format.
    #[serde(default)]
    pub format: TableFormat,

    /// Free-form table properties.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub properties: HashMap<String, String>,
}

// ============================================================================
// Blob I/O
// ============================================================================

async fn write_json<T>(storage: &LakehouseStorage, path: &str, value: &T) -> Result<()>
where
    T: Serialize + Sync,
{
    let bytes = serde_json::to_vec(value)
        .map_err(|e| Error::serialization(format!("serialize definition at {path}: {e}")))?;
    storage
        .put_raw(path, Bytes::from(bytes), WritePrecondition::None)
        .await?;
    Ok(())
}

async fn read_json<T>(storage: &LakehouseStorage, path: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    let bytes = storage.get_raw(path).await?;
    serde_json::from_slice(&bytes)
        .map_err(|e| Error::serialization(format!("parse definition at {path}: {e}")))
}

/// Writes a lakehouse descriptor blob.
///
/// # Errors
///
/// Returns an error if serialization or the storage write fails.
pub async fn write_lakehouse_def(
    storage: &LakehouseStorage,
    path: &str,
    def: &LakehouseDef,
) -> Result<()> {
    write_json(storage, path, def).await
}

/// Reads a lakehouse descriptor blob.
///
/// # Errors
///
/// Returns an error if the blob is missing or cannot be parsed.
pub async fn read_lakehouse_def(storage: &LakehouseStorage, path: &str) -> Result<LakehouseDef> {
    read_json(storage, path).await
}

/// Writes a namespace descriptor blob.
///
/// # Errors
///
/// Returns an error if serialization or the storage write fails.
pub async fn write_namespace_def(
    storage: &LakehouseStorage,
    path: &str,
    def: &NamespaceDef,
) -> Result<()> {
    write_json(storage, path, def).await
}

/// Reads a namespace descriptor blob.
///
/// # Errors
///
/// Returns an error if the blob is missing or cannot be parsed.
pub async fn read_namespace_def(storage: &LakehouseStorage, path: &str) -> Result<NamespaceDef> {
    read_json(storage, path).await
}

/// Writes a table descriptor blob.
///
/// # Errors
///
/// Returns an error if serialization or the storage write fails.
pub async fn write_table_def(
    storage: &LakehouseStorage,
    path: &str,
    def: &TableDef,
) -> Result<()> {
    write_json(storage, path, def).await
}

/// Reads a table descriptor blob.
///
/// # Errors
///
/// Returns an error if the blob is missing or cannot be parsed.
pub async fn read_table_def(storage: &LakehouseStorage, path: &str) -> Result<TableDef> {
    read_json(storage, path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use trinitylake_core::MemoryBackend;

    fn test_storage() -> LakehouseStorage {
        LakehouseStorage::new(Arc::new(MemoryBackend::new()), "demo").unwrap()
    }

    #[test]
    fn test_lakehouse_def_defaults() {
        let def = LakehouseDef::default();
        assert_eq!(def.format_version, 1);
        assert_eq!(def.key_separator, "\u{001F}");
        assert_eq!(def.max_name_length, 128);
        def.validate().expect("defaults must be valid");
    }

    #[test]
    fn test_lakehouse_def_validation() {
        let def = LakehouseDef {
            key_separator: String::new(),
            ..LakehouseDef::default()
        };
        assert!(def.validate().is_err());

        let def = LakehouseDef {
            max_name_length: 0,
            ..LakehouseDef::default()
        };
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_lakehouse_def_json_uses_defaults_for_missing_fields() {
        let def: LakehouseDef = serde_json::from_str("{}").expect("parse");
        assert_eq!(def, LakehouseDef::default());
    }

    #[tokio::test]
    async fn test_namespace_def_roundtrip() {
        let storage = test_storage();
        let def = NamespaceDef {
            description: Some("sales data".into()),
            properties: HashMap::from([("owner".into(), "finance".into())]),
        };

        write_namespace_def(&storage, "ns/sales/blob.json", &def)
            .await
            .expect("write");
        let read = read_namespace_def(&storage, "ns/sales/blob.json")
            .await
            .expect("read");
        assert_eq!(read, def);
    }

    #[tokio::test]
    async fn test_table_def_roundtrip() {
        let storage = test_storage();
        let def = TableDef {
            location: Some("s3://bucket/sales/orders".into()),
            format: TableFormat::Iceberg,
            properties: HashMap::new(),
        };

        write_table_def(&storage, "tbl/sales/orders/blob.json", &def)
            .await
            .expect("write");
        let read = read_table_def(&storage, "tbl/sales/orders/blob.json")
            .await
            .expect("read");
        assert_eq!(read, def);
    }

    #[tokio::test]
    async fn test_read_missing_def_is_not_found() {
        let storage = test_storage();
        let err = read_table_def(&storage, "tbl/absent/blob.json")
            .await
            .expect_err("should fail");
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_read_garbage_is_serialization_error() {
        let storage = test_storage();
        storage
            .put_raw(
                "ns/sales/garbage.json",
                Bytes::from_static(b"not json"),
                WritePrecondition::None,
            )
            .await
            .unwrap();

        let err = read_namespace_def(&storage, "ns/sales/garbage.json")
            .await
            .expect_err("should fail");
        assert!(matches!(err, Error::Serialization { .. }));
    }
}
