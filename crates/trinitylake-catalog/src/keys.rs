//! Deterministic key encoding between domain names and node keys.
//!
//! Every tree node owns a single flat key space. This module projects
//! namespace and table names into that space and back, parameterized by
//! the lakehouse descriptor's separator:
//!
//! - reserved keys start with the `$` sigil: `$lakehouse_def`,
//!   `$number_of_keys`
//! - namespace keys: `ns<SEP><namespace>`
//! - table keys: `tbl<SEP><namespace><SEP><table>`
//!
//! Names are validated before encoding: the separator, control characters,
//! and path separators are rejected, so classification is total - every
//! key present in a well-formed node is exactly one of reserved, namespace,
//! or table.

use trinitylake_core::error::{Error, Result};

use crate::defs::LakehouseDef;

/// Reserved key holding the storage path of the lakehouse descriptor blob.
pub const LAKEHOUSE_DEF: &str = "$lakehouse_def";

/// Reserved key holding the count of user keys, rendered as decimal text.
pub const NUMBER_OF_KEYS: &str = "$number_of_keys";

/// Sigil that opens every reserved key.
const RESERVED_SIGIL: char = '$';

/// Class prefix for namespace keys.
const NAMESPACE_PREFIX: &str = "ns";

/// Class prefix for table keys.
const TABLE_PREFIX: &str = "tbl";

/// Returns true if the key is one of the engine's reserved keys.
#[must_use]
pub fn is_reserved(key: &str) -> bool {
    key.starts_with(RESERVED_SIGIL)
}

/// Validates a namespace or table name against the descriptor's parameters.
///
/// # Errors
///
/// Returns [`Error::InvalidName`] if the name is empty, exceeds the
/// descriptor's length bound, contains the key separator, a control
/// character, or a path separator.
pub fn validate_name(name: &str, def: &LakehouseDef) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_name("name cannot be empty"));
    }

    if name.len() > def.max_name_length {
        return Err(Error::invalid_name(format!(
            "name is too long ({} > {} bytes): {name}",
            name.len(),
            def.max_name_length
        )));
    }

    if name.contains(&def.key_separator) {
        return Err(Error::invalid_name(format!(
            "name contains the key separator: {name:?}"
        )));
    }

    if name.chars().any(char::is_control) {
        return Err(Error::invalid_name(format!(
            "name contains control characters: {name:?}"
        )));
    }

    if name.contains('/') || name.contains('\\') {
        return Err(Error::invalid_name(format!(
            "name contains path separators: {name}"
        )));
    }

    Ok(())
}

/// Encodes a namespace name into its node key.
///
/// Injective: distinct names produce distinct keys.
///
/// # Errors
///
/// Returns [`Error::InvalidName`] if the name fails validation.
pub fn namespace_key(name: &str, def: &LakehouseDef) -> Result<String> {
    validate_name(name, def)?;
    Ok(format!("{NAMESPACE_PREFIX}{}{name}", def.key_separator))
}

/// Encodes a namespace + table name pair into its node key.
///
/// Injective and disjoint from namespace and reserved keys.
///
/// # Errors
///
/// Returns [`Error::InvalidName`] if either name fails validation.
pub fn table_key(namespace: &str, table: &str, def: &LakehouseDef) -> Result<String> {
    validate_name(namespace, def)?;
    validate_name(table, def)?;
    let sep = &def.key_separator;
    Ok(format!("{TABLE_PREFIX}{sep}{namespace}{sep}{table}"))
}

/// Returns true if the key is a well-formed namespace key.
#[must_use]
pub fn is_namespace_key(key: &str, def: &LakehouseDef) -> bool {
    let sep = &def.key_separator;
    key.strip_prefix(NAMESPACE_PREFIX)
        .and_then(|rest| rest.strip_prefix(sep.as_str()))
        .is_some_and(|name| !name.is_empty() && !name.contains(sep))
}

/// Returns true if the key is a well-formed table key.
#[must_use]
pub fn is_table_key(key: &str, def: &LakehouseDef) -> bool {
    let sep = &def.key_separator;
    let Some(rest) = key
        .strip_prefix(TABLE_PREFIX)
        .and_then(|rest| rest.strip_prefix(sep.as_str()))
    else {
        return false;
    };

    match rest.split_once(sep.as_str()) {
        Some((namespace, table)) => {
            !namespace.is_empty() && !table.is_empty() && !table.contains(sep)
        }
        None => false,
    }
}

/// Decodes the namespace name from a namespace key.
///
/// # Errors
///
/// Returns [`Error::MalformedKey`] if the key is not a namespace key.
pub fn namespace_name_from_key(key: &str, def: &LakehouseDef) -> Result<String> {
    if !is_namespace_key(key, def) {
        return Err(Error::malformed_key(format!(
            "not a namespace key: {key:?}"
        )));
    }

    let name = &key[NAMESPACE_PREFIX.len() + def.key_separator.len()..];
    Ok(name.to_string())
}

/// Decodes the `(namespace, table)` name pair from a table key.
///
/// # Errors
///
/// Returns [`Error::MalformedKey`] if the key is not a table key.
pub fn table_name_from_key(key: &str, def: &LakehouseDef) -> Result<(String, String)> {
    if !is_table_key(key, def) {
        return Err(Error::malformed_key(format!("not a table key: {key:?}")));
    }

    let rest = &key[TABLE_PREFIX.len() + def.key_separator.len()..];
    let (namespace, table) = rest
        .split_once(def.key_separator.as_str())
        .ok_or_else(|| Error::malformed_key(format!("not a table key: {key:?}")))?;
    Ok((namespace.to_string(), table.to_string()))
}
