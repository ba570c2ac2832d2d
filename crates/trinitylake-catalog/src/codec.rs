//! Deterministic binary serialization of tree nodes.
//!
//! The on-disk format is self-describing and canonical, so the same node
//! always encodes to the same bytes and content-addressed hashes are
//! stable:
//!
//! ```text
//! magic        4 bytes   "TLRN"
//! version      u16 BE    format version, currently 1
//! row count    u32 BE    number of rows that follow
//! rows         repeated, sorted ascending by key bytes:
//!   key len    u32 BE
//!   key        UTF-8 bytes
//!   value len  u32 BE
//!   value      UTF-8 bytes
//! ```
//!
//! Decoding is strict: unknown headers, duplicate or unsorted keys,
//! truncation, trailing bytes, missing reserved rows, and counter
//! mismatches are all rejected as corrupt.

use std::collections::BTreeMap;

use bytes::Bytes;

use trinitylake_core::error::{Error, Result};

use crate::keys;
use crate::node::TreeNode;

/// Magic bytes opening every root node file.
pub const MAGIC: [u8; 4] = *b"TLRN";

/// Current format version.
pub const FORMAT_VERSION: u16 = 1;

/// Serializes a node into its canonical byte representation.
///
/// # Errors
///
/// Returns [`Error::CorruptNode`] if the node is missing a reserved row
/// and therefore cannot be published as a root.
pub fn encode(node: &TreeNode) -> Result<Bytes> {
    if node.lakehouse_def_path().is_none() {
        return Err(Error::corrupt_node(
            "cannot encode node without a lakehouse definition pointer",
        ));
    }

    let row_count = node.rows().count();
    let row_count = u32::try_from(row_count)
        .map_err(|_| Error::corrupt_node(format!("too many rows to encode: {row_count}")))?;

    let mut buf = Vec::with_capacity(64);
    buf.extend_from_slice(&MAGIC);
    buf.extend_from_slice(&FORMAT_VERSION.to_be_bytes());
    buf.extend_from_slice(&row_count.to_be_bytes());

    for (key, value) in node.rows() {
        write_string(&mut buf, key)?;
        write_string(&mut buf, value)?;
    }

    Ok(Bytes::from(buf))
}

fn write_string(buf: &mut Vec<u8>, s: &str) -> Result<()> {
    let len = u32::try_from(s.len())
        .map_err(|_| Error::corrupt_node(format!("string too long to encode: {} bytes", s.len())))?;
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(s.as_bytes());
    Ok(())
}

/// Deserializes a node from its byte representation.
///
/// # Errors
///
/// Returns [`Error::CorruptNode`] on any integrity violation; see the
/// module docs for the full list.
pub fn decode(data: &[u8]) -> Result<TreeNode> {
    let mut cursor = Cursor::new(data);

    let magic = cursor.read_bytes(4)?;
    if magic != MAGIC {
        return Err(Error::corrupt_node(format!(
            "bad magic bytes: {magic:02x?}"
        )));
    }

    let version = cursor.read_u16()?;
    if version != FORMAT_VERSION {
        return Err(Error::corrupt_node(format!(
            "unsupported format version: {version}"
        )));
    }

    let declared_rows = cursor.read_u32()?;

    let mut rows = BTreeMap::new();
    let mut prev_key: Option<String> = None;
    for _ in 0..declared_rows {
        let key = cursor.read_string("key")?;
        let value = cursor.read_string("value")?;

        if let Some(prev) = &prev_key {
            if key.as_bytes() <= prev.as_bytes() {
                return Err(Error::corrupt_node(format!(
                    "keys out of canonical order: {key:?} after {prev:?}"
                )));
            }
        }
        prev_key = Some(key.clone());

        if rows.insert(key.clone(), value).is_some() {
            return Err(Error::corrupt_node(format!("duplicate key: {key:?}")));
        }
    }

    if !cursor.is_empty() {
        return Err(Error::corrupt_node(format!(
            "{} trailing bytes after last row",
            cursor.remaining()
        )));
    }

    let node = TreeNode::from_rows(rows);
    verify_reserved_rows(&node)?;
    Ok(node)
}

fn verify_reserved_rows(node: &TreeNode) -> Result<()> {
    if node.lakehouse_def_path().is_none() {
        return Err(Error::corrupt_node(
            "missing reserved row: lakehouse definition pointer",
        ));
    }

    let declared = node
        .get(keys::NUMBER_OF_KEYS)
        .ok_or_else(|| Error::corrupt_node("missing reserved row: number of keys"))?;
    let declared: u64 = declared.parse().map_err(|_| {
        Error::corrupt_node(format!("number of keys is not numeric: {declared:?}"))
    })?;

    let observed = node.num_user_keys();
    if declared != observed {
        return Err(Error::corrupt_node(format!(
            "number of keys mismatch: declared {declared}, observed {observed}"
        )));
    }

    Ok(())
}

/// Byte cursor with truncation-checked reads.
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Error::corrupt_node(format!(
                "truncated node file: wanted {n} bytes at offset {}, {} remain",
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_string(&mut self, what: &str) -> Result<String> {
        let len = self.read_u32()? as usize;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| Error::corrupt_node(format!("{what} is not valid UTF-8")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys;

    fn sample_node() -> TreeNode {
        let mut node = TreeNode::new();
        node.set(keys::LAKEHOUSE_DEF, "lakehouse/def.json");
        node.set("ns\u{001F}sales", "ns/sales/a.json");
        node.set("tbl\u{001F}sales\u{001F}orders", "tbl/sales/orders/b.json");
        node
    }

    #[test]
    fn test_roundtrip() {
        let node = sample_node();
        let bytes = encode(&node).expect("encode");
        let decoded = decode(&bytes).expect("decode");
        assert_eq!(decoded, node);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        // Same logical content built in a different order
        let mut a = TreeNode::new();
        a.set("ns\u{001F}b", "2");
        a.set("ns\u{001F}a", "1");
        a.set(keys::LAKEHOUSE_DEF, "lakehouse/def.json");

        let mut b = TreeNode::new();
        b.set(keys::LAKEHOUSE_DEF, "lakehouse/def.json");
        b.set("ns\u{001F}a", "1");
        b.set("ns\u{001F}b", "2");

        assert_eq!(encode(&a).unwrap(), encode(&b).unwrap());
    }

    #[test]
    fn test_header_layout() {
        let mut node = TreeNode::new();
        node.set(keys::LAKEHOUSE_DEF, "p");
        let bytes = encode(&node).unwrap();

        assert_eq!(&bytes[0..4], b"TLRN");
        assert_eq!(u16::from_be_bytes([bytes[4], bytes[5]]), FORMAT_VERSION);
        // Two rows: the pointer and the counter
        assert_eq!(
            u32::from_be_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]),
            2
        );
    }

    #[test]
    fn test_encode_requires_lakehouse_pointer() {
        let node = TreeNode::new();
        let err = encode(&node).expect_err("should fail");
        assert!(matches!(err, Error::CorruptNode { .. }));
    }

    #[test]
    fn test_decode_rejects_bad_magic() {
        let mut bytes = encode(&sample_node()).unwrap().to_vec();
        bytes[0] = b'X';
        assert!(matches!(
            decode(&bytes),
            Err(Error::CorruptNode { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_unknown_version() {
        let mut bytes = encode(&sample_node()).unwrap().to_vec();
        bytes[4] = 0xFF;
        assert!(matches!(
            decode(&bytes),
            Err(Error::CorruptNode { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_truncation() {
        let bytes = encode(&sample_node()).unwrap();
        for cut in [0, 3, 5, 9, bytes.len() - 1] {
            assert!(
                matches!(decode(&bytes[..cut]), Err(Error::CorruptNode { .. })),
                "truncation at {cut} must be rejected"
            );
        }
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        let mut bytes = encode(&sample_node()).unwrap().to_vec();
        bytes.push(0);
        assert!(matches!(
            decode(&bytes),
            Err(Error::CorruptNode { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_unsorted_rows() {
        // Hand-build a file with rows out of order
        let mut buf = Vec::new();
        buf.extend_from_slice(&MAGIC);
        buf.extend_from_slice(&FORMAT_VERSION.to_be_bytes());
        buf.extend_from_slice(&4u32.to_be_bytes());
        for (k, v) in [
            (keys::LAKEHOUSE_DEF, "p"),
            (keys::NUMBER_OF_KEYS, "2"),
            ("ns\u{001F}b", "2"),
            ("ns\u{001F}a", "1"),
        ] {
            buf.extend_from_slice(&u32::try_from(k.len()).unwrap().to_be_bytes());
            buf.extend_from_slice(k.as_bytes());
            buf.extend_from_slice(&u32::try_from(v.len()).unwrap().to_be_bytes());
            buf.extend_from_slice(v.as_bytes());
        }

        assert!(matches!(decode(&buf), Err(Error::CorruptNode { .. })));
    }

    #[test]
    fn test_decode_rejects_missing_reserved_rows() {
        // A file with only a user row
        let mut buf = Vec::new();
        buf.extend_from_slice(&MAGIC);
        buf.extend_from_slice(&FORMAT_VERSION.to_be_bytes());
        buf.extend_from_slice(&1u32.to_be_bytes());
        let (k, v) = ("ns\u{001F}a", "1");
        buf.extend_from_slice(&u32::try_from(k.len()).unwrap().to_be_bytes());
        buf.extend_from_slice(k.as_bytes());
        buf.extend_from_slice(&u32::try_from(v.len()).unwrap().to_be_bytes());
        buf.extend_from_slice(v.as_bytes());

        assert!(matches!(decode(&buf), Err(Error::CorruptNode { .. })));
    }

    #[test]
    fn test_decode_rejects_counter_mismatch() {
        // Counter claims 5 user keys but only one exists
        let mut buf = Vec::new();
        buf.extend_from_slice(&MAGIC);
        buf.extend_from_slice(&FORMAT_VERSION.to_be_bytes());
        buf.extend_from_slice(&3u32.to_be_bytes());
        for (k, v) in [
            (keys::LAKEHOUSE_DEF, "p"),
            (keys::NUMBER_OF_KEYS, "5"),
            ("ns\u{001F}a", "1"),
        ] {
            buf.extend_from_slice(&u32::try_from(k.len()).unwrap().to_be_bytes());
            buf.extend_from_slice(k.as_bytes());
            buf.extend_from_slice(&u32::try_from(v.len()).unwrap().to_be_bytes());
            buf.extend_from_slice(v.as_bytes());
        }

        assert!(matches!(decode(&buf), Err(Error::CorruptNode { .. })));
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&MAGIC);
        buf.extend_from_slice(&FORMAT_VERSION.to_be_bytes());
        buf.extend_from_slice(&1u32.to_be_bytes());
        buf.extend_from_slice(&2u32.to_be_bytes());
        buf.extend_from_slice(&[0xFF, 0xFE]);
        buf.extend_from_slice(&0u32.to_be_bytes());

        assert!(matches!(decode(&buf), Err(Error::CorruptNode { .. })));
    }

    #[test]
    fn test_roundtrip_preserves_empty_values() {
        let mut node = TreeNode::new();
        node.set(keys::LAKEHOUSE_DEF, "lakehouse/def.json");
        node.set("ns\u{001F}empty", "");

        let decoded = decode(&encode(&node).unwrap()).expect("decode");
        assert_eq!(decoded.get("ns\u{001F}empty"), Some(""));
        assert_eq!(decoded, node);
    }
}
