//! Checksummed binary encoding of saved drafts.
//!
//! Drafts are normally stored as JSON. With the `binary-drafts` feature a
//! [`Draft`](crate::Draft) can also be written as a 32-byte fixed header
//! followed by a bincode-encoded payload.
//!
//! ## Wire Format
//!
//! ```text
//! Offset  Size  Field
//! 0       4     Magic bytes: b"TXDR"
//! 4       2     Format version (u16, little-endian)
//! 6       2     Crate format revision (u16, little-endian)
//! 8       4     Flags (u32, reserved)
//! 12      4     Payload length in bytes (u32, little-endian)
//! 16      16    BLAKE3 hash of the payload (truncated to 16 bytes)
//! 32..    var   Bincode-encoded payload
//! ```
//!
//! ## Versioning
//!
//! The format version in the header must match exactly. If it does not,
//! decoding fails immediately with [`DeserializeError::IncompatibleVersion`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Draft, DraftId, FormState, Value};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const MAGIC: &[u8; 4] = b"TXDR";
const FORMAT_VERSION: u16 = 1;
const REVISION: u16 = 1;
const HEADER_SIZE: usize = 32;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when encoding a [`Draft`](crate::Draft) to bytes.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("failed to encode draft: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("draft payload of {0} bytes exceeds the 4 GiB limit")]
    TooLarge(usize),
}

/// Errors that can occur when decoding a [`Draft`](crate::Draft) from bytes.
#[derive(Debug, Error)]
pub enum DeserializeError {
    #[error("not a draft file: invalid magic bytes")]
    BadMagic,

    #[error("incompatible format version: blob is v{blob}, supported is v{supported}")]
    IncompatibleVersion { blob: u16, supported: u16 },

    #[error("integrity check failed: BLAKE3 checksum mismatch")]
    ChecksumMismatch,

    #[error("payload length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: u32, actual: usize },

    #[error("failed to decode payload: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("validation failed: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Serialized type hierarchy
// ---------------------------------------------------------------------------

// `Value` and `FormState` serialize through JSON, which bincode cannot
// represent, so the payload uses explicitly tagged mirrors.

#[derive(Debug, Serialize, Deserialize)]
struct SerializedDraft {
    id: String,
    saved_at_millis: i64,
    fields: Vec<(String, SerializedValue)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum SerializedValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    List(Vec<SerializedValue>),
    Map(Vec<(String, SerializedValue)>),
}

// ---------------------------------------------------------------------------
// Value conversion
// ---------------------------------------------------------------------------

fn serialize_value(value: &Value) -> SerializedValue {
    match value {
        Value::Int(v) => SerializedValue::Int(*v),
        Value::Float(v) => SerializedValue::Float(*v),
        Value::Bool(v) => SerializedValue::Bool(*v),
        Value::String(v) => SerializedValue::Str(v.clone()),
        Value::List(items) => SerializedValue::List(items.iter().map(serialize_value).collect()),
        Value::Map(map) => SerializedValue::Map(
            map.iter()
                .map(|(k, v)| (k.clone(), serialize_value(v)))
                .collect(),
        ),
    }
}

fn deserialize_value(value: SerializedValue) -> Result<Value, DeserializeError> {
    Ok(match value {
        SerializedValue::Int(v) => Value::Int(v),
        SerializedValue::Float(v) => Value::Float(v),
        SerializedValue::Bool(v) => Value::Bool(v),
        SerializedValue::Str(v) => Value::String(v),
        SerializedValue::List(items) => Value::List(
            items
                .into_iter()
                .map(deserialize_value)
                .collect::<Result<_, _>>()?,
        ),
        SerializedValue::Map(entries) => Value::Map(deserialize_entries(entries)?),
    })
}

fn deserialize_entries(
    entries: Vec<(String, SerializedValue)>,
) -> Result<BTreeMap<String, Value>, DeserializeError> {
    let mut map = BTreeMap::new();
    for (key, value) in entries {
        if key.is_empty() {
            return Err(DeserializeError::Validation("empty field name".to_owned()));
        }
        if map.insert(key.clone(), deserialize_value(value)?).is_some() {
            return Err(DeserializeError::Validation(format!(
                "duplicate field '{key}'"
            )));
        }
    }
    Ok(map)
}

// ---------------------------------------------------------------------------
// Draft <-> SerializedDraft
// ---------------------------------------------------------------------------

fn draft_to_serialized(draft: &Draft) -> SerializedDraft {
    SerializedDraft {
        id: draft.id.to_string(),
        saved_at_millis: draft.saved_at.timestamp_millis(),
        fields: draft
            .form
            .iter()
            .map(|(k, v)| (k.to_owned(), serialize_value(v)))
            .collect(),
    }
}

fn serialized_to_draft(ser: SerializedDraft) -> Result<Draft, DeserializeError> {
    let id: DraftId = ser
        .id
        .parse()
        .map_err(|e: crate::DraftError| DeserializeError::Validation(e.to_string()))?;
    let saved_at = DateTime::<Utc>::from_timestamp_millis(ser.saved_at_millis).ok_or_else(|| {
        DeserializeError::Validation(format!(
            "timestamp {} out of range",
            ser.saved_at_millis
        ))
    })?;

    let form = FormState::from(deserialize_entries(ser.fields)?);

    Ok(Draft { id, form, saved_at })
}

// ---------------------------------------------------------------------------
// Header I/O
// ---------------------------------------------------------------------------

fn write_header(buf: &mut Vec<u8>, payload: &[u8]) -> Result<(), SerializeError> {
    let payload_len =
        u32::try_from(payload.len()).map_err(|_| SerializeError::TooLarge(payload.len()))?;
    let hash = blake3::hash(payload);

    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    buf.extend_from_slice(&REVISION.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes()); // flags (reserved)
    buf.extend_from_slice(&payload_len.to_le_bytes());
    buf.extend_from_slice(&hash.as_bytes()[..16]);
    Ok(())
}

#[allow(clippy::cast_possible_truncation)] // HEADER_SIZE is 32, always fits in u32
fn read_header(bytes: &[u8]) -> Result<(u16, u32, [u8; 16]), DeserializeError> {
    if bytes.len() < HEADER_SIZE {
        return Err(DeserializeError::LengthMismatch {
            expected: HEADER_SIZE as u32,
            actual: bytes.len(),
        });
    }

    if &bytes[0..4] != MAGIC {
        return Err(DeserializeError::BadMagic);
    }

    let format_version = u16::from_le_bytes([bytes[4], bytes[5]]);
    let payload_len = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);

    let mut hash = [0u8; 16];
    hash.copy_from_slice(&bytes[16..32]);

    Ok((format_version, payload_len, hash))
}

// ---------------------------------------------------------------------------
// Public encode/decode
// ---------------------------------------------------------------------------

pub(crate) fn encode(draft: &Draft) -> Result<Vec<u8>, SerializeError> {
    let serialized = draft_to_serialized(draft);
    let payload = bincode::serde::encode_to_vec(&serialized, bincode::config::standard())?;

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    write_header(&mut buf, &payload)?;
    buf.extend_from_slice(&payload);
    Ok(buf)
}

pub(crate) fn decode(bytes: &[u8]) -> Result<Draft, DeserializeError> {
    let (format_version, payload_len, stored_hash) = read_header(bytes)?;

    if format_version != FORMAT_VERSION {
        return Err(DeserializeError::IncompatibleVersion {
            blob: format_version,
            supported: FORMAT_VERSION,
        });
    }

    let payload = &bytes[HEADER_SIZE..];
    if payload.len() != payload_len as usize {
        return Err(DeserializeError::LengthMismatch {
            expected: payload_len,
            actual: payload.len(),
        });
    }

    let computed_hash = blake3::hash(payload);
    if computed_hash.as_bytes()[..16] != stored_hash {
        return Err(DeserializeError::ChecksumMismatch);
    }

    let (serialized, _): (SerializedDraft, usize) =
        bincode::serde::decode_from_slice(payload, bincode::config::standard())?;

    serialized_to_draft(serialized)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_value_survives_mirror() {
        let json = serde_json::json!({
            "t4": [{"employerName": "ACME", "employmentIncome": 52000.5}],
            "otherIncomeSources": "",
            "count": 2
        });
        let value = Value::from_json(json).unwrap();
        let restored = deserialize_value(serialize_value(&value)).unwrap();
        assert_eq!(restored, value);
    }

    #[test]
    fn duplicate_keys_rejected() {
        let entries = vec![
            ("a".to_owned(), SerializedValue::Int(1)),
            ("a".to_owned(), SerializedValue::Int(2)),
        ];
        assert!(matches!(
            deserialize_entries(entries),
            Err(DeserializeError::Validation(_))
        ));
    }

    #[test]
    fn empty_key_rejected() {
        let entries = vec![(String::new(), SerializedValue::Bool(true))];
        assert!(matches!(
            deserialize_entries(entries),
            Err(DeserializeError::Validation(_))
        ));
    }

    #[test]
    fn bad_draft_id_rejected() {
        let ser = SerializedDraft {
            id: "../../etc/passwd".to_owned(),
            saved_at_millis: 0,
            fields: vec![],
        };
        assert!(matches!(
            serialized_to_draft(ser),
            Err(DeserializeError::Validation(_))
        ));
    }

    #[test]
    fn header_round_trip() {
        let payload = b"test payload data";
        let mut buf = Vec::new();
        write_header(&mut buf, payload).unwrap();
        assert_eq!(buf.len(), HEADER_SIZE);

        let (format_version, payload_len, hash) = read_header(&buf).unwrap();
        assert_eq!(format_version, FORMAT_VERSION);
        assert_eq!(payload_len as usize, payload.len());
        assert_eq!(&hash, &blake3::hash(payload).as_bytes()[..16]);
    }

    #[test]
    fn header_bad_magic() {
        let mut buf = vec![0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(b"JSON");
        assert!(matches!(read_header(&buf), Err(DeserializeError::BadMagic)));
    }

    #[test]
    fn header_too_short() {
        let buf = vec![0u8; 10];
        assert!(matches!(
            read_header(&buf),
            Err(DeserializeError::LengthMismatch { .. })
        ));
    }
}
