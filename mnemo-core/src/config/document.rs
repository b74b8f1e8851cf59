//! Stored document codec
//!
//! The record is stored as a compact JSON object with three string keys:
//!
//! ```text
//! {"mqtt_server":"example.tld","username":"","password":""}
//! ```
//!
//! There is no version field, schema tag or checksum. Decoding only checks
//! that the content is a JSON object; per-key checks happen when values are
//! copied into a [`ConfigRecord`].

use alloc::string::String;
use alloc::vec::Vec;

use serde::Serialize;
use serde_json::{Map, Value};

use super::record::{ConfigRecord, Field};

/// Largest stored document accepted for decoding
pub const MAX_DOCUMENT_SIZE: usize = 512;

/// Document encoding and decoding errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DocumentError {
    /// Document exceeds [`MAX_DOCUMENT_SIZE`]
    TooLarge { size: usize },
    /// Content is not a JSON object
    Malformed,
    /// Serialization failed
    Encode,
}

/// Why a single key could not be taken from a decoded document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ValueError {
    /// Key is absent
    Missing,
    /// Key is present but not a string (including `null`)
    NotAString,
}

// Field order here is the on-disk key order
#[derive(Serialize)]
struct Outgoing<'a> {
    mqtt_server: &'a str,
    username: &'a str,
    password: &'a str,
}

/// Encode a record into document bytes
///
/// Output is deterministic: the same record always yields the same bytes.
pub fn encode(record: &ConfigRecord) -> Result<Vec<u8>, DocumentError> {
    let outgoing = Outgoing {
        mqtt_server: record.broker_address(),
        username: record.username(),
        password: record.password(),
    };
    serde_json::to_vec(&outgoing).map_err(|_| DocumentError::Encode)
}

/// A decoded document
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    entries: Map<String, Value>,
}

impl StoredDocument {
    /// The string stored for `field`
    pub fn value(&self, field: Field) -> Result<&str, ValueError> {
        match self.entries.get(field.key()) {
            None => Err(ValueError::Missing),
            Some(Value::String(s)) => Ok(s.as_str()),
            Some(_) => Err(ValueError::NotAString),
        }
    }
}

/// Decode document bytes
///
/// Rejects anything over [`MAX_DOCUMENT_SIZE`] before parsing. Unknown keys
/// are kept but ignored.
pub fn decode(bytes: &[u8]) -> Result<StoredDocument, DocumentError> {
    if bytes.len() > MAX_DOCUMENT_SIZE {
        return Err(DocumentError::TooLarge { size: bytes.len() });
    }

    let entries: Map<String, Value> =
        serde_json::from_slice(bytes).map_err(|_| DocumentError::Malformed)?;

    Ok(StoredDocument { entries })
}
