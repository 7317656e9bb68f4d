//! Serialization layer. Defaults to JSON via serde_json.
//!
//! A collection is always encoded as a whole: one JSON array per file.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Converts whole collections to/from bytes for persistence.
pub trait Serializer: Send + Sync {
    /// Encode a collection to bytes.
    fn serialize<T>(&self, items: &[T]) -> Result<Vec<u8>>
    where
        T: Serialize;

    /// Decode bytes back into a collection.
    fn deserialize<T>(&self, bytes: &[u8]) -> Result<Vec<T>>
    where
        T: DeserializeOwned;
}

/// JSON serializer with optional pretty-printing.
#[derive(Debug, Clone, Default)]
pub struct JsonSerializer {
    pretty: bool,
}

impl JsonSerializer {
    /// Compact JSON (single line, no extra whitespace).
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretty-printed JSON, two-space indent. Easier to read and diff by hand.
    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    /// `true` when this serializer indents its output.
    pub fn is_pretty(&self) -> bool {
        self.pretty
    }
}

impl Serializer for JsonSerializer {
    fn serialize<T>(&self, items: &[T]) -> Result<Vec<u8>>
    where
        T: Serialize,
    {
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(items)
        } else {
            serde_json::to_vec(items)
        };
        bytes.map_err(|e| Error::Serialize(e.to_string()))
    }

    fn deserialize<T>(&self, bytes: &[u8]) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        serde_json::from_slice(bytes).map_err(Error::from)
    }
}
