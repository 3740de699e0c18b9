//! Serialization layer. Defaults to pretty JSON via serde_json.
//!
//! Implement [`Serializer`] if a backend needs a different on-disk encoding.

use crate::error::{Error, Result};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer as JsonWriter};
use serde_json::Value;

/// Indentation width used for persisted documents.
pub const DEFAULT_INDENT: usize = 2;

/// Converts whole documents to/from bytes for persistence.
pub trait Serializer: Send + Sync {
    /// Encode a document to bytes.
    fn serialize(&self, doc: &Value) -> Result<Vec<u8>>;

    /// Decode bytes back into a document.
    fn deserialize(&self, bytes: &[u8]) -> Result<Value>;
}

/// JSON serializer with a configurable indent. `None` means compact output.
#[derive(Debug, Clone)]
pub struct JsonSerializer {
    indent: Option<usize>,
}

impl Default for JsonSerializer {
    fn default() -> Self {
        Self::pretty()
    }
}

impl JsonSerializer {
    /// Two-space indented JSON followed by a newline.
    pub fn pretty() -> Self {
        Self::with_indent(DEFAULT_INDENT)
    }

    /// Indented JSON with `width` spaces per level.
    pub fn with_indent(width: usize) -> Self {
        Self {
            indent: Some(width),
        }
    }

    /// Compact JSON (single line, no extra whitespace).
    pub fn compact() -> Self {
        Self { indent: None }
    }
}

impl Serializer for JsonSerializer {
    fn serialize(&self, doc: &Value) -> Result<Vec<u8>> {
        let mut out = match self.indent {
            Some(width) => {
                let indent = vec![b' '; width];
                let mut buf = Vec::new();
                let mut writer =
                    JsonWriter::with_formatter(&mut buf, PrettyFormatter::with_indent(&indent));
                doc.serialize(&mut writer).map_err(Error::from)?;
                buf
            }
            None => serde_json::to_vec(doc).map_err(Error::from)?,
        };
        out.push(b'\n');
        Ok(out)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Value> {
        serde_json::from_slice(bytes).map_err(Error::from)
    }
}
