//! Unified error type for all storage operations.

/// Things that can go wrong when using a [`Storage`](crate::Storage).
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A storage was built without a backing file path.
    MissingPath,
    /// A value could not be represented as JSON.
    InvalidValueType(String),
    /// `defaults`, `merge` or `extend` got something that isn't an object.
    InvalidArgumentType(String),
    /// A nested path can't be applied to the document shape.
    InvalidPath(String),
    /// File system problem (read, write, rename).
    Io(String),
    /// Failed to serialize the document to bytes.
    Serialize(String),
    /// Failed to deserialize bytes (or a stored value) back.
    Deserialize(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::MissingPath => write!(f, "a storage requires a backing file path"),
            Error::InvalidValueType(msg) => write!(f, "invalid value type: {msg}"),
            Error::InvalidArgumentType(msg) => write!(f, "invalid argument type: {msg}"),
            Error::InvalidPath(msg) => write!(f, "invalid path: {msg}"),
            Error::Io(msg) => write!(f, "i/o error: {msg}"),
            Error::Serialize(msg) => write!(f, "serialization error: {msg}"),
            Error::Deserialize(msg) => write!(f, "deserialization error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            Error::Io(err.to_string())
        } else if err.is_syntax() || err.is_eof() {
            Error::Deserialize(err.to_string())
        } else {
            Error::Serialize(err.to_string())
        }
    }
}

/// Result alias using our [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;
