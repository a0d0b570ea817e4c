use std::io;
use std::num::ParseIntError;
use std::path::PathBuf;

use thiserror::Error;

use crate::object::ObjectKind;

/// Failure while decoding a single node of the map (a layer's tile stream, a
/// GID, an object's shape).
///
/// These never surface on their own from a load; [`MapError`] wraps them with
/// the layer or object they came from.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The layer data tag is none of plain, `csv` or `base64`.
    #[error("unrecognized encoding '{0}'")]
    UnrecognizedEncoding(String),
    /// A base64 payload declares a compression other than `zlib` or `gzip`.
    #[error("unrecognized compression '{0}'")]
    UnrecognizedCompression(String),
    /// The base64 text itself is invalid.
    #[error("invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    /// The zlib/gzip stream could not be inflated.
    #[error("could not decompress payload: {0}")]
    Decompress(#[source] io::Error),
    /// A CSV token is not an unsigned 32-bit integer.
    #[error("invalid csv token '{token}': {source}")]
    InvalidCsv {
        /// Offending token after cleanup.
        token: String,
        /// Underlying integer parse failure.
        source: ParseIntError,
    },
    /// The decoded tile count (or byte count for binary data) is not what the
    /// map dimensions require.
    #[error("decoded data length {actual} does not match expected {expected}")]
    DecodedLengthMismatch {
        /// width * height (times 4 for binary payloads).
        expected: usize,
        /// What was actually decoded.
        actual: usize,
    },
    /// A bare GID falls below every tileset's first GID.
    #[error("GID {0} does not belong to any tileset")]
    InvalidGid(u32),
    /// A shape accessor was called on an object of another kind.
    #[error("object is a {actual}, not a {expected}")]
    InvalidShapeAccess {
        /// Kind the accessor serves.
        expected: ObjectKind,
        /// Kind the object was classified as.
        actual: ObjectKind,
    },
    /// A polygon/polyline point string has a bad token.
    #[error("malformed point list '{0}'")]
    MalformedPointList(String),
}

/// Error returned from loading a map. A load either yields a complete map or
/// exactly one of these.
#[derive(Debug, Error)]
pub enum MapError {
    /// The map declares infinite (chunked) layer storage.
    #[error("infinite maps are not supported")]
    UnsupportedStorageMode,
    /// A resolved tileset breaks a structural precondition.
    #[error("tileset '{tileset}' has invalid {field}: {reason}")]
    TilesetValidation {
        /// Tileset name.
        tileset: String,
        /// Failed field.
        field: &'static str,
        /// Human readable reason.
        reason: String,
    },
    /// File extension is not a known map or tileset syntax.
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),
    /// Reading a document failed.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },
    /// JSON syntax or shape error.
    #[error("failed to parse JSON {path}: {source}")]
    Json {
        /// Document being parsed.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },
    /// XML syntax error.
    #[error("failed to parse XML {path}: {source}")]
    Xml {
        /// Document being parsed.
        path: PathBuf,
        /// Underlying error.
        source: quick_xml::Error,
    },
    /// The document is well-formed but misses or garbles a required value.
    #[error("malformed document {path}: {reason}")]
    Malformed {
        /// Document being parsed.
        path: PathBuf,
        /// What is wrong.
        reason: String,
    },
    /// A tile layer failed to decode.
    #[error("layer '{layer}': {source}")]
    Layer {
        /// Layer name.
        layer: String,
        /// Cause.
        source: DecodeError,
    },
    /// An object failed to hydrate.
    #[error("object {object} in group '{group}': {source}")]
    Object {
        /// Object group name.
        group: String,
        /// Object id.
        object: u32,
        /// Cause.
        source: DecodeError,
    },
    /// A tile-local collision object failed to hydrate.
    #[error("tile {tile} of tileset '{tileset}': {source}")]
    TileObjects {
        /// Tileset name.
        tileset: String,
        /// Local tile id.
        tile: u32,
        /// Cause.
        source: DecodeError,
    },
}

impl MapError {
    /// The node-level cause, when this error wraps one.
    pub fn decode_error(&self) -> Option<&DecodeError> {
        match self {
            MapError::Layer { source, .. }
            | MapError::Object { source, .. }
            | MapError::TileObjects { source, .. } => Some(source),
            _ => None,
        }
    }
}
