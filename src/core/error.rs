//! Error types for SeqCoord
//!
//! Defines all error types used throughout the library.
//!
//! Every failure surfaces synchronously at the point of construction or
//! query; the library never retries or recovers internally.

use thiserror::Error;

/// Main error type for SeqCoord operations
#[derive(Debug, Error)]
pub enum SeqCoordError {
    /// Coordinate construction or query errors
    #[error("Coordinate error: {0}")]
    Coord(#[from] CoordError),

    /// Persisted-form (tagged dictionary) errors
    #[error("Dictionary error: {0}")]
    Dict(#[from] DictError),
}

/// Errors raised when building or querying coordinate maps
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoordError {
    /// Coordinate lists that are unordered, negative or otherwise malformed
    #[error("Invalid coordinates: {message}")]
    InvalidCoordinates { message: String },

    /// Index outside the valid range after sign normalization
    #[error("Index {index} out of range for length {length}")]
    IndexOutOfRange { index: i64, length: i64 },

    /// Non-unit stride slicing is not supported
    #[error("Unsupported stride {step}: only step 1 slicing is supported")]
    UnsupportedStride { step: i64 },

    /// Location data lying entirely outside the declared parent length
    #[error("Located outside sequence: ({start}, {end}) with parent length {parent_length}")]
    OutsideParent {
        start: i64,
        end: i64,
        parent_length: i64,
    },

    /// Overlapping spans passed to inversion
    #[error("Map is not invertible: span starting at {start} overlaps previous end {previous_end}")]
    NotInvertible { start: i64, previous_end: i64 },

    /// Concatenation of maps defined against different parents
    #[error("Maps belong to different parents: lengths {left} and {right}")]
    ParentMismatch { left: i64, right: i64 },
}

impl CoordError {
    /// Create an invalid coordinates error from a message
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidCoordinates {
            message: message.into(),
        }
    }
}

/// Errors raised when decoding a tagged dictionary
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DictError {
    /// Required field absent from the dictionary
    #[error("Missing field '{0}'")]
    MissingField(&'static str),

    /// The `type` tag does not name the expected type
    #[error("Unexpected type tag '{found}', expected '{expected}'")]
    WrongType { expected: String, found: String },

    /// A field is present but holds the wrong shape of value
    #[error("Malformed field '{field}': {message}")]
    MalformedField { field: &'static str, message: String },
}

/// Result type alias for SeqCoord operations
pub type Result<T> = std::result::Result<T, SeqCoordError>;

/// Result type alias for coordinate operations
pub type CoordResult<T> = std::result::Result<T, CoordError>;

/// Result type alias for dictionary decoding
pub type DictResult<T> = std::result::Result<T, DictError>;
