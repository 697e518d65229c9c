//! Error types for vpnsession

use std::io;
use thiserror::Error;

/// A wire document did not match the expected schema.
///
/// Every parse path that touches required structure reports through this
/// type, either with a structural complaint naming the offending key or with
/// the underlying JSON error.
#[derive(Debug, Error)]
pub enum FormatError {
    /// Required key absent
    #[error("'{0}' key missing")]
    MissingField(String),
    /// Key present with an unexpected JSON type
    #[error("'{field}' must be {expected}")]
    WrongType { field: String, expected: &'static str },
    /// Version tag other than the supported one
    #[error("unknown version: {0}")]
    UnsupportedVersion(i64),
    /// Date not in `yyyy-MM-ddTHH:mm:ssZ` form
    #[error("invalid date in '{field}': {source}")]
    InvalidDate {
        field: String,
        #[source]
        source: chrono::ParseError,
    },
    /// Epoch timestamp outside the representable range
    #[error("timestamp out of range in '{0}'")]
    TimestampOutOfRange(String),
    /// Underlying JSON syntax error
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl FormatError {
    pub(crate) fn missing(field: &str) -> Self {
        FormatError::MissingField(field.to_string())
    }

    pub(crate) fn wrong_type(field: &str, expected: &'static str) -> Self {
        FormatError::WrongType {
            field: field.to_string(),
            expected,
        }
    }
}

#[derive(Debug, Error)]
pub enum VpnError {
    /// Malformed, incomplete or version-mismatched wire document
    #[error("unknown format: {0}")]
    Format(#[from] FormatError),
    /// Engine reported a status level this build does not know
    #[error("unhandled VPN connection level: {0}")]
    EngineInternal(String),
    /// Network interface enumeration failed
    #[error("interface lookup failed: {0}")]
    TransientLookup(String),
    /// OpenVPN config could not be turned into a profile
    #[error("profile import failed: {0}")]
    ProfileImport(String),
    /// Tunnel engine rejected a request
    #[error("engine error: {0}")]
    Engine(String),
    /// Invalid parameter
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// Not found
    #[error("not found: {0}")]
    NotFound(String),
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<serde_json::Error> for VpnError {
    fn from(error: serde_json::Error) -> Self {
        VpnError::Format(FormatError::Json(error))
    }
}

pub type VpnResult<T> = Result<T, VpnError>;
