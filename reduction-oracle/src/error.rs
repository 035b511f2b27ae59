use std::time::Duration;

use lattice_core::LatticeError;
use serde::Serialize;

use crate::codec::CodecError;

/// Errors returned by reduction queries.
///
/// Every variant is recoverable: the caller decides whether to adjust
/// parameters, switch backend, or give up on that query.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OracleError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("could not write the basis for the engine: {0}")]
    SerializationFailure(String),

    #[error("reduction backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("reduction engine failed ({status}): {stderr}")]
    ProcessFailure { status: String, stderr: String },

    #[error("unexpected engine output: {0}")]
    ParseFailure(String),

    #[error("reduction engine timed out after {0:?}")]
    Timeout(Duration),

    #[error("engine returned {actual} entries for a basis of rank {expected}")]
    CardinalityMismatch { expected: usize, actual: usize },
}

/// Field-less mirror of [`OracleError`] for matching and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    InvalidParameter,
    SerializationFailure,
    BackendUnavailable,
    ProcessFailure,
    ParseFailure,
    Timeout,
    CardinalityMismatch,
}

impl OracleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OracleError::InvalidParameter(_) => ErrorKind::InvalidParameter,
            OracleError::SerializationFailure(_) => ErrorKind::SerializationFailure,
            OracleError::BackendUnavailable(_) => ErrorKind::BackendUnavailable,
            OracleError::ProcessFailure { .. } => ErrorKind::ProcessFailure,
            OracleError::ParseFailure(_) => ErrorKind::ParseFailure,
            OracleError::Timeout(_) => ErrorKind::Timeout,
            OracleError::CardinalityMismatch { .. } => ErrorKind::CardinalityMismatch,
        }
    }
}

impl From<LatticeError> for OracleError {
    fn from(err: LatticeError) -> Self {
        OracleError::InvalidParameter(err.to_string())
    }
}

impl From<CodecError> for OracleError {
    fn from(err: CodecError) -> Self {
        OracleError::ParseFailure(err.to_string())
    }
}
