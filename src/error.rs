//! Unified error types.

use std::net::AddrParseError;

use crate::error_tree::ErrorTree;
use crate::response::{ERROR_MESSAGE, IntoResponse, Response};

/// The error type returned by routekit's fallible infrastructure operations.
///
/// Application-level errors (404, 422, etc.) are expressed as HTTP
/// [`Response`] values, not as `Error`s. This type surfaces infrastructure
/// failures: parsing the listen address, binding to a port or accepting a
/// connection.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid listen address: {0}")]
    Address(#[from] AddrParseError),
}

/// One flat validation failure: a dotted/indexed field path and its message.
///
/// Paths are rooted at a synthetic segment, e.g. `Payload.addresses[0].street`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldFailure {
    pub path: String,
    pub message: String,
}

impl FieldFailure {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { path: path.into(), message: message.into() }
    }
}

/// Why a request payload could not be bound and validated.
///
/// Every variant is answered with `400 Bad Request` and the standard
/// envelope. Only [`PayloadError::Validation`] carries data back to the
/// client; the others use a fixed message so internals never leak.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    /// The payload type does not deserialize as a struct or map.
    #[error("payload type `{0}` is not a struct")]
    UnsupportedShape(&'static str),

    /// The request source could not populate the payload.
    #[error("failed to bind payload: {0}")]
    Bind(String),

    /// A JSON payload was expected but the content type says otherwise.
    #[error("expected `application/json`, got `{0}`")]
    ContentTypeMismatch(String),

    /// Structural validation failed on one or more fields.
    #[error("payload failed validation on {} field(s)", .0.len())]
    Validation(Vec<FieldFailure>),

    /// Validation failed without any field-level detail.
    #[error("payload rejected by validator: {0}")]
    Rejected(String),
}

impl IntoResponse for PayloadError {
    fn into_response(self) -> Response {
        match self {
            Self::ContentTypeMismatch(_) => Response::bad_request("Invalid request"),
            Self::Validation(failures) => {
                let tree = ErrorTree::from_failures(failures);
                Response::error_with(http::StatusCode::BAD_REQUEST, "Validation error", &tree)
            }
            Self::UnsupportedShape(_) | Self::Bind(_) | Self::Rejected(_) => {
                Response::bad_request(ERROR_MESSAGE)
            }
        }
    }
}
