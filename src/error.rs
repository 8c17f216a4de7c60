use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use axum_extra::extract::multipart::MultipartError;
use serde::Serialize;
use thiserror::Error as ThisError;

use crate::extract::ExtractionError;
use crate::relay::RelayError;

pub const NO_FILE_MESSAGE: &str = "No file uploaded";
pub const UNSUPPORTED_TYPE_MESSAGE: &str = "Only .jpg and .jpeg files are allowed";
pub const UNEXPECTED_FIELD_MESSAGE: &str = "Unexpected field";
pub const NOT_FOUND_MESSAGE: &str = "OCR result not found";
pub const SERVER_ERROR_MESSAGE: &str = "Server error";

#[derive(ThisError, Debug)]
pub enum Error {
    /// Missing, extra or disallowed upload
    #[error("{message}")]
    Validation { message: String },

    /// Malformed multipart body or body limit exceeded
    #[error(transparent)]
    Multipart(#[from] MultipartError),

    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// Staging file read/write failure
    #[error("temporary storage error")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
}

impl Error {
    pub fn no_file() -> Self {
        Error::Validation {
            message: NO_FILE_MESSAGE.to_string(),
        }
    }

    pub fn unsupported_type() -> Self {
        Error::Validation {
            message: UNSUPPORTED_TYPE_MESSAGE.to_string(),
        }
    }

    pub fn unexpected_field() -> Self {
        Error::Validation {
            message: UNEXPECTED_FIELD_MESSAGE.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation { .. } => StatusCode::BAD_REQUEST,
            Error::Multipart(err) => err.status(),
            Error::Relay(_) | Error::Extraction(_) | Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand back to the caller; upstream and filesystem details stay in the log.
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation { message } => message.clone(),
            Error::Multipart(err) => err.body_text(),
            Error::Extraction(_) => NOT_FOUND_MESSAGE.to_string(),
            Error::Relay(_) | Error::Io(_) => SERVER_ERROR_MESSAGE.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("OCR error: {}", error_chain(&self));
        } else {
            log::debug!("Rejected upload: {}", self);
        }

        let body = ErrorBody {
            success: false,
            message: self.user_message(),
        };
        (status, Json(body)).into_response()
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn validation_errors_are_bad_requests() {
        for err in [Error::no_file(), Error::unsupported_type(), Error::unexpected_field()] {
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        }
        assert_eq!(Error::no_file().user_message(), "No file uploaded");
    }

    #[test]
    fn extraction_failure_has_fixed_message() {
        let err = Error::from(ExtractionError);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), "OCR result not found");
    }

    #[test]
    fn io_failure_does_not_leak_details() {
        let err = Error::from(io::Error::new(io::ErrorKind::PermissionDenied, "/srv/uploads is read-only"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), "Server error");
    }

    #[test]
    fn error_chain_includes_sources() {
        let err = Error::from(io::Error::new(io::ErrorKind::Other, "disk full"));
        assert_eq!(error_chain(&err), "temporary storage error: disk full");
    }
}
