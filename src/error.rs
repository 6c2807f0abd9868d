use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::{Request, Response};
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::Responses;
use rocket_okapi::response::OpenApiResponderInner;
use serde::Serialize;
use std::io::Cursor;
use thiserror::Error;

/// Errors produced by the port service, its import pipeline and repositories.
#[derive(Debug, Error)]
pub enum PortError {
    #[error("port not found")]
    NotFound,
    #[error("invalid port: {0}")]
    InvalidPort(String),
    #[error("invalid json: {0}")]
    InvalidJson(serde_json::Error),
    #[error("repository error: {0}")]
    Repository(#[from] sqlx::Error),
    /// A partial batch could not be saved while handling a parse error.
    #[error("failed to save batch: {save}; {parse}")]
    SaveAfterParse {
        save: Box<PortError>,
        #[source]
        parse: Box<PortError>,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The decoding task ended abnormally before finishing the document.
    #[error("port decoder failed: {0}")]
    DecoderFailed(String),
}

impl PortError {
    /// True for malformed import input, including when it is wrapped by a
    /// failed flush.
    pub fn is_invalid_json(&self) -> bool {
        match self {
            PortError::InvalidJson(_) => true,
            PortError::SaveAfterParse { parse, .. } => parse.is_invalid_json(),
            _ => false,
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    DatabaseError(String),
    NotFound(String),
    BadRequest(String),
    InternalError(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let (status, error_type, message) = match self {
            ApiError::DatabaseError(msg) => {
                log::error!("database error: {}", msg);
                (
                    Status::InternalServerError,
                    "DatabaseError",
                    "internal server error".to_string(),
                )
            }
            ApiError::NotFound(msg) => {
                log::debug!("not found: {}", msg);
                (Status::NotFound, "NotFound", msg)
            }
            ApiError::BadRequest(msg) => {
                log::debug!("bad request: {}", msg);
                (Status::BadRequest, "BadRequest", msg)
            }
            ApiError::InternalError(msg) => {
                log::error!("internal error: {}", msg);
                (
                    Status::InternalServerError,
                    "InternalError",
                    "internal server error".to_string(),
                )
            }
        };

        let error_response = ErrorResponse {
            error: error_type.to_string(),
            message,
        };

        let json = serde_json::to_string(&error_response).unwrap_or_else(|_| {
            r#"{"error":"SerializationError","message":"Failed to serialize error"}"#.to_string()
        });

        Response::build()
            .status(status)
            .header(rocket::http::ContentType::JSON)
            .sized_body(json.len(), Cursor::new(json))
            .ok()
    }
}

impl OpenApiResponderInner for ApiError {
    fn responses(_generator: &mut OpenApiGenerator) -> rocket_okapi::Result<Responses> {
        Ok(Responses::default())
    }
}

impl From<PortError> for ApiError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound => ApiError::NotFound(err.to_string()),
            PortError::InvalidPort(_) | PortError::InvalidJson(_) => {
                ApiError::BadRequest(err.to_string())
            }
            PortError::Repository(_) | PortError::SaveAfterParse { .. } => {
                ApiError::DatabaseError(err.to_string())
            }
            PortError::Io(_) | PortError::DecoderFailed(_) => {
                ApiError::InternalError(err.to_string())
            }
        }
    }
}
