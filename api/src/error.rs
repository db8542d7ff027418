use std::collections::HashMap;

use axum::{Json, http::StatusCode, response::IntoResponse};
use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind};
use diesel_async::pooled_connection::deadpool::PoolError;
use serde::Serialize;
use serde_json::Value;

/// Errors caused by the request itself. Implementors pick the status code,
/// the `Display` output is sent to the client as is.
pub trait ApiRequestError: std::error::Error {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
}

#[derive(Debug)]
pub enum ServerError {
    Database(diesel::result::Error),
    Pool(PoolError),
    Storage(object_store::Error),
}

impl ServerError {
    fn code(&self) -> &'static str {
        match self {
            ServerError::Database(_) | ServerError::Pool(_) => "DATABASE_ERR",
            ServerError::Storage(_) => "STORAGE_ERR",
        }
    }
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerError::Database(e) => write!(f, "database error: {e}"),
            ServerError::Pool(e) => write!(f, "connection pool error: {e}"),
            ServerError::Storage(e) => write!(f, "object storage error: {e}"),
        }
    }
}

impl Serialize for ServerError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("message", &self.to_string())?;
        map.end()
    }
}

#[derive(Debug)]
pub enum AppError {
    ServerError {
        error: ServerError,

        #[cfg(debug_assertions)]
        backtrace: Option<backtrace::Backtrace>,
    },
    RequestError {
        msg: String,
        status: StatusCode,
    },
    Unhandled(String),
}

impl AppError {
    fn server(error: ServerError) -> Self {
        AppError::ServerError {
            error,

            #[cfg(debug_assertions)]
            backtrace: Some(backtrace::Backtrace::new()),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ServerError { .. } | AppError::Unhandled(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::RequestError { status, .. } => *status,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    code: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    msg: Option<String>,

    #[cfg(debug_assertions)]
    #[serde(skip_serializing_if = "Option::is_none")]
    debug_info: Option<HashMap<&'static str, Value>>,
}

fn request_error_code(status: StatusCode) -> &'static str {
    match status {
        StatusCode::UNAUTHORIZED => "UNAUTHORIZED",
        StatusCode::FORBIDDEN => "FORBIDDEN",
        StatusCode::NOT_FOUND => "NOT_FOUND",
        StatusCode::CONFLICT => "CONFLICT",
        StatusCode::PAYLOAD_TOO_LARGE => "PAYLOAD_TOO_LARGE",
        StatusCode::UNPROCESSABLE_ENTITY => "UNPROCESSABLE",
        _ => "BAD_REQUEST",
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status_code, error_response) = match self {
            AppError::ServerError {
                error,
                #[cfg(debug_assertions)]
                backtrace,
            } => {
                tracing::error!(%error, "Request failed with a server error");

                #[cfg(debug_assertions)]
                let debug_info = {
                    let frames_info = backtrace
                        .as_ref()
                        .map(filter_backtrace)
                        .unwrap_or_default();
                    Some(HashMap::from([
                        (
                            "backtrace",
                            serde_json::to_value(&frames_info).unwrap_or_default(),
                        ),
                        ("error", serde_json::to_value(&error).unwrap_or_default()),
                    ]))
                };

                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        code: error.code().into(),
                        msg: Some("Internal server error".into()),
                        #[cfg(debug_assertions)]
                        debug_info,
                    },
                )
            }
            AppError::RequestError { msg, status } => (
                status,
                ErrorResponse {
                    code: request_error_code(status).into(),
                    msg: Some(msg),
                    #[cfg(debug_assertions)]
                    debug_info: None,
                },
            ),
            AppError::Unhandled(e) => {
                tracing::error!(error = %e, "Unhandled error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        code: "ERR".into(),
                        msg: Some(e),
                        #[cfg(debug_assertions)]
                        debug_info: None,
                    },
                )
            }
        };

        (status_code, Json(error_response)).into_response()
    }
}

/// Maps a unique constraint violation to a message the user can act on.
fn unique_violation_message(info: &dyn DatabaseErrorInformation) -> &'static str {
    let constraint = info.constraint_name().unwrap_or_default();
    let message = info.message();

    if constraint == "profiles_username_key" || message.contains("profiles_username_key") {
        "This username is already taken"
    } else if constraint == "profiles_email_key" || message.contains("profiles_email_key") {
        "An account with this email already exists"
    } else if message.contains("duplicate key") {
        "This already exists"
    } else {
        "Conflicting record"
    }
}

impl From<diesel::result::Error> for AppError {
    fn from(e: diesel::result::Error) -> Self {
        match e {
            diesel::result::Error::NotFound => AppError::RequestError {
                msg: "Not found".into(),
                status: StatusCode::NOT_FOUND,
            },
            diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                AppError::RequestError {
                    msg: unique_violation_message(info.as_ref()).into(),
                    status: StatusCode::CONFLICT,
                }
            }
            e => AppError::server(ServerError::Database(e)),
        }
    }
}

impl From<PoolError> for AppError {
    fn from(e: PoolError) -> Self {
        AppError::server(ServerError::Pool(e))
    }
}

impl From<object_store::Error> for AppError {
    fn from(e: object_store::Error) -> Self {
        AppError::server(ServerError::Storage(e))
    }
}

impl<E: ApiRequestError> From<E> for AppError {
    fn from(e: E) -> Self {
        AppError::RequestError {
            msg: e.to_string(),
            status: e.status_code(),
        }
    }
}

impl From<&'static str> for AppError {
    fn from(e: &'static str) -> Self {
        AppError::Unhandled(e.into())
    }
}

impl From<String> for AppError {
    fn from(e: String) -> Self {
        AppError::Unhandled(e)
    }
}

impl From<(&'static str, StatusCode)> for AppError {
    fn from((msg, status): (&'static str, StatusCode)) -> Self {
        AppError::RequestError {
            msg: msg.into(),
            status,
        }
    }
}

impl From<(String, StatusCode)> for AppError {
    fn from((msg, status): (String, StatusCode)) -> Self {
        AppError::RequestError { msg, status }
    }
}

#[cfg(debug_assertions)]
#[derive(Serialize, Debug)]
struct FrameInfo {
    name: String,
    loc: String,
}

#[cfg(debug_assertions)]
fn filter_backtrace(backtrace: &backtrace::Backtrace) -> Vec<FrameInfo> {
    const MODULE_PREFIX: &str = concat!(env!("CARGO_CRATE_NAME"), "::");
    let mut frames_info: Vec<FrameInfo> = Vec::new();

    for frame in backtrace.frames() {
        for symbol in frame.symbols() {
            if let (Some(name), Some(filename), Some(lineno)) = (
                symbol.name().map(|n| n.to_string()),
                symbol.filename().map(|f| f.to_owned()),
                symbol.lineno(),
            ) {
                if name.contains(MODULE_PREFIX) {
                    frames_info.push(FrameInfo {
                        name,
                        loc: format!("{}:{}", filename.display(), lineno),
                    });
                }
            }
        }
    }

    frames_info
}

#[cfg(test)]
mod test {
    use super::*;

    fn unique_violation(message: &str) -> diesel::result::Error {
        diesel::result::Error::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new(message.to_string()),
        )
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let err = AppError::from(diesel::result::Error::NotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_duplicate_username_is_friendly() {
        let err = AppError::from(unique_violation(
            "duplicate key value violates unique constraint \"profiles_username_key\"",
        ));

        match err {
            AppError::RequestError { msg, status } => {
                assert_eq!(status, StatusCode::CONFLICT);
                assert_eq!(msg, "This username is already taken");
            }
            _ => panic!("Expected a request error"),
        }
    }

    #[test]
    fn test_duplicate_email_is_friendly() {
        let err = AppError::from(unique_violation(
            "duplicate key value violates unique constraint \"profiles_email_key\"",
        ));

        match err {
            AppError::RequestError { msg, .. } => {
                assert_eq!(msg, "An account with this email already exists")
            }
            _ => panic!("Expected a request error"),
        }
    }

    #[test]
    fn test_other_database_errors_are_server_errors() {
        let err = AppError::from(diesel::result::Error::RollbackTransaction);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(matches!(err, AppError::ServerError { .. }));
    }

    #[test]
    fn test_tuple_keeps_status() {
        let err = AppError::from(("Nope", StatusCode::FORBIDDEN));
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }
}
