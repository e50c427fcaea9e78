use axum::{
    extract::rejection::BytesRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tokio_postgres::error::SqlState;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Unknown resource: {path}")]
    UnknownResource { path: String },

    #[error("No matches in {resource} for {id}")]
    NoMatches { resource: String, id: String },

    #[error("Method {method} not allowed on {path}")]
    MethodNotAllowed { method: String, path: String },

    #[error("Validation failed for {resource}: {message}")]
    Validation { resource: String, message: String },

    #[error("Request body rejected: {cause}")]
    PayloadTooLarge { cause: String },

    #[error("Unreadable request body: {cause}")]
    UnreadableBody { cause: String },

    #[error("Constraint violation ({constraint}): {cause}")]
    ConstraintViolation { constraint: String, cause: String },

    #[error("Invalid input: {cause}")]
    InvalidInput { cause: String },

    #[error("Too many requests in flight")]
    Overloaded,

    #[error("Connection failed: {cause}")]
    ConnectionFailed { cause: String },

    #[error("Query timed out after {elapsed:?}")]
    Timeout { elapsed: Duration },

    #[error("Query failed for {resource}: {cause}")]
    QueryFailed { resource: String, cause: String },

    #[error("Invalid resource registry: {0}")]
    InvalidRegistry(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::UnknownResource { .. } | GatewayError::NoMatches { .. } => {
                StatusCode::NOT_FOUND
            }
            GatewayError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::Validation { .. }
            | GatewayError::InvalidInput { .. }
            | GatewayError::UnreadableBody { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            GatewayError::ConstraintViolation { .. } => StatusCode::CONFLICT,
            GatewayError::Overloaded | GatewayError::ConnectionFailed { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            GatewayError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::QueryFailed { .. }
            | GatewayError::InvalidRegistry(_)
            | GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Build the JSON error body, tagging it with the request's correlation id.
    pub fn to_error_response(&self, request_id: Option<String>) -> ErrorResponse {
        let (error, message, resource, cause) = match self {
            GatewayError::UnknownResource { path } => (
                "unknown_resource",
                format!("No resource is mapped to '{}'", path),
                None,
                None,
            ),
            GatewayError::NoMatches { resource, id } => (
                "no_matches",
                format!("No matches for '{}'", id),
                Some(resource.clone()),
                None,
            ),
            GatewayError::MethodNotAllowed { method, path } => (
                "method_not_allowed",
                format!("{} is not supported on '{}'", method, path),
                None,
                None,
            ),
            GatewayError::Validation { resource, message } => (
                "validation_error",
                message.clone(),
                Some(resource.clone()),
                None,
            ),
            GatewayError::PayloadTooLarge { cause } => (
                "payload_too_large",
                "Request body exceeds the configured limit".to_string(),
                None,
                Some(cause.clone()),
            ),
            GatewayError::UnreadableBody { cause } => (
                "unreadable_body",
                "Request body could not be read".to_string(),
                None,
                Some(cause.clone()),
            ),
            GatewayError::ConstraintViolation { constraint, cause } => (
                "constraint_violation",
                format!("Constraint '{}' rejected the change", constraint),
                None,
                Some(cause.clone()),
            ),
            GatewayError::InvalidInput { cause } => (
                "invalid_input",
                "The database rejected a value".to_string(),
                None,
                Some(cause.clone()),
            ),
            GatewayError::Overloaded => (
                "overloaded",
                "Too many requests in flight, retry later".to_string(),
                None,
                None,
            ),
            GatewayError::ConnectionFailed { cause } => (
                "connection_failed",
                "Database is unavailable".to_string(),
                None,
                Some(cause.clone()),
            ),
            GatewayError::Timeout { elapsed } => (
                "timeout",
                format!("Query did not complete within {}ms", elapsed.as_millis()),
                None,
                None,
            ),
            GatewayError::QueryFailed { resource, cause } => (
                "query_failed",
                format!("Query for '{}' failed", resource),
                Some(resource.clone()),
                Some(cause.clone()),
            ),
            GatewayError::InvalidRegistry(msg) => {
                ("invalid_registry", msg.clone(), None, None)
            }
            GatewayError::Internal(msg) => ("internal_error", msg.clone(), None, None),
        };

        ErrorResponse {
            error: error.to_string(),
            message,
            resource,
            cause,
            request_id,
        }
    }

    pub fn into_response_with_id(self, request_id: Option<String>) -> Response {
        let body = self.to_error_response(request_id);
        (self.status_code(), Json(body)).into_response()
    }

    /// Attach the resource name to a database failure that did not know it.
    pub fn for_resource(self, resource: &str) -> Self {
        match self {
            GatewayError::Internal(cause) => GatewayError::QueryFailed {
                resource: resource.to_string(),
                cause,
            },
            other => other,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        self.into_response_with_id(None)
    }
}

impl From<BytesRejection> for GatewayError {
    fn from(rejection: BytesRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            GatewayError::PayloadTooLarge {
                cause: rejection.body_text(),
            }
        } else {
            GatewayError::UnreadableBody {
                cause: rejection.body_text(),
            }
        }
    }
}

impl From<tokio_postgres::Error> for GatewayError {
    fn from(err: tokio_postgres::Error) -> Self {
        let Some(db_err) = err.as_db_error() else {
            if err.is_closed() {
                return GatewayError::ConnectionFailed {
                    cause: err.to_string(),
                };
            }
            return GatewayError::Internal(err.to_string());
        };

        let cause = match db_err.detail() {
            Some(detail) => format!("{} ({})", db_err.message(), detail),
            None => db_err.message().to_string(),
        };

        let code = db_err.code();
        if is_constraint_violation(code) {
            GatewayError::ConstraintViolation {
                constraint: db_err
                    .constraint()
                    .map(str::to_string)
                    .unwrap_or_else(|| code.code().to_string()),
                cause,
            }
        } else if is_data_exception(code) {
            GatewayError::InvalidInput { cause }
        } else {
            GatewayError::Internal(cause)
        }
    }
}

impl From<deadpool_postgres::PoolError> for GatewayError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        match err {
            deadpool_postgres::PoolError::Backend(e) => e.into(),
            other => GatewayError::ConnectionFailed {
                cause: format!("Pool error: {}", other),
            },
        }
    }
}

/// SQLSTATE class 23: integrity constraint violation
fn is_constraint_violation(code: &SqlState) -> bool {
    code.code().starts_with("23")
}

/// SQLSTATE class 22: data exception (bad casts, out of range values)
fn is_data_exception(code: &SqlState) -> bool {
    code.code().starts_with("22")
}

pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            GatewayError::UnknownResource { path: "/x".into() }.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GatewayError::NoMatches {
                resource: "insumos".into(),
                id: "A1".into()
            }
            .status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GatewayError::Validation {
                resource: "insumos".into(),
                message: "missing".into()
            }
            .status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            GatewayError::ConstraintViolation {
                constraint: "insumos_pkey".into(),
                cause: "duplicate".into()
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(GatewayError::Overloaded.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            GatewayError::Timeout {
                elapsed: Duration::from_millis(10)
            }
            .status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            GatewayError::Internal("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_sqlstate_classes() {
        assert!(is_constraint_violation(&SqlState::UNIQUE_VIOLATION));
        assert!(is_constraint_violation(&SqlState::FOREIGN_KEY_VIOLATION));
        assert!(is_constraint_violation(&SqlState::NOT_NULL_VIOLATION));
        assert!(!is_constraint_violation(&SqlState::SYNTAX_ERROR));

        assert!(is_data_exception(&SqlState::INVALID_TEXT_REPRESENTATION));
        assert!(is_data_exception(&SqlState::INVALID_DATETIME_FORMAT));
        assert!(!is_data_exception(&SqlState::UNDEFINED_TABLE));
    }

    #[test]
    fn test_error_response_carries_request_id() {
        let err = GatewayError::NoMatches {
            resource: "insumos".into(),
            id: "ZZ".into(),
        };
        let body = err.to_error_response(Some("req-1".into()));

        assert_eq!(body.error, "no_matches");
        assert_eq!(body.resource.as_deref(), Some("insumos"));
        assert_eq!(body.request_id.as_deref(), Some("req-1"));
    }

    #[test]
    fn test_for_resource_tags_internal_errors() {
        let err = GatewayError::Internal("relation does not exist".into()).for_resource("vendas");
        assert!(matches!(err, GatewayError::QueryFailed { ref resource, .. } if resource == "vendas"));

        let err = GatewayError::Overloaded.for_resource("vendas");
        assert!(matches!(err, GatewayError::Overloaded));
    }

    #[test]
    fn test_pool_errors_are_unavailable() {
        use deadpool_postgres::{PoolError, TimeoutType};

        let err = GatewayError::from(PoolError::Timeout(TimeoutType::Wait));
        assert!(matches!(err, GatewayError::ConnectionFailed { .. }));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let err = GatewayError::from(PoolError::Timeout(TimeoutType::Create));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let err = GatewayError::from(PoolError::Closed);
        assert!(matches!(err, GatewayError::ConnectionFailed { ref cause } if cause.contains("closed")));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_body_errors() {
        let err = GatewayError::PayloadTooLarge {
            cause: "length limit exceeded".into(),
        };
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.to_error_response(None).error, "payload_too_large");

        let err = GatewayError::UnreadableBody {
            cause: "connection reset".into(),
        };
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
