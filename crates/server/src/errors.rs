//! One place where interface errors become HTTP responses.

use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use cofoundry_core::errors::InterfaceError;
use cofoundry_db::repositories::RepositoryError;

pub fn correlation_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Debug)]
pub struct ApiError {
    pub interface: InterfaceError,
    pub fields: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    correlation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after_secs: Option<u32>,
}

impl ApiError {
    pub fn validation(
        fields: BTreeMap<String, String>,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self {
            interface: InterfaceError::BadRequest {
                message: "request validation failed".to_string(),
                correlation_id: correlation_id.into(),
            },
            fields: Some(fields),
        }
    }

    pub fn bad_request(message: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self {
            interface: InterfaceError::BadRequest {
                message: message.into(),
                correlation_id: correlation_id.into(),
            },
            fields: None,
        }
    }

    pub fn unauthorized(correlation_id: impl Into<String>) -> Self {
        Self {
            interface: InterfaceError::Unauthorized {
                message: "no valid session".to_string(),
                correlation_id: correlation_id.into(),
            },
            fields: None,
        }
    }

    pub fn forbidden(message: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self {
            interface: InterfaceError::Forbidden {
                message: message.into(),
                correlation_id: correlation_id.into(),
            },
            fields: None,
        }
    }

    pub fn not_found(entity: &str, correlation_id: impl Into<String>) -> Self {
        Self {
            interface: InterfaceError::NotFound {
                message: format!("{entity} not found"),
                correlation_id: correlation_id.into(),
            },
            fields: None,
        }
    }

    pub fn rate_limited(retry_after_secs: u32, correlation_id: impl Into<String>) -> Self {
        Self {
            interface: InterfaceError::RateLimited {
                message: "chat rate limit exceeded".to_string(),
                retry_after_secs,
                correlation_id: correlation_id.into(),
            },
            fields: None,
        }
    }

    pub fn internal(message: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self {
            interface: InterfaceError::Internal {
                message: message.into(),
                correlation_id: correlation_id.into(),
            },
            fields: None,
        }
    }

    pub fn from_repository(error: RepositoryError, correlation_id: impl Into<String>) -> Self {
        let correlation_id = correlation_id.into();
        let interface = match error {
            RepositoryError::Domain(domain) => InterfaceError::BadRequest {
                message: domain.to_string(),
                correlation_id,
            },
            RepositoryError::UnsupportedDomain { domain } => InterfaceError::Unsupported {
                message: format!("the `{domain}` domain is not implemented"),
                correlation_id,
            },
            RepositoryError::Database(error) => InterfaceError::ServiceUnavailable {
                message: format!("storage failure: {error}"),
                correlation_id,
            },
            RepositoryError::Decode(message) => InterfaceError::Internal {
                message: format!("stored record failed to decode: {message}"),
                correlation_id,
            },
        };
        Self { interface, fields: None }
    }

    fn status_code(&self) -> StatusCode {
        match &self.interface {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            InterfaceError::Forbidden { .. } => StatusCode::FORBIDDEN,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            InterfaceError::Unsupported { .. } => StatusCode::NOT_IMPLEMENTED,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let retry_after_secs = match &self.interface {
            InterfaceError::RateLimited { retry_after_secs, .. } => Some(*retry_after_secs),
            _ => None,
        };

        if status.is_server_error() {
            tracing::error!(
                event_name = "http.request.failed",
                correlation_id = self.interface.correlation_id(),
                status = status.as_u16(),
                detail = %self.interface,
                "request failed"
            );
        } else {
            tracing::warn!(
                event_name = "http.request.rejected",
                correlation_id = self.interface.correlation_id(),
                status = status.as_u16(),
                detail = %self.interface,
                "request rejected"
            );
        }

        let body = ErrorBody {
            error: self.interface.user_message(),
            correlation_id: self.interface.correlation_id().to_string(),
            fields: self.fields,
            retry_after_secs,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    use cofoundry_db::repositories::RepositoryError;

    use super::ApiError;

    #[test]
    fn validation_errors_are_bad_requests() {
        let mut fields = BTreeMap::new();
        fields.insert("description".to_string(), "required".to_string());
        let response = ApiError::validation(fields, "req-1").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unsupported_domains_map_to_not_implemented() {
        let error = RepositoryError::UnsupportedDomain { domain: "loans" };
        let response = ApiError::from_repository(error, "req-2").into_response();
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    }

    #[test]
    fn decode_failures_are_internal_errors() {
        let error = RepositoryError::Decode("bad enum".to_string());
        let response = ApiError::from_repository(error, "req-3").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn rate_limits_surface_retry_after() {
        let response = ApiError::rate_limited(60, "req-4").into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
