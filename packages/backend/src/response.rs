use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::auth::AuthError;
use crate::services::ServiceError;
use crate::store::StoreError;

pub const INTERNAL_ERROR_MESSAGE: &str = "서버 내부 오류가 발생했습니다";
pub const INVALID_CREDENTIALS_MESSAGE: &str = "이름 또는 코드가 올바르지 않습니다";

#[derive(Debug, Serialize)]
pub struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
}

pub fn ok<T: Serialize>(data: T) -> Json<SuccessResponse<T>> {
    Json(SuccessResponse { success: true, data })
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
}

#[derive(Debug, Clone)]
pub struct AppError {
    status: StatusCode,
    code: String,
    message: String,
    is_operational: bool,
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::FORBIDDEN, "FORBIDDEN", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::CONFLICT, "CONFLICT", message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::SERVICE_UNAVAILABLE, "GENERATION_UNAVAILABLE", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR".to_string(),
            message: message.into(),
            is_operational: false,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    fn operational(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            is_operational: true,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = if self.is_operational {
            self.message
        } else {
            tracing::error!(code = %self.code, detail = %self.message, "request failed");
            INTERNAL_ERROR_MESSAGE.to_string()
        };

        let body = ErrorResponse {
            success: false,
            error: message,
            code: self.code,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(what) => AppError::not_found(format!("{what}을(를) 찾을 수 없습니다")),
            ServiceError::Forbidden => AppError::forbidden("권한이 없습니다"),
            ServiceError::Validation(message) => AppError::validation(message),
            ServiceError::Conflict(message) => AppError::conflict(message),
            ServiceError::Transition(err) => AppError::conflict(err.to_string()),
            ServiceError::Generation { fallback, .. } => AppError::unavailable(fallback),
            ServiceError::Store(err) => AppError::internal(err.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::internal(err.to_string())
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken => AppError::unauthorized("로그인이 필요합니다"),
            AuthError::InvalidToken => AppError::unauthorized("세션이 유효하지 않습니다"),
            AuthError::Expired => AppError::unauthorized("세션이 만료되었습니다"),
            AuthError::InvalidCredentials => AppError::unauthorized(INVALID_CREDENTIALS_MESSAGE),
            AuthError::AccountExists(name) => AppError::conflict(format!("이미 등록된 이름입니다: {name}")),
            AuthError::InvalidSeed(message) => AppError::validation(message),
            AuthError::Hash(err) => AppError::internal(err.to_string()),
            AuthError::Store(err) => AppError::internal(err.to_string()),
        }
    }
}
