use actix_web::{HttpResponse, ResponseError};
use crate::models::ApiResponse;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("Cache error: {0}")]
    CacheError(#[from] redis::RedisError),

    /// 业务规则校验失败（缺字段、状态不允许等）
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 请求本身不合法（地址格式、重复参与等）
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Auth error: {0}")]
    AuthError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}

impl AppError {
    /// 对外暴露的稳定错误码
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "INVALID_REQUEST",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::AuthError(_) => "UNAUTHORIZED",
            AppError::NotFound(_) => "NOT_FOUND",
            _ => "INTERNAL",
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status_code, message) = match self {
            AppError::ValidationError(msg) => {
                log::warn!("Validation error: {msg}");
                (actix_web::http::StatusCode::BAD_REQUEST, msg.clone())
            }
            AppError::BadRequest(msg) => {
                log::warn!("Bad request: {msg}");
                (actix_web::http::StatusCode::BAD_REQUEST, msg.clone())
            }
            AppError::AuthError(msg) => {
                log::warn!("Authentication error: {msg}");
                (actix_web::http::StatusCode::UNAUTHORIZED, msg.clone())
            }
            AppError::NotFound(msg) => (actix_web::http::StatusCode::NOT_FOUND, msg.clone()),
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
            AppError::CacheError(err) => {
                log::error!("Cache error: {err}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "Cache error".to_string(),
                )
            }
            _ => {
                log::error!("Internal error: {self}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        HttpResponse::build(status_code)
            .json(ApiResponse::<()>::error(self.code().to_string(), message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(AppError::NotFound("x".into()).code(), "NOT_FOUND");
        assert_eq!(AppError::AuthError("x".into()).code(), "UNAUTHORIZED");
        assert_eq!(AppError::ValidationError("x".into()).code(), "INVALID_REQUEST");
        assert_eq!(AppError::BadRequest("x".into()).code(), "BAD_REQUEST");
        assert_eq!(AppError::InternalError("x".into()).code(), "INTERNAL");
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let resp = AppError::InternalError("secret detail".into()).error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let resp = AppError::BadRequest("Already participated".into()).error_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = AppError::AuthError("Not authorized".into()).error_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_error_envelope_body() {
        let resp = AppError::InternalError("secret detail".into()).error_response();
        let bytes = actix_web::body::to_bytes(resp.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "INTERNAL");
        assert_eq!(body["error"]["message"], "Internal server error");
        assert!(body.get("data").is_none());
    }
}
