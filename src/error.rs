use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use sea_orm::DbErr;
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Auth error: {0}")]
    AuthError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Daily reward already claimed today")]
    AlreadyPlayedToday,

    #[error("Coupon not found")]
    CouponNotFound,

    #[error("Coupon belongs to another user")]
    CouponNotOwned,

    #[error("Coupon has already been used")]
    CouponAlreadyUsed,

    #[error("Coupon has expired")]
    CouponExpired,

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Could not generate a unique coupon code after {0} attempts")]
    CodeGenerationExhausted(usize),
}

impl AppError {
    /// 可整体重试的临时性错误（未提交任何部分状态）
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::StoreUnavailable(_) | AppError::CodeGenerationExhausted(_)
        )
    }

    fn classify(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::ValidationError(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, "AUTH_ERROR", msg.clone()),
            AppError::JwtError(_) => (
                StatusCode::UNAUTHORIZED,
                "AUTH_ERROR",
                "Invalid token".to_string(),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN", "Forbidden".to_string()),
            AppError::AlreadyPlayedToday => (
                StatusCode::BAD_REQUEST,
                "ALREADY_PLAYED_TODAY",
                self.to_string(),
            ),
            AppError::CouponNotFound => {
                (StatusCode::NOT_FOUND, "COUPON_NOT_FOUND", self.to_string())
            }
            AppError::CouponNotOwned => {
                (StatusCode::FORBIDDEN, "COUPON_NOT_OWNED", self.to_string())
            }
            AppError::CouponAlreadyUsed => {
                (StatusCode::CONFLICT, "COUPON_ALREADY_USED", self.to_string())
            }
            AppError::CouponExpired => {
                (StatusCode::BAD_REQUEST, "COUPON_EXPIRED", self.to_string())
            }
            AppError::StoreUnavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "STORE_UNAVAILABLE",
                "Service temporarily unavailable, please retry".to_string(),
            ),
            AppError::CodeGenerationExhausted(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "CODE_GENERATION_EXHAUSTED",
                "Could not issue a coupon, please retry".to_string(),
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "Database error".to_string(),
            ),
            AppError::ConfigError(_) | AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
            ),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.classify().0
    }

    fn error_response(&self) -> HttpResponse {
        let (status_code, error_code, message) = self.classify();

        if status_code.is_server_error() {
            log::error!("{error_code}: {self}");
        } else {
            log::warn!("{error_code}: {self}");
        }

        HttpResponse::build(status_code).json(json!({
            "success": false,
            "error": {
                "code": error_code,
                "message": message
            }
        }))
    }
}
