//! 管理后台错误类型定义
//!
//! 汇聚共享层、生成引擎与投递工作器的错误，统一映射为 HTTP 响应。

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use cert_shared::error::CertError;
use certificate_engine::error::EngineError;
use delivery_worker::error::DeliveryError;

/// 管理后台错误类型
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("参数验证失败: {0}")]
    Validation(String),

    #[error("资源不存在: {0}")]
    NotFound(String),

    #[error("资源冲突: {0}")]
    Conflict(String),

    #[error("聊天会话未就绪: {0}")]
    SessionNotReady(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl ApiError {
    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::SessionNotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 返回错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::SessionNotReady(_) => "SESSION_NOT_READY",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志，防止信息泄露
        let message = match &self {
            Self::Internal(e) => {
                tracing::error!(error = %e, "内部错误");
                "服务内部错误，请稍后重试".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": serde_json::Value::Null
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<CertError> for ApiError {
    fn from(err: CertError) -> Self {
        match err {
            CertError::NotFound { .. } => Self::NotFound(err.to_string()),
            CertError::AlreadyExists { .. } | CertError::InvalidTransition { .. } => {
                Self::Conflict(err.to_string())
            }
            CertError::Validation(_) | CertError::InvalidArgument { .. } => {
                Self::Validation(err.to_string())
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Shared(inner) => inner.into(),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<DeliveryError> for ApiError {
    fn from(err: DeliveryError) -> Self {
        match err {
            DeliveryError::NotReady { .. } => Self::SessionNotReady(err.to_string()),
            DeliveryError::MissingAddress { .. } | DeliveryError::RecipientUnreachable { .. } => {
                Self::Validation(err.to_string())
            }
            DeliveryError::Shared(inner) => inner.into(),
            other => Self::Internal(other.to_string()),
        }
    }
}

/// 服务层 Result 类型别名
pub type Result<T> = std::result::Result<T, ApiError>;
