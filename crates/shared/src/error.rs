//! 统一错误处理模块
//!
//! 定义系统中所有共享的错误类型，使用 thiserror 提供良好的错误信息。

use thiserror::Error;

/// 系统错误类型
#[derive(Debug, Error)]
pub enum CertError {
    // ==================== 持久化错误 ====================
    #[error("记录未找到: {entity} id={id}")]
    NotFound { entity: String, id: String },

    #[error("记录已存在: {entity} {field}={value}")]
    AlreadyExists {
        entity: String,
        field: String,
        value: String,
    },

    // ==================== 存储错误 ====================
    #[error("制品存储错误: {0}")]
    Storage(String),

    // ==================== 业务逻辑错误 ====================
    #[error("非法状态流转: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("操作频率超限: {operation}")]
    RateLimitExceeded { operation: String },

    // ==================== 验证错误 ====================
    #[error("参数验证失败: {0}")]
    Validation(String),

    #[error("无效的参数: {field} - {message}")]
    InvalidArgument { field: String, message: String },

    // ==================== 外部服务错误 ====================
    #[error("外部服务错误: {service} - {message}")]
    ExternalService { service: String, message: String },

    #[error("外部服务超时: {service}")]
    ExternalServiceTimeout { service: String },

    // ==================== 通用错误 ====================
    #[error("配置错误: {0}")]
    Config(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, CertError>;

impl CertError {
    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::AlreadyExists { .. } => "ALREADY_EXISTS",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidArgument { .. } => "INVALID_ARGUMENT",
            Self::ExternalService { .. } => "EXTERNAL_SERVICE_ERROR",
            Self::ExternalServiceTimeout { .. } => "EXTERNAL_SERVICE_TIMEOUT",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 是否为可重试错误
    ///
    /// 瞬时基础设施故障（存储、外部服务）可重试；
    /// 业务校验类错误重试无意义，直接向上传播。
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Storage(_) | Self::ExternalService { .. } | Self::ExternalServiceTimeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        let err = CertError::NotFound {
            entity: "Certificate".to_string(),
            id: "CERT-ABC-12345".to_string(),
        };
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn test_is_retryable() {
        let storage_err = CertError::Storage("磁盘写入失败".to_string());
        assert!(storage_err.is_retryable());

        let not_found = CertError::NotFound {
            entity: "Certificate".to_string(),
            id: "123".to_string(),
        };
        assert!(!not_found.is_retryable());

        let timeout = CertError::ExternalServiceTimeout {
            service: "mail-api".to_string(),
        };
        assert!(timeout.is_retryable());
    }
}
