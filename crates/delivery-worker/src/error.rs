//! 投递错误类型
//!
//! 渠道适配器内部使用；越过适配器边界后一律折叠进 `ChannelOutcome`，
//! 编排器据此区分可重试的传输故障与不可重试的地址问题。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("聊天会话未就绪（当前状态: {state}），拒绝发送")]
    NotReady { state: String },

    #[error("接收方在聊天渠道不可达: {handle}")]
    RecipientUnreachable { handle: String },

    #[error("参与者缺少 {channel} 渠道地址")]
    MissingAddress { channel: String },

    #[error("{channel} 渠道传输失败: {reason}")]
    TransportFailed { channel: String, reason: String },

    #[error("{channel} 渠道调用超时")]
    Timeout { channel: String },

    #[error(transparent)]
    Artifact(#[from] certificate_engine::error::EngineError),

    #[error(transparent)]
    Shared(#[from] cert_shared::error::CertError),
}

pub type Result<T> = std::result::Result<T, DeliveryError>;

impl DeliveryError {
    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotReady { .. } => "SESSION_NOT_READY",
            Self::RecipientUnreachable { .. } => "RECIPIENT_UNREACHABLE",
            Self::MissingAddress { .. } => "MISSING_ADDRESS",
            Self::TransportFailed { .. } => "TRANSPORT_FAILED",
            Self::Timeout { .. } => "CHANNEL_TIMEOUT",
            Self::Artifact(e) => e.code(),
            Self::Shared(e) => e.code(),
        }
    }

    /// 是否为可重试错误
    ///
    /// 地址问题（号码未注册、缺少邮箱）重试不会改变结果，
    /// 只有传输层故障值得补发。
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::TransportFailed { .. } | Self::Timeout { .. } => true,
            Self::Shared(e) => e.is_retryable(),
            _ => false,
        }
    }
}
