//! 渠道投递结果
//!
//! 适配器边界的统一返回值：无论内部如何失败，对编排器只呈现
//! 成功与否、外部消息标识与失败原因。

use serde::Serialize;

use cert_shared::model::DeliveryChannel;

use crate::error::DeliveryError;

/// 单渠道单次投递的结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelOutcome {
    pub channel: DeliveryChannel,
    pub success: bool,
    /// 外部渠道返回的消息标识，用于追踪投递状态
    pub message_id: Option<String>,
    pub error: Option<String>,
}

impl ChannelOutcome {
    pub fn ok(channel: DeliveryChannel, message_id: impl Into<String>) -> Self {
        Self {
            channel,
            success: true,
            message_id: Some(message_id.into()),
            error: None,
        }
    }

    pub fn failed(channel: DeliveryChannel, error: &DeliveryError) -> Self {
        Self {
            channel,
            success: false,
            message_id: None,
            error: Some(error.to_string()),
        }
    }
}
