//! 渠道诊断 API 处理器
//!
//! 向指定地址发送测试消息，供操作员在批量投递前验证渠道配置。

use axum::{Json, extract::State};

use delivery_worker::outcome::ChannelOutcome;

use crate::dto::{ApiResponse, ChatTestRequest, EmailTestRequest};
use crate::error::{ApiError, Result};
use crate::state::AppState;

const DEFAULT_TEST_MESSAGE: &str = "Certificate system test message.";

/// 发送聊天测试消息
///
/// POST /api/chat/test
pub async fn chat_test(
    State(state): State<AppState>,
    Json(request): Json<ChatTestRequest>,
) -> Result<Json<ApiResponse<ChannelOutcome>>> {
    if request.phone.trim().is_empty() {
        return Err(ApiError::Validation("号码不能为空".to_string()));
    }

    let text = request.message.as_deref().unwrap_or(DEFAULT_TEST_MESSAGE);
    let outcome = state.chat.send_test_message(&request.phone, text).await;
    Ok(Json(ApiResponse::success(outcome)))
}

/// 发送测试邮件
///
/// POST /api/email/test
pub async fn email_test(
    State(state): State<AppState>,
    Json(request): Json<EmailTestRequest>,
) -> Result<Json<ApiResponse<ChannelOutcome>>> {
    if request.to.trim().is_empty() || !request.to.contains('@') {
        return Err(ApiError::Validation("邮箱地址无效".to_string()));
    }

    let outcome = state.email.send_test(&request.to).await;
    Ok(Json(ApiResponse::success(outcome)))
}
