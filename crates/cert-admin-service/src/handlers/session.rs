//! 聊天会话管理 API 处理器
//!
//! 配对需要操作员在移动端参与，因此会话生命周期暴露为显式的
//! start / stop / 查询三个入口；配对码经查询接口轮询获取。

use axum::{Json, extract::State};
use tracing::info;

use delivery_worker::chat::SessionInfo;

use crate::dto::ApiResponse;
use crate::error::Result;
use crate::state::AppState;

/// 发起聊天会话配对
///
/// POST /api/chat/session/start
pub async fn start_session(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<SessionInfo>>> {
    info!("操作员发起聊天会话");
    state.chat.start().await?;
    Ok(Json(ApiResponse::success(state.chat.info())))
}

/// 关闭聊天会话
///
/// POST /api/chat/session/stop
pub async fn stop_session(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<SessionInfo>>> {
    info!("操作员关闭聊天会话");
    state.chat.stop().await?;
    Ok(Json(ApiResponse::success(state.chat.info())))
}

/// 查询会话状态与当前配对码
///
/// GET /api/chat/session
pub async fn session_info(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<SessionInfo>>> {
    Ok(Json(ApiResponse::success(state.chat.info())))
}
