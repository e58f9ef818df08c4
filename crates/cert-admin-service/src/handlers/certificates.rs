//! 证书生成与投递 API 处理器

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::info;

use cert_shared::model::Participant;
use delivery_worker::orchestrator::{DeliveryOptions, DeliveryReport};
use delivery_worker::templates::TemplateOverrides;

use crate::dto::{ApiResponse, DeliverRequest, GenerateRequest, GenerateResponse};
use crate::error::{ApiError, Result};
use crate::state::AppState;

/// 为活动名册批量生成证书
///
/// POST /api/certificates/generate/{event_id}
pub async fn generate(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<ApiResponse<GenerateResponse>>> {
    if request.participants.is_empty() {
        return Err(ApiError::Validation("参与者名册为空".to_string()));
    }
    if request.participants.iter().any(|p| p.name.trim().is_empty()) {
        return Err(ApiError::Validation("参与者姓名不能为空".to_string()));
    }

    let event = request.event.into_descriptor(&event_id);
    let participants: Vec<Participant> = request
        .participants
        .into_iter()
        .map(Participant::from)
        .collect();

    info!(event_id = %event_id, count = participants.len(), "收到批量生成请求");
    let results = state
        .generator
        .generate_all(&participants, &event, request.template)
        .await;

    Ok(Json(ApiResponse::success(GenerateResponse::new(
        &event_id, results,
    ))))
}

/// 投递活动的已生成证书
///
/// POST /api/certificates/deliver/{event_id}
///
/// 默认跳过已成功发送的证书；`force` 为 true 时重新投递全部，
/// `onlyFailed` 为 true 时走失败子集补发路径。
pub async fn deliver(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Json(request): Json<DeliverRequest>,
) -> Result<Json<ApiResponse<DeliveryReport>>> {
    let options = DeliveryOptions {
        send_email: request.send_email.unwrap_or(true),
        send_chat: request.send_chat.unwrap_or(false),
        templates: TemplateOverrides {
            email_subject: request.email_subject,
            email_body: request.email_body,
            chat_text: request.chat_text,
        },
    };

    if !options.send_email && !options.send_chat {
        return Err(ApiError::Validation("至少启用一个投递渠道".to_string()));
    }
    // 仅聊天渠道且会话未就绪：整批注定失败，直接拒绝
    if options.send_chat && !options.send_email && !state.chat.is_ready() {
        return Err(ApiError::SessionNotReady(
            state.chat.state().to_string(),
        ));
    }

    if request.only_failed {
        let report = state
            .orchestrator
            .redeliver_failed(&event_id, &options)
            .await?;
        return Ok(Json(ApiResponse::success(report)));
    }

    let all = state.store.list_certificates(&event_id).await?;
    if all.is_empty() {
        return Err(ApiError::NotFound(format!(
            "活动 {event_id} 没有已生成的证书"
        )));
    }

    // 已发送则跳过（force 覆盖）
    let artifacts: Vec<_> = if request.force {
        all
    } else {
        all.into_iter()
            .filter(|a| !state.tracker.already_sent(&a.certificate_id))
            .collect()
    };

    info!(
        event_id = %event_id,
        count = artifacts.len(),
        force = request.force,
        "收到批量投递请求"
    );
    // 名册由外部协作方持有，这里以制品快照为投递名册
    let roster: Vec<_> = artifacts.iter().map(|a| a.participant.clone()).collect();
    let report = state
        .orchestrator
        .deliver_all(&roster, &artifacts, &options)
        .await;
    Ok(Json(ApiResponse::success(report)))
}
