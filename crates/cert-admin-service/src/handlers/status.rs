//! 证书状态查询 API 处理器

use axum::{
    Json,
    extract::{Path, State},
};

use cert_shared::model::{CertificateArtifact, CertificateId};

use crate::dto::{ApiResponse, StatusResponse};
use crate::error::Result;
use crate::state::AppState;

/// 查询活动的证书状态计数与失败清单
///
/// GET /api/certificates/status/{event_id}
pub async fn event_status(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<ApiResponse<StatusResponse>>> {
    let counts = state.tracker.counts_for_event(&event_id);
    let failed = state.tracker.failed_for_event(&event_id);

    Ok(Json(ApiResponse::success(StatusResponse {
        event_id,
        counts,
        failed,
    })))
}

/// 查询单张证书的制品记录
///
/// GET /api/certificates/{certificate_id}
pub async fn certificate_detail(
    State(state): State<AppState>,
    Path(certificate_id): Path<String>,
) -> Result<Json<ApiResponse<CertificateArtifact>>> {
    let record = state
        .store
        .get_certificate(&CertificateId(certificate_id))
        .await?;
    Ok(Json(ApiResponse::success(record)))
}
