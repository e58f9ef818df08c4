//! 批量生成器
//!
//! 名册 + 活动描述 → 并发渲染整批证书。每位参与者是独立的生成单元：
//! 结果与输入一一对应且顺序一致，单个参与者的失败被捕获进自己的
//! 结果条目，绝不中断同批其他人。
//!
//! 成功路径的附带动作：向状态跟踪器登记 Generated、持久化制品记录、
//! 回写名册上该参与者的证书状态（以邮箱标识，无邮箱者跳过回写）。

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use cert_shared::model::{
    CertificateArtifact, CertificateStatus, EventDescriptor, Participant, ParticipantSnapshot,
    TemplateKind,
};
use cert_shared::status::StatusTracker;
use cert_shared::store::CertificateStore;

use crate::render::CertificateRenderer;

// ---------------------------------------------------------------------------
// 生成结果
// ---------------------------------------------------------------------------

/// 单个参与者的生成结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub participant: ParticipantSnapshot,
    /// 成功时为完整的证书制品记录
    pub certificate: Option<CertificateArtifact>,
    pub success: bool,
    pub error: Option<String>,
}

impl GenerationResult {
    fn ok(participant: ParticipantSnapshot, certificate: CertificateArtifact) -> Self {
        Self {
            participant,
            certificate: Some(certificate),
            success: true,
            error: None,
        }
    }

    fn failed(participant: ParticipantSnapshot, error: String) -> Self {
        Self {
            participant,
            certificate: None,
            success: false,
            error: Some(error),
        }
    }
}

// ---------------------------------------------------------------------------
// BatchGenerator
// ---------------------------------------------------------------------------

/// 批量生成器
pub struct BatchGenerator {
    renderer: CertificateRenderer,
    tracker: Arc<StatusTracker>,
    store: Arc<dyn CertificateStore>,
}

impl BatchGenerator {
    pub fn new(
        renderer: CertificateRenderer,
        tracker: Arc<StatusTracker>,
        store: Arc<dyn CertificateStore>,
    ) -> Self {
        Self {
            renderer,
            tracker,
            store,
        }
    }

    /// 为整份名册生成证书
    ///
    /// 空名册返回空结果集，不报错。返回向量与输入名册等长、同序。
    pub async fn generate_all(
        &self,
        participants: &[Participant],
        event: &EventDescriptor,
        template: Option<TemplateKind>,
    ) -> Vec<GenerationResult> {
        let template = template.unwrap_or(event.template);
        info!(
            event_id = %event.event_id,
            count = participants.len(),
            template = %template,
            "开始批量生成证书"
        );

        let results = join_all(
            participants
                .iter()
                .map(|p| self.generate_one(p, event, template)),
        )
        .await;

        let succeeded = results.iter().filter(|r| r.success).count();
        info!(
            event_id = %event.event_id,
            total = results.len(),
            succeeded,
            failed = results.len() - succeeded,
            "批量生成完成"
        );
        results
    }

    async fn generate_one(
        &self,
        participant: &Participant,
        event: &EventDescriptor,
        template: TemplateKind,
    ) -> GenerationResult {
        let snapshot = ParticipantSnapshot::from(participant);

        let artifact = match self.renderer.render(participant, event, template).await {
            Ok(artifact) => artifact,
            Err(e) => {
                warn!(
                    event_id = %event.event_id,
                    participant = %participant.name,
                    error = %e,
                    "证书渲染失败"
                );
                return GenerationResult::failed(snapshot, e.to_string());
            }
        };

        if let Err(e) = self.tracker.register(&artifact) {
            return GenerationResult::failed(snapshot, e.to_string());
        }

        if let Err(e) = self.store.save_certificate(&artifact).await {
            warn!(
                certificate_id = %artifact.certificate_id,
                error = %e,
                "证书记录持久化失败"
            );
            return GenerationResult::failed(snapshot, e.to_string());
        }

        // 名册以邮箱标识参与者，无邮箱者跳过回写
        if let Some(email) = &participant.email {
            if let Err(e) = self
                .store
                .update_participant_status(&event.event_id, email, CertificateStatus::Generated)
                .await
            {
                warn!(
                    event_id = %event.event_id,
                    participant = %participant.name,
                    error = %e,
                    "名册状态回写失败（证书本身已生成）"
                );
            }
        }

        GenerationResult::ok(snapshot, artifact)
    }
}
