//! 投递编排器
//!
//! 把名册参与者的证书制品按批次投递到启用的渠道：批次之间顺序执行
//! 并停顿，批次内部并发扇出；每位参与者按实际拥有的地址决定渠道参与，
//! 任一渠道成功即算整体成功（OR 合并），没有制品的参与者记为零尝试
//! 的失败。编排器不做去重——重复触发会重复发送，"已发送则跳过"
//! 由调用方基于状态跟踪器过滤。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use cert_shared::config::{ChatConfig, DeliveryConfig, EmailConfig};
use cert_shared::model::{
    CertificateArtifact, CertificateId, CertificateStatus, ParticipantSnapshot,
};
use cert_shared::retry::RetryPolicy;
use cert_shared::status::StatusTracker;
use cert_shared::store::CertificateStore;

use crate::chat::ChatSession;
use crate::email::EmailAdapter;
use crate::error::Result;
use crate::outcome::ChannelOutcome;
use crate::templates::{MessageTemplateEngine, TemplateContext, TemplateOverrides};

// ---------------------------------------------------------------------------
// 投递选项与结果
// ---------------------------------------------------------------------------

/// 单次投递的选项
#[derive(Debug, Clone)]
pub struct DeliveryOptions {
    pub send_email: bool,
    pub send_chat: bool,
    /// 操作员自定义文案，缺省回落默认模板
    pub templates: TemplateOverrides,
}

impl Default for DeliveryOptions {
    /// 默认只走邮件渠道（聊天渠道需要会话就绪，由操作员显式启用）
    fn default() -> Self {
        Self {
            send_email: true,
            send_chat: false,
            templates: TemplateOverrides::default(),
        }
    }
}

/// 单张证书的投递结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryResult {
    /// 参与者无对应证书制品时为空
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_id: Option<CertificateId>,
    pub participant_name: String,
    /// 任一渠道成功即为 true
    pub success: bool,
    pub email: Option<ChannelOutcome>,
    pub chat: Option<ChannelOutcome>,
}

/// 整批投递的汇总报告
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReport {
    pub total: usize,
    pub sent: usize,
    pub failed: usize,
    pub results: Vec<DeliveryResult>,
}

impl DeliveryReport {
    fn from_results(results: Vec<DeliveryResult>) -> Self {
        let sent = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            sent,
            failed: results.len() - sent,
            results,
        }
    }
}

// ---------------------------------------------------------------------------
// DeliveryOrchestrator
// ---------------------------------------------------------------------------

/// 投递编排器
pub struct DeliveryOrchestrator {
    email: Arc<EmailAdapter>,
    chat: Arc<ChatSession>,
    tracker: Arc<StatusTracker>,
    store: Arc<dyn CertificateStore>,
    email_batch_size: usize,
    chat_batch_size: usize,
    inter_batch_delay: Duration,
}

impl DeliveryOrchestrator {
    pub fn new(
        email: Arc<EmailAdapter>,
        chat: Arc<ChatSession>,
        tracker: Arc<StatusTracker>,
        store: Arc<dyn CertificateStore>,
        email_config: &EmailConfig,
        chat_config: &ChatConfig,
        delivery_config: &DeliveryConfig,
    ) -> Self {
        Self {
            email,
            chat,
            tracker,
            store,
            email_batch_size: email_config.batch_size.max(1),
            chat_batch_size: chat_config.batch_size.max(1),
            inter_batch_delay: delivery_config.inter_batch_delay(),
        }
    }

    /// 启用聊天渠道时批次取较小值，整体节奏向更严格的渠道对齐
    fn batch_size(&self, options: &DeliveryOptions) -> usize {
        if options.send_chat {
            self.chat_batch_size
        } else {
            self.email_batch_size
        }
    }

    /// 按名册投递整批证书
    ///
    /// 空名册返回空报告。批次顺序执行，相邻批次之间停顿；
    /// 每位名册参与者恰好产出一条结果，顺序与名册一致。
    /// 名册中没有对应证书制品的参与者记为零尝试的失败结果，
    /// 不触碰任何渠道。
    pub async fn deliver_all(
        &self,
        roster: &[ParticipantSnapshot],
        artifacts: &[CertificateArtifact],
        options: &DeliveryOptions,
    ) -> DeliveryReport {
        let batch_size = self.batch_size(options);
        info!(
            total = roster.len(),
            covered = artifacts.len(),
            batch_size,
            send_email = options.send_email,
            send_chat = options.send_chat,
            "开始批量投递证书"
        );

        let mut results = Vec::with_capacity(roster.len());
        for (index, batch) in roster.chunks(batch_size).enumerate() {
            if index > 0 {
                tokio::time::sleep(self.inter_batch_delay).await;
            }
            let batch_results =
                join_all(batch.iter().map(|p| self.deliver_for(p, artifacts, options))).await;
            results.extend(batch_results);
        }

        let report = DeliveryReport::from_results(results);
        info!(
            total = report.total,
            sent = report.sent,
            failed = report.failed,
            "批量投递完成"
        );
        report
    }

    /// 为单个名册条目投递其证书；无对应制品则直接记为失败
    async fn deliver_for(
        &self,
        participant: &ParticipantSnapshot,
        artifacts: &[CertificateArtifact],
        options: &DeliveryOptions,
    ) -> DeliveryResult {
        match artifacts.iter().find(|a| a.participant == *participant) {
            Some(artifact) => self.deliver_one(artifact, options).await,
            None => {
                warn!(
                    participant = %participant.name,
                    "参与者没有已生成的证书，记为零尝试的失败"
                );
                DeliveryResult {
                    certificate_id: None,
                    participant_name: participant.name.clone(),
                    success: false,
                    email: None,
                    chat: None,
                }
            }
        }
    }

    /// 投递单张证书到各启用渠道
    async fn deliver_one(
        &self,
        artifact: &CertificateArtifact,
        options: &DeliveryOptions,
    ) -> DeliveryResult {
        let id = &artifact.certificate_id;

        let email_outcome = if options.send_email && artifact.participant.email.is_some() {
            Some(self.email.send_certificate(artifact, &options.templates).await)
        } else {
            None
        };

        let chat_outcome = if options.send_chat && artifact.participant.phone.is_some() {
            let ctx = TemplateContext::from_artifact(artifact);
            let text = MessageTemplateEngine::chat_text(&options.templates, &ctx);
            Some(self.chat.send_certificate(artifact, &text).await)
        } else {
            None
        };

        // 每条渠道腿各计一次尝试；失败先记、成功后记，
        // 最终状态落在 OR 合并的结果上，单腿失败不会覆盖另一腿的成功
        let mut attempts: Vec<&ChannelOutcome> =
            email_outcome.iter().chain(chat_outcome.iter()).collect();
        attempts.sort_by_key(|o| o.success);
        for outcome in &attempts {
            self.record(id, outcome);
        }

        let attempted = !attempts.is_empty();
        let success = email_outcome.as_ref().is_some_and(|o| o.success)
            || chat_outcome.as_ref().is_some_and(|o| o.success);

        if !attempted {
            // 无任何可用渠道：不触碰传输层，也不计入尝试次数
            warn!(
                certificate_id = %id,
                participant = %artifact.participant.name,
                "参与者没有可用投递渠道，跳过"
            );
        } else if let Some(email) = &artifact.participant.email {
            // 名册回写以邮箱标识参与者
            let status = if success {
                CertificateStatus::Sent
            } else {
                CertificateStatus::Failed
            };
            if let Err(e) = self
                .store
                .update_participant_status(&artifact.event_id, email, status)
                .await
            {
                warn!(certificate_id = %id, error = %e, "名册投递状态回写失败");
            }
        }

        DeliveryResult {
            certificate_id: Some(id.clone()),
            participant_name: artifact.participant.name.clone(),
            success,
            email: email_outcome,
            chat: chat_outcome,
        }
    }

    fn record(&self, id: &CertificateId, outcome: &ChannelOutcome) {
        if let Err(e) =
            self.tracker
                .record_attempt(id, outcome.channel, outcome.success, outcome.error.as_deref())
        {
            warn!(certificate_id = %id, error = %e, "投递尝试回写状态跟踪器失败");
        }
    }

    /// 补发当前处于失败状态的证书
    ///
    /// 操作员触发的恢复路径：取状态跟踪器的失败清单，按保守退避策略
    /// 重试整个失败子集，直到全部成功或重试次数耗尽。
    pub async fn redeliver_failed(
        &self,
        event_id: &str,
        options: &DeliveryOptions,
    ) -> Result<DeliveryReport> {
        let policy = RetryPolicy::for_redelivery();
        let mut latest: HashMap<CertificateId, DeliveryResult> = HashMap::new();
        let mut attempt: u32 = 0;

        loop {
            let failed = self.tracker.failed_for_event(event_id);
            if failed.is_empty() {
                break;
            }

            let mut artifacts = Vec::with_capacity(failed.len());
            for entry in &failed {
                artifacts.push(self.store.get_certificate(&entry.certificate_id).await?);
            }

            info!(
                event_id,
                attempt,
                count = artifacts.len(),
                "补发失败证书"
            );
            let roster: Vec<ParticipantSnapshot> =
                artifacts.iter().map(|a| a.participant.clone()).collect();
            let report = self.deliver_all(&roster, &artifacts, options).await;
            for result in report.results {
                if let Some(id) = result.certificate_id.clone() {
                    latest.insert(id, result);
                }
            }

            if latest.values().all(|r| r.success) || !policy.should_retry(attempt) {
                break;
            }
            tokio::time::sleep(policy.delay_for_attempt(attempt)).await;
            attempt += 1;
        }

        let mut results: Vec<DeliveryResult> = latest.into_values().collect();
        results.sort_by(|a, b| a.certificate_id.cmp(&b.certificate_id));
        Ok(DeliveryReport::from_results(results))
    }
}
