//! 证书状态跟踪器
//!
//! 每张证书生命周期的权威状态机：批量生成器登记 Generated，
//! 投递编排器回写每次尝试的结果。对外暴露按活动聚合的状态计数
//! 与失败清单，供操作员精确补发失败子集。
//!
//! 本管道产出的成功终态是 Sent；Delivered/Bounced 只能由外部
//! 送达确认协作方通过 `apply_confirmation` 写入。

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

use crate::error::{CertError, Result};
use crate::model::{CertificateArtifact, CertificateId, CertificateStatus, DeliveryChannel};

// ---------------------------------------------------------------------------
// 跟踪条目与聚合视图
// ---------------------------------------------------------------------------

/// 单张证书的跟踪条目
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedCertificate {
    pub certificate_id: CertificateId,
    pub event_id: String,
    pub participant_name: String,
    pub participant_email: Option<String>,
    pub status: CertificateStatus,
    pub attempts: u32,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub last_channel: Option<DeliveryChannel>,
    /// 最近一次失败原因，成功后清空
    pub last_error: Option<String>,
}

/// 按活动聚合的状态计数
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub total: usize,
    pub generated: usize,
    pub sent: usize,
    pub delivered: usize,
    pub failed: usize,
    pub bounced: usize,
}

/// 失败清单条目，携带参与者身份与原因，支撑精确补发
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedCertificate {
    pub certificate_id: CertificateId,
    pub participant_name: String,
    pub participant_email: Option<String>,
    pub reason: String,
}

// ---------------------------------------------------------------------------
// StatusTracker
// ---------------------------------------------------------------------------

/// 证书状态跟踪器
///
/// 并发安全：生成与投递阶段的并发更新通过 DashMap 的分段锁隔离。
#[derive(Debug, Default)]
pub struct StatusTracker {
    records: DashMap<CertificateId, TrackedCertificate>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记新生成的证书（状态 Generated）
    ///
    /// 证书编号全局唯一，重复登记视为调用方缺陷。
    pub fn register(&self, artifact: &CertificateArtifact) -> Result<()> {
        let id = artifact.certificate_id.clone();
        if self.records.contains_key(&id) {
            return Err(CertError::AlreadyExists {
                entity: "TrackedCertificate".to_string(),
                field: "certificate_id".to_string(),
                value: id.to_string(),
            });
        }
        self.records.insert(
            id.clone(),
            TrackedCertificate {
                certificate_id: id,
                event_id: artifact.event_id.clone(),
                participant_name: artifact.participant.name.clone(),
                participant_email: artifact.participant.email.clone(),
                status: CertificateStatus::Generated,
                attempts: 0,
                last_attempt_at: None,
                last_channel: None,
                last_error: None,
            },
        );
        Ok(())
    }

    /// 回写一次投递尝试
    ///
    /// 无论成败，尝试计数 +1、刷新时间戳与渠道；状态仅在流转合法时变更
    /// （如 Delivered 终态不会被后续重发拉回），非法流转保持原状态。
    /// 返回回写后的状态。
    pub fn record_attempt(
        &self,
        certificate_id: &CertificateId,
        channel: DeliveryChannel,
        success: bool,
        error: Option<&str>,
    ) -> Result<CertificateStatus> {
        let mut entry = self
            .records
            .get_mut(certificate_id)
            .ok_or_else(|| CertError::NotFound {
                entity: "TrackedCertificate".to_string(),
                id: certificate_id.to_string(),
            })?;

        entry.attempts += 1;
        entry.last_attempt_at = Some(Utc::now());
        entry.last_channel = Some(DeliveryChannel::merge(entry.last_channel, channel));

        let target = if success {
            CertificateStatus::Sent
        } else {
            CertificateStatus::Failed
        };

        if entry.status.can_transition_to(target) {
            entry.status = target;
        } else {
            tracing::debug!(
                certificate_id = %certificate_id,
                current = %entry.status,
                target = %target,
                "状态流转不合法，保持原状态（仅更新簿记）"
            );
        }

        entry.last_error = if success {
            None
        } else {
            error.map(|e| e.to_string())
        };

        Ok(entry.status)
    }

    /// 写入外部送达确认（Delivered / Bounced）
    ///
    /// 本核心没有回执来源，此入口专供 webhook 协作方调用；
    /// 非法流转（如证书尚未发送）返回错误而非静默吞掉。
    pub fn apply_confirmation(
        &self,
        certificate_id: &CertificateId,
        confirmation: CertificateStatus,
    ) -> Result<()> {
        if !matches!(
            confirmation,
            CertificateStatus::Delivered | CertificateStatus::Bounced
        ) {
            return Err(CertError::InvalidArgument {
                field: "confirmation".to_string(),
                message: format!("送达确认只接受 delivered/bounced，收到 {confirmation}"),
            });
        }

        let mut entry = self
            .records
            .get_mut(certificate_id)
            .ok_or_else(|| CertError::NotFound {
                entity: "TrackedCertificate".to_string(),
                id: certificate_id.to_string(),
            })?;

        if !entry.status.can_transition_to(confirmation) {
            return Err(CertError::InvalidTransition {
                from: entry.status.to_string(),
                to: confirmation.to_string(),
            });
        }

        entry.status = confirmation;
        Ok(())
    }

    /// 查询单张证书当前状态
    pub fn status_of(&self, certificate_id: &CertificateId) -> Option<CertificateStatus> {
        self.records.get(certificate_id).map(|e| e.status)
    }

    /// 读取单张证书的完整跟踪条目
    pub fn get(&self, certificate_id: &CertificateId) -> Option<TrackedCertificate> {
        self.records.get(certificate_id).map(|e| e.clone())
    }

    /// "已发送则跳过" 策略的查询入口
    ///
    /// 编排器本身不去重；调用方在触发投递前用它过滤已送达集合。
    pub fn already_sent(&self, certificate_id: &CertificateId) -> bool {
        self.status_of(certificate_id)
            .map(|s| s.is_send_success())
            .unwrap_or(false)
    }

    /// 按活动聚合状态计数
    pub fn counts_for_event(&self, event_id: &str) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for entry in self.records.iter() {
            if entry.event_id != event_id {
                continue;
            }
            counts.total += 1;
            match entry.status {
                CertificateStatus::Generated => counts.generated += 1,
                CertificateStatus::Sent => counts.sent += 1,
                CertificateStatus::Delivered => counts.delivered += 1,
                CertificateStatus::Failed => counts.failed += 1,
                CertificateStatus::Bounced => counts.bounced += 1,
                CertificateStatus::Pending => {}
            }
        }
        counts
    }

    /// 当前处于失败状态的证书清单
    pub fn failed_for_event(&self, event_id: &str) -> Vec<FailedCertificate> {
        self.records
            .iter()
            .filter(|e| e.event_id == event_id && e.status == CertificateStatus::Failed)
            .map(|e| FailedCertificate {
                certificate_id: e.certificate_id.clone(),
                participant_name: e.participant_name.clone(),
                participant_email: e.participant_email.clone(),
                reason: e
                    .last_error
                    .clone()
                    .unwrap_or_else(|| "未知原因".to_string()),
            })
            .collect()
    }
}
