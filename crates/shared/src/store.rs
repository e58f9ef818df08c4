//! 证书持久化接口
//!
//! 定义仓储接口，便于管道依赖抽象而非具体实现，支持 mock 测试。
//! 真实的数据库落地由外部协作方提供；本 crate 附带内存实现，
//! 供测试与单进程部署使用。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{CertError, Result};
use crate::model::{CertificateArtifact, CertificateId, CertificateStatus};

/// 证书仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CertificateStore: Send + Sync {
    /// 保存一条证书制品记录（证书编号唯一）
    async fn save_certificate(&self, record: &CertificateArtifact) -> Result<()>;

    /// 读取单条证书记录
    async fn get_certificate(&self, certificate_id: &CertificateId)
    -> Result<CertificateArtifact>;

    /// 列出某活动的全部证书记录
    async fn list_certificates(&self, event_id: &str) -> Result<Vec<CertificateArtifact>>;

    /// 回写名册上参与者的证书状态
    ///
    /// 参与者在名册上以邮箱标识（原始名册语义）；没有邮箱的参与者
    /// 由调用方负责跳过回写。
    async fn update_participant_status(
        &self,
        event_id: &str,
        participant_email: &str,
        status: CertificateStatus,
    ) -> Result<()>;
}

// ---------------------------------------------------------------------------
// MemoryCertificateStore — 内存实现
// ---------------------------------------------------------------------------

/// 内存仓储实现
///
/// 不跨进程持久化；进程重启后记录丢失（外部持久化是协作方职责）。
#[derive(Debug, Default)]
pub struct MemoryCertificateStore {
    certificates: RwLock<HashMap<CertificateId, CertificateArtifact>>,
    /// event_id -> participant_email -> 回写的状态
    participant_status: RwLock<HashMap<String, HashMap<String, CertificateStatus>>>,
}

impl MemoryCertificateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 测试与报表用：读取某参与者被回写的状态
    pub async fn participant_status(
        &self,
        event_id: &str,
        participant_email: &str,
    ) -> Option<CertificateStatus> {
        self.participant_status
            .read()
            .await
            .get(event_id)
            .and_then(|m| m.get(participant_email))
            .copied()
    }
}

#[async_trait]
impl CertificateStore for MemoryCertificateStore {
    async fn save_certificate(&self, record: &CertificateArtifact) -> Result<()> {
        let mut certs = self.certificates.write().await;
        if certs.contains_key(&record.certificate_id) {
            return Err(CertError::AlreadyExists {
                entity: "Certificate".to_string(),
                field: "certificate_id".to_string(),
                value: record.certificate_id.to_string(),
            });
        }
        certs.insert(record.certificate_id.clone(), record.clone());
        Ok(())
    }

    async fn get_certificate(
        &self,
        certificate_id: &CertificateId,
    ) -> Result<CertificateArtifact> {
        self.certificates
            .read()
            .await
            .get(certificate_id)
            .cloned()
            .ok_or_else(|| CertError::NotFound {
                entity: "Certificate".to_string(),
                id: certificate_id.to_string(),
            })
    }

    async fn list_certificates(&self, event_id: &str) -> Result<Vec<CertificateArtifact>> {
        let certs = self.certificates.read().await;
        let mut list: Vec<_> = certs
            .values()
            .filter(|c| c.event_id == event_id)
            .cloned()
            .collect();
        // 按生成时间排序，保证报表输出稳定
        list.sort_by_key(|c| c.generated_at);
        Ok(list)
    }

    async fn update_participant_status(
        &self,
        event_id: &str,
        participant_email: &str,
        status: CertificateStatus,
    ) -> Result<()> {
        let mut map = self.participant_status.write().await;
        map.entry(event_id.to_string())
            .or_default()
            .insert(participant_email.to_string(), status);
        Ok(())
    }
}
