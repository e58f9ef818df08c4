//! 领域模型
//!
//! 定义证书管道中流转的核心数据结构：参与者、活动描述、证书制品与
//! 投递记录。证书制品是参与者字段在生成时刻的不可变快照——即使参与者
//! 数据事后变更，已签发的证书仍保持有效。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// TemplateKind — 证书模板
// ---------------------------------------------------------------------------

/// 证书模板
///
/// 三种模板共享同一字段布局，仅配色不同。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    #[default]
    Classic,
    Modern,
    Minimal,
}

impl std::fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Classic => "classic",
            Self::Modern => "modern",
            Self::Minimal => "minimal",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for TemplateKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "classic" => Ok(Self::Classic),
            "modern" => Ok(Self::Modern),
            "minimal" => Ok(Self::Minimal),
            other => Err(format!("未知模板: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// DeliveryChannel — 投递渠道
// ---------------------------------------------------------------------------

/// 投递渠道
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryChannel {
    Email,
    Chat,
    /// 两个渠道都发送过（仅用于投递记录的回写，适配器不使用）
    Both,
}

impl DeliveryChannel {
    /// 合并本次尝试的渠道与历史记录的渠道
    pub fn merge(existing: Option<Self>, attempted: Self) -> Self {
        match (existing, attempted) {
            (None, c) => c,
            (Some(a), b) if a == b => a,
            _ => Self::Both,
        }
    }
}

impl std::fmt::Display for DeliveryChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Email => "email",
            Self::Chat => "chat",
            Self::Both => "both",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// CertificateStatus — 证书状态机
// ---------------------------------------------------------------------------

/// 证书生命周期状态
///
/// 管道本身只产生 Generated/Sent/Failed 三种状态；Delivered/Bounced
/// 需要外部送达确认（回执 webhook）作为生产者，本核心不会凭空产生它们。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CertificateStatus {
    /// 仅用于名册回写：尚未生成证书
    #[default]
    Pending,
    Generated,
    Sent,
    Delivered,
    Failed,
    Bounced,
}

impl CertificateStatus {
    /// 状态流转是否合法
    ///
    /// 同状态覆盖视为合法（投递重放不改变状态语义）；
    /// `Failed -> Sent` 允许，支撑操作员手动补发。
    pub fn can_transition_to(self, next: Self) -> bool {
        if self == next {
            return true;
        }
        matches!(
            (self, next),
            (Self::Pending, Self::Generated)
                | (Self::Generated, Self::Sent)
                | (Self::Generated, Self::Failed)
                | (Self::Sent, Self::Delivered)
                | (Self::Sent, Self::Bounced)
                | (Self::Sent, Self::Failed)
                | (Self::Failed, Self::Sent)
        )
    }

    /// 是否为本管道可产出的成功终态
    pub fn is_send_success(self) -> bool {
        matches!(self, Self::Sent | Self::Delivered)
    }
}

impl std::fmt::Display for CertificateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Generated => "generated",
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
            Self::Bounced => "bounced",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Participant / EventDescriptor
// ---------------------------------------------------------------------------

/// 活动参与者
///
/// email 与 phone 均可缺省；两者都缺省不是错误，只是该参与者无法投递。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub registered_at: DateTime<Utc>,
    /// 名册上回写的证书状态
    #[serde(default)]
    pub certificate_status: CertificateStatus,
    /// 名册上回写的证书编号
    #[serde(default)]
    pub certificate_id: Option<CertificateId>,
}

impl Participant {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: None,
            phone: None,
            registered_at: Utc::now(),
            certificate_status: CertificateStatus::Pending,
            certificate_id: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// 是否存在任一可投递渠道
    pub fn has_delivery_channel(&self) -> bool {
        self.email.is_some() || self.phone.is_some()
    }
}

/// 活动描述
///
/// 活动本体由外部协作方持有；本核心只读取渲染与消息所需字段。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDescriptor {
    pub event_id: String,
    pub title: String,
    pub event_date: DateTime<Utc>,
    pub location: String,
    pub organizer_name: String,
    #[serde(default)]
    pub template: TemplateKind,
}

// ---------------------------------------------------------------------------
// CertificateId / ArtifactLocator
// ---------------------------------------------------------------------------

/// 证书唯一编号（签发后永不复用）
///
/// 编号前缀含时间成分，字典序即近似签发顺序。
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CertificateId(pub String);

impl CertificateId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CertificateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 制品定位符
///
/// 由内容存储返回的稳定定位串（文件路径或对象存储 key），
/// 渠道适配器后续据此读取制品。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactLocator(pub String);

impl ArtifactLocator {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ArtifactLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// CertificateArtifact — 证书制品记录
// ---------------------------------------------------------------------------

/// 渲染进证书的字段快照
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateData {
    pub participant_name: String,
    pub event_title: String,
    pub event_date: DateTime<Utc>,
    pub organizer_name: String,
    pub location: String,
    pub certificate_number: String,
}

/// 生成时刻的参与者快照（非活引用）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantSnapshot {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl From<&Participant> for ParticipantSnapshot {
    fn from(p: &Participant) -> Self {
        Self {
            name: p.name.clone(),
            email: p.email.clone(),
            phone: p.phone.clone(),
        }
    }
}

/// 证书制品记录
///
/// 每次成功渲染恰好创建一条；除投递簿记（delivery 字段）外不可变。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateArtifact {
    pub certificate_id: CertificateId,
    pub event_id: String,
    pub participant: ParticipantSnapshot,
    pub data: CertificateData,
    pub verification_url: String,
    pub locator: ArtifactLocator,
    pub template: TemplateKind,
    pub generated_at: DateTime<Utc>,
    pub file_size: u64,
    pub delivery: DeliveryRecord,
}

/// 投递簿记
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRecord {
    pub status: CertificateStatus,
    pub attempts: u32,
    #[serde(default)]
    pub last_attempt_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_channel: Option<DeliveryChannel>,
}

impl DeliveryRecord {
    /// 新生成证书的初始投递记录
    pub fn generated() -> Self {
        Self {
            status: CertificateStatus::Generated,
            attempts: 0,
            last_attempt_at: None,
            last_channel: None,
        }
    }
}
