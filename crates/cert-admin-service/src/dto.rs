//! REST API 请求与响应 DTO 定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cert_shared::model::{EventDescriptor, Participant, TemplateKind};
use cert_shared::status::{FailedCertificate, StatusCounts};
use certificate_engine::batch::GenerationResult;

// ---------------------------------------------------------------------------
// 统一响应
// ---------------------------------------------------------------------------

/// API 统一响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// 创建成功响应
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: "操作成功".to_string(),
            data: Some(data),
        }
    }
}

// ---------------------------------------------------------------------------
// 请求
// ---------------------------------------------------------------------------

/// 生成请求中的活动字段
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventInput {
    pub title: String,
    pub event_date: DateTime<Utc>,
    pub location: String,
    pub organizer_name: String,
    #[serde(default)]
    pub template: TemplateKind,
}

impl EventInput {
    pub fn into_descriptor(self, event_id: &str) -> EventDescriptor {
        EventDescriptor {
            event_id: event_id.to_string(),
            title: self.title,
            event_date: self.event_date,
            location: self.location,
            organizer_name: self.organizer_name,
            template: self.template,
        }
    }
}

/// 生成请求中的参与者字段
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantInput {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl From<ParticipantInput> for Participant {
    fn from(input: ParticipantInput) -> Self {
        Self {
            name: input.name,
            email: input.email,
            phone: input.phone,
            ..Participant::new("")
        }
    }
}

/// 批量生成请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub event: EventInput,
    pub participants: Vec<ParticipantInput>,
    /// 覆盖活动默认模板
    #[serde(default)]
    pub template: Option<TemplateKind>,
}

/// 批量投递请求
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DeliverRequest {
    /// 缺省 true
    #[serde(default)]
    pub send_email: Option<bool>,
    /// 缺省 false
    #[serde(default)]
    pub send_chat: Option<bool>,
    /// 只补发当前失败的证书
    #[serde(default)]
    pub only_failed: bool,
    /// 已发送的证书也重新投递（默认跳过）
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub email_subject: Option<String>,
    #[serde(default)]
    pub email_body: Option<String>,
    #[serde(default)]
    pub chat_text: Option<String>,
}

/// 聊天渠道测试请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTestRequest {
    pub phone: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// 邮件渠道测试请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailTestRequest {
    pub to: String,
}

// ---------------------------------------------------------------------------
// 响应
// ---------------------------------------------------------------------------

/// 批量生成响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub event_id: String,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<GenerationResult>,
}

impl GenerateResponse {
    pub fn new(event_id: &str, results: Vec<GenerationResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        Self {
            event_id: event_id.to_string(),
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }
}

/// 活动维度的状态响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub event_id: String,
    pub counts: StatusCounts,
    pub failed: Vec<FailedCertificate>,
}
