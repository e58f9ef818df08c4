//! 邮件渠道适配器
//!
//! 通过 `EmailTransport` trait 抽象实际的邮件投递后端；内置基于
//! HTTP JSON 接口的实现（对接邮件服务商的投递 API）。每次投递
//! 恰好发起一次传输调用，失败不在适配器内重试——补发由编排器的
//! 失败子集路径决策。适配器边界绝不抛异常：任何失败折叠为该
//! 参与者的 `ChannelOutcome`，不影响同批其他邮件。

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use cert_shared::config::EmailConfig;
use cert_shared::model::{CertificateArtifact, DeliveryChannel};
use certificate_engine::storage::ContentStore;

use crate::error::{DeliveryError, Result};
use crate::outcome::ChannelOutcome;
use crate::templates::{MessageTemplateEngine, TemplateContext, TemplateOverrides};

// ---------------------------------------------------------------------------
// 邮件消息与传输接口
// ---------------------------------------------------------------------------

/// 邮件附件（内容以 base64 编码）
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailAttachment {
    pub file_name: String,
    pub content_base64: String,
}

/// 待发送的邮件
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailMessage {
    pub to: String,
    pub to_name: String,
    pub subject: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<EmailAttachment>,
}

/// 邮件传输接口
///
/// 返回外部服务商的消息标识；真实后端（SMTP 网关、SendGrid 等）
/// 与测试替身都通过本 trait 接入。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<String>;
}

// ---------------------------------------------------------------------------
// HttpMailTransport — HTTP JSON 投递后端
// ---------------------------------------------------------------------------

/// 基于 HTTP JSON 接口的邮件传输
pub struct HttpMailTransport {
    client: reqwest::Client,
    endpoint: String,
    from_name: String,
    from_address: String,
}

impl HttpMailTransport {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| DeliveryError::TransportFailed {
                channel: "email".to_string(),
                reason: format!("HTTP 客户端初始化失败: {e}"),
            })?;

        Ok(Self {
            client,
            endpoint: config.api_endpoint.clone(),
            from_name: config.from_name.clone(),
            from_address: config.from_address.clone(),
        })
    }
}

#[async_trait]
impl EmailTransport for HttpMailTransport {
    /// 恰好发起一次投递调用，超时按配置截断
    async fn send(&self, message: &EmailMessage) -> Result<String> {
        let payload = serde_json::json!({
            "from": { "name": self.from_name, "address": self.from_address },
            "to": { "name": message.to_name, "address": message.to },
            "subject": message.subject,
            "body": message.body,
            "attachment": message.attachment,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DeliveryError::Timeout {
                        channel: "email".to_string(),
                    }
                } else {
                    DeliveryError::TransportFailed {
                        channel: "email".to_string(),
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::TransportFailed {
                channel: "email".to_string(),
                reason: format!("投递接口返回 {status}: {body}"),
            });
        }

        // 服务商未返回消息标识时本地生成，保证结果可追踪
        let message_id = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|v| v.get("messageId").and_then(|id| id.as_str().map(String::from)))
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        debug!(to = %message.to, message_id = %message_id, "邮件已提交投递接口");
        Ok(message_id)
    }
}

// ---------------------------------------------------------------------------
// EmailAdapter — 渠道适配器
// ---------------------------------------------------------------------------

/// 邮件渠道适配器
///
/// 读取制品字节作为附件，渲染主题与正文后交给传输层。
pub struct EmailAdapter {
    transport: Arc<dyn EmailTransport>,
    content: Arc<dyn ContentStore>,
}

impl EmailAdapter {
    pub fn new(transport: Arc<dyn EmailTransport>, content: Arc<dyn ContentStore>) -> Self {
        Self { transport, content }
    }

    /// 投递一张证书到参与者邮箱
    ///
    /// 本方法不返回 Err：所有失败折叠为失败的 `ChannelOutcome`。
    pub async fn send_certificate(
        &self,
        artifact: &CertificateArtifact,
        overrides: &TemplateOverrides,
    ) -> ChannelOutcome {
        match self.try_send(artifact, overrides).await {
            Ok(message_id) => {
                info!(
                    certificate_id = %artifact.certificate_id,
                    to = artifact.participant.email.as_deref().unwrap_or(""),
                    message_id = %message_id,
                    "证书邮件发送成功"
                );
                ChannelOutcome::ok(DeliveryChannel::Email, message_id)
            }
            Err(e) => {
                warn!(
                    certificate_id = %artifact.certificate_id,
                    participant = %artifact.participant.name,
                    error = %e,
                    "证书邮件发送失败"
                );
                ChannelOutcome::failed(DeliveryChannel::Email, &e)
            }
        }
    }

    async fn try_send(
        &self,
        artifact: &CertificateArtifact,
        overrides: &TemplateOverrides,
    ) -> Result<String> {
        let to = artifact
            .participant
            .email
            .clone()
            .ok_or_else(|| DeliveryError::MissingAddress {
                channel: "email".to_string(),
            })?;

        let bytes = self.content.get(&artifact.locator).await?;
        let ctx = TemplateContext::from_artifact(artifact);

        let message = EmailMessage {
            to,
            to_name: artifact.participant.name.clone(),
            subject: MessageTemplateEngine::email_subject(overrides, &ctx),
            body: MessageTemplateEngine::email_body(overrides, &ctx),
            attachment: Some(EmailAttachment {
                file_name: artifact
                    .locator
                    .as_str()
                    .rsplit('/')
                    .next()
                    .unwrap_or("certificate")
                    .to_string(),
                content_base64: BASE64.encode(&bytes),
            }),
        };

        self.transport.send(&message).await
    }

    /// 发送无附件的测试邮件，验证传输配置
    pub async fn send_test(&self, to: &str) -> ChannelOutcome {
        let message = EmailMessage {
            to: to.to_string(),
            to_name: to.to_string(),
            subject: "Certificate system test email".to_string(),
            body: "This is a test message confirming the email channel is configured correctly."
                .to_string(),
            attachment: None,
        };

        match self.transport.send(&message).await {
            Ok(message_id) => ChannelOutcome::ok(DeliveryChannel::Email, message_id),
            Err(e) => ChannelOutcome::failed(DeliveryChannel::Email, &e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use certificate_engine::storage::MemoryContentStore;
    use cert_shared::model::{
        ArtifactLocator, CertificateData, CertificateId, DeliveryRecord, ParticipantSnapshot,
        TemplateKind,
    };
    use chrono::Utc;

    fn make_artifact(locator: &str, email: Option<&str>) -> CertificateArtifact {
        CertificateArtifact {
            certificate_id: CertificateId("CERT-E-0000000001".to_string()),
            event_id: "evt-1".to_string(),
            participant: ParticipantSnapshot {
                name: "张三".to_string(),
                email: email.map(String::from),
                phone: None,
            },
            data: CertificateData {
                participant_name: "张三".to_string(),
                event_title: "Rust 工作坊".to_string(),
                event_date: Utc::now(),
                organizer_name: "组委会".to_string(),
                location: "上海".to_string(),
                certificate_number: "CERT-E-0000000001".to_string(),
            },
            verification_url: "http://localhost:3000/verify/CERT-E-0000000001".to_string(),
            locator: ArtifactLocator(locator.to_string()),
            template: TemplateKind::Classic,
            generated_at: Utc::now(),
            file_size: 64,
            delivery: DeliveryRecord::generated(),
        }
    }

    async fn store_with_artifact() -> Arc<MemoryContentStore> {
        let store = Arc::new(MemoryContentStore::new());
        store
            .put("certificate_CERT-E-0000000001.json", b"{\"fake\":true}")
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_send_certificate_success() {
        let mut transport = MockEmailTransport::new();
        transport
            .expect_send()
            .withf(|m: &EmailMessage| {
                m.to == "zhangsan@example.com"
                    && m.subject.contains("Rust 工作坊")
                    && m.attachment.is_some()
            })
            .times(1)
            .returning(|_| Ok("msg-42".to_string()));

        let adapter = EmailAdapter::new(Arc::new(transport), store_with_artifact().await);
        let artifact = make_artifact(
            "mem://certificate_CERT-E-0000000001.json",
            Some("zhangsan@example.com"),
        );

        let outcome = adapter
            .send_certificate(&artifact, &TemplateOverrides::default())
            .await;
        assert!(outcome.success);
        assert_eq!(outcome.message_id.as_deref(), Some("msg-42"));
        assert_eq!(outcome.channel, DeliveryChannel::Email);
    }

    #[tokio::test]
    async fn test_missing_email_never_touches_transport() {
        let mut transport = MockEmailTransport::new();
        transport.expect_send().times(0);

        let adapter = EmailAdapter::new(Arc::new(transport), store_with_artifact().await);
        let artifact = make_artifact("mem://certificate_CERT-E-0000000001.json", None);

        let outcome = adapter
            .send_certificate(&artifact, &TemplateOverrides::default())
            .await;
        assert!(!outcome.success);
        assert!(outcome.error.as_deref().unwrap().contains("email"));
    }

    #[tokio::test]
    async fn test_transport_failure_folds_into_outcome() {
        let mut transport = MockEmailTransport::new();
        transport.expect_send().times(1).returning(|_| {
            Err(DeliveryError::TransportFailed {
                channel: "email".to_string(),
                reason: "连接被拒绝".to_string(),
            })
        });

        let adapter = EmailAdapter::new(Arc::new(transport), store_with_artifact().await);
        let artifact = make_artifact(
            "mem://certificate_CERT-E-0000000001.json",
            Some("zhangsan@example.com"),
        );

        let outcome = adapter
            .send_certificate(&artifact, &TemplateOverrides::default())
            .await;
        assert!(!outcome.success);
        assert!(outcome.error.as_deref().unwrap().contains("连接被拒绝"));
    }

    #[tokio::test]
    async fn test_failed_send_issues_exactly_one_transport_call() {
        // 超时这类瞬时故障也不在适配器内重试，补发归编排器
        let mut transport = MockEmailTransport::new();
        transport.expect_send().times(1).returning(|_| {
            Err(DeliveryError::Timeout {
                channel: "email".to_string(),
            })
        });

        let adapter = EmailAdapter::new(Arc::new(transport), store_with_artifact().await);
        let artifact = make_artifact(
            "mem://certificate_CERT-E-0000000001.json",
            Some("zhangsan@example.com"),
        );

        let outcome = adapter
            .send_certificate(&artifact, &TemplateOverrides::default())
            .await;
        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn test_missing_artifact_is_channel_failure() {
        let mut transport = MockEmailTransport::new();
        transport.expect_send().times(0);

        // 内容存储为空，制品读取必然失败
        let adapter = EmailAdapter::new(Arc::new(transport), Arc::new(MemoryContentStore::new()));
        let artifact = make_artifact("mem://missing.json", Some("zhangsan@example.com"));

        let outcome = adapter
            .send_certificate(&artifact, &TemplateOverrides::default())
            .await;
        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn test_send_test_email() {
        let mut transport = MockEmailTransport::new();
        transport
            .expect_send()
            .withf(|m: &EmailMessage| m.attachment.is_none())
            .times(1)
            .returning(|_| Ok("msg-test".to_string()));

        let adapter = EmailAdapter::new(Arc::new(transport), Arc::new(MemoryContentStore::new()));
        let outcome = adapter.send_test("ops@example.com").await;
        assert!(outcome.success);
    }
}
