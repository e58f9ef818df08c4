//! 证书渲染器
//!
//! 给定参与者与活动字段，签发验证码、组装固定版面的证书文档，
//! 经制品编码器编码为字节后写入内容存储，返回完整的证书制品记录。
//!
//! 三种模板（classic / modern / minimal）共享同一版面，仅调色板不同。
//! 原系统存在文档版与图片版两套几乎相同的生成器，这里统一收拢为
//! 一个 `ArtifactEncoder` 接口加可选输出格式；像素级绘制是外部协作方
//! 的能力，内置编码器产出确定性的结构化制品，供测试与下游绘制后端使用。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use cert_shared::model::{
    CertificateArtifact, CertificateData, DeliveryRecord, EventDescriptor, Participant,
    ParticipantSnapshot, TemplateKind,
};

use crate::error::{EngineError, Result};
use crate::storage::ContentStore;
use crate::verify::CodeIssuer;

// ---------------------------------------------------------------------------
// 调色板
// ---------------------------------------------------------------------------

/// 模板调色板
///
/// 配色为编译期常量，只做序列化输出，不支持反序列化。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Palette {
    pub background: &'static str,
    pub border: &'static str,
    pub text: &'static str,
    pub accent: &'static str,
}

impl Palette {
    /// 各模板的配色常量
    pub fn for_template(template: TemplateKind) -> Self {
        match template {
            TemplateKind::Classic => Self {
                background: "#1e3a8a",
                border: "#ffffff",
                text: "#ffffff",
                accent: "#fbbf24",
            },
            TemplateKind::Modern => Self {
                background: "#667eea",
                border: "#ffffff",
                text: "#ffffff",
                accent: "#fbbf24",
            },
            TemplateKind::Minimal => Self {
                background: "#f8fafc",
                border: "#1e293b",
                text: "#1e293b",
                accent: "#2563eb",
            },
        }
    }
}

// ---------------------------------------------------------------------------
// CertificateDocument — 固定版面
// ---------------------------------------------------------------------------

/// 组装完成、等待编码的证书文档
///
/// 字段顺序即版面自上而下的顺序；qr_payload 为扫描码应编码的验证 URL。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateDocument {
    pub title: String,
    pub certify_line: String,
    pub participant_name: String,
    pub participated_line: String,
    pub event_title: String,
    pub held_on: String,
    pub location: String,
    pub organizer_line: String,
    pub certificate_number: String,
    pub issued_on: String,
    pub qr_payload: String,
    pub template: TemplateKind,
    pub palette: Palette,
}

impl CertificateDocument {
    /// 按固定版面组装文档
    pub fn compose(
        data: &CertificateData,
        template: TemplateKind,
        verification_url: &str,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            title: "CERTIFICATE OF PARTICIPATION".to_string(),
            certify_line: "This is to certify that".to_string(),
            participant_name: data.participant_name.clone(),
            participated_line: "has successfully participated in".to_string(),
            event_title: data.event_title.clone(),
            held_on: format!("held on {}", data.event_date.format("%Y-%m-%d")),
            location: format!("at {}", data.location),
            organizer_line: format!("Organized by: {}", data.organizer_name),
            certificate_number: format!("Certificate No: {}", data.certificate_number),
            issued_on: format!("Issued on: {}", issued_at.format("%Y-%m-%d")),
            qr_payload: verification_url.to_string(),
            template,
            palette: Palette::for_template(template),
        }
    }
}

// ---------------------------------------------------------------------------
// ArtifactEncoder — 可插拔编码后端
// ---------------------------------------------------------------------------

/// 制品输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    /// 可打印文档（原系统的 PDF 路径）
    Document,
    /// 位图（原系统的图片路径）
    Image,
}

/// 制品编码器接口
///
/// 像素绘制后端（PDF、位图）在此接入；管道只依赖本接口。
pub trait ArtifactEncoder: Send + Sync {
    fn encode(&self, document: &CertificateDocument) -> Result<Vec<u8>>;
    fn format(&self) -> ArtifactFormat;
    /// 制品文件扩展名（不含点）
    fn file_extension(&self) -> &'static str;
}

/// 内置结构化编码器
///
/// 将版面序列化为确定性 JSON 字节，不依赖任何绘制库。
/// 两种输出格式走同一版面，仅在制品内打上格式标记。
pub struct StructuredEncoder {
    format: ArtifactFormat,
}

impl StructuredEncoder {
    pub fn document() -> Self {
        Self {
            format: ArtifactFormat::Document,
        }
    }

    pub fn image() -> Self {
        Self {
            format: ArtifactFormat::Image,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StructuredArtifact<'a> {
    format: ArtifactFormat,
    #[serde(flatten)]
    document: &'a CertificateDocument,
}

impl ArtifactEncoder for StructuredEncoder {
    fn encode(&self, document: &CertificateDocument) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(&StructuredArtifact {
            format: self.format,
            document,
        })
        .map_err(|e| EngineError::Encoding(e.to_string()))
    }

    fn format(&self) -> ArtifactFormat {
        self.format
    }

    fn file_extension(&self) -> &'static str {
        "json"
    }
}

// ---------------------------------------------------------------------------
// CertificateRenderer
// ---------------------------------------------------------------------------

/// 证书渲染器
///
/// 渲染失败（编码或存储写入）以单个 `RenderFailed`/`Storage` 错误返回给
/// 该参与者，绝不中断同批其他参与者的渲染。
pub struct CertificateRenderer {
    issuer: CodeIssuer,
    store: Arc<dyn ContentStore>,
    encoder: Arc<dyn ArtifactEncoder>,
    verify_base_url: String,
}

impl CertificateRenderer {
    pub fn new(
        store: Arc<dyn ContentStore>,
        encoder: Arc<dyn ArtifactEncoder>,
        verify_base_url: impl Into<String>,
    ) -> Self {
        Self {
            issuer: CodeIssuer::new(),
            store,
            encoder,
            verify_base_url: verify_base_url.into(),
        }
    }

    /// 渲染一张证书并持久化制品
    pub async fn render(
        &self,
        participant: &Participant,
        event: &EventDescriptor,
        template: TemplateKind,
    ) -> Result<CertificateArtifact> {
        let certificate_id = self.issuer.issue();
        let verification_url = self
            .issuer
            .verification_url(&self.verify_base_url, &certificate_id);

        let generated_at = Utc::now();
        let data = CertificateData {
            participant_name: participant.name.clone(),
            event_title: event.title.clone(),
            event_date: event.event_date,
            organizer_name: event.organizer_name.clone(),
            location: event.location.clone(),
            certificate_number: certificate_id.to_string(),
        };

        let document =
            CertificateDocument::compose(&data, template, &verification_url, generated_at);
        let bytes = self.encoder.encode(&document)?;

        let file_name = format!(
            "certificate_{}.{}",
            certificate_id,
            self.encoder.file_extension()
        );
        let locator = self.store.put(&file_name, &bytes).await?;

        debug!(
            certificate_id = %certificate_id,
            participant = %participant.name,
            template = %template,
            size = bytes.len(),
            "证书渲染完成"
        );

        Ok(CertificateArtifact {
            certificate_id,
            event_id: event.event_id.clone(),
            participant: ParticipantSnapshot::from(participant),
            data,
            verification_url,
            locator,
            template,
            generated_at,
            file_size: bytes.len() as u64,
            delivery: DeliveryRecord::generated(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryContentStore;
    use cert_shared::model::CertificateStatus;

    fn make_event() -> EventDescriptor {
        EventDescriptor {
            event_id: "evt-render".to_string(),
            title: "Rust 工作坊".to_string(),
            event_date: Utc::now(),
            location: "上海".to_string(),
            organizer_name: "社区组委会".to_string(),
            template: TemplateKind::Classic,
        }
    }

    fn make_renderer(store: Arc<MemoryContentStore>) -> CertificateRenderer {
        CertificateRenderer::new(
            store,
            Arc::new(StructuredEncoder::document()),
            "http://localhost:3000",
        )
    }

    #[tokio::test]
    async fn test_render_produces_artifact_with_verification_url() {
        let store = Arc::new(MemoryContentStore::new());
        let renderer = make_renderer(store.clone());
        let participant = Participant::new("张三").with_email("zhangsan@example.com");

        let artifact = renderer
            .render(&participant, &make_event(), TemplateKind::Classic)
            .await
            .expect("渲染应成功");

        assert_eq!(artifact.event_id, "evt-render");
        assert_eq!(artifact.participant.name, "张三");
        assert!(
            artifact
                .verification_url
                .contains(artifact.certificate_id.as_str())
        );
        assert_eq!(artifact.delivery.status, CertificateStatus::Generated);
        assert!(artifact.file_size > 0);

        // 制品可按定位符读回，且内含验证 URL
        let bytes = store.get(&artifact.locator).await.unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains(&artifact.verification_url));
        assert!(text.contains("CERTIFICATE OF PARTICIPATION"));
        // 调色板随文档一并序列化进制品
        assert!(text.contains("#1e3a8a"));
    }

    #[tokio::test]
    async fn test_render_distinct_ids_for_same_participant() {
        let store = Arc::new(MemoryContentStore::new());
        let renderer = make_renderer(store);
        let participant = Participant::new("李四");
        let event = make_event();

        let a = renderer
            .render(&participant, &event, TemplateKind::Classic)
            .await
            .unwrap();
        let b = renderer
            .render(&participant, &event, TemplateKind::Classic)
            .await
            .unwrap();

        assert_ne!(a.certificate_id, b.certificate_id);
        assert_ne!(a.locator, b.locator);
    }

    #[test]
    fn test_palette_varies_by_template_only() {
        let classic = Palette::for_template(TemplateKind::Classic);
        let modern = Palette::for_template(TemplateKind::Modern);
        let minimal = Palette::for_template(TemplateKind::Minimal);

        assert_eq!(classic.background, "#1e3a8a");
        assert_eq!(modern.background, "#667eea");
        assert_eq!(minimal.background, "#f8fafc");
        assert_ne!(classic.background, modern.background);
    }

    #[test]
    fn test_document_layout_is_template_independent() {
        let data = CertificateData {
            participant_name: "王五".to_string(),
            event_title: "年会".to_string(),
            event_date: Utc::now(),
            organizer_name: "组委会".to_string(),
            location: "北京".to_string(),
            certificate_number: "CERT-X-0000000001".to_string(),
        };
        let url = "http://localhost:3000/verify/CERT-X-0000000001";
        let now = Utc::now();

        let classic = CertificateDocument::compose(&data, TemplateKind::Classic, url, now);
        let minimal = CertificateDocument::compose(&data, TemplateKind::Minimal, url, now);

        // 版面字段一致，仅调色板与模板标记不同
        assert_eq!(classic.title, minimal.title);
        assert_eq!(classic.certificate_number, minimal.certificate_number);
        assert_eq!(classic.qr_payload, minimal.qr_payload);
        assert_ne!(classic.palette, minimal.palette);
    }

    #[tokio::test]
    async fn test_encoder_failure_surfaces_as_render_error() {
        struct FailingEncoder;
        impl ArtifactEncoder for FailingEncoder {
            fn encode(&self, _document: &CertificateDocument) -> Result<Vec<u8>> {
                Err(EngineError::Encoding("扫描码编码失败".to_string()))
            }
            fn format(&self) -> ArtifactFormat {
                ArtifactFormat::Image
            }
            fn file_extension(&self) -> &'static str {
                "png"
            }
        }

        let renderer = CertificateRenderer::new(
            Arc::new(MemoryContentStore::new()),
            Arc::new(FailingEncoder),
            "http://localhost:3000",
        );
        let result = renderer
            .render(&Participant::new("赵六"), &make_event(), TemplateKind::Modern)
            .await;
        assert!(matches!(result, Err(EngineError::Encoding(_))));
    }
}
