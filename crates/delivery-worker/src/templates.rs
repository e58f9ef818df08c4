//! 投递消息模板
//!
//! 根据证书制品渲染邮件主题、邮件正文与聊天文本。
//! 当前使用硬编码默认模板加占位符替换，操作员可在触发投递时
//! 提供自定义模板覆盖默认内容。

use cert_shared::model::CertificateArtifact;

/// 默认邮件主题
const DEFAULT_EMAIL_SUBJECT: &str = "Your Certificate of Participation - {eventTitle}";

/// 默认邮件正文
const DEFAULT_EMAIL_BODY: &str = "Dear {name},\n\n\
Congratulations on completing {eventTitle} held on {eventDate} at {location}!\n\n\
Your certificate of participation is attached to this email. \
You can verify its authenticity at any time:\n{verificationUrl}\n\n\
Best regards,\n{organizerName}";

/// 默认聊天文本（随后紧跟证书文档消息）
const DEFAULT_CHAT_TEXT: &str = "🎉 Congratulations {name}!\n\
Here is your certificate of participation for {eventTitle}.\n\
Verify it at: {verificationUrl}";

/// 模板渲染上下文
///
/// 全部取自证书制品的生成时刻快照，与参与者当前数据无关。
#[derive(Debug, Clone)]
pub struct TemplateContext {
    pub name: String,
    pub event_title: String,
    pub organizer_name: String,
    pub event_date: String,
    pub location: String,
    pub verification_url: String,
}

impl TemplateContext {
    pub fn from_artifact(artifact: &CertificateArtifact) -> Self {
        Self {
            name: artifact.data.participant_name.clone(),
            event_title: artifact.data.event_title.clone(),
            organizer_name: artifact.data.organizer_name.clone(),
            event_date: artifact.data.event_date.format("%Y-%m-%d").to_string(),
            location: artifact.data.location.clone(),
            verification_url: artifact.verification_url.clone(),
        }
    }
}

/// 操作员提供的模板覆盖
///
/// 缺省字段回落到默认模板；覆盖文本中可使用与默认模板相同的占位符。
#[derive(Debug, Clone, Default)]
pub struct TemplateOverrides {
    pub email_subject: Option<String>,
    pub email_body: Option<String>,
    pub chat_text: Option<String>,
}

/// 消息模板引擎
pub struct MessageTemplateEngine;

impl MessageTemplateEngine {
    /// 替换模板中的占位符
    ///
    /// 未被使用的占位符不报错；模板中不存在的字面量原样保留，
    /// 避免操作员的自定义文案因多写或少写占位符而投递失败。
    pub fn render(template: &str, ctx: &TemplateContext) -> String {
        template
            .replace("{name}", &ctx.name)
            .replace("{eventTitle}", &ctx.event_title)
            .replace("{organizerName}", &ctx.organizer_name)
            .replace("{eventDate}", &ctx.event_date)
            .replace("{location}", &ctx.location)
            .replace("{verificationUrl}", &ctx.verification_url)
    }

    /// 渲染邮件主题（覆盖优先）
    pub fn email_subject(overrides: &TemplateOverrides, ctx: &TemplateContext) -> String {
        let template = overrides
            .email_subject
            .as_deref()
            .unwrap_or(DEFAULT_EMAIL_SUBJECT);
        Self::render(template, ctx)
    }

    /// 渲染邮件正文（覆盖优先）
    pub fn email_body(overrides: &TemplateOverrides, ctx: &TemplateContext) -> String {
        let template = overrides
            .email_body
            .as_deref()
            .unwrap_or(DEFAULT_EMAIL_BODY);
        Self::render(template, ctx)
    }

    /// 渲染聊天文本（覆盖优先）
    pub fn chat_text(overrides: &TemplateOverrides, ctx: &TemplateContext) -> String {
        let template = overrides.chat_text.as_deref().unwrap_or(DEFAULT_CHAT_TEXT);
        Self::render(template, ctx)
    }
}
