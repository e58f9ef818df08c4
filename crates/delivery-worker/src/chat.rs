//! 聊天渠道适配器
//!
//! 聊天渠道与邮件不同：发送前必须存在一个已配对的长连接会话。
//! `ChatSession` 维护会话生命周期状态机：
//!
//! ```text
//! Uninitialized -> AwaitingPairing -> Authenticated -> Ready
//!        ^                                               |
//!        +--------------- Disconnected <-----------------+
//! ```
//!
//! 配对需要人工参与（操作员在移动端扫码/输码），耗时无上界，
//! 因此 `start` 只负责发起并立即返回，状态由传输事件异步推进。
//! 未就绪时发送请求快速失败，不做任何排队或自动重连。
//!
//! 同一会话内的发送严格串行，相邻消息之间保持最小间隔，
//! 避免触发外部网络的反滥用封禁。

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, warn};

use cert_shared::config::ChatConfig;
use cert_shared::model::{CertificateArtifact, DeliveryChannel};
use certificate_engine::storage::ContentStore;

use crate::error::{DeliveryError, Result};
use crate::outcome::ChannelOutcome;

// ---------------------------------------------------------------------------
// 会话状态与传输事件
// ---------------------------------------------------------------------------

/// 会话生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Uninitialized,
    /// 等待操作员在移动端完成配对
    AwaitingPairing,
    /// 凭据已校验，传输层尚未宣告可发送
    Authenticated,
    Ready,
    Disconnected,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Uninitialized => "uninitialized",
            Self::AwaitingPairing => "awaiting_pairing",
            Self::Authenticated => "authenticated",
            Self::Ready => "ready",
            Self::Disconnected => "disconnected",
        };
        write!(f, "{s}")
    }
}

/// 传输层上报的会话事件
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// 新的配对码（二维码负载），供操作员展示
    PairingCode(String),
    Authenticated,
    /// 可发送，同时宣告会话身份
    Ready { identity: SessionIdentity },
    Disconnected { reason: Option<String> },
}

/// 会话身份，配对完成后由传输层宣告
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionIdentity {
    /// 账号展示名
    pub display_name: String,
    /// 网络侧端点地址
    pub endpoint: String,
}

/// 聊天传输接口
///
/// 真实后端是个人账号网关的长连接客户端；测试使用脚本化替身。
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// 发起连接，后续生命周期事件经 `events` 上报
    async fn start(&self, events: mpsc::Sender<TransportEvent>) -> Result<()>;

    /// 关闭连接并释放资源
    async fn stop(&self) -> Result<()>;

    /// 查询目标句柄在该网络是否注册
    async fn is_registered(&self, handle: &str) -> Result<bool>;

    /// 发送纯文本消息，返回外部消息标识
    async fn send_text(&self, handle: &str, text: &str) -> Result<String>;

    /// 发送文档消息，返回外部消息标识
    async fn send_document(
        &self,
        handle: &str,
        file_name: &str,
        bytes: Vec<u8>,
        caption: &str,
    ) -> Result<String>;
}

/// 会话对外视图（HTTP 接口返回给操作员）
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub state: SessionState,
    pub ready: bool,
    /// 仅在 awaiting_pairing 阶段存在
    pub pairing_code: Option<String>,
    /// 仅在 ready 阶段存在
    pub identity: Option<SessionIdentity>,
}

// ---------------------------------------------------------------------------
// ChatSession
// ---------------------------------------------------------------------------

/// 聊天会话
///
/// 全进程共享单个会话实例；发送经内部互斥锁严格串行。
pub struct ChatSession {
    transport: Arc<dyn ChatTransport>,
    content: Arc<dyn ContentStore>,
    config: ChatConfig,
    state_tx: watch::Sender<SessionState>,
    pairing_code: Arc<parking_lot::Mutex<Option<String>>>,
    identity: Arc<parking_lot::Mutex<Option<SessionIdentity>>>,
    /// 发送互斥锁，同时记录最近一次发送时刻用于最小间隔控制
    send_gate: tokio::sync::Mutex<Option<Instant>>,
    event_task: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl ChatSession {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        content: Arc<dyn ContentStore>,
        config: ChatConfig,
    ) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Uninitialized);
        Self {
            transport,
            content,
            config,
            state_tx,
            pairing_code: Arc::new(parking_lot::Mutex::new(None)),
            identity: Arc::new(parking_lot::Mutex::new(None)),
            send_gate: tokio::sync::Mutex::new(None),
            event_task: parking_lot::Mutex::new(None),
        }
    }

    /// 当前会话状态
    pub fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == SessionState::Ready
    }

    /// 会话视图：状态、配对码、就绪后的会话身份
    pub fn info(&self) -> SessionInfo {
        let state = self.state();
        SessionInfo {
            state,
            ready: state == SessionState::Ready,
            pairing_code: self.pairing_code.lock().clone(),
            identity: self.identity.lock().clone(),
        }
    }

    /// 订阅状态变更（测试与监控用）
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// 发起会话
    ///
    /// 已在进行中的会话不会被重复发起（幂等，直接返回）。
    /// 返回时会话处于 AwaitingPairing；配对完成由事件异步推进。
    pub async fn start(&self) -> Result<()> {
        let current = self.state();
        if matches!(
            current,
            SessionState::AwaitingPairing | SessionState::Authenticated | SessionState::Ready
        ) {
            info!(state = %current, "会话已在进行中，忽略重复发起");
            return Ok(());
        }

        let (tx, mut rx) = mpsc::channel::<TransportEvent>(16);
        self.pairing_code.lock().take();
        self.identity.lock().take();
        self.state_tx.send_replace(SessionState::AwaitingPairing);

        self.transport.start(tx).await.inspect_err(|_| {
            self.state_tx.send_replace(SessionState::Disconnected);
        })?;

        let state_tx = self.state_tx.clone();
        let pairing_code = self.pairing_code.clone();
        let identity = self.identity.clone();
        let task = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match event {
                    TransportEvent::PairingCode(code) => {
                        info!("收到新的配对码");
                        *pairing_code.lock() = Some(code);
                        state_tx.send_replace(SessionState::AwaitingPairing);
                    }
                    TransportEvent::Authenticated => {
                        info!("会话配对完成");
                        pairing_code.lock().take();
                        state_tx.send_replace(SessionState::Authenticated);
                    }
                    TransportEvent::Ready { identity: id } => {
                        info!(
                            display_name = %id.display_name,
                            endpoint = %id.endpoint,
                            "聊天会话就绪，可以发送"
                        );
                        *identity.lock() = Some(id);
                        state_tx.send_replace(SessionState::Ready);
                    }
                    TransportEvent::Disconnected { reason } => {
                        warn!(
                            reason = reason.as_deref().unwrap_or("未知"),
                            "聊天会话断开，不做自动重连"
                        );
                        pairing_code.lock().take();
                        identity.lock().take();
                        state_tx.send_replace(SessionState::Disconnected);
                    }
                }
            }
        });
        *self.event_task.lock() = Some(task);

        Ok(())
    }

    /// 关闭会话，回到 Uninitialized
    pub async fn stop(&self) -> Result<()> {
        self.transport.stop().await?;
        if let Some(task) = self.event_task.lock().take() {
            task.abort();
        }
        self.pairing_code.lock().take();
        self.identity.lock().take();
        self.state_tx.send_replace(SessionState::Uninitialized);
        info!("聊天会话已关闭");
        Ok(())
    }

    /// 原始电话号码 -> 渠道句柄
    ///
    /// 剥离全部非数字字符；恰为 10 位时补默认国家码；拼接渠道后缀。
    /// 11 位及以上视为已含国家码，原样使用。
    pub fn normalize_handle(&self, raw: &str) -> Result<String> {
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return Err(DeliveryError::RecipientUnreachable {
                handle: raw.to_string(),
            });
        }

        let full = if digits.len() == 10 {
            format!("{}{digits}", self.config.default_country_code)
        } else {
            digits
        };
        Ok(format!("{full}{}", self.config.handle_suffix))
    }

    /// 投递一张证书到参与者的聊天句柄
    ///
    /// 先发文本消息，再发证书文档；两条消息之间与相邻投递之间
    /// 保持最小间隔。本方法不返回 Err，失败折叠为 `ChannelOutcome`。
    pub async fn send_certificate(
        &self,
        artifact: &CertificateArtifact,
        text: &str,
    ) -> ChannelOutcome {
        match self.try_send_certificate(artifact, text).await {
            Ok(message_id) => {
                info!(
                    certificate_id = %artifact.certificate_id,
                    participant = %artifact.participant.name,
                    message_id = %message_id,
                    "证书聊天消息发送成功"
                );
                ChannelOutcome::ok(DeliveryChannel::Chat, message_id)
            }
            Err(e) => {
                warn!(
                    certificate_id = %artifact.certificate_id,
                    participant = %artifact.participant.name,
                    error = %e,
                    "证书聊天消息发送失败"
                );
                ChannelOutcome::failed(DeliveryChannel::Chat, &e)
            }
        }
    }

    async fn try_send_certificate(
        &self,
        artifact: &CertificateArtifact,
        text: &str,
    ) -> Result<String> {
        // 未就绪快速失败，不触碰传输层
        if !self.is_ready() {
            return Err(DeliveryError::NotReady {
                state: self.state().to_string(),
            });
        }

        let phone = artifact
            .participant
            .phone
            .as_deref()
            .ok_or_else(|| DeliveryError::MissingAddress {
                channel: "chat".to_string(),
            })?;
        let handle = self.normalize_handle(phone)?;

        if !self
            .with_timeout(self.transport.is_registered(&handle))
            .await?
        {
            return Err(DeliveryError::RecipientUnreachable { handle });
        }

        let bytes = self.content.get(&artifact.locator).await?;
        let file_name = artifact
            .locator
            .as_str()
            .rsplit('/')
            .next()
            .unwrap_or("certificate")
            .to_string();
        let caption = format!("Certificate - {}", artifact.data.event_title);

        // 整个两段发送持锁完成，跨参与者也保证串行与间隔
        let mut gate = self.send_gate.lock().await;

        self.wait_for_gap(*gate).await;
        self.with_timeout(self.transport.send_text(&handle, text))
            .await?;
        *gate = Some(Instant::now());

        self.wait_for_gap(*gate).await;
        let message_id = self
            .with_timeout(
                self.transport
                    .send_document(&handle, &file_name, bytes, &caption),
            )
            .await?;
        *gate = Some(Instant::now());

        Ok(message_id)
    }

    /// 向指定号码发送测试消息，验证会话可用性
    pub async fn send_test_message(&self, raw_phone: &str, text: &str) -> ChannelOutcome {
        let result = async {
            if !self.is_ready() {
                return Err(DeliveryError::NotReady {
                    state: self.state().to_string(),
                });
            }
            let handle = self.normalize_handle(raw_phone)?;
            if !self
                .with_timeout(self.transport.is_registered(&handle))
                .await?
            {
                return Err(DeliveryError::RecipientUnreachable { handle });
            }

            let mut gate = self.send_gate.lock().await;
            self.wait_for_gap(*gate).await;
            let message_id = self.with_timeout(self.transport.send_text(&handle, text)).await?;
            *gate = Some(Instant::now());
            Ok(message_id)
        }
        .await;

        match result {
            Ok(message_id) => ChannelOutcome::ok(DeliveryChannel::Chat, message_id),
            Err(e) => ChannelOutcome::failed(DeliveryChannel::Chat, &e),
        }
    }

    async fn wait_for_gap(&self, last_send: Option<Instant>) {
        if let Some(last) = last_send {
            let gap = self.config.min_message_gap();
            let elapsed = last.elapsed();
            if elapsed < gap {
                tokio::time::sleep(gap - elapsed).await;
            }
        }
    }

    async fn with_timeout<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::time::timeout(self.config.timeout(), fut)
            .await
            .map_err(|_| DeliveryError::Timeout {
                channel: "chat".to_string(),
            })?
    }
}

// ---------------------------------------------------------------------------
// SimulatedChatTransport — 模拟传输
// ---------------------------------------------------------------------------

/// 模拟聊天传输
///
/// 当前版本为模拟发送（仅记录日志），配对流程自动完成，便于在无
/// 外部网关的情况下验证会话状态机与投递管道的完整性。接入真实的
/// 个人账号网关 SDK 时只需实现同一 trait。
pub struct SimulatedChatTransport;

#[async_trait]
impl ChatTransport for SimulatedChatTransport {
    async fn start(&self, events: mpsc::Sender<TransportEvent>) -> Result<()> {
        tokio::spawn(async move {
            let _ = events
                .send(TransportEvent::PairingCode(format!(
                    "SIMULATED-PAIRING-{}",
                    chrono::Utc::now().timestamp_millis()
                )))
                .await;
            // 模拟操作员完成扫码
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            let _ = events.send(TransportEvent::Authenticated).await;
            let _ = events
                .send(TransportEvent::Ready {
                    identity: SessionIdentity {
                        display_name: "Simulated Account".to_string(),
                        endpoint: "10000000000@c.us".to_string(),
                    },
                })
                .await;
        });
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        Ok(())
    }

    async fn is_registered(&self, _handle: &str) -> Result<bool> {
        Ok(true)
    }

    async fn send_text(&self, handle: &str, text: &str) -> Result<String> {
        info!(channel = "CHAT", handle, text, "模拟发送聊天文本消息");
        Ok(format!("sim-text-{}", chrono::Utc::now().timestamp_millis()))
    }

    async fn send_document(
        &self,
        handle: &str,
        file_name: &str,
        bytes: Vec<u8>,
        caption: &str,
    ) -> Result<String> {
        info!(
            channel = "CHAT",
            handle,
            file_name,
            size = bytes.len(),
            caption,
            "模拟发送聊天文档消息"
        );
        Ok(format!("sim-doc-{}", chrono::Utc::now().timestamp_millis()))
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
    use std::sync::atomic::{AtomicU32, Ordering};

    /// 脚本化传输替身：start 时按脚本回放事件，发送调用计数
    struct ScriptedTransport {
        script: Vec<TransportEvent>,
        registered: bool,
        text_sends: AtomicU32,
        document_sends: AtomicU32,
    }

    impl ScriptedTransport {
        fn new(script: Vec<TransportEvent>) -> Self {
            Self {
                script,
                registered: true,
                text_sends: AtomicU32::new(0),
                document_sends: AtomicU32::new(0),
            }
        }

        fn unregistered(mut self) -> Self {
            self.registered = false;
            self
        }
    }

    #[async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn start(&self, events: mpsc::Sender<TransportEvent>) -> Result<()> {
            for event in self.script.clone() {
                let _ = events.send(event).await;
            }
            Ok(())
        }

        async fn stop(&self) -> Result<()> {
            Ok(())
        }

        async fn is_registered(&self, _handle: &str) -> Result<bool> {
            Ok(self.registered)
        }

        async fn send_text(&self, _handle: &str, _text: &str) -> Result<String> {
            self.text_sends.fetch_add(1, Ordering::SeqCst);
            Ok("text-msg-1".to_string())
        }

        async fn send_document(
            &self,
            _handle: &str,
            _file_name: &str,
            _bytes: Vec<u8>,
            _caption: &str,
        ) -> Result<String> {
            self.document_sends.fetch_add(1, Ordering::SeqCst);
            Ok("doc-msg-1".to_string())
        }
    }

    fn ready_event() -> TransportEvent {
        TransportEvent::Ready {
            identity: SessionIdentity {
                display_name: "Cert Bot".to_string(),
                endpoint: "15550009999@c.us".to_string(),
            },
        }
    }

    fn make_artifact(phone: Option<&str>) -> CertificateArtifact {
        CertificateArtifact {
            certificate_id: CertificateId("CERT-C-0000000001".to_string()),
            event_id: "evt-1".to_string(),
            participant: ParticipantSnapshot {
                name: "张三".to_string(),
                email: None,
                phone: phone.map(String::from),
            },
            data: CertificateData {
                participant_name: "张三".to_string(),
                event_title: "Rust 工作坊".to_string(),
                event_date: Utc::now(),
                organizer_name: "组委会".to_string(),
                location: "上海".to_string(),
                certificate_number: "CERT-C-0000000001".to_string(),
            },
            verification_url: "http://localhost:3000/verify/CERT-C-0000000001".to_string(),
            locator: ArtifactLocator("mem://certificate_CERT-C-0000000001.json".to_string()),
            template: TemplateKind::Classic,
            generated_at: Utc::now(),
            file_size: 32,
            delivery: DeliveryRecord::generated(),
        }
    }

    async fn content_with_artifact() -> Arc<MemoryContentStore> {
        let store = Arc::new(MemoryContentStore::new());
        store
            .put("certificate_CERT-C-0000000001.json", b"bytes")
            .await
            .unwrap();
        store
    }

    fn fast_config() -> ChatConfig {
        ChatConfig {
            min_message_gap_ms: 10,
            ..ChatConfig::default()
        }
    }

    async fn wait_for_state(session: &ChatSession, target: SessionState) {
        let mut rx = session.subscribe();
        tokio::time::timeout(std::time::Duration::from_secs(1), async {
            while *rx.borrow() != target {
                rx.changed().await.unwrap();
            }
        })
        .await
        .expect("状态未在限期内到达");
    }

    #[tokio::test]
    async fn test_lifecycle_pairing_to_ready() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            TransportEvent::PairingCode("QR-PAYLOAD".to_string()),
            TransportEvent::Authenticated,
            ready_event(),
        ]));
        let session = ChatSession::new(
            transport,
            Arc::new(MemoryContentStore::new()),
            fast_config(),
        );

        assert_eq!(session.state(), SessionState::Uninitialized);
        session.start().await.unwrap();
        wait_for_state(&session, SessionState::Ready).await;

        // 配对完成后配对码被清空，身份可见
        let info = session.info();
        assert!(info.pairing_code.is_none());
        assert!(info.ready);
        assert_eq!(
            info.identity.map(|id| id.display_name).as_deref(),
            Some("Cert Bot")
        );
    }

    #[tokio::test]
    async fn test_pairing_code_visible_while_awaiting() {
        let transport = Arc::new(ScriptedTransport::new(vec![TransportEvent::PairingCode(
            "QR-PAYLOAD".to_string(),
        )]));
        let session = ChatSession::new(
            transport,
            Arc::new(MemoryContentStore::new()),
            fast_config(),
        );

        session.start().await.unwrap();
        // 等事件循环消费配对码
        tokio::time::timeout(std::time::Duration::from_secs(1), async {
            while session.info().pairing_code.is_none() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        let info = session.info();
        assert_eq!(info.state, SessionState::AwaitingPairing);
        assert_eq!(info.pairing_code.as_deref(), Some("QR-PAYLOAD"));
    }

    #[tokio::test]
    async fn test_disconnect_event_blocks_sending() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            ready_event(),
            TransportEvent::Disconnected {
                reason: Some("网络中断".to_string()),
            },
        ]));
        let session = ChatSession::new(transport.clone(), content_with_artifact().await, fast_config());

        session.start().await.unwrap();
        wait_for_state(&session, SessionState::Disconnected).await;

        let outcome = session
            .send_certificate(&make_artifact(Some("555-010-0001")), "hi")
            .await;
        assert!(!outcome.success);
        assert!(outcome.error.as_deref().unwrap().contains("disconnected"));
        // 快速失败：传输层零调用
        assert_eq!(transport.text_sends.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_not_ready_fails_fast_without_transport_calls() {
        let transport = Arc::new(ScriptedTransport::new(vec![]));
        let session = ChatSession::new(transport.clone(), content_with_artifact().await, fast_config());

        // 从未 start
        let outcome = session
            .send_certificate(&make_artifact(Some("5550100001")), "hi")
            .await;
        assert!(!outcome.success);
        assert_eq!(transport.text_sends.load(Ordering::SeqCst), 0);
        assert_eq!(transport.document_sends.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_send_certificate_text_then_document() {
        let transport = Arc::new(ScriptedTransport::new(vec![ready_event()]));
        let session = ChatSession::new(transport.clone(), content_with_artifact().await, fast_config());
        session.start().await.unwrap();
        wait_for_state(&session, SessionState::Ready).await;

        let outcome = session
            .send_certificate(&make_artifact(Some("(555) 010-0001")), "恭喜！")
            .await;
        assert!(outcome.success, "发送失败: {:?}", outcome.error);
        // 消息标识来自文档消息
        assert_eq!(outcome.message_id.as_deref(), Some("doc-msg-1"));
        assert_eq!(transport.text_sends.load(Ordering::SeqCst), 1);
        assert_eq!(transport.document_sends.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unregistered_recipient_is_unreachable() {
        let transport =
            Arc::new(ScriptedTransport::new(vec![ready_event()]).unregistered());
        let session = ChatSession::new(transport.clone(), content_with_artifact().await, fast_config());
        session.start().await.unwrap();
        wait_for_state(&session, SessionState::Ready).await;

        let outcome = session
            .send_certificate(&make_artifact(Some("5550100001")), "hi")
            .await;
        assert!(!outcome.success);
        assert!(outcome.error.as_deref().unwrap().contains("不可达"));
        // 注册检查失败后不再发送任何消息
        assert_eq!(transport.text_sends.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_phone_is_channel_failure() {
        let transport = Arc::new(ScriptedTransport::new(vec![ready_event()]));
        let session = ChatSession::new(transport, content_with_artifact().await, fast_config());
        session.start().await.unwrap();
        wait_for_state(&session, SessionState::Ready).await;

        let outcome = session.send_certificate(&make_artifact(None), "hi").await;
        assert!(!outcome.success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_minimum_gap_between_messages() {
        let transport = Arc::new(ScriptedTransport::new(vec![ready_event()]));
        let session = ChatSession::new(
            transport.clone(),
            content_with_artifact().await,
            ChatConfig::default(), // 2 秒间隔
        );
        session.start().await.unwrap();
        wait_for_state(&session, SessionState::Ready).await;

        let begin = Instant::now();
        let outcome = session
            .send_certificate(&make_artifact(Some("5550100001")), "hi")
            .await;
        assert!(outcome.success);
        // 文本与文档之间至少等待一个最小间隔（虚拟时钟下确定性成立）
        assert!(begin.elapsed() >= std::time::Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_stop_returns_to_uninitialized() {
        let transport = Arc::new(ScriptedTransport::new(vec![ready_event()]));
        let session = ChatSession::new(
            transport,
            Arc::new(MemoryContentStore::new()),
            fast_config(),
        );
        session.start().await.unwrap();
        wait_for_state(&session, SessionState::Ready).await;

        session.stop().await.unwrap();
        assert_eq!(session.state(), SessionState::Uninitialized);
        let info = session.info();
        assert!(info.pairing_code.is_none());
        assert!(info.identity.is_none());
    }

    #[test]
    fn test_normalize_handle() {
        let session = ChatSession::new(
            Arc::new(ScriptedTransport::new(vec![])),
            Arc::new(MemoryContentStore::new()),
            ChatConfig::default(),
        );

        // 10 位补国家码
        assert_eq!(
            session.normalize_handle("5550100001").unwrap(),
            "15550100001@c.us"
        );
        // 格式字符被剥离
        assert_eq!(
            session.normalize_handle("(555) 010-0001").unwrap(),
            "15550100001@c.us"
        );
        // 已含国家码则原样使用
        assert_eq!(
            session.normalize_handle("+86 138 0013 8000").unwrap(),
            "8613800138000@c.us"
        );
        // 纯非数字不可达
        assert!(session.normalize_handle("not-a-number").is_err());
    }
}
