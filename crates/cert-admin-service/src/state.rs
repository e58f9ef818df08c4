//! 应用状态定义
//!
//! 包含 Axum 路由共享的应用状态

use std::sync::Arc;

use cert_shared::config::AppConfig;
use cert_shared::status::StatusTracker;
use cert_shared::store::CertificateStore;
use certificate_engine::batch::BatchGenerator;
use delivery_worker::chat::ChatSession;
use delivery_worker::email::EmailAdapter;
use delivery_worker::orchestrator::DeliveryOrchestrator;

/// Axum 应用共享状态
///
/// 生成引擎、投递编排器与聊天会话均为全进程单例，通过 Arc 共享。
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub tracker: Arc<StatusTracker>,
    pub store: Arc<dyn CertificateStore>,
    pub generator: Arc<BatchGenerator>,
    pub orchestrator: Arc<DeliveryOrchestrator>,
    pub chat: Arc<ChatSession>,
    pub email: Arc<EmailAdapter>,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<AppConfig>,
        tracker: Arc<StatusTracker>,
        store: Arc<dyn CertificateStore>,
        generator: Arc<BatchGenerator>,
        orchestrator: Arc<DeliveryOrchestrator>,
        chat: Arc<ChatSession>,
        email: Arc<EmailAdapter>,
    ) -> Self {
        Self {
            config,
            tracker,
            store,
            generator,
            orchestrator,
            chat,
            email,
        }
    }
}
