//! 可观测性模块
//!
//! 提供结构化日志的统一初始化。所有服务通过单一入口点配置日志，
//! 确保一致的级别过滤与输出格式。

use anyhow::Result;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::config::ObservabilityConfig;

/// 可观测性资源守卫
///
/// 预留日志/追踪资源的生命周期管理位置；当前仅承载订阅器的存续语义，
/// 持有它直到进程退出即可。
pub struct ObservabilityGuard {
    _private: (),
}

/// 初始化结构化日志
///
/// 级别优先取 RUST_LOG 环境变量，其次取配置中的 log_level。
/// log_format 为 "json" 时输出结构化 JSON 日志（便于采集），
/// 否则输出人类可读格式（本地开发）。
pub fn init(config: &ObservabilityConfig) -> Result<ObservabilityGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = if config.log_format == "json" {
        fmt::layer()
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true)
            .with_thread_ids(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(ObservabilityGuard { _private: () })
}
