//! 共享库
//!
//! 包含证书生成与投递管道各服务共用的配置、错误处理、领域模型、
//! 状态跟踪、持久化接口与可观测性等基础设施代码。

pub mod config;
pub mod error;
pub mod model;
pub mod observability;
pub mod retry;
pub mod status;
pub mod store;
