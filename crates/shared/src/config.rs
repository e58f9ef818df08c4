//! 配置管理模块
//!
//! 支持多格式配置文件加载，环境变量覆盖，以及类型安全的配置访问。

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// 服务配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// 制品存储配置
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// 证书制品落盘目录
    pub artifact_dir: String,
    /// 验证端点基础地址，证书中嵌入的验证 URL 以此为前缀
    pub verify_base_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            artifact_dir: "uploads/certificates".to_string(),
            verify_base_url: "http://localhost:3000".to_string(),
        }
    }
}

/// 邮件渠道配置
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// 邮件 API 端点（HTTP JSON 投递接口）
    pub api_endpoint: String,
    pub from_name: String,
    pub from_address: String,
    /// 单次发送的传输超时（秒）
    pub timeout_seconds: u64,
    /// 邮件渠道批次大小，速率限制宽松故批次较大
    pub batch_size: usize,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            api_endpoint: "http://localhost:8025/api/send".to_string(),
            from_name: "Certificate System".to_string(),
            from_address: "noreply@certs.local".to_string(),
            timeout_seconds: 30,
            batch_size: 10,
        }
    }
}

/// 聊天渠道配置
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// 清洗后号码恰为 10 位时补全的默认国家码
    pub default_country_code: String,
    /// 渠道寻址后缀，拼接在规范化号码之后
    pub handle_suffix: String,
    /// 单次传输调用超时（秒）；配对等待由用户驱动，不受此超时约束
    pub timeout_seconds: u64,
    /// 同一会话内相邻两条消息的最小间隔（毫秒），防止外部网络封禁
    pub min_message_gap_ms: u64,
    /// 聊天渠道批次大小，速率限制敏感故批次较小
    pub batch_size: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_country_code: "1".to_string(),
            handle_suffix: "@c.us".to_string(),
            timeout_seconds: 30,
            min_message_gap_ms: 2000,
            batch_size: 5,
        }
    }
}

/// 投递编排配置
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    /// 批次之间的停顿（毫秒），用于尊重外部渠道的速率限制
    pub inter_batch_delay_ms: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            inter_batch_delay_ms: 3000,
        }
    }
}

/// 可观测性配置
#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
    /// 日志输出格式：json（结构化）或 pretty（人类可读）
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub email: EmailConfig,
    pub chat: ChatConfig,
    pub delivery: DeliveryConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. config/default.toml（默认配置）
    /// 2. config/{environment}.toml（环境特定配置）
    /// 3. 环境变量（CERT_ 前缀，如 CERT_EMAIL_API_ENDPOINT -> email.api_endpoint）
    pub fn load(service_name: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("CERT_ENV").unwrap_or_else(|_| "development".to_string());
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

        let builder = Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", env.clone())?
            .add_source(File::from(Path::new(&config_dir).join("default.toml")).required(false))
            .add_source(
                File::from(Path::new(&config_dir).join(format!("{}.toml", env))).required(false),
            )
            .add_source(
                Environment::with_prefix("CERT")
                    .separator("_")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// 获取服务地址
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl EmailConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl ChatConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn min_message_gap(&self) -> Duration {
        Duration::from_millis(self.min_message_gap_ms)
    }
}

impl DeliveryConfig {
    pub fn inter_batch_delay(&self) -> Duration {
        Duration::from_millis(self.inter_batch_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.email.batch_size, 10);
        assert_eq!(config.chat.batch_size, 5);
    }

    #[test]
    fn test_server_addr() {
        let config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            ..Default::default()
        };
        assert_eq!(config.server_addr(), "127.0.0.1:3000");
    }

    #[test]
    fn test_duration_accessors() {
        let config = AppConfig::default();
        assert_eq!(config.chat.min_message_gap(), Duration::from_millis(2000));
        assert_eq!(
            config.delivery.inter_batch_delay(),
            Duration::from_millis(3000)
        );
        assert_eq!(config.email.timeout(), Duration::from_secs(30));
    }
}
