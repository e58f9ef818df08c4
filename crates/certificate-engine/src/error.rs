//! 生成引擎错误类型
//!
//! 区分渲染、编码与存储三类失败场景；全部是参与者级别的错误，
//! 批量生成时被捕获进该参与者的结果条目，不会中断同批其他渲染。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("证书渲染失败: {0}")]
    RenderFailed(String),

    #[error("制品编码失败: {0}")]
    Encoding(String),

    #[error("内容存储写入失败: {path} - {reason}")]
    Storage { path: String, reason: String },

    #[error(transparent)]
    Shared(#[from] cert_shared::error::CertError),
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::RenderFailed(_) => "RENDER_FAILED",
            Self::Encoding(_) => "ENCODING_FAILED",
            Self::Storage { .. } => "STORAGE_ERROR",
            Self::Shared(e) => e.code(),
        }
    }
}
