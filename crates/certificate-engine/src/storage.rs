//! 制品内容存储
//!
//! 通过 `ContentStore` trait 抽象证书制品字节的落盘位置（本地文件系统、
//! 对象存储等）。定位符空间按证书编号划分、一写不改，并发写入不会冲突。

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use cert_shared::model::ArtifactLocator;

use crate::error::{EngineError, Result};

/// 内容存储接口
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// 写入制品字节，返回稳定定位符
    ///
    /// 同名写入（同一证书编号重复渲染）是调用方缺陷，返回错误。
    async fn put(&self, file_name: &str, bytes: &[u8]) -> Result<ArtifactLocator>;

    /// 按定位符读回制品字节（渠道适配器发送附件时使用）
    async fn get(&self, locator: &ArtifactLocator) -> Result<Vec<u8>>;
}

// ---------------------------------------------------------------------------
// FsContentStore — 文件系统实现
// ---------------------------------------------------------------------------

/// 文件系统内容存储
///
/// 制品写入 `{base_dir}/{file_name}`；首次写入时自动创建目录。
pub struct FsContentStore {
    base_dir: PathBuf,
}

impl FsContentStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn path_for(&self, file_name: &str) -> PathBuf {
        self.base_dir.join(file_name)
    }
}

#[async_trait]
impl ContentStore for FsContentStore {
    async fn put(&self, file_name: &str, bytes: &[u8]) -> Result<ArtifactLocator> {
        tokio::fs::create_dir_all(&self.base_dir)
            .await
            .map_err(|e| EngineError::Storage {
                path: self.base_dir.display().to_string(),
                reason: e.to_string(),
            })?;

        let path = self.path_for(file_name);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(EngineError::Storage {
                path: path.display().to_string(),
                reason: "定位符已存在（制品一写不改）".to_string(),
            });
        }

        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| EngineError::Storage {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        debug!(path = %path.display(), size = bytes.len(), "制品已落盘");
        Ok(ArtifactLocator(path.display().to_string()))
    }

    async fn get(&self, locator: &ArtifactLocator) -> Result<Vec<u8>> {
        tokio::fs::read(Path::new(locator.as_str()))
            .await
            .map_err(|e| EngineError::Storage {
                path: locator.to_string(),
                reason: e.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// MemoryContentStore — 内存实现（测试与单进程演示）
// ---------------------------------------------------------------------------

/// 内存内容存储
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn put(&self, file_name: &str, bytes: &[u8]) -> Result<ArtifactLocator> {
        let mut blobs = self.blobs.write().await;
        if blobs.contains_key(file_name) {
            return Err(EngineError::Storage {
                path: file_name.to_string(),
                reason: "定位符已存在（制品一写不改）".to_string(),
            });
        }
        blobs.insert(file_name.to_string(), bytes.to_vec());
        Ok(ArtifactLocator(format!("mem://{file_name}")))
    }

    async fn get(&self, locator: &ArtifactLocator) -> Result<Vec<u8>> {
        let key = locator
            .as_str()
            .strip_prefix("mem://")
            .unwrap_or(locator.as_str());
        self.blobs
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| EngineError::Storage {
                path: locator.to_string(),
                reason: "制品不存在".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_put_get() {
        let store = MemoryContentStore::new();
        let locator = store.put("certificate_A.json", b"hello").await.unwrap();
        assert_eq!(locator.as_str(), "mem://certificate_A.json");

        let bytes = store.get(&locator).await.unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[tokio::test]
    async fn test_memory_store_write_once() {
        let store = MemoryContentStore::new();
        store.put("certificate_B.json", b"first").await.unwrap();
        let second = store.put("certificate_B.json", b"second").await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn test_fs_store_roundtrip() {
        let base = std::env::temp_dir().join(format!(
            "cert-store-test-{}-{}",
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0)
        ));
        let store = FsContentStore::new(&base);

        let locator = store.put("certificate_C.json", b"bytes").await.unwrap();
        let bytes = store.get(&locator).await.unwrap();
        assert_eq!(bytes, b"bytes");

        // 一写不改
        assert!(store.put("certificate_C.json", b"again").await.is_err());

        let _ = tokio::fs::remove_dir_all(&base).await;
    }

    #[tokio::test]
    async fn test_fs_store_missing_read() {
        let store = FsContentStore::new(std::env::temp_dir());
        let result = store
            .get(&ArtifactLocator("/nonexistent/certificate_X.json".into()))
            .await;
        assert!(matches!(result, Err(EngineError::Storage { .. })));
    }
}
