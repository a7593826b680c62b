//! Blob 存储抽象
//!
//! 请求处理只依赖 [`BlobStore`]，生产环境注入 Azure 实现，测试注入内存实现。

pub mod azure;
pub mod memory;

use axum::body::Bytes;
use futures_util::future::BoxFuture;
use thiserror::Error;

pub use azure::{AzureBlobStore, ConnectionString, ConnectionStringError};
pub use memory::{MemoryBlobStore, StoredBlob};

/// 存储层错误
#[derive(Error, Debug)]
pub enum StorageError {
    /// 请求未能送达（DNS/连接/超时等）
    #[error("Azure {context} request failed: {message}")]
    Request {
        context: &'static str,
        message: String,
    },

    /// 服务端返回非 2xx
    #[error("Azure {context}: HTTP {status} - {body}")]
    Status {
        context: &'static str,
        status: u16,
        body: String,
    },

    /// 凭据或签名问题
    #[error("Azure credentials error: {0}")]
    Credentials(String),

    /// 连接字符串无法解析
    #[error(transparent)]
    ConnectionString(#[from] ConnectionStringError),

    /// 对象键无法映射为容器内的请求路径（如 `..` 越出容器）
    #[error("invalid blob path: {0}")]
    InvalidPath(String),

    /// 其他后端故障
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// 可替换的 Blob 存储后端。
///
/// `put_blob` 语义为覆盖写：同键重复写入时后写者生效，不加锁。
pub trait BlobStore: Send + Sync {
    fn put_blob<'a>(
        &'a self,
        key: &'a str,
        body: Bytes,
        content_type: &'a str,
    ) -> BoxFuture<'a, Result<(), StorageError>>;
}
