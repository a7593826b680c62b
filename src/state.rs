use std::sync::Arc;

use crate::config::AzureConfig;
use crate::features::qr::QrUploadService;
use crate::features::storage::{AzureBlobStore, BlobStore, StorageError};

/// 聚合的应用共享状态（显式注入，不使用模块级全局量）
#[derive(Clone)]
pub struct AppState {
    pub qr_service: Arc<QrUploadService>,
}

impl AppState {
    /// 以任意存储后端构建（测试可注入内存实现）
    pub fn new(store: Arc<dyn BlobStore>, account: &str, container: &str) -> Self {
        Self {
            qr_service: Arc::new(QrUploadService::new(store, account, container)),
        }
    }

    /// 启动时根据配置创建 Azure 客户端，进程内只创建一次
    pub fn from_azure_config(azure: &AzureConfig) -> Result<Self, StorageError> {
        let store = AzureBlobStore::from_connection_string(
            &azure.connection_string,
            azure.container_name.as_str(),
        )?;
        Ok(Self::new(
            Arc::new(store),
            &azure.account,
            &azure.container_name,
        ))
    }
}
