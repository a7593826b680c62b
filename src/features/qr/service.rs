use std::sync::Arc;

use super::encoder;
use super::key::object_key;
use crate::error::AppError;
use crate::features::storage::BlobStore;

/// 上传对象的 Content-Type
pub const PNG_CONTENT_TYPE: &str = "image/png";

/// 一次生成的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedQr {
    /// 写入的对象键
    pub key: String,
    /// 对象的公开访问地址
    pub qr_code_url: String,
}

/// 二维码生成并上传：编码 → 推导键 → 覆盖写入 → 拼接公开 URL。
///
/// 无重试、无加锁；同键并发写入以最后完成者为准。
#[derive(Clone)]
pub struct QrUploadService {
    store: Arc<dyn BlobStore>,
    account: String,
    container: String,
}

impl QrUploadService {
    pub fn new(
        store: Arc<dyn BlobStore>,
        account: impl Into<String>,
        container: impl Into<String>,
    ) -> Self {
        Self {
            store,
            account: account.into(),
            container: container.into(),
        }
    }

    /// 公开访问地址。不校验容器是否真的开放了匿名读。
    pub fn public_url(&self, key: &str) -> String {
        format!(
            "https://{}.blob.core.windows.net/{}/{}",
            self.account, self.container, key
        )
    }

    pub async fn generate(&self, url: &str) -> Result<GeneratedQr, AppError> {
        let png = encoder::encode_png(url)?;
        let key = object_key(url);

        self.store
            .put_blob(&key, png, PNG_CONTENT_TYPE)
            .await
            .map_err(|e| {
                tracing::error!("上传到 Azure Blob Storage 失败: key={} err={}", key, e);
                AppError::Upload(e.to_string())
            })?;

        let qr_code_url = self.public_url(&key);
        tracing::info!("二维码已上传: {}", qr_code_url);
        Ok(GeneratedQr { key, qr_code_url })
    }
}
