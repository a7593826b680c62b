use std::collections::HashMap;
use std::sync::RwLock;

use axum::body::Bytes;
use futures_util::future::BoxFuture;

use super::{BlobStore, StorageError};

/// 已写入的对象
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub body: Bytes,
    pub content_type: String,
}

/// 进程内 Blob 存储，用于本地调试与测试。
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<String, StoredBlob>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<StoredBlob> {
        self.objects
            .read()
            .ok()
            .and_then(|guard| guard.get(key).cloned())
    }

    pub fn len(&self) -> usize {
        self.objects.read().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .read()
            .map(|guard| guard.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

impl BlobStore for MemoryBlobStore {
    fn put_blob<'a>(
        &'a self,
        key: &'a str,
        body: Bytes,
        content_type: &'a str,
    ) -> BoxFuture<'a, Result<(), StorageError>> {
        Box::pin(async move {
            let mut guard = self
                .objects
                .write()
                .map_err(|_| StorageError::Backend("memory store poisoned".to_string()))?;
            guard.insert(
                key.to_string(),
                StoredBlob {
                    body,
                    content_type: content_type.to_string(),
                },
            );
            Ok(())
        })
    }
}
