use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;

use super::object_store::{ObjectMetadata, ObjectStore};
use crate::errors::StorageError;

/// プロセス内のオブジェクトストア
///
/// テストとローカル実行用。`fail_gets` / `fail_puts` で障害を注入できる。
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, (Bytes, Option<ObjectMetadata>)>>,
    puts: AtomicUsize,
    fail_gets: bool,
    fail_puts: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// すべての get を `StorageError::Internal` で失敗させる
    pub fn fail_gets(mut self) -> Self {
        self.fail_gets = true;
        self
    }

    /// すべての put を `StorageError::Internal` で失敗させる
    pub fn fail_puts(mut self) -> Self {
        self.fail_puts = true;
        self
    }

    /// メタデータなしでオブジェクトを置く
    pub fn insert(&self, key: impl Into<String>, body: impl Into<Bytes>) {
        self.lock().insert(key.into(), (body.into(), None));
    }

    pub fn object(&self, key: &str) -> Option<Bytes> {
        self.lock().get(key).map(|(body, _)| body.clone())
    }

    pub fn metadata(&self, key: &str) -> Option<ObjectMetadata> {
        self.lock().get(key).and_then(|(_, meta)| meta.clone())
    }

    /// 成功した put の回数
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, (Bytes, Option<ObjectMetadata>)>> {
        // 保持中に panic したテストがあっても中身は壊れていない
        self.objects.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Bytes, StorageError> {
        if self.fail_gets {
            return Err(StorageError::Internal("injected get failure".to_string()));
        }

        self.object(key).ok_or_else(|| StorageError::NotFound {
            key: key.to_string(),
        })
    }

    async fn put(
        &self,
        key: &str,
        body: Bytes,
        metadata: &ObjectMetadata,
    ) -> Result<(), StorageError> {
        if self.fail_puts {
            return Err(StorageError::Internal("injected put failure".to_string()));
        }

        self.lock()
            .insert(key.to_string(), (body, Some(metadata.clone())));
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
