use async_trait::async_trait;
use bytes::Bytes;

use crate::errors::StorageError;

/// 保存時に付与するメタデータ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub content_type: String,
    pub cache_control: String,
    pub storage_class: String,
}

/// オリジナル画像の取得と派生画像の保存を行うオブジェクトストア
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// 存在しない場合は `StorageError::NotFound`
    async fn get(&self, key: &str) -> Result<Bytes, StorageError>;

    /// 同じキーへの書き込みは上書き（最後の書き込みが残る）
    async fn put(&self, key: &str, body: Bytes, metadata: &ObjectMetadata)
    -> Result<(), StorageError>;
}
