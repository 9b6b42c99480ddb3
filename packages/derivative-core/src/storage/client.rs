use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, StatusCode};

use super::object_store::{ObjectMetadata, ObjectStore};
use crate::config::{AccessCredentials, StorageConfig};
use crate::constants::MAX_INPUT_SIZE;
use crate::errors::StorageError;

const STORAGE_CLASS_HEADER: &str = "x-amz-storage-class";

/// Storage Proxy クライアント
///
/// `<endpoint>/<bucket>/<key>` のパス形式で GET / PUT を送る。
/// Cloudflare Access のトークンが設定されていればヘッダに付与する。
#[derive(Clone)]
pub struct StorageProxyClient {
    client: Client,
    base_url: String,
    access: Option<AccessCredentials>,
}

impl StorageProxyClient {
    pub fn new(endpoint: &str, bucket: &str, access: Option<AccessCredentials>) -> Self {
        Self {
            client: Client::new(),
            base_url: format!(
                "{}/{}",
                endpoint.trim_end_matches('/'),
                bucket.trim_matches('/')
            ),
            access,
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.endpoint, &config.bucket, config.access.clone())
    }

    /// キーはセグメントごとに percent-encoding する（`/` は区切りとして残す）
    fn object_url(&self, key: &str) -> String {
        let encoded = key
            .split('/')
            .map(|segment| urlencoding::encode(segment))
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/{}", self.base_url, encoded)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access {
            Some(access) => request
                .header("CF-Access-Client-Id", &access.client_id)
                .header("CF-Access-Client-Secret", &access.client_secret),
            None => request,
        }
    }
}

/// 成功以外のステータスを StorageError に変換する
fn check_status(key: &str, status: StatusCode) -> Result<(), StorageError> {
    match status {
        status if status.is_success() => Ok(()),
        StatusCode::NOT_FOUND => Err(StorageError::NotFound {
            key: key.to_string(),
        }),
        StatusCode::FORBIDDEN => {
            tracing::error!(key = %key, "access denied by Storage Proxy");
            Err(StorageError::Forbidden)
        }
        status => {
            tracing::error!(key = %key, status = %status, "unexpected response from Storage Proxy");
            Err(StorageError::Internal(format!("unexpected status: {status}")))
        }
    }
}

#[async_trait]
impl ObjectStore for StorageProxyClient {
    async fn get(&self, key: &str) -> Result<Bytes, StorageError> {
        let response = self
            .authorize(self.client.get(self.object_url(key)))
            .send()
            .await
            .map_err(|e| StorageError::Internal(e.to_string()))?;

        check_status(key, response.status())?;

        // 読み込み前に Content-Length で確認
        if let Some(size) = response.content_length()
            && size > MAX_INPUT_SIZE
        {
            return Err(StorageError::TooLarge {
                size,
                max: MAX_INPUT_SIZE,
            });
        }

        let data = response
            .bytes()
            .await
            .map_err(|e| StorageError::Internal(e.to_string()))?;

        // 読み込み後にもサイズを確認
        let actual_size = data.len() as u64;
        if actual_size > MAX_INPUT_SIZE {
            return Err(StorageError::TooLarge {
                size: actual_size,
                max: MAX_INPUT_SIZE,
            });
        }

        Ok(data)
    }

    async fn put(
        &self,
        key: &str,
        body: Bytes,
        metadata: &ObjectMetadata,
    ) -> Result<(), StorageError> {
        let request = self
            .client
            .put(self.object_url(key))
            .header(CONTENT_TYPE, &metadata.content_type)
            .header(CACHE_CONTROL, &metadata.cache_control)
            .header(STORAGE_CLASS_HEADER, &metadata.storage_class)
            .body(body);

        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| StorageError::Internal(e.to_string()))?;

        check_status(key, response.status())
    }
}
