//! 取得 → 変換 → 保存 → 応答 のパイプライン
//!
//! 各ステップは直前の結果に依存するので厳密に逐次実行する。
//! 同じキーへの重複ミスはそれぞれ同じバイト列を同じキーに上書きするだけなので、
//! 合流（single-flight）は行わない。

use std::sync::Arc;

use bytes::Bytes;

use crate::constants::DERIVATIVE_CACHE_CONTROL;
use crate::errors::{ParseError, StorageError, TransformError};
use crate::key::{DerivativeRequest, KeyParser};
use crate::storage::{ObjectMetadata, ObjectStore};
use crate::transform::ImageTransform;

/// パイプライン 1 回分の結果
///
/// 失敗の原因は診断用のログにだけ使う。
#[derive(Debug)]
pub enum PipelineOutcome {
    Success { bytes: Bytes, content_type: String },
    ParseFailure(ParseError),
    SourceNotFound { key: String },
    TransformFailure(TransformError),
    StoreFailure(StorageError),
}

impl PipelineOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::ParseFailure(_) => "parse_failure",
            Self::SourceNotFound { .. } => "source_not_found",
            Self::TransformFailure(_) => "transform_failure",
            Self::StoreFailure(_) => "store_failure",
        }
    }
}

pub struct DerivativePipeline {
    store: Arc<dyn ObjectStore>,
    transformer: Arc<dyn ImageTransform>,
    parser: KeyParser,
    storage_class: String,
}

impl DerivativePipeline {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        transformer: Arc<dyn ImageTransform>,
        storage_class: impl Into<String>,
    ) -> Self {
        Self {
            store,
            transformer,
            parser: KeyParser::default(),
            storage_class: storage_class.into(),
        }
    }

    /// リクエストパスを解析してからパイプラインを実行する
    pub async fn run_path(&self, path: &str) -> PipelineOutcome {
        match self.parser.parse(path) {
            Ok((key, request)) => self.run(&request, key.as_str()).await,
            Err(err) => {
                tracing::warn!(path = %path, error = %err, "request path is not a derivative key");
                PipelineOutcome::ParseFailure(err)
            }
        }
    }

    /// 直接配信用: 保存済みの派生画像があればそれを返し、なければ生成する
    ///
    /// CDN のミス経由ではないので、同じパスへの再リクエストでも派生画像が既にあり得る。
    /// 派生画像の取得に失敗した場合は生成にフォールバックする。
    pub async fn serve_path(&self, path: &str) -> PipelineOutcome {
        let (key, request) = match self.parser.parse(path) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!(path = %path, error = %err, "request path is not a derivative key");
                return PipelineOutcome::ParseFailure(err);
            }
        };

        match self.store.get(key.as_str()).await {
            Ok(bytes) => {
                tracing::debug!(key = %key.as_str(), "derivative already stored");
                PipelineOutcome::Success {
                    bytes,
                    content_type: request.content_type(),
                }
            }
            Err(StorageError::NotFound { .. }) => self.run(&request, key.as_str()).await,
            Err(err) => {
                tracing::warn!(key = %key.as_str(), error = %err, "failed to look up derivative, regenerating");
                self.run(&request, key.as_str()).await
            }
        }
    }

    /// オリジナルを取得して変換し、`derivative_key` に書き戻す
    ///
    /// 書き戻しに失敗しても生成済みのバイト列で Success を返す。
    /// 保存はキャッシュのための副作用で、今回のレスポンスの前提ではない。
    pub async fn run(&self, request: &DerivativeRequest, derivative_key: &str) -> PipelineOutcome {
        tracing::info!(key = %request.original_key, "fetching original");
        let source = match self.store.get(&request.original_key).await {
            Ok(source) => source,
            Err(StorageError::NotFound { key }) => {
                tracing::warn!(key = %key, "original not found");
                return PipelineOutcome::SourceNotFound { key };
            }
            Err(err) => {
                tracing::error!(key = %request.original_key, error = %err, "failed to fetch original");
                return PipelineOutcome::StoreFailure(err);
            }
        };

        tracing::info!(
            key = %request.original_key,
            w = request.width,
            h = request.height,
            f = %request.format,
            "transforming image"
        );
        let transformed = match self.transform(source, request).await {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::error!(key = %request.original_key, error = %err, "image transform failed");
                return PipelineOutcome::TransformFailure(err);
            }
        };

        let content_type = request.content_type();
        let metadata = ObjectMetadata {
            content_type: content_type.clone(),
            cache_control: DERIVATIVE_CACHE_CONTROL.to_string(),
            storage_class: self.storage_class.clone(),
        };

        match self
            .store
            .put(derivative_key, transformed.clone(), &metadata)
            .await
        {
            Ok(()) => tracing::info!(key = %derivative_key, size = transformed.len(), "derivative stored"),
            Err(err) => tracing::warn!(
                key = %derivative_key,
                error = %err,
                "failed to store derivative, serving generated bytes anyway"
            ),
        }

        PipelineOutcome::Success {
            bytes: transformed,
            content_type,
        }
    }

    async fn transform(
        &self,
        source: Bytes,
        request: &DerivativeRequest,
    ) -> Result<Bytes, TransformError> {
        let transformer = Arc::clone(&self.transformer);
        let (width, height) = (request.width, request.height);
        let format = request.format.clone();

        tokio::task::spawn_blocking(move || transformer.transform(&source, width, height, &format))
            .await
            .map_err(|e| TransformError::ProcessingFailed(format!("transform task failed: {e}")))?
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::key::parse;
    use crate::storage::MemoryStore;
    use crate::transform::ImageCrateTransform;

    /// 入力とパラメータから決定的な出力を作る変換器
    pub(crate) struct FakeTransform;

    impl ImageTransform for FakeTransform {
        fn transform(
            &self,
            input: &[u8],
            width: u32,
            height: u32,
            format: &str,
        ) -> Result<Bytes, TransformError> {
            if input == b"corrupt" {
                return Err(TransformError::ProcessingFailed("decode failed".to_string()));
            }
            Ok(Bytes::from(format!(
                "{format}:{width}x{height}:{}",
                String::from_utf8_lossy(input)
            )))
        }
    }

    fn pipeline(store: Arc<MemoryStore>) -> DerivativePipeline {
        DerivativePipeline::new(store, Arc::new(FakeTransform), "STANDARD")
    }

    #[tokio::test]
    async fn test_prefixed_end_to_end() {
        let store = Arc::new(MemoryStore::new());
        store.insert("alexandria/user/photo.jpg", b"original".to_vec());

        let outcome = pipeline(store.clone())
            .run_path("/alexandria/user/200x200/webp/photo.jpg")
            .await;

        match outcome {
            PipelineOutcome::Success {
                bytes,
                content_type,
            } => {
                assert_eq!(bytes, Bytes::from_static(b"webp:200x200:original"));
                assert_eq!(content_type, "image/webp");
            }
            other => panic!("expected success, got {other:?}"),
        }

        let key = "alexandria/user/200x200/webp/photo.jpg";
        assert_eq!(
            store.object(key),
            Some(Bytes::from_static(b"webp:200x200:original"))
        );
        assert_eq!(
            store.metadata(key),
            Some(ObjectMetadata {
                content_type: "image/webp".to_string(),
                cache_control: "max-age=31536000".to_string(),
                storage_class: "STANDARD".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_unprefixed_end_to_end() {
        let store = Arc::new(MemoryStore::new());
        store.insert("photo.jpg", b"original".to_vec());

        let outcome = pipeline(store.clone()).run_path("/100x100/jpg/photo.jpg").await;

        match outcome {
            PipelineOutcome::Success { content_type, .. } => {
                assert_eq!(content_type, "image/jpeg")
            }
            other => panic!("expected success, got {other:?}"),
        }
        assert!(store.object("100x100/jpg/photo.jpg").is_some());
    }

    #[tokio::test]
    async fn test_parse_failure_does_not_touch_store() {
        let store = Arc::new(MemoryStore::new().fail_gets());
        let outcome = pipeline(store.clone()).run_path("/alexandria/user/image.jpg").await;

        assert!(matches!(outcome, PipelineOutcome::ParseFailure(_)));
        assert_eq!(store.put_count(), 0);
    }

    #[tokio::test]
    async fn test_source_not_found() {
        let store = Arc::new(MemoryStore::new());
        let request = parse("/user/100x100/png/missing.jpg").unwrap();

        let outcome = pipeline(store.clone())
            .run(&request, "user/100x100/png/missing.jpg")
            .await;

        match outcome {
            PipelineOutcome::SourceNotFound { key } => assert_eq!(key, "user/missing.jpg"),
            other => panic!("expected SourceNotFound, got {other:?}"),
        }
        assert_eq!(store.put_count(), 0);
    }

    #[tokio::test]
    async fn test_fetch_error_is_store_failure() {
        let store = Arc::new(MemoryStore::new().fail_gets());
        let outcome = pipeline(store).run_path("/user/100x100/png/a.jpg").await;
        assert!(matches!(outcome, PipelineOutcome::StoreFailure(_)));
    }

    #[tokio::test]
    async fn test_transform_failure_skips_store() {
        let store = Arc::new(MemoryStore::new());
        store.insert("user/a.jpg", b"corrupt".to_vec());

        let outcome = pipeline(store.clone()).run_path("/user/100x100/png/a.jpg").await;

        assert!(matches!(outcome, PipelineOutcome::TransformFailure(_)));
        assert_eq!(store.put_count(), 0);
    }

    #[tokio::test]
    async fn test_put_failure_still_succeeds() {
        let store = Arc::new(MemoryStore::new().fail_puts());
        store.insert("user/a.jpg", b"original".to_vec());

        let outcome = pipeline(store.clone()).run_path("/user/50x50/png/a.jpg").await;

        match outcome {
            PipelineOutcome::Success { bytes, .. } => {
                assert_eq!(bytes, Bytes::from_static(b"png:50x50:original"))
            }
            other => panic!("expected success, got {other:?}"),
        }
        assert!(store.object("user/50x50/png/a.jpg").is_none());
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        store.insert("user/a.jpg", b"original".to_vec());
        let pipeline = pipeline(store.clone());

        let first = pipeline.run_path("/user/80x60/webp/a.jpg").await;
        let stored_first = store.object("user/80x60/webp/a.jpg");
        let second = pipeline.run_path("/user/80x60/webp/a.jpg").await;

        match (first, second) {
            (
                PipelineOutcome::Success { bytes: a, .. },
                PipelineOutcome::Success { bytes: b, .. },
            ) => assert_eq!(a, b),
            other => panic!("expected two successes, got {other:?}"),
        }
        assert_eq!(store.put_count(), 2);
        assert_eq!(stored_first, store.object("user/80x60/webp/a.jpg"));
    }

    #[tokio::test]
    async fn test_serve_path_returns_stored_derivative() {
        let store = Arc::new(MemoryStore::new());
        store.insert("user/a.jpg", b"original".to_vec());
        store.insert("user/80x60/webp/a.jpg", b"stored".to_vec());

        let outcome = pipeline(store.clone()).serve_path("/user/80x60/webp/a.jpg").await;

        match outcome {
            PipelineOutcome::Success {
                bytes,
                content_type,
            } => {
                assert_eq!(bytes, Bytes::from_static(b"stored"));
                assert_eq!(content_type, "image/webp");
            }
            other => panic!("expected success, got {other:?}"),
        }
        assert_eq!(store.put_count(), 0);
    }

    #[tokio::test]
    async fn test_serve_path_generates_when_missing() {
        let store = Arc::new(MemoryStore::new());
        store.insert("user/a.jpg", b"original".to_vec());
        let pipeline = pipeline(store.clone());

        let first = pipeline.serve_path("/user/80x60/webp/a.jpg").await;
        let second = pipeline.serve_path("/user/80x60/webp/a.jpg").await;

        assert!(matches!(first, PipelineOutcome::Success { .. }));
        assert!(matches!(second, PipelineOutcome::Success { .. }));
        assert_eq!(store.put_count(), 1);
    }

    #[tokio::test]
    async fn test_uppercase_format_fails_instead_of_mislabeling() {
        let store = Arc::new(MemoryStore::new());
        store.insert("u/a.jpg", b"not really a jpeg".to_vec());
        let pipeline =
            DerivativePipeline::new(store.clone(), Arc::new(ImageCrateTransform::default()), "STANDARD");

        let outcome = pipeline.run_path("/u/100x100/JPG/a.jpg").await;
        assert!(matches!(
            outcome,
            PipelineOutcome::TransformFailure(TransformError::UnsupportedFormat(f)) if f == "JPG"
        ));
        assert_eq!(store.put_count(), 0);
    }

    #[tokio::test]
    async fn test_real_transform_rejects_unknown_format() {
        let store = Arc::new(MemoryStore::new());
        store.insert("user/a.png", b"not really a png".to_vec());
        let pipeline =
            DerivativePipeline::new(store, Arc::new(ImageCrateTransform::default()), "STANDARD");

        let outcome = pipeline.run_path("/user/10x10/tiff/a.png").await;
        assert!(matches!(
            outcome,
            PipelineOutcome::TransformFailure(TransformError::UnsupportedFormat(_))
        ));
    }
}
