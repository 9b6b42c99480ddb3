use axum::Json;
use axum::extract::State;
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::AppState;
use derivative_core::{
    MissEvent, ParseError, PipelineOutcome, ResponseDescriptor, StorageError, TransformError,
};

const CACHE_CONTROL_IMMUTABLE: &str = "public, max-age=31536000, immutable";

#[derive(Debug, Deserialize)]
pub struct ViewerRequest {
    pub uri: String,
    #[serde(default)]
    pub querystring: String,
    #[serde(default)]
    pub accept: Option<String>,
}

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerResponse {
    pub uri: String,
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// CDN のオリジンレスポンスイベント。失敗してもミス応答を 200 で返す
pub async fn origin_response(
    State(state): State<AppState>,
    Json(event): Json<MissEvent>,
) -> Json<ResponseDescriptor> {
    Json(state.origin.handle(event).await)
}

/// CDN のビューアリクエストイベント。書き換えない場合は URI をそのまま返す
pub async fn viewer_request(
    State(state): State<AppState>,
    Json(request): Json<ViewerRequest>,
) -> Json<ViewerResponse> {
    let uri = state
        .viewer
        .rewrite(&request.uri, &request.querystring, request.accept.as_deref())
        .unwrap_or(request.uri);

    Json(ViewerResponse { uri })
}

/// 派生キーのパスを直接受けて画像を返す
///
/// 保存済みの派生画像があればそれを返す。
/// パスは percent-encoding のまま渡す（デコードはキーの解析で 1 回だけ行う）
pub async fn serve(State(state): State<AppState>, uri: Uri) -> Result<Response, AppError> {
    match state.origin.pipeline().serve_path(uri.path()).await {
        PipelineOutcome::Success {
            bytes,
            content_type,
        } => Ok((
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, content_type),
                (header::CACHE_CONTROL, CACHE_CONTROL_IMMUTABLE.to_string()),
            ],
            bytes,
        )
            .into_response()),
        PipelineOutcome::ParseFailure(err) => Err(err.into()),
        PipelineOutcome::SourceNotFound { key } => {
            tracing::warn!(key = %key, "original not found");
            Err(AppError::NotFound("object not found".to_string()))
        }
        PipelineOutcome::TransformFailure(err) => Err(err.into()),
        PipelineOutcome::StoreFailure(err) => Err(err.into()),
    }
}

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    TransformFailed(String),
    StorageUnavailable(String),
}

impl From<ParseError> for AppError {
    fn from(err: ParseError) -> Self {
        tracing::warn!(error = %err, "not a derivative key");
        AppError::NotFound("object not found".to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { key } => {
                tracing::warn!(key = %key, "object not found");
                AppError::NotFound("object not found".to_string())
            }
            StorageError::TooLarge { size, max } => {
                tracing::warn!(size, max, "original too large");
                AppError::TransformFailed("source image too large".to_string())
            }
            StorageError::Forbidden => {
                tracing::error!("access denied by Storage Proxy (check CF Access credentials)");
                AppError::StorageUnavailable("storage access denied".to_string())
            }
            StorageError::Internal(msg) => {
                tracing::error!(error = %msg, "storage error");
                AppError::StorageUnavailable("storage error".to_string())
            }
        }
    }
}

impl From<TransformError> for AppError {
    fn from(err: TransformError) -> Self {
        match err {
            TransformError::InvalidParams(msg) => {
                tracing::warn!(error = %msg, "invalid transform parameters");
                AppError::BadRequest(msg)
            }
            TransformError::UnsupportedFormat(format) => {
                tracing::warn!(format = %format, "unsupported output format");
                AppError::BadRequest(format!("unsupported output format: {format}"))
            }
            TransformError::ResolutionTooLarge { width, height } => {
                tracing::warn!(width = %width, height = %height, "image resolution too large");
                AppError::BadRequest(format!("image resolution {width}x{height} is too large"))
            }
            TransformError::ProcessingFailed(msg) => {
                tracing::error!(error = %msg, "image processing failed");
                AppError::TransformFailed(msg)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::TransformFailed(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::StorageUnavailable(msg) => {
                tracing::error!(error = %msg, "storage unavailable");
                (StatusCode::BAD_GATEWAY, "storage unavailable".to_string())
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, Json(body)).into_response()
    }
}
