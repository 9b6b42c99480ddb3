//! CDN のオリジンレスポンス（キャッシュミス）イベントの処理

use serde::{Deserialize, Serialize};

use crate::config::DerivativeConfig;
use crate::pipeline::DerivativePipeline;
use crate::response::{self, ResponseDescriptor};

/// キャッシュミス時に CDN から渡されるイベント
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissEvent {
    /// オリジンが返したミス応答
    pub response: ResponseDescriptor,
    pub request_path: String,
    #[serde(default)]
    pub request_query_string: String,
}

pub struct OriginResponseHandler {
    pipeline: DerivativePipeline,
    config: DerivativeConfig,
}

impl OriginResponseHandler {
    pub fn new(pipeline: DerivativePipeline, config: &DerivativeConfig) -> Self {
        Self {
            pipeline,
            config: config.clone(),
        }
    }

    pub fn pipeline(&self) -> &DerivativePipeline {
        &self.pipeline
    }

    /// ミスイベントを処理し、CDN に返すレスポンスを作る
    ///
    /// 対象外のイベントや失敗時はミス応答をそのまま返す。
    pub async fn handle(&self, event: MissEvent) -> ResponseDescriptor {
        if !self.config.triggers_on(event.response.status) {
            return event.response;
        }

        if let Some(param) = &self.config.dimension_query_param
            && !has_query_param(&event.request_query_string, param)
        {
            tracing::debug!(path = %event.request_path, param = %param, "no dimension parameter, skipping");
            return event.response;
        }

        let outcome = self.pipeline.run_path(&event.request_path).await;
        tracing::info!(
            path = %event.request_path,
            status = event.response.status,
            outcome = outcome.kind(),
            "handled miss event"
        );

        response::build(outcome, event.response)
    }
}

fn has_query_param(query: &str, name: &str) -> bool {
    let query = query.strip_prefix('?').unwrap_or(query);
    url::form_urlencoded::parse(query.as_bytes()).any(|(k, v)| k == name && !v.is_empty())
}
