//! パイプラインの結果を CDN が期待するレスポンスに写す

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use crate::constants::DERIVATIVE_CACHE_CONTROL;
use crate::pipeline::PipelineOutcome;

/// `body` がテキストか、バイナリを base64 にしたものか
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyEncoding {
    #[default]
    Text,
    Base64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderEntry {
    pub key: String,
    pub value: String,
}

/// CDN とやり取りするレスポンス
///
/// ヘッダは小文字の名前をキーに、元の表記と値の組を並べる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDescriptor {
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_description: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, Vec<HeaderEntry>>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub body_encoding: BodyEncoding,
}

impl ResponseDescriptor {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            status_description: None,
            headers: BTreeMap::new(),
            body: String::new(),
            body_encoding: BodyEncoding::Text,
        }
    }

    /// 同名のヘッダを置き換える
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.insert(
            name.to_ascii_lowercase(),
            vec![HeaderEntry {
                key: name.to_string(),
                value: value.into(),
            }],
        );
    }

    pub fn remove_header(&mut self, name: &str) {
        self.headers.remove(&name.to_ascii_lowercase());
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .and_then(|entries| entries.first())
            .map(|entry| entry.value.as_str())
    }

    /// `body_encoding` に従って本文をバイト列に戻す
    pub fn body_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        match self.body_encoding {
            BodyEncoding::Text => Ok(self.body.clone().into_bytes()),
            BodyEncoding::Base64 => BASE64.decode(&self.body),
        }
    }
}

/// 成功なら派生画像のレスポンスを、失敗ならミス応答をそのまま返す
///
/// 失敗時はエンドユーザから見て「生成を試みなかった」のと区別できない。
pub fn build(outcome: PipelineOutcome, miss: ResponseDescriptor) -> ResponseDescriptor {
    match outcome {
        PipelineOutcome::Success {
            bytes,
            content_type,
        } => {
            let mut response = miss;
            response.status = 200;
            response.status_description = Some("OK".to_string());
            response.body = BASE64.encode(&bytes);
            response.body_encoding = BodyEncoding::Base64;
            response.remove_header("content-length");
            response.set_header("Content-Type", content_type);
            response.set_header("Cache-Control", DERIVATIVE_CACHE_CONTROL);
            response
        }
        failure => {
            tracing::warn!(outcome = failure.kind(), "passing miss response through");
            miss
        }
    }
}
