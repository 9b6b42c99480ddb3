use crate::errors::TransformError;
use crate::validation::validate_dimensions;

/// 出力フォーマット
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
    Avif,
}

impl OutputFormat {
    /// 正規化済みのフォーマット名から OutputFormat を作成する
    ///
    /// Content-Type は `image/<token>` で組み立てられるので、
    /// 正準名（小文字）以外は受け付けない
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::WebP),
            "avif" => Some(Self::Avif),
            _ => None,
        }
    }
}

/// 1 回の変換に必要なパラメータ
///
/// width / height の 0 は「その軸はアスペクト比から決める」
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformParams {
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
}

impl TransformParams {
    pub fn parse(width: u32, height: u32, format: &str) -> Result<Self, TransformError> {
        validate_dimensions(width, height)?;
        let format = OutputFormat::from_token(format)
            .ok_or_else(|| TransformError::UnsupportedFormat(format.to_string()))?;

        Ok(Self {
            width,
            height,
            format,
        })
    }

    /// 寸法を Option に変換する（0 は未指定扱い）
    pub fn target(&self) -> (Option<u32>, Option<u32>) {
        let non_zero = |v: u32| (v > 0).then_some(v);
        (non_zero(self.width), non_zero(self.height))
    }
}
