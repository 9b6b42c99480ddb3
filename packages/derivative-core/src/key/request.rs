/// パースされた派生画像リクエスト
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivativeRequest {
    /// オリジナル画像のストアキー（サイズ・フォーマットのセグメントを含まない）
    pub original_key: String,
    /// 0 は「アスペクト比を維持してこの軸を決める」
    pub width: u32,
    pub height: u32,
    /// 変換器が期待するフォーマット名（`jpg` は `jpeg` に正規化済み）
    pub format: String,
}

impl DerivativeRequest {
    pub fn content_type(&self) -> String {
        format!("image/{}", self.format)
    }
}

/// フォーマットトークンを正規化する
///
/// 出力フォーマット名は変換器の契約なので `jpg` だけを `jpeg` に書き換え、
/// それ以外はそのまま通す
pub fn normalize_format(token: &str) -> String {
    match token {
        "jpg" => "jpeg".to_string(),
        other => other.to_string(),
    }
}
