use crate::errors::ParseError;

/// ストアキーの最大長
const MAX_KEY_LEN: usize = 1024;

/// デコード済みのストアキーを検証する
///
/// 構造だけを見る。文字種はストアのキーとして有効なものなら何でも通す
/// （ワイヤ上のエンコードはストアクライアントの責務）。
pub fn validate_key(key: &str) -> Result<(), ParseError> {
    if key.is_empty() {
        return Err(ParseError::InvalidKey("key is empty".to_string()));
    }

    if key.len() > MAX_KEY_LEN {
        return Err(ParseError::InvalidKey(format!(
            "key is too long (max {MAX_KEY_LEN})"
        )));
    }

    if key.chars().any(char::is_control) {
        return Err(ParseError::InvalidKey(
            "control characters in key".to_string(),
        ));
    }

    // `..` はセグメント全体のときだけ拒否する（`a..b.jpg` は有効なファイル名）
    if key.starts_with('/') || key.contains("//") || key.split('/').any(|segment| segment == "..")
    {
        return Err(ParseError::InvalidKey("path traversal detected".to_string()));
    }

    Ok(())
}
