use std::fmt;

use crate::errors::ParseError;
use crate::validation::validate_key;

/// 派生画像を保存するストアキー
///
/// リクエストパスから先頭の `/` を 1 つ取り除き、URL デコードしたもの。
/// サイズ・フォーマットのセグメントを含むのでオリジナルのキーとは必ず異なる。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DerivativeKey(String);

impl DerivativeKey {
    pub fn from_path(path: &str) -> Result<Self, ParseError> {
        let raw = path.strip_prefix('/').unwrap_or(path);
        let decoded = urlencoding::decode(raw).map_err(|_| ParseError::InvalidEncoding)?;
        validate_key(&decoded)?;

        Ok(Self(decoded.into_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for DerivativeKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DerivativeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
