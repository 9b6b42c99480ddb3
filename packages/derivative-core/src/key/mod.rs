//! リクエストパスを (オリジナルのキー, 変換パラメータ) として解釈する

mod derivative_key;
mod grammar;
mod request;

pub use derivative_key::DerivativeKey;
pub use grammar::{KeyGrammar, PrefixedGrammar, UnprefixedGrammar};
pub use request::{DerivativeRequest, normalize_format};

use crate::errors::ParseError;

/// 文法を順番に試し、最初にマッチしたものを採用するパーサ
pub struct KeyParser {
    grammars: Vec<Box<dyn KeyGrammar>>,
}

impl Default for KeyParser {
    /// プレフィックス付き → プレフィックスなし の順
    fn default() -> Self {
        Self::new(vec![Box::new(PrefixedGrammar), Box::new(UnprefixedGrammar)])
    }
}

impl KeyParser {
    pub fn new(grammars: Vec<Box<dyn KeyGrammar>>) -> Self {
        Self { grammars }
    }

    /// デコード済みのキーを解析する
    pub fn parse_key(&self, key: &DerivativeKey) -> Result<DerivativeRequest, ParseError> {
        for grammar in &self.grammars {
            if let Some(result) = grammar.matches(key.as_str()) {
                tracing::debug!(key = %key, grammar = grammar.name(), "derivative key matched");
                return result;
            }
        }

        Err(ParseError::Malformed {
            path: key.to_string(),
        })
    }

    /// リクエストパスを派生キーとリクエストに分解する
    pub fn parse(&self, path: &str) -> Result<(DerivativeKey, DerivativeRequest), ParseError> {
        let key = DerivativeKey::from_path(path)?;
        let request = self.parse_key(&key)?;
        Ok((key, request))
    }
}

/// デフォルトの文法でリクエストパスを解析する
pub fn parse(path: &str) -> Result<DerivativeRequest, ParseError> {
    KeyParser::default().parse(path).map(|(_, request)| request)
}
