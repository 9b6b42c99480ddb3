use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::request::{DerivativeRequest, normalize_format};
use crate::errors::ParseError;

static PREFIXED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+)/(\d+)x(\d+)/([^/]+)/([^/]+)$").expect("prefixed grammar is a valid regex")
});

static UNPREFIXED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)x(\d+)/([^/]+)/([^/]+)$").expect("unprefixed grammar is a valid regex")
});

/// 派生キーの文法 1 つ分
///
/// マッチしなければ `None`。マッチしたが値が不正なら `Some(Err(..))`。
pub trait KeyGrammar: Send + Sync {
    fn name(&self) -> &'static str;

    fn matches(&self, key: &str) -> Option<Result<DerivativeRequest, ParseError>>;
}

/// `<prefix>/<W>x<H>/<format>/<name>`
///
/// プレフィックスは貪欲にマッチするので `/` を含んでいてもそのまま残る
#[derive(Debug, Default, Clone, Copy)]
pub struct PrefixedGrammar;

impl KeyGrammar for PrefixedGrammar {
    fn name(&self) -> &'static str {
        "prefixed"
    }

    fn matches(&self, key: &str) -> Option<Result<DerivativeRequest, ParseError>> {
        let caps = PREFIXED.captures(key)?;
        let prefix = &caps[1];
        Some(build_request(&caps, 2, |name| format!("{prefix}/{name}")))
    }
}

/// `<W>x<H>/<format>/<name>`
#[derive(Debug, Default, Clone, Copy)]
pub struct UnprefixedGrammar;

impl KeyGrammar for UnprefixedGrammar {
    fn name(&self) -> &'static str {
        "unprefixed"
    }

    fn matches(&self, key: &str) -> Option<Result<DerivativeRequest, ParseError>> {
        let caps = UNPREFIXED.captures(key)?;
        Some(build_request(&caps, 1, |name| name.to_string()))
    }
}

/// `first` 番目のキャプチャから width, height, format, name が順に並んでいる前提
fn build_request(
    caps: &Captures<'_>,
    first: usize,
    original_key: impl FnOnce(&str) -> String,
) -> Result<DerivativeRequest, ParseError> {
    let width = parse_dimension(&caps[first])?;
    let height = parse_dimension(&caps[first + 1])?;
    let format = normalize_format(&caps[first + 2]);
    let original_key = original_key(&caps[first + 3]);

    Ok(DerivativeRequest {
        original_key,
        width,
        height,
        format,
    })
}

fn parse_dimension(digits: &str) -> Result<u32, ParseError> {
    digits
        .parse::<u32>()
        .map_err(|_| ParseError::DimensionOutOfRange {
            value: digits.to_string(),
        })
}
