//! 環境変数からの設定読み込み
//!
//! プロセス起動時に 1 度だけ構築し、参照で各コンポーネントに渡す。

use std::fmt;

use crate::constants::DEFAULT_STORAGE_CLASS;
use crate::errors::ConfigError;

const DEFAULT_TRIGGER_STATUS: u16 = 404;

/// Cloudflare Access のサービストークン
#[derive(Clone, PartialEq, Eq)]
pub struct AccessCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for AccessCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// バックエンドのオブジェクトストアの位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub bucket: String,
    /// Storage Proxy の URL。末尾の `/` は含まない
    pub endpoint: String,
    pub storage_class: String,
    pub access: Option<AccessCredentials>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivativeConfig {
    pub storage: StorageConfig,
    /// パイプラインを起動するミス応答のステータス（404 のみ、または 404 + 403）
    pub trigger_status_codes: Vec<u16>,
    /// 設定されている場合、このクエリパラメータがあるリクエストだけを処理する
    pub dimension_query_param: Option<String>,
}

impl DerivativeConfig {
    /// 環境変数から設定を作成する
    ///
    /// 必須の環境変数:
    /// - STORAGE_BUCKET
    /// - STORAGE_ENDPOINT
    ///
    /// 任意:
    /// - STORAGE_CLASS
    /// - TRIGGER_STATUS_CODES (例: `404,403`)
    /// - DIMENSION_QUERY_PARAM
    /// - CF_ACCESS_CLIENT_ID, CF_ACCESS_CLIENT_SECRET
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let bucket = var("STORAGE_BUCKET").ok_or(ConfigError::Missing("STORAGE_BUCKET"))?;
        // 署名はプロキシ側で行うので、直接 S3 を指すデフォルトは持たない
        let endpoint = var("STORAGE_ENDPOINT")
            .ok_or(ConfigError::Missing("STORAGE_ENDPOINT"))?
            .trim_end_matches('/')
            .to_string();
        let storage_class =
            var("STORAGE_CLASS").unwrap_or_else(|| DEFAULT_STORAGE_CLASS.to_string());

        let access = match (var("CF_ACCESS_CLIENT_ID"), var("CF_ACCESS_CLIENT_SECRET")) {
            (Some(client_id), Some(client_secret)) => Some(AccessCredentials {
                client_id,
                client_secret,
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing("CF_ACCESS_CLIENT_SECRET")),
            (None, Some(_)) => return Err(ConfigError::Missing("CF_ACCESS_CLIENT_ID")),
        };

        let trigger_status_codes = match var("TRIGGER_STATUS_CODES") {
            Some(raw) => parse_status_codes(&raw)?,
            None => vec![DEFAULT_TRIGGER_STATUS],
        };

        Ok(Self {
            storage: StorageConfig {
                bucket,
                endpoint,
                storage_class,
                access,
            },
            trigger_status_codes,
            dimension_query_param: var("DIMENSION_QUERY_PARAM"),
        })
    }

    pub fn triggers_on(&self, status: u16) -> bool {
        self.trigger_status_codes.contains(&status)
    }
}

fn parse_status_codes(raw: &str) -> Result<Vec<u16>, ConfigError> {
    let invalid = || ConfigError::Invalid {
        name: "TRIGGER_STATUS_CODES",
        value: raw.to_string(),
    };

    let codes = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| match s.parse::<u16>() {
            Ok(code) if (400..500).contains(&code) => Ok(code),
            _ => Err(invalid()),
        })
        .collect::<Result<Vec<_>, _>>()?;

    if codes.is_empty() {
        return Err(invalid());
    }
    Ok(codes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<DerivativeConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DerivativeConfig::from_lookup(|name| vars.get(name).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("STORAGE_BUCKET", "cdn.example.com"),
        ("STORAGE_ENDPOINT", "https://storage.example.com"),
    ];

    fn load_with(extra: &[(&str, &str)]) -> Result<DerivativeConfig, ConfigError> {
        let mut vars: Vec<(&str, &str)> = REQUIRED.to_vec();
        vars.extend_from_slice(extra);
        load(&vars)
    }

    #[test]
    fn test_defaults() {
        let config = load(&REQUIRED).unwrap();
        assert_eq!(config.storage.bucket, "cdn.example.com");
        assert_eq!(config.storage.endpoint, "https://storage.example.com");
        assert_eq!(config.storage.storage_class, "STANDARD");
        assert_eq!(config.storage.access, None);
        assert_eq!(config.trigger_status_codes, vec![404]);
        assert_eq!(config.dimension_query_param, None);
        assert!(config.triggers_on(404));
        assert!(!config.triggers_on(403));
    }

    #[test]
    fn test_missing_bucket() {
        assert!(matches!(load(&[]), Err(ConfigError::Missing("STORAGE_BUCKET"))));
        assert!(matches!(
            load(&[("STORAGE_BUCKET", "  ")]),
            Err(ConfigError::Missing("STORAGE_BUCKET"))
        ));
    }

    #[test]
    fn test_missing_endpoint() {
        assert!(matches!(
            load(&[("STORAGE_BUCKET", "media")]),
            Err(ConfigError::Missing("STORAGE_ENDPOINT"))
        ));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("STORAGE_BUCKET", "media"),
            ("STORAGE_ENDPOINT", "https://storage.example.com/"),
            ("TRIGGER_STATUS_CODES", "404, 403"),
            ("DIMENSION_QUERY_PARAM", "d"),
            ("CF_ACCESS_CLIENT_ID", "id"),
            ("CF_ACCESS_CLIENT_SECRET", "secret"),
        ])
        .unwrap();

        assert_eq!(config.storage.endpoint, "https://storage.example.com");
        assert_eq!(config.trigger_status_codes, vec![404, 403]);
        assert!(config.triggers_on(403));
        assert_eq!(config.dimension_query_param.as_deref(), Some("d"));
        assert_eq!(
            config.storage.access.map(|a| a.client_id),
            Some("id".to_string())
        );
    }

    #[test]
    fn test_invalid_status_codes() {
        for raw in ["200", "abc", "404,500", ","] {
            let result = load_with(&[("TRIGGER_STATUS_CODES", raw)]);
            assert!(
                matches!(result, Err(ConfigError::Invalid { .. })),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn test_half_configured_access() {
        let result = load_with(&[("CF_ACCESS_CLIENT_ID", "id")]);
        assert!(matches!(
            result,
            Err(ConfigError::Missing("CF_ACCESS_CLIENT_SECRET"))
        ));
    }

    #[test]
    fn test_secret_is_redacted() {
        let creds = AccessCredentials {
            client_id: "id".to_string(),
            client_secret: "hunter2".to_string(),
        };
        assert!(!format!("{creds:?}").contains("hunter2"));
    }
}
