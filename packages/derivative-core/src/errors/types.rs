use thiserror::Error;

/// リクエストパスの解析エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("path does not match any derivative key grammar: {path}")]
    Malformed { path: String },

    #[error("invalid URL encoding")]
    InvalidEncoding,

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("dimension out of range: {value}")]
    DimensionOutOfRange { value: String },
}

/// ストレージアクセスエラー
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {key}")]
    NotFound { key: String },

    #[error("access denied")]
    Forbidden,

    #[error("object too large: {size} bytes (max {max})")]
    TooLarge { size: u64, max: u64 },

    #[error("storage error: {0}")]
    Internal(String),
}

/// 画像変換エラー
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("image resolution exceeds maximum ({width}x{height})")]
    ResolutionTooLarge { width: u32, height: u32 },

    #[error("processing failed: {0}")]
    ProcessingFailed(String),
}

/// 設定読み込みエラー
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}
