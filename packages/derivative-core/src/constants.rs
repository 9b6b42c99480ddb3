/// 出力画像の最大寸法（幅・高さ）
pub const MAX_DIMENSION: u32 = 4096;

/// ソース画像の最大ピクセル数（極端な画像によるメモリ枯渇のみ防止）
pub const MAX_PIXELS: u64 = 1_000_000_000;

/// エンコード品質（1-100）。リクエストからは変更できない
pub const DEFAULT_QUALITY: u8 = 80;

/// ストアから読み込むオリジナルの最大サイズ（50MB）
pub const MAX_INPUT_SIZE: u64 = 50 * 1024 * 1024;

/// 派生画像を保存するときの Cache-Control
pub const DERIVATIVE_CACHE_CONTROL: &str = "max-age=31536000";

/// ストレージクラスのデフォルト
pub const DEFAULT_STORAGE_CLASS: &str = "STANDARD";
