use crate::constants::MAX_DIMENSION;
use crate::errors::TransformError;

/// 出力寸法を検証する
///
/// 0 は「その軸はアスペクト比から決める」という意味なので許可する
pub fn validate_dimensions(width: u32, height: u32) -> Result<(), TransformError> {
    if width > MAX_DIMENSION {
        return Err(TransformError::InvalidParams(format!(
            "width must be 0-{MAX_DIMENSION}, got {width}"
        )));
    }

    if height > MAX_DIMENSION {
        return Err(TransformError::InvalidParams(format!(
            "height must be 0-{MAX_DIMENSION}, got {height}"
        )));
    }

    Ok(())
}
