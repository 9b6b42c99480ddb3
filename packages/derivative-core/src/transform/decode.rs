use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;

use crate::errors::TransformError;

/// バイト列をデコードし、DynamicImage と推測した入力フォーマットを返す
pub fn decode_image(input: &[u8]) -> Result<(DynamicImage, Option<ImageFormat>), TransformError> {
    let reader = ImageReader::new(Cursor::new(input))
        .with_guessed_format()
        .map_err(|e| TransformError::ProcessingFailed(format!("failed to guess format: {e}")))?;

    let source_format = reader.format();

    let img = reader
        .decode()
        .map_err(|e| TransformError::ProcessingFailed(format!("decode failed: {e}")))?;

    Ok((img, source_format))
}
