use crate::errors::TransformError;
use crate::transform::params::OutputFormat;
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

/// WebP / AVIF エンコーダが受け付ける 8bit RGB(A) に揃える
fn to_rgb_family(img: &DynamicImage) -> DynamicImage {
    match img {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => img.clone(),
        _ if img.color().has_alpha() => DynamicImage::ImageRgba8(img.to_rgba8()),
        _ => DynamicImage::ImageRgb8(img.to_rgb8()),
    }
}

/// 画像を指定フォーマットでエンコードする
pub fn encode_image(
    img: &DynamicImage,
    format: OutputFormat,
    quality: u8,
) -> Result<Vec<u8>, TransformError> {
    let mut buf = Cursor::new(Vec::new());

    match format {
        OutputFormat::Jpeg => {
            // JPEG はアルファを持てない
            let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
            img.to_rgb8()
                .write_with_encoder(encoder)
                .map_err(|e| TransformError::ProcessingFailed(format!("JPEG encode failed: {e}")))?;
        }
        OutputFormat::Png => {
            img.write_to(&mut buf, ImageFormat::Png)
                .map_err(|e| TransformError::ProcessingFailed(format!("PNG encode failed: {e}")))?;
        }
        OutputFormat::WebP => {
            // image クレートの WebP エンコーダはロスレスのみ対応（quality は無視）
            let encoder = WebPEncoder::new_lossless(&mut buf);
            to_rgb_family(img)
                .write_with_encoder(encoder)
                .map_err(|e| TransformError::ProcessingFailed(format!("WebP encode failed: {e}")))?;
        }
        OutputFormat::Avif => {
            let encoder = AvifEncoder::new_with_speed_quality(&mut buf, 4, quality);
            to_rgb_family(img)
                .write_with_encoder(encoder)
                .map_err(|e| TransformError::ProcessingFailed(format!("AVIF encode failed: {e}")))?;
        }
    }

    Ok(buf.into_inner())
}
