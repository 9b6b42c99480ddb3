use bytes::Bytes;

use crate::constants::{DEFAULT_QUALITY, MAX_PIXELS};
use crate::errors::TransformError;
use crate::transform::{
    Orientation, TransformParams, decode_image, encode_image, plan_resize, resize_image,
};

/// 画像変換の能力
///
/// 「フォーマット X のバイト列をデコードし、W×H にリサイズし、`format` でエンコードする」。
/// CPU バウンドなのでパイプラインからはブロッキングスレッドで呼ばれる。
pub trait ImageTransform: Send + Sync {
    fn transform(
        &self,
        input: &[u8],
        width: u32,
        height: u32,
        format: &str,
    ) -> Result<Bytes, TransformError>;
}

/// image クレート + fast_image_resize による実装
///
/// メタデータ (EXIF/XMP) はデコード・エンコードの往復で削除される。
#[derive(Debug, Clone)]
pub struct ImageCrateTransform {
    quality: u8,
}

impl Default for ImageCrateTransform {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
        }
    }
}

impl ImageTransform for ImageCrateTransform {
    fn transform(
        &self,
        input: &[u8],
        width: u32,
        height: u32,
        format: &str,
    ) -> Result<Bytes, TransformError> {
        let params = TransformParams::parse(width, height, format)?;

        let (img, source_format) = decode_image(input)?;
        let img = Orientation::read(input).apply(img);

        let (src_w, src_h) = (img.width(), img.height());
        validate_source_dimensions(src_w, src_h)?;

        let (target_w, target_h) = params.target();
        let plan = plan_resize(src_w, src_h, target_w, target_h);

        tracing::debug!(
            source_format = ?source_format,
            src_w,
            src_h,
            dst = ?(plan.width, plan.height),
            crop = ?plan.crop,
            "resizing image"
        );

        let resized = if plan.is_noop(src_w, src_h) {
            img
        } else {
            resize_image(&img, &plan)?
        };

        let output = encode_image(&resized, params.format, self.quality)?;
        Ok(Bytes::from(output))
    }
}

/// ソース画像の総ピクセル数を検証し、メモリ枯渇を防ぐ
fn validate_source_dimensions(width: u32, height: u32) -> Result<(), TransformError> {
    let total_pixels = width as u64 * height as u64;
    if total_pixels > MAX_PIXELS {
        return Err(TransformError::ResolutionTooLarge { width, height });
    }
    Ok(())
}
