use crate::constants::MAX_PIXELS;
use crate::errors::TransformError;
use crate::transform::dimensions::ResizePlan;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer, images::Image};
use image::{DynamicImage, RgbImage, RgbaImage};

/// リサイズ計画に従って画像を拡縮する
///
/// fast_image_resize の Lanczos3 フィルタを使用し、切り抜き窓があれば
/// その範囲だけを出力サイズのバッファへ直接リサンプルする。
/// アルファチャンネルがある画像は RGBA8 のまま処理する。
pub fn resize_image(img: &DynamicImage, plan: &ResizePlan) -> Result<DynamicImage, TransformError> {
    let total_pixels = plan.width as u64 * plan.height as u64;
    if total_pixels > MAX_PIXELS {
        return Err(TransformError::ResolutionTooLarge {
            width: plan.width,
            height: plan.height,
        });
    }

    let resized: Option<DynamicImage> = if img.color().has_alpha() {
        let rgba = img.to_rgba8();
        let (w, h) = rgba.dimensions();
        let raw = resample(w, h, rgba.into_raw(), PixelType::U8x4, plan)?;
        RgbaImage::from_raw(plan.width, plan.height, raw).map(DynamicImage::ImageRgba8)
    } else {
        let rgb = img.to_rgb8();
        let (w, h) = rgb.dimensions();
        let raw = resample(w, h, rgb.into_raw(), PixelType::U8x3, plan)?;
        RgbImage::from_raw(plan.width, plan.height, raw).map(DynamicImage::ImageRgb8)
    };
    resized.ok_or_else(|| {
        TransformError::ProcessingFailed("failed to convert resized image".to_string())
    })
}

fn resample(
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    pixel_type: PixelType,
    plan: &ResizePlan,
) -> Result<Vec<u8>, TransformError> {
    let src_image = Image::from_vec_u8(width, height, pixels, pixel_type).map_err(|e| {
        TransformError::ProcessingFailed(format!("failed to create source image: {e}"))
    })?;
    let mut dst_image = Image::new(plan.width, plan.height, pixel_type);

    let mut options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Lanczos3));
    if let Some(crop) = plan.crop {
        options = options.crop(
            crop.x as f64,
            crop.y as f64,
            crop.width as f64,
            crop.height as f64,
        );
    }

    let mut resizer = Resizer::new();
    resizer
        .resize(&src_image, &mut dst_image, &options)
        .map_err(|e| TransformError::ProcessingFailed(format!("resize failed: {e}")))?;

    Ok(dst_image.into_vec())
}
