/// ソース画像上の切り抜き窓（この範囲だけをリサンプルする）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// 出力寸法と、リサンプル対象にするソースの窓
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizePlan {
    pub width: u32,
    pub height: u32,
    /// `None` ならソース全体
    pub crop: Option<CropRect>,
}

impl ResizePlan {
    fn whole(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            crop: None,
        }
    }

    pub fn is_noop(&self, src_w: u32, src_h: u32) -> bool {
        self.crop.is_none() && self.width == src_w && self.height == src_h
    }
}

/// 倍率を適用して新しい寸法を計算する（最小 1px）
fn apply_scale(src_w: u32, src_h: u32, scale: f64) -> (u32, u32) {
    let new_w = (src_w as f64 * scale).round() as u32;
    let new_h = (src_h as f64 * scale).round() as u32;

    (new_w.max(1), new_h.max(1))
}

/// `value * num / den` を四捨五入し、`1..=max` に収める
fn scale_axis(value: u32, num: u32, den: u32, max: u32) -> u32 {
    let scaled = (value as u64 * num as u64 + den as u64 / 2) / den as u64;
    (scaled as u32).clamp(1, max)
}

/// 目標のアスペクト比でソースの中央を切り出し、その窓を W×H にリサンプルする
///
/// 中間バッファは作らないので、メモリは出力サイズにしか比例しない
fn plan_cover(src_w: u32, src_h: u32, target_w: u32, target_h: u32) -> ResizePlan {
    let src_ratio = src_w as u64 * target_h as u64;
    let target_ratio = target_w as u64 * src_h as u64;

    let crop = match src_ratio.cmp(&target_ratio) {
        std::cmp::Ordering::Equal => None,
        // ソースの方が横長: 左右を落とす
        std::cmp::Ordering::Greater => {
            let width = scale_axis(src_h, target_w, target_h, src_w);
            Some(CropRect {
                x: (src_w - width) / 2,
                y: 0,
                width,
                height: src_h,
            })
        }
        // ソースの方が縦長: 上下を落とす
        std::cmp::Ordering::Less => {
            let height = scale_axis(src_w, target_h, target_w, src_h);
            Some(CropRect {
                x: 0,
                y: (src_h - height) / 2,
                width: src_w,
                height,
            })
        }
    };

    ResizePlan {
        width: target_w,
        height: target_h,
        crop,
    }
}

/// リサイズ計画を立てる
///
/// - 両方指定: アスペクト比を維持して領域を覆うように中央を切り出し、正確に W×H にする
/// - 片方のみ: 指定された軸に合わせて等倍率で拡縮
/// - 指定なし: 元の寸法のまま
///
/// 拡大も行う
pub fn plan_resize(
    src_w: u32,
    src_h: u32,
    target_w: Option<u32>,
    target_h: Option<u32>,
) -> ResizePlan {
    match (target_w, target_h) {
        (Some(w), Some(h)) => plan_cover(src_w, src_h, w, h),
        (Some(w), None) => {
            let (w, h) = apply_scale(src_w, src_h, w as f64 / src_w as f64);
            ResizePlan::whole(w, h)
        }
        (None, Some(h)) => {
            let (w, h) = apply_scale(src_w, src_h, h as f64 / src_h as f64);
            ResizePlan::whole(w, h)
        }
        (None, None) => ResizePlan::whole(src_w, src_h),
    }
}
