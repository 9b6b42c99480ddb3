//! ビューアリクエストの正規化
//!
//! `/<prefix>/<file>?d=WxH` を派生キーのパス `/<prefix>/<W>x<H>/<format>/<file>` に書き換える。
//! 任意の寸法を許すとキャッシュが分散するので、許可された寸法に丸める。

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimension {
    pub width: u32,
    pub height: u32,
}

impl Dimension {
    pub const fn square(size: u32) -> Self {
        Self {
            width: size,
            height: size,
        }
    }
}

const DEFAULT_ALLOWED: [Dimension; 4] = [
    Dimension::square(100),
    Dimension::square(200),
    Dimension::square(300),
    Dimension::square(400),
];

const WEBP_MIME: &str = "image/webp";

#[derive(Debug, Clone)]
pub struct ViewerRewrite {
    allowed: Vec<Dimension>,
    fallback: Dimension,
    variance_percent: u32,
    query_param: String,
}

impl Default for ViewerRewrite {
    fn default() -> Self {
        Self {
            allowed: DEFAULT_ALLOWED.to_vec(),
            fallback: Dimension::square(200),
            variance_percent: 20,
            query_param: "d".to_string(),
        }
    }
}

impl ViewerRewrite {
    pub fn new(allowed: Vec<Dimension>, fallback: Dimension, variance_percent: u32) -> Self {
        Self {
            allowed,
            fallback,
            variance_percent,
            ..Self::default()
        }
    }

    pub fn with_query_param(mut self, name: impl Into<String>) -> Self {
        self.query_param = name.into();
        self
    }

    /// 書き換え後のパスを返す。書き換えない場合は `None`
    pub fn rewrite(&self, uri: &str, query: &str, accept: Option<&str>) -> Option<String> {
        let requested = self.requested_dimension(query)?;
        let dimension = self.snap(requested);

        let (prefix, file) = uri.rsplit_once('/')?;
        if file.is_empty() {
            return None;
        }

        let format = if accepts_webp(accept) {
            "webp"
        } else {
            let (_, extension) = file.rsplit_once('.')?;
            if extension.is_empty() {
                return None;
            }
            extension
        };

        let rewritten = format!(
            "{prefix}/{}x{}/{format}/{file}",
            dimension.width, dimension.height
        );
        tracing::debug!(uri = %uri, rewritten = %rewritten, "rewrote viewer request");
        Some(rewritten)
    }

    /// `d=WxH` を読む。不正な値は書き換えなし
    fn requested_dimension(&self, query: &str) -> Option<Dimension> {
        let query = query.strip_prefix('?').unwrap_or(query);
        let value = url::form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == self.query_param.as_str())
            .map(|(_, v)| v.into_owned())?;

        let (width, height) = value.split_once('x')?;
        Some(Dimension {
            width: width.trim().parse().ok()?,
            height: height.trim().parse().ok()?,
        })
    }

    /// 許容誤差内の最初の許可寸法に丸める。どれにも入らなければフォールバック
    fn snap(&self, requested: Dimension) -> Dimension {
        self.allowed
            .iter()
            .copied()
            .find(|allowed| {
                let tolerance = allowed.width as u64 * self.variance_percent as u64 / 100;
                (requested.width as u64).abs_diff(allowed.width as u64) <= tolerance
            })
            .unwrap_or(self.fallback)
    }
}

fn accepts_webp(accept: Option<&str>) -> bool {
    accept.is_some_and(|accept| {
        accept
            .split(',')
            .filter_map(|part| part.split(';').next())
            .any(|mime| mime.trim().eq_ignore_ascii_case(WEBP_MIME))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_with_webp_support() {
        let rewritten = ViewerRewrite::default().rewrite(
            "/alexandria/user/photo.jpg",
            "d=200x200",
            Some("image/avif,image/webp,*/*;q=0.8"),
        );
        assert_eq!(
            rewritten.as_deref(),
            Some("/alexandria/user/200x200/webp/photo.jpg")
        );
    }

    #[test]
    fn test_rewrite_keeps_extension_without_webp() {
        let rewritten =
            ViewerRewrite::default().rewrite("/alexandria/media/cover/42.png", "d=300x300", None);
        assert_eq!(
            rewritten.as_deref(),
            Some("/alexandria/media/cover/300x300/png/42.png")
        );
    }

    #[test]
    fn test_rewrite_snaps_within_variance() {
        let rewriter = ViewerRewrite::default();
        assert_eq!(
            rewriter.rewrite("/u/a.jpg", "d=385x390", None).as_deref(),
            Some("/u/400x400/jpg/a.jpg")
        );
        assert_eq!(
            rewriter.rewrite("/u/a.jpg", "d=90x90", None).as_deref(),
            Some("/u/100x100/jpg/a.jpg")
        );
    }

    #[test]
    fn test_rewrite_falls_back_to_default() {
        let rewritten = ViewerRewrite::default().rewrite("/u/a.jpg", "d=1280x720", None);
        assert_eq!(rewritten.as_deref(), Some("/u/200x200/jpg/a.jpg"));
    }

    #[test]
    fn test_no_rewrite_without_dimension() {
        let rewriter = ViewerRewrite::default();
        assert_eq!(rewriter.rewrite("/u/a.jpg", "", None), None);
        assert_eq!(rewriter.rewrite("/u/a.jpg", "d=big", None), None);
        assert_eq!(rewriter.rewrite("/u/a.jpg", "d=100", None), None);
    }

    #[test]
    fn test_no_rewrite_without_format() {
        assert_eq!(
            ViewerRewrite::default().rewrite("/u/photo", "d=100x100", None),
            None
        );
    }

    #[test]
    fn test_rewritten_path_parses() {
        let rewritten = ViewerRewrite::default()
            .rewrite("/alexandria/ad/7.jpg", "d=100x100", None)
            .unwrap();
        let request = crate::key::parse(&rewritten).unwrap();
        assert_eq!(request.original_key, "alexandria/ad/7.jpg");
        assert_eq!(request.format, "jpeg");
    }

    #[test]
    fn test_custom_dimensions() {
        let rewriter = ViewerRewrite::new(vec![Dimension { width: 640, height: 360 }], Dimension::square(64), 10)
            .with_query_param("size");
        assert_eq!(
            rewriter.rewrite("/v/a.png", "size=600x300", None).as_deref(),
            Some("/v/640x360/png/a.png")
        );
        assert_eq!(
            rewriter.rewrite("/v/a.png", "size=500x300", None).as_deref(),
            Some("/v/64x64/png/a.png")
        );
    }
}
