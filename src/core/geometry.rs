use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn max_x(&self) -> f32 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f32 {
        self.y + self.height
    }

    /// Finite and with positive width and height.
    pub fn is_valid(&self) -> bool {
        [self.x, self.y, self.width, self.height].iter().all(|v| v.is_finite())
            && self.width > 0.0
            && self.height > 0.0
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// 2D affine map: `x' = a*x + c*y + tx`, `y' = b*x + d*y + ty`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub tx: f64,
    pub ty: f64,
}

impl AffineTransform {
    pub const IDENTITY: AffineTransform = AffineTransform {
        a: 1.0, b: 0.0, c: 0.0, d: 1.0, tx: 0.0, ty: 0.0,
    };

    pub fn scale_translate(scale: f64, tx: f64, ty: f64) -> Self {
        Self { a: scale, b: 0.0, c: 0.0, d: scale, tx, ty }
    }

    /// Maps an image of `image_size` into a square working frame of side
    /// `working_size`: uniform scale-to-fit on the longer side, centred.
    ///
    /// Returns `None` for non-finite or non-positive image sizes, or a zero
    /// working size.
    pub fn letterbox(image_size: Size, working_size: u32) -> Option<Self> {
        let (w, h) = (image_size.width as f64, image_size.height as f64);
        if !w.is_finite() || !h.is_finite() || w <= 0.0 || h <= 0.0 || working_size == 0 {
            return None;
        }

        let side = working_size as f64;
        let scale = side / w.max(h);
        let tx = (side - w * scale) / 2.0;
        let ty = (side - h * scale) / 2.0;
        Some(Self::scale_translate(scale, tx, ty))
    }

    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    pub fn inverted(&self) -> Option<Self> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }

        let a = self.d / det;
        let b = -self.b / det;
        let c = -self.c / det;
        let d = self.a / det;
        Some(Self {
            a,
            b,
            c,
            d,
            tx: -(a * self.tx + c * self.ty),
            ty: -(b * self.tx + d * self.ty),
        })
    }

    /// `self` followed by `other`.
    pub fn concat(&self, other: &AffineTransform) -> Self {
        Self {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            tx: self.tx * other.a + self.ty * other.c + other.tx,
            ty: self.tx * other.b + self.ty * other.d + other.ty,
        }
    }

    pub fn apply_to_point(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.tx,
            self.b * x + self.d * y + self.ty,
        )
    }

    /// Transforms the four corners and returns their axis-aligned bounding box.
    pub fn apply_to_rect(&self, rect: &Rect) -> Rect {
        let (x0, y0) = (rect.x as f64, rect.y as f64);
        let (x1, y1) = (rect.max_x() as f64, rect.max_y() as f64);
        let corners = [
            self.apply_to_point(x0, y0),
            self.apply_to_point(x1, y0),
            self.apply_to_point(x0, y1),
            self.apply_to_point(x1, y1),
        ];

        let min_x = corners.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
        let max_x = corners.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
        let min_y = corners.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
        let max_y = corners.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);

        Rect {
            x: min_x as f32,
            y: min_y as f32,
            width: (max_x - min_x) as f32,
            height: (max_y - min_y) as f32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_rect_close(actual: &Rect, expected: &Rect) {
        let scale = expected.width.abs().max(expected.height.abs()).max(1.0);
        for (a, e) in [
            (actual.x, expected.x),
            (actual.y, expected.y),
            (actual.width, expected.width),
            (actual.height, expected.height),
        ] {
            assert!(
                (a - e).abs() <= 1e-3 * scale.max(e.abs()),
                "{:?} != {:?}", actual, expected
            );
        }
    }

    #[test]
    fn landscape_image_is_centred_vertically() {
        let t = AffineTransform::letterbox(Size::new(1280.0, 720.0), 640).unwrap();
        let placed = t.apply_to_rect(&Rect::new(0.0, 0.0, 1280.0, 720.0));
        assert_rect_close(&placed, &Rect::new(0.0, 140.0, 640.0, 360.0));
    }

    #[test]
    fn portrait_image_is_centred_horizontally() {
        let t = AffineTransform::letterbox(Size::new(3024.0, 4032.0), 640).unwrap();
        let placed = t.apply_to_rect(&Rect::new(0.0, 0.0, 3024.0, 4032.0));
        assert_rect_close(&placed, &Rect::new(80.0, 0.0, 480.0, 640.0));
    }

    #[test]
    fn upscales_small_images() {
        let t = AffineTransform::letterbox(Size::new(320.0, 320.0), 640).unwrap();
        assert_eq!(t.a, 2.0);
        assert_eq!(t.tx, 0.0);
        assert_eq!(t.ty, 0.0);
    }

    #[test]
    fn degenerate_sizes_have_no_transform() {
        assert!(AffineTransform::letterbox(Size::new(0.0, 100.0), 640).is_none());
        assert!(AffineTransform::letterbox(Size::new(100.0, f32::NAN), 640).is_none());
        assert!(AffineTransform::letterbox(Size::new(100.0, 100.0), 0).is_none());
    }

    #[test]
    fn forward_then_inverse_round_trips() {
        let sizes = [(1.0, 1.0), (640.0, 480.0), (480.0, 640.0), (4032.0, 3024.0), (7.0, 9000.0)];
        let frames = [1, 224, 640, 1024];
        for &(w, h) in &sizes {
            for &frame in &frames {
                let t = AffineTransform::letterbox(Size::new(w, h), frame).unwrap();
                let inv = t.inverted().unwrap();
                let roi = Rect::new(w * 0.25, h * 0.3, w * 0.4, h * 0.5);
                let back = inv.apply_to_rect(&t.apply_to_rect(&roi));
                assert_rect_close(&back, &roi);
            }
        }
    }

    #[test]
    fn composed_with_inverse_is_identity() {
        let t = AffineTransform::letterbox(Size::new(1920.0, 1080.0), 640).unwrap();
        let id = t.concat(&t.inverted().unwrap());
        for (v, e) in [(id.a, 1.0), (id.b, 0.0), (id.c, 0.0), (id.d, 1.0), (id.tx, 0.0), (id.ty, 0.0)] {
            assert!((v - e).abs() < 1e-9);
        }
    }

    #[test]
    fn singular_transform_has_no_inverse() {
        assert!(AffineTransform::scale_translate(0.0, 1.0, 1.0).inverted().is_none());
    }

    #[test]
    fn identity_leaves_rect_unchanged() {
        let roi = Rect::new(10.0, 20.0, 30.0, 40.0);
        assert_eq!(AffineTransform::IDENTITY.apply_to_rect(&roi), roi);
    }
}
