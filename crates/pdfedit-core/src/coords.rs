//! Coordinate transformation between display and PDF coordinate systems
//!
//! Page-native rectangles (`PdfRect`) use a bottom-left origin in points.
//! Display rectangles (`ViewRect`) use a top-left origin in pixels at a zoom
//! scale. The two types never convert implicitly.

use serde::{Deserialize, Serialize};

/// Rectangle in page-native space (bottom-left origin, points)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PdfRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Rectangle in display space (top-left origin, pixels at `scale`)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ViewRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Position in unscaled top-left-origin points.
///
/// Text and signature annotations are anchored this way; `flip_y` turns the
/// anchor into a page-native lower-left corner once the box height is known.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl PdfRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn top(&self) -> f64 {
        self.y + self.height
    }

    /// Smallest rectangle containing both
    pub fn union(&self, other: &PdfRect) -> PdfRect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        PdfRect {
            x,
            y,
            width: self.right().max(other.right()) - x,
            height: self.top().max(other.top()) - y,
        }
    }

    pub fn intersects(&self, other: &PdfRect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.top()
            && other.y < self.top()
    }

    pub fn contains(&self, other: &PdfRect) -> bool {
        self.x <= other.x
            && self.y <= other.y
            && self.right() >= other.right()
            && self.top() >= other.top()
    }

    /// Convert to display space for a page of `page_height` points shown at `scale`
    pub fn to_view(&self, page_height: f64, scale: f64) -> ViewRect {
        ViewRect {
            x: self.x * scale,
            y: (page_height - self.y - self.height) * scale,
            width: self.width * scale,
            height: self.height * scale,
        }
    }
}

impl ViewRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Convert to page-native space for a page of `page_height` points shown at `scale`
    pub fn to_pdf(&self, page_height: f64, scale: f64) -> PdfRect {
        let width = self.width / scale;
        let height = self.height / scale;
        PdfRect {
            x: self.x / scale,
            y: page_height - self.y / scale - height,
            width,
            height,
        }
    }
}

/// Lower-left Y of a box of `box_height` whose top edge sits `top` points
/// below the top of a page of `page_height` points.
pub fn flip_y(top: f64, page_height: f64, box_height: f64) -> f64 {
    page_height - top - box_height
}

/// Convert a display-space point (pixels at `scale`) to unscaled top-origin points
pub fn view_point_to_position(x: f64, y: f64, scale: f64) -> Point {
    Point {
        x: x / scale,
        y: y / scale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_to_pdf_top_left_corner() {
        // Top-left of a letter page at 1x maps to the top edge in PDF space
        let view = ViewRect::new(0.0, 0.0, 100.0, 20.0);
        let pdf = view.to_pdf(792.0, 1.0);
        assert!((pdf.x - 0.0).abs() < 1e-9);
        assert!((pdf.y - 772.0).abs() < 1e-9);
        assert!((pdf.top() - 792.0).abs() < 1e-9);
    }

    #[test]
    fn test_view_to_pdf_applies_scale() {
        let view = ViewRect::new(150.0, 300.0, 75.0, 30.0);
        let pdf = view.to_pdf(792.0, 1.5);
        assert!((pdf.x - 100.0).abs() < 1e-9);
        assert!((pdf.width - 50.0).abs() < 1e-9);
        assert!((pdf.height - 20.0).abs() < 1e-9);
        // top edge 200pt below page top -> bottom edge at 792 - 200 - 20
        assert!((pdf.y - 572.0).abs() < 1e-9);
    }

    #[test]
    fn test_y_axis_flip() {
        let pdf = PdfRect::new(0.0, 100.0, 10.0, 10.0);
        let view = pdf.to_view(792.0, 1.0);
        assert_eq!(view.y, 682.0);
    }

    #[test]
    fn test_flip_y_matches_rect_conversion() {
        let view = ViewRect::new(10.0, 40.0, 120.0, 18.0);
        let pdf = view.to_pdf(842.0, 1.0);
        assert!((flip_y(40.0, 842.0, 18.0) - pdf.y).abs() < 1e-9);
    }

    #[test]
    fn test_union_and_intersection() {
        let a = PdfRect::new(0.0, 0.0, 10.0, 10.0);
        let b = PdfRect::new(5.0, 5.0, 10.0, 10.0);
        let u = a.union(&b);
        assert_eq!(u, PdfRect::new(0.0, 0.0, 15.0, 15.0));
        assert!(a.intersects(&b));
        assert!(u.contains(&a) && u.contains(&b));
        assert!(!a.intersects(&PdfRect::new(10.0, 0.0, 5.0, 5.0)));
    }

    #[test]
    fn test_view_point_to_position() {
        let p = view_point_to_position(300.0, 150.0, 2.0);
        assert_eq!(p, Point { x: 150.0, y: 75.0 });
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn dimension() -> impl Strategy<Value = f64> {
        1.0f64..2000.0
    }

    fn scale() -> impl Strategy<Value = f64> {
        0.25f64..5.0
    }

    fn percentage() -> impl Strategy<Value = f64> {
        0.0f64..=1.0
    }

    proptest! {
        /// Property: PDF -> view -> PDF returns the original rectangle
        #[test]
        fn roundtrip_pdf_to_view_to_pdf(
            page_h in dimension(),
            s in scale(),
            x_pct in percentage(),
            y_pct in percentage(),
            w in 0.0f64..500.0,
            h in 0.0f64..500.0,
        ) {
            let rect = PdfRect::new(x_pct * 1000.0, y_pct * page_h, w, h);
            let back = rect.to_view(page_h, s).to_pdf(page_h, s);

            let tolerance = 1e-6;
            prop_assert!((back.x - rect.x).abs() < tolerance);
            prop_assert!((back.y - rect.y).abs() < tolerance);
            prop_assert!((back.width - rect.width).abs() < tolerance);
            prop_assert!((back.height - rect.height).abs() < tolerance);
        }

        /// Property: view -> PDF -> view returns the original rectangle
        #[test]
        fn roundtrip_view_to_pdf_to_view(
            page_h in dimension(),
            s in scale(),
            x in 0.0f64..3000.0,
            y in 0.0f64..3000.0,
            w in 0.0f64..500.0,
            h in 0.0f64..500.0,
        ) {
            let rect = ViewRect::new(x, y, w, h);
            let back = rect.to_pdf(page_h, s).to_view(page_h, s);

            let tolerance = 1e-6;
            prop_assert!((back.x - rect.x).abs() < tolerance);
            prop_assert!((back.y - rect.y).abs() < tolerance);
            prop_assert!((back.width - rect.width).abs() < tolerance);
            prop_assert!((back.height - rect.height).abs() < tolerance);
        }

        /// Property: converting a rect preserves area up to the scale factor
        #[test]
        fn area_scales_quadratically(
            page_h in dimension(),
            s in scale(),
            w in 0.0f64..500.0,
            h in 0.0f64..500.0,
        ) {
            let rect = PdfRect::new(10.0, 10.0, w, h);
            let view = rect.to_view(page_h, s);
            let expected = w * h * s * s;
            prop_assert!((view.width * view.height - expected).abs() < 1e-6 * (1.0 + expected));
        }

        /// Property: the stored top-origin anchor and flip_y agree with rect conversion at 1x
        #[test]
        fn flip_y_agrees_with_view_rect(
            page_h in dimension(),
            top in 0.0f64..2000.0,
            h in 0.0f64..200.0,
        ) {
            let via_rect = ViewRect::new(0.0, top, 10.0, h).to_pdf(page_h, 1.0).y;
            prop_assert!((flip_y(top, page_h, h) - via_rect).abs() < 1e-9);
        }
    }
}
