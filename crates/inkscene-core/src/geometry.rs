//! Geometry helpers on top of kurbo.
//!
//! Points, rects and transforms are plain kurbo values. This module adds the
//! few value types and pure functions the engine needs beyond kurbo: a
//! rotation with an explicit pivot, angle normalization and decomposition,
//! and the aspect-ratio fit used by raster nodes.

use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// A rotation in degrees around an explicit pivot.
///
/// Positive angles rotate clockwise on screen (y grows downwards).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    /// Rotation angle in degrees.
    pub degrees: f64,
    /// Pivot in the local coordinates of the rotated node.
    pub center: Point,
}

impl Rotation {
    /// Create a rotation about `center`.
    pub fn new(degrees: f64, center: Point) -> Self {
        Self { degrees, center }
    }

    /// Create a rotation about the center of `rect`.
    pub fn about_rect(degrees: f64, rect: Rect) -> Self {
        Self::new(degrees, rect.center())
    }

    /// Whether this rotation leaves every point in place.
    pub fn is_identity(&self) -> bool {
        normalize_degrees(self.degrees).abs() < 1e-9
    }

    /// The equivalent affine transform.
    pub fn to_affine(&self) -> Affine {
        if self.is_identity() {
            return Affine::IDENTITY;
        }
        Affine::rotate_about(self.degrees.to_radians(), self.center)
    }
}

impl Default for Rotation {
    fn default() -> Self {
        Self::new(0.0, Point::ZERO)
    }
}

/// Normalize an angle in degrees into `[0, 360)`.
///
/// Non-finite input is returned unchanged so callers can detect it.
pub fn normalize_degrees(degrees: f64) -> f64 {
    if !degrees.is_finite() {
        return degrees;
    }
    let normalized = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if normalized >= 360.0 { 0.0 } else { normalized }
}

/// Extract the rotation component of an affine transform, in degrees.
///
/// Uses the image of the x axis, so uniform and non-uniform scales and
/// translations do not contribute.
pub fn rotation_degrees(transform: Affine) -> f64 {
    let [a, b, _, _, _, _] = transform.as_coeffs();
    b.atan2(a).to_degrees()
}

/// Fit content of `natural` size into `bounds`.
///
/// With `preserve_aspect` the content is scaled uniformly to fit inside
/// `bounds` and centered on both axes. Without it the content stretches to
/// fill `bounds`. Degenerate natural sizes fall back to `bounds`.
pub fn fit_rect(bounds: Rect, natural: Size, preserve_aspect: bool) -> Rect {
    if !preserve_aspect || natural.width <= 0.0 || natural.height <= 0.0 {
        return bounds;
    }
    let scale = (bounds.width() / natural.width).min(bounds.height() / natural.height);
    let size = Size::new(natural.width * scale, natural.height * scale);
    let origin = Point::new(
        bounds.x0 + (bounds.width() - size.width) / 2.0,
        bounds.y0 + (bounds.height() - size.height) / 2.0,
    );
    Rect::from_origin_size(origin, size)
}

/// Distance from a point to a line segment (a→b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = Vec2::new(b.x - a.x, b.y - a.y);
    let pv = Vec2::new(point.x - a.x, point.y - a.y);
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = Point::new(a.x + t * seg.x, a.y + t * seg.y);
    ((point.x - proj.x).powi(2) + (point.y - proj.y).powi(2)).sqrt()
}

/// Shrink `rect` by `amount` on every side, never past a zero size.
pub fn deflate(rect: Rect, amount: f64) -> Rect {
    if amount <= 0.0 || !amount.is_finite() {
        return rect;
    }
    let dx = amount.min(rect.width() / 2.0);
    let dy = amount.min(rect.height() / 2.0);
    Rect::new(rect.x0 + dx, rect.y0 + dy, rect.x1 - dx, rect.y1 - dy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_degrees() {
        assert!((normalize_degrees(370.0) - 10.0).abs() < 1e-9);
        assert!((normalize_degrees(-90.0) - 270.0).abs() < 1e-9);
        assert!(normalize_degrees(360.0).abs() < 1e-9);
        assert!(normalize_degrees(f64::NAN).is_nan());
    }

    #[test]
    fn test_rotation_degrees_ignores_scale_and_translation() {
        let t = Affine::translate((40.0, -3.0))
            * Affine::scale(2.5)
            * Affine::rotate(30f64.to_radians());
        assert!((rotation_degrees(t) - 30.0).abs() < 1e-9);
        assert!(rotation_degrees(Affine::IDENTITY).abs() < 1e-9);
    }

    #[test]
    fn test_rotation_to_affine_keeps_pivot() {
        let rotation = Rotation::new(90.0, Point::new(5.0, 5.0));
        let moved = rotation.to_affine() * Point::new(5.0, 5.0);
        assert!((moved.x - 5.0).abs() < 1e-9);
        assert!((moved.y - 5.0).abs() < 1e-9);

        let corner = rotation.to_affine() * Point::new(10.0, 5.0);
        assert!((corner.x - 5.0).abs() < 1e-9);
        assert!((corner.y - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_rect_preserves_aspect() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 50.0);
        let fitted = fit_rect(bounds, Size::new(20.0, 20.0), true);
        assert_eq!(fitted, Rect::new(25.0, 0.0, 75.0, 50.0));

        let stretched = fit_rect(bounds, Size::new(20.0, 20.0), false);
        assert_eq!(stretched, bounds);
    }

    #[test]
    fn test_deflate_clamps() {
        let rect = Rect::new(0.0, 0.0, 10.0, 4.0);
        assert_eq!(deflate(rect, 1.0), Rect::new(1.0, 1.0, 9.0, 3.0));
        let collapsed = deflate(rect, 5.0);
        assert!((collapsed.height()).abs() < 1e-9);
    }

    #[test]
    fn test_point_to_segment_dist() {
        let d = point_to_segment_dist(Point::new(5.0, 3.0), Point::ZERO, Point::new(10.0, 0.0));
        assert!((d - 3.0).abs() < 1e-9);
        let end = point_to_segment_dist(Point::new(13.0, 4.0), Point::ZERO, Point::new(10.0, 0.0));
        assert!((end - 5.0).abs() < 1e-9);
    }
}
