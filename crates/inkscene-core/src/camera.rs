//! View camera: the pan/zoom transform between screen and content space.

use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Maps content coordinates to screen coordinates.
///
/// The engine writes [`Camera::transform`] onto its content container, and
/// pointer input goes through [`Camera::screen_to_content`] before hit testing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Translation applied after scaling, in screen pixels.
    pub offset: Vec2,
    /// Uniform scale, 1.0 means one content unit per pixel.
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            zoom: 1.0,
            min_zoom: 0.1,
            max_zoom: 10.0,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Camera with custom zoom limits. The limits are swapped if reversed.
    pub fn with_zoom_limits(min_zoom: f64, max_zoom: f64) -> Self {
        let (min_zoom, max_zoom) = if min_zoom <= max_zoom {
            (min_zoom, max_zoom)
        } else {
            (max_zoom, min_zoom)
        };
        Self {
            zoom: 1.0_f64.clamp(min_zoom, max_zoom),
            min_zoom,
            max_zoom,
            ..Self::default()
        }
    }

    /// Content to screen transform.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(self.zoom)
    }

    /// Screen to content transform.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.zoom) * Affine::translate(-self.offset)
    }

    pub fn screen_to_content(&self, screen: Point) -> Point {
        self.inverse_transform() * screen
    }

    pub fn content_to_screen(&self, content: Point) -> Point {
        self.transform() * content
    }

    /// Pan by a delta in screen pixels.
    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    /// Zoom by `factor`, keeping `screen_point` fixed on screen.
    ///
    /// Returns whether the zoom level changed.
    pub fn zoom_at(&mut self, screen_point: Point, factor: f64) -> bool {
        if !factor.is_finite() || factor <= 0.0 {
            return false;
        }
        let new_zoom = (self.zoom * factor).clamp(self.min_zoom, self.max_zoom);
        if (new_zoom - self.zoom).abs() < f64::EPSILON {
            return false;
        }
        let anchor = self.screen_to_content(screen_point);
        self.zoom = new_zoom;
        let moved = self.content_to_screen(anchor);
        self.offset += screen_point - moved;
        true
    }

    pub fn reset(&mut self) {
        self.offset = Vec2::ZERO;
        self.zoom = 1.0_f64.clamp(self.min_zoom, self.max_zoom);
    }

    /// Center `bounds` in a viewport of `viewport` size, leaving `padding`.
    pub fn fit_to_bounds(&mut self, bounds: Rect, viewport: Size, padding: f64) {
        if bounds.is_zero_area() {
            self.reset();
            return;
        }
        let avail = Size::new(
            (viewport.width - padding * 2.0).max(1.0),
            (viewport.height - padding * 2.0).max(1.0),
        );
        self.zoom = (avail.width / bounds.width())
            .min(avail.height / bounds.height())
            .clamp(self.min_zoom, self.max_zoom);
        let center = bounds.center();
        self.offset = Vec2::new(
            viewport.width / 2.0 - center.x * self.zoom,
            viewport.height / 2.0 - center.y * self.zoom,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_identity() {
        let camera = Camera::new();
        let p = Point::new(100.0, 200.0);
        assert_eq!(camera.screen_to_content(p), p);
        assert_eq!(camera.transform(), Affine::IDENTITY);
    }

    #[test]
    fn test_screen_to_content_with_offset_and_zoom() {
        let camera = Camera {
            offset: Vec2::new(50.0, 100.0),
            zoom: 2.0,
            ..Camera::default()
        };
        let content = camera.screen_to_content(Point::new(150.0, 300.0));
        assert!((content.x - 50.0).abs() < 1e-10);
        assert!((content.y - 100.0).abs() < 1e-10);
    }

    #[test]
    fn test_roundtrip_conversion() {
        let camera = Camera {
            offset: Vec2::new(30.0, -20.0),
            zoom: 1.5,
            ..Camera::default()
        };
        let original = Point::new(123.0, 456.0);
        let back = camera.content_to_screen(camera.screen_to_content(original));
        assert!((back.x - original.x).abs() < 1e-10);
        assert!((back.y - original.y).abs() < 1e-10);
    }

    #[test]
    fn test_zoom_at_keeps_anchor() {
        let mut camera = Camera::new();
        let anchor = Point::new(200.0, 100.0);
        let before = camera.screen_to_content(anchor);
        assert!(camera.zoom_at(anchor, 2.0));
        let after = camera.screen_to_content(anchor);
        assert!((before.x - after.x).abs() < 1e-10);
        assert!((before.y - after.y).abs() < 1e-10);
    }

    #[test]
    fn test_zoom_clamp() {
        let mut camera = Camera::with_zoom_limits(0.5, 4.0);
        camera.zoom_at(Point::ZERO, 0.001);
        assert!((camera.zoom - 0.5).abs() < f64::EPSILON);
        camera.zoom_at(Point::ZERO, 1000.0);
        assert!((camera.zoom - 4.0).abs() < f64::EPSILON);
        assert!(!camera.zoom_at(Point::ZERO, 2.0));
        assert!(!camera.zoom_at(Point::ZERO, f64::NAN));
    }

    #[test]
    fn test_fit_to_bounds_centers() {
        let mut camera = Camera::new();
        camera.fit_to_bounds(Rect::new(0.0, 0.0, 100.0, 50.0), Size::new(400.0, 400.0), 0.0);
        assert!((camera.zoom - 4.0).abs() < 1e-10);
        let center = camera.content_to_screen(Point::new(50.0, 25.0));
        assert!((center.x - 200.0).abs() < 1e-10);
        assert!((center.y - 200.0).abs() < 1e-10);
    }

    #[test]
    fn test_pan() {
        let mut camera = Camera::new();
        camera.pan(Vec2::new(10.0, 20.0));
        assert_eq!(camera.offset, Vec2::new(10.0, 20.0));
    }
}
