//! Geometry helpers used by the backends' setters and hit tests.

use kurbo::{BezPath, Ellipse, ParamCurveNearest, Point, Rect, RoundedRect, RoundedRectRadii, Shape};

/// Extra reach, in local units, for hitting thin strokes.
pub const STROKE_HIT_TOLERANCE: f64 = 2.0;

/// Which side of a rectangle gets rounded corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundedSide {
    Left,
    Right,
    Top,
    Bottom,
}

impl RoundedSide {
    fn radii(self, r: f64) -> RoundedRectRadii {
        // top_left, top_right, bottom_right, bottom_left
        match self {
            RoundedSide::Left => RoundedRectRadii::new(r, 0.0, 0.0, r),
            RoundedSide::Right => RoundedRectRadii::new(0.0, r, r, 0.0),
            RoundedSide::Top => RoundedRectRadii::new(r, r, 0.0, 0.0),
            RoundedSide::Bottom => RoundedRectRadii::new(0.0, 0.0, r, r),
        }
    }
}

/// Corner radius clamped to what fits in `rect`.
pub fn clamp_radius(rect: Rect, radius: f64) -> f64 {
    if !radius.is_finite() || radius <= 0.0 {
        return 0.0;
    }
    radius.min(rect.width().abs() / 2.0).min(rect.height().abs() / 2.0)
}

/// SVG path data of `rect` with the corners on one `side` rounded.
pub fn rounded_side_path(rect: Rect, radius: f64, side: RoundedSide) -> String {
    let r = clamp_radius(rect, radius);
    RoundedRect::from_rect(rect, side.radii(r)).to_path(0.1).to_svg()
}

/// Parse SVG path data. Invalid data yields an empty path and a warning.
pub fn parse_path(data: &str) -> BezPath {
    if data.trim().is_empty() {
        return BezPath::new();
    }
    match BezPath::from_svg(data) {
        Ok(path) => path,
        Err(err) => {
            log::warn!("invalid path data {data:?}: {err}");
            BezPath::new()
        }
    }
}

/// Whether `p` falls inside a (rounded) rectangle or on its stroke.
pub fn rect_hit(bounds: Rect, radius: f64, stroke_width: f64, p: Point) -> bool {
    let reach = bounds.inflate(stroke_width / 2.0, stroke_width / 2.0);
    let r = clamp_radius(reach, radius);
    RoundedRect::from_rect(reach, r).contains(p)
}

/// Whether `p` falls inside the ellipse inscribed in `bounds` or on its stroke.
pub fn ellipse_hit(bounds: Rect, stroke_width: f64, p: Point) -> bool {
    let reach = bounds.inflate(stroke_width / 2.0, stroke_width / 2.0);
    Ellipse::from_rect(reach).contains(p)
}

/// Whether `p` falls inside a closed area of `path` or near one of its
/// segments.
pub fn path_hit(path: &BezPath, stroke_width: f64, p: Point) -> bool {
    if path.elements().is_empty() {
        return false;
    }
    if path.contains(p) {
        return true;
    }
    let reach = stroke_width / 2.0 + STROKE_HIT_TOLERANCE;
    let reach_sq = reach * reach;
    path.segments()
        .any(|seg| seg.nearest(p, 1e-3).distance_sq <= reach_sq)
}

/// Bounds of a path including half its stroke.
pub fn path_bounds(path: &BezPath, stroke_width: f64) -> Option<Rect> {
    if path.elements().is_empty() {
        return None;
    }
    let half = stroke_width / 2.0;
    Some(path.bounding_box().inflate(half, half))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_path_invalid_is_empty() {
        assert!(parse_path("M 0 0 L 10 10").elements().len() == 2);
        assert!(parse_path("this is not a path").elements().is_empty());
        assert!(parse_path("").elements().is_empty());
    }

    #[test]
    fn test_open_path_hit_near_stroke() {
        let line = parse_path("M 0 0 L 100 0");
        assert!(path_hit(&line, 2.0, Point::new(50.0, 2.5)));
        assert!(!path_hit(&line, 2.0, Point::new(50.0, 10.0)));
    }

    #[test]
    fn test_closed_path_hit_inside() {
        let square = parse_path("M 0 0 L 10 0 L 10 10 L 0 10 Z");
        assert!(path_hit(&square, 0.0, Point::new(5.0, 5.0)));
    }

    #[test]
    fn test_rounded_side_path_is_closed_shape() {
        let data = rounded_side_path(Rect::new(0.0, 0.0, 40.0, 20.0), 50.0, RoundedSide::Left);
        let path = parse_path(&data);
        assert!(path.contains(Point::new(20.0, 10.0)));
        // rounded corner clips the top-left point, square corner keeps top-right
        assert!(!path.contains(Point::new(0.5, 0.5)));
        assert!(path.contains(Point::new(39.5, 0.5)));
    }

    #[test]
    fn test_rect_and_ellipse_hit() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(rect_hit(r, 0.0, 0.0, Point::new(9.0, 9.0)));
        assert!(rect_hit(r, 0.0, 4.0, Point::new(11.0, 5.0)));
        assert!(!ellipse_hit(r, 0.0, Point::new(0.5, 0.5)));
        assert!(ellipse_hit(r, 0.0, Point::new(5.0, 5.0)));
    }
}
