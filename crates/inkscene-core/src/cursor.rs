//! Cursor kinds and the rotation-aware resize cursor rule.

use crate::geometry::normalize_degrees;
use serde::{Deserialize, Serialize};
use winit::window::CursorIcon;

/// Cursor shown over the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Cursor {
    #[default]
    Default,
    Pointer,
    Move,
    Text,
    /// Resize without a known direction.
    Resize,
    EResize,
    NeResize,
    NResize,
    NwResize,
    WResize,
    SwResize,
    SResize,
    SeResize,
}

/// Directional resize cursors, indexed by bucket. Bucket `i` is centered on
/// `i * 45` degrees, counter-clockwise from east.
const BUCKETS: [Cursor; 8] = [
    Cursor::EResize,
    Cursor::NeResize,
    Cursor::NResize,
    Cursor::NwResize,
    Cursor::WResize,
    Cursor::SwResize,
    Cursor::SResize,
    Cursor::SeResize,
];

impl Cursor {
    /// Resize cursor for a handle pointing at `degrees`.
    ///
    /// The angle is normalized into `[0, 360)` and matched against eight
    /// 45°-wide buckets centered on 0, 45, ..., 315. Angles that cannot be
    /// normalized give the generic [`Cursor::Resize`].
    pub fn for_angle(degrees: f64) -> Cursor {
        let angle = normalize_degrees(degrees);
        if !angle.is_finite() {
            return Cursor::Resize;
        }
        let bucket = ((angle + 22.5) / 45.0).floor() as usize % BUCKETS.len();
        BUCKETS[bucket]
    }

    /// CSS cursor keyword.
    pub fn css_name(self) -> &'static str {
        match self {
            Cursor::Default => "default",
            Cursor::Pointer => "pointer",
            Cursor::Move => "move",
            Cursor::Text => "text",
            Cursor::Resize => "all-scroll",
            Cursor::EResize => "e-resize",
            Cursor::NeResize => "ne-resize",
            Cursor::NResize => "n-resize",
            Cursor::NwResize => "nw-resize",
            Cursor::WResize => "w-resize",
            Cursor::SwResize => "sw-resize",
            Cursor::SResize => "s-resize",
            Cursor::SeResize => "se-resize",
        }
    }

    pub fn is_resize(self) -> bool {
        self == Cursor::Resize || BUCKETS.contains(&self)
    }
}

impl From<Cursor> for CursorIcon {
    fn from(cursor: Cursor) -> Self {
        match cursor {
            Cursor::Default => CursorIcon::Default,
            Cursor::Pointer => CursorIcon::Pointer,
            Cursor::Move => CursorIcon::Move,
            Cursor::Text => CursorIcon::Text,
            Cursor::Resize => CursorIcon::AllScroll,
            Cursor::EResize => CursorIcon::EResize,
            Cursor::NeResize => CursorIcon::NeResize,
            Cursor::NResize => CursorIcon::NResize,
            Cursor::NwResize => CursorIcon::NwResize,
            Cursor::WResize => CursorIcon::WResize,
            Cursor::SwResize => CursorIcon::SwResize,
            Cursor::SResize => CursorIcon::SResize,
            Cursor::SeResize => CursorIcon::SeResize,
        }
    }
}
