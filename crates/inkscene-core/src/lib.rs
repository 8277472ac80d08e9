//! inkscene Core Library
//!
//! Backend-agnostic value types shared by every layer of the engine:
//! geometry and colors, the properties bag diffed by the reconciler,
//! draw props handed to shape plugins, text layout, the view camera,
//! the native input model and cursor kinds.

pub mod camera;
pub mod color;
pub mod cursor;
pub mod geometry;
pub mod input;
pub mod props;
pub mod style;
pub mod text;

pub use camera::Camera;
pub use color::Rgba;
pub use cursor::Cursor;
pub use geometry::{Rotation, fit_rect, normalize_degrees, point_to_segment_dist, rotation_degrees};
pub use input::{Gesture, InputState, KeyInput, Modifiers, MouseButton, NativeEvent, PointerInput};
pub use props::{LineCap, LineJoin, PropKey, PropValue, PropertyBag, StrokeStyle};
pub use style::{DrawProps, StyleSource};
pub use text::{
    RichText, TextAlign, TextBlock, TextCache, TextConfig, TextDecoration, TextLayout, TextSpan,
    VerticalAlign,
};
