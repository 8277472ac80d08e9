//! Engine objects: typed handles over single scene nodes.
//!
//! Mutators only record values. A changed value marks the object dirty and
//! the backend is written once, by [`EngineObject::invalidate`], no matter
//! how many mutations happened in between.

use inkscene_core::{
    LineCap, LineJoin, PropKey, PropValue, PropertyBag, RichText, Rgba, Rotation, StrokeStyle,
    TextAlign, TextDecoration, VerticalAlign,
};
use inkscene_core::text::{DEFAULT_FONT_FAMILY, DEFAULT_FONT_SIZE};
use inkscene_render::{NodeId, NodeKind, RenderResult, SceneBackend};
use kurbo::{Point, Rect};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Identifier of an engine object, unique within one engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub(crate) u64);

impl ObjectId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// What an engine object draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Rect,
    Ellipse,
    Line,
    Text,
    Item,
}

impl ObjectKind {
    /// Scene node kind backing this object.
    pub fn node_kind(self) -> NodeKind {
        match self {
            ObjectKind::Rect => NodeKind::Rect,
            ObjectKind::Ellipse => NodeKind::Ellipse,
            ObjectKind::Line => NodeKind::Path,
            ObjectKind::Text => NodeKind::Text,
            ObjectKind::Item => NodeKind::Group,
        }
    }
}

/// Type-level object kinds used by [`Handle`] and [`EngineObject`].
pub mod marker {
    pub enum Rect {}
    pub enum Ellipse {}
    pub enum Line {}
    pub enum Text {}
    pub enum Item {}
}

/// Links a marker type to its [`ObjectKind`].
pub trait KindMarker: 'static {
    const KIND: ObjectKind;
}

impl KindMarker for marker::Rect {
    const KIND: ObjectKind = ObjectKind::Rect;
}
impl KindMarker for marker::Ellipse {
    const KIND: ObjectKind = ObjectKind::Ellipse;
}
impl KindMarker for marker::Line {
    const KIND: ObjectKind = ObjectKind::Line;
}
impl KindMarker for marker::Text {
    const KIND: ObjectKind = ObjectKind::Text;
}
impl KindMarker for marker::Item {
    const KIND: ObjectKind = ObjectKind::Item;
}

/// Typed handle to an engine object.
pub struct Handle<K> {
    id: ObjectId,
    _kind: PhantomData<fn() -> K>,
}

pub type RectHandle = Handle<marker::Rect>;
pub type EllipseHandle = Handle<marker::Ellipse>;
pub type LineHandle = Handle<marker::Line>;
pub type TextHandle = Handle<marker::Text>;
pub type ItemHandle = Handle<marker::Item>;

impl<K> Handle<K> {
    pub(crate) fn new(id: ObjectId) -> Self {
        Self {
            id,
            _kind: PhantomData,
        }
    }

    pub fn id(self) -> ObjectId {
        self.id
    }
}

impl<K> Clone for Handle<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for Handle<K> {}

impl<K> PartialEq for Handle<K> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<K> Eq for Handle<K> {}

impl<K> Hash for Handle<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<K: KindMarker> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}Handle({})", K::KIND, self.id.0)
    }
}

impl<K> From<Handle<K>> for ObjectId {
    fn from(handle: Handle<K>) -> Self {
        handle.id
    }
}

/// Recorded properties of a primitive object and its dirty flag.
#[derive(Debug)]
pub(crate) struct ObjectCore {
    node: NodeId,
    props: PropertyBag,
    dirty: bool,
}

impl ObjectCore {
    /// A new object starts dirty so its first invalidate writes the defaults.
    pub(crate) fn new(node: NodeId, kind: ObjectKind) -> Self {
        Self {
            node,
            props: default_props(kind),
            dirty: true,
        }
    }

    pub(crate) fn node(&self) -> NodeId {
        self.node
    }

    pub(crate) fn get(&self, key: PropKey) -> Option<&PropValue> {
        self.props.get(key)
    }

    /// Record `value`. Returns false, leaving the object untouched, when it
    /// equals the recorded value.
    pub(crate) fn set(&mut self, key: PropKey, value: PropValue) -> bool {
        if self.props.get(key) == Some(&value) {
            return false;
        }
        self.props.set(key, value);
        self.dirty = true;
        true
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write the recorded properties if anything changed since the last
    /// write. Returns whether the backend was touched.
    pub(crate) fn invalidate(&mut self, backend: &mut dyn SceneBackend) -> RenderResult<bool> {
        if !self.dirty {
            return Ok(false);
        }
        backend.apply_properties(self.node, self.props.clone())?;
        self.dirty = false;
        Ok(true)
    }
}

fn default_props(kind: ObjectKind) -> PropertyBag {
    let base = PropertyBag::new()
        .with(PropKey::Bounds, PropValue::Rect(Rect::ZERO))
        .with(PropKey::Opacity, PropValue::Number(1.0));
    match kind {
        ObjectKind::Rect | ObjectKind::Ellipse | ObjectKind::Line => base
            .with(PropKey::Fill, PropValue::Color(Rgba::TRANSPARENT))
            .with(PropKey::StrokeColor, PropValue::Color(Rgba::BLACK))
            .with(PropKey::StrokeWidth, PropValue::Number(1.0))
            .with(PropKey::StrokeStyle, PropValue::Dash(StrokeStyle::Solid))
            .with(PropKey::LineCap, PropValue::Cap(LineCap::Butt))
            .with(PropKey::LineJoin, PropValue::Join(LineJoin::Miter)),
        ObjectKind::Text => base
            .with(PropKey::Text, PropValue::Text(RichText::default()))
            .with(PropKey::Fill, PropValue::Color(Rgba::BLACK))
            .with(PropKey::TextAlign, PropValue::Align(TextAlign::Left))
            .with(PropKey::VerticalAlign, PropValue::VAlign(VerticalAlign::Top))
            .with(PropKey::TextDecoration, PropValue::Decoration(TextDecoration::None))
            .with(PropKey::Markdown, PropValue::Bool(false))
            .with(PropKey::FontFamily, PropValue::Str(DEFAULT_FONT_FAMILY.to_string()))
            .with(PropKey::FontSize, PropValue::Number(DEFAULT_FONT_SIZE)),
        ObjectKind::Item => PropertyBag::new(),
    }
}

/// Mutation guard over one primitive engine object.
pub struct EngineObject<'e, K> {
    id: ObjectId,
    core: &'e mut ObjectCore,
    backend: &'e mut dyn SceneBackend,
    _kind: PhantomData<fn() -> K>,
}

pub type EngineRect<'e> = EngineObject<'e, marker::Rect>;
pub type EngineEllipse<'e> = EngineObject<'e, marker::Ellipse>;
pub type EngineLine<'e> = EngineObject<'e, marker::Line>;
pub type EngineText<'e> = EngineObject<'e, marker::Text>;

impl<'e, K> EngineObject<'e, K> {
    pub(crate) fn new(
        id: ObjectId,
        core: &'e mut ObjectCore,
        backend: &'e mut dyn SceneBackend,
    ) -> Self {
        Self {
            id,
            core,
            backend,
            _kind: PhantomData,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Scene node drawing this object.
    pub fn node(&self) -> NodeId {
        self.core.node()
    }

    pub fn is_dirty(&self) -> bool {
        self.core.is_dirty()
    }

    /// Write pending changes to the backend. Returns whether anything was
    /// written.
    pub fn invalidate(&mut self) -> RenderResult<bool> {
        self.core.invalidate(&mut *self.backend)
    }

    pub fn bounds(&self) -> Rect {
        self.core
            .get(PropKey::Bounds)
            .and_then(PropValue::as_rect)
            .unwrap_or(Rect::ZERO)
    }

    /// Fill color; the text color for text objects.
    pub fn fill(&mut self, color: Rgba) -> &mut Self {
        self.core.set(PropKey::Fill, PropValue::Color(color));
        self
    }

    pub fn fill_color(&self) -> Option<Rgba> {
        self.core.get(PropKey::Fill).and_then(PropValue::as_color)
    }

    pub fn opacity(&mut self, opacity: f64) -> &mut Self {
        self.core
            .set(PropKey::Opacity, PropValue::Number(opacity.clamp(0.0, 1.0)));
        self
    }

    pub fn rotation(&mut self, rotation: Rotation) -> &mut Self {
        self.core.set(PropKey::Rotation, PropValue::Rotation(rotation));
        self
    }

    /// Show or hide the node right away.
    pub fn set_visible(&mut self, visible: bool) {
        self.backend.set_visible(self.core.node(), visible);
    }
}

/// Stroke mutators shared by rects, ellipses and lines.
macro_rules! stroke_mutators {
    ($($marker:ty),*) => {$(
        impl EngineObject<'_, $marker> {
            pub fn stroke_color(&mut self, color: Rgba) -> &mut Self {
                self.core.set(PropKey::StrokeColor, PropValue::Color(color));
                self
            }

            pub fn stroke_width(&mut self, width: f64) -> &mut Self {
                self.core.set(PropKey::StrokeWidth, PropValue::Number(width.max(0.0)));
                self
            }

            pub fn stroke_style(&mut self, style: StrokeStyle) -> &mut Self {
                self.core.set(PropKey::StrokeStyle, PropValue::Dash(style));
                self
            }

            pub fn line_cap(&mut self, cap: LineCap) -> &mut Self {
                self.core.set(PropKey::LineCap, PropValue::Cap(cap));
                self
            }

            pub fn line_join(&mut self, join: LineJoin) -> &mut Self {
                self.core.set(PropKey::LineJoin, PropValue::Join(join));
                self
            }
        }
    )*};
}

stroke_mutators!(marker::Rect, marker::Ellipse, marker::Line);

impl EngineRect<'_> {
    pub fn plot(&mut self, bounds: Rect) -> &mut Self {
        self.core.set(PropKey::Bounds, PropValue::Rect(bounds));
        self
    }

    pub fn corner_radius(&mut self, radius: f64) -> &mut Self {
        self.core.set(PropKey::CornerRadius, PropValue::Number(radius.max(0.0)));
        self
    }
}

impl EngineEllipse<'_> {
    /// Ellipse inscribed in `bounds`.
    pub fn plot(&mut self, bounds: Rect) -> &mut Self {
        self.core.set(PropKey::Bounds, PropValue::Rect(bounds));
        self
    }

    pub fn circle(&mut self, center: Point, radius: f64) -> &mut Self {
        let r = radius.abs();
        self.plot(Rect::new(center.x - r, center.y - r, center.x + r, center.y + r))
    }
}

impl EngineLine<'_> {
    /// Straight segment from `start` to `end`.
    pub fn plot(&mut self, start: Point, end: Point) -> &mut Self {
        let data = format!("M {} {} L {} {}", start.x, start.y, end.x, end.y);
        self.core.set(PropKey::PathData, PropValue::Str(data));
        self.core
            .set(PropKey::Bounds, PropValue::Rect(Rect::from_points(start, end)));
        self
    }
}

impl EngineText<'_> {
    /// Plain text.
    pub fn text(&mut self, text: &str) -> &mut Self {
        self.core.set(PropKey::Markdown, PropValue::Bool(false));
        self.core
            .set(PropKey::Text, PropValue::Text(RichText::plain(text)));
        self
    }

    /// Text with the markdown subset interpreted.
    pub fn markdown(&mut self, text: &str) -> &mut Self {
        self.core.set(PropKey::Markdown, PropValue::Bool(true));
        self.core
            .set(PropKey::Text, PropValue::Text(RichText::parse(text, true)));
        self
    }

    pub fn plot(&mut self, bounds: Rect) -> &mut Self {
        self.core.set(PropKey::Bounds, PropValue::Rect(bounds));
        self
    }

    pub fn font_family(&mut self, family: &str) -> &mut Self {
        self.core
            .set(PropKey::FontFamily, PropValue::Str(family.to_string()));
        self
    }

    pub fn font_size(&mut self, size: f64) -> &mut Self {
        if size.is_finite() && size > 0.0 {
            self.core.set(PropKey::FontSize, PropValue::Number(size));
        }
        self
    }

    pub fn align(&mut self, align: TextAlign) -> &mut Self {
        self.core.set(PropKey::TextAlign, PropValue::Align(align));
        self
    }

    pub fn vertical_align(&mut self, align: VerticalAlign) -> &mut Self {
        self.core.set(PropKey::VerticalAlign, PropValue::VAlign(align));
        self
    }

    pub fn decoration(&mut self, decoration: TextDecoration) -> &mut Self {
        self.core
            .set(PropKey::TextDecoration, PropValue::Decoration(decoration));
        self
    }
}
