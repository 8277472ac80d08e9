//! The reconciling renderer.
//!
//! A [`Renderer`] is a write cursor over one container of a backend. Every
//! primitive draw call claims the node at the cursor: a node of the same kind
//! is reused, a node of another kind is destroyed and replaced in place, and
//! a missing node is created. Only properties that changed since the node's
//! last pass reach the backend's setters. [`Renderer::cleanup_all`] sheds
//! whatever the pass did not claim.
//!
//! In clipping mode a draw call binds the container's single mask slot and
//! does not advance the cursor. Binding a mask twice for the same container
//! during one renderer's lifetime is a programmer error and fails with
//! [`RenderError::DuplicateClip`] before touching the backend.

use crate::arena::NodeId;
use crate::backend::{NodeKind, SceneBackend};
use crate::error::{RenderError, RenderResult};
use crate::shapes::{RoundedSide, rounded_side_path};
use inkscene_core::geometry::deflate;
use inkscene_core::{
    Cursor, DrawProps, PropKey, PropValue, PropertyBag, RichText, TextCache, TextConfig,
};
use kurbo::Rect;
use std::collections::HashSet;

/// Write cursor over a backend's retained node tree.
pub struct Renderer<'a> {
    backend: &'a mut dyn SceneBackend,
    text_cache: Option<&'a mut TextCache>,
    container: NodeId,
    index: usize,
    clipping: bool,
    masks_set: HashSet<NodeId>,
}

impl<'a> Renderer<'a> {
    /// A renderer positioned at index 0 of the backend's root.
    pub fn new(backend: &'a mut dyn SceneBackend) -> Self {
        let container = backend.root();
        Self {
            backend,
            text_cache: None,
            container,
            index: 0,
            clipping: false,
            masks_set: HashSet::new(),
        }
    }

    /// Parse text through `cache` instead of on every call.
    pub fn with_text_cache(mut self, cache: &'a mut TextCache) -> Self {
        self.text_cache = Some(cache);
        self
    }

    pub fn backend(&self) -> &dyn SceneBackend {
        &*self.backend
    }

    pub fn backend_mut(&mut self) -> &mut dyn SceneBackend {
        &mut *self.backend
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_clipping(&self) -> bool {
        self.clipping
    }

    /// Point the cursor at `start` inside `container`.
    pub fn set_container(&mut self, container: NodeId, start: usize, clipping: bool) {
        self.container = container;
        self.index = start;
        self.clipping = clipping;
    }

    /// Tag a node with a literal cursor.
    pub fn set_cursor(&mut self, node: NodeId, cursor: Cursor) -> RenderResult<()> {
        let meta = self.backend.meta_mut(node).ok_or(RenderError::StaleNode(node))?;
        meta.cursor = Some(cursor);
        Ok(())
    }

    /// Tag a node with a resize direction, in degrees before rotation.
    pub fn set_cursor_angle(&mut self, node: NodeId, degrees: f64) -> RenderResult<()> {
        let meta = self.backend.meta_mut(node).ok_or(RenderError::StaleNode(node))?;
        meta.cursor_angle = Some(degrees);
        Ok(())
    }

    fn acquire(&mut self, kind: NodeKind) -> RenderResult<NodeId> {
        let container = self.container;
        match self.backend.kind(container) {
            None => return Err(RenderError::StaleNode(container)),
            Some(k) if !k.is_container() => return Err(RenderError::NotAContainer(container)),
            Some(_) => {}
        }

        if self.clipping {
            if self.masks_set.contains(&container) {
                return Err(RenderError::DuplicateClip(container));
            }
            let mask = match self.backend.mask(container) {
                Some(mask) if self.backend.kind(mask) == Some(kind) => mask,
                _ => {
                    let mask = self.backend.create(kind);
                    self.backend.set_mask(container, Some(mask))?;
                    mask
                }
            };
            self.masks_set.insert(container);
            return Ok(mask);
        }

        let node = match self.backend.child_at(container, self.index) {
            Some(existing) if self.backend.kind(existing) == Some(kind) => existing,
            Some(existing) => {
                log::trace!(
                    "{}: replacing {:?} at {:?}[{}] with a {}",
                    self.backend.backend_name(),
                    existing,
                    container,
                    self.index,
                    kind.name()
                );
                let node = self.backend.create(kind);
                self.backend.replace_child(container, self.index, node)?;
                node
            }
            None => {
                let node = self.backend.create(kind);
                self.backend.insert_child(container, self.index, node)?;
                node
            }
        };
        self.index += 1;
        Ok(node)
    }

    fn draw(&mut self, kind: NodeKind, bag: PropertyBag) -> RenderResult<NodeId> {
        let node = self.acquire(kind)?;
        self.backend.apply_properties(node, bag)?;
        Ok(node)
    }

    pub fn rectangle(
        &mut self,
        stroke_width: f64,
        corner_radius: f64,
        bounds: Rect,
        props: &DrawProps,
    ) -> RenderResult<NodeId> {
        let width = props.effective_stroke_width(stroke_width);
        let bag = shape_bag(width, props)
            .with(PropKey::Bounds, PropValue::Rect(deflate(bounds, width / 2.0)))
            .with(PropKey::CornerRadius, PropValue::Number(corner_radius.max(0.0)));
        self.draw(NodeKind::Rect, bag)
    }

    pub fn ellipse(&mut self, stroke_width: f64, bounds: Rect, props: &DrawProps) -> RenderResult<NodeId> {
        let width = props.effective_stroke_width(stroke_width);
        let bag = shape_bag(width, props).with(PropKey::Bounds, PropValue::Rect(bounds));
        self.draw(NodeKind::Ellipse, bag)
    }

    pub fn rounded_rectangle_left(
        &mut self,
        stroke_width: f64,
        radius: f64,
        bounds: Rect,
        props: &DrawProps,
    ) -> RenderResult<NodeId> {
        self.rounded_side(RoundedSide::Left, stroke_width, radius, bounds, props)
    }

    pub fn rounded_rectangle_right(
        &mut self,
        stroke_width: f64,
        radius: f64,
        bounds: Rect,
        props: &DrawProps,
    ) -> RenderResult<NodeId> {
        self.rounded_side(RoundedSide::Right, stroke_width, radius, bounds, props)
    }

    pub fn rounded_rectangle_top(
        &mut self,
        stroke_width: f64,
        radius: f64,
        bounds: Rect,
        props: &DrawProps,
    ) -> RenderResult<NodeId> {
        self.rounded_side(RoundedSide::Top, stroke_width, radius, bounds, props)
    }

    pub fn rounded_rectangle_bottom(
        &mut self,
        stroke_width: f64,
        radius: f64,
        bounds: Rect,
        props: &DrawProps,
    ) -> RenderResult<NodeId> {
        self.rounded_side(RoundedSide::Bottom, stroke_width, radius, bounds, props)
    }

    fn rounded_side(
        &mut self,
        side: RoundedSide,
        stroke_width: f64,
        radius: f64,
        bounds: Rect,
        props: &DrawProps,
    ) -> RenderResult<NodeId> {
        let width = props.effective_stroke_width(stroke_width);
        let data = rounded_side_path(deflate(bounds, width / 2.0), radius, side);
        let bag = shape_bag(width, props).with(PropKey::PathData, PropValue::Str(data));
        self.draw(NodeKind::Path, bag)
    }

    /// A path from SVG path data. Invalid data draws nothing.
    pub fn path(&mut self, stroke_width: f64, data: &str, props: &DrawProps) -> RenderResult<NodeId> {
        let width = props.effective_stroke_width(stroke_width);
        let bag = shape_bag(width, props).with(PropKey::PathData, PropValue::Str(data.to_string()));
        self.draw(NodeKind::Path, bag)
    }

    /// Single-line text laid out inside `bounds`.
    pub fn text(
        &mut self,
        config: &TextConfig,
        bounds: Rect,
        props: &DrawProps,
        allow_markdown: bool,
    ) -> RenderResult<NodeId> {
        let bag = self.text_bag(config, bounds, props, allow_markdown, false);
        self.draw(NodeKind::Text, bag)
    }

    /// Text wrapped to the width of `bounds`.
    pub fn text_multiline(
        &mut self,
        config: &TextConfig,
        bounds: Rect,
        props: &DrawProps,
        allow_markdown: bool,
    ) -> RenderResult<NodeId> {
        let bag = self.text_bag(config, bounds, props, allow_markdown, true);
        self.draw(NodeKind::Text, bag)
    }

    fn text_bag(
        &mut self,
        config: &TextConfig,
        bounds: Rect,
        props: &DrawProps,
        markdown: bool,
        multiline: bool,
    ) -> PropertyBag {
        let source = props.effective_text(&config.text);
        let rich = match self.text_cache.as_deref_mut() {
            Some(cache) => RichText::clone(&cache.parse(source, markdown)),
            None => RichText::parse(source, markdown),
        };
        base_bag(props)
            .with(PropKey::Text, PropValue::Text(rich))
            .with(PropKey::Fill, PropValue::Color(props.foreground()))
            .with(PropKey::Bounds, PropValue::Rect(deflate(bounds, config.padding)))
            .with(PropKey::TextAlign, PropValue::Align(config.align))
            .with(PropKey::VerticalAlign, PropValue::VAlign(config.vertical_align))
            .with(
                PropKey::TextDecoration,
                PropValue::Decoration(props.effective_decoration()),
            )
            .with(PropKey::Markdown, PropValue::Bool(markdown))
            .with(PropKey::Multiline, PropValue::Bool(multiline))
            .with(PropKey::FontFamily, PropValue::Str(props.effective_font_family()))
            .with(PropKey::FontSize, PropValue::Number(props.effective_font_size()))
    }

    /// A raster image. `None` draws an empty (transparent) raster.
    pub fn raster(
        &mut self,
        source: Option<&str>,
        bounds: Rect,
        preserve_aspect: bool,
        props: &DrawProps,
    ) -> RenderResult<NodeId> {
        let bag = base_bag(props)
            .with(PropKey::Source, PropValue::Source(source.map(str::to_string)))
            .with(PropKey::Bounds, PropValue::Rect(bounds))
            .with(PropKey::PreserveAspect, PropValue::Bool(preserve_aspect));
        self.draw(NodeKind::Raster, bag)
    }

    /// A group whose children are drawn by `content`.
    pub fn group<F>(&mut self, content: F, props: &DrawProps) -> RenderResult<NodeId>
    where
        F: FnOnce(&mut Self) -> RenderResult<()>,
    {
        let group = self.draw(NodeKind::Group, base_bag(props))?;
        self.within(group, |r| {
            content(r)?;
            r.cleanup_all()?;
            Ok(())
        })?;
        Ok(group)
    }

    /// A group whose children are drawn by `content` and clipped by the
    /// single shape `clip` draws.
    pub fn group_clipped<F, C>(&mut self, content: F, clip: C, props: &DrawProps) -> RenderResult<NodeId>
    where
        F: FnOnce(&mut Self) -> RenderResult<()>,
        C: FnOnce(&mut Self) -> RenderResult<()>,
    {
        let group = self.draw(NodeKind::Group, base_bag(props))?;
        self.within(group, |r| {
            content(r)?;
            let index = r.index;
            r.clipping = true;
            let clipped = clip(r);
            r.clipping = false;
            r.index = index;
            clipped?;
            r.cleanup_all()?;
            Ok(())
        })?;
        Ok(group)
    }

    /// Run `f` with the cursor at the start of `container`, restoring the
    /// outer cursor afterwards even if `f` fails.
    fn within<F>(&mut self, container: NodeId, f: F) -> RenderResult<()>
    where
        F: FnOnce(&mut Self) -> RenderResult<()>,
    {
        let saved = (self.container, self.index, self.clipping);
        self.set_container(container, 0, false);
        let result = f(self);
        (self.container, self.index, self.clipping) = saved;
        result
    }

    /// Remove every child at or beyond the cursor, and the container's mask
    /// unless it was bound by this renderer. Returns how many nodes went away.
    pub fn cleanup_all(&mut self) -> RenderResult<usize> {
        let container = self.container;
        let mut removed = self.backend.truncate_children(container, self.index);
        if !self.masks_set.contains(&container) && self.backend.mask(container).is_some() {
            self.backend.set_mask(container, None)?;
            removed += 1;
        }
        Ok(removed)
    }
}

/// Keys shared by every primitive.
fn base_bag(props: &DrawProps) -> PropertyBag {
    let mut bag =
        PropertyBag::new().with(PropKey::Opacity, PropValue::Number(props.effective_opacity()));
    if let Some(rotation) = props.rotation {
        bag.set(PropKey::Rotation, PropValue::Rotation(rotation));
    }
    bag
}

/// Keys of a filled and stroked shape.
fn shape_bag(stroke_width: f64, props: &DrawProps) -> PropertyBag {
    base_bag(props)
        .with(PropKey::Fill, PropValue::Color(props.fill()))
        .with(PropKey::StrokeColor, PropValue::Color(props.stroke()))
        .with(PropKey::StrokeWidth, PropValue::Number(stroke_width))
        .with(PropKey::StrokeStyle, PropValue::Dash(props.effective_stroke_style()))
        .with(PropKey::LineCap, PropValue::Cap(props.effective_line_cap()))
        .with(PropKey::LineJoin, PropValue::Join(props.effective_line_join()))
}
