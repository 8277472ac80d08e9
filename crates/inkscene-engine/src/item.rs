//! Engine items: whole model shapes drawn by shape plugins.
//!
//! An item owns a group node. Child 0 is a transparent hit box covering the
//! item's local rect; the plugin draws everything after it. The item's
//! position, rotation and opacity live on the group's external transform, so
//! plugins always draw at the local origin and moving an item never
//! re-renders it.
//!
//! Re-rendering is keyed on the identity of the model item: plotting the same
//! [`ItemRef`] again only makes sure the group is attached. Models are
//! expected to produce a new reference per edit.

use crate::object::ObjectId;
use inkscene_core::{DrawProps, Rgba, Rotation, StyleSource, TextCache};
use inkscene_render::{NodeId, RenderResult, Renderer, SceneBackend};
use kurbo::{Affine, Point, Rect};
use std::any::Any;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;
use uuid::Uuid;

/// A model shape as seen by the engine.
pub trait DiagramItem: StyleSource {
    fn id(&self) -> Uuid;

    /// Placement in content coordinates.
    fn bounds(&self) -> Rect;

    /// Rotation in degrees about the center of [`DiagramItem::bounds`].
    fn rotation(&self) -> f64 {
        0.0
    }

    fn as_any(&self) -> &dyn Any;
}

/// Shared reference to a model item. Identity is pointer identity.
pub type ItemRef = Rc<dyn DiagramItem>;

/// Issues the draw calls for one kind of model shape.
pub trait ShapePlugin {
    /// Draw `item` into `ctx`, at the local origin.
    fn render(&self, item: &dyn DiagramItem, ctx: &mut RenderContext<'_>) -> RenderResult<()>;
}

/// What a plugin draws with: a renderer positioned inside the item's group,
/// plus the local rect to draw in.
pub struct RenderContext<'a> {
    renderer: Renderer<'a>,
    bounds: Rect,
}

impl<'a> RenderContext<'a> {
    /// Local rect of the item: its size at the origin.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn renderer(&mut self) -> &mut Renderer<'a> {
        &mut self.renderer
    }
}

impl<'a> Deref for RenderContext<'a> {
    type Target = Renderer<'a>;

    fn deref(&self) -> &Self::Target {
        &self.renderer
    }
}

impl DerefMut for RenderContext<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.renderer
    }
}

fn hit_box_props() -> DrawProps {
    let mut props = DrawProps::new();
    props
        .set_background_color(Rgba::TRANSPARENT)
        .set_stroke_color(Rgba::TRANSPARENT)
        .set_stroke_width(0.0);
    props
}

/// Render state of one engine item.
pub(crate) struct ItemState {
    node: NodeId,
    plugin: Rc<dyn ShapePlugin>,
    rendered: Option<ItemRef>,
    text_cache: TextCache,
    renders: usize,
}

impl ItemState {
    pub(crate) fn new(node: NodeId, plugin: Rc<dyn ShapePlugin>, cache_capacity: usize) -> Self {
        Self {
            node,
            plugin,
            rendered: None,
            text_cache: TextCache::new(cache_capacity),
            renders: 0,
        }
    }

    pub(crate) fn node(&self) -> NodeId {
        self.node
    }

    pub(crate) fn rendered(&self) -> Option<&ItemRef> {
        self.rendered.as_ref()
    }

    /// Show `item` inside `parent`, rendering only if it differs from the
    /// last rendered item. `None` detaches the group without destroying it.
    pub(crate) fn plot(
        &mut self,
        backend: &mut dyn SceneBackend,
        parent: NodeId,
        item: Option<ItemRef>,
    ) -> RenderResult<()> {
        let Some(item) = item else {
            backend.detach(self.node);
            return Ok(());
        };
        let unchanged = self
            .rendered
            .as_ref()
            .is_some_and(|rendered| Rc::ptr_eq(rendered, &item));
        if !unchanged {
            if let Err(err) = self.render(backend, &item) {
                // The group holds a partial pass; force a full redraw next time.
                self.rendered = None;
                return Err(err);
            }
            self.rendered = Some(item);
        }
        if backend.parent(self.node) != Some(parent) {
            backend.append_child(parent, self.node)?;
        }
        Ok(())
    }

    fn render(&mut self, backend: &mut dyn SceneBackend, item: &ItemRef) -> RenderResult<()> {
        let bounds = item.bounds();
        let local = Rect::from_origin_size(Point::ZERO, bounds.size());
        {
            let mut renderer = Renderer::new(&mut *backend).with_text_cache(&mut self.text_cache);
            renderer.set_container(self.node, 0, false);
            renderer.rectangle(0.0, 0.0, local, &hit_box_props())?;
            let mut ctx = RenderContext {
                renderer,
                bounds: local,
            };
            self.plugin.render(item.as_ref(), &mut ctx)?;
            ctx.cleanup_all()?;
        }

        let transform = Affine::translate(bounds.origin().to_vec2())
            * Rotation::about_rect(item.rotation(), local).to_affine();
        backend.set_transform(self.node, transform);
        backend.set_opacity(self.node, item.opacity().unwrap_or(1.0).clamp(0.0, 1.0));
        self.renders += 1;
        log::trace!("rendered item {} into {:?}", item.id(), self.node);
        Ok(())
    }

    /// Drop everything but the hit box and forget the last render.
    pub(crate) fn force_replot(&mut self, backend: &mut dyn SceneBackend) -> RenderResult<()> {
        backend.truncate_children(self.node, 1);
        if backend.mask(self.node).is_some() {
            backend.set_mask(self.node, None)?;
        }
        self.rendered = None;
        Ok(())
    }
}

/// Mutation guard over one engine item.
pub struct EngineItem<'e> {
    id: ObjectId,
    layer_node: NodeId,
    state: &'e mut ItemState,
    backend: &'e mut dyn SceneBackend,
}

impl<'e> EngineItem<'e> {
    pub(crate) fn new(
        id: ObjectId,
        layer_node: NodeId,
        state: &'e mut ItemState,
        backend: &'e mut dyn SceneBackend,
    ) -> Self {
        Self {
            id,
            layer_node,
            state,
            backend,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// The item's group node.
    pub fn node(&self) -> NodeId {
        self.state.node()
    }

    /// Show `item`, or detach with `None`. After a plugin error the group
    /// keeps whatever was drawn and the next plot renders from scratch.
    pub fn plot(&mut self, item: Option<ItemRef>) -> RenderResult<()> {
        self.state.plot(&mut *self.backend, self.layer_node, item)
    }

    /// Clear the plugin's nodes so the next plot renders from scratch.
    pub fn force_replot(&mut self) -> RenderResult<()> {
        self.state.force_replot(&mut *self.backend)
    }

    /// The model item last rendered successfully, `None` after a failed
    /// render.
    pub fn item(&self) -> Option<&ItemRef> {
        self.state.rendered()
    }

    pub fn is_attached(&self) -> bool {
        self.backend.parent(self.state.node()) == Some(self.layer_node)
    }

    /// Number of plugin renders so far.
    pub fn render_count(&self) -> usize {
        self.state.renders
    }

    pub fn text_cache(&self) -> &TextCache {
        &self.state.text_cache
    }
}
