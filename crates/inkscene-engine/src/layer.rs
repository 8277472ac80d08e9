//! Layers: named z-order bands of engine objects.

use crate::engine::Engine;
use crate::hit::resolve_owners;
use crate::item::ShapePlugin;
use crate::object::{
    EllipseHandle, Handle, ItemHandle, LineHandle, ObjectId, ObjectKind, RectHandle, TextHandle,
};
use inkscene_render::{NodeId, RenderResult, SceneBackend};
use kurbo::Point;
use std::rc::Rc;

/// Identifier of a layer, unique within one engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub(crate) u64);

impl LayerId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Engine-side record of a layer.
#[derive(Debug)]
pub(crate) struct LayerRecord {
    pub(crate) id: LayerId,
    pub(crate) name: String,
    pub(crate) node: NodeId,
    /// Objects in creation order.
    pub(crate) objects: Vec<ObjectId>,
}

/// Guard over one layer of an engine.
///
/// Objects are created in call order, which is also their z-order within
/// the layer.
pub struct EngineLayer<'e, B: SceneBackend> {
    engine: &'e mut Engine<B>,
    id: LayerId,
}

impl<'e, B: SceneBackend> EngineLayer<'e, B> {
    pub(crate) fn new(engine: &'e mut Engine<B>, id: LayerId) -> Self {
        Self { engine, id }
    }

    fn record(&self) -> &LayerRecord {
        self.engine
            .layer_record(self.id)
            .unwrap_or_else(|| unreachable!("layer guard outlived its layer"))
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.record().name
    }

    /// The layer's container node.
    pub fn node(&self) -> NodeId {
        self.record().node
    }

    /// Objects of this layer, bottom to top.
    pub fn objects(&self) -> &[ObjectId] {
        &self.record().objects
    }

    pub fn rect(&mut self) -> RenderResult<RectHandle> {
        self.add(ObjectKind::Rect, None).map(Handle::new)
    }

    pub fn ellipse(&mut self) -> RenderResult<EllipseHandle> {
        self.add(ObjectKind::Ellipse, None).map(Handle::new)
    }

    pub fn line(&mut self) -> RenderResult<LineHandle> {
        self.add(ObjectKind::Line, None).map(Handle::new)
    }

    pub fn text(&mut self) -> RenderResult<TextHandle> {
        self.add(ObjectKind::Text, None).map(Handle::new)
    }

    /// An item drawn by `plugin`. It stays empty until plotted.
    pub fn item(&mut self, plugin: Rc<dyn ShapePlugin>) -> RenderResult<ItemHandle> {
        self.add(ObjectKind::Item, Some(plugin)).map(Handle::new)
    }

    fn add(
        &mut self,
        kind: ObjectKind,
        plugin: Option<Rc<dyn ShapePlugin>>,
    ) -> RenderResult<ObjectId> {
        self.engine.add_object(self.id, kind, plugin)
    }

    /// Topmost object of this layer under `point`, in content coordinates.
    pub fn hit_test(&self, point: Point) -> Option<ObjectId> {
        let backend = self.engine.backend();
        let hit = backend.hit_test(self.node(), point)?;
        resolve_owners(backend, hit, |_| false).object
    }

    pub fn show(&mut self) {
        let node = self.node();
        self.engine.backend_mut().set_visible(node, true);
    }

    pub fn hide(&mut self) {
        let node = self.node();
        self.engine.backend_mut().set_visible(node, false);
    }

    pub fn is_visible(&self) -> bool {
        self.engine.backend().is_visible(self.node())
    }
}
