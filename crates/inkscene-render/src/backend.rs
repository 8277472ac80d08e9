//! The backend contract.
//!
//! A backend is a retained tree of native drawables. The [`Renderer`] and
//! the engine only ever talk to it through [`SceneBackend`], which is
//! object safe so the same reconciliation code drives every backend.
//!
//! Backends differ only in their node payload: [`NodeArena`] owns topology,
//! cached property bags and the metadata side table, while a
//! [`NodePayload`] turns property changes into native state through its
//! setter table.
//!
//! [`Renderer`]: crate::Renderer
//! [`NodeArena`]: crate::NodeArena

use crate::arena::{NodeId, NodeMeta};
use crate::error::{RasterError, RenderResult};
use crate::raster::{LoadRequest, RasterImage};
use inkscene_core::{PropKey, PropValue, PropertyBag, Rgba, TextLayout};
use kurbo::{Affine, Point, Rect};

/// Draw type of a scene node. Reconciliation reuses a node only when the
/// requested kind matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Rect,
    Ellipse,
    Path,
    Text,
    Raster,
    Group,
}

impl NodeKind {
    pub fn is_container(self) -> bool {
        self == NodeKind::Group
    }

    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Rect => "rect",
            NodeKind::Ellipse => "ellipse",
            NodeKind::Path => "path",
            NodeKind::Text => "text",
            NodeKind::Raster => "raster",
            NodeKind::Group => "group",
        }
    }
}

/// A setter: applies one property value to a payload. `None` means the key
/// was removed and the payload must restore its default.
pub type Setter<P> = fn(&mut P, Option<&PropValue>);

/// Backend-native state of one scene node.
pub trait NodePayload: Sized + 'static {
    /// Backend name used in logs.
    const NAME: &'static str;

    /// The setter table, one entry per property key the backend understands.
    const SETTERS: &'static [(PropKey, Setter<Self>)];

    fn create(kind: NodeKind) -> Self;

    /// Called once after a batch of setters ran, to rebuild derived state.
    fn finish_apply(&mut self) {}

    /// Source requested by the last batch of setters, if a load is needed.
    fn take_load(&mut self) -> Option<String> {
        None
    }

    /// Install (or clear) the decoded image of a raster node.
    fn set_image(&mut self, _image: Option<RasterImage>) {}

    fn has_image(&self) -> bool {
        false
    }

    /// Transform from the node's own properties (rotation), applied after
    /// the arena's external transform.
    fn local_transform(&self) -> Affine;

    /// Whether `point`, in the node's local coordinates, hits the drawable.
    fn hit(&self, point: Point) -> bool;

    /// Area covered by the drawable in local coordinates.
    fn local_bounds(&self) -> Option<Rect>;

    /// Fill (or text) color as held by the native state.
    fn fill_color(&self) -> Option<Rgba>;

    fn text_layout(&self) -> Option<&TextLayout> {
        None
    }

    /// Corner radius as drawn, for rectangles.
    fn corner_radius(&self) -> Option<f64> {
        None
    }
}

/// Look up the setter for `key` in a payload's table.
pub fn setter_for<P: NodePayload>(key: PropKey) -> Option<Setter<P>> {
    P::SETTERS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, setter)| *setter)
}

/// Operations every backend offers to the renderer and the engine.
pub trait SceneBackend {
    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;

    /// The root container.
    fn root(&self) -> NodeId;

    fn is_alive(&self, id: NodeId) -> bool;

    fn kind(&self, id: NodeId) -> Option<NodeKind>;

    /// Number of live nodes, root included.
    fn node_count(&self) -> usize;

    // -- Topology --

    /// Create a detached node.
    fn create(&mut self, kind: NodeKind) -> NodeId;

    /// Destroy a node and its whole subtree.
    fn destroy(&mut self, id: NodeId);

    fn parent(&self, id: NodeId) -> Option<NodeId>;

    /// Ordered children of a container, empty for leaves and stale ids.
    fn children(&self, id: NodeId) -> &[NodeId];

    fn child_at(&self, container: NodeId, index: usize) -> Option<NodeId> {
        self.children(container).get(index).copied()
    }

    /// Insert `child` at `index` (clamped to the child count), detaching it
    /// from any previous parent first.
    fn insert_child(&mut self, container: NodeId, index: usize, child: NodeId)
    -> RenderResult<()>;

    fn append_child(&mut self, container: NodeId, child: NodeId) -> RenderResult<()> {
        let len = self.children(container).len();
        self.insert_child(container, len, child)
    }

    /// Put `child` at `index`, destroying the node that was there.
    fn replace_child(&mut self, container: NodeId, index: usize, child: NodeId)
    -> RenderResult<()>;

    /// Remove a node from its parent without destroying it.
    fn detach(&mut self, id: NodeId);

    /// Destroy every child at or beyond `len`. Returns how many were removed.
    fn truncate_children(&mut self, container: NodeId, len: usize) -> usize;

    /// The container's clip/mask node.
    fn mask(&self, container: NodeId) -> Option<NodeId>;

    /// Bind the mask slot. A previous different mask is destroyed.
    fn set_mask(&mut self, container: NodeId, mask: Option<NodeId>) -> RenderResult<()>;

    // -- Properties --

    /// The bag last applied to a node.
    fn cached_props(&self, id: NodeId) -> Option<&PropertyBag>;

    /// Diff `bag` against the cached bag, run the setters for changed keys
    /// and cache `bag`. Returns the number of setters invoked.
    fn apply_properties(&mut self, id: NodeId, bag: PropertyBag) -> RenderResult<usize>;

    /// Times the setter for `key` ran since the last reset.
    fn setter_calls(&self, key: PropKey) -> usize;

    fn total_setter_calls(&self) -> usize;

    fn reset_setter_calls(&mut self);

    // -- External state, set by the engine rather than by draw calls --

    fn transform(&self, id: NodeId) -> Affine;

    fn set_transform(&mut self, id: NodeId, transform: Affine);

    fn opacity(&self, id: NodeId) -> f64;

    fn set_opacity(&mut self, id: NodeId, opacity: f64);

    fn is_visible(&self, id: NodeId) -> bool;

    fn set_visible(&mut self, id: NodeId, visible: bool);

    // -- Queries --

    /// The node's own transform: external transform times local transform.
    fn node_transform(&self, id: NodeId) -> Affine;

    /// Product of the node transforms from the root down to `id`.
    fn world_transform(&self, id: NodeId) -> Affine {
        let mut transform = Affine::IDENTITY;
        let mut current = Some(id);
        while let Some(node) = current {
            transform = self.node_transform(node) * transform;
            current = self.parent(node);
        }
        transform
    }

    /// Topmost visible leaf under `point`, given in the children space of
    /// `container`.
    fn hit_test(&self, container: NodeId, point: Point) -> Option<NodeId>;

    fn local_bounds(&self, id: NodeId) -> Option<Rect>;

    fn fill_color(&self, id: NodeId) -> Option<Rgba>;

    fn text_layout(&self, id: NodeId) -> Option<&TextLayout>;

    /// Corner radius a rectangle is drawn with, after clamping to its bounds.
    fn corner_radius(&self, id: NodeId) -> Option<f64>;

    fn has_image(&self, id: NodeId) -> bool;

    // -- Metadata side table --

    fn meta(&self, id: NodeId) -> Option<&NodeMeta>;

    /// Metadata of a live node, created on first access.
    fn meta_mut(&mut self, id: NodeId) -> Option<&mut NodeMeta>;

    // -- Raster loading --

    /// Loads requested by applied `Source` properties since the last call.
    fn take_load_requests(&mut self) -> Vec<LoadRequest>;

    /// Apply a finished load if the node still wants this source.
    /// Returns whether the image was installed.
    fn complete_load(
        &mut self,
        request: &LoadRequest,
        result: Result<RasterImage, RasterError>,
    ) -> bool;
}
