//! Generational node storage shared by all backends.
//!
//! Nodes live in slots addressed by [`NodeId`]. Destroyed slots are recycled
//! through a free list and their generation is bumped, so handles held by
//! callers go stale instead of aliasing a new node. Extra data the engine
//! attaches to nodes (cursor tags, owning object) lives in a side table.

use crate::backend::{NodeKind, NodePayload, SceneBackend};
use crate::diff::{self, SetterStats};
use crate::error::{RasterError, RenderError, RenderResult};
use crate::raster::{LoadRequest, RasterImage};
use inkscene_core::{Cursor, PropKey, PropValue, PropertyBag, Rgba, TextLayout};
use kurbo::{Affine, Point, Rect};
use std::collections::HashMap;
use std::fmt;

/// Handle to a node in a [`NodeArena`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    idx: u32,
    generation: u32,
}

impl NodeId {
    /// Raw slot index, for diagnostics.
    pub const fn index(self) -> u32 {
        self.idx
    }

    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}@gen{})", self.idx, self.generation)
    }
}

/// Engine-level owner of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeOwner {
    Layer(u64),
    Object(u64),
}

/// Side-table entry for one node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeMeta {
    /// Literal cursor shown over this node and its descendants.
    pub cursor: Option<Cursor>,
    /// Direction of a resize handle, in degrees, before node rotation.
    pub cursor_angle: Option<f64>,
    pub owner: Option<NodeOwner>,
}

#[derive(Debug)]
struct Node<P> {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    mask: Option<NodeId>,
    cached: PropertyBag,
    transform: Affine,
    opacity: f64,
    visible: bool,
    payload: P,
}

#[derive(Debug)]
struct Slot<P> {
    generation: u32,
    node: Option<Node<P>>,
}

fn lookup<P>(slots: &[Slot<P>], id: NodeId) -> Option<&Node<P>> {
    slots
        .get(id.idx as usize)
        .filter(|slot| slot.generation == id.generation)
        .and_then(|slot| slot.node.as_ref())
}

fn lookup_mut<P>(slots: &mut [Slot<P>], id: NodeId) -> Option<&mut Node<P>> {
    slots
        .get_mut(id.idx as usize)
        .filter(|slot| slot.generation == id.generation)
        .and_then(|slot| slot.node.as_mut())
}

/// A retained node tree with payload `P`.
#[derive(Debug)]
pub struct NodeArena<P: NodePayload> {
    slots: Vec<Slot<P>>,
    free: Vec<u32>,
    root: NodeId,
    meta: HashMap<NodeId, NodeMeta>,
    stats: SetterStats,
    loads: Vec<LoadRequest>,
    live: usize,
}

impl<P: NodePayload> Default for NodeArena<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: NodePayload> NodeArena<P> {
    /// An arena holding only the root container.
    pub fn new() -> Self {
        let mut arena = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId {
                idx: 0,
                generation: 0,
            },
            meta: HashMap::new(),
            stats: SetterStats::default(),
            loads: Vec::new(),
            live: 0,
        };
        arena.root = arena.alloc(NodeKind::Group);
        arena
    }

    /// Backend payload of a live node.
    pub fn payload(&self, id: NodeId) -> Option<&P> {
        self.node(id).map(|node| &node.payload)
    }

    /// Live nodes and their payloads, in slot order.
    pub fn payloads(&self) -> impl Iterator<Item = (NodeId, &P)> {
        self.slots.iter().enumerate().filter_map(|(idx, slot)| {
            slot.node.as_ref().map(|node| {
                (
                    NodeId {
                        idx: idx as u32,
                        generation: slot.generation,
                    },
                    &node.payload,
                )
            })
        })
    }

    fn node(&self, id: NodeId) -> Option<&Node<P>> {
        lookup(&self.slots, id)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node<P>> {
        lookup_mut(&mut self.slots, id)
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let node = Node {
            kind,
            parent: None,
            children: Vec::new(),
            mask: None,
            cached: PropertyBag::new(),
            transform: Affine::IDENTITY,
            opacity: 1.0,
            visible: true,
            payload: P::create(kind),
        };
        self.live += 1;
        if let Some(idx) = self.free.pop() {
            let slot = &mut self.slots[idx as usize];
            slot.node = Some(node);
            NodeId {
                idx,
                generation: slot.generation,
            }
        } else {
            let idx = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId { idx, generation: 0 }
        }
    }

    /// Free a node and its subtree without touching its parent's lists.
    fn free_subtree(&mut self, id: NodeId) {
        let Some(slot) = self
            .slots
            .get_mut(id.idx as usize)
            .filter(|slot| slot.generation == id.generation)
        else {
            return;
        };
        let Some(node) = slot.node.take() else {
            return;
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.idx);
        self.meta.remove(&id);
        self.live -= 1;
        for child in node.children {
            self.free_subtree(child);
        }
        if let Some(mask) = node.mask {
            self.free_subtree(mask);
        }
    }

    fn container(&self, id: NodeId) -> RenderResult<&Node<P>> {
        let node = self.node(id).ok_or(RenderError::StaleNode(id))?;
        if !node.kind.is_container() {
            return Err(RenderError::NotAContainer(id));
        }
        Ok(node)
    }

    fn hit_node(&self, id: NodeId, point: Point) -> Option<NodeId> {
        let node = self.node(id)?;
        if !node.visible {
            return None;
        }
        let local = (node.transform * node.payload.local_transform()).inverse() * point;
        if node.kind.is_container() {
            self.hit_test(id, local)
        } else if node.payload.hit(local) {
            Some(id)
        } else {
            None
        }
    }
}

impl<P: NodePayload> SceneBackend for NodeArena<P> {
    fn backend_name(&self) -> &'static str {
        P::NAME
    }

    fn root(&self) -> NodeId {
        self.root
    }

    fn is_alive(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.node(id).map(|node| node.kind)
    }

    fn node_count(&self) -> usize {
        self.live
    }

    fn create(&mut self, kind: NodeKind) -> NodeId {
        self.alloc(kind)
    }

    fn destroy(&mut self, id: NodeId) {
        if id == self.root {
            log::warn!("refusing to destroy the root node");
            return;
        }
        self.detach(id);
        self.free_subtree(id);
    }

    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|node| node.parent)
    }

    fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map_or(&[], |node| node.children.as_slice())
    }

    fn insert_child(
        &mut self,
        container: NodeId,
        index: usize,
        child: NodeId,
    ) -> RenderResult<()> {
        self.container(container)?;
        if !self.is_alive(child) {
            return Err(RenderError::StaleNode(child));
        }
        self.detach(child);
        let parent = self
            .node_mut(container)
            .ok_or(RenderError::StaleNode(container))?;
        let index = index.min(parent.children.len());
        parent.children.insert(index, child);
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(container);
        }
        Ok(())
    }

    fn replace_child(
        &mut self,
        container: NodeId,
        index: usize,
        child: NodeId,
    ) -> RenderResult<()> {
        let Some(old) = self.container(container)?.children.get(index).copied() else {
            return self.insert_child(container, index, child);
        };
        if !self.is_alive(child) {
            return Err(RenderError::StaleNode(child));
        }
        self.detach(child);
        if let Some(parent) = self.node_mut(container) {
            parent.children[index] = child;
        }
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(container);
        }
        self.free_subtree(old);
        Ok(())
    }

    fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(node) = self.node_mut(parent) {
            if node.mask == Some(id) {
                node.mask = None;
            } else {
                node.children.retain(|child| *child != id);
            }
        }
        if let Some(node) = self.node_mut(id) {
            node.parent = None;
        }
    }

    fn truncate_children(&mut self, container: NodeId, len: usize) -> usize {
        let removed = match self.node_mut(container) {
            Some(node) if node.children.len() > len => node.children.split_off(len),
            _ => return 0,
        };
        for id in &removed {
            self.free_subtree(*id);
        }
        removed.len()
    }

    fn mask(&self, container: NodeId) -> Option<NodeId> {
        self.node(container).and_then(|node| node.mask)
    }

    fn set_mask(&mut self, container: NodeId, mask: Option<NodeId>) -> RenderResult<()> {
        let previous = self.container(container)?.mask;
        if previous == mask {
            return Ok(());
        }
        if let Some(mask) = mask {
            if !self.is_alive(mask) {
                return Err(RenderError::StaleNode(mask));
            }
            self.detach(mask);
        }
        if let Some(node) = self.node_mut(container) {
            node.mask = mask;
        }
        if let Some(node) = mask.and_then(|mask| self.node_mut(mask)) {
            node.parent = Some(container);
        }
        if let Some(previous) = previous {
            self.free_subtree(previous);
        }
        Ok(())
    }

    fn cached_props(&self, id: NodeId) -> Option<&PropertyBag> {
        self.node(id).map(|node| &node.cached)
    }

    fn apply_properties(&mut self, id: NodeId, bag: PropertyBag) -> RenderResult<usize> {
        let node = lookup_mut(&mut self.slots, id).ok_or(RenderError::StaleNode(id))?;
        let applied = diff::apply_properties(&mut node.payload, &mut node.cached, bag, &mut self.stats);
        if let Some(source) = node.payload.take_load() {
            self.loads.push(LoadRequest { node: id, source });
        }
        Ok(applied)
    }

    fn setter_calls(&self, key: PropKey) -> usize {
        self.stats.calls(key)
    }

    fn total_setter_calls(&self) -> usize {
        self.stats.total()
    }

    fn reset_setter_calls(&mut self) {
        self.stats.reset();
    }

    fn transform(&self, id: NodeId) -> Affine {
        self.node(id).map_or(Affine::IDENTITY, |node| node.transform)
    }

    fn set_transform(&mut self, id: NodeId, transform: Affine) {
        if let Some(node) = self.node_mut(id) {
            node.transform = transform;
        }
    }

    fn opacity(&self, id: NodeId) -> f64 {
        self.node(id).map_or(1.0, |node| node.opacity)
    }

    fn set_opacity(&mut self, id: NodeId, opacity: f64) {
        if let Some(node) = self.node_mut(id) {
            node.opacity = if opacity.is_nan() { 1.0 } else { opacity.clamp(0.0, 1.0) };
        }
    }

    fn is_visible(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|node| node.visible)
    }

    fn set_visible(&mut self, id: NodeId, visible: bool) {
        if let Some(node) = self.node_mut(id) {
            node.visible = visible;
        }
    }

    fn node_transform(&self, id: NodeId) -> Affine {
        self.node(id).map_or(Affine::IDENTITY, |node| {
            node.transform * node.payload.local_transform()
        })
    }

    fn hit_test(&self, container: NodeId, point: Point) -> Option<NodeId> {
        let node = self.node(container)?;
        if !node.visible {
            return None;
        }
        if let Some(mask) = node.mask {
            self.hit_node(mask, point)?;
        }
        node.children
            .iter()
            .rev()
            .find_map(|child| self.hit_node(*child, point))
    }

    fn local_bounds(&self, id: NodeId) -> Option<Rect> {
        self.node(id).and_then(|node| node.payload.local_bounds())
    }

    fn fill_color(&self, id: NodeId) -> Option<Rgba> {
        self.node(id).and_then(|node| node.payload.fill_color())
    }

    fn text_layout(&self, id: NodeId) -> Option<&TextLayout> {
        self.node(id).and_then(|node| node.payload.text_layout())
    }

    fn corner_radius(&self, id: NodeId) -> Option<f64> {
        self.node(id).and_then(|node| node.payload.corner_radius())
    }

    fn has_image(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|node| node.payload.has_image())
    }

    fn meta(&self, id: NodeId) -> Option<&NodeMeta> {
        self.meta.get(&id)
    }

    fn meta_mut(&mut self, id: NodeId) -> Option<&mut NodeMeta> {
        if !self.is_alive(id) {
            return None;
        }
        Some(self.meta.entry(id).or_default())
    }

    fn take_load_requests(&mut self) -> Vec<LoadRequest> {
        std::mem::take(&mut self.loads)
    }

    fn complete_load(
        &mut self,
        request: &LoadRequest,
        result: Result<RasterImage, RasterError>,
    ) -> bool {
        let Some(node) = self.node_mut(request.node) else {
            log::debug!("dropping load of {:?}: node {:?} is gone", request.source, request.node);
            return false;
        };
        let wanted = node.cached.get(PropKey::Source).and_then(PropValue::as_source);
        if wanted != Some(request.source.as_str()) {
            log::debug!(
                "dropping stale load of {:?} for {:?}, node now wants {:?}",
                request.source,
                request.node,
                wanted
            );
            return false;
        }
        match result {
            Ok(image) => {
                node.payload.set_image(Some(image));
                true
            }
            Err(err) => {
                log::warn!("failed to load image {:?}: {err}", request.source);
                node.payload.set_image(None);
                false
            }
        }
    }
}
