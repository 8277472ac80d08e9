//! Mapping hit scene nodes back to engine objects.

use crate::object::ObjectId;
use inkscene_render::{NodeId, NodeOwner, SceneBackend};
use std::iter;

/// `node` followed by its ancestors up to the root.
pub fn ancestors(backend: &dyn SceneBackend, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    iter::successors(Some(node), move |current| backend.parent(*current))
}

/// Engine objects found above a hit node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HitOwners {
    /// Nearest engine object, items included.
    pub object: Option<ObjectId>,
    /// Nearest engine item with a rendered model item. May sit higher up
    /// than `object`.
    pub item: Option<ObjectId>,
}

/// Walk up from `node` until a layer, recording the nearest object and,
/// independently, the nearest object for which `is_rendered_item` holds.
pub fn resolve_owners(
    backend: &dyn SceneBackend,
    node: NodeId,
    is_rendered_item: impl Fn(ObjectId) -> bool,
) -> HitOwners {
    let mut owners = HitOwners::default();
    for current in ancestors(backend, node) {
        match backend.meta(current).and_then(|meta| meta.owner) {
            Some(NodeOwner::Layer(_)) => break,
            Some(NodeOwner::Object(raw)) => {
                let id = ObjectId(raw);
                owners.object.get_or_insert(id);
                if owners.item.is_none() && is_rendered_item(id) {
                    owners.item = Some(id);
                }
            }
            None => {}
        }
        if owners.object.is_some() && owners.item.is_some() {
            break;
        }
    }
    owners
}
