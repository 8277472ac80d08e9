//! Cursor resolution for the node under the pointer.

use crate::hit::ancestors;
use inkscene_core::{Cursor, rotation_degrees};
use inkscene_render::{NodeId, SceneBackend};

/// Cursor to show over `hit`.
///
/// A literal cursor tag anywhere in the ancestry wins. Otherwise the nearest
/// cursor-angle tag is turned into a directional resize cursor, adding the
/// rotation the tagged node has on screen. No tag gives the default arrow.
pub fn resolve_cursor(backend: &dyn SceneBackend, hit: Option<NodeId>) -> Cursor {
    let Some(hit) = hit else {
        return Cursor::Default;
    };
    if let Some(cursor) = ancestors(backend, hit)
        .find_map(|node| backend.meta(node).and_then(|meta| meta.cursor))
    {
        return cursor;
    }
    ancestors(backend, hit)
        .find_map(|node| {
            let angle = backend.meta(node)?.cursor_angle?;
            let rotation = rotation_degrees(backend.world_transform(node));
            Some(Cursor::for_angle(rotation + angle))
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkscene_core::{DrawProps, Rotation};
    use inkscene_render::{NodeKind, Renderer, SvgScene};
    use kurbo::{Affine, Point, Rect};

    /// A rotated container holding a resize handle tagged at `angle`.
    fn rotated_handle(rotation: f64, angle: f64) -> (SvgScene, NodeId) {
        let mut scene = SvgScene::new();
        let group = scene.create(NodeKind::Group);
        let root = scene.root();
        scene.append_child(root, group).unwrap();
        scene.set_transform(group, Rotation::new(rotation, Point::new(50.0, 50.0)).to_affine());

        let mut r = Renderer::new(&mut scene);
        r.set_container(group, 0, false);
        let handle = r
            .rectangle(0.0, 0.0, Rect::new(95.0, 45.0, 105.0, 55.0), &DrawProps::new())
            .unwrap();
        r.set_cursor_angle(handle, angle).unwrap();
        (scene, handle)
    }

    #[test]
    fn test_angle_tag_follows_container_rotation() {
        let (scene, handle) = rotated_handle(40.0, 0.0);
        assert_eq!(resolve_cursor(&scene, Some(handle)), Cursor::NeResize);

        let (scene, handle) = rotated_handle(0.0, 0.0);
        assert_eq!(resolve_cursor(&scene, Some(handle)), Cursor::EResize);
    }

    #[test]
    fn test_angle_tag_adds_to_rotation() {
        let (scene, handle) = rotated_handle(30.0, 90.0);
        assert_eq!(resolve_cursor(&scene, Some(handle)), Cursor::NwResize);

        let (scene, handle) = rotated_handle(-10.0, 0.0);
        assert_eq!(resolve_cursor(&scene, Some(handle)), Cursor::EResize);
    }

    #[test]
    fn test_literal_cursor_wins_over_angle() {
        let (mut scene, handle) = rotated_handle(0.0, 90.0);
        let group = scene.parent(handle).unwrap();
        scene.meta_mut(group).unwrap().cursor = Some(Cursor::Move);
        assert_eq!(resolve_cursor(&scene, Some(handle)), Cursor::Move);
    }

    #[test]
    fn test_untagged_and_missing_hits_are_default() {
        let mut scene = SvgScene::new();
        let node = scene.create(NodeKind::Rect);
        let root = scene.root();
        scene.append_child(root, node).unwrap();
        assert_eq!(resolve_cursor(&scene, Some(node)), Cursor::Default);
        assert_eq!(resolve_cursor(&scene, None), Cursor::Default);
    }

    #[test]
    fn test_camera_scale_does_not_rotate() {
        let (mut scene, handle) = rotated_handle(0.0, 180.0);
        let root = scene.root();
        scene.set_transform(root, Affine::scale(2.5));
        assert_eq!(resolve_cursor(&scene, Some(handle)), Cursor::WResize);
    }
}
