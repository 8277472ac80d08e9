//! Scenarios every backend must pass with identical results.
//!
//! The SVG backend is the reference; each scenario is instantiated for both
//! backends, and a final test compares the two trees node by node.

use crate::{NodeId, NodeKind, Renderer, SceneBackend, RenderResult};
use inkscene_core::{DrawProps, Rgba, TextConfig, VerticalAlign};
use kurbo::Rect;

fn fill(color: Rgba) -> DrawProps {
    let mut props = DrawProps::new();
    props.set_background_color(color);
    props
}

fn stroke(color: Rgba) -> DrawProps {
    let mut props = fill(Rgba::WHITE);
    props.set_stroke_color(color);
    props
}

/// A plugin-like pass exercising every primitive.
fn draw_everything(r: &mut Renderer<'_>) -> RenderResult<()> {
    let bounds = Rect::new(0.0, 0.0, 120.0, 40.0);
    r.rectangle(2.0, 4.0, bounds, &stroke(Rgba::BLACK))?;
    r.ellipse(1.0, Rect::new(10.0, 10.0, 30.0, 30.0), &fill(Rgba::rgb(0, 0, 255)))?;
    r.rounded_rectangle_left(1.0, 6.0, Rect::new(0.0, 50.0, 60.0, 80.0), &fill(Rgba::WHITE))?;
    r.rounded_rectangle_right(1.0, 6.0, Rect::new(60.0, 50.0, 120.0, 80.0), &fill(Rgba::WHITE))?;
    r.rounded_rectangle_top(1.0, 6.0, Rect::new(0.0, 90.0, 60.0, 120.0), &fill(Rgba::WHITE))?;
    r.rounded_rectangle_bottom(1.0, 6.0, Rect::new(60.0, 90.0, 120.0, 120.0), &fill(Rgba::WHITE))?;
    r.path(2.0, "M 0 130 L 120 130", &DrawProps::new())?;
    r.text(&TextConfig::new("**OK**"), bounds, &DrawProps::new(), true)?;
    r.text_multiline(
        &TextConfig::new("a somewhat longer label that wraps"),
        Rect::new(0.0, 140.0, 80.0, 200.0),
        &DrawProps::new(),
        false,
    )?;
    r.raster(Some("logo.png"), Rect::new(0.0, 210.0, 40.0, 230.0), true, &DrawProps::new())?;
    r.group_clipped(
        |r| {
            r.rectangle(0.0, 0.0, Rect::new(0.0, 240.0, 200.0, 300.0), &fill(Rgba::rgb(0, 255, 0)))?;
            Ok(())
        },
        |r| {
            r.ellipse(0.0, Rect::new(0.0, 240.0, 60.0, 300.0), &DrawProps::new())?;
            Ok(())
        },
        &DrawProps::new(),
    )?;
    r.cleanup_all()?;
    Ok(())
}

type NodeSnapshot = (usize, NodeKind, Option<Rect>, Option<Rgba>, Option<usize>, Option<f64>);

fn snapshot(backend: &dyn SceneBackend) -> Vec<NodeSnapshot> {
    fn walk(backend: &dyn SceneBackend, id: NodeId, depth: usize, out: &mut Vec<NodeSnapshot>) {
        if let Some(kind) = backend.kind(id) {
            let lines = backend.text_layout(id).map(|layout| layout.lines.len());
            out.push((
                depth,
                kind,
                backend.local_bounds(id),
                backend.fill_color(id),
                lines,
                backend.corner_radius(id),
            ));
        }
        if let Some(mask) = backend.mask(id) {
            walk(backend, mask, depth + 1, out);
        }
        for child in backend.children(id) {
            walk(backend, *child, depth + 1, out);
        }
    }
    let mut out = Vec::new();
    walk(backend, backend.root(), 0, &mut out);
    out
}

#[test]
fn test_backends_build_identical_trees() {
    let mut svg = crate::SvgScene::new();
    let mut display = crate::DisplayTree::new();
    draw_everything(&mut Renderer::new(&mut svg)).unwrap();
    draw_everything(&mut Renderer::new(&mut display)).unwrap();

    let reference = snapshot(&svg);
    assert_eq!(reference.len(), 14);
    assert_eq!(snapshot(&display), reference);
    assert_eq!(svg.total_setter_calls(), display.total_setter_calls());
}

#[test]
fn test_text_layout_matches_across_backends() {
    let mut svg = crate::SvgScene::new();
    let mut display = crate::DisplayTree::new();
    let config = TextConfig::new("one\ntwo").with_vertical_align(VerticalAlign::Bottom);
    let bounds = Rect::new(0.0, 0.0, 90.0, 90.0);
    let a = Renderer::new(&mut svg).text(&config, bounds, &DrawProps::new(), false).unwrap();
    let b = Renderer::new(&mut display).text(&config, bounds, &DrawProps::new(), false).unwrap();
    assert_eq!(svg.text_layout(a), display.text_layout(b));
}

macro_rules! backend_conformance {
    ($name:ident, $backend:ty) => {
        mod $name {
            use super::{fill, stroke};
            use crate::{NodeKind, RasterError, RasterImage, RenderError, Renderer, SceneBackend};
            use inkscene_core::{DrawProps, PropKey, PropValue, Rgba, RichText, TextConfig};
            use kurbo::{Affine, Point, Rect};

            fn backend() -> $backend {
                <$backend>::new()
            }

            fn red() -> Rgba {
                Rgba::rgb(255, 0, 0)
            }

            #[test]
            fn test_identical_redraw_writes_nothing() {
                let mut b = backend();
                let root = b.root();
                let bounds = Rect::new(0.0, 0.0, 10.0, 10.0);
                let first = Renderer::new(&mut b).rectangle(1.0, 0.0, bounds, &fill(red())).unwrap();
                b.reset_setter_calls();
                let second = Renderer::new(&mut b).rectangle(1.0, 0.0, bounds, &fill(red())).unwrap();

                assert_eq!(first, second);
                assert_eq!(b.children(root).len(), 1);
                assert_eq!(b.total_setter_calls(), 0);
            }

            #[test]
            fn test_stroke_change_runs_only_stroke_setter() {
                let mut b = backend();
                let bounds = Rect::new(0.0, 0.0, 10.0, 10.0);
                Renderer::new(&mut b).rectangle(1.0, 0.0, bounds, &stroke(red())).unwrap();
                b.reset_setter_calls();
                Renderer::new(&mut b).rectangle(1.0, 0.0, bounds, &stroke(Rgba::BLACK)).unwrap();

                assert_eq!(b.setter_calls(PropKey::StrokeColor), 1);
                assert_eq!(b.setter_calls(PropKey::Fill), 0);
                assert_eq!(b.setter_calls(PropKey::Bounds), 0);
                assert_eq!(b.setter_calls(PropKey::Text), 0);
                assert_eq!(b.total_setter_calls(), 1);
            }

            #[test]
            fn test_kind_change_replaces_node() {
                let mut b = backend();
                let root = b.root();
                let path = Renderer::new(&mut b).path(1.0, "M 0 0 L 5 5", &DrawProps::new()).unwrap();
                let ellipse = Renderer::new(&mut b)
                    .ellipse(1.0, Rect::new(0.0, 0.0, 5.0, 5.0), &DrawProps::new())
                    .unwrap();
                assert_ne!(path, ellipse);
                assert!(!b.is_alive(path));
                assert_eq!(b.children(root), &[ellipse]);
                assert_eq!(b.kind(ellipse), Some(NodeKind::Ellipse));

                let again = Renderer::new(&mut b)
                    .ellipse(1.0, Rect::new(0.0, 0.0, 6.0, 6.0), &DrawProps::new())
                    .unwrap();
                assert_eq!(again, ellipse);
            }

            #[test]
            fn test_shrinking_draw_count_leaves_one_child() {
                let mut b = backend();
                let root = b.root();
                {
                    let mut r = Renderer::new(&mut b);
                    for i in 0..3 {
                        let x = f64::from(i) * 10.0;
                        r.rectangle(0.0, 0.0, Rect::new(x, 0.0, x + 5.0, 5.0), &fill(red())).unwrap();
                    }
                    r.cleanup_all().unwrap();
                }
                assert_eq!(b.children(root).len(), 3);
                {
                    let mut r = Renderer::new(&mut b);
                    r.rectangle(0.0, 0.0, Rect::new(0.0, 0.0, 5.0, 5.0), &fill(red())).unwrap();
                    assert_eq!(r.cleanup_all().unwrap(), 2);
                }
                assert_eq!(b.children(root).len(), 1);
                assert_eq!(b.node_count(), 2);
            }

            #[test]
            fn test_second_clip_fails_before_mutation() {
                let mut b = backend();
                let result = Renderer::new(&mut b).group_clipped(
                    |_| Ok(()),
                    |r| {
                        r.rectangle(0.0, 0.0, Rect::new(0.0, 0.0, 5.0, 5.0), &DrawProps::new())?;
                        r.rectangle(0.0, 0.0, Rect::new(0.0, 0.0, 9.0, 9.0), &DrawProps::new())?;
                        Ok(())
                    },
                    &DrawProps::new(),
                );
                assert!(matches!(result, Err(RenderError::DuplicateClip(_))));
                // root, group and the first mask only
                assert_eq!(b.node_count(), 3);
                let group = b.children(b.root())[0];
                let mask = b.mask(group).unwrap();
                assert_eq!(b.local_bounds(mask), Some(Rect::new(0.0, 0.0, 5.0, 5.0)));
            }

            #[test]
            fn test_rect_then_ellipse_then_rect_only() {
                let mut b = backend();
                let root = b.root();
                let green = Rgba::rgb(0, 128, 0);
                let rect = {
                    let mut r = Renderer::new(&mut b);
                    let rect = r.rectangle(0.0, 0.0, Rect::new(0.0, 0.0, 10.0, 10.0), &fill(red())).unwrap();
                    r.ellipse(0.0, Rect::new(0.0, 0.0, 20.0, 20.0), &fill(Rgba::rgb(0, 0, 255)))
                        .unwrap();
                    r.cleanup_all().unwrap();
                    rect
                };
                let kinds: Vec<_> = b.children(root).iter().map(|id| b.kind(*id)).collect();
                assert_eq!(kinds, vec![Some(NodeKind::Rect), Some(NodeKind::Ellipse)]);

                {
                    let mut r = Renderer::new(&mut b);
                    let again =
                        r.rectangle(0.0, 0.0, Rect::new(0.0, 0.0, 10.0, 10.0), &fill(green)).unwrap();
                    assert_eq!(again, rect);
                    r.cleanup_all().unwrap();
                }
                assert_eq!(b.children(root), &[rect]);
                assert_eq!(b.fill_color(rect), Some(green));
            }

            #[test]
            fn test_raster_fits_natural_aspect() {
                let mut b = backend();
                let bounds = Rect::new(0.0, 0.0, 100.0, 50.0);
                let (meet, stretch) = {
                    let mut r = Renderer::new(&mut b);
                    let meet = r.raster(Some("square.png"), bounds, true, &DrawProps::new()).unwrap();
                    let stretch = r.raster(Some("square.png"), bounds, false, &DrawProps::new()).unwrap();
                    (meet, stretch)
                };
                let requests = b.take_load_requests();
                assert_eq!(requests.len(), 2);
                for request in &requests {
                    let image = RasterImage::from_rgba8(1, 1, vec![9, 9, 9, 255]).unwrap();
                    assert!(b.complete_load(request, Ok(image)));
                }
                assert_eq!(b.local_bounds(meet), Some(Rect::new(25.0, 0.0, 75.0, 50.0)));
                assert_eq!(b.local_bounds(stretch), Some(bounds));
                assert!(b.has_image(meet));
            }

            #[test]
            fn test_stale_raster_load_is_dropped() {
                let mut b = backend();
                let bounds = Rect::new(0.0, 0.0, 10.0, 10.0);
                Renderer::new(&mut b).raster(Some("a.png"), bounds, false, &DrawProps::new()).unwrap();
                let node = Renderer::new(&mut b)
                    .raster(Some("b.png"), bounds, false, &DrawProps::new())
                    .unwrap();
                let requests = b.take_load_requests();
                assert_eq!(requests.len(), 2);

                let image = || RasterImage::from_rgba8(1, 1, vec![0; 4]).unwrap();
                assert!(!b.complete_load(&requests[0], Ok(image())));
                assert!(!b.has_image(node));
                assert!(b.complete_load(&requests[1], Ok(image())));
                assert!(b.has_image(node));

                // failures leave the node empty
                Renderer::new(&mut b).raster(Some("c.png"), bounds, false, &DrawProps::new()).unwrap();
                let request = b.take_load_requests().remove(0);
                assert!(!b.has_image(node));
                assert!(!b.complete_load(&request, Err(RasterError::NotFound("c.png".into()))));
                assert!(!b.has_image(node));
            }

            #[test]
            fn test_null_raster_requests_nothing() {
                let mut b = backend();
                let node = Renderer::new(&mut b)
                    .raster(None, Rect::new(0.0, 0.0, 10.0, 10.0), true, &DrawProps::new())
                    .unwrap();
                assert!(b.take_load_requests().is_empty());
                assert!(!b.has_image(node));
            }

            #[test]
            fn test_text_is_vertically_centered() {
                let mut b = backend();
                let bounds = Rect::new(0.0, 0.0, 100.0, 40.0);
                let node = Renderer::new(&mut b)
                    .text(&TextConfig::new("Hi"), bounds, &DrawProps::new(), false)
                    .unwrap();
                let extent = b.text_layout(node).and_then(|l| l.extent()).unwrap();
                assert!((extent.center().y - bounds.center().y).abs() < 1e-9);
                assert!((extent.center().x - bounds.center().x).abs() < 1e-9);
            }

            #[test]
            fn test_hit_test_respects_order_rotation_and_visibility() {
                let mut b = backend();
                let root = b.root();
                let (under, over) = {
                    let mut r = Renderer::new(&mut b);
                    let under = r.rectangle(0.0, 0.0, Rect::new(0.0, 0.0, 100.0, 100.0), &fill(red())).unwrap();
                    let mut rotated = fill(red());
                    rotated.set_rotation(inkscene_core::Rotation::new(
                        45.0,
                        Point::new(50.0, 50.0),
                    ));
                    let over = r.rectangle(0.0, 0.0, Rect::new(40.0, 40.0, 60.0, 60.0), &rotated).unwrap();
                    (under, over)
                };
                assert_eq!(b.hit_test(root, Point::new(50.0, 50.0)), Some(over));
                // inside the unrotated square's corner, outside the rotated diamond
                assert_eq!(b.hit_test(root, Point::new(41.0, 41.0)), Some(under));
                assert_eq!(b.hit_test(root, Point::new(150.0, 50.0)), None);

                b.set_transform(under, Affine::translate((200.0, 0.0)));
                assert_eq!(b.hit_test(root, Point::new(250.0, 50.0)), Some(under));
                b.set_visible(under, false);
                assert_eq!(b.hit_test(root, Point::new(250.0, 50.0)), None);
            }

            #[test]
            fn test_resize_reclamps_unchanged_corner_radius() {
                let mut b = backend();
                let small = Rect::new(0.0, 0.0, 4.0, 4.0);
                let large = Rect::new(0.0, 0.0, 100.0, 100.0);
                let node = Renderer::new(&mut b).rectangle(0.0, 10.0, small, &fill(red())).unwrap();
                assert_eq!(b.corner_radius(node), Some(2.0));

                b.reset_setter_calls();
                let grown = Renderer::new(&mut b).rectangle(0.0, 10.0, large, &fill(red())).unwrap();
                assert_eq!(grown, node);
                assert_eq!(b.setter_calls(PropKey::CornerRadius), 0);
                assert_eq!(b.corner_radius(node), Some(10.0));

                let mut fresh = backend();
                let other = Renderer::new(&mut fresh).rectangle(0.0, 10.0, large, &fill(red())).unwrap();
                assert_eq!(fresh.corner_radius(other), b.corner_radius(node));
            }

            fn labelled_pass(r: &mut Renderer<'_>, label: &str, fail: bool) -> crate::RenderResult<()> {
                let bounds = Rect::new(0.0, 0.0, 40.0, 20.0);
                r.rectangle(1.0, 4.0, bounds, &fill(red()))?;
                r.text(&TextConfig::new(label), bounds, &DrawProps::new(), false)?;
                if fail {
                    r.group_clipped(
                        |_| Ok(()),
                        |r| {
                            r.rectangle(0.0, 0.0, bounds, &DrawProps::new())?;
                            r.rectangle(0.0, 0.0, bounds, &DrawProps::new())?;
                            Ok(())
                        },
                        &DrawProps::new(),
                    )?;
                }
                r.cleanup_all()?;
                Ok(())
            }

            #[test]
            fn test_full_pass_repairs_a_failed_pass() {
                let mut b = backend();
                let root = b.root();
                labelled_pass(&mut Renderer::new(&mut b), "A", false).unwrap();
                let children = b.children(root).to_vec();
                let text = children[1];
                let a_text = Some(PropValue::Text(RichText::plain("A")));
                assert_eq!(b.cached_props(text).and_then(|bag| bag.get(PropKey::Text)).cloned(), a_text);

                let failed = labelled_pass(&mut Renderer::new(&mut b), "B", true);
                assert!(matches!(failed, Err(RenderError::DuplicateClip(_))));
                // the partial pass stays in the tree
                assert_eq!(b.children(root).len(), 3);

                labelled_pass(&mut Renderer::new(&mut b), "A", false).unwrap();
                assert_eq!(b.children(root), &children[..]);
                assert_eq!(b.cached_props(text).and_then(|bag| bag.get(PropKey::Text)).cloned(), a_text);
                // root, body and text: the group and its mask are gone
                assert_eq!(b.node_count(), 3);
            }

            #[test]
            fn test_markdown_text_is_parsed() {
                let mut b = backend();
                let node = Renderer::new(&mut b)
                    .text(&TextConfig::new("*x*"), Rect::new(0.0, 0.0, 10.0, 10.0), &DrawProps::new(), true)
                    .unwrap();
                let expected = RichText::parse("*x*", true);
                assert!(expected.spans[0].italic);
                assert_eq!(
                    b.cached_props(node).and_then(|bag| bag.get(PropKey::Text)),
                    Some(&PropValue::Text(expected))
                );
            }
        }
    };
}

backend_conformance!(svg_backend, crate::SvgScene);
backend_conformance!(display_backend, crate::DisplayTree);
