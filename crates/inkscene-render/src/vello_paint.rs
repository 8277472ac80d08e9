//! Vello painting of the display tree.

use crate::arena::{NodeArena, NodeId};
use crate::backend::SceneBackend;
use crate::scene::{DisplayObject, DrawCommand};
use inkscene_core::{LineCap, LineJoin, Rgba};
use kurbo::{Affine, Cap, Join, Rect, Stroke};
use peniko::{Blob, Color, Fill, ImageAlphaType, ImageBrush, ImageData, ImageFormat, Mix};
use std::sync::Arc;
use vello::Scene;

/// Share of a run's box filled when text is greeked.
const GREEK_ALPHA: f64 = 0.35;

impl NodeArena<DisplayObject> {
    /// Paint every visible node into `scene`, with `transform` applied on top
    /// of the tree's own transforms.
    pub fn paint(&self, scene: &mut Scene, transform: Affine) {
        self.paint_node(scene, self.root(), transform, 1.0);
    }

    fn paint_node(&self, scene: &mut Scene, id: NodeId, parent: Affine, parent_alpha: f64) {
        let Some(obj) = self.payload(id) else {
            return;
        };
        if !self.is_visible(id) {
            return;
        }
        let transform = parent * self.node_transform(id);
        let alpha = parent_alpha * self.opacity(id) * obj.alpha();
        if alpha <= 0.0 {
            return;
        }
        for command in obj.commands() {
            paint_command(scene, obj, command, transform, alpha);
        }
        if !obj.kind().is_container() {
            return;
        }

        let clip = self.mask(id).and_then(|mask| {
            let outline = self.payload(mask)?.outline()?;
            Some((transform * self.node_transform(mask), outline))
        });
        if let Some((clip_transform, outline)) = &clip {
            scene.push_layer(Mix::Clip, 1.0, *clip_transform, outline);
        }
        for child in self.children(id) {
            self.paint_node(scene, *child, transform, alpha);
        }
        if clip.is_some() {
            scene.pop_layer();
        }
    }
}

fn paint_command(
    scene: &mut Scene,
    obj: &DisplayObject,
    command: &DrawCommand,
    transform: Affine,
    alpha: f64,
) {
    match command {
        DrawCommand::Fill { path, color } => {
            scene.fill(Fill::NonZero, transform, brush(*color, alpha), None, path);
        }
        DrawCommand::Stroke {
            path,
            color,
            width,
            dashes,
            cap,
            join,
        } => {
            let stroke = Stroke::new(*width)
                .with_caps(cap_style(*cap))
                .with_join(join_style(*join))
                .with_dashes(0.0, dashes.iter().copied());
            scene.stroke(&stroke, transform, brush(*color, alpha), None, path);
        }
        // No glyph shaping here: runs are greeked as bars over their x-height.
        DrawCommand::Glyphs {
            origin,
            size,
            width,
            color,
            ..
        } => {
            let bar = Rect::new(origin.x, origin.y - size * 0.5, origin.x + width, origin.y);
            scene.fill(Fill::NonZero, transform, brush(*color, alpha * GREEK_ALPHA), None, &bar);
        }
        DrawCommand::Image { rect } => {
            let Some(image) = obj.image() else {
                return;
            };
            let data = ImageData {
                data: Blob::new(Arc::new(image.pixels().to_vec())),
                format: ImageFormat::Rgba8,
                width: image.width(),
                height: image.height(),
                alpha_type: ImageAlphaType::Alpha,
            };
            let placement = Affine::translate((rect.x0, rect.y0))
                * Affine::scale_non_uniform(
                    rect.width() / f64::from(image.width()),
                    rect.height() / f64::from(image.height()),
                );
            let brush = ImageBrush::from(data).with_alpha(alpha as f32);
            scene.draw_image(&brush, transform * placement);
        }
    }
}

fn brush(color: Rgba, alpha: f64) -> Color {
    Color::from(color.with_opacity(alpha))
}

fn cap_style(cap: LineCap) -> Cap {
    match cap {
        LineCap::Butt => Cap::Butt,
        LineCap::Round => Cap::Round,
        LineCap::Square => Cap::Square,
    }
}

fn join_style(join: LineJoin) -> Join {
    match join {
        LineJoin::Miter => Join::Miter,
        LineJoin::Round => Join::Round,
        LineJoin::Bevel => Join::Bevel,
    }
}
