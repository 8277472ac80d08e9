//! Demo shape plugins.

use crate::model::{Button, Picture};
use inkscene_core::{Cursor, DrawProps, Rgba, TextConfig};
use inkscene_engine::{DiagramItem, RenderContext, ShapePlugin};
use inkscene_render::RenderResult;
use kurbo::Rect;

const HANDLE_SIZE: f64 = 8.0;

/// Rounded body, markdown label and a resize handle on each side.
pub struct ButtonPlugin;

impl ShapePlugin for ButtonPlugin {
    fn render(&self, item: &dyn DiagramItem, ctx: &mut RenderContext<'_>) -> RenderResult<()> {
        let Some(button) = item.as_any().downcast_ref::<Button>() else {
            log::warn!("button plugin asked to draw item {}", item.id());
            return Ok(());
        };
        let bounds = ctx.bounds();
        let mut props = DrawProps::from_source(item);
        if button.pressed {
            props.set_stroke_width(2.0);
        }

        let body = ctx.rectangle(1.0, 6.0, bounds, &props)?;
        ctx.set_cursor(body, Cursor::Pointer)?;
        // Darker strip along the bottom edge.
        let mut shade = DrawProps::new();
        shade
            .set_background_color(Rgba::rgb(0, 0, 0).with_opacity(0.15))
            .set_stroke_width(0.0);
        let strip = Rect::new(bounds.x0, bounds.y1 - 6.0, bounds.x1, bounds.y1);
        ctx.rounded_rectangle_bottom(0.0, 6.0, strip, &shade)?;

        let label = TextConfig::new(button.label.as_str()).with_padding(4.0);
        ctx.text(&label, bounds, &props, true)?;

        let mut handle_props = DrawProps::new();
        handle_props
            .set_background_color(Rgba::WHITE)
            .set_stroke_color(Rgba::rgb(30, 120, 220));
        let center = bounds.center();
        let half = HANDLE_SIZE / 2.0;
        let handles = [
            (0.0, center.x + bounds.width() / 2.0, center.y),
            (90.0, center.x, center.y - bounds.height() / 2.0),
            (180.0, center.x - bounds.width() / 2.0, center.y),
            (270.0, center.x, center.y + bounds.height() / 2.0),
        ];
        for (angle, x, y) in handles {
            let handle =
                ctx.rectangle(1.0, 0.0, Rect::new(x - half, y - half, x + half, y + half), &handle_props)?;
            ctx.set_cursor_angle(handle, angle)?;
        }
        Ok(())
    }
}

/// An image inside a rounded clip, with a frame on top.
pub struct PicturePlugin;

impl ShapePlugin for PicturePlugin {
    fn render(&self, item: &dyn DiagramItem, ctx: &mut RenderContext<'_>) -> RenderResult<()> {
        let Some(picture) = item.as_any().downcast_ref::<Picture>() else {
            return Ok(());
        };
        let bounds = ctx.bounds();
        let source = picture.source.as_deref();
        let plain = DrawProps::new();
        ctx.group_clipped(
            |r| {
                r.raster(source, bounds, true, &plain)?;
                Ok(())
            },
            |r| {
                r.rectangle(0.0, 8.0, bounds, &plain)?;
                Ok(())
            },
            &DrawProps::new(),
        )?;
        let frame = DrawProps::from_source(item);
        ctx.rectangle(2.0, 8.0, bounds, &frame)?;
        Ok(())
    }
}
