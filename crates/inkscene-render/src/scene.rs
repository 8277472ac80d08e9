//! Display tree backend: typed display objects holding prebuilt draw
//! commands.
//!
//! Setters only record state and mark the object dirty; the command list is
//! rebuilt once per applied batch. With the `vello-renderer` feature the tree
//! can be painted into a `vello::Scene`.

use crate::arena::{NodeArena, NodeId};
use crate::backend::{NodeKind, NodePayload, Setter};
use crate::raster::RasterImage;
use crate::shapes::{clamp_radius, ellipse_hit, parse_path, path_bounds, path_hit, rect_hit};
use inkscene_core::text::{DEFAULT_FONT_FAMILY, DEFAULT_FONT_SIZE};
use inkscene_core::{
    LineCap, LineJoin, PropKey, PropValue, Rgba, Rotation, StrokeStyle, TextBlock,
    TextDecoration, TextLayout, fit_rect,
};
use kurbo::{Affine, BezPath, Ellipse, Point, Rect, RoundedRect, Shape};

/// The display tree backend.
pub type DisplayTree = NodeArena<DisplayObject>;

/// One prebuilt drawing instruction, in the object's local coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Fill {
        path: BezPath,
        color: Rgba,
    },
    Stroke {
        path: BezPath,
        color: Rgba,
        width: f64,
        dashes: Vec<f64>,
        cap: LineCap,
        join: LineJoin,
    },
    /// A run of text with its baseline origin.
    Glyphs {
        origin: Point,
        text: String,
        size: f64,
        width: f64,
        bold: bool,
        italic: bool,
        color: Rgba,
    },
    /// Draw the node's decoded image into `rect`.
    Image { rect: Rect },
}

/// Stroke and fill state of a display object.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicsStyle {
    pub fill: Rgba,
    pub stroke: Rgba,
    pub stroke_width: f64,
    pub stroke_style: StrokeStyle,
    pub cap: LineCap,
    pub join: LineJoin,
}

impl Default for GraphicsStyle {
    fn default() -> Self {
        Self {
            fill: Rgba::TRANSPARENT,
            stroke: Rgba::BLACK,
            stroke_width: 0.0,
            stroke_style: StrokeStyle::Solid,
            cap: LineCap::Butt,
            join: LineJoin::Miter,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DisplayObject {
    kind: NodeKind,
    style: GraphicsStyle,
    alpha: f64,
    bounds: Rect,
    corner_radius: f64,
    path: BezPath,
    rotation: Rotation,
    text: TextBlock,
    layout: Option<TextLayout>,
    source: Option<String>,
    pending_load: Option<String>,
    image: Option<RasterImage>,
    preserve_aspect: bool,
    commands: Vec<DrawCommand>,
    dirty: bool,
    rebuilds: usize,
}

impl DisplayObject {
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn style(&self) -> &GraphicsStyle {
        &self.style
    }

    /// Alpha requested by the `Opacity` property.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn image(&self) -> Option<&RasterImage> {
        self.image.as_ref()
    }

    /// Number of times the command list was rebuilt.
    pub fn rebuild_count(&self) -> usize {
        self.rebuilds
    }

    /// Geometry of the object in local coordinates, used for clipping.
    pub fn outline(&self) -> Option<BezPath> {
        match self.kind {
            NodeKind::Rect => {
                let r = clamp_radius(self.bounds, self.corner_radius);
                Some(RoundedRect::from_rect(self.bounds, r).to_path(0.1))
            }
            NodeKind::Ellipse => Some(Ellipse::from_rect(self.bounds).to_path(0.1)),
            NodeKind::Path if self.path.elements().is_empty() => None,
            NodeKind::Path => Some(self.path.clone()),
            NodeKind::Text => Some(self.bounds.to_path(0.1)),
            NodeKind::Raster => Some(self.image_rect().to_path(0.1)),
            NodeKind::Group => None,
        }
    }

    fn image_rect(&self) -> Rect {
        match &self.image {
            Some(image) => fit_rect(self.bounds, image.size(), self.preserve_aspect),
            None => self.bounds,
        }
    }

    fn stroke_command(&self, path: BezPath) -> Option<DrawCommand> {
        let style = &self.style;
        if style.stroke_width <= 0.0 || style.stroke.is_transparent() {
            return None;
        }
        Some(DrawCommand::Stroke {
            path,
            color: style.stroke,
            width: style.stroke_width,
            dashes: style.stroke_style.dash_pattern(style.stroke_width),
            cap: style.cap,
            join: style.join,
        })
    }

    fn shape_commands(&mut self, path: BezPath) {
        if !self.style.fill.is_transparent() {
            self.commands.push(DrawCommand::Fill {
                path: path.clone(),
                color: self.style.fill,
            });
        }
        if let Some(stroke) = self.stroke_command(path) {
            self.commands.push(stroke);
        }
    }

    fn text_commands(&mut self) {
        let layout = self.text.layout();
        let color = self.style.fill;
        let size = layout.font_size;
        for line in &layout.lines {
            for run in &line.runs {
                self.commands.push(DrawCommand::Glyphs {
                    origin: Point::new(run.x, line.baseline),
                    text: run.span.text.clone(),
                    size,
                    width: run.width,
                    bold: run.span.bold,
                    italic: run.span.italic,
                    color,
                });
                if run.span.strike {
                    self.push_rule(run.x, run.width, line.baseline - size * 0.3, color);
                }
            }
            match self.text.decoration {
                TextDecoration::None => {}
                TextDecoration::Underline => {
                    self.push_rule(line.x, line.width, line.baseline + size * 0.1, color)
                }
                TextDecoration::LineThrough => {
                    self.push_rule(line.x, line.width, line.baseline - size * 0.3, color)
                }
            }
        }
        self.layout = Some(layout);
    }

    fn push_rule(&mut self, x: f64, width: f64, y: f64, color: Rgba) {
        let size = self.text.font_size;
        let mut path = BezPath::new();
        path.move_to((x, y));
        path.line_to((x + width, y));
        self.commands.push(DrawCommand::Stroke {
            path,
            color,
            width: (size / 14.0).max(1.0),
            dashes: Vec::new(),
            cap: LineCap::Butt,
            join: LineJoin::Miter,
        });
    }

    fn rebuild(&mut self) {
        self.commands.clear();
        match self.kind {
            NodeKind::Rect | NodeKind::Ellipse | NodeKind::Path => {
                if let Some(path) = self.outline() {
                    self.shape_commands(path);
                }
            }
            NodeKind::Text => self.text_commands(),
            NodeKind::Raster => {
                if self.image.is_some() {
                    self.commands.push(DrawCommand::Image {
                        rect: self.image_rect(),
                    });
                }
            }
            NodeKind::Group => {}
        }
        self.rebuilds += 1;
        self.dirty = false;
    }
}

fn set_fill(obj: &mut DisplayObject, value: Option<&PropValue>) {
    let default = if obj.kind == NodeKind::Text {
        Rgba::BLACK
    } else {
        Rgba::TRANSPARENT
    };
    obj.style.fill = value.and_then(PropValue::as_color).unwrap_or(default);
    obj.dirty = true;
}

fn set_stroke_color(obj: &mut DisplayObject, value: Option<&PropValue>) {
    obj.style.stroke = value.and_then(PropValue::as_color).unwrap_or(Rgba::BLACK);
    obj.dirty = true;
}

fn set_stroke_width(obj: &mut DisplayObject, value: Option<&PropValue>) {
    obj.style.stroke_width = value.and_then(PropValue::as_number).unwrap_or(0.0).max(0.0);
    obj.dirty = true;
}

fn set_stroke_style(obj: &mut DisplayObject, value: Option<&PropValue>) {
    obj.style.stroke_style = value.and_then(PropValue::as_dash).unwrap_or_default();
    obj.dirty = true;
}

fn set_line_cap(obj: &mut DisplayObject, value: Option<&PropValue>) {
    obj.style.cap = value.and_then(PropValue::as_cap).unwrap_or_default();
    obj.dirty = true;
}

fn set_line_join(obj: &mut DisplayObject, value: Option<&PropValue>) {
    obj.style.join = value.and_then(PropValue::as_join).unwrap_or_default();
    obj.dirty = true;
}

fn set_bounds(obj: &mut DisplayObject, value: Option<&PropValue>) {
    obj.bounds = value.and_then(PropValue::as_rect).unwrap_or(Rect::ZERO);
    obj.text.bounds = obj.bounds;
    obj.dirty = true;
}

fn set_corner_radius(obj: &mut DisplayObject, value: Option<&PropValue>) {
    obj.corner_radius = value.and_then(PropValue::as_number).unwrap_or(0.0);
    obj.dirty = true;
}

fn set_path_data(obj: &mut DisplayObject, value: Option<&PropValue>) {
    obj.path = parse_path(value.and_then(PropValue::as_str).unwrap_or(""));
    obj.dirty = true;
}

fn set_rotation(obj: &mut DisplayObject, value: Option<&PropValue>) {
    obj.rotation = value.and_then(PropValue::as_rotation).unwrap_or_default();
}

fn set_text(obj: &mut DisplayObject, value: Option<&PropValue>) {
    obj.text.text = value.and_then(PropValue::as_text).cloned().unwrap_or_default();
    obj.dirty = true;
}

fn set_text_align(obj: &mut DisplayObject, value: Option<&PropValue>) {
    obj.text.align = value.and_then(PropValue::as_align).unwrap_or_default();
    obj.dirty = true;
}

fn set_vertical_align(obj: &mut DisplayObject, value: Option<&PropValue>) {
    obj.text.vertical_align = value.and_then(PropValue::as_valign).unwrap_or_default();
    obj.dirty = true;
}

fn set_text_decoration(obj: &mut DisplayObject, value: Option<&PropValue>) {
    obj.text.decoration = value.and_then(PropValue::as_decoration).unwrap_or_default();
    obj.dirty = true;
}

// Markdown is resolved into the rich text before it reaches the node.
fn set_markdown(_obj: &mut DisplayObject, _value: Option<&PropValue>) {}

fn set_multiline(obj: &mut DisplayObject, value: Option<&PropValue>) {
    obj.text.multiline = value.and_then(PropValue::as_bool).unwrap_or(false);
    obj.dirty = true;
}

fn set_font_family(obj: &mut DisplayObject, value: Option<&PropValue>) {
    obj.text.font_family = value
        .and_then(PropValue::as_str)
        .unwrap_or(DEFAULT_FONT_FAMILY)
        .to_string();
    obj.dirty = true;
}

fn set_font_size(obj: &mut DisplayObject, value: Option<&PropValue>) {
    obj.text.font_size = value
        .and_then(PropValue::as_number)
        .unwrap_or(DEFAULT_FONT_SIZE);
    obj.dirty = true;
}

fn set_opacity(obj: &mut DisplayObject, value: Option<&PropValue>) {
    obj.alpha = value
        .and_then(PropValue::as_number)
        .filter(|a| !a.is_nan())
        .unwrap_or(1.0)
        .clamp(0.0, 1.0);
}

fn set_source(obj: &mut DisplayObject, value: Option<&PropValue>) {
    obj.source = value.and_then(PropValue::as_source).map(str::to_string);
    obj.pending_load = obj.source.clone();
    obj.image = None;
    obj.dirty = true;
}

fn set_preserve_aspect(obj: &mut DisplayObject, value: Option<&PropValue>) {
    obj.preserve_aspect = value.and_then(PropValue::as_bool).unwrap_or(false);
    obj.dirty = true;
}

impl NodePayload for DisplayObject {
    const NAME: &'static str = "display";

    const SETTERS: &'static [(PropKey, Setter<Self>)] = &[
        (PropKey::Fill, set_fill),
        (PropKey::StrokeColor, set_stroke_color),
        (PropKey::StrokeWidth, set_stroke_width),
        (PropKey::StrokeStyle, set_stroke_style),
        (PropKey::LineCap, set_line_cap),
        (PropKey::LineJoin, set_line_join),
        (PropKey::Bounds, set_bounds),
        (PropKey::CornerRadius, set_corner_radius),
        (PropKey::PathData, set_path_data),
        (PropKey::Rotation, set_rotation),
        (PropKey::Text, set_text),
        (PropKey::TextAlign, set_text_align),
        (PropKey::VerticalAlign, set_vertical_align),
        (PropKey::TextDecoration, set_text_decoration),
        (PropKey::Markdown, set_markdown),
        (PropKey::Multiline, set_multiline),
        (PropKey::FontFamily, set_font_family),
        (PropKey::FontSize, set_font_size),
        (PropKey::Opacity, set_opacity),
        (PropKey::Source, set_source),
        (PropKey::PreserveAspect, set_preserve_aspect),
    ];

    fn create(kind: NodeKind) -> Self {
        let mut style = GraphicsStyle::default();
        if kind == NodeKind::Text {
            style.fill = Rgba::BLACK;
        }
        Self {
            kind,
            style,
            alpha: 1.0,
            bounds: Rect::ZERO,
            corner_radius: 0.0,
            path: BezPath::new(),
            rotation: Rotation::default(),
            text: TextBlock::default(),
            layout: None,
            source: None,
            pending_load: None,
            image: None,
            preserve_aspect: false,
            commands: Vec::new(),
            dirty: false,
            rebuilds: 0,
        }
    }

    fn finish_apply(&mut self) {
        if self.dirty {
            self.rebuild();
        }
    }

    fn take_load(&mut self) -> Option<String> {
        self.pending_load.take()
    }

    fn set_image(&mut self, image: Option<RasterImage>) {
        self.image = image;
        self.rebuild();
    }

    fn has_image(&self) -> bool {
        self.image.is_some()
    }

    fn local_transform(&self) -> Affine {
        self.rotation.to_affine()
    }

    fn hit(&self, point: Point) -> bool {
        match self.kind {
            NodeKind::Rect => {
                rect_hit(self.bounds, self.corner_radius, self.style.stroke_width, point)
            }
            NodeKind::Ellipse => ellipse_hit(self.bounds, self.style.stroke_width, point),
            NodeKind::Path => path_hit(&self.path, self.style.stroke_width, point),
            NodeKind::Text => self.bounds.contains(point),
            NodeKind::Raster => self.image_rect().contains(point),
            NodeKind::Group => false,
        }
    }

    fn local_bounds(&self) -> Option<Rect> {
        match self.kind {
            NodeKind::Rect | NodeKind::Ellipse | NodeKind::Text => Some(self.bounds),
            NodeKind::Path => path_bounds(&self.path, self.style.stroke_width),
            NodeKind::Raster => Some(self.image_rect()),
            NodeKind::Group => None,
        }
    }

    fn fill_color(&self) -> Option<Rgba> {
        match self.kind {
            NodeKind::Group | NodeKind::Raster => None,
            _ => Some(self.style.fill),
        }
    }

    fn corner_radius(&self) -> Option<f64> {
        (self.kind == NodeKind::Rect).then(|| clamp_radius(self.bounds, self.corner_radius))
    }

    fn text_layout(&self) -> Option<&TextLayout> {
        self.layout.as_ref()
    }
}

impl NodeArena<DisplayObject> {
    /// Total command list rebuilds over all live objects.
    pub fn rebuilds(&self) -> usize {
        self.payloads().map(|(_, obj)| obj.rebuilds).sum()
    }

    pub fn commands(&self, id: NodeId) -> &[DrawCommand] {
        self.payload(id).map_or(&[], DisplayObject::commands)
    }
}
