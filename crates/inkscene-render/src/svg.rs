//! SVG backend: a retained tree of SVG elements.
//!
//! Each node holds the attribute map its setters write, plus the typed
//! geometry hit testing needs. [`SvgScene::to_svg_string`] serializes the
//! whole tree. This backend's behavior is the reference the display tree is
//! tested against.

use crate::arena::{NodeArena, NodeId};
use crate::backend::{NodeKind, NodePayload, SceneBackend, Setter};
use crate::raster::RasterImage;
use crate::shapes::{clamp_radius, ellipse_hit, parse_path, path_bounds, path_hit, rect_hit};
use inkscene_core::text::{DEFAULT_FONT_FAMILY, DEFAULT_FONT_SIZE};
use inkscene_core::{
    PropKey, PropValue, Rgba, Rotation, StrokeStyle, TextBlock, TextLayout, fit_rect,
};
use kurbo::{Affine, BezPath, Point, Rect};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// The SVG backend.
pub type SvgScene = NodeArena<SvgElement>;

/// One SVG element.
#[derive(Debug, Clone)]
pub struct SvgElement {
    kind: NodeKind,
    attrs: BTreeMap<&'static str, String>,
    fill: Rgba,
    stroke_width: f64,
    stroke_style: StrokeStyle,
    bounds: Rect,
    corner_radius: f64,
    path: BezPath,
    rotation: Rotation,
    text: TextBlock,
    text_dirty: bool,
    layout: Option<TextLayout>,
    source: Option<String>,
    pending_load: Option<String>,
    image: Option<RasterImage>,
    preserve_aspect: bool,
}

impl SvgElement {
    pub fn tag(&self) -> &'static str {
        match self.kind {
            NodeKind::Rect => "rect",
            NodeKind::Ellipse => "ellipse",
            NodeKind::Path => "path",
            NodeKind::Text => "text",
            NodeKind::Raster => "image",
            NodeKind::Group => "g",
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    fn default_fill(&self) -> Rgba {
        if self.kind == NodeKind::Text {
            Rgba::BLACK
        } else {
            Rgba::TRANSPARENT
        }
    }

    fn set_attr(&mut self, name: &'static str, value: impl Into<String>) {
        self.attrs.insert(name, value.into());
    }

    fn update_dash(&mut self) {
        let pattern = self.stroke_style.dash_pattern(self.stroke_width);
        if pattern.is_empty() {
            self.attrs.remove("stroke-dasharray");
        } else {
            let joined: Vec<String> = pattern.into_iter().map(num).collect();
            self.set_attr("stroke-dasharray", joined.join(" "));
        }
    }

    /// Clamp the corner radius against the current bounds.
    fn update_radius(&mut self) {
        let r = clamp_radius(self.bounds, self.corner_radius);
        if r > 0.0 {
            self.set_attr("rx", num(r));
            self.set_attr("ry", num(r));
        } else {
            self.attrs.remove("rx");
            self.attrs.remove("ry");
        }
    }

    fn image_rect(&self) -> Rect {
        match &self.image {
            Some(image) => fit_rect(self.bounds, image.size(), self.preserve_aspect),
            None => self.bounds,
        }
    }

    fn update_image_attrs(&mut self) {
        let rect = self.image_rect();
        self.set_attr("x", num(rect.x0));
        self.set_attr("y", num(rect.y0));
        self.set_attr("width", num(rect.width()));
        self.set_attr("height", num(rect.height()));
        match (&self.image, &self.source) {
            (Some(_), Some(source)) => {
                let href = source.clone();
                self.set_attr("href", href);
            }
            _ => {
                self.attrs.remove("href");
            }
        }
    }
}

fn set_fill(el: &mut SvgElement, value: Option<&PropValue>) {
    el.fill = value
        .and_then(PropValue::as_color)
        .unwrap_or_else(|| el.default_fill());
    let css = el.fill.to_css();
    el.set_attr("fill", css);
}

fn set_stroke_color(el: &mut SvgElement, value: Option<&PropValue>) {
    let color = value.and_then(PropValue::as_color).unwrap_or(Rgba::BLACK);
    el.set_attr("stroke", color.to_css());
}

fn set_stroke_width(el: &mut SvgElement, value: Option<&PropValue>) {
    el.stroke_width = value.and_then(PropValue::as_number).unwrap_or(0.0).max(0.0);
    el.set_attr("stroke-width", num(el.stroke_width));
    el.update_dash();
}

fn set_stroke_style(el: &mut SvgElement, value: Option<&PropValue>) {
    el.stroke_style = value.and_then(PropValue::as_dash).unwrap_or_default();
    el.update_dash();
}

fn set_line_cap(el: &mut SvgElement, value: Option<&PropValue>) {
    let cap = value.and_then(PropValue::as_cap).unwrap_or_default();
    el.set_attr("stroke-linecap", cap.as_str());
}

fn set_line_join(el: &mut SvgElement, value: Option<&PropValue>) {
    let join = value.and_then(PropValue::as_join).unwrap_or_default();
    el.set_attr("stroke-linejoin", join.as_str());
}

fn set_bounds(el: &mut SvgElement, value: Option<&PropValue>) {
    el.bounds = value.and_then(PropValue::as_rect).unwrap_or(Rect::ZERO);
    let b = el.bounds;
    match el.kind {
        NodeKind::Rect => {
            el.set_attr("x", num(b.x0));
            el.set_attr("y", num(b.y0));
            el.set_attr("width", num(b.width()));
            el.set_attr("height", num(b.height()));
            el.update_radius();
        }
        NodeKind::Ellipse => {
            let c = b.center();
            el.set_attr("cx", num(c.x));
            el.set_attr("cy", num(c.y));
            el.set_attr("rx", num(b.width() / 2.0));
            el.set_attr("ry", num(b.height() / 2.0));
        }
        NodeKind::Text => {
            el.text.bounds = b;
            el.text_dirty = true;
        }
        NodeKind::Raster => el.update_image_attrs(),
        NodeKind::Path | NodeKind::Group => {}
    }
}

fn set_corner_radius(el: &mut SvgElement, value: Option<&PropValue>) {
    el.corner_radius = value.and_then(PropValue::as_number).unwrap_or(0.0);
    el.update_radius();
}

fn set_path_data(el: &mut SvgElement, value: Option<&PropValue>) {
    el.path = parse_path(value.and_then(PropValue::as_str).unwrap_or(""));
    let d = el.path.to_svg();
    el.set_attr("d", d);
}

fn set_rotation(el: &mut SvgElement, value: Option<&PropValue>) {
    el.rotation = value.and_then(PropValue::as_rotation).unwrap_or_default();
}

fn set_text(el: &mut SvgElement, value: Option<&PropValue>) {
    el.text.text = value.and_then(PropValue::as_text).cloned().unwrap_or_default();
    el.text_dirty = true;
}

fn set_text_align(el: &mut SvgElement, value: Option<&PropValue>) {
    el.text.align = value.and_then(PropValue::as_align).unwrap_or_default();
    el.text_dirty = true;
}

fn set_vertical_align(el: &mut SvgElement, value: Option<&PropValue>) {
    el.text.vertical_align = value.and_then(PropValue::as_valign).unwrap_or_default();
    el.text_dirty = true;
}

fn set_text_decoration(el: &mut SvgElement, value: Option<&PropValue>) {
    el.text.decoration = value.and_then(PropValue::as_decoration).unwrap_or_default();
    let css = el.text.decoration.as_css();
    el.set_attr("text-decoration", css);
}

fn set_markdown(el: &mut SvgElement, value: Option<&PropValue>) {
    if value.and_then(PropValue::as_bool).unwrap_or(false) {
        el.set_attr("data-markdown", "true");
    } else {
        el.attrs.remove("data-markdown");
    }
}

fn set_multiline(el: &mut SvgElement, value: Option<&PropValue>) {
    el.text.multiline = value.and_then(PropValue::as_bool).unwrap_or(false);
    el.text_dirty = true;
}

fn set_font_family(el: &mut SvgElement, value: Option<&PropValue>) {
    el.text.font_family = value
        .and_then(PropValue::as_str)
        .unwrap_or(DEFAULT_FONT_FAMILY)
        .to_string();
    let family = el.text.font_family.clone();
    el.set_attr("font-family", family);
}

fn set_font_size(el: &mut SvgElement, value: Option<&PropValue>) {
    el.text.font_size = value
        .and_then(PropValue::as_number)
        .unwrap_or(DEFAULT_FONT_SIZE);
    el.set_attr("font-size", num(el.text.font_size));
    el.text_dirty = true;
}

fn set_opacity(el: &mut SvgElement, value: Option<&PropValue>) {
    match value.and_then(PropValue::as_number) {
        Some(opacity) if opacity < 1.0 => el.set_attr("opacity", num(opacity)),
        _ => {
            el.attrs.remove("opacity");
        }
    }
}

fn set_source(el: &mut SvgElement, value: Option<&PropValue>) {
    el.source = value.and_then(PropValue::as_source).map(str::to_string);
    el.pending_load = el.source.clone();
    el.image = None;
    el.update_image_attrs();
}

fn set_preserve_aspect(el: &mut SvgElement, value: Option<&PropValue>) {
    el.preserve_aspect = value.and_then(PropValue::as_bool).unwrap_or(false);
    let mode = if el.preserve_aspect { "xMidYMid meet" } else { "none" };
    el.set_attr("preserveAspectRatio", mode);
    el.update_image_attrs();
}

impl NodePayload for SvgElement {
    const NAME: &'static str = "svg";

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
        let mut el = Self {
            kind,
            attrs: BTreeMap::new(),
            fill: Rgba::TRANSPARENT,
            stroke_width: 0.0,
            stroke_style: StrokeStyle::Solid,
            bounds: Rect::ZERO,
            corner_radius: 0.0,
            path: BezPath::new(),
            rotation: Rotation::default(),
            text: TextBlock::default(),
            text_dirty: false,
            layout: None,
            source: None,
            pending_load: None,
            image: None,
            preserve_aspect: false,
        };
        el.fill = el.default_fill();
        el
    }

    fn finish_apply(&mut self) {
        if self.text_dirty {
            self.layout = Some(self.text.layout());
            self.text_dirty = false;
        }
    }

    fn take_load(&mut self) -> Option<String> {
        self.pending_load.take()
    }

    fn set_image(&mut self, image: Option<RasterImage>) {
        self.image = image;
        self.update_image_attrs();
    }

    fn has_image(&self) -> bool {
        self.image.is_some()
    }

    fn local_transform(&self) -> Affine {
        self.rotation.to_affine()
    }

    fn hit(&self, point: Point) -> bool {
        match self.kind {
            NodeKind::Rect => rect_hit(self.bounds, self.corner_radius, self.stroke_width, point),
            NodeKind::Ellipse => ellipse_hit(self.bounds, self.stroke_width, point),
            NodeKind::Path => path_hit(&self.path, self.stroke_width, point),
            NodeKind::Text => self.bounds.contains(point),
            NodeKind::Raster => self.image_rect().contains(point),
            NodeKind::Group => false,
        }
    }

    fn local_bounds(&self) -> Option<Rect> {
        match self.kind {
            NodeKind::Rect | NodeKind::Ellipse | NodeKind::Text => Some(self.bounds),
            NodeKind::Path => path_bounds(&self.path, self.stroke_width),
            NodeKind::Raster => Some(self.image_rect()),
            NodeKind::Group => None,
        }
    }

    fn fill_color(&self) -> Option<Rgba> {
        match self.kind {
            NodeKind::Group | NodeKind::Raster => None,
            _ => Some(self.fill),
        }
    }

    fn corner_radius(&self) -> Option<f64> {
        if self.kind != NodeKind::Rect {
            return None;
        }
        Some(self.attr("rx").and_then(|rx| rx.parse().ok()).unwrap_or(0.0))
    }

    fn text_layout(&self) -> Option<&TextLayout> {
        self.layout.as_ref()
    }
}

impl NodeArena<SvgElement> {
    /// Serialize the retained tree as an SVG document.
    pub fn to_svg_string(&self) -> String {
        let mut out = String::from(r#"<svg xmlns="http://www.w3.org/2000/svg">"#);
        self.write_node(self.root(), &mut out);
        out.push_str("</svg>");
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let Some(el) = self.payload(id) else {
            return;
        };
        let mut attrs: Vec<(&str, String)> =
            el.attrs.iter().map(|(k, v)| (*k, v.clone())).collect();

        let transform = self.node_transform(id);
        if transform != Affine::IDENTITY {
            let c = transform.as_coeffs();
            let matrix: Vec<String> = c.iter().map(|v| num(*v)).collect();
            attrs.push(("transform", format!("matrix({})", matrix.join(" "))));
        }
        let external = self.opacity(id);
        if external < 1.0 {
            let own = el.attr("opacity").and_then(|o| o.parse::<f64>().ok()).unwrap_or(1.0);
            attrs.retain(|(k, _)| *k != "opacity");
            attrs.push(("opacity", num(own * external)));
        }
        if !self.is_visible(id) {
            attrs.push(("display", "none".to_string()));
        }

        let clip = self.mask(id).map(|mask| (mask, format!("clip-{}-{}", id.index(), id.generation())));
        if let Some((_, clip_id)) = &clip {
            attrs.push(("clip-path", format!("url(#{clip_id})")));
        }

        let _ = write!(out, "<{}", el.tag());
        for (name, value) in &attrs {
            let _ = write!(out, " {name}=\"{}\"", escape(value));
        }

        match el.kind {
            NodeKind::Group => {
                out.push('>');
                if let Some((mask, clip_id)) = clip {
                    let _ = write!(out, "<clipPath id=\"{clip_id}\">");
                    self.write_node(mask, out);
                    out.push_str("</clipPath>");
                }
                for child in self.children(id) {
                    self.write_node(*child, out);
                }
                out.push_str("</g>");
            }
            NodeKind::Text => {
                out.push('>');
                if let Some(layout) = &el.layout {
                    write_text_lines(layout, out);
                }
                out.push_str("</text>");
            }
            _ => out.push_str("/>"),
        }
    }
}

fn write_text_lines(layout: &TextLayout, out: &mut String) {
    for line in &layout.lines {
        let _ = write!(out, "<tspan x=\"{}\" y=\"{}\">", num(line.x), num(line.baseline));
        for run in &line.runs {
            let span = &run.span;
            if span.bold || span.italic || span.strike {
                out.push_str("<tspan");
                if span.bold {
                    out.push_str(" font-weight=\"bold\"");
                }
                if span.italic {
                    out.push_str(" font-style=\"italic\"");
                }
                if span.strike {
                    out.push_str(" text-decoration=\"line-through\"");
                }
                let _ = write!(out, ">{}</tspan>", escape(&span.text));
            } else {
                out.push_str(&escape(&span.text));
            }
        }
        out.push_str("</tspan>");
    }
}

/// Format a number for an attribute: at most three decimals, no trailing zeros.
fn num(value: f64) -> String {
    let s = format!("{value:.3}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" || s.is_empty() { "0".to_string() } else { s.to_string() }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkscene_core::{PropertyBag, RichText, TextAlign};

    fn apply(scene: &mut SvgScene, kind: NodeKind, bag: PropertyBag) -> NodeId {
        let root = scene.root();
        let id = scene.create(kind);
        scene.append_child(root, id).unwrap();
        scene.apply_properties(id, bag).unwrap();
        id
    }

    #[test]
    fn test_rect_attributes() {
        let mut scene = SvgScene::new();
        let id = apply(
            &mut scene,
            NodeKind::Rect,
            PropertyBag::new()
                .with(PropKey::Fill, PropValue::Color(Rgba::rgb(255, 0, 0)))
                .with(PropKey::Bounds, PropValue::Rect(Rect::new(1.0, 2.0, 11.0, 12.5)))
                .with(PropKey::StrokeWidth, PropValue::Number(2.0))
                .with(PropKey::StrokeStyle, PropValue::Dash(StrokeStyle::Dashed)),
        );
        let el = scene.payload(id).unwrap();
        assert_eq!(el.attr("fill"), Some("#ff0000"));
        assert_eq!(el.attr("height"), Some("10.5"));
        assert_eq!(el.attr("stroke-dasharray"), Some("6 4"));
    }

    #[test]
    fn test_serializes_tree_with_clip_and_hidden_nodes() {
        let mut scene = SvgScene::new();
        let root = scene.root();
        let group = scene.create(NodeKind::Group);
        scene.append_child(root, group).unwrap();
        scene.set_transform(group, Affine::translate((5.0, 0.0)));
        let mask = scene.create(NodeKind::Rect);
        scene.set_mask(group, Some(mask)).unwrap();
        let hidden = scene.create(NodeKind::Ellipse);
        scene.append_child(group, hidden).unwrap();
        scene.set_visible(hidden, false);

        let svg = scene.to_svg_string();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("transform=\"matrix(1 0 0 1 5 0)\""));
        assert!(svg.contains("<clipPath id=\"clip-"));
        assert!(svg.contains("clip-path=\"url(#clip-"));
        assert!(svg.contains("display=\"none\""));
    }

    #[test]
    fn test_text_serializes_lines_and_escapes() {
        let mut scene = SvgScene::new();
        apply(
            &mut scene,
            NodeKind::Text,
            PropertyBag::new()
                .with(PropKey::Text, PropValue::Text(RichText::parse("a < **b**", true)))
                .with(PropKey::Bounds, PropValue::Rect(Rect::new(0.0, 0.0, 100.0, 20.0)))
                .with(PropKey::TextAlign, PropValue::Align(TextAlign::Left)),
        );
        let svg = scene.to_svg_string();
        assert!(svg.contains("a &lt; "));
        assert!(svg.contains("<tspan font-weight=\"bold\">b</tspan>"));
    }

    #[test]
    fn test_invalid_path_is_empty() {
        let mut scene = SvgScene::new();
        let id = apply(
            &mut scene,
            NodeKind::Path,
            PropertyBag::new().with(PropKey::PathData, PropValue::Str("not a path".into())),
        );
        assert_eq!(scene.payload(id).unwrap().attr("d"), Some(""));
        assert!(scene.local_bounds(id).is_none());
    }

    #[test]
    fn test_num_formatting() {
        assert_eq!(num(1.0), "1");
        assert_eq!(num(0.1 + 0.2), "0.3");
        assert_eq!(num(-0.0001), "0");
        assert_eq!(num(12.25), "12.25");
    }
}
