//! Draw props: optional style overrides handed to every primitive draw call.
//!
//! Shape plugins either set literal values or pull them from a shape through
//! [`StyleSource`]. Reading a prop back always goes through a normalizing
//! accessor, so missing or out-of-range values turn into safe defaults
//! instead of errors.

use crate::color::Rgba;
use crate::geometry::Rotation;
use crate::props::{LineCap, LineJoin, StrokeStyle};
use crate::text::{DEFAULT_FONT_FAMILY, DEFAULT_FONT_SIZE, TextDecoration};

/// Anything that can supply style values, usually a model shape.
///
/// Every accessor defaults to `None`; implement the ones the shape carries.
pub trait StyleSource {
    fn background_color(&self) -> Option<Rgba> {
        None
    }
    fn stroke_color(&self) -> Option<Rgba> {
        None
    }
    fn stroke_width(&self) -> Option<f64> {
        None
    }
    fn stroke_style(&self) -> Option<StrokeStyle> {
        None
    }
    fn foreground_color(&self) -> Option<Rgba> {
        None
    }
    fn font_family(&self) -> Option<String> {
        None
    }
    fn font_size(&self) -> Option<f64> {
        None
    }
    fn opacity(&self) -> Option<f64> {
        None
    }
    fn text(&self) -> Option<String> {
        None
    }
    fn text_decoration(&self) -> Option<TextDecoration> {
        None
    }
}

/// Optional style overrides for one draw call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DrawProps {
    pub background_color: Option<Rgba>,
    pub stroke_color: Option<Rgba>,
    /// Overrides the stroke width passed to the primitive.
    pub stroke_width: Option<f64>,
    pub stroke_style: Option<StrokeStyle>,
    pub line_cap: Option<LineCap>,
    pub line_join: Option<LineJoin>,
    pub foreground_color: Option<Rgba>,
    pub font_family: Option<String>,
    pub font_size: Option<f64>,
    pub opacity: Option<f64>,
    /// Overrides the text passed in the text config.
    pub text: Option<String>,
    pub text_decoration: Option<TextDecoration>,
    pub rotation: Option<Rotation>,
}

impl DrawProps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Props carrying every style value `source` supplies.
    pub fn from_source(source: &dyn StyleSource) -> Self {
        Self {
            background_color: source.background_color(),
            stroke_color: source.stroke_color(),
            stroke_width: source.stroke_width(),
            stroke_style: source.stroke_style(),
            foreground_color: source.foreground_color(),
            font_family: source.font_family(),
            font_size: source.font_size(),
            opacity: source.opacity(),
            text: source.text(),
            text_decoration: source.text_decoration(),
            ..Self::default()
        }
    }

    pub fn set_background_color(&mut self, color: Rgba) -> &mut Self {
        self.background_color = Some(color);
        self
    }

    pub fn set_background_color_from(&mut self, source: &dyn StyleSource) -> &mut Self {
        self.background_color = source.background_color();
        self
    }

    pub fn set_stroke_color(&mut self, color: Rgba) -> &mut Self {
        self.stroke_color = Some(color);
        self
    }

    pub fn set_stroke_color_from(&mut self, source: &dyn StyleSource) -> &mut Self {
        self.stroke_color = source.stroke_color();
        self
    }

    pub fn set_stroke_width(&mut self, width: f64) -> &mut Self {
        self.stroke_width = Some(width);
        self
    }

    pub fn set_stroke_width_from(&mut self, source: &dyn StyleSource) -> &mut Self {
        self.stroke_width = source.stroke_width();
        self
    }

    pub fn set_stroke_style(&mut self, style: StrokeStyle) -> &mut Self {
        self.stroke_style = Some(style);
        self
    }

    pub fn set_stroke_style_from(&mut self, source: &dyn StyleSource) -> &mut Self {
        self.stroke_style = source.stroke_style();
        self
    }

    pub fn set_line_cap(&mut self, cap: LineCap) -> &mut Self {
        self.line_cap = Some(cap);
        self
    }

    pub fn set_line_join(&mut self, join: LineJoin) -> &mut Self {
        self.line_join = Some(join);
        self
    }

    pub fn set_foreground_color(&mut self, color: Rgba) -> &mut Self {
        self.foreground_color = Some(color);
        self
    }

    pub fn set_foreground_color_from(&mut self, source: &dyn StyleSource) -> &mut Self {
        self.foreground_color = source.foreground_color();
        self
    }

    pub fn set_font_family(&mut self, family: impl Into<String>) -> &mut Self {
        self.font_family = Some(family.into());
        self
    }

    pub fn set_font_family_from(&mut self, source: &dyn StyleSource) -> &mut Self {
        self.font_family = source.font_family();
        self
    }

    pub fn set_font_size(&mut self, size: f64) -> &mut Self {
        self.font_size = Some(size);
        self
    }

    pub fn set_font_size_from(&mut self, source: &dyn StyleSource) -> &mut Self {
        self.font_size = source.font_size();
        self
    }

    pub fn set_opacity(&mut self, opacity: f64) -> &mut Self {
        self.opacity = Some(opacity);
        self
    }

    pub fn set_opacity_from(&mut self, source: &dyn StyleSource) -> &mut Self {
        self.opacity = source.opacity();
        self
    }

    pub fn set_text(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(text.into());
        self
    }

    pub fn set_text_from(&mut self, source: &dyn StyleSource) -> &mut Self {
        self.text = source.text();
        self
    }

    pub fn set_text_decoration(&mut self, decoration: TextDecoration) -> &mut Self {
        self.text_decoration = Some(decoration);
        self
    }

    pub fn set_text_decoration_from(&mut self, source: &dyn StyleSource) -> &mut Self {
        self.text_decoration = source.text_decoration();
        self
    }

    pub fn set_rotation(&mut self, rotation: Rotation) -> &mut Self {
        self.rotation = Some(rotation);
        self
    }

    // Normalized reads.

    /// Fill color, transparent when unset.
    pub fn fill(&self) -> Rgba {
        self.background_color.unwrap_or(Rgba::TRANSPARENT)
    }

    /// Stroke color, black when unset.
    pub fn stroke(&self) -> Rgba {
        self.stroke_color.unwrap_or(Rgba::BLACK)
    }

    /// Text color, black when unset.
    pub fn foreground(&self) -> Rgba {
        self.foreground_color.unwrap_or(Rgba::BLACK)
    }

    /// Effective stroke width: the override if set, else `base`. Negative or
    /// non-finite widths become zero.
    pub fn effective_stroke_width(&self, base: f64) -> f64 {
        let width = self.stroke_width.unwrap_or(base);
        if width.is_finite() && width > 0.0 { width } else { 0.0 }
    }

    pub fn effective_stroke_style(&self) -> StrokeStyle {
        self.stroke_style.unwrap_or_default()
    }

    pub fn effective_line_cap(&self) -> LineCap {
        self.line_cap.unwrap_or_default()
    }

    pub fn effective_line_join(&self) -> LineJoin {
        self.line_join.unwrap_or_default()
    }

    /// Font family, `sans-serif` when unset or unusable.
    pub fn effective_font_family(&self) -> String {
        match self.font_family.as_deref().map(str::trim) {
            Some(family) if is_valid_font_family(family) => family.to_string(),
            Some(family) => {
                log::debug!("unusable font family {family:?}, using {DEFAULT_FONT_FAMILY}");
                DEFAULT_FONT_FAMILY.to_string()
            }
            None => DEFAULT_FONT_FAMILY.to_string(),
        }
    }

    /// Font size, 14 when unset, non-finite or not positive.
    pub fn effective_font_size(&self) -> f64 {
        match self.font_size {
            Some(size) if size.is_finite() && size > 0.0 => size,
            _ => DEFAULT_FONT_SIZE,
        }
    }

    /// Opacity clamped to `[0, 1]`; 1 when unset or NaN.
    pub fn effective_opacity(&self) -> f64 {
        match self.opacity {
            Some(o) if !o.is_nan() => o.clamp(0.0, 1.0),
            _ => 1.0,
        }
    }

    /// Text to draw: the override if set, else `fallback`.
    pub fn effective_text<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.text.as_deref().unwrap_or(fallback)
    }

    pub fn effective_decoration(&self) -> TextDecoration {
        self.text_decoration.unwrap_or_default()
    }
}

fn is_valid_font_family(family: &str) -> bool {
    !family.is_empty()
        && !family
            .chars()
            .any(|c| c.is_control() || matches!(c, ';' | '{' | '}' | '<' | '>'))
}
