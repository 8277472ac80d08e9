//! The properties bag: the named visual attributes requested for one node.
//!
//! A fresh bag is built for every draw call and compared key by key against
//! the bag cached on the scene node. Only the keys whose values differ are
//! handed to the backend's setters.

use crate::color::Rgba;
use crate::geometry::Rotation;
use crate::text::{RichText, TextAlign, TextDecoration, VerticalAlign};
use kurbo::Rect;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of one visual property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PropKey {
    Fill,
    StrokeColor,
    StrokeWidth,
    StrokeStyle,
    LineCap,
    LineJoin,
    Bounds,
    CornerRadius,
    PathData,
    Rotation,
    Text,
    TextAlign,
    VerticalAlign,
    TextDecoration,
    Markdown,
    Multiline,
    FontFamily,
    FontSize,
    Opacity,
    Source,
    PreserveAspect,
}

impl PropKey {
    /// Every key, in diff order.
    pub const ALL: [PropKey; 21] = [
        PropKey::Fill,
        PropKey::StrokeColor,
        PropKey::StrokeWidth,
        PropKey::StrokeStyle,
        PropKey::LineCap,
        PropKey::LineJoin,
        PropKey::Bounds,
        PropKey::CornerRadius,
        PropKey::PathData,
        PropKey::Rotation,
        PropKey::Text,
        PropKey::TextAlign,
        PropKey::VerticalAlign,
        PropKey::TextDecoration,
        PropKey::Markdown,
        PropKey::Multiline,
        PropKey::FontFamily,
        PropKey::FontSize,
        PropKey::Opacity,
        PropKey::Source,
        PropKey::PreserveAspect,
    ];
}

/// Dash style of a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StrokeStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

impl StrokeStyle {
    /// Dash pattern for a stroke of `width`, empty for solid strokes.
    pub fn dash_pattern(self, width: f64) -> Vec<f64> {
        let w = width.max(1.0);
        match self {
            StrokeStyle::Solid => Vec::new(),
            StrokeStyle::Dashed => vec![w * 3.0, w * 2.0],
            StrokeStyle::Dotted => vec![w, w],
        }
    }
}

/// Shape of stroke ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

impl LineCap {
    pub fn as_str(self) -> &'static str {
        match self {
            LineCap::Butt => "butt",
            LineCap::Round => "round",
            LineCap::Square => "square",
        }
    }
}

/// Shape of stroke corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LineJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

impl LineJoin {
    pub fn as_str(self) -> &'static str {
        match self {
            LineJoin::Miter => "miter",
            LineJoin::Round => "round",
            LineJoin::Bevel => "bevel",
        }
    }
}

/// Value of one visual property.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Color(Rgba),
    Number(f64),
    Bool(bool),
    Rect(Rect),
    Rotation(Rotation),
    Str(String),
    Text(RichText),
    Source(Option<String>),
    Dash(StrokeStyle),
    Cap(LineCap),
    Join(LineJoin),
    Align(TextAlign),
    VAlign(VerticalAlign),
    Decoration(TextDecoration),
}

impl PropValue {
    pub fn as_color(&self) -> Option<Rgba> {
        match self {
            PropValue::Color(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_rect(&self) -> Option<Rect> {
        match self {
            PropValue::Rect(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_rotation(&self) -> Option<Rotation> {
        match self {
            PropValue::Rotation(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&RichText> {
        match self {
            PropValue::Text(t) => Some(t),
            _ => None,
        }
    }

    /// The requested raster source; `None` both for a null source and a
    /// value of another type.
    pub fn as_source(&self) -> Option<&str> {
        match self {
            PropValue::Source(s) => s.as_deref(),
            _ => None,
        }
    }

    pub fn as_dash(&self) -> Option<StrokeStyle> {
        match self {
            PropValue::Dash(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_cap(&self) -> Option<LineCap> {
        match self {
            PropValue::Cap(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_join(&self) -> Option<LineJoin> {
        match self {
            PropValue::Join(j) => Some(*j),
            _ => None,
        }
    }

    pub fn as_align(&self) -> Option<TextAlign> {
        match self {
            PropValue::Align(a) => Some(*a),
            _ => None,
        }
    }

    pub fn as_valign(&self) -> Option<VerticalAlign> {
        match self {
            PropValue::VAlign(a) => Some(*a),
            _ => None,
        }
    }

    pub fn as_decoration(&self) -> Option<TextDecoration> {
        match self {
            PropValue::Decoration(d) => Some(*d),
            _ => None,
        }
    }
}

/// An ordered record of property values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyBag {
    values: BTreeMap<PropKey, PropValue>,
}

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a property, replacing any previous value.
    pub fn set(&mut self, key: PropKey, value: PropValue) -> &mut Self {
        self.values.insert(key, value);
        self
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, key: PropKey, value: PropValue) -> Self {
        self.values.insert(key, value);
        self
    }

    pub fn get(&self, key: PropKey) -> Option<&PropValue> {
        self.values.get(&key)
    }

    pub fn remove(&mut self, key: PropKey) -> Option<PropValue> {
        self.values.remove(&key)
    }

    pub fn contains(&self, key: PropKey) -> bool {
        self.values.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = PropKey> + '_ {
        self.values.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PropKey, &PropValue)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }

    /// Keys whose value in `self` differs from `cached`, with the new value.
    ///
    /// A key present only in `cached` is reported with `None`: it was unset
    /// since the last pass and its setter must restore the default.
    pub fn changes<'a>(
        &'a self,
        cached: &'a PropertyBag,
    ) -> impl Iterator<Item = (PropKey, Option<&'a PropValue>)> + 'a {
        let added_or_changed = self
            .values
            .iter()
            .filter(move |(key, value)| cached.values.get(*key) != Some(*value))
            .map(|(key, value)| (*key, Some(value)));
        let removed = cached
            .values
            .keys()
            .filter(move |key| !self.values.contains_key(*key))
            .map(|key| (*key, None));
        added_or_changed.chain(removed)
    }

    // Typed accessors used by setters and tests.

    pub fn color(&self, key: PropKey) -> Option<Rgba> {
        self.get(key).and_then(PropValue::as_color)
    }

    pub fn number(&self, key: PropKey) -> Option<f64> {
        self.get(key).and_then(PropValue::as_number)
    }

    pub fn rect(&self, key: PropKey) -> Option<Rect> {
        self.get(key).and_then(PropValue::as_rect)
    }

    pub fn flag(&self, key: PropKey) -> Option<bool> {
        self.get(key).and_then(PropValue::as_bool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_changes_reports_only_differences() {
        let cached = PropertyBag::new()
            .with(PropKey::Fill, PropValue::Color(Rgba::rgb(255, 0, 0)))
            .with(PropKey::StrokeWidth, PropValue::Number(2.0));
        let next = PropertyBag::new()
            .with(PropKey::Fill, PropValue::Color(Rgba::rgb(255, 0, 0)))
            .with(PropKey::StrokeWidth, PropValue::Number(3.0));

        let changes: Vec<_> = next.changes(&cached).collect();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].0, PropKey::StrokeWidth);
        assert_eq!(changes[0].1, Some(&PropValue::Number(3.0)));
    }

    #[test]
    fn test_changes_reports_removed_keys() {
        let cached = PropertyBag::new().with(PropKey::Opacity, PropValue::Number(0.5));
        let next = PropertyBag::new();
        let changes: Vec<_> = next.changes(&cached).collect();
        assert_eq!(changes, vec![(PropKey::Opacity, None)]);
    }

    #[test]
    fn test_identical_bags_have_no_changes() {
        let bag = PropertyBag::new()
            .with(PropKey::Bounds, PropValue::Rect(Rect::new(0.0, 0.0, 1.0, 1.0)))
            .with(PropKey::Source, PropValue::Source(Some("a.png".into())));
        assert_eq!(bag.changes(&bag.clone()).count(), 0);
    }

    #[test]
    fn test_dash_pattern_scales_with_width() {
        assert!(StrokeStyle::Solid.dash_pattern(2.0).is_empty());
        assert_eq!(StrokeStyle::Dashed.dash_pattern(2.0), vec![6.0, 4.0]);
        assert_eq!(StrokeStyle::Dotted.dash_pattern(0.5), vec![1.0, 1.0]);
    }
}
