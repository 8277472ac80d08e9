//! Demo model items.

use inkscene_core::{Rgba, StyleSource};
use inkscene_engine::{DiagramItem, ItemRef};
use kurbo::Rect;
use std::any::Any;
use std::rc::Rc;
use uuid::Uuid;

/// A push button. Pressing produces a new button value.
#[derive(Debug, Clone)]
pub struct Button {
    pub id: Uuid,
    pub bounds: Rect,
    pub label: String,
    pub fill: Rgba,
    pub pressed: bool,
    pub rotation: f64,
}

impl Button {
    pub fn new(label: &str, bounds: Rect, fill: Rgba) -> Self {
        Self {
            id: Uuid::new_v4(),
            bounds,
            label: label.to_string(),
            fill,
            pressed: false,
            rotation: 0.0,
        }
    }

    pub fn toggled(&self) -> Self {
        Self {
            pressed: !self.pressed,
            ..self.clone()
        }
    }

    pub fn into_ref(self) -> ItemRef {
        Rc::new(self)
    }
}

impl StyleSource for Button {
    fn background_color(&self) -> Option<Rgba> {
        Some(self.fill)
    }

    fn stroke_color(&self) -> Option<Rgba> {
        Some(if self.pressed {
            Rgba::rgb(30, 30, 120)
        } else {
            Rgba::rgb(60, 60, 60)
        })
    }

    fn text(&self) -> Option<String> {
        Some(self.label.clone())
    }
}

impl DiagramItem for Button {
    fn id(&self) -> Uuid {
        self.id
    }

    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn rotation(&self) -> f64 {
        self.rotation
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// An image clipped to a rounded frame.
#[derive(Debug, Clone)]
pub struct Picture {
    pub id: Uuid,
    pub bounds: Rect,
    pub source: Option<String>,
}

impl Picture {
    pub fn new(source: Option<String>, bounds: Rect) -> ItemRef {
        Rc::new(Self {
            id: Uuid::new_v4(),
            bounds,
            source,
        })
    }
}

impl StyleSource for Picture {
    fn stroke_color(&self) -> Option<Rgba> {
        Some(Rgba::rgb(120, 120, 120))
    }
}

impl DiagramItem for Picture {
    fn id(&self) -> Uuid {
        self.id
    }

    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
