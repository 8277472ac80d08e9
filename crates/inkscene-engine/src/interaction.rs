//! Interaction pipeline.
//!
//! Listeners are plain bags of optional callbacks. Every subscribe or
//! unsubscribe recomposes one handler per event kind: the newest listener
//! runs first and receives `next`, the composition of everything registered
//! before it. A listener that does not call `next` swallows the event.
//!
//! A kind nobody listens to composes to `None`, which lets the engine skip
//! hit testing for it entirely.

use crate::item::ItemRef;
use crate::object::ObjectId;
use inkscene_core::{KeyInput, Modifiers, MouseButton, PointerInput};
use kurbo::Point;
use std::fmt;
use std::rc::Rc;

/// A pointer event resolved against the scene.
#[derive(Clone)]
pub struct MouseEvent {
    /// Pointer position in content coordinates.
    pub position: Point,
    /// Topmost engine object under the pointer.
    pub object: Option<ObjectId>,
    /// Model item of the nearest rendered engine item under the pointer.
    pub item: Option<ItemRef>,
    /// The native input, in screen coordinates.
    pub input: PointerInput,
}

impl MouseEvent {
    pub fn screen_position(&self) -> Point {
        self.input.position
    }

    pub fn button(&self) -> MouseButton {
        self.input.button
    }

    pub fn modifiers(&self) -> Modifiers {
        self.input.modifiers
    }
}

impl fmt::Debug for MouseEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MouseEvent")
            .field("position", &self.position)
            .field("object", &self.object)
            .field("item", &self.item.as_ref().map(|item| item.id()))
            .field("input", &self.input)
            .finish()
    }
}

pub type KeyEvent = KeyInput;

/// The canvas lost focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlurEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Blur,
    Click,
    DoubleClick,
    MouseDown,
    MouseDrag,
    MouseMove,
    MouseUp,
    KeyDown,
    KeyUp,
}

impl EventKind {
    pub const ALL: [EventKind; 9] = [
        EventKind::Blur,
        EventKind::Click,
        EventKind::DoubleClick,
        EventKind::MouseDown,
        EventKind::MouseDrag,
        EventKind::MouseMove,
        EventKind::MouseUp,
        EventKind::KeyDown,
        EventKind::KeyUp,
    ];
}

/// A listener callback: the event and the rest of the chain.
pub type Callback<E> = Rc<dyn Fn(&E, &dyn Fn(&E))>;

/// A composed chain for one event kind.
pub type Handler<E> = Rc<dyn Fn(&E)>;

/// Optional callbacks, one per event kind.
#[derive(Clone, Default)]
pub struct Listener {
    pub mouse_move: Option<Callback<MouseEvent>>,
    pub mouse_down: Option<Callback<MouseEvent>>,
    pub mouse_drag: Option<Callback<MouseEvent>>,
    pub mouse_up: Option<Callback<MouseEvent>>,
    pub click: Option<Callback<MouseEvent>>,
    pub double_click: Option<Callback<MouseEvent>>,
    pub key_down: Option<Callback<KeyEvent>>,
    pub key_up: Option<Callback<KeyEvent>>,
    pub blur: Option<Callback<BlurEvent>>,
}

macro_rules! listener_builders {
    ($($method:ident => $field:ident : $event:ty),* $(,)?) => {$(
        pub fn $method(mut self, f: impl Fn(&$event, &dyn Fn(&$event)) + 'static) -> Self {
            self.$field = Some(Rc::new(f));
            self
        }
    )*};
}

impl Listener {
    pub fn new() -> Self {
        Self::default()
    }

    listener_builders! {
        on_mouse_move => mouse_move: MouseEvent,
        on_mouse_down => mouse_down: MouseEvent,
        on_mouse_drag => mouse_drag: MouseEvent,
        on_mouse_up => mouse_up: MouseEvent,
        on_click => click: MouseEvent,
        on_double_click => double_click: MouseEvent,
        on_key_down => key_down: KeyEvent,
        on_key_up => key_up: KeyEvent,
        on_blur => blur: BlurEvent,
    }

    fn mouse_callback(&self, kind: EventKind) -> Option<&Callback<MouseEvent>> {
        match kind {
            EventKind::MouseMove => self.mouse_move.as_ref(),
            EventKind::MouseDown => self.mouse_down.as_ref(),
            EventKind::MouseDrag => self.mouse_drag.as_ref(),
            EventKind::MouseUp => self.mouse_up.as_ref(),
            EventKind::Click => self.click.as_ref(),
            EventKind::DoubleClick => self.double_click.as_ref(),
            EventKind::Blur | EventKind::KeyDown | EventKind::KeyUp => None,
        }
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let set: Vec<&str> = [
            ("mouse_move", self.mouse_move.is_some()),
            ("mouse_down", self.mouse_down.is_some()),
            ("mouse_drag", self.mouse_drag.is_some()),
            ("mouse_up", self.mouse_up.is_some()),
            ("click", self.click.is_some()),
            ("double_click", self.double_click.is_some()),
            ("key_down", self.key_down.is_some()),
            ("key_up", self.key_up.is_some()),
            ("blur", self.blur.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, present)| present.then_some(name))
        .collect();
        f.debug_tuple("Listener").field(&set).finish()
    }
}

/// Identifies a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Fold callbacks, oldest first, so the last one becomes the outermost.
fn compose<'a, E: 'static>(callbacks: impl Iterator<Item = &'a Callback<E>>) -> Option<Handler<E>> {
    let mut chain: Option<Handler<E>> = None;
    for callback in callbacks {
        let callback = Rc::clone(callback);
        let rest = chain.take();
        chain = Some(Rc::new(move |event: &E| {
            let next = |event: &E| {
                if let Some(rest) = &rest {
                    rest(event);
                }
            };
            callback(event, &next);
        }));
    }
    chain
}

#[derive(Default)]
struct Composed {
    blur: Option<Handler<BlurEvent>>,
    click: Option<Handler<MouseEvent>>,
    double_click: Option<Handler<MouseEvent>>,
    mouse_down: Option<Handler<MouseEvent>>,
    mouse_drag: Option<Handler<MouseEvent>>,
    mouse_move: Option<Handler<MouseEvent>>,
    mouse_up: Option<Handler<MouseEvent>>,
    key_down: Option<Handler<KeyEvent>>,
    key_up: Option<Handler<KeyEvent>>,
}

/// Subscribed listeners and their composed handlers.
#[derive(Default)]
pub struct InteractionPipeline {
    listeners: Vec<(ListenerId, Listener)>,
    next_id: u64,
    composed: Composed,
}

impl InteractionPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: Listener) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners.push((id, listener));
        self.recompose();
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        let removed = self.listeners.len() != before;
        if removed {
            self.recompose();
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    fn recompose(&mut self) {
        let listeners = || self.listeners.iter().map(|(_, listener)| listener);
        let mouse = |kind: EventKind| compose(listeners().filter_map(|l| l.mouse_callback(kind)));
        self.composed = Composed {
            blur: compose(listeners().filter_map(|l| l.blur.as_ref())),
            click: mouse(EventKind::Click),
            double_click: mouse(EventKind::DoubleClick),
            mouse_down: mouse(EventKind::MouseDown),
            mouse_drag: mouse(EventKind::MouseDrag),
            mouse_move: mouse(EventKind::MouseMove),
            mouse_up: mouse(EventKind::MouseUp),
            key_down: compose(listeners().filter_map(|l| l.key_down.as_ref())),
            key_up: compose(listeners().filter_map(|l| l.key_up.as_ref())),
        };
        log::trace!("recomposed pipeline of {} listeners", self.listeners.len());
    }

    /// Whether nobody listens to `kind`.
    pub fn is_idle(&self, kind: EventKind) -> bool {
        let c = &self.composed;
        match kind {
            EventKind::Blur => c.blur.is_none(),
            EventKind::KeyDown => c.key_down.is_none(),
            EventKind::KeyUp => c.key_up.is_none(),
            _ => self.mouse_handler(kind).is_none(),
        }
    }

    /// Composed handler for a pointer event kind.
    pub fn mouse_handler(&self, kind: EventKind) -> Option<Handler<MouseEvent>> {
        let c = &self.composed;
        match kind {
            EventKind::Click => c.click.clone(),
            EventKind::DoubleClick => c.double_click.clone(),
            EventKind::MouseDown => c.mouse_down.clone(),
            EventKind::MouseDrag => c.mouse_drag.clone(),
            EventKind::MouseMove => c.mouse_move.clone(),
            EventKind::MouseUp => c.mouse_up.clone(),
            EventKind::Blur | EventKind::KeyDown | EventKind::KeyUp => None,
        }
    }

    /// Composed handler for a key event kind.
    pub fn key_handler(&self, kind: EventKind) -> Option<Handler<KeyEvent>> {
        match kind {
            EventKind::KeyDown => self.composed.key_down.clone(),
            EventKind::KeyUp => self.composed.key_up.clone(),
            _ => None,
        }
    }

    pub fn blur_handler(&self) -> Option<Handler<BlurEvent>> {
        self.composed.blur.clone()
    }

    pub fn emit_mouse(&self, kind: EventKind, event: &MouseEvent) {
        if let Some(handler) = self.mouse_handler(kind) {
            handler(event);
        }
    }

    pub fn emit_key(&self, kind: EventKind, event: &KeyEvent) {
        if let Some(handler) = self.key_handler(kind) {
            handler(event);
        }
    }

    pub fn emit_blur(&self) {
        if let Some(handler) = self.blur_handler() {
            handler(&BlurEvent);
        }
    }
}

impl fmt::Debug for InteractionPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteractionPipeline")
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}
