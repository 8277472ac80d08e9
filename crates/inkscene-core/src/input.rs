//! Native input model and input state tracking.
//!
//! The host converts its windowing events into [`NativeEvent`]s; the engine
//! feeds them through an [`InputState`], which tracks pressed buttons and
//! keys and synthesises clicks and double-clicks.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
    Back,
    Forward,
    Other(u16),
}

impl From<winit::event::MouseButton> for MouseButton {
    fn from(button: winit::event::MouseButton) -> Self {
        match button {
            winit::event::MouseButton::Left => MouseButton::Left,
            winit::event::MouseButton::Right => MouseButton::Right,
            winit::event::MouseButton::Middle => MouseButton::Middle,
            winit::event::MouseButton::Back => MouseButton::Back,
            winit::event::MouseButton::Forward => MouseButton::Forward,
            winit::event::MouseButton::Other(n) => MouseButton::Other(n),
        }
    }
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub fn any(&self) -> bool {
        self.shift || self.ctrl || self.alt || self.meta
    }
}

impl From<winit::keyboard::ModifiersState> for Modifiers {
    fn from(state: winit::keyboard::ModifiersState) -> Self {
        Self {
            shift: state.shift_key(),
            ctrl: state.control_key(),
            alt: state.alt_key(),
            meta: state.super_key(),
        }
    }
}

/// A pointer event in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerInput {
    pub position: Point,
    /// Button that changed state; ignored for moves.
    pub button: MouseButton,
    pub modifiers: Modifiers,
    /// Event time in milliseconds on the host's clock. When absent the input
    /// state stamps the event itself.
    pub time_ms: Option<u64>,
}

impl PointerInput {
    pub fn at(position: Point) -> Self {
        Self {
            position,
            button: MouseButton::Left,
            modifiers: Modifiers::NONE,
            time_ms: None,
        }
    }

    pub fn with_button(mut self, button: MouseButton) -> Self {
        self.button = button;
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn at_time(mut self, time_ms: u64) -> Self {
        self.time_ms = Some(time_ms);
        self
    }
}

/// A keyboard event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInput {
    /// Logical key name, e.g. `"a"`, `"Delete"`, `"Escape"`.
    pub key: String,
    pub modifiers: Modifiers,
}

impl KeyInput {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            modifiers: Modifiers::NONE,
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// Input delivered by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NativeEvent {
    PointerDown(PointerInput),
    PointerMove(PointerInput),
    PointerUp(PointerInput),
    KeyDown(KeyInput),
    KeyUp(KeyInput),
    /// The surface lost focus.
    Blur,
}

/// Default maximum pointer travel between press and release for a click.
pub const DEFAULT_CLICK_TOLERANCE: f64 = 4.0;
/// Default maximum delay between two presses of a double-click.
pub const DEFAULT_DOUBLE_CLICK_MS: u64 = 500;
/// Default maximum distance between two presses of a double-click.
pub const DEFAULT_DOUBLE_CLICK_DISTANCE: f64 = 5.0;

/// What a pointer press or release produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Gesture {
    pub click: bool,
    pub double_click: bool,
}

/// Tracks buttons, keys and click timing across events.
#[derive(Debug, Clone)]
pub struct InputState {
    pub pointer_position: Point,
    pub previous_pointer_position: Point,
    pub modifiers: Modifiers,
    pressed_buttons: HashSet<MouseButton>,
    pressed_keys: HashSet<String>,
    /// Where the current press started, per button.
    press_origin: Option<(MouseButton, Point)>,
    last_press: Option<(u64, Point)>,
    click_tolerance: f64,
    double_click_ms: u64,
    double_click_distance: f64,
    epoch: Instant,
}

impl Default for InputState {
    fn default() -> Self {
        Self::with_thresholds(
            DEFAULT_CLICK_TOLERANCE,
            DEFAULT_DOUBLE_CLICK_MS,
            DEFAULT_DOUBLE_CLICK_DISTANCE,
        )
    }
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thresholds(
        click_tolerance: f64,
        double_click_ms: u64,
        double_click_distance: f64,
    ) -> Self {
        Self {
            pointer_position: Point::ZERO,
            previous_pointer_position: Point::ZERO,
            modifiers: Modifiers::NONE,
            pressed_buttons: HashSet::new(),
            pressed_keys: HashSet::new(),
            press_origin: None,
            last_press: None,
            click_tolerance: click_tolerance.max(0.0),
            double_click_ms,
            double_click_distance: double_click_distance.max(0.0),
            epoch: Instant::now(),
        }
    }

    fn stamp(&self, input: &PointerInput) -> u64 {
        input
            .time_ms
            .unwrap_or_else(|| self.epoch.elapsed().as_millis() as u64)
    }

    fn track(&mut self, input: &PointerInput) {
        self.previous_pointer_position = self.pointer_position;
        self.pointer_position = input.position;
        self.modifiers = input.modifiers;
    }

    /// Record a press. Reports a double-click when this press follows the
    /// previous one closely enough in time and space.
    pub fn pointer_down(&mut self, input: &PointerInput) -> Gesture {
        self.track(input);
        self.pressed_buttons.insert(input.button);
        if self.press_origin.is_none() {
            self.press_origin = Some((input.button, input.position));
        }
        if input.button != MouseButton::Left {
            return Gesture::default();
        }

        let now = self.stamp(input);
        let double_click = match self.last_press {
            Some((time, position)) => {
                now.saturating_sub(time) < self.double_click_ms
                    && (input.position - position).hypot() < self.double_click_distance
            }
            None => false,
        };
        // A detected double-click starts over so a third press is single again.
        self.last_press = if double_click {
            None
        } else {
            Some((now, input.position))
        };
        Gesture {
            click: false,
            double_click,
        }
    }

    /// Record a move. Returns whether any button is held (a drag).
    pub fn pointer_move(&mut self, input: &PointerInput) -> bool {
        self.track(input);
        self.is_dragging()
    }

    /// Record a release. Reports a click when the pointer stayed within the
    /// click tolerance of where the same button went down.
    pub fn pointer_up(&mut self, input: &PointerInput) -> Gesture {
        self.track(input);
        let was_pressed = self.pressed_buttons.remove(&input.button);
        let click = match self.press_origin {
            Some((button, origin)) if button == input.button => {
                self.press_origin = None;
                was_pressed && (input.position - origin).hypot() <= self.click_tolerance
            }
            _ => false,
        };
        Gesture {
            click,
            double_click: false,
        }
    }

    pub fn key_down(&mut self, input: &KeyInput) {
        self.modifiers = input.modifiers;
        self.pressed_keys.insert(input.key.clone());
    }

    pub fn key_up(&mut self, input: &KeyInput) {
        self.modifiers = input.modifiers;
        self.pressed_keys.remove(&input.key);
    }

    /// Forget held buttons, keys and pending presses.
    pub fn reset(&mut self) {
        self.pressed_buttons.clear();
        self.pressed_keys.clear();
        self.press_origin = None;
        self.last_press = None;
        self.modifiers = Modifiers::NONE;
    }

    pub fn is_button_pressed(&self, button: MouseButton) -> bool {
        self.pressed_buttons.contains(&button)
    }

    pub fn is_dragging(&self) -> bool {
        !self.pressed_buttons.is_empty()
    }

    pub fn is_key_pressed(&self, key: &str) -> bool {
        self.pressed_keys.contains(key)
    }

    /// Pointer movement since the previous pointer event.
    pub fn pointer_delta(&self) -> Vec2 {
        self.pointer_position - self.previous_pointer_position
    }

    /// Offset from the press that started the current drag.
    pub fn drag_delta(&self) -> Option<Vec2> {
        self.press_origin
            .map(|(_, origin)| self.pointer_position - origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f64, y: f64, t: u64) -> PointerInput {
        PointerInput::at(Point::new(x, y)).at_time(t)
    }

    #[test]
    fn test_press_and_release_is_click() {
        let mut input = InputState::new();
        input.pointer_down(&at(100.0, 100.0, 0));
        assert!(input.is_button_pressed(MouseButton::Left));
        let gesture = input.pointer_up(&at(102.0, 101.0, 50));
        assert!(gesture.click);
        assert!(!input.is_button_pressed(MouseButton::Left));
    }

    #[test]
    fn test_release_far_away_is_not_click() {
        let mut input = InputState::new();
        input.pointer_down(&at(100.0, 100.0, 0));
        assert!(input.pointer_move(&at(150.0, 120.0, 10)));
        let delta = input.drag_delta().unwrap();
        assert_eq!(delta, Vec2::new(50.0, 20.0));
        assert!(!input.pointer_up(&at(150.0, 120.0, 20)).click);
        assert!(!input.is_dragging());
    }

    #[test]
    fn test_release_other_button_is_not_click() {
        let mut input = InputState::new();
        input.pointer_down(&at(0.0, 0.0, 0));
        let up = at(0.0, 0.0, 5).with_button(MouseButton::Right);
        assert!(!input.pointer_up(&up).click);
    }

    #[test]
    fn test_double_click_detection() {
        let mut input = InputState::new();
        assert!(!input.pointer_down(&at(100.0, 100.0, 0)).double_click);
        input.pointer_up(&at(100.0, 100.0, 40));
        assert!(input.pointer_down(&at(101.0, 100.0, 200)).double_click);
        input.pointer_up(&at(101.0, 100.0, 240));
        // third press starts a new sequence
        assert!(!input.pointer_down(&at(101.0, 100.0, 300)).double_click);
    }

    #[test]
    fn test_double_click_too_slow_or_far() {
        let mut input = InputState::with_thresholds(4.0, 300, 5.0);
        input.pointer_down(&at(0.0, 0.0, 0));
        input.pointer_up(&at(0.0, 0.0, 10));
        assert!(!input.pointer_down(&at(0.0, 0.0, 400)).double_click);
        input.pointer_up(&at(0.0, 0.0, 410));
        assert!(!input.pointer_down(&at(50.0, 50.0, 450)).double_click);
    }

    #[test]
    fn test_keys_and_reset() {
        let mut input = InputState::new();
        input.key_down(&KeyInput::new("a"));
        assert!(input.is_key_pressed("a"));
        input.key_up(&KeyInput::new("a"));
        assert!(!input.is_key_pressed("a"));

        input.key_down(&KeyInput::new("Shift"));
        input.pointer_down(&at(0.0, 0.0, 0));
        input.reset();
        assert!(!input.is_key_pressed("Shift"));
        assert!(!input.is_dragging());
    }

    #[test]
    fn test_winit_conversions() {
        assert_eq!(
            MouseButton::from(winit::event::MouseButton::Middle),
            MouseButton::Middle
        );
        let mods = Modifiers::from(winit::keyboard::ModifiersState::SHIFT);
        assert!(mods.shift && !mods.ctrl);
    }
}
