use std::collections::{BTreeMap, BTreeSet};

use euclid::default::{Point2D, Vector2D};

use crate::{
    constants::{AXIS_DEADZONE, DEFAULT_MULTI_DELAY},
    error::{Error, Result},
};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum Key {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,
    Num0,
    Num1,
    Num2,
    Num3,
    Num4,
    Num5,
    Num6,
    Num7,
    Num8,
    Num9,
    Numpad0,
    Numpad1,
    Numpad2,
    Numpad3,
    Numpad4,
    Numpad5,
    Numpad6,
    Numpad7,
    Numpad8,
    Numpad9,
    NumpadAdd,
    NumpadSubtract,
    NumpadMultiply,
    NumpadDivide,
    NumpadReturn,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    LCtrl,
    LAlt,
    LShift,
    RCtrl,
    RAlt,
    RShift,
    Space,
    Tab,
    Backspace,
    Return,
    Escape,
    Slash,
    Insert,
    Home,
    Delete,
    End,
    PageUp,
    PageDown,
    Left,
    Up,
    Right,
    Down,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    Other(u8),
}

/// Gamepad buttons. Sticks and triggers show up as buttons once pushed
/// past the deadzone.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum Button {
    Left,
    Right,
    Up,
    Down,
    A,
    B,
    X,
    Y,
    L1,
    L2,
    L3,
    R1,
    R2,
    R3,
    Start,
    Select,
    Home,
    RightStickLeft,
    RightStickRight,
    RightStickUp,
    RightStickDown,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Axis {
    LeftX,
    LeftY,
    RightX,
    RightY,
    LeftTrigger,
    RightTrigger,
}

/// A physical input a virtual key can be bound to.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum Interface {
    Key(Key),
    Pointer(MouseButton),
    Controller { port: u8, button: Button },
}

#[derive(Copy, Clone, Debug)]
pub enum InputEvent {
    KeyDown(Key),
    KeyUp(Key),
    MouseDown(MouseButton),
    MouseUp(MouseButton),
    /// Window coordinates.
    MouseMove(Point2D<f32>),
    MouseWheel(Vector2D<f32>),
    ControllerDown { port: u8, button: Button },
    ControllerUp { port: u8, button: Button },
    ControllerAxis { port: u8, axis: Axis, value: f32 },
}

/// Held/released bit plus a one-tick edge bit.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct KeyState(u8);

impl KeyState {
    pub const RELEASED: KeyState = KeyState(0x01);
    pub const PRESSED: KeyState = KeyState(0x02);
    pub const JUST_PRESSED: KeyState = KeyState(0x06);
    pub const JUST_RELEASED: KeyState = KeyState(0x09);
    const STATE_MASK: u8 = 0x03;

    pub fn is_pressed(self) -> bool {
        self.0 & KeyState::PRESSED.0 != 0
    }

    pub fn is_released(self) -> bool {
        self.0 & KeyState::RELEASED.0 != 0
    }

    pub fn just_pressed(self) -> bool {
        self == KeyState::JUST_PRESSED
    }

    pub fn just_released(self) -> bool {
        self == KeyState::JUST_RELEASED
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    fn settled(self) -> KeyState {
        KeyState(self.0 & KeyState::STATE_MASK)
    }
}

/// What `Input::key_state` reports for a virtual key.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct KeyStatus {
    pub state: KeyState,
    /// Bound inputs currently held.
    pub asserting: u32,
    /// Presses in a row, each within the multi-press delay of the last.
    pub presses: u32,
}

#[derive(Copy, Clone, Debug)]
struct VirtualKey {
    state: KeyState,
    asserting: u32,
    presses: u32,
    last_press: Option<u32>,
}

impl Default for VirtualKey {
    fn default() -> Self {
        Self {
            state: KeyState::RELEASED,
            asserting: 0,
            presses: 0,
            last_press: None,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum Capture {
    Idle,
    Requested,
    Got(Interface),
}

/// Virtual keys fed by queued device events, latched once per update tick.
#[derive(Debug)]
pub struct Input {
    keys: Vec<VirtualKey>,
    bindings: BTreeMap<Interface, usize>,
    held: BTreeSet<Interface>,
    queue: Vec<InputEvent>,
    pointer: Point2D<i32>,
    pointer_scale: (f32, f32),
    wheel: Vector2D<f32>,
    multi_delay: u32,
    time: u32,
    capture: Capture,
}

impl Default for Input {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            bindings: BTreeMap::new(),
            held: BTreeSet::new(),
            queue: Vec::new(),
            pointer: Point2D::zero(),
            pointer_scale: (1.0, 1.0),
            wheel: Vector2D::zero(),
            multi_delay: DEFAULT_MULTI_DELAY,
            time: 0,
            capture: Capture::Idle,
        }
    }
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_virtual_key(&mut self) -> usize {
        self.keys.push(VirtualKey::default());
        self.keys.len() - 1
    }

    pub fn bind(&mut self, handle: usize, iface: Interface) -> Result<()> {
        self.check_handle(handle)?;
        if self.bindings.contains_key(&iface) {
            return Err(Error::InputAlreadyBound);
        }
        self.bindings.insert(iface, handle);
        self.recount();
        Ok(())
    }

    /// Drops every binding of `handle` (and any other owner of `iface`),
    /// then binds `iface` to it.
    pub fn rebind(&mut self, handle: usize, iface: Interface) -> Result<()> {
        self.check_handle(handle)?;
        self.bindings.retain(|bound, owner| *owner != handle && *bound != iface);
        self.bindings.insert(iface, handle);
        self.recount();
        Ok(())
    }

    pub fn unbind(&mut self, iface: Interface) -> Result<()> {
        self.bindings.remove(&iface).ok_or(Error::InputNotBound)?;
        self.recount();
        Ok(())
    }

    pub fn bound_to(&self, iface: Interface) -> Option<usize> {
        self.bindings.get(&iface).copied()
    }

    /// Releases everything, as after losing focus.
    pub fn reset(&mut self) {
        for key in &mut self.keys {
            *key = VirtualKey::default();
        }
        self.held.clear();
        self.queue.clear();
        self.wheel = Vector2D::zero();
    }

    pub fn set_multi_delay(&mut self, ms: u32) {
        self.multi_delay = ms;
    }

    /// Ratio from window to backbuffer coordinates.
    pub fn set_pointer_scale(&mut self, sx: f32, sy: f32) {
        self.pointer_scale = (sx, sy);
    }

    pub fn set_pointer_position(&mut self, x: i32, y: i32) {
        self.pointer = Point2D::new(x, y);
    }

    pub fn pointer_position(&self) -> Point2D<i32> {
        self.pointer
    }

    /// Wheel motion accumulated this tick.
    pub fn wheel(&self) -> Vector2D<f32> {
        self.wheel
    }

    pub fn push_event(&mut self, event: InputEvent) {
        self.queue.push(event);
    }

    /// Clears last tick's edges, then applies the queued events.
    pub fn begin_tick(&mut self, elapsed_ms: u32) {
        self.time = self.time.wrapping_add(elapsed_ms);
        self.wheel = Vector2D::zero();
        for key in &mut self.keys {
            key.state = key.state.settled();
        }
        let queue = std::mem::take(&mut self.queue);
        for event in &queue {
            self.apply(*event);
        }
        self.queue = queue;
        self.queue.clear();
    }

    pub fn key_state(&self, handle: usize) -> Result<KeyStatus> {
        self.check_handle(handle)?;
        let key = &self.keys[handle];
        Ok(KeyStatus {
            state: key.state,
            asserting: key.asserting,
            presses: key.presses,
        })
    }

    /// Starts listening for the next physical input pressed.
    pub fn request_last_pressed(&mut self) {
        self.capture = Capture::Requested;
    }

    pub fn last_pressed(&mut self) -> Result<Interface> {
        match self.capture {
            Capture::Got(iface) => {
                self.capture = Capture::Idle;
                Ok(iface)
            }
            Capture::Requested => Err(Error::Waiting),
            Capture::Idle => Err(Error::OperationNotActive),
        }
    }

    fn check_handle(&self, handle: usize) -> Result<()> {
        if handle >= self.keys.len() {
            return Err(Error::InputInvalidHandle(handle));
        }
        Ok(())
    }

    /// Recomputes `asserting` after the bindings changed. A key that gains
    /// or loses its last held input gets the matching edge.
    fn recount(&mut self) {
        let mut counts = vec![0; self.keys.len()];
        for iface in &self.held {
            if let Some(&handle) = self.bindings.get(iface) {
                counts[handle] += 1;
            }
        }
        for (key, count) in self.keys.iter_mut().zip(counts) {
            if key.asserting == 0 && count > 0 {
                key.state = KeyState::JUST_PRESSED;
            } else if key.asserting > 0 && count == 0 {
                key.state = KeyState::JUST_RELEASED;
            }
            key.asserting = count;
        }
    }

    fn apply(&mut self, event: InputEvent) {
        match event {
            InputEvent::KeyDown(key) => self.press(Interface::Key(key)),
            InputEvent::KeyUp(key) => self.release(Interface::Key(key)),
            InputEvent::MouseDown(button) => self.press(Interface::Pointer(button)),
            InputEvent::MouseUp(button) => self.release(Interface::Pointer(button)),
            InputEvent::MouseMove(position) => {
                let (sx, sy) = self.pointer_scale;
                self.pointer = Point2D::new((position.x * sx) as i32, (position.y * sy) as i32);
            }
            InputEvent::MouseWheel(delta) => self.wheel += delta,
            InputEvent::ControllerDown { port, button } => {
                self.press(Interface::Controller { port, button })
            }
            InputEvent::ControllerUp { port, button } => {
                self.release(Interface::Controller { port, button })
            }
            InputEvent::ControllerAxis { port, axis, value } => self.axis(port, axis, value),
        }
    }

    fn axis(&mut self, port: u8, axis: Axis, value: f32) {
        let (negative, positive) = match axis {
            Axis::LeftX => (Some(Button::Left), Button::Right),
            Axis::LeftY => (Some(Button::Up), Button::Down),
            Axis::RightX => (Some(Button::RightStickLeft), Button::RightStickRight),
            Axis::RightY => (Some(Button::RightStickUp), Button::RightStickDown),
            Axis::LeftTrigger => (None, Button::L2),
            Axis::RightTrigger => (None, Button::R2),
        };
        self.set_held(Interface::Controller { port, button: positive }, value > AXIS_DEADZONE);
        if let Some(button) = negative {
            self.set_held(Interface::Controller { port, button }, value < -AXIS_DEADZONE);
        }
    }

    fn set_held(&mut self, iface: Interface, held: bool) {
        if held {
            self.press(iface);
        } else {
            self.release(iface);
        }
    }

    fn press(&mut self, iface: Interface) {
        if !self.held.insert(iface) {
            return;
        }
        if self.capture == Capture::Requested {
            self.capture = Capture::Got(iface);
        }
        let handle = match self.bindings.get(&iface) {
            Some(&handle) => handle,
            None => return,
        };
        let (time, delay) = (self.time, self.multi_delay);
        let key = &mut self.keys[handle];
        key.asserting += 1;
        if key.asserting == 1 {
            key.state = KeyState::JUST_PRESSED;
            key.presses = match key.last_press {
                Some(last) if time.wrapping_sub(last) <= delay => key.presses + 1,
                _ => 1,
            };
            key.last_press = Some(time);
        }
    }

    fn release(&mut self, iface: Interface) {
        if !self.held.remove(&iface) {
            return;
        }
        let handle = match self.bindings.get(&iface) {
            Some(&handle) => handle,
            None => return,
        };
        let key = &mut self.keys[handle];
        key.asserting = key.asserting.saturating_sub(1);
        if key.asserting == 0 {
            key.state = KeyState::JUST_RELEASED;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(input: &mut Input, events: &[InputEvent]) {
        for event in events {
            input.push_event(*event);
        }
        input.begin_tick(16);
    }

    #[test]
    fn test_edges_last_one_tick() {
        let mut input = Input::new();
        let jump = input.add_virtual_key();
        input.bind(jump, Interface::Key(Key::Space)).unwrap();

        tick(&mut input, &[InputEvent::KeyDown(Key::Space)]);
        assert!(input.key_state(jump).unwrap().state.just_pressed());
        tick(&mut input, &[]);
        assert_eq!(input.key_state(jump).unwrap().state, KeyState::PRESSED);
        tick(&mut input, &[InputEvent::KeyUp(Key::Space)]);
        assert!(input.key_state(jump).unwrap().state.just_released());
        tick(&mut input, &[]);
        assert_eq!(input.key_state(jump).unwrap().state, KeyState::RELEASED);
    }

    #[test]
    fn test_two_bindings_count_assertions() {
        let mut input = Input::new();
        let fire = input.add_virtual_key();
        input.bind(fire, Interface::Key(Key::X)).unwrap();
        input.bind(fire, Interface::Pointer(MouseButton::Left)).unwrap();
        assert!(matches!(
            input.bind(fire, Interface::Key(Key::X)),
            Err(Error::InputAlreadyBound)
        ));

        tick(&mut input, &[InputEvent::KeyDown(Key::X)]);
        tick(&mut input, &[InputEvent::MouseDown(MouseButton::Left)]);
        let status = input.key_state(fire).unwrap();
        assert_eq!(status.asserting, 2);
        assert_eq!(status.state, KeyState::PRESSED);

        tick(&mut input, &[InputEvent::KeyUp(Key::X)]);
        assert_eq!(input.key_state(fire).unwrap().state, KeyState::PRESSED);
    }

    #[test]
    fn test_axis_deadzone() {
        let mut input = Input::new();
        let left = input.add_virtual_key();
        input
            .bind(left, Interface::Controller { port: 0, button: Button::Left })
            .unwrap();
        let axis = |value| InputEvent::ControllerAxis {
            port: 0,
            axis: Axis::LeftX,
            value,
        };
        tick(&mut input, &[axis(-0.2)]);
        assert!(input.key_state(left).unwrap().state.is_released());
        tick(&mut input, &[axis(-0.8)]);
        assert!(input.key_state(left).unwrap().state.just_pressed());
        tick(&mut input, &[axis(-0.9)]);
        assert_eq!(input.key_state(left).unwrap().state, KeyState::PRESSED);
        tick(&mut input, &[axis(0.0)]);
        assert!(input.key_state(left).unwrap().state.just_released());
    }

    #[test]
    fn test_multi_press() {
        let mut input = Input::new();
        let dash = input.add_virtual_key();
        input.bind(dash, Interface::Key(Key::D)).unwrap();
        input.set_multi_delay(100);
        tick(&mut input, &[InputEvent::KeyDown(Key::D), InputEvent::KeyUp(Key::D)]);
        tick(&mut input, &[InputEvent::KeyDown(Key::D)]);
        assert_eq!(input.key_state(dash).unwrap().presses, 2);
        tick(&mut input, &[InputEvent::KeyUp(Key::D)]);
        for _ in 0..10 {
            tick(&mut input, &[]);
        }
        tick(&mut input, &[InputEvent::KeyDown(Key::D)]);
        assert_eq!(input.key_state(dash).unwrap().presses, 1);
    }

    #[test]
    fn test_last_pressed_capture() {
        let mut input = Input::new();
        assert!(matches!(input.last_pressed(), Err(Error::OperationNotActive)));
        input.request_last_pressed();
        tick(&mut input, &[]);
        assert!(matches!(input.last_pressed(), Err(Error::Waiting)));
        tick(&mut input, &[InputEvent::KeyDown(Key::F5)]);
        assert_eq!(input.last_pressed().unwrap(), Interface::Key(Key::F5));
    }

    #[test]
    fn test_pointer_scaled_to_backbuffer() {
        let mut input = Input::new();
        input.set_pointer_scale(0.25, 0.25);
        tick(&mut input, &[InputEvent::MouseMove(Point2D::new(100.0, 41.0))]);
        assert_eq!(input.pointer_position(), Point2D::new(25, 10));
    }

    #[test]
    fn test_binding_a_held_key_pairs_edges() {
        let mut input = Input::new();
        let h = input.add_virtual_key();
        tick(&mut input, &[InputEvent::KeyDown(Key::A)]);
        input.bind(h, Interface::Key(Key::A)).unwrap();
        let status = input.key_state(h).unwrap();
        assert_eq!(status.asserting, 1);
        assert!(status.state.just_pressed());
        tick(&mut input, &[]);
        assert_eq!(input.key_state(h).unwrap().state, KeyState::PRESSED);
        tick(&mut input, &[InputEvent::KeyUp(Key::A)]);
        assert!(input.key_state(h).unwrap().state.just_released());
        tick(&mut input, &[]);
        assert_eq!(input.key_state(h).unwrap().state, KeyState::RELEASED);
    }

    #[test]
    fn test_rebind_away_from_held_key_releases() {
        let mut input = Input::new();
        let h = input.add_virtual_key();
        input.bind(h, Interface::Key(Key::A)).unwrap();
        tick(&mut input, &[InputEvent::KeyDown(Key::A)]);
        tick(&mut input, &[]);
        input.rebind(h, Interface::Key(Key::B)).unwrap();
        let status = input.key_state(h).unwrap();
        assert_eq!(status.asserting, 0);
        assert!(status.state.just_released());
        tick(&mut input, &[InputEvent::KeyUp(Key::A)]);
        assert_eq!(input.key_state(h).unwrap().state, KeyState::RELEASED);
    }

    #[test]
    fn test_unbind_and_invalid_handle() {
        let mut input = Input::new();
        assert!(matches!(
            input.bind(3, Interface::Key(Key::A)),
            Err(Error::InputInvalidHandle(3))
        ));
        let h = input.add_virtual_key();
        input.bind(h, Interface::Key(Key::A)).unwrap();
        input.unbind(Interface::Key(Key::A)).unwrap();
        assert!(matches!(input.unbind(Interface::Key(Key::A)), Err(Error::InputNotBound)));
        assert_eq!(input.bound_to(Interface::Key(Key::A)), None);
    }
}
