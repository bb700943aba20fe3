use std::fmt;
use std::sync::mpsc::{channel, Receiver, Sender};

pub use winit::event::MouseButton;
pub use winit::keyboard::KeyCode;

use crate::game::Context;
use crate::geom::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseEventKind {
    Clicked,
    Pressed,
    Released,
    Moved,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseEvent {
    pub kind: MouseEventKind,
    pub x: f64,
    pub y: f64,
    pub button: Option<MouseButton>,
}

impl MouseEvent {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Cursor tracking for the game surface. Coordinates are logical pixels
/// and read `-1` while the cursor is outside.
#[derive(Debug, Clone, Default)]
pub struct MouseState {
    position: Option<Point>,
    pressed: Vec<(MouseButton, Point)>,
    moved_since_press: bool,
}

impl MouseState {
    pub fn x(&self) -> f64 {
        self.position.map_or(-1.0, |p| p.x)
    }

    pub fn y(&self) -> f64 {
        self.position.map_or(-1.0, |p| p.y)
    }

    pub fn position(&self) -> Option<Point> {
        self.position
    }

    pub fn is_pressed(&self, button: MouseButton) -> bool {
        self.pressed.iter().any(|(b, _)| *b == button)
    }

    pub(crate) fn left(&mut self) {
        self.position = None;
    }

    pub(crate) fn moved(&mut self, point: Point) -> MouseEvent {
        if self.position.is_some_and(|p| p != point) {
            self.moved_since_press = true;
        }
        self.position = Some(point);
        MouseEvent {
            kind: MouseEventKind::Moved,
            x: point.x,
            y: point.y,
            button: None,
        }
    }

    pub(crate) fn pressed(&mut self, button: MouseButton) -> MouseEvent {
        let point = self.position.unwrap_or(Point::new(-1.0, -1.0));
        self.pressed.retain(|(b, _)| *b != button);
        self.pressed.push((button, point));
        self.moved_since_press = false;
        MouseEvent {
            kind: MouseEventKind::Pressed,
            x: point.x,
            y: point.y,
            button: Some(button),
        }
    }

    /// The release event, followed by a click when the cursor did not move
    /// since the matching press.
    pub(crate) fn released(&mut self, button: MouseButton) -> Vec<MouseEvent> {
        let point = self.position.unwrap_or(Point::new(-1.0, -1.0));
        let was_pressed = self.pressed.iter().any(|(b, _)| *b == button);
        self.pressed.retain(|(b, _)| *b != button);
        let mut events = vec![MouseEvent {
            kind: MouseEventKind::Released,
            x: point.x,
            y: point.y,
            button: Some(button),
        }];
        if was_pressed && !self.moved_since_press {
            events.push(MouseEvent {
                kind: MouseEventKind::Clicked,
                ..events[0]
            });
        }
        events
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEventKind {
    Pressed,
    Released,
    Typed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyEvent {
    pub kind: KeyEventKind,
    pub code: Option<KeyCode>,
    pub text: Option<String>,
    pub repeat: bool,
}

impl KeyEvent {
    pub fn pressed(code: KeyCode) -> Self {
        Self {
            kind: KeyEventKind::Pressed,
            code: Some(code),
            text: None,
            repeat: false,
        }
    }

    pub fn released(code: KeyCode) -> Self {
        Self {
            kind: KeyEventKind::Released,
            ..Self::pressed(code)
        }
    }

    pub fn typed(code: Option<KeyCode>, text: impl Into<String>) -> Self {
        Self {
            kind: KeyEventKind::Typed,
            code,
            text: Some(text.into()),
            repeat: false,
        }
    }
}

pub type KeyAction = Box<dyn FnMut(&mut Context, &KeyEvent)>;

pub struct KeyListener {
    kind: Option<KeyEventKind>,
    code: Option<KeyCode>,
    action: KeyAction,
}

impl KeyListener {
    /// Every key event of every kind.
    pub fn any(action: impl FnMut(&mut Context, &KeyEvent) + 'static) -> Self {
        Self {
            kind: None,
            code: None,
            action: Box::new(action),
        }
    }

    pub fn typed(code: KeyCode, action: impl FnMut(&mut Context, &KeyEvent) + 'static) -> Self {
        Self::filtered(KeyEventKind::Typed, code, action)
    }

    pub fn pressed(code: KeyCode, action: impl FnMut(&mut Context, &KeyEvent) + 'static) -> Self {
        Self::filtered(KeyEventKind::Pressed, code, action)
    }

    pub fn released(code: KeyCode, action: impl FnMut(&mut Context, &KeyEvent) + 'static) -> Self {
        Self::filtered(KeyEventKind::Released, code, action)
    }

    fn filtered(
        kind: KeyEventKind,
        code: KeyCode,
        action: impl FnMut(&mut Context, &KeyEvent) + 'static,
    ) -> Self {
        Self {
            kind: Some(kind),
            code: Some(code),
            action: Box::new(action),
        }
    }

    pub fn matches(&self, event: &KeyEvent) -> bool {
        self.kind.map_or(true, |kind| kind == event.kind)
            && self.code.map_or(true, |code| event.code == Some(code))
    }

    pub(crate) fn dispatch(&mut self, ctx: &mut Context, event: &KeyEvent) -> bool {
        if !self.matches(event) {
            return false;
        }
        (self.action)(ctx, event);
        true
    }
}

impl fmt::Debug for KeyListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyListener")
            .field("kind", &self.kind)
            .field("code", &self.code)
            .finish_non_exhaustive()
    }
}

pub type MouseAction = Box<dyn FnMut(&mut Context, &MouseEvent)>;

/// Closures queued by the game and run at the start of the next tick.
#[derive(Default)]
pub struct EventManager {
    queue: Vec<Box<dyn FnOnce(&mut Context)>>,
}

impl EventManager {
    pub fn insert(&mut self, event: impl FnOnce(&mut Context) + 'static) {
        self.queue.push(Box::new(event));
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub(crate) fn take(&mut self) -> Vec<Box<dyn FnOnce(&mut Context)>> {
        std::mem::take(&mut self.queue)
    }
}

impl fmt::Debug for EventManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventManager")
            .field("queued", &self.queue.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    Pause,
    Resume,
    Stop,
    Start,
    SetRefreshMillis(u64),
    Exit,
}

#[derive(Debug)]
pub struct CommandQueue {
    receiver: Receiver<EngineCommand>,
}

/// Thread-safe handle for steering the loop from outside the event thread.
#[derive(Debug, Clone)]
pub struct CommandSender {
    sender: Sender<EngineCommand>,
}

impl CommandQueue {
    pub fn new() -> (Self, CommandSender) {
        let (sender, receiver) = channel();
        (Self { receiver }, CommandSender { sender })
    }

    pub fn try_recv(&self) -> Option<EngineCommand> {
        self.receiver.try_recv().ok()
    }
}

impl CommandSender {
    /// Returns false once the engine is gone.
    pub fn send(&self, cmd: EngineCommand) -> bool {
        self.sender.send(cmd).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_needs_a_still_cursor() {
        let mut mouse = MouseState::default();
        mouse.moved(Point::new(10.0, 10.0));
        mouse.pressed(MouseButton::Left);
        let events = mouse.released(MouseButton::Left);
        let kinds: Vec<_> = events.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, [MouseEventKind::Released, MouseEventKind::Clicked]);

        mouse.pressed(MouseButton::Left);
        mouse.moved(Point::new(20.0, 10.0));
        let events = mouse.released(MouseButton::Left);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].x, 20.0);
    }

    #[test]
    fn release_without_press_is_not_a_click() {
        let mut mouse = MouseState::default();
        mouse.moved(Point::new(1.0, 1.0));
        assert_eq!(mouse.released(MouseButton::Right).len(), 1);
    }

    #[test]
    fn outside_cursor_reads_minus_one() {
        let mut mouse = MouseState::default();
        assert_eq!((mouse.x(), mouse.y()), (-1.0, -1.0));
        mouse.moved(Point::new(3.0, 4.0));
        assert_eq!((mouse.x(), mouse.y()), (3.0, 4.0));
        mouse.left();
        assert_eq!(mouse.x(), -1.0);
    }

    #[test]
    fn listener_filters_kind_and_code() {
        let listener = KeyListener::pressed(KeyCode::Space, |_, _| {});
        assert!(listener.matches(&KeyEvent::pressed(KeyCode::Space)));
        assert!(!listener.matches(&KeyEvent::released(KeyCode::Space)));
        assert!(!listener.matches(&KeyEvent::pressed(KeyCode::Enter)));
        assert!(KeyListener::any(|_, _| {}).matches(&KeyEvent::typed(None, "x")));
    }

    #[test]
    fn commands_cross_threads() {
        let (queue, sender) = CommandQueue::new();
        let handle = std::thread::spawn(move || sender.send(EngineCommand::Pause));
        assert!(handle.join().unwrap());
        assert_eq!(queue.try_recv(), Some(EngineCommand::Pause));
        assert_eq!(queue.try_recv(), None);
    }
}
