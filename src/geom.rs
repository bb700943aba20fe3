use serde::{Deserialize, Serialize};

pub const TO_X: f64 = 100.0;
pub const TO_Y: f64 = 100.0;

pub const SMALL_PHONE: Rect = Rect::new(TO_X, TO_Y, 480.0, 800.0);
pub const BIG_PHONE: Rect = Rect::new(TO_X, TO_Y, 720.0, 1200.0);
pub const HUGE_PHONE: Rect = Rect::new(TO_X, TO_Y, 1080.0, 1920.0);
pub const SMALL_SQUARE: Rect = Rect::new(TO_X, TO_Y, 400.0, 400.0);
pub const BIG_SQUARE: Rect = Rect::new(TO_X, TO_Y, 800.0, 800.0);

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Turns a portrait preset into landscape and back.
    pub fn rotate(&mut self) {
        std::mem::swap(&mut self.width, &mut self.height);
    }

    pub fn rotated(mut self) -> Self {
        self.rotate();
        self
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Rectangle { width: f64, height: f64 },
    /// Axis-aligned ellipse given by its radii.
    Oval { rx: f64, ry: f64 },
}

impl Shape {
    pub fn rectangle(width: f64, height: f64) -> Self {
        Shape::Rectangle { width, height }
    }

    pub fn oval(rx: f64, ry: f64) -> Self {
        Shape::Oval { rx, ry }
    }

    /// Bounding box size as `(width, height)`.
    pub fn size(&self) -> (f64, f64) {
        match *self {
            Shape::Rectangle { width, height } => (width, height),
            Shape::Oval { rx, ry } => (rx * 2.0, ry * 2.0),
        }
    }

    /// Hit test relative to the top-left corner of the bounding box.
    pub fn contains(&self, local: Point) -> bool {
        match *self {
            Shape::Rectangle { width, height } => {
                local.x >= 0.0 && local.x < width && local.y >= 0.0 && local.y < height
            }
            Shape::Oval { rx, ry } => {
                if rx <= 0.0 || ry <= 0.0 {
                    return false;
                }
                let dx = (local.x - rx) / rx;
                let dy = (local.y - ry) / ry;
                dx * dx + dy * dy <= 1.0
            }
        }
    }
}
