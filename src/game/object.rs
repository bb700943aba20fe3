use std::fmt;

use crate::color::Color;
use crate::engine::resources::ImageResource;
use crate::game::anim::Anim;
use crate::geom::{Point, Rect, Shape};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub(crate) u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub x: f64,
    pub y: f64,
    /// Radians, clockwise on screen, about the centre of the bounds.
    pub rotate: f64,
    pub scale_x: f64,
    pub scale_y: f64,
}

impl Transform {
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            rotate: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::at(0.0, 0.0)
    }
}

#[derive(Debug, Clone)]
pub enum ObjectKind {
    Shape { shape: Shape, color: Color },
    Image { image: ImageResource },
}

pub struct GameObject {
    pub transform: Transform,
    pub kind: ObjectKind,
    pub visible: bool,
    died: bool,
    anims: Vec<Box<dyn Anim>>,
}

impl GameObject {
    pub fn new(kind: ObjectKind, x: f64, y: f64) -> Self {
        Self {
            transform: Transform::at(x, y),
            kind,
            visible: true,
            died: false,
            anims: Vec::new(),
        }
    }

    pub fn shape(color: Color, shape: Shape, x: f64, y: f64) -> Self {
        Self::new(ObjectKind::Shape { shape, color }, x, y)
    }

    pub fn image(image: ImageResource, x: f64, y: f64) -> Self {
        Self::new(ObjectKind::Image { image }, x, y)
    }

    pub fn with_anim(mut self, anim: impl Anim + 'static) -> Self {
        self.add_anim(anim);
        self
    }

    pub fn add_anim(&mut self, anim: impl Anim + 'static) {
        self.anims.push(Box::new(anim));
    }

    pub fn clear_anims(&mut self) {
        self.anims.clear();
    }

    pub fn anim_count(&self) -> usize {
        self.anims.len()
    }

    pub fn kill(&mut self) {
        self.died = true;
    }

    pub fn is_dead(&self) -> bool {
        self.died
    }

    /// Unscaled size of the object's artwork.
    pub fn size(&self) -> (f64, f64) {
        match &self.kind {
            ObjectKind::Shape { shape, .. } => shape.size(),
            ObjectKind::Image { image } => (image.width() as f64, image.height() as f64),
        }
    }

    /// Axis-aligned bounds after scaling, ignoring rotation.
    pub fn bounds(&self) -> Rect {
        let (width, height) = self.size();
        Rect::new(
            self.transform.x,
            self.transform.y,
            width * self.transform.scale_x,
            height * self.transform.scale_y,
        )
    }

    /// Hit test that honours rotation and the oval outline.
    pub fn contains(&self, point: Point) -> bool {
        let bounds = self.bounds();
        if bounds.width <= 0.0 || bounds.height <= 0.0 {
            return false;
        }
        let center = bounds.center();
        let (sin, cos) = (-self.transform.rotate).sin_cos();
        let dx = point.x - center.x;
        let dy = point.y - center.y;
        let (width, height) = self.size();
        let local = Point::new(
            (dx * cos - dy * sin) / self.transform.scale_x + width / 2.0,
            (dx * sin + dy * cos) / self.transform.scale_y + height / 2.0,
        );
        match &self.kind {
            ObjectKind::Shape { shape, .. } => shape.contains(local),
            ObjectKind::Image { image } => {
                Shape::rectangle(image.width() as f64, image.height() as f64).contains(local)
            }
        }
    }

    pub(crate) fn step_anims(&mut self, now_ms: u64) {
        for anim in &mut self.anims {
            anim.step(&mut self.transform, now_ms);
        }
        self.anims.retain(|anim| !anim.finished());
    }
}

impl fmt::Debug for GameObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameObject")
            .field("transform", &self.transform)
            .field("kind", &self.kind)
            .field("visible", &self.visible)
            .field("died", &self.died)
            .field("anims", &self.anims.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::anim::SimpleMove;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn bounds_follow_scale() {
        let mut object = GameObject::shape(Color::RED, Shape::rectangle(10.0, 20.0), 5.0, 5.0);
        object.transform.scale_x = 2.0;
        assert_eq!(object.bounds(), Rect::new(5.0, 5.0, 20.0, 20.0));
    }

    #[test]
    fn contains_honours_rotation() {
        let mut bar = GameObject::shape(Color::RED, Shape::rectangle(100.0, 10.0), 0.0, 0.0);
        let above_center = Point::new(50.0, -30.0);
        assert!(!bar.contains(above_center));
        bar.transform.rotate = FRAC_PI_2;
        assert!(bar.contains(above_center));
        assert!(!bar.contains(Point::new(5.0, 5.0)));
    }

    #[test]
    fn anims_move_the_object() {
        let mut object = GameObject::shape(Color::RED, Shape::oval(1.0, 1.0), 0.0, 0.0)
            .with_anim(SimpleMove::new(10.0, 0.0));
        object.step_anims(0);
        object.step_anims(1_000);
        assert!((object.transform.x - 10.0).abs() < 1e-9);
        assert_eq!(object.anim_count(), 1);
    }
}
