use crate::color::Color;
use crate::engine::resources::ImageResource;
use crate::engine::scene::Layer;
use crate::game::object::ObjectKind;
use crate::geom::{Rect, Shape};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawShape {
    Rectangle,
    Oval,
}

#[derive(Debug, Clone)]
pub struct DrawItem {
    pub shape: DrawShape,
    pub bounds: Rect,
    /// Radians about the centre of `bounds`.
    pub rotate: f64,
    /// Fill colour, or the tint multiplied into `image`.
    pub color: Color,
    pub image: Option<ImageResource>,
}

/// Everything one redraw needs, in back-to-front order.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub background: Color,
    pub items: Vec<DrawItem>,
    pub fps: Option<u32>,
}

impl Frame {
    pub fn compose(layers: &[Layer], background: Color) -> Self {
        let items = layers
            .iter()
            .flat_map(Layer::iter)
            .filter(|(_, object)| object.visible && !object.is_dead())
            .map(|(_, object)| {
                let bounds = object.bounds();
                let rotate = object.transform.rotate;
                match &object.kind {
                    ObjectKind::Shape { shape, color } => DrawItem {
                        shape: match shape {
                            Shape::Rectangle { .. } => DrawShape::Rectangle,
                            Shape::Oval { .. } => DrawShape::Oval,
                        },
                        bounds,
                        rotate,
                        color: *color,
                        image: None,
                    },
                    ObjectKind::Image { image } => DrawItem {
                        shape: DrawShape::Rectangle,
                        bounds,
                        rotate,
                        color: Color::WHITE,
                        image: Some(image.clone()),
                    },
                }
            })
            .collect();
        Self {
            background,
            items,
            fps: None,
        }
    }

    /// Focus-loss shading: every colour, background included, one step darker.
    pub fn darken(&mut self) {
        self.background = self.background.darker();
        for item in &mut self.items {
            item.color = item.color.darker();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::object::{GameObject, ObjectId};

    #[test]
    fn compose_keeps_layer_order_and_skips_hidden() {
        let mut bottom = Layer::new();
        let mut top = Layer::new();
        bottom.add(ObjectId(1), GameObject::shape(Color::RED, Shape::oval(5.0, 5.0), 0.0, 0.0));
        let mut hidden = GameObject::shape(Color::GREEN, Shape::rectangle(5.0, 5.0), 0.0, 0.0);
        hidden.visible = false;
        bottom.add(ObjectId(2), hidden);
        top.add(ObjectId(3), GameObject::shape(Color::BLUE, Shape::rectangle(4.0, 6.0), 1.0, 2.0));
        bottom.flush();
        top.flush();

        let frame = Frame::compose(&[bottom, top], Color::WHITE);
        assert_eq!(frame.items.len(), 2);
        assert_eq!(frame.items[0].shape, DrawShape::Oval);
        assert_eq!(frame.items[0].bounds, Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(frame.items[1].color, Color::BLUE);
        assert_eq!(frame.items[1].bounds, Rect::new(1.0, 2.0, 4.0, 6.0));
    }

    #[test]
    fn darken_touches_background_and_items() {
        let mut layer = Layer::new();
        layer.add(ObjectId(1), GameObject::shape(Color::WHITE, Shape::oval(1.0, 1.0), 0.0, 0.0));
        layer.flush();
        let mut frame = Frame::compose(&[layer], Color::WHITE);
        frame.darken();
        assert_eq!(frame.background, Color::WHITE.darker());
        assert_eq!(frame.items[0].color, Color::rgb(178, 178, 178));
    }
}
